//! Crate-level error types shared by the credential flows, transports, and key loading.

// self
use crate::{_prelude::*, partner::PartnerDescriptorError, webhook::KeyError};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type SharedError = Arc<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
///
/// Cheap to clone: one failed refresh is handed to every caller that waited on it.
#[derive(Clone, Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Token endpoint exchange failed.
	#[error(transparent)]
	Acquisition(#[from] TokenAcquisitionError),
	/// Webhook public key material could not be loaded.
	#[error(transparent)]
	Key(#[from] KeyError),
}
impl Error {
	/// Returns `true` when retrying the same operation later may succeed.
	pub fn is_transient(&self) -> bool {
		match self {
			Self::Acquisition(err) => err.is_transient(),
			Self::Config(_) | Self::Key(_) => false,
		}
	}
}
impl From<TransientError> for Error {
	fn from(e: TransientError) -> Self {
		Self::Acquisition(e.into())
	}
}
impl From<TransportError> for Error {
	fn from(e: TransportError) -> Self {
		Self::Acquisition(e.into())
	}
}
impl From<TokenResponseError> for Error {
	fn from(e: TokenResponseError) -> Self {
		Self::Acquisition(e.into())
	}
}

/// Configuration and validation failures.
#[derive(Clone, Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: SharedError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(Arc<oauth2::http::Error>),
	/// Partner descriptor failed validation.
	#[error(transparent)]
	InvalidDescriptor(#[from] PartnerDescriptorError),
	/// The API key is empty or cannot be used as a header value.
	#[error("API key is empty or not a valid header value.")]
	InvalidApiKey,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Arc::new(src) }
	}
}
impl From<oauth2::http::Error> for ConfigError {
	fn from(e: oauth2::http::Error) -> Self {
		Self::HttpRequest(Arc::new(e))
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Failure to obtain a credential from the partner token endpoint.
#[derive(Clone, Debug, ThisError)]
pub enum TokenAcquisitionError {
	/// Temporary upstream failure; retried with backoff.
	#[error(transparent)]
	Transient(#[from] TransientError),
	/// Transport failure (DNS, TCP, TLS); retried with backoff.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Token endpoint refused the request outright.
	#[error("Token endpoint rejected the request with HTTP {status}: {reason}.")]
	Rejected {
		/// HTTP status code returned by the token endpoint.
		status: u16,
		/// Short description taken from the response body when available.
		reason: String,
	},
	/// Token endpoint answered 2xx with a body that cannot produce a credential.
	#[error(transparent)]
	InvalidResponse(#[from] TokenResponseError),
}
impl TokenAcquisitionError {
	/// Returns `true` for failures the retry loop should attempt again.
	pub fn is_transient(&self) -> bool {
		matches!(self, Self::Transient(_) | Self::Transport(_))
	}

	/// Retry-After hint supplied by the token endpoint, if any.
	pub fn retry_after(&self) -> Option<Duration> {
		match self {
			Self::Transient(TransientError::TokenEndpoint { retry_after, .. }) => *retry_after,
			_ => None,
		}
	}

	/// HTTP status associated with the failure, when one was observed.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Transient(TransientError::TokenEndpoint { status, .. }) => *status,
			Self::Rejected { status, .. } => Some(*status),
			_ => None,
		}
	}
}

/// Temporary failure variants (safe to retry).
#[derive(Clone, Debug, ThisError)]
pub enum TransientError {
	/// Token endpoint returned a retryable status or timed out.
	#[error("Token endpoint returned a retryable failure: {message}.")]
	TokenEndpoint {
		/// Summary of the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
}

/// Transport-level failures (network, IO).
#[derive(Clone, Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the token endpoint.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: SharedError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the token endpoint.")]
	Io(#[source] Arc<std::io::Error>),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Arc::new(src) }
	}
}
impl From<std::io::Error> for TransportError {
	fn from(e: std::io::Error) -> Self {
		Self::Io(Arc::new(e))
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

/// A successful token response that still cannot yield a usable credential.
#[derive(Clone, Debug, ThisError)]
pub enum TokenResponseError {
	/// Body is not the expected JSON document.
	#[error("Token endpoint returned malformed JSON.")]
	Parse {
		/// Structured parsing failure including the offending path.
		#[source]
		source: Arc<serde_path_to_error::Error<serde_json::Error>>,
	},
	/// `access_token` is absent or empty.
	#[error("Token endpoint response is missing access_token.")]
	MissingAccessToken,
	/// `expires_in` is zero or negative.
	#[error("The expires_in value must be positive.")]
	NonPositiveExpiresIn,
	/// `expires_in` does not fit the supported range.
	#[error("The expires_in value exceeds the supported range.")]
	ExpiresInOutOfRange,
	/// Neither `expires_in` nor a readable `exp` claim is present.
	#[error("Token endpoint response carries no expires_in and the token has no readable exp claim.")]
	MissingExpiry,
	/// The `exp` claim is at or before the acquisition instant.
	#[error("The token exp claim is not in the future.")]
	ExpiredOnArrival,
}
