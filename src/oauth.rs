//! Client-credentials exchange against the partner token endpoint: request construction,
//! response interpretation, and failure classification.

pub use oauth2;

// crates.io
use oauth2::{
	AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse,
	http::{
		Method, Request,
		header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
	},
};
// self
use crate::{
	_prelude::*,
	auth::{ApiKey, Credential, TokenSecret, expiry_from_claims},
	error::{ConfigError, TokenAcquisitionError, TokenResponseError, TransientError, TransportError},
	http::{ResponseMetadata, ResponseMetadataSlot, TokenHttpClient},
	partner::PartnerDescriptor,
};

const BODY_PREVIEW_LIMIT: usize = 256;

/// Maps HTTP transport failures into crate [`Error`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted by the transport into a crate error.
	fn map_transport_error(
		&self,
		metadata: Option<&ResponseMetadata>,
		error: HttpClientError<E>,
	) -> Error;
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(
		&self,
		meta: Option<&ResponseMetadata>,
		err: HttpClientError<ReqwestError>,
	) -> Error {
		match err {
			HttpClientError::Reqwest(inner) => map_reqwest_error(meta, *inner),
			HttpClientError::Http(inner) => ConfigError::from(inner).into(),
			HttpClientError::Io(inner) => TransportError::from(inner).into(),
			HttpClientError::Other(message) => map_generic_transport_error(meta, message),
			_ => map_unknown_transport_error(meta),
		}
	}
}

/// JSON document returned by the token endpoint.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct TokenResponse {
	/// Issued bearer token.
	pub access_token: Option<TokenSecret>,
	/// Lifetime in seconds.
	pub expires_in: Option<i64>,
	/// Token type, typically `Bearer`.
	pub token_type: Option<String>,
	/// Granted scope.
	pub scope: Option<String>,
}
impl TokenResponse {
	/// Parses a response body, recording the JSON path of any mismatch.
	pub fn from_slice(body: &[u8]) -> Result<Self, TokenResponseError> {
		let de = &mut serde_json::Deserializer::from_slice(body);

		serde_path_to_error::deserialize(de)
			.map_err(|source| TokenResponseError::Parse { source: Arc::new(source) })
	}

	/// Converts the response into a credential acquired at `acquired_at`.
	///
	/// `expires_in` wins when present; otherwise the token's own `exp` claim is used. A
	/// response offering neither is refused rather than assigned a guessed lifetime.
	pub fn into_credential(
		self,
		acquired_at: OffsetDateTime,
	) -> Result<Credential, TokenResponseError> {
		let token = self
			.access_token
			.filter(|secret| !secret.is_empty())
			.ok_or(TokenResponseError::MissingAccessToken)?;
		let expires_at = match self.expires_in {
			Some(secs) if secs <= 0 => return Err(TokenResponseError::NonPositiveExpiresIn),
			Some(secs) => acquired_at
				.checked_add(Duration::seconds(secs))
				.ok_or(TokenResponseError::ExpiresInOutOfRange)?,
			None => match expiry_from_claims(token.expose()) {
				Some(exp) if exp > acquired_at => exp,
				Some(_) => return Err(TokenResponseError::ExpiredOnArrival),
				None => return Err(TokenResponseError::MissingExpiry),
			},
		};
		let mut credential = Credential::new(token.expose(), acquired_at, expires_at);

		credential.token_type = self.token_type;
		credential.scope = self.scope;

		Ok(credential)
	}
}

/// Builds the form-encoded client-credentials request for `descriptor`.
pub fn token_request(descriptor: &PartnerDescriptor, api_key: &ApiKey) -> Result<HttpRequest> {
	let body = url::form_urlencoded::Serializer::new(String::new())
		.extend_pairs(descriptor.token_form())
		.finish();
	let request = Request::builder()
		.method(Method::POST)
		.uri(descriptor.token_endpoint.as_str())
		.header(AUTHORIZATION, api_key.basic_authorization())
		.header(CONTENT_TYPE, "application/x-www-form-urlencoded")
		.header(ACCEPT, "application/json")
		.body(body.into_bytes())
		.map_err(ConfigError::from)?;

	Ok(request)
}

/// Performs a single exchange (no retries) and interprets the answer.
pub(crate) async fn exchange<C, M>(
	http_client: &C,
	mapper: &M,
	request: HttpRequest,
	acquired_at: impl FnOnce() -> OffsetDateTime,
) -> Result<Credential>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	let slot = ResponseMetadataSlot::default();
	let handle = http_client.with_metadata(slot.clone());
	let response = handle
		.call(request)
		.await
		.map_err(|err| mapper.map_transport_error(slot.take().as_ref(), err))?;
	let acquired_at = acquired_at();

	interpret_response(response, slot.take(), acquired_at).map_err(Error::from)
}

/// Classifies a token endpoint response.
pub(crate) fn interpret_response(
	response: HttpResponse,
	meta: Option<ResponseMetadata>,
	acquired_at: OffsetDateTime,
) -> Result<Credential, TokenAcquisitionError> {
	let status = response.status().as_u16();

	if response.status().is_success() {
		let parsed = TokenResponse::from_slice(response.body())?;

		return Ok(parsed.into_credential(acquired_at)?);
	}

	let reason = failure_reason(response.body());

	if is_retryable_status(status) {
		return Err(TransientError::TokenEndpoint {
			message: format!("HTTP {status}: {reason}"),
			status: Some(status),
			retry_after: meta_retry_after(meta.as_ref()),
		}
		.into());
	}

	Err(TokenAcquisitionError::Rejected { status, reason })
}

/// Statuses worth retrying: throttling, gateway hiccups, and the partner's transient 403/408.
pub fn is_retryable_status(status: u16) -> bool {
	matches!(status, 403 | 408 | 429 | 500..=599)
}

#[derive(Deserialize)]
struct OAuthErrorBody {
	error: Option<String>,
	error_description: Option<String>,
}

fn failure_reason(body: &[u8]) -> String {
	if let Ok(OAuthErrorBody { error, error_description }) = serde_json::from_slice(body)
		&& let Some(reason) = error_description.or(error)
	{
		return reason;
	}

	let preview = String::from_utf8_lossy(body);
	let preview = preview.trim();

	if preview.is_empty() {
		return "empty response body".into();
	}

	preview.chars().take(BODY_PREVIEW_LIMIT).collect()
}

#[cfg(feature = "reqwest")]
fn map_reqwest_error(meta: Option<&ResponseMetadata>, err: ReqwestError) -> Error {
	if err.is_builder() {
		return ConfigError::from(err).into();
	}
	if err.is_timeout() {
		return TransientError::TokenEndpoint {
			message: "Request timed out while calling the token endpoint".into(),
			status: meta_status(meta).or_else(|| err.status().map(|code| code.as_u16())),
			retry_after: meta_retry_after(meta),
		}
		.into();
	}

	TransportError::from(err).into()
}

fn map_generic_transport_error(meta: Option<&ResponseMetadata>, message: impl Display) -> Error {
	TransientError::TokenEndpoint {
		message: format!("HTTP client error occurred while calling the token endpoint: {message}"),
		status: meta_status(meta),
		retry_after: meta_retry_after(meta),
	}
	.into()
}

fn map_unknown_transport_error(meta: Option<&ResponseMetadata>) -> Error {
	TransientError::TokenEndpoint {
		message: "HTTP client error occurred while calling the token endpoint".into(),
		status: meta_status(meta),
		retry_after: meta_retry_after(meta),
	}
	.into()
}

fn meta_status(meta: Option<&ResponseMetadata>) -> Option<u16> {
	meta.and_then(|value| value.status)
}

fn meta_retry_after(meta: Option<&ResponseMetadata>) -> Option<Duration> {
	meta.and_then(|value| value.retry_after)
}
