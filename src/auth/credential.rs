//! Cached bearer credential and its freshness rules.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Freshness of a credential relative to an instant and a refresh buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CredentialStatus {
	/// Valid for longer than the refresh buffer.
	Fresh,
	/// Still valid, but inside the refresh buffer.
	Expiring,
	/// At or past its expiry instant.
	Expired,
	/// Carries no token value and must never be handed out.
	Empty,
}

/// Bearer token issued by the partner token endpoint.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
	/// Access token value; callers must avoid logging it.
	pub value: TokenSecret,
	/// Instant the token endpoint answered.
	pub acquired_at: OffsetDateTime,
	/// Absolute expiry derived from `expires_in` or the token's `exp` claim.
	pub expires_at: OffsetDateTime,
	/// `token_type` reported by the endpoint, if any.
	pub token_type: Option<String>,
	/// `scope` reported by the endpoint, if any.
	pub scope: Option<String>,
}
impl Credential {
	/// Creates a credential valid until `expires_at`.
	pub fn new(
		value: impl Into<String>,
		acquired_at: OffsetDateTime,
		expires_at: OffsetDateTime,
	) -> Self {
		Self {
			value: TokenSecret::new(value),
			acquired_at,
			expires_at,
			token_type: None,
			scope: None,
		}
	}

	/// Records the reported token type.
	pub fn with_token_type(mut self, token_type: impl Into<String>) -> Self {
		self.token_type = Some(token_type.into());

		self
	}

	/// Records the reported scope.
	pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
		self.scope = Some(scope.into());

		self
	}

	/// Returns the token value. Callers must avoid logging this string.
	pub fn token(&self) -> &str {
		self.value.expose()
	}

	/// Returns `true` when the credential carries no token value.
	pub fn is_empty(&self) -> bool {
		self.value.is_empty()
	}

	/// Instant at which a refresh becomes due under `buffer`.
	pub fn refresh_due_at(&self, buffer: Duration) -> OffsetDateTime {
		self.expires_at - buffer
	}

	/// Time left before expiry; negative once expired.
	pub fn remaining_at(&self, instant: OffsetDateTime) -> Duration {
		self.expires_at - instant
	}

	/// Computes the freshness at `instant` under `buffer`.
	pub fn status_at(&self, instant: OffsetDateTime, buffer: Duration) -> CredentialStatus {
		if self.is_empty() {
			return CredentialStatus::Empty;
		}
		if instant >= self.expires_at {
			return CredentialStatus::Expired;
		}
		if instant + buffer >= self.expires_at {
			return CredentialStatus::Expiring;
		}

		CredentialStatus::Fresh
	}

	/// Returns `true` if the credential is unusable or inside the refresh buffer.
	pub fn needs_refresh_at(&self, instant: OffsetDateTime, buffer: Duration) -> bool {
		!matches!(self.status_at(instant, buffer), CredentialStatus::Fresh)
	}

	/// Returns `true` if the credential has expired at `instant`.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant >= self.expires_at
	}
}
impl Debug for Credential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credential")
			.field("value", &"<redacted>")
			.field("acquired_at", &self.acquired_at)
			.field("expires_at", &self.expires_at)
			.field("token_type", &self.token_type)
			.field("scope", &self.scope)
			.finish()
	}
}
