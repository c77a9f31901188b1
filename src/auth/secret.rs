//! Secret wrappers that redact sensitive material.

// self
use crate::_prelude::*;

/// Redacted token secret wrapper keeping bearer tokens out of logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSecret(String);
impl TokenSecret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner token value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Returns `true` when no secret material is present.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}
impl AsRef<str> for TokenSecret {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("TokenSecret").field(&"<redacted>").finish()
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Pre-encoded client credential sent verbatim as `Authorization: Basic <key>`.
///
/// The partner issues the key already base64-encoded, so it is never re-encoded or split into
/// an identifier/secret pair.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct ApiKey(TokenSecret);
impl ApiKey {
	/// Wraps the key after trimming surrounding whitespace.
	pub fn new(value: impl AsRef<str>) -> Self {
		Self(TokenSecret::new(value.as_ref().trim()))
	}

	/// Returns the raw key. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		self.0.expose()
	}

	/// Returns `true` when the key is empty.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Builds the `Authorization` header value for the token request.
	pub fn basic_authorization(&self) -> String {
		format!("Basic {}", self.expose())
	}
}
impl Debug for ApiKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("ApiKey").field(&"<redacted>").finish()
	}
}
impl Display for ApiKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}
