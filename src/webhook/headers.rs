//! Header extraction for HTTP frameworks built on the `http` crate.

// crates.io
use oauth2::http::HeaderMap;
// self
use crate::webhook::VerificationRequest;

/// Header carrying the base64 RSA-PSS signature.
pub const SIGNATURE_HEADER: &str = "X-Event-Signature";
/// Header carrying the ISO-8601 signing timestamp.
pub const TIMESTAMP_HEADER: &str = "X-Event-Timestamp";

impl<'a> VerificationRequest<'a> {
	/// Reads the signature and timestamp headers; values that are not visible ASCII count as
	/// absent.
	pub fn from_headers(headers: &'a HeaderMap, payload: &'a [u8]) -> Self {
		let value = |name: &str| headers.get(name).and_then(|value| value.to_str().ok());

		Self::new(value(SIGNATURE_HEADER), value(TIMESTAMP_HEADER), payload)
	}
}
