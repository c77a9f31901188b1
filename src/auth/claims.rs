//! Unverified claim extraction for JWT-shaped access tokens.
//!
//! Only the `exp` claim is read, and only to schedule refreshes; the signature is never
//! checked because the token is opaque to this crate and validated by the partner API.

// crates.io
use base64::{
	Engine,
	alphabet,
	engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
};
// self
use crate::_prelude::*;

const JWT_SEGMENT: GeneralPurpose = GeneralPurpose::new(
	&alphabet::URL_SAFE,
	GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Deserialize)]
struct ExpiryClaims {
	exp: Option<serde_json::Value>,
}

/// Returns the `exp` claim of a compact JWS token, if the token has one that can be read.
pub fn expiry_from_claims(token: &str) -> Option<OffsetDateTime> {
	let mut segments = token.split('.');
	let (_header, payload, _signature) = (segments.next()?, segments.next()?, segments.next()?);

	if segments.next().is_some() {
		return None;
	}

	let raw = JWT_SEGMENT.decode(payload).ok()?;
	let claims: ExpiryClaims = serde_json::from_slice(&raw).ok()?;
	let exp = match claims.exp? {
		serde_json::Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?,
		_ => return None,
	};

	OffsetDateTime::from_unix_timestamp(exp).ok()
}

#[cfg(test)]
mod tests {
	// crates.io
	use base64::engine::general_purpose::URL_SAFE_NO_PAD;
	use time::macros::datetime;
	// self
	use super::*;

	fn jwt(claims: &str) -> String {
		format!(
			"{}.{}.c2lnbmF0dXJl",
			URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256","typ":"JWT"}"#),
			URL_SAFE_NO_PAD.encode(claims)
		)
	}

	#[test]
	fn reads_numeric_exp_claim() {
		let token = jwt(r#"{"sub":"client","exp":1751331501}"#);

		assert_eq!(expiry_from_claims(&token), Some(datetime!(2025-07-01 00:58:21 UTC)));
	}

	#[test]
	fn tolerates_fractional_exp() {
		let token = jwt(r#"{"exp":1751331501.75}"#);

		assert_eq!(expiry_from_claims(&token), Some(datetime!(2025-07-01 00:58:21 UTC)));
	}

	#[test]
	fn opaque_or_claimless_tokens_yield_nothing() {
		assert_eq!(expiry_from_claims("opaque-token"), None);
		assert_eq!(expiry_from_claims("a.b"), None);
		assert_eq!(expiry_from_claims("a.b.c.d"), None);
		assert_eq!(expiry_from_claims(&jwt(r#"{"sub":"client"}"#)), None);
		assert_eq!(expiry_from_claims(&jwt(r#"{"exp":"soon"}"#)), None);
		assert_eq!(expiry_from_claims("e30.!!!.sig"), None);
	}
}
