//! Signed message construction.

// crates.io
use sha2::{Digest, Sha256};

/// Builds the byte string a partner signs for each delivery.
#[derive(Clone, Copy, Debug, Default)]
pub struct DigestBuilder;
impl DigestBuilder {
	/// Concatenates the header timestamp, exactly as received, with the raw body bytes.
	///
	/// Neither input may be normalized: a reparsed timestamp or reserialized JSON body no longer
	/// matches what the sender signed.
	pub fn build(timestamp_raw: &str, payload: &[u8]) -> Vec<u8> {
		let mut message = Vec::with_capacity(timestamp_raw.len() + payload.len());

		message.extend_from_slice(timestamp_raw.as_bytes());
		message.extend_from_slice(payload);

		message
	}
}

/// Lowercase hex SHA-256 of `payload`, used to correlate deliveries in logs without
/// recording their content.
pub fn payload_fingerprint(payload: &[u8]) -> String {
	hex::encode(Sha256::digest(payload))
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn digest_is_raw_timestamp_then_raw_body() {
		let body = br#"{ "b": 1,  "a": 2 }"#;
		let digest = DigestBuilder::build("2025-07-01T00:58:21.000+00:00", body);

		assert_eq!(digest, [b"2025-07-01T00:58:21.000+00:00".as_slice(), body.as_slice()].concat());
		assert_eq!(DigestBuilder::build("", b""), Vec::<u8>::new());
	}

	#[test]
	fn fingerprint_is_lowercase_sha256_hex() {
		assert_eq!(
			payload_fingerprint(b"abc"),
			"ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
		);
	}
}
