//! Partner public key loading.
//!
//! Keys arrive as a base64 SubjectPublicKeyInfo (the form partners publish) or as a PEM
//! `PUBLIC KEY` block. `ring` verifies against the inner PKCS#1 `RSAPublicKey`, so loading
//! unwraps the SPKI envelope once and validates it up front; a key that loads here never fails
//! to parse at verification time.

// crates.io
use base64::{Engine, engine::general_purpose::STANDARD};
use pkcs1::{ALGORITHM_OID, RsaPublicKey};
use ring::signature::{RSA_PSS_2048_8192_SHA256, UnparsedPublicKey};
use spki::{
	SubjectPublicKeyInfoRef,
	der::{Decode, Tag},
};
// self
use crate::_prelude::*;

const MIN_MODULUS_BITS: usize = 2048;
const PEM_LABEL: &str = "PUBLIC KEY";

/// Public key material could not be loaded; a server-side configuration fault.
#[derive(Clone, Debug, ThisError)]
pub enum KeyError {
	/// The key text is not valid base64.
	#[error("Public key is not valid base64.")]
	Base64 {
		/// Decoder failure.
		#[source]
		source: base64::DecodeError,
	},
	/// The PEM armor is missing or mismatched.
	#[error("Public key PEM block is malformed.")]
	Pem {
		/// PEM parser failure.
		#[source]
		source: Arc<pem::PemError>,
	},
	/// The PEM block holds something other than a public key.
	#[error("PEM block is labelled `{label}`, expected `PUBLIC KEY`.")]
	PemLabel {
		/// Label found on the BEGIN line.
		label: String,
	},
	/// The DER structure is not a SubjectPublicKeyInfo wrapping an RSA public key.
	#[error("Public key DER is malformed.")]
	Der {
		/// ASN.1 decoder failure.
		#[source]
		source: spki::der::Error,
	},
	/// The key is not an RSA (`rsaEncryption`) key.
	#[error("Public key algorithm is not rsaEncryption.")]
	UnsupportedAlgorithm,
	/// The RSA modulus is shorter than 2048 bits.
	#[error("RSA public key has {bits} bits; at least 2048 are required.")]
	KeyTooSmall {
		/// Modulus length in bits.
		bits: usize,
	},
}
impl KeyError {
	/// Status a webhook endpoint should answer with while the key is broken.
	pub fn http_status(&self) -> u16 {
		500
	}
}
impl From<spki::der::Error> for KeyError {
	fn from(source: spki::der::Error) -> Self {
		Self::Der { source }
	}
}

/// Validated RSA public key used to verify partner signatures.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct PublicKeyMaterial {
	pkcs1: Vec<u8>,
	modulus_bits: usize,
}
impl PublicKeyMaterial {
	/// Loads a DER-encoded SubjectPublicKeyInfo.
	pub fn from_der(der: &[u8]) -> Result<Self, KeyError> {
		let spki = SubjectPublicKeyInfoRef::from_der(der)?;

		if spki.algorithm.oid != ALGORITHM_OID {
			return Err(KeyError::UnsupportedAlgorithm);
		}

		let pkcs1 =
			spki.subject_public_key.as_bytes().ok_or_else(|| Tag::BitString.value_error())?;
		let rsa = RsaPublicKey::from_der(pkcs1)?;
		let modulus_bits = significant_bits(rsa.modulus.as_bytes());

		if modulus_bits < MIN_MODULUS_BITS {
			return Err(KeyError::KeyTooSmall { bits: modulus_bits });
		}

		Ok(Self { pkcs1: pkcs1.to_vec(), modulus_bits })
	}

	/// Loads a base64 SubjectPublicKeyInfo; embedded whitespace and line breaks are ignored.
	pub fn from_base64(encoded: &str) -> Result<Self, KeyError> {
		let compact = encoded.split_whitespace().collect::<String>();
		let der = STANDARD.decode(compact).map_err(|source| KeyError::Base64 { source })?;

		Self::from_der(&der)
	}

	/// Loads a PEM `PUBLIC KEY` block.
	pub fn from_pem(text: &str) -> Result<Self, KeyError> {
		let block = pem::parse(text).map_err(|e| KeyError::Pem { source: Arc::new(e) })?;

		if block.tag() != PEM_LABEL {
			return Err(KeyError::PemLabel { label: block.tag().to_owned() });
		}

		Self::from_der(block.contents())
	}

	/// RSA modulus length in bits.
	pub fn modulus_bits(&self) -> usize {
		self.modulus_bits
	}

	/// Checks an RSA-PSS/SHA-256 (32-byte salt) signature over `message`.
	pub(crate) fn verify_pss_sha256(
		&self,
		message: &[u8],
		signature: &[u8],
	) -> Result<(), ring::error::Unspecified> {
		UnparsedPublicKey::new(&RSA_PSS_2048_8192_SHA256, &self.pkcs1).verify(message, signature)
	}
}
impl FromStr for PublicKeyMaterial {
	type Err = KeyError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		if s.trim_start().starts_with("-----") { Self::from_pem(s) } else { Self::from_base64(s) }
	}
}
impl TryFrom<String> for PublicKeyMaterial {
	type Error = KeyError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		value.parse()
	}
}
impl Debug for PublicKeyMaterial {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("PublicKeyMaterial")
			.field("algorithm", &"rsaEncryption")
			.field("modulus_bits", &self.modulus_bits)
			.finish()
	}
}

// Unsigned big-endian integer with leading zero octets already stripped.
fn significant_bits(magnitude: &[u8]) -> usize {
	match magnitude.first() {
		Some(top) => magnitude.len() * 8 - top.leading_zeros() as usize,
		None => 0,
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	const PARTNER_SPKI: &str = include_str!("../../tests/fixtures/partner_public_spki.b64");
	const PARTNER_PEM: &str = include_str!("../../tests/fixtures/partner_public.pem");
	const RSA_1024_SPKI: &str = "MIGfMA0GCSqGSIb3DQEBAQUAA4GNADCBiQKBgQDAFgbu2pMQigGoD3tTIABRPMqxD0B4IWuC16l/29qBjL3EgQcKAg6MR/eG3r+YzYTQEnBb7et4U7bOxj1aTdqRFvs/1oGrHhAuDV8+4MVcSz7kjDtlasRKSVyHt5Lb1NE5qWu+oJTgqIkujS/62uPV5GuOQui7FrmO4wfEKMR1NwIDAQAB";
	const P256_SPKI: &str = "MFkwEwYHKoZIzj0CAQYIKoZIzj0DAQcDQgAEtoCtbhHBcWZ6JeC2BidHSI89pRkfw3TdQHJvo0TSYUeT8mEq0JCKN82/I/8Al329OUKC2rfJHUw4vT13w8jh4g==";

	#[test]
	fn base64_and_pem_load_the_same_key() {
		let from_b64 =
			PublicKeyMaterial::from_base64(PARTNER_SPKI).expect("Fixture SPKI should load.");
		let from_pem = PublicKeyMaterial::from_pem(PARTNER_PEM).expect("Fixture PEM should load.");

		assert_eq!(from_b64, from_pem);
		assert_eq!(from_b64.modulus_bits(), 2048);
		assert_eq!(PARTNER_PEM.parse::<PublicKeyMaterial>().ok(), Some(from_b64));
	}

	#[test]
	fn small_and_non_rsa_keys_are_refused() {
		assert!(matches!(
			PublicKeyMaterial::from_base64(RSA_1024_SPKI),
			Err(KeyError::KeyTooSmall { bits: 1024 })
		));
		assert!(matches!(
			PublicKeyMaterial::from_base64(P256_SPKI),
			Err(KeyError::UnsupportedAlgorithm)
		));
	}

	#[test]
	fn broken_encodings_are_reported() {
		assert!(matches!(PublicKeyMaterial::from_base64("not base64!"), Err(KeyError::Base64 { .. })));
		assert!(matches!(
			PublicKeyMaterial::from_pem("-----BEGIN PUBLIC KEY-----\nAAAA"),
			Err(KeyError::Pem { .. })
		));

		let certificate = format!(
			"-----BEGIN CERTIFICATE-----\n{}\n-----END CERTIFICATE-----\n",
			PARTNER_SPKI.trim()
		);

		assert!(matches!(
			PublicKeyMaterial::from_pem(&certificate),
			Err(KeyError::PemLabel { label }) if label == "CERTIFICATE"
		));
		assert!(matches!(PublicKeyMaterial::from_der(&[0x30, 0x05, 0x00]), Err(KeyError::Der { .. })));

		let truncated = STANDARD.decode(PARTNER_SPKI.trim()).expect("Fixture should decode.");

		assert!(matches!(
			PublicKeyMaterial::from_der(&truncated[..truncated.len() - 10]),
			Err(KeyError::Der { .. })
		));
		assert_eq!(KeyError::UnsupportedAlgorithm.http_status(), 500);
	}

	#[test]
	fn deserializes_from_config_strings() {
		let key: PublicKeyMaterial = serde_json::from_value(serde_json::Value::String(
			PARTNER_SPKI.trim().to_owned(),
		))
		.expect("Config strings should deserialize into key material.");

		assert_eq!(key.modulus_bits(), 2048);
		assert!(serde_json::from_str::<PublicKeyMaterial>(r#""AAAA""#).is_err());
	}

	#[test]
	fn debug_does_not_dump_key_bytes() {
		let key = PublicKeyMaterial::from_base64(PARTNER_SPKI).expect("Fixture SPKI should load.");

		assert_eq!(
			format!("{key:?}"),
			r#"PublicKeyMaterial { algorithm: "rsaEncryption", modulus_bits: 2048 }"#
		);
	}
}
