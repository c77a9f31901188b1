//! Shared helpers for integration tests: an httpmock-friendly transport, partner descriptors,
//! and signing fixtures.

#![allow(dead_code)]

// std
use std::sync::Arc;
// crates.io
use base64::{Engine, engine::general_purpose::STANDARD};
use httpmock::MockServer;
use ring::{
	rand::SystemRandom,
	signature::{RSA_PSS_SHA256, RsaKeyPair},
};
use time::Duration;
// self
use partner_auth::{
	auth::ApiKey,
	clock::Clock,
	flows::{ReqwestTokenAcquirer, RetryPolicy, TokenAcquirer},
	http::ReqwestHttpClient,
	oauth::ReqwestTransportErrorMapper,
	partner::PartnerDescriptor,
	reqwest::Client,
	url::Url,
	webhook::{DigestBuilder, PublicKeyMaterial},
};

/// Pre-encoded Basic credential used by every acquisition test.
pub const API_KEY: &str = "cGFydG5lci1pZDpwYXJ0bmVyLXNlY3JldA==";
/// Timestamp the checked-in fixture signature was produced for.
pub const SIGNED_AT_RAW: &str = "2025-07-01T00:58:21Z";

/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
/// `httpmock` during tests.
pub fn test_reqwest_http_client() -> ReqwestHttpClient {
	let client = Client::builder()
		.danger_accept_invalid_certs(true)
		.danger_accept_invalid_hostnames(true)
		.build()
		.expect("Failed to build insecure Reqwest client for tests.");

	ReqwestHttpClient::with_client(client)
}

/// Descriptor pointing at the mock server's `/token` route.
pub fn build_descriptor(server: &MockServer) -> PartnerDescriptor {
	PartnerDescriptor::builder(
		Url::parse(&server.url("/token")).expect("Mock token endpoint should parse successfully."),
	)
	.build()
	.expect("Partner descriptor should build successfully.")
}

/// Retry policy with millisecond delays so retry tests stay fast.
pub fn fast_retry(max_retries: u32) -> RetryPolicy {
	RetryPolicy::default()
		.with_max_retries(max_retries)
		.with_base_delay(Duration::milliseconds(1))
		.with_max_delay(Duration::milliseconds(5))
		.with_jitter(false)
}

/// Acquirer wired to the mock server through the insecure test transport.
pub fn build_test_acquirer(server: &MockServer, clock: Arc<dyn Clock>) -> ReqwestTokenAcquirer {
	TokenAcquirer::with_http_client(
		build_descriptor(server),
		ApiKey::new(API_KEY),
		test_reqwest_http_client(),
		ReqwestTransportErrorMapper,
	)
	.expect("Acquirer should build with a non-empty API key.")
	.with_retry_policy(fast_retry(2))
	.with_clock(clock)
}

/// JSON body of a successful token response.
pub fn token_body(token: &str, expires_in: i64) -> String {
	format!(
		r#"{{"access_token":"{token}","expires_in":{expires_in},"token_type":"Bearer","scope":"k1_integration_api"}}"#
	)
}

/// Reads a file from `tests/fixtures`.
pub fn fixture(name: &str) -> String {
	let path = format!("{}/tests/fixtures/{name}", env!("CARGO_MANIFEST_DIR"));

	std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("Failed to read fixture {path}: {e}."))
}

/// Raw bytes of the fixture order event.
pub fn order_event() -> Vec<u8> {
	fixture("order_event.json").into_bytes()
}

/// Partner public key loaded from its base64 SPKI fixture.
pub fn partner_key() -> PublicKeyMaterial {
	PublicKeyMaterial::from_base64(&fixture("partner_public_spki.b64"))
		.expect("Partner key fixture should load.")
}

/// Signs `timestamp || payload` with RSA-PSS/SHA-256 using a PKCS#8 fixture key.
pub fn sign_with(private_fixture: &str, timestamp: &str, payload: &[u8]) -> String {
	let der = STANDARD
		.decode(fixture(private_fixture).trim())
		.expect("Private key fixture should be valid base64.");
	let pair = RsaKeyPair::from_pkcs8(&der).expect("Private key fixture should be PKCS#8 RSA.");
	let mut signature = vec![0; pair.public().modulus_len()];

	pair.sign(
		&RSA_PSS_SHA256,
		&SystemRandom::new(),
		&DigestBuilder::build(timestamp, payload),
		&mut signature,
	)
	.expect("Signing with the fixture key should succeed.");

	STANDARD.encode(signature)
}
