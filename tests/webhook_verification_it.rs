mod common;

// std
use std::sync::Arc;
// crates.io
use time::{Duration, OffsetDateTime, macros::datetime};
// self
use common::*;
use partner_auth::{
	clock::ManualClock,
	error::Error,
	oauth::oauth2::http::{HeaderMap, HeaderValue},
	webhook::{
		HeaderField, KeyError, PublicKeyMaterial, Rejection, SIGNATURE_HEADER, SignatureVerifier,
		TIMESTAMP_HEADER, VerificationOutcome, VerificationRequest,
	},
};

const SIGNED_AT: OffsetDateTime = datetime!(2025-07-01 00:58:21 UTC);

fn headers(signature: &str, timestamp: &str) -> HeaderMap {
	let mut headers = HeaderMap::new();

	headers.insert(
		SIGNATURE_HEADER,
		HeaderValue::from_str(signature.trim()).expect("Signature should be a valid header value."),
	);
	headers.insert(
		TIMESTAMP_HEADER,
		HeaderValue::from_str(timestamp).expect("Timestamp should be a valid header value."),
	);

	headers
}

fn verify_at(
	verifier: &SignatureVerifier,
	headers: &HeaderMap,
	payload: &[u8],
	now: OffsetDateTime,
) -> VerificationOutcome {
	verifier.verify(&VerificationRequest::from_headers(headers, payload), now)
}

#[test]
fn checked_in_delivery_is_accepted_then_expires() {
	let verifier = SignatureVerifier::new(partner_key());
	let headers = headers(&fixture("order_event.sig"), SIGNED_AT_RAW);
	let payload = order_event();

	assert_eq!(verify_at(&verifier, &headers, &payload, SIGNED_AT), VerificationOutcome::Accepted);
	assert_eq!(
		verify_at(&verifier, &headers, &payload, SIGNED_AT + Duration::minutes(10)),
		VerificationOutcome::Rejected(Rejection::TimestampTooOld)
	);
	assert_eq!(
		verify_at(&verifier, &headers, &payload, SIGNED_AT - Duration::minutes(10)),
		VerificationOutcome::Rejected(Rejection::TimestampTooNew)
	);
}

#[test]
fn custom_grace_period_boundary() {
	let verifier = SignatureVerifier::new(partner_key()).with_grace_period(Duration::seconds(30));
	let headers = headers(&fixture("order_event.sig"), SIGNED_AT_RAW);
	let payload = order_event();

	assert!(
		verify_at(&verifier, &headers, &payload, SIGNED_AT + Duration::seconds(30)).is_accepted()
	);
	assert_eq!(
		verify_at(&verifier, &headers, &payload, SIGNED_AT + Duration::seconds(31)),
		VerificationOutcome::Rejected(Rejection::TimestampTooOld)
	);
}

#[test]
fn foreign_keys_and_wrong_salt_lengths_are_signature_failures() {
	let verifier = SignatureVerifier::new(partner_key());
	let payload = order_event();
	let rogue = sign_with("rogue_private_pkcs8.b64", SIGNED_AT_RAW, &payload);
	let salt0 = fixture("order_event_salt0.sig");

	for signature in [rogue.as_str(), salt0.as_str()] {
		assert_eq!(
			verify_at(&verifier, &headers(signature, SIGNED_AT_RAW), &payload, SIGNED_AT),
			VerificationOutcome::Rejected(Rejection::SignatureInvalid)
		);
	}

	let rogue_verifier = SignatureVerifier::from_key_text(&fixture("rogue_public.pem"))
		.expect("Rogue PEM fixture should load.");

	let rogue_headers = headers(&rogue, SIGNED_AT_RAW);

	assert!(verify_at(&rogue_verifier, &rogue_headers, &payload, SIGNED_AT).is_accepted());
}

#[test]
fn reserialized_bodies_do_not_verify() {
	let verifier = SignatureVerifier::new(partner_key());
	let headers = headers(&fixture("order_event.sig"), SIGNED_AT_RAW);
	let original = order_event();
	let value: serde_json::Value =
		serde_json::from_slice(&original).expect("Fixture payload should be JSON.");
	let pretty = serde_json::to_vec_pretty(&value).expect("JSON should serialize.");
	let mut trailing_newline = original.clone();

	trailing_newline.push(b'\n');

	for payload in [pretty, trailing_newline] {
		assert_eq!(
			verify_at(&verifier, &headers, &payload, SIGNED_AT),
			VerificationOutcome::Rejected(Rejection::SignatureInvalid)
		);
	}
}

#[test]
fn missing_headers_are_client_errors() {
	let verifier = SignatureVerifier::new(partner_key());
	let mut headers = headers(&fixture("order_event.sig"), SIGNED_AT_RAW);

	headers.remove(TIMESTAMP_HEADER);

	let outcome = verify_at(&verifier, &headers, &order_event(), SIGNED_AT);

	assert_eq!(
		outcome,
		VerificationOutcome::Rejected(Rejection::MissingField(HeaderField::Timestamp))
	);
	assert_eq!(outcome.into_result().map_err(Rejection::http_status), Err(400));
}

#[test]
fn concurrent_verifications_share_one_verifier() {
	let clock = ManualClock::new(SIGNED_AT);
	let verifier = Arc::new(SignatureVerifier::new(partner_key()).with_clock(Arc::new(clock)));
	let signature = fixture("order_event.sig");
	let payload = order_event();
	let workers = (0..8)
		.map(|i| {
			let verifier = verifier.clone();
			let signature = signature.trim().to_owned();
			let mut payload = payload.clone();

			std::thread::spawn(move || {
				if i % 2 == 1 {
					payload[0] = b' ';
				}

				let request =
					VerificationRequest::new(Some(&signature), Some(SIGNED_AT_RAW), &payload);

				(i, verifier.verify_now(&request))
			})
		})
		.collect::<Vec<_>>();

	for worker in workers {
		let (i, outcome) = worker.join().expect("Verification thread should not panic.");

		assert_eq!(outcome.is_accepted(), i % 2 == 0, "worker {i}");
	}
}

#[test]
fn broken_key_material_is_a_server_error() {
	let err = SignatureVerifier::from_key_text(
		"-----BEGIN PUBLIC KEY-----\nnot a key\n-----END PUBLIC KEY-----",
	)
	.expect_err("Garbage key text must not load.");

	assert!(matches!(err, Error::Key(KeyError::Base64 { .. })));
	assert!(matches!(&err, Error::Key(key) if key.http_status() == 500));
	assert!(PublicKeyMaterial::from_pem(&fixture("partner_public.pem")).is_ok());
}
