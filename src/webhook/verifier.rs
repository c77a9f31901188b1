//! Replay-guarded RSA-PSS signature verification for partner webhooks.

// crates.io
use base64::{Engine, engine::general_purpose::STANDARD};
use time::{PrimitiveDateTime, format_description::well_known::Iso8601};
// self
use crate::{
	_prelude::*,
	clock::{Clock, SystemClock},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	webhook::{DigestBuilder, PublicKeyMaterial, payload_fingerprint},
};

/// Header a delivery was missing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HeaderField {
	/// `X-Event-Signature`.
	Signature,
	/// `X-Event-Timestamp`.
	Timestamp,
}
impl HeaderField {
	/// Canonical header name.
	pub const fn header_name(self) -> &'static str {
		match self {
			HeaderField::Signature => crate::webhook::SIGNATURE_HEADER,
			HeaderField::Timestamp => crate::webhook::TIMESTAMP_HEADER,
		}
	}
}
impl Display for HeaderField {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.header_name())
	}
}

/// Why a delivery was refused. Messages are safe to return to the sender.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ThisError)]
pub enum Rejection {
	/// A required header is absent or empty.
	#[error("Missing {0} header.")]
	MissingField(HeaderField),
	/// The signature is not valid base64.
	#[error("Signature is not valid base64.")]
	MalformedSignature,
	/// The timestamp is not an ISO-8601 instant.
	#[error("Timestamp is not a valid ISO-8601 instant.")]
	MalformedTimestamp,
	/// The timestamp is further in the past than the grace period allows.
	#[error("Timestamp is outside the accepted window.")]
	TimestampTooOld,
	/// The timestamp is further in the future than the grace period allows.
	#[error("Timestamp is outside the accepted window.")]
	TimestampTooNew,
	/// The signature does not verify against the partner key.
	#[error("Signature verification failed.")]
	SignatureInvalid,
}
impl Rejection {
	/// Stable label for logs and metrics.
	pub const fn label(self) -> &'static str {
		match self {
			Rejection::MissingField(HeaderField::Signature) => "missing_signature",
			Rejection::MissingField(HeaderField::Timestamp) => "missing_timestamp",
			Rejection::MalformedSignature => "malformed_signature",
			Rejection::MalformedTimestamp => "malformed_timestamp",
			Rejection::TimestampTooOld => "timestamp_too_old",
			Rejection::TimestampTooNew => "timestamp_too_new",
			Rejection::SignatureInvalid => "signature_invalid",
		}
	}

	/// Client-error status for the webhook response: 400 for unreadable requests, 401 for
	/// requests that fail authentication.
	pub const fn http_status(self) -> u16 {
		match self {
			Rejection::MissingField(_)
			| Rejection::MalformedSignature
			| Rejection::MalformedTimestamp => 400,
			Rejection::TimestampTooOld
			| Rejection::TimestampTooNew
			| Rejection::SignatureInvalid => 401,
		}
	}
}

/// Result of [`SignatureVerifier::verify`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VerificationOutcome {
	/// The payload is authentic and fresh.
	Accepted,
	/// The payload must not be processed.
	Rejected(Rejection),
}
impl VerificationOutcome {
	/// Returns `true` for [`VerificationOutcome::Accepted`].
	pub fn is_accepted(&self) -> bool {
		matches!(self, VerificationOutcome::Accepted)
	}

	/// Converts into a `Result` so handlers can use `?`.
	pub fn into_result(self) -> Result<(), Rejection> {
		match self {
			VerificationOutcome::Accepted => Ok(()),
			VerificationOutcome::Rejected(rejection) => Err(rejection),
		}
	}
}

/// One delivery as seen by the verifier: raw header values and the untouched body.
#[derive(Clone, Copy, Debug)]
pub struct VerificationRequest<'a> {
	/// `X-Event-Signature` value.
	pub signature: Option<&'a str>,
	/// `X-Event-Timestamp` value, exactly as received.
	pub timestamp: Option<&'a str>,
	/// Request body bytes, exactly as received.
	pub payload: &'a [u8],
}
impl<'a> VerificationRequest<'a> {
	/// Bundles header values and body.
	pub fn new(signature: Option<&'a str>, timestamp: Option<&'a str>, payload: &'a [u8]) -> Self {
		Self { signature, timestamp, payload }
	}
}

/// Stateless webhook verifier; share it freely between request handlers.
#[derive(Clone)]
pub struct SignatureVerifier {
	key: Arc<PublicKeyMaterial>,
	grace_period: Duration,
	clock: Arc<dyn Clock>,
}
impl SignatureVerifier {
	/// Replay window applied unless overridden.
	pub const DEFAULT_GRACE_PERIOD: Duration = Duration::minutes(5);

	/// Creates a verifier for `key` with the default grace period and the system clock.
	pub fn new(key: PublicKeyMaterial) -> Self {
		Self {
			key: Arc::new(key),
			grace_period: Self::DEFAULT_GRACE_PERIOD,
			clock: Arc::new(SystemClock),
		}
	}

	/// Loads the key from base64 SPKI or PEM text.
	pub fn from_key_text(text: &str) -> Result<Self> {
		Ok(Self::new(text.parse()?))
	}

	/// Overrides the replay window; negative values clamp to zero.
	pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
		self.grace_period = grace_period.max(Duration::ZERO);

		self
	}

	/// Replaces the clock consulted by [`SignatureVerifier::verify_now`].
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;

		self
	}

	/// Replay window in effect.
	pub fn grace_period(&self) -> Duration {
		self.grace_period
	}

	/// Verifies `request` against the verifier's clock.
	pub fn verify_now(&self, request: &VerificationRequest<'_>) -> VerificationOutcome {
		self.verify(request, self.clock.now())
	}

	/// Verifies `request` as of `now`.
	///
	/// Header presence, signature encoding, and timestamp format are checked first, then the
	/// replay window (a timestamp exactly `grace_period` away is still accepted), and finally
	/// the signature over the raw timestamp and raw body. Every cryptographic failure collapses
	/// into [`Rejection::SignatureInvalid`]; the underlying detail only reaches the logs.
	pub fn verify(
		&self,
		request: &VerificationRequest<'_>,
		now: OffsetDateTime,
	) -> VerificationOutcome {
		const KIND: FlowKind = FlowKind::WebhookVerification;

		let _guard = FlowSpan::new(KIND, "verify").entered();

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let fingerprint = payload_fingerprint(request.payload);

		match self.check(request, now) {
			Ok(()) => {
				obs::webhook_accepted(&fingerprint);
				obs::record_verification("accepted");
				obs::record_flow_outcome(KIND, FlowOutcome::Success);

				VerificationOutcome::Accepted
			},
			Err((rejection, detail)) => {
				obs::webhook_rejected(rejection.label(), &detail, &fingerprint);
				obs::record_verification(rejection.label());
				obs::record_flow_outcome(KIND, FlowOutcome::Failure);

				VerificationOutcome::Rejected(rejection)
			},
		}
	}

	fn check(
		&self,
		request: &VerificationRequest<'_>,
		now: OffsetDateTime,
	) -> Result<(), (Rejection, String)> {
		let signature = present(request.signature, HeaderField::Signature)?;
		let timestamp_raw = present(request.timestamp, HeaderField::Timestamp)?;
		let signature = STANDARD
			.decode(signature.trim())
			.map_err(|err| (Rejection::MalformedSignature, err.to_string()))?;
		let timestamp = parse_timestamp(timestamp_raw)
			.map_err(|err| (Rejection::MalformedTimestamp, err.to_string()))?;
		let delta = now - timestamp;

		if delta > self.grace_period {
			return Err((Rejection::TimestampTooOld, format!("timestamp is {delta} old")));
		}
		if delta < -self.grace_period {
			return Err((Rejection::TimestampTooNew, format!("timestamp is {} ahead", -delta)));
		}

		let message = DigestBuilder::build(timestamp_raw, request.payload);

		self.key.verify_pss_sha256(&message, &signature).map_err(|_| {
			(
				Rejection::SignatureInvalid,
				format!(
					"RSA-PSS/SHA-256 check failed for a {}-byte signature against a {}-bit key",
					signature.len(),
					self.key.modulus_bits()
				),
			)
		})
	}
}
impl Debug for SignatureVerifier {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SignatureVerifier")
			.field("key", &self.key)
			.field("grace_period", &self.grace_period)
			.finish()
	}
}

fn present(value: Option<&str>, field: HeaderField) -> Result<&str, (Rejection, String)> {
	value
		.filter(|raw| !raw.trim().is_empty())
		.ok_or_else(|| (Rejection::MissingField(field), format!("{field} is absent or empty")))
}

/// ISO-8601 with an offset, or without one and then taken as UTC.
fn parse_timestamp(raw: &str) -> Result<OffsetDateTime, time::error::Parse> {
	OffsetDateTime::parse(raw, &Iso8601::DEFAULT).or_else(|err| {
		PrimitiveDateTime::parse(raw, &Iso8601::DEFAULT)
			.map(PrimitiveDateTime::assume_utc)
			.map_err(|_| err)
	})
}
