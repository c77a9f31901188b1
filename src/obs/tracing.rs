// self
use crate::{_prelude::*, obs::FlowKind};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedFlow<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedFlow<F> = F;

/// A span builder used by credential and webhook flows.
#[derive(Clone, Debug)]
pub struct FlowSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl FlowSpan {
	/// Creates a new span tagged with the provided flow kind + stage.
	pub fn new(kind: FlowKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("partner_auth.flow", flow = kind.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Enters the span for synchronous sections.
	pub fn entered(self) -> FlowSpanGuard {
		#[cfg(feature = "tracing")]
		{
			FlowSpanGuard { guard: self.span.entered() }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = self;

			FlowSpanGuard {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedFlow<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// RAII guard returned by [`FlowSpan::entered`].
pub struct FlowSpanGuard {
	#[cfg(feature = "tracing")]
	#[allow(dead_code)]
	guard: tracing::span::EnteredSpan,
}
impl Debug for FlowSpanGuard {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("FlowSpanGuard(..)")
	}
}

/// Logs a newly issued credential; only its timing is recorded.
pub fn token_acquired(expires_at: OffsetDateTime, attempts: u32) {
	#[cfg(feature = "tracing")]
	tracing::debug!(%expires_at, attempts, "Acquired partner access token.");

	#[cfg(not(feature = "tracing"))]
	let _ = (expires_at, attempts);
}

/// Logs a transient acquisition failure that is about to be retried.
pub fn acquisition_retry(retry: u32, delay: Duration, error: &Error) {
	#[cfg(feature = "tracing")]
	tracing::warn!(
		retry,
		delay_ms = delay.whole_milliseconds() as i64,
		error = %error,
		"Token endpoint failed transiently; retrying."
	);

	#[cfg(not(feature = "tracing"))]
	let _ = (retry, delay, error);
}

/// Logs a refresh that did not produce a credential; background failures log at `warn`
/// since the task retries on its own.
pub fn refresh_failed(kind: FlowKind, error: &Error) {
	#[cfg(feature = "tracing")]
	if matches!(kind, FlowKind::BackgroundRefresh) {
		tracing::warn!(flow = kind.as_str(), error = %error, "Partner token refresh failed.");
	} else {
		tracing::error!(flow = kind.as_str(), error = %error, "Partner token refresh failed.");
	}

	#[cfg(not(feature = "tracing"))]
	let _ = (kind, error);
}

/// Logs that a previously issued credential was handed out after a failed refresh.
pub fn stale_credential_served(expires_at: OffsetDateTime) {
	#[cfg(feature = "tracing")]
	tracing::warn!(%expires_at, "Serving previously issued partner token after refresh failure.");

	#[cfg(not(feature = "tracing"))]
	let _ = expires_at;
}

/// Logs an accepted webhook delivery.
pub fn webhook_accepted(fingerprint: &str) {
	#[cfg(feature = "tracing")]
	tracing::debug!(payload_sha256 = fingerprint, "Webhook signature accepted.");

	#[cfg(not(feature = "tracing"))]
	let _ = fingerprint;
}

/// Logs a rejected webhook delivery with its diagnostic detail.
pub fn webhook_rejected(reason: &'static str, detail: &str, fingerprint: &str) {
	#[cfg(feature = "tracing")]
	tracing::warn!(reason, detail, payload_sha256 = fingerprint, "Webhook signature rejected.");

	#[cfg(not(feature = "tracing"))]
	let _ = (reason, detail, fingerprint);
}
