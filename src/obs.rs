//! Optional observability helpers for credential flows and webhook verification.
//!
//! # Feature Flags
//!
//! - `tracing` (default): spans named `partner_auth.flow` with `flow` and `stage` fields, plus
//!   structured events for acquisitions, retries, refresh failures, and webhook rejections.
//!   Token values and webhook payloads are never recorded; payloads appear only as SHA-256
//!   fingerprints.
//! - `metrics`: counters `partner_auth_flow_total{flow,outcome}` and
//!   `partner_auth_webhook_total{outcome}`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Operations observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Single client-credentials exchange including its retries.
	TokenAcquisition,
	/// Refresh triggered by a caller asking for a valid token.
	ForegroundRefresh,
	/// Refresh triggered by the background scheduler.
	BackgroundRefresh,
	/// Inbound webhook signature check.
	WebhookVerification,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::TokenAcquisition => "token_acquisition",
			FlowKind::ForegroundRefresh => "foreground_refresh",
			FlowKind::BackgroundRefresh => "background_refresh",
			FlowKind::WebhookVerification => "webhook_verification",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to an operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated or logged.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
