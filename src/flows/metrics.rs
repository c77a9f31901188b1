// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for network refreshes performed by one manager.
///
/// Cache hits are not counted; every attempt corresponds to exactly one
/// [`CredentialSource::acquire`](crate::flows::CredentialSource::acquire) call.
#[derive(Debug, Default)]
pub struct RefreshMetrics {
	attempts: AtomicU64,
	success: AtomicU64,
	failure: AtomicU64,
	stale_served: AtomicU64,
}
impl RefreshMetrics {
	/// Returns the total number of refresh attempts.
	pub fn attempts(&self) -> u64 {
		self.attempts.load(Ordering::Relaxed)
	}

	/// Returns the number of refreshes that stored a new credential.
	pub fn successes(&self) -> u64 {
		self.success.load(Ordering::Relaxed)
	}

	/// Returns the number of failed refreshes.
	pub fn failures(&self) -> u64 {
		self.failure.load(Ordering::Relaxed)
	}

	/// Returns how often a previous credential was served after a failed refresh.
	pub fn stale_served(&self) -> u64 {
		self.stale_served.load(Ordering::Relaxed)
	}

	pub(crate) fn record_attempt(&self) {
		self.attempts.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_success(&self) {
		self.success.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failure.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_stale_served(&self) {
		self.stale_served.fetch_add(1, Ordering::Relaxed);
	}
}
