//! Refresh and retry policies; process-wide and read-only once a manager is built.

// crates.io
use rand::Rng;
// self
use crate::_prelude::*;

/// What [`get_valid_token`](crate::flows::CredentialLifecycleManager::get_valid_token) does
/// when a refresh fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshFailurePolicy {
	/// Return the refresh error to the caller.
	#[default]
	Propagate,
	/// Hand back the previously issued credential as-is, even if it already expired, and let
	/// the partner API reject it. Only applies once a credential has been issued.
	ServeStale,
}

/// Bounded exponential backoff for transient token endpoint failures.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
	/// Retries after the first attempt; `0` disables retrying.
	pub max_retries: u32,
	/// Delay before the first retry; doubles for each further retry.
	pub base_delay: Duration,
	/// Upper bound for any single delay, including server `Retry-After` hints.
	pub max_delay: Duration,
	/// Spreads each delay uniformly over `[delay / 2, delay]`.
	pub jitter: bool,
}
impl RetryPolicy {
	/// Policy that never retries.
	pub fn none() -> Self {
		Self { max_retries: 0, ..Self::default() }
	}

	/// Overrides the retry budget.
	pub fn with_max_retries(mut self, max_retries: u32) -> Self {
		self.max_retries = max_retries;

		self
	}

	/// Overrides the base delay; negative values clamp to zero.
	pub fn with_base_delay(mut self, delay: Duration) -> Self {
		self.base_delay = delay.max(Duration::ZERO);

		self
	}

	/// Overrides the delay cap; negative values clamp to zero.
	pub fn with_max_delay(mut self, delay: Duration) -> Self {
		self.max_delay = delay.max(Duration::ZERO);

		self
	}

	/// Enables or disables jitter.
	pub fn with_jitter(mut self, jitter: bool) -> Self {
		self.jitter = jitter;

		self
	}

	/// Delay before retry number `retry` (zero-based), honoring a `Retry-After` hint.
	pub fn delay_for(&self, retry: u32, retry_after: Option<Duration>) -> Duration {
		let cap = self.max_delay.max(Duration::ZERO);
		let factor = 2_i32.checked_pow(retry).unwrap_or(i32::MAX);
		let mut delay =
			self.base_delay.max(Duration::ZERO).checked_mul(factor).unwrap_or(cap).min(cap);

		if self.jitter {
			delay = jittered(delay);
		}
		if let Some(hint) = retry_after {
			delay = delay.max(hint.min(cap));
		}

		delay
	}
}
impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			max_retries: 3,
			base_delay: Duration::milliseconds(500),
			max_delay: Duration::seconds(30),
			jitter: true,
		}
	}
}

/// Timing rules for keeping the cached credential fresh.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshPolicy {
	/// Minimum remaining lifetime of any credential handed to a caller.
	pub refresh_buffer: Duration,
	/// Background wait used while no credential exists or after a failed refresh.
	pub background_interval: Duration,
	/// Backoff applied to each acquisition.
	pub retry: RetryPolicy,
	/// Foreground behavior after a failed refresh.
	pub on_failure: RefreshFailurePolicy,
}
impl RefreshPolicy {
	/// Overrides the refresh buffer; negative values clamp to zero.
	pub fn with_refresh_buffer(mut self, buffer: Duration) -> Self {
		self.refresh_buffer = buffer.max(Duration::ZERO);

		self
	}

	/// Overrides the background interval; values under one second clamp to one second.
	pub fn with_background_interval(mut self, interval: Duration) -> Self {
		self.background_interval = interval.max(Duration::SECOND);

		self
	}

	/// Overrides the retry policy.
	pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
		self.retry = retry;

		self
	}

	/// Overrides the failure policy.
	pub fn with_on_failure(mut self, on_failure: RefreshFailurePolicy) -> Self {
		self.on_failure = on_failure;

		self
	}
}
impl Default for RefreshPolicy {
	fn default() -> Self {
		Self {
			refresh_buffer: Duration::minutes(2),
			background_interval: Duration::seconds(30),
			retry: RetryPolicy::default(),
			on_failure: RefreshFailurePolicy::default(),
		}
	}
}

fn jittered(delay: Duration) -> Duration {
	let millis = i64::try_from(delay.whole_milliseconds()).unwrap_or(i64::MAX);

	if millis <= 1 {
		return delay;
	}

	Duration::milliseconds(rand::rng().random_range(millis / 2..=millis))
}
