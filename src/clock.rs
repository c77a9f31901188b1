//! Injectable time sources for expiry checks, replay windows, and scheduled refreshes.
//!
//! Every component that reads "now" or waits for an instant goes through [`Clock`], so tests
//! can swap [`SystemClock`] for a manually driven clock (`ManualClock`, enabled via `cfg(test)`
//! or the `test` crate feature) and drive background refreshes by advancing time explicitly
//! instead of sleeping.

// crates.io
#[cfg(any(test, feature = "test"))] use tokio::sync::watch;
// self
use crate::_prelude::*;

/// Boxed future returned by [`Clock::sleep`].
pub type ClockSleep<'a> = Pin<Box<dyn Future<Output = ()> + 'a + Send>>;

/// Source of the current instant and of timed waits.
pub trait Clock
where
	Self: Send + Sync,
{
	/// Returns the current UTC instant.
	fn now(&self) -> OffsetDateTime;

	/// Waits until `duration` has elapsed on this clock. Non-positive durations resolve
	/// immediately.
	///
	/// Implementations must fix the deadline when `sleep` is called, not when the future is
	/// first polled.
	fn sleep(&self, duration: Duration) -> ClockSleep<'_>;
}

/// Wall clock backed by [`OffsetDateTime::now_utc`] and tokio timers.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;
impl Clock for SystemClock {
	fn now(&self) -> OffsetDateTime {
		OffsetDateTime::now_utc()
	}

	fn sleep(&self, duration: Duration) -> ClockSleep<'_> {
		let wait = std::time::Duration::try_from(duration).unwrap_or_default();

		Box::pin(tokio::time::sleep(wait))
	}
}

/// Manually driven clock; sleepers wake only when [`ManualClock::advance`] or
/// [`ManualClock::set`] moves time past their deadline.
#[cfg(any(test, feature = "test"))]
#[derive(Clone, Debug)]
pub struct ManualClock(Arc<watch::Sender<OffsetDateTime>>);
#[cfg(any(test, feature = "test"))]
impl ManualClock {
	/// Creates a clock frozen at `start`.
	pub fn new(start: OffsetDateTime) -> Self {
		Self(Arc::new(watch::Sender::new(start)))
	}

	/// Moves the clock forward by `delta`, waking every sleeper whose deadline passed.
	pub fn advance(&self, delta: Duration) {
		self.0.send_modify(|now| *now += delta);
	}

	/// Jumps the clock to `instant`.
	pub fn set(&self, instant: OffsetDateTime) {
		self.0.send_replace(instant);
	}

	/// Number of [`Clock::sleep`] futures currently waiting on this clock.
	pub fn pending_sleepers(&self) -> usize {
		self.0.receiver_count()
	}
}
#[cfg(any(test, feature = "test"))]
impl Clock for ManualClock {
	fn now(&self) -> OffsetDateTime {
		*self.0.borrow()
	}

	fn sleep(&self, duration: Duration) -> ClockSleep<'_> {
		let deadline = self.now() + duration;
		let mut rx = self.0.subscribe();

		Box::pin(async move {
			// The sender lives as long as `self`, so the wait only ends on a deadline match.
			let _ = rx.wait_for(|now| *now >= deadline).await;
		})
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros::datetime;
	// self
	use super::*;

	#[tokio::test]
	async fn manual_clock_wakes_sleepers_after_deadline() {
		let clock = ManualClock::new(datetime!(2025-07-01 00:00:00 UTC));
		let mut sleeper = clock.sleep(Duration::seconds(30));

		assert_eq!(clock.pending_sleepers(), 1);

		clock.advance(Duration::seconds(29));

		assert!(
			tokio::time::timeout(std::time::Duration::from_millis(20), &mut sleeper)
				.await
				.is_err(),
			"Sleeper must not wake before its deadline."
		);

		clock.advance(Duration::seconds(1));
		sleeper.await;

		assert_eq!(clock.now(), datetime!(2025-07-01 00:00:30 UTC));
		assert_eq!(clock.pending_sleepers(), 0);
	}

	#[tokio::test]
	async fn non_positive_sleep_resolves_immediately() {
		let clock = ManualClock::new(datetime!(2025-07-01 00:00:00 UTC));

		clock.sleep(Duration::ZERO).await;
		clock.sleep(Duration::seconds(-5)).await;
		SystemClock.sleep(Duration::seconds(-1)).await;
	}
}
