//! Pre-emptive refresh task tied to a [`CancellationToken`].

// crates.io
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
// self
use crate::{_prelude::*, flows::CredentialLifecycleManager, obs::FlowKind};

/// Handle to a running background refresh task.
///
/// Dropping the handle cancels the task without waiting for it; call
/// [`BackgroundRefresh::shutdown`] to wait until an in-flight refresh has finished.
#[derive(Debug)]
pub struct BackgroundRefresh {
	shutdown: CancellationToken,
	task: Option<JoinHandle<()>>,
}
impl BackgroundRefresh {
	/// Token that stops the task when cancelled; child tokens may be handed elsewhere.
	pub fn cancellation_token(&self) -> &CancellationToken {
		&self.shutdown
	}

	/// Returns `true` once the task has exited.
	pub fn is_finished(&self) -> bool {
		self.task.as_ref().is_none_or(JoinHandle::is_finished)
	}

	/// Stops the task and waits for it. A refresh already in progress runs to completion.
	pub async fn shutdown(mut self) {
		self.shutdown.cancel();

		if let Some(task) = self.task.take()
			&& let Err(err) = task.await
			&& err.is_panic()
		{
			std::panic::resume_unwind(err.into_panic());
		}
	}
}
impl Drop for BackgroundRefresh {
	fn drop(&mut self) {
		self.shutdown.cancel();
	}
}

impl CredentialLifecycleManager {
	/// Spawns [`run_background_refresh`](Self::run_background_refresh) on the current tokio
	/// runtime.
	pub fn spawn_background_refresh(&self) -> BackgroundRefresh {
		let shutdown = CancellationToken::new();
		let manager = self.clone();
		let token = shutdown.clone();
		let task = tokio::spawn(async move { manager.run_background_refresh(token).await });

		BackgroundRefresh { shutdown, task: Some(task) }
	}

	/// Keeps the cached credential fresh until `shutdown` is cancelled.
	///
	/// Each cycle refreshes if the credential is missing or due, then sleeps until the next
	/// credential enters the refresh buffer. While no credential exists, after a failed refresh,
	/// or when a new credential is already inside the buffer, it sleeps for
	/// [`RefreshPolicy::background_interval`](crate::flows::RefreshPolicy::background_interval)
	/// instead. Failures are logged and never end the loop.
	pub async fn run_background_refresh(&self, shutdown: CancellationToken) {
		while !shutdown.is_cancelled() {
			let refreshed = self.refresh_if_due_as(FlowKind::BackgroundRefresh).await;
			let wait = self.next_background_wait(refreshed.is_ok());

			tokio::select! {
				biased;
				_ = shutdown.cancelled() => break,
				_ = self.clock.sleep(wait) => {},
			}
		}
	}

	fn next_background_wait(&self, last_succeeded: bool) -> Duration {
		let interval = self.policy.background_interval;

		if !last_succeeded {
			return interval;
		}

		match self.cached() {
			Some(credential) => {
				let wait = credential.refresh_due_at(self.policy.refresh_buffer) - self.clock.now();

				if wait.is_positive() { wait } else { interval }
			},
			None => interval,
		}
	}
}
