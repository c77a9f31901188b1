//! "Give me a valid token" with singleflight refreshes.
//!
//! [`CredentialLifecycleManager`] answers from the [`CredentialStore`] while the cached
//! credential is fresh. Once it is missing or inside the refresh buffer, callers serialize on
//! one async mutex: the first performs the network refresh, later arrivals wait for it and then
//! take its outcome, success or failure, so a burst of callers costs one token endpoint call.

// std
use std::sync::atomic::{AtomicU64, Ordering};
// self
use crate::{
	_prelude::*,
	auth::Credential,
	clock::{Clock, SystemClock},
	flows::{CredentialSource, RefreshFailurePolicy, RefreshMetrics, RefreshPolicy},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	store::CredentialStore,
};

/// Owns the cached partner credential and every refresh of it.
///
/// Clones share the store, guard, and metrics, so one manager per process (or per partner)
/// can be handed to request handlers and to the background task alike.
#[derive(Clone)]
pub struct CredentialLifecycleManager {
	/// Shared counters for network refreshes.
	pub refresh_metrics: Arc<RefreshMetrics>,
	pub(crate) source: Arc<dyn CredentialSource>,
	pub(crate) store: Arc<dyn CredentialStore>,
	pub(crate) clock: Arc<dyn Clock>,
	pub(crate) policy: RefreshPolicy,
	// Holds the outcome of the latest network refresh.
	refresh_guard: Arc<AsyncMutex<Option<Result<Credential>>>>,
	// Completed network refreshes; bumped while `refresh_guard` is held.
	refresh_rounds: Arc<AtomicU64>,
}
impl CredentialLifecycleManager {
	/// Creates a manager on the system clock.
	pub fn new(
		source: Arc<dyn CredentialSource>,
		store: Arc<dyn CredentialStore>,
		policy: RefreshPolicy,
	) -> Self {
		Self {
			refresh_metrics: Default::default(),
			source,
			store,
			clock: Arc::new(SystemClock),
			policy,
			refresh_guard: Default::default(),
			refresh_rounds: Default::default(),
		}
	}

	/// Replaces the clock used for freshness checks and background waits.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;

		self
	}

	/// Policy in effect.
	pub fn policy(&self) -> &RefreshPolicy {
		&self.policy
	}

	/// Stored credential as-is, without checking freshness or refreshing.
	pub fn cached(&self) -> Option<Credential> {
		self.store.load().filter(|credential| !credential.is_empty())
	}

	/// Returns a credential valid for at least the refresh buffer, refreshing if needed.
	///
	/// Callers that queue behind a refresh in flight receive that refresh's outcome instead of
	/// starting another one. Refresh failures propagate unless the policy is
	/// [`RefreshFailurePolicy::ServeStale`] and a credential was issued before, in which case
	/// that credential is returned even if it already expired.
	pub async fn get_valid_token(&self) -> Result<Credential> {
		if let Some(credential) = self.fresh_credential() {
			return Ok(credential);
		}

		let observed_round = self.refresh_rounds.load(Ordering::Acquire);
		let mut last_outcome = self.refresh_guard.lock().await;
		let previous = self.store.load().filter(|credential| !credential.is_empty());

		if let Some(credential) = &previous
			&& !self.is_due(credential)
		{
			return Ok(credential.clone());
		}

		let settled_while_waiting = match &*last_outcome {
			Some(outcome) if self.refresh_rounds.load(Ordering::Acquire) != observed_round =>
				Some(outcome.clone()),
			_ => None,
		};
		let outcome = match settled_while_waiting {
			Some(outcome) => outcome,
			None => self.refresh_locked(FlowKind::ForegroundRefresh, &mut last_outcome).await,
		};

		match outcome {
			Ok(credential) => Ok(credential),
			Err(err) => match (self.policy.on_failure, previous) {
				(RefreshFailurePolicy::ServeStale, Some(stale)) => {
					obs::stale_credential_served(stale.expires_at);
					self.refresh_metrics.record_stale_served();

					Ok(stale)
				},
				_ => Err(err),
			},
		}
	}

	/// Acquires a new credential even if the cached one is still fresh.
	///
	/// Waits for any refresh already in flight first, then performs its own.
	pub async fn refresh(&self) -> Result<Credential> {
		let mut last_outcome = self.refresh_guard.lock().await;

		self.refresh_locked(FlowKind::ForegroundRefresh, &mut last_outcome).await
	}

	/// Refreshes only when the cached credential is missing or inside the refresh buffer.
	///
	/// Returns `Ok(None)` when no refresh was needed.
	pub async fn refresh_if_due(&self) -> Result<Option<Credential>> {
		self.refresh_if_due_as(FlowKind::ForegroundRefresh).await
	}

	pub(crate) async fn refresh_if_due_as(&self, kind: FlowKind) -> Result<Option<Credential>> {
		let mut last_outcome = self.refresh_guard.lock().await;

		if let Some(credential) = self.store.load()
			&& !credential.is_empty()
			&& !self.is_due(&credential)
		{
			return Ok(None);
		}

		self.refresh_locked(kind, &mut last_outcome).await.map(Some)
	}

	fn fresh_credential(&self) -> Option<Credential> {
		self.store.load().filter(|credential| !self.is_due(credential))
	}

	fn is_due(&self, credential: &Credential) -> bool {
		credential.needs_refresh_at(self.clock.now(), self.policy.refresh_buffer)
	}

	// `last_outcome` is the slot behind the held `refresh_guard`.
	async fn refresh_locked(
		&self,
		kind: FlowKind,
		last_outcome: &mut Option<Result<Credential>>,
	) -> Result<Credential> {
		let span = FlowSpan::new(kind, "refresh");

		obs::record_flow_outcome(kind, FlowOutcome::Attempt);
		self.refresh_metrics.record_attempt();

		let result = span.instrument(self.source.acquire()).await;

		match &result {
			Ok(credential) => {
				self.store.save(credential.clone());
				self.refresh_metrics.record_success();
				obs::record_flow_outcome(kind, FlowOutcome::Success);
			},
			Err(err) => {
				self.refresh_metrics.record_failure();
				obs::refresh_failed(kind, err);
				obs::record_flow_outcome(kind, FlowOutcome::Failure);
			},
		}

		*last_outcome = Some(result.clone());
		self.refresh_rounds.fetch_add(1, Ordering::Release);

		result
	}
}
impl Debug for CredentialLifecycleManager {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CredentialLifecycleManager")
			.field("policy", &self.policy)
			.field("refresh_metrics", &self.refresh_metrics)
			.finish()
	}
}
