mod common;

// std
use std::sync::Arc;
// crates.io
use httpmock::prelude::*;
use time::{Duration, macros::datetime};
// self
use common::*;
use partner_auth::{
	clock::{Clock, ManualClock},
	flows::{CredentialLifecycleManager, RefreshFailurePolicy, RefreshPolicy},
	store::{CredentialStore, MemoryStore},
};

fn build_manager(
	server: &MockServer,
	clock: &ManualClock,
	policy: RefreshPolicy,
) -> (CredentialLifecycleManager, Arc<MemoryStore>) {
	let store = Arc::new(MemoryStore::default());
	let acquirer = build_test_acquirer(server, Arc::new(clock.clone()));
	let manager = CredentialLifecycleManager::new(Arc::new(acquirer), store.clone(), policy)
		.with_clock(Arc::new(clock.clone()));

	(manager, store)
}

#[tokio::test]
async fn issued_token_is_reused_until_the_buffer() {
	let server = MockServer::start_async().await;
	let clock = ManualClock::new(datetime!(2025-07-01 00:00:00 UTC));
	let (manager, store) = build_manager(&server, &clock, RefreshPolicy::default());
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200)
				.header("content-type", "application/json")
				.body(token_body("tok", 3600));
		})
		.await;
	let first = manager.get_valid_token().await.expect("Initial acquisition should succeed.");
	let second = manager.get_valid_token().await.expect("Cached token should be served.");

	mock.assert_calls_async(1).await;

	assert_eq!(first.token(), "tok");
	assert_eq!(second, first);
	assert_eq!(first.expires_at, clock.now() + Duration::seconds(3600));
	assert_eq!(store.load().as_ref(), Some(&first));

	// Default buffer is two minutes: 57m59s in, the token still has 2m01s left.
	clock.advance(Duration::minutes(57) + Duration::seconds(59));
	manager.get_valid_token().await.expect("Token outside the buffer should be served.");
	mock.assert_calls_async(1).await;

	clock.advance(Duration::seconds(1));
	manager.get_valid_token().await.expect("Token inside the buffer should be refreshed.");
	manager.get_valid_token().await.expect("Refreshed token should be served.");
	mock.assert_calls_async(2).await;

	assert_eq!(manager.refresh_metrics.attempts(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_callers_trigger_a_single_acquisition() {
	let server = MockServer::start_async().await;
	let clock = ManualClock::new(datetime!(2025-07-01 00:00:00 UTC));
	let (manager, _store) = build_manager(&server, &clock, RefreshPolicy::default());
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200)
				.header("content-type", "application/json")
				.delay(std::time::Duration::from_millis(50))
				.body(token_body("shared", 3600));
		})
		.await;
	let callers = (0..32)
		.map(|_| {
			let manager = manager.clone();

			tokio::spawn(async move { manager.get_valid_token().await })
		})
		.collect::<Vec<_>>();

	for caller in callers {
		let credential = caller
			.await
			.expect("Caller task should not panic.")
			.expect("Every caller should receive a token.");

		assert_eq!(credential.token(), "shared");
	}

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn failed_refresh_propagates_or_serves_stale_per_policy() {
	let server = MockServer::start_async().await;
	let clock = ManualClock::new(datetime!(2025-07-01 00:00:00 UTC));
	let (strict, strict_store) = build_manager(&server, &clock, RefreshPolicy::default());
	let (lenient, lenient_store) = build_manager(
		&server,
		&clock,
		RefreshPolicy::default().with_on_failure(RefreshFailurePolicy::ServeStale),
	);
	let mut ok = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200)
				.header("content-type", "application/json")
				.body(token_body("first", 600));
		})
		.await;

	strict.get_valid_token().await.expect("Initial acquisition should succeed.");
	lenient.get_valid_token().await.expect("Initial acquisition should succeed.");
	ok.delete_async().await;

	let failing = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(401).body(r#"{"error":"invalid_client"}"#);
		})
		.await;

	clock.advance(Duration::minutes(15));

	strict.get_valid_token().await.expect_err("Strict managers surface refresh failures.");

	let stale = lenient.get_valid_token().await.expect("Lenient managers serve the old token.");

	assert_eq!(stale.token(), "first");
	assert!(stale.is_expired_at(clock.now()));
	assert_eq!(lenient.refresh_metrics.stale_served(), 1);
	assert_eq!(strict_store.load().map(|c| c.token().to_owned()).as_deref(), Some("first"));
	assert_eq!(lenient_store.load().map(|c| c.token().to_owned()).as_deref(), Some("first"));

	failing.assert_calls_async(2).await;
}

#[tokio::test]
async fn background_task_refreshes_ahead_of_expiry() {
	let server = MockServer::start_async().await;
	let clock = ManualClock::new(datetime!(2025-07-01 00:00:00 UTC));
	let policy = RefreshPolicy::default().with_refresh_buffer(Duration::minutes(1));
	let (manager, _store) = build_manager(&server, &clock, policy);
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200)
				.header("content-type", "application/json")
				.body(token_body("background", 300));
		})
		.await;
	let handle = manager.spawn_background_refresh();

	wait_until(|| manager.cached().is_some()).await;
	mock.assert_calls_async(1).await;

	// Due at 4 minutes: expiry 5m minus the 1m buffer.
	wait_until(|| clock.pending_sleepers() > 0).await;
	clock.advance(Duration::minutes(4));
	wait_until(|| manager.refresh_metrics.successes() == 2).await;
	mock.assert_calls_async(2).await;

	handle.shutdown().await;

	assert_eq!(manager.refresh_metrics.failures(), 0);
}

async fn wait_until(mut ready: impl FnMut() -> bool) {
	for _ in 0..500 {
		if ready() {
			return;
		}

		tokio::time::sleep(std::time::Duration::from_millis(10)).await;
	}

	panic!("Condition was not met within five seconds.");
}
