// ABOUTME: Property tests for the bounded readiness poller.
// ABOUTME: Runs on a paused current-thread runtime so virtual time stays deterministic.

use proptest::prelude::*;
use stackup::readiness::wait_until_ready;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::time::Instant;

fn paused_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .unwrap()
}

proptest! {
    #[test]
    fn never_ready_returns_within_timeout_plus_interval(
        timeout_ms in 0u64..20_000,
        poll_ms in 10u64..5_000,
    ) {
        let timeout = Duration::from_millis(timeout_ms);
        let poll = Duration::from_millis(poll_ms);

        let elapsed = paused_runtime().block_on(async {
            let started = Instant::now();
            let err = wait_until_ready(|| async { false }, timeout, poll)
                .await
                .unwrap_err();
            assert!(err.attempts >= 1);
            started.elapsed()
        });

        prop_assert!(elapsed >= timeout);
        prop_assert!(elapsed <= timeout + poll);
    }

    #[test]
    fn hanging_check_returns_within_timeout_plus_interval(
        timeout_ms in 0u64..20_000,
        poll_ms in 10u64..5_000,
    ) {
        let timeout = Duration::from_millis(timeout_ms);
        let poll = Duration::from_millis(poll_ms);

        let elapsed = paused_runtime().block_on(async {
            let started = Instant::now();
            let _ = wait_until_ready(std::future::pending::<bool>, timeout, poll).await;
            started.elapsed()
        });

        prop_assert!(elapsed <= timeout + poll);
    }

    #[test]
    fn stops_at_first_success(ready_at in 1u32..20) {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let success = paused_runtime().block_on(async move {
            wait_until_ready(
                move || {
                    let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                    async move { n >= ready_at }
                },
                Duration::from_secs(3600),
                Duration::from_secs(1),
            )
            .await
            .unwrap()
        });

        prop_assert_eq!(success.attempts, ready_at);
        prop_assert_eq!(calls.load(Ordering::SeqCst), ready_at);
    }
}
