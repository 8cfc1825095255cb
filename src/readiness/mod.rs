// ABOUTME: Bounded readiness polling and the concrete readiness checks.
// ABOUTME: wait_until_ready is the single retry primitive used for every service.

mod check;
mod exec;
mod http;

pub use check::{CheckFailure, ReadinessCheck};
pub use exec::{ExecCheck, RunningCheck};
pub use http::HttpCheck;

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Lower bound applied to the poll interval so a zero interval cannot spin.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A check reported ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadySuccess {
    pub attempts: u32,
    pub elapsed: Duration,
}

/// The check never reported ready within its timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("not ready after {attempts} attempt(s) in {:.1}s", secs(.elapsed))]
pub struct ReadinessTimeout {
    pub elapsed: Duration,
    pub attempts: u32,
}

fn secs(duration: &Duration) -> f64 {
    duration.as_secs_f64()
}

/// Poll `check` every `poll_interval` until it returns true or `timeout` elapses.
///
/// Returns on the first true result. Each call to `check` is bounded by the
/// time left (or one poll interval for the final attempt), so the function
/// returns within `timeout + poll_interval`. A single false result is never an
/// error; only exhaustion is.
pub async fn wait_until_ready<F, Fut>(
    mut check: F,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<ReadySuccess, ReadinessTimeout>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let poll_interval = poll_interval.max(MIN_POLL_INTERVAL);
    let started = Instant::now();
    let mut attempts = 0u32;

    loop {
        attempts += 1;

        let remaining = timeout.saturating_sub(started.elapsed());
        let budget = if remaining.is_zero() {
            poll_interval
        } else {
            remaining
        };

        let ready = tokio::time::timeout(budget, check())
            .await
            .unwrap_or(false);

        if ready {
            return Ok(ReadySuccess {
                attempts,
                elapsed: started.elapsed(),
            });
        }

        let elapsed = started.elapsed();
        if elapsed >= timeout {
            return Err(ReadinessTimeout { elapsed, attempts });
        }

        tracing::trace!("attempt {} not ready, retrying", attempts);
        tokio::time::sleep(poll_interval.min(timeout - elapsed)).await;
    }
}
