//! Retry / degrade policy (spec.md §4.3).
//!
//! Grounded on the teacher's tool-loop iteration pattern in
//! `crates/gateway/src/runtime/turn.rs` (`for loop_idx in 0..MAX_TOOL_LOOPS`),
//! generalized into an explicit exponential backoff sleep between attempts.

use std::future::Future;
use std::time::Duration;

use mi_domain::model::DegradeMode;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_ms: u64,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff_ms: u64) -> Self {
        Self { max_attempts, backoff_ms }
    }

    fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let millis = self.backoff_ms.saturating_mul(1u64 << (attempt.saturating_sub(1)).min(32));
        Duration::from_millis(millis)
    }
}

/// Outcome of a retried operation: how many attempts it took, and whether
/// it ultimately succeeded.
pub struct RetryOutcome<T, E> {
    pub attempts: u32,
    pub result: Result<T, E>,
}

/// Run `op` up to `policy.max_attempts` times, sleeping
/// `backoff_ms * 2^(attempt-1)` between failures. `on_retry` is invoked
/// after each failed attempt that will be retried (attempt number, 1-based)
/// so the caller can emit a `retry` event / WorkflowEvent.
pub async fn with_retry<T, E, F, Fut, R>(policy: RetryPolicy, mut op: F, mut on_retry: R) -> RetryOutcome<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: FnMut(u32),
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => {
                return RetryOutcome {
                    attempts: attempt,
                    result: Ok(value),
                };
            }
            Err(err) => {
                if attempt >= policy.max_attempts {
                    return RetryOutcome {
                        attempts: attempt,
                        result: Err(err),
                    };
                }
                on_retry(attempt);
                tokio::time::sleep(policy.backoff_for_attempt(attempt)).await;
            }
        }
    }
}

/// What a stage should do once retries are exhausted, per §4.3.
pub enum DegradeOutcome {
    /// Continue the run; the stage is marked degraded (gather) or the
    /// caller decides failed for terminal stages.
    Partial,
    /// Skip the stage entirely and proceed.
    Skip,
    /// Fail the whole session; do not emit `orchestrator_end`.
    Fail,
}

pub fn degrade_outcome(mode: DegradeMode) -> DegradeOutcome {
    match mode {
        DegradeMode::Partial => DegradeOutcome::Partial,
        DegradeMode::Skip => DegradeOutcome::Skip,
        DegradeMode::Fail => DegradeOutcome::Fail,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn succeeds_on_first_attempt_without_sleeping() {
        let policy = RetryPolicy::new(3, 10);
        let calls = AtomicU32::new(0);
        let mut retries_seen = 0;

        let outcome = with_retry(
            policy,
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, &str>(42) }
            },
            |_| retries_seen += 1,
        )
        .await;

        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.result, Ok(42));
        assert_eq!(retries_seen, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_up_to_max_attempts_then_gives_up() {
        let policy = RetryPolicy::new(3, 10);
        let calls = AtomicU32::new(0);
        let mut retries_seen = Vec::new();

        let outcome = with_retry(
            policy,
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<i32, _>("boom") }
            },
            |attempt| retries_seen.push(attempt),
        )
        .await;

        assert_eq!(outcome.attempts, 3);
        assert_eq!(outcome.result, Err("boom"));
        assert_eq!(retries_seen, vec![1, 2]);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_transient_failures() {
        let policy = RetryPolicy::new(5, 5);
        let calls = AtomicU32::new(0);

        let outcome = with_retry(
            policy,
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err::<i32, _>("transient")
                    } else {
                        Ok(99)
                    }
                }
            },
            |_| {},
        )
        .await;

        assert_eq!(outcome.attempts, 3);
        assert_eq!(outcome.result, Ok(99));
    }

    #[test]
    fn backoff_grows_exponentially() {
        let policy = RetryPolicy::new(5, 100);
        assert_eq!(policy.backoff_for_attempt(1), Duration::from_millis(100));
        assert_eq!(policy.backoff_for_attempt(2), Duration::from_millis(200));
        assert_eq!(policy.backoff_for_attempt(3), Duration::from_millis(400));
    }

    #[test]
    fn degrade_outcome_maps_modes() {
        assert!(matches!(degrade_outcome(DegradeMode::Partial), DegradeOutcome::Partial));
        assert!(matches!(degrade_outcome(DegradeMode::Skip), DegradeOutcome::Skip));
        assert!(matches!(degrade_outcome(DegradeMode::Fail), DegradeOutcome::Fail));
    }
}
