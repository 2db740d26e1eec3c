//! Backoff for answers that mean "ask again shortly".
//!
//! GitHub answers `202 Accepted` on the contributor statistics endpoint while
//! it computes them in the background. The client polls with exponential
//! backoff until the data is ready. The aggregation engine itself never
//! retries: every other failure is reported to it as-is.

use std::future::Future;
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};

/// Delay before the first poll after a pending answer.
pub const FIRST_POLL_DELAY: Duration = Duration::from_secs(2);

/// Upper bound on the delay between polls.
pub const MAX_POLL_DELAY: Duration = Duration::from_secs(30);

/// Polls after the first request before giving up.
pub const MAX_POLLS: usize = 6;

/// How long to keep polling a pending resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    pub first_delay: Duration,
    pub max_delay: Duration,
    pub max_polls: usize,
    /// Spread concurrent pollers apart.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            first_delay: FIRST_POLL_DELAY,
            max_delay: MAX_POLL_DELAY,
            max_polls: MAX_POLLS,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// A fixed delay between polls, without jitter. Mostly for tests.
    #[must_use]
    pub fn fixed(delay: Duration, max_polls: usize) -> Self {
        Self {
            first_delay: delay,
            max_delay: delay,
            max_polls,
            jitter: false,
        }
    }

    fn backoff(&self) -> ExponentialBuilder {
        let builder = ExponentialBuilder::default()
            .with_min_delay(self.first_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_polls);

        if self.jitter {
            builder.with_jitter()
        } else {
            builder
        }
    }
}

/// Run `operation` until it succeeds, fails with an error `is_pending`
/// rejects, or the poll budget runs out.
///
/// `label` names the resource in debug logs (e.g. `acme/widget`).
pub async fn with_retry<T, E, F, Fut, P>(
    operation: F,
    is_pending: P,
    config: RetryConfig,
    label: &str,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::error::Error,
    P: Fn(&E) -> bool,
{
    operation
        .retry(config.backoff())
        .when(is_pending)
        .notify(|err, delay| {
            tracing::debug!(
                resource = %label,
                poll_in = ?delay,
                "Not ready yet: {}",
                crate::api::short_error_message(err)
            );
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug)]
    enum StatsError {
        Pending,
        Gone,
    }

    impl std::fmt::Display for StatsError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Self::Pending => f.write_str("statistics are being computed"),
                Self::Gone => f.write_str("repository gone"),
            }
        }
    }

    impl std::error::Error for StatsError {}

    fn pending(e: &StatsError) -> bool {
        matches!(e, StatsError::Pending)
    }

    /// An operation that answers `Pending` for the first `pending_for` calls.
    fn stats_after(
        pending_for: u32,
        calls: &Arc<AtomicU32>,
    ) -> impl FnMut() -> std::future::Ready<Result<&'static str, StatsError>> {
        let calls = Arc::clone(calls);
        move || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            std::future::ready(if n < pending_for {
                Err(StatsError::Pending)
            } else {
                Ok("stats")
            })
        }
    }

    #[test]
    fn test_default_budget() {
        let config = RetryConfig::default();
        assert_eq!(config.first_delay, FIRST_POLL_DELAY);
        assert_eq!(config.max_polls, MAX_POLLS);
        assert!(config.jitter);
        assert!(!RetryConfig::fixed(Duration::from_millis(5), 2).jitter);
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_until_ready() {
        let calls = Arc::new(AtomicU32::new(0));
        let result = with_retry(
            stats_after(2, &calls),
            pending,
            RetryConfig::default(),
            "acme/widget",
        )
        .await;

        assert_eq!(result.unwrap(), "stats");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_budget() {
        let calls = Arc::new(AtomicU32::new(0));
        let config = RetryConfig::fixed(Duration::from_millis(10), 2);

        let err = with_retry(stats_after(u32::MAX, &calls), pending, config, "acme/widget")
            .await
            .unwrap_err();

        assert!(matches!(err, StatsError::Pending));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let operation = move || {
            counter.fetch_add(1, Ordering::SeqCst);
            std::future::ready(Err::<(), _>(StatsError::Gone))
        };

        let err = with_retry(operation, pending, RetryConfig::default(), "acme/ghost")
            .await
            .unwrap_err();

        assert!(matches!(err, StatsError::Gone));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
