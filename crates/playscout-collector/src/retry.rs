//! Bounded retry with backoff and per-attempt proxy selection.
//!
//! Search, suggestion and detail calls all go through [`RetryPolicy::run`]. The
//! operation receives a [`RetryAttempt`] describing the endpoint it must use, so
//! proxy routing is an explicit per-call value and never ambient state.

use crate::proxy::ProxyPool;
use playscout_core::{BackoffKind, ProxyEndpoint, RetryConfig};
use playscout_playstore::PlayStoreError;
use rand::Rng;
use std::collections::HashSet;
use std::future::Future;
use std::time::{Duration, Instant};

/// Largest exponent applied to the base delay.
const MAX_BACKOFF_EXPONENT: u32 = 10;

/// One attempt of a retried operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryAttempt {
    /// Zero-based attempt index
    pub index: u32,
    /// Endpoint to route this attempt through (`None` = direct)
    pub proxy: Option<ProxyEndpoint>,
    /// Time since the operation's first attempt started
    pub elapsed: Duration,
}

/// Decides whether an error is worth another attempt.
pub type FailurePredicate = fn(&PlayStoreError) -> bool;

/// Attempt budget, backoff schedule and failure predicate.
#[derive(Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: BackoffKind,
    initial: Duration,
    jitter_min: Duration,
    jitter_max: Duration,
    retry_if: FailurePredicate,
}

impl RetryPolicy {
    /// Policy with `max_attempts` and no delay between attempts.
    #[must_use]
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            backoff: BackoffKind::Fixed,
            initial: Duration::ZERO,
            jitter_min: Duration::ZERO,
            jitter_max: Duration::ZERO,
            retry_if: PlayStoreError::is_retryable,
        }
    }

    /// Policy built from the `[retry]` config section.
    #[must_use]
    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts)
            .with_backoff(config.backoff, Duration::from_secs(config.initial_backoff_secs))
            .with_jitter(
                Duration::from_millis(config.jitter_min_ms),
                Duration::from_millis(config.jitter_max_ms),
            )
    }

    /// Set the backoff schedule.
    #[must_use]
    pub fn with_backoff(mut self, backoff: BackoffKind, initial: Duration) -> Self {
        self.backoff = backoff;
        self.initial = initial;
        self
    }

    /// Set the random jitter range added to every delay.
    #[must_use]
    pub fn with_jitter(mut self, min: Duration, max: Duration) -> Self {
        self.jitter_min = min.min(max);
        self.jitter_max = max;
        self
    }

    /// Replace the failure predicate.
    #[must_use]
    pub fn with_predicate(mut self, retry_if: FailurePredicate) -> Self {
        self.retry_if = retry_if;
        self
    }

    /// Effective attempt budget. `0` and `1` both mean a single attempt.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay before the attempt following failed attempt `index`, without jitter.
    #[must_use]
    pub fn base_delay(&self, index: u32) -> Duration {
        match self.backoff {
            BackoffKind::Fixed => self.initial,
            BackoffKind::Exponential => self
                .initial
                .saturating_mul(2u32.saturating_pow(index.min(MAX_BACKOFF_EXPONENT))),
        }
    }

    fn delay(&self, index: u32) -> Duration {
        let jitter = if self.jitter_max > self.jitter_min {
            rand::thread_rng().gen_range(self.jitter_min..=self.jitter_max)
        } else {
            self.jitter_min
        };
        self.base_delay(index).saturating_add(jitter)
    }

    /// Run `op` until it succeeds, fails terminally or the budget runs out.
    ///
    /// With a non-empty `pool` every attempt goes through an endpoint this
    /// operation has not tried yet; once none is left the operation gives up
    /// early. With an empty pool every attempt goes direct. The last error is
    /// returned when all attempts fail.
    pub async fn run<T, F, Fut>(
        &self,
        label: &str,
        pool: &ProxyPool,
        mut op: F,
    ) -> Result<T, PlayStoreError>
    where
        F: FnMut(RetryAttempt) -> Fut,
        Fut: Future<Output = Result<T, PlayStoreError>>,
    {
        let started = Instant::now();
        let attempts = self.attempts();
        let mut tried = HashSet::new();
        let mut index = 0;
        let mut proxy = pool.rotate(None, &tried);

        loop {
            let attempt = RetryAttempt {
                index,
                proxy: proxy.clone(),
                elapsed: started.elapsed(),
            };

            let error = match op(attempt).await {
                Ok(value) => {
                    if let Some(proxy) = &proxy {
                        pool.record_success(proxy);
                    }
                    return Ok(value);
                }
                Err(e) => e,
            };

            if let Some(proxy) = proxy.as_ref() {
                if !error.is_not_found() {
                    pool.record_failure(proxy);
                }
                tried.insert(proxy.clone());
            }

            if !(self.retry_if)(&error) {
                tracing::debug!(op = label, error = %error, "Not retrying");
                return Err(error);
            }

            index += 1;
            if index >= attempts {
                return Err(error);
            }
            if proxy.is_some() && !pool.has_eligible(&tried) {
                tracing::debug!(op = label, attempts = index, "Every proxy tried");
                return Err(error);
            }

            let delay = self.delay(index - 1);
            tracing::warn!(
                "{} failed (attempt {}/{}), retrying in {:?}: {}",
                label,
                index,
                attempts,
                delay,
                error
            );
            tokio::time::sleep(delay).await;
            proxy = pool.rotate(proxy.as_ref(), &tried);
        }
    }
}

impl std::fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("backoff", &self.backoff)
            .field("initial", &self.initial)
            .field("jitter_min", &self.jitter_min)
            .field("jitter_max", &self.jitter_max)
            .finish_non_exhaustive()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use playscout_core::RotationStrategy;
    use std::sync::Mutex;

    fn unavailable() -> PlayStoreError {
        PlayStoreError::Http {
            status: 503,
            url: "test://".to_string(),
        }
    }

    fn endpoints(entries: &[&str]) -> Vec<ProxyEndpoint> {
        entries
            .iter()
            .map(|s| s.parse().expect("valid endpoint"))
            .collect()
    }

    #[test]
    fn test_attempt_budget_floor() {
        assert_eq!(RetryPolicy::new(0).attempts(), 1);
        assert_eq!(RetryPolicy::new(1).attempts(), 1);
        assert_eq!(RetryPolicy::new(5).attempts(), 5);
    }

    #[test]
    fn test_exponential_base_delay() {
        let policy =
            RetryPolicy::new(5).with_backoff(BackoffKind::Exponential, Duration::from_secs(6));
        assert_eq!(policy.base_delay(0), Duration::from_secs(6));
        assert_eq!(policy.base_delay(1), Duration::from_secs(12));
        assert_eq!(policy.base_delay(3), Duration::from_secs(48));
    }

    #[test]
    fn test_fixed_base_delay() {
        let policy = RetryPolicy::new(5).with_backoff(BackoffKind::Fixed, Duration::from_secs(3));
        assert_eq!(policy.base_delay(0), Duration::from_secs(3));
        assert_eq!(policy.base_delay(4), Duration::from_secs(3));
    }

    #[test]
    fn test_huge_backoff_saturates() {
        let policy = RetryPolicy::new(5)
            .with_backoff(BackoffKind::Exponential, Duration::from_secs(u64::MAX))
            .with_jitter(Duration::from_millis(2000), Duration::from_millis(5000));
        assert_eq!(policy.delay(3), Duration::MAX);
    }

    #[test]
    fn test_jitter_stays_in_range() {
        let policy = RetryPolicy::new(3)
            .with_backoff(BackoffKind::Fixed, Duration::from_secs(1))
            .with_jitter(Duration::from_millis(2000), Duration::from_millis(5000));
        for _ in 0..50 {
            let delay = policy.delay(0);
            assert!(delay >= Duration::from_millis(3000));
            assert!(delay <= Duration::from_millis(6000));
        }
    }

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let policy = RetryPolicy::new(3);
        let pool = ProxyPool::direct();
        let mut calls = 0;

        let result = policy
            .run("op", &pool, |_| {
                calls += 1;
                async { Ok::<_, PlayStoreError>(7) }
            })
            .await;

        assert_eq!(result.expect("success"), 7);
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_direct_mode_retries_full_budget() {
        let policy = RetryPolicy::new(4);
        let pool = ProxyPool::direct();
        let seen = Mutex::new(Vec::new());

        let result: Result<(), _> = policy
            .run("op", &pool, |attempt| {
                seen.lock().expect("lock").push(attempt);
                async { Err(unavailable()) }
            })
            .await;

        assert!(result.is_err());
        let seen = seen.into_inner().expect("lock");
        assert_eq!(seen.len(), 4);
        assert!(seen.iter().all(|attempt| attempt.proxy.is_none()));
        assert_eq!(
            seen.iter().map(|a| a.index).collect::<Vec<_>>(),
            vec![0, 1, 2, 3]
        );
    }

    #[tokio::test]
    async fn test_single_attempt_when_budget_is_zero() {
        let policy = RetryPolicy::new(0);
        let pool = ProxyPool::direct();
        let mut calls = 0;

        let result: Result<(), _> = policy
            .run("op", &pool, |_| {
                calls += 1;
                async { Err(unavailable()) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_terminal_error_stops_immediately() {
        let policy = RetryPolicy::new(5);
        let pool = ProxyPool::direct();
        let mut calls = 0;

        let result: Result<(), _> = policy
            .run("op", &pool, |_| {
                calls += 1;
                async {
                    Err(PlayStoreError::NotFound {
                        resource: "x".to_string(),
                    })
                }
            })
            .await;

        assert!(result.expect_err("not found").is_not_found());
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_each_attempt_uses_a_fresh_proxy() {
        let policy = RetryPolicy::new(5);
        let pool = ProxyPool::new(
            endpoints(&["10.0.0.1:80", "10.0.0.2:80"]),
            RotationStrategy::Random,
            0,
        );
        let seen = Mutex::new(Vec::new());

        let result: Result<(), _> = policy
            .run("op", &pool, |attempt| {
                seen.lock().expect("lock").push(attempt.proxy);
                async { Err(unavailable()) }
            })
            .await;

        assert!(result.is_err());
        let seen = seen.into_inner().expect("lock");
        // Budget is 5 but only two endpoints exist.
        assert_eq!(seen.len(), 2);
        assert_ne!(seen[0], seen[1]);
        assert!(seen.iter().all(Option::is_some));
    }

    #[tokio::test]
    async fn test_proxy_health_is_recorded() {
        let policy = RetryPolicy::new(2);
        let pool = ProxyPool::new(endpoints(&["10.0.0.1:80"]), RotationStrategy::RoundRobin, 1);

        let result: Result<(), _> = policy
            .run("op", &pool, |_| async { Err(unavailable()) })
            .await;

        assert!(result.is_err());
        assert!(pool.is_excluded(&pool.endpoints()[0]));
    }

    #[tokio::test]
    async fn test_custom_predicate() {
        let policy = RetryPolicy::new(3).with_predicate(|_| false);
        let pool = ProxyPool::direct();
        let mut calls = 0;

        let result: Result<(), _> = policy
            .run("op", &pool, |_| {
                calls += 1;
                async { Err(unavailable()) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_sleeps_between_attempts_only() {
        let policy =
            RetryPolicy::new(3).with_backoff(BackoffKind::Exponential, Duration::from_secs(6));
        let pool = ProxyPool::direct();
        let started = tokio::time::Instant::now();

        let result: Result<(), _> = policy
            .run("op", &pool, |_| async { Err(unavailable()) })
            .await;

        assert!(result.is_err());
        // 6s after the first failure, 12s after the second, none after the last.
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(18));
        assert!(elapsed < Duration::from_secs(19));
    }
}
