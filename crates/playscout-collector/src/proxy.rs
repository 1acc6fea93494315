//! Proxy endpoint loading and rotation.
//!
//! The pool is loaded once per run from a plain-text file and never rewritten.
//! Health is tracked in memory only: an endpoint whose consecutive failures reach
//! `max_failures` is skipped for the rest of the run.

use indexmap::IndexSet;
use playscout_core::{ProxyConfig, ProxyEndpoint, RotationStrategy};
use rand::seq::SliceRandom;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Rotating set of egress endpoints.
///
/// Shared by every worker of a run; selection and health bookkeeping are
/// internally synchronized.
#[derive(Debug)]
pub struct ProxyPool {
    endpoints: Vec<ProxyEndpoint>,
    rotation: RotationStrategy,
    max_failures: u32,
    cursor: AtomicUsize,
    failures: Mutex<HashMap<ProxyEndpoint, u32>>,
}

impl ProxyPool {
    /// Create a pool over `endpoints`.
    #[must_use]
    pub fn new(
        endpoints: Vec<ProxyEndpoint>,
        rotation: RotationStrategy,
        max_failures: u32,
    ) -> Self {
        Self {
            endpoints,
            rotation,
            max_failures,
            cursor: AtomicUsize::new(0),
            failures: Mutex::new(HashMap::new()),
        }
    }

    /// Pool with no endpoints. Every request goes direct.
    #[must_use]
    pub fn direct() -> Self {
        Self::new(Vec::new(), RotationStrategy::RoundRobin, 0)
    }

    /// Load the configured proxy file into a pool.
    #[must_use]
    pub fn from_config(config: &ProxyConfig) -> Self {
        Self::new(Self::load(&config.file), config.rotation, config.max_failures)
    }

    /// Read endpoints from a file with one `host:port` per line.
    ///
    /// Blank lines and `#` comments are skipped, malformed lines are logged and
    /// skipped, duplicates are dropped keeping file order. A missing or unreadable
    /// file yields an empty list.
    #[must_use]
    pub fn load(path: &Path) -> Vec<ProxyEndpoint> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "Proxy file not found");
                return Vec::new();
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read proxy file");
                return Vec::new();
            }
        };

        let mut endpoints = IndexSet::new();
        for (lineno, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match line.parse::<ProxyEndpoint>() {
                Ok(endpoint) => {
                    endpoints.insert(endpoint);
                }
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        line = lineno + 1,
                        error = %e,
                        "Skipping malformed proxy entry"
                    );
                }
            }
        }

        tracing::debug!(path = %path.display(), count = endpoints.len(), "Loaded proxies");
        endpoints.into_iter().collect()
    }

    /// Whether the pool has no endpoints at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Number of loaded endpoints, excluded ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    /// Loaded endpoints in file order.
    #[must_use]
    pub fn endpoints(&self) -> &[ProxyEndpoint] {
        &self.endpoints
    }

    /// Endpoint to use after `current`, per the rotation strategy.
    ///
    /// Skips `current`, every endpoint in `skip` and excluded endpoints. Returns
    /// `None` when nothing is left.
    #[must_use]
    pub fn rotate(
        &self,
        current: Option<&ProxyEndpoint>,
        skip: &HashSet<ProxyEndpoint>,
    ) -> Option<ProxyEndpoint> {
        if self.endpoints.is_empty() {
            return None;
        }

        let eligible = |endpoint: &ProxyEndpoint| {
            current != Some(endpoint) && !skip.contains(endpoint) && !self.is_excluded(endpoint)
        };

        match self.rotation {
            RotationStrategy::RoundRobin => {
                let len = self.endpoints.len();
                let start = self.cursor.fetch_add(1, Ordering::Relaxed);
                (0..len)
                    .map(|offset| &self.endpoints[(start + offset) % len])
                    .find(|endpoint| eligible(endpoint))
                    .cloned()
            }
            RotationStrategy::Random => {
                let candidates: Vec<&ProxyEndpoint> = self
                    .endpoints
                    .iter()
                    .filter(|endpoint| eligible(endpoint))
                    .collect();
                candidates
                    .choose(&mut rand::thread_rng())
                    .map(|endpoint| (*endpoint).clone())
            }
        }
    }

    /// Whether any endpoint outside `skip` is still eligible.
    #[must_use]
    pub fn has_eligible(&self, skip: &HashSet<ProxyEndpoint>) -> bool {
        self.endpoints
            .iter()
            .any(|endpoint| !skip.contains(endpoint) && !self.is_excluded(endpoint))
    }

    /// Whether `endpoint` crossed the failure threshold.
    #[must_use]
    pub fn is_excluded(&self, endpoint: &ProxyEndpoint) -> bool {
        if self.max_failures == 0 {
            return false;
        }
        self.failures
            .lock()
            .map(|failures| failures.get(endpoint).copied().unwrap_or(0) >= self.max_failures)
            .unwrap_or(false)
    }

    /// Record a failed attempt through `endpoint`.
    pub fn record_failure(&self, endpoint: &ProxyEndpoint) {
        let Ok(mut failures) = self.failures.lock() else {
            return;
        };
        let count = failures.entry(endpoint.clone()).or_insert(0);
        *count += 1;
        if self.max_failures > 0 && *count == self.max_failures {
            tracing::warn!(
                proxy = %endpoint,
                failures = *count,
                "Proxy excluded for the rest of the run"
            );
        }
    }

    /// Record a successful attempt through `endpoint`, clearing its failure count.
    pub fn record_success(&self, endpoint: &ProxyEndpoint) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.remove(endpoint);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn endpoint(s: &str) -> ProxyEndpoint {
        s.parse().expect("valid endpoint")
    }

    fn pool(entries: &[&str], rotation: RotationStrategy, max_failures: u32) -> ProxyPool {
        ProxyPool::new(
            entries.iter().map(|s| endpoint(s)).collect(),
            rotation,
            max_failures,
        )
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let endpoints = ProxyPool::load(Path::new("/nonexistent/good_proxies.txt"));
        assert!(endpoints.is_empty());
    }

    #[test]
    fn test_load_skips_blank_comment_and_malformed_lines() {
        let mut file = NamedTempFile::new().expect("temp file");
        writeln!(file, "10.0.0.1:8080").expect("write");
        writeln!(file).expect("write");
        writeln!(file, "# backup pool").expect("write");
        writeln!(file, "not-a-proxy").expect("write");
        writeln!(file, "  10.0.0.2:3128  ").expect("write");
        writeln!(file, "10.0.0.1:8080").expect("write");

        let endpoints = ProxyPool::load(file.path());
        assert_eq!(
            endpoints,
            vec![endpoint("10.0.0.1:8080"), endpoint("10.0.0.2:3128")]
        );
    }

    #[test]
    fn test_load_empty_file_is_empty() {
        let file = NamedTempFile::new().expect("temp file");
        assert!(ProxyPool::load(file.path()).is_empty());
    }

    #[test]
    fn test_round_robin_cycles_in_file_order() {
        let pool = pool(&["a:1", "b:2", "c:3"], RotationStrategy::RoundRobin, 0);
        let none = HashSet::new();

        let picked: Vec<_> = (0..4).filter_map(|_| pool.rotate(None, &none)).collect();
        assert_eq!(
            picked,
            vec![endpoint("a:1"), endpoint("b:2"), endpoint("c:3"), endpoint("a:1")]
        );
    }

    #[test]
    fn test_rotate_never_returns_current() {
        for rotation in [RotationStrategy::RoundRobin, RotationStrategy::Random] {
            let pool = pool(&["a:1", "b:2"], rotation, 0);
            let current = endpoint("a:1");
            for _ in 0..10 {
                assert_eq!(pool.rotate(Some(&current), &HashSet::new()), Some(endpoint("b:2")));
            }
        }
    }

    #[test]
    fn test_rotate_respects_skip_set() {
        let pool = pool(&["a:1", "b:2"], RotationStrategy::Random, 0);
        let skip: HashSet<_> = [endpoint("a:1"), endpoint("b:2")].into_iter().collect();

        assert_eq!(pool.rotate(None, &skip), None);
        assert!(!pool.has_eligible(&skip));
    }

    #[test]
    fn test_failure_threshold_excludes_endpoint() {
        let pool = pool(&["a:1", "b:2"], RotationStrategy::RoundRobin, 2);
        let dead = endpoint("a:1");

        pool.record_failure(&dead);
        assert!(!pool.is_excluded(&dead));
        pool.record_failure(&dead);
        assert!(pool.is_excluded(&dead));

        let none = HashSet::new();
        for _ in 0..5 {
            assert_eq!(pool.rotate(None, &none), Some(endpoint("b:2")));
        }
    }

    #[test]
    fn test_success_resets_failures() {
        let pool = pool(&["a:1"], RotationStrategy::RoundRobin, 2);
        let flaky = endpoint("a:1");

        pool.record_failure(&flaky);
        pool.record_success(&flaky);
        pool.record_failure(&flaky);
        assert!(!pool.is_excluded(&flaky));
    }

    #[test]
    fn test_zero_threshold_never_excludes() {
        let pool = pool(&["a:1"], RotationStrategy::RoundRobin, 0);
        let endpoint = endpoint("a:1");
        for _ in 0..10 {
            pool.record_failure(&endpoint);
        }
        assert!(!pool.is_excluded(&endpoint));
    }

    #[test]
    fn test_direct_pool() {
        let pool = ProxyPool::direct();
        assert!(pool.is_empty());
        assert_eq!(pool.rotate(None, &HashSet::new()), None);
    }
}
