//! # Controller Configuration
//!
//! Controller-level settings loaded from environment variables.

use crate::constants::*;
use std::time::Duration;
use tracing::warn;

/// Controller-level configuration
///
/// All settings have sensible defaults and can be overridden via environment variables.
/// Environment variables are populated from a ConfigMap using `envFrom` in the deployment.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerConfig {
    /// HTTP port for `/metrics`, `/healthz` and `/readyz`
    pub metrics_port: u16,
    /// Reconciliations each per-kind controller runs in parallel
    pub reconcile_concurrency: u16,
    /// Requeue interval after a successful reconciliation (seconds)
    pub resync_interval_secs: u64,
    /// Requeue interval while waiting for a referenced producer (seconds)
    pub pending_requeue_secs: u64,
    /// Requeue interval after losing a status write race (seconds)
    pub conflict_requeue_secs: u64,
    /// Fibonacci backoff lower bound (minutes)
    pub backoff_min_minutes: u64,
    /// Fibonacci backoff upper bound (minutes)
    pub backoff_max_minutes: u64,
    /// Read-modify-write attempts for one status update
    pub status_write_attempts: u32,
    /// Restrict the watches to one namespace; `None` watches all namespaces
    pub watch_namespace: Option<String>,
    /// How long to wait for the HTTP server to come up (seconds)
    pub server_startup_timeout_secs: u64,
    /// Poll interval while waiting for the HTTP server (milliseconds)
    pub server_poll_interval_ms: u64,
    /// Delay before restarting a controller stream that ended (seconds)
    pub watch_restart_delay_after_end_secs: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            metrics_port: DEFAULT_METRICS_PORT,
            reconcile_concurrency: DEFAULT_RECONCILE_CONCURRENCY,
            resync_interval_secs: DEFAULT_RESYNC_INTERVAL_SECS,
            pending_requeue_secs: DEFAULT_PENDING_REQUEUE_SECS,
            conflict_requeue_secs: DEFAULT_CONFLICT_REQUEUE_SECS,
            backoff_min_minutes: DEFAULT_BACKOFF_MIN_MINUTES,
            backoff_max_minutes: DEFAULT_BACKOFF_MAX_MINUTES,
            status_write_attempts: DEFAULT_STATUS_WRITE_ATTEMPTS,
            watch_namespace: None,
            server_startup_timeout_secs: DEFAULT_SERVER_STARTUP_TIMEOUT_SECS,
            server_poll_interval_ms: DEFAULT_SERVER_POLL_INTERVAL_MS,
            watch_restart_delay_after_end_secs: DEFAULT_WATCH_RESTART_DELAY_AFTER_END_SECS,
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup
    ///
    /// `from_env` delegates here; tests pass a map instead of mutating the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let backoff_min_minutes = var_or_default(
            &lookup,
            "BACKOFF_MIN_MINUTES",
            DEFAULT_BACKOFF_MIN_MINUTES,
        )
        .max(1);
        let backoff_max_minutes = var_or_default(
            &lookup,
            "BACKOFF_MAX_MINUTES",
            DEFAULT_BACKOFF_MAX_MINUTES,
        )
        .max(backoff_min_minutes);

        Self {
            metrics_port: var_or_default(&lookup, "METRICS_PORT", DEFAULT_METRICS_PORT),
            reconcile_concurrency: var_or_default(
                &lookup,
                "RECONCILE_CONCURRENCY",
                DEFAULT_RECONCILE_CONCURRENCY,
            )
            .max(1),
            resync_interval_secs: var_or_default(
                &lookup,
                "RESYNC_INTERVAL_SECS",
                DEFAULT_RESYNC_INTERVAL_SECS,
            ),
            pending_requeue_secs: var_or_default(
                &lookup,
                "PENDING_REQUEUE_SECS",
                DEFAULT_PENDING_REQUEUE_SECS,
            ),
            conflict_requeue_secs: var_or_default(
                &lookup,
                "CONFLICT_REQUEUE_SECS",
                DEFAULT_CONFLICT_REQUEUE_SECS,
            ),
            backoff_min_minutes,
            backoff_max_minutes,
            status_write_attempts: var_or_default(
                &lookup,
                "STATUS_WRITE_ATTEMPTS",
                DEFAULT_STATUS_WRITE_ATTEMPTS,
            )
            .max(1),
            watch_namespace: lookup("WATCH_NAMESPACE")
                .map(|ns| ns.trim().to_string())
                .filter(|ns| !ns.is_empty()),
            server_startup_timeout_secs: var_or_default(
                &lookup,
                "SERVER_STARTUP_TIMEOUT_SECS",
                DEFAULT_SERVER_STARTUP_TIMEOUT_SECS,
            ),
            server_poll_interval_ms: var_or_default(
                &lookup,
                "SERVER_POLL_INTERVAL_MS",
                DEFAULT_SERVER_POLL_INTERVAL_MS,
            ),
            watch_restart_delay_after_end_secs: var_or_default(
                &lookup,
                "WATCH_RESTART_DELAY_AFTER_END_SECS",
                DEFAULT_WATCH_RESTART_DELAY_AFTER_END_SECS,
            ),
        }
    }

    /// Get resync duration
    pub fn resync_interval(&self) -> Duration {
        Duration::from_secs(self.resync_interval_secs)
    }

    /// Get pending requeue duration
    pub fn pending_requeue(&self) -> Duration {
        Duration::from_secs(self.pending_requeue_secs)
    }

    /// Get conflict requeue duration
    pub fn conflict_requeue(&self) -> Duration {
        Duration::from_secs(self.conflict_requeue_secs)
    }

    pub fn server_startup_timeout(&self) -> Duration {
        Duration::from_secs(self.server_startup_timeout_secs)
    }

    pub fn server_poll_interval(&self) -> Duration {
        Duration::from_millis(self.server_poll_interval_ms)
    }

    /// Get watch restart delay after end duration
    pub fn watch_restart_delay_after_end(&self) -> Duration {
        Duration::from_secs(self.watch_restart_delay_after_end_secs)
    }
}

/// Read a variable or return the default, warning on unparsable values
fn var_or_default<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(variable = key, value = %raw, default = %default, "Invalid value, using default");
            default
        }),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> ControllerConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ControllerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_empty_environment_matches_defaults() {
        assert_eq!(config_from(&[]), ControllerConfig::default());
    }

    #[test]
    fn test_overrides_are_applied() {
        let config = config_from(&[
            ("METRICS_PORT", "9090"),
            ("RECONCILE_CONCURRENCY", "8"),
            ("PENDING_REQUEUE_SECS", "2"),
            ("WATCH_NAMESPACE", "crypto"),
        ]);
        assert_eq!(config.metrics_port, 9090);
        assert_eq!(config.reconcile_concurrency, 8);
        assert_eq!(config.pending_requeue(), Duration::from_secs(2));
        assert_eq!(config.watch_namespace.as_deref(), Some("crypto"));
    }

    #[test]
    fn test_invalid_values_fall_back_to_defaults() {
        let config = config_from(&[("METRICS_PORT", "not-a-port"), ("RESYNC_INTERVAL_SECS", "-5")]);
        assert_eq!(config.metrics_port, DEFAULT_METRICS_PORT);
        assert_eq!(config.resync_interval_secs, DEFAULT_RESYNC_INTERVAL_SECS);
    }

    #[test]
    fn test_backoff_bounds_are_ordered() {
        let config = config_from(&[("BACKOFF_MIN_MINUTES", "7"), ("BACKOFF_MAX_MINUTES", "3")]);
        assert_eq!(config.backoff_min_minutes, 7);
        assert_eq!(config.backoff_max_minutes, 7);
    }

    #[test]
    fn test_blank_watch_namespace_means_all() {
        let config = config_from(&[("WATCH_NAMESPACE", "  ")]);
        assert!(config.watch_namespace.is_none());
    }
}
