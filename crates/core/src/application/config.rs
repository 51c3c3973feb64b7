// Dispatcher configuration

use std::time::Duration;

use crate::application::constants::*;
use crate::error::{AppError, Result};

/// Environment variable names read by `DispatcherConfig::from_lookup`
pub mod env {
    pub const WORKER_VERSION: &str = "LOFT_WORKER_VERSION";
    pub const LOCAL_ONLY: &str = "LOFT_LOCAL_ONLY";
    pub const HOST_SIGNATURE: &str = "LOFT_HOST_SIGNATURE";
    pub const TASK_TIMEOUT_SECS: &str = "LOFT_TASK_TIMEOUT_SECS";
    pub const LIVENESS_SECS: &str = "LOFT_LIVENESS_SECS";
    pub const POLL_INTERVAL_MS: &str = "LOFT_POLL_INTERVAL_MS";
    pub const SWEEP_INTERVAL_SECS: &str = "LOFT_SWEEP_INTERVAL_SECS";
}

/// Queue set and sweeper settings
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Version a worker must report to be served
    pub expected_version: String,

    /// Restricted-deployment mode: only serve workers on this host
    pub local_only: bool,

    /// Substring a worker id must contain when `local_only` is set
    pub host_signature: String,

    /// Timeout for lazily created queues
    pub default_task_timeout: Duration,

    pub liveness_threshold: Duration,
    pub poll_interval: Duration,
    pub sweep_interval: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            expected_version: crate::VERSION.to_string(),
            local_only: false,
            host_signature: DEFAULT_HOST_SIGNATURE.to_string(),
            default_task_timeout: DEFAULT_TASK_TIMEOUT,
            liveness_threshold: DEFAULT_LIVENESS_THRESHOLD,
            poll_interval: PULL_POLL_INTERVAL,
            sweep_interval: SWEEP_INTERVAL,
        }
    }
}

impl DispatcherConfig {
    /// Build a config from a key lookup (usually the process environment).
    ///
    /// Unset keys keep their defaults; malformed values are a `Config` error.
    ///
    /// # Example
    /// ```text
    /// let config = DispatcherConfig::from_lookup(|k| std::env::var(k).ok())?;
    /// ```
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(version) = lookup(env::WORKER_VERSION) {
            config.expected_version = version;
        }
        if let Some(flag) = lookup(env::LOCAL_ONLY) {
            config.local_only = parse_flag(env::LOCAL_ONLY, &flag)?;
        }
        if let Some(host) = lookup(env::HOST_SIGNATURE) {
            config.host_signature = host;
        }
        if let Some(secs) = lookup(env::TASK_TIMEOUT_SECS) {
            config.default_task_timeout =
                Duration::from_secs(parse_positive(env::TASK_TIMEOUT_SECS, &secs)?);
        }
        if let Some(secs) = lookup(env::LIVENESS_SECS) {
            config.liveness_threshold =
                Duration::from_secs(parse_positive(env::LIVENESS_SECS, &secs)?);
        }
        if let Some(ms) = lookup(env::POLL_INTERVAL_MS) {
            config.poll_interval = Duration::from_millis(parse_positive(env::POLL_INTERVAL_MS, &ms)?);
        }
        if let Some(secs) = lookup(env::SWEEP_INTERVAL_SECS) {
            config.sweep_interval =
                Duration::from_secs(parse_positive(env::SWEEP_INTERVAL_SECS, &secs)?);
        }

        Ok(config)
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(AppError::Config(format!(
            "{} must be a boolean flag, got '{}'",
            key, other
        ))),
    }
}

fn parse_positive(key: &str, value: &str) -> Result<u64> {
    let parsed: u64 = value
        .trim()
        .parse()
        .map_err(|_| AppError::Config(format!("{} must be an integer, got '{}'", key, value)))?;
    if parsed == 0 {
        return Err(AppError::Config(format!("{} must be greater than zero", key)));
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = DispatcherConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.expected_version, crate::VERSION);
        assert!(!config.local_only);
        assert_eq!(config.default_task_timeout, DEFAULT_TASK_TIMEOUT);
        assert_eq!(config.liveness_threshold, Duration::from_secs(60));
        assert_eq!(config.poll_interval, Duration::from_millis(10));
        assert_eq!(config.sweep_interval, Duration::from_secs(10));
    }

    #[test]
    fn test_overrides() {
        let config = DispatcherConfig::from_lookup(lookup_from(&[
            (env::WORKER_VERSION, "9.9.9"),
            (env::LOCAL_ONLY, "1"),
            (env::HOST_SIGNATURE, "scope-pc"),
            (env::TASK_TIMEOUT_SECS, "600"),
            (env::POLL_INTERVAL_MS, "25"),
        ]))
        .unwrap();

        assert_eq!(config.expected_version, "9.9.9");
        assert!(config.local_only);
        assert_eq!(config.host_signature, "scope-pc");
        assert_eq!(config.default_task_timeout, Duration::from_secs(600));
        assert_eq!(config.poll_interval, Duration::from_millis(25));
    }

    #[test]
    fn test_malformed_values_rejected() {
        let err = DispatcherConfig::from_lookup(lookup_from(&[(env::LOCAL_ONLY, "maybe")]))
            .unwrap_err();
        assert!(err.to_string().contains("LOFT_LOCAL_ONLY"));

        let err = DispatcherConfig::from_lookup(lookup_from(&[(env::LIVENESS_SECS, "0")]))
            .unwrap_err();
        assert!(err.to_string().contains("greater than zero"));

        assert!(
            DispatcherConfig::from_lookup(lookup_from(&[(env::SWEEP_INTERVAL_SECS, "ten")]))
                .is_err()
        );
    }
}
