//! Monitor runtime configuration.
//!
//! ## Precedence (highest to lowest)
//!
//! 1. Environment variable overrides (`SENTINEL_*`, see [`MonitorConfig::from_env`])
//! 2. Values set on the struct by the caller
//! 3. Built-in defaults
//!
//! The streak bound (`violation_threshold`) and the per-execution attempt bound
//! (`max_action_attempts`) are independent settings even though both default
//! to 3.

use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);
const DEFAULT_VIOLATION_THRESHOLD: u32 = 3;
const DEFAULT_MAX_ACTION_ATTEMPTS: u32 = 3;
const DEFAULT_FINALIZATION_PERIOD: u64 = 10;
const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_ENTITY_CAPACITY: usize = 10_000;
const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(60 * 60);

const ENV_INTERVAL_SECS: &str = "SENTINEL_INTERVAL_SECS";
const ENV_VIOLATION_THRESHOLD: &str = "SENTINEL_VIOLATION_THRESHOLD";
const ENV_MAX_ACTION_ATTEMPTS: &str = "SENTINEL_MAX_ACTION_ATTEMPTS";
const ENV_FINALIZATION_PERIOD: &str = "SENTINEL_FINALIZATION_PERIOD";
const ENV_ACTION_TIMEOUT_MS: &str = "SENTINEL_ACTION_TIMEOUT_MS";
const ENV_ENCRYPTION_POLICY: &str = "SENTINEL_ENCRYPTION_POLICY";
const ENV_ENTITY_CAPACITY: &str = "SENTINEL_ENTITY_CAPACITY";

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("unknown encryption policy '{0}' (expected fail_closed or fail_open)")]
    UnknownEncryptionPolicy(String),
}

/// What the executor does when the crypto collaborator fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncryptionPolicy {
    /// Abort the attempt; it counts as a failed attempt and may be retried.
    #[default]
    FailClosed,
    /// Proceed with an empty payload and a warning.
    FailOpen,
}

impl std::str::FromStr for EncryptionPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail_closed" | "fail-closed" | "closed" => Ok(Self::FailClosed),
            "fail_open" | "fail-open" | "open" => Ok(Self::FailOpen),
            other => Err(ConfigError::UnknownEncryptionPolicy(other.to_string())),
        }
    }
}

/// Tunables for one monitor instance.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Fixed tick interval of the cycle scheduler
    pub interval: Duration,
    /// Consecutive violations at which the policy selects the Escalated tier
    pub violation_threshold: u32,
    /// Enforcement attempts allowed per execution before a terminal failure
    pub max_action_attempts: u32,
    /// The finalize hook runs when `cycle_count % finalization_period == 0`
    pub finalization_period: u64,
    /// Deadline for each encrypt and enforce call
    pub action_timeout: Duration,
    /// Deadline for polling the report source
    pub fetch_timeout: Duration,
    /// Deadline for the finalize hook
    pub finalize_timeout: Duration,
    /// Pause between failed attempts (zero = retry immediately)
    pub retry_backoff: Duration,
    pub encryption_policy: EncryptionPolicy,
    /// Soft bound on tracked entities
    pub entity_capacity: usize,
    /// Idle entities unseen for this long are swept (None = never)
    pub idle_ttl: Option<Duration>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            violation_threshold: DEFAULT_VIOLATION_THRESHOLD,
            max_action_attempts: DEFAULT_MAX_ACTION_ATTEMPTS,
            finalization_period: DEFAULT_FINALIZATION_PERIOD,
            action_timeout: DEFAULT_CALL_TIMEOUT,
            fetch_timeout: DEFAULT_CALL_TIMEOUT,
            finalize_timeout: DEFAULT_CALL_TIMEOUT,
            retry_backoff: Duration::ZERO,
            encryption_policy: EncryptionPolicy::default(),
            entity_capacity: DEFAULT_ENTITY_CAPACITY,
            idle_ttl: Some(DEFAULT_IDLE_TTL),
        }
    }
}

impl MonitorConfig {
    /// Defaults with `SENTINEL_*` environment overrides applied.
    ///
    /// Unparsable values are logged and ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(secs) = env_parse::<u64>(ENV_INTERVAL_SECS) {
            config.interval = Duration::from_secs(secs);
        }
        if let Some(v) = env_parse(ENV_VIOLATION_THRESHOLD) {
            config.violation_threshold = v;
        }
        if let Some(v) = env_parse(ENV_MAX_ACTION_ATTEMPTS) {
            config.max_action_attempts = v;
        }
        if let Some(v) = env_parse(ENV_FINALIZATION_PERIOD) {
            config.finalization_period = v;
        }
        if let Some(ms) = env_parse::<u64>(ENV_ACTION_TIMEOUT_MS) {
            config.action_timeout = Duration::from_millis(ms);
        }
        if let Some(v) = env_parse(ENV_ENTITY_CAPACITY) {
            config.entity_capacity = v;
        }
        if let Ok(raw) = env::var(ENV_ENCRYPTION_POLICY) {
            match raw.parse() {
                Ok(policy) => config.encryption_policy = policy,
                Err(e) => warn!(var = ENV_ENCRYPTION_POLICY, "Ignoring override: {}", e),
            }
        }

        config
    }

    /// Reject settings that would make the engine spin or never act.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let zero = |field| Err(ConfigError::Zero { field });
        if self.interval.is_zero() {
            return zero("interval");
        }
        if self.violation_threshold == 0 {
            return zero("violation_threshold");
        }
        if self.max_action_attempts == 0 {
            return zero("max_action_attempts");
        }
        if self.finalization_period == 0 {
            return zero("finalization_period");
        }
        if self.action_timeout.is_zero() {
            return zero("action_timeout");
        }
        if self.fetch_timeout.is_zero() {
            return zero("fetch_timeout");
        }
        if self.finalize_timeout.is_zero() {
            return zero("finalize_timeout");
        }
        if self.entity_capacity == 0 {
            return zero("entity_capacity");
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(var: &str) -> Option<T> {
    let raw = env::var(var).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(var, value = %raw, "Ignoring unparsable override");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = MonitorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.violation_threshold, 3);
        assert_eq!(config.max_action_attempts, 3);
        assert_eq!(config.encryption_policy, EncryptionPolicy::FailClosed);
    }

    #[test]
    fn test_validate_rejects_zero_fields() {
        let config = MonitorConfig {
            finalization_period: 0,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::Zero {
                field: "finalization_period"
            })
        );

        let config = MonitorConfig {
            interval: Duration::ZERO,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_encryption_policy_parsing() {
        assert_eq!(
            "fail_open".parse::<EncryptionPolicy>(),
            Ok(EncryptionPolicy::FailOpen)
        );
        assert_eq!(
            "Fail-Closed".parse::<EncryptionPolicy>(),
            Ok(EncryptionPolicy::FailClosed)
        );
        assert!("sometimes".parse::<EncryptionPolicy>().is_err());
    }

    #[test]
    fn test_encryption_policy_serde() {
        let json = serde_json::to_string(&EncryptionPolicy::FailOpen).unwrap();
        assert_eq!(json, "\"fail_open\"");
    }
}
