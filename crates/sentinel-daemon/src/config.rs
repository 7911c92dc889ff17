//! Daemon configuration file.
//!
//! ```toml
//! [ledger]
//! path = "/var/lib/sentinel/ledger.jsonl"
//!
//! [[monitor]]
//! name = "rbac"
//! interval_secs = 10
//! violation_threshold = 3
//!
//! [monitor.predicate]
//! kind = "threshold"
//! threshold = 0.25
//! direction = "at_or_above"
//!
//! [monitor.endpoints]
//! reports = "http://collector:9000/reports/rbac"
//! encrypt = "http://kms:9100/encrypt"
//! enforce = "http://consensus:9200/actions"
//! ```
//!
//! Per-monitor fields left out of the file fall back to the `SENTINEL_*`
//! environment overrides, then to the engine defaults.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use sentinel::{ConfigError, EncryptionPolicy, MonitorConfig, PredicateSpec, TierActions};
use serde::Deserialize;

const DEFAULT_LEDGER_PATH: &str = "sentinel-ledger.jsonl";
const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 2_000;

#[derive(Debug, Clone, Deserialize)]
pub struct DaemonConfig {
    #[serde(default)]
    pub ledger: LedgerSettings,
    #[serde(default)]
    pub http: HttpSettings,
    #[serde(rename = "monitor", default)]
    pub monitors: Vec<MonitorSettings>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LedgerSettings {
    pub path: PathBuf,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_LEDGER_PATH),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpSettings {
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

fn default_connect_timeout_ms() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_MS
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
        }
    }
}

impl HttpSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

/// One `[[monitor]]` table.
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorSettings {
    pub name: String,
    pub interval_secs: Option<u64>,
    pub violation_threshold: Option<u32>,
    pub max_action_attempts: Option<u32>,
    pub finalization_period: Option<u64>,
    pub action_timeout_ms: Option<u64>,
    pub fetch_timeout_ms: Option<u64>,
    pub retry_backoff_ms: Option<u64>,
    pub encryption_policy: Option<EncryptionPolicy>,
    pub entity_capacity: Option<usize>,
    pub predicate: PredicateSpec,
    #[serde(default)]
    pub actions: TierActions,
    pub endpoints: Endpoints,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Endpoints {
    /// GET → `[Report]`
    pub reports: String,
    /// POST `{plaintext}` → `{ciphertext}`
    pub encrypt: String,
    /// Base URL; the action name is appended as a path segment
    pub enforce: String,
    /// POST `{cycle}` → `{finalized}`; no finalization when absent
    pub finalize: Option<String>,
}

impl DaemonConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse daemon config TOML")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.monitors.is_empty() {
            bail!("no [[monitor]] tables configured");
        }
        let mut seen = HashSet::new();
        for monitor in &self.monitors {
            if monitor.name.trim().is_empty() {
                bail!("monitor name must not be empty");
            }
            if !seen.insert(monitor.name.as_str()) {
                bail!("duplicate monitor name: {}", monitor.name);
            }
            monitor
                .monitor_config()
                .with_context(|| format!("monitor {}", monitor.name))?;
        }
        Ok(())
    }
}

impl MonitorSettings {
    /// Engine config: defaults, then environment, then this table.
    pub fn monitor_config(&self) -> Result<MonitorConfig, ConfigError> {
        let mut config = MonitorConfig::from_env();
        if let Some(secs) = self.interval_secs {
            config.interval = Duration::from_secs(secs);
        }
        if let Some(n) = self.violation_threshold {
            config.violation_threshold = n;
        }
        if let Some(n) = self.max_action_attempts {
            config.max_action_attempts = n;
        }
        if let Some(n) = self.finalization_period {
            config.finalization_period = n;
        }
        if let Some(ms) = self.action_timeout_ms {
            config.action_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = self.fetch_timeout_ms {
            config.fetch_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = self.retry_backoff_ms {
            config.retry_backoff = Duration::from_millis(ms);
        }
        if let Some(policy) = self.encryption_policy {
            config.encryption_policy = policy;
        }
        if let Some(n) = self.entity_capacity {
            config.entity_capacity = n;
        }
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentinel::{ActionKind, Direction};

    const SAMPLE: &str = r#"
[ledger]
path = "/tmp/ledger.jsonl"

[[monitor]]
name = "rbac"
interval_secs = 5
violation_threshold = 4
encryption_policy = "fail_open"

[monitor.predicate]
kind = "threshold"
threshold = 0.25
direction = "at_or_above"

[monitor.actions]
escalated = "sanction"

[monitor.endpoints]
reports = "http://collector/reports"
encrypt = "http://kms/encrypt"
enforce = "http://consensus/actions"

[[monitor]]
name = "peers"

[monitor.predicate]
kind = "flag"

[monitor.endpoints]
reports = "http://collector/peers"
encrypt = "http://kms/encrypt"
enforce = "http://consensus/actions"
finalize = "http://consensus/finalize"
"#;

    #[test]
    fn test_parse_sample() {
        let config = DaemonConfig::from_toml(SAMPLE).unwrap();
        assert_eq!(config.ledger.path, PathBuf::from("/tmp/ledger.jsonl"));
        assert_eq!(config.http.connect_timeout_ms, DEFAULT_CONNECT_TIMEOUT_MS);
        assert_eq!(config.monitors.len(), 2);

        let rbac = &config.monitors[0];
        assert_eq!(
            rbac.predicate,
            PredicateSpec::Threshold {
                threshold: 0.25,
                direction: Direction::AtOrAbove
            }
        );
        assert_eq!(rbac.actions.escalated, ActionKind::Sanction);
        assert_eq!(rbac.actions.alerted, ActionKind::Alert);
        assert!(rbac.endpoints.finalize.is_none());

        let engine = rbac.monitor_config().unwrap();
        assert_eq!(engine.interval, Duration::from_secs(5));
        assert_eq!(engine.violation_threshold, 4);
        assert_eq!(engine.encryption_policy, EncryptionPolicy::FailOpen);

        let peers = &config.monitors[1];
        assert_eq!(peers.predicate, PredicateSpec::Flag);
        assert_eq!(
            peers.endpoints.finalize.as_deref(),
            Some("http://consensus/finalize")
        );
    }

    #[test]
    fn test_rejects_duplicate_names() {
        let doubled = SAMPLE.replace("name = \"peers\"", "name = \"rbac\"");
        let err = DaemonConfig::from_toml(&doubled).unwrap_err();
        assert!(err.to_string().contains("duplicate monitor name"));
    }

    #[test]
    fn test_rejects_zero_threshold() {
        let zeroed = SAMPLE.replace("violation_threshold = 4", "violation_threshold = 0");
        let err = DaemonConfig::from_toml(&zeroed).unwrap_err();
        assert!(format!("{:#}", err).contains("violation_threshold"));
    }

    #[test]
    fn test_rejects_empty_config() {
        assert!(DaemonConfig::from_toml("[ledger]\npath = \"x\"\n").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sentinel.toml");
        std::fs::write(&path, SAMPLE).unwrap();
        let config = DaemonConfig::load(&path).unwrap();
        assert_eq!(config.monitors[0].name, "rbac");

        let missing = DaemonConfig::load(&dir.path().join("missing.toml")).unwrap_err();
        assert!(missing.to_string().contains("Failed to read config file"));
    }
}
