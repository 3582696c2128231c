//! groupshift.toml configuration parser.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::types::GroupCapacity;

/// Tag key used to attribute groups to a deployment unit when none is configured.
pub const DEFAULT_OWNERSHIP_TAG_KEY: &str = "groupshift:owner";

/// Which member state counts as converged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum HealthPredicate {
    /// Every member's machine state is `running`.
    #[default]
    AllRunning,
    /// Every member is `InService` in the group and `Healthy`.
    AllInServiceAndHealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Seconds between convergence polls.
    pub poll_interval_secs: u64,
    /// Upper bound on waiting for one group to disappear after deletion.
    pub delete_wait_secs: u64,
    pub ownership_tag_key: String,
    pub describe_page_size: u32,
    pub scheduled_actions_page_size: u32,
    pub health_predicate: HealthPredicate,
    pub retry: RetryConfig,
    /// Returned by owned-group lookup when nothing in the region is owned.
    pub defaults: GroupCapacity,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    /// Falls back to the poll interval when unset.
    pub backoff_secs: Option<u64>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            backoff_secs: None,
        }
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 15,
            delete_wait_secs: 60,
            ownership_tag_key: DEFAULT_OWNERSHIP_TAG_KEY.to_string(),
            describe_page_size: 100,
            scheduled_actions_page_size: 100,
            health_predicate: HealthPredicate::default(),
            retry: RetryConfig::default(),
            defaults: GroupCapacity {
                name: String::new(),
                min: 0,
                max: 10,
                desired: 6,
            },
        }
    }
}

impl LifecycleConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: LifecycleConfig = toml::from_str(content)?;
        if config.poll_interval_secs == 0 {
            anyhow::bail!("poll_interval_secs must be greater than zero");
        }
        if config.retry.max_attempts == 0 {
            anyhow::bail!("retry.max_attempts must be at least 1");
        }
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn delete_wait(&self) -> Duration {
        Duration::from_secs(self.delete_wait_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_secs(self.retry.backoff_secs.unwrap_or(self.poll_interval_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LifecycleConfig::default();
        assert_eq!(config.poll_interval(), Duration::from_secs(15));
        assert_eq!(config.delete_wait(), Duration::from_secs(60));
        assert_eq!(config.retry_backoff(), Duration::from_secs(15));
        assert_eq!(config.health_predicate, HealthPredicate::AllRunning);
    }

    #[test]
    fn test_parse_partial() {
        let toml_str = r#"
poll_interval_secs = 5
health_predicate = "all_in_service_and_healthy"

[retry]
backoff_secs = 1

[defaults]
name = "bootstrap"
min = 0
max = 4
desired = 2
"#;
        let config = LifecycleConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(config.poll_interval_secs, 5);
        assert_eq!(config.health_predicate, HealthPredicate::AllInServiceAndHealthy);
        assert_eq!(config.retry.max_attempts, 2);
        assert_eq!(config.retry_backoff(), Duration::from_secs(1));
        assert_eq!(config.defaults.name, "bootstrap");
        assert_eq!(config.ownership_tag_key, DEFAULT_OWNERSHIP_TAG_KEY);
    }

    #[test]
    fn test_rejects_zero_interval() {
        assert!(LifecycleConfig::from_toml_str("poll_interval_secs = 0").is_err());
    }

    #[test]
    fn test_round_trips_through_toml() {
        let config = LifecycleConfig::default();
        let text = config.to_toml_string().unwrap();
        assert_eq!(LifecycleConfig::from_toml_str(&text).unwrap(), config);
    }
}
