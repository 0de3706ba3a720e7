//! Engine configuration.
//!
//! The consensus engine is configured from a TOML document:
//!
//! ```toml
//! time_limit_secs = 900
//! majority_percentage = 51
//! majority_rule = "leader"
//! reward_amount = 1000000000000000000
//! worker_role = "workerrole.roles.greenproof.apps.iam.ewc"
//! role_version = 1
//! settlement = "on_deposit"
//! ```
//!
//! Every key is optional; missing keys take the defaults shown above.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::economics::SettlementPolicy;
use crate::registry::RoleId;
use crate::voting::MajorityRule;

/// Configuration for a [`ConsensusEngine`](crate::voting::ConsensusEngine).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Seconds after which an open round is considered expired.
    #[serde(default = "default_time_limit_secs")]
    pub time_limit_secs: u64,

    /// Share of the current worker set, in percent, that the leading value
    /// must reach to finalize a round.
    #[serde(default = "default_majority_percentage")]
    pub majority_percentage: u8,

    /// Whether the percentage applies to the leader's votes or to turnout.
    #[serde(default)]
    pub majority_rule: MajorityRule,

    /// Reward paid to each worker that voted for the winning value, in base
    /// units.
    #[serde(default = "default_reward_amount")]
    pub reward_amount: u64,

    /// Role a worker must hold at the authorization source.
    #[serde(default = "default_worker_role")]
    pub worker_role: RoleId,

    /// Role version passed to the authorization source.
    #[serde(default = "default_role_version")]
    pub role_version: u32,

    /// When deferred rewards are settled.
    #[serde(default)]
    pub settlement: SettlementPolicy,
}

const fn default_time_limit_secs() -> u64 {
    15 * 60
}

const fn default_majority_percentage() -> u8 {
    51
}

const fn default_reward_amount() -> u64 {
    1_000_000_000_000_000_000
}

fn default_worker_role() -> RoleId {
    RoleId::new("workerrole.roles.greenproof.apps.iam.ewc")
}

const fn default_role_version() -> u32 {
    1
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            time_limit_secs: default_time_limit_secs(),
            majority_percentage: default_majority_percentage(),
            majority_rule: MajorityRule::default(),
            reward_amount: default_reward_amount(),
            worker_role: default_worker_role(),
            role_version: default_role_version(),
            settlement: SettlementPolicy::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or a value is out of range.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if the time limit is zero or the
    /// majority percentage is outside `1..=100`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.time_limit_secs == 0 {
            return Err(ConfigError::Validation(
                "time_limit_secs must be greater than zero".to_string(),
            ));
        }
        if !(1..=100).contains(&self.majority_percentage) {
            return Err(ConfigError::Validation(format!(
                "majority_percentage must be in 1..=100, got {}",
                self.majority_percentage
            )));
        }
        if self.worker_role.as_str().is_empty() {
            return Err(ConfigError::Validation(
                "worker_role must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error reading configuration file.
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Validation error.
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = EngineConfig::from_toml("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.time_limit_secs, 900);
        assert_eq!(config.majority_percentage, 51);
        assert_eq!(config.majority_rule, MajorityRule::Leader);
        assert_eq!(config.settlement, SettlementPolicy::OnDeposit);
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
            time_limit_secs = 60
            majority_percentage = 100
            majority_rule = "participation"
            reward_amount = 5
            worker_role = "worker.roles.test"
            role_version = 2
            settlement = "explicit"
        "#;

        let config = EngineConfig::from_toml(toml).unwrap();
        assert_eq!(config.time_limit_secs, 60);
        assert_eq!(config.majority_percentage, 100);
        assert_eq!(config.majority_rule, MajorityRule::Participation);
        assert_eq!(config.reward_amount, 5);
        assert_eq!(config.worker_role, RoleId::new("worker.roles.test"));
        assert_eq!(config.role_version, 2);
        assert_eq!(config.settlement, SettlementPolicy::Explicit);
    }

    #[test]
    fn test_rejects_out_of_range_majority() {
        for bad in ["majority_percentage = 0", "majority_percentage = 101"] {
            assert!(matches!(
                EngineConfig::from_toml(bad),
                Err(ConfigError::Validation(_))
            ));
        }
    }

    #[test]
    fn test_rejects_zero_time_limit() {
        assert!(matches!(
            EngineConfig::from_toml("time_limit_secs = 0"),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_rejects_unknown_keys() {
        assert!(matches!(
            EngineConfig::from_toml("quorum = 3"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_toml_round_trip() {
        let config = EngineConfig {
            majority_percentage: 75,
            ..EngineConfig::default()
        };
        let encoded = config.to_toml().unwrap();
        assert_eq!(EngineConfig::from_toml(&encoded).unwrap(), config);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("greenproof.toml");
        std::fs::write(&path, "time_limit_secs = 30\n").unwrap();
        assert_eq!(EngineConfig::from_file(&path).unwrap().time_limit_secs, 30);

        let missing = dir.path().join("absent.toml");
        assert!(matches!(
            EngineConfig::from_file(&missing),
            Err(ConfigError::Io(_))
        ));
    }
}
