//! Resync configuration (YAML)
//!
//! ```yaml
//! governance_asset_code: MTLAP
//! association_account: GCNVDZIHGX473FEI7IXCUAEXUJ4BGCKEMHF36VYP5EMS7PX2QBLAMTLA
//! max_in_flight: 10
//! failure_threshold: 0.10
//! reputation:
//!   portfolio_factor: 1.0
//! ```
//!
//! Every field is optional; missing fields take the defaults below.

use guild_core::{is_valid_account_id, AssetKey, ConfigError, ReputationConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Distinguished association account; also issues the governance token
pub const DEFAULT_ASSOCIATION_ACCOUNT: &str =
    "GCNVDZIHGX473FEI7IXCUAEXUJ4BGCKEMHF36VYP5EMS7PX2QBLAMTLA";

pub const DEFAULT_GOVERNANCE_ASSET_CODE: &str = "MTLAP";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
    /// Code of the governance token
    pub governance_asset_code: String,
    /// Issuer of the governance token (defaults to the association account)
    pub governance_asset_issuer: String,
    /// Account whose metadata carries the association tags
    pub association_account: String,

    /// Concurrent fetch+persist units (1..=256)
    pub max_in_flight: usize,
    /// Tolerated failed/total ratio for a fetch batch (0.0..=1.0)
    pub failure_threshold: f64,
    /// Holder listing page size (1..=200)
    pub holder_page_size: usize,
    /// Failed ids included in the batch summary log
    pub failure_sample_size: usize,
    /// Derived-state write failures tolerated per pass
    pub max_write_errors: usize,

    pub reputation: ReputationConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            governance_asset_code: DEFAULT_GOVERNANCE_ASSET_CODE.to_string(),
            governance_asset_issuer: DEFAULT_ASSOCIATION_ACCOUNT.to_string(),
            association_account: DEFAULT_ASSOCIATION_ACCOUNT.to_string(),
            max_in_flight: 10,
            failure_threshold: 0.10,
            holder_page_size: 200,
            failure_sample_size: 10,
            max_write_errors: 10,
            reputation: ReputationConfig::default(),
        }
    }
}

impl SyncConfig {
    /// Load from a YAML file and validate
    pub fn from_yaml(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let config: SyncConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.governance_asset_code.is_empty() {
            return Err(ConfigError::Missing {
                field: "governance_asset_code".to_string(),
                hint: "Set the code of the governance token, e.g. MTLAP.".to_string(),
            });
        }
        for (field, value) in [
            ("governance_asset_issuer", &self.governance_asset_issuer),
            ("association_account", &self.association_account),
        ] {
            if !is_valid_account_id(value) {
                return Err(ConfigError::Missing {
                    field: field.to_string(),
                    hint: format!("'{}' is not a 56-character G... account id.", value),
                });
            }
        }
        if !(1..=256).contains(&self.max_in_flight) {
            return Err(ConfigError::range(
                "max_in_flight",
                self.max_in_flight,
                1,
                256,
                "Ledger endpoints throttle aggressive clients.",
            ));
        }
        if !(0.0..=1.0).contains(&self.failure_threshold) {
            return Err(ConfigError::range(
                "failure_threshold",
                self.failure_threshold,
                0.0,
                1.0,
                "Threshold is a failed/total ratio.",
            ));
        }
        if !(1..=200).contains(&self.holder_page_size) {
            return Err(ConfigError::range(
                "holder_page_size",
                self.holder_page_size,
                1,
                200,
                "The ledger API caps pages at 200 records.",
            ));
        }
        self.reputation.validate()
    }

    pub fn governance_asset(&self) -> AssetKey {
        AssetKey::new(&self.governance_asset_code, &self.governance_asset_issuer)
    }
}
