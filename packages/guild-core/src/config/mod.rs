//! Tunables for the graph computations
//!
//! Everything here is plain serde data with defaults, so a host can embed it
//! in a larger YAML document and call [`ReputationConfig::validate`] once.

mod error;

pub use error::{ConfigError, ConfigResult};

use serde::{Deserialize, Serialize};

/// Rater weight factors
///
/// `weight = 1 + portfolio_factor·ln(1 + max(portfolio, 0))
///             + connection_factor·ln(1 + connections)`
///
/// # Examples
///
/// ```rust
/// use guild_core::ReputationConfig;
///
/// let config = ReputationConfig::default();
/// assert_eq!(config.weight(0.0, 0), 1.0);
/// assert!(config.weight(100.0, 3) > config.weight(10.0, 3));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReputationConfig {
    pub portfolio_factor: f64,
    pub connection_factor: f64,
}

impl Default for ReputationConfig {
    fn default() -> Self {
        Self {
            portfolio_factor: 1.0,
            connection_factor: 1.0,
        }
    }
}

impl ReputationConfig {
    /// Both factors must be finite and non-negative
    pub fn validate(&self) -> ConfigResult<()> {
        for (field, value) in [
            ("portfolio_factor", self.portfolio_factor),
            ("connection_factor", self.connection_factor),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::range(
                    field,
                    value,
                    0.0,
                    "inf",
                    "Negative factors would make weights non-monotonic.",
                ));
            }
        }
        Ok(())
    }

    /// Rater weight. Always ≥ 1 for valid factors.
    pub fn weight(&self, portfolio_value: f64, connection_count: u32) -> f64 {
        let portfolio = if portfolio_value.is_finite() {
            portfolio_value.max(0.0)
        } else {
            0.0
        };
        1.0 + self.portfolio_factor * portfolio.ln_1p()
            + self.connection_factor * f64::from(connection_count).ln_1p()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weight_baseline() {
        let config = ReputationConfig::default();
        assert_eq!(config.weight(0.0, 0), 1.0);
        assert_eq!(config.weight(-50.0, 0), 1.0);
        assert!((config.weight(0.0, 1) - (1.0 + 2f64.ln())).abs() < 1e-12);
    }

    #[test]
    fn test_weight_monotonic() {
        let config = ReputationConfig::default();
        let mut last = 0.0;
        for portfolio in [0.0, 1.0, 10.0, 1_000.0, 1e9] {
            let w = config.weight(portfolio, 2);
            assert!(w > last);
            last = w;
        }
        assert!(config.weight(5.0, 10) > config.weight(5.0, 9));
    }

    #[test]
    fn test_zero_factors_flatten_weight() {
        let config = ReputationConfig {
            portfolio_factor: 0.0,
            connection_factor: 0.0,
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.weight(1e6, 1_000), 1.0);
    }

    #[test]
    fn test_negative_factor_rejected() {
        let config = ReputationConfig {
            portfolio_factor: -0.5,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("portfolio_factor"));
    }

    #[test]
    fn test_yaml_partial_uses_defaults() {
        let config: ReputationConfig = serde_yaml::from_str("connection_factor: 0.5").unwrap();
        assert_eq!(config.portfolio_factor, 1.0);
        assert_eq!(config.connection_factor, 0.5);
        assert!(serde_yaml::from_str::<ReputationConfig>("bogus: 1").is_err());
    }
}
