//! Named tunables consumed by scoring, matching, and reporting.
//!
//! Built once at process start from environment/file and threaded
//! explicitly into every downstream call — never a global singleton.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconConfig {
    pub amount_tolerance_percent: f64,
    pub settlement_window_hours: i64,
    pub chargeback_window_days: i64,
    pub refund_window_days: i64,
    pub min_confidence_for_auto_match: u8,
    pub currency_fx_tolerance_percent: f64,
    pub orphan_threshold_days: i64,
}

impl Default for ReconConfig {
    fn default() -> Self {
        Self {
            amount_tolerance_percent: 5.0,
            settlement_window_hours: 72,
            chargeback_window_days: 90,
            refund_window_days: 30,
            min_confidence_for_auto_match: 80,
            currency_fx_tolerance_percent: 10.0,
            orphan_threshold_days: 7,
        }
    }
}

impl ReconConfig {
    /// Loads configuration layered: built-in defaults, then environment
    /// variables prefixed `RECON_` (e.g. `RECON_AMOUNT_TOLERANCE_PERCENT`).
    pub fn load() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let built = config::Config::builder()
            .add_source(config::Config::try_from(&ReconConfig::default())?)
            .add_source(config::Environment::with_prefix("RECON"))
            .build()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        let cfg: ReconConfig = built
            .try_deserialize()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.amount_tolerance_percent <= 0.0 {
            return Err(ConfigError::Invalid(
                "amount_tolerance_percent must be > 0".into(),
            ));
        }
        if self.currency_fx_tolerance_percent <= 0.0 {
            return Err(ConfigError::Invalid(
                "currency_fx_tolerance_percent must be > 0".into(),
            ));
        }
        if self.settlement_window_hours <= 0 {
            return Err(ConfigError::Invalid(
                "settlement_window_hours must be > 0".into(),
            ));
        }
        if self.chargeback_window_days <= 0 || self.refund_window_days <= 0 {
            return Err(ConfigError::Invalid(
                "chargeback_window_days and refund_window_days must be > 0".into(),
            ));
        }
        if self.min_confidence_for_auto_match > 100 {
            return Err(ConfigError::Invalid(
                "min_confidence_for_auto_match must be <= 100".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = ReconConfig::default();
        assert_eq!(cfg.amount_tolerance_percent, 5.0);
        assert_eq!(cfg.settlement_window_hours, 72);
        assert_eq!(cfg.chargeback_window_days, 90);
        assert_eq!(cfg.refund_window_days, 30);
        assert_eq!(cfg.min_confidence_for_auto_match, 80);
        assert_eq!(cfg.currency_fx_tolerance_percent, 10.0);
        assert_eq!(cfg.orphan_threshold_days, 7);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn rejects_nonpositive_tolerance() {
        let mut cfg = ReconConfig::default();
        cfg.amount_tolerance_percent = 0.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_confidence_above_100() {
        let mut cfg = ReconConfig::default();
        cfg.min_confidence_for_auto_match = 150;
        assert!(cfg.validate().is_err());
    }
}
