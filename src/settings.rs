use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::analysis::Params;
use crate::error::{Result, ScopeError};
use crate::models::{Operation, DEFAULT_ACCOUNT_ID};
use crate::stats::{DEFAULT_BINS, DEFAULT_IQR_MULTIPLIER};

/// Overrides the config directory (used by tests and portable installs).
pub const CONFIG_DIR_ENV: &str = "LEDGERSCOPE_CONFIG_DIR";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_account_id")]
    pub account_id: i64,
    #[serde(default)]
    pub operation: Operation,
    #[serde(default = "default_bins")]
    pub bins: usize,
    #[serde(default = "default_iqr_multiplier")]
    pub iqr_multiplier: f64,
    #[serde(default = "default_preview_rows")]
    pub preview_rows: usize,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_account_id() -> i64 {
    DEFAULT_ACCOUNT_ID
}

fn default_bins() -> usize {
    DEFAULT_BINS
}

fn default_iqr_multiplier() -> f64 {
    DEFAULT_IQR_MULTIPLIER
}

fn default_preview_rows() -> usize {
    20
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            account_id: default_account_id(),
            operation: Operation::default(),
            bins: default_bins(),
            iqr_multiplier: default_iqr_multiplier(),
            preview_rows: default_preview_rows(),
            log_level: default_log_level(),
        }
    }
}

impl Settings {
    /// Pipeline parameters seeded from these settings.
    pub fn params(&self) -> Params {
        Params {
            account_id: self.account_id,
            operation: self.operation,
            bins: self.bins,
            iqr_multiplier: self.iqr_multiplier,
            preview_rows: self.preview_rows,
        }
    }

    /// Set one key from its command-line string form.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let invalid = |why: &str| ScopeError::Settings(format!("{key}: {why} (got {value:?})"));
        match key {
            "account_id" => {
                self.account_id = value.trim().parse().map_err(|_| invalid("expected an integer"))?;
            }
            "operation" => {
                self.operation = value.parse()?;
            }
            "bins" => {
                let bins: usize = value.trim().parse().map_err(|_| invalid("expected a positive integer"))?;
                if bins == 0 {
                    return Err(invalid("must be at least 1"));
                }
                self.bins = bins;
            }
            "iqr_multiplier" => {
                let k: f64 = value.trim().parse().map_err(|_| invalid("expected a number"))?;
                if !k.is_finite() || k < 0.0 {
                    return Err(invalid("must be a non-negative number"));
                }
                self.iqr_multiplier = k;
            }
            "preview_rows" => {
                self.preview_rows = value.trim().parse().map_err(|_| invalid("expected an integer"))?;
            }
            "log_level" => {
                let level = value.trim().to_ascii_lowercase();
                if !["error", "warn", "info", "debug", "trace"].contains(&level.as_str()) {
                    return Err(invalid("expected one of error, warn, info, debug, trace"));
                }
                self.log_level = level;
            }
            _ => {
                return Err(ScopeError::Settings(format!(
                    "unknown key '{key}' (expected account_id, operation, bins, iqr_multiplier, preview_rows, log_level)"
                )))
            }
        }
        Ok(())
    }
}

fn config_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV) {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("ledgerscope")
}

pub fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

pub fn load_settings() -> Settings {
    let path = settings_path();
    if !path.exists() {
        return Settings::default();
    }
    let content = std::fs::read_to_string(&path).unwrap_or_default();
    match serde_json::from_str(&content) {
        Ok(settings) => settings,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "unreadable settings, using defaults");
            Settings::default()
        }
    }
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    let dir = config_dir();
    std::fs::create_dir_all(&dir)?;
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| ScopeError::Settings(e.to_string()))?;
    std::fs::write(settings_path(), format!("{json}\n"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // only test that sets CONFIG_DIR_ENV
    #[test]
    fn test_save_and_load_through_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::env::set_var(CONFIG_DIR_ENV, dir.path().join("nested"));
        assert_eq!(settings_path(), dir.path().join("nested").join("settings.json"));

        // no file yet
        assert_eq!(load_settings(), Settings::default());

        let settings = Settings {
            account_id: 1726,
            operation: Operation::CreditInCash,
            bins: 40,
            ..Settings::default()
        };
        save_settings(&settings).unwrap();
        assert_eq!(load_settings(), settings);

        std::fs::write(settings_path(), "{ not json").unwrap();
        assert_eq!(load_settings(), Settings::default());

        std::env::remove_var(CONFIG_DIR_ENV);
    }

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert_eq!(s.account_id, 5740);
        assert_eq!(s.operation, Operation::CashWithdrawal);
        assert_eq!(s.bins, 30);
        assert_eq!(s.iqr_multiplier, 1.5);
        assert_eq!(s.log_level, "warn");
    }

    #[test]
    fn test_load_merges_with_defaults() {
        let json = r#"{"account_id": 42, "operation": "CREDIT IN CASH"}"#;
        let s: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(s.account_id, 42);
        assert_eq!(s.operation, Operation::CreditInCash);
        assert_eq!(s.bins, 30);
        assert_eq!(s.preview_rows, 20);
    }

    #[test]
    fn test_set_validates_values() {
        let mut s = Settings::default();
        s.set("account_id", "1726").unwrap();
        s.set("operation", "remittance").unwrap();
        s.set("iqr_multiplier", "3").unwrap();
        s.set("log_level", "DEBUG").unwrap();
        assert_eq!(s.account_id, 1726);
        assert_eq!(s.operation, Operation::RemittanceToAnotherBank);
        assert_eq!(s.iqr_multiplier, 3.0);
        assert_eq!(s.log_level, "debug");

        assert!(s.set("bins", "0").is_err());
        assert!(s.set("iqr_multiplier", "-1").is_err());
        assert!(s.set("operation", "SWIFT").is_err());
        assert!(s.set("colour", "blue").is_err());
    }

    #[test]
    fn test_params_from_settings() {
        let s = Settings {
            account_id: 9,
            preview_rows: 5,
            ..Settings::default()
        };
        let p = s.params();
        assert_eq!(p.account_id, 9);
        assert_eq!(p.preview_rows, 5);
        assert_eq!(p.bins, 30);
    }
}
