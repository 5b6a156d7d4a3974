//! TOML configuration
//!
//! Lives at `~/.pulsecoach/config.toml` unless `--config` points elsewhere.
//! Every section has defaults, so a file only needs the keys it changes.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::PulseCoachError;
use crate::logging::LogConfig;
use crate::recommendations::RecommendationThresholds;

const CONFIG_VERSION: &str = "1";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub metadata: ConfigMetadata,
    pub settings: AppSettings,
    /// Recommendation rule thresholds
    pub thresholds: RecommendationThresholds,
    pub simulation: SimulationSettings,
    pub logging: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigMetadata {
    pub version: String,
    /// Set on every save
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for ConfigMetadata {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION.to_string(),
            updated_at: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Directory holding `sleep.json` and `recovery.json`
    pub data_dir: PathBuf,

    /// Trend window when a command is given none
    pub default_window_days: u32,
}

impl Default for AppSettings {
    fn default() -> Self {
        let data_root = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            data_dir: data_root.join("pulsecoach").join("data"),
            default_window_days: 7,
        }
    }
}

/// Timing and randomness of the simulated coach and wearable
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    pub coach_reply_delay_ms: u64,
    pub device_sync_delay_ms: u64,
    /// Fixed seed for demo data; random when absent
    pub seed: Option<u64>,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            coach_reply_delay_ms: 1500,
            device_sync_delay_ms: 3000,
            seed: None,
        }
    }
}

impl SimulationSettings {
    pub fn coach_reply_delay(&self) -> Duration {
        Duration::from_millis(self.coach_reply_delay_ms)
    }

    pub fn device_sync_delay(&self) -> Duration {
        Duration::from_millis(self.device_sync_delay_ms)
    }
}

impl AppConfig {
    /// Read, parse and validate a config file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("Cannot read config {}", path.display()))?;
        let config: AppConfig = toml::from_str(&text)
            .with_context(|| format!("Invalid TOML in {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Write the config, creating parent directories and stamping `updated_at`
    pub fn save_to_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        self.metadata.updated_at = Some(Utc::now());

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Cannot create config directory {}", dir.display()))?;
        }
        let text = toml::to_string_pretty(self).context("Cannot serialize config")?;
        fs::write(path, text).with_context(|| format!("Cannot write config {}", path.display()))?;

        tracing::info!(path = %path.display(), "Saved configuration");
        Ok(())
    }

    pub fn default_config_path() -> PathBuf {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(".pulsecoach").join("config.toml")
    }

    /// Load `path` (or the default path); any failure yields defaults
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(Self::default_config_path);

        Self::load_from_file(&path).unwrap_or_else(|e| {
            tracing::debug!(path = %path.display(), error = %e, "Using default configuration");
            Self::default()
        })
    }

    /// Reject settings the engines cannot work with
    pub fn validate(&self) -> std::result::Result<(), PulseCoachError> {
        if self.settings.default_window_days == 0 {
            return Err(PulseCoachError::Configuration(
                "default_window_days must be at least 1".to_string(),
            ));
        }

        let t = &self.thresholds;
        if !(t.min_sleep_hours > 0.0 && t.min_sleep_hours <= 24.0) {
            return Err(PulseCoachError::Configuration(format!(
                "min_sleep_hours must be within (0, 24], got {}",
                t.min_sleep_hours
            )));
        }
        for (name, value) in [
            ("min_sleep_efficiency", t.min_sleep_efficiency),
            ("min_readiness", t.min_readiness),
            ("max_stress", t.max_stress),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(PulseCoachError::Configuration(format!(
                    "{} must be within 0-100, got {}",
                    name, value
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_survive_toml() {
        let config = AppConfig::default();
        let text = toml::to_string(&config).unwrap();
        let back: AppConfig = toml::from_str(&text).unwrap();

        assert_eq!(back.metadata.version, CONFIG_VERSION);
        assert_eq!(back.thresholds, config.thresholds);
        assert_eq!(back.simulation.seed, None);
        assert_eq!(back.settings.data_dir, config.settings.data_dir);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [thresholds]
            min_sleep_hours = 8.0

            [simulation]
            seed = 7
            "#,
        )
        .unwrap();

        assert_eq!(config.thresholds.min_sleep_hours, 8.0);
        assert_eq!(config.thresholds.max_stress, 70.0);
        assert_eq!(config.simulation.seed, Some(7));
        assert_eq!(config.simulation.coach_reply_delay_ms, 1500);
        assert_eq!(config.settings.default_window_days, 7);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = AppConfig::default();
        config.thresholds.min_sleep_hours = 7.5;
        config.simulation.seed = Some(42);
        config.save_to_file(&path).unwrap();
        assert!(config.metadata.updated_at.is_some());

        let loaded = AppConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded.thresholds.min_sleep_hours, 7.5);
        assert_eq!(loaded.simulation.seed, Some(42));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = AppConfig::default();
        config.thresholds.max_stress = 150.0;
        assert!(matches!(
            config.validate(),
            Err(PulseCoachError::Configuration(_))
        ));

        let mut config = AppConfig::default();
        config.settings.default_window_days = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_nan_thresholds_rejected() {
        let mut config = AppConfig::default();
        config.thresholds.min_sleep_hours = f64::NAN;
        assert!(matches!(
            config.validate(),
            Err(PulseCoachError::Configuration(_))
        ));

        let mut config = AppConfig::default();
        config.thresholds.min_readiness = f64::NAN;
        assert!(config.validate().is_err());

        let dir = tempdir().unwrap();
        let path = dir.path().join("nan.toml");
        fs::write(&path, "[thresholds]\nmin_sleep_hours = nan\n").unwrap();
        assert!(AppConfig::load_from_file(&path).is_err());
    }

    #[test]
    fn test_invalid_file_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        assert_eq!(AppConfig::load_or_default(Some(&missing)).settings.default_window_days, 7);

        let bad = dir.path().join("bad.toml");
        fs::write(&bad, "[settings]\ndefault_window_days = 0\n").unwrap();
        assert!(AppConfig::load_from_file(&bad).is_err());
        assert_eq!(AppConfig::load_or_default(Some(&bad)).settings.default_window_days, 7);
    }

    #[test]
    fn test_simulation_delays() {
        let settings = SimulationSettings::default();
        assert_eq!(settings.coach_reply_delay(), Duration::from_millis(1500));
        assert_eq!(settings.device_sync_delay(), Duration::from_millis(3000));
    }
}
