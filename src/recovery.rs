//! Sleep and Recovery Records
//!
//! This module defines the daily records that wearables (or the demo seeder)
//! produce for an athlete: one [`SleepRecord`] and one [`RecoveryRecord`] per
//! calendar day per source.
//!
//! # Physiology Background
//!
//! - **Readiness score**: composite 0-100 estimate of how prepared the body is
//!   for exertion today.
//! - **HRV (Heart Rate Variability)**: variation between successive heartbeats
//!   in milliseconds. Higher than personal baseline generally means better
//!   recovery.
//! - **Strain**: cumulative cardiovascular load on a 0-21 scale.
//! - **Body Battery**: 0-100 energy reserve estimate.
//!
//! Records are immutable once created. Range checks happen once, at the
//! ingestion boundary (see [`SleepRecord::validate`] and
//! [`RecoveryRecord::validate`]); downstream calculations trust their input.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Allowed relative gap between summed stage minutes and `duration × 60`
const STAGE_TOLERANCE: f64 = 0.15;

/// Status of a biometric reading relative to the athlete's baseline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BiometricStatus {
    Poor,
    Fair,
    Good,
    Excellent,
}

impl fmt::Display for BiometricStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BiometricStatus::Poor => write!(f, "poor"),
            BiometricStatus::Fair => write!(f, "fair"),
            BiometricStatus::Good => write!(f, "good"),
            BiometricStatus::Excellent => write!(f, "excellent"),
        }
    }
}

impl BiometricStatus {
    /// Classify a reading by its deviation from baseline
    ///
    /// # Algorithm
    ///
    /// Deviation is expressed in percent of baseline and signed so that a
    /// positive number is always the favourable direction:
    /// - Excellent: at least 5% better than baseline
    /// - Good: within 5% worse to 5% better
    /// - Fair: 5-15% worse
    /// - Poor: more than 15% worse
    ///
    /// # Arguments
    ///
    /// * `value` - Current reading
    /// * `baseline` - Personal baseline for the same metric
    /// * `higher_is_better` - true for HRV, false for resting heart rate
    pub fn from_baseline(value: f64, baseline: f64, higher_is_better: bool) -> Self {
        if baseline <= 0.0 {
            return BiometricStatus::Fair;
        }

        let mut deviation_pct = ((value - baseline) / baseline) * 100.0;
        if !higher_is_better {
            deviation_pct = -deviation_pct;
        }

        if deviation_pct >= 5.0 {
            BiometricStatus::Excellent
        } else if deviation_pct >= -5.0 {
            BiometricStatus::Good
        } else if deviation_pct >= -15.0 {
            BiometricStatus::Fair
        } else {
            BiometricStatus::Poor
        }
    }
}

/// Self-reported mood, ordered from worst to best
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mood {
    VeryLow,
    Low,
    Neutral,
    Good,
    Excellent,
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mood::VeryLow => write!(f, "very low"),
            Mood::Low => write!(f, "low"),
            Mood::Neutral => write!(f, "neutral"),
            Mood::Good => write!(f, "good"),
            Mood::Excellent => write!(f, "excellent"),
        }
    }
}

/// Skin temperature status relative to personal norm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureStatus {
    Normal,
    Elevated,
    Low,
}

impl TemperatureStatus {
    /// Deviations beyond ±0.5°C are flagged
    pub fn from_deviation(deviation: f64) -> Self {
        if deviation > 0.5 {
            TemperatureStatus::Elevated
        } else if deviation < -0.5 {
            TemperatureStatus::Low
        } else {
            TemperatureStatus::Normal
        }
    }
}

/// Minutes spent in each sleep stage
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SleepStageMinutes {
    pub awake: f64,
    pub light: f64,
    pub deep: f64,
    pub rem: f64,
}

impl SleepStageMinutes {
    pub fn total(&self) -> f64 {
        self.awake + self.light + self.deep + self.rem
    }
}

/// Overnight heart rate summary in bpm
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SleepHeartRate {
    pub resting: f64,
    pub average: f64,
    pub lowest: f64,
}

/// A single night of sleep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepRecord {
    /// Unique identifier for this record
    pub id: Uuid,

    /// Calendar day the night is attributed to (wake-up day)
    pub date: NaiveDate,

    /// Total sleep duration in hours
    pub duration: f64,

    /// Percentage of time in bed actually asleep (0-100)
    pub efficiency: f64,

    /// Overall sleep quality score (0-100)
    pub quality: f64,

    /// Stage breakdown in minutes, sums to roughly `duration × 60`
    pub stages: SleepStageMinutes,

    pub heart_rate: SleepHeartRate,

    /// Overnight HRV in milliseconds
    pub hrv: f64,

    /// Breaths per minute
    pub respiratory_rate: f64,

    /// Blood oxygen saturation in percent
    pub oxygen_saturation: f64,

    /// Device or integration that produced the record
    pub source: String,

    pub created_at: DateTime<Utc>,
}

impl SleepRecord {
    /// Check ranges before the record enters a store
    pub fn validate(&self) -> Result<(), RecordValidationError> {
        if self.duration.is_nan() || self.duration <= 0.0 {
            return Err(RecordValidationError::NonPositiveDuration(self.duration));
        }
        check_percent("efficiency", self.efficiency)?;
        check_percent("quality", self.quality)?;
        check_percent("oxygen_saturation", self.oxygen_saturation)?;

        let stages = [
            ("awake", self.stages.awake),
            ("light", self.stages.light),
            ("deep", self.stages.deep),
            ("rem", self.stages.rem),
        ];
        for (stage, minutes) in stages {
            if minutes < 0.0 {
                return Err(RecordValidationError::NegativeStage {
                    stage: stage.to_string(),
                    minutes,
                });
            }
        }

        let expected = self.duration * 60.0;
        let total = self.stages.total();
        if (total - expected).abs() > expected * STAGE_TOLERANCE {
            return Err(RecordValidationError::StageMismatch { total, expected });
        }

        Ok(())
    }
}

/// A reading paired with the athlete's personal baseline
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BaselineReading {
    pub value: f64,
    pub baseline: f64,
    pub status: BiometricStatus,
}

impl BaselineReading {
    /// Build a reading whose status is derived from its baseline
    pub fn new(value: f64, baseline: f64, higher_is_better: bool) -> Self {
        Self {
            value,
            baseline,
            status: BiometricStatus::from_baseline(value, baseline, higher_is_better),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemperatureReading {
    /// Deviation from personal norm in °C
    pub deviation: f64,
    pub status: TemperatureStatus,
}

/// Daily recovery snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryRecord {
    pub id: Uuid,

    pub date: NaiveDate,

    /// Physiological preparedness for exertion (0-100)
    pub readiness_score: f64,

    /// Recovery from previous load (0-100)
    pub recovery_score: f64,

    /// Cardiovascular load (0-21)
    pub strain: f64,

    /// HRV in milliseconds against baseline
    pub hrv: BaselineReading,

    /// Resting heart rate in bpm against baseline
    pub resting_heart_rate: BaselineReading,

    /// Stress (0-100, higher is worse)
    pub stress_level: f64,

    /// Energy (0-100)
    pub energy_level: f64,

    pub mood: Mood,

    /// Energy reserve (0-100)
    pub body_battery: f64,

    pub temperature: TemperatureReading,

    pub source: String,

    pub created_at: DateTime<Utc>,
}

impl RecoveryRecord {
    /// Check ranges before the record enters a store
    pub fn validate(&self) -> Result<(), RecordValidationError> {
        check_percent("readiness_score", self.readiness_score)?;
        check_percent("recovery_score", self.recovery_score)?;
        check_percent("stress_level", self.stress_level)?;
        check_percent("energy_level", self.energy_level)?;
        check_percent("body_battery", self.body_battery)?;

        if !(0.0..=21.0).contains(&self.strain) {
            return Err(RecordValidationError::StrainOutOfRange(self.strain));
        }

        Ok(())
    }
}

/// Common view over dated records used for window filtering and de-duplication
pub trait DatedRecord {
    fn date(&self) -> NaiveDate;
    fn source(&self) -> &str;
}

impl DatedRecord for SleepRecord {
    fn date(&self) -> NaiveDate {
        self.date
    }

    fn source(&self) -> &str {
        &self.source
    }
}

impl DatedRecord for RecoveryRecord {
    fn date(&self) -> NaiveDate {
        self.date
    }

    fn source(&self) -> &str {
        &self.source
    }
}

/// Record validation errors raised at ingestion
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordValidationError {
    #[error("Invalid sleep duration: {0}h (must be greater than 0)")]
    NonPositiveDuration(f64),

    #[error("Invalid {field}: {value} (valid range: 0-100)")]
    PercentOutOfRange { field: String, value: f64 },

    #[error("Invalid strain: {0} (valid range: 0-21)")]
    StrainOutOfRange(f64),

    #[error("Negative {stage} stage duration: {minutes} min")]
    NegativeStage { stage: String, minutes: f64 },

    #[error("Sleep stages sum to {total:.0} min, expected about {expected:.0} min")]
    StageMismatch { total: f64, expected: f64 },
}

fn check_percent(field: &str, value: f64) -> Result<(), RecordValidationError> {
    if (0.0..=100.0).contains(&value) {
        Ok(())
    } else {
        Err(RecordValidationError::PercentOutOfRange {
            field: field.to_string(),
            value,
        })
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn sleep(date: NaiveDate, duration: f64, efficiency: f64, quality: f64) -> SleepRecord {
        let minutes = duration * 60.0;
        SleepRecord {
            id: Uuid::new_v4(),
            date,
            duration,
            efficiency,
            quality,
            stages: SleepStageMinutes {
                awake: minutes * 0.05,
                light: minutes * 0.50,
                deep: minutes * 0.20,
                rem: minutes * 0.25,
            },
            heart_rate: SleepHeartRate {
                resting: 52.0,
                average: 58.0,
                lowest: 48.0,
            },
            hrv: 55.0,
            respiratory_rate: 14.5,
            oxygen_saturation: 97.0,
            source: "test".to_string(),
            created_at: Utc::now(),
        }
    }

    pub fn recovery(date: NaiveDate, readiness: f64, stress: f64) -> RecoveryRecord {
        RecoveryRecord {
            id: Uuid::new_v4(),
            date,
            readiness_score: readiness,
            recovery_score: readiness,
            strain: 10.0,
            hrv: BaselineReading::new(55.0, 55.0, true),
            resting_heart_rate: BaselineReading::new(52.0, 52.0, false),
            stress_level: stress,
            energy_level: 60.0,
            mood: Mood::Neutral,
            body_battery: 65.0,
            temperature: TemperatureReading {
                deviation: 0.1,
                status: TemperatureStatus::Normal,
            },
            source: "test".to_string(),
            created_at: Utc::now(),
        }
    }
}
