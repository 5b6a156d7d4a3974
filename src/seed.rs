//! Seedable demo data generation
//!
//! Produces plausible sleep and recovery records for demos and simulated
//! device syncs. Every random draw goes through one [`StdRng`], so a
//! generator created with [`DemoDataGenerator::with_seed`] yields the same
//! records (ids included) on every run.

use chrono::{Duration, NaiveDate, NaiveTime};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use uuid::{Builder, Uuid};

use crate::recovery::{
    BaselineReading, Mood, RecoveryRecord, SleepHeartRate, SleepRecord, SleepStageMinutes,
    TemperatureReading, TemperatureStatus,
};

const HRV_BASELINE_MS: f64 = 55.0;
const RESTING_HR_BASELINE: f64 = 52.0;
const MOODS: [Mood; 5] = [Mood::VeryLow, Mood::Low, Mood::Neutral, Mood::Good, Mood::Excellent];

pub const DEMO_SOURCE: &str = "demo";

/// Up-front allocation cap for `history`; longer histories grow as they go
const MAX_PREALLOCATED_DAYS: usize = 3660;

/// Random record generator with an injectable seed
#[derive(Debug, Clone)]
pub struct DemoDataGenerator {
    rng: StdRng,
    source: String,
}

impl DemoDataGenerator {
    /// Reproducible generator
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            source: DEMO_SOURCE.to_string(),
        }
    }

    /// Non-reproducible generator seeded from the OS
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            source: DEMO_SOURCE.to_string(),
        }
    }

    /// Tag generated records with a different source
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    fn next_id(&mut self) -> Uuid {
        Builder::from_random_bytes(self.rng.gen()).into_uuid()
    }

    /// Generated records are stamped at 07:00 UTC on their day
    fn morning_of(date: NaiveDate) -> chrono::DateTime<chrono::Utc> {
        date.and_time(NaiveTime::from_hms_opt(7, 0, 0).unwrap_or_default())
            .and_utc()
    }

    /// Pick an index in `0..len` (0 when `len` is 0)
    pub fn pick_index(&mut self, len: usize) -> usize {
        if len == 0 {
            0
        } else {
            self.rng.gen_range(0..len)
        }
    }

    /// One night of sleep attributed to `date`
    pub fn sleep_record(&mut self, date: NaiveDate) -> SleepRecord {
        let duration: f64 = self.rng.gen_range(5.5..9.0);
        let minutes = duration * 60.0;

        let awake_frac: f64 = self.rng.gen_range(0.03..0.12);
        let deep_frac: f64 = self.rng.gen_range(0.13..0.23);
        let rem_frac: f64 = self.rng.gen_range(0.18..0.25);
        let light_frac = 1.0 - awake_frac - deep_frac - rem_frac;

        let efficiency =
            (100.0 - awake_frac * 100.0 - self.rng.gen_range(0.0..8.0)).clamp(0.0, 100.0);
        let quality =
            (duration / 8.0 * 45.0 + (efficiency - 70.0) + deep_frac * 60.0).clamp(0.0, 100.0);

        let resting: f64 = self.rng.gen_range(45.0..60.0);

        SleepRecord {
            id: self.next_id(),
            date,
            duration,
            efficiency,
            quality,
            stages: SleepStageMinutes {
                awake: minutes * awake_frac,
                light: minutes * light_frac,
                deep: minutes * deep_frac,
                rem: minutes * rem_frac,
            },
            heart_rate: SleepHeartRate {
                resting,
                average: resting + self.rng.gen_range(3.0..8.0),
                lowest: resting - self.rng.gen_range(1.0..5.0),
            },
            hrv: self.rng.gen_range(35.0..80.0),
            respiratory_rate: self.rng.gen_range(12.0..17.0),
            oxygen_saturation: self.rng.gen_range(94.0..99.0),
            source: self.source.clone(),
            created_at: Self::morning_of(date),
        }
    }

    /// One day of recovery metrics for `date`
    pub fn recovery_record(&mut self, date: NaiveDate) -> RecoveryRecord {
        let readiness: f64 = self.rng.gen_range(40.0..95.0);
        let recovery = (readiness + self.rng.gen_range(-10.0..10.0)).clamp(0.0, 100.0);
        let deviation: f64 = self.rng.gen_range(-0.8..0.8);
        let mood = MOODS.choose(&mut self.rng).copied().unwrap_or(Mood::Neutral);

        RecoveryRecord {
            id: self.next_id(),
            date,
            readiness_score: readiness,
            recovery_score: recovery,
            strain: self.rng.gen_range(4.0..18.0),
            hrv: BaselineReading::new(self.rng.gen_range(35.0..80.0), HRV_BASELINE_MS, true),
            resting_heart_rate: BaselineReading::new(
                self.rng.gen_range(46.0..62.0),
                RESTING_HR_BASELINE,
                false,
            ),
            stress_level: self.rng.gen_range(15.0..90.0),
            energy_level: self.rng.gen_range(30.0..95.0),
            mood,
            body_battery: self.rng.gen_range(20.0..100.0),
            temperature: TemperatureReading {
                deviation,
                status: TemperatureStatus::from_deviation(deviation),
            },
            source: self.source.clone(),
            created_at: Self::morning_of(date),
        }
    }

    /// `days` consecutive days of records ending on `end` (inclusive), ascending
    ///
    /// A history reaching past the earliest representable date is cut short
    /// and starts there.
    pub fn history(
        &mut self,
        end: NaiveDate,
        days: u32,
    ) -> (Vec<SleepRecord>, Vec<RecoveryRecord>) {
        if days == 0 {
            return (Vec::new(), Vec::new());
        }

        let first = end
            .checked_sub_signed(Duration::days(i64::from(days - 1)))
            .unwrap_or(NaiveDate::MIN);
        let count = usize::try_from((end - first).num_days() + 1).unwrap_or(0);

        let mut sleep = Vec::with_capacity(count.min(MAX_PREALLOCATED_DAYS));
        let mut recovery = Vec::with_capacity(count.min(MAX_PREALLOCATED_DAYS));
        for date in first.iter_days().take(count) {
            sleep.push(self.sleep_record(date));
            recovery.push(self.recovery_record(date));
        }

        (sleep, recovery)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn end() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 9, 30).unwrap()
    }

    #[test]
    fn test_same_seed_same_records() {
        let (a_sleep, a_rec) = DemoDataGenerator::with_seed(42).history(end(), 5);
        let (b_sleep, b_rec) = DemoDataGenerator::with_seed(42).history(end(), 5);
        assert_eq!(a_sleep, b_sleep);
        assert_eq!(a_rec, b_rec);
    }

    #[test]
    fn test_different_seed_different_records() {
        let a = DemoDataGenerator::with_seed(1).sleep_record(end());
        let b = DemoDataGenerator::with_seed(2).sleep_record(end());
        assert_ne!(a.id, b.id);
        assert_ne!(a.duration, b.duration);
    }

    #[test]
    fn test_generated_records_pass_validation() {
        let mut generator = DemoDataGenerator::with_seed(7);
        let (sleep, recovery) = generator.history(end(), 60);
        for record in &sleep {
            record.validate().unwrap();
        }
        for record in &recovery {
            record.validate().unwrap();
        }
    }

    #[test]
    fn test_history_is_ascending_and_ends_on_end() {
        let (sleep, recovery) = DemoDataGenerator::with_seed(3).history(end(), 7);
        assert_eq!(sleep.len(), 7);
        assert_eq!(sleep.first().unwrap().date, end() - Duration::days(6));
        assert_eq!(sleep.last().unwrap().date, end());
        assert!(recovery.windows(2).all(|w| w[0].date < w[1].date));
    }

    #[test]
    fn test_history_stops_at_earliest_date() {
        let end = NaiveDate::MIN + Duration::days(2);
        let (sleep, recovery) = DemoDataGenerator::with_seed(3).history(end, 10);
        assert_eq!(sleep.len(), 3);
        assert_eq!(recovery.len(), 3);
        assert_eq!(sleep[0].date, NaiveDate::MIN);
        assert_eq!(sleep[2].date, end);
    }

    #[test]
    fn test_empty_history() {
        let (sleep, recovery) = DemoDataGenerator::with_seed(3).history(end(), 0);
        assert!(sleep.is_empty() && recovery.is_empty());
    }

    #[test]
    fn test_custom_source() {
        let record = DemoDataGenerator::with_seed(3)
            .with_source("whoop")
            .recovery_record(end());
        assert_eq!(record.source, "whoop");
    }

    #[test]
    fn test_pick_index_bounds() {
        let mut generator = DemoDataGenerator::with_seed(9);
        assert_eq!(generator.pick_index(0), 0);
        for _ in 0..50 {
            assert!(generator.pick_index(4) < 4);
        }
    }
}
