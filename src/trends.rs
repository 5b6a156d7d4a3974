//! Windowed trend aggregation for sleep and recovery records
//!
//! Computes unweighted means over the last N days and a chronological
//! per-day series for charting.
//!
//! # Window Semantics
//!
//! The window is anchored on the caller's wall clock, not on the newest
//! record: a record is included when `date >= today - window_days`. An empty
//! window is not an error; every average is reported as `0.0` and the series
//! is empty so dashboards always have something to render.
//!
//! No rounding is applied here.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::recovery::{DatedRecord, RecoveryRecord, SleepRecord};

/// Relative change (percent) between window halves treated as flat
const STABLE_BAND_PCT: f64 = 5.0;

/// Direction of the headline metric across the window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Improving,
    Stable,
    Declining,
}

/// Raw values for one sleep record in the window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepTrendPoint {
    pub date: NaiveDate,
    pub duration: f64,
    pub quality: f64,
    pub efficiency: f64,
    pub hrv: f64,
    pub resting_heart_rate: f64,
}

/// Sleep averages over a window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepTrendSummary {
    pub window_days: u32,
    pub record_count: usize,
    /// Hours
    pub average_duration: f64,
    pub average_quality: f64,
    pub average_efficiency: f64,
    /// Milliseconds
    pub average_hrv: f64,
    /// bpm
    pub average_resting_heart_rate: f64,
    /// Based on quality score
    pub direction: TrendDirection,
    /// Ascending by date
    pub points: Vec<SleepTrendPoint>,
}

impl SleepTrendSummary {
    fn empty(window_days: u32) -> Self {
        Self {
            window_days,
            record_count: 0,
            average_duration: 0.0,
            average_quality: 0.0,
            average_efficiency: 0.0,
            average_hrv: 0.0,
            average_resting_heart_rate: 0.0,
            direction: TrendDirection::Stable,
            points: Vec::new(),
        }
    }
}

/// Raw values for one recovery record in the window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryTrendPoint {
    pub date: NaiveDate,
    pub readiness: f64,
    pub recovery: f64,
    pub strain: f64,
    pub stress: f64,
    pub energy: f64,
    pub body_battery: f64,
}

/// Recovery averages over a window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryTrendSummary {
    pub window_days: u32,
    pub record_count: usize,
    pub average_readiness: f64,
    pub average_recovery: f64,
    pub average_strain: f64,
    pub average_stress: f64,
    pub average_energy: f64,
    pub average_body_battery: f64,
    /// Based on readiness score
    pub direction: TrendDirection,
    /// Ascending by date
    pub points: Vec<RecoveryTrendPoint>,
}

impl RecoveryTrendSummary {
    fn empty(window_days: u32) -> Self {
        Self {
            window_days,
            record_count: 0,
            average_readiness: 0.0,
            average_recovery: 0.0,
            average_strain: 0.0,
            average_stress: 0.0,
            average_energy: 0.0,
            average_body_battery: 0.0,
            direction: TrendDirection::Stable,
            points: Vec::new(),
        }
    }
}

/// Trend aggregation engine
///
/// Stateless apart from its clock; safe to call repeatedly and from
/// multiple threads.
pub struct TrendAggregator<C: Clock = SystemClock> {
    clock: C,
}

impl TrendAggregator<SystemClock> {
    /// Create aggregator anchored on the system clock
    pub fn new() -> Self {
        TrendAggregator { clock: SystemClock }
    }
}

impl Default for TrendAggregator<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> TrendAggregator<C> {
    /// Create aggregator anchored on a custom clock
    pub fn with_clock(clock: C) -> Self {
        TrendAggregator { clock }
    }

    /// First day included in a window of `window_days`
    ///
    /// Windows reaching past the earliest representable date start there.
    pub fn window_start(&self, window_days: u32) -> NaiveDate {
        self.clock
            .today()
            .checked_sub_signed(Duration::days(i64::from(window_days)))
            .unwrap_or(NaiveDate::MIN)
    }

    /// Aggregate sleep records over the last `window_days`
    pub fn sleep_trend(&self, records: &[SleepRecord], window_days: u32) -> SleepTrendSummary {
        let window = self.filter_window(records, window_days);
        if window.is_empty() {
            debug!(window_days, "Sleep trend window is empty");
            return SleepTrendSummary::empty(window_days);
        }

        let points: Vec<SleepTrendPoint> = window
            .iter()
            .map(|r| SleepTrendPoint {
                date: r.date,
                duration: r.duration,
                quality: r.quality,
                efficiency: r.efficiency,
                hrv: r.hrv,
                resting_heart_rate: r.heart_rate.resting,
            })
            .collect();

        let quality: Vec<f64> = points.iter().map(|p| p.quality).collect();
        let summary = SleepTrendSummary {
            window_days,
            record_count: points.len(),
            average_duration: mean_of(&points, |p| p.duration),
            average_quality: mean(&quality),
            average_efficiency: mean_of(&points, |p| p.efficiency),
            average_hrv: mean_of(&points, |p| p.hrv),
            average_resting_heart_rate: mean_of(&points, |p| p.resting_heart_rate),
            direction: direction(&quality),
            points,
        };

        debug!(
            window_days,
            records = summary.record_count,
            avg_duration = summary.average_duration,
            "Computed sleep trend"
        );
        summary
    }

    /// Aggregate recovery records over the last `window_days`
    pub fn recovery_trend(
        &self,
        records: &[RecoveryRecord],
        window_days: u32,
    ) -> RecoveryTrendSummary {
        let window = self.filter_window(records, window_days);
        if window.is_empty() {
            debug!(window_days, "Recovery trend window is empty");
            return RecoveryTrendSummary::empty(window_days);
        }

        let points: Vec<RecoveryTrendPoint> = window
            .iter()
            .map(|r| RecoveryTrendPoint {
                date: r.date,
                readiness: r.readiness_score,
                recovery: r.recovery_score,
                strain: r.strain,
                stress: r.stress_level,
                energy: r.energy_level,
                body_battery: r.body_battery,
            })
            .collect();

        let readiness: Vec<f64> = points.iter().map(|p| p.readiness).collect();
        let summary = RecoveryTrendSummary {
            window_days,
            record_count: points.len(),
            average_readiness: mean(&readiness),
            average_recovery: mean_of(&points, |p| p.recovery),
            average_strain: mean_of(&points, |p| p.strain),
            average_stress: mean_of(&points, |p| p.stress),
            average_energy: mean_of(&points, |p| p.energy),
            average_body_battery: mean_of(&points, |p| p.body_battery),
            direction: direction(&readiness),
            points,
        };

        debug!(
            window_days,
            records = summary.record_count,
            avg_readiness = summary.average_readiness,
            "Computed recovery trend"
        );
        summary
    }

    /// Records inside the window, sorted ascending by date (stable)
    fn filter_window<'a, R: DatedRecord>(&self, records: &'a [R], window_days: u32) -> Vec<&'a R> {
        let start = self.window_start(window_days);
        let mut window: Vec<&R> = records.iter().filter(|r| r.date() >= start).collect();
        window.sort_by_key(|r| r.date());
        window
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().mean()
    }
}

fn mean_of<T>(items: &[T], field: impl Fn(&T) -> f64) -> f64 {
    let values: Vec<f64> = items.iter().map(field).collect();
    mean(&values)
}

/// Compare the mean of the later half of the series against the earlier half
fn direction(series: &[f64]) -> TrendDirection {
    if series.len() < 2 {
        return TrendDirection::Stable;
    }

    let (earlier, later) = series.split_at(series.len() / 2);
    let before = mean(earlier);
    let after = mean(later);

    let change_pct = if before == 0.0 {
        if after > 0.0 {
            100.0
        } else {
            0.0
        }
    } else {
        (after - before) / before.abs() * 100.0
    };

    if change_pct > STABLE_BAND_PCT {
        TrendDirection::Improving
    } else if change_pct < -STABLE_BAND_PCT {
        TrendDirection::Declining
    } else {
        TrendDirection::Stable
    }
}
