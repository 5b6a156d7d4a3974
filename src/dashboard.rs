//! Dashboard service
//!
//! Reads snapshots from an injected [`RecordStore`] and runs them through the
//! trend aggregator and recommendation engine. The engines never see the
//! store; they get immutable slices and return new values.

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::clock::{Clock, SystemClock};
use crate::error::Result;
use crate::recommendations::{Recommendation, RecommendationEngine, RecommendationThresholds};
use crate::recovery::{RecoveryRecord, SleepRecord};
use crate::store::RecordStore;
use crate::trends::{RecoveryTrendSummary, SleepTrendSummary, TrendAggregator};

/// Everything a dashboard page renders
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardOverview {
    pub sleep_trend: SleepTrendSummary,
    pub recovery_trend: RecoveryTrendSummary,
    pub latest_sleep: Option<SleepRecord>,
    pub latest_recovery: Option<RecoveryRecord>,
    pub recommendations: Vec<Recommendation>,
}

pub struct Dashboard<S: RecordStore, C: Clock + Clone = SystemClock> {
    store: S,
    aggregator: TrendAggregator<C>,
    engine: RecommendationEngine<C>,
}

impl<S: RecordStore> Dashboard<S, SystemClock> {
    pub fn new(store: S, thresholds: RecommendationThresholds) -> Self {
        Self::with_clock(store, thresholds, SystemClock)
    }
}

impl<S: RecordStore, C: Clock + Clone> Dashboard<S, C> {
    pub fn with_clock(store: S, thresholds: RecommendationThresholds, clock: C) -> Self {
        Dashboard {
            store,
            aggregator: TrendAggregator::with_clock(clock.clone()),
            engine: RecommendationEngine::with_clock(thresholds, clock),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn sleep_trend(&self, window_days: u32) -> Result<SleepTrendSummary> {
        let records = self.store.sleep_records()?;
        Ok(self.aggregator.sleep_trend(&records, window_days))
    }

    pub fn recovery_trend(&self, window_days: u32) -> Result<RecoveryTrendSummary> {
        let records = self.store.recovery_records()?;
        Ok(self.aggregator.recovery_trend(&records, window_days))
    }

    /// Recommendations for the most recent sleep and recovery records
    pub fn recommendations(&self) -> Result<Vec<Recommendation>> {
        let sleep = self.store.latest_sleep()?;
        let recovery = self.store.latest_recovery()?;
        Ok(self.engine.generate(sleep.as_ref(), recovery.as_ref()))
    }

    #[instrument(skip(self))]
    pub fn overview(&self, window_days: u32) -> Result<DashboardOverview> {
        let sleep_records = self.store.sleep_records()?;
        let recovery_records = self.store.recovery_records()?;

        let latest_sleep = sleep_records.last().cloned();
        let latest_recovery = recovery_records.last().cloned();

        let overview = DashboardOverview {
            sleep_trend: self.aggregator.sleep_trend(&sleep_records, window_days),
            recovery_trend: self.aggregator.recovery_trend(&recovery_records, window_days),
            recommendations: self
                .engine
                .generate(latest_sleep.as_ref(), latest_recovery.as_ref()),
            latest_sleep,
            latest_recovery,
        };

        info!(
            sleep_records = overview.sleep_trend.record_count,
            recovery_records = overview.recovery_trend.record_count,
            recommendations = overview.recommendations.len(),
            "Built dashboard overview"
        );

        Ok(overview)
    }
}
