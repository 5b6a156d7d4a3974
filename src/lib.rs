// Library interface for PulseCoach modules
// This allows integration tests and benches to access the core functionality

pub mod clock;
pub mod config;
pub mod dashboard;
pub mod education;
pub mod error;
pub mod logging;
pub mod recommendations;
pub mod recovery;
pub mod seed;
pub mod simulation;
pub mod store;
pub mod trends;

// Re-export commonly used types for convenience
pub use clock::{Clock, FixedClock, SystemClock};
pub use dashboard::{Dashboard, DashboardOverview};
pub use error::{PulseCoachError, Result, StoreError};
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use recommendations::{
    Priority, Recommendation, RecommendationEngine, RecommendationThresholds, RecommendationType,
};
pub use recovery::{RecoveryRecord, SleepRecord};
pub use store::{InMemoryStore, JsonFileStore, RecordStore};
pub use trends::{RecoveryTrendSummary, SleepTrendSummary, TrendAggregator, TrendDirection};
