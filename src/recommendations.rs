//! Rule-based recommendation generation
//!
//! Evaluates the latest sleep and recovery records against fixed thresholds
//! and emits prioritized advisory items.
//!
//! # Rules
//!
//! | Condition                         | Priority | Type      |
//! |-----------------------------------|----------|-----------|
//! | sleep duration < 7 h              | high     | sleep     |
//! | sleep efficiency < 80 %           | medium   | sleep     |
//! | readiness score < 70              | high     | recovery  |
//! | stress level > 70                 | high     | stress    |
//! | always                            | medium   | hydration |
//!
//! Rules are evaluated independently; a missing record skips its rule group.
//! The result is ordered by priority rank descending, then confidence
//! descending. The sort is stable, so rule order breaks remaining ties.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::fmt;
use tracing::debug;
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::recovery::{RecoveryRecord, SleepRecord};

const SLEEP_DURATION_CONFIDENCE: u8 = 85;
const SLEEP_EFFICIENCY_CONFIDENCE: u8 = 75;
const READINESS_CONFIDENCE: u8 = 80;
const STRESS_CONFIDENCE: u8 = 90;
const HYDRATION_CONFIDENCE: u8 = 70;

/// Recommendation category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationType {
    Sleep,
    Activity,
    Stress,
    Nutrition,
    Hydration,
    Recovery,
}

impl fmt::Display for RecommendationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecommendationType::Sleep => write!(f, "sleep"),
            RecommendationType::Activity => write!(f, "activity"),
            RecommendationType::Stress => write!(f, "stress"),
            RecommendationType::Nutrition => write!(f, "nutrition"),
            RecommendationType::Hydration => write!(f, "hydration"),
            RecommendationType::Recovery => write!(f, "recovery"),
        }
    }
}

/// Recommendation urgency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    /// Sort rank: critical=4, high=3, medium=2, low=1
    pub fn rank(&self) -> u8 {
        match self {
            Priority::Critical => 4,
            Priority::High => 3,
            Priority::Medium => 2,
            Priority::Low => 1,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Low => write!(f, "low"),
            Priority::Medium => write!(f, "medium"),
            Priority::High => write!(f, "high"),
            Priority::Critical => write!(f, "critical"),
        }
    }
}

/// Display hints for the presentation layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationMetadata {
    pub icon: String,
    pub color: String,
    pub category: String,
}

impl RecommendationMetadata {
    fn new(icon: &str, color: &str, category: &str) -> Self {
        Self {
            icon: icon.to_string(),
            color: color.to_string(),
            category: category.to_string(),
        }
    }
}

/// An advisory item. Regenerated on every call, never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: RecommendationType,
    pub priority: Priority,
    pub title: String,
    pub description: String,
    pub reasoning: String,
    /// Ordered steps
    pub action_items: Vec<String>,
    pub expected_impact: String,
    pub timeframe: String,
    /// 0-100
    pub confidence: u8,
    pub metadata: RecommendationMetadata,
    pub created_at: DateTime<Utc>,
}

impl Recommendation {
    /// Equality ignoring the per-call id and timestamp
    pub fn same_content(&self, other: &Recommendation) -> bool {
        self.kind == other.kind
            && self.priority == other.priority
            && self.title == other.title
            && self.description == other.description
            && self.reasoning == other.reasoning
            && self.action_items == other.action_items
            && self.expected_impact == other.expected_impact
            && self.timeframe == other.timeframe
            && self.confidence == other.confidence
            && self.metadata == other.metadata
    }
}

/// Rule thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationThresholds {
    /// Hours; shorter nights trigger the sleep duration rule
    pub min_sleep_hours: f64,

    /// Percent; lower efficiency triggers the sleep efficiency rule
    pub min_sleep_efficiency: f64,

    /// Lower readiness triggers the recovery rule
    pub min_readiness: f64,

    /// Higher stress triggers the stress rule
    pub max_stress: f64,
}

impl Default for RecommendationThresholds {
    fn default() -> Self {
        RecommendationThresholds {
            min_sleep_hours: 7.0,
            min_sleep_efficiency: 80.0,
            min_readiness: 70.0,
            max_stress: 70.0,
        }
    }
}

/// Recommendation generation engine
pub struct RecommendationEngine<C: Clock = SystemClock> {
    thresholds: RecommendationThresholds,
    clock: C,
}

impl RecommendationEngine<SystemClock> {
    /// Create engine with default thresholds
    pub fn new() -> Self {
        Self::with_thresholds(RecommendationThresholds::default())
    }

    /// Create engine with custom thresholds
    pub fn with_thresholds(thresholds: RecommendationThresholds) -> Self {
        RecommendationEngine {
            thresholds,
            clock: SystemClock,
        }
    }
}

impl Default for RecommendationEngine<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> RecommendationEngine<C> {
    pub fn with_clock(thresholds: RecommendationThresholds, clock: C) -> Self {
        RecommendationEngine { thresholds, clock }
    }

    pub fn thresholds(&self) -> &RecommendationThresholds {
        &self.thresholds
    }

    /// Generate sorted recommendations from the latest records
    pub fn generate(
        &self,
        latest_sleep: Option<&SleepRecord>,
        latest_recovery: Option<&RecoveryRecord>,
    ) -> Vec<Recommendation> {
        let now = self.clock.now();
        let mut recommendations = Vec::new();

        if let Some(sleep) = latest_sleep {
            if sleep.duration < self.thresholds.min_sleep_hours {
                recommendations.push(self.sleep_duration(sleep, now));
            }
            if sleep.efficiency < self.thresholds.min_sleep_efficiency {
                recommendations.push(self.sleep_efficiency(sleep, now));
            }
        }

        if let Some(recovery) = latest_recovery {
            if recovery.readiness_score < self.thresholds.min_readiness {
                recommendations.push(self.low_readiness(recovery, now));
            }
            if recovery.stress_level > self.thresholds.max_stress {
                recommendations.push(self.high_stress(recovery, now));
            }
        }

        recommendations.push(hydration(now));

        sort_recommendations(&mut recommendations);

        debug!(
            count = recommendations.len(),
            has_sleep = latest_sleep.is_some(),
            has_recovery = latest_recovery.is_some(),
            "Generated recommendations"
        );

        recommendations
    }

    fn sleep_duration(&self, sleep: &SleepRecord, now: DateTime<Utc>) -> Recommendation {
        Recommendation {
            id: Uuid::new_v4(),
            kind: RecommendationType::Sleep,
            priority: Priority::High,
            title: "Increase Sleep Duration".to_string(),
            description: format!(
                "You slept {:.1} hours last night. Aim for at least {:.0} hours to support recovery.",
                sleep.duration, self.thresholds.min_sleep_hours
            ),
            reasoning: format!(
                "Sleep duration of {:.1}h is below the {:.0}h needed for full physical and cognitive restoration.",
                sleep.duration, self.thresholds.min_sleep_hours
            ),
            action_items: vec![
                "Set a consistent bedtime 30 minutes earlier".to_string(),
                "Avoid screens for an hour before bed".to_string(),
                "Keep the bedroom cool and dark".to_string(),
            ],
            expected_impact: "Better recovery, mood and training performance".to_string(),
            timeframe: "1-2 weeks".to_string(),
            confidence: SLEEP_DURATION_CONFIDENCE,
            metadata: RecommendationMetadata::new("moon", "indigo", "sleep"),
            created_at: now,
        }
    }

    fn sleep_efficiency(&self, sleep: &SleepRecord, now: DateTime<Utc>) -> Recommendation {
        Recommendation {
            id: Uuid::new_v4(),
            kind: RecommendationType::Sleep,
            priority: Priority::Medium,
            title: "Improve Sleep Efficiency".to_string(),
            description: format!(
                "Your sleep efficiency was {:.0}%. Less time awake in bed means more restorative sleep.",
                sleep.efficiency
            ),
            reasoning: format!(
                "Efficiency of {:.0}% is below the {:.0}% target; {:.0} minutes were spent awake.",
                sleep.efficiency, self.thresholds.min_sleep_efficiency, sleep.stages.awake
            ),
            action_items: vec![
                "Only go to bed when sleepy".to_string(),
                "Get up at the same time every day".to_string(),
                "Limit caffeine after noon".to_string(),
            ],
            expected_impact: "More deep and REM sleep per night".to_string(),
            timeframe: "2-3 weeks".to_string(),
            confidence: SLEEP_EFFICIENCY_CONFIDENCE,
            metadata: RecommendationMetadata::new("bed", "blue", "sleep"),
            created_at: now,
        }
    }

    fn low_readiness(&self, recovery: &RecoveryRecord, now: DateTime<Utc>) -> Recommendation {
        Recommendation {
            id: Uuid::new_v4(),
            kind: RecommendationType::Recovery,
            priority: Priority::High,
            title: "Prioritize Recovery Today".to_string(),
            description: format!(
                "Your readiness score is {:.0}. Swap intense training for active recovery.",
                recovery.readiness_score
            ),
            reasoning: format!(
                "Readiness of {:.0} is below {:.0}, with HRV {} and resting heart rate {} relative to baseline.",
                recovery.readiness_score,
                self.thresholds.min_readiness,
                recovery.hrv.status,
                recovery.resting_heart_rate.status
            ),
            action_items: vec![
                "Replace hard sessions with light mobility work".to_string(),
                "Take a 20-minute walk outdoors".to_string(),
                "Go to bed early tonight".to_string(),
            ],
            expected_impact: "Restored readiness within 24-48 hours".to_string(),
            timeframe: "1-2 days".to_string(),
            confidence: READINESS_CONFIDENCE,
            metadata: RecommendationMetadata::new("battery", "amber", "recovery"),
            created_at: now,
        }
    }

    fn high_stress(&self, recovery: &RecoveryRecord, now: DateTime<Utc>) -> Recommendation {
        Recommendation {
            id: Uuid::new_v4(),
            kind: RecommendationType::Stress,
            priority: Priority::High,
            title: "Manage Stress Levels".to_string(),
            description: format!(
                "Your stress level is {:.0}. Build short breaks and breathing work into your day.",
                recovery.stress_level
            ),
            reasoning: format!(
                "Stress of {:.0} exceeds {:.0}; sustained stress suppresses HRV and slows recovery.",
                recovery.stress_level, self.thresholds.max_stress
            ),
            action_items: vec![
                "Practice 5 minutes of box breathing twice a day".to_string(),
                "Schedule short breaks between work blocks".to_string(),
                "Reduce training intensity until stress drops".to_string(),
            ],
            expected_impact: "Lower stress and improved HRV".to_string(),
            timeframe: "3-7 days".to_string(),
            confidence: STRESS_CONFIDENCE,
            metadata: RecommendationMetadata::new("brain", "red", "stress"),
            created_at: now,
        }
    }
}

fn hydration(now: DateTime<Utc>) -> Recommendation {
    Recommendation {
        id: Uuid::new_v4(),
        kind: RecommendationType::Hydration,
        priority: Priority::Medium,
        title: "Stay Hydrated".to_string(),
        description: "Drink water consistently through the day, especially around training."
            .to_string(),
        reasoning: "Even mild dehydration reduces performance and slows recovery.".to_string(),
        action_items: vec![
            "Drink a glass of water after waking".to_string(),
            "Carry a water bottle during the day".to_string(),
            "Add electrolytes on heavy training days".to_string(),
        ],
        expected_impact: "Better energy, focus and recovery".to_string(),
        timeframe: "Daily".to_string(),
        confidence: HYDRATION_CONFIDENCE,
        metadata: RecommendationMetadata::new("droplet", "cyan", "hydration"),
        created_at: now,
    }
}

/// Priority rank descending, then confidence descending; stable
pub fn sort_recommendations(recommendations: &mut [Recommendation]) {
    recommendations.sort_by_key(|r| (Reverse(r.priority.rank()), Reverse(r.confidence)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::recovery::test_support::{recovery, sleep};
    use chrono::NaiveDate;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 9, 30).unwrap()
    }

    fn engine() -> RecommendationEngine<FixedClock> {
        RecommendationEngine::with_clock(RecommendationThresholds::default(), FixedClock::on(day()))
    }

    fn kinds(recs: &[Recommendation]) -> Vec<(RecommendationType, Priority)> {
        recs.iter().map(|r| (r.kind, r.priority)).collect()
    }

    #[test]
    fn test_no_records_yields_only_hydration() {
        let recs = engine().generate(None, None);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].kind, RecommendationType::Hydration);
        assert_eq!(recs[0].priority, Priority::Medium);
    }

    #[test]
    fn test_short_sleep_fires_high_priority() {
        let short = sleep(day(), 6.0, 90.0, 80.0);
        let recs = engine().generate(Some(&short), None);
        assert_eq!(
            kinds(&recs),
            vec![
                (RecommendationType::Sleep, Priority::High),
                (RecommendationType::Hydration, Priority::Medium),
            ]
        );
        assert!(recs[0].description.contains("6.0 hours"));
    }

    #[test]
    fn test_adequate_sleep_does_not_fire() {
        let good = sleep(day(), 8.0, 90.0, 80.0);
        let recs = engine().generate(Some(&good), None);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].kind, RecommendationType::Hydration);
    }

    #[test]
    fn test_threshold_edges_are_strict() {
        let exact = sleep(day(), 7.0, 80.0, 80.0);
        let rec = recovery(day(), 70.0, 70.0);
        let recs = engine().generate(Some(&exact), Some(&rec));
        assert_eq!(recs.len(), 1);
    }

    #[test]
    fn test_low_efficiency_fires_medium_priority() {
        let restless = sleep(day(), 8.0, 72.0, 70.0);
        let recs = engine().generate(Some(&restless), None);
        assert_eq!(recs[0].title, "Improve Sleep Efficiency");
        assert_eq!(recs[0].priority, Priority::Medium);
        // Efficiency (75) outranks hydration (70) within medium
        assert_eq!(recs[1].kind, RecommendationType::Hydration);
    }

    #[test]
    fn test_high_stress_fires_high_priority() {
        let stressed = recovery(day(), 80.0, 85.0);
        let recs = engine().generate(None, Some(&stressed));
        assert_eq!(recs[0].kind, RecommendationType::Stress);
        assert_eq!(recs[0].priority, Priority::High);
        assert!(recs[0].reasoning.contains("85"));
    }

    #[test]
    fn test_low_readiness_fires() {
        let tired = recovery(day(), 55.0, 30.0);
        let recs = engine().generate(None, Some(&tired));
        assert_eq!(recs[0].kind, RecommendationType::Recovery);
        assert_eq!(recs[0].priority, Priority::High);
    }

    #[test]
    fn test_all_rules_sorted_by_priority_then_confidence() {
        let poor_sleep = sleep(day(), 5.5, 70.0, 50.0);
        let poor_recovery = recovery(day(), 50.0, 90.0);
        let recs = engine().generate(Some(&poor_sleep), Some(&poor_recovery));

        assert_eq!(
            kinds(&recs),
            vec![
                (RecommendationType::Stress, Priority::High),
                (RecommendationType::Sleep, Priority::High),
                (RecommendationType::Recovery, Priority::High),
                (RecommendationType::Sleep, Priority::Medium),
                (RecommendationType::Hydration, Priority::Medium),
            ]
        );

        for pair in recs.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            assert!(a.priority.rank() >= b.priority.rank());
            if a.priority == b.priority {
                assert!(a.confidence >= b.confidence);
            }
        }
    }

    #[test]
    fn test_sort_is_stable_on_full_ties() {
        let now = FixedClock::on(day()).now();
        let mut first = hydration(now);
        first.title = "first".to_string();
        let mut second = hydration(now);
        second.title = "second".to_string();
        let mut critical = hydration(now);
        critical.priority = Priority::Critical;
        critical.title = "critical".to_string();

        let mut recs = vec![first, second, critical];
        sort_recommendations(&mut recs);
        let titles: Vec<&str> = recs.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["critical", "first", "second"]);
    }

    #[test]
    fn test_generation_is_idempotent_except_ids() {
        let engine = engine();
        let s = sleep(day(), 6.0, 75.0, 60.0);
        let r = recovery(day(), 60.0, 80.0);

        let a = engine.generate(Some(&s), Some(&r));
        let b = engine.generate(Some(&s), Some(&r));

        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b.iter()) {
            assert!(x.same_content(y));
            assert_ne!(x.id, y.id);
        }
    }

    #[test]
    fn test_custom_thresholds() {
        let thresholds = RecommendationThresholds {
            min_sleep_hours: 8.5,
            ..RecommendationThresholds::default()
        };
        let engine = RecommendationEngine::with_clock(thresholds, FixedClock::on(day()));
        let s = sleep(day(), 8.0, 90.0, 80.0);
        let recs = engine.generate(Some(&s), None);
        assert_eq!(recs[0].title, "Increase Sleep Duration");
    }

    #[test]
    fn test_priority_rank() {
        assert_eq!(Priority::Critical.rank(), 4);
        assert_eq!(Priority::High.rank(), 3);
        assert_eq!(Priority::Medium.rank(), 2);
        assert_eq!(Priority::Low.rank(), 1);
    }

    #[test]
    fn test_recommendation_serializes_type_field() {
        let json = serde_json::to_value(hydration(Utc::now())).unwrap();
        assert_eq!(json["type"], "hydration");
        assert_eq!(json["priority"], "medium");
    }
}
