//! Learning modules and progress tracking
//!
//! Summarizes how far an athlete is through the coaching curriculum and maps
//! the current sleep/recovery picture onto relevant modules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::recommendations::{RecommendationEngine, RecommendationThresholds, RecommendationType};
use crate::recovery::{RecoveryRecord, SleepRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleCategory {
    Sleep,
    Stress,
    Recovery,
    Nutrition,
    Training,
}

impl ModuleCategory {
    /// Curriculum category covering a recommendation type
    pub fn for_recommendation(kind: RecommendationType) -> Self {
        match kind {
            RecommendationType::Sleep => ModuleCategory::Sleep,
            RecommendationType::Stress => ModuleCategory::Stress,
            RecommendationType::Recovery => ModuleCategory::Recovery,
            RecommendationType::Nutrition | RecommendationType::Hydration => {
                ModuleCategory::Nutrition
            }
            RecommendationType::Activity => ModuleCategory::Training,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

/// A unit of the coaching curriculum
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningModule {
    pub id: String,
    pub title: String,
    pub category: ModuleCategory,
    pub difficulty: Difficulty,
    pub duration_minutes: u32,
    /// Number of lessons in the module
    pub lessons: u32,
}

/// Athlete progress through one module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleProgress {
    pub module_id: String,
    pub completed_lessons: u32,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ModuleProgress {
    pub fn is_complete(&self, module: &LearningModule) -> bool {
        self.completed_at.is_some() || self.completed_lessons >= module.lessons
    }
}

/// Curriculum progress overview
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningSummary {
    pub total_modules: usize,
    pub completed_modules: usize,
    pub in_progress_modules: usize,
    /// Completed lessons over all lessons, 0-100
    pub completion_percent: f64,
    /// First in-progress module, else first untouched one
    pub next_module: Option<String>,
}

pub struct EducationPlanner;

impl EducationPlanner {
    /// Summarize progress over the catalogue
    ///
    /// Progress entries for modules not in the catalogue are ignored.
    pub fn summary(modules: &[LearningModule], progress: &[ModuleProgress]) -> LearningSummary {
        let by_module: HashMap<&str, &ModuleProgress> = progress
            .iter()
            .map(|p| (p.module_id.as_str(), p))
            .collect();

        let mut completed = 0;
        let mut in_progress = 0;
        let mut total_lessons = 0u64;
        let mut done_lessons = 0u64;
        let mut first_in_progress = None;
        let mut first_untouched = None;

        for module in modules {
            total_lessons += u64::from(module.lessons);
            match by_module.get(module.id.as_str()) {
                Some(p) if p.is_complete(module) => {
                    completed += 1;
                    done_lessons += u64::from(module.lessons);
                }
                Some(p) if p.completed_lessons > 0 => {
                    in_progress += 1;
                    done_lessons += u64::from(p.completed_lessons);
                    first_in_progress.get_or_insert_with(|| module.id.clone());
                }
                _ => {
                    first_untouched.get_or_insert_with(|| module.id.clone());
                }
            }
        }

        let completion_percent = if total_lessons == 0 {
            0.0
        } else {
            done_lessons as f64 / total_lessons as f64 * 100.0
        };

        LearningSummary {
            total_modules: modules.len(),
            completed_modules: completed,
            in_progress_modules: in_progress,
            completion_percent,
            next_module: first_in_progress.or(first_untouched),
        }
    }

    /// Modules matching the categories of currently firing recommendations
    ///
    /// Completed modules are skipped. Order follows the recommendation
    /// priority, then catalogue order; each module appears once.
    pub fn recommend_modules<'a>(
        thresholds: &RecommendationThresholds,
        latest_sleep: Option<&SleepRecord>,
        latest_recovery: Option<&RecoveryRecord>,
        modules: &'a [LearningModule],
        progress: &[ModuleProgress],
    ) -> Vec<&'a LearningModule> {
        let engine = RecommendationEngine::with_thresholds(thresholds.clone());
        let recommendations = engine.generate(latest_sleep, latest_recovery);

        let completed: HashSet<&str> = modules
            .iter()
            .filter(|m| {
                progress
                    .iter()
                    .any(|p| p.module_id == m.id && p.is_complete(m))
            })
            .map(|m| m.id.as_str())
            .collect();

        let mut seen = HashSet::new();
        let mut picks = Vec::new();
        for category in recommendations
            .iter()
            .map(|r| ModuleCategory::for_recommendation(r.kind))
        {
            for module in modules.iter().filter(|m| m.category == category) {
                if !completed.contains(module.id.as_str()) && seen.insert(module.id.as_str()) {
                    picks.push(module);
                }
            }
        }
        picks
    }
}

/// Built-in starter curriculum
pub fn default_catalogue() -> Vec<LearningModule> {
    let module = |id: &str, title: &str, category, difficulty, duration_minutes, lessons| {
        LearningModule {
            id: id.to_string(),
            title: title.to_string(),
            category,
            difficulty,
            duration_minutes,
            lessons,
        }
    };

    vec![
        module(
            "sleep-foundations",
            "Sleep Foundations",
            ModuleCategory::Sleep,
            Difficulty::Beginner,
            30,
            5,
        ),
        module(
            "stress-breathing",
            "Breathing for Stress Control",
            ModuleCategory::Stress,
            Difficulty::Beginner,
            20,
            4,
        ),
        module(
            "recovery-hrv",
            "Reading Your HRV",
            ModuleCategory::Recovery,
            Difficulty::Intermediate,
            40,
            6,
        ),
        module(
            "fueling-basics",
            "Fueling and Hydration Basics",
            ModuleCategory::Nutrition,
            Difficulty::Beginner,
            25,
            4,
        ),
        module(
            "periodization",
            "Periodization 101",
            ModuleCategory::Training,
            Difficulty::Advanced,
            60,
            8,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recovery::test_support::{recovery, sleep};
    use chrono::NaiveDate;

    fn progress(id: &str, lessons: u32) -> ModuleProgress {
        ModuleProgress {
            module_id: id.to_string(),
            completed_lessons: lessons,
            completed_at: None,
        }
    }

    #[test]
    fn test_empty_catalogue_summary() {
        let summary = EducationPlanner::summary(&[], &[]);
        assert_eq!(summary.total_modules, 0);
        assert_eq!(summary.completion_percent, 0.0);
        assert!(summary.next_module.is_none());
    }

    #[test]
    fn test_summary_counts() {
        let modules = default_catalogue();
        let progress = vec![
            progress("sleep-foundations", 5),
            progress("recovery-hrv", 3),
            progress("unknown-module", 2),
        ];

        let summary = EducationPlanner::summary(&modules, &progress);
        assert_eq!(summary.total_modules, 5);
        assert_eq!(summary.completed_modules, 1);
        assert_eq!(summary.in_progress_modules, 1);
        // (5 + 3) of 27 lessons
        assert!((summary.completion_percent - 8.0 / 27.0 * 100.0).abs() < 1e-9);
        assert_eq!(summary.next_module.as_deref(), Some("recovery-hrv"));
    }

    #[test]
    fn test_next_module_falls_back_to_untouched() {
        let modules = default_catalogue();
        let summary = EducationPlanner::summary(&modules, &[progress("sleep-foundations", 5)]);
        assert_eq!(summary.next_module.as_deref(), Some("stress-breathing"));
    }

    #[test]
    fn test_completed_at_marks_complete() {
        let modules = default_catalogue();
        let mut p = progress("periodization", 1);
        p.completed_at = Some(Utc::now());
        let summary = EducationPlanner::summary(&modules, &[p]);
        assert_eq!(summary.completed_modules, 1);
    }

    #[test]
    fn test_every_recommendation_type_has_a_category() {
        assert_eq!(
            ModuleCategory::for_recommendation(RecommendationType::Hydration),
            ModuleCategory::Nutrition
        );
        assert_eq!(
            ModuleCategory::for_recommendation(RecommendationType::Activity),
            ModuleCategory::Training
        );
        assert_eq!(
            ModuleCategory::for_recommendation(RecommendationType::Sleep),
            ModuleCategory::Sleep
        );
    }

    #[test]
    fn test_recommend_modules_follow_firing_rules() {
        let day = NaiveDate::from_ymd_opt(2024, 9, 30).unwrap();
        let modules = default_catalogue();
        let s = sleep(day, 6.0, 90.0, 70.0);
        let r = recovery(day, 80.0, 85.0);

        let picks = EducationPlanner::recommend_modules(
            &RecommendationThresholds::default(),
            Some(&s),
            Some(&r),
            &modules,
            &[],
        );
        let ids: Vec<&str> = picks.iter().map(|m| m.id.as_str()).collect();
        // stress (90) before sleep (85), hydration maps to nutrition last
        assert_eq!(ids, vec!["stress-breathing", "sleep-foundations", "fueling-basics"]);
    }

    #[test]
    fn test_recommend_modules_skips_completed() {
        let modules = default_catalogue();
        let picks = EducationPlanner::recommend_modules(
            &RecommendationThresholds::default(),
            None,
            None,
            &modules,
            &[progress("fueling-basics", 4)],
        );
        assert!(picks.is_empty());
    }
}
