//! Simulated coach replies and device syncs
//!
//! Both are modelled as delayed tasks that can be cancelled individually or
//! all at once. Several tasks for the same conversation or device may be in
//! flight together and they complete in no particular order.
//!
//! Random choices (reply wording, synced values) are drawn from a shared
//! [`DemoDataGenerator`] when the task is scheduled, so a seeded generator
//! gives reproducible results no matter how the tasks interleave.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{PulseCoachError, Result};
use crate::seed::DemoDataGenerator;
use crate::store::RecordStore;

/// Handle to a scheduled task
#[derive(Debug)]
pub struct TaskHandle<T> {
    token: CancellationToken,
    join: JoinHandle<Option<T>>,
}

impl<T> TaskHandle<T> {
    /// Cancel the task; a no-op if it already finished
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the task; `None` when it was cancelled before completing
    pub async fn join(self) -> Result<Option<T>> {
        self.join
            .await
            .map_err(|e| PulseCoachError::Simulation(format!("Delayed task failed: {}", e)))
    }
}

/// Scheduler for cancelable delayed tasks
#[derive(Debug, Clone)]
pub struct DelayedTasks {
    root: Arc<Mutex<CancellationToken>>,
    tracker: TaskTracker,
}

impl Default for DelayedTasks {
    fn default() -> Self {
        Self::new()
    }
}

impl DelayedTasks {
    pub fn new() -> Self {
        Self {
            root: Arc::new(Mutex::new(CancellationToken::new())),
            tracker: TaskTracker::new(),
        }
    }

    fn child_token(&self) -> CancellationToken {
        let root = self.root.lock().unwrap_or_else(|e| e.into_inner());
        root.child_token()
    }

    /// Run `task` after `delay` unless cancelled first
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule<F, T>(&self, delay: Duration, task: F) -> TaskHandle<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let token = self.child_token();
        let child = token.clone();

        let join = self.tracker.spawn(async move {
            tokio::select! {
                biased;
                _ = child.cancelled() => {
                    debug!("Delayed task cancelled");
                    None
                }
                output = async {
                    tokio::time::sleep(delay).await;
                    task.await
                } => Some(output),
            }
        });

        TaskHandle { token, join }
    }

    /// Cancel every task scheduled so far; later tasks are unaffected
    pub fn cancel_all(&self) {
        let mut root = self.root.lock().unwrap_or_else(|e| e.into_inner());
        root.cancel();
        *root = CancellationToken::new();
        info!(in_flight = self.tracker.len(), "Cancelled all delayed tasks");
    }

    /// Tasks spawned and not yet finished
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Coach,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub sender: Sender,
    pub content: String,
    pub sent_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn from_user(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender: Sender::User,
            content: content.into(),
            sent_at: Utc::now(),
        }
    }
}

/// Conversation topic inferred from a user message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    Sleep,
    Stress,
    Recovery,
    Nutrition,
    General,
}

impl Topic {
    pub fn detect(message: &str) -> Self {
        let text = message.to_lowercase();
        let has = |words: &[&str]| words.iter().any(|w| text.contains(w));

        if has(&["sleep", "tired", "insomnia", "nap"]) {
            Topic::Sleep
        } else if has(&["stress", "anxious", "overwhelm", "pressure"]) {
            Topic::Stress
        } else if has(&["recover", "sore", "hrv", "rest day"]) {
            Topic::Recovery
        } else if has(&["eat", "food", "nutrition", "protein", "water", "hydrat"]) {
            Topic::Nutrition
        } else {
            Topic::General
        }
    }

    fn replies(&self) -> &'static [&'static str] {
        match self {
            Topic::Sleep => &[
                "Consistency matters more than anything. Try to wake at the same time every day, weekends included.",
                "Let's look at your last week of sleep together. A cooler, darker room is often the quickest win.",
            ],
            Topic::Stress => &[
                "Try four rounds of box breathing now: in for 4, hold 4, out 4, hold 4.",
                "High stress days are a good time to swap intervals for an easy aerobic session.",
            ],
            Topic::Recovery => &[
                "Your HRV trend tells us more than a single reading. Keep today light and check in tomorrow.",
                "Active recovery like walking or mobility work will help more than complete rest.",
            ],
            Topic::Nutrition => &[
                "Aim for protein at every meal and a glass of water with each one.",
                "Fuel before long sessions: some carbohydrates 1-2 hours beforehand go a long way.",
            ],
            Topic::General => &[
                "Thanks for checking in! I'll review your data and get back to you with a plan.",
                "Great question. Let's set one small goal for this week and build from there.",
            ],
        }
    }
}

/// Sends a canned coach reply after a delay
#[derive(Debug, Clone)]
pub struct CoachResponder {
    tasks: DelayedTasks,
    generator: Arc<Mutex<DemoDataGenerator>>,
    delay: Duration,
}

impl CoachResponder {
    pub fn new(
        tasks: DelayedTasks,
        generator: Arc<Mutex<DemoDataGenerator>>,
        delay: Duration,
    ) -> Self {
        Self {
            tasks,
            generator,
            delay,
        }
    }

    /// Pick the reply text for `message` now and deliver it after the delay
    pub fn respond(&self, message: &ChatMessage) -> TaskHandle<ChatMessage> {
        let topic = Topic::detect(&message.content);
        let replies = topic.replies();
        let index = {
            let mut generator = self.generator.lock().unwrap_or_else(|e| e.into_inner());
            generator.pick_index(replies.len())
        };
        let content = replies.get(index).copied().unwrap_or_default().to_string();

        debug!(
            message_id = %message.id,
            ?topic,
            delay_ms = self.delay.as_millis() as u64,
            "Scheduled coach reply"
        );

        self.tasks.schedule(self.delay, async move {
            ChatMessage {
                id: Uuid::new_v4(),
                sender: Sender::Coach,
                content,
                sent_at: Utc::now(),
            }
        })
    }
}

/// Simulated wearable that pushes a day of records into a store
pub struct DeviceSync<S: RecordStore + 'static> {
    store: Arc<S>,
    tasks: DelayedTasks,
    generator: Arc<Mutex<DemoDataGenerator>>,
    delay: Duration,
}

impl<S: RecordStore + 'static> DeviceSync<S> {
    pub fn new(
        store: Arc<S>,
        tasks: DelayedTasks,
        generator: Arc<Mutex<DemoDataGenerator>>,
        delay: Duration,
    ) -> Self {
        Self {
            store,
            tasks,
            generator,
            delay,
        }
    }

    /// Generate records for `date` now and append them after the delay
    ///
    /// The day is stored as a pair: if either record is rejected, neither is
    /// written.
    pub fn sync_day(&self, date: NaiveDate) -> TaskHandle<Result<NaiveDate>> {
        let (sleep, recovery) = {
            let mut generator = self.generator.lock().unwrap_or_else(|e| e.into_inner());
            (generator.sleep_record(date), generator.recovery_record(date))
        };
        let store = Arc::clone(&self.store);

        self.tasks.schedule(self.delay, async move {
            let result = store.add_day(sleep, recovery).map(|_| date);
            match &result {
                Ok(_) => info!(%date, "Device sync stored records"),
                Err(e) => warn!(%date, error = %e, "Device sync failed"),
            }
            result
        })
    }
}
