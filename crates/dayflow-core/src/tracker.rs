//! Tracker: the write side that produces tasks, reflections and behavior events.
//!
//! Each write encrypts its sensitive subset under the active key before it reaches the
//! store. Behavior logging is best effort: a failed event is logged and never fails the
//! write that triggered it.

use crate::crypto::EncryptionService;
use crate::error::{CryptoError, TrackerError};
use crate::records::{
    Behavior, BehaviorKind, BehaviorPayload, Reflection, ReflectionPayload, Task, TaskCategory,
    TaskPayload,
};
use crate::store::{delete_record, get_record, put_record, query_records, RecordStore};
use crate::streak::{update_streak, DAILY_TASKS_HABIT};
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

/// Fields of a task to create.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub category: TaskCategory,
    pub scheduled_time: Option<String>,
    pub plan_for_next_day: bool,
}

impl NewTask {
    pub fn new(title: impl Into<String>, category: TaskCategory) -> Self {
        Self {
            title: title.into(),
            category,
            scheduled_time: None,
            plan_for_next_day: false,
        }
    }
}

/// Partial task edit; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub category: Option<TaskCategory>,
    pub scheduled_time: Option<String>,
    pub plan_for_next_day: Option<bool>,
}

pub struct Tracker {
    store: Arc<dyn RecordStore>,
    vault: Arc<EncryptionService>,
}

impl Tracker {
    pub fn new(store: Arc<dyn RecordStore>, vault: Arc<EncryptionService>) -> Self {
        Self { store, vault }
    }

    pub async fn add_task(&self, user_id: &str, new: NewTask) -> Result<Task, TrackerError> {
        self.add_task_at(user_id, new, Utc::now()).await
    }

    /// [`Self::add_task`] with an explicit creation time.
    pub async fn add_task_at(
        &self,
        user_id: &str,
        new: NewTask,
        created_at: DateTime<Utc>,
    ) -> Result<Task, TrackerError> {
        let encrypted_data = self.vault.encrypt_user_data(&TaskPayload {
            title: new.title.clone(),
            category: new.category,
            scheduled_time: new.scheduled_time.clone(),
        })?;
        let task = Task {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            category: new.category,
            scheduled_time: new.scheduled_time,
            plan_for_next_day: new.plan_for_next_day,
            completed: false,
            completed_at: None,
            created_at,
            encrypted_data,
        };
        put_record(self.store.as_ref(), &task).await?;
        tracing::debug!(target: "dayflow::tracker", task = %task.id, category = %task.category, "task added");

        self.record_behavior(
            user_id,
            BehaviorKind::TaskAdd,
            format!("Added task: {}", new.title),
            json!({ "taskId": task.id }),
            created_at,
        )
        .await;
        Ok(task)
    }

    /// Applies `update`, re-encrypting the payload when a sensitive field changes.
    pub async fn update_task(
        &self,
        user_id: &str,
        task_id: &str,
        update: TaskUpdate,
    ) -> Result<Task, TrackerError> {
        let mut task = self.load_task(user_id, task_id).await?;
        if update.title.is_some() || update.category.is_some() || update.scheduled_time.is_some() {
            let mut payload: TaskPayload = self.vault.decrypt_user_data(&task.encrypted_data)?;
            if let Some(title) = update.title {
                payload.title = title;
            }
            if let Some(category) = update.category {
                payload.category = category;
                task.category = category;
            }
            if let Some(time) = update.scheduled_time {
                payload.scheduled_time = Some(time.clone());
                task.scheduled_time = Some(time);
            }
            task.encrypted_data = self.vault.encrypt_user_data(&payload)?;
        }
        if let Some(next_day) = update.plan_for_next_day {
            task.plan_for_next_day = next_day;
        }
        put_record(self.store.as_ref(), &task).await?;
        Ok(task)
    }

    pub async fn toggle_task_completion(
        &self,
        user_id: &str,
        task_id: &str,
    ) -> Result<Task, TrackerError> {
        self.toggle_task_completion_at(user_id, task_id, Utc::now()).await
    }

    /// Flips `completed`. Completing logs `task_complete` and advances the daily streak;
    /// un-completing logs `task_uncomplete`.
    pub async fn toggle_task_completion_at(
        &self,
        user_id: &str,
        task_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Task, TrackerError> {
        let mut task = self.load_task(user_id, task_id).await?;
        task.completed = !task.completed;
        task.completed_at = task.completed.then_some(now);
        put_record(self.store.as_ref(), &task).await?;

        let title = self
            .decrypt_task_title(&task)
            .unwrap_or_else(|_| "(unreadable)".to_string());
        let (kind, verb) = if task.completed {
            (BehaviorKind::TaskComplete, "completed")
        } else {
            (BehaviorKind::TaskUncomplete, "uncompleted")
        };
        self.record_behavior(
            user_id,
            kind,
            format!("Task {}: {}", verb, title),
            json!({ "taskId": task.id, "category": task.category }),
            now,
        )
        .await;

        if task.completed {
            if let Err(e) =
                update_streak(self.store.as_ref(), user_id, DAILY_TASKS_HABIT, true, now).await
            {
                tracing::warn!(target: "dayflow::tracker", error = %e, "streak update failed");
            }
        }
        Ok(task)
    }

    /// Returns `false` when the task did not exist.
    pub async fn delete_task(&self, user_id: &str, task_id: &str) -> Result<bool, TrackerError> {
        let removed = delete_record::<Task>(self.store.as_ref(), user_id, task_id).await?;
        if removed {
            self.record_behavior(
                user_id,
                BehaviorKind::TaskDelete,
                format!("Deleted task: {}", task_id),
                Value::Null,
                Utc::now(),
            )
            .await;
        }
        Ok(removed)
    }

    /// All of the user's tasks, oldest first.
    pub async fn tasks_for_user(&self, user_id: &str) -> Result<Vec<Task>, TrackerError> {
        let mut tasks = query_records::<Task, _>(self.store.as_ref(), user_id, |_| true).await?;
        tasks.sort_by_key(|t| t.created_at);
        Ok(tasks)
    }

    /// Tasks in `category`; `None` means every category.
    pub async fn tasks_by_category(
        &self,
        user_id: &str,
        category: Option<TaskCategory>,
    ) -> Result<Vec<Task>, TrackerError> {
        let mut tasks = self.tasks_for_user(user_id).await?;
        if let Some(category) = category {
            tasks.retain(|t| t.category == category);
        }
        Ok(tasks)
    }

    pub async fn add_reflection(
        &self,
        user_id: &str,
        mood: u8,
        text: &str,
    ) -> Result<Reflection, TrackerError> {
        self.add_reflection_on(user_id, Utc::now().date_naive(), mood, text)
            .await
    }

    /// Reflection for `date`. Mood must be 1–5.
    pub async fn add_reflection_on(
        &self,
        user_id: &str,
        date: NaiveDate,
        mood: u8,
        text: &str,
    ) -> Result<Reflection, TrackerError> {
        if !(1..=5).contains(&mood) {
            return Err(TrackerError::InvalidMood(mood));
        }
        let reflection = Reflection {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            date,
            mood,
            encrypted_data: self.vault.encrypt_user_data(&ReflectionPayload {
                mood,
                text: text.to_string(),
            })?,
        };
        put_record(self.store.as_ref(), &reflection).await?;
        self.record_behavior(
            user_id,
            BehaviorKind::ReflectionAdd,
            "Added daily reflection".to_string(),
            json!({ "mood": mood }),
            Utc::now(),
        )
        .await;
        Ok(reflection)
    }

    /// First reflection dated today (UTC), if any.
    pub async fn today_reflection(&self, user_id: &str) -> Result<Option<Reflection>, TrackerError> {
        let today = Utc::now().date_naive();
        Ok(
            query_records::<Reflection, _>(self.store.as_ref(), user_id, |r| r.date == today)
                .await?
                .into_iter()
                .next(),
        )
    }

    /// Appends a behavior event with an encrypted action description.
    pub async fn log_behavior(
        &self,
        user_id: &str,
        kind: BehaviorKind,
        action: &str,
        data: Value,
    ) -> Result<Behavior, TrackerError> {
        self.log_behavior_at(user_id, kind, action, data, Utc::now())
            .await
    }

    pub async fn log_behavior_at(
        &self,
        user_id: &str,
        kind: BehaviorKind,
        action: &str,
        data: Value,
        timestamp: DateTime<Utc>,
    ) -> Result<Behavior, TrackerError> {
        let behavior = Behavior {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            kind,
            timestamp,
            encrypted_data: self.vault.encrypt_user_data(&BehaviorPayload {
                action: action.to_string(),
                data,
            })?,
        };
        put_record(self.store.as_ref(), &behavior).await?;
        Ok(behavior)
    }

    pub fn decrypt_task_title(&self, task: &Task) -> Result<String, CryptoError> {
        self.vault
            .decrypt_user_data::<TaskPayload>(&task.encrypted_data)
            .map(|p| p.title)
    }

    pub fn decrypt_reflection(&self, reflection: &Reflection) -> Result<ReflectionPayload, CryptoError> {
        self.vault.decrypt_user_data(&reflection.encrypted_data)
    }

    async fn load_task(&self, user_id: &str, task_id: &str) -> Result<Task, TrackerError> {
        get_record::<Task>(self.store.as_ref(), user_id, task_id)
            .await?
            .ok_or_else(|| TrackerError::TaskNotFound(task_id.to_string()))
    }

    async fn record_behavior(
        &self,
        user_id: &str,
        kind: BehaviorKind,
        action: String,
        data: Value,
        timestamp: DateTime<Utc>,
    ) {
        if let Err(e) = self
            .log_behavior_at(user_id, kind, &action, data, timestamp)
            .await
        {
            tracing::warn!(
                target: "dayflow::tracker",
                kind = kind.as_str(),
                error = %e,
                "behavior event not recorded"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::EncryptionKey;
    use crate::records::Streak;
    use crate::store::{Collection, MemoryRecordStore};

    fn tracker() -> (Tracker, Arc<MemoryRecordStore>) {
        let store = Arc::new(MemoryRecordStore::new());
        let vault = Arc::new(EncryptionService::with_key(EncryptionKey::generate()));
        (Tracker::new(store.clone(), vault), store)
    }

    #[tokio::test]
    async fn add_task_encrypts_title_and_logs_event() {
        let (tracker, store) = tracker();
        let task = tracker
            .add_task("u1", NewTask::new("Call the dentist", TaskCategory::Health))
            .await
            .unwrap();
        assert!(!task.encrypted_data.as_str().contains("dentist"));
        assert_eq!(tracker.decrypt_task_title(&task).unwrap(), "Call the dentist");
        assert_eq!(store.count(Collection::Behaviors), 1);

        let raw = serde_json::to_string(&task).unwrap();
        assert!(!raw.contains("dentist"));
    }

    #[tokio::test]
    async fn toggle_completes_and_advances_streak() {
        let (tracker, store) = tracker();
        let task = tracker
            .add_task("u1", NewTask::new("Ship it", TaskCategory::Work))
            .await
            .unwrap();
        let done = tracker.toggle_task_completion("u1", &task.id).await.unwrap();
        assert!(done.completed);
        assert!(done.completed_at.is_some());

        let streak = get_record::<Streak>(&*store, "u1", DAILY_TASKS_HABIT)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(streak.current_count, 1);

        let undone = tracker.toggle_task_completion("u1", &task.id).await.unwrap();
        assert!(!undone.completed);
        assert!(undone.completed_at.is_none());
        assert_eq!(store.count(Collection::Behaviors), 3);
    }

    #[tokio::test]
    async fn update_and_filter_by_category() {
        let (tracker, _) = tracker();
        let task = tracker
            .add_task("u1", NewTask::new("Read", TaskCategory::Personal))
            .await
            .unwrap();
        tracker
            .add_task("u1", NewTask::new("Run", TaskCategory::Health))
            .await
            .unwrap();
        let updated = tracker
            .update_task(
                "u1",
                &task.id,
                TaskUpdate {
                    title: Some("Read a paper".to_string()),
                    category: Some(TaskCategory::Learning),
                    ..TaskUpdate::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(tracker.decrypt_task_title(&updated).unwrap(), "Read a paper");

        let learning = tracker
            .tasks_by_category("u1", Some(TaskCategory::Learning))
            .await
            .unwrap();
        assert_eq!(learning.len(), 1);
        assert_eq!(tracker.tasks_by_category("u1", None).await.unwrap().len(), 2);
        assert!(tracker.tasks_for_user("u2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_and_missing_task() {
        let (tracker, _) = tracker();
        let task = tracker
            .add_task("u1", NewTask::new("Temp", TaskCategory::Other))
            .await
            .unwrap();
        assert!(tracker.delete_task("u1", &task.id).await.unwrap());
        assert!(!tracker.delete_task("u1", &task.id).await.unwrap());
        assert!(matches!(
            tracker.toggle_task_completion("u1", &task.id).await,
            Err(TrackerError::TaskNotFound(_))
        ));
    }

    #[tokio::test]
    async fn reflections_validate_mood() {
        let (tracker, _) = tracker();
        assert!(matches!(
            tracker.add_reflection("u1", 0, "meh").await,
            Err(TrackerError::InvalidMood(0))
        ));
        let r = tracker.add_reflection("u1", 4, "A calm day").await.unwrap();
        let today = tracker.today_reflection("u1").await.unwrap().unwrap();
        assert_eq!(today.id, r.id);
        assert_eq!(tracker.decrypt_reflection(&today).unwrap().text, "A calm day");
    }

    #[tokio::test]
    async fn writes_fail_without_key() {
        let store: Arc<dyn RecordStore> = Arc::new(MemoryRecordStore::new());
        let tracker = Tracker::new(store, Arc::new(EncryptionService::new()));
        assert!(matches!(
            tracker.add_task("u1", NewTask::new("x", TaskCategory::Work)).await,
            Err(TrackerError::Crypto(CryptoError::KeyNotSet))
        ));
    }
}
