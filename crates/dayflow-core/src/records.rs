//! Persisted record shapes.
//!
//! Every record keeps a few plaintext columns for indexing (ids, category, completion flag,
//! timestamps, mood) and one `encrypted_data` blob for the sensitive subset. Task titles,
//! reflection text and behavior descriptions only ever live inside the blob.

use crate::crypto::EncryptedBlob;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Task category. Unknown values (e.g. from an AI response) fold into `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskCategory {
    Work,
    Personal,
    Health,
    Learning,
    #[serde(other)]
    Other,
}

impl TaskCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Work => "work",
            Self::Personal => "personal",
            Self::Health => "health",
            Self::Learning => "learning",
            Self::Other => "other",
        }
    }

    pub fn all() -> [Self; 5] {
        [Self::Work, Self::Personal, Self::Health, Self::Learning, Self::Other]
    }
}

impl std::fmt::Display for TaskCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown category: {}", s))
    }
}

/// Behavior event kinds logged by the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BehaviorKind {
    TaskAdd,
    TaskComplete,
    TaskUncomplete,
    TaskSkip,
    TaskDelete,
    ReflectionAdd,
    AppOpen,
}

impl BehaviorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TaskAdd => "task_add",
            Self::TaskComplete => "task_complete",
            Self::TaskUncomplete => "task_uncomplete",
            Self::TaskSkip => "task_skip",
            Self::TaskDelete => "task_delete",
            Self::ReflectionAdd => "reflection_add",
            Self::AppOpen => "app_open",
        }
    }
}

/// Signed-in identity. `encoded_key` is the user's exported key in base64; it is stored
/// unencrypted because it cannot be encrypted with itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    /// Identity-provider subject (e.g. the OAuth account id).
    pub external_id: String,
    pub encoded_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub user_id: String,
    pub category: TaskCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_time: Option<String>,
    #[serde(default)]
    pub plan_for_next_day: bool,
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub encrypted_data: EncryptedBlob,
}

/// Encrypted subset of a [`Task`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskPayload {
    pub title: String,
    pub category: TaskCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_time: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reflection {
    pub id: String,
    pub user_id: String,
    /// Calendar day (UTC) the reflection belongs to.
    pub date: NaiveDate,
    /// 1–5.
    pub mood: u8,
    pub encrypted_data: EncryptedBlob,
}

/// Encrypted subset of a [`Reflection`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReflectionPayload {
    pub mood: u8,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Behavior {
    pub id: String,
    pub user_id: String,
    pub kind: BehaviorKind,
    pub timestamp: DateTime<Utc>,
    pub encrypted_data: EncryptedBlob,
}

/// Encrypted subset of a [`Behavior`]: the human-readable action (may quote a task title)
/// plus arbitrary structured context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorPayload {
    pub action: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Consecutive-day counter for one habit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Streak {
    pub id: String,
    pub user_id: String,
    pub habit_type: String,
    pub start_date: DateTime<Utc>,
    pub current_count: u32,
    pub longest_count: u32,
    pub last_updated: DateTime<Utc>,
}

/// Cached daily plan. `summary_json` is a plaintext mirror for introspection;
/// `encrypted_data` is authoritative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanRecord {
    pub id: String,
    pub user_id: String,
    pub date: NaiveDate,
    pub summary_json: String,
    pub encrypted_data: EncryptedBlob,
    pub created_at: DateTime<Utc>,
}

/// `YYYY-MM-DD` for a UTC timestamp.
pub fn day_key(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d").to_string()
}
