//! Keyed local record store.
//!
//! | Collection    | Tree            | Key                         | Encrypted blob |
//! |---------------|-----------------|-----------------------------|----------------|
//! | Users         | `users`         | `{user_id}/profile`         | no (holds key) |
//! | Tasks         | `tasks`         | `{user_id}/{task_id}`       | title          |
//! | Reflections   | `reflections`   | `{user_id}/{reflection_id}` | text, mood     |
//! | Behaviors     | `behaviors`     | `{user_id}/{behavior_id}`   | action, data   |
//! | Streaks       | `streaks`       | `{user_id}/{habit_type}`    | no             |
//! | AiSummaries   | `ai_summaries`  | `{user_id}/{YYYY-MM-DD}`    | plan           |
//!
//! The `{user_id}/` prefix is the per-user index: a prefix scan returns one user's records.

mod memory;
mod sled_store;

pub use memory::MemoryRecordStore;
pub use sled_store::SledRecordStore;

use crate::error::StoreError;
use crate::records::{Behavior, PlanRecord, Reflection, Streak, Task, User};
use serde::{de::DeserializeOwned, Serialize};

/// Named collections (one sled tree each).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    Tasks,
    Reflections,
    Behaviors,
    Streaks,
    AiSummaries,
}

impl Collection {
    pub fn tree_name(&self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Tasks => "tasks",
            Self::Reflections => "reflections",
            Self::Behaviors => "behaviors",
            Self::Streaks => "streaks",
            Self::AiSummaries => "ai_summaries",
        }
    }

    pub fn all() -> [Self; 6] {
        [
            Self::Users,
            Self::Tasks,
            Self::Reflections,
            Self::Behaviors,
            Self::Streaks,
            Self::AiSummaries,
        ]
    }
}

/// Byte-level store. Implementations must return `scan_prefix` results in key order.
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    async fn insert(&self, collection: Collection, key: &str, value: Vec<u8>)
        -> Result<(), StoreError>;

    async fn get(&self, collection: Collection, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Returns `true` when a value was removed.
    async fn remove(&self, collection: Collection, key: &str) -> Result<bool, StoreError>;

    async fn scan_prefix(
        &self,
        collection: Collection,
        prefix: &str,
    ) -> Result<Vec<(String, Vec<u8>)>, StoreError>;
}

/// A record type that lives in one collection under `{owner}/{record_key}`.
pub trait StoredRecord: Serialize + DeserializeOwned + Send + Sync {
    const COLLECTION: Collection;

    fn owner(&self) -> &str;

    fn record_key(&self) -> String;
}

impl StoredRecord for User {
    const COLLECTION: Collection = Collection::Users;

    fn owner(&self) -> &str {
        &self.id
    }

    fn record_key(&self) -> String {
        USER_PROFILE_KEY.to_string()
    }
}

impl StoredRecord for Task {
    const COLLECTION: Collection = Collection::Tasks;

    fn owner(&self) -> &str {
        &self.user_id
    }

    fn record_key(&self) -> String {
        self.id.clone()
    }
}

impl StoredRecord for Reflection {
    const COLLECTION: Collection = Collection::Reflections;

    fn owner(&self) -> &str {
        &self.user_id
    }

    fn record_key(&self) -> String {
        self.id.clone()
    }
}

impl StoredRecord for Behavior {
    const COLLECTION: Collection = Collection::Behaviors;

    fn owner(&self) -> &str {
        &self.user_id
    }

    fn record_key(&self) -> String {
        self.id.clone()
    }
}

impl StoredRecord for Streak {
    const COLLECTION: Collection = Collection::Streaks;

    fn owner(&self) -> &str {
        &self.user_id
    }

    fn record_key(&self) -> String {
        self.habit_type.clone()
    }
}

impl StoredRecord for PlanRecord {
    const COLLECTION: Collection = Collection::AiSummaries;

    fn owner(&self) -> &str {
        &self.user_id
    }

    fn record_key(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }
}

/// Record key of a user's profile entry.
pub const USER_PROFILE_KEY: &str = "profile";

/// Full store key for `{owner}/{record_key}`.
pub fn record_path(owner: &str, record_key: &str) -> String {
    format!("{}/{}", owner, record_key)
}

/// Inserts or overwrites `record`.
pub async fn put_record<R: StoredRecord>(
    store: &dyn RecordStore,
    record: &R,
) -> Result<(), StoreError> {
    let key = record_path(record.owner(), &record.record_key());
    store
        .insert(R::COLLECTION, &key, serde_json::to_vec(record)?)
        .await
}

pub async fn get_record<R: StoredRecord>(
    store: &dyn RecordStore,
    owner: &str,
    record_key: &str,
) -> Result<Option<R>, StoreError> {
    match store.get(R::COLLECTION, &record_path(owner, record_key)).await? {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}

pub async fn delete_record<R: StoredRecord>(
    store: &dyn RecordStore,
    owner: &str,
    record_key: &str,
) -> Result<bool, StoreError> {
    store.remove(R::COLLECTION, &record_path(owner, record_key)).await
}

/// All of `owner`'s records in collection `R` that satisfy `pred`. Entries that fail to
/// deserialize are skipped with a warning.
pub async fn query_records<R, F>(
    store: &dyn RecordStore,
    owner: &str,
    pred: F,
) -> Result<Vec<R>, StoreError>
where
    R: StoredRecord,
    F: Fn(&R) -> bool + Send,
{
    let prefix = format!("{}/", owner);
    let rows = store.scan_prefix(R::COLLECTION, &prefix).await?;
    Ok(decode_rows(R::COLLECTION, rows, pred))
}

/// Like [`query_records`] but across every owner.
pub async fn query_all<R, F>(store: &dyn RecordStore, pred: F) -> Result<Vec<R>, StoreError>
where
    R: StoredRecord,
    F: Fn(&R) -> bool + Send,
{
    let rows = store.scan_prefix(R::COLLECTION, "").await?;
    Ok(decode_rows(R::COLLECTION, rows, pred))
}

fn decode_rows<R, F>(collection: Collection, rows: Vec<(String, Vec<u8>)>, pred: F) -> Vec<R>
where
    R: StoredRecord,
    F: Fn(&R) -> bool,
{
    rows.into_iter()
        .filter_map(|(key, bytes)| match serde_json::from_slice::<R>(&bytes) {
            Ok(r) => Some(r),
            Err(e) => {
                tracing::warn!(
                    target: "dayflow::store",
                    tree = collection.tree_name(),
                    key = %key,
                    error = %e,
                    "skipping unreadable record"
                );
                None
            }
        })
        .filter(|r| pred(r))
        .collect()
}
