//! Sled-backed store with one tree per collection.

use super::{Collection, RecordStore};
use crate::error::StoreError;
use sled::Db;
use std::path::Path;

/// Persistent record store. Cheap to clone (sled handles are reference counted).
#[derive(Clone)]
pub struct SledRecordStore {
    db: Db,
}

impl SledRecordStore {
    pub fn open_path<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = sled::open(path.as_ref())?;
        for collection in Collection::all() {
            db.open_tree(collection.tree_name())?;
        }
        tracing::debug!(
            target: "dayflow::store",
            path = %path.as_ref().display(),
            "record store opened"
        );
        Ok(Self { db })
    }

    fn tree(&self, collection: Collection) -> Result<sled::Tree, StoreError> {
        Ok(self.db.open_tree(collection.tree_name())?)
    }

    /// Number of entries in `collection`.
    pub fn count(&self, collection: Collection) -> Result<usize, StoreError> {
        Ok(self.tree(collection)?.len())
    }
}

#[async_trait::async_trait]
impl RecordStore for SledRecordStore {
    async fn insert(
        &self,
        collection: Collection,
        key: &str,
        value: Vec<u8>,
    ) -> Result<(), StoreError> {
        self.tree(collection)?.insert(key.as_bytes(), value)?;
        Ok(())
    }

    async fn get(&self, collection: Collection, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self
            .tree(collection)?
            .get(key.as_bytes())?
            .map(|v| v.to_vec()))
    }

    async fn remove(&self, collection: Collection, key: &str) -> Result<bool, StoreError> {
        Ok(self.tree(collection)?.remove(key.as_bytes())?.is_some())
    }

    async fn scan_prefix(
        &self,
        collection: Collection,
        prefix: &str,
    ) -> Result<Vec<(String, Vec<u8>)>, StoreError> {
        let mut out = Vec::new();
        for item in self.tree(collection)?.scan_prefix(prefix.as_bytes()) {
            let (k, v) = item?;
            out.push((String::from_utf8_lossy(&k).into_owned(), v.to_vec()));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_get_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = SledRecordStore::open_path(dir.path()).unwrap();

        store
            .insert(Collection::Tasks, "u1/t1", b"one".to_vec())
            .await
            .unwrap();
        assert_eq!(
            store.get(Collection::Tasks, "u1/t1").await.unwrap().as_deref(),
            Some(&b"one"[..])
        );
        assert!(store.get(Collection::Reflections, "u1/t1").await.unwrap().is_none());
        assert_eq!(store.count(Collection::Tasks).unwrap(), 1);

        assert!(store.remove(Collection::Tasks, "u1/t1").await.unwrap());
        assert!(!store.remove(Collection::Tasks, "u1/t1").await.unwrap());
    }

    #[tokio::test]
    async fn prefix_scan_isolates_users() {
        let dir = tempfile::tempdir().unwrap();
        let store = SledRecordStore::open_path(dir.path()).unwrap();
        for key in ["alice/1", "alice/2", "bob/1"] {
            store
                .insert(Collection::Behaviors, key, key.as_bytes().to_vec())
                .await
                .unwrap();
        }
        let rows = store.scan_prefix(Collection::Behaviors, "alice/").await.unwrap();
        let keys: Vec<_> = rows.into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["alice/1".to_string(), "alice/2".to_string()]);
    }
}
