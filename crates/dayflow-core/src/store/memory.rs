//! In-memory store (tests, ephemeral sessions).

use super::{Collection, RecordStore};
use crate::error::StoreError;
use dashmap::DashMap;
use std::collections::BTreeMap;

#[derive(Default)]
pub struct MemoryRecordStore {
    trees: DashMap<Collection, BTreeMap<String, Vec<u8>>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, collection: Collection) -> usize {
        self.trees.get(&collection).map(|t| t.len()).unwrap_or(0)
    }
}

#[async_trait::async_trait]
impl RecordStore for MemoryRecordStore {
    async fn insert(
        &self,
        collection: Collection,
        key: &str,
        value: Vec<u8>,
    ) -> Result<(), StoreError> {
        self.trees
            .entry(collection)
            .or_default()
            .insert(key.to_string(), value);
        Ok(())
    }

    async fn get(&self, collection: Collection, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self
            .trees
            .get(&collection)
            .and_then(|t| t.get(key).cloned()))
    }

    async fn remove(&self, collection: Collection, key: &str) -> Result<bool, StoreError> {
        Ok(self
            .trees
            .get_mut(&collection)
            .map(|mut t| t.remove(key).is_some())
            .unwrap_or(false))
    }

    async fn scan_prefix(
        &self,
        collection: Collection,
        prefix: &str,
    ) -> Result<Vec<(String, Vec<u8>)>, StoreError> {
        let Some(tree) = self.trees.get(&collection) else {
            return Ok(Vec::new());
        };
        Ok(tree
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}
