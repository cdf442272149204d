//! In-process state store.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use super::StateStore;
use crate::errors::AppResult;

/// Volatile state store; useful for embedding without a database file.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of a raw entry without going through the async API.
    pub fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Stores a raw entry without going through the async API.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<String>) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn load(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.get(key))
    }

    async fn save(&self, key: &str, value: String) -> AppResult<()> {
        self.insert(key, value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{load_json, save_json};

    #[tokio::test]
    async fn test_json_helpers_round_trip_through_store() {
        let store = MemoryStateStore::new();
        save_json(&store, "feeds", &vec!["a", "b"]).await.unwrap();

        let keys: Option<Vec<String>> = load_json(&store, "feeds").await.unwrap();
        assert_eq!(keys, Some(vec!["a".to_string(), "b".to_string()]));

        let missing: Option<Vec<String>> = load_json(&store, "nope").await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_undecodable_value_is_an_error() {
        let store = MemoryStateStore::new();
        store.insert("feeds", "{not json");
        let result: crate::errors::AppResult<Option<Vec<String>>> =
            load_json(&store, "feeds").await;
        assert!(result.is_err());
    }
}
