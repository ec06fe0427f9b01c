//! In-memory key-value store.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::KeyValueStore;
use crate::error::Result;

/// Key-value store held in process memory. Contents die with the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items.read().await.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: String) -> Result<()> {
        self.items.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        self.items.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert!(store.is_empty().await);

        store.set_item("a", "1".to_string()).await.unwrap();
        assert_eq!(store.get_item("a").await.unwrap(), Some("1".to_string()));
        assert_eq!(store.len().await, 1);

        store.remove_item("a").await.unwrap();
        assert_eq!(store.get_item("a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_remove_missing_key_is_noop() {
        let store = MemoryStore::new();
        store.remove_item("missing").await.unwrap();
        assert!(store.is_empty().await);
    }
}
