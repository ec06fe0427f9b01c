//! JSON file backed key-value store.
//!
//! The whole map lives in memory and is rewritten to disk on every mutation
//! through a temporary file followed by a rename, so a crash mid-write leaves
//! the previous file intact.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::KeyValueStore;
use crate::error::{DeckError, Result};

/// Key-value store persisted as a single JSON object on disk.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    items: Mutex<BTreeMap<String, String>>,
}

impl JsonFileStore {
    /// Opens the store at `path`, creating an empty one if the file is missing.
    ///
    /// An unreadable JSON body is logged and replaced by an empty map; the
    /// bounded cache above refetches whatever it needs.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let items = match tokio::fs::read_to_string(&path).await {
            Ok(body) => match serde_json::from_str::<BTreeMap<String, String>>(&body) {
                Ok(items) => items,
                Err(e) => {
                    warn!("Store file {} is not a JSON object ({}), starting empty", path.display(), e);
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        info!("Opened store {} with {} keys", path.display(), items.len());

        Ok(Self {
            path,
            items: Mutex::new(items),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, items: &BTreeMap<String, String>) -> Result<()> {
        let body = serde_json::to_string(items)
            .map_err(|e| DeckError::Storage(format!("failed to encode store: {}", e)))?;

        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, body.as_bytes()).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        debug!("Persisted store ({} bytes)", body.len());
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items.lock().await.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: String) -> Result<()> {
        let mut items = self.items.lock().await;
        items.insert(key.to_string(), value);
        self.persist(&items).await
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        let mut items = self.items.lock().await;
        if items.remove(key).is_some() {
            self.persist(&items).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        {
            let store = JsonFileStore::open(&path).await.unwrap();
            store.set_item("discord_token", "\"abc\"".to_string()).await.unwrap();
            store.set_item("cache_guilds", "[]".to_string()).await.unwrap();
            store.remove_item("cache_guilds").await.unwrap();
        }

        let reopened = JsonFileStore::open(&path).await.unwrap();
        assert_eq!(
            reopened.get_item("discord_token").await.unwrap(),
            Some("\"abc\"".to_string())
        );
        assert_eq!(reopened.get_item("cache_guilds").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_file_store_missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("absent.json")).await.unwrap();
        assert_eq!(store.get_item("anything").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_file_store_garbage_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        tokio::fs::write(&path, "not json").await.unwrap();

        let store = JsonFileStore::open(&path).await.unwrap();
        assert_eq!(store.get_item("discord_token").await.unwrap(), None);
    }
}
