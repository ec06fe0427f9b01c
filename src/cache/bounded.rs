//! Bounded Cache Module
//!
//! JSON cache over a [`KeyValueStore`] with a per-entry byte ceiling,
//! item-count truncation for list keys, and read-repair of bad entries.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::{CacheKey, CachePolicy};
use crate::error::{DeckError, Result};
use crate::store::KeyValueStore;

// == Bounded Cache ==
/// Size-capped cache of JSON values keyed by [`CacheKey`].
///
/// Cheap to clone; clones share the same store.
#[derive(Clone)]
pub struct BoundedCache {
    /// Persisted storage
    store: Arc<dyn KeyValueStore>,
    /// Size and item limits
    policy: CachePolicy,
}

impl BoundedCache {
    // == Constructor ==
    pub fn new(store: Arc<dyn KeyValueStore>, policy: CachePolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    /// The underlying store, for data kept outside the managed key set.
    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    // == Get ==
    /// Reads and decodes the entry under `key`.
    ///
    /// Oversized or undecodable entries are removed from the store and
    /// reported as absent. Only store failures are errors.
    pub async fn get<T: DeserializeOwned>(&self, key: CacheKey) -> Result<Option<T>> {
        let Some(raw) = self.store.get_item(key.as_str()).await? else {
            return Ok(None);
        };

        if let Err(corrupt) = self.check_entry_size(key, raw.len()) {
            warn!("{}, clearing it", corrupt);
            self.store.remove_item(key.as_str()).await?;
            return Ok(None);
        }

        match serde_json::from_str::<T>(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                let corrupt = DeckError::CacheCorrupt(format!("{}: {}", key, e));
                warn!("{}, clearing it", corrupt);
                self.store.remove_item(key.as_str()).await?;
                Ok(None)
            }
        }
    }

    // == Set ==
    /// Serializes `value` and writes it under `key`.
    ///
    /// Arrays under capped keys keep only their first `cap` items. A payload
    /// still larger than the ceiling is rejected with
    /// [`DeckError::CacheCapacityExceeded`] and nothing is written.
    pub async fn set<T: Serialize + ?Sized>(&self, key: CacheKey, value: &T) -> Result<()> {
        let mut json = serde_json::to_value(value)
            .map_err(|e| DeckError::Internal(format!("failed to encode {}: {}", key, e)))?;

        if let (Value::Array(items), Some(cap)) = (&mut json, self.policy.item_cap(key)) {
            if items.len() > cap {
                info!("Truncating cache {} from {} to {} items", key, items.len(), cap);
                items.truncate(cap);
            }
        }

        let encoded = json.to_string();
        let size = encoded.len();
        if size > self.policy.max_entry_bytes() {
            return Err(DeckError::CacheCapacityExceeded {
                key: key.to_string(),
                size,
                limit: self.policy.max_entry_bytes(),
            });
        }

        self.store.set_item(key.as_str(), encoded).await?;
        if key != CacheKey::Token {
            debug!("Cached {}: {:.2}KB", key, size as f64 / 1024.0);
        }
        Ok(())
    }

    // == Clear ==
    /// Removes one entry. Idempotent.
    pub async fn clear(&self, key: CacheKey) -> Result<()> {
        self.store.remove_item(key.as_str()).await
    }

    // == Clear All ==
    /// Removes every entry except the token.
    pub async fn clear_all(&self) -> Result<()> {
        for key in CacheKey::ALL.iter().filter(|k| **k != CacheKey::Token) {
            self.store.remove_item(key.as_str()).await?;
        }
        info!("All cached account data cleared");
        Ok(())
    }

    // == Size Report ==
    /// Byte size of every present entry. Absent entries are omitted.
    pub async fn size_report(&self) -> Result<BTreeMap<&'static str, usize>> {
        let mut sizes = BTreeMap::new();
        for key in CacheKey::ALL {
            if let Some(raw) = self.store.get_item(key.as_str()).await? {
                sizes.insert(key.as_str(), raw.len());
            }
        }
        Ok(sizes)
    }

    // == Token ==
    /// The linked account token, if any.
    pub async fn token(&self) -> Result<Option<String>> {
        self.get::<String>(CacheKey::Token).await
    }

    pub async fn set_token(&self, token: &str) -> Result<()> {
        self.set(CacheKey::Token, token).await
    }

    fn check_entry_size(&self, key: CacheKey, size: usize) -> Result<()> {
        let limit = self.policy.max_entry_bytes();
        if size > limit {
            return Err(DeckError::CacheCorrupt(format!(
                "cache {} exceeds size limit ({:.2}MB > {:.2}MB)",
                key,
                size as f64 / 1024.0 / 1024.0,
                limit as f64 / 1024.0 / 1024.0
            )));
        }
        Ok(())
    }
}
