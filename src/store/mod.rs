//! Store Module
//!
//! Durable string key-value storage underneath the bounded cache.

mod file;
mod memory;

use async_trait::async_trait;

use crate::error::Result;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

// == Key-Value Store ==
/// Process-wide persisted storage keyed by string with opaque string values.
///
/// Each call is atomic on its own; there are no transactions.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Returns the raw value stored under `key`, if any.
    async fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    async fn set_item(&self, key: &str, value: String) -> Result<()>;

    /// Removes `key`. Removing a missing key is not an error.
    async fn remove_item(&self, key: &str) -> Result<()>;
}
