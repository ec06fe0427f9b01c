//! Retention Module
//!
//! Bounded in-memory caches a live session keeps protocol objects in, and
//! the static configuration of their limits.

mod entry;
mod lru;
mod policy;
mod stats;
mod store;

// Re-export public types
pub use entry::RetainedEntry;
pub use lru::RecencyOrder;
pub use policy::{
    MessageRetention, ResourceKind, RetentionConfig, RetentionPolicy, DEFAULT_MESSAGE_RETENTION,
};
pub use stats::RetentionStats;
pub use store::RetainedCache;

use std::collections::BTreeMap;

/// Per-kind statistics of a session's retention caches.
pub type RetentionSnapshot = BTreeMap<ResourceKind, RetentionStats>;
