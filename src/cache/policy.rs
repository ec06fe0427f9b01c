//! Cache Policy Module
//!
//! Per-entry byte ceiling and per-key item caps.

use std::collections::HashMap;

use super::{CacheKey, DEFAULT_DM_CAP, DEFAULT_LIST_CAP, DEFAULT_MAX_ENTRY_BYTES};

// == Cache Policy ==
/// Limits applied by [`BoundedCache`](super::BoundedCache) on every write and read.
#[derive(Debug, Clone)]
pub struct CachePolicy {
    /// Maximum serialized size of a single entry
    max_entry_bytes: usize,
    /// Item caps for array-valued keys
    item_caps: HashMap<CacheKey, usize>,
}

impl CachePolicy {
    /// Policy with the given ceiling and no item caps.
    pub fn new(max_entry_bytes: usize) -> Self {
        Self {
            max_entry_bytes,
            item_caps: HashMap::new(),
        }
    }

    pub fn with_max_entry_bytes(mut self, max_entry_bytes: usize) -> Self {
        self.max_entry_bytes = max_entry_bytes;
        self
    }

    /// Sets the item cap for `key`. Caps on the token key are ignored.
    pub fn with_item_cap(mut self, key: CacheKey, cap: usize) -> Self {
        if key != CacheKey::Token {
            self.item_caps.insert(key, cap);
        }
        self
    }

    pub fn max_entry_bytes(&self) -> usize {
        self.max_entry_bytes
    }

    /// Item cap configured for `key`; the token never has one.
    pub fn item_cap(&self, key: CacheKey) -> Option<usize> {
        if key == CacheKey::Token {
            return None;
        }
        self.item_caps.get(&key).copied()
    }
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRY_BYTES)
            .with_item_cap(CacheKey::DirectMessages, DEFAULT_DM_CAP)
            .with_item_cap(CacheKey::Guilds, DEFAULT_LIST_CAP)
            .with_item_cap(CacheKey::Friends, DEFAULT_LIST_CAP)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_caps() {
        let policy = CachePolicy::default();
        assert_eq!(policy.max_entry_bytes(), 5 * 1024 * 1024);
        assert_eq!(policy.item_cap(CacheKey::DirectMessages), Some(50));
        assert_eq!(policy.item_cap(CacheKey::Guilds), Some(100));
        assert_eq!(policy.item_cap(CacheKey::Friends), Some(100));
        assert_eq!(policy.item_cap(CacheKey::UserProfile), None);
    }

    #[test]
    fn test_token_never_capped() {
        let policy = CachePolicy::default().with_item_cap(CacheKey::Token, 1);
        assert_eq!(policy.item_cap(CacheKey::Token), None);
    }
}
