//! Cache Module
//!
//! Size-capped JSON cache over the persisted key-value store.

mod bounded;
mod policy;


use serde::Serialize;

// Re-export public types
pub use bounded::BoundedCache;
pub use policy::CachePolicy;

// == Public Constants ==
/// Default ceiling for a single serialized entry in bytes
pub const DEFAULT_MAX_ENTRY_BYTES: usize = 5 * 1024 * 1024; // 5 MiB

/// Default item cap for the direct-message list
pub const DEFAULT_DM_CAP: usize = 50;

/// Default item cap for the guild and friend lists
pub const DEFAULT_LIST_CAP: usize = 100;

// == Cache Key ==
/// The closed set of keys the bounded cache manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheKey {
    UserProfile,
    Guilds,
    DirectMessages,
    Friends,
    Token,
}

impl CacheKey {
    /// Every key, token last.
    pub const ALL: [CacheKey; 5] = [
        CacheKey::UserProfile,
        CacheKey::Guilds,
        CacheKey::DirectMessages,
        CacheKey::Friends,
        CacheKey::Token,
    ];

    /// Key under which the entry lives in the store.
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheKey::UserProfile => "cache_user_info",
            CacheKey::Guilds => "cache_guilds",
            CacheKey::DirectMessages => "cache_dms",
            CacheKey::Friends => "cache_friends",
            CacheKey::Token => "discord_token",
        }
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
