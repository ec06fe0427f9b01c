//! Commands Module
//!
//! Logic behind the launcher commands. View-backed commands read the
//! [`BoundedCache`] for an instant snapshot, refresh through the
//! [`SessionManager`](crate::session::SessionManager), write the fresh data
//! back and return it.
//!
//! # Commands
//! - Dashboard: profile and presence
//! - Guilds: pinned-first guild list and grouped channels
//! - Direct messages: conversations, most recent first
//! - Chat: channel history and sending
//! - Link: token validation and persistence
//! - Spy: live event log for one user

pub mod chat;
pub mod dashboard;
pub mod direct_messages;
pub mod guilds;
pub mod link;
pub mod spy;

#[cfg(test)]
mod testing;

use std::future::Future;

use serde::Serialize;
use tracing::{debug, warn};

use crate::cache::{BoundedCache, CacheKey};
use crate::error::{DeckError, Result};

// == Snapshot ==
/// Data handed to a view, flagged when it comes from the cache because the
/// refresh failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot<T> {
    pub data: T,
    pub stale: bool,
}

impl<T> Snapshot<T> {
    pub fn fresh(data: T) -> Self {
        Self { data, stale: false }
    }

    pub fn stale(data: T) -> Self {
        Self { data, stale: true }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Snapshot<U> {
        Snapshot {
            data: f(self.data),
            stale: self.stale,
        }
    }
}

/// Awaits `refresh`. On failure falls back to `cached` marked stale, or
/// surfaces the error when nothing was cached.
pub(crate) async fn stale_then_refresh<T, Fut>(
    what: &str,
    cached: Option<T>,
    refresh: Fut,
) -> Result<Snapshot<T>>
where
    Fut: Future<Output = Result<T>>,
{
    match refresh.await {
        Ok(data) => Ok(Snapshot::fresh(data)),
        Err(e) => match cached {
            Some(data) => {
                warn!("Refreshing {} failed, serving cached copy: {}", what, e);
                Ok(Snapshot::stale(data))
            }
            None => Err(e),
        },
    }
}

/// Writes fresh data back to the cache. An oversized payload is logged and
/// skipped; store failures propagate.
pub(crate) async fn write_back<T: Serialize + ?Sized>(
    cache: &BoundedCache,
    key: CacheKey,
    value: &T,
) -> Result<()> {
    match cache.set(key, value).await {
        Ok(()) => {
            debug!("Cached {}", key);
            Ok(())
        }
        Err(e @ DeckError::CacheCapacityExceeded { .. }) => {
            warn!("Skipping cache write: {}", e);
            Ok(())
        }
        Err(e) => Err(e),
    }
}
