//! Retained Entry Module
//!
//! A protocol object held by a live session, with optional expiry.

use std::time::{Duration, Instant};

// == Retained Entry ==
/// A single retained object and its bookkeeping.
#[derive(Debug, Clone)]
pub struct RetainedEntry<T> {
    /// The retained object
    pub value: T,
    /// When the object was recorded
    pub recorded_at: Instant,
    /// When the object stops being retained, None = kept until evicted
    pub expires_at: Option<Instant>,
}

impl<T> RetainedEntry<T> {
    // == Constructor ==
    /// Creates an entry recorded now, expiring after `ttl` if given.
    pub fn new(value: T, ttl: Option<Duration>) -> Self {
        let now = Instant::now();
        Self {
            value,
            recorded_at: now,
            expires_at: ttl.map(|ttl| now + ttl),
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once the current time reaches its expiry instant.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    pub fn is_expired_at(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(expires) => now >= expires,
            None => false,
        }
    }

    /// Time left before expiry, `None` if the entry never expires.
    pub fn remaining(&self) -> Option<Duration> {
        self.expires_at
            .map(|expires| expires.saturating_duration_since(Instant::now()))
    }
}
