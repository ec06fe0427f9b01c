//! Retention Policy Module
//!
//! Statically declared limits on what a live session keeps in memory, one
//! policy per kind of protocol object.

use std::time::Duration;

use serde::Serialize;

/// Messages kept per session by default
pub const DEFAULT_MESSAGE_RETENTION: usize = 50;

// == Resource Kind ==
/// Kinds of protocol objects a session may retain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Messages,
    Channels,
    Guilds,
    Members,
    Users,
    VoiceStates,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 6] = [
        ResourceKind::Messages,
        ResourceKind::Channels,
        ResourceKind::Guilds,
        ResourceKind::Members,
        ResourceKind::Users,
        ResourceKind::VoiceStates,
    ];
}

// == Retention Policy ==
/// Limits for one kind of object: a count ceiling and an optional age limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub max_entries: usize,
    pub ttl: Option<Duration>,
}

impl RetentionPolicy {
    pub const fn bounded(max_entries: usize) -> Self {
        Self {
            max_entries,
            ttl: None,
        }
    }

    /// Keep nothing.
    pub const fn none() -> Self {
        Self::bounded(0)
    }
}

// == Message Retention ==
/// How messages are retained: the last N, or anything younger than a TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRetention {
    LastN(usize),
    Ttl(Duration),
}

impl MessageRetention {
    fn policy(self) -> RetentionPolicy {
        match self {
            MessageRetention::LastN(n) => RetentionPolicy::bounded(n),
            // Age-limited retention still gets a hard ceiling.
            MessageRetention::Ttl(ttl) => RetentionPolicy {
                max_entries: DEFAULT_MESSAGE_RETENTION * 10,
                ttl: Some(ttl),
            },
        }
    }
}

// == Retention Config ==
/// Per-kind retention limits handed to a session at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionConfig {
    pub messages: RetentionPolicy,
    pub channels: RetentionPolicy,
    pub guilds: RetentionPolicy,
    pub members: RetentionPolicy,
    pub users: RetentionPolicy,
    pub voice_states: RetentionPolicy,
}

impl RetentionConfig {
    /// Limits for a throwaway session that only needs to log in.
    pub const fn minimal() -> Self {
        Self {
            messages: RetentionPolicy::none(),
            channels: RetentionPolicy::none(),
            guilds: RetentionPolicy::none(),
            members: RetentionPolicy::none(),
            users: RetentionPolicy::bounded(1),
            voice_states: RetentionPolicy::none(),
        }
    }

    pub fn with_messages(mut self, retention: MessageRetention) -> Self {
        self.messages = retention.policy();
        self
    }

    pub fn policy(&self, kind: ResourceKind) -> RetentionPolicy {
        match kind {
            ResourceKind::Messages => self.messages,
            ResourceKind::Channels => self.channels,
            ResourceKind::Guilds => self.guilds,
            ResourceKind::Members => self.members,
            ResourceKind::Users => self.users,
            ResourceKind::VoiceStates => self.voice_states,
        }
    }
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            messages: RetentionPolicy::bounded(DEFAULT_MESSAGE_RETENTION),
            channels: RetentionPolicy::bounded(50),
            guilds: RetentionPolicy::bounded(50),
            members: RetentionPolicy::bounded(50),
            users: RetentionPolicy::bounded(100),
            voice_states: RetentionPolicy::bounded(10),
        }
    }
}
