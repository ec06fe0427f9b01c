//! Remote Module
//!
//! Capability surface of the remote chat service, its data model and event
//! stream, the REST connector used by the binary, and a scripted in-process
//! service.

mod events;
mod rest;
mod scripted;
mod types;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::Result;
use crate::retention::{RetentionConfig, RetentionSnapshot};

pub use events::{MessageContext, RemoteEvent, VoiceState};
pub use rest::RestConnector;
pub use scripted::{RemoteFixture, ScriptedConnector, ScriptedSession};
pub use types::{
    snowflake_timestamp, ChannelKind, ChannelSummary, ChatMessage, DmChannel, Friend,
    GuildSummary, LastMessage, MessageAuthor, PresenceStatus, UserProfile,
};

/// Capacity of a session's event broadcast channel
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

// == Session Options ==
/// Everything a connector needs to build a session handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    /// Limits on retained protocol objects
    pub retention: RetentionConfig,
    /// Presence announced on login
    pub presence: PresenceStatus,
}

impl SessionOptions {
    /// Options for a throwaway validation session.
    pub fn minimal() -> Self {
        Self {
            retention: RetentionConfig::minimal(),
            presence: PresenceStatus::Invisible,
        }
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            retention: RetentionConfig::default(),
            presence: PresenceStatus::Invisible,
        }
    }
}

// == Remote Session ==
/// One authenticated connection to the remote service.
#[async_trait]
pub trait RemoteSession: Send + Sync {
    /// Authenticates with `token`. Bad credentials fail with
    /// [`DeckError::AuthenticationFailed`](crate::error::DeckError::AuthenticationFailed).
    async fn login(&self, token: &str) -> Result<UserProfile>;

    /// True once logged in and until destroyed or dropped by the service.
    fn is_ready(&self) -> bool;

    async fn current_user(&self) -> Result<UserProfile>;

    async fn guilds(&self) -> Result<Vec<GuildSummary>>;

    async fn guild_channels(&self, guild_id: &str) -> Result<Vec<ChannelSummary>>;

    async fn direct_messages(&self) -> Result<Vec<DmChannel>>;

    async fn friends(&self) -> Result<Vec<Friend>>;

    /// Latest `limit` messages of a channel, newest first.
    async fn messages(&self, channel_id: &str, limit: usize) -> Result<Vec<ChatMessage>>;

    async fn send_message(&self, channel_id: &str, content: &str) -> Result<ChatMessage>;

    async fn set_presence(&self, status: PresenceStatus) -> Result<()>;

    /// Receiver of the session's live events, `None` when the connection
    /// carries no event stream.
    fn subscribe(&self) -> Option<broadcast::Receiver<RemoteEvent>>;

    /// Drops every retained protocol object.
    async fn clear_caches(&self);

    /// Drops retained objects that aged out. Returns how many were dropped.
    async fn purge_expired(&self) -> usize;

    /// Statistics of the retained protocol objects.
    async fn retained(&self) -> RetentionSnapshot;

    /// Closes network resources. The handle is unusable afterwards.
    async fn destroy(&self) -> Result<()>;
}

// == Remote Connector ==
/// Builds unauthenticated session handles.
pub trait RemoteConnector: Send + Sync {
    fn create(&self, options: &SessionOptions) -> Arc<dyn RemoteSession>;
}

/// Full teardown of a handle: retained objects first, then the connection.
pub async fn teardown(session: &dyn RemoteSession) -> Result<()> {
    session.clear_caches().await;
    session.destroy().await
}
