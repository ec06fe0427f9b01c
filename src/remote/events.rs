//! Events emitted by a live remote session.

use serde::{Deserialize, Serialize};

/// Where a message event happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContext {
    Guild { guild_name: String, channel_name: String },
    Direct,
}

impl MessageContext {
    /// Short human label: the guild name, or "DM".
    pub fn label(&self) -> &str {
        match self {
            MessageContext::Guild { guild_name, .. } => guild_name,
            MessageContext::Direct => "DM",
        }
    }
}

/// Voice connection state of a user at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceState {
    pub channel_id: Option<String>,
    pub channel_name: Option<String>,
    pub self_mute: bool,
    pub self_deaf: bool,
    pub streaming: bool,
}

/// Typed events from the remote event stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RemoteEvent {
    MessageCreated {
        author_id: String,
        context: MessageContext,
        content: String,
    },
    MessageDeleted {
        author_id: Option<String>,
        context: MessageContext,
    },
    MessageUpdated {
        author_id: Option<String>,
        context: MessageContext,
        content: String,
    },
    TypingStarted {
        user_id: String,
        context: MessageContext,
    },
    PresenceUpdated {
        user_id: String,
        status: String,
        activities: Vec<String>,
    },
    VoiceStateUpdated {
        user_id: String,
        old: VoiceState,
        new: VoiceState,
    },
}

impl RemoteEvent {
    /// The user the event is about, when known.
    pub fn user_id(&self) -> Option<&str> {
        match self {
            RemoteEvent::MessageCreated { author_id, .. } => Some(author_id),
            RemoteEvent::MessageDeleted { author_id, .. }
            | RemoteEvent::MessageUpdated { author_id, .. } => author_id.as_deref(),
            RemoteEvent::TypingStarted { user_id, .. }
            | RemoteEvent::PresenceUpdated { user_id, .. }
            | RemoteEvent::VoiceStateUpdated { user_id, .. } => Some(user_id),
        }
    }
}
