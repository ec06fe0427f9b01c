//! Shared fixtures for command tests.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{TimeZone, Utc};

use crate::cache::{BoundedCache, CachePolicy};
use crate::remote::{
    ChannelKind, ChannelSummary, ChatMessage, DmChannel, Friend, GuildSummary, LastMessage,
    MessageAuthor, RemoteFixture, ScriptedConnector, SessionOptions,
};
use crate::session::SessionManager;
use crate::store::MemoryStore;

pub const TOKEN: &str = "linked-token";

pub fn guild(id: &str, name: &str) -> GuildSummary {
    GuildSummary {
        id: id.to_string(),
        name: name.to_string(),
        icon: None,
    }
}

pub fn channel(id: &str, kind: ChannelKind, parent: Option<&str>, position: i64) -> ChannelSummary {
    ChannelSummary {
        id: id.to_string(),
        name: format!("{}-name", id),
        kind,
        parent_id: parent.map(str::to_string),
        position,
    }
}

pub fn dm(id: &str, last_message_secs: Option<i64>) -> DmChannel {
    DmChannel {
        id: id.to_string(),
        recipient: format!("user-{}", id),
        recipient_id: Some(format!("u{}", id)),
        avatar: None,
        last_message: last_message_secs.map(|secs| LastMessage {
            content: Some("hi".to_string()),
            timestamp: Utc.timestamp_opt(secs, 0).single().unwrap_or_default(),
        }),
    }
}

pub fn message(channel_id: &str, index: i64) -> ChatMessage {
    ChatMessage {
        id: format!("m{}", index),
        channel_id: channel_id.to_string(),
        content: format!("message {}", index),
        author: MessageAuthor {
            id: "200".to_string(),
            username: "bob".to_string(),
            avatar: None,
            bot: false,
        },
        timestamp: Utc.timestamp_opt(1_700_000_000 + index, 0).single().unwrap_or_default(),
    }
}

/// A fixture with two guilds, channels for the first, three DMs, a friend
/// and a 30-message channel (newest first).
pub fn fixture() -> RemoteFixture {
    let mut fixture = RemoteFixture::for_user("100", "alice");
    fixture.guilds = vec![guild("g1", "First"), guild("g2", "Second"), guild("g3", "Third")];
    fixture.channels = HashMap::from([(
        "g1".to_string(),
        vec![
            channel("voice", ChannelKind::Voice, Some("cat"), 0),
            channel("general", ChannelKind::Text, Some("cat"), 1),
            channel("rules", ChannelKind::Text, None, 0),
            channel("cat", ChannelKind::Category, None, 0),
        ],
    )]);
    fixture.direct_messages = vec![dm("old", Some(10)), dm("never", None), dm("new", Some(30))];
    fixture.friends = vec![Friend {
        id: "300".to_string(),
        username: "carol".to_string(),
        avatar: None,
    }];
    fixture.messages = HashMap::from([(
        "chat".to_string(),
        (0..30).rev().map(|i| message("chat", i)).collect(),
    )]);
    fixture
}

/// A manager over an in-memory store, linked to the scripted service when
/// `linked` is set.
pub async fn manager(linked: bool) -> (Arc<SessionManager>, ScriptedConnector) {
    let cache = BoundedCache::new(Arc::new(MemoryStore::new()), CachePolicy::default());
    if linked {
        cache.set_token(TOKEN).await.unwrap();
    }
    let connector = ScriptedConnector::new(TOKEN, fixture());
    let manager = SessionManager::new(cache, Arc::new(connector.clone()), SessionOptions::default());
    (Arc::new(manager), connector)
}
