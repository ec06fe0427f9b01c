//! Spy mode
//!
//! Watches one user through the live session's event stream and keeps a
//! bounded, newest-first log of what they do.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::info;

use crate::error::{DeckError, Result};
use crate::remote::{MessageContext, RemoteEvent, VoiceState};
use crate::session::SessionManager;
use crate::tasks::spawn_spy_task;

/// Entries kept in a spy log
pub const SPY_LOG_CAPACITY: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SpyEntryKind {
    Message,
    Presence,
    Typing,
    Voice,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpyEntry {
    pub kind: SpyEntryKind,
    pub description: String,
    pub timestamp: DateTime<Utc>,
}

// == Spy Log ==
/// Newest-first log that drops its oldest entries past capacity.
#[derive(Debug, Clone)]
pub struct SpyLog {
    entries: VecDeque<SpyEntry>,
    capacity: usize,
}

impl SpyLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(64)),
            capacity,
        }
    }

    pub fn push(&mut self, kind: SpyEntryKind, description: String) {
        self.entries.push_front(SpyEntry {
            kind,
            description,
            timestamp: Utc::now(),
        });
        self.entries.truncate(self.capacity);
    }

    /// Entries, newest first.
    pub fn entries(&self) -> Vec<SpyEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for SpyLog {
    fn default() -> Self {
        Self::new(SPY_LOG_CAPACITY)
    }
}

/// Log lines for one event, in the order they happened.
pub fn describe(event: &RemoteEvent) -> Vec<(SpyEntryKind, String)> {
    match event {
        RemoteEvent::MessageCreated {
            context, content, ..
        } => vec![(
            SpyEntryKind::Message,
            format!("Sent message in {}: {}", context.label(), content),
        )],
        RemoteEvent::MessageDeleted { context, .. } => vec![(
            SpyEntryKind::Message,
            format!("Deleted message in {}", context.label()),
        )],
        RemoteEvent::MessageUpdated {
            context, content, ..
        } => vec![(
            SpyEntryKind::Message,
            format!("Edited message in {}: {}", context.label(), content),
        )],
        RemoteEvent::TypingStarted { context, .. } => {
            let place = match context {
                MessageContext::Guild { channel_name, .. } => channel_name.as_str(),
                MessageContext::Direct => "DM",
            };
            vec![(SpyEntryKind::Typing, format!("Started typing in {}", place))]
        }
        RemoteEvent::PresenceUpdated {
            status, activities, ..
        } => {
            let description = if activities.is_empty() {
                format!("Status: {}", status)
            } else {
                format!("Status: {} | Playing: {}", status, activities.join(", "))
            };
            vec![(SpyEntryKind::Presence, description)]
        }
        RemoteEvent::VoiceStateUpdated { old, new, .. } => describe_voice(old, new)
            .into_iter()
            .map(|line| (SpyEntryKind::Voice, line))
            .collect(),
    }
}

fn describe_voice(old: &VoiceState, new: &VoiceState) -> Vec<String> {
    let mut lines = Vec::new();
    let channel_name = new.channel_name.as_deref().unwrap_or("unknown");

    match (&old.channel_id, &new.channel_id) {
        (None, Some(_)) => lines.push(format!("Joined voice channel {}", channel_name)),
        (Some(_), None) => lines.push("Left voice channel".to_string()),
        (Some(before), Some(after)) if before != after => {
            lines.push(format!("Moved to voice channel {}", channel_name))
        }
        _ => {}
    }

    if old.self_mute != new.self_mute {
        lines.push(if new.self_mute { "Self Muted" } else { "Unmuted" }.to_string());
    }
    if old.self_deaf != new.self_deaf {
        lines.push(if new.self_deaf { "Self Deafened" } else { "Undeafened" }.to_string());
    }
    if old.streaming != new.streaming {
        lines.push(
            if new.streaming {
                "Started Streaming"
            } else {
                "Stopped Streaming"
            }
            .to_string(),
        );
    }
    lines
}

/// What a spy session has seen so far.
#[derive(Debug, Clone, Serialize)]
pub struct SpyReport {
    pub target: String,
    pub entries: Vec<SpyEntry>,
}

// == Spy Session ==
/// A running watch on one user. Dropping it stops the watch.
pub struct SpySession {
    target: String,
    log: Arc<RwLock<SpyLog>>,
    task: JoinHandle<()>,
}

impl SpySession {
    /// Subscribes to the live session's events for `target`. Fails with
    /// [`DeckError::Unsupported`] when the session has no event stream.
    pub async fn start(sessions: &SessionManager, target: &str) -> Result<Self> {
        let target = target.trim();
        if target.is_empty() {
            return Err(DeckError::InvalidRequest("User ID required".to_string()));
        }

        let session = sessions.acquire_session().await?;
        let events = session.subscribe().ok_or_else(|| {
            DeckError::Unsupported("Live events are not available on this connection".to_string())
        })?;
        let log = Arc::new(RwLock::new(SpyLog::default()));
        let task = spawn_spy_task(events, target.to_string(), log.clone());

        info!("Spy mode watching {}", target);
        Ok(Self {
            target: target.to_string(),
            log,
            task,
        })
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub async fn report(&self) -> SpyReport {
        SpyReport {
            target: self.target.clone(),
            entries: self.log.read().await.entries(),
        }
    }

    /// True while the event consumer is still running.
    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for SpySession {
    fn drop(&mut self) {
        self.task.abort();
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{BoundedCache, CachePolicy};
    use crate::commands::testing::{fixture, manager, TOKEN};
    use crate::remote::{ScriptedConnector, SessionOptions};
    use crate::store::MemoryStore;
    use std::time::Duration;

    fn voice(channel: Option<&str>) -> VoiceState {
        VoiceState {
            channel_id: channel.map(str::to_string),
            channel_name: channel.map(|c| format!("{}-room", c)),
            ..VoiceState::default()
        }
    }

    fn lines(event: RemoteEvent) -> Vec<String> {
        describe(&event).into_iter().map(|(_, line)| line).collect()
    }

    #[test]
    fn test_log_is_newest_first_and_bounded() {
        let mut log = SpyLog::new(3);
        for i in 0..5 {
            log.push(SpyEntryKind::Typing, format!("entry {}", i));
        }

        let descriptions: Vec<_> = log.entries().into_iter().map(|e| e.description).collect();
        assert_eq!(descriptions, vec!["entry 4", "entry 3", "entry 2"]);
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn test_describe_messages() {
        let guild = MessageContext::Guild {
            guild_name: "Rustaceans".into(),
            channel_name: "general".into(),
        };
        assert_eq!(
            lines(RemoteEvent::MessageCreated {
                author_id: "1".into(),
                context: guild.clone(),
                content: "hi".into(),
            }),
            vec!["Sent message in Rustaceans: hi"]
        );
        assert_eq!(
            lines(RemoteEvent::MessageDeleted {
                author_id: Some("1".into()),
                context: MessageContext::Direct,
            }),
            vec!["Deleted message in DM"]
        );
        assert_eq!(
            lines(RemoteEvent::TypingStarted {
                user_id: "1".into(),
                context: guild,
            }),
            vec!["Started typing in general"]
        );
    }

    #[test]
    fn test_describe_presence() {
        assert_eq!(
            lines(RemoteEvent::PresenceUpdated {
                user_id: "1".into(),
                status: "idle".into(),
                activities: vec![],
            }),
            vec!["Status: idle"]
        );
        assert_eq!(
            lines(RemoteEvent::PresenceUpdated {
                user_id: "1".into(),
                status: "online".into(),
                activities: vec!["Factorio".into(), "Spotify".into()],
            }),
            vec!["Status: online | Playing: Factorio, Spotify"]
        );
    }

    #[test]
    fn test_describe_voice_transitions() {
        let joined = lines(RemoteEvent::VoiceStateUpdated {
            user_id: "1".into(),
            old: voice(None),
            new: voice(Some("a")),
        });
        assert_eq!(joined, vec!["Joined voice channel a-room"]);

        let moved = lines(RemoteEvent::VoiceStateUpdated {
            user_id: "1".into(),
            old: voice(Some("a")),
            new: voice(Some("b")),
        });
        assert_eq!(moved, vec!["Moved to voice channel b-room"]);

        let mut muted = voice(Some("a"));
        muted.self_mute = true;
        muted.streaming = true;
        let toggles = lines(RemoteEvent::VoiceStateUpdated {
            user_id: "1".into(),
            old: voice(Some("a")),
            new: muted.clone(),
        });
        assert_eq!(toggles, vec!["Self Muted", "Started Streaming"]);

        let left = lines(RemoteEvent::VoiceStateUpdated {
            user_id: "1".into(),
            old: muted,
            new: voice(None),
        });
        assert_eq!(left, vec!["Left voice channel", "Unmuted", "Stopped Streaming"]);
    }

    #[tokio::test]
    async fn test_spy_session_logs_target_events_only() {
        let (sessions, connector) = manager(true).await;
        let spy = SpySession::start(&sessions, "42").await.unwrap();
        let remote = connector.last_session().unwrap();

        remote.emit(RemoteEvent::TypingStarted {
            user_id: "7".into(),
            context: MessageContext::Direct,
        });
        remote.emit(RemoteEvent::MessageCreated {
            author_id: "42".into(),
            context: MessageContext::Direct,
            content: "psst".into(),
        });
        remote.emit(RemoteEvent::PresenceUpdated {
            user_id: "42".into(),
            status: "dnd".into(),
            activities: vec![],
        });

        tokio::time::sleep(Duration::from_millis(50)).await;

        let report = spy.report().await;
        assert_eq!(report.target, "42");
        let descriptions: Vec<_> = report.entries.iter().map(|e| e.description.as_str()).collect();
        assert_eq!(descriptions, vec!["Status: dnd", "Sent message in DM: psst"]);
        assert_eq!(report.entries[0].kind, SpyEntryKind::Presence);
    }

    #[tokio::test]
    async fn test_spy_requires_target() {
        let (sessions, _) = manager(true).await;
        let result = SpySession::start(&sessions, " ").await;
        assert!(matches!(result, Err(DeckError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_spy_refuses_session_without_events() {
        let connector = ScriptedConnector::new(TOKEN, fixture()).without_live_events();
        let cache = BoundedCache::new(Arc::new(MemoryStore::new()), CachePolicy::default());
        cache.set_token(TOKEN).await.unwrap();
        let sessions = SessionManager::new(
            cache,
            Arc::new(connector.clone()),
            SessionOptions::default(),
        );

        let result = SpySession::start(&sessions, "42").await;

        assert!(matches!(result, Err(DeckError::Unsupported(_))));
        assert_eq!(connector.logins(), 1);
    }

    #[tokio::test]
    async fn test_spy_requires_linked_account() {
        let (sessions, _) = manager(false).await;
        let result = SpySession::start(&sessions, "42").await;
        assert!(matches!(result, Err(DeckError::NotLinked)));
    }
}
