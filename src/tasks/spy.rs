//! Spy Consumer Task
//!
//! Reads a session's event stream and records the watched user's activity.

use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::commands::spy::{describe, SpyLog};
use crate::remote::RemoteEvent;

/// Spawns the consumer for `target`'s events.
///
/// A lagging receiver skips what it missed and keeps going. The task ends
/// when the event stream closes or the handle is aborted.
pub fn spawn_spy_task(
    mut events: broadcast::Receiver<RemoteEvent>,
    target: String,
    log: Arc<RwLock<SpyLog>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let event = match events.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Spy consumer lagged, skipped {} events", skipped);
                    continue;
                }
                Err(RecvError::Closed) => {
                    info!("Event stream closed, spy consumer stopping");
                    break;
                }
            };

            if event.user_id() != Some(target.as_str()) {
                continue;
            }

            let lines = describe(&event);
            if lines.is_empty() {
                continue;
            }

            debug!("Spy recorded {} entries", lines.len());
            let mut log = log.write().await;
            for (kind, description) in lines {
                log.push(kind, description);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{MessageContext, VoiceState};
    use std::time::Duration;

    #[tokio::test]
    async fn test_consumer_filters_by_target() {
        let (sender, receiver) = broadcast::channel(16);
        let log = Arc::new(RwLock::new(SpyLog::default()));
        let handle = spawn_spy_task(receiver, "42".to_string(), log.clone());

        sender
            .send(RemoteEvent::TypingStarted {
                user_id: "42".into(),
                context: MessageContext::Direct,
            })
            .unwrap();
        sender
            .send(RemoteEvent::TypingStarted {
                user_id: "7".into(),
                context: MessageContext::Direct,
            })
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(log.read().await.len(), 1);
        handle.abort();
    }

    #[tokio::test]
    async fn test_consumer_skips_silent_voice_updates() {
        let (sender, receiver) = broadcast::channel(16);
        let log = Arc::new(RwLock::new(SpyLog::default()));
        let handle = spawn_spy_task(receiver, "42".to_string(), log.clone());

        sender
            .send(RemoteEvent::VoiceStateUpdated {
                user_id: "42".into(),
                old: VoiceState::default(),
                new: VoiceState::default(),
            })
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(log.read().await.is_empty());
        handle.abort();
    }

    #[tokio::test]
    async fn test_consumer_survives_lag() {
        let (sender, receiver) = broadcast::channel(2);
        let log = Arc::new(RwLock::new(SpyLog::default()));

        // Overflow the channel before the consumer starts reading
        for i in 0..5 {
            sender
                .send(RemoteEvent::PresenceUpdated {
                    user_id: "42".into(),
                    status: format!("status-{}", i),
                    activities: vec![],
                })
                .unwrap();
        }
        let handle = spawn_spy_task(receiver, "42".to_string(), log.clone());
        tokio::time::sleep(Duration::from_millis(50)).await;

        let entries = log.read().await.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].description, "Status: status-4");
        assert!(!handle.is_finished());
        handle.abort();
    }

    #[tokio::test]
    async fn test_consumer_stops_when_stream_closes() {
        let (sender, receiver) = broadcast::channel::<RemoteEvent>(4);
        let log = Arc::new(RwLock::new(SpyLog::default()));
        let handle = spawn_spy_task(receiver, "42".to_string(), log);

        drop(sender);
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(handle.is_finished());
    }
}
