//! Scripted remote service
//!
//! An in-process stand-in for the remote service: it accepts one token,
//! serves a fixed [`RemoteFixture`], counts logins and teardowns, and lets
//! the caller inject failures and events. Used by the test suites.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{broadcast, Mutex};

use super::{
    ChannelSummary, ChatMessage, DmChannel, Friend, GuildSummary, MessageAuthor, PresenceStatus,
    RemoteConnector, RemoteEvent, RemoteSession, SessionOptions, UserProfile,
    EVENT_CHANNEL_CAPACITY,
};
use crate::error::{DeckError, Result};
use crate::retention::{ResourceKind, RetainedCache, RetentionSnapshot};

/// Data served by scripted sessions.
#[derive(Debug, Clone)]
pub struct RemoteFixture {
    pub profile: UserProfile,
    pub guilds: Vec<GuildSummary>,
    pub channels: HashMap<String, Vec<ChannelSummary>>,
    pub direct_messages: Vec<DmChannel>,
    pub friends: Vec<Friend>,
    /// Messages per channel, newest first
    pub messages: HashMap<String, Vec<ChatMessage>>,
}

impl RemoteFixture {
    /// A fixture with only a profile.
    pub fn for_user(id: &str, username: &str) -> Self {
        Self {
            profile: UserProfile {
                id: id.to_string(),
                username: username.to_string(),
                discriminator: None,
                avatar: None,
                banner: None,
                bio: None,
                created_at: None,
            },
            guilds: Vec::new(),
            channels: HashMap::new(),
            direct_messages: Vec::new(),
            friends: Vec::new(),
            messages: HashMap::new(),
        }
    }
}

#[derive(Default)]
struct Counters {
    logins: AtomicUsize,
    teardowns: AtomicUsize,
    pending_failures: AtomicUsize,
    sessions: StdMutex<Vec<Arc<ScriptedSession>>>,
}

// == Connector ==
/// Connector producing [`ScriptedSession`]s.
#[derive(Clone)]
pub struct ScriptedConnector {
    accepted_token: String,
    fixture: RemoteFixture,
    login_delay: Duration,
    live_events: bool,
    counters: Arc<Counters>,
}

impl ScriptedConnector {
    pub fn new(accepted_token: impl Into<String>, fixture: RemoteFixture) -> Self {
        Self {
            accepted_token: accepted_token.into(),
            fixture,
            login_delay: Duration::ZERO,
            live_events: true,
            counters: Arc::new(Counters::default()),
        }
    }

    /// Makes every login suspend for `delay` before answering.
    pub fn with_login_delay(mut self, delay: Duration) -> Self {
        self.login_delay = delay;
        self
    }

    /// Sessions of this connector carry no event stream.
    pub fn without_live_events(mut self) -> Self {
        self.live_events = false;
        self
    }

    /// Login attempts made through any session of this connector.
    pub fn logins(&self) -> usize {
        self.counters.logins.load(Ordering::SeqCst)
    }

    /// Sessions torn down with `destroy`.
    pub fn teardowns(&self) -> usize {
        self.counters.teardowns.load(Ordering::SeqCst)
    }

    pub fn sessions_created(&self) -> usize {
        self.sessions().len()
    }

    /// The most recently created session.
    pub fn last_session(&self) -> Option<Arc<ScriptedSession>> {
        self.sessions().last().cloned()
    }

    /// The next `count` data requests fail with a network error.
    pub fn fail_next_requests(&self, count: usize) {
        self.counters.pending_failures.store(count, Ordering::SeqCst);
    }

    fn sessions(&self) -> Vec<Arc<ScriptedSession>> {
        self.counters
            .sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl RemoteConnector for ScriptedConnector {
    fn create(&self, options: &SessionOptions) -> Arc<dyn RemoteSession> {
        let events = self
            .live_events
            .then(|| broadcast::channel(EVENT_CHANNEL_CAPACITY).0);
        let session = Arc::new(ScriptedSession {
            accepted_token: self.accepted_token.clone(),
            login_delay: self.login_delay,
            fixture: Mutex::new(self.fixture.clone()),
            counters: self.counters.clone(),
            ready: AtomicBool::new(false),
            destroyed: AtomicBool::new(false),
            presence: Mutex::new(options.presence),
            messages: Mutex::new(RetainedCache::new(
                options.retention.policy(ResourceKind::Messages),
            )),
            guilds: Mutex::new(RetainedCache::new(
                options.retention.policy(ResourceKind::Guilds),
            )),
            events,
        });
        self.counters
            .sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(session.clone());
        session
    }
}

// == Session ==
/// Session handle served from a [`RemoteFixture`].
pub struct ScriptedSession {
    accepted_token: String,
    login_delay: Duration,
    fixture: Mutex<RemoteFixture>,
    counters: Arc<Counters>,
    ready: AtomicBool,
    destroyed: AtomicBool,
    presence: Mutex<PresenceStatus>,
    messages: Mutex<RetainedCache<ChatMessage>>,
    guilds: Mutex<RetainedCache<GuildSummary>>,
    events: Option<broadcast::Sender<RemoteEvent>>,
}

impl ScriptedSession {
    /// Publishes `event` to subscribers. Returns how many received it.
    pub fn emit(&self, event: RemoteEvent) -> usize {
        self.events
            .as_ref()
            .map_or(0, |events| events.send(event).unwrap_or(0))
    }

    /// Simulates the service dropping the connection.
    pub fn drop_connection(&self) {
        self.ready.store(false, Ordering::SeqCst);
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    pub async fn presence(&self) -> PresenceStatus {
        *self.presence.lock().await
    }

    fn check_request(&self) -> Result<()> {
        if self.destroyed.load(Ordering::SeqCst) || !self.ready.load(Ordering::SeqCst) {
            return Err(DeckError::NetworkFailure("connection closed".to_string()));
        }
        let failures = &self.counters.pending_failures;
        if failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(DeckError::NetworkFailure("connection reset".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteSession for ScriptedSession {
    async fn login(&self, token: &str) -> Result<UserProfile> {
        self.counters.logins.fetch_add(1, Ordering::SeqCst);
        if !self.login_delay.is_zero() {
            tokio::time::sleep(self.login_delay).await;
        }

        if token != self.accepted_token {
            return Err(DeckError::AuthenticationFailed(
                "An invalid token was provided.".to_string(),
            ));
        }
        self.ready.store(true, Ordering::SeqCst);
        Ok(self.fixture.lock().await.profile.clone())
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst) && !self.destroyed.load(Ordering::SeqCst)
    }

    async fn current_user(&self) -> Result<UserProfile> {
        self.check_request()?;
        Ok(self.fixture.lock().await.profile.clone())
    }

    async fn guilds(&self) -> Result<Vec<GuildSummary>> {
        self.check_request()?;
        let guilds = self.fixture.lock().await.guilds.clone();
        let mut retained = self.guilds.lock().await;
        for guild in &guilds {
            retained.record(guild.id.clone(), guild.clone());
        }
        Ok(guilds)
    }

    async fn guild_channels(&self, guild_id: &str) -> Result<Vec<ChannelSummary>> {
        self.check_request()?;
        self.fixture
            .lock()
            .await
            .channels
            .get(guild_id)
            .cloned()
            .ok_or_else(|| DeckError::NotFound(format!("guild {}", guild_id)))
    }

    async fn direct_messages(&self) -> Result<Vec<DmChannel>> {
        self.check_request()?;
        Ok(self.fixture.lock().await.direct_messages.clone())
    }

    async fn friends(&self) -> Result<Vec<Friend>> {
        self.check_request()?;
        Ok(self.fixture.lock().await.friends.clone())
    }

    async fn messages(&self, channel_id: &str, limit: usize) -> Result<Vec<ChatMessage>> {
        self.check_request()?;
        let messages: Vec<ChatMessage> = self
            .fixture
            .lock()
            .await
            .messages
            .get(channel_id)
            .ok_or_else(|| DeckError::NotFound(format!("channel {}", channel_id)))?
            .iter()
            .take(limit)
            .cloned()
            .collect();

        let mut retained = self.messages.lock().await;
        for message in &messages {
            retained.record(message.id.clone(), message.clone());
        }
        Ok(messages)
    }

    async fn send_message(&self, channel_id: &str, content: &str) -> Result<ChatMessage> {
        self.check_request()?;
        let mut fixture = self.fixture.lock().await;
        let author = MessageAuthor {
            id: fixture.profile.id.clone(),
            username: fixture.profile.username.clone(),
            avatar: fixture.profile.avatar.clone(),
            bot: false,
        };
        let thread = fixture
            .messages
            .get_mut(channel_id)
            .ok_or_else(|| DeckError::NotFound(format!("channel {}", channel_id)))?;

        let message = ChatMessage {
            id: format!("sent-{}", thread.len() + 1),
            channel_id: channel_id.to_string(),
            content: content.to_string(),
            author,
            timestamp: Utc::now(),
        };
        thread.insert(0, message.clone());
        Ok(message)
    }

    async fn set_presence(&self, status: PresenceStatus) -> Result<()> {
        self.check_request()?;
        *self.presence.lock().await = status;
        Ok(())
    }

    fn subscribe(&self) -> Option<broadcast::Receiver<RemoteEvent>> {
        self.events.as_ref().map(broadcast::Sender::subscribe)
    }

    async fn clear_caches(&self) {
        self.messages.lock().await.clear();
        self.guilds.lock().await.clear();
    }

    async fn purge_expired(&self) -> usize {
        self.messages.lock().await.purge_expired() + self.guilds.lock().await.purge_expired()
    }

    async fn retained(&self) -> RetentionSnapshot {
        RetentionSnapshot::from([
            (ResourceKind::Messages, self.messages.lock().await.stats()),
            (ResourceKind::Guilds, self.guilds.lock().await.stats()),
        ])
    }

    async fn destroy(&self) -> Result<()> {
        self.counters.teardowns.fetch_add(1, Ordering::SeqCst);
        self.destroyed.store(true, Ordering::SeqCst);
        self.ready.store(false, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::teardown;

    #[tokio::test]
    async fn test_login_and_fetch() {
        let mut fixture = RemoteFixture::for_user("1", "me");
        fixture.guilds.push(GuildSummary {
            id: "g1".into(),
            name: "Guild".into(),
            icon: None,
        });
        let connector = ScriptedConnector::new("good", fixture);

        let session = connector.create(&SessionOptions::default());
        let profile = session.login("good").await.unwrap();
        assert_eq!(profile.username, "me");
        assert!(session.is_ready());

        let guilds = session.guilds().await.unwrap();
        assert_eq!(guilds.len(), 1);
        assert_eq!(session.retained().await[&ResourceKind::Guilds].retained, 1);
    }

    #[tokio::test]
    async fn test_bad_token_rejected() {
        let connector = ScriptedConnector::new("good", RemoteFixture::for_user("1", "me"));
        let session = connector.create(&SessionOptions::default());

        let result = session.login("bad").await;
        assert!(matches!(result, Err(DeckError::AuthenticationFailed(_))));
        assert!(!session.is_ready());
        assert_eq!(connector.logins(), 1);
    }

    #[tokio::test]
    async fn test_injected_failures_are_consumed() {
        let connector = ScriptedConnector::new("good", RemoteFixture::for_user("1", "me"));
        let session = connector.create(&SessionOptions::default());
        session.login("good").await.unwrap();

        connector.fail_next_requests(1);
        assert!(matches!(
            session.current_user().await,
            Err(DeckError::NetworkFailure(_))
        ));
        assert!(session.current_user().await.is_ok());
    }

    #[tokio::test]
    async fn test_teardown_clears_and_counts() {
        let connector = ScriptedConnector::new("good", RemoteFixture::for_user("1", "me"));
        let session = connector.create(&SessionOptions::default());
        session.login("good").await.unwrap();

        teardown(session.as_ref()).await.unwrap();

        assert_eq!(connector.teardowns(), 1);
        assert!(connector.last_session().unwrap().is_destroyed());
        assert!(!session.is_ready());
    }
}
