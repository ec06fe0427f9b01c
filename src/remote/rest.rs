//! REST connector
//!
//! Session handles backed by the remote service's REST API. Objects fetched
//! through a handle are recorded in its retention caches, bounded by the
//! handle's [`RetentionConfig`](crate::retention::RetentionConfig).
//!
//! The realtime gateway is not opened, so the event stream of these handles
//! stays silent.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::AUTHORIZATION;
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{debug, info};

use super::{
    snowflake_timestamp, ChannelKind, ChannelSummary, ChatMessage, DmChannel, Friend,
    GuildSummary, LastMessage, MessageAuthor, PresenceStatus, RemoteConnector, RemoteEvent,
    RemoteSession, SessionOptions, UserProfile,
};
use crate::error::{DeckError, Result};
use crate::retention::{ResourceKind, RetainedCache, RetentionSnapshot};

const CDN_BASE_URL: &str = "https://cdn.discordapp.com";

// == Connector ==
/// Builds [`RemoteSession`] handles talking to a REST API at `base_url`.
#[derive(Debug, Clone)]
pub struct RestConnector {
    client: reqwest::Client,
    base_url: String,
}

impl RestConnector {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

impl RemoteConnector for RestConnector {
    fn create(&self, options: &SessionOptions) -> Arc<dyn RemoteSession> {
        Arc::new(RestSession::new(
            self.client.clone(),
            self.base_url.clone(),
            options,
        ))
    }
}

// == Retained objects ==
struct Retained {
    messages: RetainedCache<ChatMessage>,
    channels: RetainedCache<ChannelSummary>,
    guilds: RetainedCache<GuildSummary>,
    users: RetainedCache<UserProfile>,
}

impl Retained {
    fn new(options: &SessionOptions) -> Self {
        let retention = &options.retention;
        Self {
            messages: RetainedCache::new(retention.policy(ResourceKind::Messages)),
            channels: RetainedCache::new(retention.policy(ResourceKind::Channels)),
            guilds: RetainedCache::new(retention.policy(ResourceKind::Guilds)),
            users: RetainedCache::new(retention.policy(ResourceKind::Users)),
        }
    }

    fn clear(&mut self) {
        self.messages.clear();
        self.channels.clear();
        self.guilds.clear();
        self.users.clear();
    }
}

// == Session ==
struct RestSession {
    client: reqwest::Client,
    base_url: String,
    presence: PresenceStatus,
    token: RwLock<Option<String>>,
    ready: AtomicBool,
    destroyed: AtomicBool,
    retained: Mutex<Retained>,
}

impl RestSession {
    fn new(client: reqwest::Client, base_url: String, options: &SessionOptions) -> Self {
        Self {
            client,
            base_url,
            presence: options.presence,
            token: RwLock::new(None),
            ready: AtomicBool::new(false),
            destroyed: AtomicBool::new(false),
            retained: Mutex::new(Retained::new(options)),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn authorized(&self, builder: RequestBuilder) -> Result<RequestBuilder> {
        if self.destroyed.load(Ordering::SeqCst) {
            return Err(DeckError::NetworkFailure("session closed".to_string()));
        }
        let token = self.token.read().await;
        match token.as_deref() {
            Some(token) => Ok(builder.header(AUTHORIZATION, token)),
            None => Err(DeckError::Internal("session is not logged in".to_string())),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let request = self.authorized(self.client.get(self.url(path))).await?;
        self.send(request, path).await
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, path: &str) -> Result<T> {
        debug!("Remote request {}", path);
        let response = request.send().await?;

        match response.status() {
            status if status.is_success() => Ok(response.json::<T>().await?),
            StatusCode::UNAUTHORIZED => {
                // The service dropped the session; the manager rebuilds it on next access.
                self.ready.store(false, Ordering::SeqCst);
                Err(DeckError::AuthenticationFailed(format!(
                    "{} rejected the token",
                    path
                )))
            }
            StatusCode::NOT_FOUND => Err(DeckError::NotFound(path.to_string())),
            status => Err(DeckError::NetworkFailure(format!(
                "{} returned {}",
                path, status
            ))),
        }
    }
}

#[async_trait]
impl RemoteSession for RestSession {
    async fn login(&self, token: &str) -> Result<UserProfile> {
        let request = self
            .client
            .get(self.url("/users/@me"))
            .header(AUTHORIZATION, token);

        let user: WireUser = match self.send(request, "/users/@me").await {
            Ok(user) => user,
            Err(DeckError::AuthenticationFailed(_)) => {
                return Err(DeckError::AuthenticationFailed(
                    "An invalid token was provided.".to_string(),
                ))
            }
            Err(e) => return Err(e),
        };

        *self.token.write().await = Some(token.to_string());
        self.ready.store(true, Ordering::SeqCst);

        let profile = user.into_profile();
        self.retained
            .lock()
            .await
            .users
            .record(profile.id.clone(), profile.clone());

        info!("Logged in as {} (presence {})", profile.username, self.presence);
        Ok(profile)
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst) && !self.destroyed.load(Ordering::SeqCst)
    }

    async fn current_user(&self) -> Result<UserProfile> {
        let user: WireUser = self.get_json("/users/@me").await?;
        let profile = user.into_profile();
        self.retained
            .lock()
            .await
            .users
            .record(profile.id.clone(), profile.clone());
        Ok(profile)
    }

    async fn guilds(&self) -> Result<Vec<GuildSummary>> {
        let wire: Vec<WireGuild> = self.get_json("/users/@me/guilds").await?;
        let guilds: Vec<GuildSummary> = wire.into_iter().map(WireGuild::into_summary).collect();

        let mut retained = self.retained.lock().await;
        for guild in &guilds {
            retained.guilds.record(guild.id.clone(), guild.clone());
        }
        Ok(guilds)
    }

    async fn guild_channels(&self, guild_id: &str) -> Result<Vec<ChannelSummary>> {
        let path = format!("/guilds/{}/channels", guild_id);
        let wire: Vec<WireChannel> = self.get_json(&path).await?;
        let mut channels: Vec<ChannelSummary> =
            wire.into_iter().map(WireChannel::into_summary).collect();
        channels.sort_by_key(|c| c.position);

        let mut retained = self.retained.lock().await;
        for channel in &channels {
            retained.channels.record(channel.id.clone(), channel.clone());
        }
        Ok(channels)
    }

    async fn direct_messages(&self) -> Result<Vec<DmChannel>> {
        let wire: Vec<WireChannel> = self.get_json("/users/@me/channels").await?;

        let mut retained = self.retained.lock().await;
        let dms = wire
            .into_iter()
            .filter(|c| c.kind == 1)
            .filter_map(|c| {
                let recipient = c.recipients.into_iter().flatten().next()?;
                let profile = recipient.into_profile();
                retained.users.record(profile.id.clone(), profile.clone());
                Some(DmChannel {
                    id: c.id,
                    recipient: profile.username,
                    recipient_id: Some(profile.id),
                    avatar: profile.avatar,
                    last_message: c
                        .last_message_id
                        .as_deref()
                        .and_then(snowflake_timestamp)
                        .map(|timestamp| LastMessage {
                            content: None,
                            timestamp,
                        }),
                })
            })
            .collect();
        Ok(dms)
    }

    async fn friends(&self) -> Result<Vec<Friend>> {
        let wire: Vec<WireRelationship> = self.get_json("/users/@me/relationships").await?;
        Ok(wire
            .into_iter()
            .filter(|r| r.kind == 1)
            .map(|r| {
                let profile = r.user.into_profile();
                Friend {
                    id: profile.id,
                    username: profile.username,
                    avatar: profile.avatar,
                }
            })
            .collect())
    }

    async fn messages(&self, channel_id: &str, limit: usize) -> Result<Vec<ChatMessage>> {
        let path = format!("/channels/{}/messages?limit={}", channel_id, limit);
        let wire: Vec<WireMessage> = self.get_json(&path).await?;
        let messages: Vec<ChatMessage> = wire.into_iter().map(WireMessage::into_message).collect();

        let mut retained = self.retained.lock().await;
        for message in &messages {
            retained.messages.record(message.id.clone(), message.clone());
        }
        Ok(messages)
    }

    async fn send_message(&self, channel_id: &str, content: &str) -> Result<ChatMessage> {
        let path = format!("/channels/{}/messages", channel_id);
        let request = self
            .authorized(self.client.post(self.url(&path)))
            .await?
            .json(&json!({ "content": content }));
        let wire: WireMessage = self.send(request, &path).await?;

        let message = wire.into_message();
        self.retained
            .lock()
            .await
            .messages
            .record(message.id.clone(), message.clone());
        Ok(message)
    }

    async fn set_presence(&self, status: PresenceStatus) -> Result<()> {
        let path = "/users/@me/settings";
        let request = self
            .authorized(self.client.patch(self.url(path)))
            .await?
            .json(&json!({ "status": status.as_str() }));
        let _: serde_json::Value = self.send(request, path).await?;
        Ok(())
    }

    // Plain REST has no gateway connection
    fn subscribe(&self) -> Option<broadcast::Receiver<RemoteEvent>> {
        None
    }

    async fn clear_caches(&self) {
        self.retained.lock().await.clear();
    }

    async fn purge_expired(&self) -> usize {
        let mut retained = self.retained.lock().await;
        retained.messages.purge_expired()
            + retained.channels.purge_expired()
            + retained.guilds.purge_expired()
            + retained.users.purge_expired()
    }

    async fn retained(&self) -> RetentionSnapshot {
        let retained = self.retained.lock().await;
        RetentionSnapshot::from([
            (ResourceKind::Messages, retained.messages.stats()),
            (ResourceKind::Channels, retained.channels.stats()),
            (ResourceKind::Guilds, retained.guilds.stats()),
            (ResourceKind::Users, retained.users.stats()),
        ])
    }

    async fn destroy(&self) -> Result<()> {
        self.destroyed.store(true, Ordering::SeqCst);
        self.ready.store(false, Ordering::SeqCst);
        *self.token.write().await = None;
        Ok(())
    }
}

// == Wire types ==
#[derive(Debug, Deserialize)]
struct WireUser {
    id: String,
    username: String,
    #[serde(default)]
    global_name: Option<String>,
    #[serde(default)]
    discriminator: Option<String>,
    #[serde(default)]
    avatar: Option<String>,
    #[serde(default)]
    banner: Option<String>,
    #[serde(default)]
    bio: Option<String>,
    #[serde(default)]
    bot: Option<bool>,
}

impl WireUser {
    fn avatar_url(&self) -> Option<String> {
        self.avatar
            .as_ref()
            .map(|hash| format!("{}/avatars/{}/{}.png", CDN_BASE_URL, self.id, hash))
    }

    fn into_profile(self) -> UserProfile {
        let avatar = self.avatar_url();
        let banner = self
            .banner
            .as_ref()
            .map(|hash| format!("{}/banners/{}/{}.png?size=1024", CDN_BASE_URL, self.id, hash));
        let created_at = snowflake_timestamp(&self.id);
        UserProfile {
            username: self.global_name.unwrap_or(self.username),
            discriminator: self.discriminator.filter(|d| d != "0"),
            avatar,
            banner,
            bio: self.bio.filter(|b| !b.is_empty()),
            created_at,
            id: self.id,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireGuild {
    id: String,
    name: String,
    #[serde(default)]
    icon: Option<String>,
}

impl WireGuild {
    fn into_summary(self) -> GuildSummary {
        let icon = self
            .icon
            .as_ref()
            .map(|hash| format!("{}/icons/{}/{}.png", CDN_BASE_URL, self.id, hash));
        GuildSummary {
            id: self.id,
            name: self.name,
            icon,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireChannel {
    id: String,
    #[serde(rename = "type")]
    kind: u8,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    parent_id: Option<String>,
    #[serde(default)]
    position: Option<i64>,
    #[serde(default)]
    recipients: Option<Vec<WireUser>>,
    #[serde(default)]
    last_message_id: Option<String>,
}

impl WireChannel {
    fn into_summary(self) -> ChannelSummary {
        let kind = match self.kind {
            0 | 5 => ChannelKind::Text,
            2 | 13 => ChannelKind::Voice,
            4 => ChannelKind::Category,
            _ => ChannelKind::Other,
        };
        ChannelSummary {
            name: self.name.unwrap_or_else(|| self.id.clone()),
            id: self.id,
            kind,
            parent_id: self.parent_id,
            position: self.position.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    id: String,
    channel_id: String,
    #[serde(default)]
    content: String,
    author: WireUser,
    timestamp: DateTime<Utc>,
}

impl WireMessage {
    fn into_message(self) -> ChatMessage {
        let bot = self.author.bot.unwrap_or(false);
        let avatar = self.author.avatar_url();
        ChatMessage {
            id: self.id,
            channel_id: self.channel_id,
            content: self.content,
            author: MessageAuthor {
                id: self.author.id,
                username: self.author.username,
                avatar,
                bot,
            },
            timestamp: self.timestamp,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireRelationship {
    #[serde(rename = "type")]
    kind: u8,
    user: WireUser,
}
