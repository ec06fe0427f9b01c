//! API Handlers
//!
//! HTTP request handlers for each launcher command.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use tokio::sync::Mutex;
use tracing::info;

use crate::cache::BoundedCache;
use crate::commands::{
    chat, dashboard, direct_messages,
    guilds::{self, ChannelGroup, GuildList},
    link,
    spy::{SpyReport, SpySession},
    Snapshot,
};
use crate::config::Config;
use crate::error::{DeckError, Result};
use crate::models::{
    CacheSizesResponse, HealthResponse, LinkRequest, MessageResponse, PinResponse,
    SendMessageRequest, SessionResponse, SpyRequest, StatusRequest,
};
use crate::remote::{
    ChatMessage, DmChannel, RemoteConnector, RestConnector, SessionOptions, UserProfile,
};
use crate::session::SessionManager;
use crate::store::JsonFileStore;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Owner of the live session and the cache
    pub sessions: Arc<SessionManager>,
    /// Running spy watch, if any
    pub spy: Arc<Mutex<Option<SpySession>>>,
}

impl AppState {
    pub fn new(sessions: Arc<SessionManager>) -> Self {
        Self {
            sessions,
            spy: Arc::new(Mutex::new(None)),
        }
    }

    /// Builds the state from configuration: the JSON file store, the REST
    /// connector and a session manager over both.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let store = JsonFileStore::open(&config.store_path).await?;
        let cache = BoundedCache::new(Arc::new(store), config.cache_policy());
        let connector: Arc<dyn RemoteConnector> =
            Arc::new(RestConnector::new(config.api_base_url.clone()));
        let options = SessionOptions {
            retention: config.retention(),
            ..SessionOptions::default()
        };

        Ok(Self::new(Arc::new(SessionManager::new(
            cache, connector, options,
        ))))
    }

    pub fn cache(&self) -> &BoundedCache {
        self.sessions.cache()
    }

    /// Stops spy mode and destroys the session. Called on shutdown.
    pub async fn shutdown(&self) -> Result<()> {
        self.spy.lock().await.take();
        self.sessions.destroy_session().await
    }
}

/// Handler for GET /dashboard
pub async fn dashboard_handler(State(state): State<AppState>) -> Result<Json<Snapshot<UserProfile>>> {
    Ok(Json(dashboard::load(&state.sessions).await?))
}

/// Handler for PUT /dashboard/status
pub async fn status_handler(
    State(state): State<AppState>,
    Json(req): Json<StatusRequest>,
) -> Result<Json<MessageResponse>> {
    dashboard::set_status(&state.sessions, req.status).await?;
    Ok(Json(MessageResponse::new(format!(
        "Status set to {}",
        req.status
    ))))
}

/// Handler for GET /guilds
pub async fn guilds_handler(State(state): State<AppState>) -> Result<Json<Snapshot<GuildList>>> {
    Ok(Json(guilds::load(&state.sessions).await?))
}

/// Handler for PUT /guilds/:id/pin
pub async fn pin_handler(
    State(state): State<AppState>,
    Path(guild_id): Path<String>,
) -> Result<Json<PinResponse>> {
    let pinned = guilds::toggle_pin(state.cache().store().as_ref(), &guild_id).await?;
    Ok(Json(PinResponse::new(guild_id, pinned)))
}

/// Handler for GET /guilds/:id/channels
pub async fn channels_handler(
    State(state): State<AppState>,
    Path(guild_id): Path<String>,
) -> Result<Json<Vec<ChannelGroup>>> {
    Ok(Json(guilds::channels(&state.sessions, &guild_id).await?))
}

/// Handler for GET /dms
pub async fn dms_handler(State(state): State<AppState>) -> Result<Json<Snapshot<Vec<DmChannel>>>> {
    Ok(Json(direct_messages::load(&state.sessions).await?))
}

/// Handler for GET /channels/:id/messages
pub async fn history_handler(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
) -> Result<Json<Vec<ChatMessage>>> {
    Ok(Json(chat::history(&state.sessions, &channel_id).await?))
}

/// Handler for POST /channels/:id/messages
pub async fn send_handler(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
    Json(req): Json<SendMessageRequest>,
) -> Result<Json<Vec<ChatMessage>>> {
    if let Some(error_msg) = req.validate() {
        return Err(DeckError::InvalidRequest(error_msg));
    }
    Ok(Json(
        chat::send(&state.sessions, &channel_id, &req.content).await?,
    ))
}

/// Handler for POST /link
pub async fn link_handler(
    State(state): State<AppState>,
    Json(req): Json<LinkRequest>,
) -> Result<Json<UserProfile>> {
    if let Some(error_msg) = req.validate() {
        return Err(DeckError::InvalidRequest(error_msg));
    }

    // A new account invalidates any watch on the old session
    state.spy.lock().await.take();
    Ok(Json(link::link_account(&state.sessions, &req.token).await?))
}

/// Handler for POST /spy
///
/// Replaces any running watch.
pub async fn spy_start_handler(
    State(state): State<AppState>,
    Json(req): Json<SpyRequest>,
) -> Result<Json<SpyReport>> {
    if let Some(error_msg) = req.validate() {
        return Err(DeckError::InvalidRequest(error_msg));
    }

    // Login may take a while; the watch slot is only locked for the swap
    let session = SpySession::start(&state.sessions, &req.user_id).await?;
    let report = session.report().await;
    if let Some(previous) = state.spy.lock().await.replace(session) {
        info!("Spy mode stopped watching {}", previous.target());
    }
    Ok(Json(report))
}

/// Handler for GET /spy
pub async fn spy_log_handler(State(state): State<AppState>) -> Result<Json<SpyReport>> {
    let spy = state.spy.lock().await;
    match spy.as_ref() {
        Some(session) => Ok(Json(session.report().await)),
        None => Err(DeckError::NotFound("Spy mode is not running".to_string())),
    }
}

/// Handler for DELETE /spy
pub async fn spy_stop_handler(State(state): State<AppState>) -> Result<Json<MessageResponse>> {
    match state.spy.lock().await.take() {
        Some(session) => {
            info!("Spy mode stopped watching {}", session.target());
            Ok(Json(MessageResponse::new("Spy mode stopped")))
        }
        None => Err(DeckError::NotFound("Spy mode is not running".to_string())),
    }
}

/// Handler for GET /cache/sizes
pub async fn cache_sizes_handler(State(state): State<AppState>) -> Result<Json<CacheSizesResponse>> {
    let sizes: BTreeMap<&'static str, usize> = state.cache().size_report().await?;
    Ok(Json(CacheSizesResponse::new(sizes)))
}

/// Handler for DELETE /cache
///
/// The linked token survives.
pub async fn cache_clear_handler(State(state): State<AppState>) -> Result<Json<MessageResponse>> {
    state.cache().clear_all().await?;
    info!("Cache cleared");
    Ok(Json(MessageResponse::new("Cache cleared")))
}

/// Handler for GET /session
pub async fn session_handler(State(state): State<AppState>) -> Json<SessionResponse> {
    Json(SessionResponse {
        state: state.sessions.state().await,
        memory: state.sessions.memory_info().await,
    })
}

/// Handler for DELETE /session
pub async fn session_destroy_handler(
    State(state): State<AppState>,
) -> Result<Json<MessageResponse>> {
    state.spy.lock().await.take();
    state.sessions.destroy_session().await?;
    Ok(Json(MessageResponse::new("Session destroyed")))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheKey, CachePolicy};
    use crate::remote::{RemoteFixture, ScriptedConnector};
    use crate::session::SessionState;
    use crate::store::MemoryStore;
    use std::time::Duration;

    async fn state(linked: bool) -> (AppState, ScriptedConnector) {
        let connector = ScriptedConnector::new("token", RemoteFixture::for_user("1", "me"));
        state_with(linked, connector).await
    }

    async fn state_with(linked: bool, connector: ScriptedConnector) -> (AppState, ScriptedConnector) {
        let cache = BoundedCache::new(Arc::new(MemoryStore::new()), CachePolicy::default());
        if linked {
            cache.set_token("token").await.unwrap();
        }
        let sessions = SessionManager::new(
            cache,
            Arc::new(connector.clone()),
            SessionOptions::default(),
        );
        (AppState::new(Arc::new(sessions)), connector)
    }

    #[tokio::test]
    async fn test_dashboard_handler() {
        let (state, _) = state(true).await;
        let response = dashboard_handler(State(state)).await.unwrap();
        assert_eq!(response.data.username, "me");
        assert!(!response.stale);
    }

    #[tokio::test]
    async fn test_dashboard_handler_not_linked() {
        let (state, _) = state(false).await;
        let result = dashboard_handler(State(state)).await;
        assert!(matches!(result, Err(DeckError::NotLinked)));
    }

    #[tokio::test]
    async fn test_pin_handler_toggles() {
        let (state, _) = state(false).await;

        let response = pin_handler(State(state.clone()), Path("g1".to_string()))
            .await
            .unwrap();
        assert!(response.pinned);

        let response = pin_handler(State(state), Path("g1".to_string()))
            .await
            .unwrap();
        assert!(!response.pinned);
    }

    #[tokio::test]
    async fn test_send_handler_rejects_empty() {
        let (state, connector) = state(true).await;
        let req = SendMessageRequest {
            content: "".to_string(),
        };
        let result = send_handler(State(state), Path("c1".to_string()), Json(req)).await;
        assert!(matches!(result, Err(DeckError::InvalidRequest(_))));
        assert_eq!(connector.logins(), 0);
    }

    #[tokio::test]
    async fn test_spy_handlers_lifecycle() {
        let (state, _) = state(true).await;

        assert!(spy_log_handler(State(state.clone())).await.is_err());

        let req = SpyRequest {
            user_id: "42".to_string(),
        };
        let report = spy_start_handler(State(state.clone()), Json(req)).await.unwrap();
        assert_eq!(report.target, "42");
        assert!(report.entries.is_empty());

        assert!(spy_log_handler(State(state.clone())).await.is_ok());
        assert!(spy_stop_handler(State(state.clone())).await.is_ok());
        assert!(spy_stop_handler(State(state)).await.is_err());
    }

    #[tokio::test]
    async fn test_spy_start_without_event_stream() {
        let connector =
            ScriptedConnector::new("token", RemoteFixture::for_user("1", "me")).without_live_events();
        let (state, _) = state_with(true, connector).await;

        let req = SpyRequest {
            user_id: "42".to_string(),
        };
        let result = spy_start_handler(State(state.clone()), Json(req)).await;

        assert!(matches!(result, Err(DeckError::Unsupported(_))));
        assert!(spy_log_handler(State(state)).await.is_err());
    }

    #[tokio::test]
    async fn test_spy_log_answers_during_slow_login() {
        let connector = ScriptedConnector::new("token", RemoteFixture::for_user("1", "me"))
            .with_login_delay(Duration::from_millis(300));
        let (state, _) = state_with(true, connector).await;

        let starting = tokio::spawn(spy_start_handler(
            State(state.clone()),
            Json(SpyRequest {
                user_id: "42".to_string(),
            }),
        ));
        tokio::time::sleep(Duration::from_millis(20)).await;

        let log = tokio::time::timeout(Duration::from_millis(100), spy_log_handler(State(state.clone())))
            .await
            .expect("GET /spy blocked behind the login");
        assert!(matches!(log, Err(DeckError::NotFound(_))));

        assert!(starting.await.unwrap().is_ok());
        assert!(spy_log_handler(State(state)).await.is_ok());
    }

    #[tokio::test]
    async fn test_cache_clear_keeps_token() {
        let (state, _) = state(true).await;
        state
            .cache()
            .set(CacheKey::Friends, &vec!["a"])
            .await
            .unwrap();

        cache_clear_handler(State(state.clone())).await.unwrap();

        let sizes = cache_sizes_handler(State(state)).await.unwrap();
        assert_eq!(sizes.entries.keys().copied().collect::<Vec<_>>(), vec!["discord_token"]);
    }

    #[tokio::test]
    async fn test_session_handlers() {
        let (state, _) = state(true).await;
        state.sessions.acquire_session().await.unwrap();

        let response = session_handler(State(state.clone())).await;
        assert_eq!(response.state, SessionState::Ready);
        assert!(response.memory.session_exists);

        session_destroy_handler(State(state.clone())).await.unwrap();
        let response = session_handler(State(state)).await;
        assert_eq!(response.state, SessionState::NoSession);
        assert!(!response.memory.ready);
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await;
        assert_eq!(response.status, "healthy");
    }
}
