//! Session Manager Module
//!
//! Hands out at most one live session handle, built from the linked token.
//! Construction is single-flight: concurrent callers share one login.

use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::cache::BoundedCache;
use crate::error::{DeckError, Result};
use crate::remote::{teardown, RemoteConnector, RemoteSession, SessionOptions};
use crate::session::{MemoryInfo, SessionState, TokenValidation};

type Connecting = Shared<BoxFuture<'static, Result<Arc<dyn RemoteSession>>>>;

// == Session Slot ==
/// The managed handle and the connection attempt in flight, if any.
#[derive(Default)]
struct Slot {
    handle: Option<Arc<dyn RemoteSession>>,
    connecting: Option<Connecting>,
}

// == Session Manager ==
/// Owner of the single live remote session.
///
/// Share it behind an `Arc`; every method takes `&self`.
pub struct SessionManager {
    /// Source of the token
    cache: BoundedCache,
    /// Builds handles
    connector: Arc<dyn RemoteConnector>,
    /// Options for managed handles
    options: SessionOptions,
    /// Managed handle; never locked across network I/O
    slot: Arc<Mutex<Slot>>,
}

impl SessionManager {
    // == Constructor ==
    pub fn new(
        cache: BoundedCache,
        connector: Arc<dyn RemoteConnector>,
        options: SessionOptions,
    ) -> Self {
        Self {
            cache,
            connector,
            options,
            slot: Arc::new(Mutex::new(Slot::default())),
        }
    }

    pub fn cache(&self) -> &BoundedCache {
        &self.cache
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    // == Acquire ==
    /// Returns the ready session, connecting first if needed.
    ///
    /// A stale handle is torn down before reconnecting. Fails with
    /// [`DeckError::NotLinked`] when no token is stored and with
    /// [`DeckError::AuthenticationFailed`] when the service rejects it; failed
    /// logins are not retried.
    pub async fn acquire_session(&self) -> Result<Arc<dyn RemoteSession>> {
        let mut slot = self.slot.lock().await;

        if let Some(handle) = slot.handle.as_ref().filter(|h| h.is_ready()) {
            return Ok(handle.clone());
        }

        let connecting = match slot.connecting.clone() {
            Some(connecting) => {
                debug!("Joining in-flight connection");
                connecting
            }
            None => {
                let stale = slot.handle.take();
                let connecting = self.connect(stale).boxed().shared();
                slot.connecting = Some(connecting.clone());
                connecting
            }
        };
        drop(slot);

        connecting.await
    }

    /// Builds the connection future. It installs its own result into the slot
    /// so the handle is owned by the manager even if every caller goes away.
    fn connect(
        &self,
        stale: Option<Arc<dyn RemoteSession>>,
    ) -> impl Future<Output = Result<Arc<dyn RemoteSession>>> + Send + 'static {
        let cache = self.cache.clone();
        let connector = self.connector.clone();
        let options = self.options;
        let slot = self.slot.clone();

        async move {
            let result = establish(cache, connector, options, stale).await;

            let mut slot = slot.lock().await;
            slot.connecting = None;
            match &result {
                Ok(handle) => slot.handle = Some(handle.clone()),
                Err(e) => warn!("Session connection failed: {}", e),
            }
            result
        }
    }

    // == Destroy ==
    /// Tears down the managed handle, whatever its state, and returns the
    /// slot to `NoSession`. Waits for an in-flight connection to settle
    /// first. Idempotent.
    pub async fn destroy_session(&self) -> Result<()> {
        let handle = loop {
            let mut slot = self.slot.lock().await;
            if let Some(connecting) = slot.connecting.clone() {
                drop(slot);
                debug!("Waiting for in-flight connection before teardown");
                let _ = connecting.await;
                continue;
            }
            break slot.handle.take();
        };

        let Some(handle) = handle else {
            debug!("No session to destroy");
            return Ok(());
        };

        info!("Destroying session");
        teardown(handle.as_ref()).await
    }

    // == Validate ==
    /// Checks `candidate` with a throwaway handle.
    ///
    /// The managed slot and the cache are left untouched, and the throwaway
    /// handle is torn down on every path. Teardown failures are logged and
    /// do not change the outcome.
    pub async fn validate_token(&self, candidate: &str) -> TokenValidation {
        let candidate = candidate.trim();
        if candidate.is_empty() {
            return TokenValidation::invalid("Token cannot be empty");
        }

        let session = self.connector.create(&SessionOptions::minimal());
        let outcome = session.login(candidate).await;

        if let Err(e) = teardown(session.as_ref()).await {
            warn!("Failed to tear down validation session: {}", e);
        }
        drop(session);

        match outcome {
            Ok(profile) => TokenValidation::valid(profile.minimal()),
            Err(e) => {
                debug!("Token validation failed: {}", e);
                TokenValidation::invalid(e.to_string())
            }
        }
    }

    // == Introspection ==
    /// Whether a handle exists and is ready, plus its retention statistics.
    pub async fn memory_info(&self) -> MemoryInfo {
        let handle = self.slot.lock().await.handle.clone();
        match handle {
            Some(handle) => MemoryInfo {
                session_exists: true,
                ready: handle.is_ready(),
                retained: Some(handle.retained().await),
            },
            None => MemoryInfo::empty(),
        }
    }

    pub async fn state(&self) -> SessionState {
        let slot = self.slot.lock().await;
        if slot.connecting.is_some() {
            return SessionState::Connecting;
        }
        match &slot.handle {
            Some(handle) if handle.is_ready() => SessionState::Ready,
            Some(_) => SessionState::Stale,
            None => SessionState::NoSession,
        }
    }

    // == With Session ==
    /// Runs `op` against the live session. A network failure is taken as a
    /// dead connection: the session is rebuilt and `op` retried once.
    pub async fn with_session<T, F, Fut>(&self, op: F) -> Result<T>
    where
        F: Fn(Arc<dyn RemoteSession>) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let session = self.acquire_session().await?;
        match op(session).await {
            Err(DeckError::NetworkFailure(reason)) => {
                warn!("Session operation failed ({}), reconnecting once", reason);
                if let Err(e) = self.destroy_session().await {
                    warn!("Teardown of failed session errored: {}", e);
                }
                let session = self.acquire_session().await?;
                op(session).await
            }
            other => other,
        }
    }

    // == Purge Expired ==
    /// Drops aged-out retained objects of the live handle, if there is one.
    pub async fn purge_expired(&self) -> usize {
        let handle = self.slot.lock().await.handle.clone();
        match handle {
            Some(handle) => handle.purge_expired().await,
            None => 0,
        }
    }
}

async fn establish(
    cache: BoundedCache,
    connector: Arc<dyn RemoteConnector>,
    options: SessionOptions,
    stale: Option<Arc<dyn RemoteSession>>,
) -> Result<Arc<dyn RemoteSession>> {
    if let Some(stale) = stale {
        info!("Tearing down stale session");
        if let Err(e) = teardown(stale.as_ref()).await {
            warn!("Teardown of stale session failed: {}", e);
        }
    }

    let token = cache.token().await?.ok_or(DeckError::NotLinked)?;

    let handle = connector.create(&options);
    match handle.login(&token).await {
        Ok(profile) => {
            info!("Session ready for user {}", profile.id);
            Ok(handle)
        }
        Err(e) => {
            if let Err(te) = teardown(handle.as_ref()).await {
                warn!("Teardown after failed login errored: {}", te);
            }
            Err(e)
        }
    }
}
