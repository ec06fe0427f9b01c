//! Dashboard command
//!
//! Shows the linked account's profile. A successful refresh also warms the
//! guild, direct message and friend caches so the other views open fast.

use tracing::{debug, info, warn};

use super::{direct_messages, guilds, stale_then_refresh, write_back, Snapshot};
use crate::cache::CacheKey;
use crate::error::Result;
use crate::remote::{PresenceStatus, UserProfile};
use crate::session::SessionManager;

/// Cached profile right away, then the fresh one.
pub async fn load(sessions: &SessionManager) -> Result<Snapshot<UserProfile>> {
    let cached = sessions
        .cache()
        .get::<UserProfile>(CacheKey::UserProfile)
        .await?;

    stale_then_refresh("profile", cached, async {
        let profile = sessions
            .with_session(|session| async move { session.current_user().await })
            .await?;
        write_back(sessions.cache(), CacheKey::UserProfile, &profile).await?;
        prefetch(sessions).await;
        Ok(profile)
    })
    .await
}

/// Best-effort warm-up of the list caches.
async fn prefetch(sessions: &SessionManager) {
    if let Err(e) = guilds::refresh(sessions).await {
        warn!("Prefetching guilds failed: {}", e);
    }
    if let Err(e) = direct_messages::refresh(sessions).await {
        warn!("Prefetching direct messages failed: {}", e);
    }

    let friends = sessions
        .with_session(|session| async move { session.friends().await })
        .await;
    match friends {
        Ok(friends) => {
            if let Err(e) = write_back(sessions.cache(), CacheKey::Friends, &friends).await {
                warn!("Caching friends failed: {}", e);
            }
        }
        Err(e) => warn!("Prefetching friends failed: {}", e),
    }
    debug!("Dashboard prefetch done");
}

/// Changes the account's presence.
pub async fn set_status(sessions: &SessionManager, status: PresenceStatus) -> Result<()> {
    sessions
        .with_session(|session| async move { session.set_presence(status).await })
        .await?;
    info!("Status set to {}", status);
    Ok(())
}
