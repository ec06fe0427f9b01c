//! Link account command

use tracing::{info, warn};

use super::write_back;
use crate::cache::CacheKey;
use crate::error::{DeckError, Result};
use crate::remote::UserProfile;
use crate::session::SessionManager;

/// Validates `token` and, when accepted, makes it the linked token.
///
/// Cached data belongs to the previous account, so every entry but the
/// token is cleared, then the minimal profile is cached and the managed
/// session dropped so the next access logs in with the new token. A rejected
/// token changes nothing.
pub async fn link_account(sessions: &SessionManager, token: &str) -> Result<UserProfile> {
    let validation = sessions.validate_token(token).await;
    let profile = match (validation.valid, validation.profile) {
        (true, Some(profile)) => profile,
        _ => {
            let reason = validation
                .error
                .unwrap_or_else(|| "Invalid token".to_string());
            return Err(DeckError::AuthenticationFailed(reason));
        }
    };

    // Token last: a failed clear must not pair it with the old account's data
    let cache = sessions.cache();
    cache.clear_all().await?;
    cache.set_token(token.trim()).await?;
    write_back(cache, CacheKey::UserProfile, &profile).await?;

    if let Err(e) = sessions.destroy_session().await {
        warn!("Dropping the previous session failed: {}", e);
    }

    info!("Linked account {}", profile.username);
    Ok(profile)
}
