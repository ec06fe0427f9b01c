//! Direct messages command

use super::{stale_then_refresh, write_back, Snapshot};
use crate::cache::CacheKey;
use crate::error::Result;
use crate::remote::DmChannel;
use crate::session::SessionManager;

/// Cached conversations right away, then the fresh list.
pub async fn load(sessions: &SessionManager) -> Result<Snapshot<Vec<DmChannel>>> {
    let cached = sessions
        .cache()
        .get::<Vec<DmChannel>>(CacheKey::DirectMessages)
        .await?;
    stale_then_refresh("direct messages", cached, refresh(sessions)).await
}

/// Fetches conversations, most recent first, and caches them. Sorting
/// before the write means truncation drops the oldest ones.
pub async fn refresh(sessions: &SessionManager) -> Result<Vec<DmChannel>> {
    let mut channels = sessions
        .with_session(|session| async move { session.direct_messages().await })
        .await?;
    sort_by_recency(&mut channels);
    write_back(sessions.cache(), CacheKey::DirectMessages, &channels).await?;
    Ok(channels)
}

/// Newest last message first; conversations without one go last.
pub fn sort_by_recency(channels: &mut [DmChannel]) {
    channels.sort_by(|a, b| b.last_activity().cmp(&a.last_activity()));
}
