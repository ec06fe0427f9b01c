//! Guilds command
//!
//! Guild list with user pins on top, pin toggling, and a guild's channels
//! grouped by category. Pins live in the key-value store under their own
//! key so clearing the cache keeps them.

use serde::Serialize;
use tracing::{debug, info, warn};

use super::{stale_then_refresh, write_back, Snapshot};
use crate::cache::CacheKey;
use crate::error::{DeckError, Result};
use crate::remote::{ChannelKind, ChannelSummary, GuildSummary};
use crate::session::SessionManager;
use crate::store::KeyValueStore;

/// Store key of the pinned guild ids
pub const PINNED_GUILDS_KEY: &str = "pinned_guilds";

/// Guilds as shown to the user: pinned ones first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuildList {
    pub guilds: Vec<GuildSummary>,
    pub pinned: Vec<String>,
}

/// Channels under one category, or the uncategorized ones when
/// `category` is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelGroup {
    pub category: Option<ChannelSummary>,
    pub channels: Vec<ChannelSummary>,
}

/// Cached guilds right away, then the fresh list.
pub async fn load(sessions: &SessionManager) -> Result<Snapshot<GuildList>> {
    let cache = sessions.cache();
    let pinned = pinned_guilds(cache.store().as_ref()).await?;
    let cached = cache.get::<Vec<GuildSummary>>(CacheKey::Guilds).await?;

    let snapshot = stale_then_refresh("guilds", cached, refresh(sessions)).await?;
    Ok(snapshot.map(|guilds| GuildList {
        guilds: sort_pinned_first(guilds, &pinned),
        pinned,
    }))
}

/// Fetches guilds and caches them in fetch order.
pub async fn refresh(sessions: &SessionManager) -> Result<Vec<GuildSummary>> {
    let guilds = sessions
        .with_session(|session| async move { session.guilds().await })
        .await?;
    write_back(sessions.cache(), CacheKey::Guilds, &guilds).await?;
    Ok(guilds)
}

/// Stable sort putting pinned guilds first.
pub fn sort_pinned_first(mut guilds: Vec<GuildSummary>, pinned: &[String]) -> Vec<GuildSummary> {
    guilds.sort_by_key(|guild| !pinned.contains(&guild.id));
    guilds
}

/// Pinned guild ids. Unreadable contents are dropped.
pub async fn pinned_guilds(store: &dyn KeyValueStore) -> Result<Vec<String>> {
    let Some(raw) = store.get_item(PINNED_GUILDS_KEY).await? else {
        return Ok(Vec::new());
    };

    match serde_json::from_str(&raw) {
        Ok(pinned) => Ok(pinned),
        Err(e) => {
            warn!("Dropping unreadable pinned guilds: {}", e);
            store.remove_item(PINNED_GUILDS_KEY).await?;
            Ok(Vec::new())
        }
    }
}

/// Pins `guild_id` if it was not pinned, unpins it otherwise. Returns the
/// new pin list.
pub async fn toggle_pin(store: &dyn KeyValueStore, guild_id: &str) -> Result<Vec<String>> {
    let mut pinned = pinned_guilds(store).await?;

    if let Some(index) = pinned.iter().position(|id| id == guild_id) {
        pinned.remove(index);
        info!("Unpinned guild {}", guild_id);
    } else {
        pinned.push(guild_id.to_string());
        info!("Pinned guild {}", guild_id);
    }

    let raw = serde_json::to_string(&pinned).map_err(|e| DeckError::Internal(e.to_string()))?;
    store.set_item(PINNED_GUILDS_KEY, raw).await?;
    Ok(pinned)
}

/// Channels of a guild grouped by category.
///
/// Uncategorized channels come first, then categories by position. Inside a
/// group text channels come before voice channels, each by position.
pub async fn channels(sessions: &SessionManager, guild_id: &str) -> Result<Vec<ChannelGroup>> {
    let guild_id = guild_id.to_string();
    let channels = sessions
        .with_session(|session| {
            let guild_id = guild_id.clone();
            async move { session.guild_channels(&guild_id).await }
        })
        .await?;
    debug!("Fetched {} channels", channels.len());
    Ok(group_channels(channels))
}

pub fn group_channels(channels: Vec<ChannelSummary>) -> Vec<ChannelGroup> {
    let (mut categories, mut rest): (Vec<_>, Vec<_>) = channels
        .into_iter()
        .partition(|channel| channel.kind == ChannelKind::Category);
    categories.sort_by_key(|category| category.position);
    rest.sort_by_key(|channel| (channel.kind == ChannelKind::Voice, channel.position));

    let mut groups = Vec::with_capacity(categories.len() + 1);

    let uncategorized: Vec<_> = rest
        .iter()
        .filter(|channel| {
            channel
                .parent_id
                .as_ref()
                .map_or(true, |parent| !categories.iter().any(|c| &c.id == parent))
        })
        .cloned()
        .collect();
    if !uncategorized.is_empty() {
        groups.push(ChannelGroup {
            category: None,
            channels: uncategorized,
        });
    }

    for category in categories {
        let channels = rest
            .iter()
            .filter(|channel| channel.parent_id.as_deref() == Some(category.id.as_str()))
            .cloned()
            .collect();
        groups.push(ChannelGroup {
            category: Some(category),
            channels,
        });
    }

    groups
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{channel, guild, manager};
    use crate::store::MemoryStore;

    fn ids(guilds: &[GuildSummary]) -> Vec<&str> {
        guilds.iter().map(|g| g.id.as_str()).collect()
    }

    #[test]
    fn test_sort_pinned_first_is_stable() {
        let guilds = vec![guild("a", "A"), guild("b", "B"), guild("c", "C"), guild("d", "D")];
        let pinned = vec!["d".to_string(), "b".to_string()];

        let sorted = sort_pinned_first(guilds, &pinned);
        assert_eq!(ids(&sorted), vec!["b", "d", "a", "c"]);
    }

    #[tokio::test]
    async fn test_toggle_pin_round_trip() {
        let store = MemoryStore::new();

        assert_eq!(toggle_pin(&store, "g1").await.unwrap(), vec!["g1"]);
        assert_eq!(toggle_pin(&store, "g2").await.unwrap(), vec!["g1", "g2"]);
        assert_eq!(toggle_pin(&store, "g1").await.unwrap(), vec!["g2"]);
        assert_eq!(pinned_guilds(&store).await.unwrap(), vec!["g2"]);
    }

    #[tokio::test]
    async fn test_unreadable_pins_are_dropped() {
        let store = MemoryStore::new();
        store
            .set_item(PINNED_GUILDS_KEY, "{not json".to_string())
            .await
            .unwrap();

        assert!(pinned_guilds(&store).await.unwrap().is_empty());
        assert_eq!(store.get_item(PINNED_GUILDS_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_load_caches_fetch_order_and_returns_pinned_first() {
        let (sessions, _) = manager(true).await;
        toggle_pin(sessions.cache().store().as_ref(), "g3").await.unwrap();

        let snapshot = load(&sessions).await.unwrap();

        assert!(!snapshot.stale);
        assert_eq!(ids(&snapshot.data.guilds), vec!["g3", "g1", "g2"]);
        assert_eq!(snapshot.data.pinned, vec!["g3"]);

        let cached: Vec<GuildSummary> = sessions
            .cache()
            .get(CacheKey::Guilds)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ids(&cached), vec!["g1", "g2", "g3"]);
    }

    #[tokio::test]
    async fn test_load_serves_stale_cache_when_offline() {
        let (sessions, _) = manager(false).await;
        sessions
            .cache()
            .set(CacheKey::Guilds, &vec![guild("cached", "Cached")])
            .await
            .unwrap();

        let snapshot = load(&sessions).await.unwrap();

        assert!(snapshot.stale);
        assert_eq!(ids(&snapshot.data.guilds), vec!["cached"]);
    }

    #[tokio::test]
    async fn test_load_without_cache_or_token_fails() {
        let (sessions, _) = manager(false).await;
        assert_eq!(load(&sessions).await, Err(DeckError::NotLinked));
    }

    #[test]
    fn test_group_channels() {
        let groups = group_channels(vec![
            channel("voice", ChannelKind::Voice, Some("cat"), 0),
            channel("general", ChannelKind::Text, Some("cat"), 1),
            channel("rules", ChannelKind::Text, None, 0),
            channel("orphan", ChannelKind::Text, Some("gone"), 5),
            channel("cat", ChannelKind::Category, None, 0),
        ]);

        assert_eq!(groups.len(), 2);
        assert!(groups[0].category.is_none());
        let loose: Vec<_> = groups[0].channels.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(loose, vec!["rules", "orphan"]);

        assert_eq!(groups[1].category.as_ref().unwrap().id, "cat");
        let inside: Vec<_> = groups[1].channels.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(inside, vec!["general", "voice"]);
    }

    #[tokio::test]
    async fn test_channels_of_unknown_guild() {
        let (sessions, _) = manager(true).await;
        let result = channels(&sessions, "nope").await;
        assert!(matches!(result, Err(DeckError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_channels_of_known_guild() {
        let (sessions, _) = manager(true).await;
        let groups = channels(&sessions, "g1").await.unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[1].channels.len(), 2);
    }
}
