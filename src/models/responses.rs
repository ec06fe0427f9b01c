//! Response DTOs for the command API
//!
//! Defines the structure of outgoing HTTP response bodies that are not
//! domain types serialized as-is.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::session::{MemoryInfo, SessionState};

/// Response body for PUT /dashboard/status and other acknowledgements
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Response body for PUT /guilds/:id/pin
#[derive(Debug, Clone, Serialize)]
pub struct PinResponse {
    pub guild_id: String,
    pub pinned: bool,
    pub pinned_guilds: Vec<String>,
}

impl PinResponse {
    pub fn new(guild_id: impl Into<String>, pinned_guilds: Vec<String>) -> Self {
        let guild_id = guild_id.into();
        Self {
            pinned: pinned_guilds.contains(&guild_id),
            guild_id,
            pinned_guilds,
        }
    }
}

/// Response body for GET /cache/sizes
#[derive(Debug, Clone, Serialize)]
pub struct CacheSizesResponse {
    /// Byte size per present entry
    pub entries: BTreeMap<&'static str, usize>,
    pub total_bytes: usize,
}

impl CacheSizesResponse {
    pub fn new(entries: BTreeMap<&'static str, usize>) -> Self {
        let total_bytes = entries.values().sum();
        Self {
            entries,
            total_bytes,
        }
    }
}

/// Response body for GET /session
#[derive(Debug, Clone, Serialize)]
pub struct SessionResponse {
    pub state: SessionState,
    #[serde(flatten)]
    pub memory: MemoryInfo,
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pin_response_reports_membership() {
        let resp = PinResponse::new("g1", vec!["g2".to_string(), "g1".to_string()]);
        assert!(resp.pinned);

        let resp = PinResponse::new("g3", vec!["g2".to_string()]);
        assert!(!resp.pinned);
    }

    #[test]
    fn test_cache_sizes_total() {
        let resp = CacheSizesResponse::new(BTreeMap::from([("cache_dms", 10), ("discord_token", 7)]));
        assert_eq!(resp.total_bytes, 17);
    }

    #[test]
    fn test_session_response_is_flat() {
        let resp = SessionResponse {
            state: SessionState::NoSession,
            memory: MemoryInfo::empty(),
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["state"], "no_session");
        assert_eq!(json["session_exists"], false);
        assert!(json.get("retained").is_none());
    }

    #[test]
    fn test_health_response_serialize() {
        let resp = HealthResponse::healthy();
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("timestamp"));
    }
}
