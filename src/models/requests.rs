//! Request DTOs for the command API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;

use crate::remote::PresenceStatus;

/// Maximum length of a message body accepted by the remote service
pub const MAX_MESSAGE_LENGTH: usize = 2000;

/// Request body for PUT /dashboard/status
#[derive(Debug, Clone, Deserialize)]
pub struct StatusRequest {
    pub status: PresenceStatus,
}

/// Request body for POST /channels/:id/messages
#[derive(Debug, Clone, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
}

impl SendMessageRequest {
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.content.trim().is_empty() {
            return Some("Message cannot be empty".to_string());
        }
        if self.content.chars().count() > MAX_MESSAGE_LENGTH {
            return Some(format!(
                "Message exceeds maximum length of {} characters",
                MAX_MESSAGE_LENGTH
            ));
        }
        None
    }
}

/// Request body for POST /link
///
/// Not `Debug`: the token must never reach a log line.
#[derive(Clone, Deserialize)]
pub struct LinkRequest {
    pub token: String,
}

impl LinkRequest {
    pub fn validate(&self) -> Option<String> {
        if self.token.trim().is_empty() {
            return Some("Token cannot be empty".to_string());
        }
        None
    }
}

/// Request body for POST /spy
#[derive(Debug, Clone, Deserialize)]
pub struct SpyRequest {
    pub user_id: String,
}

impl SpyRequest {
    pub fn validate(&self) -> Option<String> {
        let user_id = self.user_id.trim();
        if user_id.is_empty() {
            return Some("User ID required".to_string());
        }
        if !user_id.chars().all(|c| c.is_ascii_digit()) {
            return Some("User ID must be numeric".to_string());
        }
        None
    }
}
