//! Session state and introspection types.

use serde::Serialize;

use crate::remote::UserProfile;
use crate::retention::RetentionSnapshot;

/// Lifecycle of the managed session slot.
///
/// `Stale` goes back to `Connecting` on the next acquire. A destroyed handle
/// is never reused; the slot returns to `NoSession`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    NoSession,
    Connecting,
    Ready,
    Stale,
}

/// Cheap description of the managed session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemoryInfo {
    pub session_exists: bool,
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retained: Option<RetentionSnapshot>,
}

impl MemoryInfo {
    pub fn empty() -> Self {
        Self {
            session_exists: false,
            ready: false,
            retained: None,
        }
    }
}

/// Outcome of a token check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenValidation {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<UserProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TokenValidation {
    pub fn valid(profile: UserProfile) -> Self {
        Self {
            valid: true,
            profile: Some(profile),
            error: None,
        }
    }

    pub fn invalid(error: impl Into<String>) -> Self {
        Self {
            valid: false,
            profile: None,
            error: Some(error.into()),
        }
    }
}
