//! Session Module
//!
//! Owns the single live connection to the remote service.

mod manager;
mod state;

pub use manager::SessionManager;
pub use state::{MemoryInfo, SessionState, TokenValidation};
