//! chatdeck - launcher backend for a chat-platform account
//!
//! Keeps one live session to the remote service and a size-capped local
//! cache so views render instantly from stale data while a refresh runs.

pub mod api;
pub mod cache;
pub mod commands;
pub mod config;
pub mod error;
pub mod models;
pub mod remote;
pub mod retention;
pub mod session;
pub mod store;
pub mod tasks;

pub use api::AppState;
pub use cache::{BoundedCache, CacheKey, CachePolicy};
pub use config::Config;
pub use error::{DeckError, Result};
pub use session::SessionManager;
pub use tasks::{spawn_retention_sweep, spawn_spy_task};
