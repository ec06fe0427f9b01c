//! Background Tasks Module
//!
//! Tasks spawned while the server runs.
//!
//! # Tasks
//! - Retention sweep: drops aged-out protocol objects of the live session
//! - Spy consumer: turns a watched user's events into spy log entries

mod cleanup;
mod spy;

pub use cleanup::spawn_retention_sweep;
pub use spy::spawn_spy_task;
