//! Request and Response models for the command API
//!
//! DTOs used for serializing/deserializing HTTP request and response
//! bodies. Domain types (profiles, guilds, snapshots) are serialized as-is.

pub mod requests;
pub mod responses;

pub use requests::{LinkRequest, SendMessageRequest, SpyRequest, StatusRequest};
pub use responses::{
    CacheSizesResponse, HealthResponse, MessageResponse, PinResponse, SessionResponse,
};
