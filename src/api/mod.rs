//! API Module
//!
//! HTTP handlers and routing for the launcher command surface.
//!
//! # Endpoints
//! - `GET /dashboard`, `PUT /dashboard/status`
//! - `GET /guilds`, `PUT /guilds/:id/pin`, `GET /guilds/:id/channels`
//! - `GET /dms`, `GET|POST /channels/:id/messages`
//! - `POST /link`, `POST|GET|DELETE /spy`
//! - `GET /cache/sizes`, `DELETE /cache`, `GET|DELETE /session`
//! - `GET /health`

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
