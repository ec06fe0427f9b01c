//! API Routes
//!
//! Configures the Axum router with every launcher command endpoint.

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    cache_clear_handler, cache_sizes_handler, channels_handler, dashboard_handler, dms_handler,
    guilds_handler, health_handler, history_handler, link_handler, pin_handler, send_handler,
    session_destroy_handler, session_handler, spy_log_handler, spy_start_handler,
    spy_stop_handler, status_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /dashboard` - Profile snapshot
/// - `PUT /dashboard/status` - Set presence
/// - `GET /guilds` - Guild snapshot, pinned first
/// - `PUT /guilds/:id/pin` - Toggle a pin
/// - `GET /guilds/:id/channels` - Channels grouped by category
/// - `GET /dms` - Direct message snapshot
/// - `GET|POST /channels/:id/messages` - Read or send messages
/// - `POST /link` - Validate and link a token
/// - `POST|GET|DELETE /spy` - Start, read or stop spy mode
/// - `GET /cache/sizes`, `DELETE /cache` - Cache introspection and reset
/// - `GET|DELETE /session` - Session introspection and teardown
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: Allows any origin; the launcher frontend runs on its own origin
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/dashboard", get(dashboard_handler))
        .route("/dashboard/status", put(status_handler))
        .route("/guilds", get(guilds_handler))
        .route("/guilds/:id/pin", put(pin_handler))
        .route("/guilds/:id/channels", get(channels_handler))
        .route("/dms", get(dms_handler))
        .route(
            "/channels/:id/messages",
            get(history_handler).post(send_handler),
        )
        .route("/link", post(link_handler))
        .route(
            "/spy",
            get(spy_log_handler)
                .post(spy_start_handler)
                .delete(spy_stop_handler),
        )
        .route("/cache/sizes", get(cache_sizes_handler))
        .route("/cache", delete(cache_clear_handler))
        .route(
            "/session",
            get(session_handler).delete(session_destroy_handler),
        )
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
