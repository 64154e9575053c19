use crate::handler::chat_handler;
use crate::middleware::cors_middleware;
use axum::{
    middleware as axum_mw,
    response::IntoResponse,
    routing::{any, get},
    Json, Router,
};
use relay_upstream::ChatBackend;
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    /// Runs the chat turns.
    pub backend: Arc<dyn ChatBackend>,
}

/// The relay's HTTP server.
pub struct GatewayServer;

impl GatewayServer {
    /// Build the router around `backend`.
    pub fn build(backend: Arc<dyn ChatBackend>) -> Router {
        let state = Arc::new(AppState { backend });

        Router::new()
            .route("/", any(chat_handler))
            .route("/api/copilot", any(chat_handler))
            .route("/health", get(health_handler))
            .with_state(state)
            .layer(axum_mw::from_fn(cors_middleware))
    }
}

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok", "service": "copilot-relay"}))
}
