use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use linebridge_core::config::BridgeConfig;
use linebridge_line::MessageGateway;
use linebridge_sessions::SessionRegistry;

/// Central shared state, passed as `Arc<AppState>` to all Axum handlers.
pub struct AppState {
    pub config: BridgeConfig,
    pub line: Arc<dyn MessageGateway>,
    pub sessions: Arc<SessionRegistry>,
}

impl AppState {
    pub fn new(
        config: BridgeConfig,
        line: Arc<dyn MessageGateway>,
        sessions: Arc<SessionRegistry>,
    ) -> Self {
        Self {
            config,
            line,
            sessions,
        }
    }

    /// The single LINE user this bridge serves.
    pub fn user_id(&self) -> &str {
        &self.config.line.user_id
    }
}

/// Assemble the Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(crate::http::health::health_handler))
        .route("/webhook", post(crate::http::webhook::webhook_handler))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
