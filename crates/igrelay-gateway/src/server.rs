// SPDX-FileCopyrightText: 2026 Igrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state. `build_router` is separate
//! from `start_server` so tests can drive the router without a socket.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use igrelay_core::{IgrelayError, ReplyProvider};
use igrelay_storage::{Database, TokenStore};

use crate::admin;
use crate::dispatcher::OutboundDispatcher;
use crate::pipeline::AiPolicy;
use crate::webhook;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    /// Single-writer database handle.
    pub db: Database,
    /// AI reply provider.
    pub responder: Arc<dyn ReplyProvider>,
    /// Outbound dispatcher wrapping the Graph transport.
    pub dispatcher: Arc<OutboundDispatcher>,
    /// Page token store.
    pub tokens: TokenStore,
    /// Expected `hub.verify_token` for the GET handshake.
    pub verify_token: String,
    /// Meta app secret: the webhook signature HMAC key.
    pub app_secret: String,
    /// Reply-generation policy.
    pub ai: AiPolicy,
    /// Process start time for uptime reporting.
    pub start_time: Instant,
}

/// Build the gateway router.
///
/// - GET/POST /webhook/instagram -- verification handshake and delivery
/// - POST/DELETE /v1/businesses/{id}/token -- OAuth collaborator hand-off
/// - POST /v1/businesses/{id}/test-message -- admin test send
/// - GET /health -- unauthenticated liveness
pub fn build_router(state: GatewayState) -> Router {
    Router::new()
        .route(
            "/webhook/instagram",
            get(webhook::webhook_verify).post(webhook::webhook_receive),
        )
        .route(
            "/v1/businesses/{id}/token",
            post(admin::record_token).delete(admin::clear_token),
        )
        .route(
            "/v1/businesses/{id}/test-message",
            post(admin::send_test_message),
        )
        .route("/health", get(admin::get_health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve the gateway.
pub async fn start_server(
    host: &str,
    port: u16,
    state: GatewayState,
) -> Result<(), IgrelayError> {
    let app = build_router(state);

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| IgrelayError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .await
        .map_err(|e| IgrelayError::Internal(format!("gateway server error: {e}")))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use igrelay_core::{ReplyRequest, RetryPolicy, SendError, SendTransport};

    struct NullResponder;

    #[async_trait]
    impl ReplyProvider for NullResponder {
        async fn generate_reply(&self, _request: ReplyRequest) -> Result<String, IgrelayError> {
            Ok("ok".into())
        }
    }

    struct NullTransport;

    #[async_trait]
    impl SendTransport for NullTransport {
        async fn send_text(
            &self,
            _page_token: &str,
            _recipient_id: &str,
            _text: &str,
        ) -> Result<String, SendError> {
            Ok("mid.null".into())
        }
    }

    #[tokio::test]
    async fn gateway_state_is_clone_and_router_builds() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("server_test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();

        let state = GatewayState {
            db,
            responder: Arc::new(NullResponder),
            dispatcher: Arc::new(OutboundDispatcher::new(
                Arc::new(NullTransport),
                RetryPolicy::default(),
            )),
            tokens: TokenStore::new(300),
            verify_token: "verify".into(),
            app_secret: "secret".into(),
            ai: AiPolicy {
                fallback_reply: "fallback".into(),
                fallback_on_transient: false,
                history_limit: 3,
            },
            start_time: Instant::now(),
        };
        let _cloned = state.clone();
        let _router = build_router(state);
    }
}
