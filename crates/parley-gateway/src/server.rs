//! Axum-based HTTP server.

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Request, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, info_span, warn};

use crate::handlers;
use crate::state::GatewayState;

/// Build the gateway router with tracing, CORS and the upload size limit.
pub fn build_router(state: Arc<GatewayState>) -> Router {
    let trace_layer = TraceLayer::new_for_http().make_span_with(|request: &Request| {
        let request_id = request
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-");
        info_span!(
            "http_request",
            method = %request.method(),
            uri = %request.uri(),
            request_id = %request_id
        )
    });

    let body_limit = state.config.max_upload_bytes();

    Router::new()
        .route("/health", get(health_handler))
        .route("/upload-audio", post(handlers::upload_audio))
        .route("/tts/echo", post(handlers::echo_audio))
        .route("/tts", post(handlers::generate_tts))
        .route("/llm/query", post(handlers::query_llm))
        .route("/agent/chat/{session_id}", post(handlers::chat_with_agent))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(trace_layer)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Start the gateway on the configured bind address and port.
pub async fn start_gateway(state: Arc<GatewayState>) -> anyhow::Result<()> {
    let addr = format!("{}:{}", state.config.server.bind, state.config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Gateway listening on {addr}");

    serve(listener, state).await
}

/// Serve on an already-bound listener until CTRL+C.
pub async fn serve(listener: TcpListener, state: Arc<GatewayState>) -> anyhow::Result<()> {
    let app = build_router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn health_handler(State(state): State<Arc<GatewayState>>) -> impl IntoResponse {
    let version = env!("CARGO_PKG_VERSION");

    axum::Json(json!({
        "status": "ok",
        "version": version,
        "providers": {
            "transcription": state.transcriber.id(),
            "generation": state.generator.id(),
            "synthesis": state.synthesizer.id(),
        },
    }))
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            warn!("Failed to install CTRL+C handler: {e}");
            std::future::pending::<()>().await;
        }
    }
}
