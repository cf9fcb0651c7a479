//! Router assembly.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::{HeaderValue, Method},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

// Webhook payloads and control requests are small; this is not the byte
// upload path (bytes go straight to the provider's ingestion URL).
const MAX_BODY_BYTES: usize = 256 * 1024;

async fn health_check(
    axum::extract::State(state): axum::extract::State<Arc<AppState>>,
) -> impl IntoResponse {
    const TIMEOUT: Duration = Duration::from_secs(5);

    let store_status = match tokio::time::timeout(
        TIMEOUT,
        state.store.get(uuid::Uuid::nil()),
    )
    .await
    {
        Ok(Ok(_)) => "healthy",
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Record store health check failed");
            "unhealthy"
        }
        Err(_) => {
            tracing::error!("Record store health check timed out");
            "timeout"
        }
    };

    Json(serde_json::json!({
        "status": if store_status == "healthy" { "ok" } else { "degraded" },
        "store": store_status,
    }))
}

fn cors_layer(state: &AppState) -> CorsLayer {
    let origins = &state.config.server.cors_origins;
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH])
        .allow_headers(Any);

    if origins.iter().any(|o| o == "*") {
        layer.allow_origin(Any)
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|o| o.parse::<HeaderValue>().ok())
            .collect();
        layer.allow_origin(parsed)
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state);

    Router::new()
        .route("/health", get(health_check))
        .route("/upload-url", post(handlers::upload::request_upload_url))
        .route("/cancel-upload", post(handlers::upload::cancel_upload))
        .route("/records", post(handlers::records::create_record))
        .route(
            "/records/{id}",
            get(handlers::records::get_record).patch(handlers::records::patch_record),
        )
        .route("/records/{id}/events", get(handlers::events::record_events))
        .route("/webhooks/provider", post(handlers::webhook::receive_webhook))
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(cors)
        .with_state(state)
}
