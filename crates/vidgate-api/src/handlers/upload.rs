//! Upload ticket issuance and best-effort cancellation.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use vidgate_core::models::{StatusMessage, UploadStatus};
use vidgate_core::{AppError, CorrelationToken};

use crate::error::{HttpAppError, ValidatedJson};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrlRequest {
    pub record_id: Uuid,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrlResponse {
    pub url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelUploadRequest {
    pub record_id: Uuid,
}

/// Issue a one-time ingestion URL for a record. The correlation token rides
/// along as the provider passthrough; the ticket id is persisted as the
/// secondary correlation key and the record moves to `pending`.
pub async fn request_upload_url(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<UploadUrlRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let record_id = request.record_id;
    state
        .store
        .get(record_id)
        .await
        .map_err(|e| AppError::Persistence(e.to_string()))?
        .ok_or_else(|| AppError::NotFound(format!("Record {} not found", record_id)))?;

    let ticket = state
        .provider
        .create_ticket(CorrelationToken::new(record_id))
        .await
        .map_err(HttpAppError::from)?;

    let record = state
        .store
        .mark_pending(record_id, &ticket.id)
        .await
        .map_err(|e| AppError::Persistence(e.to_string()))?
        .ok_or_else(|| {
            AppError::Persistence(format!("Pending update affected no rows for {}", record_id))
        })?;

    tracing::info!(
        record_id = %record_id,
        upload_id = %ticket.id,
        "Upload ticket issued"
    );
    state.broadcaster.publish(
        record_id,
        StatusMessage::new(UploadStatus::Pending, Some(record)),
    );

    Ok(Json(UploadUrlResponse { url: ticket.url }))
}

/// Cancel an in-flight upload. Provider notification is best-effort; the
/// local record is cancelled regardless, and the provider's own
/// upload-cancelled webhook is an idempotent replay of the same transition.
pub async fn cancel_upload(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<CancelUploadRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let record_id = request.record_id;
    let record = state
        .store
        .get(record_id)
        .await
        .map_err(|e| AppError::Persistence(e.to_string()))?
        .ok_or_else(|| AppError::NotFound(format!("Record {} not found", record_id)))?;

    if let Some(ticket_id) = record.direct_upload_id.as_deref() {
        if let Err(e) = state.provider.cancel_ticket(ticket_id).await {
            tracing::warn!(
                record_id = %record_id,
                upload_id = %ticket_id,
                error = %e,
                "Provider ticket cancellation failed, continuing"
            );
        }
    }

    let cancelled = state
        .store
        .cancel(record_id)
        .await
        .map_err(|e| AppError::Persistence(e.to_string()))?;

    if let Some(record) = cancelled {
        tracing::info!(record_id = %record_id, "Upload cancelled");
        state.broadcaster.publish(
            record_id,
            StatusMessage::new(UploadStatus::Cancelled, Some(record)),
        );
    }

    Ok(StatusCode::OK)
}
