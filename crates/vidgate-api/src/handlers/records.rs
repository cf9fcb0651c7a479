//! Record snapshot, creation, and the interim status patch.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use vidgate_core::models::{ContentRecord, StatusMessage, UploadStatus};
use vidgate_core::AppError;

use crate::error::{HttpAppError, ValidatedJson};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRecordRequest {
    pub id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchRecordRequest {
    pub upload_status: UploadStatus,
}

/// Seed a content record with empty upload fields. The marketplace
/// application normally creates records; this endpoint exists for local
/// development and tests.
pub async fn create_record(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<CreateRecordRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let id = request.id.unwrap_or_else(Uuid::new_v4);
    let record = state
        .store
        .create(id)
        .await
        .map_err(|e| AppError::Persistence(e.to_string()))?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// Status snapshot used by the polling fallback.
pub async fn get_record(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ContentRecord>, HttpAppError> {
    let record = state
        .store
        .get(id)
        .await
        .map_err(|e| AppError::Persistence(e.to_string()))?
        .ok_or_else(|| AppError::NotFound(format!("Record {} not found", id)))?;
    Ok(Json(record))
}

/// Interim mark from the client when its transfer finishes. Fire-and-forget
/// on the client side; the webhook is the authoritative writer. Only a move
/// to `processing` is accepted, and the terminal no-regress guard applies -
/// a guarded-out patch returns the unchanged record rather than an error.
pub async fn patch_record(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<PatchRecordRequest>,
) -> Result<Json<ContentRecord>, HttpAppError> {
    if request.upload_status != UploadStatus::Processing {
        return Err(HttpAppError(AppError::InvalidInput(format!(
            "Only a transition to 'processing' may be patched, got '{}'",
            request.upload_status
        ))));
    }

    let updated = state
        .store
        .mark_processing(id)
        .await
        .map_err(|e| AppError::Persistence(e.to_string()))?;

    match updated {
        Some(record) => {
            state.broadcaster.publish(
                record.id,
                StatusMessage::new(UploadStatus::Processing, Some(record.clone())),
            );
            Ok(Json(record))
        }
        None => {
            // Either the record is missing (404) or a terminal status
            // guarded the write out (return the record as-is).
            let record = state
                .store
                .get(id)
                .await
                .map_err(|e| AppError::Persistence(e.to_string()))?
                .ok_or_else(|| AppError::NotFound(format!("Record {} not found", id)))?;
            tracing::debug!(
                record_id = %id,
                status = %record.upload_status,
                "Interim processing patch rejected by status guard"
            );
            Ok(Json(record))
        }
    }
}
