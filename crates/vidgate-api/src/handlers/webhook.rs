//! Provider webhook receiver.
//!
//! The provider redelivers events until it sees a 2xx, so every handler here
//! must be idempotent: replays of the same event converge to the state a
//! single delivery produces. Response contract: 200 success/no-op, 400
//! malformed or uncorrelatable, 500 persistence failure (redriven by the
//! provider's retry policy).

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use vidgate_core::models::record::poster_url_for;
use vidgate_core::models::{
    AssetCreatedData, AssetReadyData, MediaMetadata, ProviderEvent, StatusMessage,
    UploadCancelledData, UploadStatus, WebhookEnvelope,
};
use vidgate_core::{AppError, CorrelationToken};
use vidgate_db::AssetUpdate;

use crate::error::{HttpAppError, ValidatedJson};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub ok: bool,
}

pub async fn receive_webhook(
    State(state): State<Arc<AppState>>,
    ValidatedJson(envelope): ValidatedJson<WebhookEnvelope>,
) -> Result<impl IntoResponse, HttpAppError> {
    let event_type = envelope.event_type.clone();
    let event = ProviderEvent::parse(envelope)?;

    match event {
        ProviderEvent::AssetReady(data) => handle_asset_ready(&state, data).await?,
        ProviderEvent::UploadCancelled(data) => handle_upload_cancelled(&state, data).await?,
        ProviderEvent::AssetCreated(data) => handle_asset_created(&state, data).await?,
        ProviderEvent::Unknown(kind) => {
            // Tolerate provider schema evolution without breaking the
            // endpoint contract.
            tracing::debug!(event_type = %kind, "Ignoring unrecognized webhook event");
        }
    }

    tracing::debug!(event_type = %event_type, "Webhook processed");
    Ok((StatusCode::OK, Json(WebhookAck { ok: true })))
}

/// Resolve the target record for an asset-ready event: the correlation
/// token's record if it exists, otherwise the most-recently-updated record
/// in `processing`. The fallback exists for providers that cannot echo the
/// passthrough; it is a best-effort guess and can mis-attribute when two
/// uploads are concurrently processing.
async fn resolve_asset_ready_target(
    state: &AppState,
    passthrough: Option<&str>,
    asset_id: &str,
) -> Result<Uuid, HttpAppError> {
    let token_id = passthrough.and_then(|raw| match CorrelationToken::parse(raw) {
        Ok(token) => Some(token.record_id()),
        Err(_) => {
            tracing::warn!(asset_id = %asset_id, "Unparsable passthrough on asset-ready event");
            None
        }
    });

    if let Some(id) = token_id {
        if state
            .store
            .get(id)
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))?
            .is_some()
        {
            return Ok(id);
        }
        tracing::warn!(
            record_id = %id,
            asset_id = %asset_id,
            "Correlation token references a nonexistent record"
        );
    }

    let fallback = state
        .store
        .latest_processing()
        .await
        .map_err(|e| AppError::Persistence(e.to_string()))?;

    match fallback {
        Some(record) => {
            tracing::warn!(
                record_id = %record.id,
                asset_id = %asset_id,
                "Falling back to most recent processing record for correlation"
            );
            Ok(record.id)
        }
        None => Err(HttpAppError(AppError::Correlation(format!(
            "No record resolved for asset {}",
            asset_id
        )))),
    }
}

async fn handle_asset_ready(state: &AppState, data: AssetReadyData) -> Result<(), HttpAppError> {
    // ProviderEvent::parse guarantees at least one playback id.
    let playback_id = data
        .primary_playback_id()
        .ok_or_else(|| AppError::InvalidInput("asset-ready payload has no playback ids".into()))?
        .to_string();

    let record_id =
        resolve_asset_ready_target(state, data.passthrough.as_deref(), &data.id).await?;

    let update = AssetUpdate {
        asset_id: data.id.clone(),
        playback_id: playback_id.clone(),
        metadata: MediaMetadata {
            duration_seconds: data.duration,
            aspect_ratio: data.aspect_ratio.clone(),
            width: data.width,
            height: data.height,
            poster_url: Some(poster_url_for(&playback_id)),
        },
    };

    let record = state
        .store
        .complete_asset(record_id, &update)
        .await
        .map_err(|e| AppError::Persistence(e.to_string()))?
        .ok_or_else(|| {
            AppError::Persistence(format!(
                "Completion update affected no rows for record {}",
                record_id
            ))
        })?;

    tracing::info!(
        record_id = %record.id,
        asset_id = %data.id,
        playback_id = %playback_id,
        "Record completed from asset-ready event"
    );
    state.broadcaster.publish(
        record.id,
        StatusMessage::new(UploadStatus::Completed, Some(record)),
    );
    Ok(())
}

async fn handle_upload_cancelled(
    state: &AppState,
    data: UploadCancelledData,
) -> Result<(), HttpAppError> {
    // Cancellation is best-effort end to end: a missing or unparsable token
    // is a logged no-op, not an error.
    let Some(record_id) = data
        .passthrough()
        .and_then(|raw| CorrelationToken::parse(raw).ok())
        .map(|token| token.record_id())
    else {
        tracing::info!(
            upload_id = data.id.as_deref().unwrap_or("<unknown>"),
            "upload-cancelled event without resolvable passthrough, skipping"
        );
        return Ok(());
    };

    let cancelled = state
        .store
        .cancel(record_id)
        .await
        .map_err(|e| AppError::Persistence(e.to_string()))?;

    match cancelled {
        Some(record) => {
            tracing::info!(record_id = %record.id, "Record cancelled from webhook");
            state.broadcaster.publish(
                record.id,
                StatusMessage::new(UploadStatus::Cancelled, Some(record)),
            );
        }
        None => {
            tracing::debug!(
                record_id = %record_id,
                "Cancel skipped: record missing or already terminal"
            );
        }
    }
    Ok(())
}

async fn handle_asset_created(
    state: &AppState,
    data: AssetCreatedData,
) -> Result<(), HttpAppError> {
    let Some(upload_id) = data.upload_id.as_deref() else {
        tracing::debug!(asset_id = %data.id, "asset-created event without upload id, skipping");
        return Ok(());
    };

    let linked = state
        .store
        .link_asset_by_ticket(upload_id, &data.id)
        .await
        .map_err(|e| AppError::Persistence(e.to_string()))?;

    match linked {
        Some(record) => {
            tracing::info!(
                record_id = %record.id,
                asset_id = %data.id,
                upload_id = %upload_id,
                "Asset linked to record, processing"
            );
            state.broadcaster.publish(
                record.id,
                StatusMessage::new(UploadStatus::Processing, Some(record)),
            );
        }
        None => {
            tracing::debug!(
                asset_id = %data.id,
                upload_id = %upload_id,
                "asset-created event matched no record, skipping"
            );
        }
    }
    Ok(())
}
