//! Provider webhook event payloads.
//!
//! The provider posts `{ "type": ..., "data": ... }` where the shape of
//! `data` depends on `type`. Events parse into a tagged union with one
//! required-field contract per variant; unrecognized types are preserved so
//! the receiver can acknowledge them without breaking on provider schema
//! evolution.

use serde::{Deserialize, Serialize};

use crate::AppError;

pub const EVENT_ASSET_READY: &str = "asset-ready";
pub const EVENT_UPLOAD_CANCELLED: &str = "upload-cancelled";
pub const EVENT_ASSET_CREATED: &str = "asset-created";

/// Raw webhook envelope as delivered by the provider.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebhookEnvelope {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// A playback reference on a ready asset.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlaybackRef {
    pub id: String,
}

/// `asset-ready` payload: the asset finished processing.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AssetReadyData {
    /// Provider asset id.
    pub id: String,
    pub playback_ids: Vec<PlaybackRef>,
    /// Opaque echo of the correlation token supplied at ticket creation.
    pub passthrough: Option<String>,
    pub duration: Option<f64>,
    pub aspect_ratio: Option<String>,
    pub width: Option<i32>,
    pub height: Option<i32>,
}

impl AssetReadyData {
    pub fn primary_playback_id(&self) -> Option<&str> {
        self.playback_ids.first().map(|p| p.id.as_str())
    }
}

/// Settings echoed back on upload-scoped events. The passthrough lives one
/// level down from the upload object itself.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NewAssetSettings {
    pub passthrough: Option<String>,
}

/// `upload-cancelled` payload: the provider abandoned the upload ticket.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UploadCancelledData {
    /// Provider upload ticket id.
    pub id: Option<String>,
    pub new_asset_settings: Option<NewAssetSettings>,
}

impl UploadCancelledData {
    pub fn passthrough(&self) -> Option<&str> {
        self.new_asset_settings
            .as_ref()
            .and_then(|s| s.passthrough.as_deref())
    }
}

/// `asset-created` payload: the ticket was linked to a new asset.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AssetCreatedData {
    /// Provider asset id.
    pub id: String,
    /// The upload ticket this asset was created from.
    pub upload_id: Option<String>,
    pub passthrough: Option<String>,
}

/// Provider lifecycle event, keyed by the envelope `type`.
#[derive(Debug, Clone)]
pub enum ProviderEvent {
    AssetReady(AssetReadyData),
    UploadCancelled(UploadCancelledData),
    AssetCreated(AssetCreatedData),
    /// Unknown event type, accepted and ignored.
    Unknown(String),
}

impl ProviderEvent {
    /// Parse an envelope into a typed event. A known type with a payload
    /// that misses its minimal contract is an `InvalidInput` error; an
    /// unknown type parses successfully as `Unknown`.
    pub fn parse(envelope: WebhookEnvelope) -> Result<Self, AppError> {
        match envelope.event_type.as_str() {
            EVENT_ASSET_READY => {
                let data: AssetReadyData =
                    serde_json::from_value(envelope.data).map_err(|e| {
                        AppError::InvalidInput(format!("Malformed asset-ready payload: {}", e))
                    })?;
                if data.playback_ids.is_empty() {
                    return Err(AppError::InvalidInput(
                        "asset-ready payload has no playback ids".to_string(),
                    ));
                }
                Ok(ProviderEvent::AssetReady(data))
            }
            EVENT_UPLOAD_CANCELLED => {
                let data: UploadCancelledData =
                    serde_json::from_value(envelope.data).map_err(|e| {
                        AppError::InvalidInput(format!(
                            "Malformed upload-cancelled payload: {}",
                            e
                        ))
                    })?;
                Ok(ProviderEvent::UploadCancelled(data))
            }
            EVENT_ASSET_CREATED => {
                let data: AssetCreatedData =
                    serde_json::from_value(envelope.data).map_err(|e| {
                        AppError::InvalidInput(format!("Malformed asset-created payload: {}", e))
                    })?;
                Ok(ProviderEvent::AssetCreated(data))
            }
            other => Ok(ProviderEvent::Unknown(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(event_type: &str, data: serde_json::Value) -> WebhookEnvelope {
        WebhookEnvelope {
            event_type: event_type.to_string(),
            data,
        }
    }

    #[test]
    fn parses_asset_ready() {
        let event = ProviderEvent::parse(envelope(
            "asset-ready",
            json!({
                "id": "asset-1",
                "playback_ids": [{"id": "play-1"}, {"id": "play-2"}],
                "passthrough": "{\"recordId\":\"6f6af692-3b94-4d3f-a9cf-25d0e0aafba5\"}",
                "duration": 93.4,
                "aspect_ratio": "16:9"
            }),
        ))
        .unwrap();

        match event {
            ProviderEvent::AssetReady(data) => {
                assert_eq!(data.id, "asset-1");
                assert_eq!(data.primary_playback_id(), Some("play-1"));
                assert_eq!(data.duration, Some(93.4));
            }
            other => panic!("expected AssetReady, got {:?}", other),
        }
    }

    #[test]
    fn asset_ready_requires_playback_ids() {
        let err = ProviderEvent::parse(envelope(
            "asset-ready",
            json!({"id": "asset-1", "playback_ids": []}),
        ))
        .unwrap_err();
        assert!(err.to_string().contains("playback"));
    }

    #[test]
    fn asset_ready_missing_id_is_malformed() {
        assert!(ProviderEvent::parse(envelope(
            "asset-ready",
            json!({"playback_ids": [{"id": "p"}]}),
        ))
        .is_err());
    }

    #[test]
    fn upload_cancelled_reads_nested_passthrough() {
        let event = ProviderEvent::parse(envelope(
            "upload-cancelled",
            json!({
                "id": "upload-9",
                "new_asset_settings": {"passthrough": "tok"}
            }),
        ))
        .unwrap();
        match event {
            ProviderEvent::UploadCancelled(data) => {
                assert_eq!(data.passthrough(), Some("tok"));
            }
            other => panic!("expected UploadCancelled, got {:?}", other),
        }
    }

    #[test]
    fn unknown_type_is_accepted() {
        let event =
            ProviderEvent::parse(envelope("asset-deleted", json!({"id": "x"}))).unwrap();
        match event {
            ProviderEvent::Unknown(kind) => assert_eq!(kind, "asset-deleted"),
            other => panic!("expected Unknown, got {:?}", other),
        }
    }
}
