use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;

/// URL template for the poster image derived from a playback id.
const POSTER_URL_TEMPLATE: &str = "https://image.video-cdn.example/{playback_id}/thumbnail.jpg";

/// Persisted upload status of a content record. Authoritative across page
/// reloads; the provider's terminal webhooks are the only writers of
/// `Completed` and `Failed`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "upload_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    None,
    Pending,
    Processing,
    Completed,
    Cancelled,
    Failed,
}

impl UploadStatus {
    /// Terminal statuses never regress to `Pending`/`Processing` except via
    /// a fresh upload session with a new correlation token.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            UploadStatus::Completed | UploadStatus::Cancelled | UploadStatus::Failed
        )
    }
}

impl Display for UploadStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            UploadStatus::None => write!(f, "none"),
            UploadStatus::Pending => write!(f, "pending"),
            UploadStatus::Processing => write!(f, "processing"),
            UploadStatus::Completed => write!(f, "completed"),
            UploadStatus::Cancelled => write!(f, "cancelled"),
            UploadStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for UploadStatus {
    type Err = crate::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(UploadStatus::None),
            "pending" => Ok(UploadStatus::Pending),
            "processing" => Ok(UploadStatus::Processing),
            "completed" => Ok(UploadStatus::Completed),
            "cancelled" => Ok(UploadStatus::Cancelled),
            "failed" => Ok(UploadStatus::Failed),
            other => Err(crate::AppError::InvalidInput(format!(
                "Unknown upload status: {}",
                other
            ))),
        }
    }
}

/// Provider-assigned identifiers for a processed asset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssetRefs {
    pub asset_id: String,
    pub playback_id: String,
}

/// Media metadata populated when processing completes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MediaMetadata {
    pub duration_seconds: Option<f64>,
    pub aspect_ratio: Option<String>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub poster_url: Option<String>,
}

/// The upload-related fields of a content record. The wider content schema
/// (course, lesson, pricing) lives outside this service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct ContentRecord {
    pub id: Uuid,
    pub upload_status: UploadStatus,
    /// Provider-side upload ticket id; secondary correlation key when the
    /// passthrough token cannot be resolved.
    pub direct_upload_id: Option<String>,
    pub external_asset_id: Option<String>,
    pub external_playback_id: Option<String>,
    pub duration_seconds: Option<f64>,
    pub aspect_ratio: Option<String>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub poster_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ContentRecord {
    /// Fresh record with empty upload fields.
    pub fn new(id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id,
            upload_status: UploadStatus::None,
            direct_upload_id: None,
            external_asset_id: None,
            external_playback_id: None,
            duration_seconds: None,
            aspect_ratio: None,
            width: None,
            height: None,
            poster_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Media metadata, present only once processing completed.
    pub fn media_metadata(&self) -> Option<MediaMetadata> {
        if self.upload_status != UploadStatus::Completed {
            return None;
        }
        Some(MediaMetadata {
            duration_seconds: self.duration_seconds,
            aspect_ratio: self.aspect_ratio.clone(),
            width: self.width,
            height: self.height,
            poster_url: self.poster_url.clone(),
        })
    }
}

/// Poster image URL for a playback id.
pub fn poster_url_for(playback_id: &str) -> String {
    POSTER_URL_TEMPLATE.replace("{playback_id}", playback_id)
}

/// Message pushed on the per-record status stream: `{ status, record? }`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatusMessage {
    pub status: UploadStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<ContentRecord>,
}

impl StatusMessage {
    pub fn new(status: UploadStatus, record: Option<ContentRecord>) -> Self {
        Self { status, record }
    }
}
