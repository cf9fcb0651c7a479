//! Uploader-side library for the Vidgate ingest API.
//!
//! Drives the full client half of an upload: ticket acquisition with
//! bounded retry, the chunked byte transfer to the provider's ingestion
//! endpoint, the session state machine, and the status channel that keeps
//! the session consistent with eventually-arriving server truth.

pub mod orchestrator;
pub mod status;
pub mod ticket;
pub mod transfer;

use std::time::Duration;

use reqwest::Client;
use serde_json::json;
use uuid::Uuid;

use vidgate_core::models::{ContentRecord, UploadStatus};
use vidgate_core::AppError;

pub use orchestrator::{SelectedFile, UploadOrchestrator};
pub use status::{watch_status, StatusSubscription};
pub use ticket::acquire_ticket;
pub use transfer::{ChunkedTransfer, TransferProgress};

const REQUEST_TIMEOUT_SECS: u64 = 60;

/// HTTP client for the ingest API.
#[derive(Clone, Debug)]
pub struct IngestClient {
    client: Client,
    base_url: String,
}

impl IngestClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Raw client for custom requests (streaming reads, chunk uploads).
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Status snapshot used by the polling fallback.
    pub async fn get_record(&self, record_id: Uuid) -> Result<ContentRecord, AppError> {
        let url = self.build_url(&format!("/records/{}", record_id));
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::Stream(format!("Snapshot request failed: {}", e)))?;

        let status = response.status();
        if status.as_u16() == 404 {
            return Err(AppError::NotFound(format!("Record {} not found", record_id)));
        }
        if !status.is_success() {
            return Err(AppError::Stream(format!(
                "Snapshot request failed with status {}",
                status
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Stream(format!("Malformed record snapshot: {}", e)))
    }

    /// Best-effort interim mark after the transfer finishes; the webhook is
    /// the authoritative fallback, so callers log failures and move on.
    pub async fn patch_processing(&self, record_id: Uuid) -> Result<(), AppError> {
        let url = self.build_url(&format!("/records/{}", record_id));
        let response = self
            .client
            .patch(&url)
            .json(&json!({ "uploadStatus": UploadStatus::Processing }))
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Interim status patch failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Internal(format!(
                "Interim status patch failed with status {}",
                response.status()
            )));
        }
        Ok(())
    }

    /// Best-effort cancellation of the server-side ticket.
    pub async fn cancel_upload(&self, record_id: Uuid) -> Result<(), AppError> {
        let url = self.build_url("/cancel-upload");
        let response = self
            .client
            .post(&url)
            .json(&json!({ "recordId": record_id }))
            .send()
            .await
            .map_err(|e| AppError::Provider(format!("Cancel request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Provider(format!(
                "Cancel request failed with status {}",
                response.status()
            )));
        }
        Ok(())
    }
}
