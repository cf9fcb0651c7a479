//! External video provider client.
//!
//! The provider is a black box exposing "create upload ticket", "accept
//! chunked bytes" (the client talks to the ticket URL directly), and
//! lifecycle webhooks. This crate covers the server-side control calls:
//! ticket creation and best-effort cancellation, behind the
//! [`VideoProvider`] trait so the API server can run against a stub in
//! tests.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use vidgate_core::{AppError, CorrelationToken, ProviderConfig};

/// A one-time ingestion ticket issued by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTicket {
    /// Provider-side ticket id; persisted as the secondary correlation key.
    pub id: String,
    /// One-time URL that accepts the raw upload bytes.
    pub url: String,
}

#[async_trait]
pub trait VideoProvider: Send + Sync {
    /// Create an upload ticket carrying the correlation token as the opaque
    /// passthrough.
    async fn create_ticket(&self, token: CorrelationToken) -> Result<UploadTicket, AppError>;

    /// Cancel an upload ticket. Best-effort: callers log failures and move
    /// on, since the provider also emits an upload-cancelled webhook.
    async fn cancel_ticket(&self, ticket_id: &str) -> Result<(), AppError>;
}

#[derive(Debug, Deserialize)]
struct TicketResponse {
    data: TicketData,
}

#[derive(Debug, Deserialize)]
struct TicketData {
    id: String,
    url: String,
}

/// HTTP implementation over the provider's REST API.
pub struct HttpVideoProvider {
    client: Client,
    base_url: String,
    api_token: Option<String>,
}

impl HttpVideoProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to create HTTP client for video provider")?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
        })
    }

    fn apply_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_token {
            Some(token) => request.header("Authorization", format!("Bearer {}", token)),
            None => request,
        }
    }
}

#[async_trait]
impl VideoProvider for HttpVideoProvider {
    async fn create_ticket(&self, token: CorrelationToken) -> Result<UploadTicket, AppError> {
        let url = format!("{}/uploads", self.base_url);
        let body = json!({
            "new_asset_settings": { "passthrough": token.encode() },
            "cors_origin": "*",
        });

        let response = self
            .apply_auth(self.client.post(&url).json(&body))
            .send()
            .await
            .map_err(|e| AppError::Provider(format!("Ticket request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Provider(format!(
                "Ticket request failed with status {}: {}",
                status, text
            )));
        }

        let ticket: TicketResponse = response
            .json()
            .await
            .map_err(|e| AppError::Provider(format!("Malformed ticket response: {}", e)))?;

        Ok(UploadTicket {
            id: ticket.data.id,
            url: ticket.data.url,
        })
    }

    async fn cancel_ticket(&self, ticket_id: &str) -> Result<(), AppError> {
        let url = format!("{}/uploads/{}/cancel", self.base_url, ticket_id);
        let response = self
            .apply_auth(self.client.put(&url))
            .send()
            .await
            .map_err(|e| AppError::Provider(format!("Cancel request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Provider(format!(
                "Cancel request failed with status {}",
                status
            )));
        }
        Ok(())
    }
}

/// Deterministic in-process provider for tests and local development.
/// Tickets point at `base_url` so a mock ingestion endpoint can receive the
/// bytes.
pub struct StubProvider {
    base_url: String,
    fail_creates: bool,
}

impl StubProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            fail_creates: false,
        }
    }

    /// A stub whose ticket creation always fails, for outage tests.
    pub fn failing() -> Self {
        Self {
            base_url: String::new(),
            fail_creates: true,
        }
    }
}

#[async_trait]
impl VideoProvider for StubProvider {
    async fn create_ticket(&self, token: CorrelationToken) -> Result<UploadTicket, AppError> {
        if self.fail_creates {
            return Err(AppError::Provider("stub provider outage".to_string()));
        }
        let id = format!("upload-{}", token.record_id().simple());
        Ok(UploadTicket {
            url: format!("{}/ingest/{}", self.base_url, id),
            id,
        })
    }

    async fn cancel_ticket(&self, _ticket_id: &str) -> Result<(), AppError> {
        if self.fail_creates {
            return Err(AppError::Provider("stub provider outage".to_string()));
        }
        Ok(())
    }
}
