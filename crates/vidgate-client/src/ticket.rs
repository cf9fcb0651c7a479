//! Upload ticket acquisition with bounded retry.

use serde::Deserialize;
use serde_json::json;
use tokio::time::sleep;
use uuid::Uuid;

use vidgate_core::{AppError, RetryConfig};

use crate::IngestClient;

#[derive(Debug, Deserialize)]
struct UploadUrlResponse {
    url: String,
}

/// Request a one-time ingestion endpoint for `record_id`. Transport
/// failures and server errors retry with exponential backoff up to the
/// configured attempt budget; exhaustion is `TicketUnavailable`. Client
/// errors (4xx) fail immediately - retrying a rejected request cannot
/// succeed. Ticket acquisition mutates nothing client-side.
pub async fn acquire_ticket(
    client: &IngestClient,
    retry: &RetryConfig,
    record_id: Uuid,
) -> Result<String, AppError> {
    let url = client.build_url("/upload-url");
    let attempts = retry.ticket_max_attempts.max(1);
    let mut last_error = String::new();

    for attempt in 1..=attempts {
        if attempt > 1 {
            sleep(retry.ticket_backoff(attempt - 1)).await;
        }

        let result = client
            .client()
            .post(&url)
            .json(&json!({ "recordId": record_id }))
            .send()
            .await;

        match result {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    let ticket: UploadUrlResponse = response.json().await.map_err(|e| {
                        AppError::Provider(format!("Malformed ticket response: {}", e))
                    })?;
                    return Ok(ticket.url);
                }
                if status.is_client_error() {
                    return Err(AppError::Provider(format!(
                        "Ticket request rejected with status {}",
                        status
                    )));
                }
                last_error = format!("status {}", status);
            }
            Err(e) => {
                last_error = e.to_string();
            }
        }

        tracing::debug!(
            record_id = %record_id,
            attempt,
            max_attempts = attempts,
            error = %last_error,
            "Ticket request attempt failed"
        );
    }

    Err(AppError::TicketUnavailable(format!(
        "{} attempts failed, last error: {}",
        attempts, last_error
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_retry() -> RetryConfig {
        RetryConfig {
            ticket_max_attempts: 3,
            ticket_backoff_base_ms: 5,
            ..RetryConfig::default()
        }
    }

    #[tokio::test]
    async fn returns_endpoint_on_success() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/upload-url")
            .with_status(200)
            .with_body(r#"{"url":"https://ingest.example/u1"}"#)
            .create_async()
            .await;

        let client = IngestClient::new(server.url()).unwrap();
        let endpoint = acquire_ticket(&client, &fast_retry(), Uuid::new_v4())
            .await
            .unwrap();
        assert_eq!(endpoint, "https://ingest.example/u1");
    }

    #[tokio::test]
    async fn malformed_ticket_response_fails_without_retry() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/upload-url")
            .with_status(200)
            .with_body("not json")
            .expect(1)
            .create_async()
            .await;

        let client = IngestClient::new(server.url()).unwrap();
        let err = acquire_ticket(&client, &fast_retry(), Uuid::new_v4())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Provider(_)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn exhausting_the_budget_is_ticket_unavailable() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/upload-url")
            .with_status(500)
            .expect(3)
            .create_async()
            .await;

        let client = IngestClient::new(server.url()).unwrap();
        let err = acquire_ticket(&client, &fast_retry(), Uuid::new_v4())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::TicketUnavailable(_)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn client_errors_do_not_retry() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/upload-url")
            .with_status(404)
            .expect(1)
            .create_async()
            .await;

        let client = IngestClient::new(server.url()).unwrap();
        let err = acquire_ticket(&client, &fast_retry(), Uuid::new_v4())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Provider(_)));
        mock.assert_async().await;
    }
}
