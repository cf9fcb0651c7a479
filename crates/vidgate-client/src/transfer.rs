//! Chunked transfer engine.
//!
//! Streams file bytes to the provider's one-time ingestion endpoint in
//! fixed-size chunks via sequential `PUT` with `Content-Range` headers,
//! emitting a progress event after each accepted chunk. Cancellation is
//! cooperative: the token is checked between chunks and raced against the
//! in-flight request.

use std::cmp::min;
use std::path::Path;
use std::time::Duration;

use reqwest::header::{CONTENT_RANGE, CONTENT_TYPE};
use reqwest::Client;
use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use vidgate_core::AppError;

/// Per-chunk timeout; the transfer as a whole has no overall deadline.
const CHUNK_TIMEOUT_SECS: u64 = 120;

/// Progress after an accepted chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferProgress {
    pub bytes_sent: u64,
    pub total_bytes: u64,
}

impl TransferProgress {
    pub fn percent(&self) -> f64 {
        if self.total_bytes == 0 {
            return 100.0;
        }
        (self.bytes_sent as f64 / self.total_bytes as f64) * 100.0
    }
}

pub struct ChunkedTransfer {
    client: Client,
    chunk_size: u64,
}

impl ChunkedTransfer {
    pub fn new(chunk_size: u64) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(CHUNK_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            chunk_size: chunk_size.max(1),
        })
    }

    /// Upload `path` to `endpoint`. Sends one `TransferProgress` per
    /// accepted chunk; a full `progress` channel drops events rather than
    /// stalling the transfer.
    pub async fn upload_file(
        &self,
        endpoint: &str,
        path: &Path,
        content_type: &str,
        progress: mpsc::Sender<TransferProgress>,
        cancel: &CancellationToken,
    ) -> Result<(), AppError> {
        let file = tokio::fs::File::open(path).await?;
        let total_bytes = file.metadata().await?.len();
        let mut reader = tokio::io::BufReader::new(file);
        let mut bytes_sent: u64 = 0;

        while bytes_sent < total_bytes {
            if cancel.is_cancelled() {
                return Err(AppError::Transfer("upload aborted".to_string()));
            }

            let chunk_len = min(self.chunk_size, total_bytes - bytes_sent);
            let mut buffer = vec![0u8; chunk_len as usize];
            reader.read_exact(&mut buffer).await?;

            let range = format!(
                "bytes {}-{}/{}",
                bytes_sent,
                bytes_sent + chunk_len - 1,
                total_bytes
            );
            let request = self
                .client
                .put(endpoint)
                .header(CONTENT_TYPE, content_type)
                .header(CONTENT_RANGE, range)
                .body(buffer);

            let response = tokio::select! {
                _ = cancel.cancelled() => {
                    return Err(AppError::Transfer("upload aborted".to_string()));
                }
                result = request.send() => result.map_err(|e| {
                    AppError::Transfer(format!("Chunk upload failed: {}", e))
                })?,
            };

            let status = response.status();
            // 308 Resume Incomplete acknowledges a partial range.
            if !status.is_success() && status.as_u16() != 308 {
                return Err(AppError::Transfer(format!(
                    "Ingestion endpoint rejected chunk with status {}",
                    status
                )));
            }

            bytes_sent += chunk_len;
            let _ = progress.try_send(TransferProgress {
                bytes_sent,
                total_bytes,
            });
        }

        Ok(())
    }
}
