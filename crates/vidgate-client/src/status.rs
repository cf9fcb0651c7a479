//! Status synchronization channel.
//!
//! Preferred transport is the per-record SSE stream; on repeated stream
//! failures the watcher falls back to polling the record snapshot on a
//! backoff schedule until a terminal status is observed. The two transports
//! are never live at the same instant - the watcher task runs them
//! strictly sequentially - so the terminal message is delivered exactly
//! once. Stream errors are recovered transparently and never surfaced to
//! the subscriber.

use std::sync::Arc;

use futures::StreamExt;
use reqwest::header::ACCEPT;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use vidgate_core::models::StatusMessage;
use vidgate_core::{AppError, RetryConfig};

use crate::IngestClient;

/// Handle on a running status watch. Messages arrive through [`next`];
/// the channel closes after the terminal message. Dropping the
/// subscription (or calling [`unsubscribe`]) tears down whichever
/// transport is active.
///
/// [`next`]: StatusSubscription::next
/// [`unsubscribe`]: StatusSubscription::unsubscribe
pub struct StatusSubscription {
    updates: mpsc::Receiver<StatusMessage>,
    cancel: CancellationToken,
}

impl StatusSubscription {
    pub async fn next(&mut self) -> Option<StatusMessage> {
        self.updates.recv().await
    }

    pub fn unsubscribe(&self) {
        self.cancel.cancel();
    }
}

impl Drop for StatusSubscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Start watching `record_id`. The watch dies with `parent` so a session
/// teardown always closes the transport.
pub fn watch_status(
    client: Arc<IngestClient>,
    retry: RetryConfig,
    record_id: Uuid,
    parent: &CancellationToken,
) -> StatusSubscription {
    let cancel = parent.child_token();
    let (tx, rx) = mpsc::channel(16);
    let task_cancel = cancel.clone();

    tokio::spawn(async move {
        run_watch(client, retry, record_id, tx, task_cancel).await;
    });

    StatusSubscription {
        updates: rx,
        cancel,
    }
}

enum StreamOutcome {
    Terminal,
    Cancelled,
}

async fn run_watch(
    client: Arc<IngestClient>,
    retry: RetryConfig,
    record_id: Uuid,
    tx: mpsc::Sender<StatusMessage>,
    cancel: CancellationToken,
) {
    let mut failures = 0u32;
    loop {
        match stream_once(&client, record_id, &tx, &cancel).await {
            Ok(StreamOutcome::Terminal) | Ok(StreamOutcome::Cancelled) => return,
            Err(e) => {
                failures += 1;
                if failures > retry.stream_max_reconnects {
                    tracing::warn!(
                        record_id = %record_id,
                        failures,
                        error = %e,
                        "Status stream retry budget exhausted, falling back to polling"
                    );
                    break;
                }
                tracing::debug!(
                    record_id = %record_id,
                    attempt = failures,
                    error = %e,
                    "Status stream error, reconnecting"
                );
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = sleep(retry.stream_backoff(failures)) => {}
                }
            }
        }
    }

    poll_until_terminal(&client, &retry, record_id, &tx, &cancel).await;
}

/// One SSE connection attempt. Relays messages until a terminal status,
/// cancellation, or a transport error.
async fn stream_once(
    client: &IngestClient,
    record_id: Uuid,
    tx: &mpsc::Sender<StatusMessage>,
    cancel: &CancellationToken,
) -> Result<StreamOutcome, AppError> {
    let url = client.build_url(&format!("/records/{}/events", record_id));
    let request = client
        .client()
        .get(&url)
        .header(ACCEPT, "text/event-stream")
        .send();

    let response = tokio::select! {
        _ = cancel.cancelled() => return Ok(StreamOutcome::Cancelled),
        result = request => result.map_err(|e| AppError::Stream(e.to_string()))?,
    };

    let status = response.status();
    if !status.is_success() {
        return Err(AppError::Stream(format!(
            "Status stream returned {}",
            status
        )));
    }

    let mut body = response.bytes_stream();
    let mut buffer = String::new();

    loop {
        let chunk = tokio::select! {
            _ = cancel.cancelled() => return Ok(StreamOutcome::Cancelled),
            chunk = body.next() => chunk,
        };
        let Some(chunk) = chunk else {
            // server closed without a terminal event: treat as an error so
            // the reconnect/poll machinery takes over
            return Err(AppError::Stream(
                "Status stream ended before a terminal status".to_string(),
            ));
        };
        let chunk = chunk.map_err(|e| AppError::Stream(e.to_string()))?;
        buffer.push_str(&String::from_utf8_lossy(&chunk));

        while let Some(boundary) = buffer.find("\n\n") {
            let block: String = buffer.drain(..boundary + 2).collect();
            if let Some(message) = parse_sse_event(&block) {
                let terminal = message.status.is_terminal();
                if tx.send(message).await.is_err() {
                    return Ok(StreamOutcome::Cancelled);
                }
                if terminal {
                    return Ok(StreamOutcome::Terminal);
                }
            }
        }
    }
}

/// Extract a `StatusMessage` from one SSE event block. Comment lines
/// (keep-alives) and unparsable payloads yield `None`.
fn parse_sse_event(block: &str) -> Option<StatusMessage> {
    let mut data = String::new();
    for line in block.lines() {
        if let Some(rest) = line.strip_prefix("data:") {
            data.push_str(rest.trim_start());
        }
    }
    if data.is_empty() {
        return None;
    }
    serde_json::from_str(&data).ok()
}

async fn poll_until_terminal(
    client: &IngestClient,
    retry: &RetryConfig,
    record_id: Uuid,
    tx: &mpsc::Sender<StatusMessage>,
    cancel: &CancellationToken,
) {
    let mut interval = retry.initial_poll_interval();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = sleep(interval) => {}
        }

        match client.get_record(record_id).await {
            Ok(record) => {
                let status = record.upload_status;
                let terminal = status.is_terminal();
                if tx
                    .send(StatusMessage::new(status, Some(record)))
                    .await
                    .is_err()
                {
                    return;
                }
                if terminal {
                    return;
                }
            }
            Err(e) => {
                // polling has no overall deadline; keep going until terminal
                // or teardown
                tracing::debug!(record_id = %record_id, error = %e, "Status poll failed");
            }
        }

        interval = retry.next_poll_interval(interval);
    }
}
