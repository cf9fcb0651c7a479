//! Per-record SSE status stream.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
};
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use uuid::Uuid;

use vidgate_core::models::StatusMessage;
use vidgate_core::AppError;

use crate::error::HttpAppError;
use crate::state::AppState;

fn default_keep_alive() -> KeepAlive {
    KeepAlive::new()
        .interval(Duration::from_secs(15))
        .text("keep-alive")
}

fn status_event(message: &StatusMessage) -> Event {
    let data = serde_json::to_string(message).unwrap_or_else(|_| "{}".to_string());
    Event::default().event("status").data(data)
}

/// Stream `{ status, record? }` messages for one record. Emits a snapshot
/// from the store first so a subscriber who missed earlier transitions
/// starts from current truth, then relays live broadcasts. The stream ends
/// after a terminal status; clients falling off earlier reconnect or poll.
pub async fn record_events(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>>, HttpAppError> {
    let record = state
        .store
        .get(id)
        .await
        .map_err(|e| AppError::Persistence(e.to_string()))?
        .ok_or_else(|| AppError::NotFound(format!("Record {} not found", id)))?;

    // Subscribe before snapshotting so no transition between the two is lost.
    let receiver = state.broadcaster.subscribe(id);
    let snapshot = StatusMessage::new(record.upload_status, Some(record));

    let stream = async_stream::stream! {
        let terminal_seen = snapshot.status.is_terminal();
        yield Ok::<Event, Infallible>(status_event(&snapshot));
        if terminal_seen {
            return;
        }

        let mut live = BroadcastStream::new(receiver);
        while let Some(item) = live.next().await {
            match item {
                Ok(message) => {
                    let terminal = message.status.is_terminal();
                    yield Ok(status_event(&message));
                    if terminal {
                        break;
                    }
                }
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        record_id = %id,
                        skipped,
                        "Status stream subscriber lagged"
                    );
                }
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(default_keep_alive()))
}
