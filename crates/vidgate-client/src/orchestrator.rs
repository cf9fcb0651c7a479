//! Upload orchestrator.
//!
//! Owns the per-record upload session: file validation, ticket
//! acquisition, the chunked transfer, the interim status mark, and
//! adoption of the terminal state delivered by the status channel. Session
//! state lives in a single watch channel - observers snapshot it, nothing
//! keeps a parallel copy. Teardown is guaranteed on every exit path
//! (success, error, cancel, drop) through the session's cancellation
//! token: the transfer and the status subscription are both children of it.

use std::path::PathBuf;
use std::pin::pin;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use vidgate_core::models::{SessionState, UploadPhase, UploadStatus};
use vidgate_core::{AppError, RetryConfig, UploadLimits};

use crate::status::watch_status;
use crate::ticket::acquire_ticket;
use crate::transfer::{ChunkedTransfer, TransferProgress};
use crate::IngestClient;

/// A file chosen for upload.
#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub content_type: String,
}

pub struct UploadOrchestrator {
    client: Arc<IngestClient>,
    limits: UploadLimits,
    retry: RetryConfig,
    record_id: Uuid,
    state: Arc<watch::Sender<SessionState>>,
    selected: Option<SelectedFile>,
    session: Option<CancellationToken>,
}

impl UploadOrchestrator {
    pub fn new(
        client: Arc<IngestClient>,
        record_id: Uuid,
        limits: UploadLimits,
        retry: RetryConfig,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::idle());
        Self {
            client,
            limits,
            retry,
            record_id,
            state: Arc::new(state),
            selected: None,
            session: None,
        }
    }

    pub fn record_id(&self) -> Uuid {
        self.record_id
    }

    /// Observe session state transitions.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// A host UI should gate navigation away while this is true, or the
    /// transfer's work is lost.
    pub fn is_transfer_active(&self) -> bool {
        self.state.borrow().phase == UploadPhase::Uploading
    }

    /// Validate and stage a file. Invalid input fails with `Validation` and
    /// leaves the session untouched; valid input aborts any prior session
    /// and resets to a fresh `Idle`.
    pub fn select_file(&mut self, file: SelectedFile) -> Result<(), AppError> {
        let content_type = file.content_type.to_lowercase();
        if !self
            .limits
            .allowed_content_types
            .iter()
            .any(|allowed| allowed == &content_type)
        {
            return Err(AppError::Validation(format!(
                "Unsupported content type: {}",
                file.content_type
            )));
        }
        if file.size_bytes > self.limits.max_file_size_bytes {
            return Err(AppError::Validation(format!(
                "File size {} exceeds the {} byte limit",
                file.size_bytes, self.limits.max_file_size_bytes
            )));
        }

        if let Some(session) = self.session.take() {
            session.cancel();
        }
        self.state.send_replace(SessionState {
            selected_file_size: Some(file.size_bytes),
            ..SessionState::idle()
        });
        self.selected = Some(file);
        Ok(())
    }

    /// Kick off the upload. Only valid from `Idle` with a selected file;
    /// the session then advances through `Preparing`/`Uploading`/
    /// `AwaitingProcessing` on its own, observable via [`subscribe`].
    ///
    /// [`subscribe`]: UploadOrchestrator::subscribe
    pub fn start_upload(&mut self) -> Result<(), AppError> {
        if self.state.borrow().phase != UploadPhase::Idle {
            return Err(AppError::InvalidInput(
                "An upload session is already active".to_string(),
            ));
        }
        let Some(file) = self.selected.clone() else {
            return Err(AppError::Validation("No file selected".to_string()));
        };

        let cancel = CancellationToken::new();
        self.session = Some(cancel.clone());
        self.state.send_modify(|s| s.phase = UploadPhase::Preparing);

        let client = self.client.clone();
        let retry = self.retry.clone();
        let chunk_size = self.limits.chunk_size_bytes;
        let record_id = self.record_id;
        let state = self.state.clone();
        tokio::spawn(async move {
            run_session(client, retry, chunk_size, record_id, state, file, cancel).await;
        });
        Ok(())
    }

    /// Abort the session from any non-terminal phase: cancels the transfer
    /// and status subscription, best-effort notifies the server, and moves
    /// to `Cancelled`.
    pub async fn cancel(&mut self) {
        if self.state.borrow().phase.is_terminal() {
            return;
        }
        if let Some(session) = self.session.take() {
            session.cancel();
        }
        self.state.send_modify(|s| {
            s.phase = UploadPhase::Cancelled;
            s.progress_percent = 0.0;
            s.eta_seconds = None;
            s.error = None;
        });

        if let Err(e) = self.client.cancel_upload(self.record_id).await {
            tracing::warn!(
                record_id = %self.record_id,
                error = %e,
                "Best-effort upload cancellation failed"
            );
        }
    }

    /// Discard the session and selection entirely, back to `Idle`.
    pub fn reset(&mut self) {
        if let Some(session) = self.session.take() {
            session.cancel();
        }
        self.selected = None;
        self.state.send_replace(SessionState::idle());
    }
}

impl Drop for UploadOrchestrator {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            session.cancel();
        }
    }
}

/// Apply a transition unless the session already reached a terminal phase
/// (e.g. `cancel()` won the race against the driver task).
fn transition(state: &watch::Sender<SessionState>, f: impl FnOnce(&mut SessionState)) {
    state.send_modify(|s| {
        if !s.phase.is_terminal() {
            f(s);
        }
    });
}

fn fail_session(state: &watch::Sender<SessionState>, cancel: &CancellationToken, err: AppError) {
    if cancel.is_cancelled() {
        // cancellation owns the terminal transition
        return;
    }
    transition(state, |s| {
        s.phase = UploadPhase::Failed;
        s.error = Some(err.to_string());
        s.eta_seconds = None;
    });
}

fn apply_progress(
    state: &watch::Sender<SessionState>,
    event: TransferProgress,
    last: &mut (Instant, u64),
) {
    let now = Instant::now();
    let (prev_at, prev_bytes) = *last;
    let elapsed = now.duration_since(prev_at).as_secs_f64();
    let delta = event.bytes_sent.saturating_sub(prev_bytes) as f64;
    let eta_seconds = if elapsed > 0.0 && delta > 0.0 {
        let rate = delta / elapsed;
        Some((event.total_bytes.saturating_sub(event.bytes_sent)) as f64 / rate)
    } else {
        None
    };
    *last = (now, event.bytes_sent);

    state.send_modify(|s| {
        // drop stale events delivered after cancellation or completion
        if s.phase != UploadPhase::Uploading {
            return;
        }
        s.progress_percent = event.percent();
        if eta_seconds.is_some() {
            s.eta_seconds = eta_seconds;
        }
    });
}

async fn run_session(
    client: Arc<IngestClient>,
    retry: RetryConfig,
    chunk_size: u64,
    record_id: Uuid,
    state: Arc<watch::Sender<SessionState>>,
    file: SelectedFile,
    cancel: CancellationToken,
) {
    let endpoint = match acquire_ticket(&client, &retry, record_id).await {
        Ok(url) => url,
        Err(e) => {
            fail_session(&state, &cancel, e);
            return;
        }
    };
    if cancel.is_cancelled() {
        return;
    }

    transition(&state, |s| {
        s.phase = UploadPhase::Uploading;
        s.progress_percent = 0.0;
    });

    let transfer = match ChunkedTransfer::new(chunk_size) {
        Ok(transfer) => transfer,
        Err(e) => {
            fail_session(&state, &cancel, e);
            return;
        }
    };

    let (progress_tx, mut progress_rx) = mpsc::channel::<TransferProgress>(16);
    let mut transfer_fut = pin!(transfer.upload_file(
        &endpoint,
        &file.path,
        &file.content_type,
        progress_tx,
        &cancel,
    ));
    let mut last_event = (Instant::now(), 0u64);

    let result = loop {
        tokio::select! {
            result = &mut transfer_fut => break result,
            Some(event) = progress_rx.recv() => {
                apply_progress(&state, event, &mut last_event);
            }
        }
    };
    if let Err(e) = result {
        fail_session(&state, &cancel, e);
        return;
    }

    transition(&state, |s| {
        s.phase = UploadPhase::AwaitingProcessing;
        s.progress_percent = 100.0;
        s.eta_seconds = None;
    });

    // Interim mark; tolerates failure, the webhook is authoritative.
    {
        let client = client.clone();
        tokio::spawn(async move {
            if let Err(e) = client.patch_processing(record_id).await {
                tracing::warn!(
                    record_id = %record_id,
                    error = %e,
                    "Interim processing patch failed, webhook remains authoritative"
                );
            }
        });
    }

    let mut subscription = watch_status(client, retry, record_id, &cancel);
    while let Some(message) = subscription.next().await {
        match message.status {
            UploadStatus::Completed => {
                transition(&state, |s| {
                    s.phase = UploadPhase::Completed;
                    s.record = message.record.clone();
                    s.eta_seconds = None;
                });
                return;
            }
            UploadStatus::Cancelled => {
                transition(&state, |s| {
                    s.phase = UploadPhase::Cancelled;
                    s.eta_seconds = None;
                });
                return;
            }
            UploadStatus::Failed => {
                transition(&state, |s| {
                    s.phase = UploadPhase::Failed;
                    s.error = Some("Provider reported processing failure".to_string());
                    s.eta_seconds = None;
                });
                return;
            }
            _ => {
                // non-terminal server truth; keep waiting
            }
        }
    }
    // subscription closed without a terminal: session was torn down
}
