use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

use super::record::ContentRecord;

/// Local state machine of a client upload session. Distinct from the
/// persisted [`UploadStatus`](super::UploadStatus) but eventually consistent
/// with it: the webhook-driven persisted status is the source of truth.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UploadPhase {
    Idle,
    Preparing,
    Uploading,
    AwaitingProcessing,
    Completed,
    Cancelled,
    Failed,
}

impl UploadPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            UploadPhase::Completed | UploadPhase::Cancelled | UploadPhase::Failed
        )
    }
}

impl Display for UploadPhase {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let name = match self {
            UploadPhase::Idle => "idle",
            UploadPhase::Preparing => "preparing",
            UploadPhase::Uploading => "uploading",
            UploadPhase::AwaitingProcessing => "awaiting_processing",
            UploadPhase::Completed => "completed",
            UploadPhase::Cancelled => "cancelled",
            UploadPhase::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// Snapshot of a session, published through the orchestrator's watch
/// channel. One authoritative copy; observers clone snapshots.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub phase: UploadPhase,
    pub progress_percent: f64,
    pub eta_seconds: Option<f64>,
    pub selected_file_size: Option<u64>,
    pub error: Option<String>,
    /// Final record, populated when the persisted status reaches a terminal
    /// state through the status channel.
    pub record: Option<ContentRecord>,
}

impl SessionState {
    pub fn idle() -> Self {
        Self {
            phase: UploadPhase::Idle,
            progress_percent: 0.0,
            eta_seconds: None,
            selected_file_size: None,
            error: None,
            record: None,
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::idle()
    }
}
