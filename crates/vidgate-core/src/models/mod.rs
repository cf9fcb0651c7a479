pub mod event;
pub mod record;
pub mod session;

pub use event::{
    AssetCreatedData, AssetReadyData, NewAssetSettings, PlaybackRef, ProviderEvent,
    UploadCancelledData, WebhookEnvelope,
};
pub use record::{AssetRefs, ContentRecord, MediaMetadata, StatusMessage, UploadStatus};
pub use session::{SessionState, UploadPhase};
