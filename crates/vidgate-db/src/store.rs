use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use vidgate_core::models::{ContentRecord, MediaMetadata};

/// Everything an `asset-ready` event writes in one atomic update.
#[derive(Debug, Clone)]
pub struct AssetUpdate {
    pub asset_id: String,
    pub playback_id: String,
    pub metadata: MediaMetadata,
}

/// Port over the persisted content records. Every mutation is a single
/// atomic write (one statement in the Postgres implementation) so that
/// concurrent webhook deliveries cannot interleave read-modify-write pairs.
///
/// Mutations return the updated record, or `None` when the row was missing
/// or a status guard rejected the write.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<ContentRecord>>;

    /// Seed an empty record. Upload fields start at `none`.
    async fn create(&self, id: Uuid) -> Result<ContentRecord>;

    /// Ticket issued: status `pending`, remember the provider ticket id.
    /// Clears any prior asset fields - a new ticket means a new session.
    async fn mark_pending(&self, id: Uuid, direct_upload_id: &str)
        -> Result<Option<ContentRecord>>;

    /// Bytes finished transferring: status `processing`. Guarded - only
    /// applies from `pending` or `processing`, so a late client patch can
    /// never regress a terminal record.
    async fn mark_processing(&self, id: Uuid) -> Result<Option<ContentRecord>>;

    /// Terminal completion from an `asset-ready` event. Idempotent: a replay
    /// with the same payload converges to the same row.
    async fn complete_asset(&self, id: Uuid, update: &AssetUpdate)
        -> Result<Option<ContentRecord>>;

    /// `asset-created` linkage: find the record by ticket id, attach the
    /// asset id, and move to `processing`. Guarded against terminal regress.
    async fn link_asset_by_ticket(
        &self,
        direct_upload_id: &str,
        asset_id: &str,
    ) -> Result<Option<ContentRecord>>;

    /// Status `cancelled`. Guarded against overwriting `completed`/`failed`;
    /// re-cancelling a cancelled record is a no-op that still returns it.
    async fn cancel(&self, id: Uuid) -> Result<Option<ContentRecord>>;

    /// Most-recently-updated record currently in `processing`, for the
    /// webhook fallback heuristic when the correlation token does not
    /// resolve.
    async fn latest_processing(&self) -> Result<Option<ContentRecord>>;
}
