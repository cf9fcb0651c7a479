//! In-memory record store for tests and local development.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use vidgate_core::models::{ContentRecord, UploadStatus};

use crate::store::{AssetUpdate, RecordStore};

/// `RecordStore` over a `RwLock<HashMap>`. Mutations take the write lock for
/// their full duration, giving the same atomicity the single-statement
/// Postgres updates provide.
#[derive(Default)]
pub struct MemoryRecordStore {
    records: RwLock<HashMap<Uuid, ContentRecord>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record as-is, bypassing guards. Test seam.
    pub async fn insert(&self, record: ContentRecord) {
        self.records.write().await.insert(record.id, record);
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn get(&self, id: Uuid) -> Result<Option<ContentRecord>> {
        Ok(self.records.read().await.get(&id).cloned())
    }

    async fn create(&self, id: Uuid) -> Result<ContentRecord> {
        let record = ContentRecord::new(id);
        self.records.write().await.insert(id, record.clone());
        Ok(record)
    }

    async fn mark_pending(
        &self,
        id: Uuid,
        direct_upload_id: &str,
    ) -> Result<Option<ContentRecord>> {
        let mut records = self.records.write().await;
        let Some(record) = records.get_mut(&id) else {
            return Ok(None);
        };
        record.upload_status = UploadStatus::Pending;
        record.direct_upload_id = Some(direct_upload_id.to_string());
        record.external_asset_id = None;
        record.external_playback_id = None;
        record.duration_seconds = None;
        record.aspect_ratio = None;
        record.width = None;
        record.height = None;
        record.poster_url = None;
        record.updated_at = Utc::now();
        Ok(Some(record.clone()))
    }

    async fn mark_processing(&self, id: Uuid) -> Result<Option<ContentRecord>> {
        let mut records = self.records.write().await;
        let Some(record) = records.get_mut(&id) else {
            return Ok(None);
        };
        if !matches!(
            record.upload_status,
            UploadStatus::Pending | UploadStatus::Processing
        ) {
            return Ok(None);
        }
        record.upload_status = UploadStatus::Processing;
        record.updated_at = Utc::now();
        Ok(Some(record.clone()))
    }

    async fn complete_asset(
        &self,
        id: Uuid,
        update: &AssetUpdate,
    ) -> Result<Option<ContentRecord>> {
        let mut records = self.records.write().await;
        let Some(record) = records.get_mut(&id) else {
            return Ok(None);
        };
        record.upload_status = UploadStatus::Completed;
        record.external_asset_id = Some(update.asset_id.clone());
        record.external_playback_id = Some(update.playback_id.clone());
        record.duration_seconds = update.metadata.duration_seconds;
        record.aspect_ratio = update.metadata.aspect_ratio.clone();
        record.width = update.metadata.width;
        record.height = update.metadata.height;
        record.poster_url = update.metadata.poster_url.clone();
        record.updated_at = Utc::now();
        Ok(Some(record.clone()))
    }

    async fn link_asset_by_ticket(
        &self,
        direct_upload_id: &str,
        asset_id: &str,
    ) -> Result<Option<ContentRecord>> {
        let mut records = self.records.write().await;
        let record = records.values_mut().find(|r| {
            r.direct_upload_id.as_deref() == Some(direct_upload_id)
                && !r.upload_status.is_terminal()
        });
        let Some(record) = record else {
            return Ok(None);
        };
        record.external_asset_id = Some(asset_id.to_string());
        record.upload_status = UploadStatus::Processing;
        record.updated_at = Utc::now();
        Ok(Some(record.clone()))
    }

    async fn cancel(&self, id: Uuid) -> Result<Option<ContentRecord>> {
        let mut records = self.records.write().await;
        let Some(record) = records.get_mut(&id) else {
            return Ok(None);
        };
        if matches!(
            record.upload_status,
            UploadStatus::Completed | UploadStatus::Failed
        ) {
            return Ok(None);
        }
        record.upload_status = UploadStatus::Cancelled;
        record.updated_at = Utc::now();
        Ok(Some(record.clone()))
    }

    async fn latest_processing(&self) -> Result<Option<ContentRecord>> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .filter(|r| r.upload_status == UploadStatus::Processing)
            .max_by_key(|r| r.updated_at)
            .cloned())
    }
}
