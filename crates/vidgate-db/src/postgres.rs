use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use vidgate_core::models::{ContentRecord, UploadStatus};

use crate::store::{AssetUpdate, RecordStore};

const RECORD_COLUMNS: &str = "id, upload_status, direct_upload_id, external_asset_id, \
     external_playback_id, duration_seconds, aspect_ratio, width, height, poster_url, \
     created_at, updated_at";

/// Postgres-backed record store. Each mutation is one `UPDATE ... RETURNING`
/// statement; status guards live in the WHERE clause so concurrent webhook
/// deliveries resolve by last-writer-wins instead of lost updates.
#[derive(Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run content_records migrations")?;
        Ok(())
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn get(&self, id: Uuid) -> Result<Option<ContentRecord>> {
        let record = sqlx::query_as::<_, ContentRecord>(&format!(
            "SELECT {} FROM content_records WHERE id = $1",
            RECORD_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch content record")?;
        Ok(record)
    }

    async fn create(&self, id: Uuid) -> Result<ContentRecord> {
        let record = sqlx::query_as::<_, ContentRecord>(&format!(
            "INSERT INTO content_records (id, upload_status) VALUES ($1, $2) RETURNING {}",
            RECORD_COLUMNS
        ))
        .bind(id)
        .bind(UploadStatus::None)
        .fetch_one(&self.pool)
        .await
        .context("Failed to create content record")?;
        Ok(record)
    }

    #[tracing::instrument(skip(self))]
    async fn mark_pending(
        &self,
        id: Uuid,
        direct_upload_id: &str,
    ) -> Result<Option<ContentRecord>> {
        // A new ticket starts a new session: prior asset fields are cleared
        // and a terminal status may be overwritten here (and only here).
        let record = sqlx::query_as::<_, ContentRecord>(&format!(
            "UPDATE content_records SET \
                upload_status = $2, \
                direct_upload_id = $3, \
                external_asset_id = NULL, \
                external_playback_id = NULL, \
                duration_seconds = NULL, \
                aspect_ratio = NULL, \
                width = NULL, \
                height = NULL, \
                poster_url = NULL, \
                updated_at = now() \
             WHERE id = $1 RETURNING {}",
            RECORD_COLUMNS
        ))
        .bind(id)
        .bind(UploadStatus::Pending)
        .bind(direct_upload_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to mark record pending")?;
        Ok(record)
    }

    async fn mark_processing(&self, id: Uuid) -> Result<Option<ContentRecord>> {
        let record = sqlx::query_as::<_, ContentRecord>(&format!(
            "UPDATE content_records SET upload_status = $2, updated_at = now() \
             WHERE id = $1 AND upload_status IN ('pending', 'processing') RETURNING {}",
            RECORD_COLUMNS
        ))
        .bind(id)
        .bind(UploadStatus::Processing)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to mark record processing")?;
        Ok(record)
    }

    #[tracing::instrument(skip(self, update), fields(asset_id = %update.asset_id))]
    async fn complete_asset(
        &self,
        id: Uuid,
        update: &AssetUpdate,
    ) -> Result<Option<ContentRecord>> {
        // The provider is the sole writer of terminal truth: completion is
        // unconditional by id, which also makes replays idempotent.
        let record = sqlx::query_as::<_, ContentRecord>(&format!(
            "UPDATE content_records SET \
                upload_status = $2, \
                external_asset_id = $3, \
                external_playback_id = $4, \
                duration_seconds = $5, \
                aspect_ratio = $6, \
                width = $7, \
                height = $8, \
                poster_url = $9, \
                updated_at = now() \
             WHERE id = $1 RETURNING {}",
            RECORD_COLUMNS
        ))
        .bind(id)
        .bind(UploadStatus::Completed)
        .bind(&update.asset_id)
        .bind(&update.playback_id)
        .bind(update.metadata.duration_seconds)
        .bind(&update.metadata.aspect_ratio)
        .bind(update.metadata.width)
        .bind(update.metadata.height)
        .bind(&update.metadata.poster_url)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to complete content record")?;
        Ok(record)
    }

    async fn link_asset_by_ticket(
        &self,
        direct_upload_id: &str,
        asset_id: &str,
    ) -> Result<Option<ContentRecord>> {
        let record = sqlx::query_as::<_, ContentRecord>(&format!(
            "UPDATE content_records SET \
                external_asset_id = $2, \
                upload_status = $3, \
                updated_at = now() \
             WHERE direct_upload_id = $1 \
               AND upload_status NOT IN ('completed', 'cancelled', 'failed') \
             RETURNING {}",
            RECORD_COLUMNS
        ))
        .bind(direct_upload_id)
        .bind(asset_id)
        .bind(UploadStatus::Processing)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to link asset by ticket id")?;
        Ok(record)
    }

    async fn cancel(&self, id: Uuid) -> Result<Option<ContentRecord>> {
        let record = sqlx::query_as::<_, ContentRecord>(&format!(
            "UPDATE content_records SET upload_status = $2, updated_at = now() \
             WHERE id = $1 AND upload_status NOT IN ('completed', 'failed') RETURNING {}",
            RECORD_COLUMNS
        ))
        .bind(id)
        .bind(UploadStatus::Cancelled)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to cancel content record")?;
        Ok(record)
    }

    async fn latest_processing(&self) -> Result<Option<ContentRecord>> {
        let record = sqlx::query_as::<_, ContentRecord>(&format!(
            "SELECT {} FROM content_records \
             WHERE upload_status = 'processing' \
             ORDER BY updated_at DESC LIMIT 1",
            RECORD_COLUMNS
        ))
        .fetch_optional(&self.pool)
        .await
        .context("Failed to query latest processing record")?;
        Ok(record)
    }
}
