//! Record store for content-record upload fields.
//!
//! The wider application owns the content schema; this crate only reads and
//! writes the upload-related columns, behind the [`RecordStore`] port so the
//! API server can run against Postgres in production and an in-memory store
//! in tests.

pub mod memory;
pub mod postgres;
pub mod store;

pub use memory::MemoryRecordStore;
pub use postgres::PgRecordStore;
pub use store::{AssetUpdate, RecordStore};
