use std::sync::Arc;

use axum_test::TestServer;
use uuid::Uuid;

use vidgate_api::routes::build_router;
use vidgate_api::state::AppState;
use vidgate_core::config::{
    Config, DatabaseConfig, ProviderConfig, RetryConfig, ServerConfig, UploadLimits,
};
use vidgate_core::models::{ContentRecord, UploadStatus};
use vidgate_db::{MemoryRecordStore, RecordStore};
use vidgate_provider::{StubProvider, VideoProvider};

/// Test application over the in-memory record store and a stub provider.
pub struct TestApp {
    pub server: TestServer,
    pub store: Arc<MemoryRecordStore>,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    /// Seed a record in the given status, returning it.
    pub async fn seed_record(&self, status: UploadStatus, upload_id: Option<&str>) -> ContentRecord {
        let id = Uuid::new_v4();
        self.store.create(id).await.unwrap();
        if let Some(upload_id) = upload_id {
            self.store.mark_pending(id, upload_id).await.unwrap();
        }
        match status {
            UploadStatus::None | UploadStatus::Pending => {}
            UploadStatus::Processing => {
                if upload_id.is_none() {
                    self.store.mark_pending(id, "seeded-upload").await.unwrap();
                }
                self.store.mark_processing(id).await.unwrap();
            }
            UploadStatus::Cancelled => {
                self.store.cancel(id).await.unwrap();
            }
            other => panic!("seed_record does not support {}", other),
        }
        self.store.get(id).await.unwrap().unwrap()
    }
}

fn test_config() -> Config {
    Config {
        server: ServerConfig {
            port: 0,
            cors_origins: vec!["*".to_string()],
            environment: "test".to_string(),
        },
        database: DatabaseConfig {
            url: "postgres://unused".to_string(),
            max_connections: 1,
            timeout_seconds: 5,
        },
        provider: ProviderConfig {
            base_url: "https://provider.invalid".to_string(),
            api_token: None,
            timeout_seconds: 5,
        },
        limits: UploadLimits::default(),
        retry: RetryConfig::default(),
    }
}

pub fn setup_test_app() -> TestApp {
    setup_test_app_with_provider(Arc::new(StubProvider::new("https://ingest.invalid")))
}

pub fn setup_test_app_with_provider(provider: Arc<dyn VideoProvider>) -> TestApp {
    let store = Arc::new(MemoryRecordStore::new());
    let state = Arc::new(AppState::new(store.clone(), provider, test_config()));
    let server = TestServer::new(build_router(state)).expect("test server");
    TestApp { server, store }
}
