mod helpers;

use std::sync::Arc;

use helpers::{setup_test_app, setup_test_app_with_provider};
use serde_json::json;
use uuid::Uuid;

use vidgate_db::RecordStore;
use vidgate_core::models::UploadStatus;
use vidgate_provider::StubProvider;

#[tokio::test]
async fn upload_url_issues_ticket_and_marks_pending() {
    let app = setup_test_app();
    let record = app.seed_record(UploadStatus::None, None).await;

    let response = app
        .client()
        .post("/upload-url")
        .json(&json!({"recordId": record.id}))
        .await;
    assert_eq!(response.status_code(), 200);

    let body: serde_json::Value = response.json();
    assert!(body["url"].as_str().is_some_and(|u| u.contains("/ingest/")));

    let updated = app.store.get(record.id).await.unwrap().unwrap();
    assert_eq!(updated.upload_status, UploadStatus::Pending);
    assert!(updated.direct_upload_id.is_some());
}

#[tokio::test]
async fn upload_url_for_missing_record_is_404() {
    let app = setup_test_app();
    let response = app
        .client()
        .post("/upload-url")
        .json(&json!({"recordId": Uuid::new_v4()}))
        .await;
    assert_eq!(response.status_code(), 404);
}

#[tokio::test]
async fn upload_url_surfaces_provider_outage_as_502() {
    let app = setup_test_app_with_provider(Arc::new(StubProvider::failing()));
    let record = app.seed_record(UploadStatus::None, None).await;

    let response = app
        .client()
        .post("/upload-url")
        .json(&json!({"recordId": record.id}))
        .await;
    assert_eq!(response.status_code(), 502);

    // Ticket failure leaves the record untouched.
    let untouched = app.store.get(record.id).await.unwrap().unwrap();
    assert_eq!(untouched.upload_status, UploadStatus::None);
}

#[tokio::test]
async fn a_new_ticket_starts_a_fresh_session_after_completion() {
    let app = setup_test_app();
    let record = app
        .seed_record(UploadStatus::Processing, Some("upload-1"))
        .await;
    let update = vidgate_db::AssetUpdate {
        asset_id: "asset-1".to_string(),
        playback_id: "play-1".to_string(),
        metadata: Default::default(),
    };
    app.store.complete_asset(record.id, &update).await.unwrap();

    let response = app
        .client()
        .post("/upload-url")
        .json(&json!({"recordId": record.id}))
        .await;
    assert_eq!(response.status_code(), 200);

    let reset = app.store.get(record.id).await.unwrap().unwrap();
    assert_eq!(reset.upload_status, UploadStatus::Pending);
    assert!(reset.external_asset_id.is_none());
    assert!(reset.external_playback_id.is_none());
}

#[tokio::test]
async fn cancel_upload_cancels_the_record() {
    let app = setup_test_app();
    let record = app
        .seed_record(UploadStatus::Pending, Some("upload-1"))
        .await;

    let response = app
        .client()
        .post("/cancel-upload")
        .json(&json!({"recordId": record.id}))
        .await;
    assert_eq!(response.status_code(), 200);

    let updated = app.store.get(record.id).await.unwrap().unwrap();
    assert_eq!(updated.upload_status, UploadStatus::Cancelled);
}

#[tokio::test]
async fn cancel_upload_succeeds_even_when_provider_cancel_fails() {
    // Failing provider: ticket cancellation errors are logged, not fatal.
    let app = setup_test_app_with_provider(Arc::new(StubProvider::failing()));
    let record = app.seed_record(UploadStatus::None, None).await;
    app.store.mark_pending(record.id, "upload-1").await.unwrap();

    let response = app
        .client()
        .post("/cancel-upload")
        .json(&json!({"recordId": record.id}))
        .await;
    assert_eq!(response.status_code(), 200);

    let updated = app.store.get(record.id).await.unwrap().unwrap();
    assert_eq!(updated.upload_status, UploadStatus::Cancelled);
}

#[tokio::test]
async fn health_endpoint_reports_ok() {
    let app = setup_test_app();
    let response = app.client().get("/health").await;
    assert_eq!(response.status_code(), 200);
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "ok");
}
