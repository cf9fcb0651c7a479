mod helpers;

use helpers::setup_test_app;
use serde_json::json;
use uuid::Uuid;

use vidgate_db::RecordStore;
use vidgate_core::models::UploadStatus;
use vidgate_core::CorrelationToken;

fn asset_ready_body(passthrough: Option<String>) -> serde_json::Value {
    json!({
        "type": "asset-ready",
        "data": {
            "id": "asset-42",
            "playback_ids": [{"id": "play-42"}],
            "passthrough": passthrough,
            "duration": 120.5,
            "aspect_ratio": "16:9",
            "width": 1920,
            "height": 1080
        }
    })
}

#[tokio::test]
async fn asset_ready_completes_the_correlated_record() {
    let app = setup_test_app();
    let record = app
        .seed_record(UploadStatus::Processing, Some("upload-42"))
        .await;
    let token = CorrelationToken::new(record.id).encode();

    let response = app
        .client()
        .post("/webhooks/provider")
        .json(&asset_ready_body(Some(token)))
        .await;
    assert_eq!(response.status_code(), 200);

    let updated = app.store.get(record.id).await.unwrap().unwrap();
    assert_eq!(updated.upload_status, UploadStatus::Completed);
    assert_eq!(updated.external_asset_id.as_deref(), Some("asset-42"));
    assert_eq!(updated.external_playback_id.as_deref(), Some("play-42"));
    assert_eq!(updated.duration_seconds, Some(120.5));
    assert_eq!(updated.aspect_ratio.as_deref(), Some("16:9"));
    assert!(updated
        .poster_url
        .as_deref()
        .is_some_and(|u| u.contains("play-42")));
}

#[tokio::test]
async fn duplicate_asset_ready_deliveries_converge() {
    let app = setup_test_app();
    let record = app
        .seed_record(UploadStatus::Processing, Some("upload-42"))
        .await;
    let token = CorrelationToken::new(record.id).encode();
    let body = asset_ready_body(Some(token));

    let first = app.client().post("/webhooks/provider").json(&body).await;
    assert_eq!(first.status_code(), 200);
    let after_first = app.store.get(record.id).await.unwrap().unwrap();

    let second = app.client().post("/webhooks/provider").json(&body).await;
    assert_eq!(second.status_code(), 200);
    let after_second = app.store.get(record.id).await.unwrap().unwrap();

    assert_eq!(after_first.upload_status, after_second.upload_status);
    assert_eq!(after_first.external_asset_id, after_second.external_asset_id);
    assert_eq!(
        after_first.external_playback_id,
        after_second.external_playback_id
    );
    assert_eq!(after_first.duration_seconds, after_second.duration_seconds);
    assert_eq!(after_first.poster_url, after_second.poster_url);
}

#[tokio::test]
async fn concurrent_asset_ready_deliveries_both_succeed() {
    let app = setup_test_app();
    let record = app
        .seed_record(UploadStatus::Processing, Some("upload-42"))
        .await;
    let token = CorrelationToken::new(record.id).encode();
    let body = asset_ready_body(Some(token));

    let (first, second) = tokio::join!(
        app.client().post("/webhooks/provider").json(&body),
        app.client().post("/webhooks/provider").json(&body),
    );
    assert_eq!(first.status_code(), 200);
    assert_eq!(second.status_code(), 200);

    let updated = app.store.get(record.id).await.unwrap().unwrap();
    assert_eq!(updated.upload_status, UploadStatus::Completed);
    assert_eq!(updated.external_asset_id.as_deref(), Some("asset-42"));
}

#[tokio::test]
async fn asset_ready_with_unresolvable_token_falls_back_to_processing_record() {
    let app = setup_test_app();
    let record = app
        .seed_record(UploadStatus::Processing, Some("upload-42"))
        .await;
    // Token points at a record that does not exist in this store.
    let token = CorrelationToken::new(Uuid::new_v4()).encode();

    let response = app
        .client()
        .post("/webhooks/provider")
        .json(&asset_ready_body(Some(token)))
        .await;
    assert_eq!(response.status_code(), 200);

    let updated = app.store.get(record.id).await.unwrap().unwrap();
    assert_eq!(updated.upload_status, UploadStatus::Completed);
}

#[tokio::test]
async fn asset_ready_with_no_resolution_is_a_400_and_mutates_nothing() {
    let app = setup_test_app();
    // Only a pending record: not eligible for the processing fallback.
    let record = app
        .seed_record(UploadStatus::Pending, Some("upload-42"))
        .await;

    let response = app
        .client()
        .post("/webhooks/provider")
        .json(&asset_ready_body(Some(
            CorrelationToken::new(Uuid::new_v4()).encode(),
        )))
        .await;
    assert_eq!(response.status_code(), 400);

    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "CORRELATION_ERROR");

    let untouched = app.store.get(record.id).await.unwrap().unwrap();
    assert_eq!(untouched.upload_status, UploadStatus::Pending);
    assert!(untouched.external_asset_id.is_none());
}

#[tokio::test]
async fn asset_ready_with_missing_required_fields_is_a_400() {
    let app = setup_test_app();
    app.seed_record(UploadStatus::Processing, Some("upload-42"))
        .await;

    let response = app
        .client()
        .post("/webhooks/provider")
        .json(&json!({
            "type": "asset-ready",
            "data": {"playback_ids": [{"id": "play-1"}]}
        }))
        .await;
    assert_eq!(response.status_code(), 400);
}

#[tokio::test]
async fn unknown_event_types_are_acknowledged() {
    let app = setup_test_app();

    let response = app
        .client()
        .post("/webhooks/provider")
        .json(&json!({
            "type": "asset-master-ready",
            "data": {"id": "whatever", "shape": {"the": "provider invented"}}
        }))
        .await;
    assert_eq!(response.status_code(), 200);
}

#[tokio::test]
async fn upload_cancelled_with_token_cancels_the_record() {
    let app = setup_test_app();
    let record = app
        .seed_record(UploadStatus::Pending, Some("upload-7"))
        .await;
    let token = CorrelationToken::new(record.id).encode();

    let response = app
        .client()
        .post("/webhooks/provider")
        .json(&json!({
            "type": "upload-cancelled",
            "data": {
                "id": "upload-7",
                "new_asset_settings": {"passthrough": token}
            }
        }))
        .await;
    assert_eq!(response.status_code(), 200);

    let updated = app.store.get(record.id).await.unwrap().unwrap();
    assert_eq!(updated.upload_status, UploadStatus::Cancelled);
}

#[tokio::test]
async fn upload_cancelled_without_token_is_a_no_op_success() {
    let app = setup_test_app();
    let record = app
        .seed_record(UploadStatus::Pending, Some("upload-7"))
        .await;

    let response = app
        .client()
        .post("/webhooks/provider")
        .json(&json!({
            "type": "upload-cancelled",
            "data": {"id": "upload-7"}
        }))
        .await;
    assert_eq!(response.status_code(), 200);

    let untouched = app.store.get(record.id).await.unwrap().unwrap();
    assert_eq!(untouched.upload_status, UploadStatus::Pending);
}

#[tokio::test]
async fn asset_created_links_by_ticket_id() {
    let app = setup_test_app();
    let record = app
        .seed_record(UploadStatus::Pending, Some("upload-55"))
        .await;

    let response = app
        .client()
        .post("/webhooks/provider")
        .json(&json!({
            "type": "asset-created",
            "data": {"id": "asset-55", "upload_id": "upload-55"}
        }))
        .await;
    assert_eq!(response.status_code(), 200);

    let updated = app.store.get(record.id).await.unwrap().unwrap();
    assert_eq!(updated.upload_status, UploadStatus::Processing);
    assert_eq!(updated.external_asset_id.as_deref(), Some("asset-55"));
}

#[tokio::test]
async fn asset_created_with_unknown_ticket_is_a_no_op_success() {
    let app = setup_test_app();
    let record = app
        .seed_record(UploadStatus::Pending, Some("upload-55"))
        .await;

    let response = app
        .client()
        .post("/webhooks/provider")
        .json(&json!({
            "type": "asset-created",
            "data": {"id": "asset-55", "upload_id": "some-other-upload"}
        }))
        .await;
    assert_eq!(response.status_code(), 200);

    let untouched = app.store.get(record.id).await.unwrap().unwrap();
    assert_eq!(untouched.upload_status, UploadStatus::Pending);
    assert!(untouched.external_asset_id.is_none());
}

#[tokio::test]
async fn replayed_cancellation_after_completion_does_not_regress() {
    let app = setup_test_app();
    let record = app
        .seed_record(UploadStatus::Processing, Some("upload-42"))
        .await;
    let token = CorrelationToken::new(record.id).encode();

    let ready = app
        .client()
        .post("/webhooks/provider")
        .json(&asset_ready_body(Some(token.clone())))
        .await;
    assert_eq!(ready.status_code(), 200);

    // A late upload-cancelled replay must not claw back the completion.
    let cancelled = app
        .client()
        .post("/webhooks/provider")
        .json(&json!({
            "type": "upload-cancelled",
            "data": {
                "id": "upload-42",
                "new_asset_settings": {"passthrough": token}
            }
        }))
        .await;
    assert_eq!(cancelled.status_code(), 200);

    let final_record = app.store.get(record.id).await.unwrap().unwrap();
    assert_eq!(final_record.upload_status, UploadStatus::Completed);
}
