//! Notifications, UGC dashboards and media uploads.

#![allow(clippy::unwrap_used)]

use std::io::Write;
use std::time::Duration;

use rust_decimal::Decimal;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, Request, ResponseTemplate};

use avenue_client::api::ugc::CampaignFilter;
use avenue_client::media::upload_file;
use avenue_client::notifications::{NotificationCenter, UnreadCountPoller};
use avenue_client::ugc::{BrandDashboard, CreatorDashboard};
use avenue_client::{ClientError, ValidationError};
use avenue_core::{CampaignStatus, NotificationId};
use avenue_integration_tests::TestContext;

// =============================================================================
// Notifications
// =============================================================================

#[tokio::test]
async fn test_list_and_mark_read() {
    let ctx = TestContext::logged_in().await;

    Mock::given(method("GET"))
        .and(path("/api/notifications"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "n1", "title": "Pedido enviado", "message": "Tu pedido va en camino", "read": false},
            {"id": "n2", "title": "Reserva confirmada", "message": "Te esperamos", "read": true}
        ])))
        .expect(1)
        .mount(&ctx.server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/notifications/n1/read"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&ctx.server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/notifications/read-all"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&ctx.server)
        .await;

    let center = NotificationCenter::new(ctx.api.clone());
    let list = center.list().await.unwrap();
    assert_eq!(list.len(), 2);
    assert!(!list[0].read);

    center.mark_read(&NotificationId::new("n1")).await.unwrap();
    center.mark_all_read().await.unwrap();
}

#[tokio::test]
async fn test_poller_needs_token() {
    let ctx = TestContext::new().await;
    assert!(UnreadCountPoller::spawn(ctx.api.clone(), Duration::from_millis(50)).is_none());
}

#[tokio::test]
async fn test_poller_publishes_changes() {
    let ctx = TestContext::logged_in().await;

    Mock::given(method("GET"))
        .and(path("/api/notifications/unread-count"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"count": 3})))
        .up_to_n_times(1)
        .mount(&ctx.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/notifications/unread-count"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"unread_count": 5})))
        .mount(&ctx.server)
        .await;

    let poller = UnreadCountPoller::spawn(ctx.api.clone(), Duration::from_millis(50)).unwrap();
    let mut rx = poller.subscribe();

    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|count| *count == 5))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(poller.count(), 5);
}

#[tokio::test]
async fn test_poller_keeps_count_on_failure() {
    let ctx = TestContext::logged_in().await;

    Mock::given(method("GET"))
        .and(path("/api/notifications/unread-count"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"count": 2})))
        .up_to_n_times(1)
        .mount(&ctx.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/notifications/unread-count"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&ctx.server)
        .await;

    let poller = UnreadCountPoller::spawn(ctx.api.clone(), Duration::from_millis(20)).unwrap();
    let mut rx = poller.subscribe();
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|count| *count == 2))
        .await
        .unwrap()
        .unwrap();

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(poller.count(), 2);
}

// =============================================================================
// UGC
// =============================================================================

#[tokio::test]
async fn test_creator_dashboard() {
    let ctx = TestContext::logged_in().await;

    Mock::given(method("GET"))
        .and(path("/api/ugc/creators/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "cr1", "bio": "Fotógrafa", "city": "Medellín", "categories": ["moda"]
        })))
        .mount(&ctx.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/ugc/applications/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "a1", "campaign_id": "c1", "status": "pending"},
            {"id": "a2", "campaign_id": "c2", "status": "accepted"},
            {"id": "a3", "campaign_id": "c3", "status": "accepted"}
        ])))
        .mount(&ctx.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/ugc/deliverables/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "d1", "campaign_id": "c2", "status": "approved", "payment_amount": 300_000},
            {"id": "d2", "campaign_id": "c3", "status": "changes_requested", "payment_amount": 150_000},
            {"id": "d3", "campaign_id": "c3", "status": "submitted"}
        ])))
        .mount(&ctx.server)
        .await;

    let dashboard = CreatorDashboard::load(&ctx.api).await.unwrap();
    assert_eq!(dashboard.summary.pending_applications, 1);
    assert_eq!(dashboard.summary.accepted_applications, 2);
    assert_eq!(dashboard.summary.deliverables_due, 1);
    assert_eq!(dashboard.summary.earnings, Decimal::from(300_000));
    // No social handle and no portfolio yet
    assert!(dashboard.needs_profile());
}

#[tokio::test]
async fn test_dashboard_fails_on_first_error() {
    let ctx = TestContext::logged_in().await;

    Mock::given(method("GET"))
        .and(path("/api/ugc/brands/me"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({"detail": "Marca no encontrada"})),
        )
        .mount(&ctx.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/ugc/brands/me/campaigns"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&ctx.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/ugc/packages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&ctx.server)
        .await;

    let err = BrandDashboard::load(&ctx.api).await.unwrap_err();
    assert_eq!(err.status(), Some(404));
}

#[tokio::test]
async fn test_brand_dashboard_and_cached_packages() {
    let ctx = TestContext::logged_in().await;

    Mock::given(method("GET"))
        .and(path("/api/ugc/brands/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "b1", "company_name": "Café Pergamino", "credits_remaining": 7
        })))
        .mount(&ctx.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/ugc/brands/me/campaigns"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "c1", "title": "Verano", "status": "active", "applications_count": 4},
            {"id": "c2", "title": "Navidad", "status": "draft", "applications_count": 0},
            {"id": "c3", "title": "Lanzamiento", "status": "active", "applications_count": 6}
        ])))
        .mount(&ctx.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/ugc/packages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "p1", "name": "Starter", "video_count": 3, "price": 900_000},
            {"id": "p2", "name": "Pro", "video_count": 10, "price": 2_500_000, "popular": true}
        ])))
        .expect(1)
        .mount(&ctx.server)
        .await;

    let dashboard = BrandDashboard::load(&ctx.api).await.unwrap();
    assert_eq!(dashboard.summary.active_campaigns, 2);
    assert_eq!(dashboard.summary.total_applications, 10);
    assert_eq!(dashboard.summary.credits_remaining, 7);
    assert_eq!(
        dashboard.packages[1].price_per_video(),
        Some(Decimal::from(250_000))
    );

    // Second read comes from the cache
    assert_eq!(ctx.api.packages().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_campaign_filter_query() {
    let ctx = TestContext::new().await;

    Mock::given(method("GET"))
        .and(path("/api/ugc/campaigns"))
        .and(query_param("category", "moda"))
        .and(query_param("status", "active"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "c1", "title": "Verano", "category": "moda", "status": "active"}
        ])))
        .expect(1)
        .mount(&ctx.server)
        .await;

    let campaigns = ctx
        .api
        .campaigns(&CampaignFilter {
            category: Some("moda".to_string()),
            status: Some(CampaignStatus::Active),
        })
        .await
        .unwrap();
    assert_eq!(campaigns.len(), 1);
}

// =============================================================================
// Media
// =============================================================================

#[tokio::test]
async fn test_upload_video_file() {
    let ctx = TestContext::logged_in().await;

    let mut file = tempfile::Builder::new().suffix(".mp4").tempfile().unwrap();
    file.write_all(b"\x00\x00\x00\x18ftypmp42").unwrap();

    Mock::given(method("POST"))
        .and(path("/api/cloudinary/upload"))
        .and(body_partial_json(json!({"folder": "ugc/deliverables", "resource_type": "video"})))
        .and(|request: &Request| {
            let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
            body["file"]
                .as_str()
                .is_some_and(|f| f.starts_with("data:video/mp4;base64,"))
        })
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "secure_url": "https://res.cloudinary.com/avenue/video/upload/v1/ugc/clip.mp4",
            "public_id": "ugc/clip",
            "resource_type": "video"
        })))
        .expect(1)
        .mount(&ctx.server)
        .await;

    let uploaded = upload_file(&ctx.api, file.path(), Some("ugc/deliverables"))
        .await
        .unwrap();
    assert_eq!(uploaded.public_id, "ugc/clip");
}

#[tokio::test]
async fn test_upload_empty_file_is_rejected() {
    let ctx = TestContext::logged_in().await;
    let file = tempfile::Builder::new().suffix(".jpg").tempfile().unwrap();

    let err = upload_file(&ctx.api, file.path(), None).await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Validation(ValidationError::EmptyFile)
    ));
}

#[tokio::test]
async fn test_upload_missing_file() {
    let ctx = TestContext::logged_in().await;
    let dir = tempfile::tempdir().unwrap();

    let err = upload_file(&ctx.api, dir.path().join("nope.png"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::File(_)));
}
