//! HTTP-level tests driving the router directly with tower's oneshot.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use chrono::Utc;
use dispatch_api::ApiServer;
use dispatch_core::config::AppConfig;
use dispatch_core::types::*;
use dispatch_engine::{CampaignDispatchEngine, SimulatedTransport};
use dispatch_store::{EntityStore, MemoryStore};
use std::sync::Arc;
use tower::ServiceExt;

const TEST_TOKEN: &str = "cd_dev_testtoken";

fn test_server(daily_limit: u64, sent_today: u64) -> ApiServer {
    let store = Arc::new(MemoryStore::new());
    store
        .insert_template(Template {
            id: "t1".to_string(),
            subject: "Hello {{first_name}}".to_string(),
            body: "Hi {{first_name}}".to_string(),
        })
        .unwrap();
    let now = Utc::now();
    store
        .insert_campaign(Campaign {
            id: "c1".to_string(),
            name: "Test".to_string(),
            template_id: "t1".to_string(),
            segment_criteria: SegmentCriteria::new(),
            sent_count: 0,
            status: CampaignStatus::Draft,
            sent_at: None,
            created_at: now,
            updated_at: now,
        })
        .unwrap();
    store
        .insert_quota_config(QuotaConfig {
            id: "q1".to_string(),
            is_active: true,
            daily_limit,
            emails_sent_today: sent_today,
            updated_at: now,
        })
        .unwrap();
    store
        .insert_contact(Contact {
            id: "a".to_string(),
            email: "ana@acme.io".to_string(),
            first_name: "Ana".to_string(),
            last_name: "Silva".to_string(),
            company: "Acme".to_string(),
            status: ContactStatus::Subscribed,
            last_engaged: None,
        })
        .unwrap();

    let store: Arc<dyn EntityStore> = store;
    let engine = Arc::new(CampaignDispatchEngine::new(
        store.clone(),
        Arc::new(SimulatedTransport::new()),
    ));
    ApiServer::new(AppConfig::default(), engine, store)
}

fn dispatch_request(token: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/v1/dispatch")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(t) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", t));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[tokio::test]
async fn dispatch_without_token_is_unauthorized() {
    let app = test_server(10, 0).router();
    let resp = app
        .oneshot(dispatch_request(None, r#"{"campaign_id":"c1"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_issues_usable_token() {
    let server = test_server(10, 0);

    let login = Request::builder()
        .method("POST")
        .uri("/api/v1/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            r#"{"username":"admin","password":"admin"}"#.to_string(),
        ))
        .unwrap();
    let resp = server.router().oneshot(login).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(resp.into_body(), 64 * 1024).await.unwrap();
    let parsed: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    let token = parsed["token"].as_str().unwrap().to_string();

    let resp = server
        .router()
        .oneshot(dispatch_request(Some(&token), r#"{"campaign_id":"c1"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn successful_dispatch_reports_results() {
    let app = test_server(10, 0).router();
    let resp = app
        .oneshot(dispatch_request(Some(TEST_TOKEN), r#"{"campaign_id":"c1"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(resp.into_body(), 64 * 1024).await.unwrap();
    let parsed: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(parsed["success"], serde_json::json!(true));
    assert_eq!(parsed["results"]["sent"], serde_json::json!(1));
    assert_eq!(parsed["results"]["total"], serde_json::json!(1));
}

#[tokio::test]
async fn missing_campaign_id_is_400() {
    let app = test_server(10, 0).router();
    let resp = app
        .oneshot(dispatch_request(Some(TEST_TOKEN), r#"{}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_campaign_is_404() {
    let app = test_server(10, 0).router();
    let resp = app
        .oneshot(dispatch_request(
            Some(TEST_TOKEN),
            r#"{"campaign_id":"nope"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn exhausted_quota_is_412_with_error_body() {
    let app = test_server(1, 1).router();
    let resp = app
        .oneshot(dispatch_request(Some(TEST_TOKEN), r#"{"campaign_id":"c1"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::PRECONDITION_FAILED);

    let bytes = axum::body::to_bytes(resp.into_body(), 64 * 1024).await.unwrap();
    let parsed: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert!(parsed["error"].as_str().unwrap().contains("limit 1"));
}

#[tokio::test]
async fn health_is_open_and_campaign_reads_are_guarded() {
    let server = test_server(10, 0);

    let health = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let resp = server.router().oneshot(health).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let campaigns = Request::builder()
        .uri("/api/v1/campaigns")
        .body(Body::empty())
        .unwrap();
    let resp = server.router().oneshot(campaigns).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let campaigns = Request::builder()
        .uri("/api/v1/campaigns")
        .header(header::AUTHORIZATION, format!("Bearer {}", TEST_TOKEN))
        .body(Body::empty())
        .unwrap();
    let resp = server.router().oneshot(campaigns).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}
