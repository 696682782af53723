//! HTTP routing integration tests
//!
//! Drives the full router with an in-memory catalog and a static renderer.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use catwalk_common::config::TomlConfig;
use catwalk_common::db::init_memory_database;
use catwalk_ingest::db::catalog;
use catwalk_ingest::extractor::{
    PageRenderer, RenderError, RenderSession, RenderedImage, RenderedPage,
};
use catwalk_ingest::services::JobKind;
use catwalk_ingest::{build_router, AppState};
use http_body_util::BodyExt;
use reqwest::Url;
use serde_json::{json, Value};
use tower::ServiceExt;

const SEED: &str = "https://www.example.com/fashion/";

/// Every url renders the same page of three looks
#[derive(Clone, Default)]
struct StaticRenderer {
    broken: bool,
}

#[async_trait]
impl PageRenderer for StaticRenderer {
    async fn open_session(&self) -> Result<Box<dyn RenderSession>, RenderError> {
        if self.broken {
            return Err(RenderError::SessionStart("no browser".to_string()));
        }
        Ok(Box::new(self.clone()))
    }
}

#[async_trait]
impl RenderSession for StaticRenderer {
    async fn render(&mut self, url: &Url) -> Result<RenderedPage, RenderError> {
        let images = (0..3)
            .map(|i| RenderedImage {
                src: format!("https://cdn.example.com/runway/look{}.jpg", i),
                alt: format!("runway look {}", i),
                natural_width: 800,
                natural_height: 1200,
            })
            .collect();

        Ok(RenderedPage {
            url: url.clone(),
            images,
            links: vec![],
        })
    }
}

async fn test_state(renderer: StaticRenderer) -> AppState {
    let pool = init_memory_database().await.unwrap();
    AppState::new(pool, TomlConfig::default(), std::sync::Arc::new(renderer))
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn crawl_once(app: &Router) -> Value {
    let request = json!({"seeds": [SEED], "max_pages": 1});
    let (status, body) = call(app, "POST", "/crawl", Some(request)).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    body
}

#[tokio::test]
async fn test_health_reports_module_and_idle_lock() {
    let app = build_router(test_state(StaticRenderer::default()).await);

    let (status, body) = call(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "catwalk-ingest");
    assert!(body.get("running_job").is_none());
}

#[tokio::test]
async fn test_crawl_returns_summary() {
    let state = test_state(StaticRenderer::default()).await;
    let app = build_router(state.clone());

    let body = crawl_once(&app).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["results"]["pages_crawled"], 1);
    assert_eq!(body["results"]["images_stored"], 3);
    assert_eq!(body["results"]["status"], "success");
    assert_eq!(catalog::count_entries(&state.db).await.unwrap(), 3);

    // Lock released when the run returned
    assert!(state.batch_lock.current().is_none());
}

#[tokio::test]
async fn test_crawl_rejects_bad_overrides() {
    let app = build_router(test_state(StaticRenderer::default()).await);

    let (status, body) = call(&app, "POST", "/crawl", Some(json!({"seeds": []}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    let (status, _) = call(&app, "POST", "/crawl", Some(json!({"max_pages": 0}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_renderer_start_failure_is_bad_gateway() {
    let state = test_state(StaticRenderer { broken: true }).await;
    let app = build_router(state.clone());

    let (status, body) = call(&app, "POST", "/crawl", Some(json!({"seeds": [SEED]}))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["code"], "RENDERER_FAILED");
    assert!(state.batch_lock.current().is_none());
}

#[tokio::test]
async fn test_busy_lock_answers_conflict() {
    let state = test_state(StaticRenderer::default()).await;
    let app = build_router(state.clone());
    let _held = state.batch_lock.try_acquire(JobKind::Crawl).unwrap();

    for (uri, body) in [
        ("/crawl", None),
        ("/training/apply-learning", None),
        ("/training/compile-rules", None),
        ("/user/sync", Some(json!({"sync_type": "heart_marked_only"}))),
    ] {
        let (status, json) = call(&app, "POST", uri, body).await;
        assert_eq!(status, StatusCode::CONFLICT, "{}", uri);
        assert_eq!(json["error"]["code"], "CONFLICT");
    }

    let (_, current) = call(&app, "GET", "/jobs/current", None).await;
    assert_eq!(current["running"], true);
    assert_eq!(current["job"]["job"], "crawl");

    let (_, health) = call(&app, "GET", "/health", None).await;
    assert_eq!(health["running_job"]["job"], "crawl");
}

#[tokio::test]
async fn test_cancel_signals_running_job() {
    let state = test_state(StaticRenderer::default()).await;
    let app = build_router(state.clone());

    let (_, idle) = call(&app, "POST", "/jobs/cancel", None).await;
    assert_eq!(idle["cancelled"], false);

    let held = state.batch_lock.try_acquire(JobKind::ApplyLearning).unwrap();
    let (_, body) = call(&app, "POST", "/jobs/cancel", None).await;
    assert_eq!(body["cancelled"], true);
    assert_eq!(body["job"], "apply_learning");
    assert!(held.token().is_cancelled());
}

#[tokio::test]
async fn test_review_status_without_session_is_not_found() {
    let app = build_router(test_state(StaticRenderer::default()).await);

    let (status, body) = call(&app, "GET", "/review-status", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["review_completed"], false);

    let (status, _) = call(&app, "GET", "/review-status?session_id=review_missing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_review_round_trip_over_http() {
    let app = build_router(test_state(StaticRenderer::default()).await);
    crawl_once(&app).await;

    let (status, setup) = call(
        &app,
        "POST",
        "/training/setup-review",
        Some(json!({"review_type": "manual"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(setup["images_queued"], 3);
    let session_id = setup["review_session"]["session_id"].as_str().unwrap().to_string();

    let queue_uri = format!("/training/queue?session_id={}", session_id);
    let (_, queue) = call(&app, "GET", &queue_uri, None).await;
    assert_eq!(queue["count"], 3);
    let ids: Vec<i64> = queue["images"]
        .as_array()
        .unwrap()
        .iter()
        .map(|img| img["id"].as_i64().unwrap())
        .collect();

    let (status, first) = call(
        &app,
        "POST",
        "/training/feedback",
        Some(json!({"imageId": ids[0], "approved": false, "reason": "poster"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["training_status"], "rejected");
    assert_eq!(first["updated_rules"], json!(["poster"]));

    let status_uri = format!("/review-status?session_id={}", session_id);
    let (_, midway) = call(&app, "GET", &status_uri, None).await;
    assert_eq!(midway["review_completed"], false);
    assert_eq!(midway["review_progress"]["images_reviewed"], 1);

    for id in &ids[1..] {
        let (status, _) = call(
            &app,
            "POST",
            "/training/feedback",
            Some(json!({"imageId": id, "approved": true})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, done) = call(&app, "GET", &status_uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(done["success"], true);
    assert_eq!(done["review_completed"], true);
    assert_eq!(done["review_progress"]["images_approved"], 2);
    assert_eq!(done["review_progress"]["images_rejected"], 1);
}

#[tokio::test]
async fn test_feedback_requires_image_and_verdict() {
    let app = build_router(test_state(StaticRenderer::default()).await);

    let (status, body) =
        call(&app, "POST", "/training/feedback", Some(json!({"approved": true}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, _) = call(&app, "POST", "/training/feedback", Some(json!({"imageId": 1}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(
        &app,
        "POST",
        "/training/feedback",
        Some(json!({"imageId": 999, "approved": true})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_learning_and_rule_compilation() {
    let app = build_router(test_state(StaticRenderer::default()).await);

    let (status, _) = call(&app, "GET", "/training/patterns/latest", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, rules) = call(&app, "GET", "/training/rules", None).await;
    assert_eq!(rules["rules"]["version"], 0);
    assert!(rules["compiled_at"].is_null());

    crawl_once(&app).await;
    let (_, queue) = call(&app, "GET", "/training/queue", None).await;
    let first_id = queue["images"][0]["id"].as_i64().unwrap();
    call(
        &app,
        "POST",
        "/training/feedback",
        Some(json!({"imageId": first_id, "approved": false, "duplicate": true})),
    )
    .await;

    let (status, learned) = call(&app, "POST", "/training/apply-learning", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(learned["stats"]["duplicates"], 1);
    assert_eq!(learned["stats"]["deleted"], 1);
    assert_eq!(learned["cancelled"], false);

    let (status, latest) = call(&app, "GET", "/training/patterns/latest", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(latest["pattern"]["excluded_urls"].as_array().unwrap().len(), 1);

    let (status, compiled) = call(&app, "POST", "/training/compile-rules", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(compiled["rules"]["version"], 1);
    assert_eq!(compiled["rules"]["excluded_urls"].as_array().unwrap().len(), 1);

    let (_, active) = call(&app, "GET", "/training/rules", None).await;
    assert_eq!(active["rules"]["version"], 1);
    assert!(!active["compiled_at"].is_null());
}

#[tokio::test]
async fn test_user_sync_validates_type() {
    let state = test_state(StaticRenderer::default()).await;
    let app = build_router(state.clone());

    let (status, body) =
        call(&app, "POST", "/user/sync", Some(json!({"sync_type": "everything"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
    assert!(state.batch_lock.current().is_none());

    crawl_once(&app).await;
    let (status, synced) = call(
        &app,
        "POST",
        "/user/sync",
        Some(json!({"sync_type": "heart_marked_only"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(synced["user_id"], "default");
    assert_eq!(synced["stats"]["images_removed"], 3);
    assert_eq!(synced["stats"]["images_kept"], 0);
}

#[tokio::test]
async fn test_favorites_drive_user_catalog() {
    let app = build_router(test_state(StaticRenderer::default()).await);
    crawl_once(&app).await;

    let (status, marked) = call(
        &app,
        "POST",
        "/user/favorites",
        Some(json!({"user_id": "ana", "original_url": "https://cdn.example.com/runway/look1.jpg"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(marked["favorite"]["is_heart_marked"], true);
    assert!(marked["favorite"]["image_id"].is_i64());

    let (status, _) =
        call(&app, "POST", "/user/favorites", Some(json!({"original_url": " "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, before) = call(&app, "GET", "/user/catalog?user_id=ana", None).await;
    assert_eq!(before["count"], 0);

    let (status, synced) = call(
        &app,
        "POST",
        "/user/sync",
        Some(json!({"sync_type": "heart_marked_only", "user_id": "ana"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(synced["stats"]["images_kept"], 1);
    assert_eq!(synced["stats"]["images_removed"], 2);

    let (_, after) = call(&app, "GET", "/user/catalog?user_id=ana", None).await;
    assert_eq!(after["count"], 1);
    assert_eq!(after["images"][0]["original_url"], "https://cdn.example.com/runway/look1.jpg");
}
