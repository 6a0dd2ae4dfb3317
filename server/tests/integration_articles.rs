use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use neardup_core::tokenizer::StemmingTokenizer;
use neardup_core::{DocumentService, MemoryRepository, MemoryStore, SimilarityConfig};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::tempdir;
use tower::ServiceExt;

fn memory_app() -> Router {
    let service = DocumentService::new(
        Arc::new(MemoryRepository::new()),
        Arc::new(MemoryStore::new()),
        Arc::new(StemmingTokenizer),
        SimilarityConfig::default(),
    );
    service.init().unwrap();
    neardup_server::build_app(Arc::new(service))
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(v) => builder.header("content-type", "application/json").body(Body::from(v.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn create(app: &Router, content: &str) -> u64 {
    let (status, json) = call(app, "POST", "/articles", Some(json!({ "content": content }))).await;
    assert_eq!(status, StatusCode::OK);
    json["id"].as_u64().unwrap()
}

#[tokio::test]
async fn article_lifecycle_tracks_duplicates() {
    let app = memory_app();
    let (status, _) = call(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);

    create(&app, "Stock markets rallied after the central bank announcement").await;
    let fox_a = create(&app, "The quick brown fox jumps over the lazy dog").await;
    let (status, json) = call(&app, "POST", "/articles", Some(json!({ "content": "A quick brown fox jumped over a lazy dog" }))).await;
    assert_eq!(status, StatusCode::OK);
    let fox_b = json["id"].as_u64().unwrap();
    assert_eq!(json["duplicate_article_ids"], json!([fox_a]));

    let (status, json) = call(&app, "GET", &format!("/articles/{fox_a}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["duplicate_article_ids"], json!([fox_b]));

    let (_, json) = call(&app, "GET", "/articles", None).await;
    assert_eq!(json.as_array().unwrap().len(), 2);
    let (_, json) = call(&app, "GET", "/articles?unique_only=false", None).await;
    assert_eq!(json.as_array().unwrap().len(), 3);

    let (status, json) = call(&app, "GET", "/duplicate_groups", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["duplicate_groups"], json!([[fox_a, fox_b]]));

    let (status, json) = call(&app, "POST", "/articles/check", Some(json!({ "content": "lazy dogs and quick brown foxes" }))).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<u64> = json.as_array().unwrap().iter().map(|h| h["id"].as_u64().unwrap()).collect();
    assert_eq!(ids, vec![fox_a, fox_b]);

    let (status, json) = call(&app, "PUT", &format!("/articles/{fox_b}"), Some(json!({ "content": "Bond yields fell sharply" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["duplicate_article_ids"], json!([]));
    let (_, json) = call(&app, "GET", "/duplicate_groups", None).await;
    assert_eq!(json["duplicate_groups"], json!([]));

    let (status, _) = call(&app, "DELETE", &format!("/articles/{fox_a}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = call(&app, "GET", &format!("/articles/{fox_a}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_articles_are_404() {
    let app = memory_app();
    let (status, _) = call(&app, "GET", "/articles/77", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = call(&app, "PUT", "/articles/77", Some(json!({ "content": "x" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = call(&app, "DELETE", "/articles/77", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn uninitialized_index_is_unavailable() {
    let service = DocumentService::new(
        Arc::new(MemoryRepository::new()),
        Arc::new(MemoryStore::new()),
        Arc::new(StemmingTokenizer),
        SimilarityConfig::default(),
    );
    let app = neardup_server::build_app(Arc::new(service));
    let (status, _) = call(&app, "POST", "/articles/check", Some(json!({ "content": "anything" }))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn app_from_data_dir_loads_stored_articles() {
    let dir = tempdir().unwrap();
    {
        let app = neardup_server::build_app_from_dir(dir.path(), SimilarityConfig::default()).unwrap();
        create(&app, "Stock markets rallied after the central bank announcement").await;
        create(&app, "The quick brown fox jumps over the lazy dog").await;
        create(&app, "A quick brown fox jumped over a lazy dog").await;
    }
    let app = neardup_server::build_app_from_dir(dir.path(), SimilarityConfig::default()).unwrap();
    let (_, json) = call(&app, "GET", "/duplicate_groups", None).await;
    assert_eq!(json["duplicate_groups"].as_array().unwrap().len(), 1);
}
