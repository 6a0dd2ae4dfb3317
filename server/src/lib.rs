use anyhow::Result;
use axum::{extract::{Path, Query, State}, http::StatusCode, routing::{get, post}, Json, Router};
use neardup_core::tokenizer::StemmingTokenizer;
use neardup_core::{persist, DocId, DocumentRecord, DocumentService, DocumentView, Error, SimilarityConfig};
use serde::{Deserialize, Serialize};
use std::path::Path as FsPath;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Deserialize)]
pub struct ListParams {
    #[serde(default = "default_unique_only")]
    pub unique_only: bool,
}
fn default_unique_only() -> bool { true }

#[derive(Deserialize)]
pub struct ContentBody {
    pub content: String,
}

#[derive(Serialize)]
pub struct CheckHit {
    pub id: DocId,
    pub content: String,
    pub created_at: String,
    pub updated_at: Option<String>,
}

impl From<DocumentRecord> for CheckHit {
    fn from(r: DocumentRecord) -> Self {
        Self { id: r.id, content: r.content, created_at: r.created_at, updated_at: r.updated_at }
    }
}

#[derive(Serialize)]
pub struct GroupsResponse {
    pub duplicate_groups: Vec<Vec<DocId>>,
}

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<DocumentService>,
}

type ApiResult<T> = std::result::Result<Json<T>, (StatusCode, String)>;

fn to_http(err: Error) -> (StatusCode, String) {
    let status = match &err {
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::NotInitialized => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        tracing::error!(%err, "request failed");
    }
    (status, err.to_string())
}

/// Open the sled data directory, load every stored document into the similarity
/// index and build the router. Returns only once the index is ready.
pub fn build_app_from_dir<P: AsRef<FsPath>>(data_dir: P, config: SimilarityConfig) -> Result<Router> {
    let (store, repository) = persist::open(data_dir)?;
    let service = DocumentService::new(repository, store, Arc::new(StemmingTokenizer), config);
    service.init()?;
    Ok(build_app(Arc::new(service)))
}

pub fn build_app(service: Arc<DocumentService>) -> Router {
    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/articles", get(list_handler).post(create_handler))
        .route("/articles/check", post(check_handler))
        .route("/articles/:id", get(get_handler).put(update_handler).delete(delete_handler))
        .route("/duplicate_groups", get(groups_handler))
        .with_state(AppState { service })
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn list_handler(State(state): State<AppState>, Query(params): Query<ListParams>) -> ApiResult<Vec<DocumentView>> {
    state.service.list(params.unique_only).map(Json).map_err(to_http)
}

pub async fn get_handler(State(state): State<AppState>, Path(id): Path<DocId>) -> ApiResult<DocumentView> {
    state.service.get(id).map(Json).map_err(to_http)
}

pub async fn create_handler(State(state): State<AppState>, Json(body): Json<ContentBody>) -> ApiResult<DocumentView> {
    state.service.create(&body.content).map(Json).map_err(to_http)
}

pub async fn update_handler(State(state): State<AppState>, Path(id): Path<DocId>, Json(body): Json<ContentBody>) -> ApiResult<DocumentView> {
    state.service.update(id, &body.content).map(Json).map_err(to_http)
}

pub async fn delete_handler(State(state): State<AppState>, Path(id): Path<DocId>) -> std::result::Result<StatusCode, (StatusCode, String)> {
    state.service.remove(id).map_err(to_http)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Duplicates of a text that is not stored.
pub async fn check_handler(State(state): State<AppState>, Json(body): Json<ContentBody>) -> ApiResult<Vec<CheckHit>> {
    let hits = state.service.check(&body.content).map_err(to_http)?;
    Ok(Json(hits.into_iter().map(CheckHit::from).collect()))
}

pub async fn groups_handler(State(state): State<AppState>) -> ApiResult<GroupsResponse> {
    let groups = state.service.duplicate_groups().map_err(to_http)?;
    let duplicate_groups = groups.into_iter().map(|g| g.into_iter().collect()).collect();
    Ok(Json(GroupsResponse { duplicate_groups }))
}
