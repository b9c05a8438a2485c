use anyhow::Result;
use axum::{extract::{Path, Query, State}, http::StatusCode, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use sift_core::persist::IndexPaths;
use sift_core::search::RankedDoc;
use sift_core::{DocId, RankingModel, SearchIndex};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default = "default_k")]
    pub k: usize,
    #[serde(default)]
    pub model: Option<String>,
}
fn default_k() -> usize { 10 }

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub model: String,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<RankedDoc>,
}

#[derive(Serialize)]
pub struct DocResponse {
    pub doc_id: DocId,
    pub name: String,
    pub length: u32,
    pub distinct_terms: usize,
}

type ApiError = (StatusCode, Json<serde_json::Value>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(serde_json::json!({ "error": message.into() })))
}

#[derive(Clone)]
pub struct AppState {
    pub index: Arc<SearchIndex>,
}

pub fn build_app(index_dir: impl AsRef<std::path::Path>) -> Result<Router> {
    let index = SearchIndex::open(IndexPaths::new(index_dir))?;
    Ok(app_for_index(Arc::new(index)))
}

pub fn app_for_index(index: Arc<SearchIndex>) -> Router {
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
        .route("/search", get(search_handler))
        .route("/doc/:doc_id", get(doc_handler))
        .with_state(AppState { index })
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let start = std::time::Instant::now();
    let model = match params.model.as_deref() {
        Some(m) => m.parse::<RankingModel>().map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?,
        None => RankingModel::default(),
    };

    // scoring reads the inverted index from disk
    let index = state.index.clone();
    let text = params.q.clone();
    let mut hits = tokio::task::spawn_blocking(move || index.search(&text, model, None))
        .await
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .map_err(|e| {
            tracing::error!(error = %e, query = %params.q, "search failed");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "search failed")
        })?;

    let total_hits = hits.len();
    hits.truncate(params.k.clamp(1, 100));
    let elapsed = start.elapsed();
    tracing::debug!(query = %params.q, %model, total_hits, "search served");
    Ok(Json(SearchResponse {
        query: params.q,
        model: model.to_string(),
        took_s: elapsed.as_secs_f64(),
        total_hits,
        results: hits,
    }))
}

pub async fn doc_handler(State(state): State<AppState>, Path(doc_id): Path<DocId>) -> Result<Json<DocResponse>, ApiError> {
    let index = &state.index;
    let Some(name) = index.documents().name(doc_id) else {
        return Err(api_error(StatusCode::NOT_FOUND, "not found"));
    };
    Ok(Json(DocResponse {
        doc_id,
        name: name.to_string(),
        length: index.stats().doc_length(doc_id),
        distinct_terms: index.stats().doc_terms(doc_id).len(),
    }))
}
