use anyhow::Result;
use axum::{extract::{Path, Query, State}, http::{HeaderMap, StatusCode}, routing::{get, post}, Json, Router};
use parking_lot::RwLock;
use quarry_core::persist::{load_index, IndexPaths};
use quarry_core::tokenizer::Tokenizer;
use quarry_core::{QueryEngine, SearchConfig};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer, AllowOrigin};
use tower_http::trace::TraceLayer;

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default = "default_k")]
    pub k: usize,
}
fn default_k() -> usize { 10 }

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_s: f64,
    pub total_hits: usize,
    pub phrase_hits: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
pub struct SearchHit {
    pub doc_id: String,
    pub score: f64,
    pub phrase_match: bool,
}

#[derive(Serialize)]
pub struct DocResponse {
    pub doc_id: String,
    pub token_count: usize,
    pub distinct_terms: usize,
    pub top_terms: Vec<(String, f64)>,
}

#[derive(Clone)]
pub struct AppState {
    pub index_root: PathBuf,
    pub search_config: SearchConfig,
    /// Current read-only snapshot; reload swaps the inner Arc.
    pub engine: Arc<RwLock<Arc<QueryEngine>>>,
    pub admin_token: Option<String>,
}

impl AppState {
    pub fn open(index_dir: &str, search_config: SearchConfig, admin_token: Option<String>) -> Result<Self> {
        let index_root = PathBuf::from(index_dir);
        let engine = open_engine(&index_root, search_config.clone())?;
        Ok(Self { index_root, search_config, engine: Arc::new(RwLock::new(Arc::new(engine))), admin_token })
    }

    fn snapshot(&self) -> Arc<QueryEngine> { self.engine.read().clone() }
}

fn open_engine(index_root: &std::path::Path, config: SearchConfig) -> Result<QueryEngine> {
    let (index, meta) = load_index(&IndexPaths::new(index_root))?;
    tracing::info!(num_docs = index.num_docs(), num_terms = index.inverted.num_terms(), created_at = %meta.created_at, "index loaded");
    Ok(QueryEngine::new(index, Tokenizer::new(meta.tokenizer), config))
}

pub fn build_app(index_dir: String, search_config: SearchConfig) -> Result<Router> {
    let admin_token = std::env::var("ADMIN_TOKEN").ok();
    Ok(router(AppState::open(&index_dir, search_config, admin_token)?))
}

pub fn router(app_state: AppState) -> Router {
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
        .route("/index/reload", post(reload_handler))
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn search_handler(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Json<SearchResponse> {
    let start = std::time::Instant::now();
    let engine = state.snapshot();
    let ranked = engine.query(&params.q);

    let total_hits = ranked.len();
    let phrase_hits = ranked.iter().filter(|h| h.phrase_match).count();
    let k = params.k.clamp(1, 100);
    let results = ranked
        .into_iter()
        .take(k)
        .map(|h| SearchHit { doc_id: h.doc_id, score: h.score, phrase_match: h.phrase_match })
        .collect();

    let took_s = start.elapsed().as_secs_f64();
    tracing::debug!(query = %params.q, total_hits, took_s, "search served");
    Json(SearchResponse { query: params.q, took_s, total_hits, phrase_hits, results })
}

pub async fn doc_handler(State(state): State<AppState>, Path(doc_id): Path<String>) -> Result<Json<DocResponse>, (StatusCode, Json<serde_json::Value>)> {
    let engine = state.snapshot();
    let index = engine.index();
    let (Some(terms), Some(token_count)) = (index.term_frequency.document(&doc_id), index.doc_length(&doc_id)) else {
        return Err((StatusCode::NOT_FOUND, Json(serde_json::json!({ "error": "not found" }))));
    };
    let mut top_terms: Vec<(String, f64)> = terms.iter().map(|(t, f)| (t.clone(), *f)).collect();
    top_terms.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    top_terms.truncate(20);
    Ok(Json(DocResponse { doc_id, token_count, distinct_terms: terms.len(), top_terms }))
}

async fn reload_handler(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    authorize(&state, &headers)?;
    let root = state.index_root.clone();
    let config = state.search_config.clone();
    let engine = tokio::task::spawn_blocking(move || open_engine(&root, config))
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .map_err(|e| {
            tracing::error!(error = %format!("{e:#}"), "index reload failed");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}"))
        })?;
    let num_docs = engine.index().num_docs();
    *state.engine.write() = Arc::new(engine);
    Ok(Json(serde_json::json!({ "reloaded": true, "num_docs": num_docs })))
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), (StatusCode, String)> {
    let required = match &state.admin_token {
        Some(t) => t,
        None => return Err((StatusCode::UNAUTHORIZED, "ADMIN_TOKEN not set".into())),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, "invalid admin token".into()))
    }
}
