use anyhow::{Context, Result};
use axum::body::{Body, Bytes};
use axum::extract::{Path, State};
use axum::http::{header, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{routing::{get, post}, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use shelf_core::covers::{self, CoverStore};
use shelf_core::index::TfidfConfig;
use shelf_core::sanitize::{sanitize_value, ReviewSubmission};
use shelf_core::{
    CatalogIndex, InputError, MemoryReviewStore, NewReview, RecommendationResponse, Recommender, Review,
    ReviewStore, SledReviewStore, StorageError,
};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Everything `build_app` needs; assembled from CLI flags and environment by the binary.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// sled directory for reviews; `None` keeps reviews in memory.
    pub db_path: Option<PathBuf>,
    pub catalog_csv: PathBuf,
    /// Zip archive the catalog CSV is extracted from when the CSV is absent.
    pub catalog_archive: Option<PathBuf>,
    pub tfidf: TfidfConfig,
    pub uploads_dir: PathBuf,
    pub static_dir: Option<PathBuf>,
    /// Comma-separated origins; permissive when unset or empty.
    pub cors_allow_origin: Option<String>,
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ReviewStore>,
    pub recommender: Arc<Recommender>,
    pub covers: Arc<CoverStore>,
    pub static_dir: Option<Arc<PathBuf>>,
}

impl AppState {
    pub fn from_config(config: &ServerConfig) -> Result<Self> {
        let store: Arc<dyn ReviewStore> = match &config.db_path {
            Some(path) => Arc::new(
                SledReviewStore::open(path).with_context(|| format!("failed to open review store {}", path.display()))?,
            ),
            None => Arc::new(MemoryReviewStore::new()),
        };
        let catalog = CatalogIndex::load(&config.catalog_csv, config.catalog_archive.as_deref(), config.tfidf);
        tracing::info!(entries = catalog.len(), ready = catalog.is_ready(), "catalog index initialised");
        let covers = CoverStore::new(&config.uploads_dir)
            .with_context(|| format!("failed to create uploads dir {}", config.uploads_dir.display()))?;
        Ok(Self {
            store,
            recommender: Arc::new(Recommender::new(Arc::new(catalog), config.tfidf)),
            covers: Arc::new(covers),
            static_dir: config.static_dir.clone().map(Arc::new),
        })
    }
}

pub fn build_app(config: &ServerConfig) -> Result<Router> {
    let state = AppState::from_config(config)?;
    Ok(router(state, config.cors_allow_origin.as_deref()))
}

pub fn router(state: AppState, cors_allow_origin: Option<&str>) -> Router {
    // CORS: comma-separated allow list, or Any by default
    let origins: Vec<_> = cors_allow_origin
        .unwrap_or_default()
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();
    let cors = if origins.is_empty() {
        CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
    } else {
        CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
    };

    let mut app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/reviews", get(list_reviews).post(create_review))
        .route("/api/recommendations", post(recommendations))
        .route("/uploads/:name", get(cover_handler));
    if let Some(dir) = &state.static_dir {
        app = app.nest_service("/static", ServeDir::new(dir.as_ref()));
    }
    app.fallback(spa_fallback)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

#[derive(Debug)]
pub enum ApiError {
    InvalidJson,
    Input(InputError),
    Storage { message: &'static str, source: StorageError },
    Internal(&'static str),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::InvalidJson => (StatusCode::BAD_REQUEST, json!({ "error": "Invalid JSON" })),
            ApiError::Input(InputError::MissingFields(fields)) => {
                (StatusCode::BAD_REQUEST, json!({ "error": "Missing required fields", "fields": fields }))
            }
            ApiError::Input(err) => (StatusCode::BAD_REQUEST, json!({ "error": err.to_string() })),
            ApiError::Storage { message, source } => {
                tracing::error!(error = %source, message, "storage failure");
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": message, "detail": source.to_string() }))
            }
            ApiError::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": message })),
        };
        (status, Json(body)).into_response()
    }
}

#[derive(Serialize)]
pub struct ReviewView {
    pub id: u64,
    pub author: String,
    pub title: String,
    pub content: String,
    pub score: u8,
    pub cover_url: Option<String>,
    pub created_at: String,
}

impl From<Review> for ReviewView {
    fn from(r: Review) -> Self {
        let created_at = r.created_at_rfc3339();
        Self {
            id: r.id,
            author: r.author,
            title: r.title,
            content: r.content,
            score: r.score,
            cover_url: r.cover.as_deref().map(covers::public_url),
            created_at,
        }
    }
}

#[derive(Deserialize, Default)]
pub struct RecommendationRequest {
    #[serde(default)]
    pub query: Value,
}

async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|err| {
        tracing::error!(error = %err, "blocking task failed");
        ApiError::Internal("internal error")
    })
}

pub async fn list_reviews(State(state): State<AppState>) -> Result<Json<Vec<ReviewView>>, ApiError> {
    let store = state.store.clone();
    let reviews = blocking(move || store.list_all())
        .await?
        .map_err(|source| ApiError::Storage { message: "Failed to fetch reviews", source })?;
    Ok(Json(reviews.into_iter().map(ReviewView::from).collect()))
}

pub async fn create_review(State(state): State<AppState>, body: Bytes) -> Result<Json<Value>, ApiError> {
    let submission: ReviewSubmission = serde_json::from_slice(&body).map_err(|_| ApiError::InvalidJson)?;
    let valid = submission.validate().map_err(ApiError::Input)?;

    let store = state.store.clone();
    let cover_store = state.covers.clone();
    let stored = blocking(move || {
        let cover = valid.image.as_deref().and_then(|uri| match cover_store.save_data_uri(uri) {
            Ok(name) => name,
            Err(err) => {
                tracing::warn!(error = %err, "cover image not saved");
                None
            }
        });
        store.insert(NewReview {
            author: valid.author,
            title: valid.title,
            content: valid.content,
            score: valid.score,
            cover,
        })
    })
    .await?
    .map_err(|source| ApiError::Storage { message: "Failed to save review", source })?;

    tracing::info!(id = stored.id, score = stored.score, cover = stored.cover.is_some(), "review created");
    Ok(Json(json!({ "status": "success" })))
}

pub async fn recommendations(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<RecommendationResponse>, ApiError> {
    let request: RecommendationRequest = serde_json::from_slice(&body).map_err(|_| ApiError::InvalidJson)?;
    let query = sanitize_value(&request.query);

    let store = state.store.clone();
    let recommender = state.recommender.clone();
    let response = blocking(move || {
        let global = recommender.global(&query);
        let local = recommender.local_from_store(&query, &*store);
        shelf_core::Recommendations { global, local }.into_response()
    })
    .await?;
    Ok(Json(response))
}

pub async fn cover_handler(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    let Some(path) = state.covers.resolve(&name) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    match tokio::fs::read(&path).await {
        Ok(bytes) => ([(header::CONTENT_TYPE, covers::content_type(&name))], bytes).into_response(),
        Err(err) => {
            tracing::warn!(error = %err, path = %path.display(), "cover read failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Unknown non-API paths get the single-page app shell.
pub async fn spa_fallback(State(state): State<AppState>, uri: Uri) -> Response {
    if uri.path().starts_with("/api") {
        return StatusCode::NOT_FOUND.into_response();
    }
    let Some(dir) = &state.static_dir else {
        return StatusCode::NOT_FOUND.into_response();
    };
    match tokio::fs::read(dir.join("index.html")).await {
        Ok(bytes) => ([(header::CONTENT_TYPE, "text/html")], Body::from(bytes)).into_response(),
        Err(_) => StatusCode::NOT_FOUND.into_response(),
    }
}
