//! API Handlers
//!
//! HTTP request handlers for the rendered views, the feed API and the cache
//! admin endpoints. View handlers validate the path, build the cache key and
//! answer with the artifact bytes exactly as the producer rendered them.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use tracing::info;

use crate::cache::{ArtifactCache, CacheKey, ProducerRegistry};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::feed::locale::sanitize_term;
use crate::feed::{affected_keys, register_views, FeedStore, ViewRenderer, NEWS_API_LIMIT};
use crate::models::{
    ClickResponse, EntriesResponse, HealthResponse, IngestRequest, IngestResponse,
    InvalidateResponse, NewsItemsResponse, NewsParams, SearchParams, StatsResponse, ViewRequest,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Shared artifact cache
    pub cache: Arc<ArtifactCache>,
    /// Article store the views are rendered from
    pub feed: Arc<dyn FeedStore>,
}

impl AppState {
    /// Creates a new AppState around an existing cache and feed.
    pub fn new(cache: Arc<ArtifactCache>, feed: Arc<dyn FeedStore>) -> Self {
        Self { cache, feed }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Registers the view renderer over `feed` for every view family.
    pub fn from_config(config: &Config, feed: Arc<dyn FeedStore>) -> Self {
        let mut producers = ProducerRegistry::new();
        register_views(&mut producers, ViewRenderer::new(Arc::clone(&feed)));
        Self::new(ArtifactCache::shared(config.cache_settings(), producers), feed)
    }
}

/// Serves one view through the cache.
async fn serve_view(state: &AppState, request: ViewRequest) -> Result<Response> {
    let body = state.cache.fetch(request.cache_key()).await?;
    Ok(json_bytes(body))
}

fn json_bytes(body: Bytes) -> Response {
    ([(header::CONTENT_TYPE, "application/json")], body).into_response()
}

// == View Handlers ==

/// Handler for GET /
///
/// Redirects to the English front page when the browser accepts English,
/// otherwise to the Finnish one.
pub async fn root_handler(headers: HeaderMap) -> Response {
    let accepts_english = headers
        .get(header::ACCEPT_LANGUAGE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.contains("en"));
    let target = if accepts_english { "/en" } else { "/fi" };
    (StatusCode::FOUND, [(header::LOCATION, target)]).into_response()
}

/// Handler for GET /:lang
pub async fn home_handler(
    State(state): State<AppState>,
    Path(lang): Path<String>,
) -> Result<Response> {
    serve_view(&state, ViewRequest::new("home", &lang, None, None)?).await
}

/// Handler for GET /:lang/:page
pub async fn home_page_handler(
    State(state): State<AppState>,
    Path((lang, page)): Path<(String, String)>,
) -> Result<Response> {
    serve_view(&state, ViewRequest::new("home", &lang, None, Some(&page))?).await
}

/// Handler for GET /:lang/category/:category
pub async fn category_handler(
    State(state): State<AppState>,
    Path((lang, category)): Path<(String, String)>,
) -> Result<Response> {
    serve_view(&state, ViewRequest::new("cat", &lang, Some(&category), None)?).await
}

/// Handler for GET /:lang/category/:category/:page
pub async fn category_page_handler(
    State(state): State<AppState>,
    Path((lang, category, page)): Path<(String, String, String)>,
) -> Result<Response> {
    let request = ViewRequest::new("cat", &lang, Some(&category), Some(&page))?;
    serve_view(&state, request).await
}

/// Handler for GET /:lang/source/:source
pub async fn source_handler(
    State(state): State<AppState>,
    Path((lang, source)): Path<(String, String)>,
) -> Result<Response> {
    serve_view(&state, ViewRequest::new("source", &lang, Some(&source), None)?).await
}

/// Handler for GET /:lang/source/:source/:page
pub async fn source_page_handler(
    State(state): State<AppState>,
    Path((lang, source, page)): Path<(String, String, String)>,
) -> Result<Response> {
    let request = ViewRequest::new("source", &lang, Some(&source), Some(&page))?;
    serve_view(&state, request).await
}

/// Handler for GET /:lang/search?q=..&page=..
///
/// Search results are never cached; every call reaches the renderer.
pub async fn search_handler(
    State(state): State<AppState>,
    Path(lang): Path<String>,
    Query(params): Query<SearchParams>,
) -> Result<Response> {
    let query = params.q.as_deref().unwrap_or_default();
    let request = ViewRequest::new("search", &lang, Some(query), params.page.as_deref())?;
    serve_view(&state, request).await
}

// == Feed API Handlers ==

/// Handler for GET /api/news?q=a,b
///
/// English articles matching every comma separated term. Not cached.
pub async fn news_handler(
    State(state): State<AppState>,
    Query(params): Query<NewsParams>,
) -> Json<NewsItemsResponse> {
    let items = state.feed.news(&params.terms(), NEWS_API_LIMIT).await;
    Json(NewsItemsResponse { items })
}

/// Handler for POST /api/news
///
/// Stores the article, then drops every cached page that would list it so the
/// next request renders it in.
pub async fn ingest_handler(
    State(state): State<AppState>,
    Json(payload): Json<IngestRequest>,
) -> Result<(StatusCode, Json<IngestResponse>)> {
    if let Some(error) = payload.validate() {
        return Err(CacheError::InvalidRequest(error));
    }

    let article = state.feed.insert(payload.into_article()).await;
    let depth = state.cache.admission().max_page_depth();
    let invalidated: Vec<String> = affected_keys(&article, depth)
        .into_iter()
        .filter(|key| state.cache.invalidate(key))
        .map(|key| key.to_string())
        .collect();

    info!(
        id = %article.id,
        invalidated = invalidated.len(),
        "Article stored"
    );
    Ok((
        StatusCode::CREATED,
        Json(IngestResponse::new(article.id, invalidated)),
    ))
}

/// Handler for GET /api/click/:id
///
/// Cached pages are left alone; the most-read sidebar catches up on the next
/// refresh.
pub async fn click_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ClickResponse>> {
    let id = sanitize_term(&id);
    let article = state
        .feed
        .record_click(&id)
        .await
        .ok_or_else(|| CacheError::NotFound(format!("Article '{}' not found", id)))?;
    Ok(Json(ClickResponse {
        id: article.id,
        clicks: article.clicks,
    }))
}

// == Admin Handlers ==

/// Handler for DELETE /cache/:key
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<InvalidateResponse>> {
    let key = CacheKey::parse(&key)?;
    if !state.cache.invalidate(&key) {
        return Err(CacheError::NotFound(format!("Key '{}' not found", key)));
    }
    Ok(Json(InvalidateResponse::new(key.as_str())))
}

/// Handler for GET /cache/entries
pub async fn entries_handler(State(state): State<AppState>) -> Json<EntriesResponse> {
    Json(EntriesResponse::new(
        state.cache.entries(),
        state.cache.settings().capacity,
    ))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::new(state.cache.stats()))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
