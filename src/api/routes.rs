//! API Routes
//!
//! Configures the Axum router with the view and cache admin endpoints.

use axum::{
    routing::{delete, get},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    category_handler, category_page_handler, click_handler, entries_handler, health_handler,
    home_handler, home_page_handler, ingest_handler, invalidate_handler, news_handler,
    root_handler, search_handler, source_handler, source_page_handler, stats_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /` - Redirect to `/en` or `/fi` by `Accept-Language`
/// - `GET /:lang` and `GET /:lang/:page` - Home view
/// - `GET /:lang/category/:category[/:page]` - Category view
/// - `GET /:lang/source/:source[/:page]` - Source view
/// - `GET /:lang/search?q=..&page=..` - Search (never cached)
/// - `GET /api/news?q=a,b` - English articles matching the terms
/// - `POST /api/news` - Add an article and invalidate the pages listing it
/// - `GET /api/click/:id` - Count a click
/// - `DELETE /cache/:key` - Invalidate one entry
/// - `GET /cache/entries` - Inspect resident entries
/// - `GET /stats` - Cache statistics
/// - `GET /health` - Health check endpoint
///
/// Static segments win over parameters, so `/stats` and `/api/..` are never
/// read as a language.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
        .route("/cache/entries", get(entries_handler))
        .route("/cache/:key", delete(invalidate_handler))
        .route("/api/news", get(news_handler).post(ingest_handler))
        .route("/api/click/:id", get(click_handler))
        .route("/:lang", get(home_handler))
        .route("/:lang/:page", get(home_page_handler))
        .route("/:lang/search", get(search_handler))
        .route("/:lang/category/:category", get(category_handler))
        .route("/:lang/category/:category/:page", get(category_page_handler))
        .route("/:lang/source/:source", get(source_handler))
        .route("/:lang/source/:source/:page", get(source_page_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::feed::{sample_articles, FeedStore, MemoryFeedStore};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use std::sync::Arc;
    use tower::util::ServiceExt;

    fn create_test_app() -> Router {
        let feed: Arc<dyn FeedStore> = Arc::new(MemoryFeedStore::new(sample_articles()));
        create_router(AppState::from_config(&Config::default(), feed))
    }

    async fn status_of(app: Router, method: &str, uri: &str) -> StatusCode {
        app.oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
        .status()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        assert_eq!(status_of(create_test_app(), "GET", "/health").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_stats_endpoint() {
        assert_eq!(status_of(create_test_app(), "GET", "/stats").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_view_endpoints() {
        let app = create_test_app();
        for uri in [
            "/fi",
            "/en/1",
            "/fi/category/Urheilu",
            "/en/category/talous/2",
            "/en/source/BBC",
            "/fi/source/Yle/0",
            "/fi/search?q=koron",
        ] {
            assert_eq!(status_of(app.clone(), "GET", uri).await, StatusCode::OK, "{}", uri);
        }
    }

    #[tokio::test]
    async fn test_bad_requests() {
        let app = create_test_app();
        assert_eq!(status_of(app.clone(), "GET", "/sv").await, StatusCode::BAD_REQUEST);
        assert_eq!(status_of(app.clone(), "GET", "/fi/999").await, StatusCode::BAD_REQUEST);
        assert_eq!(status_of(app, "GET", "/fi/search").await, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_root_redirects() {
        assert_eq!(status_of(create_test_app(), "GET", "/").await, StatusCode::FOUND);
    }

    #[tokio::test]
    async fn test_feed_api_endpoints() {
        let app = create_test_app();
        assert_eq!(status_of(app.clone(), "GET", "/api/news?q=bank").await, StatusCode::OK);
        assert_eq!(status_of(app.clone(), "GET", "/api/click/a1").await, StatusCode::OK);
        assert_eq!(
            status_of(app, "GET", "/api/click/missing").await,
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn test_invalidate_not_found() {
        let app = create_test_app();
        assert_eq!(
            status_of(app, "DELETE", "/cache/home_fi_0").await,
            StatusCode::NOT_FOUND
        );
    }
}
