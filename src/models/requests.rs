//! Request DTOs for the render API
//!
//! Defines incoming query parameters, the ingest body and the validated view
//! request built from path segments.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::cache::CacheKey;
use crate::error::{CacheError, Result};
use crate::feed::Article;
use crate::feed::locale::{is_supported_language, path_term, sanitize_term};

/// Pages at or beyond this number are rejected.
pub const MAX_PAGE: u32 = 999;

/// Query string of the search view (`GET /:lang/search?q=..&page=..`)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchParams {
    /// Search terms
    #[serde(default)]
    pub q: Option<String>,
    /// Page number
    #[serde(default)]
    pub page: Option<String>,
}

/// Query string of the JSON news lookup (`GET /api/news?q=a,b`)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewsParams {
    /// Comma separated search terms
    #[serde(default)]
    pub q: Option<String>,
}

impl NewsParams {
    /// Sanitized terms. Terms that sanitize to nothing are dropped.
    pub fn terms(&self) -> Vec<String> {
        self.q
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(sanitize_term)
            .filter(|term| !term.is_empty())
            .collect()
    }
}

/// Request body for adding an article (`POST /api/news`)
#[derive(Debug, Clone, Deserialize)]
pub struct IngestRequest {
    pub title: String,
    pub link: String,
    pub source: String,
    pub category: String,
    pub language: String,
    /// Publication time; defaults to now
    #[serde(default)]
    pub published: Option<DateTime<Utc>>,
}

impl IngestRequest {
    /// Validates the request
    ///
    /// Returns an error message if validation fails, None otherwise.
    pub fn validate(&self) -> Option<String> {
        if self.title.trim().is_empty() {
            return Some("Title cannot be empty".to_string());
        }
        if self.link.trim().is_empty() {
            return Some("Link cannot be empty".to_string());
        }
        if !is_supported_language(&self.language) {
            return Some(format!("Unsupported language '{}'", self.language));
        }
        if path_term(&self.category).is_empty() {
            return Some("Category cannot be empty".to_string());
        }
        if path_term(&self.source).is_empty() {
            return Some("Source cannot be empty".to_string());
        }
        None
    }

    /// Builds the article to store. Category and source are normalized the
    /// same way view paths are, so the article lands on the pages that list it.
    pub fn into_article(self) -> Article {
        Article {
            id: String::new(),
            title: self.title.trim().to_string(),
            link: self.link.trim().to_string(),
            source: path_term(&self.source),
            category: path_term(&self.category),
            language: self.language,
            published: self.published.unwrap_or_else(Utc::now),
            clicks: 0,
        }
    }
}

/// A validated view request and the cache key it maps to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewRequest {
    pub view: String,
    pub lang: String,
    pub segment: Option<String>,
    pub page: u32,
    key: CacheKey,
}

impl ViewRequest {
    /// Validates raw path values.
    ///
    /// `segment` is sanitized; category and source names are also capitalized
    /// so `/fi/category/urheilu` and `/fi/category/Urheilu` share a key. Keys
    /// longer than the store accepts by name are refused up front.
    pub fn new(view: &str, lang: &str, segment: Option<&str>, page: Option<&str>) -> Result<Self> {
        if !is_supported_language(lang) {
            return Err(CacheError::InvalidRequest(format!(
                "Unsupported language '{}'",
                lang
            )));
        }

        let segment = match segment {
            Some(raw) => {
                let cleaned = sanitize_term(raw);
                if cleaned.is_empty() {
                    return Err(CacheError::InvalidRequest(
                        "Path term cannot be empty".to_string(),
                    ));
                }
                Some(if view == "search" {
                    cleaned
                } else {
                    path_term(&cleaned)
                })
            }
            None => None,
        };

        let page = parse_page(page)?;
        let key = CacheKey::try_new(view, lang, segment.as_deref(), page)?;

        Ok(Self {
            view: view.to_string(),
            lang: lang.to_string(),
            segment,
            page,
            key,
        })
    }

    pub fn cache_key(&self) -> &CacheKey {
        &self.key
    }
}

/// Parses an optional page parameter; absent means the first page.
pub fn parse_page(raw: Option<&str>) -> Result<u32> {
    let Some(raw) = raw else {
        return Ok(0);
    };
    match raw.parse::<u32>() {
        Ok(page) if page < MAX_PAGE => Ok(page),
        _ => Err(CacheError::InvalidRequest(format!(
            "Page must be a number between 0 and {}",
            MAX_PAGE - 1
        ))),
    }
}
