//! View rendering: turns a producer recipe into a JSON page.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use tracing::debug;

use super::locale::{en_category_name, is_supported_language};
use super::{Article, FeedStore, MOST_READ_LIMIT, PAGE_SIZE};
use crate::cache::{CacheKey, Producer, ProducerRegistry};
use crate::error::ProducerError;

/// Key families rendered by [`ViewRenderer`].
pub const VIEWS: &[&str] = &["home", "cat", "source", "search"];

// == Rendered Page ==
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsItem {
    #[serde(flatten)]
    pub article: Article,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_en_name: Option<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsPage {
    pub view: String,
    pub lang: String,
    pub page: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_en_name: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    pub result_count: usize,
    pub news: Vec<NewsItem>,
    pub most_read: Vec<NewsItem>,
}

// == View Renderer ==
/// Producer for the `home`, `cat`, `source` and `search` views.
///
/// Arguments are `[lang, page]` for the home view and `[lang, segment, page]`
/// for the others, as derived from the cache key.
#[derive(Clone)]
pub struct ViewRenderer {
    store: Arc<dyn FeedStore>,
}

impl ViewRenderer {
    pub fn new(store: Arc<dyn FeedStore>) -> Self {
        Self { store }
    }

    async fn render(&self, view: &str, args: &[String]) -> Result<NewsPage, ProducerError> {
        let (lang, segment, page) = split_args(args)?;
        if !is_supported_language(lang) {
            return Err(ProducerError::failed(format!("Unsupported language '{}'", lang)));
        }

        let news = match (view, segment) {
            ("home", _) => self.store.latest(lang, page, PAGE_SIZE).await,
            ("cat", Some(category)) => self.store.by_category(lang, category, page, PAGE_SIZE).await,
            ("source", Some(source)) => self.store.by_source(lang, source, page, PAGE_SIZE).await,
            ("search", Some(query)) => self.store.search(lang, query, page, PAGE_SIZE).await,
            ("search", None) => Vec::new(),
            (view, _) => {
                return Err(ProducerError::failed(format!(
                    "Cannot render view '{}' with args {:?}",
                    view, args
                )))
            }
        };
        let most_read = self.store.most_read(lang, MOST_READ_LIMIT).await;

        let category = (view == "cat").then(|| segment.unwrap_or_default().to_string());
        let category_en_name = match (&category, lang) {
            (Some(category), "en") => en_category_name(category),
            _ => None,
        };

        Ok(NewsPage {
            view: view.to_string(),
            lang: lang.to_string(),
            page,
            category,
            category_en_name,
            source: (view == "source").then(|| segment.unwrap_or_default().to_string()),
            query: (view == "search").then(|| segment.unwrap_or_default().to_string()),
            result_count: news.len(),
            news: localize(news, lang),
            most_read: localize(most_read, lang),
        })
    }
}

#[async_trait]
impl Producer for ViewRenderer {
    async fn produce(&self, key: &CacheKey, args: &[String]) -> Result<Bytes, ProducerError> {
        let page = self.render(key.view(), args).await?;
        debug!(key = %key, results = page.result_count, "Rendered view");
        serde_json::to_vec(&page)
            .map(Bytes::from)
            .map_err(|e| ProducerError::failed(format!("Serializing page failed: {}", e)))
    }
}

/// Registers `renderer` for every view it can render.
pub fn register_views(registry: &mut ProducerRegistry, renderer: ViewRenderer) {
    let renderer: Arc<dyn Producer> = Arc::new(renderer);
    for view in VIEWS {
        registry.register(*view, Arc::clone(&renderer));
    }
}

fn split_args(args: &[String]) -> Result<(&str, Option<&str>, u32), ProducerError> {
    let parse_page = |raw: &str| {
        raw.parse::<u32>()
            .map_err(|_| ProducerError::failed(format!("Invalid page '{}'", raw)))
    };
    match args {
        [lang, page] => Ok((lang.as_str(), None, parse_page(page.as_str())?)),
        [lang, segment, page] => Ok((
            lang.as_str(),
            Some(segment.as_str()),
            parse_page(page.as_str())?,
        )),
        _ => Err(ProducerError::failed(format!("Unexpected view arguments {:?}", args))),
    }
}

fn localize(articles: Vec<Article>, lang: &str) -> Vec<NewsItem> {
    articles
        .into_iter()
        .map(|article| {
            let category_en_name = if lang == "en" {
                en_category_name(&article.category)
            } else {
                None
            };
            NewsItem {
                article,
                category_en_name,
            }
        })
        .collect()
}
