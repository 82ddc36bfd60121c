//! Feed Module
//!
//! Article storage and the view renderer that produces cached pages. The
//! in-memory store stands in for the document store the service reads from.

pub mod locale;
mod render;

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

pub use render::{register_views, NewsItem, NewsPage, ViewRenderer, VIEWS};

use crate::cache::CacheKey;
use locale::path_term;

/// Articles per rendered page.
pub const PAGE_SIZE: usize = 30;

/// Entries in the "most read" sidebar.
pub const MOST_READ_LIMIT: usize = 5;

/// Items returned by the JSON news lookup.
pub const NEWS_API_LIMIT: usize = 20;

// == Article ==
/// A single feed item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: String,
    pub title: String,
    pub link: String,
    pub source: String,
    pub category: String,
    pub language: String,
    pub published: DateTime<Utc>,
    #[serde(default)]
    pub clicks: u64,
}

// == Feed Store ==
/// Query surface of the article store. All listings are newest first.
#[async_trait]
pub trait FeedStore: Send + Sync {
    async fn latest(&self, lang: &str, page: u32, per_page: usize) -> Vec<Article>;
    async fn by_category(&self, lang: &str, category: &str, page: u32, per_page: usize) -> Vec<Article>;
    async fn by_source(&self, lang: &str, source: &str, page: u32, per_page: usize) -> Vec<Article>;
    async fn search(&self, lang: &str, query: &str, page: u32, per_page: usize) -> Vec<Article>;
    /// Most clicked articles for the language.
    async fn most_read(&self, lang: &str, limit: usize) -> Vec<Article>;
    /// English articles whose title contains every term, newest first.
    async fn news(&self, terms: &[String], limit: usize) -> Vec<Article>;
    /// Stores `article`, assigning an id when it has none. Returns the stored copy.
    async fn insert(&self, article: Article) -> Article;
    /// Bumps the click counter. `None` if no article has this id.
    async fn record_click(&self, id: &str) -> Option<Article>;
}

/// Cached pages that list `article`: the first `depth` pages of the home,
/// category and source views in its language.
pub fn affected_keys(article: &Article, depth: u32) -> Vec<CacheKey> {
    let lang = article.language.as_str();
    let category = path_term(&article.category);
    let source = path_term(&article.source);

    (0..depth)
        .flat_map(|page| {
            [
                CacheKey::try_new("home", lang, None, page),
                CacheKey::try_new("cat", lang, Some(&category), page),
                CacheKey::try_new("source", lang, Some(&source), page),
            ]
        })
        .filter_map(|key| key.ok())
        .collect()
}

// == Memory Feed Store ==
#[derive(Debug, Default)]
pub struct MemoryFeedStore {
    articles: RwLock<Vec<Article>>,
}

impl MemoryFeedStore {
    pub fn new(articles: Vec<Article>) -> Self {
        Self {
            articles: RwLock::new(articles),
        }
    }

    async fn page_where<P>(&self, page: u32, per_page: usize, predicate: P) -> Vec<Article>
    where
        P: Fn(&Article) -> bool,
    {
        let articles = self.articles.read().await;
        let mut matching: Vec<&Article> = articles.iter().filter(|a| predicate(a)).collect();
        matching.sort_by(|a, b| b.published.cmp(&a.published));
        matching
            .into_iter()
            .skip(page as usize * per_page)
            .take(per_page)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl FeedStore for MemoryFeedStore {
    async fn latest(&self, lang: &str, page: u32, per_page: usize) -> Vec<Article> {
        self.page_where(page, per_page, |a| a.language == lang).await
    }

    async fn by_category(&self, lang: &str, category: &str, page: u32, per_page: usize) -> Vec<Article> {
        self.page_where(page, per_page, |a| a.language == lang && a.category == category)
            .await
    }

    async fn by_source(&self, lang: &str, source: &str, page: u32, per_page: usize) -> Vec<Article> {
        self.page_where(page, per_page, |a| a.language == lang && a.source == source)
            .await
    }

    async fn search(&self, lang: &str, query: &str, page: u32, per_page: usize) -> Vec<Article> {
        let needle = query.to_lowercase();
        self.page_where(page, per_page, |a| {
            a.language == lang && a.title.to_lowercase().contains(&needle)
        })
        .await
    }

    async fn most_read(&self, lang: &str, limit: usize) -> Vec<Article> {
        let articles = self.articles.read().await;
        let mut matching: Vec<&Article> = articles.iter().filter(|a| a.language == lang).collect();
        matching.sort_by(|a, b| b.clicks.cmp(&a.clicks).then(b.published.cmp(&a.published)));
        matching.into_iter().take(limit).cloned().collect()
    }

    async fn news(&self, terms: &[String], limit: usize) -> Vec<Article> {
        let needles: Vec<String> = terms.iter().map(|t| t.to_lowercase()).collect();
        let mut found = self
            .page_where(0, limit, |a| {
                let title = a.title.to_lowercase();
                a.language == "en" && needles.iter().all(|n| title.contains(n.as_str()))
            })
            .await;
        found.truncate(limit);
        found
    }

    async fn insert(&self, mut article: Article) -> Article {
        let mut articles = self.articles.write().await;
        if article.id.is_empty() {
            article.id = format!("a{}", articles.len());
        }
        articles.push(article.clone());
        article
    }

    async fn record_click(&self, id: &str) -> Option<Article> {
        let mut articles = self.articles.write().await;
        let article = articles.iter_mut().find(|a| a.id == id)?;
        article.clicks += 1;
        Some(article.clone())
    }
}

/// A small fixed article set so the server renders something out of the box.
pub fn sample_articles() -> Vec<Article> {
    let now = Utc::now();
    let rows = [
        ("Jääkiekon MM-kisat alkavat", "Urheilu", "Yle", "fi", 120),
        ("Uusi puhelin julkaistiin", "Digi", "Helsingin Sanomat", "fi", 40),
        ("Keskuspankki piti koron ennallaan", "Talous", "Yle", "fi", 75),
        ("Kesän parhaat matkakohteet", "Matkustus", "Iltalehti", "fi", 12),
        ("Ice hockey world championship begins", "Urheilu", "BBC", "en", 98),
        ("New phone released", "Digi", "The Verge", "en", 33),
        ("Central bank holds rates", "Talous", "BBC", "en", 54),
        ("Best summer destinations", "Matkustus", "Guardian", "en", 8),
    ];

    rows.iter()
        .enumerate()
        .map(|(i, (title, category, source, lang, clicks))| Article {
            id: format!("a{}", i),
            title: title.to_string(),
            link: format!("https://example.com/{}/{}", lang, i),
            source: source.to_string(),
            category: category.to_string(),
            language: lang.to_string(),
            published: now - ChronoDuration::minutes(i as i64 * 10),
            clicks: *clicks,
        })
        .collect()
}
