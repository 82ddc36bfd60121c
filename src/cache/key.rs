//! Cache Key Module
//!
//! Deterministic request fingerprints of the form `{view}_{lang}[_{segment}]_{page}`.

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::cache::MAX_KEY_LENGTH;
use crate::error::{CacheError, Result};

// == Cache Key ==
/// Fingerprint of a render target.
///
/// The string form is the identity; the parsed components are kept alongside
/// so the admission policy and producers never re-parse it.
#[derive(Debug, Clone)]
pub struct CacheKey {
    raw: String,
    view: String,
    lang: Option<String>,
    segment: Option<String>,
    page: u32,
}

impl CacheKey {
    // == Constructor ==
    /// Builds a key from its components in the fixed order view, lang, segment, page.
    pub fn new(view: &str, lang: &str, segment: Option<&str>, page: u32) -> Self {
        let raw = match segment {
            Some(segment) => format!("{}_{}_{}_{}", view, lang, segment, page),
            None => format!("{}_{}_{}", view, lang, page),
        };
        Self {
            raw,
            view: view.to_string(),
            lang: Some(lang.to_string()),
            segment: segment.map(str::to_string),
            page,
        }
    }

    /// Like [`CacheKey::new`], but refuses keys that [`CacheKey::parse`] would
    /// reject, so every key built from a request can later be invalidated by name.
    pub fn try_new(view: &str, lang: &str, segment: Option<&str>, page: u32) -> Result<Self> {
        let key = Self::new(view, lang, segment, page);
        check_length(&key.raw)?;
        Ok(key)
    }

    // == Parse ==
    /// Parses an arbitrary key string.
    ///
    /// The first component is the view. A trailing numeric component is the page
    /// (default 0). With three or more components the second is the language and
    /// everything in between is the segment. The input string is kept verbatim.
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.is_empty() {
            return Err(CacheError::InvalidRequest("Key cannot be empty".to_string()));
        }
        check_length(raw)?;

        let mut parts: Vec<&str> = raw.split('_').collect();
        let view = parts.remove(0).to_string();

        let page = match parts.last().and_then(|p| p.parse::<u32>().ok()) {
            Some(page) => {
                parts.pop();
                page
            }
            None => 0,
        };

        let lang = if parts.is_empty() {
            None
        } else {
            Some(parts.remove(0).to_string())
        };
        let segment = if parts.is_empty() {
            None
        } else {
            Some(parts.join("_"))
        };

        Ok(Self {
            raw: raw.to_string(),
            view,
            lang,
            segment,
            page,
        })
    }

    // == Accessors ==
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Key family; producers are registered per view.
    pub fn view(&self) -> &str {
        &self.view
    }

    pub fn lang(&self) -> Option<&str> {
        self.lang.as_deref()
    }

    pub fn segment(&self) -> Option<&str> {
        self.segment.as_deref()
    }

    /// Pagination depth, used by the admission policy.
    pub fn page(&self) -> u32 {
        self.page
    }
}

fn check_length(raw: &str) -> Result<()> {
    if raw.len() > MAX_KEY_LENGTH {
        return Err(CacheError::InvalidRequest(format!(
            "Key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        )));
    }
    Ok(())
}

impl PartialEq for CacheKey {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for CacheKey {}

impl Hash for CacheKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
