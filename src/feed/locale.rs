//! Localization helpers: supported languages, category name translations and
//! cleanup of user-supplied path/query terms.

use std::sync::OnceLock;

use regex::Regex;

/// Languages the views are rendered in.
pub const SUPPORTED_LANGUAGES: &[&str] = &["fi", "en"];

pub fn is_supported_language(lang: &str) -> bool {
    SUPPORTED_LANGUAGES.contains(&lang)
}

/// English display name for a Finnish category, if one exists.
pub fn en_category_name(category: &str) -> Option<&'static str> {
    let name = match category {
        "Digi" => "Tech",
        "Elokuvat" => "Movies",
        "Koti" => "Home",
        "Kotimaa" => "Domestic",
        "Kulttuuri" => "Culture",
        "Matkustus" => "Travel",
        "Pelit" => "Games",
        "Ruoka" => "Food",
        "Talous" => "Economy",
        "Terveys" => "Health",
        "Tiede" => "Science",
        "Ulkomaat" => "Foreign",
        "Urheilu" => "Sports",
        "Viihde" => "Entertainment",
        "Blogit" => "Blogs",
        "Naiset" => "Women",
        _ => return None,
    };
    Some(name)
}

fn disallowed_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new("[^-a-zåäöA-ZÅÄÖ0-9 ]+").expect("static pattern"))
}

/// Strips everything but letters (including å, ä, ö), digits, spaces and dashes.
///
/// Underscores are removed too, which keeps terms safe to embed in cache keys.
pub fn sanitize_term(term: &str) -> String {
    disallowed_chars().replace_all(term, "").trim().to_string()
}

/// Uppercases the first character: `urheilu` -> `Urheilu`.
pub fn capitalize(term: &str) -> String {
    let mut chars = term.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Normalized category or source name as it appears in cache keys.
pub fn path_term(raw: &str) -> String {
    capitalize(&sanitize_term(raw))
}
