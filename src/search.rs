//! Free-text search helpers: query normalisation, LIKE-pattern escaping and the
//! quick-answer extractor.
//!
//! The extractor is a heuristic over well-formed, non-nested list markup, not an HTML
//! parser. Its fallback order is fixed: ordered list, unordered list, first sentences.

use regex::Regex;
use std::sync::LazyLock;

use crate::{error::ApiError, text::strip_tags};

/// Queries shorter than this (after trimming, in characters) are rejected.
pub const MIN_QUERY_CHARS: usize = 2;
/// Maximum number of articles returned by a search.
pub const MAX_RESULTS: i64 = 20;

const MAX_LIST_ITEMS: usize = 5;
const MAX_SENTENCES: usize = 3;

static ORDERED_LIST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<ol\b[^>]*>(.*?)</ol>").expect("valid <ol> regex"));
static UNORDERED_LIST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<ul\b[^>]*>(.*?)</ul>").expect("valid <ul> regex"));
// Items must not span lines.
static LIST_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<li\b[^>]*>(.*?)</li>").expect("valid <li> regex"));
static SENTENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^.!?]+[.!?]+").expect("valid sentence regex"));

/// normalize_query
///
/// Trims the raw `q` parameter and enforces the minimum length. Runs before any lookup,
/// so a rejected query never reaches the database or the search log.
pub fn normalize_query(raw: Option<&str>) -> Result<String, ApiError> {
    let term = raw.map(str::trim).unwrap_or_default();
    if term.is_empty() {
        return Err(ApiError::validation("Search query is required"));
    }
    if term.chars().count() < MIN_QUERY_CHARS {
        return Err(ApiError::validation(
            "Search query must be at least 2 characters",
        ));
    }
    Ok(term.to_string())
}

/// Wraps `term` in `%...%` for ILIKE, escaping the wildcard characters it contains.
pub fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// The first-five `<li>` bodies inside the first block matched by `block`.
fn list_items(block: &Regex, content: &str) -> Option<Vec<String>> {
    let inner = block.captures(content)?.get(1)?.as_str();
    let items: Vec<String> = LIST_ITEM
        .captures_iter(inner)
        .filter_map(|c| c.get(1))
        .take(MAX_LIST_ITEMS)
        .map(|m| m.as_str().trim().to_string())
        .collect();
    (!items.is_empty()).then_some(items)
}

/// extract_quick_answer
///
/// Derives a short answer from an article body:
/// 1. first ordered list: up to five items numbered `1.`, `2.`, ... one per line;
/// 2. else first unordered list: up to five items bulleted with `•`, one per line;
/// 3. else the first three sentences of the tag-stripped text, space separated;
/// 4. else `None`.
pub fn extract_quick_answer(content: &str) -> Option<String> {
    if let Some(items) = list_items(&ORDERED_LIST, content) {
        let numbered: Vec<String> = items
            .iter()
            .enumerate()
            .map(|(idx, item)| format!("{}. {}", idx + 1, item))
            .collect();
        return Some(numbered.join("\n"));
    }

    if let Some(items) = list_items(&UNORDERED_LIST, content) {
        let bulleted: Vec<String> = items.iter().map(|item| format!("• {}", item)).collect();
        return Some(bulleted.join("\n"));
    }

    let text = strip_tags(content);
    let sentences: Vec<&str> = SENTENCE
        .find_iter(&text)
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
        .take(MAX_SENTENCES)
        .collect();
    if sentences.is_empty() {
        return None;
    }
    Some(sentences.join(" "))
}

/// The curated answer when present and non-blank, otherwise the extracted one.
pub fn quick_answer_for(curated: Option<&str>, content: &str) -> Option<String> {
    match curated.map(str::trim) {
        Some(answer) if !answer.is_empty() => Some(answer.to_string()),
        _ => extract_quick_answer(content),
    }
}
