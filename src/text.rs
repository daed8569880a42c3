use regex::Regex;
use std::sync::LazyLock;

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));
static NON_SLUG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("valid slug regex"));

const WORDS_PER_MINUTE: usize = 200;

/// Removes every `<...>` tag, leaving the text between them untouched.
pub fn strip_tags(html: &str) -> String {
    TAG.replace_all(html, "").into_owned()
}

/// slugify
///
/// Lowercases the title, collapses every run of characters outside `[a-z0-9]` into a
/// single `-` and trims dashes from both ends. "Reset Your VPN Password!" becomes
/// `reset-your-vpn-password`.
pub fn slugify(title: &str) -> String {
    let lowered = title.to_lowercase();
    NON_SLUG
        .replace_all(&lowered, "-")
        .trim_matches('-')
        .to_string()
}

/// Reading time in whole minutes for an HTML body, never less than one.
pub fn estimated_read_time(content: &str) -> i32 {
    let words = strip_tags(content).split_whitespace().count();
    words.div_ceil(WORDS_PER_MINUTE).max(1) as i32
}
