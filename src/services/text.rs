use std::sync::OnceLock;

use regex::Regex;

/// Lowercased, trimmed form used for substring search.
pub fn fold(text: &str) -> String {
    text.trim().to_lowercase()
}

fn gloss_separator() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // spaced hyphen, en-dash or em-dash; "chama-se" is a single word
    RE.get_or_init(|| Regex::new(r"\s+-\s+|[\u{2013}\u{2014}]").expect("static regex"))
}

/// Keeps only what precedes the first dash, e.g. "eu falo – I speak" -> "eu falo".
pub fn strip_gloss(text: &str) -> &str {
    match gloss_separator().find(text) {
        Some(m) => text[..m.start()].trim(),
        None => text.trim(),
    }
}
