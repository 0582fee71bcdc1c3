//! Text helpers for titles. All lengths are in chars.

use regex::Regex;
use std::sync::OnceLock;

const ELLIPSIS: &str = "...";

/// Truncate to `max_chars`, replacing the tail with `...` when too long.
pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(ELLIPSIS.len());
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(ELLIPSIS);
    out
}

/// First non-empty line of a model response, quotes stripped and whitespace collapsed.
pub fn clean_response(raw: &str) -> String {
    raw.lines()
        .map(|line| {
            let unquoted: String = line.chars().filter(|c| *c != '"' && *c != '\'').collect();
            collapse_whitespace(&unquoted)
        })
        .find(|line| !line.is_empty())
        .unwrap_or_default()
}

/// First sentence of a transcript, whitespace collapsed.
pub fn first_sentence(transcript: &str) -> String {
    static TERMINATORS: OnceLock<Regex> = OnceLock::new();
    let re = TERMINATORS.get_or_init(|| Regex::new(r"[.!?]+").expect("Invalid regex"));

    re.split(transcript)
        .map(collapse_whitespace)
        .find(|s| !s.is_empty())
        .unwrap_or_default()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whether a response contains any refusal phrase, ignoring case.
pub fn is_refusal(response: &str, phrases: &[String]) -> bool {
    let lower = response.to_lowercase();
    phrases
        .iter()
        .any(|p| !p.is_empty() && lower.contains(&p.to_lowercase()))
}

/// Leading `max_chars` characters.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Escape text for insertion into HTML.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}
