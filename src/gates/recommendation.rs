//! Recommendation Formatter: normalizes free-form or LLM-sourced
//! recommendation text into bounded, prose-only output (§4.11, §4.12).
//!
//! Deterministic and pure — no I/O, no randomness.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::core::model::GateStatus;

static HEADER_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\s{0,3}#{1,6}\s*").unwrap());
static BULLET_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\s*[-*+]\s+").unwrap());
static NUMBERED_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\s*\d+[.)]\s+").unwrap());
static CODE_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"```[^`]*```").unwrap());
static INLINE_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`([^`]*)`").unwrap());
static EMPHASIS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*{1,3}([^*]+)\*{1,3}|_{1,3}([^_]+)_{1,3}").unwrap());
static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Strip Markdown structural noise (headers, bullets, numbered lists, code
/// fences, emphasis markers) and collapse the remainder into flowing prose.
fn strip_markdown(raw: &str) -> String {
    let text = CODE_FENCE.replace_all(raw, " ");
    let text = HEADER_LINE.replace_all(&text, "");
    let text = BULLET_LINE.replace_all(&text, "");
    let text = NUMBERED_LINE.replace_all(&text, "");
    let text = INLINE_CODE.replace_all(&text, "$1");
    let text = EMPHASIS.replace_all(&text, |caps: &regex::Captures| {
        caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str().to_string()).unwrap_or_default()
    });
    let joined = text.replace('\n', ". ");
    let collapsed = WHITESPACE_RUN.replace_all(&joined, " ");
    collapsed.trim().to_string()
}

/// Reject near-empty or degenerate content that shouldn't be shown as-is.
fn is_placeholder(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.len() < 8 {
        return true;
    }
    let lowered = trimmed.to_lowercase();
    const PLACEHOLDER_MARKERS: &[&str] = &[
        "todo",
        "tbd",
        "n/a",
        "no recommendation",
        "...",
        "lorem ipsum",
    ];
    if PLACEHOLDER_MARKERS.iter().any(|m| lowered == *m || lowered.starts_with(m)) {
        return true;
    }
    let words: Vec<&str> = lowered.split_whitespace().collect();
    if words.len() >= 4 {
        let unique: std::collections::HashSet<&str> = words.iter().copied().collect();
        if unique.len() <= 1 {
            return true;
        }
    }
    false
}

/// Truncate to `max_chars`, preferring a word boundary, and append an
/// ellipsis when truncation actually happened.
fn bound_length(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max_chars).collect();
    if let Some(last_space) = cut.rfind(' ') {
        if last_space > max_chars / 2 {
            cut.truncate(last_space);
        }
    }
    format!("{}…", cut.trim_end())
}

/// Format `raw` into clean, bounded prose, falling back to a
/// gate-status-specific default when `raw` is empty or a detected
/// placeholder.
pub fn format_recommendation(
    raw: &str,
    category: &str,
    status: GateStatus,
    is_security_gate: bool,
    max_chars: usize,
) -> String {
    let cleaned = strip_markdown(raw);
    if is_placeholder(&cleaned) {
        return fallback_recommendation(category, status, is_security_gate);
    }
    bound_length(&cleaned, max_chars)
}

/// Gate-status-specific default phrasing, supplemented from the original
/// `recommendation_formatter.py`'s per-category fallbacks.
fn fallback_recommendation(category: &str, status: GateStatus, is_security_gate: bool) -> String {
    if matches!(status, GateStatus::Pass) {
        return format!("{category} control is in good standing; continue current practices.");
    }
    if matches!(status, GateStatus::NotApplicable) {
        return "This control does not apply to the repository's detected technology mix.".to_string();
    }
    if is_security_gate {
        return "Remove sensitive data from log statements and replace with sanitized identifiers."
            .to_string();
    }

    let lowered = category.to_lowercase();
    if lowered.contains("log") {
        "Adopt a structured logging library and ensure key application events are logged consistently."
            .to_string()
    } else if lowered.contains("reliab") || lowered.contains("resilien") {
        "Introduce retry, timeout, and circuit-breaker policies around outbound calls to improve resilience."
            .to_string()
    } else if lowered.contains("test") {
        "Add automated test coverage for the affected code paths.".to_string()
    } else if lowered.contains("ui") || lowered.contains("frontend") {
        "Surface user-facing errors through a consistent UI error-handling pattern.".to_string()
    } else {
        format!("Improve {category} coverage across the affected files.")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_headers_bullets_and_emphasis() {
        let raw = "## Recommendation\n- Use **structured** logging\n- Avoid `print()`\n";
        let cleaned = strip_markdown(raw);
        assert!(!cleaned.contains('#'));
        assert!(!cleaned.contains('-'));
        assert!(!cleaned.contains('*'));
        assert!(cleaned.contains("structured logging"));
    }

    #[test]
    fn detects_placeholder_content() {
        assert!(is_placeholder("TBD"));
        assert!(is_placeholder("n/a"));
        assert!(is_placeholder("word word word word"));
        assert!(!is_placeholder("Add retries around the payment gateway client."));
    }

    #[test]
    fn bounds_length_at_a_word_boundary() {
        let long = "word ".repeat(100);
        let bounded = bound_length(&long, 20);
        assert!(bounded.chars().count() <= 21);
        assert!(bounded.ends_with('…'));
    }

    #[test]
    fn falls_back_for_placeholder_input() {
        let result = format_recommendation("", "Security", GateStatus::Fail, true, 200);
        assert!(result.contains("sensitive data"));
    }

    #[test]
    fn pass_status_gets_a_positive_fallback() {
        let result = format_recommendation("", "Logging", GateStatus::Pass, false, 200);
        assert!(result.contains("good standing"));
    }

    #[test]
    fn real_content_is_cleaned_and_kept() {
        let result = format_recommendation(
            "Add **retry** logic around the `HttpClient` calls.",
            "Reliability",
            GateStatus::Fail,
            false,
            200,
        );
        assert!(result.contains("retry logic"));
    }
}
