//! Field normalization: turn raw scraped field values into clean display text.
//!
//! Scraped trámite records mix plain strings, HTML snippets, nulls, and the
//! occasional stray scalar. This crate reduces all of that to plain text with
//! logical line breaks preserved, substituting a fixed placeholder for absent
//! values so every document section always renders.

use std::sync::LazyLock;

use regex::Regex;
use scraper::Html;
use serde_json::Value;
use tracing::trace;

/// Rendered in place of absent, null, or empty field values.
///
/// The literal wording is part of the document contract: retrieval matches
/// "not available" semantics against this exact string.
pub const PLACEHOLDER: &str = "No disponible";

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Normalize a markup-capable field value.
///
/// - Non-empty string containing an angle bracket: parsed as an HTML
///   fragment; visible text is extracted with block breaks as newlines and
///   each segment trimmed.
/// - Non-empty string without markup: returned trimmed.
/// - Absent, null, or empty string: [`PLACEHOLDER`].
/// - Other scalars: rendered and trimmed.
///
/// The angle-bracket presence check is a heuristic carried over from the
/// scraper's output conventions; a plain-text value containing a literal `<`
/// is routed through the HTML parser, which leaves free-standing brackets
/// intact. Never fails: malformed markup degrades to the trimmed raw text.
pub fn normalize(value: Option<&Value>) -> String {
    normalize_inner(value, true)
}

/// Normalize a plain field value (name, institution label, URL, date).
///
/// Same absent/empty handling as [`normalize`], but the value is never
/// treated as markup — only trimmed.
pub fn normalize_plain(value: Option<&Value>) -> String {
    normalize_inner(value, false)
}

fn normalize_inner(value: Option<&Value>, markup: bool) -> String {
    let text = match value {
        None | Some(Value::Null) => return PLACEHOLDER.to_string(),
        Some(Value::String(s)) => normalize_line_endings(s),
        Some(other) => render_scalar(other),
    };

    let trimmed = text.trim();
    if trimmed.is_empty() {
        return PLACEHOLDER.to_string();
    }

    if markup && trimmed.contains('<') {
        let stripped = strip_markup(trimmed);
        trace!(raw_len = trimmed.len(), clean_len = stripped.len(), "stripped markup");
        if stripped.is_empty() {
            // Markup-only input ("<br>", empty tags) carries no visible text.
            return PLACEHOLDER.to_string();
        }
        return stripped;
    }

    trimmed.to_string()
}

// ---------------------------------------------------------------------------
// Markup stripping
// ---------------------------------------------------------------------------

/// Extract the visible text from an HTML fragment.
///
/// Text nodes are collected in document order, trimmed of surrounding
/// whitespace, and joined with newlines so block-level structure survives
/// as logical line breaks. The html5ever parser recovers from arbitrary
/// malformed input, so this never fails.
fn strip_markup(raw: &str) -> String {
    let fragment = Html::parse_fragment(raw);

    let segments: Vec<&str> = fragment
        .root_element()
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    segments.join("\n")
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Normalize CR and CRLF line endings to LF.
fn normalize_line_endings(s: &str) -> String {
    static CRLF_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\r\n?").expect("valid regex"));

    CRLF_RE.replace_all(s, "\n").to_string()
}

/// Render a non-string scalar (or stray compound) value as display text.
fn render_scalar(value: &Value) -> String {
    match value {
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        // Arrays/objects are not expected here, but tolerate them.
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
