//! Embedded metadata protocol.
//!
//! A single sentinel (`HISTORY_MARKER`) splits a document blob into a live
//! content region and a trailing, append-only history region. Everything here
//! is a pure function over text; the marker split is a serialization concern,
//! not a runtime representation.

use crate::constant::{
    AI_GUIDE_COMMENT, HISTORY_MARKER, LEGACY_METADATA_MARKER, MAX_TITLE_LINE_LEN,
};
use crate::types::AnalysisResult;

/// Everything before the first marker occurrence, trimmed. Idempotent.
///
/// Documents exported before the marker existed carry a `SMARTDIFF AI
/// METADATA` comment block instead; those are cut at the enclosing comment.
pub fn strip_metadata(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    if let Some(idx) = text.find(HISTORY_MARKER) {
        return text[..idx].trim().to_string();
    }
    if let Some(idx) = text.find(LEGACY_METADATA_MARKER) {
        // The legacy sentinel lives inside an HTML comment; cut at its start.
        let cut = text[..idx].rfind("<!--").unwrap_or(idx);
        return trim_legacy_tail(&text[..cut]).to_string();
    }
    text.to_string()
}

/// Everything strictly after the first marker occurrence, trimmed; empty if
/// no marker.
pub fn extract_history(text: &str) -> String {
    match text.find(HISTORY_MARKER) {
        Some(idx) => text[idx + HISTORY_MARKER.len()..].trim().to_string(),
        None => String::new(),
    }
}

/// Old exports left `<br/>`/`<hr/>` separators in front of the metadata block
fn trim_legacy_tail(text: &str) -> &str {
    let mut out = text.trim_end();
    loop {
        let before = out;
        for tag in ["<br/>", "<br />", "<br>", "<hr/>", "<hr />", "<hr>"] {
            if let Some(stripped) = out.strip_suffix(tag) {
                out = stripped.trim_end();
            }
        }
        if out == before {
            return out.trim();
        }
    }
}

/// Insert the invisible AI guide immediately after the first top-level
/// heading (or at the very top if none). Presence check makes this
/// idempotent.
pub fn ensure_ai_guide(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    if text.contains(AI_GUIDE_COMMENT) {
        return text.to_string();
    }

    let mut lines: Vec<&str> = text.split('\n').collect();
    match lines.iter().position(|line| line.trim().starts_with("# ")) {
        Some(h1_idx) => {
            lines.splice(h1_idx + 1..h1_idx + 1, ["", AI_GUIDE_COMMENT, ""]);
            lines.join("\n")
        }
        None => format!("{}\n\n{}", AI_GUIDE_COMMENT, text),
    }
}

/// First top-level heading text, else the first short non-blank line, else ""
pub fn detect_title(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    for line in text.split('\n') {
        if let Some(rest) = line.trim().strip_prefix("# ") {
            return rest.trim().to_string();
        }
    }
    if let Some(first) = text.split('\n').find(|line| !line.trim().is_empty()) {
        if first.trim().chars().count() < MAX_TITLE_LINE_LEN {
            return first.trim().to_string();
        }
    }
    String::new()
}

/// Render one history region block for a committed analysis
pub fn history_entry(analysis: &AnalysisResult, timestamp: &str) -> String {
    let json = serde_json::to_string_pretty(analysis)
        .unwrap_or_else(|_| "{}".to_string());
    format!(
        "### v{} ({})\n{}\n```json\n{}\n```",
        analysis.version, timestamp, analysis.summary, json
    )
}

/// Build a full document: content, marker, then the history region with the
/// new entry stacked after any inherited blocks (chronologically ascending).
pub fn assemble_document(content: &str, prior_history: &str, new_entry: &str) -> String {
    let stacked = if prior_history.is_empty() {
        new_entry.to_string()
    } else {
        format!("{}\n\n{}", prior_history, new_entry)
    };
    format!("{}\n\n{}\n\n{}\n", content, HISTORY_MARKER, stacked)
}

/// Duplicate-suppression check: does the history region already hold an
/// entry for this version? Substring match against the fenced JSON.
pub fn history_contains_version(history: &str, version: &str) -> bool {
    history.contains(&format!("\"version\": \"{}\"", version))
}
