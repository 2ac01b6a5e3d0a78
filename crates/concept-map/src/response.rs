//! Splits a raw model reply into the prose answer and the embedded concept
//! map JSON. Every path returns something usable; nothing here can fail.

use serde_json::Value;
use tracing::{debug, warn};

use crate::document::{DEFAULT_GRAPH_JSON, Edge};

pub const ANSWER_MARKER: &str = "[ANSWER]";
pub const GRAPH_MARKER: &str = "[CONCEPT_MAP_JSON]";
pub const DEFAULT_ANSWER: &str = "I encountered an error processing the response.";

const REQUIRED_KEYS: [&str; 4] = ["visualization_type", "main_concept", "nodes", "edges"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedResponse {
    pub answer: String,
    pub graph_json: String,
}

pub fn parse(raw: &str) -> ParsedResponse {
    ParsedResponse {
        answer: extract_answer(raw),
        graph_json: extract_graph_json(raw),
    }
}

// ------------------------------------------------------------------
// Answer text
// ------------------------------------------------------------------

/// With an `[ANSWER]` marker the answer runs up to the graph marker or the
/// first `{`, whichever is earlier. Without it, everything before the first
/// `{` is used, and a reply with no usable prose is returned as-is.
pub fn extract_answer(raw: &str) -> String {
    let answer = match raw.find(ANSWER_MARKER) {
        Some(pos) => {
            let body = &raw[pos + ANSWER_MARKER.len()..];
            let end = [body.find(GRAPH_MARKER), body.find('{')]
                .into_iter()
                .flatten()
                .min()
                .unwrap_or(body.len());
            strip_markers(&body[..end])
        }
        None => {
            let before = raw.find('{').map_or(raw, |i| &raw[..i]);
            let before = before.find(GRAPH_MARKER).map_or(before, |i| &before[..i]);
            let stripped = strip_markers(before);
            if stripped.is_empty() {
                raw.trim().to_string()
            } else {
                stripped
            }
        }
    };

    if answer.is_empty() {
        DEFAULT_ANSWER.to_string()
    } else {
        answer
    }
}

/// Removes single-line `[...]` tokens and markdown fence lines, then trims.
fn strip_markers(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(open) = rest.find('[') {
        let after = &rest[open + 1..];
        match after.find([']', '\n']) {
            Some(close) if after.as_bytes()[close] == b']' => {
                out.push_str(&rest[..open]);
                rest = &after[close + 1..];
            }
            _ => {
                out.push_str(&rest[..=open]);
                rest = after;
            }
        }
    }
    out.push_str(rest);

    out.lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

// ------------------------------------------------------------------
// Graph JSON
// ------------------------------------------------------------------

/// Scans every `{` in order and returns the first balanced object that
/// parses and carries all required keys, with edge ids filled in.
pub fn extract_graph_json(raw: &str) -> String {
    let mut start = 0;
    while let Some(offset) = raw[start..].find('{') {
        let open = start + offset;
        if let Some(close) = matching_brace(raw, open) {
            if let Some(value) = validate_candidate(&raw[open..=close]) {
                debug!(offset = open, len = close + 1 - open, "accepted concept map JSON");
                return with_edge_ids(value);
            }
        }
        start = open + 1;
    }

    warn!("no valid concept map JSON in response, using default");
    DEFAULT_GRAPH_JSON.to_string()
}

/// Byte index of the `}` closing the object opened at `open`, ignoring
/// braces inside string literals.
fn matching_brace(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, byte) in text.as_bytes()[open..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if *byte == b'\\' {
                escaped = true;
            } else if *byte == b'"' {
                in_string = false;
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }
    None
}

fn validate_candidate(candidate: &str) -> Option<Value> {
    let value: Value = serde_json::from_str(candidate).ok()?;
    let object = value.as_object()?;
    REQUIRED_KEYS
        .iter()
        .all(|key| object.contains_key(*key))
        .then_some(value)
}

fn with_edge_ids(mut value: Value) -> String {
    if let Some(edges) = value.get_mut("edges").and_then(Value::as_array_mut) {
        for edge in edges.iter_mut().filter_map(Value::as_object_mut) {
            let missing = edge
                .get("id")
                .and_then(Value::as_str)
                .is_none_or(|id| id.trim().is_empty());
            if missing {
                let from = edge.get("from").and_then(Value::as_str).unwrap_or_default();
                let to = edge.get("to").and_then(Value::as_str).unwrap_or_default();
                let id = Edge::synthesized_id(from, to);
                edge.insert("id".to_string(), Value::String(id));
            }
        }
    }
    value.to_string()
}
