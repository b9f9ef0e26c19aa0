// ── Response shape normalization ──
//
// The Display Service answers with either bare values or values wrapped
// in an envelope object. Everything here converts those shapes into one
// canonical form so the rest of the workspace never branches on them.

use serde_json::Value;

/// Envelope keys that may wrap a list response.
pub const LIST_ENVELOPE_KEYS: [&str; 3] = ["displays", "items", "dashboards"];

/// Keys that may carry the active screen index inside an object.
pub const INDEX_KEYS: [&str; 3] = ["screenIndex", "index", "activeScreen"];

/// Candidate identity fields for a display descriptor, highest priority first.
pub const DISPLAY_ID_KEYS: [&str; 4] = ["id", "uuid", "displayId", "name"];

/// Candidate identity fields for a dashboard descriptor, highest priority first.
pub const DASHBOARD_ID_KEYS: [&str; 3] = ["id", "uuid", "name"];

/// Unwrap a list response.
///
/// Accepts a bare array, `null` (empty), or an object carrying the list
/// under one of [`LIST_ENVELOPE_KEYS`]. Returns `None` for anything else.
pub fn unwrap_list(value: Value) -> Option<Vec<Value>> {
    match value {
        Value::Array(items) => Some(items),
        Value::Null => Some(Vec::new()),
        Value::Object(mut map) => LIST_ENVELOPE_KEYS.iter().find_map(|key| {
            match map.remove(*key) {
                Some(Value::Array(items)) => Some(items),
                Some(Value::Null) => Some(Vec::new()),
                _ => None,
            }
        }),
        _ => None,
    }
}

/// Extract an active index from a bare number, a numeric string, or an
/// object keyed by one of [`INDEX_KEYS`]. Negative or non-integral values
/// yield `None`.
pub fn extract_index(value: &Value) -> Option<usize> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| usize::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        Value::Object(map) => INDEX_KEYS
            .iter()
            .find_map(|key| map.get(*key).and_then(extract_index)),
        _ => None,
    }
}

/// Derive a display identifier: first non-empty of [`DISPLAY_ID_KEYS`],
/// the descriptor itself when it is a bare string, else `display-<position>`.
pub fn display_identity(value: &Value, position: usize) -> String {
    identity(value, &DISPLAY_ID_KEYS).unwrap_or_else(|| format!("display-{position}"))
}

/// Derive a dashboard identifier, same rules as [`display_identity`]
/// over [`DASHBOARD_ID_KEYS`], falling back to `dashboard-<position>`.
pub fn dashboard_identity(value: &Value, position: usize) -> String {
    identity(value, &DASHBOARD_ID_KEYS).unwrap_or_else(|| format!("dashboard-{position}"))
}

/// Human-readable label, if the descriptor carries one.
pub fn display_name(value: &Value) -> Option<String> {
    ["displayName", "name", "title"]
        .iter()
        .find_map(|key| value.get(*key).and_then(scalar_text))
}

fn identity(value: &Value, keys: &[&str]) -> Option<String> {
    if let Some(text) = scalar_text(value) {
        return Some(text);
    }
    keys.iter().find_map(|key| value.get(*key).and_then(scalar_text))
}

/// Non-empty string or number rendered as text.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_owned()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
