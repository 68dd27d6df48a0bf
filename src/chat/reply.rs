//! Decoding backend payloads into display text.

use serde_json::Value;

/// Fields checked for the reply text, highest priority first.
pub const REPLY_FIELDS: [&str; 5] = ["reply", "answer", "output", "response", "message"];

/// Pick the display text out of a backend payload.
///
/// The first of [`REPLY_FIELDS`] holding a non-empty string wins. Payloads
/// without one are shown as their compact JSON serialization.
pub fn extract_reply(payload: &Value) -> String {
    REPLY_FIELDS
        .iter()
        .find_map(|field| {
            payload
                .get(field)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
        })
        .map_or_else(|| payload.to_string(), ToString::to_string)
}
