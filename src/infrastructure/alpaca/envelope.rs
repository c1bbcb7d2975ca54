//! Some endpoints wrap their payload in an object next to metadata such as
//! `next_page_token`; others return the payload bare. Resolution normalizes
//! both shapes to "the body is exactly the payload".

use serde_json::Value;

/// Path keyword to envelope key. Checked in order, first unwrap wins, so
/// more specific keywords come first.
pub const ENVELOPE_KEYS: &[(&str, &str)] = &[
    ("options/snapshots", "snapshots"),
    ("contracts", "option_contracts"),
    ("news", "news"),
    ("bars", "bars"),
    ("quotes", "quotes"),
    ("quote", "quote"),
    ("trades", "trades"),
    ("trade", "trade"),
];

/// Envelope key that applies to `path` and is present in `body`, if any.
pub fn envelope_key(path: &str, body: &Value) -> Option<&'static str> {
    let object = body.as_object()?;
    ENVELOPE_KEYS
        .iter()
        .find(|(keyword, key)| path.contains(keyword) && object.contains_key(*key))
        .map(|(_, key)| *key)
}

/// Replace `body` with its envelope payload when `path` calls for one.
pub fn resolve(path: &str, body: Value) -> Value {
    match (envelope_key(path, &body), body) {
        (Some(key), Value::Object(mut object)) => object.remove(key).unwrap_or(Value::Null),
        (_, body) => body,
    }
}
