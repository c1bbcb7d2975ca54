use crate::domain::errors::AlpacaError;
use serde::Deserialize;
use serde_json::Value;

/// The server's error shape. Unknown keys are ignored, so any object with a
/// string `message` (and an integer or absent `code`) qualifies.
#[derive(Debug, Deserialize)]
struct ErrorShape {
    message: String,
    #[serde(default)]
    code: Option<i64>,
}

/// Structured server error carried by `body`, if it has the error shape.
///
/// Runs on every body regardless of HTTP status: the API is known to return
/// error payloads under 2xx codes.
pub fn classify(body: &Value) -> Option<AlpacaError> {
    ErrorShape::deserialize(body)
        .ok()
        .map(|shape| AlpacaError::server(shape.message, shape.code))
}

/// Same as [`classify`] for a raw body that may not be JSON at all.
pub fn classify_bytes(body: &[u8]) -> Option<AlpacaError> {
    serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|value| classify(&value))
}
