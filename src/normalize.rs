//! Payload normalization.
//!
//! The bus carries heterogeneous producers: hand-typed strings, structured
//! JSON publishers, and everything in between. The normalizer is maximally
//! permissive on ingest while guaranteeing that the record handed downstream
//! is uniform. It never errors to the caller: a payload either becomes a
//! [`Notification`] or is discarded with a warning.

use crate::core::Notification;
use serde_json::Value;
use tracing::warn;

/// Normalizes a raw bus payload into a canonical notification.
///
/// * JSON objects contribute `message` (or `text`), `title` and `priority`;
///   all remaining keys land in `extra` untouched.
/// * JSON strings, and payloads that do not parse as JSON at all, become the
///   message verbatim.
/// * Any other JSON shape (number, boolean, array, null) is discarded.
///
/// Returns `None` for discarded payloads.
pub fn normalize(payload: &[u8]) -> Option<Notification> {
    let parsed = match serde_json::from_slice::<Value>(payload) {
        Ok(value) => value,
        Err(_) => {
            // Not JSON: the raw bytes are the message.
            return notification_from_text(String::from_utf8_lossy(payload).into_owned());
        }
    };

    match parsed {
        Value::Object(mut map) => {
            let message = match take_message(&mut map) {
                Some(message) => message,
                None => {
                    warn!("No message in payload, ignoring");
                    metrics::counter!("notifications_dropped_malformed").increment(1);
                    return None;
                }
            };

            let title = match map.remove("title") {
                Some(Value::String(title)) => Some(title),
                Some(Value::Null) | None => None,
                Some(other) => {
                    warn!(value = %other, "Ignoring non-string title");
                    None
                }
            };

            let priority = match map.remove("priority") {
                Some(Value::Null) | None => 0,
                Some(value) => match value.as_i64() {
                    Some(priority) => priority,
                    None => {
                        warn!(value = %value, "Ignoring non-integer priority");
                        0
                    }
                },
            };

            if message.trim().is_empty() {
                warn!("Empty message in payload, ignoring");
                metrics::counter!("notifications_dropped_malformed").increment(1);
                return None;
            }

            Some(Notification {
                message,
                title,
                priority,
                extra: map,
            })
        }
        Value::String(text) => notification_from_text(text),
        other => {
            warn!(payload = %other, "Unknown payload type, ignoring");
            metrics::counter!("notifications_dropped_malformed").increment(1);
            None
        }
    }
}

/// Extracts the message from an object payload. `message` wins over `text`;
/// both keys are removed so neither leaks into `extra`.
fn take_message(map: &mut serde_json::Map<String, Value>) -> Option<String> {
    let message = map.remove("message");
    let text = map.remove("text");

    match message.or(text) {
        Some(Value::String(message)) => Some(message),
        Some(Value::Null) | None => None,
        Some(other) => {
            warn!(value = %other, "Message field is not a string, ignoring payload");
            None
        }
    }
}

fn notification_from_text(text: String) -> Option<Notification> {
    if text.trim().is_empty() {
        warn!("Empty payload, ignoring");
        metrics::counter!("notifications_dropped_malformed").increment(1);
        return None;
    }
    Some(Notification::from_message(text))
}
