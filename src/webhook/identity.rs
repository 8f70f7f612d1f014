//! Stable event-identity derivation for webhook deliveries.
//!
//! The provider redelivers events at-least-once, so every delivery needs
//! a stable identity before deduplication. Derivation priority:
//! a recognized event-id header, then an id field in the parsed payload,
//! then a digest of the raw body. The result is sanitized for use as a
//! filesystem key.

use sha2::{Digest, Sha256};

/// Header names checked for a delivery/event id, in order.
pub const EVENT_ID_HEADERS: &[&str] = &["x-pf-event-id", "x-event-id", "x-delivery-id"];

/// Payload fields checked for an event id, in order.
pub const EVENT_ID_FIELDS: &[&str] = &["id", "event_id", "eventId"];

/// Maximum length of a derived event id.
pub const MAX_EVENT_ID_LEN: usize = 64;

/// Derive the event identity for a delivery.
///
/// `payload` is the parsed JSON body when parsing succeeded; an
/// unparseable body simply skips the payload step.
pub fn derive_event_id(
    headers: &[(String, String)],
    body: &[u8],
    payload: Option<&serde_json::Value>,
) -> String {
    if let Some(id) = header_event_id(headers) {
        return sanitize(&id);
    }
    if let Some(id) = payload.and_then(payload_event_id) {
        return sanitize(&id);
    }
    body_fallback_id(body)
}

/// First non-empty recognized event-id header, case-insensitively.
fn header_event_id(headers: &[(String, String)]) -> Option<String> {
    for name in EVENT_ID_HEADERS {
        let found = headers
            .iter()
            .find(|(header, _)| header.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.trim())
            .filter(|value| !value.is_empty());
        if let Some(value) = found {
            return Some(value.to_string());
        }
    }
    None
}

/// First non-empty id-like field in the payload.
fn payload_event_id(payload: &serde_json::Value) -> Option<String> {
    for field in EVENT_ID_FIELDS {
        match payload.get(field) {
            Some(serde_json::Value::String(s)) if !s.trim().is_empty() => {
                return Some(s.trim().to_string());
            }
            Some(serde_json::Value::Number(n)) => return Some(n.to_string()),
            _ => {}
        }
    }
    None
}

/// Deterministic fallback identity: `body-` plus the first 12 hex
/// characters of SHA-256 over the raw body.
pub fn body_fallback_id(body: &[u8]) -> String {
    let hash = hex::encode(Sha256::digest(body));
    format!("body-{}", &hash[..12])
}

/// Restrict an id to `[A-Za-z0-9._-]` and cap its length.
///
/// Anything else maps to `-`; an id that sanitizes to nothing usable
/// becomes `event`.
pub fn sanitize(raw: &str) -> String {
    let mapped: String = raw
        .chars()
        .take(MAX_EVENT_ID_LEN)
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '-'
            }
        })
        .collect();
    if mapped.chars().all(|c| c == '-' || c == '.') {
        "event".to_string()
    } else {
        mapped
    }
}
