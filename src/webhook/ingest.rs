//! Webhook ingestion pipeline.
//!
//! Each inbound delivery runs the same sequence:
//! received → signature checked → identity derived → deduplicated or
//! archived. The provider delivers at-least-once; the pipeline makes
//! redelivery observably idempotent — the duplicate response carries the
//! original artifact path and nothing is written twice.

use crate::clock::Clock;
use crate::config::PrintgateConfig;
use crate::errors::PrintgateError;
use crate::protocol::models::WebhookReceipt;
use crate::webhook::archive::{ArchiveEntry, EventArchive, InsertOutcome};
use crate::webhook::identity::derive_event_id;
use crate::webhook::signature::{find_signature_header, verify};
use std::collections::BTreeMap;

/// Ingest one webhook delivery.
///
/// # Errors
/// - `PayloadTooLarge` — body exceeds the configured cap (checked before
///   any parsing)
/// - `SignatureMissing` — a secret is configured but no signature header
///   arrived
/// - `SignatureInvalid` — the signature does not match the body
/// - `ArchiveIO` — the archive directory is unusable
pub fn ingest(
    config: &PrintgateConfig,
    archive: &EventArchive,
    clock: &dyn Clock,
    headers: &[(String, String)],
    body: &[u8],
) -> Result<WebhookReceipt, PrintgateError> {
    // 1. Size guard before any parsing.
    if body.len() > config.max_webhook_body_bytes {
        return Err(PrintgateError::PayloadTooLarge {
            limit: config.max_webhook_body_bytes,
        });
    }

    // 2. Signature check over the raw body. Verified and unverified
    //    outcomes must stay structurally distinct downstream.
    let signature_header = find_signature_header(headers).map(str::to_string);
    let (signature_validated, using_unverified_fallback) = match &config.webhook_secret {
        Some(secret) => {
            let header = signature_header
                .as_deref()
                .ok_or(PrintgateError::SignatureMissing)?;
            if !verify(secret, body, header) {
                tracing::warn!("webhook signature verification failed");
                return Err(PrintgateError::SignatureInvalid);
            }
            (true, false)
        }
        None => {
            tracing::warn!("no webhook secret configured; accepting delivery unverified");
            (false, true)
        }
    };

    // 3. Identity derivation; an unparseable body skips the payload step.
    let payload = serde_json::from_slice::<serde_json::Value>(body).ok();
    let event_id = derive_event_id(headers, body, payload.as_ref());

    // 4. Archive or dedup.
    let entry = ArchiveEntry {
        received_at: clock.now_utc(),
        event_id: event_id.clone(),
        signature: signature_header,
        signature_validated,
        headers: lowercase_headers(headers),
        payload: payload
            .unwrap_or_else(|| serde_json::Value::String(String::from_utf8_lossy(body).into_owned())),
    };

    let receipt = match archive.insert(&entry)? {
        InsertOutcome::Created(path) => WebhookReceipt {
            received: true,
            event_id,
            archived_path: Some(path.to_string_lossy().into_owned()),
            duplicate_of: None,
            signature_validated,
            using_unverified_fallback,
        },
        InsertOutcome::Duplicate(path) => {
            tracing::debug!(event_id = %entry.event_id, "duplicate webhook delivery");
            WebhookReceipt {
                received: true,
                event_id,
                archived_path: None,
                duplicate_of: Some(path.to_string_lossy().into_owned()),
                signature_validated,
                using_unverified_fallback,
            }
        }
    };
    Ok(receipt)
}

/// Normalize header names to lowercase for the archive record.
fn lowercase_headers(headers: &[(String, String)]) -> BTreeMap<String, String> {
    headers
        .iter()
        .map(|(name, value)| (name.to_lowercase(), value.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::webhook::signature::compute_hex;
    use tempfile::TempDir;

    const SECRET: &str = "whsec_test_secret";
    const BODY: &[u8] = br#"{"type":"package_shipped","data":{"order":41}}"#;

    fn config_with_secret() -> PrintgateConfig {
        PrintgateConfig {
            webhook_secret: Some(SECRET.to_string()),
            ..PrintgateConfig::default()
        }
    }

    fn clock() -> ManualClock {
        ManualClock::from_rfc3339("2025-06-01T09:00:00Z")
    }

    fn signed_headers(event_id: &str) -> Vec<(String, String)> {
        vec![
            ("x-pf-signature".to_string(), compute_hex(SECRET, BODY)),
            ("x-pf-event-id".to_string(), event_id.to_string()),
        ]
    }

    #[test]
    fn verified_delivery_archives_once() {
        let dir = TempDir::new().unwrap();
        let archive = EventArchive::at_dir(dir.path().to_path_buf()).unwrap();
        let receipt = ingest(
            &config_with_secret(),
            &archive,
            &clock(),
            &signed_headers("evt_sample"),
            BODY,
        )
        .unwrap();

        assert!(receipt.received);
        assert_eq!(receipt.event_id, "evt_sample");
        assert!(receipt.signature_validated);
        assert!(!receipt.using_unverified_fallback);
        assert!(receipt.archived_path.is_some());
        assert!(receipt.duplicate_of.is_none());
    }

    #[test]
    fn redelivery_returns_duplicate_of_original_path() {
        let dir = TempDir::new().unwrap();
        let archive = EventArchive::at_dir(dir.path().to_path_buf()).unwrap();
        let config = config_with_secret();

        let first = ingest(&config, &archive, &clock(), &signed_headers("evt_sample"), BODY)
            .unwrap();
        let second = ingest(&config, &archive, &clock(), &signed_headers("evt_sample"), BODY)
            .unwrap();

        assert_eq!(second.duplicate_of, first.archived_path);
        assert!(second.archived_path.is_none());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn tampered_body_with_untampered_signature_is_rejected() {
        let dir = TempDir::new().unwrap();
        let archive = EventArchive::at_dir(dir.path().to_path_buf()).unwrap();

        let tampered = br#"{"type":"package_shipped","data":{"order":999}}"#;
        let err = ingest(
            &config_with_secret(),
            &archive,
            &clock(),
            &signed_headers("evt_sample"),
            tampered,
        )
        .unwrap_err();
        assert!(matches!(err, PrintgateError::SignatureInvalid));
        assert_eq!(err.http_status(), 400);
        // Nothing was archived.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn missing_signature_header_fails_closed() {
        let dir = TempDir::new().unwrap();
        let archive = EventArchive::at_dir(dir.path().to_path_buf()).unwrap();

        let headers = vec![("x-pf-event-id".to_string(), "evt_sample".to_string())];
        let err = ingest(&config_with_secret(), &archive, &clock(), &headers, BODY).unwrap_err();
        assert!(matches!(err, PrintgateError::SignatureMissing));
    }

    #[test]
    fn no_secret_accepts_but_marks_unverified_fallback() {
        let dir = TempDir::new().unwrap();
        let archive = EventArchive::at_dir(dir.path().to_path_buf()).unwrap();

        let headers = vec![("x-pf-event-id".to_string(), "evt_sample".to_string())];
        let receipt = ingest(
            &PrintgateConfig::default(),
            &archive,
            &clock(),
            &headers,
            BODY,
        )
        .unwrap();
        assert!(receipt.received);
        assert!(!receipt.signature_validated);
        assert!(receipt.using_unverified_fallback);
    }

    #[test]
    fn oversized_body_is_rejected_before_parsing() {
        let dir = TempDir::new().unwrap();
        let archive = EventArchive::at_dir(dir.path().to_path_buf()).unwrap();

        let config = PrintgateConfig {
            max_webhook_body_bytes: 8,
            ..PrintgateConfig::default()
        };
        let err = ingest(&config, &archive, &clock(), &[], b"0123456789").unwrap_err();
        assert!(matches!(err, PrintgateError::PayloadTooLarge { limit: 8 }));
        assert_eq!(err.http_status(), 413);
    }

    #[test]
    fn identity_falls_back_to_payload_then_body_hash() {
        let dir = TempDir::new().unwrap();
        let archive = EventArchive::at_dir(dir.path().to_path_buf()).unwrap();
        let config = PrintgateConfig::default();

        // No headers: payload id wins.
        let body = br#"{"id":"evt_payload"}"#;
        let receipt = ingest(&config, &archive, &clock(), &[], body).unwrap();
        assert_eq!(receipt.event_id, "evt_payload");

        // No headers, no parseable payload: body hash.
        let receipt = ingest(&config, &archive, &clock(), &[], b"opaque bytes").unwrap();
        assert!(receipt.event_id.starts_with("body-"));
    }

    #[test]
    fn archived_entry_captures_delivery_details() {
        let dir = TempDir::new().unwrap();
        let archive = EventArchive::at_dir(dir.path().to_path_buf()).unwrap();
        let receipt = ingest(
            &config_with_secret(),
            &archive,
            &clock(),
            &signed_headers("evt_detail"),
            BODY,
        )
        .unwrap();

        let path = std::path::PathBuf::from(receipt.archived_path.unwrap());
        let entry = archive.load(&path).unwrap();
        assert_eq!(entry.event_id, "evt_detail");
        assert!(entry.signature_validated);
        assert!(entry.headers.contains_key("x-pf-signature"));
        assert_eq!(entry.payload["type"], "package_shipped");
        assert_eq!(entry.received_at.to_rfc3339(), "2025-06-01T09:00:00+00:00");
    }
}
