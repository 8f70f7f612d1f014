//! Webhook signature verification (shared-secret HMAC-SHA256).
//!
//! The provider signs the raw request body with a shared secret.
//! Providers have shipped both hex- and base64-encoded digests over
//! time, sometimes with a `sha256=` scheme prefix; verification computes
//! both encodings of the expected digest and accepts the header if
//! either matches, compared in constant time.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Header names checked for the webhook signature, in order.
pub const SIGNATURE_HEADERS: &[&str] = &["x-pf-signature", "x-webhook-signature"];

/// Strip an optional `sha256=` scheme prefix from a header value.
pub fn strip_scheme(value: &str) -> &str {
    value
        .strip_prefix("sha256=")
        .or_else(|| value.strip_prefix("SHA256="))
        .unwrap_or(value)
}

/// Compute the HMAC-SHA256 digest of a body.
fn digest(secret: &str, body: &[u8]) -> Vec<u8> {
    // HMAC accepts keys of any length; new_from_slice cannot fail here.
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(body);
    mac.finalize().into_bytes().to_vec()
}

/// Hex-encoded HMAC-SHA256 of the body.
pub fn compute_hex(secret: &str, body: &[u8]) -> String {
    hex::encode(digest(secret, body))
}

/// Base64-encoded HMAC-SHA256 of the body.
pub fn compute_base64(secret: &str, body: &[u8]) -> String {
    use base64::{engine::general_purpose::STANDARD, Engine};
    STANDARD.encode(digest(secret, body))
}

/// Verify a signature header value against the raw body.
///
/// Accepts either the hex or the base64 encoding of the digest, with an
/// optional `sha256=` prefix. Both comparisons run in constant time.
pub fn verify(secret: &str, body: &[u8], header_value: &str) -> bool {
    let provided = strip_scheme(header_value.trim());
    let hex_digest = compute_hex(secret, body);
    let b64_digest = compute_base64(secret, body);

    let hex_matches: bool = provided.as_bytes().ct_eq(hex_digest.as_bytes()).into();
    let b64_matches: bool = provided.as_bytes().ct_eq(b64_digest.as_bytes()).into();
    hex_matches | b64_matches
}

/// Find the first recognized signature header, case-insensitively.
pub fn find_signature_header<'a>(headers: &'a [(String, String)]) -> Option<&'a str> {
    for name in SIGNATURE_HEADERS {
        if let Some((_, value)) = headers
            .iter()
            .find(|(header, _)| header.eq_ignore_ascii_case(name))
        {
            return Some(value.as_str());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";
    const BODY: &[u8] = br#"{"type":"package_shipped","data":{"order":41}}"#;

    #[test]
    fn hex_signature_verifies() {
        let signature = compute_hex(SECRET, BODY);
        assert!(verify(SECRET, BODY, &signature));
    }

    #[test]
    fn base64_signature_verifies() {
        let signature = compute_base64(SECRET, BODY);
        assert!(verify(SECRET, BODY, &signature));
    }

    #[test]
    fn sha256_prefix_is_tolerated() {
        let signature = format!("sha256={}", compute_hex(SECRET, BODY));
        assert!(verify(SECRET, BODY, &signature));
        let signature = format!("SHA256={}", compute_base64(SECRET, BODY));
        assert!(verify(SECRET, BODY, &signature));
    }

    #[test]
    fn surrounding_whitespace_is_tolerated() {
        let signature = format!("  {}  ", compute_hex(SECRET, BODY));
        assert!(verify(SECRET, BODY, &signature));
    }

    #[test]
    fn tampered_body_fails() {
        let signature = compute_hex(SECRET, BODY);
        assert!(!verify(SECRET, br#"{"type":"order_refunded"}"#, &signature));
    }

    #[test]
    fn wrong_secret_fails() {
        let signature = compute_hex("whsec_other", BODY);
        assert!(!verify(SECRET, BODY, &signature));
    }

    #[test]
    fn garbage_header_fails() {
        assert!(!verify(SECRET, BODY, "not-a-digest"));
        assert!(!verify(SECRET, BODY, ""));
    }

    #[test]
    fn header_lookup_is_case_insensitive_and_ordered() {
        let headers = vec![
            ("Content-Type".to_string(), "application/json".to_string()),
            ("X-PF-Signature".to_string(), "abc".to_string()),
            ("x-webhook-signature".to_string(), "def".to_string()),
        ];
        assert_eq!(find_signature_header(&headers), Some("abc"));

        let only_fallback = vec![("X-Webhook-Signature".to_string(), "def".to_string())];
        assert_eq!(find_signature_header(&only_fallback), Some("def"));

        let none: Vec<(String, String)> = vec![];
        assert_eq!(find_signature_header(&none), None);
    }
}
