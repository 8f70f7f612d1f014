//! Printgate error types.

use thiserror::Error;

/// Errors produced by the consistency core.
///
/// Every I/O, parsing, or upstream failure is translated into one of
/// these kinds at the boundary where it occurs; nothing propagates as an
/// unhandled fault. Host servers map a value to a response code with
/// [`PrintgateError::http_status`].
#[derive(Debug, Error)]
pub enum PrintgateError {
    /// Request is malformed or missing required fields.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Referenced template store id no longer resolves (expired or never
    /// existed). The caller must re-save the design in the editor.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Claimed variant does not match the registered template's variant.
    #[error("Variant/template mismatch: request claims variant {claimed}, template was saved for {registered}")]
    VariantMismatch {
        /// Variant id carried by the request.
        claimed: u32,
        /// Variant id recorded when the template was saved.
        registered: u32,
    },

    /// Provider network failure, timeout, or unusable response shape.
    #[error("Provider unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Provider API token is not configured.
    #[error("Provider token not configured")]
    ProviderUnconfigured,

    /// Webhook signature header is missing while a secret is configured.
    #[error("Webhook signature header missing")]
    SignatureMissing,

    /// Webhook signature does not match the shared secret.
    #[error("Webhook signature verification failed")]
    SignatureInvalid,

    /// Webhook body exceeds the configured size cap.
    #[error("Webhook payload exceeds {limit} bytes")]
    PayloadTooLarge {
        /// Configured maximum body size in bytes.
        limit: usize,
    },

    /// Required configuration is absent and the operation cannot safely
    /// proceed (e.g. no standard shipping rate id).
    #[error("Configuration missing: {0}")]
    ConfigurationMissing(String),

    /// Configuration value is invalid.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Webhook archive I/O failure.
    #[error("Archive I/O error: {0}")]
    ArchiveIO(String),
}

impl PrintgateError {
    /// Stable HTTP status mapping for host servers.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Validation(_) | Self::SignatureMissing | Self::SignatureInvalid => 400,
            Self::NotFound(_) => 404,
            Self::VariantMismatch { .. } => 409,
            Self::PayloadTooLarge { .. } => 413,
            Self::ConfigurationMissing(_) | Self::ConfigError(_) | Self::ArchiveIO(_) => 500,
            Self::UpstreamUnavailable(_) => 502,
            Self::ProviderUnconfigured => 503,
        }
    }
}
