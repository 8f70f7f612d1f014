//! Printgate configuration.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Platform default unit price when neither the request nor its pricing
/// object carries one (in cents).
pub const PLATFORM_DEFAULT_PRICE_CENTS: i64 = 3499;

/// Platform default currency (lowercase ISO 4217).
pub const PLATFORM_DEFAULT_CURRENCY: &str = "usd";

/// How long a registered template remains resolvable.
pub const TEMPLATE_TTL: Duration = Duration::from_secs(12 * 60 * 60);

/// Maximum accepted webhook body size.
pub const DEFAULT_MAX_WEBHOOK_BODY_BYTES: usize = 1024 * 1024;

/// Configuration for the design-to-fulfillment funnel.
///
/// All secrets and deployment-specific values come from the environment
/// (see [`PrintgateConfig::from_env`]); everything else has platform
/// defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct PrintgateConfig {
    /// Shared secret for webhook HMAC verification.
    /// When absent, webhook ingestion runs in unverified-fallback mode.
    pub webhook_secret: Option<String>,

    /// Directory for the webhook event archive.
    /// Defaults to `dirs::data_dir()/<archive_namespace>/` when unset.
    pub archive_dir: Option<PathBuf>,

    /// Namespace for the default archive location.
    pub archive_namespace: String,

    /// Provider API token for embedded-designer nonce issuance.
    pub provider_token: Option<String>,

    /// Feature flag: whether express shipping may be selected at all.
    pub express_shipping_enabled: bool,

    /// Provider rate id backing the express shipping option.
    pub express_rate_id: Option<String>,

    /// Provider rate id backing the standard shipping option.
    pub standard_rate_id: Option<String>,

    /// Fallback unit price when a checkout carries no price information.
    pub default_unit_price_cents: i64,

    /// Fallback currency (lowercase).
    pub default_currency: String,

    /// Webhook body size cap in bytes.
    pub max_webhook_body_bytes: usize,

    /// TTL for template registry records.
    pub template_ttl: Duration,

    /// Optional mapping from external product id to the provider's
    /// product id, surfaced by template lookup. The catalog itself is a
    /// collaborator; an empty map is valid.
    pub catalog: HashMap<String, i64>,
}

impl Default for PrintgateConfig {
    fn default() -> Self {
        Self {
            webhook_secret: None,
            archive_dir: None,
            archive_namespace: "printgate".to_string(),
            provider_token: None,
            express_shipping_enabled: false,
            express_rate_id: None,
            standard_rate_id: None,
            default_unit_price_cents: PLATFORM_DEFAULT_PRICE_CENTS,
            default_currency: PLATFORM_DEFAULT_CURRENCY.to_string(),
            max_webhook_body_bytes: DEFAULT_MAX_WEBHOOK_BODY_BYTES,
            template_ttl: TEMPLATE_TTL,
            catalog: HashMap::new(),
        }
    }
}

impl PrintgateConfig {
    /// Build a configuration from environment variables.
    ///
    /// Recognized variables:
    /// - `PRINTGATE_WEBHOOK_SECRET`
    /// - `PRINTGATE_ARCHIVE_DIR`
    /// - `PRINTGATE_PROVIDER_TOKEN`
    /// - `PRINTGATE_EXPRESS_SHIPPING` (`1`/`true` enables the flag)
    /// - `PRINTGATE_EXPRESS_RATE_ID`
    /// - `PRINTGATE_STANDARD_RATE_ID`
    /// - `PRINTGATE_DEFAULT_PRICE_CENTS`
    /// - `PRINTGATE_DEFAULT_CURRENCY`
    ///
    /// Unset variables fall back to platform defaults; a malformed price
    /// falls back rather than failing startup.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        config.webhook_secret = read_nonempty("PRINTGATE_WEBHOOK_SECRET");
        config.archive_dir = read_nonempty("PRINTGATE_ARCHIVE_DIR").map(PathBuf::from);
        config.provider_token = read_nonempty("PRINTGATE_PROVIDER_TOKEN");
        config.express_shipping_enabled = read_nonempty("PRINTGATE_EXPRESS_SHIPPING")
            .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE"))
            .unwrap_or(false);
        config.express_rate_id = read_nonempty("PRINTGATE_EXPRESS_RATE_ID");
        config.standard_rate_id = read_nonempty("PRINTGATE_STANDARD_RATE_ID");

        if let Some(cents) = read_nonempty("PRINTGATE_DEFAULT_PRICE_CENTS") {
            match cents.parse::<i64>() {
                Ok(parsed) if parsed >= 1 => config.default_unit_price_cents = parsed,
                _ => tracing::warn!(
                    value = %cents,
                    "ignoring malformed PRINTGATE_DEFAULT_PRICE_CENTS"
                ),
            }
        }
        if let Some(currency) = read_nonempty("PRINTGATE_DEFAULT_CURRENCY") {
            config.default_currency = currency.to_lowercase();
        }

        config
    }

    /// Validate configuration for obvious errors.
    pub fn validate(&self) -> Result<(), crate::PrintgateError> {
        if self.default_unit_price_cents < 1 {
            return Err(crate::PrintgateError::ConfigError(
                "default_unit_price_cents must be at least 1".to_string(),
            ));
        }
        if self.default_currency.is_empty() {
            return Err(crate::PrintgateError::ConfigError(
                "default_currency cannot be empty".to_string(),
            ));
        }
        if self.archive_namespace.is_empty() {
            return Err(crate::PrintgateError::ConfigError(
                "archive_namespace cannot be empty".to_string(),
            ));
        }
        if self.max_webhook_body_bytes == 0 {
            return Err(crate::PrintgateError::ConfigError(
                "max_webhook_body_bytes must be nonzero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Read an environment variable, treating empty values as unset.
fn read_nonempty(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}
