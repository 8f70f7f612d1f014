//! Variant/template consistency gate.
//!
//! Validates that a checkout or order-creation request's claimed variant
//! matches the registered template before money changes hands, and
//! resolves the effective price and currency through a fixed precedence
//! chain. On success the resolved tuple becomes line-item metadata for
//! the payment-session collaborator, so a later charge is traceable back
//! to the exact template used for production.

use crate::config::PrintgateConfig;
use crate::errors::PrintgateError;
use crate::protocol::models::{CheckoutSession, Pricing, ShippingOption};
use crate::registry::TemplateRegistry;
use serde::Serialize;

/// What a request claims about the line item it wants to pay for.
#[derive(Debug, Clone, Default)]
pub struct LineItemClaim {
    /// Claimed variant id; must be positive.
    pub variant_id: u32,
    /// Registered-template handle, when the design was saved.
    pub template_store_id: Option<String>,
    /// Provider template id claimed directly by the client.
    pub template_id: Option<String>,
    /// Number of units; must be at least 1.
    pub quantity: u32,
    /// Explicit unit price override in cents.
    pub unit_price_cents: Option<i64>,
    /// Explicit currency override.
    pub currency: Option<String>,
    /// Pricing hint used when no explicit price is present.
    pub pricing: Option<Pricing>,
}

/// The consistency-checked, price-resolved line item.
///
/// Emitted as metadata on the payment session so the charge stays
/// traceable to the template later used for production.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemMeta {
    /// Validated variant id.
    pub variant_id: u32,
    /// Effective provider template id, when any was available.
    pub template_id: Option<String>,
    /// Registered-template handle, when the design was saved.
    pub template_store_id: Option<String>,
    /// Resolved unit price in cents.
    pub unit_price_cents: i64,
    /// Resolved lowercase currency.
    pub currency: String,
    /// Number of units.
    pub quantity: u32,
}

/// Payment-session collaborator seam.
///
/// The gate hands the resolved line item here; session creation itself
/// (amount math, redirect URLs) belongs to the collaborator.
pub trait PaymentGateway: Send + Sync {
    /// Create a payment session for the resolved line item.
    fn create_session(
        &self,
        meta: &LineItemMeta,
        email: Option<&str>,
        shipping_rate_id: &str,
    ) -> Result<CheckoutSession, PrintgateError>;
}

/// Cross-validate a claim against the registry and resolve its price.
///
/// # Errors
/// - `Validation` — non-positive variant id or zero quantity
/// - `NotFound` — the claimed store id no longer resolves; the saved
///   design can no longer be trusted and must be re-saved in the editor
/// - `VariantMismatch` — the template was saved for a different variant
///   (the user switched devices after saving a design)
pub fn resolve_line_item(
    registry: &TemplateRegistry,
    config: &PrintgateConfig,
    claim: &LineItemClaim,
) -> Result<LineItemMeta, PrintgateError> {
    if claim.variant_id == 0 {
        return Err(PrintgateError::Validation(
            "variantId must be a positive integer".to_string(),
        ));
    }
    if claim.quantity == 0 {
        return Err(PrintgateError::Validation(
            "quantity must be at least 1".to_string(),
        ));
    }
    if let Some(cents) = claim.unit_price_cents {
        if cents < 1 {
            return Err(PrintgateError::Validation(
                "unitPriceCents must be at least 1".to_string(),
            ));
        }
    }

    let record = match claim.template_store_id.as_deref() {
        Some(store_id) => {
            let record = registry.get(store_id).ok_or_else(|| {
                PrintgateError::NotFound(format!(
                    "template store id {store_id} is expired or unknown; re-save the design in the editor"
                ))
            })?;
            if record.variant_id != claim.variant_id {
                return Err(PrintgateError::VariantMismatch {
                    claimed: claim.variant_id,
                    registered: record.variant_id,
                });
            }
            Some(record)
        }
        None => None,
    };

    let template_id = record
        .as_ref()
        .and_then(|r| r.template_id.clone())
        .or_else(|| claim.template_id.clone());

    if template_id.is_none() {
        // Deliberately not fatal: blocking here would lose the sale. The
        // omission stays observable via the null templateId downstream.
        tracing::warn!(
            variant_id = claim.variant_id,
            "proceeding to payment without a design template artifact"
        );
    }

    Ok(LineItemMeta {
        variant_id: claim.variant_id,
        template_id,
        template_store_id: claim.template_store_id.clone(),
        unit_price_cents: resolve_unit_price(
            claim.unit_price_cents,
            claim.pricing.as_ref(),
            config.default_unit_price_cents,
        ),
        currency: resolve_currency(
            claim.currency.as_deref(),
            claim.pricing.as_ref(),
            &config.default_currency,
        ),
        quantity: claim.quantity,
    })
}

/// Resolve the unit price: explicit cents, then the pricing subtotal
/// (major units, floor-rounded to cents, minimum 1), then the platform
/// default. A non-finite subtotal counts as undefined.
pub fn resolve_unit_price(
    explicit_cents: Option<i64>,
    pricing: Option<&Pricing>,
    default_cents: i64,
) -> i64 {
    if let Some(cents) = explicit_cents {
        return cents;
    }
    if let Some(subtotal) = pricing.and_then(|p| p.subtotal) {
        if subtotal.is_finite() {
            return ((subtotal * 100.0).floor() as i64).max(1);
        }
    }
    default_cents
}

/// Resolve the currency: explicit, then the pricing hint, then the
/// platform default; always lowercased.
pub fn resolve_currency(
    explicit: Option<&str>,
    pricing: Option<&Pricing>,
    default_currency: &str,
) -> String {
    explicit
        .map(str::to_string)
        .or_else(|| pricing.and_then(|p| p.currency.clone()))
        .unwrap_or_else(|| default_currency.to_string())
        .to_lowercase()
}

/// Resolve the shipping rate id for the selected option.
///
/// Express is only valid when the feature flag and rate id are both
/// present; anything else is a client error, never a silent downgrade to
/// standard (that would change the price contract). A missing standard
/// rate id is an operator problem, not a client one.
pub fn resolve_shipping_rate(
    config: &PrintgateConfig,
    option: ShippingOption,
) -> Result<String, PrintgateError> {
    match option {
        ShippingOption::Express => {
            match (&config.express_rate_id, config.express_shipping_enabled) {
                (Some(rate), true) => Ok(rate.clone()),
                _ => Err(PrintgateError::Validation(
                    "express shipping is not available".to_string(),
                )),
            }
        }
        ShippingOption::Standard => config.standard_rate_id.clone().ok_or_else(|| {
            PrintgateError::ConfigurationMissing("standard shipping rate id".to_string())
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::registry::TemplateUpsert;
    use std::sync::Arc;
    use std::time::Duration;

    fn registry_with_template(variant_id: u32) -> (TemplateRegistry, String) {
        let registry = TemplateRegistry::with_clock(
            Duration::from_secs(12 * 60 * 60),
            Arc::new(ManualClock::from_rfc3339("2025-06-01T09:00:00Z")),
        );
        let record = registry.upsert(TemplateUpsert {
            template_id: Some("tmpl_abc".to_string()),
            variant_id,
            external_product_id: "SNAP_IP15PRO_SNAP".to_string(),
            ..TemplateUpsert::default()
        });
        (registry, record.template_store_id)
    }

    fn claim(variant_id: u32, store_id: Option<&str>) -> LineItemClaim {
        LineItemClaim {
            variant_id,
            template_store_id: store_id.map(str::to_string),
            quantity: 1,
            ..LineItemClaim::default()
        }
    }

    #[test]
    fn matching_variant_resolves() {
        let (registry, store_id) = registry_with_template(632);
        let meta =
            resolve_line_item(&registry, &PrintgateConfig::default(), &claim(632, Some(&store_id)))
                .unwrap();
        assert_eq!(meta.variant_id, 632);
        assert_eq!(meta.template_id.as_deref(), Some("tmpl_abc"));
        assert_eq!(meta.template_store_id.as_deref(), Some(store_id.as_str()));
    }

    #[test]
    fn variant_mismatch_is_a_conflict() {
        let (registry, store_id) = registry_with_template(632);
        let err =
            resolve_line_item(&registry, &PrintgateConfig::default(), &claim(711, Some(&store_id)))
                .unwrap_err();
        assert!(matches!(
            err,
            PrintgateError::VariantMismatch {
                claimed: 711,
                registered: 632
            }
        ));
        assert_eq!(err.http_status(), 409);
    }

    #[test]
    fn unknown_store_id_is_not_found() {
        let (registry, _) = registry_with_template(632);
        let err = resolve_line_item(
            &registry,
            &PrintgateConfig::default(),
            &claim(632, Some("tsr_gone")),
        )
        .unwrap_err();
        assert!(matches!(err, PrintgateError::NotFound(_)));
        assert_eq!(err.http_status(), 404);
    }

    #[test]
    fn missing_template_everywhere_is_not_fatal() {
        let (registry, _) = registry_with_template(632);
        let meta =
            resolve_line_item(&registry, &PrintgateConfig::default(), &claim(632, None)).unwrap();
        assert!(meta.template_id.is_none());
        assert!(meta.template_store_id.is_none());
    }

    #[test]
    fn claimed_template_id_fills_in_when_record_has_none() {
        let registry = TemplateRegistry::with_clock(
            Duration::from_secs(12 * 60 * 60),
            Arc::new(ManualClock::from_rfc3339("2025-06-01T09:00:00Z")),
        );
        let record = registry.upsert(TemplateUpsert {
            template_id: None,
            variant_id: 632,
            external_product_id: "SNAP_IP15PRO_SNAP".to_string(),
            ..TemplateUpsert::default()
        });

        let mut c = claim(632, Some(&record.template_store_id));
        c.template_id = Some("tmpl_client".to_string());
        let meta = resolve_line_item(&registry, &PrintgateConfig::default(), &c).unwrap();
        assert_eq!(meta.template_id.as_deref(), Some("tmpl_client"));
    }

    #[test]
    fn zero_variant_and_zero_quantity_are_validation_errors() {
        let (registry, _) = registry_with_template(632);
        let config = PrintgateConfig::default();

        let err = resolve_line_item(&registry, &config, &claim(0, None)).unwrap_err();
        assert!(matches!(err, PrintgateError::Validation(_)));

        let mut c = claim(632, None);
        c.quantity = 0;
        let err = resolve_line_item(&registry, &config, &c).unwrap_err();
        assert!(matches!(err, PrintgateError::Validation(_)));
    }

    #[test]
    fn explicit_price_wins_over_pricing_subtotal() {
        let price = resolve_unit_price(
            Some(5000),
            Some(&Pricing {
                subtotal: Some(40.0),
                currency: None,
            }),
            3499,
        );
        assert_eq!(price, 5000);
    }

    #[test]
    fn subtotal_converts_to_floor_cents() {
        let pricing = Pricing {
            subtotal: Some(40.999),
            currency: None,
        };
        assert_eq!(resolve_unit_price(None, Some(&pricing), 3499), 4099);
    }

    #[test]
    fn subtotal_has_a_floor_of_one_cent() {
        let pricing = Pricing {
            subtotal: Some(0.001),
            currency: None,
        };
        assert_eq!(resolve_unit_price(None, Some(&pricing), 3499), 1);
    }

    #[test]
    fn non_finite_subtotal_falls_through_to_default() {
        let pricing = Pricing {
            subtotal: Some(f64::NAN),
            currency: None,
        };
        assert_eq!(resolve_unit_price(None, Some(&pricing), 3499), 3499);
    }

    #[test]
    fn absent_price_information_uses_platform_default() {
        assert_eq!(resolve_unit_price(None, None, 3499), 3499);
    }

    #[test]
    fn currency_precedence_and_normalization() {
        let pricing = Pricing {
            subtotal: None,
            currency: Some("EUR".to_string()),
        };
        assert_eq!(resolve_currency(Some("GBP"), Some(&pricing), "usd"), "gbp");
        assert_eq!(resolve_currency(None, Some(&pricing), "usd"), "eur");
        assert_eq!(resolve_currency(None, None, "usd"), "usd");
    }

    #[test]
    fn express_requires_flag_and_rate() {
        let mut config = PrintgateConfig::default();
        assert!(resolve_shipping_rate(&config, ShippingOption::Express).is_err());

        config.express_shipping_enabled = true;
        assert!(matches!(
            resolve_shipping_rate(&config, ShippingOption::Express),
            Err(PrintgateError::Validation(_))
        ));

        config.express_rate_id = Some("rate_express".to_string());
        assert_eq!(
            resolve_shipping_rate(&config, ShippingOption::Express).unwrap(),
            "rate_express"
        );

        // Rate id alone is not enough either.
        config.express_shipping_enabled = false;
        assert!(resolve_shipping_rate(&config, ShippingOption::Express).is_err());
    }

    #[test]
    fn missing_standard_rate_is_an_operator_error() {
        let mut config = PrintgateConfig::default();
        let err = resolve_shipping_rate(&config, ShippingOption::Standard).unwrap_err();
        assert!(matches!(err, PrintgateError::ConfigurationMissing(_)));
        assert_eq!(err.http_status(), 500);

        config.standard_rate_id = Some("rate_standard".to_string());
        assert_eq!(
            resolve_shipping_rate(&config, ShippingOption::Standard).unwrap(),
            "rate_standard"
        );
    }
}
