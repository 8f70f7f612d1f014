//! The design context value type and its merge semantics.
//!
//! `DesignContext` is the single session-scoped record the funnel keeps
//! about the in-progress design: selected variant, provider template
//! identity, pricing snapshot, and the last guardrail evaluation. Every
//! write is a shallow merge of a partial over the previous value; the
//! merge itself is a pure function independent of any storage medium.

use crate::guardrail::GuardrailState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Schema version of the serialized context. Stored contexts with a
/// different version load as "no context".
pub const CONTEXT_VERSION: u32 = 1;

/// Session-scoped design state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignContext {
    /// Schema version for forward-compatible loads.
    pub version: u32,
    /// Selected sellable variant.
    pub variant_id: Option<u32>,
    /// External (storefront) product id the variant belongs to.
    pub external_product_id: Option<String>,
    /// Provider-issued template id, once the editor reports one.
    pub template_id: Option<String>,
    /// This system's opaque handle for the registered template.
    pub template_store_id: Option<String>,
    /// When the template was registered server-side.
    pub template_stored_at: Option<DateTime<Utc>>,
    /// Data URL or object URL of the exported preview image.
    pub exported_image: Option<String>,
    /// Provider file id of the uploaded design, if any.
    pub design_file_id: Option<String>,
    /// Provider file URL of the uploaded design, if any.
    pub design_file_url: Option<String>,
    /// Human-readable variant label for display.
    pub variant_label: Option<String>,
    /// When the user last attempted checkout.
    pub last_checkout_attempt_at: Option<DateTime<Utc>>,
    /// Unit price snapshot in cents.
    pub unit_price_cents: Option<i64>,
    /// Currency of the unit price snapshot.
    pub unit_price_currency: Option<String>,
    /// Where the price snapshot came from (e.g. "catalog", "override").
    pub pricing_source: Option<String>,
    /// Last guardrail evaluation.
    pub guardrail_snapshot: Option<GuardrailState>,
    /// When this context was last written.
    pub timestamp: DateTime<Utc>,
}

impl DesignContext {
    /// An empty context stamped at `now`.
    pub fn empty(now: DateTime<Utc>) -> Self {
        Self {
            version: CONTEXT_VERSION,
            variant_id: None,
            external_product_id: None,
            template_id: None,
            template_store_id: None,
            template_stored_at: None,
            exported_image: None,
            design_file_id: None,
            design_file_url: None,
            variant_label: None,
            last_checkout_attempt_at: None,
            unit_price_cents: None,
            unit_price_currency: None,
            pricing_source: None,
            guardrail_snapshot: None,
            timestamp: now,
        }
    }
}

/// A partial update to a [`DesignContext`].
///
/// Present fields override, absent fields persist.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignContextPatch {
    /// New variant selection.
    pub variant_id: Option<u32>,
    /// New external product id.
    pub external_product_id: Option<String>,
    /// New provider template id.
    pub template_id: Option<String>,
    /// New template store id.
    pub template_store_id: Option<String>,
    /// New template registration time.
    pub template_stored_at: Option<DateTime<Utc>>,
    /// New exported preview image.
    pub exported_image: Option<String>,
    /// New design file id.
    pub design_file_id: Option<String>,
    /// New design file URL.
    pub design_file_url: Option<String>,
    /// New variant label.
    pub variant_label: Option<String>,
    /// New checkout-attempt time.
    pub last_checkout_attempt_at: Option<DateTime<Utc>>,
    /// New unit price in cents.
    pub unit_price_cents: Option<i64>,
    /// New unit price currency.
    pub unit_price_currency: Option<String>,
    /// New pricing source.
    pub pricing_source: Option<String>,
    /// New guardrail snapshot.
    pub guardrail_snapshot: Option<GuardrailState>,
}

/// Shallow-merge a patch over an existing context.
///
/// Pure: neither argument is mutated and `timestamp` is carried over
/// unchanged (the store stamps it on write).
pub fn merge(old: &DesignContext, patch: &DesignContextPatch) -> DesignContext {
    DesignContext {
        version: old.version,
        variant_id: patch.variant_id.or(old.variant_id),
        external_product_id: patch
            .external_product_id
            .clone()
            .or_else(|| old.external_product_id.clone()),
        template_id: patch.template_id.clone().or_else(|| old.template_id.clone()),
        template_store_id: patch
            .template_store_id
            .clone()
            .or_else(|| old.template_store_id.clone()),
        template_stored_at: patch.template_stored_at.or(old.template_stored_at),
        exported_image: patch
            .exported_image
            .clone()
            .or_else(|| old.exported_image.clone()),
        design_file_id: patch
            .design_file_id
            .clone()
            .or_else(|| old.design_file_id.clone()),
        design_file_url: patch
            .design_file_url
            .clone()
            .or_else(|| old.design_file_url.clone()),
        variant_label: patch
            .variant_label
            .clone()
            .or_else(|| old.variant_label.clone()),
        last_checkout_attempt_at: patch
            .last_checkout_attempt_at
            .or(old.last_checkout_attempt_at),
        unit_price_cents: patch.unit_price_cents.or(old.unit_price_cents),
        unit_price_currency: patch
            .unit_price_currency
            .clone()
            .or_else(|| old.unit_price_currency.clone()),
        pricing_source: patch
            .pricing_source
            .clone()
            .or_else(|| old.pricing_source.clone()),
        guardrail_snapshot: patch
            .guardrail_snapshot
            .clone()
            .or_else(|| old.guardrail_snapshot.clone()),
        timestamp: old.timestamp,
    }
}
