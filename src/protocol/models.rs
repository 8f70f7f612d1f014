//! Wire models for the funnel's HTTP surface.
//!
//! These structs are the request/response contracts of the collaborator
//! endpoints (checkout, nonce issuance, template lookup/save, order
//! creation, webhook ingestion). Field names are camelCase on the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Shipping option selected at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShippingOption {
    /// Standard shipping (the default).
    #[default]
    Standard,
    /// Express shipping; only valid when the feature flag and rate id
    /// are both configured.
    Express,
}

/// Client-supplied pricing hint: subtotal in major currency units.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pricing {
    /// Subtotal in major units (e.g. `34.99`).
    #[serde(default)]
    pub subtotal: Option<f64>,
    /// Currency code.
    #[serde(default)]
    pub currency: Option<String>,
}

/// `POST checkout` request body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    /// Claimed variant id.
    pub variant_id: u32,
    /// Opaque handle of the registered template, if the design was saved.
    #[serde(default)]
    pub template_store_id: Option<String>,
    /// Provider template id claimed directly by the client.
    #[serde(default)]
    pub template_id: Option<String>,
    /// Exported preview image reference.
    #[serde(default)]
    pub design_image: Option<String>,
    /// Customer email for the payment session.
    #[serde(default)]
    pub email: Option<String>,
    /// Number of units; defaults to 1.
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    /// Shipping selection; defaults to standard.
    #[serde(default)]
    pub shipping_option: ShippingOption,
    /// Explicit unit price override in cents.
    #[serde(default)]
    pub unit_price_cents: Option<i64>,
    /// Explicit currency override.
    #[serde(default)]
    pub currency: Option<String>,
    /// Pricing hint used when no explicit price is present.
    #[serde(default)]
    pub pricing: Option<Pricing>,
}

fn default_quantity() -> u32 {
    1
}

/// A created payment session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSession {
    /// Payment-processor session id.
    pub id: String,
    /// Redirect URL for the customer.
    pub url: String,
}

/// Mock checkout payload returned when the payment collaborator is
/// unconfigured (local/dev convenience).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MockCheckout {
    /// Always `true`; distinguishes the mock shape.
    pub mock: bool,
    /// The consistency-checked line item that would have been charged.
    pub line_item: crate::gate::LineItemMeta,
}

/// `POST checkout` response.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum CheckoutResponse {
    /// A real payment session was created.
    Session(CheckoutSession),
    /// The payment collaborator is unconfigured; no charge happens.
    Mock(MockCheckout),
}

/// `POST nonce-issuance` request body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NonceRequest {
    /// External product id; must be non-empty.
    pub external_product_id: String,
    /// Optional stable customer id forwarded to the provider.
    #[serde(default)]
    pub external_customer_id: Option<String>,
}

/// `POST nonce-issuance` response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NonceResponse {
    /// Editor-embedding nonce issued by the provider.
    pub nonce: String,
    /// Live template id for this product, when one is registered
    /// (edit mode).
    pub template_id: Option<String>,
    /// Nonce expiry reported by the provider.
    pub expires_at: Option<DateTime<Utc>>,
}

/// Template existence summary inside [`TemplateLookupResponse`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateStatus {
    /// Whether a live registered template exists for the product.
    pub exists: bool,
    /// Provider template id, when reported.
    pub template_id: Option<String>,
}

/// `GET template-lookup/{externalProductId}` response. Always 200;
/// served with `Cache-Control: no-store`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateLookupResponse {
    /// Echoed external product id.
    pub external_product_id: String,
    /// Provider product id from the catalog mapping, when known.
    pub printful_product_id: Option<i64>,
    /// Registered-template summary.
    pub template: TemplateStatus,
}

/// `POST template-save` request body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSaveRequest {
    /// Provider template id reported by the editor; must be non-empty.
    pub template_id: String,
    /// Variant the design was saved for; must be positive.
    pub variant_id: u32,
    /// External product id; must be non-empty.
    pub external_product_id: String,
    /// Design artifact URL.
    #[serde(default)]
    pub design_url: Option<String>,
    /// Where the save came from (e.g. "edm").
    #[serde(default)]
    pub source: Option<String>,
    /// Existing store id to overwrite when re-saving a known design.
    #[serde(default)]
    pub template_store_id: Option<String>,
}

/// `POST template-save` response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSaveResponse {
    /// Opaque handle for the registered template.
    pub template_store_id: String,
    /// Registration time.
    pub stored_at: DateTime<Utc>,
    /// Echoed design artifact URL.
    pub design_url: Option<String>,
    /// Provider file id, when known.
    pub printful_file_id: Option<i64>,
    /// Provider file URL, when known.
    pub printful_file_url: Option<String>,
}

/// `POST order-create` request body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreateRequest {
    /// Claimed variant id.
    pub variant_id: u32,
    /// Opaque handle of the registered template, if the design was saved.
    #[serde(default)]
    pub template_store_id: Option<String>,
    /// Provider template id claimed directly by the client.
    #[serde(default)]
    pub template_id: Option<String>,
    /// Number of units; defaults to 1.
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    /// Explicit unit price override in cents.
    #[serde(default)]
    pub unit_price_cents: Option<i64>,
    /// Explicit currency override.
    #[serde(default)]
    pub currency: Option<String>,
}

/// `POST webhook-ingest` response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookReceipt {
    /// Always `true` on a 200 response.
    pub received: bool,
    /// Derived, sanitized event id.
    pub event_id: String,
    /// Path of the freshly archived artifact (first delivery only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archived_path: Option<String>,
    /// Path of the original artifact (redeliveries only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplicate_of: Option<String>,
    /// Whether the signature was cryptographically verified.
    pub signature_validated: bool,
    /// Present and `true` only when no secret is configured and the
    /// event was accepted unverified.
    #[serde(skip_serializing_if = "is_false")]
    pub using_unverified_fallback: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}
