//! # Printgate
//!
//! **Design-to-fulfillment consistency core for print-on-demand checkout
//! funnels.**
//!
//! Printgate keeps three things consistent across an untrusted client, a
//! payment processor, and a third-party print provider: the design the
//! customer approved, the product variant they are charged for, and the
//! webhook events confirming provider-side production — while the
//! client-held state can be lost, duplicated, or replayed at any point.
//!
//! ## Components
//!
//! - **Guardrail engine** — pure DPI / safe-area evaluation gating the
//!   editor's "continue" action
//! - **Design session store** — merge-on-write session context over a
//!   pluggable storage backend
//! - **Template registry** — TTL-expiring directory bridging an
//!   ephemeral session to a provider-issued design template
//! - **Consistency gate** — variant/template cross-validation and price
//!   resolution before money changes hands
//! - **Webhook ingestion** — HMAC-verified, deduplicated, durably
//!   archived provider events despite at-least-once delivery
//!
//! ## Quickstart
//!
//! ```no_run
//! use printgate::{FunnelManager, PrintgateConfig};
//!
//! fn main() -> Result<(), printgate::PrintgateError> {
//!     let manager = FunnelManager::new(PrintgateConfig::from_env())?;
//!
//!     // Webhook deliveries are verified, deduplicated, and archived;
//!     // redelivery is observably idempotent.
//!     let headers = vec![("x-pf-event-id".to_string(), "evt_1".to_string())];
//!     let receipt = manager.ingest_webhook(&headers, br#"{"type":"order_created"}"#)?;
//!
//!     println!(
//!         "event {} archived at {:?} (verified: {})",
//!         receipt.event_id, receipt.archived_path, receipt.signature_validated
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Trust model
//!
//! - The client is untrusted: every checkout and order-creation claim is
//!   cross-validated against the server-side template registry before a
//!   payment session is created.
//! - Webhook deliveries are authenticated with a shared-secret
//!   HMAC-SHA256 over the raw body, compared in constant time. Without a
//!   configured secret, events are accepted but explicitly marked as
//!   using an unverified fallback — never indistinguishable from
//!   verified ones.
//! - The template registry is process-local and best-effort: losing it
//!   degrades the editor back to create mode but cannot corrupt money
//!   flow.

#![deny(warnings)]
#![deny(missing_docs)]
#![doc(html_root_url = "https://docs.rs/printgate/0.1.0")]

// Core modules
pub mod clock;
pub mod config;
pub mod errors;

// Guardrail layer
pub mod guardrail;

// Session layer
pub mod session;

// Registry layer
pub mod registry;

// Consistency gate
pub mod gate;

// Protocol layer
pub mod protocol;

// Provider client
pub mod client;

// Webhook ingestion
pub mod webhook;

// Manager (main public API)
pub mod manager;

// Re-exports for public API
pub use clock::{Clock, SystemClock};
pub use config::PrintgateConfig;
pub use errors::PrintgateError;
pub use gate::{LineItemClaim, LineItemMeta, PaymentGateway};
pub use guardrail::{DpiStatus, GuardrailInput, GuardrailState, Tone};
pub use manager::FunnelManager;
pub use registry::{TemplateRecord, TemplateRegistry, TemplateUpsert};
pub use session::context::{DesignContext, DesignContextPatch};
pub use session::store::{DesignSessionStore, MemoryBackend, SessionBackend};

#[cfg(any(test, feature = "test-seams"))]
pub use clock::ManualClock;
