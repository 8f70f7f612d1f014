//! Funnel Manager - the main public API for Printgate.
//!
//! The `FunnelManager` composes the consistency core behind one struct:
//! - template registration and lookup for the embedded editor
//! - variant/template consistency gating for checkout and order creation
//! - provider nonce issuance
//! - idempotent webhook ingestion
//!
//! A host HTTP server maps each endpoint contract to one method and
//! translates errors with [`PrintgateError::http_status`].

use crate::client::http::ProviderClient;
use crate::clock::{Clock, SystemClock};
use crate::config::PrintgateConfig;
use crate::errors::PrintgateError;
use crate::gate::{self, LineItemClaim, LineItemMeta, PaymentGateway};
use crate::protocol::models::{
    CheckoutRequest, CheckoutResponse, MockCheckout, NonceRequest, NonceResponse, OrderCreateRequest,
    ShippingOption, TemplateLookupResponse, TemplateSaveRequest, TemplateSaveResponse,
    TemplateStatus, WebhookReceipt,
};
use crate::registry::{TemplateRegistry, TemplateUpsert};
use crate::webhook::archive::EventArchive;
use crate::webhook::ingest;
use std::sync::Arc;

/// Main funnel orchestrator.
///
/// Create one instance per process and reuse it for all requests.
pub struct FunnelManager {
    config: PrintgateConfig,
    clock: Arc<dyn Clock>,
    registry: TemplateRegistry,
    archive: EventArchive,
    provider: Option<ProviderClient>,
    payment: Option<Box<dyn PaymentGateway>>,
}

impl FunnelManager {
    /// Create a manager with the given configuration and system clock.
    ///
    /// # Errors
    /// Returns an error if configuration validation fails or the archive
    /// directory cannot be created.
    pub fn new(config: PrintgateConfig) -> Result<Self, PrintgateError> {
        config.validate()?;
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a manager with a custom clock (for testing).
    #[cfg(any(test, feature = "test-seams"))]
    pub fn new_with_clock(
        config: PrintgateConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, PrintgateError> {
        config.validate()?;
        Self::with_clock(config, clock)
    }

    fn with_clock(config: PrintgateConfig, clock: Arc<dyn Clock>) -> Result<Self, PrintgateError> {
        let archive = match &config.archive_dir {
            Some(dir) => EventArchive::at_dir(dir.clone())?,
            None => EventArchive::new(&config.archive_namespace)?,
        };
        let provider = match &config.provider_token {
            Some(token) => Some(ProviderClient::new(token)?),
            None => None,
        };
        let registry = TemplateRegistry::with_clock(config.template_ttl, clock.clone());

        Ok(Self {
            config,
            clock,
            registry,
            archive,
            provider,
            payment: None,
        })
    }

    /// Attach the payment-session collaborator.
    ///
    /// Without one, checkout returns a mock payload and no charge ever
    /// happens (local/dev convenience).
    pub fn with_payment_gateway(mut self, gateway: Box<dyn PaymentGateway>) -> Self {
        self.payment = Some(gateway);
        self
    }

    /// Replace the provider client (for testing against a local stub).
    #[cfg(any(test, feature = "test-seams"))]
    pub fn with_provider_client(mut self, client: ProviderClient) -> Self {
        self.provider = Some(client);
        self
    }

    /// `POST checkout`: validate the claim and create a payment session.
    ///
    /// # Errors
    /// - `Validation` — bad variant/quantity/price, or an unavailable
    ///   express selection
    /// - `NotFound` / `VariantMismatch` — consistency-gate rejections
    /// - `ConfigurationMissing` — no standard shipping rate while a real
    ///   payment session is being created
    pub fn checkout(&self, request: &CheckoutRequest) -> Result<CheckoutResponse, PrintgateError> {
        let claim = LineItemClaim {
            variant_id: request.variant_id,
            template_store_id: request.template_store_id.clone(),
            template_id: request.template_id.clone(),
            quantity: request.quantity,
            unit_price_cents: request.unit_price_cents,
            currency: request.currency.clone(),
            pricing: request.pricing.clone(),
        };
        let meta = gate::resolve_line_item(&self.registry, &self.config, &claim)?;

        // Express availability is part of the price contract, so the
        // selection is validated even when no real session is created.
        if request.shipping_option == ShippingOption::Express {
            gate::resolve_shipping_rate(&self.config, ShippingOption::Express)?;
        }

        match &self.payment {
            Some(gateway) => {
                let rate = gate::resolve_shipping_rate(&self.config, request.shipping_option)?;
                let session = gateway.create_session(&meta, request.email.as_deref(), &rate)?;
                Ok(CheckoutResponse::Session(session))
            }
            None => {
                tracing::debug!("payment collaborator unconfigured; returning mock checkout");
                Ok(CheckoutResponse::Mock(MockCheckout {
                    mock: true,
                    line_item: meta,
                }))
            }
        }
    }

    /// `POST order-create`: run the same consistency check as checkout
    /// and return the resolved line item.
    pub fn create_order(
        &self,
        request: &OrderCreateRequest,
    ) -> Result<LineItemMeta, PrintgateError> {
        let claim = LineItemClaim {
            variant_id: request.variant_id,
            template_store_id: request.template_store_id.clone(),
            template_id: request.template_id.clone(),
            quantity: request.quantity,
            unit_price_cents: request.unit_price_cents,
            currency: request.currency.clone(),
            pricing: None,
        };
        gate::resolve_line_item(&self.registry, &self.config, &claim)
    }

    /// `POST nonce-issuance`: request an editor-embedding nonce and
    /// resolve the live template id for edit mode.
    ///
    /// # Errors
    /// - `Validation` — empty external product id
    /// - `ProviderUnconfigured` — no provider token
    /// - `UpstreamUnavailable` — provider failure, timeout, or shape
    ///   mismatch
    pub fn issue_nonce(&self, request: &NonceRequest) -> Result<NonceResponse, PrintgateError> {
        if request.external_product_id.trim().is_empty() {
            return Err(PrintgateError::Validation(
                "externalProductId must be a non-empty string".to_string(),
            ));
        }
        let provider = self
            .provider
            .as_ref()
            .ok_or(PrintgateError::ProviderUnconfigured)?;

        let issued = provider.issue_nonce(
            &request.external_product_id,
            request.external_customer_id.as_deref(),
        )?;
        let template_id = self
            .registry
            .get_by_external_product_id(&request.external_product_id)
            .and_then(|record| record.template_id);

        Ok(NonceResponse {
            nonce: issued.nonce,
            template_id,
            expires_at: issued.expires_at,
        })
    }

    /// `GET template-lookup/{externalProductId}`: infallible summary of
    /// the registered template for a product. Hosts must serve this with
    /// `Cache-Control: no-store`.
    pub fn lookup_template(&self, external_product_id: &str) -> TemplateLookupResponse {
        let record = self.registry.get_by_external_product_id(external_product_id);
        TemplateLookupResponse {
            external_product_id: external_product_id.to_string(),
            printful_product_id: self.config.catalog.get(external_product_id).copied(),
            template: TemplateStatus {
                exists: record.is_some(),
                template_id: record.and_then(|r| r.template_id),
            },
        }
    }

    /// `POST template-save`: register the template the editor reported.
    pub fn save_template(
        &self,
        request: &TemplateSaveRequest,
    ) -> Result<TemplateSaveResponse, PrintgateError> {
        if request.template_id.trim().is_empty() {
            return Err(PrintgateError::Validation(
                "templateId must be a non-empty string".to_string(),
            ));
        }
        if request.variant_id == 0 {
            return Err(PrintgateError::Validation(
                "variantId must be a positive integer".to_string(),
            ));
        }
        if request.external_product_id.trim().is_empty() {
            return Err(PrintgateError::Validation(
                "externalProductId must be a non-empty string".to_string(),
            ));
        }

        let record = self.registry.upsert(TemplateUpsert {
            template_store_id: request.template_store_id.clone(),
            template_id: Some(request.template_id.clone()),
            variant_id: request.variant_id,
            external_product_id: request.external_product_id.clone(),
            design_url: request.design_url.clone(),
            printful_file_id: None,
            printful_file_url: None,
        });
        tracing::debug!(
            template_store_id = %record.template_store_id,
            source = request.source.as_deref().unwrap_or("unknown"),
            "registered design template"
        );

        Ok(TemplateSaveResponse {
            template_store_id: record.template_store_id,
            stored_at: record.created_at,
            design_url: record.design_url,
            printful_file_id: record.printful_file_id,
            printful_file_url: record.printful_file_url,
        })
    }

    /// `POST webhook-ingest`: verify, deduplicate, and archive one
    /// provider delivery.
    pub fn ingest_webhook(
        &self,
        headers: &[(String, String)],
        body: &[u8],
    ) -> Result<WebhookReceipt, PrintgateError> {
        ingest::ingest(
            &self.config,
            &self.archive,
            self.clock.as_ref(),
            headers,
            body,
        )
    }

    /// The active configuration.
    pub fn config(&self) -> &PrintgateConfig {
        &self.config
    }

    /// The template registry.
    pub fn registry(&self) -> &TemplateRegistry {
        &self.registry
    }
}
