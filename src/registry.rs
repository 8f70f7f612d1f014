//! Server-side template registry.
//!
//! Bridges an ephemeral client session to a provider-issued design
//! template: an in-memory directory keyed by an opaque store id, with a
//! secondary index by external product id for create/edit-mode
//! resolution. Records expire 12 hours after creation and are purged
//! lazily on the next registry access; there is no timer.
//!
//! The registry is process-local and best-effort. Losing it (restart)
//! must not corrupt money flow — it only degrades edit-mode UX back to
//! create mode. Multi-instance deployments need a shared store instead.

use crate::clock::{Clock, SystemClock};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use uuid::Uuid;

/// A registered template: the bridge between a session and the
/// provider-side design artifact.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateRecord {
    /// Opaque, server-generated primary key.
    pub template_store_id: String,
    /// Provider-issued template id; absent until the editor reports it.
    pub template_id: Option<String>,
    /// Variant the design was saved for.
    pub variant_id: u32,
    /// External (storefront) product id.
    pub external_product_id: String,
    /// URL of the design artifact, if exported.
    pub design_url: Option<String>,
    /// Provider file id of the uploaded design.
    pub printful_file_id: Option<i64>,
    /// Provider file URL of the uploaded design.
    pub printful_file_url: Option<String>,
    /// Registration time; the TTL counts from here.
    pub created_at: DateTime<Utc>,
}

/// Input to [`TemplateRegistry::upsert`].
#[derive(Debug, Clone, Default)]
pub struct TemplateUpsert {
    /// Existing store id to overwrite; a fresh id is generated when
    /// absent.
    pub template_store_id: Option<String>,
    /// Provider-issued template id.
    pub template_id: Option<String>,
    /// Variant the design was saved for.
    pub variant_id: u32,
    /// External product id.
    pub external_product_id: String,
    /// Design artifact URL.
    pub design_url: Option<String>,
    /// Provider file id.
    pub printful_file_id: Option<i64>,
    /// Provider file URL.
    pub printful_file_url: Option<String>,
}

struct RegistryInner {
    by_store_id: HashMap<String, TemplateRecord>,
    /// Most recently upserted live record per external product id.
    by_product: HashMap<String, String>,
    /// Sorted expiry index so purging is O(expired), not O(all entries).
    expiry: BTreeSet<(DateTime<Utc>, String)>,
}

/// TTL-expiring directory of registered templates.
pub struct TemplateRegistry {
    inner: Mutex<RegistryInner>,
    ttl: ChronoDuration,
    clock: Arc<dyn Clock>,
}

impl TemplateRegistry {
    /// Create a registry with the default 12 h TTL and system clock.
    pub fn new() -> Self {
        Self::with_clock(crate::config::TEMPLATE_TTL, Arc::new(SystemClock))
    }

    /// Create a registry with a custom TTL and clock.
    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        let ttl = ChronoDuration::from_std(ttl).unwrap_or_else(|_| ChronoDuration::hours(12));
        Self {
            inner: Mutex::new(RegistryInner {
                by_store_id: HashMap::new(),
                by_product: HashMap::new(),
                expiry: BTreeSet::new(),
            }),
            ttl,
            clock,
        }
    }

    /// Register or overwrite a template.
    ///
    /// Without a caller-supplied store id a fresh opaque id is generated.
    /// A repeat upsert for the same external product id supersedes the
    /// previous record in the product index; the older record stays
    /// reachable by its own store id until its TTL elapses.
    pub fn upsert(&self, input: TemplateUpsert) -> TemplateRecord {
        let now = self.clock.now_utc();
        let mut inner = self.lock();
        purge_expired(&mut inner, now, self.ttl);

        let store_id = input
            .template_store_id
            .unwrap_or_else(|| format!("tsr_{}", Uuid::new_v4().simple()));

        // Overwriting an existing id: drop its old index entries first.
        if let Some(previous) = inner.by_store_id.remove(&store_id) {
            inner.expiry.remove(&(previous.created_at, store_id.clone()));
            if previous.external_product_id != input.external_product_id
                && inner.by_product.get(&previous.external_product_id) == Some(&store_id)
            {
                inner.by_product.remove(&previous.external_product_id);
            }
        }

        let record = TemplateRecord {
            template_store_id: store_id.clone(),
            template_id: input.template_id,
            variant_id: input.variant_id,
            external_product_id: input.external_product_id.clone(),
            design_url: input.design_url,
            printful_file_id: input.printful_file_id,
            printful_file_url: input.printful_file_url,
            created_at: now,
        };

        inner.expiry.insert((now, store_id.clone()));
        inner
            .by_product
            .insert(input.external_product_id, store_id.clone());
        inner.by_store_id.insert(store_id, record.clone());
        record
    }

    /// Look up a record by its opaque store id.
    pub fn get(&self, template_store_id: &str) -> Option<TemplateRecord> {
        let now = self.clock.now_utc();
        let mut inner = self.lock();
        purge_expired(&mut inner, now, self.ttl);
        inner.by_store_id.get(template_store_id).cloned()
    }

    /// Look up the most recent live record for an external product id.
    pub fn get_by_external_product_id(&self, external_product_id: &str) -> Option<TemplateRecord> {
        let now = self.clock.now_utc();
        let mut inner = self.lock();
        purge_expired(&mut inner, now, self.ttl);
        let store_id = inner.by_product.get(external_product_id)?.clone();
        inner.by_store_id.get(&store_id).cloned()
    }

    /// Number of live records (post-purge).
    pub fn len(&self) -> usize {
        let now = self.clock.now_utc();
        let mut inner = self.lock();
        purge_expired(&mut inner, now, self.ttl);
        inner.by_store_id.len()
    }

    /// Whether the registry holds no live records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        // A poisoned lock only means a panic mid-mutation elsewhere; the
        // registry is best-effort cache state, so recover the guard.
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Drop every record with `created_at < now - ttl` from all indexes.
fn purge_expired(inner: &mut RegistryInner, now: DateTime<Utc>, ttl: ChronoDuration) {
    let cutoff = now - ttl;
    while let Some((created_at, store_id)) = inner.expiry.iter().next().cloned() {
        if created_at >= cutoff {
            break;
        }
        inner.expiry.remove(&(created_at, store_id.clone()));
        if let Some(record) = inner.by_store_id.remove(&store_id) {
            if inner.by_product.get(&record.external_product_id) == Some(&store_id) {
                inner.by_product.remove(&record.external_product_id);
            }
        }
    }
}
