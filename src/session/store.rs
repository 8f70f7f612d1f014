//! Merge-on-write session store over a pluggable storage backend.
//!
//! The store is client-held: one context per session under a single
//! well-known key. The storage medium is an adapter so the merge logic
//! stays testable — in-memory here, browser storage in the real client.
//! A missing or unavailable medium is never an error: reads and writes
//! degrade to `None`.

use crate::clock::{Clock, SystemClock};
use crate::session::context::{merge, DesignContext, DesignContextPatch, CONTEXT_VERSION};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Storage key for the session's design context.
pub const SESSION_KEY: &str = "printgate.design-context";

/// Minimal key-value adapter over the session storage medium.
///
/// Implementations must not panic; an unavailable medium (e.g. privacy
/// mode) is expressed as `None` from `get` and `false` from `put`.
pub trait SessionBackend: Send + Sync {
    /// Read a value, `None` when absent or the medium is unavailable.
    fn get(&self, key: &str) -> Option<String>;
    /// Write a value; `false` when the medium is unavailable.
    fn put(&self, key: &str, value: &str) -> bool;
    /// Remove a value. No-op when absent or unavailable.
    fn remove(&self, key: &str);
}

/// In-memory backend for tests and single-process embedding.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    cells: RwLock<HashMap<String, String>>,
}

impl MemoryBackend {
    /// Create an empty in-memory backend.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionBackend for MemoryBackend {
    fn get(&self, key: &str) -> Option<String> {
        self.cells.read().ok()?.get(key).cloned()
    }

    fn put(&self, key: &str, value: &str) -> bool {
        match self.cells.write() {
            Ok(mut cells) => {
                cells.insert(key.to_string(), value.to_string());
                true
            }
            Err(_) => false,
        }
    }

    fn remove(&self, key: &str) {
        if let Ok(mut cells) = self.cells.write() {
            cells.remove(key);
        }
    }
}

/// Merge-on-write store for the session's [`DesignContext`].
pub struct DesignSessionStore {
    backend: Box<dyn SessionBackend>,
    clock: Arc<dyn Clock>,
}

impl DesignSessionStore {
    /// Create a store over the given backend with the system clock.
    pub fn new(backend: Box<dyn SessionBackend>) -> Self {
        Self::with_clock(backend, Arc::new(SystemClock))
    }

    /// Create a store with a custom clock.
    pub fn with_clock(backend: Box<dyn SessionBackend>, clock: Arc<dyn Clock>) -> Self {
        Self { backend, clock }
    }

    /// Load the current context.
    ///
    /// Returns `None` when nothing is stored, the medium is unavailable,
    /// the stored JSON is malformed, or the schema version differs.
    pub fn load(&self) -> Option<DesignContext> {
        let raw = self.backend.get(SESSION_KEY)?;
        match serde_json::from_str::<DesignContext>(&raw) {
            Ok(ctx) if ctx.version == CONTEXT_VERSION => Some(ctx),
            Ok(ctx) => {
                tracing::warn!(
                    stored_version = ctx.version,
                    expected = CONTEXT_VERSION,
                    "discarding design context with unknown schema version"
                );
                None
            }
            Err(err) => {
                tracing::warn!(error = %err, "discarding malformed design context");
                None
            }
        }
    }

    /// Shallow-merge a patch over the current context and write it back,
    /// stamping `timestamp` to now.
    ///
    /// Returns the merged context, or `None` when the medium is
    /// unavailable.
    pub fn save(&self, patch: &DesignContextPatch) -> Option<DesignContext> {
        let now = self.clock.now_utc();
        let current = self.load().unwrap_or_else(|| DesignContext::empty(now));
        let mut merged = merge(&current, patch);
        merged.timestamp = now;

        let json = match serde_json::to_string(&merged) {
            Ok(json) => json,
            Err(err) => {
                tracing::warn!(error = %err, "failed to serialize design context");
                return None;
            }
        };
        if !self.backend.put(SESSION_KEY, &json) {
            return None;
        }
        Some(merged)
    }

    /// Record a checkout attempt, optionally merging other fields in the
    /// same write.
    pub fn mark_checkout_attempt(
        &self,
        patch: Option<&DesignContextPatch>,
    ) -> Option<DesignContext> {
        let mut stamped = patch.cloned().unwrap_or_default();
        stamped.last_checkout_attempt_at = Some(self.clock.now_utc());
        self.save(&stamped)
    }

    /// Destroy the stored context (post-order or session end).
    pub fn clear(&self) {
        self.backend.remove(SESSION_KEY);
    }
}
