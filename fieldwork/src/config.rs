//! Per-builder configuration.

use std::collections::BTreeMap;

use crate::middleware::MiddlewareEntry;

/// Configuration shared by a builder and its nested children.
///
/// Defaults to mutable in-place updates with no middleware. The global
/// pipeline runs on every write (subject to each entry's own field scoping),
/// then the written field's pipeline runs seeded with the global result.
#[derive(Clone, Default)]
pub struct BuilderConfig {
    /// Copy-on-write updates: every committed write swaps in a fresh record,
    /// so previously taken snapshots keep their identity and contents.
    pub immutable: bool,
    pub(crate) global: Vec<MiddlewareEntry>,
    pub(crate) fields: BTreeMap<String, Vec<MiddlewareEntry>>,
}

impl BuilderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle copy-on-write updates.
    pub fn immutable(mut self, immutable: bool) -> Self {
        self.immutable = immutable;
        self
    }

    /// Append an entry to the global pipeline.
    pub fn with(mut self, entry: MiddlewareEntry) -> Self {
        self.global.push(entry);
        self
    }

    /// Append an entry to `field`'s pipeline, applied after the global
    /// pipeline.
    pub fn with_field(mut self, field: impl Into<String>, entry: MiddlewareEntry) -> Self {
        self.fields.entry(field.into()).or_default().push(entry);
        self
    }

    pub(crate) fn field_entries(&self, field: &str) -> &[MiddlewareEntry] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }
}
