//! Per-virtual-cluster mapper registry
//!
//! One registry per virtual cluster, built at startup from the resolved
//! configuration and threaded through explicitly — there is no process-wide
//! default table. Reads are lock-free via `DashMap`; the rare post-startup
//! write (a dynamically-configured export mapper) is immediately visible to
//! concurrently-running reconcilers.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::{info, warn};

use crate::mappings::Mapper;
use crate::types::ResourceKind;
use crate::{Error, Result};

/// Table from resource kind to its mapper instance.
#[derive(Default)]
pub struct MapperRegistry {
    mappers: DashMap<ResourceKind, Arc<dyn Mapper>>,
}

impl MapperRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a mapper under its own kind.
    ///
    /// Replacing an existing registration is tolerated but logged: the
    /// active mapper set is supposed to be a pure function of configuration,
    /// computed once.
    pub fn add_mapper(&self, mapper: Arc<dyn Mapper>) {
        let kind = mapper.kind();
        if self.mappers.insert(kind.clone(), mapper).is_some() {
            warn!(kind = %kind, "replacing previously registered mapper");
        } else {
            info!(kind = %kind, "registered mapper");
        }
    }

    /// Look up the mapper for a kind.
    ///
    /// Fails with [`Error::UnknownKind`] when the kind is unknown or its
    /// sync feature is disabled; callers must treat this as fatal for the
    /// current reconcile attempt, not retryable.
    pub fn by_gvk(&self, kind: &ResourceKind) -> Result<Arc<dyn Mapper>> {
        self.mappers
            .get(kind)
            .map(|m| m.clone())
            .ok_or_else(|| Error::unknown_kind(kind))
    }

    /// True when a mapper is registered for the kind.
    pub fn has(&self, kind: &ResourceKind) -> bool {
        self.mappers.contains_key(kind)
    }

    /// All registered kinds, in a stable order.
    pub fn kinds(&self) -> Vec<ResourceKind> {
        let mut kinds: Vec<ResourceKind> =
            self.mappers.iter().map(|e| e.key().clone()).collect();
        kinds.sort();
        kinds
    }
}
