//! The persistent mapping store
//!
//! A bidirectional, conflict-detecting table of recorded name mappings.
//! The store is the only component with durable state and the only
//! serialization point for conflicting writes: all table mutations happen
//! under a single mutex, so two concurrent attempts to claim the same
//! identity resolve deterministically into one success and one conflict
//! error.
//!
//! Derived mappings (pure functions of name/namespace) do not need the
//! store; recorded mappings exist because they cannot be re-derived:
//! annotation overrides, custom exports, and indirectly-referenced objects
//! discovered while syncing their referencer.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::mappings::backend::Backend;
use crate::types::{MappingRef, NameMapping, ObjectName, ResourceKind};
use crate::{Error, Result};

/// A persisted mapping plus its garbage-collection back-reference.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedMapping {
    /// The identity correspondence
    pub mapping: NameMapping,
    /// The mapping this one was recorded on behalf of, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<MappingRef>,
}

/// Per-kind translation scheme fingerprint.
///
/// Compared against the freshly-constructed mapper's fingerprint at startup
/// to detect translation strategy changes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemeRecord {
    /// The kind the fingerprint belongs to
    pub kind: ResourceKind,
    /// Opaque fingerprint of the translation scheme
    pub fingerprint: String,
}

/// The store's backing representation, opaque to everything but backends.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedMappings {
    /// All recorded mappings
    #[serde(default)]
    pub mappings: Vec<RecordedMapping>,
    /// Per-kind scheme fingerprints
    #[serde(default)]
    pub schemes: Vec<SchemeRecord>,
}

type IdentityKey = (ResourceKind, ObjectName);

#[derive(Default)]
struct StoreInner {
    by_virtual: HashMap<IdentityKey, RecordedMapping>,
    by_host: HashMap<IdentityKey, ObjectName>,
    schemes: HashMap<ResourceKind, String>,
    dirty: bool,
}

impl StoreInner {
    /// Insert a mapping, enforcing the strict 1:1 invariant per kind in
    /// both directions. Returns `Ok(true)` if newly inserted, `Ok(false)`
    /// if the identical mapping already exists.
    fn insert(&mut self, mapping: NameMapping, owner: Option<MappingRef>) -> Result<bool> {
        let vkey = (mapping.kind.clone(), mapping.virtual_name.clone());
        let hkey = (mapping.kind.clone(), mapping.host_name.clone());

        if let Some(existing) = self.by_virtual.get(&vkey) {
            if existing.mapping.host_name == mapping.host_name {
                return Ok(false);
            }
            return Err(Error::conflict(
                &mapping.kind,
                &existing.mapping,
                &mapping,
            ));
        }

        if let Some(existing_virtual) = self.by_host.get(&hkey) {
            // A different virtual identity already claims this host identity
            let existing = NameMapping::new(
                mapping.kind.clone(),
                existing_virtual.clone(),
                mapping.host_name.clone(),
            );
            return Err(Error::conflict(&mapping.kind, &existing, &mapping));
        }

        self.by_host.insert(hkey, mapping.virtual_name.clone());
        self.by_virtual
            .insert(vkey, RecordedMapping { mapping, owner });
        self.dirty = true;
        Ok(true)
    }

    /// Remove the mapping for a virtual identity and garbage-collect every
    /// mapping transitively owned by it. Returns the number removed.
    fn remove(&mut self, reference: &MappingRef) -> usize {
        let mut queue = vec![reference.clone()];
        let mut removed = 0usize;

        while let Some(current) = queue.pop() {
            let key = (current.kind.clone(), current.virtual_name.clone());
            if let Some(record) = self.by_virtual.remove(&key) {
                self.by_host
                    .remove(&(record.mapping.kind.clone(), record.mapping.host_name));
                removed += 1;
                self.dirty = true;
            }

            // Dependents become eligible once their owner's mapping is gone
            let dependents: Vec<MappingRef> = self
                .by_virtual
                .values()
                .filter(|r| r.owner.as_ref() == Some(&current))
                .map(|r| r.mapping.reference())
                .collect();
            queue.extend(dependents);
        }

        removed
    }

    fn snapshot(&self) -> PersistedMappings {
        let mut mappings: Vec<RecordedMapping> = self.by_virtual.values().cloned().collect();
        mappings.sort_by(|a, b| {
            (&a.mapping.kind, &a.mapping.virtual_name)
                .cmp(&(&b.mapping.kind, &b.mapping.virtual_name))
        });
        let mut schemes: Vec<SchemeRecord> = self
            .schemes
            .iter()
            .map(|(kind, fingerprint)| SchemeRecord {
                kind: kind.clone(),
                fingerprint: fingerprint.clone(),
            })
            .collect();
        schemes.sort_by(|a, b| a.kind.cmp(&b.kind));
        PersistedMappings { mappings, schemes }
    }
}

/// The persistent, conflict-detecting mapping table.
///
/// Shared across all mappers of one virtual cluster via `Arc`. Reads and
/// writes are synchronous and in-memory; only [`MappingStore::save`] and
/// [`MappingStore::load`] touch the backend.
pub struct MappingStore {
    backend: Arc<dyn Backend>,
    inner: Mutex<StoreInner>,
}

impl MappingStore {
    /// Create an empty store over the given backend.
    pub fn with_backend(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            inner: Mutex::new(StoreInner::default()),
        }
    }

    /// Create a store and populate it from the backend.
    ///
    /// Persisted entries that conflict with one another (possible only via
    /// manual edits of the backing state) are skipped with a warning rather
    /// than poisoning startup.
    pub async fn load(backend: Arc<dyn Backend>) -> Result<Self> {
        let state = backend.load().await?;
        let store = Self::with_backend(backend);
        {
            let mut inner = store.lock();
            for record in state.mappings {
                if let Err(e) = inner.insert(record.mapping.clone(), record.owner) {
                    warn!(error = %e, mapping = %record.mapping, "skipping conflicting persisted mapping");
                }
            }
            for scheme in state.schemes {
                inner.schemes.insert(scheme.kind, scheme.fingerprint);
            }
            inner.dirty = false;
        }
        Ok(store)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StoreInner> {
        // A poisoned mutex means a panic mid-insert; the table itself is
        // only mutated after all checks pass, so the data is still sound.
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Persist a dependent mapping attributed to the ambient owner.
    ///
    /// No-op when `owner` is absent: unattributed mappings are not recorded,
    /// preventing unbounded unowned growth. Fails with a conflict error if a
    /// *different* mapping already exists for the same virtual or host
    /// identity; the existing mapping stays intact.
    pub fn record_reference(
        &self,
        mapping: NameMapping,
        owner: Option<&NameMapping>,
    ) -> Result<()> {
        let Some(owner) = owner else {
            debug!(mapping = %mapping, "no owning mapping in context, skipping record");
            return Ok(());
        };

        let owner_ref = owner.reference();
        let mut inner = self.lock();
        if inner.insert(mapping.clone(), Some(owner_ref))? {
            debug!(mapping = %mapping, owner = %owner.virtual_name, "recorded mapping");
        }
        Ok(())
    }

    /// Seed a mapping directly, bypassing the ownership-context requirement.
    ///
    /// Used by migration, which attributes ownership explicitly (or pins a
    /// mapping as self-owned).
    pub fn add_reference(&self, mapping: NameMapping, owner: Option<MappingRef>) -> Result<()> {
        self.lock().insert(mapping, owner)?;
        Ok(())
    }

    /// Seed a mapping and durably persist the store.
    pub async fn add_reference_and_save(
        &self,
        mapping: NameMapping,
        owner: Option<MappingRef>,
    ) -> Result<()> {
        self.add_reference(mapping, owner)?;
        self.save().await
    }

    /// Forward read: the recorded host identity for a virtual identity.
    pub fn virtual_to_host_name(
        &self,
        kind: &ResourceKind,
        virtual_name: &ObjectName,
    ) -> Option<ObjectName> {
        self.lock()
            .by_virtual
            .get(&(kind.clone(), virtual_name.clone()))
            .map(|r| r.mapping.host_name.clone())
    }

    /// Reverse read: the recorded virtual identity for a host identity.
    pub fn host_to_virtual_name(
        &self,
        kind: &ResourceKind,
        host_name: &ObjectName,
    ) -> Option<ObjectName> {
        self.lock()
            .by_host
            .get(&(kind.clone(), host_name.clone()))
            .cloned()
    }

    /// True when a mapping is recorded for this host identity.
    ///
    /// The store is authoritative: once recorded, the object is managed
    /// regardless of annotations.
    pub fn has_host_mapping(&self, kind: &ResourceKind, host_name: &ObjectName) -> bool {
        self.lock()
            .by_host
            .contains_key(&(kind.clone(), host_name.clone()))
    }

    /// Enumerate all persisted mappings, ordered by (kind, virtual name).
    ///
    /// Used by migration verification and diagnostics.
    pub fn list(&self) -> Vec<RecordedMapping> {
        self.lock().snapshot().mappings
    }

    /// Remove the mapping for a virtual identity and garbage-collect all
    /// mappings transitively owned by it. Returns the number removed.
    pub fn remove_mapping(&self, kind: &ResourceKind, virtual_name: &ObjectName) -> usize {
        self.lock().remove(&MappingRef {
            kind: kind.clone(),
            virtual_name: virtual_name.clone(),
        })
    }

    /// Remove every mapping owned by `owner` (without touching the owner's
    /// own mapping). Returns the number removed.
    pub fn remove_owned_by(&self, owner: &MappingRef) -> usize {
        let mut inner = self.lock();
        let dependents: Vec<MappingRef> = inner
            .by_virtual
            .values()
            .filter(|r| r.owner.as_ref() == Some(owner) && r.mapping.reference() != *owner)
            .map(|r| r.mapping.reference())
            .collect();
        dependents.iter().map(|d| inner.remove(d)).sum()
    }

    /// The persisted scheme fingerprint for a kind, if any.
    pub fn scheme(&self, kind: &ResourceKind) -> Option<String> {
        self.lock().schemes.get(kind).cloned()
    }

    /// Record the scheme fingerprint for a kind.
    pub fn set_scheme(&self, kind: &ResourceKind, fingerprint: impl Into<String>) {
        let mut inner = self.lock();
        inner.schemes.insert(kind.clone(), fingerprint.into());
        inner.dirty = true;
    }

    /// Persist the current table through the backend.
    ///
    /// Skipped when nothing changed since the last save.
    pub async fn save(&self) -> Result<()> {
        let snapshot = {
            let mut inner = self.lock();
            if !inner.dirty {
                return Ok(());
            }
            inner.dirty = false;
            inner.snapshot()
        };

        if let Err(e) = self.backend.save(&snapshot).await {
            self.lock().dirty = true;
            return Err(e);
        }
        Ok(())
    }
}
