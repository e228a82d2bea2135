//! Reverse-lookup index over the virtual cluster's object cache
//!
//! Derived translations are pure functions on the forward path; the reverse
//! path needs to find which virtual object produced a given host identity.
//! The index is maintained incrementally from watcher events over the
//! virtual cluster's objects, keyed by the computed host identity string,
//! so reverse lookups are O(1) against in-memory state rather than a scan.
//!
//! Lookups distinguish three outcomes: not found (normal — the host object
//! is not one we manage), ambiguous (two virtual objects claim one host
//! key), and inconsistent (the cache itself is broken). All three are
//! values or typed errors; the library never aborts the process from a
//! lookup.

use std::collections::BTreeSet;

use dashmap::DashMap;
use futures::{Stream, StreamExt};
use kube::api::DynamicObject;
use kube::runtime::watcher;
use tracing::warn;

use crate::types::{ObjectName, ResourceKind};
use crate::{Error, Result};

type ReverseKey = (ResourceKind, String);
type ForwardKey = (ResourceKind, ObjectName);

/// Index from computed host identity to the virtual objects claiming it.
///
/// Uses `DashMap` for per-key granularity: reconcile-hot reads never block
/// behind maintenance writes for other kinds.
#[derive(Default)]
pub struct HostNameIndex {
    /// host identity key -> virtual identities claiming it
    reverse: DashMap<ReverseKey, BTreeSet<ObjectName>>,
    /// virtual identity -> the host key it currently occupies
    forward: DashMap<ForwardKey, String>,
}

impl HostNameIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// The index key for a host identity.
    pub fn key(host_name: &ObjectName) -> String {
        host_name.to_string()
    }

    /// Record that `virtual_name` currently translates to `host_name`.
    ///
    /// Replaces any previous claim the same virtual object held.
    pub fn insert(
        &self,
        kind: &ResourceKind,
        virtual_name: ObjectName,
        host_name: &ObjectName,
    ) {
        let key = Self::key(host_name);
        let fkey = (kind.clone(), virtual_name.clone());

        if let Some(previous) = self.forward.insert(fkey, key.clone()) {
            if previous != key {
                self.drop_claim(kind, &previous, &virtual_name);
            }
        }

        self.reverse
            .entry((kind.clone(), key))
            .or_default()
            .insert(virtual_name);
    }

    /// Remove a virtual object's claim (object deleted or no longer ours).
    pub fn remove(&self, kind: &ResourceKind, virtual_name: &ObjectName) {
        if let Some((_, key)) = self.forward.remove(&(kind.clone(), virtual_name.clone())) {
            self.drop_claim(kind, &key, virtual_name);
        }
    }

    fn drop_claim(&self, kind: &ResourceKind, key: &str, virtual_name: &ObjectName) {
        let rkey = (kind.clone(), key.to_string());
        let emptied = match self.reverse.get_mut(&rkey) {
            Some(mut set) => {
                set.remove(virtual_name);
                set.is_empty()
            }
            None => false,
        };
        if emptied {
            self.reverse.remove_if(&rkey, |_, set| set.is_empty());
        }
    }

    /// Drop all entries for a kind (watch stream restarted from scratch).
    pub fn clear_kind(&self, kind: &ResourceKind) {
        self.reverse.retain(|(k, _), _| k != kind);
        self.forward.retain(|(k, _), _| k != kind);
    }

    /// Find the virtual identity that translates to `host_name`.
    ///
    /// `Ok(None)` is the normal "not one of ours" outcome. More than one
    /// candidate is [`Error::Ambiguous`]; disagreement between the index's
    /// own tables is [`Error::IndexInconsistent`].
    pub fn lookup(
        &self,
        kind: &ResourceKind,
        host_name: &ObjectName,
    ) -> Result<Option<ObjectName>> {
        let key = Self::key(host_name);
        let Some(set) = self.reverse.get(&(kind.clone(), key.clone())) else {
            return Ok(None);
        };

        match set.len() {
            0 => Err(Error::index_inconsistent(
                kind,
                &key,
                "reverse entry exists but holds no candidates",
            )),
            1 => {
                let candidate = set.iter().next().cloned();
                drop(set);
                // The forward table must agree with the claim we found
                if let Some(candidate) = &candidate {
                    match self.forward.get(&(kind.clone(), candidate.clone())) {
                        Some(claimed) if *claimed == key => {}
                        Some(_) | None => {
                            return Err(Error::index_inconsistent(
                                kind,
                                &key,
                                "forward entry disagrees with reverse claim",
                            ));
                        }
                    }
                }
                Ok(candidate)
            }
            n => Err(Error::ambiguous(kind, &key, n)),
        }
    }

    /// Apply one watcher event, computing host identities with `host_identity`.
    ///
    /// Objects for which `host_identity` returns `None` are not ours and are
    /// dropped from the index.
    pub fn apply_event(
        &self,
        kind: &ResourceKind,
        event: &watcher::Event<DynamicObject>,
        host_identity: &dyn Fn(&DynamicObject) -> Option<ObjectName>,
    ) {
        match event {
            watcher::Event::Apply(obj) | watcher::Event::InitApply(obj) => {
                let Some(virtual_name) = identity_of(obj) else {
                    return;
                };
                match host_identity(obj) {
                    Some(host_name) => self.insert(kind, virtual_name, &host_name),
                    None => self.remove(kind, &virtual_name),
                }
            }
            watcher::Event::Delete(obj) => {
                if let Some(virtual_name) = identity_of(obj) {
                    self.remove(kind, &virtual_name);
                }
            }
            watcher::Event::Init => self.clear_kind(kind),
            watcher::Event::InitDone => {}
        }
    }
}

fn identity_of(obj: &DynamicObject) -> Option<ObjectName> {
    let name = obj.metadata.name.clone()?;
    Some(ObjectName {
        namespace: obj.metadata.namespace.clone().unwrap_or_default(),
        name,
    })
}

/// Drive the index from a watcher stream over the virtual cluster.
///
/// Runs until the stream ends. Watch errors are logged and the stream is
/// polled again; the watcher re-lists on resume and re-initializes the
/// index through `Init` events.
pub async fn maintain<S>(
    index: &HostNameIndex,
    kind: &ResourceKind,
    mut events: S,
    host_identity: impl Fn(&DynamicObject) -> Option<ObjectName>,
) where
    S: Stream<Item = std::result::Result<watcher::Event<DynamicObject>, watcher::Error>> + Unpin,
{
    while let Some(event) = events.next().await {
        match event {
            Ok(event) => index.apply_event(kind, &event, &host_identity),
            Err(e) => warn!(error = %e, kind = %kind, "watch error while maintaining index"),
        }
    }
}
