//! Per-virtual-cluster sync context
//!
//! Every translation call receives a [`SyncContext`] owned by the virtual
//! cluster's root struct and passed by reference to every controller. There
//! is no process-wide default: multiple virtual clusters in one process each
//! carry their own context, store, and registry.
//!
//! The context also carries the *ambient owning mapping* for the current
//! reconcile. Syncing a Pod establishes "this Pod owns the lookups performed
//! while processing it", so a Secret lookup made on the Pod's behalf is
//! attributed to the Pod without threading an extra parameter through every
//! call. Omitting the owner is legal and degrades to not recording.

use std::sync::Arc;

use async_trait::async_trait;
use kube::api::{Api, DynamicObject, ListParams};
use kube::Client;

use crate::config::VirtualClusterConfig;
use crate::mappings::index::HostNameIndex;
use crate::mappings::store::MappingStore;
use crate::types::{NameMapping, ResourceKind};
use crate::Result;

/// Read access to the virtual cluster's objects.
///
/// Abstracted so migration and reverse lookups can run against a live
/// cluster in production and against fixtures in tests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectLister: Send + Sync {
    /// List all objects of a kind across all virtual namespaces.
    async fn list(&self, kind: &ResourceKind) -> Result<Vec<DynamicObject>>;
}

/// [`ObjectLister`] backed by the virtual cluster's API server.
pub struct ClusterLister {
    client: Client,
}

impl ClusterLister {
    /// Create a lister over the given virtual-cluster client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectLister for ClusterLister {
    async fn list(&self, kind: &ResourceKind) -> Result<Vec<DynamicObject>> {
        let ar = kind.api_resource();
        let api: Api<DynamicObject> = Api::all_with(self.client.clone(), &ar);
        let list = api.list(&ListParams::default()).await?;
        Ok(list.items)
    }
}

/// The context threaded through every mapping call.
///
/// Cheap to clone: all state is behind `Arc`s except the per-request owner.
#[derive(Clone)]
pub struct SyncContext {
    config: Arc<VirtualClusterConfig>,
    store: Arc<MappingStore>,
    index: Arc<HostNameIndex>,
    virtual_objects: Arc<dyn ObjectLister>,
    owner: Option<NameMapping>,
}

impl SyncContext {
    /// Create the root context for one virtual cluster.
    pub fn new(
        config: Arc<VirtualClusterConfig>,
        store: Arc<MappingStore>,
        index: Arc<HostNameIndex>,
        virtual_objects: Arc<dyn ObjectLister>,
    ) -> Self {
        Self {
            config,
            store,
            index,
            virtual_objects,
            owner: None,
        }
    }

    /// The virtual cluster configuration.
    pub fn config(&self) -> &VirtualClusterConfig {
        &self.config
    }

    /// The mapping store.
    pub fn store(&self) -> &MappingStore {
        &self.store
    }

    /// The reverse-lookup index over the virtual cluster's objects.
    pub fn index(&self) -> &HostNameIndex {
        &self.index
    }

    /// Read access to the virtual cluster's objects.
    pub fn virtual_objects(&self) -> &dyn ObjectLister {
        self.virtual_objects.as_ref()
    }

    /// The ambient owning mapping for the current reconcile, if any.
    pub fn owner(&self) -> Option<&NameMapping> {
        self.owner.as_ref()
    }

    /// Derive a request-scoped context attributing subsequent lookups to
    /// `owner`. The parent context is untouched.
    pub fn with_owner(&self, owner: NameMapping) -> Self {
        let mut child = self.clone();
        child.owner = Some(owner);
        child
    }
}

#[cfg(test)]
mod tests {
    use k8s_openapi::api::core::v1::Pod;

    use super::*;
    use crate::mappings::backend::MemoryBackend;
    use crate::types::ObjectName;

    fn test_context() -> SyncContext {
        let config = Arc::new(VirtualClusterConfig::new("tenant-a", "vc-tenant-a"));
        let store = Arc::new(MappingStore::with_backend(Arc::new(MemoryBackend::default())));
        let index = Arc::new(HostNameIndex::new());
        let lister = Arc::new(MockObjectLister::new());
        SyncContext::new(config, store, index, lister)
    }

    #[test]
    fn root_context_has_no_owner() {
        let ctx = test_context();
        assert!(ctx.owner().is_none());
    }

    #[test]
    fn with_owner_derives_without_mutating_parent() {
        let ctx = test_context();
        let owner = NameMapping::new(
            ResourceKind::of::<Pod>(),
            ObjectName::namespaced("ns1", "web-0"),
            ObjectName::namespaced("vc-tenant-a", "web-0-x-ns1-x-tenant-a"),
        );

        let child = ctx.with_owner(owner.clone());
        assert_eq!(child.owner(), Some(&owner));
        assert!(ctx.owner().is_none());

        // Derived contexts share the same store
        assert!(Arc::ptr_eq(&ctx.store, &child.store));
    }
}
