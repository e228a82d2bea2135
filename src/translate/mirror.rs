//! Mirror translation strategies
//!
//! Mirrored kinds keep the same identity on both sides. [`MirrorMapper`]
//! mirrors virtual-originated objects into the host cluster;
//! [`MirrorHostMapper`] passes host-originated objects (nodes, for
//! instance) through unchanged into the virtual view.

use std::sync::Arc;

use async_trait::async_trait;
use kube::api::DynamicObject;

use crate::config::VirtualClusterConfig;
use crate::context::SyncContext;
use crate::mappings::Mapper;
use crate::translate::{self, annotations};
use crate::types::{ObjectName, ResourceKind};
use crate::Result;

/// Identity translation for virtual-originated objects.
pub struct MirrorMapper {
    kind: ResourceKind,
    config: Arc<VirtualClusterConfig>,
    scheme: String,
}

impl MirrorMapper {
    /// Create a mirror mapper for a kind.
    pub fn new(kind: ResourceKind, config: Arc<VirtualClusterConfig>) -> Self {
        let scheme = translate::scheme_fingerprint(&config, "mirror");
        Self {
            kind,
            config,
            scheme,
        }
    }
}

#[async_trait]
impl Mapper for MirrorMapper {
    fn kind(&self) -> ResourceKind {
        self.kind.clone()
    }

    fn scheme(&self) -> String {
        self.scheme.clone()
    }

    async fn virtual_to_host(
        &self,
        _ctx: &SyncContext,
        name: &ObjectName,
        _obj: Option<&DynamicObject>,
    ) -> Result<ObjectName> {
        Ok(name.clone())
    }

    async fn host_to_virtual(
        &self,
        _ctx: &SyncContext,
        name: &ObjectName,
        obj: Option<&DynamicObject>,
    ) -> Result<ObjectName> {
        if let Some(obj) = obj {
            if let Some(identity) = annotations::recorded_identity(obj, &self.kind) {
                return Ok(identity);
            }
        }
        Ok(name.clone())
    }

    async fn is_managed(&self, _ctx: &SyncContext, obj: &DynamicObject) -> Result<bool> {
        Ok(annotations::managed_by(obj) == Some(self.config.name.as_str()))
    }
}

/// Pass-through for host-originated objects mirrored into the virtual view.
///
/// These objects belong to the host cluster; Burrow never mutates them, so
/// `is_managed` is always false.
pub struct MirrorHostMapper {
    kind: ResourceKind,
    scheme: String,
}

impl MirrorHostMapper {
    /// Create a host-mirror mapper for a kind.
    pub fn new(kind: ResourceKind) -> Self {
        Self {
            kind,
            scheme: "mirror-host".to_string(),
        }
    }
}

#[async_trait]
impl Mapper for MirrorHostMapper {
    fn kind(&self) -> ResourceKind {
        self.kind.clone()
    }

    fn scheme(&self) -> String {
        self.scheme.clone()
    }

    async fn virtual_to_host(
        &self,
        _ctx: &SyncContext,
        name: &ObjectName,
        _obj: Option<&DynamicObject>,
    ) -> Result<ObjectName> {
        Ok(name.clone())
    }

    async fn host_to_virtual(
        &self,
        _ctx: &SyncContext,
        name: &ObjectName,
        obj: Option<&DynamicObject>,
    ) -> Result<ObjectName> {
        if let Some(obj) = obj {
            if let Some(identity) = annotations::recorded_identity(obj, &self.kind) {
                return Ok(identity);
            }
        }
        Ok(name.clone())
    }

    async fn is_managed(&self, _ctx: &SyncContext, _obj: &DynamicObject) -> Result<bool> {
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use k8s_openapi::api::core::v1::Node;

    use super::*;
    use crate::context::MockObjectLister;
    use crate::mappings::backend::MemoryBackend;
    use crate::mappings::index::HostNameIndex;
    use crate::mappings::store::MappingStore;
    use crate::types::NameMapping;

    fn context() -> SyncContext {
        SyncContext::new(
            Arc::new(VirtualClusterConfig::new("tenant-a", "vc-tenant-a")),
            Arc::new(MappingStore::with_backend(Arc::new(MemoryBackend::default()))),
            Arc::new(HostNameIndex::new()),
            Arc::new(MockObjectLister::new()),
        )
    }

    #[tokio::test]
    async fn node_with_no_annotation_mirrors_identically() {
        let ctx = context();
        let mapper = MirrorHostMapper::new(ResourceKind::of::<Node>());

        let back = mapper
            .host_to_virtual(&ctx, &ObjectName::cluster_scoped("node-a"), None)
            .await
            .unwrap();
        assert_eq!(back, ObjectName::cluster_scoped("node-a"));
        assert_eq!(back.namespace, "");

        let forward = mapper
            .virtual_to_host(&ctx, &ObjectName::cluster_scoped("node-a"), None)
            .await
            .unwrap();
        assert_eq!(forward, ObjectName::cluster_scoped("node-a"));
    }

    #[tokio::test]
    async fn annotation_override_beats_identity() {
        let ctx = context();
        let kind = ResourceKind::of::<Node>();
        let mapper = MirrorHostMapper::new(kind.clone());
        let ar = kind.api_resource();

        let mut obj = DynamicObject::new("node-a", &ar);
        annotations::record_identity(
            &mut obj,
            &NameMapping::new(
                kind,
                ObjectName::cluster_scoped("renamed-node"),
                ObjectName::cluster_scoped("node-a"),
            ),
            "tenant-a",
        );

        let back = mapper
            .host_to_virtual(&ctx, &ObjectName::cluster_scoped("node-a"), Some(&obj))
            .await
            .unwrap();
        assert_eq!(back, ObjectName::cluster_scoped("renamed-node"));
    }

    #[tokio::test]
    async fn host_mirrored_objects_are_never_managed() {
        let ctx = context();
        let kind = ResourceKind::of::<Node>();
        let mapper = MirrorHostMapper::new(kind.clone());
        let obj = DynamicObject::new("node-a", &kind.api_resource());
        assert!(!mapper.is_managed(&ctx, &obj).await.unwrap());
    }

    #[tokio::test]
    async fn virtual_mirror_is_managed_only_when_labelled_ours() {
        let ctx = context();
        let kind = ResourceKind::of::<Node>();
        let mapper = MirrorMapper::new(kind.clone(), Arc::new(ctx.config().clone()));
        let ar = kind.api_resource();

        let plain = DynamicObject::new("obj", &ar);
        assert!(!mapper.is_managed(&ctx, &plain).await.unwrap());

        let mut ours = DynamicObject::new("obj", &ar);
        ours.metadata.labels = Some(std::collections::BTreeMap::from([(
            annotations::MANAGED_BY_LABEL.to_string(),
            "tenant-a".to_string(),
        )]));
        assert!(mapper.is_managed(&ctx, &ours).await.unwrap());
    }
}
