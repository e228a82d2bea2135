//! Event mapper
//!
//! Events flow host → virtual only: the virtual view shows events for the
//! objects it owns. An event's virtual identity is derived from its
//! involved object — the event lands in whatever virtual namespace the
//! involved object resolves to. Events whose involved object's kind has no
//! registered mapper are dropped (zero identity), unless the force-sync
//! annotation places them in the fallback namespace.

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Event;
use kube::api::DynamicObject;
use serde_json::Value;

use crate::context::SyncContext;
use crate::mappings::{Mapper, MapperRegistry};
use crate::translate::annotations;
use crate::types::{ObjectName, ResourceKind};
use crate::Result;

/// Virtual namespace receiving force-synced events whose involved object
/// cannot be mapped.
pub const FALLBACK_EVENT_NAMESPACE: &str = "default";

/// Build the event mapper.
///
/// Holds a weak reference to the registry it lives in; the registry owns
/// its mappers, not the other way around.
pub fn mapper(registry: Weak<MapperRegistry>) -> Arc<dyn Mapper> {
    Arc::new(EventMapper { registry })
}

/// Host-to-virtual-only mapper resolving identity through the involved
/// object's own mapper.
pub struct EventMapper {
    registry: Weak<MapperRegistry>,
}

#[async_trait]
impl Mapper for EventMapper {
    fn kind(&self) -> ResourceKind {
        ResourceKind::of::<Event>()
    }

    fn scheme(&self) -> String {
        "events".to_string()
    }

    async fn virtual_to_host(
        &self,
        _ctx: &SyncContext,
        _name: &ObjectName,
        _obj: Option<&DynamicObject>,
    ) -> Result<ObjectName> {
        // Virtual-side events are never projected into the host cluster
        Ok(ObjectName::empty())
    }

    async fn host_to_virtual(
        &self,
        ctx: &SyncContext,
        name: &ObjectName,
        obj: Option<&DynamicObject>,
    ) -> Result<ObjectName> {
        let Some(obj) = obj else {
            return Ok(ObjectName::empty());
        };
        let Some(registry) = self.registry.upgrade() else {
            return Ok(ObjectName::empty());
        };

        let Some(involved) = obj.data.get("involvedObject") else {
            return Ok(ObjectName::empty());
        };
        let (Some(kind), Some(involved_name)) = (
            involved.get("kind").and_then(Value::as_str),
            involved.get("name").and_then(Value::as_str),
        ) else {
            return Ok(ObjectName::empty());
        };
        let api_version = involved
            .get("apiVersion")
            .and_then(Value::as_str)
            .unwrap_or("v1");
        let involved_kind = ResourceKind::from_api_version(api_version, kind);

        let Ok(involved_mapper) = registry.by_gvk(&involved_kind) else {
            // Involved kind is not synced: drop the event, unless it is
            // explicitly forced into the fallback namespace.
            if annotations::is_force_sync(obj) {
                return Ok(ObjectName::namespaced(
                    FALLBACK_EVENT_NAMESPACE,
                    name.name.clone(),
                ));
            }
            return Ok(ObjectName::empty());
        };

        let involved_namespace = involved
            .get("namespace")
            .and_then(Value::as_str)
            .unwrap_or(&name.namespace);
        let involved_host = ObjectName {
            namespace: involved_namespace.to_string(),
            name: involved_name.to_string(),
        };

        let involved_virtual = involved_mapper
            .host_to_virtual(ctx, &involved_host, None)
            .await?;
        if involved_virtual.is_empty() {
            return Ok(ObjectName::empty());
        }

        Ok(ObjectName::namespaced(
            involved_virtual.namespace,
            name.name.clone(),
        ))
    }

    async fn is_managed(&self, _ctx: &SyncContext, _obj: &DynamicObject) -> Result<bool> {
        // Events are host-owned; Burrow only reads them
        Ok(false)
    }

    async fn migrate(&self, _ctx: &SyncContext, _registry: &MapperRegistry) -> Result<()> {
        // Events are ephemeral and re-derived on every sync; nothing to pin
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use k8s_openapi::api::core::v1::Pod;

    use super::*;
    use crate::config::VirtualClusterConfig;
    use crate::context::MockObjectLister;
    use crate::mappings::backend::MemoryBackend;
    use crate::mappings::index::HostNameIndex;
    use crate::mappings::store::MappingStore;
    use crate::resources::pods;

    fn context() -> (SyncContext, Arc<MapperRegistry>) {
        let config = Arc::new(VirtualClusterConfig::new("tenant-a", "vc-tenant-a"));
        let ctx = SyncContext::new(
            config.clone(),
            Arc::new(MappingStore::with_backend(Arc::new(MemoryBackend::default()))),
            Arc::new(HostNameIndex::new()),
            Arc::new(MockObjectLister::new()),
        );
        let registry = Arc::new(MapperRegistry::new());
        registry.add_mapper(pods::mapper(&config));
        registry.add_mapper(mapper(Arc::downgrade(&registry)));
        (ctx, registry)
    }

    fn event(name: &str, involved: Value) -> DynamicObject {
        let mut obj = DynamicObject::new(name, &ResourceKind::of::<Event>().api_resource())
            .within("vc-tenant-a");
        obj.data = serde_json::json!({ "involvedObject": involved });
        obj
    }

    #[tokio::test]
    async fn event_follows_its_involved_object() {
        let (ctx, registry) = context();
        let mapper = registry.by_gvk(&ResourceKind::of::<Event>()).unwrap();

        // The involved pod is known to the index
        ctx.index().insert(
            &ResourceKind::of::<Pod>(),
            ObjectName::namespaced("ns1", "web-0"),
            &ObjectName::namespaced("vc-tenant-a", "web-0-x-ns1-x-tenant-a"),
        );

        let obj = event(
            "web-0.17a2",
            serde_json::json!({
                "kind": "Pod",
                "apiVersion": "v1",
                "name": "web-0-x-ns1-x-tenant-a",
                "namespace": "vc-tenant-a"
            }),
        );
        let virtual_name = mapper
            .host_to_virtual(
                &ctx,
                &ObjectName::namespaced("vc-tenant-a", "web-0.17a2"),
                Some(&obj),
            )
            .await
            .unwrap();
        assert_eq!(virtual_name, ObjectName::namespaced("ns1", "web-0.17a2"));
    }

    #[tokio::test]
    async fn event_for_unmapped_kind_is_dropped() {
        let (ctx, registry) = context();
        let mapper = registry.by_gvk(&ResourceKind::of::<Event>()).unwrap();

        let obj = event(
            "lease.17a2",
            serde_json::json!({
                "kind": "Lease",
                "apiVersion": "coordination.k8s.io/v1",
                "name": "some-lease",
                "namespace": "vc-tenant-a"
            }),
        );
        let virtual_name = mapper
            .host_to_virtual(
                &ctx,
                &ObjectName::namespaced("vc-tenant-a", "lease.17a2"),
                Some(&obj),
            )
            .await
            .unwrap();
        assert!(virtual_name.is_empty());
    }

    #[tokio::test]
    async fn force_sync_lands_in_the_fallback_namespace() {
        let (ctx, registry) = context();
        let mapper = registry.by_gvk(&ResourceKind::of::<Event>()).unwrap();

        let mut obj = event(
            "lease.17a2",
            serde_json::json!({
                "kind": "Lease",
                "apiVersion": "coordination.k8s.io/v1",
                "name": "some-lease",
                "namespace": "vc-tenant-a"
            }),
        );
        obj.metadata.annotations = Some(BTreeMap::from([(
            annotations::FORCE_SYNC_ANNOTATION.to_string(),
            "true".to_string(),
        )]));

        let virtual_name = mapper
            .host_to_virtual(
                &ctx,
                &ObjectName::namespaced("vc-tenant-a", "lease.17a2"),
                Some(&obj),
            )
            .await
            .unwrap();
        assert_eq!(
            virtual_name,
            ObjectName::namespaced(FALLBACK_EVENT_NAMESPACE, "lease.17a2")
        );
    }

    #[tokio::test]
    async fn event_for_unresolvable_pod_is_dropped() {
        let (ctx, registry) = context();
        let mapper = registry.by_gvk(&ResourceKind::of::<Event>()).unwrap();

        // Pod kind is mapped, but this particular host pod is not ours
        let obj = event(
            "stray.17a2",
            serde_json::json!({
                "kind": "Pod",
                "apiVersion": "v1",
                "name": "some-other-operators-pod",
                "namespace": "vc-tenant-a"
            }),
        );
        let virtual_name = mapper
            .host_to_virtual(
                &ctx,
                &ObjectName::namespaced("vc-tenant-a", "stray.17a2"),
                Some(&obj),
            )
            .await
            .unwrap();
        assert!(virtual_name.is_empty());
    }
}
