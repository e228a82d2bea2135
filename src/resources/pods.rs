//! Pod mapper
//!
//! Pods translate with the default namespaced strategy. Their migration
//! additionally seeds a recorded mapping for every secret the pod
//! references, owned by the pod — those references are resolved lazily
//! during sync, and a crash between resolving and recording must not leave
//! them unmapped.

use std::sync::Arc;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Pod, Secret};
use kube::api::DynamicObject;
use tracing::warn;

use crate::config::VirtualClusterConfig;
use crate::context::SyncContext;
use crate::mappings::{migration, Mapper, MapperRegistry};
use crate::resources::refs;
use crate::translate::NamespacedMapper;
use crate::types::{NameMapping, ObjectName, ResourceKind};
use crate::Result;

/// Build the pod mapper.
pub fn mapper(config: &Arc<VirtualClusterConfig>) -> Arc<dyn Mapper> {
    Arc::new(PodMapper {
        inner: NamespacedMapper::new(ResourceKind::of::<Pod>(), config.clone()),
    })
}

/// Namespaced mapper plus secret-reference seeding during migration.
pub struct PodMapper {
    inner: NamespacedMapper,
}

impl PodMapper {
    async fn seed_secret_references(
        &self,
        ctx: &SyncContext,
        registry: &MapperRegistry,
    ) -> Result<()> {
        let Ok(secrets_mapper) = registry.by_gvk(&ResourceKind::of::<Secret>()) else {
            return Ok(());
        };

        let kind = self.kind();
        for pod in ctx.virtual_objects().list(&kind).await? {
            let Some(name) = pod.metadata.name.clone() else {
                continue;
            };
            let virtual_name = ObjectName {
                namespace: pod.metadata.namespace.clone().unwrap_or_default(),
                name,
            };

            // The pod's own mapping was seeded by the backfill; fall back to
            // computing it for pods that appeared in between.
            let host_name = match ctx.store().virtual_to_host_name(&kind, &virtual_name) {
                Some(host_name) => host_name,
                None => match self.virtual_to_host(ctx, &virtual_name, Some(&pod)).await {
                    Ok(host_name) => host_name,
                    Err(e) => {
                        warn!(error = %e, pod = %virtual_name, "skipping pod during reference migration");
                        continue;
                    }
                },
            };
            let referencer = NameMapping::new(kind.clone(), virtual_name.clone(), host_name);

            for secret_ref in refs::pod_secret_refs(&virtual_name.namespace, &pod) {
                migration::seed_reference(ctx, secrets_mapper.as_ref(), &secret_ref, &referencer)
                    .await;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Mapper for PodMapper {
    fn kind(&self) -> ResourceKind {
        self.inner.kind()
    }

    fn scheme(&self) -> String {
        self.inner.scheme()
    }

    async fn virtual_to_host(
        &self,
        ctx: &SyncContext,
        name: &ObjectName,
        obj: Option<&DynamicObject>,
    ) -> Result<ObjectName> {
        self.inner.virtual_to_host(ctx, name, obj).await
    }

    async fn host_to_virtual(
        &self,
        ctx: &SyncContext,
        name: &ObjectName,
        obj: Option<&DynamicObject>,
    ) -> Result<ObjectName> {
        self.inner.host_to_virtual(ctx, name, obj).await
    }

    async fn is_managed(&self, ctx: &SyncContext, obj: &DynamicObject) -> Result<bool> {
        self.inner.is_managed(ctx, obj).await
    }

    async fn migrate(&self, ctx: &SyncContext, registry: &MapperRegistry) -> Result<()> {
        migration::backfill_kind(ctx, self).await?;
        self.seed_secret_references(ctx, registry).await
    }
}
