//! Ingress mapper
//!
//! Only registered when ingress sync is enabled. Like pods, ingress
//! migration seeds mappings for the secrets referenced through TLS blocks
//! and controller annotations, owned by the referencing ingress.

use std::sync::Arc;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::api::networking::v1::Ingress;
use kube::api::DynamicObject;
use tracing::warn;

use crate::config::VirtualClusterConfig;
use crate::context::SyncContext;
use crate::mappings::{migration, Mapper, MapperRegistry};
use crate::resources::refs;
use crate::translate::NamespacedMapper;
use crate::types::{NameMapping, ObjectName, ResourceKind};
use crate::Result;

/// Build the ingress mapper.
pub fn mapper(config: &Arc<VirtualClusterConfig>) -> Arc<dyn Mapper> {
    Arc::new(IngressMapper {
        inner: NamespacedMapper::new(ResourceKind::of::<Ingress>(), config.clone()),
    })
}

/// Namespaced mapper plus secret-reference seeding during migration.
pub struct IngressMapper {
    inner: NamespacedMapper,
}

impl IngressMapper {
    async fn seed_secret_references(
        &self,
        ctx: &SyncContext,
        registry: &MapperRegistry,
    ) -> Result<()> {
        let Ok(secrets_mapper) = registry.by_gvk(&ResourceKind::of::<Secret>()) else {
            return Ok(());
        };

        let kind = self.kind();
        for ingress in ctx.virtual_objects().list(&kind).await? {
            let Some(name) = ingress.metadata.name.clone() else {
                continue;
            };
            let virtual_name = ObjectName {
                namespace: ingress.metadata.namespace.clone().unwrap_or_default(),
                name,
            };

            let host_name = match ctx.store().virtual_to_host_name(&kind, &virtual_name) {
                Some(host_name) => host_name,
                None => match self.virtual_to_host(ctx, &virtual_name, Some(&ingress)).await {
                    Ok(host_name) => host_name,
                    Err(e) => {
                        warn!(error = %e, ingress = %virtual_name, "skipping ingress during reference migration");
                        continue;
                    }
                },
            };
            let referencer = NameMapping::new(kind.clone(), virtual_name.clone(), host_name);

            for secret_ref in refs::ingress_secret_refs(&virtual_name.namespace, &ingress) {
                migration::seed_reference(ctx, secrets_mapper.as_ref(), &secret_ref, &referencer)
                    .await;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Mapper for IngressMapper {
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
