//! Secret mapper
//!
//! Secrets are a dependent kind: most of their recorded mappings are seeded
//! by the pods and ingresses referencing them. Secret migration therefore
//! runs the referencing kinds' migrations first, so ownership attribution
//! is in place before the secrets backfill fills in whatever is left.

use std::sync::Arc;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Pod, Secret};
use k8s_openapi::api::networking::v1::Ingress;
use kube::api::DynamicObject;
use tracing::warn;

use crate::config::VirtualClusterConfig;
use crate::context::SyncContext;
use crate::mappings::{migration, Mapper, MapperRegistry};
use crate::translate::NamespacedMapper;
use crate::types::{ObjectName, ResourceKind};
use crate::Result;

/// Build the secret mapper.
pub fn mapper(config: &Arc<VirtualClusterConfig>) -> Arc<dyn Mapper> {
    Arc::new(SecretMapper {
        inner: NamespacedMapper::new(ResourceKind::of::<Secret>(), config.clone()),
    })
}

/// Namespaced mapper with prerequisite-ordered migration.
pub struct SecretMapper {
    inner: NamespacedMapper,
}

#[async_trait]
impl Mapper for SecretMapper {
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
        // Referencing kinds migrate first so the secrets they reference get
        // recorded with ownership attribution.
        for prerequisite in [
            ResourceKind::of::<Pod>(),
            ResourceKind::of::<Ingress>(),
        ] {
            if let Err(e) = migration::ensure_migrated(ctx, registry, &prerequisite).await {
                warn!(error = %e, kind = %prerequisite, "prerequisite migration failed, continuing");
            }
        }
        migration::backfill_kind(ctx, self).await
    }
}
