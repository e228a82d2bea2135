//! Recorder decorator: store-first lookups, record-on-miss
//!
//! Wraps any [`Mapper`] so that computed or observed mappings are persisted
//! into the store and store lookups take precedence over recomputation.
//! Once a mapping is recorded it pins the identity: later scheme changes
//! cannot move the object, which is what keeps host-side objects continuous
//! across configuration changes.

use std::sync::Arc;

use async_trait::async_trait;
use kube::api::DynamicObject;
use tracing::warn;

use crate::context::SyncContext;
use crate::mappings::{Mapper, MapperRegistry};
use crate::types::{NameMapping, ObjectName, ResourceKind};
use crate::Result;

/// A mapper wrapped with store recording.
///
/// Explicit composition: holds the wrapped implementation and intercepts
/// only the methods it needs to.
pub struct Recorded {
    inner: Arc<dyn Mapper>,
}

impl Recorded {
    /// Wrap a mapper.
    pub fn new(inner: Arc<dyn Mapper>) -> Self {
        Self { inner }
    }

    /// Persist a freshly computed mapping, attributed to the ambient owner.
    ///
    /// A conflict is surfaced to the caller — the translation result must
    /// not be used for a write that would clash with the recorded state. A
    /// failed durable save is only logged: the in-memory record is live and
    /// the save is retried on the next store mutation.
    async fn record(&self, ctx: &SyncContext, mapping: NameMapping) -> Result<()> {
        ctx.store().record_reference(mapping, ctx.owner())?;
        if let Err(e) = ctx.store().save().await {
            warn!(error = %e, "failed to persist recorded mappings, will retry on next save");
        }
        Ok(())
    }
}

#[async_trait]
impl Mapper for Recorded {
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
        let kind = self.inner.kind();
        if let Some(host_name) = ctx.store().virtual_to_host_name(&kind, name) {
            return Ok(host_name);
        }

        let host_name = self.inner.virtual_to_host(ctx, name, obj).await?;
        if !host_name.is_empty() {
            let mapping = NameMapping::new(kind, name.clone(), host_name.clone());
            self.record(ctx, mapping).await?;
        }
        Ok(host_name)
    }

    async fn host_to_virtual(
        &self,
        ctx: &SyncContext,
        name: &ObjectName,
        obj: Option<&DynamicObject>,
    ) -> Result<ObjectName> {
        let kind = self.inner.kind();
        if let Some(virtual_name) = ctx.store().host_to_virtual_name(&kind, name) {
            return Ok(virtual_name);
        }

        let virtual_name = self.inner.host_to_virtual(ctx, name, obj).await?;
        if !virtual_name.is_empty() {
            let mapping = NameMapping::new(kind, virtual_name.clone(), name.clone());
            self.record(ctx, mapping).await?;
        }
        Ok(virtual_name)
    }

    async fn is_managed(&self, ctx: &SyncContext, obj: &DynamicObject) -> Result<bool> {
        // The store is authoritative once a mapping is recorded, regardless
        // of what the object's annotations claim.
        if let Some(name) = &obj.metadata.name {
            let host_name = ObjectName {
                namespace: obj.metadata.namespace.clone().unwrap_or_default(),
                name: name.clone(),
            };
            if ctx.store().has_host_mapping(&self.inner.kind(), &host_name) {
                return Ok(true);
            }
        }
        self.inner.is_managed(ctx, obj).await
    }

    async fn migrate(&self, ctx: &SyncContext, registry: &MapperRegistry) -> Result<()> {
        self.inner.migrate(ctx, registry).await
    }
}
