//! Custom translation strategy
//!
//! For dynamically-configured kinds (generic exports) whose translation the
//! caller supplies. The translation functions may consult live object state
//! but do no I/O; reverse lookups typically go through the index or —
//! because custom mappers are registered wrapped in the recorder — the
//! store.

use std::sync::Arc;

use async_trait::async_trait;
use kube::api::DynamicObject;

use crate::context::SyncContext;
use crate::mappings::Mapper;
use crate::translate::annotations;
use crate::types::{ObjectName, ResourceKind};
use crate::Result;

/// Caller-supplied translation function.
pub type TranslateFn = Arc<
    dyn Fn(&SyncContext, &ObjectName, Option<&DynamicObject>) -> Result<ObjectName>
        + Send
        + Sync,
>;

/// Caller-supplied ownership test.
pub type ManagedFn = Arc<dyn Fn(&SyncContext, &DynamicObject) -> Result<bool> + Send + Sync>;

/// Mapper with caller-supplied, object-aware translation.
pub struct CustomMapper {
    kind: ResourceKind,
    scheme: String,
    virtual_to_host: TranslateFn,
    host_to_virtual: TranslateFn,
    is_managed: Option<ManagedFn>,
}

impl CustomMapper {
    /// Create a custom mapper.
    ///
    /// `scheme` must change whenever the supplied functions change meaning,
    /// so existing objects are migrated.
    pub fn new(
        kind: ResourceKind,
        scheme: impl Into<String>,
        virtual_to_host: TranslateFn,
        host_to_virtual: TranslateFn,
    ) -> Self {
        Self {
            kind,
            scheme: scheme.into(),
            virtual_to_host,
            host_to_virtual,
            is_managed: None,
        }
    }

    /// Override the default ownership test.
    pub fn with_is_managed(mut self, is_managed: ManagedFn) -> Self {
        self.is_managed = Some(is_managed);
        self
    }
}

#[async_trait]
impl Mapper for CustomMapper {
    fn kind(&self) -> ResourceKind {
        self.kind.clone()
    }

    fn scheme(&self) -> String {
        self.scheme.clone()
    }

    async fn virtual_to_host(
        &self,
        ctx: &SyncContext,
        name: &ObjectName,
        obj: Option<&DynamicObject>,
    ) -> Result<ObjectName> {
        (self.virtual_to_host)(ctx, name, obj)
    }

    async fn host_to_virtual(
        &self,
        ctx: &SyncContext,
        name: &ObjectName,
        obj: Option<&DynamicObject>,
    ) -> Result<ObjectName> {
        if let Some(obj) = obj {
            if let Some(identity) = annotations::recorded_identity(obj, &self.kind) {
                return Ok(identity);
            }
        }
        (self.host_to_virtual)(ctx, name, obj)
    }

    async fn is_managed(&self, ctx: &SyncContext, obj: &DynamicObject) -> Result<bool> {
        if let Some(is_managed) = &self.is_managed {
            return is_managed(ctx, obj);
        }
        if let Some(owner) = annotations::managed_by(obj) {
            return Ok(owner == ctx.config().name);
        }
        Ok(annotations::recorded_identity(obj, &self.kind).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VirtualClusterConfig;
    use crate::context::MockObjectLister;
    use crate::mappings::backend::MemoryBackend;
    use crate::mappings::index::HostNameIndex;
    use crate::mappings::store::MappingStore;
    use crate::translate;

    fn context() -> SyncContext {
        SyncContext::new(
            Arc::new(VirtualClusterConfig::new("tenant-a", "vc-tenant-a")),
            Arc::new(MappingStore::with_backend(Arc::new(MemoryBackend::default()))),
            Arc::new(HostNameIndex::new()),
            Arc::new(MockObjectLister::new()),
        )
    }

    fn export_mapper() -> CustomMapper {
        let kind = ResourceKind::new("cert-manager.io", "v1", "Certificate");
        CustomMapper::new(
            kind.clone(),
            "export/certificates/v1",
            Arc::new(|ctx, name, _obj| {
                Ok(ObjectName::namespaced(
                    translate::host_namespace(ctx.config(), &name.namespace),
                    translate::host_name(ctx.config(), name),
                ))
            }),
            Arc::new(|ctx, name, _obj| {
                Ok(ctx
                    .index()
                    .lookup(&ResourceKind::new("cert-manager.io", "v1", "Certificate"), name)?
                    .unwrap_or_default())
            }),
        )
    }

    #[tokio::test]
    async fn custom_functions_drive_both_directions() {
        let ctx = context();
        let mapper = export_mapper();
        let vname = ObjectName::namespaced("ns1", "web-tls");

        let host = mapper.virtual_to_host(&ctx, &vname, None).await.unwrap();
        assert_eq!(host.name, "web-tls-x-ns1-x-tenant-a");

        ctx.index().insert(&mapper.kind(), vname.clone(), &host);
        assert_eq!(
            mapper.host_to_virtual(&ctx, &host, None).await.unwrap(),
            vname
        );
    }

    #[tokio::test]
    async fn default_is_managed_uses_label_then_annotations() {
        let ctx = context();
        let mapper = export_mapper();
        let ar = mapper.kind().api_resource();

        let plain = DynamicObject::new("cert", &ar).within("vc-tenant-a");
        assert!(!mapper.is_managed(&ctx, &plain).await.unwrap());

        let mut ours = plain.clone();
        ours.metadata.labels = Some(std::collections::BTreeMap::from([(
            annotations::MANAGED_BY_LABEL.to_string(),
            "tenant-a".to_string(),
        )]));
        assert!(mapper.is_managed(&ctx, &ours).await.unwrap());
    }
}
