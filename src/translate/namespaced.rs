//! Namespaced translation strategy
//!
//! Host identity is a deterministic function of (name, namespace); the
//! namespace is translated independently through the namespace rules. The
//! reverse path checks the host object's recorded-name annotations first,
//! then the reverse-lookup index.

use std::sync::Arc;

use async_trait::async_trait;
use kube::api::DynamicObject;

use crate::config::{is_dns1123_subdomain, VirtualClusterConfig};
use crate::context::SyncContext;
use crate::mappings::Mapper;
use crate::translate::{self, annotations};
use crate::types::{ObjectName, ResourceKind};
use crate::{Error, Result};

/// Name function for namespaced kinds, optionally object-aware.
pub type NameFn = Arc<
    dyn Fn(&VirtualClusterConfig, &ObjectName, Option<&DynamicObject>) -> String + Send + Sync,
>;

/// Mapper for namespaced kinds.
pub struct NamespacedMapper {
    kind: ResourceKind,
    config: Arc<VirtualClusterConfig>,
    name_fn: NameFn,
    scheme: String,
}

impl NamespacedMapper {
    /// Mapper using the default deterministic name function.
    pub fn new(kind: ResourceKind, config: Arc<VirtualClusterConfig>) -> Self {
        Self::with_name_fn(
            kind,
            config,
            "namespaced",
            Arc::new(|config, name, _obj| translate::host_name(config, name)),
        )
    }

    /// Mapper with a kind-specific name function.
    ///
    /// `strategy` must uniquely identify the name function so that scheme
    /// fingerprints change when the function does.
    pub fn with_name_fn(
        kind: ResourceKind,
        config: Arc<VirtualClusterConfig>,
        strategy: &str,
        name_fn: NameFn,
    ) -> Self {
        let scheme = translate::scheme_fingerprint(&config, strategy);
        Self {
            kind,
            config,
            name_fn,
            scheme,
        }
    }
}

#[async_trait]
impl Mapper for NamespacedMapper {
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
        obj: Option<&DynamicObject>,
    ) -> Result<ObjectName> {
        let host_namespace = translate::host_namespace(&self.config, &name.namespace);
        let host_name = (self.name_fn)(&self.config, name, obj);
        if !is_dns1123_subdomain(&host_name) {
            return Err(Error::validation(format!(
                "translated name '{}' for {} {} is not a valid object name",
                host_name, self.kind, name
            )));
        }
        Ok(ObjectName::namespaced(host_namespace, host_name))
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

        match ctx.index().lookup(&self.kind, name)? {
            Some(virtual_name) => Ok(virtual_name),
            None => Ok(ObjectName::empty()),
        }
    }

    async fn is_managed(&self, ctx: &SyncContext, obj: &DynamicObject) -> Result<bool> {
        if let Some(owner) = annotations::managed_by(obj) {
            return Ok(owner == self.config.name);
        }
        if annotations::recorded_identity(obj, &self.kind).is_some() {
            return Ok(true);
        }

        let Some(name) = &obj.metadata.name else {
            return Ok(false);
        };
        let host_name = ObjectName {
            namespace: obj.metadata.namespace.clone().unwrap_or_default(),
            name: name.clone(),
        };
        Ok(ctx.index().lookup(&self.kind, &host_name)?.is_some())
    }
}
