//! Cluster-scoped translation strategy
//!
//! Like the namespaced strategy without the namespace dimension: host
//! identity is a deterministic function of the name alone, and the reverse
//! index is keyed by host name alone.

use std::sync::Arc;

use async_trait::async_trait;
use kube::api::DynamicObject;

use crate::config::{is_dns1123_subdomain, VirtualClusterConfig};
use crate::context::SyncContext;
use crate::mappings::Mapper;
use crate::translate::{self, annotations};
use crate::types::{ObjectName, ResourceKind};
use crate::{Error, Result};

/// Name function for cluster-scoped kinds, optionally object-aware.
pub type ClusterNameFn =
    Arc<dyn Fn(&VirtualClusterConfig, &str, Option<&DynamicObject>) -> String + Send + Sync>;

/// Mapper for cluster-scoped kinds.
pub struct ClusterScopedMapper {
    kind: ResourceKind,
    config: Arc<VirtualClusterConfig>,
    name_fn: ClusterNameFn,
    scheme: String,
}

impl ClusterScopedMapper {
    /// Mapper using the default deterministic name function.
    pub fn new(kind: ResourceKind, config: Arc<VirtualClusterConfig>) -> Self {
        Self::with_name_fn(
            kind,
            config,
            "cluster-scoped",
            Arc::new(|config, name, _obj| translate::host_name_cluster_scoped(config, name)),
        )
    }

    /// Mapper with a kind-specific name function.
    pub fn with_name_fn(
        kind: ResourceKind,
        config: Arc<VirtualClusterConfig>,
        strategy: &str,
        name_fn: ClusterNameFn,
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
impl Mapper for ClusterScopedMapper {
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
        let host_name = (self.name_fn)(&self.config, &name.name, obj);
        if !is_dns1123_subdomain(&host_name) {
            return Err(Error::validation(format!(
                "translated name '{}' for {} {} is not a valid object name",
                host_name, self.kind, name
            )));
        }
        Ok(ObjectName::cluster_scoped(host_name))
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
        let host_name = ObjectName::cluster_scoped(name.clone());
        Ok(ctx.index().lookup(&self.kind, &host_name)?.is_some())
    }
}
