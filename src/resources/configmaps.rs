//! ConfigMap mapper
//!
//! Default namespaced translation, with one exception: in multi-namespace
//! mode the host cluster auto-creates `kube-root-ca.crt` in every host
//! namespace, so the virtual cluster's own copy must be rewritten to a
//! cluster-qualified name or the two would collide.

use std::sync::Arc;

use k8s_openapi::api::core::v1::ConfigMap;

use crate::config::VirtualClusterConfig;
use crate::mappings::Mapper;
use crate::translate::{self, NamespacedMapper};
use crate::types::ResourceKind;

/// Build the configmap mapper.
pub fn mapper(config: &Arc<VirtualClusterConfig>) -> Arc<dyn Mapper> {
    Arc::new(NamespacedMapper::with_name_fn(
        ResourceKind::of::<ConfigMap>(),
        config.clone(),
        "configmaps",
        Arc::new(|config, name, _obj| {
            if config.multi_namespace() && name.name == translate::ROOT_CA_CONFIG_MAP {
                translate::root_ca_host_name(config)
            } else {
                translate::host_name(config, name)
            }
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NamespaceStrategy;
    use crate::context::{MockObjectLister, SyncContext};
    use crate::mappings::backend::MemoryBackend;
    use crate::mappings::index::HostNameIndex;
    use crate::mappings::store::MappingStore;
    use crate::types::ObjectName;

    fn context(config: VirtualClusterConfig) -> SyncContext {
        SyncContext::new(
            Arc::new(config),
            Arc::new(MappingStore::with_backend(Arc::new(MemoryBackend::default()))),
            Arc::new(HostNameIndex::new()),
            Arc::new(MockObjectLister::new()),
        )
    }

    #[tokio::test]
    async fn root_ca_is_rewritten_in_multi_namespace_mode() {
        let mut config = VirtualClusterConfig::new("tenant-a", "vc-tenant-a");
        config.namespaces = NamespaceStrategy::Multi;
        let ctx = context(config.clone());
        let mapper = mapper(&Arc::new(config));

        let host = mapper
            .virtual_to_host(
                &ctx,
                &ObjectName::namespaced("ns1", translate::ROOT_CA_CONFIG_MAP),
                None,
            )
            .await
            .unwrap();
        assert_eq!(host.name, "burrow-kube-root-ca.crt-x-tenant-a");
        assert_ne!(host.name, translate::ROOT_CA_CONFIG_MAP);
        assert_eq!(host.namespace, "burrow-ns1-x-tenant-a");

        // Every other configmap keeps its name in multi-namespace mode
        let plain = mapper
            .virtual_to_host(&ctx, &ObjectName::namespaced("ns1", "app-config"), None)
            .await
            .unwrap();
        assert_eq!(plain.name, "app-config");
    }

    #[tokio::test]
    async fn single_namespace_mode_uses_the_generic_rewrite() {
        let config = VirtualClusterConfig::new("tenant-a", "vc-tenant-a");
        let ctx = context(config.clone());
        let mapper = mapper(&Arc::new(config));

        let host = mapper
            .virtual_to_host(
                &ctx,
                &ObjectName::namespaced("ns1", translate::ROOT_CA_CONFIG_MAP),
                None,
            )
            .await
            .unwrap();
        // Already collision-free: the generic formula qualifies by namespace
        assert_eq!(host.name, "kube-root-ca.crt-x-ns1-x-tenant-a");
        assert_eq!(host.namespace, "vc-tenant-a");
    }
}
