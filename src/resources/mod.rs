//! Per-kind mappers and registration wiring
//!
//! [`register_mappers`] builds the active mapper set from the resolved
//! configuration — a pure function of it, recomputed on every startup.
//! Every mapper is registered wrapped in the recorder so store lookups take
//! precedence over recomputation everywhere.

pub mod configmaps;
pub mod events;
pub mod generic;
pub mod ingresses;
pub mod namespaces;
pub mod nodes;
pub mod persistentvolumes;
pub mod pods;
pub mod refs;
pub mod secrets;
pub mod services;

use std::sync::Arc;

use crate::config::VirtualClusterConfig;
use crate::mappings::{Mapper, MapperRegistry, Recorded};

/// Build and register the mapper set for a virtual cluster.
pub fn register_mappers(config: &Arc<VirtualClusterConfig>, registry: &Arc<MapperRegistry>) {
    let mut mappers: Vec<Arc<dyn Mapper>> = vec![
        configmaps::mapper(config),
        secrets::mapper(config),
        pods::mapper(config),
        events::mapper(Arc::downgrade(registry)),
    ];

    if config.sync.services {
        mappers.push(services::mapper(config));
    }
    if config.sync.ingresses {
        mappers.push(ingresses::mapper(config));
    }
    if config.sync.nodes {
        mappers.push(nodes::mapper());
    }
    if config.sync.persistent_volumes {
        mappers.push(persistentvolumes::mapper(config));
    }
    if config.multi_namespace() {
        mappers.push(namespaces::mapper(config));
    }

    for mapper in mappers {
        registry.add_mapper(Arc::new(Recorded::new(mapper)));
    }
}

#[cfg(test)]
mod tests {
    use k8s_openapi::api::core::v1::{ConfigMap, Namespace, Node, Pod, Secret, Service};
    use k8s_openapi::api::networking::v1::Ingress;

    use super::*;
    use crate::config::NamespaceStrategy;
    use crate::types::ResourceKind;

    #[test]
    fn default_config_registers_the_core_set() {
        let config = Arc::new(VirtualClusterConfig::new("tenant-a", "vc-tenant-a"));
        let registry = Arc::new(MapperRegistry::new());
        register_mappers(&config, &registry);

        for kind in [
            ResourceKind::of::<ConfigMap>(),
            ResourceKind::of::<Secret>(),
            ResourceKind::of::<Pod>(),
            ResourceKind::of::<Service>(),
            ResourceKind::of::<Node>(),
        ] {
            assert!(registry.has(&kind), "{} should be registered", kind);
        }

        // Disabled features leave their kinds unregistered
        assert!(!registry.has(&ResourceKind::of::<Ingress>()));
        assert!(!registry.has(&ResourceKind::of::<Namespace>()));
    }

    #[test]
    fn the_mapper_set_is_a_function_of_configuration() {
        let mut config = VirtualClusterConfig::new("tenant-a", "vc-tenant-a");
        config.namespaces = NamespaceStrategy::Multi;
        config.sync.ingresses = true;
        config.sync.nodes = false;
        let config = Arc::new(config);

        let registry = Arc::new(MapperRegistry::new());
        register_mappers(&config, &registry);

        assert!(registry.has(&ResourceKind::of::<Ingress>()));
        assert!(registry.has(&ResourceKind::of::<Namespace>()));
        assert!(!registry.has(&ResourceKind::of::<Node>()));
    }
}
