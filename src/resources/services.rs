//! Service mapper: default namespaced translation.

use std::sync::Arc;

use k8s_openapi::api::core::v1::Service;

use crate::config::VirtualClusterConfig;
use crate::mappings::Mapper;
use crate::translate::NamespacedMapper;
use crate::types::ResourceKind;

/// Build the service mapper.
pub fn mapper(config: &Arc<VirtualClusterConfig>) -> Arc<dyn Mapper> {
    Arc::new(NamespacedMapper::new(
        ResourceKind::of::<Service>(),
        config.clone(),
    ))
}
