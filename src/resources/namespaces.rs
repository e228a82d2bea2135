//! Namespace mapper (multi-namespace mode only)
//!
//! In multi-namespace mode every virtual namespace materializes as a
//! dedicated host namespace, which is an honest 1:1 mapping. Single-
//! namespace mode folds all virtual namespaces into one host namespace —
//! a many-to-one relation that lives in the namespaced name translation,
//! not in a Namespace-kind mapping — so no mapper is registered there.

use std::sync::Arc;

use k8s_openapi::api::core::v1::Namespace;

use crate::config::VirtualClusterConfig;
use crate::mappings::Mapper;
use crate::translate::{self, ClusterScopedMapper};
use crate::types::ResourceKind;

/// Build the namespace mapper.
pub fn mapper(config: &Arc<VirtualClusterConfig>) -> Arc<dyn Mapper> {
    Arc::new(ClusterScopedMapper::with_name_fn(
        ResourceKind::of::<Namespace>(),
        config.clone(),
        "namespaces",
        Arc::new(|config, name, _obj| translate::host_namespace(config, name)),
    ))
}
