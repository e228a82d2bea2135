//! PersistentVolume mapper
//!
//! Cluster-scoped translation with one object-aware wrinkle: imported
//! volumes carry an annotation recording their pre-existing host-side name,
//! and that annotation takes priority over the algorithmic transform.

use std::sync::Arc;

use k8s_openapi::api::core::v1::PersistentVolume;

use crate::config::VirtualClusterConfig;
use crate::mappings::Mapper;
use crate::translate::{self, annotations, ClusterScopedMapper};
use crate::types::ResourceKind;

/// Build the persistent volume mapper.
pub fn mapper(config: &Arc<VirtualClusterConfig>) -> Arc<dyn Mapper> {
    Arc::new(ClusterScopedMapper::with_name_fn(
        ResourceKind::of::<PersistentVolume>(),
        config.clone(),
        "persistentvolumes",
        Arc::new(|config, name, obj| {
            if let Some(imported) = obj.and_then(annotations::imported_host_name) {
                return imported.to_string();
            }
            translate::host_name_cluster_scoped(config, name)
        }),
    ))
}
