//! Generic export mappers
//!
//! Entry point for dynamically-configured kinds (CRDs a tenant wants
//! projected into the host cluster). These are the one class of mapper
//! added after startup; the registry makes them safely visible to
//! reconcilers already running. Translation follows the default namespaced
//! formulas, reverse lookups rely on the store (every export mapper is
//! registered wrapped in the recorder) with the index as fallback.

use std::sync::Arc;

use crate::config::VirtualClusterConfig;
use crate::mappings::{Mapper, MapperRegistry, Recorded};
use crate::translate::{self, CustomMapper};
use crate::types::{ObjectName, ResourceKind};

/// Build a custom-with-object mapper for an exported kind.
pub fn mapper(config: &Arc<VirtualClusterConfig>, kind: ResourceKind) -> Arc<dyn Mapper> {
    let scheme = translate::scheme_fingerprint(config, &format!("export/{}", kind));
    let lookup_kind = kind.clone();

    Arc::new(CustomMapper::new(
        kind,
        scheme,
        Arc::new(|ctx, name, _obj| {
            Ok(ObjectName::namespaced(
                translate::host_namespace(ctx.config(), &name.namespace),
                translate::host_name(ctx.config(), name),
            ))
        }),
        Arc::new(move |ctx, name, _obj| {
            Ok(ctx
                .index()
                .lookup(&lookup_kind, name)?
                .unwrap_or_default())
        }),
    ))
}

/// Register an export mapper for a kind, recorder-wrapped.
///
/// Safe to call while reconcilers are running.
pub fn register(
    registry: &MapperRegistry,
    config: &Arc<VirtualClusterConfig>,
    kind: ResourceKind,
) {
    registry.add_mapper(Arc::new(Recorded::new(mapper(config, kind))));
}
