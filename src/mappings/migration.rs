//! Migration: re-deriving mappings when a translation scheme changes
//!
//! Run once per mapper at startup. A kind whose persisted scheme
//! fingerprint differs from the freshly-constructed mapper's fingerprint
//! gets its existing virtual objects backfilled into the store, pinning the
//! identities the current scheme produces against future changes. Kinds
//! with indirect references (secrets reached through pods and ingresses)
//! additionally seed mappings for every referenced identity, attributed to
//! the referencing object — those references are only ever resolved lazily,
//! and a crash mid-resolution must not leave them unrecorded.
//!
//! Migration is best-effort per item: a failure to record one reference is
//! logged and migration continues. Correctness is restored lazily on first
//! real use, when the recorder recomputes and records the mapping.

use tracing::{debug, info, warn};

use crate::context::SyncContext;
use crate::mappings::{Mapper, MapperRegistry};
use crate::types::{NameMapping, ObjectName, ResourceKind};
use crate::Result;

/// Ordering for startup migration (lower runs first).
///
/// Referencing kinds migrate before the kinds they reference, so ownership
/// attribution is available when the referenced identities are discovered.
pub fn migration_priority(kind: &ResourceKind) -> u8 {
    match kind.kind.as_str() {
        "Namespace" => 0,
        "Pod" | "Ingress" => 1,
        "Secret" | "ConfigMap" => 2,
        _ => 3,
    }
}

/// Run migration for every registered kind whose scheme changed.
///
/// Per-kind failures are logged and skipped — the scheme fingerprint is
/// only advanced on success, so the next startup retries. Migration
/// failures are never fatal to startup.
pub async fn run(ctx: &SyncContext, registry: &MapperRegistry) -> Result<()> {
    let mut kinds = registry.kinds();
    kinds.sort_by_key(migration_priority);

    for kind in kinds {
        let mapper = registry.by_gvk(&kind)?;
        let fingerprint = mapper.scheme();
        if ctx.store().scheme(&kind).as_deref() == Some(fingerprint.as_str()) {
            debug!(kind = %kind, "translation scheme unchanged, skipping migration");
            continue;
        }

        info!(kind = %kind, scheme = %fingerprint, "translation scheme changed, migrating");
        match mapper.migrate(ctx, registry).await {
            Ok(()) => ctx.store().set_scheme(&kind, fingerprint),
            Err(e) => {
                warn!(
                    error = %e,
                    kind = %kind,
                    "migration failed, mappings will be recorded lazily on first use"
                );
            }
        }
    }

    ctx.store().save().await
}

/// Generic backfill: pin a recorded mapping for every existing virtual
/// object of the mapper's kind.
///
/// Already-recorded virtual identities are left untouched — a recorded
/// mapping pins the identity from before the scheme change, which is
/// exactly the continuity migration exists to preserve. Mappings seeded
/// here are self-owned so they are garbage-collected with the object's own
/// mapping.
pub async fn backfill_kind<M>(ctx: &SyncContext, mapper: &M) -> Result<()>
where
    M: Mapper + ?Sized,
{
    let kind = mapper.kind();
    let objects = ctx.virtual_objects().list(&kind).await?;
    let mut seeded = 0usize;

    for obj in &objects {
        let Some(virtual_name) = object_identity(obj) else {
            continue;
        };
        if ctx
            .store()
            .virtual_to_host_name(&kind, &virtual_name)
            .is_some()
        {
            continue;
        }

        let host_name = match mapper.virtual_to_host(ctx, &virtual_name, Some(obj)).await {
            Ok(host_name) if !host_name.is_empty() => host_name,
            Ok(_) => continue,
            Err(e) => {
                warn!(error = %e, kind = %kind, object = %virtual_name, "skipping object during migration");
                continue;
            }
        };

        let mapping = NameMapping::new(kind.clone(), virtual_name, host_name);
        let owner = mapping.reference();
        if let Err(e) = ctx.store().add_reference(mapping, Some(owner)) {
            warn!(error = %e, kind = %kind, "failed to record mapping during migration");
            continue;
        }
        seeded += 1;
    }

    if seeded > 0 {
        info!(kind = %kind, seeded, total = objects.len(), "backfilled mappings");
    }
    Ok(())
}

/// Seed a recorded mapping for one referenced identity, attributed to the
/// referencing object's mapping.
///
/// Best-effort: conflicts and failures are logged, never propagated — the
/// referencer's reconcile will re-resolve the reference lazily.
pub async fn seed_reference<M>(
    ctx: &SyncContext,
    referenced_mapper: &M,
    referenced: &ObjectName,
    referencer: &NameMapping,
) where
    M: Mapper + ?Sized,
{
    let kind = referenced_mapper.kind();
    if ctx.store().virtual_to_host_name(&kind, referenced).is_some() {
        return;
    }

    let host_name = match referenced_mapper
        .virtual_to_host(ctx, referenced, None)
        .await
    {
        Ok(host_name) if !host_name.is_empty() => host_name,
        Ok(_) => return,
        Err(e) => {
            warn!(error = %e, kind = %kind, object = %referenced, "skipping referenced object during migration");
            return;
        }
    };

    let mapping = NameMapping::new(kind.clone(), referenced.clone(), host_name);
    if let Err(e) = ctx
        .store()
        .add_reference(mapping, Some(referencer.reference()))
    {
        warn!(error = %e, kind = %kind, "failed to record referenced mapping during migration");
    }
}

/// Run a prerequisite kind's migration if its scheme is stale.
///
/// Used by dependent kinds (secrets) to guarantee their referencers (pods,
/// ingresses) were migrated first even when invoked out of band. Unknown
/// kinds are skipped: the prerequisite's sync feature is simply disabled.
pub async fn ensure_migrated(
    ctx: &SyncContext,
    registry: &MapperRegistry,
    kind: &ResourceKind,
) -> Result<()> {
    let Ok(mapper) = registry.by_gvk(kind) else {
        return Ok(());
    };
    let fingerprint = mapper.scheme();
    if ctx.store().scheme(kind).as_deref() == Some(fingerprint.as_str()) {
        return Ok(());
    }

    mapper.migrate(ctx, registry).await?;
    ctx.store().set_scheme(kind, fingerprint);
    Ok(())
}

fn object_identity(obj: &kube::api::DynamicObject) -> Option<ObjectName> {
    let name = obj.metadata.name.clone()?;
    Some(ObjectName {
        namespace: obj.metadata.namespace.clone().unwrap_or_default(),
        name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn referencing_kinds_migrate_before_referenced_kinds() {
        let pods = ResourceKind::new("", "v1", "Pod");
        let ingresses = ResourceKind::new("networking.k8s.io", "v1", "Ingress");
        let secrets = ResourceKind::new("", "v1", "Secret");
        let namespaces = ResourceKind::new("", "v1", "Namespace");
        let nodes = ResourceKind::new("", "v1", "Node");

        assert!(migration_priority(&namespaces) < migration_priority(&pods));
        assert!(migration_priority(&pods) < migration_priority(&secrets));
        assert!(migration_priority(&ingresses) < migration_priority(&secrets));
        assert!(migration_priority(&secrets) < migration_priority(&nodes));
    }
}
