//! Recorded-name annotations: the on-object escape hatch
//!
//! The translation layer stamps every projected host object with the
//! identity of its virtual counterpart. On the reverse path these
//! annotations are authoritative and checked before any deterministic
//! function — the escape hatch for imported or manually-patched objects
//! whose host names predate Burrow. Any component that copies or patches a
//! host object must preserve them.

use std::collections::BTreeMap;

use kube::api::DynamicObject;

use crate::types::{NameMapping, ObjectName, ResourceKind};

/// Annotation holding the virtual object name on the host object.
pub const OBJECT_NAME_ANNOTATION: &str = "burrow.dev/object-name";

/// Annotation holding the virtual object namespace on the host object.
pub const OBJECT_NAMESPACE_ANNOTATION: &str = "burrow.dev/object-namespace";

/// Annotation qualifying the recorded identity by kind, for the rare case
/// of kinds sharing a host name.
pub const OBJECT_KIND_ANNOTATION: &str = "burrow.dev/object-kind";

/// Annotation on a virtual PersistentVolume recording a pre-existing host
/// volume name. Takes priority over the algorithmic transform so imported
/// volumes keep pointing at their real host-side objects.
pub const IMPORTED_HOST_NAME_ANNOTATION: &str = "burrow.dev/imported-host-name";

/// Annotation forcing an otherwise-unmappable object into the virtual view.
pub const FORCE_SYNC_ANNOTATION: &str = "burrow.dev/force-sync";

/// Label marking host objects created by a Burrow instance.
pub const MANAGED_BY_LABEL: &str = "burrow.dev/managed-by";

/// Read the recorded virtual identity from a host object's annotations.
///
/// Returns `None` when the annotations are absent, empty, or recorded for a
/// different kind. An empty recorded name is treated as absent.
pub fn recorded_identity(obj: &DynamicObject, kind: &ResourceKind) -> Option<ObjectName> {
    let annotations = obj.metadata.annotations.as_ref()?;

    if let Some(recorded_kind) = annotations.get(OBJECT_KIND_ANNOTATION) {
        if *recorded_kind != kind.to_string() {
            return None;
        }
    }

    let name = annotations.get(OBJECT_NAME_ANNOTATION)?;
    if name.is_empty() {
        return None;
    }
    let namespace = annotations
        .get(OBJECT_NAMESPACE_ANNOTATION)
        .cloned()
        .unwrap_or_default();

    Some(ObjectName {
        namespace,
        name: name.clone(),
    })
}

/// Stamp a host object with the recorded identity of its virtual
/// counterpart and the managed-by label.
///
/// Called by the translation layer when projecting an object; idempotent.
pub fn record_identity(obj: &mut DynamicObject, mapping: &NameMapping, virtual_cluster: &str) {
    let annotations = obj
        .metadata
        .annotations
        .get_or_insert_with(BTreeMap::new);
    annotations.insert(
        OBJECT_NAME_ANNOTATION.to_string(),
        mapping.virtual_name.name.clone(),
    );
    annotations.insert(
        OBJECT_NAMESPACE_ANNOTATION.to_string(),
        mapping.virtual_name.namespace.clone(),
    );
    annotations.insert(OBJECT_KIND_ANNOTATION.to_string(), mapping.kind.to_string());

    let labels = obj.metadata.labels.get_or_insert_with(BTreeMap::new);
    labels.insert(MANAGED_BY_LABEL.to_string(), virtual_cluster.to_string());
}

/// The value of the managed-by label, if present.
pub fn managed_by(obj: &DynamicObject) -> Option<&str> {
    obj.metadata
        .labels
        .as_ref()
        .and_then(|l| l.get(MANAGED_BY_LABEL))
        .map(String::as_str)
}

/// True when the force-sync annotation is set.
pub fn is_force_sync(obj: &DynamicObject) -> bool {
    obj.metadata
        .annotations
        .as_ref()
        .and_then(|a| a.get(FORCE_SYNC_ANNOTATION))
        .map(|v| v == "true")
        .unwrap_or(false)
}

/// The imported host name recorded on a virtual object, if any.
pub fn imported_host_name(obj: &DynamicObject) -> Option<&str> {
    obj.metadata
        .annotations
        .as_ref()
        .and_then(|a| a.get(IMPORTED_HOST_NAME_ANNOTATION))
        .map(String::as_str)
        .filter(|v| !v.is_empty())
}
