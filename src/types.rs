//! Core identity types shared across the mapping system
//!
//! An object is addressed by a [`ResourceKind`] (the GVK triple) plus an
//! [`ObjectName`] (namespace + name). Every synced object has two identities:
//! the *virtual* one seen by the tenant and the *host* one materialized in
//! the shared cluster. A [`NameMapping`] records one correspondence.

use std::fmt;

use kube::discovery::ApiResource;
use serde::{Deserialize, Serialize};

/// The (group, version, kind) triple identifying a Kubernetes object type.
///
/// Constructed once at mapper construction time, either from the compile-time
/// constants of a typed resource via [`ResourceKind::of`] or from strings for
/// dynamically-configured kinds.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceKind {
    /// API group, empty for the core group
    pub group: String,
    /// API version (e.g. "v1")
    pub version: String,
    /// Resource kind (e.g. "Secret")
    pub kind: String,
}

impl ResourceKind {
    /// Build from the compile-time constants of a typed k8s-openapi resource.
    pub fn of<T: k8s_openapi::Resource>() -> Self {
        Self {
            group: T::GROUP.to_string(),
            version: T::VERSION.to_string(),
            kind: T::KIND.to_string(),
        }
    }

    /// Build from explicit group/version/kind strings.
    pub fn new(
        group: impl Into<String>,
        version: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            kind: kind.into(),
        }
    }

    /// Parse from an apiVersion string ("apps/v1", "v1") and a kind.
    pub fn from_api_version(api_version: &str, kind: impl Into<String>) -> Self {
        let (group, version) = match api_version.split_once('/') {
            Some((g, v)) => (g.to_string(), v.to_string()),
            None => (String::new(), api_version.to_string()),
        };
        Self {
            group,
            version,
            kind: kind.into(),
        }
    }

    /// The apiVersion string ("apps/v1" or "v1" for the core group).
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }

    /// Build an [`ApiResource`] for dynamic API access to this kind.
    pub fn api_resource(&self) -> ApiResource {
        ApiResource {
            group: self.group.clone(),
            version: self.version.clone(),
            kind: self.kind.clone(),
            api_version: self.api_version(),
            plural: pluralize_kind(&self.kind),
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            write!(f, "{}/{}", self.version, self.kind)
        } else {
            write!(f, "{}/{}/{}", self.group, self.version, self.kind)
        }
    }
}

/// A namespaced-or-cluster-scoped object name within one cluster's view.
///
/// Cluster-scoped identities carry an empty namespace. The default value is
/// the *zero identity*: an empty name signalling "this object is not one we
/// manage / not translatable" — a normal outcome, not an error.
#[derive(
    Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ObjectName {
    /// Namespace, empty for cluster-scoped objects
    #[serde(default)]
    pub namespace: String,
    /// Object name, empty for the zero identity
    pub name: String,
}

impl ObjectName {
    /// A namespaced identity.
    pub fn namespaced(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// A cluster-scoped identity.
    pub fn cluster_scoped(name: impl Into<String>) -> Self {
        Self {
            namespace: String::new(),
            name: name.into(),
        }
    }

    /// The zero identity (empty name).
    pub fn empty() -> Self {
        Self::default()
    }

    /// True if this is the zero identity.
    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }
}

impl fmt::Display for ObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}/{}", self.namespace, self.name)
        }
    }
}

/// The atomic correspondence record: one kind, one virtual identity, one
/// host identity. Strict 1:1 per kind is enforced by the mapping store.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NameMapping {
    /// Kind this mapping belongs to
    pub kind: ResourceKind,
    /// Identity as seen inside the virtual cluster
    pub virtual_name: ObjectName,
    /// Identity as materialized in the host cluster
    pub host_name: ObjectName,
}

impl NameMapping {
    /// Create a new mapping record.
    pub fn new(kind: ResourceKind, virtual_name: ObjectName, host_name: ObjectName) -> Self {
        Self {
            kind,
            virtual_name,
            host_name,
        }
    }

    /// The reference used when this mapping owns dependent mappings.
    pub fn reference(&self) -> MappingRef {
        MappingRef {
            kind: self.kind.clone(),
            virtual_name: self.virtual_name.clone(),
        }
    }
}

impl fmt::Display for NameMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} -> {}",
            self.kind, self.virtual_name, self.host_name
        )
    }
}

/// Back-reference from a dependent mapping to its owning mapping.
///
/// Exists purely for garbage-collection bookkeeping: when the owner's own
/// mapping is removed, dependents become eligible for removal.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MappingRef {
    /// Kind of the owning mapping
    pub kind: ResourceKind,
    /// Virtual identity of the owning mapping
    pub virtual_name: ObjectName,
}

impl fmt::Display for MappingRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.virtual_name)
    }
}

/// Known irregular pluralizations for the kinds Burrow maps.
const KIND_PLURALS: &[(&str, &str)] = &[
    ("endpoints", "endpoints"),
    ("ingress", "ingresses"),
    ("networkpolicy", "networkpolicies"),
    ("storageclass", "storageclasses"),
    ("priorityclass", "priorityclasses"),
    ("ingressclass", "ingressclasses"),
];

/// Pluralize a Kubernetes resource kind.
///
/// Uses a lookup table for irregular kinds, falling back to simple
/// pluralization rules.
pub fn pluralize_kind(kind: &str) -> String {
    let lower = kind.to_lowercase();

    for (singular, plural) in KIND_PLURALS {
        if *singular == lower {
            return (*plural).to_string();
        }
    }

    if lower.ends_with('s') || lower.ends_with("ch") || lower.ends_with("sh") {
        format!("{}es", lower)
    } else if lower.ends_with('y') && !lower.ends_with("ay") && !lower.ends_with("ey") {
        format!("{}ies", &lower[..lower.len() - 1])
    } else {
        format!("{}s", lower)
    }
}

#[cfg(test)]
mod tests {
    use k8s_openapi::api::core::v1::{ConfigMap, Pod, Secret};
    use k8s_openapi::api::networking::v1::Ingress;

    use super::*;

    #[test]
    fn resource_kind_from_typed_resources() {
        let secrets = ResourceKind::of::<Secret>();
        assert_eq!(secrets.group, "");
        assert_eq!(secrets.version, "v1");
        assert_eq!(secrets.kind, "Secret");
        assert_eq!(secrets.api_version(), "v1");

        let ingresses = ResourceKind::of::<Ingress>();
        assert_eq!(ingresses.group, "networking.k8s.io");
        assert_eq!(ingresses.api_version(), "networking.k8s.io/v1");
    }

    #[test]
    fn resource_kind_display_and_parse_round_trip() {
        let kind = ResourceKind::from_api_version("apps/v1", "Deployment");
        assert_eq!(kind.group, "apps");
        assert_eq!(kind.version, "v1");
        assert_eq!(kind.to_string(), "apps/v1/Deployment");

        let core = ResourceKind::from_api_version("v1", "Pod");
        assert_eq!(core.group, "");
        assert_eq!(core.to_string(), "v1/Pod");
        assert_eq!(core, ResourceKind::of::<Pod>());
    }

    #[test]
    fn api_resource_has_plural() {
        let ar = ResourceKind::of::<Ingress>().api_resource();
        assert_eq!(ar.plural, "ingresses");
        let ar = ResourceKind::of::<ConfigMap>().api_resource();
        assert_eq!(ar.plural, "configmaps");
    }

    #[test]
    fn zero_identity_is_empty() {
        assert!(ObjectName::empty().is_empty());
        assert!(!ObjectName::namespaced("ns1", "web").is_empty());
        // A namespace alone does not make an identity
        let odd = ObjectName {
            namespace: "ns1".to_string(),
            name: String::new(),
        };
        assert!(odd.is_empty());
    }

    #[test]
    fn object_name_display() {
        assert_eq!(ObjectName::namespaced("ns1", "web").to_string(), "ns1/web");
        assert_eq!(ObjectName::cluster_scoped("node-a").to_string(), "node-a");
    }

    #[test]
    fn mapping_reference_points_at_virtual_identity() {
        let mapping = NameMapping::new(
            ResourceKind::of::<Secret>(),
            ObjectName::namespaced("ns1", "db-creds"),
            ObjectName::namespaced("host-ns", "db-creds-x-ns1-x-tenant"),
        );
        let owner = mapping.reference();
        assert_eq!(owner.kind, ResourceKind::of::<Secret>());
        assert_eq!(owner.virtual_name, ObjectName::namespaced("ns1", "db-creds"));
    }

    #[test]
    fn pluralize_irregular_kinds() {
        assert_eq!(pluralize_kind("Endpoints"), "endpoints");
        assert_eq!(pluralize_kind("Ingress"), "ingresses");
        assert_eq!(pluralize_kind("NetworkPolicy"), "networkpolicies");
        assert_eq!(pluralize_kind("Pod"), "pods");
    }
}
