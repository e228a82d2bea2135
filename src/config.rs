//! Virtual cluster configuration
//!
//! The active mapper set is a pure function of this resolved configuration,
//! recomputed on every startup. Toggling a sync feature changes the set of
//! registered mappers; changing the namespace strategy changes translation
//! schemes and triggers migration.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// How virtual namespaces map onto the host cluster.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NamespaceStrategy {
    /// All virtual namespaces fold into one host namespace; object names are
    /// rewritten to stay collision-free.
    #[default]
    Single,
    /// Each virtual namespace gets its own dedicated host namespace; object
    /// names are kept as-is (with narrow exceptions).
    Multi,
}

/// Per-feature sync toggles.
///
/// A disabled feature means the corresponding mapper is never registered;
/// lookups for that kind fail with an unknown-kind error.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncSet {
    /// Sync Ingress objects to the host cluster
    pub ingresses: bool,
    /// Mirror host Nodes into the virtual cluster
    pub nodes: bool,
    /// Sync PersistentVolume objects
    pub persistent_volumes: bool,
    /// Sync Service objects
    pub services: bool,
}

impl Default for SyncSet {
    fn default() -> Self {
        Self {
            ingresses: false,
            nodes: true,
            persistent_volumes: false,
            services: true,
        }
    }
}

/// Resolved configuration for one virtual cluster.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VirtualClusterConfig {
    /// Name of the virtual cluster, used as a suffix in translated names
    pub name: String,
    /// Host namespace holding the virtual cluster's workloads (and, in
    /// single-namespace mode, every projected object)
    pub host_namespace: String,
    /// Namespace translation strategy
    #[serde(default)]
    pub namespaces: NamespaceStrategy,
    /// Per-feature sync toggles
    #[serde(default)]
    pub sync: SyncSet,
}

impl VirtualClusterConfig {
    /// Create a configuration with defaults for everything but the identity.
    pub fn new(name: impl Into<String>, host_namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host_namespace: host_namespace.into(),
            namespaces: NamespaceStrategy::default(),
            sync: SyncSet::default(),
        }
    }

    /// Parse a configuration from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|e| Error::serialization(format!("invalid config YAML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// Both the virtual cluster name and the host namespace end up embedded in
    /// translated object names, so they must be DNS-1123 labels.
    pub fn validate(&self) -> Result<()> {
        if !is_dns1123_label(&self.name) {
            return Err(Error::validation_for_field(
                "name",
                format!("'{}' is not a DNS-1123 label", self.name),
            ));
        }
        if !is_dns1123_label(&self.host_namespace) {
            return Err(Error::validation_for_field(
                "hostNamespace",
                format!("'{}' is not a DNS-1123 label", self.host_namespace),
            ));
        }
        Ok(())
    }

    /// True when each virtual namespace gets a dedicated host namespace.
    pub fn multi_namespace(&self) -> bool {
        self.namespaces == NamespaceStrategy::Multi
    }
}

/// Check that a string is a valid DNS-1123 label (lowercase alphanumerics
/// and '-', starting and ending alphanumeric, at most 63 characters).
pub fn is_dns1123_label(s: &str) -> bool {
    if s.is_empty() || s.len() > 63 {
        return false;
    }
    let bytes = s.as_bytes();
    let alnum = |b: u8| b.is_ascii_lowercase() || b.is_ascii_digit();
    if !alnum(bytes[0]) || !alnum(bytes[bytes.len() - 1]) {
        return false;
    }
    bytes.iter().all(|&b| alnum(b) || b == b'-')
}

/// Check that a string is a valid DNS-1123 subdomain (dot-separated labels,
/// at most 253 characters). Object names for most kinds live in this space.
pub fn is_dns1123_subdomain(s: &str) -> bool {
    if s.is_empty() || s.len() > 253 {
        return false;
    }
    s.split('.').all(is_dns1123_label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_single_namespace_with_core_syncers() {
        let config = VirtualClusterConfig::new("tenant-a", "vc-tenant-a");
        assert!(!config.multi_namespace());
        assert!(config.sync.nodes);
        assert!(config.sync.services);
        assert!(!config.sync.ingresses);
        assert!(!config.sync.persistent_volumes);
        config.validate().expect("default config is valid");
    }

    #[test]
    fn from_yaml_parses_toggles_and_strategy() {
        let yaml = r#"
name: tenant-a
hostNamespace: vc-tenant-a
namespaces: multi
sync:
  ingresses: true
  persistentVolumes: true
"#;
        let config = VirtualClusterConfig::from_yaml(yaml).expect("valid yaml");
        assert!(config.multi_namespace());
        assert!(config.sync.ingresses);
        assert!(config.sync.persistent_volumes);
        // Unspecified toggles keep their defaults
        assert!(config.sync.nodes);
    }

    #[test]
    fn invalid_names_are_rejected() {
        let config = VirtualClusterConfig::new("Tenant_A", "vc");
        let err = config.validate().expect_err("uppercase name must fail");
        assert!(err.to_string().contains("DNS-1123"));

        let config = VirtualClusterConfig::new("tenant-a", "-bad");
        assert!(config.validate().is_err());
    }

    #[test]
    fn dns1123_checks() {
        assert!(is_dns1123_label("tenant-a"));
        assert!(!is_dns1123_label(""));
        assert!(!is_dns1123_label("-leading"));
        assert!(!is_dns1123_label("trailing-"));
        assert!(!is_dns1123_label("UPPER"));

        assert!(is_dns1123_subdomain("kube-root-ca.crt"));
        assert!(!is_dns1123_subdomain("double..dot"));
    }
}
