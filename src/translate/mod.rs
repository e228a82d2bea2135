//! Name translation between virtual and host identities
//!
//! The deterministic name functions live here, shared by every translation
//! strategy. Host names embed the virtual namespace and the virtual cluster name so
//! that two tenants (or two namespaces of one tenant) can never collide in
//! the shared host namespace. Long composite names are truncated and given a
//! stable digest suffix to stay within Kubernetes name limits.
//!
//! Strategy implementations:
//! - [`namespaced`] — deterministic function of (name, namespace)
//! - [`cluster_scoped`] — deterministic function of name
//! - [`mirror`] — identity translation (virtual- or host-originated)
//! - [`custom`] — caller-supplied, object-aware translation

pub mod annotations;
pub mod cluster_scoped;
pub mod custom;
pub mod mirror;
pub mod namespaced;

pub use cluster_scoped::ClusterScopedMapper;
pub use custom::CustomMapper;
pub use mirror::{MirrorHostMapper, MirrorMapper};
pub use namespaced::NamespacedMapper;

use crate::config::VirtualClusterConfig;
use crate::types::ObjectName;

/// Maximum length of most Kubernetes object names (DNS-1123 label space).
pub const MAX_NAME_LENGTH: usize = 63;

/// Number of hex characters in the digest suffix of a shortened name.
const DIGEST_SUFFIX_LENGTH: usize = 10;

/// The ConfigMap every namespace gets from the cluster itself.
///
/// In multi-namespace mode the host cluster auto-creates its own copy in
/// every host namespace, so the virtual one must be rewritten to avoid the
/// collision.
pub const ROOT_CA_CONFIG_MAP: &str = "kube-root-ca.crt";

/// Compute a deterministic digest of the input, returning a short hex string.
///
/// Uses truncated SHA-256 for stability across Rust toolchain versions.
/// `DefaultHasher` is NOT guaranteed stable across releases, so this function
/// must be used whenever the result is persisted or embedded in object names.
pub fn deterministic_digest(input: &str) -> String {
    use aws_lc_rs::digest;
    let hash = digest::digest(&digest::SHA256, input.as_bytes());
    hash.as_ref()[..DIGEST_SUFFIX_LENGTH / 2]
        .iter()
        .fold(String::with_capacity(DIGEST_SUFFIX_LENGTH), |mut s, b| {
            use std::fmt::Write;
            let _ = write!(s, "{:02x}", b);
            s
        })
}

/// Join name parts with '-', shortening the result to a valid object name.
///
/// Names longer than [`MAX_NAME_LENGTH`] are truncated and suffixed with a
/// digest of the full joined form, so distinct long inputs stay distinct and
/// the same input always produces the same output.
pub fn safe_concat_name(parts: &[&str]) -> String {
    let joined = parts
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("-");
    if joined.len() <= MAX_NAME_LENGTH {
        return joined;
    }

    let keep = MAX_NAME_LENGTH - DIGEST_SUFFIX_LENGTH - 1;
    let prefix = joined[..keep].trim_end_matches(['-', '.']);
    format!("{}-{}", prefix, deterministic_digest(&joined))
}

/// Host namespace for a virtual namespace.
///
/// Single-namespace mode folds everything into the configured host
/// namespace. Multi-namespace mode derives a dedicated host namespace per
/// virtual namespace, qualified by the virtual cluster name.
pub fn host_namespace(config: &VirtualClusterConfig, virtual_namespace: &str) -> String {
    if config.multi_namespace() {
        safe_concat_name(&["burrow", virtual_namespace, "x", &config.name])
    } else {
        config.host_namespace.clone()
    }
}

/// Default host name for a namespaced object.
///
/// Single-namespace mode rewrites `name` to `name-x-namespace-x-cluster`
/// so objects from different virtual namespaces coexist in one host
/// namespace. Multi-namespace mode keeps the name unchanged (the namespace
/// itself provides isolation).
pub fn host_name(config: &VirtualClusterConfig, virtual_name: &ObjectName) -> String {
    if config.multi_namespace() {
        virtual_name.name.clone()
    } else {
        safe_concat_name(&[
            &virtual_name.name,
            "x",
            &virtual_name.namespace,
            "x",
            &config.name,
        ])
    }
}

/// Default host name for a cluster-scoped object.
///
/// Qualified by both the virtual cluster's host namespace and its name: two
/// virtual clusters may share a name as long as they live in different host
/// namespaces.
pub fn host_name_cluster_scoped(config: &VirtualClusterConfig, virtual_name: &str) -> String {
    safe_concat_name(&[
        "burrow",
        virtual_name,
        "x",
        &config.host_namespace,
        "x",
        &config.name,
    ])
}

/// Host name for the root CA ConfigMap in multi-namespace mode.
pub fn root_ca_host_name(config: &VirtualClusterConfig) -> String {
    safe_concat_name(&["burrow", ROOT_CA_CONFIG_MAP, "x", &config.name])
}

/// Fingerprint of a translation scheme.
///
/// Covers everything a derived host identity depends on: the strategy (and
/// any per-kind name-function variant folded into `strategy`), the
/// namespace mode, the target namespace and the virtual cluster name. A changed
/// fingerprint at startup triggers migration for the kind.
pub fn scheme_fingerprint(config: &VirtualClusterConfig, strategy: &str) -> String {
    let mode = if config.multi_namespace() {
        "multi"
    } else {
        "single"
    };
    format!(
        "{}/{}/{}/{}",
        strategy, mode, config.host_namespace, config.name
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{is_dns1123_subdomain, NamespaceStrategy};

    fn single_ns_config() -> VirtualClusterConfig {
        VirtualClusterConfig::new("tenant-a", "vc-tenant-a")
    }

    fn multi_ns_config() -> VirtualClusterConfig {
        let mut config = single_ns_config();
        config.namespaces = NamespaceStrategy::Multi;
        config
    }

    #[test]
    fn short_names_join_unchanged() {
        assert_eq!(safe_concat_name(&["web", "x", "ns1"]), "web-x-ns1");
        // Empty parts are skipped, not doubled into '--'
        assert_eq!(safe_concat_name(&["web", "", "ns1"]), "web-ns1");
    }

    #[test]
    fn long_names_are_shortened_deterministically() {
        let long = "a".repeat(80);
        let first = safe_concat_name(&[&long, "x", "ns1"]);
        let second = safe_concat_name(&[&long, "x", "ns1"]);
        assert_eq!(first, second);
        assert_eq!(first.len(), MAX_NAME_LENGTH);
        assert!(is_dns1123_subdomain(&first));

        // Distinct long inputs must not collide after truncation
        let other = safe_concat_name(&[&long, "x", "ns2"]);
        assert_ne!(first, other);
        assert_eq!(&first[..40], &other[..40]);
    }

    #[test]
    fn digest_is_stable_and_hex() {
        let d = deterministic_digest("db-creds-x-ns1-x-tenant-a");
        assert_eq!(d, deterministic_digest("db-creds-x-ns1-x-tenant-a"));
        assert_eq!(d.len(), 10);
        assert!(d.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn single_namespace_folds_and_rewrites() {
        let config = single_ns_config();
        assert_eq!(host_namespace(&config, "ns1"), "vc-tenant-a");
        assert_eq!(host_namespace(&config, "ns2"), "vc-tenant-a");

        let name = host_name(&config, &ObjectName::namespaced("ns1", "web"));
        assert_eq!(name, "web-x-ns1-x-tenant-a");
        // Same name in another namespace stays distinct in the host view
        let other = host_name(&config, &ObjectName::namespaced("ns2", "web"));
        assert_ne!(name, other);
    }

    #[test]
    fn multi_namespace_keeps_names_and_derives_namespaces() {
        let config = multi_ns_config();
        let ns1 = host_namespace(&config, "ns1");
        let ns2 = host_namespace(&config, "ns2");
        assert_eq!(ns1, "burrow-ns1-x-tenant-a");
        assert_ne!(ns1, ns2);

        let name = host_name(&config, &ObjectName::namespaced("ns1", "web"));
        assert_eq!(name, "web");
    }

    #[test]
    fn cluster_scoped_names_qualify_by_virtual_cluster() {
        let config = single_ns_config();
        let name = host_name_cluster_scoped(&config, "fast-ssd");
        assert_eq!(name, "burrow-fast-ssd-x-vc-tenant-a-x-tenant-a");

        let mut other = single_ns_config();
        other.host_namespace = "vc-other".to_string();
        assert_ne!(name, host_name_cluster_scoped(&other, "fast-ssd"));
    }

    #[test]
    fn root_ca_config_map_is_rewritten() {
        let config = multi_ns_config();
        let name = root_ca_host_name(&config);
        assert_eq!(name, "burrow-kube-root-ca.crt-x-tenant-a");
        assert!(is_dns1123_subdomain(&name));
    }
}
