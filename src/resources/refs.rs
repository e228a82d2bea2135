//! Secret reference extraction from referencing objects
//!
//! Pods and ingresses reach secrets indirectly: env vars, envFrom, secret
//! and projected volumes, image pull secrets, TLS blocks and a handful of
//! ingress-controller annotations. These references are only ever resolved
//! lazily during sync, so migration uses the same extraction to seed
//! mappings up front.
//!
//! Extraction walks the raw object JSON rather than typed structs: the
//! fields involved are stable across Kubernetes versions and the walk
//! tolerates objects from clusters newer than our typed bindings.

use std::collections::BTreeSet;

use kube::api::DynamicObject;
use serde_json::Value;

use crate::types::ObjectName;

/// Ingress annotations whose value names a secret.
///
/// Values are either `name` (same namespace as the ingress) or
/// `namespace/name`.
const INGRESS_SECRET_ANNOTATIONS: &[&str] = &[
    "nginx.ingress.kubernetes.io/auth-secret",
    "nginx.ingress.kubernetes.io/auth-tls-secret",
    "nginx.ingress.kubernetes.io/proxy-ssl-secret",
];

fn items<'a>(value: Option<&'a Value>) -> impl Iterator<Item = &'a Value> + 'a {
    value
        .and_then(Value::as_array)
        .map(|a| a.iter())
        .unwrap_or_default()
}

fn str_at<'a>(value: &'a Value, pointer: &str) -> Option<&'a str> {
    value.pointer(pointer).and_then(Value::as_str)
}

/// All secrets a pod references, as virtual identities.
pub fn pod_secret_refs(namespace: &str, pod: &DynamicObject) -> BTreeSet<ObjectName> {
    let mut names: BTreeSet<String> = BTreeSet::new();
    let Some(spec) = pod.data.get("spec") else {
        return BTreeSet::new();
    };

    for container in items(spec.get("containers")).chain(items(spec.get("initContainers"))) {
        for env in items(container.get("env")) {
            if let Some(name) = str_at(env, "/valueFrom/secretKeyRef/name") {
                names.insert(name.to_string());
            }
        }
        for env_from in items(container.get("envFrom")) {
            if let Some(name) = str_at(env_from, "/secretRef/name") {
                names.insert(name.to_string());
            }
        }
    }

    for volume in items(spec.get("volumes")) {
        if let Some(name) = str_at(volume, "/secret/secretName") {
            names.insert(name.to_string());
        }
        // Projected service-account token volumes carry secret sources
        for source in items(volume.pointer("/projected/sources")) {
            if let Some(name) = str_at(source, "/secret/name") {
                names.insert(name.to_string());
            }
        }
    }

    for pull_secret in items(spec.get("imagePullSecrets")) {
        if let Some(name) = str_at(pull_secret, "/name") {
            names.insert(name.to_string());
        }
    }

    names
        .into_iter()
        .filter(|n| !n.is_empty())
        .map(|n| ObjectName::namespaced(namespace, n))
        .collect()
}

/// All secrets an ingress references, as virtual identities.
pub fn ingress_secret_refs(namespace: &str, ingress: &DynamicObject) -> BTreeSet<ObjectName> {
    let mut refs: BTreeSet<ObjectName> = BTreeSet::new();

    for tls in items(ingress.data.pointer("/spec/tls")) {
        if let Some(name) = str_at(tls, "/secretName") {
            if !name.is_empty() {
                refs.insert(ObjectName::namespaced(namespace, name));
            }
        }
    }

    if let Some(annotations) = ingress.metadata.annotations.as_ref() {
        for key in INGRESS_SECRET_ANNOTATIONS {
            let Some(value) = annotations.get(*key) else {
                continue;
            };
            if value.is_empty() {
                continue;
            }
            let reference = match value.split_once('/') {
                Some((ns, name)) => ObjectName::namespaced(ns, name),
                None => ObjectName::namespaced(namespace, value.clone()),
            };
            if !reference.is_empty() {
                refs.insert(reference);
            }
        }
    }

    refs
}
