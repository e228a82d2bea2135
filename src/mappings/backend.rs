//! Storage backends for the mapping store
//!
//! Production deployments need recorded mappings to survive process
//! restarts: losing a recorded-only mapping orphans the host object it was
//! pointing at. The [`SecretBackend`] keeps the whole table as JSON inside
//! a Secret in the virtual cluster's host namespace, written with
//! server-side apply so saves never race with concurrent creators.

use std::sync::Mutex;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::api::{Api, Patch, PatchParams};
use kube::Client;
use tracing::debug;

use crate::mappings::store::PersistedMappings;
use crate::{Error, Result};

/// Field manager used for server-side apply of the mappings Secret.
const FIELD_MANAGER: &str = "burrow-mappings";

/// Secret data key holding the serialized table.
const MAPPINGS_KEY: &str = "mappings.json";

/// Durable storage for the mapping table.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Load the persisted table; an absent backing object yields the empty
    /// table, not an error.
    async fn load(&self) -> Result<PersistedMappings>;

    /// Durably persist the table.
    async fn save(&self, state: &PersistedMappings) -> Result<()>;
}

/// In-memory backend for tests and ephemeral virtual clusters.
#[derive(Default)]
pub struct MemoryBackend {
    state: Mutex<PersistedMappings>,
    saves: Mutex<usize>,
}

impl MemoryBackend {
    /// Number of saves performed, for test assertions.
    pub fn save_count(&self) -> usize {
        *self.saves.lock().unwrap_or_else(|p| p.into_inner())
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn load(&self) -> Result<PersistedMappings> {
        Ok(self
            .state
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone())
    }

    async fn save(&self, state: &PersistedMappings) -> Result<()> {
        *self.state.lock().unwrap_or_else(|p| p.into_inner()) = state.clone();
        *self.saves.lock().unwrap_or_else(|p| p.into_inner()) += 1;
        Ok(())
    }
}

/// Backend persisting the table into a Secret in the host cluster.
pub struct SecretBackend {
    client: Client,
    namespace: String,
    name: String,
}

impl SecretBackend {
    /// Create a backend writing to `burrow-mappings-<name>` in the
    /// virtual cluster's host namespace.
    pub fn new(client: Client, host_namespace: impl Into<String>, virtual_cluster: &str) -> Self {
        Self {
            client,
            namespace: host_namespace.into(),
            name: format!("burrow-mappings-{}", virtual_cluster),
        }
    }
}

#[async_trait]
impl Backend for SecretBackend {
    async fn load(&self) -> Result<PersistedMappings> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), &self.namespace);
        let Some(secret) = api.get_opt(&self.name).await? else {
            debug!(name = %self.name, "no persisted mappings yet, starting empty");
            return Ok(PersistedMappings::default());
        };

        let Some(bytes) = secret.data.as_ref().and_then(|d| d.get(MAPPINGS_KEY)) else {
            return Ok(PersistedMappings::default());
        };

        serde_json::from_slice(&bytes.0).map_err(|e| {
            Error::serialization(format!(
                "corrupt persisted mappings in secret {}/{}: {}",
                self.namespace, self.name, e
            ))
        })
    }

    async fn save(&self, state: &PersistedMappings) -> Result<()> {
        let json = serde_json::to_string(state)
            .map_err(|e| Error::serialization(format!("serializing mappings: {}", e)))?;

        let secret = serde_json::json!({
            "apiVersion": "v1",
            "kind": "Secret",
            "metadata": {
                "name": self.name,
                "namespace": self.namespace,
            },
            "stringData": { MAPPINGS_KEY: json },
        });

        let api: Api<Secret> = Api::namespaced(self.client.clone(), &self.namespace);
        api.patch(
            &self.name,
            &PatchParams::apply(FIELD_MANAGER).force(),
            &Patch::Apply(&secret),
        )
        .await?;

        debug!(
            name = %self.name,
            mappings = state.mappings.len(),
            "persisted mapping table"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use k8s_openapi::api::core::v1::Secret as SecretKind;

    use super::*;
    use crate::mappings::store::RecordedMapping;
    use crate::types::{NameMapping, ObjectName, ResourceKind};

    #[tokio::test]
    async fn memory_backend_round_trips() {
        let backend = MemoryBackend::default();
        assert_eq!(backend.load().await.unwrap(), PersistedMappings::default());

        let state = PersistedMappings {
            mappings: vec![RecordedMapping {
                mapping: NameMapping::new(
                    ResourceKind::of::<SecretKind>(),
                    ObjectName::namespaced("ns1", "db-creds"),
                    ObjectName::namespaced("vc", "db-creds-x-ns1-x-t"),
                ),
                owner: None,
            }],
            schemes: vec![],
        };
        backend.save(&state).await.unwrap();
        assert_eq!(backend.load().await.unwrap(), state);
        assert_eq!(backend.save_count(), 1);
    }

    #[test]
    fn persisted_state_json_is_stable() {
        // The persisted representation is consumed back by `load`; missing
        // fields must default rather than fail so older states stay readable.
        let state: PersistedMappings = serde_json::from_str("{}").unwrap();
        assert!(state.mappings.is_empty());
        assert!(state.schemes.is_empty());

        let state: PersistedMappings = serde_json::from_str(
            r#"{"mappings":[{"mapping":{
                "kind":{"group":"","version":"v1","kind":"Secret"},
                "virtual_name":{"namespace":"ns1","name":"db-creds"},
                "host_name":{"namespace":"vc","name":"db-creds-x-ns1-x-t"}}}]}"#,
        )
        .unwrap();
        assert_eq!(state.mappings.len(), 1);
        assert!(state.mappings[0].owner.is_none());
    }
}
