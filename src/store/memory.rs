//! In-memory [`ClusterStore`]
//!
//! Objects are kept as JSON documents keyed by kind, namespace and name. The
//! store assigns uids, bumps `resourceVersion` on every write, bumps
//! `generation` when a spec changes and garbage-collects owned Secrets when
//! their owner is deleted. Thread-safe using `Arc<RwLock>` for concurrent access.

use super::{ClusterStore, StoreError};
use crate::crd::CredentialResource;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::{Resource, ResourceExt};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

const SECRET_KIND: &str = "Secret";

/// (kind, namespace, name)
type ObjectKey = (String, String, String);

#[derive(Debug, Default)]
struct MemoryState {
    objects: HashMap<ObjectKey, Value>,
    next_version: u64,
    next_uid: u64,
    /// Number of upcoming status writes to reject with a conflict
    injected_conflicts: u32,
}

impl MemoryState {
    fn bump_version(&mut self) -> String {
        self.next_version += 1;
        self.next_version.to_string()
    }

    fn assign_uid(&mut self) -> String {
        self.next_uid += 1;
        format!("00000000-0000-0000-0000-{:012}", self.next_uid)
    }
}

/// Ephemeral cluster store for tests and local runs
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

fn key(kind: &str, namespace: &str, name: &str) -> ObjectKey {
    (kind.to_string(), namespace.to_string(), name.to_string())
}

fn conflict(kind: &str, namespace: &str, name: &str) -> StoreError {
    StoreError::Conflict {
        kind: kind.to_string(),
        namespace: namespace.to_string(),
        name: name.to_string(),
    }
}

fn resource_version(value: &Value) -> Option<&str> {
    value.pointer("/metadata/resourceVersion").and_then(Value::as_str)
}

fn uid(value: &Value) -> Option<&str> {
    value.pointer("/metadata/uid").and_then(Value::as_str)
}

fn owned_by(value: &Value, owner_uid: &str) -> bool {
    value
        .pointer("/metadata/ownerReferences")
        .and_then(Value::as_array)
        .is_some_and(|refs| {
            refs.iter()
                .any(|r| r.get("uid").and_then(Value::as_str) == Some(owner_uid))
        })
}

fn decode<T: DeserializeOwned>(value: &Value) -> Result<T, StoreError> {
    Ok(serde_json::from_value(value.clone())?)
}

fn encode<T: Serialize>(object: &T) -> Result<Value, StoreError> {
    Ok(serde_json::to_value(object)?)
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a resource, or update the spec of an existing one
    ///
    /// Mirrors `kubectl apply` for the parts the reconcilers care about: a new
    /// object gets a uid and generation 1; an existing object keeps its uid and
    /// status and has its generation bumped if the spec changed.
    pub async fn apply<K: CredentialResource>(&self, resource: K) -> Result<K, StoreError> {
        let kind = K::kind(&()).to_string();
        let name = resource.name_any();
        let namespace = resource.namespace().unwrap_or_else(|| "default".to_string());
        let mut incoming = encode(&resource)?;

        let mut state = self.state.write().await;
        let object_key = key(&kind, &namespace, &name);
        let version = state.bump_version();

        let stored = match state.objects.get(&object_key).cloned() {
            Some(existing) => {
                let mut updated = existing.clone();
                let spec_changed = existing.get("spec") != incoming.get("spec");
                if let Some(spec) = incoming.get_mut("spec").map(Value::take) {
                    updated["spec"] = spec;
                }
                if spec_changed {
                    let generation = updated
                        .pointer("/metadata/generation")
                        .and_then(Value::as_i64)
                        .unwrap_or(0);
                    updated["metadata"]["generation"] = json!(generation + 1);
                }
                updated["metadata"]["resourceVersion"] = json!(version);
                updated
            }
            None => {
                let uid = state.assign_uid();
                incoming["metadata"]["namespace"] = json!(namespace);
                incoming["metadata"]["uid"] = json!(uid);
                incoming["metadata"]["generation"] = json!(1);
                incoming["metadata"]["resourceVersion"] = json!(version);
                incoming
            }
        };

        debug!(kind = %kind, namespace = %namespace, name = %name, "applied resource");
        let result = decode(&stored)?;
        state.objects.insert(object_key, stored);
        Ok(result)
    }

    /// Delete a resource and every Secret it owns
    ///
    /// Returns whether the resource existed.
    pub async fn delete<K: CredentialResource>(&self, namespace: &str, name: &str) -> bool {
        let kind = K::kind(&()).to_string();
        let mut state = self.state.write().await;
        let Some(removed) = state.objects.remove(&key(&kind, namespace, name)) else {
            return false;
        };

        if let Some(owner_uid) = uid(&removed) {
            state.objects.retain(|(k, ns, _), value| {
                !(k == SECRET_KIND && ns == namespace && owned_by(value, owner_uid))
            });
        }
        true
    }

    /// Create a Secret that no controller owns (e.g. a message to sign)
    pub async fn insert_secret(&self, secret: Secret) -> Result<Secret, StoreError> {
        self.create_secret(&secret).await
    }

    pub async fn delete_secret(&self, namespace: &str, name: &str) -> bool {
        let mut state = self.state.write().await;
        state
            .objects
            .remove(&key(SECRET_KIND, namespace, name))
            .is_some()
    }

    /// All Secrets in a namespace, sorted by name
    pub async fn secrets(&self, namespace: &str) -> Vec<Secret> {
        let state = self.state.read().await;
        let mut secrets: Vec<Secret> = state
            .objects
            .iter()
            .filter(|((kind, ns, _), _)| kind == SECRET_KIND && ns == namespace)
            .filter_map(|(_, value)| serde_json::from_value(value.clone()).ok())
            .collect();
        secrets.sort_by_key(|s| s.name_any());
        secrets
    }

    /// Reject the next `count` status writes with a conflict
    pub async fn inject_status_conflicts(&self, count: u32) {
        self.state.write().await.injected_conflicts = count;
    }
}

#[async_trait]
impl ClusterStore for MemoryStore {
    async fn get<K: CredentialResource>(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<K>, StoreError> {
        let kind = K::kind(&());
        let state = self.state.read().await;
        state
            .objects
            .get(&key(&kind, namespace, name))
            .map(decode)
            .transpose()
    }

    async fn replace_status<K: CredentialResource>(&self, resource: &K) -> Result<K, StoreError> {
        let kind = K::kind(&()).to_string();
        let name = resource.name_any();
        let namespace = resource.namespace().unwrap_or_default();
        let status = encode(&resource.status())?;

        let mut state = self.state.write().await;
        if state.injected_conflicts > 0 {
            state.injected_conflicts -= 1;
            return Err(conflict(&kind, &namespace, &name));
        }

        let object_key = key(&kind, &namespace, &name);
        let current_version = match state.objects.get(&object_key) {
            Some(existing) => resource_version(existing).map(str::to_string),
            None => {
                return Err(StoreError::NotFound {
                    kind,
                    namespace,
                    name,
                });
            }
        };
        if resource.meta().resource_version != current_version {
            return Err(conflict(&kind, &namespace, &name));
        }

        let version = state.bump_version();
        let Some(existing) = state.objects.get_mut(&object_key) else {
            return Err(conflict(&kind, &namespace, &name));
        };
        existing["status"] = status;
        existing["metadata"]["resourceVersion"] = json!(version);
        decode(existing)
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>, StoreError> {
        let state = self.state.read().await;
        state
            .objects
            .get(&key(SECRET_KIND, namespace, name))
            .map(decode)
            .transpose()
    }

    async fn create_secret(&self, secret: &Secret) -> Result<Secret, StoreError> {
        let name = secret.name_any();
        let namespace = secret.namespace().unwrap_or_else(|| "default".to_string());
        let object_key = key(SECRET_KIND, &namespace, &name);

        let mut state = self.state.write().await;
        if state.objects.contains_key(&object_key) {
            return Err(conflict(SECRET_KIND, &namespace, &name));
        }

        let mut value = encode(secret)?;
        let uid = state.assign_uid();
        let version = state.bump_version();
        value["metadata"]["namespace"] = json!(namespace);
        value["metadata"]["uid"] = json!(uid);
        value["metadata"]["resourceVersion"] = json!(version);

        let created = decode(&value)?;
        state.objects.insert(object_key, value);
        Ok(created)
    }

    async fn replace_secret(&self, secret: &Secret) -> Result<Secret, StoreError> {
        let name = secret.name_any();
        let namespace = secret.namespace().unwrap_or_default();
        let object_key = key(SECRET_KIND, &namespace, &name);

        let mut state = self.state.write().await;
        let (current_version, current_uid) = match state.objects.get(&object_key) {
            Some(existing) => (
                resource_version(existing).map(str::to_string),
                uid(existing).map(str::to_string),
            ),
            None => {
                return Err(StoreError::NotFound {
                    kind: SECRET_KIND.to_string(),
                    namespace,
                    name,
                });
            }
        };
        if secret.metadata.resource_version != current_version {
            return Err(conflict(SECRET_KIND, &namespace, &name));
        }

        let mut value = encode(secret)?;
        let version = state.bump_version();
        value["metadata"]["uid"] = json!(current_uid);
        value["metadata"]["resourceVersion"] = json!(version);

        let replaced = decode(&value)?;
        state.objects.insert(object_key, value);
        Ok(replaced)
    }
}
