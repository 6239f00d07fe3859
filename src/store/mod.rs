//! # Cluster Store
//!
//! The reconcilers only talk to the cluster through [`ClusterStore`]. In the
//! controller it is backed by the Kubernetes API ([`KubeStore`]); tests use the
//! in-process [`MemoryStore`], which enforces the same resource-version and
//! owner-reference rules.

mod kube_store;
mod memory;

pub use kube_store::KubeStore;
pub use memory::MemoryStore;

use crate::crd::CredentialResource;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use thiserror::Error;

/// Failure talking to the cluster store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{kind} {namespace}/{name} not found")]
    NotFound {
        kind: String,
        namespace: String,
        name: String,
    },

    /// Stale resource version or name already taken
    #[error("conflict writing {kind} {namespace}/{name}")]
    Conflict {
        kind: String,
        namespace: String,
        name: String,
    },

    #[error("Kubernetes API error: {0}")]
    Api(#[source] kube::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}

/// Read and write access to QubeSec resources and their output Secrets
///
/// Writes are optimistic: objects carry `metadata.resourceVersion` and a stale
/// version fails with [`StoreError::Conflict`] instead of overwriting.
#[async_trait]
pub trait ClusterStore: Send + Sync + 'static {
    /// Fetch a resource; `Ok(None)` if it does not exist
    async fn get<K: CredentialResource>(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<K>, StoreError>;

    /// Write `resource.status` guarded by `resource.metadata.resourceVersion`
    async fn replace_status<K: CredentialResource>(&self, resource: &K) -> Result<K, StoreError>;

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>, StoreError>;

    /// Create a Secret; an existing name is a conflict
    async fn create_secret(&self, secret: &Secret) -> Result<Secret, StoreError>;

    /// Replace a Secret guarded by its resource version
    async fn replace_secret(&self, secret: &Secret) -> Result<Secret, StoreError>;
}
