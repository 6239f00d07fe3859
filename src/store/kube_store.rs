//! [`ClusterStore`] over the Kubernetes API.

use super::{ClusterStore, StoreError};
use crate::constants::FIELD_MANAGER;
use crate::crd::CredentialResource;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::api::{Api, Patch, PatchParams, PostParams};
use kube::{Client, Resource, ResourceExt};
use serde_json::json;

/// Store backed by a `kube::Client`
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl std::fmt::Debug for KubeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeStore").finish_non_exhaustive()
    }
}

impl KubeStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

/// Map API status codes onto the store's error classes
fn classify(error: kube::Error, kind: &str, namespace: &str, name: &str) -> StoreError {
    match &error {
        kube::Error::Api(e) if e.code == 404 => StoreError::NotFound {
            kind: kind.to_string(),
            namespace: namespace.to_string(),
            name: name.to_string(),
        },
        kube::Error::Api(e) if e.code == 409 => StoreError::Conflict {
            kind: kind.to_string(),
            namespace: namespace.to_string(),
            name: name.to_string(),
        },
        _ => StoreError::Api(error),
    }
}

#[async_trait]
impl ClusterStore for KubeStore {
    async fn get<K: CredentialResource>(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<K>, StoreError> {
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        api.get_opt(name)
            .await
            .map_err(|e| classify(e, &K::kind(&()), namespace, name))
    }

    async fn replace_status<K: CredentialResource>(&self, resource: &K) -> Result<K, StoreError> {
        let name = resource.name_any();
        let namespace = resource.namespace().unwrap_or_default();
        let api: Api<K> = Api::namespaced(self.client.clone(), &namespace);

        // resourceVersion in a merge patch turns the write into a compare-and-swap
        let patch = json!({
            "metadata": { "resourceVersion": resource.meta().resource_version },
            "status": resource.status(),
        });

        api.patch_status(&name, &PatchParams::apply(FIELD_MANAGER), &Patch::Merge(&patch))
            .await
            .map_err(|e| classify(e, &K::kind(&()), &namespace, &name))
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>, StoreError> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        api.get_opt(name)
            .await
            .map_err(|e| classify(e, "Secret", namespace, name))
    }

    async fn create_secret(&self, secret: &Secret) -> Result<Secret, StoreError> {
        let name = secret.name_any();
        let namespace = secret.namespace().unwrap_or_default();
        let api: Api<Secret> = Api::namespaced(self.client.clone(), &namespace);
        api.create(&PostParams::default(), secret)
            .await
            .map_err(|e| classify(e, "Secret", &namespace, &name))
    }

    async fn replace_secret(&self, secret: &Secret) -> Result<Secret, StoreError> {
        let name = secret.name_any();
        let namespace = secret.namespace().unwrap_or_default();
        let api: Api<Secret> = Api::namespaced(self.client.clone(), &namespace);
        api.replace(&name, &PostParams::default(), secret)
            .await
            .map_err(|e| classify(e, "Secret", &namespace, &name))
    }
}
