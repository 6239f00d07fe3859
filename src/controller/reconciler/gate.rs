//! # Idempotency Gate
//!
//! Decides whether cryptographic work has already happened for a resource by
//! looking for its output Secret. An existing Secret is never regenerated; the
//! reconciler only re-derives display fields (fingerprints) from its bytes.

use super::types::ReconcilerError;
use crate::crd::CredentialResource;
use crate::store::ClusterStore;
use k8s_openapi::api::core::v1::Secret;
use kube::{Resource, ResourceExt};

/// Canonical output Secret name: the explicit name, or `<resource>-<suffix>`
pub fn output_name(explicit: Option<&str>, resource_name: &str, suffix: &str) -> String {
    match explicit.map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => format!("{resource_name}-{suffix}"),
    }
}

/// An output Secret that already exists and belongs to the requester
#[derive(Debug, Clone)]
pub struct StoredOutput {
    secret: Secret,
}

impl StoredOutput {
    pub fn new(secret: Secret) -> Self {
        Self { secret }
    }

    pub fn name(&self) -> String {
        self.secret.name_any()
    }

    /// Bytes under `key`, if present
    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.secret
            .data
            .as_ref()
            .and_then(|data| data.get(key))
            .map(|bytes| bytes.0.as_slice())
    }

    /// Bytes under `key`; a missing key is a data integrity failure
    pub fn field(&self, key: &str) -> Result<&[u8], ReconcilerError> {
        self.get(key).ok_or_else(|| {
            ReconcilerError::DataIntegrity(format!(
                "Secret {} exists but has no '{key}' field",
                self.name()
            ))
        })
    }

    /// Fail unless every key in `keys` is present
    pub fn require(&self, keys: &[&str]) -> Result<(), ReconcilerError> {
        keys.iter().try_for_each(|key| self.field(key).map(|_| ()))
    }

    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.secret.annotations().get(key).map(String::as_str)
    }
}

/// Uid of the controlling owner of a Secret
pub fn controller_uid(secret: &Secret) -> Option<&str> {
    secret
        .owner_references()
        .iter()
        .find(|r| r.controller == Some(true))
        .map(|r| r.uid.as_str())
}

/// Fail unless `secret` is controlled by `owner`
pub fn ensure_owned_by<K: CredentialResource>(
    secret: &Secret,
    owner: &K,
) -> Result<(), ReconcilerError> {
    let owner_uid = owner.meta().uid.as_deref();
    match controller_uid(secret) {
        Some(uid) if Some(uid) == owner_uid => Ok(()),
        other => Err(ReconcilerError::OwnershipCollision {
            secret: format!(
                "{}/{}",
                secret.namespace().unwrap_or_default(),
                secret.name_any()
            ),
            owner: other.map_or_else(|| "no controller".to_string(), |uid| format!("uid {uid}")),
        }),
    }
}

/// Look up the output Secret for `owner`
///
/// `Ok(None)` means the work has not been done yet. A Secret with that name
/// that some other object controls (or nothing controls) is a collision.
pub async fn check<S, K>(
    store: &S,
    owner: &K,
    namespace: &str,
    name: &str,
) -> Result<Option<StoredOutput>, ReconcilerError>
where
    S: ClusterStore,
    K: CredentialResource,
{
    let Some(secret) = store.get_secret(namespace, name).await? else {
        return Ok(None);
    };
    ensure_owned_by(&secret, owner)?;
    Ok(Some(StoredOutput::new(secret)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::ByteString;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
    use std::collections::BTreeMap;

    fn secret_with(uid: Option<&str>, data: &[(&str, &[u8])]) -> Secret {
        Secret {
            metadata: ObjectMeta {
                name: Some("alice-keypair".to_string()),
                namespace: Some("default".to_string()),
                owner_references: uid.map(|uid| {
                    vec![OwnerReference {
                        api_version: "qubesec.io/v1".to_string(),
                        kind: "QuantumKEMKeyPair".to_string(),
                        name: "alice".to_string(),
                        uid: uid.to_string(),
                        controller: Some(true),
                        block_owner_deletion: Some(true),
                    }]
                }),
                ..Default::default()
            },
            data: Some(
                data.iter()
                    .map(|(k, v)| (k.to_string(), ByteString(v.to_vec())))
                    .collect::<BTreeMap<_, _>>(),
            ),
            ..Default::default()
        }
    }

    #[test]
    fn test_output_name_defaults_to_suffix() {
        assert_eq!(output_name(None, "alice", "keypair"), "alice-keypair");
        assert_eq!(output_name(Some(""), "alice", "keypair"), "alice-keypair");
        assert_eq!(output_name(Some("custom"), "alice", "keypair"), "custom");
    }

    #[test]
    fn test_missing_field_is_data_integrity() {
        let stored = StoredOutput::new(secret_with(None, &[("public-key", b"pk")]));
        assert_eq!(stored.field("public-key").unwrap(), b"pk");

        let err = stored.require(&["public-key", "private-key"]).unwrap_err();
        assert!(matches!(err, ReconcilerError::DataIntegrity(_)));
        assert!(err.to_string().contains("private-key"));
    }

    #[test]
    fn test_controller_uid() {
        assert_eq!(controller_uid(&secret_with(Some("u-1"), &[])), Some("u-1"));
        assert_eq!(controller_uid(&secret_with(None, &[])), None);
    }
}
