//! # Secret Materializer
//!
//! Writes cryptographic output into Secrets owned by the requesting resource.
//! The controller owner reference is part of the object at creation, so an
//! output Secret never exists without its owner link and is garbage-collected
//! together with the requester.

use super::gate::ensure_owned_by;
use super::types::ReconcilerError;
use crate::constants::{FIELD_MANAGER, MANAGED_BY_LABEL};
use crate::crd::CredentialResource;
use crate::observability::metrics;
use crate::store::ClusterStore;
use k8s_openapi::ByteString;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::Resource;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Payload of an output Secret: field name to raw bytes
pub type SecretPayload = BTreeMap<String, Vec<u8>>;

/// Build an output Secret controlled by `owner`
pub fn build_secret<K: CredentialResource>(
    owner: &K,
    namespace: &str,
    name: &str,
    payload: SecretPayload,
    annotations: BTreeMap<String, String>,
) -> Result<Secret, ReconcilerError> {
    let owner_ref = owner.controller_owner_ref(&()).ok_or_else(|| {
        ReconcilerError::Internal(anyhow::anyhow!(
            "{} {namespace}/{} has no uid, cannot own Secret {name}",
            K::kind(&()),
            owner.meta().name.as_deref().unwrap_or_default()
        ))
    })?;

    Ok(Secret {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            owner_references: Some(vec![owner_ref]),
            labels: Some(BTreeMap::from([(
                MANAGED_BY_LABEL.to_string(),
                FIELD_MANAGER.to_string(),
            )])),
            annotations: (!annotations.is_empty()).then_some(annotations),
            ..Default::default()
        },
        type_: Some("Opaque".to_string()),
        data: Some(
            payload
                .into_iter()
                .map(|(key, bytes)| (key, ByteString(bytes)))
                .collect(),
        ),
        ..Default::default()
    })
}

/// Create the output Secret for `owner` and return it as stored
///
/// If a Secret with the name appeared since the gate looked, it is returned
/// when `owner` controls it and rejected as a collision otherwise. Callers
/// derive fingerprints from the returned object, not from their own payload.
pub async fn create<S, K>(
    store: &S,
    owner: &K,
    namespace: &str,
    name: &str,
    payload: SecretPayload,
) -> Result<Secret, ReconcilerError>
where
    S: ClusterStore,
    K: CredentialResource,
{
    let secret = build_secret(owner, namespace, name, payload, BTreeMap::new())?;
    match store.create_secret(&secret).await {
        Ok(created) => {
            info!(secret = %format!("{namespace}/{name}"), kind = %K::kind(&()), "Created output Secret");
            metrics::increment_secrets_materialized(&K::kind(&()));
            Ok(created)
        }
        Err(e) if e.is_conflict() => {
            let existing = store.get_secret(namespace, name).await?.ok_or(ReconcilerError::Conflict)?;
            ensure_owned_by(&existing, owner)?;
            debug!(secret = %format!("{namespace}/{name}"), "Output Secret already created by an earlier pass");
            Ok(existing)
        }
        Err(e) => Err(e.into()),
    }
}

/// Write one field (and annotations) of an output Secret, creating it if absent
///
/// Other fields of an existing Secret are preserved.
pub async fn upsert_field<S, K>(
    store: &S,
    owner: &K,
    namespace: &str,
    name: &str,
    field: &str,
    bytes: Vec<u8>,
    annotations: BTreeMap<String, String>,
) -> Result<Secret, ReconcilerError>
where
    S: ClusterStore,
    K: CredentialResource,
{
    let Some(mut existing) = store.get_secret(namespace, name).await? else {
        let payload = SecretPayload::from([(field.to_string(), bytes)]);
        let secret = build_secret(owner, namespace, name, payload, annotations)?;
        let created = store.create_secret(&secret).await?;
        info!(secret = %format!("{namespace}/{name}"), kind = %K::kind(&()), "Created output Secret");
        metrics::increment_secrets_materialized(&K::kind(&()));
        return Ok(created);
    };

    ensure_owned_by(&existing, owner)?;
    existing
        .data
        .get_or_insert_with(BTreeMap::new)
        .insert(field.to_string(), ByteString(bytes));
    existing
        .metadata
        .annotations
        .get_or_insert_with(BTreeMap::new)
        .extend(annotations);

    let replaced = store.replace_secret(&existing).await?;
    info!(secret = %format!("{namespace}/{name}"), field, "Updated output Secret");
    metrics::increment_secrets_materialized(&K::kind(&()));
    Ok(replaced)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{QuantumSignMessage, QuantumSignMessageSpec, ObjectReference};
    use crate::store::MemoryStore;

    async fn signer(store: &MemoryStore, name: &str) -> QuantumSignMessage {
        let mut sm = QuantumSignMessage::new(
            name,
            QuantumSignMessageSpec {
                private_key_ref: ObjectReference::new("bob", "default"),
                message_ref: ObjectReference::new("msg", "default"),
                message_key: "message".to_string(),
                algorithm: "ML-DSA-65".to_string(),
                output_secret_name: None,
                signature_key: "signature".to_string(),
            },
        );
        sm.metadata.namespace = Some("default".to_string());
        store.apply(sm).await.unwrap()
    }

    #[tokio::test]
    async fn test_created_secret_is_owned() {
        let store = MemoryStore::new();
        let owner = signer(&store, "s1").await;
        let payload = SecretPayload::from([("signature".to_string(), vec![1, 2, 3])]);

        let secret = create(&store, &owner, "default", "s1-signature", payload).await.unwrap();
        let refs = secret.metadata.owner_references.unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(Some(refs[0].uid.as_str()), owner.metadata.uid.as_deref());
        assert_eq!(refs[0].controller, Some(true));
    }

    #[tokio::test]
    async fn test_foreign_secret_is_a_collision() {
        let store = MemoryStore::new();
        let first = signer(&store, "s1").await;
        let second = signer(&store, "s2").await;
        let payload = SecretPayload::from([("signature".to_string(), vec![1])]);
        create(&store, &first, "default", "shared", payload.clone()).await.unwrap();

        let err = create(&store, &second, "default", "shared", payload).await.unwrap_err();
        assert!(matches!(err, ReconcilerError::OwnershipCollision { .. }));
    }

    #[tokio::test]
    async fn test_upsert_preserves_other_fields() {
        let store = MemoryStore::new();
        let owner = signer(&store, "s1").await;
        let payload = SecretPayload::from([
            ("signature".to_string(), vec![1]),
            ("note".to_string(), b"keep".to_vec()),
        ]);
        create(&store, &owner, "default", "s1-signature", payload).await.unwrap();

        let updated = upsert_field(
            &store,
            &owner,
            "default",
            "s1-signature",
            "signature",
            vec![9, 9],
            BTreeMap::from([("qubesec.io/message-fingerprint".to_string(), "abc".to_string())]),
        )
        .await
        .unwrap();

        let data = updated.data.unwrap();
        assert_eq!(data["signature"].0, vec![9, 9]);
        assert_eq!(data["note"].0, b"keep".to_vec());
        assert_eq!(
            updated.metadata.annotations.unwrap()["qubesec.io/message-fingerprint"],
            "abc"
        );
    }
}
