//! # Reference Resolver
//!
//! Turns a spec reference into the storage location of the referenced
//! producer's output. Producers are always followed through their
//! `status.*Reference`; the storage name is never guessed from the producer's
//! own name.
//!
//! Shared-secret references are ambiguous between two kinds and are resolved
//! in a fixed order: `QuantumEncapsulateSecret`, then `QuantumDecapsulateSecret`.

use super::types::ReconcilerError;
use crate::crd::{
    KeyPairStatus, ObjectReference, Phase, QuantumDecapsulateSecret, QuantumEncapsulateSecret,
    CredentialResource,
};
use crate::store::ClusterStore;
use kube::Resource;
use tracing::debug;

/// Resolution result: ready to use, or waiting on the producer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved<T> {
    Ready(T),
    Pending(String),
}

/// Fill in the namespace a reference points into
pub fn qualify(reference: &ObjectReference, requester_namespace: &str) -> ObjectReference {
    ObjectReference::new(
        reference.name.clone(),
        reference.namespace_or(requester_namespace).to_string(),
    )
}

fn not_ready(kind: &str, reference: &ObjectReference, phase: Phase) -> String {
    format!(
        "waiting for {kind} {}/{} to succeed (currently {phase:?})",
        reference.namespace.as_deref().unwrap_or_default(),
        reference.name
    )
}

/// Storage of a producer once it reports `Success` with a populated reference
fn follow(
    kind: &str,
    reference: &ObjectReference,
    phase: Phase,
    storage: Option<&ObjectReference>,
) -> Resolved<ObjectReference> {
    let namespace = reference.namespace.as_deref().unwrap_or_default();
    match (phase, storage) {
        (Phase::Success, Some(storage)) => Resolved::Ready(qualify(storage, namespace)),
        (Phase::Success, None) => Resolved::Pending(format!(
            "{kind} {namespace}/{} has not published its output yet",
            reference.name
        )),
        (phase, _) => Resolved::Pending(not_ready(kind, reference, phase)),
    }
}

/// Resolve a key-pair reference to the Secret holding the pair
pub async fn key_pair<K, S>(
    store: &S,
    requester_namespace: &str,
    reference: &ObjectReference,
) -> Result<Resolved<ObjectReference>, ReconcilerError>
where
    K: CredentialResource<Status = KeyPairStatus>,
    S: ClusterStore,
{
    let reference = qualify(reference, requester_namespace);
    let namespace = reference.namespace.as_deref().unwrap_or(requester_namespace);
    let kind = K::kind(&());

    let Some(producer) = store.get::<K>(namespace, &reference.name).await? else {
        return Err(ReconcilerError::reference_not_found(&kind, namespace, &reference.name));
    };
    let status = producer.status().cloned().unwrap_or_default();
    Ok(follow(
        &kind,
        &reference,
        status.status,
        status.key_pair_reference.as_ref(),
    ))
}

/// Resolve a shared-secret reference: an encapsulation, else a decapsulation
pub async fn shared_secret<S: ClusterStore>(
    store: &S,
    requester_namespace: &str,
    reference: &ObjectReference,
) -> Result<Resolved<ObjectReference>, ReconcilerError> {
    let reference = qualify(reference, requester_namespace);
    let namespace = reference.namespace.as_deref().unwrap_or(requester_namespace);

    if let Some(producer) = store
        .get::<QuantumEncapsulateSecret>(namespace, &reference.name)
        .await?
    {
        let kind = QuantumEncapsulateSecret::kind(&());
        debug!(reference = %reference.name, kind = %kind, "Resolved shared secret producer");
        let status = producer.status.unwrap_or_default();
        return Ok(follow(
            &kind,
            &reference,
            status.status,
            status.shared_secret_reference.as_ref(),
        ));
    }

    if let Some(producer) = store
        .get::<QuantumDecapsulateSecret>(namespace, &reference.name)
        .await?
    {
        let kind = QuantumDecapsulateSecret::kind(&());
        debug!(reference = %reference.name, kind = %kind, "Resolved shared secret producer");
        let status = producer.status.unwrap_or_default();
        return Ok(follow(
            &kind,
            &reference,
            status.status,
            status.shared_secret_reference.as_ref(),
        ));
    }

    Err(ReconcilerError::ReferenceNotFound {
        kinds: vec![
            QuantumEncapsulateSecret::kind(&()).to_string(),
            QuantumDecapsulateSecret::kind(&()).to_string(),
        ],
        namespace: namespace.to_string(),
        name: reference.name.clone(),
    })
}

/// Ciphertext published in an encapsulation's status
pub async fn ciphertext<S: ClusterStore>(
    store: &S,
    requester_namespace: &str,
    reference: &ObjectReference,
) -> Result<Resolved<Vec<u8>>, ReconcilerError> {
    let reference = qualify(reference, requester_namespace);
    let namespace = reference.namespace.as_deref().unwrap_or(requester_namespace);
    let kind = QuantumEncapsulateSecret::kind(&());

    let Some(producer) = store
        .get::<QuantumEncapsulateSecret>(namespace, &reference.name)
        .await?
    else {
        return Err(ReconcilerError::reference_not_found(&kind, namespace, &reference.name));
    };

    let status = producer.status.unwrap_or_default();
    match (status.status, status.ciphertext.as_deref()) {
        (Phase::Success, Some(encoded)) if !encoded.is_empty() => {
            let bytes = hex::decode(encoded).map_err(|e| {
                ReconcilerError::DataIntegrity(format!(
                    "{kind} {namespace}/{} publishes a ciphertext that is not valid hex: {e}",
                    reference.name
                ))
            })?;
            Ok(Resolved::Ready(bytes))
        }
        (Phase::Success, _) => Ok(Resolved::Pending(format!(
            "{kind} {namespace}/{} has not published a ciphertext yet",
            reference.name
        ))),
        (phase, _) => Ok(Resolved::Pending(not_ready(&kind, &reference, phase))),
    }
}

/// Read one field of a Secret named directly by a reference
///
/// A missing Secret is a reference error; a missing field is a data integrity
/// error.
pub async fn secret_field<S: ClusterStore>(
    store: &S,
    reference: &ObjectReference,
    requester_namespace: &str,
    key: &str,
) -> Result<Vec<u8>, ReconcilerError> {
    let namespace = reference.namespace_or(requester_namespace);
    let Some(secret) = store.get_secret(namespace, &reference.name).await? else {
        return Err(ReconcilerError::reference_not_found(
            "Secret",
            namespace,
            &reference.name,
        ));
    };
    secret
        .data
        .and_then(|mut data| data.remove(key))
        .map(|bytes| bytes.0)
        .ok_or_else(|| {
            ReconcilerError::DataIntegrity(format!(
                "Secret {namespace}/{} has no '{key}' field",
                reference.name
            ))
        })
}
