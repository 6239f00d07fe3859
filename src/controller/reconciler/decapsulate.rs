//! KEM decapsulation for `QuantumDecapsulateSecret`.
//!
//! The ciphertext comes either inline (hex) or from a
//! `QuantumEncapsulateSecret`'s status. The algorithm named in this resource's
//! spec is checked against the private key's envelope only; nothing ties it to
//! the algorithm the ciphertext was produced with. A ciphertext of the wrong
//! length is rejected by the provider, one of the right length decapsulates to
//! an unrelated secret (ML-KEM implicit rejection).

use super::gate::{self, StoredOutput};
use super::materializer::{self, SecretPayload};
use super::{
    non_empty, open_key, ready_or_pending, resolver, CredentialReconciler, ObjectKey, Outcome,
    Reconciler, ReconcilerError,
};
use crate::constants::{PRIVATE_KEY_FIELD, SHARED_SECRET_FIELD, SHARED_SECRET_SUFFIX};
use crate::crd::{
    DecapsulateStatus, ObjectReference, Phase, QuantumDecapsulateSecret,
    QuantumDecapsulateSecretSpec, QuantumKEMKeyPair,
};
use crate::crypto::{fingerprint, KemAlgorithm, KeyKind};
use crate::observability::metrics;
use crate::store::ClusterStore;
use async_trait::async_trait;
use tracing::debug;

/// Where the ciphertext comes from
#[derive(Debug)]
enum CiphertextSource<'a> {
    Inline(Vec<u8>),
    Encapsulation(&'a ObjectReference),
}

impl<'a> CiphertextSource<'a> {
    /// Exactly one of `ciphertext` and `ciphertextRef` must be given
    fn from_spec(spec: &'a QuantumDecapsulateSecretSpec) -> Result<Self, ReconcilerError> {
        let inline = spec
            .ciphertext
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty());

        match (inline, spec.ciphertext_ref.as_ref()) {
            (Some(_), Some(_)) => Err(ReconcilerError::Precondition(
                "spec.ciphertext and spec.ciphertextRef are mutually exclusive".to_string(),
            )),
            (None, None) => Err(ReconcilerError::Precondition(
                "one of spec.ciphertext or spec.ciphertextRef is required".to_string(),
            )),
            (Some(hex_text), None) => hex::decode(hex_text).map(Self::Inline).map_err(|e| {
                ReconcilerError::Precondition(format!("spec.ciphertext is not valid hex: {e}"))
            }),
            (None, Some(reference)) => Ok(Self::Encapsulation(reference)),
        }
    }
}

#[async_trait]
impl CredentialReconciler for QuantumDecapsulateSecret {
    async fn reconcile_resource<S: ClusterStore>(
        ctx: &Reconciler<S>,
        resource: &Self,
    ) -> Result<Outcome, ReconcilerError> {
        let key = ObjectKey::from_resource(resource);
        let spec = &resource.spec;
        let algorithm: KemAlgorithm = non_empty(&spec.algorithm, "spec.algorithm")?
            .parse()
            .map_err(ReconcilerError::provider("decapsulate"))?;
        let source = CiphertextSource::from_spec(spec)?;
        let name = gate::output_name(spec.secret_name.as_deref(), &key.name, SHARED_SECRET_SUFFIX);

        let stored = match gate::check(&ctx.store, resource, &key.namespace, &name).await? {
            Some(stored) => {
                stored.require(&[SHARED_SECRET_FIELD])?;
                debug!(secret = %name, "Shared secret already materialized");
                stored
            }
            None => {
                let ciphertext = match source {
                    CiphertextSource::Inline(bytes) => bytes,
                    CiphertextSource::Encapsulation(reference) => ready_or_pending!(
                        resolver::ciphertext(&ctx.store, &key.namespace, reference).await?
                    ),
                };
                let storage = ready_or_pending!(
                    resolver::key_pair::<QuantumKEMKeyPair, _>(
                        &ctx.store,
                        &key.namespace,
                        &spec.private_key_ref,
                    )
                    .await?
                );
                let blob =
                    resolver::secret_field(&ctx.store, &storage, &key.namespace, PRIVATE_KEY_FIELD)
                        .await?;
                let private_key = open_key(&blob, algorithm.name(), KeyKind::Secret)?;

                debug!(algorithm = %algorithm, "Decapsulating");
                metrics::increment_crypto_operations("decapsulate");
                let shared_secret = ctx
                    .provider
                    .decapsulate(algorithm, &private_key, &ciphertext)
                    .map_err(ReconcilerError::provider("decapsulate"))?;

                let payload =
                    SecretPayload::from([(SHARED_SECRET_FIELD.to_string(), shared_secret.to_vec())]);
                StoredOutput::new(
                    materializer::create(&ctx.store, resource, &key.namespace, &name, payload)
                        .await?,
                )
            }
        };

        let shared_secret_fingerprint = fingerprint::short(stored.field(SHARED_SECRET_FIELD)?);
        let reference = ObjectReference::new(&name, &key.namespace);
        ctx.update_status(resource, |status: &mut DecapsulateStatus| {
            status.status = Phase::Success;
            status.shared_secret_reference = Some(reference.clone());
            status.fingerprint = Some(shared_secret_fingerprint.clone());
            status.error = None;
        })
        .await?;

        Ok(Outcome::Ready)
    }
}
