//! KEM encapsulation for `QuantumEncapsulateSecret`.

use super::gate::{self, StoredOutput};
use super::materializer::{self, SecretPayload};
use super::{
    non_empty, open_key, ready_or_pending, resolver, CredentialReconciler, ObjectKey, Outcome,
    Reconciler, ReconcilerError,
};
use crate::constants::{CIPHERTEXT_FIELD, PUBLIC_KEY_FIELD, SHARED_SECRET_FIELD, SHARED_SECRET_SUFFIX};
use crate::crd::{
    EncapsulateStatus, ObjectReference, Phase, QuantumEncapsulateSecret, QuantumKEMKeyPair,
};
use crate::crypto::{fingerprint, KemAlgorithm, KeyKind};
use crate::observability::metrics;
use crate::store::ClusterStore;
use async_trait::async_trait;
use tracing::debug;

#[async_trait]
impl CredentialReconciler for QuantumEncapsulateSecret {
    async fn reconcile_resource<S: ClusterStore>(
        ctx: &Reconciler<S>,
        resource: &Self,
    ) -> Result<Outcome, ReconcilerError> {
        let key = ObjectKey::from_resource(resource);
        let spec = &resource.spec;
        let algorithm: KemAlgorithm = non_empty(&spec.algorithm, "spec.algorithm")?
            .parse()
            .map_err(ReconcilerError::provider("encapsulate"))?;
        let name = gate::output_name(spec.secret_name.as_deref(), &key.name, SHARED_SECRET_SUFFIX);

        let stored = match gate::check(&ctx.store, resource, &key.namespace, &name).await? {
            Some(stored) => {
                stored.require(&[SHARED_SECRET_FIELD, CIPHERTEXT_FIELD])?;
                debug!(secret = %name, "Shared secret already materialized");
                stored
            }
            None => {
                let storage = ready_or_pending!(
                    resolver::key_pair::<QuantumKEMKeyPair, _>(
                        &ctx.store,
                        &key.namespace,
                        &spec.public_key_ref,
                    )
                    .await?
                );
                let blob =
                    resolver::secret_field(&ctx.store, &storage, &key.namespace, PUBLIC_KEY_FIELD)
                        .await?;
                let public_key = open_key(&blob, algorithm.name(), KeyKind::Public)?;

                debug!(algorithm = %algorithm, "Encapsulating");
                metrics::increment_crypto_operations("encapsulate");
                let encapsulation = ctx
                    .provider
                    .encapsulate(algorithm, &public_key)
                    .map_err(ReconcilerError::provider("encapsulate"))?;

                let payload = SecretPayload::from([
                    (
                        SHARED_SECRET_FIELD.to_string(),
                        encapsulation.shared_secret.to_vec(),
                    ),
                    (CIPHERTEXT_FIELD.to_string(), encapsulation.ciphertext),
                ]);
                StoredOutput::new(
                    materializer::create(&ctx.store, resource, &key.namespace, &name, payload)
                        .await?,
                )
            }
        };

        let shared_secret_fingerprint = fingerprint::short(stored.field(SHARED_SECRET_FIELD)?);
        let ciphertext = hex::encode(stored.field(CIPHERTEXT_FIELD)?);
        let reference = ObjectReference::new(&name, &key.namespace);
        ctx.update_status(resource, |status: &mut EncapsulateStatus| {
            status.status = Phase::Success;
            status.ciphertext = Some(ciphertext.clone());
            status.shared_secret_reference = Some(reference.clone());
            status.fingerprint = Some(shared_secret_fingerprint.clone());
            status.error = None;
        })
        .await?;

        Ok(Outcome::Ready)
    }
}
