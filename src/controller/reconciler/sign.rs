//! ML-DSA signing for `QuantumSignMessage`.
//!
//! Unlike the other producers, a signature follows its message: when the
//! message changes, the signature field is rewritten in place. The output
//! Secret records which message it signed in the
//! `qubesec.io/message-fingerprint` annotation (full SHA-256 hex).

use super::gate::{self, StoredOutput};
use super::materializer;
use super::{
    non_empty, open_key, ready_or_pending, resolver, CredentialReconciler, ObjectKey, Outcome,
    Reconciler, ReconcilerError,
};
use crate::constants::{MESSAGE_FINGERPRINT_ANNOTATION, PRIVATE_KEY_FIELD, SIGNATURE_SUFFIX};
use crate::crd::{ObjectReference, Phase, QuantumSignMessage, QuantumSignatureKeyPair, SignStatus};
use crate::crypto::{fingerprint, KeyKind, SignatureAlgorithm};
use crate::observability::metrics;
use crate::store::ClusterStore;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use std::collections::BTreeMap;
use tracing::debug;

/// Whether the last successful pass covers the current spec and its output still exists
async fn already_signed<S: ClusterStore>(
    ctx: &Reconciler<S>,
    resource: &QuantumSignMessage,
    namespace: &str,
    name: &str,
    signature_key: &str,
) -> Result<bool, ReconcilerError> {
    let Some(status) = resource.status.as_ref() else {
        return Ok(false);
    };
    if status.status != Phase::Success
        || status.observed_generation != resource.metadata.generation
        || status.signature_reference.is_none()
    {
        return Ok(false);
    }
    Ok(gate::check(&ctx.store, resource, namespace, name)
        .await?
        .is_some_and(|stored| stored.get(signature_key).is_some()))
}

#[async_trait]
impl CredentialReconciler for QuantumSignMessage {
    async fn reconcile_resource<S: ClusterStore>(
        ctx: &Reconciler<S>,
        resource: &Self,
    ) -> Result<Outcome, ReconcilerError> {
        let key = ObjectKey::from_resource(resource);
        let spec = &resource.spec;
        let algorithm: SignatureAlgorithm = non_empty(&spec.algorithm, "spec.algorithm")?
            .parse()
            .map_err(ReconcilerError::provider("sign"))?;
        let message_key = non_empty(&spec.message_key, "spec.messageKey")?;
        let signature_key = non_empty(&spec.signature_key, "spec.signatureKey")?;
        let name = gate::output_name(spec.output_secret_name.as_deref(), &key.name, SIGNATURE_SUFFIX);

        if already_signed(ctx, resource, &key.namespace, &name, signature_key).await? {
            debug!(secret = %name, "Signature is current");
            return Ok(Outcome::Ready);
        }

        let message =
            resolver::secret_field(&ctx.store, &spec.message_ref, &key.namespace, message_key).await?;
        let message_digest = fingerprint::full(&message);

        let existing = gate::check(&ctx.store, resource, &key.namespace, &name).await?;
        let stored = match existing {
            Some(stored)
                if stored.get(signature_key).is_some()
                    && stored.annotation(MESSAGE_FINGERPRINT_ANNOTATION)
                        == Some(message_digest.as_str()) =>
            {
                debug!(secret = %name, "Adopting existing signature for unchanged message");
                stored
            }
            _ => {
                let storage = ready_or_pending!(
                    resolver::key_pair::<QuantumSignatureKeyPair, _>(
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

                debug!(algorithm = %algorithm, "Signing message");
                metrics::increment_crypto_operations("sign");
                let signature = ctx
                    .provider
                    .sign(algorithm, &private_key, &message)
                    .map_err(ReconcilerError::provider("sign"))?;

                let annotations = BTreeMap::from([(
                    MESSAGE_FINGERPRINT_ANNOTATION.to_string(),
                    message_digest.clone(),
                )]);
                StoredOutput::new(
                    materializer::upsert_field(
                        &ctx.store,
                        resource,
                        &key.namespace,
                        &name,
                        signature_key,
                        signature,
                        annotations,
                    )
                    .await?,
                )
            }
        };

        let signature = BASE64.encode(stored.field(signature_key)?);
        let message_fingerprint = fingerprint::short(&message);
        let reference = ObjectReference::new(&name, &key.namespace);
        ctx.update_status(resource, |status: &mut SignStatus| {
            status.status = Phase::Success;
            status.signature = Some(signature.clone());
            status.signature_reference = Some(reference.clone());
            status.message_fingerprint = Some(message_fingerprint.clone());
            status.error = None;
        })
        .await?;

        Ok(Outcome::Ready)
    }
}
