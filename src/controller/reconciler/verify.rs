//! ML-DSA verification for `QuantumVerifySignature`.
//!
//! Verification produces no storage. A signature that does not verify, or is
//! not even the right length, is an `Invalid` verdict rather than a failure.

use super::{
    non_empty, open_key, ready_or_pending, resolver, CredentialReconciler, ObjectKey, Outcome,
    Reconciler, ReconcilerError,
};
use crate::constants::{PUBLIC_KEY_FIELD, SIGNATURE_INVALID_MESSAGE};
use crate::crd::{QuantumSignatureKeyPair, QuantumVerifySignature, VerificationPhase, VerifyStatus};
use crate::crypto::{fingerprint, KeyKind, SignatureAlgorithm};
use crate::observability::metrics;
use crate::store::ClusterStore;
use async_trait::async_trait;
use tracing::{debug, info, warn};

fn verdict_is_current(resource: &QuantumVerifySignature) -> bool {
    resource.status.as_ref().is_some_and(|status| {
        matches!(status.status, VerificationPhase::Valid | VerificationPhase::Invalid)
            && status.observed_generation == resource.metadata.generation
    })
}

#[async_trait]
impl CredentialReconciler for QuantumVerifySignature {
    async fn reconcile_resource<S: ClusterStore>(
        ctx: &Reconciler<S>,
        resource: &Self,
    ) -> Result<Outcome, ReconcilerError> {
        let key = ObjectKey::from_resource(resource);
        let spec = &resource.spec;
        let algorithm: SignatureAlgorithm = non_empty(&spec.algorithm, "spec.algorithm")?
            .parse()
            .map_err(ReconcilerError::provider("verify"))?;
        let message_key = non_empty(&spec.message_key, "spec.messageKey")?;
        let signature_key = non_empty(&spec.signature_key, "spec.signatureKey")?;

        if verdict_is_current(resource) {
            debug!("Verdict already recorded for this generation");
            return Ok(Outcome::Ready);
        }

        let storage = ready_or_pending!(
            resolver::key_pair::<QuantumSignatureKeyPair, _>(
                &ctx.store,
                &key.namespace,
                &spec.public_key_ref,
            )
            .await?
        );
        let blob =
            resolver::secret_field(&ctx.store, &storage, &key.namespace, PUBLIC_KEY_FIELD).await?;
        let public_key = open_key(&blob, algorithm.name(), KeyKind::Public)?;
        let message =
            resolver::secret_field(&ctx.store, &spec.message_ref, &key.namespace, message_key).await?;
        let signature =
            resolver::secret_field(&ctx.store, &spec.signature_ref, &key.namespace, signature_key)
                .await?;

        debug!(algorithm = %algorithm, "Verifying signature");
        metrics::increment_crypto_operations("verify");
        let verified = ctx
            .provider
            .verify(algorithm, &public_key, &message, &signature)
            .map_err(ReconcilerError::provider("verify"))?;

        if verified {
            info!("Signature is valid");
        } else {
            warn!("Signature is invalid");
        }

        let message_fingerprint = fingerprint::short(&message);
        let checked_at = chrono::Utc::now().to_rfc3339();
        ctx.update_status(resource, |status: &mut VerifyStatus| {
            status.status = if verified {
                VerificationPhase::Valid
            } else {
                VerificationPhase::Invalid
            };
            status.verified = verified;
            status.message_fingerprint = Some(message_fingerprint.clone());
            status.error = (!verified).then(|| SIGNATURE_INVALID_MESSAGE.to_string());
            status.last_checked_time = Some(checked_at.clone());
        })
        .await?;

        Ok(Outcome::Ready)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{ObjectReference, QuantumVerifySignatureSpec};

    fn resource(phase: Option<VerificationPhase>, observed: Option<i64>) -> QuantumVerifySignature {
        let mut vs = QuantumVerifySignature::new(
            "check",
            QuantumVerifySignatureSpec {
                public_key_ref: ObjectReference::new("bob", "default"),
                message_ref: ObjectReference::new("msg", "default"),
                message_key: "message".to_string(),
                signature_ref: ObjectReference::new("sig", "default"),
                signature_key: "signature".to_string(),
                algorithm: "ML-DSA-65".to_string(),
            },
        );
        vs.metadata.generation = Some(2);
        vs.status = phase.map(|status| VerifyStatus {
            status,
            observed_generation: observed,
            ..Default::default()
        });
        vs
    }

    #[test]
    fn test_verdict_is_current_only_for_same_generation() {
        assert!(verdict_is_current(&resource(Some(VerificationPhase::Valid), Some(2))));
        assert!(verdict_is_current(&resource(Some(VerificationPhase::Invalid), Some(2))));
        assert!(!verdict_is_current(&resource(Some(VerificationPhase::Valid), Some(1))));
        assert!(!verdict_is_current(&resource(Some(VerificationPhase::Failed), Some(2))));
        assert!(!verdict_is_current(&resource(None, None)));
    }
}
