//! Key-pair generation for `QuantumKEMKeyPair` and `QuantumSignatureKeyPair`.

use super::gate::{self, StoredOutput};
use super::materializer::{self, SecretPayload};
use super::{non_empty, open_key, CredentialReconciler, ObjectKey, Outcome, Reconciler, ReconcilerError};
use crate::constants::{KEYPAIR_SUFFIX, PRIVATE_KEY_FIELD, PUBLIC_KEY_FIELD};
use crate::crd::{
    CredentialResource, KeyPairStatus, ObjectReference, Phase, QuantumKEMKeyPair,
    QuantumSignatureKeyPair,
};
use crate::crypto::{
    envelope, fingerprint, CryptoError, CryptoProvider, KemAlgorithm, KeyKind, KeyPair,
    SignatureAlgorithm,
};
use crate::observability::metrics;
use crate::store::ClusterStore;
use async_trait::async_trait;
use tracing::debug;

#[async_trait]
impl CredentialReconciler for QuantumKEMKeyPair {
    async fn reconcile_resource<S: ClusterStore>(
        ctx: &Reconciler<S>,
        resource: &Self,
    ) -> Result<Outcome, ReconcilerError> {
        let algorithm: KemAlgorithm = non_empty(&resource.spec.algorithm, "spec.algorithm")?
            .parse()
            .map_err(ReconcilerError::provider("generate key pair"))?;

        reconcile_key_pair(
            ctx,
            resource,
            resource.spec.secret_name.as_deref(),
            algorithm.name(),
            move |provider| provider.generate_kem_key_pair(algorithm),
        )
        .await
    }
}

#[async_trait]
impl CredentialReconciler for QuantumSignatureKeyPair {
    async fn reconcile_resource<S: ClusterStore>(
        ctx: &Reconciler<S>,
        resource: &Self,
    ) -> Result<Outcome, ReconcilerError> {
        let algorithm: SignatureAlgorithm = non_empty(&resource.spec.algorithm, "spec.algorithm")?
            .parse()
            .map_err(ReconcilerError::provider("generate key pair"))?;

        reconcile_key_pair(
            ctx,
            resource,
            resource.spec.secret_name.as_deref(),
            algorithm.name(),
            move |provider| provider.generate_signature_key_pair(algorithm),
        )
        .await
    }
}

/// Shared pipeline of both key-pair kinds
///
/// `algorithm` is the canonical name written into the PEM envelopes. An
/// existing Secret whose public key is tagged with another algorithm is a data
/// integrity failure rather than a silent reuse under the wrong parameter set.
async fn reconcile_key_pair<S, K, G>(
    ctx: &Reconciler<S>,
    resource: &K,
    secret_name: Option<&str>,
    algorithm: &'static str,
    generate: G,
) -> Result<Outcome, ReconcilerError>
where
    S: ClusterStore,
    K: CredentialResource<Status = KeyPairStatus>,
    G: FnOnce(&dyn CryptoProvider) -> Result<KeyPair, CryptoError> + Send,
{
    let key = ObjectKey::from_resource(resource);
    let name = gate::output_name(secret_name, &key.name, KEYPAIR_SUFFIX);

    let stored = match gate::check(&ctx.store, resource, &key.namespace, &name).await? {
        Some(stored) => {
            stored.require(&[PUBLIC_KEY_FIELD, PRIVATE_KEY_FIELD])?;
            open_key(stored.field(PUBLIC_KEY_FIELD)?, algorithm, KeyKind::Public)?;
            debug!(secret = %name, "Key pair already materialized");
            stored
        }
        None => {
            debug!(algorithm, "Generating key pair");
            metrics::increment_crypto_operations("generate_key_pair");
            let pair = generate(ctx.provider.as_ref())
                .map_err(ReconcilerError::provider("generate key pair"))?;

            let payload = SecretPayload::from([
                (
                    PUBLIC_KEY_FIELD.to_string(),
                    envelope::seal(algorithm, KeyKind::Public, &pair.public_key).into_bytes(),
                ),
                (
                    PRIVATE_KEY_FIELD.to_string(),
                    envelope::seal(algorithm, KeyKind::Secret, &pair.private_key).into_bytes(),
                ),
            ]);
            StoredOutput::new(
                materializer::create(&ctx.store, resource, &key.namespace, &name, payload).await?,
            )
        }
    };

    let public_key_fingerprint = fingerprint::short(stored.field(PUBLIC_KEY_FIELD)?);
    let reference = ObjectReference::new(&name, &key.namespace);
    ctx.update_status(resource, |status: &mut KeyPairStatus| {
        status.status = Phase::Success;
        status.key_pair_reference = Some(reference.clone());
        status.public_key_fingerprint = Some(public_key_fingerprint.clone());
        status.error = None;
    })
    .await?;

    Ok(Outcome::Ready)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ControllerConfig;
    use crate::controller::reconciler::reconcile;
    use crate::crd::QuantumKEMKeyPairSpec;
    use crate::store::MemoryStore;

    async fn setup(algorithm: &str) -> Reconciler<MemoryStore> {
        let store = MemoryStore::new();
        let mut kp = QuantumKEMKeyPair::new(
            "alice",
            QuantumKEMKeyPairSpec {
                algorithm: algorithm.to_string(),
                secret_name: None,
            },
        );
        kp.metadata.namespace = Some("default".to_string());
        store.apply(kp).await.unwrap();
        Reconciler::with_default_provider(store, ControllerConfig::default())
    }

    #[tokio::test]
    async fn test_generates_tagged_envelopes() {
        let ctx = setup("Kyber768").await;
        let key = ObjectKey::new("default", "alice");

        let outcome = reconcile::<QuantumKEMKeyPair, _>(&ctx, &key).await.unwrap();
        assert_eq!(outcome, Outcome::Ready);

        let secret = ctx.store.get_secret("default", "alice-keypair").await.unwrap().unwrap();
        let data = secret.data.unwrap();
        let public = String::from_utf8(data[PUBLIC_KEY_FIELD].0.clone()).unwrap();
        let private = String::from_utf8(data[PRIVATE_KEY_FIELD].0.clone()).unwrap();
        assert!(public.starts_with("-----BEGIN ML-KEM-768 PUBLIC KEY-----"));
        assert!(private.starts_with("-----BEGIN ML-KEM-768 SECRET KEY-----"));

        let kp: QuantumKEMKeyPair = ctx.store.get("default", "alice").await.unwrap().unwrap();
        let status = kp.status.unwrap();
        assert_eq!(status.status, Phase::Success);
        assert_eq!(
            status.public_key_fingerprint,
            Some(fingerprint::short(public.as_bytes()))
        );
        assert_eq!(
            status.key_pair_reference,
            Some(ObjectReference::new("alice-keypair", "default"))
        );
    }

    #[tokio::test]
    async fn test_unsupported_algorithm_fails() {
        let ctx = setup("Falcon-512").await;
        let key = ObjectKey::new("default", "alice");

        let err = reconcile::<QuantumKEMKeyPair, _>(&ctx, &key).await.unwrap_err();
        assert!(matches!(
            err,
            ReconcilerError::Provider { source: CryptoError::UnsupportedAlgorithm(_), .. }
        ));

        let kp: QuantumKEMKeyPair = ctx.store.get("default", "alice").await.unwrap().unwrap();
        let status = kp.status.unwrap();
        assert_eq!(status.status, Phase::Failed);
        assert!(status.error.unwrap().contains("unsupported algorithm"));
        assert!(ctx.store.secrets("default").await.is_empty());
    }

    #[tokio::test]
    async fn test_existing_pair_under_other_algorithm_is_rejected() {
        let ctx = setup("ML-KEM-768").await;
        let key = ObjectKey::new("default", "alice");
        reconcile::<QuantumKEMKeyPair, _>(&ctx, &key).await.unwrap();

        let mut kp: QuantumKEMKeyPair = ctx.store.get("default", "alice").await.unwrap().unwrap();
        kp.spec.algorithm = "ML-KEM-1024".to_string();
        ctx.store.apply(kp).await.unwrap();

        let err = reconcile::<QuantumKEMKeyPair, _>(&ctx, &key).await.unwrap_err();
        assert!(matches!(err, ReconcilerError::DataIntegrity(_)));
    }
}
