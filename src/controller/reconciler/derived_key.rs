//! HKDF key derivation for `QuantumDerivedKey`.

use super::gate::{self, StoredOutput};
use super::materializer::{self, SecretPayload};
use super::{
    decode_hex_field, ready_or_pending, resolver, CredentialReconciler, ObjectKey, Outcome,
    Reconciler, ReconcilerError,
};
use crate::constants::{DERIVED_KEY_FIELD, DERIVED_KEY_SUFFIX, FINGERPRINT_FIELD, KEY_TYPE_FIELD, SHARED_SECRET_FIELD};
use crate::crd::{DerivedKeyStatus, ObjectReference, Phase, QuantumDerivedKey};
use crate::crypto::fingerprint;
use crate::observability::metrics;
use crate::store::ClusterStore;
use async_trait::async_trait;
use tracing::debug;
use zeroize::Zeroizing;

#[async_trait]
impl CredentialReconciler for QuantumDerivedKey {
    async fn reconcile_resource<S: ClusterStore>(
        ctx: &Reconciler<S>,
        resource: &Self,
    ) -> Result<Outcome, ReconcilerError> {
        let key = ObjectKey::from_resource(resource);
        let spec = &resource.spec;
        let salt = decode_hex_field(spec.salt.as_deref(), "spec.salt")?;
        let info = decode_hex_field(spec.info.as_deref(), "spec.info")?;
        let name = gate::output_name(spec.secret_name.as_deref(), &key.name, DERIVED_KEY_SUFFIX);

        let (stored, derived_now) = match gate::check(&ctx.store, resource, &key.namespace, &name).await? {
            Some(stored) => {
                stored.require(&[DERIVED_KEY_FIELD])?;
                debug!(secret = %name, "Derived key already materialized");
                (stored, false)
            }
            None => {
                let storage = ready_or_pending!(
                    resolver::shared_secret(&ctx.store, &key.namespace, &spec.shared_secret_ref)
                        .await?
                );
                let shared_secret = Zeroizing::new(
                    resolver::secret_field(&ctx.store, &storage, &key.namespace, SHARED_SECRET_FIELD)
                        .await?,
                );

                debug!(key_type = %spec.key_type, "Deriving key");
                metrics::increment_crypto_operations("derive_key");
                let derived = ctx
                    .provider
                    .derive_key(&shared_secret, &salt, &info)
                    .map_err(ReconcilerError::provider("derive key"))?;

                let payload = SecretPayload::from([
                    (DERIVED_KEY_FIELD.to_string(), derived.to_vec()),
                    (
                        FINGERPRINT_FIELD.to_string(),
                        fingerprint::full(&derived).into_bytes(),
                    ),
                    (
                        KEY_TYPE_FIELD.to_string(),
                        spec.key_type.as_str().as_bytes().to_vec(),
                    ),
                ]);
                let secret =
                    materializer::create(&ctx.store, resource, &key.namespace, &name, payload).await?;
                (StoredOutput::new(secret), true)
            }
        };

        let derived = stored.field(DERIVED_KEY_FIELD)?;
        let key_fingerprint = fingerprint::full(derived);
        let fingerprint_hash = fingerprint::short(derived);
        let reference = ObjectReference::new(&name, &key.namespace);
        ctx.update_status(resource, |status: &mut DerivedKeyStatus| {
            status.status = Phase::Success;
            status.derived_key_reference = Some(reference.clone());
            status.key_fingerprint = Some(key_fingerprint.clone());
            status.fingerprint_hash = Some(fingerprint_hash.clone());
            // parameters of the derivation that produced the stored key
            if derived_now || status.used_salt.is_none() {
                status.used_salt = spec.salt.clone();
            }
            if derived_now || status.used_info.is_none() {
                status.used_info = spec.info.clone();
            }
            status.error = None;
        })
        .await?;

        Ok(Outcome::Ready)
    }
}
