//! Common test utilities for the reconciliation scenario tests
//!
//! Provides a [`Harness`] wrapping a reconciler over a [`MemoryStore`], and
//! constructors for every resource kind.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use k8s_openapi::ByteString;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::Resource;
use qubesec_controller::config::ControllerConfig;
use qubesec_controller::controller::reconciler::{
    reconcile, CredentialReconciler, ObjectKey, Outcome, Reconciler, ReconcilerError,
};
use qubesec_controller::crd::*;
use qubesec_controller::store::{ClusterStore, MemoryStore};
use std::collections::BTreeMap;
use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Install a test tracing subscriber once per test binary
///
/// Output is captured by the test harness; set `RUST_LOG` to see it.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "qubesec_controller=debug".into()),
            )
            .with_test_writer()
            .try_init();
    });
}

/// A reference without a namespace (resolved in the requester's namespace)
pub fn local(name: &str) -> ObjectReference {
    ObjectReference {
        name: name.to_string(),
        namespace: None,
    }
}

pub fn kem_key_pair(name: &str, algorithm: &str) -> QuantumKEMKeyPair {
    QuantumKEMKeyPair::new(
        name,
        QuantumKEMKeyPairSpec {
            algorithm: algorithm.to_string(),
            secret_name: None,
        },
    )
}

pub fn signature_key_pair(name: &str, algorithm: &str) -> QuantumSignatureKeyPair {
    QuantumSignatureKeyPair::new(
        name,
        QuantumSignatureKeyPairSpec {
            algorithm: algorithm.to_string(),
            secret_name: None,
        },
    )
}

pub fn encapsulate(name: &str, public_key_ref: ObjectReference, algorithm: &str) -> QuantumEncapsulateSecret {
    QuantumEncapsulateSecret::new(
        name,
        QuantumEncapsulateSecretSpec {
            public_key_ref,
            algorithm: algorithm.to_string(),
            secret_name: None,
        },
    )
}

pub fn decapsulate(
    name: &str,
    private_key_ref: ObjectReference,
    ciphertext_ref: ObjectReference,
    algorithm: &str,
) -> QuantumDecapsulateSecret {
    QuantumDecapsulateSecret::new(
        name,
        QuantumDecapsulateSecretSpec {
            private_key_ref,
            ciphertext: None,
            ciphertext_ref: Some(ciphertext_ref),
            algorithm: algorithm.to_string(),
            secret_name: None,
        },
    )
}

pub fn derived_key(
    name: &str,
    shared_secret_ref: ObjectReference,
    salt: Option<&str>,
    info: Option<&str>,
) -> QuantumDerivedKey {
    QuantumDerivedKey::new(
        name,
        QuantumDerivedKeySpec {
            shared_secret_ref,
            key_type: KeyType::Aes256,
            salt: salt.map(str::to_string),
            info: info.map(str::to_string),
            secret_name: None,
        },
    )
}

pub fn sign(
    name: &str,
    private_key_ref: ObjectReference,
    message_ref: ObjectReference,
    algorithm: &str,
) -> QuantumSignMessage {
    QuantumSignMessage::new(
        name,
        QuantumSignMessageSpec {
            private_key_ref,
            message_ref,
            message_key: "message".to_string(),
            algorithm: algorithm.to_string(),
            output_secret_name: None,
            signature_key: "signature".to_string(),
        },
    )
}

pub fn verify(
    name: &str,
    public_key_ref: ObjectReference,
    message_ref: ObjectReference,
    signature_ref: ObjectReference,
    algorithm: &str,
) -> QuantumVerifySignature {
    QuantumVerifySignature::new(
        name,
        QuantumVerifySignatureSpec {
            public_key_ref,
            message_ref,
            message_key: "message".to_string(),
            signature_ref,
            signature_key: "signature".to_string(),
            algorithm: algorithm.to_string(),
        },
    )
}

pub fn random_number(name: &str, bytes: u32, algorithm: &str, seed: Option<&str>) -> QuantumRandomNumber {
    QuantumRandomNumber::new(
        name,
        QuantumRandomNumberSpec {
            bytes,
            algorithm: algorithm.to_string(),
            seed: seed.map(str::to_string),
            seed_uri: None,
            secret_name: None,
        },
    )
}

pub fn certificate(name: &str, algorithm: &str, domain: &str, days: u32) -> QuantumCertificate {
    QuantumCertificate::new(
        name,
        QuantumCertificateSpec {
            algorithm: algorithm.to_string(),
            domain: domain.to_string(),
            days,
            secret_name: None,
        },
    )
}

/// Reconciler over an in-memory cluster
pub struct Harness {
    pub ctx: Reconciler<MemoryStore>,
}

impl Harness {
    pub fn new() -> Self {
        init_tracing();
        Self {
            ctx: Reconciler::with_default_provider(MemoryStore::new(), ControllerConfig::default()),
        }
    }

    pub fn store(&self) -> &MemoryStore {
        &self.ctx.store
    }

    /// Create or update `resource` in `namespace`
    pub async fn apply<K: CredentialResource>(&self, namespace: &str, mut resource: K) -> K {
        resource.meta_mut().namespace = Some(namespace.to_string());
        self.store().apply(resource).await.expect("apply resource")
    }

    pub async fn reconcile<K: CredentialReconciler>(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Outcome, ReconcilerError> {
        reconcile::<K, _>(&self.ctx, &ObjectKey::new(namespace, name)).await
    }

    pub async fn get<K: CredentialResource>(&self, namespace: &str, name: &str) -> K {
        self.store()
            .get(namespace, name)
            .await
            .expect("read resource")
            .expect("resource exists")
    }

    pub async fn status<K: CredentialResource>(&self, namespace: &str, name: &str) -> K::Status {
        self.get::<K>(namespace, name)
            .await
            .status()
            .cloned()
            .expect("status written")
    }

    pub async fn secret(&self, namespace: &str, name: &str) -> Option<Secret> {
        self.store().get_secret(namespace, name).await.expect("read secret")
    }

    /// Data of a Secret that must exist
    pub async fn secret_data(&self, namespace: &str, name: &str) -> BTreeMap<String, Vec<u8>> {
        self.secret(namespace, name)
            .await
            .expect("secret exists")
            .data
            .unwrap_or_default()
            .into_iter()
            .map(|(key, bytes)| (key, bytes.0))
            .collect()
    }

    /// Create an unowned Secret holding one field
    pub async fn put_secret(&self, namespace: &str, name: &str, key: &str, value: &[u8]) {
        let secret = Secret {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(namespace.to_string()),
                ..Default::default()
            },
            data: Some(BTreeMap::from([(key.to_string(), ByteString(value.to_vec()))])),
            ..Default::default()
        };
        self.store().insert_secret(secret).await.expect("insert secret");
    }
}
