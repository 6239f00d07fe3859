//! # Custom Resource Definitions
//!
//! CRD types for the QubeSec controller (`qubesec.io/v1`).
//!
//! ## Module Structure
//!
//! - `common.rs` - References, status phases and the uniform resource/status traits
//! - `keypair.rs` - `QuantumKEMKeyPair` and `QuantumSignatureKeyPair`
//! - `shared_secret.rs` - `QuantumEncapsulateSecret` and `QuantumDecapsulateSecret`
//! - `derived_key.rs` - `QuantumDerivedKey`
//! - `signature.rs` - `QuantumSignMessage` and `QuantumVerifySignature`
//! - `random_number.rs` - `QuantumRandomNumber`
//! - `certificate.rs` - `QuantumCertificate`

mod certificate;
mod common;
mod derived_key;
mod keypair;
mod random_number;
mod shared_secret;
mod signature;

pub use certificate::{CertificateStatus, QuantumCertificate, QuantumCertificateSpec};
pub use common::{
    CredentialResource, CredentialStatus, ObjectReference, Phase, VerificationPhase,
};
pub use derived_key::{DerivedKeyStatus, KeyType, QuantumDerivedKey, QuantumDerivedKeySpec};
pub use keypair::{
    default_kem_algorithm, default_signature_algorithm, KeyPairStatus, QuantumKEMKeyPair,
    QuantumKEMKeyPairSpec, QuantumSignatureKeyPair, QuantumSignatureKeyPairSpec,
};
pub use random_number::{QuantumRandomNumber, QuantumRandomNumberSpec, RandomNumberStatus};
pub use shared_secret::{
    DecapsulateStatus, EncapsulateStatus, QuantumDecapsulateSecret, QuantumDecapsulateSecretSpec,
    QuantumEncapsulateSecret, QuantumEncapsulateSecretSpec,
};
pub use signature::{
    QuantumSignMessage, QuantumSignMessageSpec, QuantumVerifySignature,
    QuantumVerifySignatureSpec, SignStatus, VerifyStatus,
};

use kube::core::CustomResourceExt;
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;

/// Every CustomResourceDefinition served by the controller
pub fn all_crds() -> Vec<CustomResourceDefinition> {
    vec![
        QuantumKEMKeyPair::crd(),
        QuantumSignatureKeyPair::crd(),
        QuantumEncapsulateSecret::crd(),
        QuantumDecapsulateSecret::crd(),
        QuantumDerivedKey::crd(),
        QuantumSignMessage::crd(),
        QuantumVerifySignature::crd(),
        QuantumRandomNumber::crd(),
        QuantumCertificate::crd(),
    ]
}
