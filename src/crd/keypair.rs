//! # Key Pair Resources
//!
//! `QuantumKEMKeyPair` and `QuantumSignatureKeyPair` request a fresh post-quantum
//! key pair stored in an owned Secret under `public-key` and `private-key`.

use super::common::{impl_credential_resource, impl_credential_status, ObjectReference, Phase};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Request for an ML-KEM key pair
///
/// # Example
///
/// ```yaml
/// apiVersion: qubesec.io/v1
/// kind: QuantumKEMKeyPair
/// metadata:
///   name: bob
/// spec:
///   algorithm: ML-KEM-768
/// ```
#[derive(CustomResource, Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "QuantumKEMKeyPair",
    group = "qubesec.io",
    version = "v1",
    namespaced,
    status = "KeyPairStatus",
    shortname = "qkkp",
    printcolumn = r#"{"name":"Status", "type":"string", "jsonPath":".status.status"}, {"name":"Algorithm", "type":"string", "jsonPath":".spec.algorithm"}, {"name":"Fingerprint", "type":"string", "jsonPath":".status.publicKeyFingerprint"}, {"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct QuantumKEMKeyPairSpec {
    /// KEM algorithm (ML-KEM-512, ML-KEM-768, ML-KEM-1024 or a Kyber alias)
    #[serde(default = "default_kem_algorithm")]
    pub algorithm: String,
    /// Name of the Secret holding the key pair. Defaults to `<name>-keypair`.
    #[serde(default, alias = "outputName", skip_serializing_if = "Option::is_none")]
    pub secret_name: Option<String>,
}

/// Request for an ML-DSA signing key pair
#[derive(CustomResource, Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "QuantumSignatureKeyPair",
    group = "qubesec.io",
    version = "v1",
    namespaced,
    status = "KeyPairStatus",
    shortname = "qskp",
    printcolumn = r#"{"name":"Status", "type":"string", "jsonPath":".status.status"}, {"name":"Algorithm", "type":"string", "jsonPath":".spec.algorithm"}, {"name":"Fingerprint", "type":"string", "jsonPath":".status.publicKeyFingerprint"}, {"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct QuantumSignatureKeyPairSpec {
    /// Signature algorithm (ML-DSA-44, ML-DSA-65, ML-DSA-87 or a Dilithium alias)
    #[serde(default = "default_signature_algorithm")]
    pub algorithm: String,
    /// Name of the Secret holding the key pair. Defaults to `<name>-keypair`.
    #[serde(default, alias = "outputName", skip_serializing_if = "Option::is_none")]
    pub secret_name: Option<String>,
}

/// Observed state of either key pair kind
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KeyPairStatus {
    #[serde(default)]
    pub status: Phase,
    /// Secret holding the generated key pair
    #[serde(default)]
    pub key_pair_reference: Option<ObjectReference>,
    /// Truncated SHA-256 of the stored `public-key` field
    #[serde(default)]
    pub public_key_fingerprint: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub last_update_time: Option<String>,
    #[serde(default)]
    pub observed_generation: Option<i64>,
}

pub fn default_kem_algorithm() -> String {
    "ML-KEM-768".to_string()
}

pub fn default_signature_algorithm() -> String {
    "ML-DSA-65".to_string()
}

impl_credential_status!(KeyPairStatus, Phase);
impl_credential_resource!(QuantumKEMKeyPair, KeyPairStatus);
impl_credential_resource!(QuantumSignatureKeyPair, KeyPairStatus);
