//! # Shared Secret Resources
//!
//! `QuantumEncapsulateSecret` runs the sender half of a KEM exchange against a
//! key pair's public key. `QuantumDecapsulateSecret` runs the receiver half with
//! the private key and a ciphertext, given inline or taken from an encapsulation.

use super::common::{impl_credential_resource, impl_credential_status, ObjectReference, Phase};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Encapsulate a fresh shared secret against a `QuantumKEMKeyPair`
///
/// # Example
///
/// ```yaml
/// apiVersion: qubesec.io/v1
/// kind: QuantumEncapsulateSecret
/// metadata:
///   name: alice-to-bob
/// spec:
///   publicKeyRef:
///     name: bob
///   algorithm: ML-KEM-768
/// ```
#[derive(CustomResource, Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "QuantumEncapsulateSecret",
    group = "qubesec.io",
    version = "v1",
    namespaced,
    status = "EncapsulateStatus",
    shortname = "qes",
    printcolumn = r#"{"name":"Status", "type":"string", "jsonPath":".status.status"}, {"name":"Algorithm", "type":"string", "jsonPath":".spec.algorithm"}, {"name":"Fingerprint", "type":"string", "jsonPath":".status.fingerprint"}, {"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct QuantumEncapsulateSecretSpec {
    /// KEM key pair whose public key is used
    pub public_key_ref: ObjectReference,
    #[serde(default)]
    pub algorithm: String,
    /// Name of the output Secret. Defaults to `<name>-shared-secret`.
    #[serde(default, alias = "outputName", skip_serializing_if = "Option::is_none")]
    pub secret_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EncapsulateStatus {
    #[serde(default)]
    pub status: Phase,
    /// Hex-encoded ciphertext, consumed by a paired decapsulation
    #[serde(default)]
    pub ciphertext: Option<String>,
    #[serde(default)]
    pub shared_secret_reference: Option<ObjectReference>,
    /// Truncated SHA-256 of the stored shared secret
    #[serde(default)]
    pub fingerprint: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub last_update_time: Option<String>,
    #[serde(default)]
    pub observed_generation: Option<i64>,
}

/// Recover a shared secret with a `QuantumKEMKeyPair`'s private key
///
/// Exactly one of `ciphertext` and `ciphertextRef` must be set. The algorithm
/// used to produce the ciphertext is not cross-checked against `algorithm`.
#[derive(CustomResource, Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "QuantumDecapsulateSecret",
    group = "qubesec.io",
    version = "v1",
    namespaced,
    status = "DecapsulateStatus",
    shortname = "qds",
    printcolumn = r#"{"name":"Status", "type":"string", "jsonPath":".status.status"}, {"name":"Algorithm", "type":"string", "jsonPath":".spec.algorithm"}, {"name":"Fingerprint", "type":"string", "jsonPath":".status.fingerprint"}, {"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct QuantumDecapsulateSecretSpec {
    /// KEM key pair whose private key is used
    pub private_key_ref: ObjectReference,
    /// Hex-encoded ciphertext
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ciphertext: Option<String>,
    /// `QuantumEncapsulateSecret` whose `status.ciphertext` is used
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ciphertext_ref: Option<ObjectReference>,
    #[serde(default)]
    pub algorithm: String,
    /// Name of the output Secret. Defaults to `<name>-shared-secret`.
    #[serde(default, alias = "outputName", skip_serializing_if = "Option::is_none")]
    pub secret_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DecapsulateStatus {
    #[serde(default)]
    pub status: Phase,
    #[serde(default)]
    pub shared_secret_reference: Option<ObjectReference>,
    #[serde(default)]
    pub fingerprint: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub last_update_time: Option<String>,
    #[serde(default)]
    pub observed_generation: Option<i64>,
}

impl_credential_status!(EncapsulateStatus, Phase);
impl_credential_status!(DecapsulateStatus, Phase);
impl_credential_resource!(QuantumEncapsulateSecret, EncapsulateStatus);
impl_credential_resource!(QuantumDecapsulateSecret, DecapsulateStatus);
