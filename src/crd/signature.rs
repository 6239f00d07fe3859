//! # Signature Resources
//!
//! `QuantumSignMessage` signs the bytes held in a Secret with a
//! `QuantumSignatureKeyPair`'s private key. `QuantumVerifySignature` checks a
//! stored signature over a stored message with the matching public key.

use super::common::{
    impl_credential_resource, impl_credential_status, ObjectReference, Phase, VerificationPhase,
};
use crate::constants::{DEFAULT_MESSAGE_KEY, DEFAULT_SIGNATURE_KEY};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Sign a message with a post-quantum signature key
///
/// # Example
///
/// ```yaml
/// apiVersion: qubesec.io/v1
/// kind: QuantumSignMessage
/// metadata:
///   name: release-notes
/// spec:
///   privateKeyRef:
///     name: release-signer
///   messageRef:
///     name: release-notes-message
///   algorithm: ML-DSA-65
/// ```
#[derive(CustomResource, Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "QuantumSignMessage",
    group = "qubesec.io",
    version = "v1",
    namespaced,
    status = "SignStatus",
    shortname = "qsm",
    printcolumn = r#"{"name":"Status", "type":"string", "jsonPath":".status.status"}, {"name":"Algorithm", "type":"string", "jsonPath":".spec.algorithm"}, {"name":"Message", "type":"string", "jsonPath":".status.messageFingerprint"}, {"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct QuantumSignMessageSpec {
    /// Signature key pair whose private key is used
    pub private_key_ref: ObjectReference,
    /// Secret holding the message under `messageKey`
    pub message_ref: ObjectReference,
    #[serde(default = "default_message_key")]
    pub message_key: String,
    #[serde(default)]
    pub algorithm: String,
    /// Name of the output Secret. Defaults to `<name>-signature`.
    #[serde(
        default,
        alias = "outputName",
        alias = "secretName",
        skip_serializing_if = "Option::is_none"
    )]
    pub output_secret_name: Option<String>,
    /// Data key the signature is written under
    #[serde(default = "default_signature_key")]
    pub signature_key: String,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignStatus {
    #[serde(default)]
    pub status: Phase,
    /// Base64-encoded signature
    #[serde(default)]
    pub signature: Option<String>,
    #[serde(default)]
    pub signature_reference: Option<ObjectReference>,
    #[serde(default)]
    pub message_fingerprint: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub last_update_time: Option<String>,
    #[serde(default)]
    pub observed_generation: Option<i64>,
}

/// Verify a stored signature over a stored message
#[derive(CustomResource, Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "QuantumVerifySignature",
    group = "qubesec.io",
    version = "v1",
    namespaced,
    status = "VerifyStatus",
    shortname = "qvs",
    printcolumn = r#"{"name":"Status", "type":"string", "jsonPath":".status.status"}, {"name":"Verified", "type":"boolean", "jsonPath":".status.verified"}, {"name":"Algorithm", "type":"string", "jsonPath":".spec.algorithm"}, {"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct QuantumVerifySignatureSpec {
    /// Signature key pair whose public key is used
    pub public_key_ref: ObjectReference,
    /// Secret holding the message under `messageKey`
    pub message_ref: ObjectReference,
    #[serde(default = "default_message_key")]
    pub message_key: String,
    /// Secret holding the signature under `signatureKey`
    pub signature_ref: ObjectReference,
    #[serde(default = "default_signature_key")]
    pub signature_key: String,
    #[serde(default)]
    pub algorithm: String,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyStatus {
    #[serde(default)]
    pub status: VerificationPhase,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub message_fingerprint: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    /// When the signature was last checked
    #[serde(default)]
    pub last_checked_time: Option<String>,
    #[serde(default)]
    pub last_update_time: Option<String>,
    #[serde(default)]
    pub observed_generation: Option<i64>,
}

pub fn default_message_key() -> String {
    DEFAULT_MESSAGE_KEY.to_string()
}

pub fn default_signature_key() -> String {
    DEFAULT_SIGNATURE_KEY.to_string()
}

impl_credential_status!(SignStatus, Phase);
impl_credential_status!(VerifyStatus, VerificationPhase);
impl_credential_resource!(QuantumSignMessage, SignStatus);
impl_credential_resource!(QuantumVerifySignature, VerifyStatus);
