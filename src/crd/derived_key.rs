//! # Derived Key Resource
//!
//! `QuantumDerivedKey` stretches the shared secret of an encapsulation or a
//! decapsulation into a 32-byte symmetric key with HKDF-SHA256.

use super::common::{impl_credential_resource, impl_credential_status, ObjectReference, Phase};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Derive a symmetric key from a shared secret
///
/// # Example
///
/// ```yaml
/// apiVersion: qubesec.io/v1
/// kind: QuantumDerivedKey
/// metadata:
///   name: session-key
/// spec:
///   sharedSecretRef:
///     name: alice-to-bob
///   keyType: AES-256
///   info: "73657373696f6e"
/// ```
#[derive(CustomResource, Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "QuantumDerivedKey",
    group = "qubesec.io",
    version = "v1",
    namespaced,
    status = "DerivedKeyStatus",
    shortname = "qdk",
    printcolumn = r#"{"name":"Status", "type":"string", "jsonPath":".status.status"}, {"name":"KeyType", "type":"string", "jsonPath":".spec.keyType"}, {"name":"Fingerprint", "type":"string", "jsonPath":".status.fingerprintHash"}, {"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct QuantumDerivedKeySpec {
    /// Encapsulation or decapsulation holding the shared secret
    pub shared_secret_ref: ObjectReference,
    #[serde(default)]
    pub key_type: KeyType,
    /// Hex-encoded HKDF salt; omitted means an empty salt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salt: Option<String>,
    /// Hex-encoded HKDF info
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
    /// Name of the output Secret. Defaults to `<name>-derived-key`.
    #[serde(default, alias = "outputName", skip_serializing_if = "Option::is_none")]
    pub secret_name: Option<String>,
}

/// Intended use of the derived key. Every type derives 32 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, JsonSchema)]
pub enum KeyType {
    #[default]
    #[serde(rename = "AES-256")]
    Aes256,
    #[serde(rename = "ChaCha20")]
    ChaCha20,
    #[serde(rename = "HMAC-SHA256")]
    HmacSha256,
}

impl KeyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyType::Aes256 => "AES-256",
            KeyType::ChaCha20 => "ChaCha20",
            KeyType::HmacSha256 => "HMAC-SHA256",
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DerivedKeyStatus {
    #[serde(default)]
    pub status: Phase,
    #[serde(default)]
    pub derived_key_reference: Option<ObjectReference>,
    /// Full hex SHA-256 of the derived key
    #[serde(default)]
    pub key_fingerprint: Option<String>,
    /// Truncated form of `keyFingerprint`
    #[serde(default)]
    pub fingerprint_hash: Option<String>,
    #[serde(default)]
    pub used_salt: Option<String>,
    #[serde(default)]
    pub used_info: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub last_update_time: Option<String>,
    #[serde(default)]
    pub observed_generation: Option<i64>,
}

impl_credential_status!(DerivedKeyStatus, Phase);
impl_credential_resource!(QuantumDerivedKey, DerivedKeyStatus);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_type_wire_names() {
        for (key_type, wire) in [
            (KeyType::Aes256, "AES-256"),
            (KeyType::ChaCha20, "ChaCha20"),
            (KeyType::HmacSha256, "HMAC-SHA256"),
        ] {
            assert_eq!(serde_json::to_value(key_type).unwrap(), serde_json::json!(wire));
            assert_eq!(key_type.as_str(), wire);
        }
    }

    #[test]
    fn test_key_type_defaults_to_aes() {
        let spec: QuantumDerivedKeySpec =
            serde_json::from_value(serde_json::json!({"sharedSecretRef": {"name": "s"}}))
                .unwrap();
        assert_eq!(spec.key_type, KeyType::Aes256);
        assert!(spec.salt.is_none());
    }
}
