//! # Random Number Resource
//!
//! `QuantumRandomNumber` stores a block of random bytes in an owned Secret and
//! records the Shannon entropy of its bit string.

use super::common::{impl_credential_resource, impl_credential_status, ObjectReference, Phase};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Generate random bytes
///
/// # Example
///
/// ```yaml
/// apiVersion: qubesec.io/v1
/// kind: QuantumRandomNumber
/// metadata:
///   name: nonce
/// spec:
///   bytes: 64
/// ```
#[derive(CustomResource, Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "QuantumRandomNumber",
    group = "qubesec.io",
    version = "v1",
    namespaced,
    status = "RandomNumberStatus",
    shortname = "qrn",
    shortname = "qrng",
    printcolumn = r#"{"name":"Status", "type":"string", "jsonPath":".status.status"}, {"name":"Bytes", "type":"integer", "jsonPath":".status.bytes"}, {"name":"Algorithm", "type":"string", "jsonPath":".status.algorithm"}, {"name":"Entropy", "type":"string", "jsonPath":".status.entropy"}, {"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct QuantumRandomNumberSpec {
    #[serde(default = "default_bytes")]
    pub bytes: u32,
    /// `system` (OS entropy) or `NIST-KAT` (deterministic expansion of `seed`)
    #[serde(default = "default_random_algorithm")]
    pub algorithm: String,
    /// Seed material, at least 48 bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<String>,
    /// URL serving a hex-encoded seed, used when `seed` is empty
    #[serde(default, rename = "seedURI", skip_serializing_if = "Option::is_none")]
    pub seed_uri: Option<String>,
    /// Name of the output Secret. Defaults to `<name>-random`.
    #[serde(default, alias = "outputName", skip_serializing_if = "Option::is_none")]
    pub secret_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RandomNumberStatus {
    #[serde(default)]
    pub status: Phase,
    #[serde(default)]
    pub random_number_reference: Option<ObjectReference>,
    #[serde(default)]
    pub bytes: Option<u32>,
    #[serde(default)]
    pub algorithm: Option<String>,
    /// Shannon entropy of the output bit string, 12 decimals
    #[serde(default)]
    pub entropy: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub last_update_time: Option<String>,
    #[serde(default)]
    pub observed_generation: Option<i64>,
}

pub fn default_bytes() -> u32 {
    32
}

pub fn default_random_algorithm() -> String {
    "system".to_string()
}

impl_credential_status!(RandomNumberStatus, Phase);
impl_credential_resource!(QuantumRandomNumber, RandomNumberStatus);
