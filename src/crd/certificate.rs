//! # Certificate Resource
//!
//! `QuantumCertificate` issues a self-signed ML-DSA X.509 certificate and
//! stores it in an owned Secret under `tls.crt` and `tls.key`.

use super::common::{impl_credential_resource, impl_credential_status, ObjectReference, Phase};
use super::keypair::default_signature_algorithm;
use crate::constants::DEFAULT_CERTIFICATE_DAYS;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Request for a self-signed certificate
///
/// # Example
///
/// ```yaml
/// apiVersion: qubesec.io/v1
/// kind: QuantumCertificate
/// metadata:
///   name: api
/// spec:
///   algorithm: ML-DSA-65
///   domain: api.example.com
///   days: 90
/// ```
#[derive(CustomResource, Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "QuantumCertificate",
    group = "qubesec.io",
    version = "v1",
    namespaced,
    status = "CertificateStatus",
    shortname = "qc",
    printcolumn = r#"{"name":"Status", "type":"string", "jsonPath":".status.status"}, {"name":"Algorithm", "type":"string", "jsonPath":".spec.algorithm"}, {"name":"Domain", "type":"string", "jsonPath":".spec.domain"}, {"name":"Expires", "type":"string", "jsonPath":".status.notAfter"}, {"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct QuantumCertificateSpec {
    /// Signature algorithm (ML-DSA-44, ML-DSA-65, ML-DSA-87 or a Dilithium alias)
    #[serde(default = "default_signature_algorithm")]
    pub algorithm: String,
    /// Subject common name, repeated as a DNS subject alternative name
    pub domain: String,
    /// Validity period in days
    #[serde(default = "default_days")]
    pub days: u32,
    /// Name of the output Secret. Defaults to `<name>-certificate`.
    #[serde(default, alias = "outputName", skip_serializing_if = "Option::is_none")]
    pub secret_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CertificateStatus {
    #[serde(default)]
    pub status: Phase,
    #[serde(default)]
    pub certificate_reference: Option<ObjectReference>,
    /// Full SHA-256 of the certificate DER
    #[serde(default)]
    pub certificate_fingerprint: Option<String>,
    /// End of the validity period, RFC 3339
    #[serde(default)]
    pub not_after: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub last_update_time: Option<String>,
    #[serde(default)]
    pub observed_generation: Option<i64>,
}

pub fn default_days() -> u32 {
    DEFAULT_CERTIFICATE_DAYS
}

impl_credential_status!(CertificateStatus, Phase);
impl_credential_resource!(QuantumCertificate, CertificateStatus);
