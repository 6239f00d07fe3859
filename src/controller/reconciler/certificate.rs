//! Self-signed certificate issuance for `QuantumCertificate`.

use super::gate::{self, StoredOutput};
use super::materializer::{self, SecretPayload};
use super::{non_empty, open_key, CredentialReconciler, ObjectKey, Outcome, Reconciler, ReconcilerError};
use crate::constants::{CERTIFICATE_SUFFIX, MAX_CERTIFICATE_DAYS, TLS_CERT_FIELD, TLS_KEY_FIELD};
use crate::crd::{CertificateStatus, ObjectReference, Phase, QuantumCertificate, QuantumCertificateSpec};
use crate::crypto::{certificate, envelope, fingerprint, KeyKind, SignatureAlgorithm};
use crate::observability::metrics;
use crate::store::ClusterStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

/// Longest DNS name
const MAX_DOMAIN_LEN: usize = 253;

#[derive(Debug)]
struct Request<'a> {
    algorithm: SignatureAlgorithm,
    domain: &'a str,
    days: u32,
}

fn validate(spec: &QuantumCertificateSpec) -> Result<Request<'_>, ReconcilerError> {
    let algorithm: SignatureAlgorithm = non_empty(&spec.algorithm, "spec.algorithm")?
        .parse()
        .map_err(ReconcilerError::provider("issue certificate"))?;

    let domain = non_empty(&spec.domain, "spec.domain")?;
    if domain.len() > MAX_DOMAIN_LEN
        || !domain
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '*'))
    {
        return Err(ReconcilerError::Precondition(format!(
            "spec.domain '{domain}' is not a DNS name"
        )));
    }

    if spec.days == 0 || spec.days > MAX_CERTIFICATE_DAYS {
        return Err(ReconcilerError::Precondition(format!(
            "spec.days must be between 1 and {MAX_CERTIFICATE_DAYS}, got {}",
            spec.days
        )));
    }

    Ok(Request {
        algorithm,
        domain,
        days: spec.days,
    })
}

#[async_trait]
impl CredentialReconciler for QuantumCertificate {
    async fn reconcile_resource<S: ClusterStore>(
        ctx: &Reconciler<S>,
        resource: &Self,
    ) -> Result<Outcome, ReconcilerError> {
        let request = validate(&resource.spec)?;
        let key = ObjectKey::from_resource(resource);
        let name = gate::output_name(resource.spec.secret_name.as_deref(), &key.name, CERTIFICATE_SUFFIX);
        let algorithm = request.algorithm;

        // An existing certificate is kept as issued; a spec change does not reissue it
        let stored = match gate::check(&ctx.store, resource, &key.namespace, &name).await? {
            Some(stored) => {
                stored.require(&[TLS_CERT_FIELD, TLS_KEY_FIELD])?;
                open_key(stored.field(TLS_KEY_FIELD)?, algorithm.name(), KeyKind::Secret)?;
                debug!(secret = %name, "Certificate already issued");
                stored
            }
            None => {
                debug!(%algorithm, domain = request.domain, days = request.days, "Issuing certificate");
                metrics::increment_crypto_operations("issue_certificate");
                let issued = certificate::self_signed(
                    ctx.provider.as_ref(),
                    algorithm,
                    request.domain,
                    request.days,
                )
                .map_err(ReconcilerError::provider("issue certificate"))?;

                let payload = SecretPayload::from([
                    (
                        TLS_CERT_FIELD.to_string(),
                        certificate::to_pem(&issued.der).into_bytes(),
                    ),
                    (
                        TLS_KEY_FIELD.to_string(),
                        envelope::seal(algorithm.name(), KeyKind::Secret, &issued.private_key)
                            .into_bytes(),
                    ),
                ]);
                StoredOutput::new(
                    materializer::create(&ctx.store, resource, &key.namespace, &name, payload).await?,
                )
            }
        };

        let der = certificate::from_pem(stored.field(TLS_CERT_FIELD)?)
            .map_err(ReconcilerError::provider("read certificate"))?;
        metrics::increment_crypto_operations("verify");
        let not_after = certificate::verify_self_signed(ctx.provider.as_ref(), algorithm, &der)
            .map_err(ReconcilerError::provider("read certificate"))?;
        let not_after = DateTime::<Utc>::from(not_after).to_rfc3339();

        let certificate_fingerprint = fingerprint::full(&der);
        let reference = ObjectReference::new(&name, &key.namespace);
        ctx.update_status(resource, |status: &mut CertificateStatus| {
            status.status = Phase::Success;
            status.certificate_reference = Some(reference.clone());
            status.certificate_fingerprint = Some(certificate_fingerprint.clone());
            status.not_after = Some(not_after.clone());
            status.error = None;
        })
        .await?;

        Ok(Outcome::Ready)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(algorithm: &str, domain: &str, days: u32) -> QuantumCertificateSpec {
        QuantumCertificateSpec {
            algorithm: algorithm.to_string(),
            domain: domain.to_string(),
            days,
            secret_name: None,
        }
    }

    #[test]
    fn test_validate_accepts_aliases_and_wildcards() {
        let spec = spec("Dilithium2", "*.example.com", 30);
        let request = validate(&spec).unwrap();
        assert_eq!(request.algorithm, SignatureAlgorithm::MlDsa44);
        assert_eq!(request.domain, "*.example.com");
        assert_eq!(request.days, 30);
    }

    #[test]
    fn test_validate_rejects_bad_domain() {
        for domain in ["", "  ", "example.com,O=Evil", "exa mple.com"] {
            let err = validate(&spec("ML-DSA-65", domain, 30)).unwrap_err();
            assert!(matches!(err, ReconcilerError::Precondition(ref m) if m.contains("spec.domain")));
        }
    }

    #[test]
    fn test_validate_bounds_days() {
        for days in [0, MAX_CERTIFICATE_DAYS + 1] {
            let err = validate(&spec("ML-DSA-65", "example.com", days)).unwrap_err();
            assert!(matches!(err, ReconcilerError::Precondition(ref m) if m.contains("spec.days")));
        }
        assert!(validate(&spec("ML-DSA-65", "example.com", MAX_CERTIFICATE_DAYS)).is_ok());
    }

    #[test]
    fn test_validate_rejects_non_signature_algorithm() {
        let err = validate(&spec("ML-KEM-768", "example.com", 30)).unwrap_err();
        assert!(matches!(err, ReconcilerError::Provider { .. }));
    }
}
