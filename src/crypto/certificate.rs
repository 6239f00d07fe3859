//! # Self-Signed Certificates
//!
//! X.509 v3 certificates signed with ML-DSA. Algorithm identifiers carry no
//! parameters and the signature covers the DER of the TBS certificate under
//! the empty ML-DSA context, so any verifier for pure ML-DSA accepts them.

use super::algorithm::SignatureAlgorithm;
use super::provider::{CryptoError, CryptoProvider};
use std::str::FromStr;
use std::time::{Duration, SystemTime};
use x509_cert::der::asn1::{BitString, Ia5String, OctetString};
use x509_cert::der::{Decode, Encode};
use x509_cert::ext::pkix::name::GeneralName;
use x509_cert::ext::pkix::SubjectAltName;
use x509_cert::ext::Extension;
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;
use x509_cert::spki::{AlgorithmIdentifierOwned, ObjectIdentifier, SubjectPublicKeyInfoOwned};
use x509_cert::time::Validity;
use x509_cert::{Certificate, TbsCertificate, Version};
use zeroize::Zeroizing;

const PEM_TAG: &str = "CERTIFICATE";

const SERIAL_LEN: usize = 16;

const SECONDS_PER_DAY: u64 = 86_400;

const ID_ML_DSA_44: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.3.17");
const ID_ML_DSA_65: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.3.18");
const ID_ML_DSA_87: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.3.19");
const ID_CE_SUBJECT_ALT_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.29.17");

/// A freshly issued certificate and the key that signed it
#[derive(Debug)]
pub struct IssuedCertificate {
    pub der: Vec<u8>,
    pub private_key: Zeroizing<Vec<u8>>,
}

fn algorithm_identifier(algorithm: SignatureAlgorithm) -> AlgorithmIdentifierOwned {
    let oid = match algorithm {
        SignatureAlgorithm::MlDsa44 => ID_ML_DSA_44,
        SignatureAlgorithm::MlDsa65 => ID_ML_DSA_65,
        SignatureAlgorithm::MlDsa87 => ID_ML_DSA_87,
    };
    AlgorithmIdentifierOwned {
        oid,
        parameters: None,
    }
}

fn encoding(what: &'static str) -> impl Fn(x509_cert::der::Error) -> CryptoError {
    move |e| CryptoError::Operation(format!("encoding {what} failed: {e}"))
}

fn malformed(e: x509_cert::der::Error) -> CryptoError {
    CryptoError::Envelope(format!("malformed certificate: {e}"))
}

/// Issue a self-signed certificate for `domain` with a fresh key pair
///
/// The subject and issuer are `CN=<domain>` and the domain is repeated as a
/// DNS subject alternative name. Validity starts now and lasts `days`.
pub fn self_signed(
    provider: &dyn CryptoProvider,
    algorithm: SignatureAlgorithm,
    domain: &str,
    days: u32,
) -> Result<IssuedCertificate, CryptoError> {
    let pair = provider.generate_signature_key_pair(algorithm)?;
    let subject = Name::from_str(&format!("CN={domain}")).map_err(encoding("subject"))?;

    let mut serial = provider.random_bytes(SERIAL_LEN)?;
    // positive and minimally encoded
    if let Some(first) = serial.first_mut() {
        *first = (*first & 0x7f) | 0x40;
    }

    let alt_names = SubjectAltName(vec![GeneralName::DnsName(
        Ia5String::new(domain).map_err(encoding("subject alternative name"))?,
    )]);
    let alt_names = Extension {
        extn_id: ID_CE_SUBJECT_ALT_NAME,
        critical: false,
        extn_value: OctetString::new(
            alt_names.to_der().map_err(encoding("subject alternative name"))?,
        )
        .map_err(encoding("subject alternative name"))?,
    };

    let tbs_certificate = TbsCertificate {
        version: Version::V3,
        serial_number: SerialNumber::new(&serial).map_err(encoding("serial number"))?,
        signature: algorithm_identifier(algorithm),
        issuer: subject.clone(),
        validity: Validity::from_now(Duration::from_secs(u64::from(days) * SECONDS_PER_DAY))
            .map_err(encoding("validity"))?,
        subject,
        subject_public_key_info: SubjectPublicKeyInfoOwned {
            algorithm: algorithm_identifier(algorithm),
            subject_public_key: BitString::from_bytes(&pair.public_key)
                .map_err(encoding("public key"))?,
        },
        issuer_unique_id: None,
        subject_unique_id: None,
        extensions: Some(vec![alt_names]),
    };

    let tbs = tbs_certificate.to_der().map_err(encoding("certificate"))?;
    let signature = provider.sign(algorithm, &pair.private_key, &tbs)?;

    let certificate = Certificate {
        tbs_certificate,
        signature_algorithm: algorithm_identifier(algorithm),
        signature: BitString::from_bytes(&signature).map_err(encoding("signature"))?,
    };

    Ok(IssuedCertificate {
        der: certificate.to_der().map_err(encoding("certificate"))?,
        private_key: pair.private_key,
    })
}

/// PEM text of a DER certificate
pub fn to_pem(der: &[u8]) -> String {
    pem::encode(&pem::Pem::new(PEM_TAG, der.to_vec()))
}

/// DER of a stored PEM certificate
pub fn from_pem(blob: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let pem = pem::parse(blob).map_err(|e| CryptoError::Envelope(format!("malformed PEM: {e}")))?;
    if pem.tag() != PEM_TAG {
        return Err(CryptoError::Envelope(format!(
            "unexpected PEM tag '{}', expected {PEM_TAG}",
            pem.tag()
        )));
    }
    Ok(pem.into_contents())
}

/// Check that `der` is a certificate self-signed under `algorithm`
///
/// Returns the end of its validity period.
pub fn verify_self_signed(
    provider: &dyn CryptoProvider,
    algorithm: SignatureAlgorithm,
    der: &[u8],
) -> Result<SystemTime, CryptoError> {
    let certificate = Certificate::from_der(der).map_err(malformed)?;

    let expected = algorithm_identifier(algorithm).oid;
    if certificate.signature_algorithm.oid != expected {
        return Err(CryptoError::Envelope(format!(
            "algorithm mismatch: expected {algorithm}, certificate is signed with {}",
            certificate.signature_algorithm.oid
        )));
    }

    let public_key = certificate
        .tbs_certificate
        .subject_public_key_info
        .subject_public_key
        .raw_bytes();
    let signature = certificate.signature.raw_bytes();
    let tbs = certificate.tbs_certificate.to_der().map_err(malformed)?;

    if !provider.verify(algorithm, public_key, &tbs, signature)? {
        return Err(CryptoError::Envelope(
            "certificate signature does not verify under its own public key".to_string(),
        ));
    }

    Ok(certificate.tbs_certificate.validity.not_after.to_system_time())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::PqProvider;

    #[test]
    fn test_issues_parseable_self_signed_certificate() {
        let provider = PqProvider::new();
        let issued = self_signed(&provider, SignatureAlgorithm::MlDsa65, "api.example.com", 30).unwrap();

        let certificate = Certificate::from_der(&issued.der).unwrap();
        let tbs = &certificate.tbs_certificate;
        assert_eq!(tbs.version, Version::V3);
        assert_eq!(tbs.subject.to_string(), "CN=api.example.com");
        assert_eq!(tbs.issuer, tbs.subject);
        assert_eq!(certificate.signature_algorithm.oid, ID_ML_DSA_65);
        assert!(certificate.signature_algorithm.parameters.is_none());

        let lifetime = tbs.validity.not_after.to_unix_duration() - tbs.validity.not_before.to_unix_duration();
        assert_eq!(lifetime, Duration::from_secs(30 * SECONDS_PER_DAY));

        let extensions = tbs.extensions.as_ref().unwrap();
        assert_eq!(extensions.len(), 1);
        assert_eq!(extensions[0].extn_id, ID_CE_SUBJECT_ALT_NAME);

        let not_after =
            verify_self_signed(&provider, SignatureAlgorithm::MlDsa65, &issued.der).unwrap();
        assert_eq!(not_after, tbs.validity.not_after.to_system_time());
    }

    #[test]
    fn test_serial_numbers_are_positive_and_distinct() {
        let provider = PqProvider::new();
        let a = self_signed(&provider, SignatureAlgorithm::MlDsa44, "a.example", 1).unwrap();
        let b = self_signed(&provider, SignatureAlgorithm::MlDsa44, "a.example", 1).unwrap();

        let a = Certificate::from_der(&a.der).unwrap().tbs_certificate.serial_number;
        let b = Certificate::from_der(&b.der).unwrap().tbs_certificate.serial_number;
        assert_ne!(a, b);
        assert_eq!(a.as_bytes().len(), SERIAL_LEN);
        assert!(a.as_bytes()[0] & 0x80 == 0);
    }

    #[test]
    fn test_verification_rejects_other_algorithm_and_tampering() {
        let provider = PqProvider::new();
        let issued = self_signed(&provider, SignatureAlgorithm::MlDsa44, "example.org", 7).unwrap();

        let err = verify_self_signed(&provider, SignatureAlgorithm::MlDsa87, &issued.der).unwrap_err();
        assert!(matches!(err, CryptoError::Envelope(ref m) if m.contains("algorithm mismatch")));

        let mut tampered = issued.der.clone();
        let last = tampered.len() - 1;
        tampered[last] ^= 0x01;
        let err = verify_self_signed(&provider, SignatureAlgorithm::MlDsa44, &tampered).unwrap_err();
        assert!(matches!(err, CryptoError::Envelope(_)));

        let err = verify_self_signed(&provider, SignatureAlgorithm::MlDsa44, b"not a certificate").unwrap_err();
        assert!(matches!(err, CryptoError::Envelope(ref m) if m.contains("malformed certificate")));
    }

    #[test]
    fn test_pem_framing() {
        let blob = to_pem(&[0x30, 0x03, 0x02, 0x01, 0x01]);
        assert!(blob.starts_with("-----BEGIN CERTIFICATE-----"));
        assert_eq!(from_pem(blob.as_bytes()).unwrap(), vec![0x30, 0x03, 0x02, 0x01, 0x01]);

        let key = pem::encode(&pem::Pem::new("ML-DSA-65 SECRET KEY", vec![1, 2, 3]));
        let err = from_pem(key.as_bytes()).unwrap_err();
        assert!(matches!(err, CryptoError::Envelope(ref m) if m.contains("unexpected PEM tag")));
    }
}
