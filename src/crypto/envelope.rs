//! # Key Envelope
//!
//! Key blobs are stored as PEM with a tag naming the algorithm and key half,
//! e.g. `-----BEGIN ML-KEM-768 PUBLIC KEY-----`. Consumers open the envelope and
//! check the tag before handing the bytes to the provider.

use super::algorithm::KeyKind;
use super::CryptoError;
use zeroize::Zeroizing;

/// A key blob with its algorithm tag
#[derive(Debug)]
pub struct KeyEnvelope {
    pub algorithm: String,
    pub kind: KeyKind,
    pub key: Zeroizing<Vec<u8>>,
}

/// Frame key bytes in an algorithm-tagged PEM envelope
pub fn seal(algorithm: &str, kind: KeyKind, key: &[u8]) -> String {
    let pem = pem::Pem::new(format!("{algorithm} {}", kind.label()), key.to_vec());
    pem::encode(&pem)
}

/// Parse an envelope produced by [`seal`]
pub fn open(blob: &[u8]) -> Result<KeyEnvelope, CryptoError> {
    let pem = pem::parse(blob).map_err(|e| CryptoError::Envelope(format!("malformed PEM: {e}")))?;

    let tag = pem.tag();
    let (algorithm, kind) = if let Some(alg) = tag.strip_suffix(KeyKind::Public.label()) {
        (alg, KeyKind::Public)
    } else if let Some(alg) = tag.strip_suffix(KeyKind::Secret.label()) {
        (alg, KeyKind::Secret)
    } else {
        return Err(CryptoError::Envelope(format!("unrecognized PEM tag '{tag}'")));
    };

    let algorithm = algorithm.trim_end();
    if algorithm.is_empty() {
        return Err(CryptoError::Envelope(format!("PEM tag '{tag}' names no algorithm")));
    }

    Ok(KeyEnvelope {
        algorithm: algorithm.to_string(),
        kind,
        key: Zeroizing::new(pem.into_contents()),
    })
}

impl KeyEnvelope {
    /// Unwrap the key bytes if the envelope holds `kind` for `algorithm`
    pub fn expect(self, algorithm: &str, kind: KeyKind) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        if self.kind != kind {
            return Err(CryptoError::Envelope(format!(
                "key kind mismatch: expected {}, found {}",
                kind.label(),
                self.kind.label()
            )));
        }
        if self.algorithm != algorithm {
            return Err(CryptoError::Envelope(format!(
                "algorithm mismatch: expected {algorithm}, found {}",
                self.algorithm
            )));
        }
        Ok(self.key)
    }
}
