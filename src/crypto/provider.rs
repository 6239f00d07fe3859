//! # Crypto Provider
//!
//! The narrow interface between the reconcilers and the post-quantum primitives.
//! Every operation is a pure function of its inputs plus fresh randomness; no
//! state is kept between calls.

use super::algorithm::{KemAlgorithm, SignatureAlgorithm};
use thiserror::Error;
use zeroize::Zeroizing;

/// Failure of a cryptographic operation
///
/// Messages describe the operation and the shape of the input, never its contents.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("unsupported algorithm '{0}'")]
    UnsupportedAlgorithm(String),

    #[error("invalid {what} for {algorithm}: expected {expected} bytes, got {actual}")]
    InvalidLength {
        algorithm: &'static str,
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("invalid ciphertext: {0}")]
    InvalidCiphertext(String),

    #[error("{0}")]
    Envelope(String),

    #[error("{0}")]
    Operation(String),
}

/// Freshly generated key pair, raw (unframed) bytes
#[derive(Debug)]
pub struct KeyPair {
    pub public_key: Vec<u8>,
    pub private_key: Zeroizing<Vec<u8>>,
}

/// Result of a KEM encapsulation
#[derive(Debug)]
pub struct Encapsulation {
    pub ciphertext: Vec<u8>,
    pub shared_secret: Zeroizing<Vec<u8>>,
}

/// Post-quantum primitives used by the reconcilers
///
/// Implementations must be cheap to share (`Arc<dyn CryptoProvider>`) and must
/// not retain any input between calls.
pub trait CryptoProvider: Send + Sync + std::fmt::Debug {
    fn generate_kem_key_pair(&self, algorithm: KemAlgorithm) -> Result<KeyPair, CryptoError>;

    fn generate_signature_key_pair(
        &self,
        algorithm: SignatureAlgorithm,
    ) -> Result<KeyPair, CryptoError>;

    fn encapsulate(
        &self,
        algorithm: KemAlgorithm,
        public_key: &[u8],
    ) -> Result<Encapsulation, CryptoError>;

    fn decapsulate(
        &self,
        algorithm: KemAlgorithm,
        private_key: &[u8],
        ciphertext: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, CryptoError>;

    /// HKDF-SHA256 with a 32-byte output; an empty salt is an empty-salt derivation
    fn derive_key(
        &self,
        shared_secret: &[u8],
        salt: &[u8],
        info: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, CryptoError>;

    fn sign(
        &self,
        algorithm: SignatureAlgorithm,
        private_key: &[u8],
        message: &[u8],
    ) -> Result<Vec<u8>, CryptoError>;

    /// `Ok(false)` for a well-formed key and a signature that does not verify
    fn verify(
        &self,
        algorithm: SignatureAlgorithm,
        public_key: &[u8],
        message: &[u8],
        signature: &[u8],
    ) -> Result<bool, CryptoError>;

    /// `len` bytes from the operating system's entropy source
    fn random_bytes(&self, len: usize) -> Result<Vec<u8>, CryptoError>;
}
