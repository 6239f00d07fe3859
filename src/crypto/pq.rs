//! # Post-Quantum Provider
//!
//! [`CryptoProvider`] backed by the pure-Rust `fips203` (ML-KEM) and `fips204`
//! (ML-DSA) crates. Parameter sets are dispatched with small macros because the
//! crates expose one module per set with fixed-size array types.

use super::algorithm::{KemAlgorithm, SignatureAlgorithm};
use super::kdf;
use super::provider::{CryptoError, CryptoProvider, Encapsulation, KeyPair};
use rand::RngCore;
use zeroize::Zeroizing;

/// Provider using the FIPS 203 / FIPS 204 reference implementations
#[derive(Debug, Clone, Copy, Default)]
pub struct PqProvider;

impl PqProvider {
    pub fn new() -> Self {
        Self
    }
}

/// Copy a slice into the fixed-size array a parameter set expects
fn to_array<const N: usize>(
    bytes: &[u8],
    algorithm: &'static str,
    what: &'static str,
) -> Result<[u8; N], CryptoError> {
    <[u8; N]>::try_from(bytes).map_err(|_| CryptoError::InvalidLength {
        algorithm,
        what,
        expected: N,
        actual: bytes.len(),
    })
}

mod kem {
    use super::{to_array, CryptoError, Encapsulation, KeyPair, Zeroizing};
    use crate::crypto::algorithm::KemAlgorithm;
    use fips203::traits::{Decaps, Encaps, KeyGen, SerDes};

    macro_rules! with_kem {
        ($algorithm:expr, $module:ident => $body:expr) => {
            match $algorithm {
                KemAlgorithm::MlKem512 => {
                    use fips203::ml_kem_512 as $module;
                    $body
                }
                KemAlgorithm::MlKem768 => {
                    use fips203::ml_kem_768 as $module;
                    $body
                }
                KemAlgorithm::MlKem1024 => {
                    use fips203::ml_kem_1024 as $module;
                    $body
                }
            }
        };
    }

    pub(super) fn keygen(algorithm: KemAlgorithm) -> Result<KeyPair, CryptoError> {
        with_kem!(algorithm, m => {
            let (ek, dk) = <m::KG as KeyGen>::try_keygen()
                .map_err(|e| CryptoError::Operation(format!("{algorithm} key generation failed: {e}")))?;
            Ok(KeyPair {
                public_key: ek.into_bytes().to_vec(),
                private_key: Zeroizing::new(dk.into_bytes().to_vec()),
            })
        })
    }

    pub(super) fn encapsulate(
        algorithm: KemAlgorithm,
        public_key: &[u8],
    ) -> Result<Encapsulation, CryptoError> {
        with_kem!(algorithm, m => {
            let ek = m::EncapsKey::try_from_bytes(to_array::<{ m::EK_LEN }>(
                public_key,
                algorithm.name(),
                "public key",
            )?)
            .map_err(|e| CryptoError::InvalidKey(format!("{algorithm} public key rejected: {e}")))?;
            let (ssk, ct) = ek
                .try_encaps()
                .map_err(|e| CryptoError::Operation(format!("{algorithm} encapsulation failed: {e}")))?;
            Ok(Encapsulation {
                ciphertext: ct.into_bytes().to_vec(),
                shared_secret: Zeroizing::new(ssk.into_bytes().to_vec()),
            })
        })
    }

    pub(super) fn decapsulate(
        algorithm: KemAlgorithm,
        private_key: &[u8],
        ciphertext: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        with_kem!(algorithm, m => {
            let dk = m::DecapsKey::try_from_bytes(to_array::<{ m::DK_LEN }>(
                private_key,
                algorithm.name(),
                "private key",
            )?)
            .map_err(|e| CryptoError::InvalidKey(format!("{algorithm} private key rejected: {e}")))?;
            let ct = m::CipherText::try_from_bytes(to_array::<{ m::CT_LEN }>(
                ciphertext,
                algorithm.name(),
                "ciphertext",
            )?)
            .map_err(|e| CryptoError::InvalidCiphertext(format!("{algorithm}: {e}")))?;
            let ssk = dk
                .try_decaps(&ct)
                .map_err(|e| CryptoError::Operation(format!("{algorithm} decapsulation failed: {e}")))?;
            Ok(Zeroizing::new(ssk.into_bytes().to_vec()))
        })
    }
}

mod dsa {
    use super::{to_array, CryptoError, KeyPair, Zeroizing};
    use crate::crypto::algorithm::SignatureAlgorithm;
    use fips204::traits::{KeyGen, SerDes, Signer, Verifier};

    /// ML-DSA context string; signatures are bound to the empty context
    const CONTEXT: &[u8] = &[];

    macro_rules! with_dsa {
        ($algorithm:expr, $module:ident => $body:expr) => {
            match $algorithm {
                SignatureAlgorithm::MlDsa44 => {
                    use fips204::ml_dsa_44 as $module;
                    $body
                }
                SignatureAlgorithm::MlDsa65 => {
                    use fips204::ml_dsa_65 as $module;
                    $body
                }
                SignatureAlgorithm::MlDsa87 => {
                    use fips204::ml_dsa_87 as $module;
                    $body
                }
            }
        };
    }

    pub(super) fn keygen(algorithm: SignatureAlgorithm) -> Result<KeyPair, CryptoError> {
        with_dsa!(algorithm, m => {
            let (pk, sk) = <m::KG as KeyGen>::try_keygen()
                .map_err(|e| CryptoError::Operation(format!("{algorithm} key generation failed: {e}")))?;
            Ok(KeyPair {
                public_key: pk.into_bytes().to_vec(),
                private_key: Zeroizing::new(sk.into_bytes().to_vec()),
            })
        })
    }

    pub(super) fn sign(
        algorithm: SignatureAlgorithm,
        private_key: &[u8],
        message: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        with_dsa!(algorithm, m => {
            let sk = m::PrivateKey::try_from_bytes(to_array::<{ m::SK_LEN }>(
                private_key,
                algorithm.name(),
                "private key",
            )?)
            .map_err(|e| CryptoError::InvalidKey(format!("{algorithm} private key rejected: {e}")))?;
            let signature = sk
                .try_sign(message, CONTEXT)
                .map_err(|e| CryptoError::Operation(format!("{algorithm} signing failed: {e}")))?;
            Ok(signature.to_vec())
        })
    }

    pub(super) fn verify(
        algorithm: SignatureAlgorithm,
        public_key: &[u8],
        message: &[u8],
        signature: &[u8],
    ) -> Result<bool, CryptoError> {
        with_dsa!(algorithm, m => {
            let pk = m::PublicKey::try_from_bytes(to_array::<{ m::PK_LEN }>(
                public_key,
                algorithm.name(),
                "public key",
            )?)
            .map_err(|e| CryptoError::InvalidKey(format!("{algorithm} public key rejected: {e}")))?;
            // a signature of the wrong size cannot verify
            let Ok(signature) = <[u8; m::SIG_LEN]>::try_from(signature) else {
                return Ok(false);
            };
            Ok(pk.verify(message, &signature, CONTEXT))
        })
    }
}

impl CryptoProvider for PqProvider {
    fn generate_kem_key_pair(&self, algorithm: KemAlgorithm) -> Result<KeyPair, CryptoError> {
        kem::keygen(algorithm)
    }

    fn generate_signature_key_pair(
        &self,
        algorithm: SignatureAlgorithm,
    ) -> Result<KeyPair, CryptoError> {
        dsa::keygen(algorithm)
    }

    fn encapsulate(
        &self,
        algorithm: KemAlgorithm,
        public_key: &[u8],
    ) -> Result<Encapsulation, CryptoError> {
        kem::encapsulate(algorithm, public_key)
    }

    fn decapsulate(
        &self,
        algorithm: KemAlgorithm,
        private_key: &[u8],
        ciphertext: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        kem::decapsulate(algorithm, private_key, ciphertext)
    }

    fn derive_key(
        &self,
        shared_secret: &[u8],
        salt: &[u8],
        info: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        kdf::derive_key(shared_secret, salt, info)
    }

    fn sign(
        &self,
        algorithm: SignatureAlgorithm,
        private_key: &[u8],
        message: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        dsa::sign(algorithm, private_key, message)
    }

    fn verify(
        &self,
        algorithm: SignatureAlgorithm,
        public_key: &[u8],
        message: &[u8],
        signature: &[u8],
    ) -> Result<bool, CryptoError> {
        dsa::verify(algorithm, public_key, message, signature)
    }

    fn random_bytes(&self, len: usize) -> Result<Vec<u8>, CryptoError> {
        let mut buf = vec![0u8; len];
        rand::rng().fill_bytes(&mut buf);
        Ok(buf)
    }
}
