//! # Crypto
//!
//! Adapter over the post-quantum primitives plus the small leaf utilities the
//! reconcilers need around them.
//!
//! - [`CryptoProvider`] / [`PqProvider`] - key generation, KEM, signatures, HKDF
//! - [`algorithm`] - algorithm names and aliases
//! - [`certificate`] - self-signed ML-DSA X.509 certificates
//! - [`envelope`] - algorithm-tagged PEM framing for stored keys
//! - [`fingerprint`] - truncated SHA-256 display fingerprints
//! - [`entropy`] - Shannon entropy of random output
//! - [`random`] - random byte generation

pub mod algorithm;
pub mod certificate;
pub mod entropy;
pub mod envelope;
pub mod fingerprint;
pub mod kdf;
mod pq;
mod provider;
pub mod random;

pub use algorithm::{KemAlgorithm, KeyKind, SignatureAlgorithm};
pub use pq::PqProvider;
pub use provider::{CryptoError, CryptoProvider, Encapsulation, KeyPair};
