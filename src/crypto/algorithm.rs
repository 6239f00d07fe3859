//! # Algorithm Registry
//!
//! Maps user-facing algorithm names, including the pre-standard Kyber and
//! Dilithium names, onto the FIPS 203 / FIPS 204 parameter sets.

use super::CryptoError;
use std::fmt;
use std::str::FromStr;

/// ML-KEM parameter set (FIPS 203)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KemAlgorithm {
    MlKem512,
    MlKem768,
    MlKem1024,
}

/// ML-DSA parameter set (FIPS 204)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureAlgorithm {
    MlDsa44,
    MlDsa65,
    MlDsa87,
}

/// Which half of a key pair a blob holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    Public,
    Secret,
}

impl KemAlgorithm {
    /// Canonical name, also used as the envelope tag prefix
    pub fn name(&self) -> &'static str {
        match self {
            KemAlgorithm::MlKem512 => "ML-KEM-512",
            KemAlgorithm::MlKem768 => "ML-KEM-768",
            KemAlgorithm::MlKem1024 => "ML-KEM-1024",
        }
    }
}

impl SignatureAlgorithm {
    pub fn name(&self) -> &'static str {
        match self {
            SignatureAlgorithm::MlDsa44 => "ML-DSA-44",
            SignatureAlgorithm::MlDsa65 => "ML-DSA-65",
            SignatureAlgorithm::MlDsa87 => "ML-DSA-87",
        }
    }
}

impl KeyKind {
    pub fn label(&self) -> &'static str {
        match self {
            KeyKind::Public => "PUBLIC KEY",
            KeyKind::Secret => "SECRET KEY",
        }
    }
}

/// Uppercase and drop separators so `ml-kem-768`, `ML_KEM_768` and `MLKEM768` compare equal
fn normalize(name: &str) -> String {
    let upper = name.trim().to_ascii_uppercase();
    let stripped = upper.strip_prefix("CRYSTALS-").unwrap_or(&upper);
    stripped
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

impl FromStr for KemAlgorithm {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "MLKEM512" | "KYBER512" => Ok(KemAlgorithm::MlKem512),
            "MLKEM768" | "KYBER768" => Ok(KemAlgorithm::MlKem768),
            "MLKEM1024" | "KYBER1024" => Ok(KemAlgorithm::MlKem1024),
            _ => Err(CryptoError::UnsupportedAlgorithm(s.to_string())),
        }
    }
}

impl FromStr for SignatureAlgorithm {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "MLDSA44" | "DILITHIUM2" => Ok(SignatureAlgorithm::MlDsa44),
            "MLDSA65" | "DILITHIUM3" => Ok(SignatureAlgorithm::MlDsa65),
            "MLDSA87" | "DILITHIUM5" => Ok(SignatureAlgorithm::MlDsa87),
            _ => Err(CryptoError::UnsupportedAlgorithm(s.to_string())),
        }
    }
}

impl fmt::Display for KemAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
