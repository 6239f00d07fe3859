//! # Fingerprints
//!
//! Display fingerprints are the first ten hex characters of SHA-256 over the
//! bytes exactly as stored. They identify material; they are not used for
//! security decisions.

use crate::constants::FINGERPRINT_DISPLAY_LEN;
use sha2::{Digest, Sha256};

/// Full lowercase hex SHA-256 of `data`
pub fn full(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Truncated fingerprint of `data`
pub fn short(data: &[u8]) -> String {
    let mut digest = full(data);
    digest.truncate(FINGERPRINT_DISPLAY_LEN);
    digest
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vector() {
        // SHA-256("abc")
        assert_eq!(
            full(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(short(b"abc"), "ba7816bf8f");
    }

    #[test]
    fn test_short_is_prefix_of_full() {
        let data = b"shared secret bytes";
        assert!(full(data).starts_with(&short(data)));
        assert_eq!(short(data).len(), 10);
    }
}
