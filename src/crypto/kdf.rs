//! # Key Derivation
//!
//! HKDF-SHA256 extract-and-expand with a fixed 32-byte output.

use super::CryptoError;
use crate::constants::DERIVED_KEY_LEN;
use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroizing;

/// Derive a 32-byte key from `ikm`
///
/// An empty salt is passed to HKDF as "no salt", which RFC 5869 defines as a
/// string of zeros. The output is therefore a pure function of the inputs.
pub fn derive_key(ikm: &[u8], salt: &[u8], info: &[u8]) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    let salt = if salt.is_empty() { None } else { Some(salt) };
    let hk = Hkdf::<Sha256>::new(salt, ikm);
    let mut okm = Zeroizing::new(vec![0u8; DERIVED_KEY_LEN]);
    hk.expand(info, okm.as_mut_slice())
        .map_err(|e| CryptoError::Operation(format!("HKDF expand failed: {e}")))?;
    Ok(okm)
}

/// Largest output of a single HKDF-SHA256 expand (255 blocks of 32 bytes)
const MAX_EXPAND_LEN: usize = 255 * 32;

/// Expand `seed` into `len` pseudo-random bytes
///
/// Used for deterministic random-number generation from a caller-supplied seed.
/// Output beyond one HKDF expand is produced in chunks whose `info` carries a
/// big-endian chunk counter, so any length is reachable and a shorter request
/// is a prefix of a longer one with the same seed.
pub fn expand_seed(seed: &[u8], info: &[u8], len: usize) -> Result<Vec<u8>, CryptoError> {
    let hk = Hkdf::<Sha256>::new(None, seed);
    let mut out = vec![0u8; len];
    let mut chunk_info = Vec::with_capacity(info.len() + 4);

    for (counter, chunk) in out.chunks_mut(MAX_EXPAND_LEN).enumerate() {
        let counter = u32::try_from(counter).map_err(|e| {
            CryptoError::Operation(format!("seed expansion of {len} bytes is too long: {e}"))
        })?;
        chunk_info.clear();
        chunk_info.extend_from_slice(info);
        chunk_info.extend_from_slice(&counter.to_be_bytes());
        hk.expand(&chunk_info, chunk)
            .map_err(|e| CryptoError::Operation(format!("HKDF expand failed: {e}")))?;
    }
    Ok(out)
}
