//! # Property Tests
//!
//! Fingerprint and entropy properties over arbitrary byte strings.

use proptest::prelude::*;
use qubesec_controller::crypto::entropy::{format_entropy, shannon_entropy};
use qubesec_controller::crypto::fingerprint;
use sha2::{Digest, Sha256};

proptest! {
    #[test]
    fn fingerprint_is_truncated_sha256(data in proptest::collection::vec(any::<u8>(), 0..512)) {
        let expected = hex::encode(Sha256::digest(&data));
        prop_assert_eq!(fingerprint::short(&data), expected[..10].to_string());
        prop_assert_eq!(fingerprint::full(&data), expected);
    }

    #[test]
    fn entropy_is_bounded(data in proptest::collection::vec(any::<u8>(), 0..512)) {
        let entropy = shannon_entropy(&data);
        prop_assert!((0.0..=1.0).contains(&entropy));
        let rendered = format_entropy(entropy);
        prop_assert_eq!(rendered.split('.').nth(1).map(str::len), Some(12));
    }

    #[test]
    fn entropy_ignores_byte_order(mut data in proptest::collection::vec(any::<u8>(), 1..256)) {
        let before = shannon_entropy(&data);
        data.reverse();
        prop_assert!((shannon_entropy(&data) - before).abs() < 1e-12);
    }
}
