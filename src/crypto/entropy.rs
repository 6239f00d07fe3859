//! Shannon entropy of a byte string viewed as its sequence of bits.

/// Entropy in bits per symbol over the `0`/`1` symbols of `data`
///
/// The result lies in `[0, 1]`. Empty input has zero entropy.
pub fn shannon_entropy(data: &[u8]) -> f64 {
    let total = data.len() as u64 * 8;
    if total == 0 {
        return 0.0;
    }

    let ones: u64 = data.iter().map(|b| u64::from(b.count_ones())).sum();
    let zeros = total - ones;

    [zeros, ones]
        .into_iter()
        .filter(|&count| count > 0)
        .map(|count| {
            #[allow(clippy::cast_precision_loss, reason = "bit counts stay far below 2^52")]
            let p = count as f64 / total as f64;
            -p * p.log2()
        })
        .sum()
}

/// Entropy rendered the way it is recorded in status
pub fn format_entropy(entropy: f64) -> String {
    format!("{entropy:.12}")
}
