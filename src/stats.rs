//! [src/stats.rs]
//! APARATO: STATISTICS KERNEL
//! RESPONSABILIDAD: Shannon entropy and tri-band byte-class histograms.

/// Upper bound (exclusive) past which a byte is a high band (R) member.
const HIGH_BAND_START: u8 = 0x80;
/// Printable / text band (G): space through tilde.
const TEXT_BAND_RANGE: std::ops::RangeInclusive<u8> = 0x20..=0x7E;
/// Control band (B): the low 32 byte values.
const CONTROL_BAND_END: u8 = 0x1F;

/// Computes Shannon entropy in bits over the 256-bin byte histogram of `data`.
///
/// Empty input returns `0.0`. Bins with zero count contribute nothing to the sum,
/// so the result is always in `[0, 8]`.
pub fn entropy(data: &[u8]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let mut histogram = [0u32; 256];
    for &byte in data {
        histogram[byte as usize] += 1;
    }
    let length = data.len() as f64;
    histogram
        .iter()
        .filter(|&&count| count > 0)
        .map(|&count| {
            let p = count as f64 / length;
            -p * p.log2()
        })
        .sum()
}

/// Byte-class counts for a chunk: `(r_count, g_count, b_count)`.
///
/// R = `[0x80, 0xFF]` (high bit set), G = `[0x20, 0x7E]` (printable ASCII),
/// B = `[0x00, 0x1F]` (control bytes). Byte `0x7F` belongs to none of the three.
pub fn bands(data: &[u8]) -> (usize, usize, usize) {
    let mut r = 0usize;
    let mut g = 0usize;
    let mut b = 0usize;
    for &byte in data {
        if byte >= HIGH_BAND_START {
            r += 1;
        } else if TEXT_BAND_RANGE.contains(&byte) {
            g += 1;
        } else if byte <= CONTROL_BAND_END {
            b += 1;
        }
    }
    (r, g, b)
}

/// Rounds `value` to `decimals` fractional digits, matching the 3dp/2dp
/// rounding the record schema requires at the point of persistence or read-back.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_has_zero_entropy() {
        assert_eq!(entropy(&[]), 0.0);
    }

    #[test]
    fn constant_byte_run_has_zero_entropy() {
        let data = [0x41u8; 4096];
        assert_eq!(entropy(&data), 0.0);
    }

    #[test]
    fn uniform_permutation_has_maximal_entropy() {
        let data: Vec<u8> = (0u8..=255).collect();
        assert!((entropy(&data) - 8.0).abs() < 1e-9);
    }

    #[test]
    fn bands_partition_is_exhaustive_except_0x7f() {
        let data: Vec<u8> = (0u8..=255).collect();
        let (r, g, b) = bands(&data);
        assert_eq!(r + g + b, 255); // every byte but 0x7F is classified
        assert_eq!(r, 128); // 0x80..=0xFF
        assert_eq!(g, 0x7E - 0x20 + 1);
        assert_eq!(b, 32); // 0x00..=0x1F
    }

    #[test]
    fn single_0x7f_byte_is_unclassified() {
        let (r, g, b) = bands(&[0x7F]);
        assert_eq!((r, g, b), (0, 0, 0));
    }

    #[test]
    fn round_to_matches_schema_precision() {
        assert_eq!(round_to(1.23456, 3), 1.235);
        assert_eq!(round_to(0.125, 2), 0.13);
    }
}
