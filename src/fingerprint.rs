//! [src/fingerprint.rs]
//! APARATO: ARCHITECTURE FINGERPRINTER
//! RESPONSABILIDAD: Clasifica una region de bytes en una etiqueta de formato/arquitectura.

use crate::stats::entropy;

/// Byte values whose relative frequency feeds the x86/x86_64/ARM64 heuristic in
/// [`identify`]'s final fallback stage.
mod opcode {
    pub const RET: u8 = 0xC3;
    pub const NOP: u8 = 0x90;
    pub const PUSH_EBP: u8 = 0x55;
    pub const MOV_REG: u8 = 0x89;
    pub const REX_W: u8 = 0x48;
}

/// Classifies `data` into one of a fixed set of human-readable labels.
///
/// Rules are evaluated in order; the first match wins. See the module-level
/// heuristics below for the magic-byte, entropy-band, printable-ratio and
/// frequency-scoring stages.
pub fn identify(data: &[u8]) -> String {
    if data.is_empty() {
        return "Empty Region".to_string();
    }
    if data.len() < 4 {
        return "Too small to analyze".to_string();
    }
    if let Some(label) = match_magic_bytes(data) {
        return label;
    }

    let shannon = entropy(data);
    if shannon < 1.0 {
        return "Null Padding / Zero Space".to_string();
    }
    if shannon < 3.0 {
        return "Low Entropy (Sparse Data)".to_string();
    }
    if shannon > 7.9 {
        return "High Entropy (Crypto/Compressed)".to_string();
    }

    if printable_ratio(data) > 0.90 {
        return "ASCII Text / Source Code".to_string();
    }

    score_instruction_density(data, shannon)
}

fn match_magic_bytes(data: &[u8]) -> Option<String> {
    if data.starts_with(&[0x4D, 0x5A]) {
        return Some("Windows PE Header (x86/64)".to_string());
    }
    if data.starts_with(&[0x7F, 0x45, 0x4C, 0x46]) {
        let bitness = if data.get(4) == Some(&0x02) { "(64-bit)" } else { "(32-bit)" };
        return Some(format!("Linux ELF Header {bitness}"));
    }
    if data.starts_with(&[0xCA, 0xFE, 0xBA, 0xBE]) || data.starts_with(&[0xFE, 0xED, 0xFA, 0xCE]) {
        return Some("Mac Mach-O Header".to_string());
    }
    if data.starts_with(&[0x25, 0x50, 0x44, 0x46]) {
        return Some("PDF Document Header".to_string());
    }
    if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
        return Some("PNG Image Header".to_string());
    }
    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some("JPEG Image Header".to_string());
    }
    None
}

fn printable_ratio(data: &[u8]) -> f64 {
    let printable = data
        .iter()
        .filter(|&&b| (0x20..=0x7E).contains(&b) || matches!(b, 0x09 | 0x0A | 0x0D))
        .count();
    printable as f64 / data.len() as f64
}

/// Final fallback: score x86 / x86_64 / ARM64 instruction density against the
/// byte histogram and pick the argmax, with ties broken in declaration order.
fn score_instruction_density(data: &[u8], shannon: f64) -> String {
    let length = data.len();
    let mut histogram = [0u32; 256];
    for &b in data {
        histogram[b as usize] += 1;
    }
    let freq = |byte: u8| histogram[byte as usize] as f64 / length as f64;

    let score_x86 = 5.0 * freq(opcode::RET)
        + 3.0 * freq(opcode::NOP)
        + 2.0 * freq(opcode::PUSH_EBP)
        + freq(opcode::MOV_REG);
    let score_x64 = score_x86 + 3.0 * freq(opcode::REX_W);
    let score_arm64 = if length > 8 {
        let aligned_nulls = (3..length).step_by(4).filter(|&i| data[i] == 0).count();
        (aligned_nulls as f64 / (length as f64 / 4.0)) * 2.5
    } else {
        0.0
    };

    let candidates = [("x86 (32-bit)", score_x86), ("x86_64 (64-bit)", score_x64), ("ARM64", score_arm64)];
    let (best_label, best_score) = candidates
        .iter()
        .fold(candidates[0], |best, &current| if current.1 > best.1 { current } else { best });

    if best_score < 0.05 {
        if shannon > 6.0 {
            "Unknown High Density Data".to_string()
        } else {
            "Unknown Binary Data".to_string()
        }
    } else {
        format!("{best_label} Code (Probable)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_region() {
        assert_eq!(identify(&[]), "Empty Region");
    }

    #[test]
    fn too_small_regardless_of_content() {
        for sample in [&[0u8][..], &[0xFFu8; 3], &[0x4D, 0x5A, 0x00]] {
            assert_eq!(identify(sample), "Too small to analyze");
        }
    }

    #[test]
    fn windows_pe_magic() {
        let mut data = vec![0x4D, 0x5A, 0x90, 0x00];
        data.extend(std::iter::repeat(0u8).take(1020));
        assert_eq!(identify(&data), "Windows PE Header (x86/64)");
    }

    #[test]
    fn elf_magic_at_minimum_length_does_not_panic() {
        assert_eq!(identify(&[0x7F, 0x45, 0x4C, 0x46]), "Linux ELF Header (32-bit)");
    }

    #[test]
    fn elf_64bit_magic() {
        let mut data = vec![0x7F, 0x45, 0x4C, 0x46, 0x02];
        data.extend(std::iter::repeat(0u8).take(100));
        assert_eq!(identify(&data), "Linux ELF Header (64-bit)");
    }

    #[test]
    fn elf_32bit_magic() {
        let mut data = vec![0x7F, 0x45, 0x4C, 0x46, 0x01];
        data.extend(std::iter::repeat(0u8).take(100));
        assert_eq!(identify(&data), "Linux ELF Header (32-bit)");
    }

    #[test]
    fn null_padding_is_low_entropy() {
        let data = [0u8; 512];
        assert_eq!(identify(&data), "Null Padding / Zero Space");
    }

    #[test]
    fn ascii_text_detected_above_printable_threshold() {
        let data = "the quick brown fox jumps over the lazy dog ".repeat(20);
        assert_eq!(identify(data.as_bytes()), "ASCII Text / Source Code");
    }
}
