//! [src/config.rs]
//! APARATO: CONFIGURACION Y LINEA DE MANDO (CLI)
//! RESPONSABILIDAD: Define la Configuration inmutable de la sesion y su origen (clap).

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing::warn;

/// Chunking strategy selected for the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Fixed-size blocks; `block_size` is the exact chunk size.
    Fixed,
    /// Delimiter-sentinel chunks; `block_size` is the maximum chunk size.
    Sentinel,
}

/// Immutable record fixed at session start.
#[derive(Debug, Clone)]
pub struct Configuration {
    pub mode: Mode,
    pub block_size: u32,
    pub delimiter: u8,
    pub window: usize,
    pub port: u16,
    pub name: String,
}

const SMALL_BLOCK_SIZE_WARNING_THRESHOLD: u32 = 256;

impl Configuration {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.size < SMALL_BLOCK_SIZE_WARNING_THRESHOLD {
            warn!(
                size = cli.size,
                "block size below {SMALL_BLOCK_SIZE_WARNING_THRESHOLD} bytes creates heavy per-chunk overhead on large files"
            );
        }
        let delimiter = u8::from_str_radix(cli.hex.trim(), 16).unwrap_or_else(|_| {
            warn!(hex = %cli.hex, "invalid delimiter hex, defaulting to 0x00");
            0x00
        });
        Self {
            mode: cli.mode,
            block_size: cli.size,
            delimiter,
            window: cli.window,
            port: cli.port,
            name: format!("CLI ({:?} {})", cli.mode, cli.size),
        }
    }
}

/// Command-line surface: a file to scan plus the session's chunking and server knobs.
#[derive(Parser, Debug)]
#[command(
    name = "entroscan",
    version,
    about = "Forensic binary-analysis engine: chunk, score entropy, flag anomalies, serve over HTTP."
)]
pub struct Cli {
    /// File to scan.
    #[arg(value_name = "FILE")]
    pub target: PathBuf,

    /// Chunking strategy.
    #[arg(long, value_enum, default_value_t = Mode::Fixed)]
    pub mode: Mode,

    /// Block size (FIXED) or maximum chunk size (SENTINEL), in bytes.
    #[arg(long, default_value_t = 1024, value_parser = clap::value_parser!(u32).range(1..))]
    pub size: u32,

    /// Sentinel delimiter byte, as hex (SENTINEL mode only).
    #[arg(long, default_value = "00")]
    pub hex: String,

    /// HTTP server port.
    #[arg(long, default_value_t = 8000)]
    pub port: u16,

    /// Sliding entropy window size for anomaly detection.
    #[arg(long, default_value_t = 5)]
    pub window: usize,
}
