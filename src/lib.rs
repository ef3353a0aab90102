//! [src/lib.rs]
//! APARATO: RAIZ DE LA LIBRERIA
//! RESPONSABILIDAD: Declara el arbol de modulos del motor forense.

pub mod analyzer;
pub mod bmp;
pub mod chunker;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod server;
pub mod session;
pub mod stats;
pub mod store;
pub mod telemetry;

/// Re-exports the pieces a binary entry point needs to bootstrap a session.
pub mod prelude {
    pub use crate::config::{Cli, Configuration, Mode};
    pub use crate::server::build_router;
    pub use crate::session::AppState;
    pub use crate::telemetry::init_tracing;
}
