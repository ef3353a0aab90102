//! [src/session.rs]
//! APARATO: ESTADO DE SESION COMPARTIDO
//! RESPONSABILIDAD: Mantiene el triple (file_path, config, store) leido por
//! todos los handlers y mutado unicamente por `/load`.

use crate::analyzer;
use crate::chunker::{Chunker, FixedChunker, SentinelChunker};
use crate::config::{Configuration, Mode};
use crate::error::ScanError;
use crate::store::RecordStore;
use parking_lot::{Mutex, RwLock};
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{info, instrument};

/// Process-wide state `S = {file_path, config, store}`.
///
/// `file_path` and `config` sit behind their own `RwLock` so read handlers
/// never block on each other; `reload_guard` serializes `/load` against
/// itself so two concurrent scans can never race on `store.reset()`.
#[derive(Clone)]
pub struct AppState {
    file_path: Arc<RwLock<PathBuf>>,
    config: Arc<RwLock<Configuration>>,
    store: Arc<RecordStore>,
    reload_guard: Arc<Mutex<()>>,
}

impl AppState {
    /// Builds the initial session state and runs the first scan synchronously.
    pub fn bootstrap(file_path: PathBuf, config: Configuration) -> Result<Self, ScanError> {
        let store = Arc::new(RecordStore::new());
        run_scan(&file_path, &config, &store)?;
        Ok(Self {
            file_path: Arc::new(RwLock::new(file_path)),
            config: Arc::new(RwLock::new(config)),
            store,
            reload_guard: Arc::new(Mutex::new(())),
        })
    }

    pub fn file_path(&self) -> PathBuf {
        self.file_path.read().clone()
    }

    pub fn config(&self) -> Configuration {
        self.config.read().clone()
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Validates `new_path`, then runs a full replacement scan and, on
    /// success, swaps `file_path` in. Serialized against concurrent `/load`
    /// calls via `reload_guard`; read handlers are never blocked by it.
    #[instrument(skip(self))]
    pub fn reload(&self, new_path: PathBuf) -> Result<usize, ScanError> {
        let _serialize = self.reload_guard.lock();

        let config = self.config();
        let total = run_scan(&new_path, &config, &self.store)?;
        *self.file_path.write() = new_path;
        info!(total, "Session reloaded with new target file.");
        Ok(total)
    }
}

fn build_chunker(config: &Configuration) -> Box<dyn Chunker> {
    match config.mode {
        Mode::Fixed => Box::new(FixedChunker::new(config.block_size as usize)),
        Mode::Sentinel => Box::new(SentinelChunker::new(config.delimiter, config.block_size as usize)),
    }
}

fn run_scan(path: &Path, config: &Configuration, store: &RecordStore) -> Result<usize, ScanError> {
    let chunker = build_chunker(config);
    let cancel = AtomicBool::new(false);
    analyzer::scan(chunker.as_ref(), path, store, config.window, &cancel)
}
