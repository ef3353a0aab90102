//! [src/analyzer.rs]
//! APARATO: ANALIZADOR PARALELO Y DETECTOR DE ANOMALIAS
//! RESPONSABILIDAD: Mapea chunks a registros estadisticos, preservando el orden
//! de entrada, y anota cada registro con un puntaje de anomalia local.

use crate::chunker::{Chunker, RawChunk};
use crate::error::ScanError;
use crate::stats::{bands, entropy, round_to};
use crate::store::RecordStore;
use rayon::prelude::*;
use rayon::ThreadPool;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;
use tracing::info;

/// Number of chunks handed to the worker pool per parallel batch. Tuned to
/// keep a rayon batch large enough to amortize dispatch overhead while still
/// bounding peak memory for very large chunk sizes.
const WORKER_BATCH_SIZE: usize = 512;

static WORKER_POOL: OnceLock<ThreadPool> = OnceLock::new();

/// The analyzer's dedicated worker pool, sized to `max(1, cpu_count - 1)` so
/// one core stays free for the single-threaded driver and the HTTP server.
fn worker_pool() -> &'static ThreadPool {
    WORKER_POOL.get_or_init(|| {
        let threads = num_cpus::get().saturating_sub(1).max(1);
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("entroscan-worker-{i}"))
            .build()
            .expect("failed to build analyzer worker pool")
    })
}

/// Flush threshold for the record store.
const STORE_FLUSH_SIZE: usize = 2000;

/// One record emitted by a pure per-chunk worker: statistics only, no
/// anomaly annotation (that is a function of surrounding records and is
/// computed serially afterward).
#[derive(Debug, Clone, Copy)]
pub struct WorkerRecord {
    pub offset: u64,
    pub length: u32,
    pub entropy: f64,
    pub r_frac: f64,
    pub g_frac: f64,
    pub b_frac: f64,
}

/// A fully annotated chunk record, as persisted by the store.
#[derive(Debug, Clone, Copy)]
pub struct ChunkRecord {
    pub id: u64,
    pub offset: u64,
    pub length: u32,
    pub entropy: f64,
    pub r_frac: f64,
    pub g_frac: f64,
    pub b_frac: f64,
    pub anom_score: f64,
    pub flux_type: u8,
}

/// Pure per-chunk worker: takes only `(offset, bytes)` and returns a
/// statistics tuple, with no captured environment, so the pool implementation
/// is free to distribute it across threads.
fn worker_scan((offset, bytes): RawChunk) -> WorkerRecord {
    let length = bytes.len();
    if length == 0 {
        return WorkerRecord { offset, length: 0, entropy: 0.0, r_frac: 0.0, g_frac: 0.0, b_frac: 0.0 };
    }
    let h = entropy(&bytes);
    let (r, g, b) = bands(&bytes);
    WorkerRecord {
        offset,
        length: length as u32,
        entropy: round_to(h, 3),
        r_frac: round_to(r as f64 / length as f64, 3),
        g_frac: round_to(g as f64 / length as f64, 3),
        b_frac: round_to(b as f64 / length as f64, 3),
    }
}

/// Serial, stateful sliding-window anomaly detector.
struct AnomalyDetector {
    window: usize,
    history: VecDeque<f64>,
    prev_entropy: f64,
}

impl AnomalyDetector {
    fn new(window: usize) -> Self {
        Self { window, history: VecDeque::with_capacity(window), prev_entropy: 0.0 }
    }

    /// Scores one entropy value against the detector's running state, returning
    /// `(anom_score, flux_type)`, then folds the value into the history.
    fn observe(&mut self, h: f64) -> (f64, u8) {
        let base = if self.history.len() >= self.window {
            let avg: f64 = self.history.iter().sum::<f64>() / self.history.len() as f64;
            ((h - avg).abs() / 2.0).min(1.0)
        } else {
            0.0
        };

        let delta = h - self.prev_entropy;
        let (flux_type, anom_score) = if delta > 1.5 && h > 6.0 {
            (1u8, base + 0.8)
        } else if delta < -1.5 && h < 3.0 {
            (2u8, base + 0.8)
        } else if h > 7.95 {
            (3u8, base + 0.5)
        } else {
            (0u8, base)
        };

        self.prev_entropy = h;
        if self.history.len() == self.window {
            self.history.pop_front();
        }
        self.history.push_back(h);

        (anom_score, flux_type)
    }
}

/// Runs one full scan: chunk `path` with `chunker`, fan the chunks out to a
/// rayon worker pool in bounded batches (order preserved per batch via
/// `IndexedParallelIterator::collect`), annotate each result serially with the
/// anomaly detector, and flush the annotated records into `store`.
///
/// `cancel` is polled between batches; when set, the scan stops early without
/// leaving the store in a state whose `total()` disagrees with its actually
/// retrievable pages (everything flushed so far stays committed).
pub fn scan(
    chunker: &dyn Chunker,
    path: &Path,
    store: &RecordStore,
    window: usize,
    cancel: &AtomicBool,
) -> Result<usize, ScanError> {
    store.reset();
    let mut detector = AnomalyDetector::new(window);
    let mut pending_batch: Vec<ChunkRecord> = Vec::with_capacity(STORE_FLUSH_SIZE);
    let mut next_id: u64 = 1;
    let mut total = 0usize;

    let chunk_iter = chunker.chunks(path)?;
    let mut chunk_iter = chunk_iter.peekable();

    while chunk_iter.peek().is_some() {
        if cancel.load(Ordering::Relaxed) {
            break;
        }

        let raw_batch: Vec<RawChunk> = chunk_iter.by_ref().take(WORKER_BATCH_SIZE).collect();
        let worker_results: Vec<WorkerRecord> =
            worker_pool().install(|| raw_batch.into_par_iter().map(worker_scan).collect());

        for worker_record in worker_results {
            let (anom_score, flux_type) = detector.observe(worker_record.entropy);
            pending_batch.push(ChunkRecord {
                id: next_id,
                offset: worker_record.offset,
                length: worker_record.length,
                entropy: worker_record.entropy,
                r_frac: worker_record.r_frac,
                g_frac: worker_record.g_frac,
                b_frac: worker_record.b_frac,
                anom_score,
                flux_type,
            });
            next_id += 1;
            total += 1;
        }

        if pending_batch.len() >= STORE_FLUSH_SIZE {
            store.insert_bulk(std::mem::replace(&mut pending_batch, Vec::with_capacity(STORE_FLUSH_SIZE)));
            info!(processed = total, "Processed {total} blocks...");
        }
    }

    if !pending_batch.is_empty() {
        store.insert_bulk(pending_batch);
    }

    info!(total, "Scan complete. Total blocks: {total}");
    Ok(total)
}
