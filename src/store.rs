//! [src/store.rs]
//! APARATO: ALMACEN DE REGISTROS
//! RESPONSABILIDAD: Log ordenado y append-only de ChunkRecord, consultable por pagina.

use crate::analyzer::ChunkRecord;
use crate::stats::round_to;
use parking_lot::RwLock;

/// One row of the paged `/data` response: `(offset, length, entropy, r, g, b)`.
pub type ChunkRow = (u64, u32, f64, f64, f64, f64);

/// One row of the paged `/data` response, anomaly half: `(anom_score, flux_type)`.
pub type AnomRow = (f64, u8);

/// An append-only, id-ordered log of `ChunkRecord`s. Safe for concurrent reads
/// while a `/load` scan holds the write lock during `reset`/`insert_bulk`.
#[derive(Default)]
pub struct RecordStore {
    records: RwLock<Vec<ChunkRecord>>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self { records: RwLock::new(Vec::new()) }
    }

    /// Atomically appends `batch`. Ids are already assigned by the analyzer in
    /// receive order, so this is a pure append.
    pub fn insert_bulk(&self, batch: Vec<ChunkRecord>) {
        self.records.write().extend(batch);
    }

    /// Returns the records with id in `[page_num*page_size+1, (page_num+1)*page_size]`,
    /// split into parallel chunk/anomaly row vectors, in id order.
    pub fn get_page(&self, page_num: u64, page_size: u64) -> (Vec<ChunkRow>, Vec<AnomRow>) {
        let guard = self.records.read();
        if page_size == 0 {
            return (Vec::new(), Vec::new());
        }
        let Some(lo) = page_num.checked_mul(page_size).and_then(|v| v.checked_add(1)) else {
            return (Vec::new(), Vec::new());
        };
        let hi = page_num
            .checked_add(1)
            .and_then(|next| next.checked_mul(page_size))
            .unwrap_or(u64::MAX);

        let mut chunk_rows = Vec::new();
        let mut anom_rows = Vec::new();
        for record in guard.iter() {
            if record.id < lo {
                continue;
            }
            if record.id > hi {
                break;
            }
            chunk_rows.push((record.offset, record.length, record.entropy, record.r_frac, record.g_frac, record.b_frac));
            anom_rows.push((round_to(record.anom_score, 2), record.flux_type));
        }
        (chunk_rows, anom_rows)
    }

    /// All records' `(r, g, b)` triples in id order, for BMP export.
    pub fn get_all_spectral(&self) -> Vec<(f64, f64, f64)> {
        self.records.read().iter().map(|r| (r.r_frac, r.g_frac, r.b_frac)).collect()
    }

    pub fn total(&self) -> usize {
        self.records.read().len()
    }

    /// Drops all records. Called by `/load` before a replacement scan runs.
    pub fn reset(&self) {
        self.records.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: u64) -> ChunkRecord {
        ChunkRecord { id, offset: id * 10, length: 10, entropy: 1.0, r_frac: 0.1, g_frac: 0.2, b_frac: 0.7, anom_score: 0.1234, flux_type: 0 }
    }

    #[test]
    fn insert_bulk_and_total() {
        let store = RecordStore::new();
        store.insert_bulk(vec![record(1), record(2), record(3)]);
        assert_eq!(store.total(), 3);
    }

    #[test]
    fn get_page_returns_id_ordered_slice() {
        let store = RecordStore::new();
        store.insert_bulk((1..=10).map(record).collect());
        let (chunks, anoms) = store.get_page(0, 5);
        assert_eq!(chunks.len(), 5);
        assert_eq!(anoms.len(), 5);
        assert_eq!(chunks[0].0, 10); // offset of id 1

        let (chunks_page_2, _) = store.get_page(1, 5);
        assert_eq!(chunks_page_2.len(), 5);
        assert_eq!(chunks_page_2[0].0, 60); // offset of id 6
    }

    #[test]
    fn get_page_rounds_anom_score_to_two_decimals() {
        let store = RecordStore::new();
        store.insert_bulk(vec![record(1)]);
        let (_, anoms) = store.get_page(0, 5000);
        assert_eq!(anoms[0].0, 0.12);
    }

    #[test]
    fn get_page_with_overflowing_page_num_returns_empty_instead_of_panicking() {
        let store = RecordStore::new();
        store.insert_bulk(vec![record(1)]);
        let (chunks, anoms) = store.get_page(u64::MAX, 5);
        assert!(chunks.is_empty());
        assert!(anoms.is_empty());
    }

    #[test]
    fn reset_drops_all_records() {
        let store = RecordStore::new();
        store.insert_bulk(vec![record(1)]);
        store.reset();
        assert_eq!(store.total(), 0);
        let (chunks, _) = store.get_page(0, 10);
        assert!(chunks.is_empty());
    }

    #[test]
    fn get_all_spectral_preserves_order() {
        let store = RecordStore::new();
        store.insert_bulk(vec![record(1), record(2)]);
        let spectral = store.get_all_spectral();
        assert_eq!(spectral, vec![(0.1, 0.2, 0.7), (0.1, 0.2, 0.7)]);
    }
}
