use std::sync::atomic::{AtomicU64, Ordering};

/// Run-wide counters, shared between the producer and all workers.
#[derive(Default)]
pub struct ImportStats {
    pub files_imported: AtomicU64,
    pub blocks_segmented: AtomicU64,
    pub blocks_failed: AtomicU64,
    pub records_written: AtomicU64,
    pub lines_skipped: AtomicU64,
}

impl ImportStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_files(&self) {
        self.files_imported.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_blocks(&self) {
        self.blocks_segmented.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_failed(&self) {
        self.blocks_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_records(&self, count: u64) {
        self.records_written.fetch_add(count, Ordering::Relaxed);
    }

    pub fn inc_skipped(&self) {
        self.lines_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn files(&self) -> u64 {
        self.files_imported.load(Ordering::Relaxed)
    }

    pub fn blocks(&self) -> u64 {
        self.blocks_segmented.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.blocks_failed.load(Ordering::Relaxed)
    }

    pub fn records(&self) -> u64 {
        self.records_written.load(Ordering::Relaxed)
    }

    pub fn skipped(&self) -> u64 {
        self.lines_skipped.load(Ordering::Relaxed)
    }
}
