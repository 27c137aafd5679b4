//! Lightweight global metrics for SramVault.
//!
//! Атомарные счётчики для подсистем:
//! - Snapshot store (insert / trim / dedup)
//! - Load path (CRC skips)
//! - Flush scheduler
//! - Legacy import / migrations
//! - Autosave trigger

use std::sync::atomic::{AtomicU64, Ordering};

// ----- Snapshot store -----
static SNAPSHOTS_WRITTEN: AtomicU64 = AtomicU64::new(0);
static SNAPSHOT_BYTES_WRITTEN: AtomicU64 = AtomicU64::new(0);
static SNAPSHOTS_TRIMMED: AtomicU64 = AtomicU64::new(0);

// ----- Load -----
static LOAD_CRC_SKIPS: AtomicU64 = AtomicU64::new(0);

// ----- Flush -----
static FLUSH_UNCHANGED: AtomicU64 = AtomicU64::new(0);
static FLUSH_FAILURES: AtomicU64 = AtomicU64::new(0);

// ----- Legacy / migrations -----
static LEGACY_IMPORTS: AtomicU64 = AtomicU64::new(0);
static MIGRATIONS_APPLIED: AtomicU64 = AtomicU64::new(0);

// ----- Autosave trigger -----
static TRIGGER_FIRES: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct MetricsSnapshot {
    pub snapshots_written: u64,
    pub snapshot_bytes_written: u64,
    pub snapshots_trimmed: u64,

    pub load_crc_skips: u64,

    pub flush_unchanged: u64,
    pub flush_failures: u64,

    pub legacy_imports: u64,
    pub migrations_applied: u64,

    pub trigger_fires: u64,
}

impl MetricsSnapshot {
    /// Доля flush-попыток, закончившихся без записи (dedup).
    pub fn dedup_ratio(&self) -> f64 {
        let total = self.snapshots_written + self.flush_unchanged;
        if total == 0 {
            0.0
        } else {
            self.flush_unchanged as f64 / total as f64
        }
    }
}

pub fn record_snapshot_written(bytes: usize, trimmed: usize) {
    SNAPSHOTS_WRITTEN.fetch_add(1, Ordering::Relaxed);
    SNAPSHOT_BYTES_WRITTEN.fetch_add(bytes as u64, Ordering::Relaxed);
    SNAPSHOTS_TRIMMED.fetch_add(trimmed as u64, Ordering::Relaxed);
}

pub fn record_load_crc_skip() {
    LOAD_CRC_SKIPS.fetch_add(1, Ordering::Relaxed);
}

pub fn record_flush_unchanged() {
    FLUSH_UNCHANGED.fetch_add(1, Ordering::Relaxed);
}

pub fn record_flush_failure() {
    FLUSH_FAILURES.fetch_add(1, Ordering::Relaxed);
}

pub fn record_legacy_import() {
    LEGACY_IMPORTS.fetch_add(1, Ordering::Relaxed);
}

pub fn record_migration_applied() {
    MIGRATIONS_APPLIED.fetch_add(1, Ordering::Relaxed);
}

pub fn record_trigger_fire() {
    TRIGGER_FIRES.fetch_add(1, Ordering::Relaxed);
}

pub fn snapshot() -> MetricsSnapshot {
    MetricsSnapshot {
        snapshots_written: SNAPSHOTS_WRITTEN.load(Ordering::Relaxed),
        snapshot_bytes_written: SNAPSHOT_BYTES_WRITTEN.load(Ordering::Relaxed),
        snapshots_trimmed: SNAPSHOTS_TRIMMED.load(Ordering::Relaxed),

        load_crc_skips: LOAD_CRC_SKIPS.load(Ordering::Relaxed),

        flush_unchanged: FLUSH_UNCHANGED.load(Ordering::Relaxed),
        flush_failures: FLUSH_FAILURES.load(Ordering::Relaxed),

        legacy_imports: LEGACY_IMPORTS.load(Ordering::Relaxed),
        migrations_applied: MIGRATIONS_APPLIED.load(Ordering::Relaxed),

        trigger_fires: TRIGGER_FIRES.load(Ordering::Relaxed),
    }
}

pub fn reset() {
    SNAPSHOTS_WRITTEN.store(0, Ordering::Relaxed);
    SNAPSHOT_BYTES_WRITTEN.store(0, Ordering::Relaxed);
    SNAPSHOTS_TRIMMED.store(0, Ordering::Relaxed);

    LOAD_CRC_SKIPS.store(0, Ordering::Relaxed);

    FLUSH_UNCHANGED.store(0, Ordering::Relaxed);
    FLUSH_FAILURES.store(0, Ordering::Relaxed);

    LEGACY_IMPORTS.store(0, Ordering::Relaxed);
    MIGRATIONS_APPLIED.store(0, Ordering::Relaxed);

    TRIGGER_FIRES.store(0, Ordering::Relaxed);
}
