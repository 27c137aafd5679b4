//! Общие константы (slots, retention, timers, sidecar layout).

// -------- Slots --------
pub const MAX_SLOTS: usize = 16;

// -------- Sidecar DB --------
/// Суффикс sidecar-БД: <save_path>.sqlite3
pub const DB_SUFFIX: &str = ".sqlite3";
/// Максимум untagged-снапшотов на одну БД (tagged не считаются).
pub const HISTORY_LIMIT: u32 = 50;
pub const BUSY_TIMEOUT_MS: u64 = 10_000;
pub const JOURNAL_SIZE_LIMIT: i64 = 1024 * 1024;

// -------- Scheduler --------
/// Задержка повтора после неудачного flush.
pub const RETRY_MS: u64 = 60_000;
pub const DEFAULT_AUTOSAVE_INTERVAL_SECS: u32 = 300;

// -------- Scratch images --------
/// <tmp_dir>/sram_slot_<n>.bin: стабильное имя на слот.
pub const SCRATCH_PREFIX: &str = "sram_slot_";
pub const SCRATCH_EXT: &str = "bin";

/// Байт "стёртой" памяти, которым дополняется образ.
pub const ERASED_BYTE: u8 = 0xFF;
