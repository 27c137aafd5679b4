//! util: общие утилиты (время, CRC, пути).

use crc32fast::Hasher as Crc32;
use std::path::{Path, PathBuf};

use crate::consts::DB_SUFFIX;

/// Текущее Unix-время в миллисекундах (для ts_ms/applied_ts_ms).
#[inline]
pub fn now_ms() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    now.as_millis().min(i64::MAX as u128) as i64
}

/// CRC32 (IEEE) над образом. Пустой ввод => 0.
#[inline]
pub fn crc32(data: &[u8]) -> u32 {
    if data.is_empty() {
        return 0;
    }
    let mut h = Crc32::new();
    h.update(data);
    h.finalize()
}

/// Абсолютный путь (относительные: от текущего каталога).
pub fn absolute(p: &Path) -> PathBuf {
    if p.is_absolute() {
        return p.to_path_buf();
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(p),
        Err(_) => p.to_path_buf(),
    }
}

/// <save_path>.sqlite3
pub fn sidecar_path(save_path: &Path) -> PathBuf {
    let mut s = save_path.as_os_str().to_owned();
    s.push(DB_SUFFIX);
    PathBuf::from(s)
}

/// Rollback journal SQLite для БД (journal_mode=PERSIST оставляет его на диске).
pub fn journal_path(db_path: &Path) -> PathBuf {
    let mut s = db_path.as_os_str().to_owned();
    s.push("-journal");
    PathBuf::from(s)
}
