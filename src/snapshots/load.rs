//! load_latest: восстановление самого свежего *целого* снапшота.
//!
//! Обход строк от новых к старым; для каждой CRC32 пересчитывается по payload.
//! Несовпадение CRC или не-BLOB payload => строка пропускается (warn), обход продолжается.
//! Исчерпание строк => Ok(None) (как первый запуск), ошибка движка => Err.

use anyhow::{Context, Result};
use log::{debug, info, warn};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use std::time::Duration;

use super::Snapshot;
use crate::consts::BUSY_TIMEOUT_MS;
use crate::metrics::record_load_crc_skip;
use crate::util::{absolute, crc32};

fn open_for_load(full: &Path) -> Result<Connection> {
    let ro = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let conn = match Connection::open_with_flags(full, ro) {
        Ok(c) => c,
        Err(e) => {
            debug!("load: read-only open failed ({}), retry read-write", e);
            let rw = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX;
            Connection::open_with_flags(full, rw)
                .with_context(|| format!("sqlite: cannot open for load {}", full.display()))?
        }
    };
    conn.busy_timeout(Duration::from_millis(BUSY_TIMEOUT_MS))?;
    Ok(conn)
}

/// Newest intact snapshot in the sidecar at `path`. A missing file is `Ok(None)`.
pub fn load_latest(path: &Path) -> Result<Option<Snapshot>> {
    let full = absolute(path);
    if !full.exists() {
        return Ok(None);
    }

    let conn = open_for_load(&full)?;
    let mut stmt = conn
        .prepare("SELECT id, sram, crc32, ts_ms FROM snapshots ORDER BY id DESC;")
        .with_context(|| format!("load: prepare on {}", full.display()))?;
    let mut rows = stmt.query([])?;

    while let Some(row) = rows
        .next()
        .with_context(|| format!("load: step on {}", full.display()))?
    {
        let id: i64 = row.get(0)?;

        let stored = match row.get_ref(2) {
            Ok(ValueRef::Integer(v)) => v as u32,
            _ => {
                warn!("load skip: {} row={} (bad crc32 column)", full.display(), id);
                record_load_crc_skip();
                continue;
            }
        };

        let blob = match row.get_ref(1) {
            Ok(ValueRef::Blob(b)) => b,
            Ok(other) => {
                warn!(
                    "load skip: {} row={} (payload is {:?}, not a blob)",
                    full.display(),
                    id,
                    other.data_type()
                );
                record_load_crc_skip();
                continue;
            }
            Err(e) => {
                warn!("load skip: {} row={} ({})", full.display(), id, e);
                record_load_crc_skip();
                continue;
            }
        };

        let calc = crc32(blob);
        if calc != stored {
            warn!(
                "load skip: {} row={} crc mismatch stored={:08X} calc={:08X}",
                full.display(),
                id,
                stored,
                calc
            );
            record_load_crc_skip();
            continue;
        }

        let ts_ms: i64 = row.get(3).unwrap_or_default();
        info!(
            "load row: {} row={} ({} bytes, crc={:08X})",
            full.display(),
            id,
            blob.len(),
            stored
        );
        return Ok(Some(Snapshot {
            id,
            ts_ms,
            crc32: stored,
            data: blob.to_vec(),
        }));
    }

    info!("load: no valid rows in {}", full.display());
    Ok(None)
}
