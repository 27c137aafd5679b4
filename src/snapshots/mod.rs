//! snapshots: история CRC-проверенных образов SRAM в sidecar-БД (SQLite).
//!
//! Схема (после миграций):
//!   snapshots(id INTEGER PRIMARY KEY, ts_ms INTEGER NOT NULL, crc32 INTEGER NOT NULL,
//!             sram BLOB NOT NULL, tag TEXT DEFAULT NULL)
//!
//! Правила:
//! - строки неизменяемы; ORDER BY id DESC == порядок свежести;
//! - tag IS NULL: обычный autosave, подлежит retention (HISTORY_LIMIT);
//!   любой non-null tag закрепляет строку навсегда;
//! - insert + trim выполняются в одной транзакции (BEGIN IMMEDIATE ... COMMIT),
//!   наблюдаемы только вместе.
//!
//! Соединение открывается на одну логическую операцию и закрывается в Drop.

use anyhow::{Context, Result};
use log::debug;
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, OpenFlags, TransactionBehavior};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::consts::{BUSY_TIMEOUT_MS, HISTORY_LIMIT, JOURNAL_SIZE_LIMIT};
use crate::metrics::record_snapshot_written;
use crate::util::{absolute, crc32, now_ms};

mod load;

pub use load::load_latest;

/// Восстановленный снапшот.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub id: i64,
    pub ts_ms: i64,
    pub crc32: u32,
    pub data: Vec<u8>,
}

/// Результат insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertReport {
    pub id: i64,
    pub crc32: u32,
    /// Сколько untagged-строк удалено retention-триммингом.
    pub trimmed: usize,
}

/// Метаданные строки для list/verify.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SnapshotInfo {
    pub id: i64,
    pub ts_ms: i64,
    pub crc32: u32,
    pub len: usize,
    pub tag: Option<String>,
    /// Пересчитанный CRC совпал с сохранённым.
    pub intact: bool,
}

pub struct SnapshotDb {
    conn: Connection,
    path: PathBuf,
}

impl SnapshotDb {
    /// Open-or-create the sidecar at `path`, set durability pragmas and run migrations.
    pub fn open(path: &Path) -> Result<Self> {
        let full = absolute(path);
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let mut conn = Connection::open_with_flags(&full, flags)
            .with_context(|| format!("sqlite: cannot open {}", full.display()))?;
        conn.busy_timeout(Duration::from_millis(BUSY_TIMEOUT_MS))?;
        apply_pragmas(&conn).with_context(|| format!("sqlite: pragmas on {}", full.display()))?;
        crate::migrations::apply(&mut conn)
            .with_context(|| format!("sqlite: migrations on {}", full.display()))?;
        Ok(Self { conn, path: full })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Insert an ordinary (untagged) snapshot and trim history to HISTORY_LIMIT.
    pub fn insert(&mut self, data: &[u8]) -> Result<InsertReport> {
        self.insert_row(data, None)
    }

    /// Insert a pinned snapshot. Pinned rows are never trimmed.
    pub fn insert_tagged(&mut self, data: &[u8], tag: &str) -> Result<InsertReport> {
        self.insert_row(data, Some(tag))
    }

    fn insert_row(&mut self, data: &[u8], tag: Option<&str>) -> Result<InsertReport> {
        let crc = crc32(data);

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .context("snapshots: begin")?;
        tx.execute(
            "INSERT INTO snapshots(ts_ms, crc32, sram, tag) VALUES(?1, ?2, ?3, ?4);",
            params![now_ms(), crc as i64, data, tag],
        )
        .context("snapshots: insert")?;
        let id = tx.last_insert_rowid();
        let trimmed = tx
            .execute(
                "DELETE FROM snapshots \
                 WHERE tag IS NULL \
                 AND id NOT IN (SELECT id FROM snapshots WHERE tag IS NULL ORDER BY id DESC LIMIT ?1);",
                params![HISTORY_LIMIT],
            )
            .context("snapshots: retention trim")?;
        tx.commit().context("snapshots: commit")?;

        record_snapshot_written(data.len(), trimmed);
        debug!(
            "snapshots: row={} {} B crc={:08X} trimmed={} db={}",
            id,
            data.len(),
            crc,
            trimmed,
            self.path.display()
        );
        Ok(InsertReport {
            id,
            crc32: crc,
            trimmed,
        })
    }

    /// True if the newest row (any tag) holds exactly `data` (CRC, length and bytes).
    ///
    /// A newest row with a non-integer crc32 or a non-blob payload never matches,
    /// so the caller stores a fresh row on top of it.
    pub fn latest_matches(&self, data: &[u8]) -> Result<bool> {
        let want = crc32(data);
        let mut stmt = self
            .conn
            .prepare("SELECT crc32, sram FROM snapshots ORDER BY id DESC LIMIT 1;")
            .context("snapshots: query latest")?;
        let mut rows = stmt.query([]).context("snapshots: query latest")?;
        let Some(row) = rows.next().context("snapshots: query latest")? else {
            return Ok(false);
        };
        let stored = match row.get_ref(0)? {
            ValueRef::Integer(v) => v as u32,
            _ => return Ok(false),
        };
        let matched = match row.get_ref(1)? {
            ValueRef::Blob(blob) => stored == want && blob.len() == data.len() && blob == data,
            _ => false,
        };
        Ok(matched)
    }

    /// (untagged, tagged) row counts.
    pub fn counts(&self) -> Result<(u64, u64)> {
        let (untagged, tagged): (i64, i64) = self.conn.query_row(
            "SELECT \
               COALESCE(SUM(CASE WHEN tag IS NULL THEN 1 ELSE 0 END), 0), \
               COALESCE(SUM(CASE WHEN tag IS NULL THEN 0 ELSE 1 END), 0) \
             FROM snapshots;",
            [],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )?;
        Ok((untagged as u64, tagged as u64))
    }

    /// Every row newest-first, with a recomputed CRC verdict.
    pub fn inspect(&self) -> Result<Vec<SnapshotInfo>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, ts_ms, crc32, sram, tag FROM snapshots ORDER BY id DESC;")?;
        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            // битый crc32 (не INTEGER) => строка показывается как повреждённая
            let stored = match row.get_ref(2)? {
                ValueRef::Integer(v) => Some(v as u32),
                _ => None,
            };
            let (len, intact) = match row.get_ref(3)? {
                ValueRef::Blob(b) => (b.len(), stored == Some(crc32(b))),
                _ => (0, false),
            };
            out.push(SnapshotInfo {
                id: row.get(0)?,
                ts_ms: row.get(1)?,
                crc32: stored.unwrap_or(0),
                len,
                tag: row.get(4)?,
                intact,
            });
        }
        Ok(out)
    }
}

fn apply_pragmas(conn: &Connection) -> Result<()> {
    // journal_mode и journal_size_limit возвращают строку: читаем её.
    let mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "PERSIST", |r| r.get(0))?;
    if !mode.eq_ignore_ascii_case("persist") {
        debug!("sqlite: journal_mode is {} (wanted persist)", mode);
    }
    conn.pragma_update(None, "synchronous", "FULL")?;
    conn.pragma_update(None, "auto_vacuum", "NONE")?;
    conn.pragma_update(None, "temp_store", "MEMORY")?;
    let limit: i64 = conn.pragma_update_and_check(
        None,
        "journal_size_limit",
        JOURNAL_SIZE_LIMIT,
        |r| r.get(0),
    )?;
    if limit != JOURNAL_SIZE_LIMIT {
        debug!("sqlite: journal_size_limit is {} (wanted {})", limit, JOURNAL_SIZE_LIMIT);
    }
    Ok(())
}
