use anyhow::{anyhow, Result};
use std::path::PathBuf;

use SramVault::{load_latest, SnapshotDb};

use crate::util::require_db;

/// Закрепить последний целый снапшот: новая строка с tag (строки неизменяемы).
pub fn exec(db: PathBuf, tag: String) -> Result<()> {
    let tag = tag.trim();
    if tag.is_empty() {
        return Err(anyhow!("provide a non-empty --tag"));
    }
    require_db(&db)?;
    let snap = load_latest(&db)?
        .ok_or_else(|| anyhow!("no intact snapshot in {}", db.display()))?;
    let mut sdb = SnapshotDb::open(&db)?;
    let rep = sdb.insert_tagged(&snap.data, tag)?;
    println!(
        "pin: row={} (copy of row {}) tag={} crc={:08X}",
        rep.id, snap.id, tag, rep.crc32
    );
    Ok(())
}
