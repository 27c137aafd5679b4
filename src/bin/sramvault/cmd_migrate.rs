use anyhow::{Context, Result};
use std::path::PathBuf;

use SramVault::migrations;
use SramVault::SnapshotDb;

use crate::util::fmt_ts;

pub fn exec(db: PathBuf, json: bool) -> Result<()> {
    // open() создаёт БД при отсутствии и применяет миграции
    let sdb = SnapshotDb::open(&db).with_context(|| format!("open {}", db.display()))?;
    let ledger = migrations::applied(sdb.conn())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&ledger)?);
        return Ok(());
    }
    for m in ledger {
        println!("{}  applied {}", m.name, fmt_ts(m.applied_ts_ms));
    }
    Ok(())
}
