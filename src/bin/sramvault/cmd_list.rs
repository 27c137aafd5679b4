use anyhow::{Context, Result};
use std::path::PathBuf;

use SramVault::SnapshotDb;

use crate::util::{fmt_ts, require_db};

pub fn exec(db: PathBuf, json: bool) -> Result<()> {
    require_db(&db)?;
    let sdb = SnapshotDb::open(&db).with_context(|| format!("open {}", db.display()))?;
    let rows = sdb.inspect()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }
    if rows.is_empty() {
        println!("(no snapshots)");
        return Ok(());
    }
    println!("{:>8}  {:>17}  {:>8}  {:>8}  {:<5}  tag", "id", "ts", "crc32", "bytes", "ok");
    for r in rows {
        println!(
            "{:>8}  {:>17}  {:08X}  {:>8}  {:<5}  {}",
            r.id,
            fmt_ts(r.ts_ms),
            r.crc32,
            r.len,
            if r.intact { "yes" } else { "NO" },
            r.tag.as_deref().unwrap_or("-"),
        );
    }
    Ok(())
}
