use anyhow::{Context, Result};
use serde::Serialize;
use std::path::PathBuf;

use SramVault::metrics::{self, MetricsSnapshot};
use SramVault::{load_latest, SnapshotDb};

use crate::util::require_db;

#[derive(Serialize)]
struct VerifyReport {
    rows: usize,
    intact: usize,
    corrupt_ids: Vec<i64>,
    untagged: u64,
    tagged: u64,
    /// Row a mount would restore (newest intact).
    restore_id: Option<i64>,
    restore_bytes: Option<usize>,
    /// Счётчики этого процесса (load_crc_skips = пропущенные строки).
    metrics: MetricsSnapshot,
}

pub fn exec(db: PathBuf, json: bool) -> Result<()> {
    require_db(&db)?;
    let sdb = SnapshotDb::open(&db).with_context(|| format!("open {}", db.display()))?;
    let rows = sdb.inspect()?;
    let (untagged, tagged) = sdb.counts()?;
    drop(sdb);

    let latest = load_latest(&db)?;
    let report = VerifyReport {
        rows: rows.len(),
        intact: rows.iter().filter(|r| r.intact).count(),
        corrupt_ids: rows.iter().filter(|r| !r.intact).map(|r| r.id).collect(),
        untagged,
        tagged,
        restore_id: latest.as_ref().map(|s| s.id),
        restore_bytes: latest.as_ref().map(|s| s.data.len()),
        metrics: metrics::snapshot(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    println!("rows:      {} ({} untagged, {} tagged)", report.rows, report.untagged, report.tagged);
    println!("intact:    {}", report.intact);
    if !report.corrupt_ids.is_empty() {
        println!("corrupt:   {:?}", report.corrupt_ids);
    }
    match (report.restore_id, report.restore_bytes) {
        (Some(id), Some(n)) => println!("restore:   row {} ({} bytes)", id, n),
        _ => println!("restore:   (none, mount would start fresh)"),
    }
    println!("crc skips: {}", report.metrics.load_crc_skips);
    Ok(())
}
