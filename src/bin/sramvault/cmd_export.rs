use anyhow::{anyhow, Result};
use std::path::PathBuf;

use SramVault::load_latest;

use crate::util::{require_db, write_atomic};

pub fn exec(db: PathBuf, out: PathBuf) -> Result<()> {
    require_db(&db)?;
    let snap = load_latest(&db)?
        .ok_or_else(|| anyhow!("no intact snapshot in {}", db.display()))?;
    write_atomic(&out, &snap.data)?;
    println!(
        "export: row={} {} bytes crc={:08X} -> {}",
        snap.id,
        snap.data.len(),
        snap.crc32,
        out.display()
    );
    Ok(())
}
