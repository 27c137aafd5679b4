use anyhow::{anyhow, Context, Result};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

/// Sidecar must exist: inspection commands never create one (open() may still
/// bring an existing sidecar up to the current schema).
pub fn require_db(db: &Path) -> Result<()> {
    if !db.is_file() {
        return Err(anyhow!("no sidecar DB at {}", db.display()));
    }
    Ok(())
}

/// Атомарная запись через tmp+rename.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp = Path::new(&tmp_name);
    {
        let mut f = OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(tmp)
            .with_context(|| format!("open {}", tmp.display()))?;
        f.write_all(bytes)?;
        f.sync_all()?;
    }
    std::fs::rename(tmp, path)
        .with_context(|| format!("rename {} -> {}", tmp.display(), path.display()))?;
    Ok(())
}

pub fn fmt_ts(ts_ms: i64) -> String {
    format!("{}.{:03}", ts_ms / 1000, ts_ms.rem_euclid(1000))
}
