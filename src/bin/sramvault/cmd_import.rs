use anyhow::Result;
use std::path::PathBuf;

use SramVault::util::sidecar_path;
use SramVault::{import_legacy, LegacyImport};

pub fn exec(save: PathBuf) -> Result<()> {
    let db = sidecar_path(&save);
    match import_legacy(&save, &db)? {
        LegacyImport::Imported(n) => {
            println!("import: {} -> {} ({} bytes)", save.display(), db.display(), n)
        }
        LegacyImport::SidecarExists => {
            println!("import: skipped, {} already exists", db.display())
        }
        LegacyImport::NoLegacyFile => {
            println!("import: skipped, no legacy save at {}", save.display())
        }
    }
    Ok(())
}
