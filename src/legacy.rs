//! legacy: одноразовый импорт старого плоского save-файла в sidecar-БД.
//!
//! Формат legacy: файл без заголовка, всё содержимое: образ RAM.
//!
//! Правила:
//! - sidecar уже существует => no-op (импорт был или БД создана иначе);
//! - legacy-файла нет => no-op;
//! - иначе: прочитать целиком, открыть/создать БД, вставить первым снапшотом;
//! - при сбое после создания БД: удалить её (и rollback journal), чтобы следующий mount
//!   повторил импорт с чистого листа.

use anyhow::{Context, Result};
use log::{info, warn};
use std::path::Path;

use crate::metrics::record_legacy_import;
use crate::snapshots::SnapshotDb;
use crate::util::{absolute, journal_path};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyImport {
    /// Sidecar already present.
    SidecarExists,
    /// No legacy file at save_path.
    NoLegacyFile,
    /// Imported N bytes as the first snapshot.
    Imported(usize),
}

pub fn import_legacy(save_path: &Path, db_path: &Path) -> Result<LegacyImport> {
    let save = absolute(save_path);
    let db = absolute(db_path);

    if db.exists() {
        return Ok(LegacyImport::SidecarExists);
    }
    if !save.is_file() {
        return Ok(LegacyImport::NoLegacyFile);
    }

    let data = std::fs::read(&save)
        .with_context(|| format!("legacy: failed to read legacy save {}", save.display()))?;

    let res = SnapshotDb::open(&db).and_then(|mut sdb| sdb.insert(&data));
    if let Err(e) = res {
        remove_partial(&db);
        return Err(e).with_context(|| {
            format!(
                "legacy: failed to import {} into {}",
                save.display(),
                db.display()
            )
        });
    }

    record_legacy_import();
    info!(
        "legacy: migrated legacy save {} -> {} ({} bytes)",
        save.display(),
        db.display(),
        data.len()
    );
    Ok(LegacyImport::Imported(data.len()))
}

fn remove_partial(db: &Path) {
    for p in [db.to_path_buf(), journal_path(db)] {
        if p.exists() {
            if let Err(e) = std::fs::remove_file(&p) {
                warn!("legacy: cannot remove partial {}: {}", p.display(), e);
            }
        }
    }
}
