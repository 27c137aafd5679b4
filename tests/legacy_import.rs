// tests/legacy_import.rs
//
// Одноразовый импорт плоского save-файла в sidecar-БД.

use anyhow::Result;
use std::path::PathBuf;

use SramVault::util::sidecar_path;
use SramVault::{import_legacy, load_latest, LegacyImport, SnapshotDb};

fn unique_root(prefix: &str) -> PathBuf {
    let pid = std::process::id();
    let t = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let root = std::env::temp_dir().join(format!("sramv-{}-{}-{}", prefix, pid, t));
    std::fs::create_dir_all(&root).unwrap();
    root
}

#[test]
fn imports_flat_file_as_first_snapshot() -> Result<()> {
    let root = unique_root("legacy-ok");
    let save = root.join("game.srm");
    let payload: Vec<u8> = (0..=255u8).cycle().take(8192).collect();
    std::fs::write(&save, &payload)?;

    let db = sidecar_path(&save);
    assert_eq!(import_legacy(&save, &db)?, LegacyImport::Imported(8192));

    let snap = load_latest(&db)?.expect("imported row");
    assert_eq!(snap.data, payload);
    assert!(save.exists(), "legacy file is left in place");
    Ok(())
}

#[test]
fn existing_sidecar_is_never_overwritten() -> Result<()> {
    let root = unique_root("legacy-exists");
    let save = root.join("game.srm");
    std::fs::write(&save, b"legacy")?;
    let db = sidecar_path(&save);
    {
        let mut sdb = SnapshotDb::open(&db)?;
        sdb.insert(b"newer")?;
    }

    assert_eq!(import_legacy(&save, &db)?, LegacyImport::SidecarExists);
    assert_eq!(load_latest(&db)?.map(|s| s.data), Some(b"newer".to_vec()));
    Ok(())
}

#[test]
fn missing_legacy_file_is_a_noop() -> Result<()> {
    let root = unique_root("legacy-missing");
    let save = root.join("none.srm");
    let db = sidecar_path(&save);

    assert_eq!(import_legacy(&save, &db)?, LegacyImport::NoLegacyFile);
    assert!(!db.exists());
    Ok(())
}

#[test]
fn empty_legacy_file_imports_empty_snapshot() -> Result<()> {
    let root = unique_root("legacy-empty");
    let save = root.join("empty.srm");
    std::fs::write(&save, b"")?;
    let db = sidecar_path(&save);

    assert_eq!(import_legacy(&save, &db)?, LegacyImport::Imported(0));
    assert_eq!(SnapshotDb::open(&db)?.counts()?, (1, 0));
    Ok(())
}

#[test]
fn failed_import_leaves_no_sidecar() -> Result<()> {
    let root = unique_root("legacy-fail");
    let save = root.join("game.srm");
    std::fs::write(&save, b"legacy")?;

    // каталог БД не существует: open должен упасть
    let db = root.join("no-such-dir").join("game.srm.sqlite3");
    assert!(import_legacy(&save, &db).is_err());
    assert!(!db.exists());
    assert!(!SramVault::util::journal_path(&db).exists());
    Ok(())
}
