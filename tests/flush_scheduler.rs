// tests/flush_scheduler.rs
//
// Отложенный flush: таймер после mark_dirty, dedup, повтор через 60 с после сбоя,
// порядок слотов.

use anyhow::{anyhow, Result};
use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use SramVault::consts::RETRY_MS;
use SramVault::util::sidecar_path;
use SramVault::{
    load_latest, FlushOutcome, ManualClock, MemImage, SnapshotDb, SramConfig, SramEngine,
    SramImage,
};

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

fn engine_at(root: &Path, clock: &ManualClock) -> SramEngine<ManualClock> {
    let cfg = SramConfig::default()
        .with_autosave_enabled(true)
        .with_autosave_interval_secs(10)
        .with_tmp_dir(root)
        .build();
    SramEngine::with_clock(cfg, clock.clone())
}

/// MemImage, чтение которого можно "сломать" снаружи.
struct FlakyImage {
    inner: MemImage,
    fail_reads: Rc<Cell<bool>>,
}

impl SramImage for FlakyImage {
    fn open_scratch(&mut self, path: &Path) -> Result<()> {
        self.inner.open_scratch(path)
    }
    fn size(&self) -> Result<u64> {
        self.inner.size()
    }
    fn read_all(&mut self) -> Result<Vec<u8>> {
        if self.fail_reads.get() {
            return Err(anyhow!("simulated read failure"));
        }
        self.inner.read_all()
    }
    fn write_at(&mut self, offset: u64, data: &[u8]) -> Result<()> {
        self.inner.write_at(offset, data)
    }
    fn set_dynamic(&mut self) {
        self.inner.set_dynamic()
    }
    fn is_dynamic(&self) -> bool {
        self.inner.is_dynamic()
    }
    fn path(&self) -> Option<&Path> {
        self.inner.path()
    }
    fn close(&mut self) {}
}

fn write(engine: &mut SramEngine<ManualClock>, slot: usize, off: u64, data: &[u8]) -> Result<()> {
    engine
        .image_mut(slot)
        .ok_or_else(|| anyhow!("slot {} not mounted", slot))?
        .write_at(off, data)
}

#[test]
fn dirty_slot_flushes_after_interval() -> Result<()> {
    let root = unique_root("flush-timer");
    let clock = ManualClock::new();
    let mut engine = engine_at(&root, &clock);
    let save = root.join("t.sav");

    assert!(engine.mount(0, &save, 4, Box::new(MemImage::new())));
    write(&mut engine, 0, 0, b"AB")?;
    clock.set(1_000);
    engine.mark_dirty(0);
    assert_eq!(engine.slot_status(0).unwrap().flush_deadline_ms, Some(11_000));

    // повторный mark_dirty не двигает таймер
    clock.set(5_000);
    engine.mark_dirty(0);
    assert_eq!(engine.slot_status(0).unwrap().flush_deadline_ms, Some(11_000));

    clock.set(10_999);
    assert!(engine.poll().flushed.is_empty());

    clock.set(11_000);
    assert_eq!(engine.poll().flushed, vec![(0, FlushOutcome::Saved(4))]);

    let st = engine.slot_status(0).unwrap();
    assert!(!st.dirty);
    assert_eq!(st.flush_deadline_ms, None);

    let snap = load_latest(&sidecar_path(&save))?.expect("snapshot written");
    assert_eq!(snap.data, vec![b'A', b'B', 0xFF, 0xFF]);
    Ok(())
}

#[test]
fn unchanged_image_is_not_stored_twice() -> Result<()> {
    let root = unique_root("flush-dedup");
    let clock = ManualClock::new();
    let mut engine = engine_at(&root, &clock);
    let save = root.join("d.sav");

    assert!(engine.mount(0, &save, 16, Box::new(MemImage::new())));
    write(&mut engine, 0, 3, b"xyz")?;
    engine.mark_dirty(0);
    assert_eq!(engine.flush(0), FlushOutcome::Saved(16));

    engine.mark_dirty(0);
    assert_eq!(engine.flush(0), FlushOutcome::Unchanged(16));
    assert!(!engine.slot_status(0).unwrap().dirty);

    assert_eq!(SnapshotDb::open(&sidecar_path(&save))?.counts()?, (1, 0));

    // чистый слот: нечего делать
    assert_eq!(engine.flush(0), FlushOutcome::Idle);
    assert_eq!(engine.flush(9), FlushOutcome::Idle);
    Ok(())
}

#[test]
fn failed_flush_retries_after_sixty_seconds() -> Result<()> {
    let root = unique_root("flush-retry");
    let clock = ManualClock::new();
    let mut engine = engine_at(&root, &clock);
    let save = root.join("r.sav");

    let fail = Rc::new(Cell::new(false));
    let img = FlakyImage {
        inner: MemImage::new(),
        fail_reads: fail.clone(),
    };
    assert!(engine.mount(0, &save, 8, Box::new(img)));
    write(&mut engine, 0, 0, b"SAVE")?;
    engine.mark_dirty(0);

    fail.set(true);
    clock.set(10_000);
    assert_eq!(engine.poll().flushed, vec![(0, FlushOutcome::Failed)]);

    let st = engine.slot_status(0).unwrap();
    assert!(st.dirty, "failure must keep the slot dirty");
    assert_eq!(st.flush_deadline_ms, Some(10_000 + RETRY_MS));
    assert!(!sidecar_path(&save).exists());

    // до истечения retry: ничего
    clock.advance(RETRY_MS - 1);
    assert!(engine.poll().flushed.is_empty());

    fail.set(false);
    clock.advance(1);
    assert_eq!(engine.poll().flushed, vec![(0, FlushOutcome::Saved(8))]);
    let st = engine.slot_status(0).unwrap();
    assert!(!st.dirty);
    assert_eq!(st.flush_deadline_ms, None);

    let snap = load_latest(&sidecar_path(&save))?.expect("retry stored the image");
    assert_eq!(&snap.data[..4], b"SAVE");
    Ok(())
}

#[test]
fn due_slots_flush_in_slot_order() -> Result<()> {
    let root = unique_root("flush-order");
    let clock = ManualClock::new();
    let mut engine = engine_at(&root, &clock);

    for slot in [7usize, 2, 11] {
        let save = root.join(format!("s{}.sav", slot));
        assert!(engine.mount(slot, &save, 2, Box::new(MemImage::new())));
    }
    for slot in [11usize, 7, 2] {
        write(&mut engine, slot, 0, &[slot as u8])?;
        engine.mark_dirty(slot);
    }

    clock.set(10_000);
    let flushed = engine.poll().flushed;
    assert_eq!(
        flushed,
        vec![
            (2, FlushOutcome::Saved(2)),
            (7, FlushOutcome::Saved(2)),
            (11, FlushOutcome::Saved(2)),
        ]
    );
    Ok(())
}

#[test]
fn remount_restores_flushed_content() -> Result<()> {
    let root = unique_root("flush-remount");
    let clock = ManualClock::new();
    let mut engine = engine_at(&root, &clock);
    let save = root.join("cycle.sav");

    assert!(engine.mount(0, &save, 8, Box::new(MemImage::new())));
    write(&mut engine, 0, 0, &[9, 8, 7, 6, 5, 4, 3, 2])?;
    engine.mark_dirty(0);
    assert_eq!(engine.flush(0), FlushOutcome::Saved(8));

    engine.reset();
    assert!(!engine.slot_status(0).unwrap().enabled);

    assert!(engine.mount(0, &save, 8, Box::new(MemImage::new())));
    let data = engine.image_mut(0).unwrap().read_all()?;
    assert_eq!(data, vec![9, 8, 7, 6, 5, 4, 3, 2]);
    Ok(())
}

/// Положить поверх целой строки "good" более новую строку с битым типом колонки.
fn seed_with_broken_newest(save: &Path, broken_sql: &str) -> Result<()> {
    let mut db = SnapshotDb::open(&sidecar_path(save))?;
    db.insert(b"good")?;
    db.conn().execute(broken_sql, [])?;
    Ok(())
}

#[test]
fn non_blob_newest_row_does_not_block_flush() -> Result<()> {
    let root = unique_root("flush-nonblob");
    let clock = ManualClock::new();
    let mut engine = engine_at(&root, &clock);
    let save = root.join("nb.sav");
    seed_with_broken_newest(
        &save,
        "INSERT INTO snapshots(ts_ms, crc32, sram) VALUES(0, 0, 'good');",
    )?;

    assert!(engine.mount(0, &save, 8, Box::new(MemImage::new())));
    // восстановлена целая строка, TEXT-строка пропущена
    assert_eq!(
        engine.image_mut(0).unwrap().read_all()?,
        vec![b'g', b'o', b'o', b'd', 0xFF, 0xFF, 0xFF, 0xFF]
    );

    write(&mut engine, 0, 0, b"NEWSAVE!")?;
    engine.mark_dirty(0);
    assert_eq!(engine.flush(0), FlushOutcome::Saved(8));
    assert!(!engine.slot_status(0).unwrap().dirty);

    let snap = load_latest(&sidecar_path(&save))?.expect("new row must be stored");
    assert_eq!(snap.data, b"NEWSAVE!".to_vec());
    Ok(())
}

#[test]
fn text_crc_in_newest_row_does_not_block_flush() -> Result<()> {
    let root = unique_root("flush-textcrc");
    let clock = ManualClock::new();
    let mut engine = engine_at(&root, &clock);
    let save = root.join("tc.sav");
    seed_with_broken_newest(
        &save,
        "INSERT INTO snapshots(ts_ms, crc32, sram) VALUES(0, 'garbage', x'00');",
    )?;

    assert!(engine.mount(0, &save, 4, Box::new(MemImage::new())));
    // тот же контент, что у целой строки: TEXT crc не должен считаться совпадением
    engine.mark_dirty(0);
    assert_eq!(engine.flush(0), FlushOutcome::Saved(4));

    let db = SnapshotDb::open(&sidecar_path(&save))?;
    assert_eq!(db.counts()?, (3, 0));
    assert!(db.latest_matches(b"good")?);
    Ok(())
}
