//! slots: жизненный цикл слотов SRAM (configure / mount / unmount / mark_dirty).
//!
//! Слот связывает backing store (SramImage) с sidecar-БД <save_path>.sqlite3.
//! Ёмкость фиксирована (MAX_SLOTS); один живой образ на слот.
//!
//! Mount:
//! 1) привязать слот, создать/усечь scratch <tmp_dir>/sram_slot_<n>.bin;
//! 2) если sidecar есть: прогнать миграции (сбой => warn);
//! 3) legacy-импорт (сбой => warn);
//! 4) load_latest (сбой => warn, как "нет снапшота");
//! 5) restore + 0xFF-паддинг / 0xFF-заливка / dynamic. Сбой здесь фатален для mount.

use anyhow::{anyhow, Context, Result};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};

use crate::clock::Deadline;
use crate::config::SramConfig;
use crate::consts::{MAX_SLOTS, SCRATCH_EXT, SCRATCH_PREFIX};
use crate::image::{fill_erased, SramImage};
use crate::legacy::{import_legacy, LegacyImport};
use crate::snapshots::{load_latest, SnapshotDb};
use crate::util::sidecar_path;

#[derive(Default)]
pub struct SlotState {
    pub(crate) enabled: bool,
    pub(crate) dirty: bool,
    pub(crate) flush_deadline: Deadline,
    pub(crate) image: Option<Box<dyn SramImage>>,
    pub(crate) save_path: PathBuf,
    pub(crate) db_path: PathBuf,
}

/// Снимок состояния слота для хоста/тестов.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotStatus {
    pub enabled: bool,
    pub dirty: bool,
    pub flush_deadline_ms: Option<u64>,
    pub save_path: PathBuf,
    pub db_path: PathBuf,
}

/// Как был заполнен образ при mount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Restore {
    /// Snapshot bytes written, `padded` bytes of 0xFF appended.
    Snapshot { bytes: usize, padded: usize },
    /// No snapshot: whole preallocated region erased to 0xFF.
    Erased(usize),
    /// No snapshot and no preallocation: image left empty and dynamic.
    Dynamic,
}

impl SlotState {
    /// Reset the record. A path enables the slot and derives db_path.
    /// Returns the previously bound image, if any.
    pub(crate) fn configure(
        &mut self,
        image: Option<Box<dyn SramImage>>,
        save_path: Option<&Path>,
    ) -> Option<Box<dyn SramImage>> {
        let prev = std::mem::take(self).image;
        self.image = image;
        if let Some(p) = save_path.filter(|p| !p.as_os_str().is_empty()) {
            self.enabled = true;
            self.save_path = p.to_path_buf();
            self.db_path = sidecar_path(p);
        }
        prev
    }

    pub fn status(&self) -> SlotStatus {
        SlotStatus {
            enabled: self.enabled,
            dirty: self.dirty,
            flush_deadline_ms: self.flush_deadline.at_ms(),
            save_path: self.save_path.clone(),
            db_path: self.db_path.clone(),
        }
    }
}

/// <tmp_dir>/sram_slot_<n>.bin
pub fn scratch_path(tmp_dir: &Path, slot: usize) -> PathBuf {
    tmp_dir.join(format!("{}{}.{}", SCRATCH_PREFIX, slot, SCRATCH_EXT))
}

/// Write the restored snapshot (or erased/dynamic region) into the image.
pub fn restore_into(
    img: &mut dyn SramImage,
    snapshot: Option<&[u8]>,
    pre_size: usize,
) -> Result<Restore> {
    match snapshot.filter(|d| !d.is_empty()) {
        Some(data) => {
            img.write_at(0, data).context("restore snapshot")?;
            let padded = pre_size.saturating_sub(data.len());
            if padded > 0 {
                fill_erased(img, data.len() as u64, padded).context("pad snapshot")?;
            }
            Ok(Restore::Snapshot {
                bytes: data.len(),
                padded,
            })
        }
        None if pre_size > 0 => {
            fill_erased(img, 0, pre_size).context("erase image")?;
            Ok(Restore::Erased(pre_size))
        }
        None => {
            img.set_dynamic();
            Ok(Restore::Dynamic)
        }
    }
}

pub struct SlotTable {
    slots: [SlotState; MAX_SLOTS],
}

impl Default for SlotTable {
    fn default() -> Self {
        Self {
            slots: std::array::from_fn(|_| SlotState::default()),
        }
    }
}

impl SlotTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, slot: usize) -> Option<&SlotState> {
        self.slots.get(slot)
    }

    pub(crate) fn get_mut(&mut self, slot: usize) -> Option<&mut SlotState> {
        self.slots.get_mut(slot)
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (usize, &mut SlotState)> {
        self.slots.iter_mut().enumerate()
    }

    pub fn any_enabled(&self) -> bool {
        self.slots.iter().any(|s| s.enabled)
    }

    /// Reset every slot (drops bound images).
    pub fn clear(&mut self) {
        for s in self.slots.iter_mut() {
            s.configure(None, None);
        }
    }

    pub fn mount(
        &mut self,
        slot: usize,
        cfg: &SramConfig,
        save_path: &Path,
        pre_size: usize,
        mut image: Box<dyn SramImage>,
    ) -> Result<Restore> {
        if slot >= MAX_SLOTS {
            return Err(anyhow!("mount: slot {} out of range", slot));
        }
        if save_path.as_os_str().is_empty() {
            return Err(anyhow!("mount: empty save path"));
        }

        let save = cfg.resolve(save_path);
        let db = sidecar_path(&save);
        let state = &mut self.slots[slot];
        state.configure(None, Some(&save));

        let scratch = scratch_path(&cfg.tmp_dir, slot);
        if let Err(e) = image.open_scratch(&scratch) {
            state.configure(None, None);
            return Err(e).with_context(|| {
                format!("mount: failed to create scratch image {}", scratch.display())
            });
        }

        if db.exists() {
            if let Err(e) = SnapshotDb::open(&db) {
                warn!("mount: DB migration check failed for {}: {:#}", save.display(), e);
            }
        }

        match import_legacy(&save, &db) {
            Ok(LegacyImport::Imported(n)) => debug!("mount: slot {} imported {} B legacy", slot, n),
            Ok(_) => {}
            Err(e) => warn!("mount: legacy save migration failed for {}: {:#}", save.display(), e),
        }

        let latest = match load_latest(&db) {
            Ok(s) => s,
            Err(e) => {
                warn!("mount: failed to load latest snapshot for {}: {:#}", save.display(), e);
                None
            }
        };

        match restore_into(
            image.as_mut(),
            latest.as_ref().map(|s| s.data.as_slice()),
            pre_size,
        ) {
            Ok(r) => {
                if let Restore::Snapshot { bytes, .. } = r {
                    info!("mount: loaded {} ({} bytes)", save.display(), bytes);
                }
                state.image = Some(image);
                Ok(r)
            }
            Err(e) => {
                image.close();
                state.configure(None, None);
                Err(e).with_context(|| format!("mount: failed to restore {}", save.display()))
            }
        }
    }

    /// Clear the record without flushing; hands the image back.
    pub fn unmount(&mut self, slot: usize) -> Option<Box<dyn SramImage>> {
        self.slots.get_mut(slot)?.configure(None, None)
    }

    /// Mark dirty; arm a flush at `interval_ms` if none is pending.
    pub fn mark_dirty(&mut self, slot: usize, now_ms: u64, interval_ms: u64) {
        let Some(state) = self.slots.get_mut(slot) else {
            return;
        };
        if !state.enabled {
            return;
        }
        state.dirty = true;
        if !state.flush_deadline.is_armed() {
            state.flush_deadline.arm(now_ms, interval_ms);
        }
    }
}
