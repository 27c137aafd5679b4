//! flush: перенос грязных слотов в sidecar-БД.
//!
//! Одна попытка: прочитать образ целиком -> открыть БД -> latest_matches ->
//! (совпало: просто снять dirty) | insert. Успех снимает dirty и deadline.
//! Сбой на любом шаге: deadline = now + RETRY_MS, dirty остаётся.

use anyhow::{Context, Result};
use log::{info, warn};

use crate::consts::RETRY_MS;
use crate::metrics::{record_flush_failure, record_flush_unchanged};
use crate::slots::{SlotState, SlotTable};
use crate::snapshots::SnapshotDb;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing to do (slot disabled, clean or without an image).
    Idle,
    /// New snapshot stored (bytes).
    Saved(usize),
    /// Image equals the newest stored snapshot; nothing written (bytes).
    Unchanged(usize),
    /// Attempt failed; a retry is armed.
    Failed,
}

fn flush_once(state: &mut SlotState) -> Result<FlushOutcome> {
    let Some(image) = state.image.as_mut() else {
        return Ok(FlushOutcome::Idle);
    };
    let data = image.read_all().context("flush: read image")?;

    let mut db = SnapshotDb::open(&state.db_path)?;
    if db.latest_matches(&data)? {
        return Ok(FlushOutcome::Unchanged(data.len()));
    }
    db.insert(&data)?;
    Ok(FlushOutcome::Saved(data.len()))
}

/// One flush attempt for a slot, regardless of its deadline.
pub(crate) fn try_flush(state: &mut SlotState, now_ms: u64) -> FlushOutcome {
    if !state.enabled || !state.dirty || state.image.is_none() {
        return FlushOutcome::Idle;
    }

    match flush_once(state) {
        Ok(FlushOutcome::Idle) => FlushOutcome::Idle,
        Ok(outcome) => {
            state.dirty = false;
            state.flush_deadline.disarm();
            match outcome {
                FlushOutcome::Saved(n) => {
                    info!("flush: saved {} ({} bytes)", state.save_path.display(), n)
                }
                FlushOutcome::Unchanged(n) => {
                    record_flush_unchanged();
                    info!("flush: unchanged {} ({} bytes)", state.save_path.display(), n)
                }
                _ => {}
            }
            outcome
        }
        Err(e) => {
            record_flush_failure();
            state.flush_deadline.arm(now_ms, RETRY_MS);
            warn!(
                "flush: {} failed, retry in {} ms: {:#}",
                state.save_path.display(),
                RETRY_MS,
                e
            );
            FlushOutcome::Failed
        }
    }
}

/// Flush every enabled dirty slot whose deadline elapsed, in slot order.
pub(crate) fn poll_flush(table: &mut SlotTable, now_ms: u64) -> Vec<(usize, FlushOutcome)> {
    let mut out = Vec::new();
    for (i, state) in table.iter_mut() {
        if !state.enabled || !state.dirty || !state.flush_deadline.elapsed(now_ms) {
            continue;
        }
        out.push((i, try_flush(state, now_ms)));
    }
    out
}
