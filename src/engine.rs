//! SramEngine: публичная поверхность для хоста.
//!
//! Владеет таблицей слотов (MAX_SLOTS), записью autosave, конфигом, часами и
//! (опционально) ControlSurface. Хост создаёт один экземпляр и вызывает poll()
//! с фиксированной частотой. Всё синхронно: каждая операция завершается внутри вызова.
//!
//! Ошибки не пересекают границу: mount -> bool, flush -> FlushOutcome, остальное: no-op.

use log::{debug, error};
use std::path::Path;

use crate::autosave::{AutosaveState, ControlSurface, TriggerControl};
use crate::clock::{Clock, MonotonicClock};
use crate::config::SramConfig;
use crate::consts::MAX_SLOTS;
use crate::flush::{poll_flush, try_flush, FlushOutcome};
use crate::image::SramImage;
use crate::slots::{SlotStatus, SlotTable};

/// What one poll tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollReport {
    pub trigger_fired: bool,
    pub flushed: Vec<(usize, FlushOutcome)>,
}

pub struct SramEngine<C: Clock = MonotonicClock> {
    cfg: SramConfig,
    clock: C,
    slots: SlotTable,
    autosave: AutosaveState,
    controls: Option<Box<dyn ControlSurface>>,
}

impl SramEngine<MonotonicClock> {
    pub fn new(cfg: SramConfig) -> Self {
        Self::with_clock(cfg, MonotonicClock::new())
    }
}

impl<C: Clock> SramEngine<C> {
    pub fn with_clock(cfg: SramConfig, clock: C) -> Self {
        debug!("engine: {}", cfg);
        Self {
            cfg,
            clock,
            slots: SlotTable::new(),
            autosave: AutosaveState::default(),
            controls: None,
        }
    }

    pub fn config(&self) -> &SramConfig {
        &self.cfg
    }

    /// Replace the configuration; in-memory slot/autosave state is reset.
    pub fn set_config(&mut self, cfg: SramConfig) {
        self.cfg = cfg;
        self.reset();
    }

    /// Install the option menu used by the autosave trigger detector.
    pub fn set_controls(&mut self, controls: Box<dyn ControlSurface>) {
        self.controls = Some(controls);
        self.autosave = AutosaveState::default();
    }

    pub fn runtime_enabled(&self) -> bool {
        self.cfg.autosave_enabled
    }

    /// Forget all slots and the cached autosave trigger.
    pub fn reset(&mut self) {
        self.slots.clear();
        self.autosave = AutosaveState::default();
    }

    /// Bind `image` to `slot`, restoring the newest intact snapshot of `save_path`.
    pub fn mount(
        &mut self,
        slot: usize,
        save_path: impl AsRef<Path>,
        preallocated_size: usize,
        image: Box<dyn SramImage>,
    ) -> bool {
        let save_path = save_path.as_ref();
        if !self.runtime_enabled() {
            return false;
        }
        if slot >= MAX_SLOTS || save_path.as_os_str().is_empty() {
            return false;
        }

        match self
            .slots
            .mount(slot, &self.cfg, save_path, preallocated_size, image)
        {
            Ok(r) => {
                debug!("engine: slot {} mounted ({:?})", slot, r);
                true
            }
            Err(e) => {
                error!("engine: slot {} mount failed: {:#}", slot, e);
                false
            }
        }
    }

    /// Clear the slot without flushing. Returns the image that was bound.
    pub fn unmount(&mut self, slot: usize) -> Option<Box<dyn SramImage>> {
        self.slots.unmount(slot)
    }

    pub fn mark_dirty(&mut self, slot: usize) {
        if !self.runtime_enabled() {
            return;
        }
        let now = self.clock.now_ms();
        self.slots.mark_dirty(slot, now, self.cfg.interval_ms());
    }

    /// Immediate flush attempt, ignoring the timer.
    pub fn flush(&mut self, slot: usize) -> FlushOutcome {
        if !self.runtime_enabled() {
            return FlushOutcome::Idle;
        }
        let now = self.clock.now_ms();
        match self.slots.get_mut(slot) {
            Some(state) => try_flush(state, now),
            None => FlushOutcome::Idle,
        }
    }

    /// Periodic tick: autosave trigger, then due flushes.
    pub fn poll(&mut self) -> PollReport {
        if !self.runtime_enabled() {
            return PollReport::default();
        }
        let now = self.clock.now_ms();
        let trigger_fired = self.autosave.poll(
            self.slots.any_enabled(),
            now,
            self.cfg.interval_ms(),
            self.controls.as_deref_mut(),
        );
        let flushed = poll_flush(&mut self.slots, now);
        PollReport {
            trigger_fired,
            flushed,
        }
    }

    /// Host access to a mounted image (the emulated core writes through it).
    pub fn image_mut(&mut self, slot: usize) -> Option<&mut (dyn SramImage + 'static)> {
        self.slots.get_mut(slot)?.image.as_deref_mut()
    }

    pub fn slot_status(&self, slot: usize) -> Option<SlotStatus> {
        self.slots.get(slot).map(|s| s.status())
    }

    pub fn autosave_trigger(&self) -> Option<&TriggerControl> {
        self.autosave.trigger()
    }

    pub fn autosave(&self) -> &AutosaveState {
        &self.autosave
    }
}
