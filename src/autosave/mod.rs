//! autosave: поиск и периодическое "нажатие" опции ядра, которая экспортирует save RAM.
//!
//! Состав:
//! - descriptor.rs: разбор строк-дескрипторов в ControlDescriptor;
//! - score.rs: score_label + редуктор best_candidate.
//!
//! Поиск выполняется один раз, лениво: на первом poll, когда есть хотя бы один
//! включённый слот. Результат кэшируется до reset(). Если кандидата нет: работает
//! только таймерный autosave.
//!
//! Срабатывание best-effort: activate(1) затем activate(0), как это делает пользователь.
//! Snapshot store напрямую не вызывается; изменения попадут в БД через dirty/flush.

use log::info;

use crate::clock::Deadline;
use crate::metrics::record_trigger_fire;

pub mod descriptor;
pub mod score;

pub use descriptor::{parse_descriptor, ControlDescriptor, ControlKind};
pub use score::{best_candidate, score_label};

/// Host side of the option menu.
pub trait ControlSurface {
    /// Option descriptor strings, in declaration order.
    fn descriptors(&mut self) -> Vec<String>;

    /// Set an option control on (`active = true`) or off.
    fn set_option(&mut self, option_id: &str, active: bool, exclusive: bool);
}

/// Найденная опция-триггер.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerControl {
    pub option_id: String,
    pub exclusive: bool,
    pub label: String,
    pub score: i32,
}

/// Scan the surface once and pick the best save control.
pub fn detect(controls: &mut dyn ControlSurface) -> Option<TriggerControl> {
    let parsed = controls
        .descriptors()
        .iter()
        .filter_map(|s| parse_descriptor(s))
        .collect::<Vec<_>>();
    best_candidate(parsed).map(|(d, score)| TriggerControl {
        option_id: d.option_id,
        exclusive: d.exclusive,
        label: d.label,
        score,
    })
}

#[derive(Debug, Default)]
pub struct AutosaveState {
    scanned: bool,
    trigger: Option<TriggerControl>,
    fire_deadline: Deadline,
}

impl AutosaveState {
    pub fn trigger(&self) -> Option<&TriggerControl> {
        self.trigger.as_ref()
    }

    pub fn scanned(&self) -> bool {
        self.scanned
    }

    pub fn fire_deadline(&self) -> Deadline {
        self.fire_deadline
    }

    /// One poll tick. Returns true if the trigger fired.
    pub fn poll(
        &mut self,
        any_slot_enabled: bool,
        now_ms: u64,
        interval_ms: u64,
        controls: Option<&mut (dyn ControlSurface + 'static)>,
    ) -> bool {
        if !any_slot_enabled {
            self.fire_deadline.disarm();
            return false;
        }

        let Some(controls) = controls else {
            return false;
        };

        if !self.scanned {
            self.scanned = true;
            self.trigger = detect(controls);
            match &self.trigger {
                Some(t) => info!(
                    "autosave trigger found: opt={} ex={} label={}",
                    t.option_id, t.exclusive, t.label
                ),
                None => info!("autosave trigger not found in core config"),
            }
        }

        let Some(t) = &self.trigger else {
            return false;
        };

        if !self.fire_deadline.is_armed() {
            self.fire_deadline.arm(now_ms, interval_ms);
            return false;
        }
        if !self.fire_deadline.elapsed(now_ms) {
            return false;
        }

        self.fire_deadline.arm(now_ms, interval_ms);
        controls.set_option(&t.option_id, true, t.exclusive);
        controls.set_option(&t.option_id, false, t.exclusive);
        record_trigger_fire();
        info!("autosave trigger fired: opt={} label={}", t.option_id, t.label);
        true
    }
}
