#![allow(non_snake_case)]

// Базовые модули
pub mod consts;
pub mod config;
pub mod metrics;
pub mod util;
pub mod clock;

// Хранилище: миграции + снапшоты в sidecar SQLite
pub mod migrations; // src/migrations/{mod.rs, sql/*.sql}
pub mod snapshots;  // src/snapshots/{mod,load}.rs
pub mod legacy;

// Слоты и планировщик
pub mod image;
pub mod slots;
pub mod flush;
pub mod autosave;   // src/autosave/{mod,descriptor,score}.rs

pub mod engine;

// Удобные реэкспорты
pub use autosave::{ControlSurface, TriggerControl};
pub use clock::{Clock, Deadline, ManualClock, MonotonicClock};
pub use config::SramConfig;
pub use engine::{PollReport, SramEngine};
pub use flush::FlushOutcome;
pub use image::{FileImage, MemImage, SramImage};
pub use legacy::{import_legacy, LegacyImport};
pub use slots::{Restore, SlotStatus};
pub use snapshots::{load_latest, Snapshot, SnapshotDb, SnapshotInfo};
