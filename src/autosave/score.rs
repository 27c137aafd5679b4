//! Эвристика: какая опция ядра означает "записать save-данные сейчас".
//!
//! Чистая функция над label (без разбора строк-дескрипторов) + редуктор max-by-score.

use log::debug;

use super::descriptor::ControlDescriptor;

fn has(label: &str, needle: &str) -> bool {
    label.contains(needle)
}

/// Score a control label. `None` means the label is rejected outright.
///
/// Case-insensitive substring tests: "load"/"restore" reject; one of save/write and one
/// storage word (sram, nvram, backup ram, memory card/memcard, save ram) are required.
pub fn score_label(label: &str) -> Option<i32> {
    if label.is_empty() {
        return None;
    }
    let l = label.to_ascii_lowercase();

    if has(&l, "load") || has(&l, "restore") {
        return None;
    }

    let save = has(&l, "save");
    let write = has(&l, "write");
    let sram = has(&l, "sram");
    let nvram = has(&l, "nvram");
    let backup_ram = has(&l, "backup ram");
    let memory_card = has(&l, "memory card") || has(&l, "memcard");
    let save_ram = has(&l, "save ram");

    if !(save || write) {
        return None;
    }
    if !(sram || nvram || backup_ram || memory_card || save_ram) {
        return None;
    }

    let mut score = 0;
    if save {
        score += 100;
    }
    if write {
        score += 80;
    }
    if sram {
        score += 30;
    }
    if nvram {
        score += 30;
    }
    if backup_ram {
        score += 30;
    }
    if memory_card {
        score += 20;
    }
    if save_ram {
        score += 20;
    }

    for penalty in ["state", "setting", "config"] {
        if has(&l, penalty) {
            score -= 80;
        }
    }
    Some(score)
}

/// Best-scoring control. On an exact tie the first-seen candidate stays.
pub fn best_candidate<I>(descriptors: I) -> Option<(ControlDescriptor, i32)>
where
    I: IntoIterator<Item = ControlDescriptor>,
{
    let mut best: Option<(ControlDescriptor, i32)> = None;
    for d in descriptors {
        if d.option_id.is_empty() {
            continue;
        }
        let Some(score) = score_label(&d.label) else {
            continue;
        };
        debug!(
            "autosave candidate: opt={} ex={} label={} score={}",
            d.option_id, d.exclusive, d.label, score
        );
        if best.as_ref().map_or(true, |(_, s)| score > *s) {
            best = Some((d, score));
        }
    }
    best
}
