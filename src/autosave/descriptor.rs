//! Разбор строк-дескрипторов опций ядра.
//!
//! Грамматика (внешняя):
//!   [H?|D?]*  [P?]  (T|t|R|r) <option_id> , <label> [, ...]
//! - пары маркеров H/D (скрыть/отключить) пропускаются, пока строка длиннее 2 символов;
//! - префикс страницы "P?" пропускается, если третий символ не ',';
//! - T/t: trigger, R/r: toggle; строчная буква = exclusive-вариант.
//! Поле 1 строки: label, поле 0 после символа вида: option_id.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKind {
    Trigger,
    Toggle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlDescriptor {
    pub kind: ControlKind,
    pub exclusive: bool,
    pub label: String,
    pub option_id: String,
}

fn skip2(s: &str) -> Option<&str> {
    s.get(2..)
}

/// Parse one descriptor; `None` if it is not a trigger/toggle control.
pub fn parse_descriptor(entry: &str) -> Option<ControlDescriptor> {
    let mut e = entry;

    while e.len() > 2 && matches!(e.as_bytes()[0], b'H' | b'D' | b'h' | b'd') {
        e = skip2(e)?;
    }
    if e.len() > 2 && e.as_bytes()[0] == b'P' && e.as_bytes()[2] != b',' {
        e = skip2(e)?;
    }

    let (kind, exclusive) = match e.as_bytes().first()? {
        b'T' => (ControlKind::Trigger, false),
        b't' => (ControlKind::Trigger, true),
        b'R' => (ControlKind::Toggle, false),
        b'r' => (ControlKind::Toggle, true),
        _ => return None,
    };

    let label = e.split(',').nth(1).unwrap_or("").to_string();
    let option_id = e[1..].split(',').next().unwrap_or("").to_string();

    Some(ControlDescriptor {
        kind,
        exclusive,
        label,
        option_id,
    })
}
