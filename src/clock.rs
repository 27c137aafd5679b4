//! Monotonic millisecond clock + optional deadline.
//!
//! Clock is a seam for the host timer: MonotonicClock in production,
//! ManualClock in tests (shared handle, advanced by hand).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

pub trait Clock {
    /// Milliseconds on a monotonic timeline (origin is arbitrary).
    fn now_ms(&self) -> u64;
}

#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis().min(u64::MAX as u128) as u64
    }
}

/// Ручные часы: клоны делят одно значение времени.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn set(&self, ms: u64) {
        self.now.store(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Optional deadline: unarmed, armed (pending) or armed-and-elapsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Deadline {
    at_ms: Option<u64>,
}

impl Deadline {
    pub fn arm(&mut self, now_ms: u64, after_ms: u64) {
        self.at_ms = Some(now_ms.saturating_add(after_ms));
    }

    pub fn disarm(&mut self) {
        self.at_ms = None;
    }

    pub fn is_armed(&self) -> bool {
        self.at_ms.is_some()
    }

    /// Armed and reached. An unarmed deadline never elapses.
    pub fn elapsed(&self, now_ms: u64) -> bool {
        matches!(self.at_ms, Some(at) if now_ms >= at)
    }

    pub fn at_ms(&self) -> Option<u64> {
        self.at_ms
    }
}
