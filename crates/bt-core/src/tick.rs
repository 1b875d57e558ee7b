#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Timing for one evaluation of a tree root.
///
/// `dt_seconds` is the time since the previous root evaluation (throttled frames are folded in),
/// `now_seconds` is the total time the owning controller has accumulated.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TickContext {
    pub tick: u64,
    pub dt_seconds: f32,
    pub now_seconds: f64,
}

impl TickContext {
    pub fn new(tick: u64, dt_seconds: f32, now_seconds: f64) -> Self {
        Self {
            tick,
            dt_seconds,
            now_seconds,
        }
    }
}

/// Where a controller gets frame deltas when the host does not pass them in.
pub trait TimeSource {
    fn delta_seconds(&mut self) -> f32;
}

/// Constant step per call. Deterministic; the usual choice for simulations and tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedStep {
    pub step_seconds: f32,
}

impl FixedStep {
    pub fn new(step_seconds: f32) -> Self {
        Self { step_seconds }
    }
}

impl TimeSource for FixedStep {
    fn delta_seconds(&mut self) -> f32 {
        self.step_seconds
    }
}

/// Monotonic wall clock. The first call reports the time since construction.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    last: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            last: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for SystemClock {
    fn delta_seconds(&mut self) -> f32 {
        let now = Instant::now();
        let dt = now.duration_since(self.last).as_secs_f32();
        self.last = now;
        dt
    }
}
