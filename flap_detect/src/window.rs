//! Accumulation window with a per-axis deadzone.
//!
//! Relative devices report many tiny deltas per second.  Rather than react to
//! each one we sum them over a short window and only look at the total once
//! the window closes.  Totals smaller than the deadzone are treated as jitter.

use std::time::{Duration, Instant};

// ════════════════════════════════════════════════════════════════════════════
// RelEvent
// ════════════════════════════════════════════════════════════════════════════

/// Relative axis of a motion delta.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
}

/// One raw relative delta as reported by the input device.
///
/// Positive `Y` means the pointer moved *down* (screen convention).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RelEvent {
    pub axis:  Axis,
    pub value: i32,
}

// ════════════════════════════════════════════════════════════════════════════
// Window
// ════════════════════════════════════════════════════════════════════════════

/// Totals for one closed window, after the deadzone has been applied.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Window {
    pub dx: i32,
    pub dy: i32,
}

impl Window {
    pub fn is_still(&self) -> bool { self.dx == 0 && self.dy == 0 }
}

// ════════════════════════════════════════════════════════════════════════════
// WindowAccumulator
// ════════════════════════════════════════════════════════════════════════════

/// Sums deltas between emissions and releases them once per `window`.
#[derive(Debug, Clone)]
pub struct WindowAccumulator {
    window:    Duration,
    deadzone:  i32,
    acc_dx:    i32,
    acc_dy:    i32,
    last_emit: Instant,
}

impl WindowAccumulator {
    /// `now` marks the start of the first window.
    pub fn new(window: Duration, deadzone: i32, now: Instant) -> Self {
        WindowAccumulator {
            window,
            deadzone: deadzone.max(0),
            acc_dx:   0,
            acc_dy:   0,
            last_emit: now,
        }
    }

    pub fn push(&mut self, ev: RelEvent) {
        match ev.axis {
            Axis::X => self.acc_dx = self.acc_dx.saturating_add(ev.value),
            Axis::Y => self.acc_dy = self.acc_dy.saturating_add(ev.value),
        }
    }

    /// Close the window if it has run its full length.
    ///
    /// Returns `None` (and keeps accumulating) while the window is still open.
    pub fn poll(&mut self, now: Instant) -> Option<Window> {
        if now.saturating_duration_since(self.last_emit) < self.window {
            return None;
        }
        self.last_emit = now;

        let out = Window {
            dx: self.gate(self.acc_dx),
            dy: self.gate(self.acc_dy),
        };
        self.acc_dx = 0;
        self.acc_dy = 0;
        Some(out)
    }

    /// Raw totals of the window in progress (before the deadzone).
    pub fn pending(&self) -> (i32, i32) { (self.acc_dx, self.acc_dy) }

    pub fn window(&self) -> Duration { self.window }

    fn gate(&self, v: i32) -> i32 {
        if v.abs() < self.deadzone { 0 } else { v }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
