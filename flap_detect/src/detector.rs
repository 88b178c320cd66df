//! Gesture deciders: turn a smoothed velocity stream into discrete fires.
//!
//! All three share the same guarantee: once a detector fires it stays quiet
//! for at least `cooldown`.  They differ in what counts as "a gesture":
//!
//! * [`UpFlapDetector`] — upward intensity crossing `trigger`, re-armed only
//!   after it falls back to `release` (hysteresis).
//! * [`DeltaFlapDetector`] — a sudden jump in vertical speed, either way.
//! * [`SwipeDetector`] — the up-flap rule applied to all four directions.

use std::time::{Duration, Instant};

use crate::intensity::{classify, normalize, Direction};
use crate::smoothing::Smoothed;
use crate::tuning::Tuning;

// ════════════════════════════════════════════════════════════════════════════
// Cooldown
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug)]
struct Cooldown {
    period:    Duration,
    last_fire: Option<Instant>,
}

impl Cooldown {
    fn new(period: Duration) -> Self { Cooldown { period, last_fire: None } }

    fn ready(&self, now: Instant) -> bool {
        match self.last_fire {
            None       => true,
            Some(last) => now.saturating_duration_since(last) >= self.period,
        }
    }

    fn fire(&mut self, now: Instant) { self.last_fire = Some(now); }
}

// ════════════════════════════════════════════════════════════════════════════
// UpFlapDetector
// ════════════════════════════════════════════════════════════════════════════

/// Fires once per upward flick of the pointer.
#[derive(Clone, Debug)]
pub struct UpFlapDetector {
    trigger:  u8,
    release:  u8,
    max_mag:  f32,
    cooldown: Cooldown,
    armed:    bool,
    last_intensity: u8,
}

impl UpFlapDetector {
    pub fn new(trigger: u8, release: u8, max_mag: f32, cooldown: Duration) -> Self {
        UpFlapDetector {
            trigger,
            release,
            max_mag,
            cooldown: Cooldown::new(cooldown),
            armed:    true,
            last_intensity: 0,
        }
    }

    pub fn from_tuning(t: &Tuning) -> Self {
        Self::new(t.trigger, t.release, t.max_mag, t.cooldown())
    }

    /// Feed one smoothed vertical velocity.  Negative `sm_dy` is upward.
    pub fn update(&mut self, sm_dy: f32, now: Instant) -> bool {
        if sm_dy >= 0.0 {
            // falling or idle: re-arm once the motion has died down
            if sm_dy.abs() < 1.0 {
                self.armed = true;
            }
            self.last_intensity = 0;
            return false;
        }

        let intensity = normalize(sm_dy.abs(), self.max_mag);
        self.last_intensity = intensity;

        if intensity <= self.release {
            self.armed = true;
        }
        if !self.armed || intensity < self.trigger {
            return false;
        }
        if !self.cooldown.ready(now) {
            return false;
        }

        self.cooldown.fire(now);
        self.armed = false;
        true
    }

    pub fn is_armed(&self) -> bool { self.armed }

    /// Upward intensity seen by the last `update` (0 when not moving up).
    pub fn last_intensity(&self) -> u8 { self.last_intensity }
}

// ════════════════════════════════════════════════════════════════════════════
// DeltaFlapDetector
// ════════════════════════════════════════════════════════════════════════════

/// Fires on a sudden increase of vertical speed, in either direction.
///
/// Works on raw (smoothed) device units rather than the 0..100 scale.
#[derive(Clone, Debug)]
pub struct DeltaFlapDetector {
    min_sm_dy:     f32,
    delta_trigger: f32,
    cooldown:      Cooldown,
    prev_abs:      f32,
    last_delta:    f32,
}

impl DeltaFlapDetector {
    pub fn new(min_sm_dy: f32, delta_trigger: f32, cooldown: Duration) -> Self {
        DeltaFlapDetector {
            min_sm_dy,
            delta_trigger,
            cooldown:   Cooldown::new(cooldown),
            prev_abs:   0.0,
            last_delta: 0.0,
        }
    }

    pub fn from_tuning(t: &Tuning) -> Self {
        Self::new(t.min_sm_dy, t.delta_trigger, t.cooldown())
    }

    pub fn update(&mut self, sm_dy: f32, now: Instant) -> bool {
        let abs   = sm_dy.abs();
        let delta = abs - self.prev_abs;
        self.prev_abs   = abs;
        self.last_delta = delta;

        if abs < self.min_sm_dy || delta < self.delta_trigger {
            return false;
        }
        if !self.cooldown.ready(now) {
            return false;
        }
        self.cooldown.fire(now);
        true
    }

    /// Change in `|sm_dy|` computed by the last `update`.
    pub fn last_delta(&self) -> f32 { self.last_delta }
}

// ════════════════════════════════════════════════════════════════════════════
// SwipeDetector
// ════════════════════════════════════════════════════════════════════════════

/// Four-way version of [`UpFlapDetector`].
///
/// The detector re-arms when the pointer comes to rest or the intensity
/// falls to `release`; a change of direction alone does not re-arm it.
#[derive(Clone, Debug)]
pub struct SwipeDetector {
    trigger:  u8,
    release:  u8,
    max_mag:  f32,
    cooldown: Cooldown,
    armed:    bool,
}

impl SwipeDetector {
    pub fn new(trigger: u8, release: u8, max_mag: f32, cooldown: Duration) -> Self {
        SwipeDetector {
            trigger,
            release,
            max_mag,
            cooldown: Cooldown::new(cooldown),
            armed:    true,
        }
    }

    pub fn from_tuning(t: &Tuning) -> Self {
        Self::new(t.trigger, t.release, t.max_mag, t.cooldown())
    }

    pub fn update(&mut self, s: Smoothed, now: Instant) -> Option<Direction> {
        let reading = match classify(s, self.max_mag) {
            Some(r) => r,
            None    => { self.armed = true; return None; }
        };

        if reading.intensity <= self.release {
            self.armed = true;
        }
        if !self.armed || reading.intensity < self.trigger {
            return None;
        }
        if !self.cooldown.ready(now) {
            return None;
        }

        self.cooldown.fire(now);
        self.armed = false;
        Some(reading.direction)
    }

    pub fn is_armed(&self) -> bool { self.armed }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
