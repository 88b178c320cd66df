//! Line-per-window gesture monitors for tuning by eye.

use std::time::Instant;

use clap::ValueEnum;
use flap_detect::{classify, DeltaFlapDetector, Smoothed, Tuning, UpFlapDetector, Window};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum MonitorMode {
    /// Slope-triggered flap with a debug line per window.
    Flap,
    /// Upward flap with trigger/release hysteresis.
    Up,
    /// Dominant direction and 0..100 intensity.
    Direction,
    /// Windowed deltas after the deadzone.
    Raw,
}

impl MonitorMode {
    /// Preset whose feel the mode was tuned with.
    pub fn default_preset(self) -> &'static str {
        match self {
            MonitorMode::Flap      => "flap",
            MonitorMode::Up        => "bird",
            MonitorMode::Direction => "norma",
            MonitorMode::Raw       => "ship",
        }
    }
}

enum Decider {
    Delta(DeltaFlapDetector),
    Up(UpFlapDetector),
    Direction { max_mag: f32 },
    Raw,
}

pub struct Monitor {
    decider: Decider,
    fired:   u32,
}

impl Monitor {
    pub fn new(mode: MonitorMode, tuning: &Tuning) -> Self {
        let decider = match mode {
            MonitorMode::Flap      => Decider::Delta(DeltaFlapDetector::from_tuning(tuning)),
            MonitorMode::Up        => Decider::Up(UpFlapDetector::from_tuning(tuning)),
            MonitorMode::Direction => Decider::Direction { max_mag: tuning.max_mag },
            MonitorMode::Raw       => Decider::Raw,
        };
        Monitor { decider, fired: 0 }
    }

    /// Flaps counted so far (flap and up modes).
    pub fn fired(&self) -> u32 { self.fired }

    /// Feed one closed window; returns the line to print, if any.
    pub fn observe(&mut self, w: Window, s: Smoothed, now: Instant) -> Option<String> {
        match &mut self.decider {
            Decider::Delta(d) => {
                let flap = d.update(s.dy, now);
                if flap {
                    self.fired += 1;
                }
                Some(format!(
                    "raw(dx,dy)=({:+4},{:+4})  sm(dx,dy)=({:+6.2},{:+6.2})  |sm_dy|={:6.2}  d={:6.2}  {}",
                    w.dx, w.dy, s.dx, s.dy, s.dy.abs(), d.last_delta(),
                    if flap { "FLAP!" } else { "" },
                ))
            }
            Decider::Up(d) => {
                let flap = d.update(s.dy, now);
                if flap {
                    self.fired += 1;
                    return Some(format!("FLAP  intensity={:3}", d.last_intensity()));
                }
                None
            }
            Decider::Direction { max_mag } => {
                let r = classify(s, *max_mag)?;
                Some(format!("{:<5} {:3}", r.direction, r.intensity))
            }
            Decider::Raw => {
                if w.is_still() {
                    return None;
                }
                Some(format!("dx/dy: ({:+4}, {:+4})", w.dx, w.dy))
            }
        }
    }
}
