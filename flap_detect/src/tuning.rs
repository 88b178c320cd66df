//! Tuning constants, named presets, and the assembled [`Pipeline`].
//!
//! Every script this crate grew out of was hand-tuned for a different feel,
//! so rather than settle on one set of numbers the useful ones ship as
//! presets.  A TOML file can override any subset of fields:
//!
//! ```toml
//! preset   = "bird"
//! deadzone = 2
//! cooldown_ms = 200
//! ```

use std::path::Path;
use std::time::{Duration, Instant};

use serde::Deserialize;
use thiserror::Error;

use crate::smoothing::{Smoothed, Smoother};
use crate::window::{RelEvent, Window, WindowAccumulator};

// ════════════════════════════════════════════════════════════════════════════
// Tuning
// ════════════════════════════════════════════════════════════════════════════

/// All knobs of the detection pipeline.
///
/// Not every detector reads every field: the hysteresis detectors use
/// `trigger` / `release` (0..100 scale), the delta detector uses
/// `min_sm_dy` / `delta_trigger` (raw device units).
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// Per-axis window totals below this are zeroed.
    pub deadzone:      i32,
    pub window_ms:     u64,
    /// Weight of the newest window in the EMA (0..1).
    pub smooth:        f32,
    /// Magnitude that reads as intensity 100.
    pub max_mag:       f32,
    pub trigger:       u8,
    pub release:       u8,
    pub cooldown_ms:   u64,
    pub min_sm_dy:     f32,
    pub delta_trigger: f32,
}

impl Default for Tuning {
    fn default() -> Self { Tuning::bird() }
}

impl Tuning {
    /// Up-flick control for the flappy game: heavy deadzone, hysteresis.
    pub fn bird() -> Self {
        Tuning {
            deadzone:      3,
            window_ms:     55,
            smooth:        0.35,
            max_mag:       40.0,
            trigger:       22,
            release:       10,
            cooldown_ms:   160,
            min_sm_dy:     6.0,
            delta_trigger: 6.0,
        }
    }

    /// Responsive slope trigger used by the flap monitor.
    pub fn flap() -> Self {
        Tuning {
            deadzone:    1,
            window_ms:   30,
            smooth:      0.55,
            cooldown_ms: 180,
            ..Tuning::bird()
        }
    }

    /// Direction + intensity readout.
    pub fn norma() -> Self {
        Tuning {
            window_ms: 60,
            ..Tuning::bird()
        }
    }

    /// Nearly raw deltas for direct pointer steering.
    pub fn ship() -> Self {
        Tuning {
            deadzone:  1,
            window_ms: 15,
            smooth:    1.0,
            ..Tuning::bird()
        }
    }

    pub fn preset(name: &str) -> Result<Self, TuningError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "bird"  => Ok(Tuning::bird()),
            "flap"  => Ok(Tuning::flap()),
            "norma" => Ok(Tuning::norma()),
            "ship"  => Ok(Tuning::ship()),
            other   => Err(TuningError::UnknownPreset(other.to_string())),
        }
    }

    pub fn preset_names() -> &'static [&'static str] {
        &["bird", "flap", "norma", "ship"]
    }

    /// Parse a TOML document.  An optional `preset` key picks the base that
    /// the remaining keys override.
    pub fn from_toml_str(src: &str) -> Result<Self, TuningError> {
        let table: toml::Table = toml::from_str(src)?;
        Self::from_table(table)
    }

    /// Build from an already parsed table, e.g. the `[tuning]` section of a
    /// larger config file.  An optional `preset` key picks the base values.
    pub fn from_table(table: toml::Table) -> Result<Self, TuningError> {
        let base = match table.get("preset") {
            Some(toml::Value::String(name)) => Tuning::preset(name)?,
            Some(other) => return Err(TuningError::UnknownPreset(other.to_string())),
            None        => Tuning::default(),
        };

        let mut merged = base.into_table();
        for (k, v) in table {
            if k != "preset" {
                merged.insert(k, v);
            }
        }
        let tuning: Tuning = toml::Value::Table(merged).try_into()?;
        tuning.validate()
    }

    pub fn load(path: &Path) -> Result<Self, TuningError> {
        let src = std::fs::read_to_string(path).map_err(|source| TuningError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let tuning = Self::from_toml_str(&src)?;
        tracing::info!(path = %path.display(), "loaded tuning");
        Ok(tuning)
    }

    pub fn window(&self) -> Duration   { Duration::from_millis(self.window_ms) }
    pub fn cooldown(&self) -> Duration { Duration::from_millis(self.cooldown_ms) }

    fn validate(self) -> Result<Self, TuningError> {
        if !(0.0..=1.0).contains(&self.smooth) {
            return Err(TuningError::OutOfRange("smooth must be within 0..=1"));
        }
        if !(self.max_mag > 0.0) {
            return Err(TuningError::OutOfRange("max_mag must be positive"));
        }
        if self.trigger > 100 || self.release > 100 {
            return Err(TuningError::OutOfRange("trigger/release are on a 0..=100 scale"));
        }
        if self.release >= self.trigger {
            return Err(TuningError::OutOfRange("release must be below trigger"));
        }
        if self.window_ms == 0 {
            return Err(TuningError::OutOfRange("window_ms must be non-zero"));
        }
        Ok(self)
    }

    fn into_table(self) -> toml::Table {
        let mut t = toml::Table::new();
        t.insert("deadzone".into(),      toml::Value::Integer(self.deadzone as i64));
        t.insert("window_ms".into(),     toml::Value::Integer(self.window_ms as i64));
        t.insert("smooth".into(),        toml::Value::Float(self.smooth as f64));
        t.insert("max_mag".into(),       toml::Value::Float(self.max_mag as f64));
        t.insert("trigger".into(),       toml::Value::Integer(self.trigger as i64));
        t.insert("release".into(),       toml::Value::Integer(self.release as i64));
        t.insert("cooldown_ms".into(),   toml::Value::Integer(self.cooldown_ms as i64));
        t.insert("min_sm_dy".into(),     toml::Value::Float(self.min_sm_dy as f64));
        t.insert("delta_trigger".into(), toml::Value::Float(self.delta_trigger as f64));
        t
    }
}

#[derive(Debug, Error)]
pub enum TuningError {
    #[error("unknown preset {0:?} (expected bird, flap, norma or ship)")]
    UnknownPreset(String),
    #[error("invalid tuning: {0}")]
    OutOfRange(&'static str),
    #[error("failed to parse tuning: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

// ════════════════════════════════════════════════════════════════════════════
// Pipeline
// ════════════════════════════════════════════════════════════════════════════

/// Window accumulator followed by the smoother.
#[derive(Clone, Debug)]
pub struct Pipeline {
    window:   WindowAccumulator,
    smoother: Smoother,
}

impl Pipeline {
    pub fn new(t: &Tuning, now: Instant) -> Self {
        Pipeline {
            window:   WindowAccumulator::new(t.window(), t.deadzone, now),
            smoother: Smoother::new(t.smooth),
        }
    }

    pub fn push(&mut self, ev: RelEvent) { self.window.push(ev); }

    /// Close the current window if it is due and smooth it.
    pub fn step(&mut self, now: Instant) -> Option<(Window, Smoothed)> {
        let w = self.window.poll(now)?;
        Some((w, self.smoother.update(w)))
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
