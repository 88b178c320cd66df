//! Magnitude normalisation and dominant-direction classification.

use crate::smoothing::Smoothed;

/// Map a raw magnitude onto 0..=100.
///
/// The square-root curve gives small movements more resolution than a
/// linear scale would.  Magnitudes at or above `max_mag` saturate at 100.
pub fn normalize(mag: f32, max_mag: f32) -> u8 {
    if !(max_mag > 0.0) || !mag.is_finite() {
        return 0;
    }
    let n = (mag.abs() / max_mag).clamp(0.0, 1.0);
    (100.0 * n.sqrt()).round() as u8
}

// ════════════════════════════════════════════════════════════════════════════
// Direction
// ════════════════════════════════════════════════════════════════════════════

/// Dominant direction of a movement, in screen coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub fn name(self) -> &'static str {
        match self {
            Direction::Up    => "UP",
            Direction::Down  => "DOWN",
            Direction::Left  => "LEFT",
            Direction::Right => "RIGHT",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.name())
    }
}

/// A direction together with its normalised intensity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Reading {
    pub direction: Direction,
    pub intensity: u8,
}

/// Pick the dominant axis of `s` and report it with a 0..=100 intensity.
///
/// Ties go to the horizontal axis.  Returns `None` when the pointer is at
/// rest or the movement rounds down to intensity 0.
pub fn classify(s: Smoothed, max_mag: f32) -> Option<Reading> {
    if s.dx == 0.0 && s.dy == 0.0 {
        return None;
    }
    let (direction, mag) = if s.dx.abs() >= s.dy.abs() {
        (if s.dx > 0.0 { Direction::Right } else { Direction::Left }, s.dx.abs())
    } else {
        (if s.dy > 0.0 { Direction::Down } else { Direction::Up }, s.dy.abs())
    };
    let intensity = normalize(mag, max_mag);
    if intensity == 0 {
        return None;
    }
    Some(Reading { direction, intensity })
}
