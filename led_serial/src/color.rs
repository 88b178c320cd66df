//! LED colour in the `RRRGGGBBBI` wire format.

use std::fmt;
use std::str::FromStr;

use crate::command::CommandError;

/// Highest intensity digit.
pub const MAX_INTENSITY: u8 = 9;

/// 8-bit RGB plus a single-digit intensity (0–9).
///
/// On the wire each channel is a zero-padded three-digit decimal followed by
/// the intensity digit: red at full intensity is `2550000009`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rgbi {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub intensity: u8,
}

impl Rgbi {
    pub const OFF:      Rgbi = Rgbi { r: 0,   g: 0,   b: 0,   intensity: 0 };
    pub const PLAYER:   Rgbi = Rgbi { r: 0,   g: 255, b: 0,   intensity: 9 };
    pub const OBSTACLE: Rgbi = Rgbi { r: 255, g: 0,   b: 0,   intensity: 9 };

    /// Intensity above 9 is clamped.
    pub fn new(r: u8, g: u8, b: u8, intensity: u8) -> Self {
        Rgbi { r, g, b, intensity: intensity.min(MAX_INTENSITY) }
    }

    pub fn with_intensity(self, intensity: u8) -> Self {
        Rgbi { intensity: intensity.min(MAX_INTENSITY), ..self }
    }

    /// RGB scaled linearly by `intensity / 9`.
    pub fn scaled(&self) -> (u8, u8, u8) {
        let k = self.intensity.min(MAX_INTENSITY) as u16;
        let s = |c: u8| ((c as u16 * k + MAX_INTENSITY as u16 / 2) / MAX_INTENSITY as u16) as u8;
        (s(self.r), s(self.g), s(self.b))
    }

    pub fn is_dark(&self) -> bool { self.scaled() == (0, 0, 0) }
}

impl fmt::Display for Rgbi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}{:03}{:03}{}", self.r, self.g, self.b, self.intensity.min(MAX_INTENSITY))
    }
}

impl FromStr for Rgbi {
    type Err = CommandError;

    /// Parse exactly ten ASCII digits.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 10 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CommandError::BadColor(s.to_string()));
        }
        let channel = |range: std::ops::Range<usize>| -> Result<u8, CommandError> {
            s[range].parse::<u8>().map_err(|_| CommandError::BadColor(s.to_string()))
        };
        Ok(Rgbi {
            r: channel(0..3)?,
            g: channel(3..6)?,
            b: channel(6..9)?,
            intensity: s.as_bytes()[9] - b'0',
        })
    }
}
