//! The Arduino line protocol.
//!
//! One ASCII command per line:
//!
//! | line | meaning |
//! |---|---|
//! | `CL` | clear the whole matrix |
//! | `RC` | LED at row `R`, column `C` off |
//! | `RCrrrgggbbbI` | LED at (`R`, `C`) to colour `rrrgggbbb`, intensity `I` |
//!
//! Rows and columns are single digits, so a matrix is at most 10×10.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::color::Rgbi;

/// Largest row/column index that fits in one digit.
pub const MAX_COORD: u8 = 9;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Clear,
    Off { row: u8, col: u8 },
    Set { row: u8, col: u8, color: Rgbi },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("bad coordinate {0:?}: row and column are single digits 0-9")]
    BadCoordinate(String),
    #[error("bad colour {0:?}: expected RRRGGGBBBI with channels 000-255")]
    BadColor(String),
    #[error("bad length {0}: expected CL, RC or RCRRRGGGBBBI")]
    BadLength(usize),
}

impl Command {
    pub fn off(row: u8, col: u8) -> Result<Self, CommandError> {
        check_coord(row, col)?;
        Ok(Command::Off { row, col })
    }

    pub fn set(row: u8, col: u8, color: Rgbi) -> Result<Self, CommandError> {
        check_coord(row, col)?;
        Ok(Command::Set { row, col, color })
    }

    /// Wire text without the line terminator.
    pub fn encode(&self) -> String { self.to_string() }

    /// Wire text with the trailing `\n`.
    pub fn to_line(&self) -> String {
        let mut s = self.encode();
        s.push('\n');
        s
    }

    /// Cell addressed by the command, if any.
    pub fn cell(&self) -> Option<(u8, u8)> {
        match *self {
            Command::Clear             => None,
            Command::Off { row, col }  => Some((row, col)),
            Command::Set { row, col, .. } => Some((row, col)),
        }
    }
}

fn check_coord(row: u8, col: u8) -> Result<(), CommandError> {
    if row > MAX_COORD || col > MAX_COORD {
        return Err(CommandError::BadCoordinate(format!("{},{}", row, col)));
    }
    Ok(())
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Clear                  => f.write_str("CL"),
            Command::Off { row, col }       => write!(f, "{}{}", row, col),
            Command::Set { row, col, color } => write!(f, "{}{}{}", row, col, color),
        }
    }
}

impl FromStr for Command {
    type Err = CommandError;

    /// Parse a typed line.  Surrounding whitespace is ignored and `cl` is
    /// accepted in any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_uppercase();
        if s.is_empty() {
            return Err(CommandError::Empty);
        }
        if s == "CL" {
            return Ok(Command::Clear);
        }
        if !s.is_ascii() {
            return Err(CommandError::BadLength(s.chars().count()));
        }

        let coord = |s: &str| -> Result<(u8, u8), CommandError> {
            let b = s.as_bytes();
            if b[0].is_ascii_digit() && b[1].is_ascii_digit() {
                Ok((b[0] - b'0', b[1] - b'0'))
            } else {
                Err(CommandError::BadCoordinate(s[..2].to_string()))
            }
        };

        match s.len() {
            2  => {
                let (row, col) = coord(&s)?;
                Ok(Command::Off { row, col })
            }
            12 => {
                let (row, col) = coord(&s)?;
                let color: Rgbi = s[2..].parse()?;
                Ok(Command::Set { row, col, color })
            }
            n  => Err(CommandError::BadLength(n)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_known_lines() {
        assert_eq!(Command::Clear.to_line(), "CL\n");
        assert_eq!(Command::off(5, 5).unwrap().encode(), "55");
        let red = Rgbi::new(255, 0, 0, 1);
        assert_eq!(Command::set(5, 5, red).unwrap().encode(), "552550000001");
    }

    #[test]
    fn rejects_two_digit_coordinates() {
        assert!(matches!(Command::off(10, 0), Err(CommandError::BadCoordinate(_))));
        assert!(Command::set(0, 12, Rgbi::PLAYER).is_err());
    }

    #[test]
    fn parses_typed_lines() {
        assert_eq!(" cl ".parse::<Command>().unwrap(), Command::Clear);
        assert_eq!("23".parse::<Command>().unwrap(), Command::Off { row: 2, col: 3 });
        assert_eq!(
            "450000002554".parse::<Command>().unwrap(),
            Command::Set { row: 4, col: 5, color: Rgbi::new(0, 0, 255, 4) }
        );
    }

    #[test]
    fn parse_errors() {
        assert_eq!("".parse::<Command>(), Err(CommandError::Empty));
        assert_eq!("   ".parse::<Command>(), Err(CommandError::Empty));
        assert!(matches!("2302550000".parse::<Command>(), Err(CommandError::BadLength(10))));
        assert!(matches!("A3".parse::<Command>(), Err(CommandError::BadCoordinate(_))));
        assert!(matches!("239990000009".parse::<Command>(), Err(CommandError::BadColor(_))));
        assert!(matches!("é3".parse::<Command>(), Err(CommandError::BadLength(2))));
    }

    #[test]
    fn cell_of_command() {
        assert_eq!(Command::Clear.cell(), None);
        assert_eq!(Command::off(1, 2).unwrap().cell(), Some((1, 2)));
    }
}
