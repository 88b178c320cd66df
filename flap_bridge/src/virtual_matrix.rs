//! A software stand-in for the Arduino.
//!
//! [`VirtualMatrix`] speaks the same line protocol as the firmware: it says
//! `READY` once after connecting, answers every line with `OK` or
//! `ERR <reason>`, and keeps the resulting LED state in a [`Grid`] that the
//! preview window can render.

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use led_serial::{Command, Connector, LinkError, Rgbi, Transport, MAX_COORD};

// ════════════════════════════════════════════════════════════════════════════
// Grid
// ════════════════════════════════════════════════════════════════════════════

/// LED state, row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    rows:  u8,
    cols:  u8,
    cells: Vec<Rgbi>,
}

impl Grid {
    pub fn new(rows: u8, cols: u8) -> Self {
        let rows = rows.clamp(1, MAX_COORD + 1);
        let cols = cols.clamp(1, MAX_COORD + 1);
        Grid { rows, cols, cells: vec![Rgbi::OFF; rows as usize * cols as usize] }
    }

    pub fn rows(&self) -> u8 { self.rows }
    pub fn cols(&self) -> u8 { self.cols }

    pub fn get(&self, row: u8, col: u8) -> Option<Rgbi> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        Some(self.cells[row as usize * self.cols as usize + col as usize])
    }

    pub fn lit(&self) -> usize {
        self.cells.iter().filter(|c| !c.is_dark()).count()
    }

    /// Apply one command; a cell outside the board is an error.
    pub fn apply(&mut self, cmd: &Command) -> Result<(), String> {
        let (row, col, color) = match *cmd {
            Command::Clear => {
                self.cells.fill(Rgbi::OFF);
                return Ok(());
            }
            Command::Off { row, col }        => (row, col, Rgbi::OFF),
            Command::Set { row, col, color } => (row, col, color),
        };
        if row >= self.rows || col >= self.cols {
            return Err(format!("cell {}{} outside {}x{}", row, col, self.rows, self.cols));
        }
        self.cells[row as usize * self.cols as usize + col as usize] = color;
        Ok(())
    }
}

/// Grid shared between the transport and whoever draws it.
#[derive(Clone, Debug)]
pub struct SharedGrid(Arc<Mutex<Grid>>);

impl SharedGrid {
    pub fn new(rows: u8, cols: u8) -> Self {
        SharedGrid(Arc::new(Mutex::new(Grid::new(rows, cols))))
    }

    /// A poisoned lock still holds a usable grid.
    pub fn lock(&self) -> MutexGuard<'_, Grid> {
        self.0.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn snapshot(&self) -> Grid { self.lock().clone() }
}

// ════════════════════════════════════════════════════════════════════════════
// Transport
// ════════════════════════════════════════════════════════════════════════════

/// Unread replies kept before the oldest are dropped, like a full serial
/// output buffer.
pub const REPLY_BUFFER: usize = 64;

pub struct VirtualMatrix {
    grid:      SharedGrid,
    replies:   VecDeque<String>,
    announced: bool,
}

impl VirtualMatrix {
    pub fn new(grid: SharedGrid) -> Self {
        VirtualMatrix { grid, replies: VecDeque::new(), announced: false }
    }

    fn interpret(&mut self, line: &str) -> String {
        let cmd: Command = match line.parse() {
            Ok(c)  => c,
            Err(e) => return format!("ERR {}", e),
        };
        match self.grid.lock().apply(&cmd) {
            Ok(())   => "OK".to_string(),
            Err(why) => format!("ERR {}", why),
        }
    }
}

impl Transport for VirtualMatrix {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        let reply = self.interpret(line);
        tracing::trace!(line, reply = %reply, "virtual matrix");
        if self.replies.len() == REPLY_BUFFER {
            self.replies.pop_front();
        }
        self.replies.push_back(reply);
        Ok(())
    }

    fn read_line(&mut self, _timeout: Duration) -> io::Result<Option<String>> {
        if !self.announced {
            self.announced = true;
            return Ok(Some("READY".to_string()));
        }
        Ok(self.replies.pop_front())
    }

    fn reset_input(&mut self) -> io::Result<()> {
        self.replies.clear();
        Ok(())
    }
}

/// Hands out [`VirtualMatrix`] transports that all draw on one grid.
pub struct VirtualConnector {
    grid: SharedGrid,
}

impl VirtualConnector {
    pub fn new(grid: SharedGrid) -> Self { VirtualConnector { grid } }
}

impl Connector for VirtualConnector {
    fn connect(&mut self) -> Result<Box<dyn Transport>, LinkError> {
        Ok(Box::new(VirtualMatrix::new(self.grid.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use led_serial::{Link, LinkConfig};

    fn write_read(vm: &mut VirtualMatrix, line: &str) -> String {
        vm.write_line(line).unwrap();
        vm.read_line(Duration::ZERO).unwrap().unwrap()
    }

    #[test]
    fn announces_ready_first() {
        let mut vm = VirtualMatrix::new(SharedGrid::new(8, 8));
        vm.reset_input().unwrap();
        assert_eq!(vm.read_line(Duration::ZERO).unwrap().as_deref(), Some("READY"));
        assert_eq!(vm.read_line(Duration::ZERO).unwrap(), None);
    }

    #[test]
    fn applies_set_off_and_clear() {
        let grid = SharedGrid::new(8, 8);
        let mut vm = VirtualMatrix::new(grid.clone());
        vm.read_line(Duration::ZERO).unwrap();

        assert_eq!(write_read(&mut vm, "552550000009"), "OK");
        assert_eq!(write_read(&mut vm, "000002550009"), "OK");
        assert_eq!(grid.lock().get(5, 5), Some(Rgbi::OBSTACLE));
        assert_eq!(grid.lock().lit(), 2);

        assert_eq!(write_read(&mut vm, "55"), "OK");
        assert_eq!(grid.lock().get(5, 5), Some(Rgbi::OFF));

        assert_eq!(write_read(&mut vm, "CL"), "OK");
        assert_eq!(grid.lock().lit(), 0);
    }

    #[test]
    fn errors_are_replied_not_raised() {
        let grid = SharedGrid::new(4, 4);
        let mut vm = VirtualMatrix::new(grid.clone());
        vm.read_line(Duration::ZERO).unwrap();

        assert!(write_read(&mut vm, "hello").starts_with("ERR "));
        assert!(write_read(&mut vm, "770002550009").starts_with("ERR cell 77"));
        assert_eq!(grid.lock().lit(), 0);
    }

    #[test]
    fn unread_replies_are_bounded() {
        let mut vm = VirtualMatrix::new(SharedGrid::new(8, 8));
        assert_eq!(vm.read_line(Duration::ZERO).unwrap().as_deref(), Some("READY"));
        for _ in 0..REPLY_BUFFER + 35 {
            vm.write_line("00").unwrap();
        }
        vm.write_line("99").unwrap();
        assert_eq!(vm.replies.len(), REPLY_BUFFER);
        // oldest dropped, newest kept
        assert_eq!(vm.replies.back().map(String::as_str), Some("ERR cell 99 outside 8x8"));
        assert_eq!(vm.read_line(Duration::ZERO).unwrap().as_deref(), Some("OK"));
    }

    #[test]
    fn drives_a_link() {
        let grid = SharedGrid::new(8, 8);
        let config = LinkConfig {
            boot_delay_ms: 0,
            ready_wait_ms: 10,
            expect_reply:  true,
            ..LinkConfig::default()
        };
        let mut link = Link::open(Box::new(VirtualConnector::new(grid.clone())), config).unwrap();
        let reply = link.send(&Command::set(1, 1, Rgbi::PLAYER).unwrap()).unwrap();
        assert_eq!(reply.as_deref(), Some("OK"));
        assert_eq!(grid.lock().get(1, 1), Some(Rgbi::PLAYER));

        link.close();
        assert_eq!(grid.lock().lit(), 0);
    }
}
