//! Cursor walk over the LED matrix.
//!
//! A lit player cell moves one step per key press; fixed obstacle cells
//! stay lit underneath it.  [`MatrixScene`] turns each move into the
//! minimal command sequence: put back what was under the old position,
//! then light the new one.

use crate::color::Rgbi;
use crate::command::{Command, MAX_COORD};

/// Side of the default board.
pub const DEFAULT_SIZE: u8 = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Move {
    Up,
    Down,
    Left,
    Right,
}

impl Move {
    /// `W`/`A`/`S`/`D`, either case.
    pub fn from_key(c: char) -> Option<Move> {
        match c.to_ascii_lowercase() {
            'w' => Some(Move::Up),
            's' => Some(Move::Down),
            'a' => Some(Move::Left),
            'd' => Some(Move::Right),
            _   => None,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Cursor
// ════════════════════════════════════════════════════════════════════════════

/// Position clamped to a `rows × cols` board.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MatrixCursor {
    rows: u8,
    cols: u8,
    row:  u8,
    col:  u8,
}

impl MatrixCursor {
    /// Board sides are clamped to 1..=10 so every cell has single-digit
    /// coordinates.
    pub fn new(rows: u8, cols: u8) -> Self {
        MatrixCursor {
            rows: rows.clamp(1, MAX_COORD + 1),
            cols: cols.clamp(1, MAX_COORD + 1),
            row:  0,
            col:  0,
        }
    }

    pub fn position(&self) -> (u8, u8) { (self.row, self.col) }
    pub fn size(&self) -> (u8, u8)     { (self.rows, self.cols) }

    /// Move one cell.  Returns `(old, new)`, or `None` at the edge.
    pub fn step(&mut self, m: Move) -> Option<((u8, u8), (u8, u8))> {
        let old = self.position();
        match m {
            Move::Up    if self.row > 0             => self.row -= 1,
            Move::Down  if self.row + 1 < self.rows => self.row += 1,
            Move::Left  if self.col > 0             => self.col -= 1,
            Move::Right if self.col + 1 < self.cols => self.col += 1,
            _ => return None,
        }
        Some((old, self.position()))
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Scene
// ════════════════════════════════════════════════════════════════════════════

/// Player cursor plus fixed obstacles.
#[derive(Clone, Debug)]
pub struct MatrixScene {
    cursor:    MatrixCursor,
    obstacles: Vec<(u8, u8)>,
    player:    Rgbi,
    obstacle:  Rgbi,
}

impl Default for MatrixScene {
    fn default() -> Self {
        MatrixScene::new(
            MatrixCursor::new(DEFAULT_SIZE, DEFAULT_SIZE),
            vec![(5, 5), (7, 7)],
            Rgbi::PLAYER,
            Rgbi::OBSTACLE,
        )
    }
}

impl MatrixScene {
    /// Obstacles outside the board are dropped.
    pub fn new(cursor: MatrixCursor, obstacles: Vec<(u8, u8)>, player: Rgbi, obstacle: Rgbi) -> Self {
        let (rows, cols) = cursor.size();
        let obstacles = obstacles.into_iter().filter(|&(r, c)| r < rows && c < cols).collect();
        MatrixScene { cursor, obstacles, player, obstacle }
    }

    pub fn cursor(&self) -> &MatrixCursor { &self.cursor }
    pub fn obstacles(&self) -> &[(u8, u8)] { &self.obstacles }

    /// Clear, draw the obstacles, then the player.
    pub fn initial_commands(&self) -> Vec<Command> {
        let mut out = vec![Command::Clear];
        out.extend(self.obstacles.iter().map(|&(row, col)| Command::Set { row, col, color: self.obstacle }));
        out.push(self.player_command());
        out
    }

    /// Commands for one move; empty when blocked by the edge.
    pub fn apply(&mut self, m: Move) -> Vec<Command> {
        let Some(((or, oc), _)) = self.cursor.step(m) else { return Vec::new() };
        let restore = if self.obstacles.contains(&(or, oc)) {
            Command::Set { row: or, col: oc, color: self.obstacle }
        } else {
            Command::Off { row: or, col: oc }
        };
        vec![restore, self.player_command()]
    }

    /// Light the player's current cell.
    pub fn player_command(&self) -> Command {
        let (row, col) = self.cursor.position();
        Command::Set { row, col, color: self.player }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(cmds: &[Command]) -> Vec<String> {
        cmds.iter().map(Command::encode).collect()
    }

    #[test]
    fn keys() {
        assert_eq!(Move::from_key('W'), Some(Move::Up));
        assert_eq!(Move::from_key('a'), Some(Move::Left));
        assert_eq!(Move::from_key('s'), Some(Move::Down));
        assert_eq!(Move::from_key('D'), Some(Move::Right));
        assert_eq!(Move::from_key('q'), None);
    }

    #[test]
    fn cursor_stops_at_edges() {
        let mut c = MatrixCursor::new(2, 2);
        assert_eq!(c.step(Move::Up), None);
        assert_eq!(c.step(Move::Left), None);
        assert_eq!(c.step(Move::Right), Some(((0, 0), (0, 1))));
        assert_eq!(c.step(Move::Right), None);
        assert_eq!(c.step(Move::Down), Some(((0, 1), (1, 1))));
        assert_eq!(c.step(Move::Down), None);
    }

    #[test]
    fn board_size_clamped() {
        assert_eq!(MatrixCursor::new(0, 40).size(), (1, 10));
    }

    #[test]
    fn initial_frame() {
        let s = MatrixScene::default();
        assert_eq!(
            lines(&s.initial_commands()),
            vec!["CL", "552550000009", "772550000009", "000002550009"]
        );
    }

    #[test]
    fn move_turns_old_cell_off() {
        let mut s = MatrixScene::default();
        assert_eq!(lines(&s.apply(Move::Right)), vec!["00", "010002550009"]);
        assert!(s.apply(Move::Up).is_empty());
    }

    #[test]
    fn leaving_obstacle_restores_it() {
        let mut s = MatrixScene::new(
            MatrixCursor::new(8, 8),
            vec![(0, 1)],
            Rgbi::PLAYER,
            Rgbi::OBSTACLE,
        );
        s.apply(Move::Right);
        assert_eq!(lines(&s.apply(Move::Right)), vec!["012550000009", "020002550009"]);
    }

    #[test]
    fn out_of_board_obstacles_dropped() {
        let s = MatrixScene::new(MatrixCursor::new(4, 4), vec![(5, 5), (1, 1)], Rgbi::PLAYER, Rgbi::OBSTACLE);
        assert_eq!(s.obstacles(), &[(1, 1)]);
    }
}
