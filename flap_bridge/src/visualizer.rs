//! Software-rendered matrix preview using `minifb`.
//!
//! Layout:
//!
//! ```text
//! ┌──────────────────────────────┐
//! │  ■ □ □ □ □ □ □ □             │
//! │  □ □ □ □ □ □ □ □             │
//! │  …   one square per LED      │
//! │  □ □ □ □ □ □ □ ■             │
//! ├──────────────────────────────┤
//! │  status line                 │
//! │  key legend                  │
//! └──────────────────────────────┘
//! ```

use minifb::{Key, KeyRepeat, Window, WindowOptions};
use thiserror::Error;

use led_serial::{Move, Rgbi};

use crate::virtual_matrix::Grid;

// ════════════════════════════════════════════════════════════════════════════
// Layout constants
// ════════════════════════════════════════════════════════════════════════════

const CELL:       usize = 44;
const GAP:        usize = 6;
const MARGIN:     usize = 16;
const STATUS_H:   usize = 40;
const MIN_W:      usize = 300;
const BG_COLOR:   u32   = 0xFF101018;
const OFF_COLOR:  u32   = 0xFF24242E;
const EDGE_COLOR: u32   = 0xFF3A3A48;
const TEXT_BG:    u32   = 0xFF0F3460;
const TEXT_COLOR: u32   = 0xFFEEEEEE;
const HINT_COLOR: u32   = 0xFF888888;

#[derive(Debug, Error)]
pub enum PreviewError {
    #[error("preview window: {0}")]
    Window(#[from] minifb::Error),
}

// ════════════════════════════════════════════════════════════════════════════
// Canvas — pixel buffer and drawing primitives
// ════════════════════════════════════════════════════════════════════════════

/// ARGB framebuffer sized for a `rows × cols` board.
pub struct Canvas {
    w:   usize,
    h:   usize,
    buf: Vec<u32>,
}

impl Canvas {
    pub fn for_board(rows: u8, cols: u8) -> Self {
        let board_w = cols as usize * (CELL + GAP) - GAP;
        let board_h = rows as usize * (CELL + GAP) - GAP;
        let w = (board_w + 2 * MARGIN).max(MIN_W);
        let h = board_h + 2 * MARGIN + STATUS_H;
        Canvas { w, h, buf: vec![BG_COLOR; w * h] }
    }

    pub fn width(&self) -> usize  { self.w }
    pub fn height(&self) -> usize { self.h }
    pub fn pixels(&self) -> &[u32] { &self.buf }

    pub fn pixel(&self, x: usize, y: usize) -> Option<u32> {
        (x < self.w && y < self.h).then(|| self.buf[y * self.w + x])
    }

    /// Top-left corner of a cell.
    pub fn cell_origin(row: u8, col: u8) -> (usize, usize) {
        (MARGIN + col as usize * (CELL + GAP), MARGIN + row as usize * (CELL + GAP))
    }

    /// Draw the whole frame.
    pub fn draw(&mut self, grid: &Grid, status: &str) {
        self.buf.fill(BG_COLOR);

        for row in 0..grid.rows() {
            for col in 0..grid.cols() {
                let (x, y) = Self::cell_origin(row, col);
                let led = grid.get(row, col).unwrap_or(Rgbi::OFF);
                self.fill_rect(x, y, CELL, CELL, led_color(led));
                self.draw_border(x, y, CELL, CELL, EDGE_COLOR);
            }
        }

        let sy = self.h - STATUS_H;
        self.fill_rect(0, sy, self.w, STATUS_H, TEXT_BG);
        self.draw_label(status, 10, sy + 8, TEXT_COLOR);
        self.draw_label("WASD=move  Q=quit", 10, sy + 24, HINT_COLOR);
    }

    fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, color: u32) {
        for row in y..(y + h).min(self.h) {
            let start = row * self.w;
            for col in x..(x + w).min(self.w) {
                self.buf[start + col] = color;
            }
        }
    }

    fn draw_border(&mut self, x: usize, y: usize, w: usize, h: usize, color: u32) {
        if w == 0 || h == 0 {
            return;
        }
        for col in x..x + w {
            self.set_pixel(col, y, color);
            self.set_pixel(col, y + h - 1, color);
        }
        for row in y..y + h {
            self.set_pixel(x, row, color);
            self.set_pixel(x + w - 1, row, color);
        }
    }

    fn set_pixel(&mut self, x: usize, y: usize, color: u32) {
        if x < self.w && y < self.h {
            self.buf[y * self.w + x] = color;
        }
    }

    /// 3×5 bitmap text, 4 px advance.
    fn draw_label(&mut self, text: &str, x: usize, y: usize, color: u32) {
        let mut cx = x;
        for ch in text.chars() {
            if cx + 4 > self.w {
                break;
            }
            for (dy, bits) in glyph(ch).iter().enumerate() {
                for dx in 0..3 {
                    if bits & (0b100 >> dx) != 0 {
                        self.set_pixel(cx + dx, y + dy, color);
                    }
                }
            }
            cx += 4;
        }
    }
}

/// ARGB for one LED: channels scaled by intensity, unlit cells drawn dim.
pub fn led_color(led: Rgbi) -> u32 {
    if led.is_dark() {
        return OFF_COLOR;
    }
    let (r, g, b) = led.scaled();
    0xFF00_0000 | (r as u32) << 16 | (g as u32) << 8 | b as u32
}

// ── Font ──────────────────────────────────────────────────────────────────

const GLYPHS: &[(char, [u8; 5])] = &[
    ('0', [0b111, 0b101, 0b101, 0b101, 0b111]),
    ('1', [0b010, 0b110, 0b010, 0b010, 0b111]),
    ('2', [0b111, 0b001, 0b111, 0b100, 0b111]),
    ('3', [0b111, 0b001, 0b111, 0b001, 0b111]),
    ('4', [0b101, 0b101, 0b111, 0b001, 0b001]),
    ('5', [0b111, 0b100, 0b111, 0b001, 0b111]),
    ('6', [0b111, 0b100, 0b111, 0b101, 0b111]),
    ('7', [0b111, 0b001, 0b001, 0b001, 0b001]),
    ('8', [0b111, 0b101, 0b111, 0b101, 0b111]),
    ('9', [0b111, 0b101, 0b111, 0b001, 0b111]),
    ('A', [0b111, 0b101, 0b111, 0b101, 0b101]),
    ('B', [0b110, 0b101, 0b110, 0b101, 0b110]),
    ('C', [0b111, 0b100, 0b100, 0b100, 0b111]),
    ('D', [0b110, 0b101, 0b101, 0b101, 0b110]),
    ('E', [0b111, 0b100, 0b111, 0b100, 0b111]),
    ('F', [0b111, 0b100, 0b111, 0b100, 0b100]),
    ('G', [0b111, 0b100, 0b101, 0b101, 0b111]),
    ('H', [0b101, 0b101, 0b111, 0b101, 0b101]),
    ('I', [0b111, 0b010, 0b010, 0b010, 0b111]),
    ('J', [0b001, 0b001, 0b001, 0b101, 0b111]),
    ('K', [0b101, 0b101, 0b110, 0b101, 0b101]),
    ('L', [0b100, 0b100, 0b100, 0b100, 0b111]),
    ('M', [0b101, 0b111, 0b101, 0b101, 0b101]),
    ('N', [0b111, 0b101, 0b101, 0b101, 0b101]),
    ('O', [0b111, 0b101, 0b101, 0b101, 0b111]),
    ('P', [0b111, 0b101, 0b111, 0b100, 0b100]),
    ('Q', [0b111, 0b101, 0b101, 0b111, 0b001]),
    ('R', [0b110, 0b101, 0b110, 0b101, 0b101]),
    ('S', [0b111, 0b100, 0b111, 0b001, 0b111]),
    ('T', [0b111, 0b010, 0b010, 0b010, 0b010]),
    ('U', [0b101, 0b101, 0b101, 0b101, 0b111]),
    ('V', [0b101, 0b101, 0b101, 0b010, 0b010]),
    ('W', [0b101, 0b101, 0b101, 0b111, 0b101]),
    ('X', [0b101, 0b101, 0b010, 0b101, 0b101]),
    ('Y', [0b101, 0b101, 0b111, 0b010, 0b010]),
    ('Z', [0b111, 0b001, 0b010, 0b100, 0b111]),
    ('-', [0b000, 0b000, 0b111, 0b000, 0b000]),
    ('.', [0b000, 0b000, 0b000, 0b000, 0b010]),
    (':', [0b000, 0b010, 0b000, 0b010, 0b000]),
    ('=', [0b000, 0b111, 0b000, 0b111, 0b000]),
    ('(', [0b010, 0b100, 0b100, 0b100, 0b010]),
    (')', [0b010, 0b001, 0b001, 0b001, 0b010]),
    (',', [0b000, 0b000, 0b000, 0b010, 0b100]),
    ('/', [0b001, 0b001, 0b010, 0b100, 0b100]),
    (' ', [0b000; 5]),
];

fn glyph(c: char) -> [u8; 5] {
    let c = c.to_ascii_uppercase();
    GLYPHS.iter()
        .find(|(g, _)| *g == c)
        .map(|(_, bits)| *bits)
        .unwrap_or([0b000, 0b000, 0b010, 0b000, 0b000])
}

// ════════════════════════════════════════════════════════════════════════════
// Window
// ════════════════════════════════════════════════════════════════════════════

/// What the preview window's keyboard asked for this frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PreviewInput {
    None,
    Move(Move),
    Quit,
}

pub struct MatrixPreview {
    window: Window,
    canvas: Canvas,
}

impl MatrixPreview {
    pub fn new(rows: u8, cols: u8) -> Result<Self, PreviewError> {
        let canvas = Canvas::for_board(rows, cols);
        let mut window = Window::new(
            "Flap Bridge — LED matrix",
            canvas.width(),
            canvas.height(),
            WindowOptions { resize: false, ..WindowOptions::default() },
        )?;
        window.limit_update_rate(Some(std::time::Duration::from_millis(16)));
        Ok(MatrixPreview { window, canvas })
    }

    /// Keyboard fallback for the mouse: WASD moves, Q or Esc quits.
    pub fn poll_input(&self) -> PreviewInput {
        if !self.window.is_open() {
            return PreviewInput::Quit;
        }
        let pressed = |k: Key| self.window.is_key_pressed(k, KeyRepeat::No);
        if pressed(Key::Q) || pressed(Key::Escape) {
            return PreviewInput::Quit;
        }
        let moves = [(Key::W, Move::Up), (Key::S, Move::Down), (Key::A, Move::Left), (Key::D, Move::Right)];
        moves.iter()
            .find(|(k, _)| pressed(*k))
            .map_or(PreviewInput::None, |&(_, m)| PreviewInput::Move(m))
    }

    pub fn render(&mut self, grid: &Grid, status: &str) {
        self.canvas.draw(grid, status);
        let (w, h) = (self.canvas.width(), self.canvas.height());
        if let Err(e) = self.window.update_with_buffer(self.canvas.pixels(), w, h) {
            tracing::warn!(error = %e, "preview update failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use led_serial::Command;

    #[test]
    fn canvas_fits_board() {
        let c = Canvas::for_board(8, 8);
        assert_eq!(c.width(), 8 * 44 + 7 * 6 + 32);
        assert_eq!(c.height(), 8 * 44 + 7 * 6 + 32 + STATUS_H);
        // tiny boards still leave room for the legend
        assert_eq!(Canvas::for_board(1, 1).width(), MIN_W);
    }

    #[test]
    fn led_colour_scales_with_intensity() {
        assert_eq!(led_color(Rgbi::OBSTACLE), 0xFFFF0000);
        assert_eq!(led_color(Rgbi::new(255, 0, 0, 3)), 0xFF550000);
        assert_eq!(led_color(Rgbi::new(255, 0, 0, 0)), OFF_COLOR);
    }

    #[test]
    fn draws_lit_cells() {
        let mut grid = Grid::new(8, 8);
        grid.apply(&Command::set(2, 3, Rgbi::PLAYER).unwrap()).unwrap();
        let mut c = Canvas::for_board(8, 8);
        c.draw(&grid, "ok");

        let (x, y) = Canvas::cell_origin(2, 3);
        assert_eq!(c.pixel(x + CELL / 2, y + CELL / 2), Some(0xFF00FF00));
        assert_eq!(c.pixel(x, y), Some(EDGE_COLOR));
        let (x, y) = Canvas::cell_origin(0, 0);
        assert_eq!(c.pixel(x + CELL / 2, y + CELL / 2), Some(OFF_COLOR));
        assert_eq!(c.pixel(c.width(), 0), None);
    }

    #[test]
    fn unknown_glyph_is_a_dot() {
        assert_eq!(glyph('a'), glyph('A'));
        assert_eq!(glyph('~'), [0, 0, 0b010, 0, 0]);
    }
}
