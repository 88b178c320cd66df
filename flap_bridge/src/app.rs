//! Top-level application state machine.
//!
//! `AppState` owns the detection pipeline, the swipe detector, the matrix
//! scene and the serial link.  Motion events go in through
//! [`AppState::handle_motion`]; [`AppState::tick`] closes windows, asks the
//! detector for a swipe and turns it into LED commands.  When the input
//! source ends, [`AppState::flush`] closes the last partial window so a
//! stroke that arrived just before the end still counts.

use std::sync::mpsc::Receiver;
use std::thread;
use std::time::{Duration, Instant};

use flap_detect::{Axis, Direction, Pipeline, SwipeDetector, Tuning};
use led_serial::{Link, LinkError, MatrixScene, Move};
use motion_input::{drain, MotionEvent, ScriptedSource};
use thiserror::Error;

use crate::virtual_matrix::SharedGrid;
use crate::visualizer::{MatrixPreview, PreviewError, PreviewInput};

/// Sleep between polls when no input arrived.
const IDLE_SLEEP: Duration = Duration::from_millis(2);

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Link(#[from] LinkError),
    #[error(transparent)]
    Preview(#[from] PreviewError),
}

/// Screen direction to matrix step: a swipe up moves the player up a row.
pub fn move_for(d: Direction) -> Move {
    match d {
        Direction::Up    => Move::Up,
        Direction::Down  => Move::Down,
        Direction::Left  => Move::Left,
        Direction::Right => Move::Right,
    }
}

// ════════════════════════════════════════════════════════════════════════════
// AppState
// ════════════════════════════════════════════════════════════════════════════

pub struct AppState {
    // ── detection ─────────────────────────────────────────────────────────
    pipeline: Pipeline,
    swipe:    SwipeDetector,
    window:   Duration,

    // ── output ────────────────────────────────────────────────────────────
    scene:    MatrixScene,
    link:     Link,

    // ── counters ──────────────────────────────────────────────────────────
    swipes:   u32,
    moves:    u32,
    clicks:   u32,
    replies:  u32,

    pub status: String,
}

impl AppState {
    pub fn new(tuning: &Tuning, scene: MatrixScene, link: Link, now: Instant) -> Self {
        AppState {
            pipeline: Pipeline::new(tuning, now),
            swipe:    SwipeDetector::from_tuning(tuning),
            window:   tuning.window(),
            scene,
            link,
            swipes:   0,
            moves:    0,
            clicks:   0,
            replies:  0,
            status:   "Ready. Swipe to move.".to_string(),
        }
    }

    /// Draw the opening frame: clear, obstacles, player.
    pub fn start(&mut self) -> Result<(), LinkError> {
        self.link.send_all(&self.scene.initial_commands())?;
        self.collect_replies();
        tracing::info!(obstacles = self.scene.obstacles().len(), "matrix initialised");
        Ok(())
    }

    // ── input ─────────────────────────────────────────────────────────────

    pub fn handle_motion(&mut self, ev: MotionEvent) {
        match ev {
            MotionEvent::Rel(r) => self.pipeline.push(r),
            MotionEvent::Button { pressed: true, .. } => self.clicks += 1,
            MotionEvent::Button { .. } => {}
        }
    }

    /// Run one pipeline step.  Returns the swipe, if one fired.
    pub fn tick(&mut self, now: Instant) -> Result<Option<Direction>, LinkError> {
        let Some((_, smoothed)) = self.pipeline.step(now) else { return Ok(None) };
        let Some(dir) = self.swipe.update(smoothed, now) else { return Ok(None) };

        self.swipes += 1;
        tracing::debug!(direction = %dir, sm_dx = smoothed.dx, sm_dy = smoothed.dy, "swipe");
        self.apply_move(move_for(dir))?;
        Ok(Some(dir))
    }

    /// Close whatever window is still open, as if `window` had elapsed.
    pub fn flush(&mut self, now: Instant) -> Result<Option<Direction>, LinkError> {
        self.tick(now + self.window)
    }

    /// Step the player and push the LED changes.  `false` at the board edge.
    pub fn apply_move(&mut self, m: Move) -> Result<bool, LinkError> {
        let cmds = self.scene.apply(m);
        if cmds.is_empty() {
            self.status = format!("{:?}: edge of the board", m);
            return Ok(false);
        }
        self.link.send_all(&cmds)?;
        self.collect_replies();
        self.moves += 1;
        let (row, col) = self.scene.cursor().position();
        self.status = format!("{:?} to ({}, {})  moves={}", m, row, col, self.moves);
        Ok(true)
    }

    /// Consume acknowledgements the link did not wait for.
    fn collect_replies(&mut self) {
        if self.link.config().expect_reply {
            return;
        }
        let n = self.link.drain_replies(Duration::ZERO).len();
        self.replies += n as u32;
    }

    /// Clear the matrix and drop the link.
    pub fn finish(mut self) {
        tracing::info!(swipes = self.swipes, moves = self.moves, clicks = self.clicks, "session ended");
        self.link.close();
    }

    // ── accessors ─────────────────────────────────────────────────────────

    pub fn scene(&self) -> &MatrixScene { &self.scene }
    pub fn swipes(&self) -> u32         { self.swipes }
    pub fn moves(&self) -> u32          { self.moves }
    pub fn clicks(&self) -> u32         { self.clicks }
    pub fn replies(&self) -> u32        { self.replies }
}

/// A square walk for running without a mouse: right, down, left, up.
///
/// Each stroke is followed by enough stillness for the detector to re-arm.
pub fn demo_strokes() -> ScriptedSource {
    let every = Duration::from_millis(10);
    let rest  = Duration::from_millis(600);
    let side  = |axis, v| ScriptedSource::stroke(axis, v, 5, every);

    let mut walk = ScriptedSource::new(Vec::new());
    for _ in 0..3 {
        walk = walk
            .then(rest, side(Axis::X,  12))
            .then(rest, side(Axis::Y,  12))
            .then(rest, side(Axis::X, -12))
            .then(rest, side(Axis::Y, -12));
    }
    walk
}

// ════════════════════════════════════════════════════════════════════════════
// run() — the main application loop
// ════════════════════════════════════════════════════════════════════════════

/// Optional preview window and the grid it mirrors.
pub struct Preview {
    pub window: MatrixPreview,
    pub grid:   SharedGrid,
}

/// Drive the app until the input source ends (headless) or the preview
/// window is closed.
pub fn run(mut app: AppState, rx: Receiver<MotionEvent>, mut preview: Option<Preview>) -> Result<(), AppError> {
    app.start()?;

    let result = event_loop(&mut app, &rx, preview.as_mut());
    app.finish();
    result
}

fn event_loop(app: &mut AppState, rx: &Receiver<MotionEvent>, mut preview: Option<&mut Preview>) -> Result<(), AppError> {
    loop {
        // 1. Drain input
        let drained = drain(rx);
        let idle = drained.events.is_empty();
        for ev in drained.events {
            app.handle_motion(ev);
        }

        // 2. Detection
        app.tick(Instant::now())?;

        // 3. Preview window, or stop once the source is gone
        match preview.as_deref_mut() {
            Some(p) => {
                match p.window.poll_input() {
                    PreviewInput::Quit    => return Ok(()),
                    PreviewInput::Move(m) => { app.apply_move(m)?; }
                    PreviewInput::None    => {}
                }
                let grid = p.grid.snapshot();
                p.window.render(&grid, &app.status);
            }
            None if drained.disconnected => {
                app.flush(Instant::now())?;
                tracing::info!("input source finished");
                return Ok(());
            }
            None => {}
        }

        if idle {
            thread::sleep(IDLE_SLEEP);
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::virtual_matrix::VirtualConnector;
    use flap_detect::RelEvent;
    use led_serial::{LinkConfig, Rgbi};
    use motion_input::spawn_motion_source;

    fn ms(n: u64) -> Duration { Duration::from_millis(n) }

    fn quick_link(grid: &SharedGrid) -> Link {
        quick_link_with(grid, true)
    }

    fn quick_link_with(grid: &SharedGrid, expect_reply: bool) -> Link {
        let config = LinkConfig {
            boot_delay_ms: 0,
            ready_wait_ms: 10,
            expect_reply,
            ..LinkConfig::default()
        };
        Link::open(Box::new(VirtualConnector::new(grid.clone())), config).unwrap()
    }

    fn make_app(t0: Instant) -> (AppState, SharedGrid) {
        let grid = SharedGrid::new(8, 8);
        let mut app = AppState::new(&Tuning::bird(), MatrixScene::default(), quick_link(&grid), t0);
        app.start().unwrap();
        (app, grid)
    }

    fn rel(axis: Axis, value: i32) -> MotionEvent {
        MotionEvent::Rel(RelEvent { axis, value })
    }

    #[test]
    fn start_draws_scene() {
        let (_app, grid) = make_app(Instant::now());
        let g = grid.lock();
        assert_eq!(g.get(0, 0), Some(Rgbi::PLAYER));
        assert_eq!(g.get(5, 5), Some(Rgbi::OBSTACLE));
        assert_eq!(g.get(7, 7), Some(Rgbi::OBSTACLE));
        assert_eq!(g.lit(), 3);
    }

    #[test]
    fn swipe_right_moves_player() {
        let t0 = Instant::now();
        let (mut app, grid) = make_app(t0);
        app.handle_motion(rel(Axis::X, 40));
        assert_eq!(app.tick(t0 + ms(20)).unwrap(), None);
        assert_eq!(app.tick(t0 + ms(55)).unwrap(), Some(Direction::Right));

        assert_eq!(app.scene().cursor().position(), (0, 1));
        let g = grid.lock();
        assert_eq!(g.get(0, 0), Some(Rgbi::OFF));
        assert_eq!(g.get(0, 1), Some(Rgbi::PLAYER));
    }

    #[test]
    fn one_stroke_one_move() {
        let t0 = Instant::now();
        let (mut app, _) = make_app(t0);
        app.handle_motion(rel(Axis::Y, 40));
        let mut t = t0;
        let mut fired = 0;
        for _ in 0..6 {
            t += ms(55);
            if app.tick(t).unwrap().is_some() {
                fired += 1;
            }
        }
        assert_eq!(fired, 1);
        assert_eq!(app.moves(), 1);
        assert_eq!(app.scene().cursor().position(), (1, 0));
    }

    #[test]
    fn swipe_into_edge_is_detected_but_blocked() {
        let t0 = Instant::now();
        let (mut app, grid) = make_app(t0);
        app.handle_motion(rel(Axis::Y, -40));
        assert_eq!(app.tick(t0 + ms(55)).unwrap(), Some(Direction::Up));
        assert_eq!(app.swipes(), 1);
        assert_eq!(app.moves(), 0);
        assert!(app.status.contains("edge"));
        assert_eq!(grid.lock().get(0, 0), Some(Rgbi::PLAYER));
    }

    #[test]
    fn small_motion_is_ignored() {
        let t0 = Instant::now();
        let (mut app, _) = make_app(t0);
        app.handle_motion(rel(Axis::X, 2)); // inside the deadzone
        assert_eq!(app.tick(t0 + ms(55)).unwrap(), None);
        assert_eq!(app.swipes(), 0);
    }

    #[test]
    fn clicks_counted_not_moved() {
        let t0 = Instant::now();
        let (mut app, _) = make_app(t0);
        app.handle_motion(MotionEvent::Button { code: motion_input::BTN_LEFT, pressed: true });
        app.handle_motion(MotionEvent::Button { code: motion_input::BTN_LEFT, pressed: false });
        assert_eq!(app.clicks(), 1);
        assert_eq!(app.tick(t0 + ms(55)).unwrap(), None);
    }

    #[test]
    fn keyboard_moves_share_the_scene() {
        let (mut app, grid) = make_app(Instant::now());
        assert!(app.apply_move(Move::Down).unwrap());
        assert!(app.apply_move(Move::Right).unwrap());
        assert!(app.apply_move(Move::Up).unwrap());
        assert!(!app.apply_move(Move::Up).unwrap());
        assert_eq!(app.scene().cursor().position(), (0, 1));
        assert_eq!(grid.lock().lit(), 3);
    }

    #[test]
    fn finish_clears_matrix() {
        let (app, grid) = make_app(Instant::now());
        app.finish();
        assert_eq!(grid.lock().lit(), 0);
    }

    #[test]
    fn headless_run_ends_with_source() {
        let grid = SharedGrid::new(8, 8);
        let app = AppState::new(&Tuning::bird(), MatrixScene::default(), quick_link(&grid), Instant::now());
        let source = ScriptedSource::stroke(Axis::X, 20, 4, ms(5));
        let rx = spawn_motion_source(source);

        run(app, rx, None).unwrap();
        // closed link leaves a dark board
        assert_eq!(grid.lock().lit(), 0);
    }

    #[test]
    fn flush_closes_the_last_window() {
        let t0 = Instant::now();
        let (mut app, _) = make_app(t0);
        app.handle_motion(rel(Axis::X, 40));
        assert_eq!(app.tick(t0 + ms(20)).unwrap(), None);
        assert_eq!(app.flush(t0 + ms(20)).unwrap(), Some(Direction::Right));
        assert_eq!(app.scene().cursor().position(), (0, 1));
    }

    #[test]
    fn stroke_just_before_source_ends_still_moves() {
        let grid = SharedGrid::new(8, 8);
        let mut app = AppState::new(&Tuning::bird(), MatrixScene::default(), quick_link(&grid), Instant::now());
        app.start().unwrap();
        // 4 × 20 over 15 ms: the source ends well inside the first window
        let rx = spawn_motion_source(ScriptedSource::stroke(Axis::X, 20, 4, ms(5)));

        event_loop(&mut app, &rx, None).unwrap();
        assert_eq!(app.swipes(), 1);
        assert_eq!(app.moves(), 1);
        assert_eq!(app.scene().cursor().position(), (0, 1));
        assert_eq!(grid.lock().get(0, 1), Some(Rgbi::PLAYER));
    }

    #[test]
    fn unrequested_replies_are_drained() {
        let grid = SharedGrid::new(8, 8);
        let mut app = AppState::new(&Tuning::bird(), MatrixScene::default(), quick_link_with(&grid, false), Instant::now());
        app.start().unwrap();
        // CL plus the two obstacles and the player
        assert_eq!(app.replies(), 4);

        assert!(app.apply_move(Move::Right).unwrap());
        assert_eq!(app.replies(), 6);
        assert!(!app.apply_move(Move::Up).unwrap());
        assert_eq!(app.replies(), 6);
    }

    #[test]
    fn waited_replies_are_not_counted_twice() {
        let (mut app, _) = make_app(Instant::now());
        assert!(app.apply_move(Move::Down).unwrap());
        assert_eq!(app.replies(), 0);
    }

    #[test]
    fn demo_walk_is_a_closed_square() {
        let steps = demo_strokes().steps;
        assert_eq!(steps.len(), 3 * 4 * 5);
        let (mut x, mut y) = (0, 0);
        for (_, ev) in steps {
            if let MotionEvent::Rel(r) = ev {
                match r.axis {
                    Axis::X => x += r.value,
                    Axis::Y => y += r.value,
                }
            }
        }
        assert_eq!((x, y), (0, 0));
    }
}
