//! matrix_console — talk to the Arduino LED matrix by hand.
//!
//! Two modes:
//! * `repl` — type raw protocol lines (`CL`, `55`, `552550000001`); `EXIT` quits.
//! * `walk` — move the green player LED with W/A/S/D; `Q`, Esc or Ctrl+C quits.

use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use led_serial::{Command, Link, LinkConfig, MatrixScene, Move};
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Mode {
    Repl,
    Walk,
}

#[derive(Parser, Debug)]
#[command(name = "matrix_console", about = "Send commands to an Arduino LED matrix over serial")]
struct Args {
    /// Serial device (default: auto-detect, then /dev/ttyACM0).
    #[arg(long)]
    port: Option<String>,

    /// Baud rate.
    #[arg(long)]
    baud: Option<u32>,

    /// Console mode; asked interactively when omitted.
    #[arg(long, value_enum)]
    mode: Option<Mode>,

    /// TOML file with link settings.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Skip prompts: walk mode with default settings.
    #[arg(long)]
    quick: bool,
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            toml::from_str::<LinkConfig>(&text)
                .with_context(|| format!("parsing {}", path.display()))?
        }
        None => LinkConfig::default(),
    };
    if args.port.is_some() {
        config.port = args.port.clone();
    }
    if let Some(b) = args.baud {
        config.baud = b;
    }

    println!();
    println!("╔══════════════════════════════════════════════╗");
    println!("║        Matrix Console — Arduino LED grid      ║");
    println!("╚══════════════════════════════════════════════╝");
    println!();

    let mode = match args.mode {
        Some(m)             => m,
        None if args.quick  => Mode::Walk,
        None                => pick_mode(),
    };

    println!("  Connecting (the board resets on open)…");
    let mut link = Link::open_serial(config).context("opening serial link")?;
    println!("  [OK] Connected.\n");

    let result = match mode {
        Mode::Repl => repl(&mut link),
        Mode::Walk => walk(&mut link),
    };
    link.close();
    println!("  Closed.");
    result
}

fn pick_mode() -> Mode {
    println!("  1. REPL  (type protocol lines)");
    println!("  2. Walk  (WASD player)");
    match read_line("  Choice (1–2, default 2): ").trim() {
        "1" => Mode::Repl,
        _   => Mode::Walk,
    }
}

// ════════════════════════════════════════════════════════════════════════════
// REPL
// ════════════════════════════════════════════════════════════════════════════

fn repl(link: &mut Link) -> Result<()> {
    println!("  Commands: CL | RC | RCRRRGGGBBBI   (EXIT to quit)");
    loop {
        let line = read_line("> ");
        if line.is_empty() {
            // stdin closed
            return Ok(());
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.eq_ignore_ascii_case("exit") {
            return Ok(());
        }
        let cmd: Command = match line.parse() {
            Ok(c)  => c,
            Err(e) => {
                tracing::warn!(input = line, "{}", e);
                continue;
            }
        };
        if let Some(reply) = link.send(&cmd)? {
            println!("[ARDUINO] {}", reply);
        }
        for reply in link.drain_replies(Duration::from_millis(100)) {
            println!("[ARDUINO] {}", reply);
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Walk
// ════════════════════════════════════════════════════════════════════════════

/// Raw mode for as long as it lives.
struct RawMode;

impl RawMode {
    fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(RawMode)
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

/// How long to listen for acknowledgements after a move.
const REPLY_POLL: Duration = Duration::from_millis(20);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum WalkKey {
    Quit,
    Step(Move),
    Ignore,
}

/// Raw mode swallows SIGINT, so Ctrl+C arrives here as a key.
fn walk_key(key: &KeyEvent) -> WalkKey {
    if key.kind != KeyEventKind::Press {
        return WalkKey::Ignore;
    }
    match key.code {
        KeyCode::Esc => WalkKey::Quit,
        KeyCode::Char(c) if key.modifiers.contains(KeyModifiers::CONTROL) => {
            if c.eq_ignore_ascii_case(&'c') { WalkKey::Quit } else { WalkKey::Ignore }
        }
        KeyCode::Char(c) if c.eq_ignore_ascii_case(&'q') => WalkKey::Quit,
        KeyCode::Char(c) => Move::from_key(c).map_or(WalkKey::Ignore, WalkKey::Step),
        _ => WalkKey::Ignore,
    }
}

fn walk(link: &mut Link) -> Result<()> {
    let mut scene = MatrixScene::default();
    link.send_all(&scene.initial_commands())?;
    for reply in link.drain_replies(REPLY_POLL) {
        println!("[ARDUINO] {}", reply);
    }
    println!("  W/A/S/D to move, Q or Ctrl+C to quit.");

    let _raw = RawMode::enable().context("enabling raw terminal mode")?;
    loop {
        let Event::Key(key) = event::read()? else { continue };
        let m = match walk_key(&key) {
            WalkKey::Quit    => return Ok(()),
            WalkKey::Ignore  => continue,
            WalkKey::Step(m) => m,
        };
        let cmds = scene.apply(m);
        if cmds.is_empty() {
            continue;
        }
        link.send_all(&cmds)?;
        let (row, col) = scene.cursor().position();
        tracing::debug!(row, col, "player moved");
        for reply in link.drain_replies(REPLY_POLL) {
            // raw mode: no implicit carriage return
            print!("[ARDUINO] {}\r\n", reply);
        }
        io::stdout().flush().ok();
    }
}

fn read_line(prompt: &str) -> String {
    print!("{}", prompt);
    io::stdout().flush().ok();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn ctrl_c_quits_walk() {
        assert_eq!(walk_key(&press(KeyCode::Char('c'), KeyModifiers::CONTROL)), WalkKey::Quit);
        assert_eq!(walk_key(&press(KeyCode::Char('C'), KeyModifiers::CONTROL | KeyModifiers::SHIFT)), WalkKey::Quit);
        // plain c is not a move either
        assert_eq!(walk_key(&press(KeyCode::Char('c'), KeyModifiers::NONE)), WalkKey::Ignore);
    }

    #[test]
    fn quit_keys() {
        assert_eq!(walk_key(&press(KeyCode::Char('q'), KeyModifiers::NONE)), WalkKey::Quit);
        assert_eq!(walk_key(&press(KeyCode::Char('Q'), KeyModifiers::SHIFT)), WalkKey::Quit);
        assert_eq!(walk_key(&press(KeyCode::Esc, KeyModifiers::NONE)), WalkKey::Quit);
    }

    #[test]
    fn wasd_steps_and_ctrl_letters_do_not() {
        assert_eq!(walk_key(&press(KeyCode::Char('d'), KeyModifiers::NONE)), WalkKey::Step(Move::Right));
        assert_eq!(walk_key(&press(KeyCode::Char('W'), KeyModifiers::SHIFT)), WalkKey::Step(Move::Up));
        assert_eq!(walk_key(&press(KeyCode::Char('d'), KeyModifiers::CONTROL)), WalkKey::Ignore);
        assert_eq!(walk_key(&press(KeyCode::Enter, KeyModifiers::NONE)), WalkKey::Ignore);
    }

    #[test]
    fn releases_are_ignored() {
        let mut key = press(KeyCode::Char('q'), KeyModifiers::NONE);
        key.kind = KeyEventKind::Release;
        assert_eq!(walk_key(&key), WalkKey::Ignore);
    }
}
