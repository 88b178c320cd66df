//! gesture_walk — swipe the mouse to walk the player LED around the matrix.

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::mpsc::Receiver;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use flap_bridge::{
    demo_strokes, init_tracing, run, AppState, BridgeConfig, MatrixPreview, Preview, SharedGrid,
    VirtualConnector,
};
use flap_detect::Tuning;
use led_serial::{Link, LinkConfig};
use motion_input::{spawn_motion_source, MotionEvent};

#[derive(Parser, Debug)]
#[command(name = "gesture_walk", about = "Move an LED on the Arduino matrix with mouse swipes")]
struct Args {
    /// TOML file with [tuning], [link] and [scene] sections.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Tuning preset (bird, flap, norma, ship); overrides the config file.
    #[arg(long)]
    preset: Option<String>,

    /// Serial device; overrides the config file.
    #[arg(long)]
    port: Option<String>,

    /// Drive the software matrix instead of a real Arduino.
    #[arg(long = "virtual")]
    virtual_matrix: bool,

    /// Show the software matrix in a window (implies --virtual).
    #[arg(long)]
    preview: bool,

    /// Replay a scripted square walk instead of reading a mouse.
    #[arg(long)]
    demo: bool,

    /// Input device (default: best REL_X/REL_Y candidate).
    #[arg(long)]
    device: Option<PathBuf>,

    /// Skip prompts and use defaults.
    #[arg(long)]
    quick: bool,
}

fn main() -> Result<()> {
    init_tracing("info")?;
    let args = Args::parse();

    println!();
    println!("╔══════════════════════════════════════════════╗");
    println!("║     Gesture Walk — mouse swipes to LEDs      ║");
    println!("╚══════════════════════════════════════════════╝");
    println!();

    let mut cfg = match &args.config {
        Some(p) => BridgeConfig::load(p)?,
        None    => BridgeConfig::default(),
    };
    if let Some(name) = &args.preset {
        cfg.tuning = Tuning::preset(name)?;
    } else if args.config.is_none() && !args.quick {
        cfg.tuning = pick_preset();
    }
    if args.port.is_some() {
        cfg.link.port = args.port.clone();
    }

    let scene = cfg.scene.build()?;
    let use_virtual = args.virtual_matrix || args.preview;

    let (link, preview) = if use_virtual {
        let (rows, cols) = scene.cursor().size();
        let grid = SharedGrid::new(rows, cols);
        let link_cfg = LinkConfig {
            boot_delay_ms: 0,
            ready_wait_ms: 100,
            expect_reply:  true,
            ..cfg.link.clone()
        };
        let link = Link::open(Box::new(VirtualConnector::new(grid.clone())), link_cfg)?;
        let preview = if args.preview {
            println!("  Opening preview window…");
            Some(Preview { window: MatrixPreview::new(rows, cols)?, grid })
        } else {
            None
        };
        (link, preview)
    } else {
        println!("  Connecting to the Arduino (the board resets on open)…");
        (Link::open_serial(cfg.link.clone()).context("opening serial link")?, None)
    };

    let rx = open_input(&args)?;
    println!("  Swipe to move. {}\n", if preview.is_some() { "Close the window or press Q to quit." } else { "Ctrl+C to quit." });

    let app = AppState::new(&cfg.tuning, scene, link, Instant::now());
    run(app, rx, preview)?;
    println!("  Done.");
    Ok(())
}

fn open_input(args: &Args) -> Result<Receiver<MotionEvent>> {
    if args.demo {
        println!("  Input: scripted demo walk");
        return Ok(spawn_motion_source(demo_strokes()));
    }
    open_device(args.device.as_deref())
}

#[cfg(feature = "evdev")]
fn open_device(path: Option<&std::path::Path>) -> Result<Receiver<MotionEvent>> {
    use motion_input::EvdevSource;

    let source = match path {
        Some(p) => EvdevSource::open(p)?,
        None    => EvdevSource::open_mouse()
            .context("check with: ls -l /dev/input/by-id/  and  cat /proc/bus/input/devices")?,
    };
    println!("  [OK] {} | {}", source.path().display(), source.name());
    Ok(spawn_motion_source(source))
}

#[cfg(not(feature = "evdev"))]
fn open_device(_path: Option<&std::path::Path>) -> Result<Receiver<MotionEvent>> {
    anyhow::bail!("built without the `evdev` feature; run with --demo")
}

fn pick_preset() -> Tuning {
    println!("  Tuning preset:");
    println!("    1.bird  (hysteresis, default)  2.flap  3.norma  4.ship");
    let t = match read_line("    Choice (1–4, default 1): ").trim() {
        "2" => Tuning::flap(),
        "3" => Tuning::norma(),
        "4" => Tuning::ship(),
        _   => Tuning::bird(),
    };
    println!();
    t
}

fn read_line(prompt: &str) -> String {
    print!("{}", prompt);
    io::stdout().flush().ok();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf
}
