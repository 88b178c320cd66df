//! flap_monitor — print what the gesture detectors see, one line per window.

use std::path::PathBuf;
use std::sync::mpsc::Receiver;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;
use flap_bridge::{demo_strokes, init_tracing, Monitor, MonitorMode};
use flap_detect::{Pipeline, Tuning};
use motion_input::{drain, spawn_motion_source, MotionEvent};

#[derive(Parser, Debug)]
#[command(name = "flap_monitor", about = "Watch mouse gestures through the flap detectors")]
struct Args {
    /// What to print.
    #[arg(long, value_enum, default_value_t = MonitorMode::Flap)]
    mode: MonitorMode,

    /// Tuning preset (default: the one matching the mode).
    #[arg(long)]
    preset: Option<String>,

    /// Tuning TOML file; takes precedence over --preset.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Input device (default: best REL_X/REL_Y candidate).
    #[arg(long)]
    device: Option<PathBuf>,

    /// Replay a scripted square walk instead of reading a mouse.
    #[arg(long)]
    demo: bool,
}

fn main() -> Result<()> {
    init_tracing("warn")?;
    let args = Args::parse();

    let tuning = match (&args.config, &args.preset) {
        (Some(path), _)    => Tuning::load(path)?,
        (None, Some(name)) => Tuning::preset(name)?,
        (None, None)       => Tuning::preset(args.mode.default_preset())?,
    };
    tracing::info!(?tuning, mode = ?args.mode, "monitor starting");

    let rx = if args.demo {
        println!("[OK] scripted demo walk");
        spawn_motion_source(demo_strokes())
    } else {
        open_device(args.device.as_deref())?
    };
    println!("Mode: {:?}. Ctrl+C to quit.\n", args.mode);

    let mut pipeline = Pipeline::new(&tuning, Instant::now());
    let mut monitor  = Monitor::new(args.mode, &tuning);

    loop {
        let drained = drain(&rx);
        let idle = drained.events.is_empty();
        for ev in drained.events {
            if let MotionEvent::Rel(r) = ev {
                pipeline.push(r);
            }
        }

        let now = Instant::now();
        if let Some((w, s)) = pipeline.step(now) {
            if let Some(line) = monitor.observe(w, s, now) {
                println!("{}", line);
            }
        }

        if drained.disconnected {
            // close the last partial window
            let end = now + tuning.window();
            if let Some((w, s)) = pipeline.step(end) {
                if let Some(line) = monitor.observe(w, s, end) {
                    println!("{}", line);
                }
            }
            break;
        }
        if idle {
            thread::sleep(Duration::from_millis(2));
        }
    }

    println!("\nInput closed. Flaps: {}", monitor.fired());
    Ok(())
}

#[cfg(feature = "evdev")]
fn open_device(path: Option<&std::path::Path>) -> Result<Receiver<MotionEvent>> {
    use anyhow::Context;
    use motion_input::EvdevSource;

    let source = match path {
        Some(p) => EvdevSource::open(p)?,
        None    => EvdevSource::open_mouse()
            .context("check with: ls -l /dev/input/by-id/  and  cat /proc/bus/input/devices")?,
    };
    println!("[OK] {} | {}", source.path().display(), source.name());
    Ok(spawn_motion_source(source))
}

#[cfg(not(feature = "evdev"))]
fn open_device(_path: Option<&std::path::Path>) -> Result<Receiver<MotionEvent>> {
    anyhow::bail!("built without the `evdev` feature; run with --demo")
}
