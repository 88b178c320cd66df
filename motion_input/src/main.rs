//! motion_probe — print raw relative deltas and left-button clicks.
//!
//! Handy for checking which `/dev/input/event*` node is the mouse and that
//! the process has permission to read it.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "motion_probe", about = "Print raw REL_X/REL_Y deltas and BTN_LEFT clicks")]
struct Args {
    /// Input device to read (default: best REL_X/REL_Y candidate).
    #[arg(long)]
    device: Option<PathBuf>,

    /// List input devices with their discovery score and exit.
    #[arg(long)]
    list: bool,
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    run(args)
}

#[cfg(feature = "evdev")]
fn run(args: Args) -> Result<()> {
    use anyhow::Context;
    use flap_detect::Axis;
    use motion_input::{find_mouse, list_devices, spawn_motion_source, EvdevSource, MotionEvent};

    if args.list {
        for d in list_devices() {
            println!("  [{}] {}  {}", d.score(), d.path.display(), d.name);
        }
        return Ok(());
    }

    let path = match args.device {
        Some(p) => p,
        None    => find_mouse()
            .context("check with: ls -l /dev/input/by-id/  and  cat /proc/bus/input/devices")?
            .path,
    };
    let source = EvdevSource::open(&path)?;
    println!("[OK] Reading: {} | {}", source.path().display(), source.name());
    println!("Move the device. Ctrl+C to quit.\n");

    let rx = spawn_motion_source(source);
    let (mut x, mut y) = (0i64, 0i64);

    for ev in rx {
        match ev {
            MotionEvent::Rel(r) => {
                let (dx, dy) = match r.axis {
                    Axis::X => { x += r.value as i64; (r.value, 0) }
                    Axis::Y => { y += r.value as i64; (0, r.value) }
                };
                println!("dx/dy: ({:+4}, {:+4}) | pos: ({:6}, {:6})", dx, dy, x, y);
            }
            MotionEvent::Button { pressed, .. } => {
                println!("[CLICK] BTN_LEFT={}", if pressed { "DOWN" } else { "UP" });
            }
        }
    }

    tracing::warn!("input device closed");
    Ok(())
}

#[cfg(not(feature = "evdev"))]
fn run(_args: Args) -> Result<()> {
    anyhow::bail!("motion_probe was built without the `evdev` feature")
}
