//! # motion_input
//!
//! Raw relative-motion input for the gesture pipeline.
//!
//! The public interface is [`MotionEvent`] delivered over a `mpsc` channel.
//! Consumers don't need to know whether events came from a real mouse or a
//! scripted replay.
//!
//! ## Feature flags
//!
//! * `evdev` (default) — read `/dev/input/event*` through the `evdev` crate.
//!   Reading input devices usually needs root or membership of the `input`
//!   group.
//! * without `evdev` — only [`ScriptedSource`] is available.

pub mod device;
pub mod source;

pub use device::{pick_best, DeviceInfo};
pub use source::{
    drain, spawn_motion_source, Drained, MotionEvent, MotionSource, ScriptedSource,
    BTN_LEFT,
};

#[cfg(feature = "evdev")]
pub use device::{find_mouse, list_devices};
#[cfg(feature = "evdev")]
pub use source::EvdevSource;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InputError {
    #[error("no relative-motion device (REL_X/REL_Y) found; try running with sudo")]
    NoDevice,
    #[error("failed to open input device {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
