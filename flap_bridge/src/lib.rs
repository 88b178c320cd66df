//! # flap_bridge
//!
//! Mouse gestures in, LED matrix out.
//!
//! ```text
//! MotionSource ──mpsc──► AppState ─────────────► Link ──► Arduino
//! (evdev/demo)           Pipeline                 │
//!                        SwipeDetector            └──► VirtualMatrix ──► preview window
//!                        MatrixScene
//! ```
//!
//! The same pieces back the `flap_monitor` binary, which prints what the
//! detectors see instead of moving anything.

pub mod app;
pub mod config;
pub mod logging;
pub mod monitor;
pub mod virtual_matrix;
pub mod visualizer;

pub use app::{demo_strokes, move_for, run, AppError, AppState, Preview};
pub use config::{BridgeConfig, ConfigError, SceneConfig};
pub use logging::init_tracing;
pub use monitor::{Monitor, MonitorMode};
pub use virtual_matrix::{Grid, SharedGrid, VirtualConnector, VirtualMatrix};
pub use visualizer::{MatrixPreview, PreviewError, PreviewInput};
