//! led_serial — drive an Arduino LED matrix over a serial line.
//!
//! ```text
//!  Command ──encode──► Link ──► Transport ──► Arduino
//!    ▲                  │  ▲
//!    │             retry│  │reconnect
//!  MatrixScene          ▼  │
//!  (cursor walk)     Connector (detect port / fallback)
//! ```
//!
//! The wire protocol ([`command`]) is plain ASCII, one command per line.
//! [`link::Link`] adds the boot handshake, per-command retries with
//! exponential backoff, and reconnection after an unplug.

pub mod color;
pub mod command;
pub mod link;
pub mod matrix;
pub mod port;

pub use color::{Rgbi, MAX_INTENSITY};
pub use command::{Command, CommandError, MAX_COORD};
pub use link::{
    Connector, Link, LinkConfig, LinkError, RetryPolicy, SerialConnector, SerialTransport, Transport,
};
pub use matrix::{MatrixCursor, MatrixScene, Move, DEFAULT_SIZE};
pub use port::{available_candidates, detect_arduino, pick_arduino, PortCandidate};
