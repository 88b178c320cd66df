//! # flap_detect
//!
//! Turns raw relative-motion deltas (mouse `REL_X` / `REL_Y`) into discrete
//! gestures.  Every stage is pure: time is passed in as an [`Instant`], so the
//! same pipeline runs against a live device or a scripted test.
//!
//! ```text
//! RelEvent ─► WindowAccumulator ─► Smoother ─► normalize / classify ─► detector
//!             (deadzone, window)   (EMA)       (0..100, direction)    (hysteresis,
//!                                                                      cooldown)
//! ```
//!
//! ## Quick start
//!
//! ```rust
//! use std::time::{Duration, Instant};
//! use flap_detect::{Axis, Pipeline, RelEvent, Tuning, UpFlapDetector};
//!
//! let tuning = Tuning::bird();
//! let t0 = Instant::now();
//! let mut pipeline = Pipeline::new(&tuning, t0);
//! let mut up = UpFlapDetector::from_tuning(&tuning);
//!
//! pipeline.push(RelEvent { axis: Axis::Y, value: -90 });
//! let now = t0 + Duration::from_millis(60);
//! if let Some((_, smoothed)) = pipeline.step(now) {
//!     assert!(up.update(smoothed.dy, now));
//! }
//! ```
//!
//! [`Instant`]: std::time::Instant

pub mod window;
pub mod smoothing;
pub mod intensity;
pub mod detector;
pub mod tuning;

pub use window::{Axis, RelEvent, Window, WindowAccumulator};
pub use smoothing::{Ema, Smoothed, Smoother};
pub use intensity::{classify, normalize, Direction, Reading};
pub use detector::{DeltaFlapDetector, SwipeDetector, UpFlapDetector};
pub use tuning::{Pipeline, Tuning, TuningError};
