//! Motion sources — real evdev devices and scripted replays.

use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;
use std::time::Duration;

use flap_detect::RelEvent;

/// Linux `BTN_LEFT` key code.
pub const BTN_LEFT: u16 = 0x110;

// ════════════════════════════════════════════════════════════════════════════
// MotionEvent
// ════════════════════════════════════════════════════════════════════════════

/// One event from a relative-motion device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MotionEvent {
    /// Relative axis delta.
    Rel(RelEvent),
    /// Button press (`pressed = true`) or release.
    Button { code: u16, pressed: bool },
}

// ════════════════════════════════════════════════════════════════════════════
// MotionSource trait — unified interface for hw and scripted input
// ════════════════════════════════════════════════════════════════════════════

/// Anything that can deliver [`MotionEvent`]s over a channel.
///
/// `run` blocks until the source is exhausted or the receiver is dropped.
pub trait MotionSource: Send + 'static {
    fn run(self: Box<Self>, tx: Sender<MotionEvent>);
}

/// Spawn a motion source on its own thread and return the receiving end.
pub fn spawn_motion_source<S: MotionSource>(source: S) -> Receiver<MotionEvent> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || Box::new(source).run(tx));
    rx
}

/// Result of a non-blocking drain.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Drained {
    pub events:       Vec<MotionEvent>,
    /// The source thread has finished and no more events will arrive.
    pub disconnected: bool,
}

/// Collect every event already waiting in `rx` without blocking.
pub fn drain(rx: &Receiver<MotionEvent>) -> Drained {
    let mut out = Drained::default();
    loop {
        match rx.try_recv() {
            Ok(ev)                          => out.events.push(ev),
            Err(TryRecvError::Empty)        => break,
            Err(TryRecvError::Disconnected) => { out.disconnected = true; break; }
        }
    }
    out
}

// ════════════════════════════════════════════════════════════════════════════
// EvdevSource — real hardware (feature = "evdev")
// ════════════════════════════════════════════════════════════════════════════

/// Reads a `/dev/input/event*` device on a blocking loop.
///
/// Only `REL_X`, `REL_Y` and `BTN_LEFT` are forwarded; everything else
/// (sync reports, wheel, misc scancodes) is dropped.
#[cfg(feature = "evdev")]
pub struct EvdevSource {
    path:   std::path::PathBuf,
    device: evdev::Device,
}

#[cfg(feature = "evdev")]
impl EvdevSource {
    pub fn open(path: &std::path::Path) -> Result<Self, crate::InputError> {
        let device = evdev::Device::open(path).map_err(|source| crate::InputError::Open {
            path: path.display().to_string(),
            source,
        })?;
        Ok(EvdevSource { path: path.to_path_buf(), device })
    }

    /// Open the device chosen by [`crate::find_mouse`].
    pub fn open_mouse() -> Result<Self, crate::InputError> {
        let info = crate::device::find_mouse()?;
        Self::open(&info.path)
    }

    pub fn name(&self) -> &str { self.device.name().unwrap_or("unknown") }
    pub fn path(&self) -> &std::path::Path { &self.path }
}

#[cfg(feature = "evdev")]
fn translate(ev: &evdev::InputEvent) -> Option<MotionEvent> {
    use evdev::{InputEventKind, Key, RelativeAxisType};
    use flap_detect::Axis;

    match ev.kind() {
        InputEventKind::RelAxis(RelativeAxisType::REL_X) =>
            Some(MotionEvent::Rel(RelEvent { axis: Axis::X, value: ev.value() })),
        InputEventKind::RelAxis(RelativeAxisType::REL_Y) =>
            Some(MotionEvent::Rel(RelEvent { axis: Axis::Y, value: ev.value() })),
        InputEventKind::Key(Key::BTN_LEFT) if matches!(ev.value(), 0 | 1) =>
            Some(MotionEvent::Button { code: BTN_LEFT, pressed: ev.value() == 1 }),
        _ => None,
    }
}

#[cfg(feature = "evdev")]
impl MotionSource for EvdevSource {
    fn run(mut self: Box<Self>, tx: Sender<MotionEvent>) {
        loop {
            let events = match self.device.fetch_events() {
                Ok(evs) => evs,
                Err(e)  => {
                    tracing::warn!(path = %self.path.display(), error = %e, "input device read failed");
                    return;
                }
            };
            for ev in events {
                if let Some(m) = translate(&ev) {
                    if tx.send(m).is_err() { return; }
                }
            }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// ScriptedSource — replay (always available)
// ════════════════════════════════════════════════════════════════════════════

/// Replays a fixed list of events, sleeping `delay` before each one.
#[derive(Clone, Debug, Default)]
pub struct ScriptedSource {
    pub steps: Vec<(Duration, MotionEvent)>,
}

impl ScriptedSource {
    pub fn new(steps: Vec<(Duration, MotionEvent)>) -> Self { ScriptedSource { steps } }

    /// A straight stroke of `count` deltas on one axis, `every` apart.
    pub fn stroke(axis: flap_detect::Axis, per_event: i32, count: usize, every: Duration) -> Self {
        let ev = MotionEvent::Rel(RelEvent { axis, value: per_event });
        ScriptedSource { steps: vec![(every, ev); count] }
    }

    /// Append `other` after a pause.
    pub fn then(mut self, pause: Duration, other: ScriptedSource) -> Self {
        let mut rest = other.steps.into_iter();
        if let Some((d, ev)) = rest.next() {
            self.steps.push((pause + d, ev));
        }
        self.steps.extend(rest);
        self
    }
}

impl MotionSource for ScriptedSource {
    fn run(self: Box<Self>, tx: Sender<MotionEvent>) {
        for (delay, ev) in self.steps {
            if !delay.is_zero() {
                thread::sleep(delay);
            }
            if tx.send(ev).is_err() { return; }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use flap_detect::Axis;

    fn rel(axis: Axis, value: i32) -> MotionEvent {
        MotionEvent::Rel(RelEvent { axis, value })
    }

    #[test]
    fn scripted_source_delivers_in_order() {
        let src = ScriptedSource::new(vec![
            (Duration::ZERO, rel(Axis::X, 1)),
            (Duration::ZERO, rel(Axis::Y, -2)),
            (Duration::ZERO, MotionEvent::Button { code: BTN_LEFT, pressed: true }),
        ]);
        let rx = spawn_motion_source(src);
        let got: Vec<_> = rx.iter().collect();
        assert_eq!(got.len(), 3);
        assert_eq!(got[1], rel(Axis::Y, -2));
    }

    #[test]
    fn drain_reports_disconnect() {
        let rx = spawn_motion_source(ScriptedSource::new(vec![(Duration::ZERO, rel(Axis::X, 5))]));
        // wait for the thread to finish
        let first = rx.recv().unwrap();
        assert_eq!(first, rel(Axis::X, 5));
        let mut d = drain(&rx);
        for _ in 0..100 {
            if d.disconnected { break; }
            thread::sleep(Duration::from_millis(5));
            d = drain(&rx);
        }
        assert!(d.events.is_empty());
        assert!(d.disconnected);
    }

    #[test]
    fn drain_empty_channel_is_not_disconnect() {
        let (tx, rx) = mpsc::channel::<MotionEvent>();
        let d = drain(&rx);
        assert!(!d.disconnected);
        drop(tx);
        assert!(drain(&rx).disconnected);
    }

    #[test]
    fn stroke_and_then() {
        let s = ScriptedSource::stroke(Axis::Y, -4, 3, Duration::from_millis(5))
            .then(Duration::from_millis(100), ScriptedSource::stroke(Axis::X, 2, 2, Duration::from_millis(5)));
        assert_eq!(s.steps.len(), 5);
        assert_eq!(s.steps[3].0, Duration::from_millis(105));
        assert_eq!(s.steps[4].1, rel(Axis::X, 2));
    }
}
