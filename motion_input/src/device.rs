//! Picking the mouse among `/dev/input/event*`.
//!
//! Anything reporting `REL_X` or `REL_Y` is a candidate.  A candidate that
//! also has a left button is almost certainly a real mouse and outranks
//! trackpads, knobs and other relative devices.

use std::path::PathBuf;

/// Capabilities of one input device that matter for discovery.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceInfo {
    pub path:     PathBuf,
    pub name:     String,
    pub has_rel:  bool,
    pub has_left: bool,
}

impl DeviceInfo {
    /// 0 = not a candidate, 1 = relative axes, 2 = relative axes + left button.
    pub fn score(&self) -> u8 {
        match (self.has_rel, self.has_left) {
            (false, _)    => 0,
            (true, false) => 1,
            (true, true)  => 2,
        }
    }
}

/// Highest-scoring candidate; the first one wins a tie.
pub fn pick_best<I>(devices: I) -> Option<DeviceInfo>
where
    I: IntoIterator<Item = DeviceInfo>,
{
    let mut best: Option<DeviceInfo> = None;
    for d in devices {
        if d.score() == 0 {
            continue;
        }
        let better = match &best {
            Some(b) => d.score() > b.score(),
            None    => true,
        };
        if better {
            best = Some(d);
        }
    }
    best
}

// ────────────────────────────────────────────────────────────────────────────
// evdev enumeration
// ────────────────────────────────────────────────────────────────────────────

#[cfg(feature = "evdev")]
fn describe(path: PathBuf, dev: &evdev::Device) -> DeviceInfo {
    use evdev::{Key, RelativeAxisType};

    let has_rel = dev.supported_relative_axes().is_some_and(|axes| {
        axes.contains(RelativeAxisType::REL_X) || axes.contains(RelativeAxisType::REL_Y)
    });
    let has_left = dev
        .supported_keys()
        .is_some_and(|keys| keys.contains(Key::BTN_LEFT));

    DeviceInfo {
        path,
        name: dev.name().unwrap_or("unknown").to_string(),
        has_rel,
        has_left,
    }
}

/// Every readable input device with its capabilities.
#[cfg(feature = "evdev")]
pub fn list_devices() -> Vec<DeviceInfo> {
    evdev::enumerate()
        .map(|(path, dev)| describe(path, &dev))
        .collect()
}

/// Find the most mouse-like device on the system.
#[cfg(feature = "evdev")]
pub fn find_mouse() -> Result<DeviceInfo, crate::InputError> {
    let found = pick_best(list_devices()).ok_or(crate::InputError::NoDevice)?;
    tracing::info!(path = %found.path.display(), name = %found.name, "selected input device");
    Ok(found)
}
