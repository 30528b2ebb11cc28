use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Axis deflection (fraction of full range) at or above which an axis
/// counts as pressed. Level trigger, no hysteresis: evaluated once per
/// poll tick.
pub const AXIS_THRESHOLD: f32 = 0.5;

const RESERVED_IDS: [&str; 6] = ["escape", "shift", "control", "alt", "meta", "tab"];

/// One control reading from a gamepad poll tick.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum GamepadSample {
    Button {
        pad: usize,
        button: usize,
        pressed: bool,
    },
    Axis {
        pad: usize,
        axis: usize,
        value: f32,
    },
}

/// A raw event from any physical input source. The registry is the only
/// component that interprets these; HID and BLE payloads pass through to
/// the host untouched.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum RawInput {
    Keyboard { key: String, code: String },
    Gamepad(GamepadSample),
    Hid { report_id: u8, data: Vec<u8> },
    Ble { data: Vec<u8> },
}

/// Candidate logical ids for a keyboard event: the printed key (bare and
/// `key:`-prefixed) and the physical code (`code:`-prefixed). Unidentified
/// values are skipped.
pub(crate) fn keyboard_candidates(key: &str, code: &str) -> Vec<String> {
    let mut ids = Vec::new();
    let key = key.to_lowercase();
    let code = code.to_lowercase();
    if !key.is_empty() && key != "unidentified" && key != "undefined" {
        ids.push(key.clone());
        ids.push(format!("key:{key}"));
    }
    if !code.is_empty() && code != "unidentified" && code != "undefined" {
        ids.push(format!("code:{code}"));
    }
    ids
}

/// Control and meta keys are never valid binding targets.
pub(crate) fn is_reserved(id: &str) -> bool {
    let bare = id
        .strip_prefix("key:")
        .or_else(|| id.strip_prefix("code:"))
        .unwrap_or(id);
    RESERVED_IDS.contains(&bare)
}

/// Tracks which gamepad controls are currently held so a control only
/// fires on the poll tick where it crosses the press threshold.
#[derive(Debug, Default, Clone)]
pub struct GamepadTracker {
    held: BTreeSet<String>,
}

impl GamepadTracker {
    /// Feed one sample; returns the logical id if this tick is a fresh
    /// press. Releases (and axis returns to centre) clear the held state
    /// silently.
    pub fn newly_pressed(&mut self, sample: &GamepadSample) -> Option<String> {
        match sample {
            GamepadSample::Button { pad, button, pressed } => {
                let id = format!("gamepad:{pad}:btn{button}");
                if *pressed {
                    self.held.insert(id.clone()).then_some(id)
                } else {
                    self.held.remove(&id);
                    None
                }
            }
            GamepadSample::Axis { pad, axis, value } => {
                let positive = format!("gamepad:{pad}:axis{axis}+");
                let negative = format!("gamepad:{pad}:axis{axis}-");
                if *value >= AXIS_THRESHOLD {
                    self.held.remove(&negative);
                    self.held.insert(positive.clone()).then_some(positive)
                } else if *value <= -AXIS_THRESHOLD {
                    self.held.remove(&positive);
                    self.held.insert(negative.clone()).then_some(negative)
                } else {
                    self.held.remove(&positive);
                    self.held.remove(&negative);
                    None
                }
            }
        }
    }

    pub fn reset(&mut self) {
        self.held.clear();
    }
}
