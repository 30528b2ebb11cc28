pub mod raw;
pub mod registry;

pub use crate::raw::{GamepadSample, GamepadTracker, RawInput, AXIS_THRESHOLD};
pub use crate::registry::{MappingRegistry, Resolved};
