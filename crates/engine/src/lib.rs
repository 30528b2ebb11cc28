pub mod cadence;
pub mod render;
pub mod round;
pub(crate) mod timer;

pub use crate::render::{
    NullAnnouncer, NullRenderer, NullSurface, ScheduledTone, SpeechAnnouncer, ToneRenderer,
    VisualSurface,
};
pub use crate::round::{AutoConfig, Phase, RoundEngine, Status};
