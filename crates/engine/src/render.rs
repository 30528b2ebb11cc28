use tracing::debug;

use gamut_domain::Note;

/// The audible surface the engine schedules against. Times are seconds on
/// the renderer's own monotonic clock; the engine never blocks on it.
pub trait ToneRenderer {
    /// Whether the sample set has finished loading.
    fn is_ready(&self) -> bool;
    /// Current audio-clock time in seconds.
    fn now(&self) -> f64;
    /// Schedule one tone at an absolute audio-clock time.
    fn schedule_tone(&mut self, note: Note, at: f64, duration: f64, intensity: f32);
}

/// Fire-and-forget speech output. Utterance length is estimated by the
/// engine, never reported back.
pub trait SpeechAnnouncer {
    fn speak(&mut self, text: &str);
}

/// Transient visual feedback on the note grid.
pub trait VisualSurface {
    fn highlight(&mut self, note: Note, duration_ms: u64);
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScheduledTone {
    pub note: Note,
    pub at: f64,
    pub duration: f64,
    pub intensity: f32,
}

/// Renderer that records its schedule instead of making sound. Used by the
/// drill binary and throughout the engine tests; the clock is advanced
/// manually.
#[derive(Debug, Default)]
pub struct NullRenderer {
    ready: bool,
    clock: f64,
    pub scheduled: Vec<ScheduledTone>,
}

impl NullRenderer {
    pub fn ready() -> Self {
        Self {
            ready: true,
            ..Self::default()
        }
    }

    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }

    pub fn advance(&mut self, seconds: f64) {
        self.clock += seconds;
    }
}

impl ToneRenderer for NullRenderer {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn now(&self) -> f64 {
        self.clock
    }

    fn schedule_tone(&mut self, note: Note, at: f64, duration: f64, intensity: f32) {
        debug!(midi = note.midi(), at, duration, intensity, "scheduling tone");
        self.scheduled.push(ScheduledTone {
            note,
            at,
            duration,
            intensity,
        });
    }
}

#[derive(Debug, Default)]
pub struct NullAnnouncer {
    pub spoken: Vec<String>,
}

impl SpeechAnnouncer for NullAnnouncer {
    fn speak(&mut self, text: &str) {
        debug!(text, "speaking");
        self.spoken.push(text.to_string());
    }
}

#[derive(Debug, Default)]
pub struct NullSurface {
    pub highlights: Vec<(Note, u64)>,
}

impl VisualSurface for NullSurface {
    fn highlight(&mut self, note: Note, duration_ms: u64) {
        debug!(midi = note.midi(), duration_ms, "highlight");
        self.highlights.push((note, duration_ms));
    }
}
