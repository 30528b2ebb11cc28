use tracing::debug;

use gamut_domain::settings::SettingsStore;
use gamut_domain::{Notation, Note, Preferences};
use gamut_engine::{AutoConfig, RoundEngine, SpeechAnnouncer, Status, ToneRenderer, VisualSurface};
use gamut_input::{MappingRegistry, RawInput, Resolved};

use crate::scoring::{Judgement, Scorekeeper, Tally};

/// Joins the timing engine and the scorekeeper behind one surface for the
/// presentation layer: submissions flow through judgement and a correct
/// answer drives the engine's resolution path.
pub struct Session<R, S, V> {
    engine: RoundEngine<R, S, V>,
    keeper: Scorekeeper,
    notation: Notation,
}

impl<R, S, V> Session<R, S, V>
where
    R: ToneRenderer,
    S: SpeechAnnouncer,
    V: VisualSurface,
{
    pub fn new(mut engine: RoundEngine<R, S, V>, prefs: &Preferences) -> Self {
        engine.configure_auto(AutoConfig::from_preferences(prefs));
        Self {
            engine,
            keeper: Scorekeeper::default(),
            notation: prefs.notation,
        }
    }

    pub fn engine(&self) -> &RoundEngine<R, S, V> {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut RoundEngine<R, S, V> {
        &mut self.engine
    }

    pub fn notation(&self) -> Notation {
        self.notation
    }

    pub fn set_notation(&mut self, notation: Notation) {
        self.notation = notation;
    }

    pub fn tally(&self) -> Tally {
        self.keeper.tally()
    }

    pub fn accuracy(&self) -> u8 {
        self.keeper.accuracy()
    }

    pub fn status(&self) -> &Status {
        self.engine.status()
    }

    pub fn tick(&mut self, now_ms: u64) {
        self.engine.tick(now_ms);
    }

    /// Judge a selected note against the current round. A correct answer
    /// moves the engine into its resolution sequence; anything else leaves
    /// the round untouched.
    pub fn submit(&mut self, note: Note, now_ms: u64) -> Judgement {
        let judgement = self.keeper.submit(
            note,
            self.engine.exercise(),
            self.engine.target(),
            self.engine.answers_enabled(),
            self.notation,
        );
        debug!(midi = note.midi(), ?judgement, "answer judged");
        if matches!(judgement, Judgement::Answered { correct: true, .. }) {
            self.engine.report_correct(now_ms);
        }
        judgement
    }

    /// Push one raw device event through the registry and, when it selects
    /// a note, judge it. Capture outcomes and opaque device reports are
    /// returned untouched for the presentation layer.
    pub fn handle_input(
        &mut self,
        raw: &RawInput,
        registry: &mut MappingRegistry,
        store: &mut dyn SettingsStore,
        now_ms: u64,
    ) -> (Resolved, Option<Judgement>) {
        let resolved = registry.resolve(raw, store);
        match &resolved {
            Resolved::Note(note) => {
                let judgement = self.submit(*note, now_ms);
                (resolved, Some(judgement))
            }
            Resolved::StartRequested => {
                self.engine.start(now_ms);
                (resolved, None)
            }
            _ => (resolved, None),
        }
    }
}
