use serde::{Deserialize, Serialize};

use gamut_domain::{ExerciseSet, Notation, Note};

/// Attempt counters for one sitting. Monotonic; only an explicit session
/// reset clears them.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tally {
    pub attempts: u32,
    pub correct: u32,
}

impl Tally {
    /// Percentage accuracy, rounded; 0 when nothing has been attempted.
    pub fn accuracy(&self) -> u8 {
        if self.attempts == 0 {
            0
        } else {
            (100.0 * self.correct as f64 / self.attempts as f64).round() as u8
        }
    }

    fn record(&mut self, correct: bool) {
        self.attempts += 1;
        if correct {
            self.correct += 1;
        }
    }
}

/// Outcome of one submitted answer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Judgement {
    /// No live target or answers disabled; nothing happened.
    Ignored,
    /// Note outside the active exercise set: feedback only, never scored,
    /// never compared against the target.
    OutOfRange { message: String },
    Answered { correct: bool, message: String },
}

/// Validates submissions against the live target and keeps the tally.
#[derive(Debug, Default)]
pub struct Scorekeeper {
    tally: Tally,
}

impl Scorekeeper {
    pub fn tally(&self) -> Tally {
        self.tally
    }

    pub fn accuracy(&self) -> u8 {
        self.tally.accuracy()
    }

    pub fn reset(&mut self) {
        self.tally = Tally::default();
    }

    pub fn submit(
        &mut self,
        note: Note,
        set: &ExerciseSet,
        target: Option<Note>,
        answers_enabled: bool,
        notation: Notation,
    ) -> Judgement {
        let Some(target) = target else {
            return Judgement::Ignored;
        };
        if !answers_enabled {
            return Judgement::Ignored;
        }
        if !set.contains(note) {
            return Judgement::OutOfRange {
                message: "Only notes in the highlighted range".to_string(),
            };
        }
        let correct = note == target;
        self.tally.record(correct);
        let message = if correct {
            "Correct".to_string()
        } else {
            format!("Wrong (it was {})", target.label(notation))
        };
        Judgement::Answered { correct, message }
    }
}
