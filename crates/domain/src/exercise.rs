use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::note::{self, Note};

/// Number of built-in difficulty levels.
pub const LEVEL_COUNT: u8 = 3;

/// The enumerable subset of notes eligible as targets for one difficulty
/// level. Exactly one set is active at a time; the engine invalidates any
/// in-flight target when the level changes.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExerciseSet {
    level: u8,
    notes: Vec<Note>,
}

impl ExerciseSet {
    /// Look up a built-in level. Unknown levels fall back to level 1.
    pub fn for_level(level: u8) -> Self {
        let (level, notes) = match level {
            2 => (2, vec![note::G4, note::A4, note::B4, note::C5]),
            3 => (3, note::white_keys().to_vec()),
            1 => (1, vec![note::C4, note::D4, note::E4, note::F4]),
            _ => (1, vec![note::C4, note::D4, note::E4, note::F4]),
        };
        Self { level, notes }
    }

    pub fn level(&self) -> u8 {
        self.level
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn contains(&self, note: Note) -> bool {
        self.notes.contains(&note)
    }

    /// Uniform random target. The sole source of randomness in the trainer;
    /// callers inject the rng so rounds are reproducible under test.
    pub fn pick_target<R: Rng>(&self, rng: &mut R) -> Note {
        self.notes[rng.gen_range(0..self.notes.len())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn levels_have_expected_sizes() {
        assert_eq!(ExerciseSet::for_level(1).notes().len(), 4);
        assert_eq!(ExerciseSet::for_level(2).notes().len(), 4);
        assert_eq!(ExerciseSet::for_level(3).notes().len(), 8);
    }

    #[test]
    fn unknown_level_falls_back_to_first() {
        let set = ExerciseSet::for_level(9);
        assert_eq!(set.level(), 1);
        assert_eq!(set.notes(), ExerciseSet::for_level(1).notes());
    }

    #[test]
    fn level_three_is_union_of_one_and_two() {
        let three = ExerciseSet::for_level(3);
        for note in ExerciseSet::for_level(1)
            .notes()
            .iter()
            .chain(ExerciseSet::for_level(2).notes())
        {
            assert!(three.contains(*note));
        }
    }

    #[test]
    fn pick_target_stays_in_set() {
        let set = ExerciseSet::for_level(2);
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..50 {
            assert!(set.contains(set.pick_target(&mut rng)));
        }
    }
}
