use gamut_domain::note::{self, Note};

use crate::render::ToneRenderer;

/// Duration of each cadence chord, seconds.
pub const STEP: f64 = 0.65;
/// Offset from "now" at which the cadence begins.
pub const START_OFFSET: f64 = 0.05;
/// Gap between cadence end and the target tone.
pub const TARGET_GAP: f64 = 0.12;
/// Target tone length and intensity: longer and softer than resolution.
pub const TARGET_DURATION: f64 = 0.9;
pub const TARGET_INTENSITY: f32 = 0.18;
/// Total intensity of a cadence chord, split evenly across its voices.
const CHORD_INTENSITY: f32 = 0.24;

/// I–IV–V–I in C major, voiced for smooth motion around the common tone.
const CADENCE_CHORDS: [[Note; 3]; 4] = [
    [note::C4, note::E4, note::G4],
    [note::C4, note::F4, note::A4],
    [note::B3, note::D4, note::G4],
    [note::C4, note::E4, note::G4],
];

fn schedule_chord(renderer: &mut dyn ToneRenderer, chord: &[Note], at: f64, duration: f64) {
    let per_voice = CHORD_INTENSITY / chord.len().max(1) as f32;
    for note in chord {
        renderer.schedule_tone(*note, at, duration, per_voice);
    }
}

/// Schedule the four cadence chords back to back starting just after the
/// renderer's current time. Returns the audio-clock time at which the
/// cadence ends.
pub fn schedule_cadence(renderer: &mut dyn ToneRenderer) -> f64 {
    let t0 = renderer.now() + START_OFFSET;
    for (i, chord) in CADENCE_CHORDS.iter().enumerate() {
        schedule_chord(renderer, chord, t0 + i as f64 * STEP, STEP);
    }
    t0 + CADENCE_CHORDS.len() as f64 * STEP
}

/// Schedule the two-tone resolution: the target restated briefly, then the
/// tonic. Returns the audio-clock time at which the second tone ends.
pub fn schedule_resolution(renderer: &mut dyn ToneRenderer, target: Note, t0: f64) -> f64 {
    renderer.schedule_tone(target, t0, 0.45, 0.16);
    renderer.schedule_tone(note::C4, t0 + 0.46, 0.8, 0.18);
    t0 + 0.46 + 0.82
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::NullRenderer;
    use approx::assert_relative_eq;

    #[test]
    fn cadence_is_four_back_to_back_chords() {
        let mut renderer = NullRenderer::ready();
        let end = schedule_cadence(&mut renderer);
        assert_eq!(renderer.scheduled.len(), 12);
        assert_relative_eq!(end, 0.05 + 4.0 * STEP);
        // Chords start at t0, t0+step, t0+2step, t0+3step.
        for (i, tone) in renderer.scheduled.iter().enumerate() {
            let chord_index = (i / 3) as f64;
            assert_relative_eq!(tone.at, 0.05 + chord_index * STEP);
            assert_relative_eq!(tone.duration, STEP);
        }
    }

    #[test]
    fn cadence_end_tracks_renderer_clock() {
        let mut renderer = NullRenderer::ready();
        renderer.advance(10.0);
        let end = schedule_cadence(&mut renderer);
        assert_relative_eq!(end, 10.05 + 4.0 * STEP);
    }

    #[test]
    fn chord_intensity_is_split_per_voice() {
        let mut renderer = NullRenderer::ready();
        schedule_cadence(&mut renderer);
        for tone in &renderer.scheduled {
            assert_relative_eq!(tone.intensity, 0.24_f32 / 3.0);
        }
    }

    #[test]
    fn resolution_restates_target_then_tonic() {
        let mut renderer = NullRenderer::ready();
        let end = schedule_resolution(&mut renderer, note::G4, 1.0);
        assert_eq!(renderer.scheduled.len(), 2);
        assert_eq!(renderer.scheduled[0].note, note::G4);
        assert_eq!(renderer.scheduled[1].note, note::C4);
        assert_relative_eq!(renderer.scheduled[1].at, 1.46);
        assert_relative_eq!(end, 1.0 + 0.46 + 0.82);
    }
}
