use std::collections::BTreeMap;

use tracing::{debug, warn};

use gamut_domain::note::{self, Note};
use gamut_domain::settings::{SettingsStore, KEYMAP_KEY};

use crate::raw::{is_reserved, keyboard_candidates, GamepadTracker, RawInput};

/// Outcome of pushing one raw event through the registry.
#[derive(Clone, Debug, PartialEq)]
pub enum Resolved {
    /// A bound control fired: treat as a note selection.
    Note(Note),
    /// An open capture consumed the input and installed a binding.
    Captured { note: Note, id: String },
    /// Escape pressed while capturing; table untouched.
    CaptureCancelled,
    /// Only reserved ids were derived while capturing; capture stays open.
    CaptureIgnored,
    /// Enter pressed outside capture: the host should trigger start.
    StartRequested,
    /// HID/BLE payload; opaque to the registry, surfaced for the host.
    DeviceReport,
    /// Nothing matched.
    Unmapped,
}

/// Owns the logical-id to note table and the transient capture state.
/// Gameplay resolution is suppressed while a capture is open, so a capture
/// keystroke can never double as a note trigger.
#[derive(Debug, Default)]
pub struct MappingRegistry {
    bindings: BTreeMap<String, Note>,
    capture: Option<Note>,
    pads: GamepadTracker,
}

impl MappingRegistry {
    /// Load the persisted table, or install the default home-row layout if
    /// nothing usable is stored.
    pub fn load(store: &mut dyn SettingsStore) -> Self {
        let bindings = store
            .get(KEYMAP_KEY)
            .and_then(|raw| match serde_json::from_str::<BTreeMap<String, u8>>(&raw) {
                Ok(map) => Some(map),
                Err(err) => {
                    warn!(%err, "stored keymap unreadable, using default layout");
                    None
                }
            })
            .map(|map| {
                map.into_iter()
                    .filter_map(|(id, midi)| Note::from_midi(midi).ok().map(|n| (id, n)))
                    .collect::<BTreeMap<_, _>>()
            })
            .filter(|map| !map.is_empty());

        match bindings {
            Some(bindings) => Self {
                bindings,
                ..Self::default()
            },
            None => {
                let registry = Self {
                    bindings: default_layout(),
                    ..Self::default()
                };
                registry.persist(store);
                registry
            }
        }
    }

    pub fn bindings(&self) -> &BTreeMap<String, Note> {
        &self.bindings
    }

    /// The note awaiting a capture, if a capture is open.
    pub fn capturing(&self) -> Option<Note> {
        self.capture
    }

    pub fn begin_capture(&mut self, note: Note) {
        debug!(midi = note.midi(), "capture opened");
        self.capture = Some(note);
    }

    pub fn cancel_capture(&mut self) {
        self.capture = None;
    }

    /// Install `id -> note`, first dropping any binding already pointing at
    /// the note and any binding already using the id. Reserved ids are
    /// refused. Returns whether a binding was installed.
    pub fn complete_capture(
        &mut self,
        id: &str,
        note: Note,
        store: &mut dyn SettingsStore,
    ) -> bool {
        if id.is_empty() || is_reserved(id) {
            return false;
        }
        self.bindings
            .retain(|bound_id, bound| *bound != note && bound_id.as_str() != id);
        self.bindings.insert(id.to_string(), note);
        debug!(id, midi = note.midi(), "binding installed");
        self.persist(store);
        true
    }

    /// Remove every binding pointing at the note.
    pub fn clear_binding(&mut self, note: Note, store: &mut dyn SettingsStore) {
        self.bindings.retain(|_, bound| *bound != note);
        self.persist(store);
    }

    /// The binding shown next to a note in a key-mapping list: a
    /// single-character keyboard id if one exists, else a gamepad id, else
    /// any. Namespace prefixes are stripped for display.
    pub fn primary_binding(&self, note: Note) -> Option<String> {
        let ids: Vec<&String> = self
            .bindings
            .iter()
            .filter(|(_, bound)| **bound == note)
            .map(|(id, _)| id)
            .collect();
        let chosen = ids
            .iter()
            .find(|id| id.chars().count() == 1)
            .or_else(|| ids.iter().find(|id| id.starts_with("gamepad:")))
            .or_else(|| ids.first())?;
        let display = chosen
            .strip_prefix("key:")
            .or_else(|| chosen.strip_prefix("code:"))
            .unwrap_or(chosen.as_str());
        Some(display.to_string())
    }

    /// Resolve one raw event to a note selection, a capture outcome, or a
    /// pass-through device report.
    pub fn resolve(&mut self, raw: &RawInput, store: &mut dyn SettingsStore) -> Resolved {
        match raw {
            RawInput::Keyboard { key, code } => self.resolve_keyboard(key, code, store),
            RawInput::Gamepad(sample) => {
                let Some(id) = self.pads.newly_pressed(sample) else {
                    return Resolved::Unmapped;
                };
                if let Some(note) = self.capture {
                    self.capture = None;
                    self.complete_capture(&id, note, store);
                    return Resolved::Captured { note, id };
                }
                match self.bindings.get(&id) {
                    Some(note) => Resolved::Note(*note),
                    None => Resolved::Unmapped,
                }
            }
            RawInput::Hid { .. } | RawInput::Ble { .. } => Resolved::DeviceReport,
        }
    }

    fn resolve_keyboard(
        &mut self,
        key: &str,
        code: &str,
        store: &mut dyn SettingsStore,
    ) -> Resolved {
        if let Some(note) = self.capture {
            if key.eq_ignore_ascii_case("escape") {
                self.capture = None;
                return Resolved::CaptureCancelled;
            }
            let ids: Vec<String> = keyboard_candidates(key, code)
                .into_iter()
                .filter(|id| !is_reserved(id))
                .collect();
            let Some(chosen) = preferred_id(&ids) else {
                return Resolved::CaptureIgnored;
            };
            self.capture = None;
            self.complete_capture(&chosen, note, store);
            return Resolved::Captured { note, id: chosen };
        }

        if key.eq_ignore_ascii_case("enter") {
            return Resolved::StartRequested;
        }

        let ids = keyboard_candidates(key, code);
        let lookup = ids
            .iter()
            .filter(|id| id.starts_with("code:"))
            .chain(ids.iter().filter(|id| id.starts_with("key:")))
            .chain(ids.iter().filter(|id| !id.contains(':')));
        for id in lookup {
            if let Some(note) = self.bindings.get(id) {
                return Resolved::Note(*note);
            }
        }
        Resolved::Unmapped
    }

    fn persist(&self, store: &mut dyn SettingsStore) {
        let map: BTreeMap<&str, u8> = self
            .bindings
            .iter()
            .map(|(id, note)| (id.as_str(), note.midi()))
            .collect();
        let raw = match serde_json::to_string(&map) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(%err, "could not serialize keymap");
                return;
            }
        };
        if let Err(err) = store.set(KEYMAP_KEY, &raw) {
            warn!(%err, "could not persist keymap, keeping in-memory table");
        }
    }
}

/// Physical code over printed key over the first derived id.
fn preferred_id(ids: &[String]) -> Option<String> {
    ids.iter()
        .find(|id| id.starts_with("code:"))
        .or_else(|| ids.iter().find(|id| id.starts_with("key:")))
        .or_else(|| ids.first())
        .cloned()
}

/// Home-row defaults: a..k over the white keys C4..C5.
fn default_layout() -> BTreeMap<String, Note> {
    let keys = ["a", "s", "d", "f", "g", "h", "j", "k"];
    keys.iter()
        .zip(note::white_keys())
        .map(|(id, note)| (id.to_string(), note))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::GamepadSample;
    use gamut_domain::settings::MemoryStore;
    use gamut_domain::DomainError;

    fn key_event(key: &str, code: &str) -> RawInput {
        RawInput::Keyboard {
            key: key.to_string(),
            code: code.to_string(),
        }
    }

    fn button(pad: usize, index: usize, pressed: bool) -> RawInput {
        RawInput::Gamepad(GamepadSample::Button {
            pad,
            button: index,
            pressed,
        })
    }

    #[test]
    fn default_layout_resolves_home_row() {
        let mut store = MemoryStore::default();
        let mut registry = MappingRegistry::load(&mut store);
        assert_eq!(
            registry.resolve(&key_event("a", "KeyA"), &mut store),
            Resolved::Note(note::C4)
        );
        assert_eq!(
            registry.resolve(&key_event("k", "KeyK"), &mut store),
            Resolved::Note(note::C5)
        );
    }

    #[test]
    fn captured_binding_round_trips() {
        let mut store = MemoryStore::default();
        let mut registry = MappingRegistry::load(&mut store);
        for target in gamut_domain::ExerciseSet::for_level(3).notes() {
            registry.begin_capture(*target);
            let resolved = registry.resolve(&key_event("q", "KeyQ"), &mut store);
            assert!(matches!(resolved, Resolved::Captured { note, .. } if note == *target));
            assert_eq!(
                registry.resolve(&key_event("q", "KeyQ"), &mut store),
                Resolved::Note(*target)
            );
        }
    }

    #[test]
    fn rebinding_takes_over_the_physical_key() {
        let mut store = MemoryStore::default();
        let mut registry = MappingRegistry::load(&mut store);
        // The "a" key starts out on C4; capture it for D4.
        registry.begin_capture(note::D4);
        registry.resolve(&key_event("a", "KeyA"), &mut store);
        // The captured code id outranks the stock bare "a" binding.
        assert_eq!(
            registry.resolve(&key_event("a", "KeyA"), &mut store),
            Resolved::Note(note::D4)
        );
        // D4's previous home-row key no longer fires.
        assert_eq!(
            registry.resolve(&key_event("s", "KeyS"), &mut store),
            Resolved::Unmapped
        );
    }

    #[test]
    fn rebinding_a_note_drops_its_previous_id() {
        let mut store = MemoryStore::default();
        let mut registry = MappingRegistry::load(&mut store);
        registry.begin_capture(note::C4);
        registry.resolve(&key_event("z", "KeyZ"), &mut store);
        // The stock "a" binding for C4 must be gone.
        assert_eq!(
            registry.resolve(&key_event("a", "KeyA"), &mut store),
            Resolved::Unmapped
        );
        let ids: Vec<_> = registry
            .bindings()
            .iter()
            .filter(|(_, n)| **n == note::C4)
            .collect();
        assert_eq!(ids.len(), 1);
    }

    #[test]
    fn escape_cancels_capture_without_mutation() {
        let mut store = MemoryStore::default();
        let mut registry = MappingRegistry::load(&mut store);
        let before = registry.bindings().clone();
        registry.begin_capture(note::D4);
        assert_eq!(
            registry.resolve(&key_event("Escape", "Escape"), &mut store),
            Resolved::CaptureCancelled
        );
        assert_eq!(registry.capturing(), None);
        assert_eq!(registry.bindings(), &before);
    }

    #[test]
    fn reserved_key_keeps_capture_open() {
        let mut store = MemoryStore::default();
        let mut registry = MappingRegistry::load(&mut store);
        registry.begin_capture(note::E4);
        assert_eq!(
            registry.resolve(&key_event("Shift", "Shift"), &mut store),
            Resolved::CaptureIgnored
        );
        assert_eq!(registry.capturing(), Some(note::E4));
        // Follow-up input still completes the capture.
        let resolved = registry.resolve(&key_event("p", "KeyP"), &mut store);
        assert!(matches!(resolved, Resolved::Captured { note, .. } if note == note::E4));
    }

    #[test]
    fn capture_consumes_input_instead_of_playing_it() {
        let mut store = MemoryStore::default();
        let mut registry = MappingRegistry::load(&mut store);
        registry.begin_capture(note::F4);
        // "s" is bound to D4, but while capturing it must be consumed as
        // an assignment, not a note trigger.
        let resolved = registry.resolve(&key_event("s", "KeyS"), &mut store);
        assert!(matches!(resolved, Resolved::Captured { note, .. } if note == note::F4));
    }

    #[test]
    fn physical_code_wins_over_printed_key() {
        let mut store = MemoryStore::default();
        let mut registry = MappingRegistry::load(&mut store);
        registry.complete_capture("z", note::C4, &mut store);
        registry.complete_capture("code:keyz", note::D4, &mut store);
        assert_eq!(
            registry.resolve(&key_event("z", "KeyZ"), &mut store),
            Resolved::Note(note::D4)
        );
    }

    #[test]
    fn gamepad_button_captures_and_resolves() {
        let mut store = MemoryStore::default();
        let mut registry = MappingRegistry::load(&mut store);
        registry.begin_capture(note::G4);
        let resolved = registry.resolve(&button(0, 5, true), &mut store);
        assert_eq!(
            resolved,
            Resolved::Captured {
                note: note::G4,
                id: "gamepad:0:btn5".to_string()
            }
        );
        // Held button does not retrigger; fresh press resolves.
        assert_eq!(registry.resolve(&button(0, 5, true), &mut store), Resolved::Unmapped);
        registry.resolve(&button(0, 5, false), &mut store);
        assert_eq!(
            registry.resolve(&button(0, 5, true), &mut store),
            Resolved::Note(note::G4)
        );
    }

    #[test]
    fn hid_and_ble_pass_through() {
        let mut store = MemoryStore::default();
        let mut registry = MappingRegistry::load(&mut store);
        let hid = RawInput::Hid {
            report_id: 1,
            data: vec![0x02, 0x00],
        };
        let ble = RawInput::Ble { data: vec![0xff] };
        assert_eq!(registry.resolve(&hid, &mut store), Resolved::DeviceReport);
        assert_eq!(registry.resolve(&ble, &mut store), Resolved::DeviceReport);
    }

    #[test]
    fn enter_requests_start_outside_capture() {
        let mut store = MemoryStore::default();
        let mut registry = MappingRegistry::load(&mut store);
        assert_eq!(
            registry.resolve(&key_event("Enter", "Enter"), &mut store),
            Resolved::StartRequested
        );
    }

    #[test]
    fn clear_binding_removes_all_ids_for_note() {
        let mut store = MemoryStore::default();
        let mut registry = MappingRegistry::load(&mut store);
        registry.complete_capture("gamepad:0:btn1", note::C4, &mut store);
        registry.complete_capture("x", note::C4, &mut store);
        registry.clear_binding(note::C4, &mut store);
        assert!(registry.bindings().values().all(|n| *n != note::C4));
    }

    #[test]
    fn primary_binding_prefers_single_char_then_gamepad() {
        let mut store = MemoryStore::default();
        let mut registry = MappingRegistry::default();
        registry.complete_capture("gamepad:0:btn2", note::A4, &mut store);
        assert_eq!(registry.primary_binding(note::A4).as_deref(), Some("gamepad:0:btn2"));
        registry.complete_capture("h", note::A4, &mut store);
        // complete_capture replaced the gamepad binding; add it back to
        // exercise the preference order with both present.
        registry.bindings.insert("gamepad:0:btn2".to_string(), note::A4);
        assert_eq!(registry.primary_binding(note::A4).as_deref(), Some("h"));
        assert_eq!(registry.primary_binding(note::D5), None);
    }

    #[test]
    fn table_survives_reload() {
        let mut store = MemoryStore::default();
        let mut registry = MappingRegistry::load(&mut store);
        registry.complete_capture("code:keym", note::B4, &mut store);
        let mut reloaded = MappingRegistry::load(&mut store);
        assert_eq!(
            reloaded.resolve(&key_event("m", "KeyM"), &mut store),
            Resolved::Note(note::B4)
        );
    }

    struct FailingStore;

    impl SettingsStore for FailingStore {
        fn get(&self, _key: &str) -> Option<String> {
            None
        }

        fn set(&mut self, _key: &str, _value: &str) -> Result<(), DomainError> {
            Err(DomainError::storage("disk full"))
        }
    }

    #[test]
    fn store_failure_keeps_in_memory_table() {
        let mut store = FailingStore;
        let mut registry = MappingRegistry::load(&mut store);
        registry.begin_capture(note::D4);
        registry.resolve(&key_event("w", "KeyW"), &mut store);
        assert_eq!(
            registry.resolve(&key_event("w", "KeyW"), &mut store),
            Resolved::Note(note::D4)
        );
    }
}
