use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::note::Notation;
use crate::DomainError;

/// Store key holding the serialized [`Preferences`] blob.
pub const PREFS_KEY: &str = "gamut-prefs";
/// Store key holding the serialized input-binding table.
pub const KEYMAP_KEY: &str = "gamut-keymap";

/// Selectable auto-mode cycle lengths, in milliseconds.
pub const AUTO_INTERVALS_MS: [u32; 5] = [3000, 5000, 8000, 10000, 15000];

const DEFAULT_AUTO_INTERVAL_MS: u32 = 5000;

/// Key/value persistence used for preferences and the input map. Failures
/// are surfaced as errors but never treated as fatal by callers: the
/// in-memory value wins and the write is simply lost.
pub trait SettingsStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), DomainError>;
}

/// In-memory store for tests and the demo binary.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: BTreeMap<String, String>,
}

impl SettingsStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), DomainError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Preferences {
    pub notation: Notation,
    pub dark_theme: bool,
    pub auto_mode: bool,
    pub auto_interval_ms: u32,
    pub reveal_answer: bool,
    pub speak_answer: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            notation: Notation::Solfege,
            dark_theme: false,
            auto_mode: false,
            auto_interval_ms: DEFAULT_AUTO_INTERVAL_MS,
            reveal_answer: true,
            speak_answer: false,
        }
    }
}

impl Preferences {
    /// Clamp stored values to the supported domain. An interval outside the
    /// fixed menu falls back to the default.
    pub fn sanitized(mut self) -> Self {
        if !AUTO_INTERVALS_MS.contains(&self.auto_interval_ms) {
            self.auto_interval_ms = DEFAULT_AUTO_INTERVAL_MS;
        }
        self
    }

    /// Load from the store, falling back to defaults on a missing or
    /// unreadable entry.
    pub fn load(store: &dyn SettingsStore) -> Self {
        let loaded = store
            .get(PREFS_KEY)
            .and_then(|raw| match serde_json::from_str::<Preferences>(&raw) {
                Ok(prefs) => Some(prefs),
                Err(err) => {
                    warn!(%err, "stored preferences unreadable, using defaults");
                    None
                }
            })
            .unwrap_or_default();
        loaded.sanitized()
    }

    /// Persist to the store. A failed write is logged and otherwise ignored.
    pub fn save(&self, store: &mut dyn SettingsStore) {
        let raw = match serde_json::to_string(self) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(%err, "could not serialize preferences");
                return;
            }
        };
        if let Err(err) = store.set(PREFS_KEY, &raw) {
            warn!(%err, "could not persist preferences");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let prefs = Preferences::default();
        assert_eq!(prefs.notation, Notation::Solfege);
        assert!(!prefs.dark_theme);
        assert!(!prefs.auto_mode);
        assert_eq!(prefs.auto_interval_ms, 5000);
        assert!(prefs.reveal_answer);
        assert!(!prefs.speak_answer);
    }

    #[test]
    fn round_trips_through_store() {
        let mut store = MemoryStore::default();
        let prefs = Preferences {
            notation: Notation::Letter,
            dark_theme: true,
            auto_interval_ms: 8000,
            ..Default::default()
        };
        prefs.save(&mut store);
        assert_eq!(Preferences::load(&store), prefs);
    }

    #[test]
    fn invalid_interval_falls_back() {
        let prefs = Preferences {
            auto_interval_ms: 1234,
            ..Default::default()
        }
        .sanitized();
        assert_eq!(prefs.auto_interval_ms, 5000);
    }

    #[test]
    fn unreadable_blob_yields_defaults() {
        let mut store = MemoryStore::default();
        store.set(PREFS_KEY, "not json").unwrap();
        assert_eq!(Preferences::load(&store), Preferences::default());
    }

    #[test]
    fn missing_fields_take_defaults() {
        let prefs: Preferences = serde_json::from_str("{\"notation\":\"letter\"}").unwrap();
        assert_eq!(prefs.notation, Notation::Letter);
        assert_eq!(prefs.auto_interval_ms, 5000);
        assert!(prefs.reveal_answer);
    }
}
