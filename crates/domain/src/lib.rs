pub mod error;
pub mod exercise;
pub mod note;
pub mod settings;

pub use crate::error::DomainError;
pub use crate::exercise::ExerciseSet;
pub use crate::note::{Notation, Note};
pub use crate::settings::{MemoryStore, Preferences, SettingsStore};
