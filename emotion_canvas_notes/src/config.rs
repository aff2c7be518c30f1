// Note tables: the mood and scale configuration the mapper reads.
//
// `NoteTables` is built once at startup (from a built-in preset set or from
// a JSON file), validated, and then only ever read. The mapper borrows it, so
// tests can hand-build small fixture tables without touching globals.
//
// File format (either key may be omitted to keep the built-in table):
//
//   {
//     "moods":  { "happy": { "bpm": 115, "step": 4, "scale": "C_ionian",
//                            "vel": [80, 100], "legato": 0.9 } },
//     "scales": { "C_ionian": { "notes": [60, 62, 64, 65, 67, 69, 71] } }
//   }
//
// Validation rejects tables the mapper could not produce sensible notes from
// (non-positive tempo or legato, inverted or out-of-MIDI velocity windows).
// A mood pointing at a missing scale is accepted and only logged: the mapper
// falls back to C Ionian for it.

use std::path::{Path, PathBuf};

use log::warn;
use serde::Deserialize;
use thiserror::Error;

use crate::mapper::NoteMapper;
use crate::mood::{MoodTable, PresetSet};
use crate::scale::ScaleTable;

/// Highest MIDI velocity.
pub const MAX_VELOCITY: u8 = 127;

/// Errors raised while building or loading note tables.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed note tables: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("scale '{0}' has no notes")]
    EmptyScale(String),

    #[error("mood '{mood}': {reason}")]
    InvalidMood { mood: String, reason: String },
}

/// Mood and scale tables, loaded once and shared read-only.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteTables {
    pub moods: MoodTable,
    pub scales: ScaleTable,
}

#[derive(Deserialize)]
struct TablesFile {
    #[serde(default)]
    moods: Option<MoodTable>,
    #[serde(default)]
    scales: Option<ScaleTable>,
}

impl Default for NoteTables {
    fn default() -> Self {
        Self::preset(PresetSet::default())
    }
}

impl NoteTables {
    pub fn new(moods: MoodTable, scales: ScaleTable) -> Self {
        NoteTables { moods, scales }
    }

    /// Built-in moods for `set` over the full built-in scale table.
    pub fn preset(set: PresetSet) -> Self {
        NoteTables {
            moods: MoodTable::preset(set),
            scales: ScaleTable::builtin(),
        }
    }

    /// Parse tables from JSON text and validate them. Omitted tables fall
    /// back to `base`.
    pub fn from_json(json: &str, base: PresetSet) -> Result<Self, ConfigError> {
        let file: TablesFile = serde_json::from_str(json)?;
        let tables = NoteTables {
            moods: file.moods.unwrap_or_else(|| MoodTable::preset(base)),
            scales: file.scales.unwrap_or_else(ScaleTable::builtin),
        };
        tables.validate()?;
        Ok(tables)
    }

    /// Read and validate a JSON tables file.
    pub fn load(path: &Path, base: PresetSet) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json, base)
    }

    /// Check every mood for values the mapper cannot use.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, style) in self.moods.iter() {
            let invalid = |reason: String| ConfigError::InvalidMood {
                mood: name.clone(),
                reason,
            };
            if !(style.tempo.is_finite() && style.tempo > 0.0) {
                return Err(invalid(format!("bpm must be positive, got {}", style.tempo)));
            }
            if !(style.phrasing.is_finite() && style.phrasing > 0.0) {
                return Err(invalid(format!(
                    "legato must be positive, got {}",
                    style.phrasing
                )));
            }
            let vel = style.velocity;
            if vel.min > vel.max {
                return Err(invalid(format!("vel [{}, {}] is inverted", vel.min, vel.max)));
            }
            if vel.max > MAX_VELOCITY {
                return Err(invalid(format!(
                    "vel max {} exceeds {MAX_VELOCITY}",
                    vel.max
                )));
            }
            if !self.scales.contains(&style.scale) {
                warn!(
                    "mood '{name}' references unknown scale '{}'; it will play in the default scale",
                    style.scale
                );
            }
        }
        Ok(())
    }

    /// Borrow a mapper over these tables.
    pub fn mapper(&self) -> NoteMapper<'_> {
        NoteMapper::new(&self.moods, &self.scales)
    }
}
