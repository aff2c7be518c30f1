// Mood definitions: the musical character attached to each emotion name.
//
// A `MoodStyle` bundles tempo, note-trigger subdivision (`step`), the scale it
// plays in, a velocity window and a legato factor. Field names on the wire
// follow the browser client's vocabulary (`bpm`, `vel`, `legato`), and every
// numeric field has a default so hand-written config files can stay short.
//
// Two preset sets ship with the crate. `PresetSet::Creative` is the canonical
// backend table; `PresetSet::Aligned` mirrors the offline fallback the
// browser client uses when the backend is unreachable. Both reference scales
// from `ScaleTable::builtin()`.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Tempo used when a mood omits `bpm`.
pub const DEFAULT_TEMPO: f64 = 90.0;
/// Subdivision used when a mood omits `step`.
pub const DEFAULT_STEP: i32 = 4;
/// Legato factor used when a mood omits `legato`.
pub const DEFAULT_PHRASING: f64 = 1.0;

fn default_tempo() -> f64 {
    DEFAULT_TEMPO
}

fn default_step() -> i32 {
    DEFAULT_STEP
}

fn default_phrasing() -> f64 {
    DEFAULT_PHRASING
}

/// Inclusive `[min, max]` velocity window. Serialized as a two-element array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[u8; 2]", into = "[u8; 2]")]
pub struct VelocityRange {
    pub min: u8,
    pub max: u8,
}

impl VelocityRange {
    pub const fn new(min: u8, max: u8) -> Self {
        VelocityRange { min, max }
    }
}

impl Default for VelocityRange {
    fn default() -> Self {
        VelocityRange::new(60, 100)
    }
}

impl From<[u8; 2]> for VelocityRange {
    fn from([min, max]: [u8; 2]) -> Self {
        VelocityRange { min, max }
    }
}

impl From<VelocityRange> for [u8; 2] {
    fn from(range: VelocityRange) -> Self {
        [range.min, range.max]
    }
}

/// Musical settings for one mood.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodStyle {
    /// Beats per minute. Must be positive.
    #[serde(rename = "bpm", default = "default_tempo")]
    pub tempo: f64,
    /// Note-trigger subdivision per beat. Only stateful callers use it for
    /// timing; the mapper divides the beat by it, treating anything below 1
    /// (zero or negative) as 1.
    #[serde(default = "default_step")]
    pub step: i32,
    /// Name of the scale in the `ScaleTable`.
    pub scale: String,
    #[serde(rename = "vel", default)]
    pub velocity: VelocityRange,
    /// Multiplier on note length; above 1.0 overlaps the next subdivision.
    #[serde(rename = "legato", default = "default_phrasing")]
    pub phrasing: f64,
    /// Display colours for the canvas, passed through to clients untouched.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub palette: Vec<String>,
}

impl MoodStyle {
    pub fn new(tempo: f64, step: i32, scale: &str, velocity: VelocityRange, phrasing: f64) -> Self {
        MoodStyle {
            tempo,
            step,
            scale: scale.into(),
            velocity,
            phrasing,
            palette: Vec::new(),
        }
    }

    pub fn with_palette(mut self, colors: &[&str]) -> Self {
        self.palette = colors.iter().map(|c| (*c).to_string()).collect();
        self
    }
}

/// Which built-in mood table to start from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresetSet {
    /// The backend's own presets: five moods over modal scales.
    #[default]
    Creative,
    /// The browser fallback presets: four moods over major/minor scales.
    Aligned,
}

impl fmt::Display for PresetSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PresetSet::Creative => f.write_str("creative"),
            PresetSet::Aligned => f.write_str("aligned"),
        }
    }
}

impl FromStr for PresetSet {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "creative" => Ok(PresetSet::Creative),
            "aligned" => Ok(PresetSet::Aligned),
            other => Err(format!(
                "unknown preset set '{other}' (expected 'creative' or 'aligned')"
            )),
        }
    }
}

/// Name-keyed collection of moods. Serializes as a JSON object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MoodTable(BTreeMap<String, MoodStyle>);

impl FromIterator<(String, MoodStyle)> for MoodTable {
    fn from_iter<I: IntoIterator<Item = (String, MoodStyle)>>(iter: I) -> Self {
        MoodTable(iter.into_iter().collect())
    }
}

impl MoodTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn preset(set: PresetSet) -> Self {
        match set {
            PresetSet::Creative => Self::creative(),
            PresetSet::Aligned => Self::aligned(),
        }
    }

    /// The canonical backend presets.
    pub fn creative() -> Self {
        let mut table = MoodTable::new();
        table.insert(
            "happy",
            MoodStyle::new(115.0, 4, "C_ionian", VelocityRange::new(80, 100), 0.9)
                .with_palette(&["#FFD54F", "#FF8A65"]),
        );
        table.insert(
            "calm",
            MoodStyle::new(78.0, 6, "G_pentatonic", VelocityRange::new(55, 75), 1.2)
                .with_palette(&["#B2DFDB", "#80CBC4"]),
        );
        table.insert(
            "tense",
            MoodStyle::new(140.0, 1, "E_phrygian", VelocityRange::new(70, 95), 0.5)
                .with_palette(&["#FF5252", "#FF1744"]),
        );
        table.insert(
            "sad",
            MoodStyle::new(88.0, 3, "A_aeolian", VelocityRange::new(50, 70), 0.95)
                .with_palette(&["#90A4AE", "#546E7A"]),
        );
        table.insert(
            "excited",
            MoodStyle::new(145.0, 2, "D_dorian", VelocityRange::new(85, 110), 0.8)
                .with_palette(&["#D05CE3", "#FF4081"]),
        );
        table
    }

    /// Presets matching the browser client's offline fallback.
    pub fn aligned() -> Self {
        let mut table = MoodTable::new();
        table.insert(
            "happy",
            MoodStyle::new(120.0, 1, "C_major", VelocityRange::new(70, 85), 0.7),
        );
        table.insert(
            "calm",
            MoodStyle::new(80.0, 2, "G_major", VelocityRange::new(50, 65), 1.2),
        );
        table.insert(
            "tense",
            MoodStyle::new(100.0, 1, "E_minor", VelocityRange::new(60, 75), 0.5),
        );
        table.insert(
            "sad",
            MoodStyle::new(70.0, 2, "A_minor", VelocityRange::new(45, 60), 1.0),
        );
        table
    }

    pub fn insert(&mut self, name: &str, style: MoodStyle) -> Option<MoodStyle> {
        self.0.insert(name.to_string(), style)
    }

    pub fn get(&self, name: &str) -> Option<&MoodStyle> {
        self.0.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &MoodStyle)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scale::ScaleTable;

    #[test]
    fn happy_preset_values() {
        let table = MoodTable::creative();
        let happy = table.get("happy").unwrap();
        assert_eq!(happy.tempo, 115.0);
        assert_eq!(happy.scale, "C_ionian");
        assert_eq!(happy.velocity, VelocityRange::new(80, 100));
    }

    #[test]
    fn presets_reference_builtin_scales() {
        let scales = ScaleTable::builtin();
        for set in [PresetSet::Creative, PresetSet::Aligned] {
            for (name, style) in MoodTable::preset(set).iter() {
                assert!(
                    scales.contains(&style.scale),
                    "{set} mood {name} references missing scale {}",
                    style.scale
                );
            }
        }
    }

    #[test]
    fn missing_fields_take_defaults() {
        let style: MoodStyle = serde_json::from_str(r#"{"scale":"D_dorian"}"#).unwrap();
        assert_eq!(style.tempo, DEFAULT_TEMPO);
        assert_eq!(style.step, DEFAULT_STEP);
        assert_eq!(style.phrasing, DEFAULT_PHRASING);
        assert_eq!(style.velocity, VelocityRange::new(60, 100));
        assert!(style.palette.is_empty());
    }

    #[test]
    fn negative_step_is_accepted() {
        let style: MoodStyle =
            serde_json::from_str(r#"{"scale":"C_ionian","step":-3}"#).unwrap();
        assert_eq!(style.step, -3);
    }

    #[test]
    fn wire_names_match_client() {
        let json = serde_json::to_value(MoodTable::creative()).unwrap();
        let calm = &json["calm"];
        assert_eq!(calm["bpm"], 78.0);
        assert_eq!(calm["step"], 6);
        assert_eq!(calm["scale"], "G_pentatonic");
        assert_eq!(calm["vel"], serde_json::json!([55, 75]));
        assert_eq!(calm["legato"], 1.2);
        assert_eq!(calm["palette"][0], "#B2DFDB");
    }

    #[test]
    fn preset_set_parses_case_insensitively() {
        assert_eq!("Aligned".parse::<PresetSet>(), Ok(PresetSet::Aligned));
        assert_eq!("creative".parse::<PresetSet>(), Ok(PresetSet::Creative));
        assert!("loud".parse::<PresetSet>().is_err());
        assert_eq!(PresetSet::default().to_string(), "creative");
    }
}
