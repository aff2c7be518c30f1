// Scale definitions for the note mapper.
//
// A scale is an ordered list of MIDI-style pitch numbers, one per degree.
// The mapper only indexes into the list, so ascending order is conventional
// rather than required. The one hard invariant is that a scale is never
// empty: `Scale::new` and deserialization both reject an empty note list.
//
// This module provides:
// - `Scale` with its descriptive metadata (suggested octaves, major/minor)
// - `ScaleTable`, a name-keyed map with the fallback lookup `resolve`
// - The built-in scale set: five modal scales used by the "creative" mood
//   presets and four 8-note major/minor scales used by the "aligned" presets
//
// Unknown scale names are not an error anywhere in this crate: `resolve`
// falls back to the hardcoded C Ionian scale.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use serde::{Deserialize, Deserializer, Serialize};

use crate::config::ConfigError;

/// Name of the fallback scale used when a mood references a missing scale.
pub const DEFAULT_SCALE_NAME: &str = "C_ionian";

/// Notes of the fallback scale (C major, one octave from middle C).
pub const DEFAULT_SCALE_NOTES: [i32; 7] = [60, 62, 64, 65, 67, 69, 71];

static DEFAULT_SCALE: LazyLock<Scale> = LazyLock::new(Scale::c_ionian);

/// Tonal quality tag carried by the 8-note scales.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScaleKind {
    Major,
    Minor,
}

/// An ordered, non-empty list of pitches identified by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ScaleDef")]
pub struct Scale {
    pub name: String,
    notes: Vec<i32>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<ScaleKind>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggested_octaves: Vec<u8>,
}

/// Unvalidated wire form of `Scale`. The name may be omitted in config files
/// since the table key already carries it.
#[derive(Deserialize)]
struct ScaleDef {
    #[serde(default)]
    name: String,
    notes: Vec<i32>,
    #[serde(rename = "type", default)]
    kind: Option<ScaleKind>,
    #[serde(default)]
    suggested_octaves: Vec<u8>,
}

impl TryFrom<ScaleDef> for Scale {
    type Error = ConfigError;

    fn try_from(def: ScaleDef) -> Result<Self, Self::Error> {
        let mut scale = Scale::new(def.name, def.notes)?;
        scale.kind = def.kind;
        scale.suggested_octaves = def.suggested_octaves;
        Ok(scale)
    }
}

impl Scale {
    /// Build a scale, rejecting an empty note list.
    pub fn new(name: impl Into<String>, notes: Vec<i32>) -> Result<Self, ConfigError> {
        let name = name.into();
        if notes.is_empty() {
            return Err(ConfigError::EmptyScale(name));
        }
        Ok(Scale {
            name,
            notes,
            kind: None,
            suggested_octaves: Vec::new(),
        })
    }

    /// The hardcoded fallback scale.
    pub fn c_ionian() -> Self {
        Scale {
            name: DEFAULT_SCALE_NAME.into(),
            notes: DEFAULT_SCALE_NOTES.to_vec(),
            kind: None,
            suggested_octaves: vec![3, 4, 5],
        }
    }

    /// Shared instance of the fallback scale.
    pub fn fallback() -> &'static Scale {
        &DEFAULT_SCALE
    }

    pub fn with_kind(mut self, kind: ScaleKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_suggested_octaves(mut self, octaves: &[u8]) -> Self {
        self.suggested_octaves = octaves.to_vec();
        self
    }

    /// Pitches in degree order. Never empty.
    pub fn notes(&self) -> &[i32] {
        &self.notes
    }

    /// Index of the highest degree (`len - 1`).
    pub fn last_degree(&self) -> usize {
        self.notes.len() - 1
    }
}

/// Name-keyed collection of scales. Serializes as a JSON object.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ScaleTable(BTreeMap<String, Scale>);

impl<'de> Deserialize<'de> for ScaleTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, Scale>::deserialize(deserializer)?;
        Ok(raw
            .into_iter()
            .map(|(key, mut scale)| {
                if scale.name.is_empty() {
                    scale.name.clone_from(&key);
                }
                (key, scale)
            })
            .collect())
    }
}

impl FromIterator<(String, Scale)> for ScaleTable {
    fn from_iter<I: IntoIterator<Item = (String, Scale)>>(iter: I) -> Self {
        ScaleTable(iter.into_iter().collect())
    }
}

impl ScaleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// All scales shipped with the server.
    pub fn builtin() -> Self {
        let modal = [
            ("C_ionian", vec![60, 62, 64, 65, 67, 69, 71], &[3u8, 4, 5][..]),
            ("G_pentatonic", vec![55, 57, 59, 62, 64], &[3, 4][..]),
            ("E_phrygian", vec![64, 65, 67, 69, 71, 72, 74], &[4, 5][..]),
            ("A_aeolian", vec![57, 59, 60, 62, 64, 65, 67], &[3, 4][..]),
            ("D_dorian", vec![62, 64, 65, 67, 69, 71, 72], &[3, 4][..]),
        ];
        let tonal = [
            ("C_major", vec![60, 62, 64, 65, 67, 69, 71, 72], ScaleKind::Major),
            ("G_major", vec![55, 57, 59, 60, 62, 64, 66, 67], ScaleKind::Major),
            ("E_minor", vec![52, 54, 55, 57, 59, 60, 62, 64], ScaleKind::Minor),
            ("A_minor", vec![57, 59, 60, 62, 64, 65, 67, 69], ScaleKind::Minor),
        ];

        let mut table = ScaleTable::new();
        for (name, notes, octaves) in modal {
            table.insert(Scale {
                name: name.into(),
                notes,
                kind: None,
                suggested_octaves: octaves.to_vec(),
            });
        }
        for (name, notes, kind) in tonal {
            table.insert(Scale {
                name: name.into(),
                notes,
                kind: Some(kind),
                suggested_octaves: vec![3, 4],
            });
        }
        table
    }

    /// Insert a scale under its own name, replacing any previous entry.
    pub fn insert(&mut self, scale: Scale) -> Option<Scale> {
        self.0.insert(scale.name.clone(), scale)
    }

    pub fn get(&self, name: &str) -> Option<&Scale> {
        self.0.get(name)
    }

    /// Look up a scale, falling back to C Ionian when the name is unknown.
    pub fn resolve(&self, name: &str) -> &Scale {
        match self.get(name) {
            Some(scale) => scale,
            None => Scale::fallback(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Scale)> {
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

    #[test]
    fn empty_scale_rejected() {
        let err = Scale::new("nothing", Vec::new()).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyScale(ref name) if name == "nothing"));
    }

    #[test]
    fn empty_scale_rejected_on_deserialize() {
        let result: Result<Scale, _> = serde_json::from_str(r#"{"name":"x","notes":[]}"#);
        assert!(result.is_err());
    }

    #[test]
    fn builtin_has_all_scales() {
        let table = ScaleTable::builtin();
        assert_eq!(table.len(), 9);
        for name in [
            "C_ionian",
            "G_pentatonic",
            "E_phrygian",
            "A_aeolian",
            "D_dorian",
            "C_major",
            "G_major",
            "E_minor",
            "A_minor",
        ] {
            assert!(table.contains(name), "missing {name}");
        }
        assert_eq!(table.get("G_pentatonic").unwrap().notes().len(), 5);
        assert_eq!(table.get("A_minor").unwrap().kind, Some(ScaleKind::Minor));
    }

    #[test]
    fn resolve_falls_back_to_c_ionian() {
        let table = ScaleTable::new();
        let scale = table.resolve("no_such_scale");
        assert_eq!(scale.name, DEFAULT_SCALE_NAME);
        assert_eq!(scale.notes(), &DEFAULT_SCALE_NOTES);
    }

    #[test]
    fn resolve_prefers_table_entry() {
        let mut table = ScaleTable::new();
        table.insert(Scale::new("C_ionian", vec![48, 50]).unwrap());
        assert_eq!(table.resolve("C_ionian").notes(), &[48, 50]);
    }

    #[test]
    fn table_key_fills_missing_name() {
        let table: ScaleTable =
            serde_json::from_str(r#"{"blues":{"notes":[60,63,65,66,67,70],"type":"minor"}}"#)
                .unwrap();
        let blues = table.get("blues").unwrap();
        assert_eq!(blues.name, "blues");
        assert_eq!(blues.last_degree(), 5);
        assert_eq!(blues.kind, Some(ScaleKind::Minor));
    }

    #[test]
    fn serializes_type_key() {
        let json = serde_json::to_value(ScaleTable::builtin().get("C_major").unwrap()).unwrap();
        assert_eq!(json["type"], "major");
        assert_eq!(json["name"], "C_major");
        assert_eq!(json["notes"][7], 72);
    }
}
