// Cell-to-note mapping, the core of the canvas backend.
//
// `NoteMapper::map_cell_to_note` turns a painted cell into a `NoteEvent`:
//
// - x picks the scale degree: `floor(x / (width-1) * (len-1))`, so the left
//   edge plays the first degree and the right edge the last.
// - y picks an octave offset: `floor(y / (height-1) * 2)` octaves, 0 at the
//   top row and +2 at the bottom row.
// - intensity (clamped to [0, 1]) interpolates linearly across the mood's
//   velocity window, rounding half to even and capping at the MIDI maximum.
// - duration is one subdivision of a beat, `60/bpm / step`, scaled by the
//   mood's legato factor and rounded to 4 decimal places.
//
// Out-of-range coordinates never index out of bounds: both the degree and the
// octave offset are clamped after the division. The grid dimensions are the
// only hard precondition (`> 1` on each axis), checked before anything else.
//
// The mapper holds only shared borrows of the tables and has no interior
// state, so one instance can be used from any number of threads.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::MAX_VELOCITY;
use crate::mood::MoodTable;
use crate::scale::ScaleTable;

/// Highest octave offset reachable from the bottom row.
pub const MAX_OCTAVE_OFFSET: i32 = 2;

/// Semitones per octave.
pub const OCTAVE: i32 = 12;

/// Decimal places kept in `NoteEvent::duration`.
pub const DURATION_DECIMALS: i32 = 4;

/// A playable note. Pure value, created fresh per mapping call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoteEvent {
    /// MIDI-style note number.
    pub pitch: i32,
    pub velocity: u8,
    /// Seconds.
    pub duration: f64,
}

/// Why a cell could not be mapped. Both kinds are caller errors: retrying the
/// same input yields the same error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapError {
    #[error("unknown emotion: {0}")]
    UnknownEmotion(String),

    #[error("grid_width and grid_height must be > 1 (got {width}x{height})")]
    InvalidGrid { width: i32, height: i32 },
}

/// Read-only view over a mood table and a scale table.
#[derive(Debug, Clone, Copy)]
pub struct NoteMapper<'a> {
    moods: &'a MoodTable,
    scales: &'a ScaleTable,
}

impl<'a> NoteMapper<'a> {
    pub fn new(moods: &'a MoodTable, scales: &'a ScaleTable) -> Self {
        NoteMapper { moods, scales }
    }

    /// Map the cell `(x, y)` of a `grid_width` x `grid_height` canvas,
    /// painted with `emotion` at `intensity`, to a note.
    pub fn map_cell_to_note(
        &self,
        x: i32,
        y: i32,
        emotion: &str,
        intensity: f64,
        grid_width: i32,
        grid_height: i32,
    ) -> Result<NoteEvent, MapError> {
        if grid_width <= 1 || grid_height <= 1 {
            return Err(MapError::InvalidGrid {
                width: grid_width,
                height: grid_height,
            });
        }
        let intensity = clamp_intensity(intensity);

        let style = self
            .moods
            .get(emotion)
            .ok_or_else(|| MapError::UnknownEmotion(emotion.to_string()))?;
        let scale = self.scales.resolve(&style.scale);

        let last_degree = scale.last_degree();
        let degree = scaled_index(x, grid_width, last_degree as f64, last_degree as f64) as usize;
        let octave_offset = scaled_index(
            y,
            grid_height,
            f64::from(MAX_OCTAVE_OFFSET),
            f64::from(MAX_OCTAVE_OFFSET),
        ) as i32;
        let pitch = scale.notes()[degree] + octave_offset * OCTAVE;

        let min = f64::from(style.velocity.min);
        let max = f64::from(style.velocity.max);
        let velocity = (min + intensity * (max - min))
            .round_ties_even()
            .clamp(0.0, f64::from(MAX_VELOCITY)) as u8;

        let step = style.step.max(1);
        let beat = 60.0 / style.tempo;
        let duration = round_decimals(beat * (1.0 / f64::from(step)) * style.phrasing);

        Ok(NoteEvent {
            pitch,
            velocity,
            duration,
        })
    }
}

/// Clamp to [0, 1]. NaN maps to 1.0, matching `max(0, min(1, v))` semantics
/// where the comparison against NaN keeps the bound.
fn clamp_intensity(intensity: f64) -> f64 {
    if intensity.is_nan() {
        return 1.0;
    }
    intensity.clamp(0.0, 1.0)
}

/// `floor(pos / (extent - 1) * span)`, clamped to `[0, max]`. The result is
/// a whole number, safe to cast.
fn scaled_index(pos: i32, extent: i32, span: f64, max: f64) -> f64 {
    let normalized = f64::from(pos) / f64::from(extent - 1);
    (normalized * span).floor().clamp(0.0, max)
}

/// Round to `DURATION_DECIMALS` places. Formatting rounds the exact binary
/// value, so no scaling error creeps in before the rounding step.
fn round_decimals(value: f64) -> f64 {
    let digits = DURATION_DECIMALS as usize;
    format!("{value:.digits$}").parse().unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mood::{MoodStyle, VelocityRange};
    use crate::scale::{DEFAULT_SCALE_NOTES, Scale};

    /// Fixture tables: the canonical happy/calm moods plus a mood pointing at
    /// a scale that does not exist.
    fn fixture() -> (MoodTable, ScaleTable) {
        let mut moods = MoodTable::new();
        moods.insert(
            "happy",
            MoodStyle::new(115.0, 4, "C_ionian", VelocityRange::new(80, 100), 0.9),
        );
        moods.insert(
            "calm",
            MoodStyle::new(78.0, 6, "G_pentatonic", VelocityRange::new(55, 75), 1.2),
        );
        moods.insert(
            "lost",
            MoodStyle::new(100.0, 2, "Z_missing", VelocityRange::new(40, 90), 1.0),
        );
        let mut scales = ScaleTable::new();
        scales.insert(Scale::new("C_ionian", vec![60, 62, 64, 65, 67, 69, 71]).unwrap());
        scales.insert(Scale::new("G_pentatonic", vec![55, 57, 59, 62, 64]).unwrap());
        (moods, scales)
    }

    #[test]
    fn happy_top_left_corner() {
        let (moods, scales) = fixture();
        let note = NoteMapper::new(&moods, &scales)
            .map_cell_to_note(0, 0, "happy", 1.0, 20, 10)
            .unwrap();
        assert_eq!(note.pitch, 60);
        assert_eq!(note.velocity, 100);
        assert_eq!(note.duration, 0.1174);
    }

    #[test]
    fn happy_bottom_right_corner() {
        let (moods, scales) = fixture();
        let note = NoteMapper::new(&moods, &scales)
            .map_cell_to_note(19, 9, "happy", 0.0, 20, 10)
            .unwrap();
        assert_eq!(note.pitch, 71 + 24);
        assert_eq!(note.velocity, 80);
    }

    #[test]
    fn calm_middle_velocity() {
        let (moods, scales) = fixture();
        let note = NoteMapper::new(&moods, &scales)
            .map_cell_to_note(10, 5, "calm", 0.5, 20, 10)
            .unwrap();
        assert_eq!(note.velocity, 65);
        // x=10/19*4 -> degree 2 (59); y=5/9*2 -> 1 octave.
        assert_eq!(note.pitch, 59 + 12);
        assert_eq!(note.duration, 0.1538);
    }

    #[test]
    fn unknown_emotion_fails() {
        let (moods, scales) = fixture();
        let err = NoteMapper::new(&moods, &scales)
            .map_cell_to_note(0, 0, "nonexistent", 1.0, 20, 10)
            .unwrap_err();
        assert_eq!(err, MapError::UnknownEmotion("nonexistent".into()));
    }

    #[test]
    fn narrow_grid_fails() {
        let (moods, scales) = fixture();
        let err = NoteMapper::new(&moods, &scales)
            .map_cell_to_note(5, 5, "happy", 1.0, 1, 10)
            .unwrap_err();
        assert_eq!(
            err,
            MapError::InvalidGrid {
                width: 1,
                height: 10
            }
        );
    }

    #[test]
    fn invalid_grid_checked_for_every_emotion() {
        let (moods, scales) = fixture();
        let mapper = NoteMapper::new(&moods, &scales);
        for emotion in ["happy", "calm", "lost", "nonexistent"] {
            for (x, y) in [(0, 0), (3, 7), (19, 9)] {
                assert!(matches!(
                    mapper.map_cell_to_note(x, y, emotion, 0.5, 1, 10),
                    Err(MapError::InvalidGrid { .. })
                ));
                assert!(matches!(
                    mapper.map_cell_to_note(x, y, emotion, 0.5, 20, 0),
                    Err(MapError::InvalidGrid { .. })
                ));
            }
        }
    }

    #[test]
    fn unknown_scale_uses_default() {
        let (moods, scales) = fixture();
        let mapper = NoteMapper::new(&moods, &scales);
        let left = mapper.map_cell_to_note(0, 0, "lost", 0.5, 20, 10).unwrap();
        let right = mapper.map_cell_to_note(19, 0, "lost", 0.5, 20, 10).unwrap();
        assert_eq!(left.pitch, DEFAULT_SCALE_NOTES[0]);
        assert_eq!(right.pitch, DEFAULT_SCALE_NOTES[6]);
        assert_eq!(left.velocity, 65);
    }

    #[test]
    fn edges_hit_first_and_last_degree() {
        let (moods, scales) = fixture();
        let mapper = NoteMapper::new(&moods, &scales);
        for width in [2, 3, 8, 20, 64] {
            let first = mapper.map_cell_to_note(0, 0, "calm", 1.0, width, 10).unwrap();
            let last = mapper
                .map_cell_to_note(width - 1, 0, "calm", 1.0, width, 10)
                .unwrap();
            assert_eq!(first.pitch, 55, "width {width}");
            assert_eq!(last.pitch, 64, "width {width}");
        }
    }

    #[test]
    fn pitch_is_scale_note_plus_octaves() {
        let (moods, scales) = fixture();
        let mapper = NoteMapper::new(&moods, &scales);
        let notes = scales.get("C_ionian").unwrap().notes();
        for x in 0..20 {
            for y in 0..10 {
                let pitch = mapper.map_cell_to_note(x, y, "happy", 0.3, 20, 10).unwrap().pitch;
                let valid = notes
                    .iter()
                    .any(|n| [0, 12, 24].iter().any(|offset| n + offset == pitch));
                assert!(valid, "({x},{y}) -> {pitch}");
            }
        }
    }

    #[test]
    fn out_of_range_coordinates_are_clamped() {
        let (moods, scales) = fixture();
        let mapper = NoteMapper::new(&moods, &scales);
        let far = mapper.map_cell_to_note(500, 500, "happy", 1.0, 20, 10).unwrap();
        assert_eq!(far.pitch, 71 + 24);
        let negative = mapper.map_cell_to_note(-3, -3, "happy", 1.0, 20, 10).unwrap();
        assert_eq!(negative.pitch, 60);
    }

    #[test]
    fn velocity_monotone_and_in_range() {
        let (moods, scales) = fixture();
        let mapper = NoteMapper::new(&moods, &scales);
        let mut previous = 0u8;
        for i in -10..=110 {
            let intensity = f64::from(i) / 100.0;
            let v = mapper
                .map_cell_to_note(4, 4, "happy", intensity, 20, 10)
                .unwrap()
                .velocity;
            assert!((80..=100).contains(&v), "intensity {intensity} -> {v}");
            assert!(v >= previous);
            previous = v;
        }
    }

    #[test]
    fn velocity_rounds_half_to_even() {
        let (moods, scales) = fixture();
        let mapper = NoteMapper::new(&moods, &scales);
        // 80 + 0.025 * 20 = 80.5 -> 80; 80 + 0.075 * 20 = 81.5 -> 82.
        let low = mapper.map_cell_to_note(0, 0, "happy", 0.025, 20, 10).unwrap();
        let high = mapper.map_cell_to_note(0, 0, "happy", 0.075, 20, 10).unwrap();
        assert_eq!(low.velocity, 80);
        assert_eq!(high.velocity, 82);
    }

    #[test]
    fn nan_intensity_is_full() {
        let (moods, scales) = fixture();
        let note = NoteMapper::new(&moods, &scales)
            .map_cell_to_note(0, 0, "happy", f64::NAN, 20, 10)
            .unwrap();
        assert_eq!(note.velocity, 100);
    }

    #[test]
    fn duration_follows_tempo_and_legato() {
        let mut moods = MoodTable::new();
        let range = VelocityRange::new(60, 100);
        moods.insert("slow", MoodStyle::new(60.0, 2, "C_ionian", range, 1.0));
        moods.insert("fast", MoodStyle::new(120.0, 2, "C_ionian", range, 1.0));
        moods.insert("long", MoodStyle::new(60.0, 2, "C_ionian", range, 1.5));
        moods.insert("unstepped", MoodStyle::new(60.0, 0, "C_ionian", range, 1.0));
        moods.insert("backwards", MoodStyle::new(60.0, -4, "C_ionian", range, 1.0));
        let scales = ScaleTable::builtin();
        let mapper = NoteMapper::new(&moods, &scales);
        let duration = |mood: &str| {
            mapper
                .map_cell_to_note(0, 0, mood, 1.0, 20, 10)
                .unwrap()
                .duration
        };
        assert_eq!(duration("slow"), 0.5);
        assert_eq!(duration("fast"), 0.25);
        assert_eq!(duration("long"), 0.75);
        // step 0 is treated as 1.
        assert_eq!(duration("unstepped"), 1.0);
        assert_eq!(duration("backwards"), 1.0);
        assert!(duration("fast") > 0.0);
    }

    #[test]
    fn duration_rounds_exact_binary_value() {
        // 0.125 * 0.15 and 0.125 * 0.13 sit just below and just above the
        // decimal midpoint; scaling by 10^4 first would round them the other
        // way.
        let mut moods = MoodTable::new();
        let range = VelocityRange::new(60, 100);
        moods.insert("short", MoodStyle::new(60.0, 8, "C_ionian", range, 0.15));
        moods.insert("shorter", MoodStyle::new(60.0, 8, "C_ionian", range, 0.13));
        let scales = ScaleTable::builtin();
        let mapper = NoteMapper::new(&moods, &scales);
        let duration = |mood: &str| {
            mapper
                .map_cell_to_note(0, 0, mood, 1.0, 20, 10)
                .unwrap()
                .duration
        };
        assert_eq!(duration("short"), 0.0187);
        assert_eq!(duration("shorter"), 0.0163);
    }

    #[test]
    fn velocity_capped_for_unvalidated_tables() {
        let mut moods = MoodTable::new();
        moods.insert(
            "loud",
            MoodStyle::new(100.0, 2, "C_ionian", VelocityRange::new(100, 250), 1.0),
        );
        let scales = ScaleTable::builtin();
        let mapper = NoteMapper::new(&moods, &scales);
        let full = mapper.map_cell_to_note(0, 0, "loud", 1.0, 20, 10).unwrap();
        let quiet = mapper.map_cell_to_note(0, 0, "loud", 0.0, 20, 10).unwrap();
        assert_eq!(full.velocity, MAX_VELOCITY);
        assert_eq!(quiet.velocity, 100);
    }

    #[test]
    fn repeated_calls_are_identical() {
        let (moods, scales) = fixture();
        let mapper = NoteMapper::new(&moods, &scales);
        let a = mapper.map_cell_to_note(7, 3, "calm", 0.37, 20, 10).unwrap();
        let b = mapper.map_cell_to_note(7, 3, "calm", 0.37, 20, 10).unwrap();
        assert_eq!(a.pitch, b.pitch);
        assert_eq!(a.velocity, b.velocity);
        assert_eq!(a.duration.to_bits(), b.duration.to_bits());
    }
}
