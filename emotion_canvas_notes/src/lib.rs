// Emotion Canvas note mapping
//
// Turns a painted grid cell into a playable note. The horizontal position
// picks a scale degree, the vertical position picks an octave offset, the
// painting intensity picks a velocity inside the mood's range, and the mood's
// tempo/step/legato settings fix the note length. Everything here is pure:
// the tables are loaded once at startup and passed in explicitly.
//
// Architecture:
// - scale.rs:  Named pitch lists (`Scale`, `ScaleTable`) and the built-in
//              scale set, including the hardcoded C Ionian fallback
// - mood.rs:   Per-mood musical settings (`MoodStyle`, `MoodTable`) and the
//              two built-in preset sets
// - config.rs: `NoteTables`, the mood + scale pair, JSON loading and
//              validation
// - mapper.rs: `NoteMapper::map_cell_to_note`, the core algorithm, and the
//              `MapError` taxonomy
// - batch.rs:  Skip-and-continue mapping over a list of painted cells
//
// The mapping is deterministic: identical inputs and tables always produce
// bit-identical `NoteEvent`s.

pub mod batch;
pub mod config;
pub mod mapper;
pub mod mood;
pub mod scale;

pub use batch::{BatchOutcome, CellNote, SkippedEvent, map_batch};
pub use config::{ConfigError, NoteTables};
pub use mapper::{MapError, NoteEvent, NoteMapper};
pub use mood::{MoodStyle, MoodTable, PresetSet, VelocityRange};
pub use scale::{Scale, ScaleKind, ScaleTable};
