// Batch mapping with skip-and-continue semantics.
//
// The note-generation endpoint receives a list of painted cells and maps each
// one independently. A cell that fails (unknown mood, bad grid) is dropped
// from the output and recorded in `skipped`; it never aborts the batch.
// `source_event_index[i]` is the input position that produced `notes[i]`, so
// callers can line results back up with their events.

use log::debug;

use crate::mapper::{MapError, NoteEvent, NoteMapper};

/// One painted cell to map. Borrows the emotion name from the caller's event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellNote<'a> {
    pub x: i32,
    pub y: i32,
    pub emotion: &'a str,
    pub intensity: f64,
}

/// An input event that produced no note.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedEvent {
    pub index: usize,
    pub error: MapError,
}

/// Result of mapping a batch: notes in input order plus bookkeeping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchOutcome {
    pub notes: Vec<NoteEvent>,
    pub source_event_index: Vec<usize>,
    pub skipped: Vec<SkippedEvent>,
}

/// Map every cell through `mapper`, skipping the ones that fail.
pub fn map_batch<'e, I>(
    mapper: &NoteMapper<'_>,
    cells: I,
    grid_width: i32,
    grid_height: i32,
) -> BatchOutcome
where
    I: IntoIterator<Item = CellNote<'e>>,
{
    let mut outcome = BatchOutcome::default();
    for (index, cell) in cells.into_iter().enumerate() {
        match mapper.map_cell_to_note(
            cell.x,
            cell.y,
            cell.emotion,
            cell.intensity,
            grid_width,
            grid_height,
        ) {
            Ok(note) => {
                outcome.notes.push(note);
                outcome.source_event_index.push(index);
            }
            Err(error) => {
                debug!("skipping event {index}: {error}");
                outcome.skipped.push(SkippedEvent { index, error });
            }
        }
    }
    outcome
}
