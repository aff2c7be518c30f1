// Request and response bodies for the canvas HTTP API.
//
// Grouped by route:
// - `/generate-notes`: `GenerateRequest` (a batch of `CanvasEvent`s) in,
//   `GenerateResponse` (notes + `GenerateMeta`) out.
// - `/sessions`: `CreateSessionRequest` / `CreateSessionResponse`, then
//   `CellEvent` lists appended via `/sessions/{id}/cells`, answered with
//   `AddCellsResponse`, and `ClearResponse` for `/sessions/{id}/clear`.
//   `SessionSnapshot` is the read-back of a whole session.
// - `/`: `StatusResponse`.
//
// Every 4xx reply carries an `ErrorBody` whose `detail` is either a plain
// message or a small JSON object with context (e.g. the missing scale name).

use emotion_canvas_notes::{BatchOutcome, CellNote, NoteEvent};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::SessionId;

/// Grid width assumed when a generate request omits it (or sends 0).
pub const DEFAULT_GRID_WIDTH: i32 = 20;
/// Grid height assumed when a generate request omits it (or sends 0).
pub const DEFAULT_GRID_HEIGHT: i32 = 10;

/// One painted cell in a generate request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CanvasEvent {
    pub x: i32,
    pub y: i32,
    pub emotion: String,
    pub intensity: f64,
    /// Client-side timestamp, echoed nowhere; accepted for compatibility.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl CanvasEvent {
    /// Borrowing view for the batch mapper.
    pub fn as_cell(&self) -> CellNote<'_> {
        CellNote {
            x: self.x,
            y: self.y,
            emotion: &self.emotion,
            intensity: self.intensity,
        }
    }
}

/// Body of `POST /generate-notes`. Every field is optional.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub events: Option<Vec<CanvasEvent>>,
    #[serde(default)]
    pub grid_width: Option<i32>,
    #[serde(default)]
    pub grid_height: Option<i32>,
}

impl GenerateRequest {
    /// Grid dimensions with defaults applied. Zero counts as missing; other
    /// values (including 1 or negatives) pass through for the mapper to
    /// reject.
    pub fn grid_size(&self) -> (i32, i32) {
        let or_default = |value: Option<i32>, default: i32| match value {
            Some(0) | None => default,
            Some(v) => v,
        };
        (
            or_default(self.grid_width, DEFAULT_GRID_WIDTH),
            or_default(self.grid_height, DEFAULT_GRID_HEIGHT),
        )
    }

    pub fn events(&self) -> &[CanvasEvent] {
        self.events.as_deref().unwrap_or_default()
    }
}

/// Side information for a generate response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GenerateMeta {
    /// Input position of each returned note.
    Indexed { source_event_index: Vec<usize> },
    /// Human-readable note, used when there was nothing to map.
    Info { info: String },
}

/// Body returned by `POST /generate-notes`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub notes: Vec<NoteEvent>,
    pub meta: GenerateMeta,
}

impl GenerateResponse {
    /// Reply for a request without events.
    pub fn no_events() -> Self {
        GenerateResponse {
            notes: Vec::new(),
            meta: GenerateMeta::Info {
                info: "no events provided".into(),
            },
        }
    }
}

impl From<BatchOutcome> for GenerateResponse {
    fn from(outcome: BatchOutcome) -> Self {
        GenerateResponse {
            notes: outcome.notes,
            meta: GenerateMeta::Indexed {
                source_event_index: outcome.source_event_index,
            },
        }
    }
}

/// Body of `POST /sessions`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    pub grid_width: i32,
    pub grid_height: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSessionResponse {
    pub session_id: SessionId,
}

/// A recorded cell. `value` is arbitrary client data, stored verbatim.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CellEvent {
    pub x: i32,
    pub y: i32,
    #[serde(default)]
    pub value: Option<Value>,
}

/// Reply to `POST /sessions/{id}/cells`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddCellsResponse {
    pub status: String,
    pub count: usize,
}

impl AddCellsResponse {
    pub fn ok(count: usize) -> Self {
        AddCellsResponse {
            status: "ok".into(),
            count,
        }
    }
}

/// Reply to `POST /sessions/{id}/clear`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearResponse {
    pub status: String,
}

impl ClearResponse {
    pub fn cleared() -> Self {
        ClearResponse {
            status: "cleared".into(),
        }
    }
}

/// Reply to `GET /sessions/{id}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub grid_width: i32,
    pub grid_height: i32,
    pub cells: Vec<CellEvent>,
}

/// Reply to `GET /`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub service: String,
}

/// Body of every error reply.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: Value,
}

impl ErrorBody {
    pub fn message(text: impl Into<String>) -> Self {
        ErrorBody {
            detail: Value::String(text.into()),
        }
    }

    pub fn with_detail(detail: Value) -> Self {
        ErrorBody { detail }
    }
}
