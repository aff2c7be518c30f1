// emotion_canvas_protocol — JSON message types for the canvas HTTP API.
//
// This crate defines the request and response bodies exchanged between the
// browser canvas and the backend (`emotion_canvas_server`). Field names match
// what the browser client already sends, so existing front-ends keep working
// unchanged.
//
// Module overview:
// - `types.rs`:    `SessionId`, the opaque UUID handed out by `/sessions`.
// - `message.rs`:  Request/response structs for every route, plus the common
//                  `ErrorBody` (`{"detail": ...}`) used for 4xx replies.
//
// Notes on the wire (`NoteEvent`) are the mapper's own type, re-exported here
// so clients only need this crate.

pub mod message;
pub mod types;

pub use emotion_canvas_notes::NoteEvent;
pub use message::{
    AddCellsResponse, CanvasEvent, CellEvent, ClearResponse, CreateSessionRequest,
    CreateSessionResponse, DEFAULT_GRID_HEIGHT, DEFAULT_GRID_WIDTH, ErrorBody, GenerateMeta,
    GenerateRequest, GenerateResponse, SessionSnapshot, StatusResponse,
};
pub use types::SessionId;
