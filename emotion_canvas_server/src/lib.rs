// emotion_canvas_server — HTTP backend for the Emotion Canvas.
//
// A browser canvas sends painted cells (position, emotion, intensity) and
// gets back playable notes. The server also exposes the mood and scale tables
// the browser uses for its palette, and keeps lightweight in-memory sessions
// of painted cells.
//
// Module overview:
// - `session.rs`:  In-memory session store (create, append cells, clear,
//                  snapshot). Owned by the request thread, no locking.
// - `routes.rs`:   `App` and its route table. Pure (method, url, body) to
//                  `Reply` mapping, with no socket access.
// - `server.rs`:   `tiny_http` listener and the single-threaded request loop.
//
// Dependencies: `emotion_canvas_notes` (the cell-to-note mapping and its
// tables) and `emotion_canvas_protocol` (JSON bodies and ids).
//
// The server runs as a standalone binary (`main.rs`) or can be embedded via
// `start_server`.

pub mod routes;
pub mod server;
pub mod session;

pub use server::start_server;
