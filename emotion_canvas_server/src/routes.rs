// Request routing for the canvas backend.
//
// `App` owns everything a request can touch (the read-only `NoteTables` and
// the mutable `SessionStore`), and `App::handle` maps (method, url, body) to a
// `Reply`. It never sees a socket: `server.rs` reads the request, calls
// `handle`, and writes the reply, which keeps every route unit-testable.
//
// Routes:
//   GET  /                       service status
//   GET  /moods                  mood table
//   GET  /scales                 scale table
//   GET  /scale?name=N           one scale (404 if unknown, 422 if no name)
//   POST /generate-notes         batch cell-to-note mapping
//   POST /sessions               create a session
//   GET  /sessions/{id}          session snapshot
//   POST /sessions/{id}/cells    append painted cells
//   POST /sessions/{id}/clear    drop painted cells
//   OPTIONS *                    CORS preflight
//
// Bodies that fail to parse get a 422 with the serde error in `detail`.

use emotion_canvas_notes::{NoteTables, map_batch};
use emotion_canvas_protocol::{
    AddCellsResponse, CanvasEvent, CellEvent, ClearResponse, CreateSessionRequest,
    CreateSessionResponse, ErrorBody, GenerateRequest, GenerateResponse, SessionId,
    StatusResponse,
};
use log::{error, info};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tiny_http::Method;

use crate::session::{SessionError, SessionStore};

/// Name reported by `GET /`.
pub const SERVICE_NAME: &str = "EmotiKeys backend";

/// Status code plus optional JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: u16,
    pub body: Option<Value>,
}

impl Reply {
    /// Serialize `body` as the reply. Falls back to a 500 if serialization
    /// fails, which only happens for maps with non-string keys.
    pub fn json<T: Serialize>(status: u16, body: &T) -> Self {
        match serde_json::to_value(body) {
            Ok(value) => Reply {
                status,
                body: Some(value),
            },
            Err(e) => {
                error!("failed to serialize reply: {e}");
                Reply::error(500, ErrorBody::message("internal error"))
            }
        }
    }

    pub fn error(status: u16, body: ErrorBody) -> Self {
        Reply {
            status,
            body: Some(json!({ "detail": body.detail })),
        }
    }

    pub fn no_content() -> Self {
        Reply {
            status: 204,
            body: None,
        }
    }

    fn not_found() -> Self {
        Reply::error(404, ErrorBody::message("Not Found"))
    }

    fn method_not_allowed() -> Self {
        Reply::error(405, ErrorBody::message("Method Not Allowed"))
    }
}

impl From<SessionError> for Reply {
    fn from(err: SessionError) -> Self {
        Reply::error(404, ErrorBody::message(err.to_string()))
    }
}

/// Request handler state.
pub struct App {
    tables: NoteTables,
    sessions: SessionStore,
}

impl App {
    pub fn new(tables: NoteTables) -> Self {
        App {
            tables,
            sessions: SessionStore::new(),
        }
    }

    pub fn tables(&self) -> &NoteTables {
        &self.tables
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Route one request. `url` is the raw request target, query included.
    pub fn handle(&mut self, method: &Method, url: &str, body: &str) -> Reply {
        let (path, query) = url.split_once('?').unwrap_or((url, ""));
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        if *method == Method::Options {
            return Reply::no_content();
        }

        match (method, segments.as_slice()) {
            (Method::Get, []) => Reply::json(
                200,
                &StatusResponse {
                    status: "ok".into(),
                    service: SERVICE_NAME.into(),
                },
            ),
            (Method::Get, ["moods"]) => Reply::json(200, &self.tables.moods),
            (Method::Get, ["scales"]) => Reply::json(200, &self.tables.scales),
            (Method::Get, ["scale"]) => self.get_scale(query),
            (Method::Post, ["generate-notes"]) => self.generate_notes(body),
            (Method::Post, ["sessions"]) => self.create_session(body),
            (Method::Get, ["sessions", id]) => match parse_session_id(id) {
                Ok(id) => match self.sessions.snapshot(id) {
                    Ok(snapshot) => Reply::json(200, &snapshot),
                    Err(e) => e.into(),
                },
                Err(reply) => reply,
            },
            (Method::Post, ["sessions", id, "cells"]) => self.add_cells(id, body),
            (Method::Post, ["sessions", id, "clear"]) => match parse_session_id(id) {
                Ok(id) => match self.sessions.clear(id) {
                    Ok(()) => Reply::json(200, &ClearResponse::cleared()),
                    Err(e) => e.into(),
                },
                Err(reply) => reply,
            },
            (_, segments) if is_known_path(segments) => Reply::method_not_allowed(),
            _ => Reply::not_found(),
        }
    }

    fn get_scale(&self, query: &str) -> Reply {
        let Some(name) = query_param(query, "name") else {
            return Reply::error(422, ErrorBody::message("missing query parameter 'name'"));
        };
        match self.tables.scales.get(&name) {
            Some(scale) => Reply::json(200, scale),
            None => Reply::error(
                404,
                ErrorBody::with_detail(json!({ "error": "scale not found", "name": name })),
            ),
        }
    }

    fn generate_notes(&self, body: &str) -> Reply {
        let request: GenerateRequest = match parse_body(body) {
            Ok(request) => request,
            Err(reply) => return reply,
        };
        if request.events().is_empty() {
            return Reply::json(200, &GenerateResponse::no_events());
        }

        let (grid_width, grid_height) = request.grid_size();
        let outcome = map_batch(
            &self.tables.mapper(),
            request.events().iter().map(CanvasEvent::as_cell),
            grid_width,
            grid_height,
        );
        if !outcome.skipped.is_empty() {
            info!(
                "generate-notes: {} of {} events skipped",
                outcome.skipped.len(),
                request.events().len()
            );
        }
        Reply::json(200, &GenerateResponse::from(outcome))
    }

    fn create_session(&mut self, body: &str) -> Reply {
        let request: CreateSessionRequest = match parse_body(body) {
            Ok(request) => request,
            Err(reply) => return reply,
        };
        let session_id = self.sessions.create(request.grid_width, request.grid_height);
        Reply::json(200, &CreateSessionResponse { session_id })
    }

    fn add_cells(&mut self, id: &str, body: &str) -> Reply {
        let id = match parse_session_id(id) {
            Ok(id) => id,
            Err(reply) => return reply,
        };
        // Unknown sessions are reported before the body is looked at.
        if let Err(e) = self.sessions.get(id) {
            return e.into();
        }
        let cells: Vec<CellEvent> = match parse_body(body) {
            Ok(cells) => cells,
            Err(reply) => return reply,
        };
        match self.sessions.add_cells(id, cells) {
            Ok(count) => Reply::json(200, &AddCellsResponse::ok(count)),
            Err(e) => e.into(),
        }
    }
}

fn parse_body<T: DeserializeOwned>(body: &str) -> Result<T, Reply> {
    serde_json::from_str(body).map_err(|e| {
        Reply::error(422, ErrorBody::message(format!("invalid request body: {e}")))
    })
}

/// A malformed id cannot name a live session, so it is a plain 404.
fn parse_session_id(raw: &str) -> Result<SessionId, Reply> {
    raw.parse()
        .map_err(|_| Reply::error(404, ErrorBody::message("session not found")))
}

fn is_known_path(segments: &[&str]) -> bool {
    matches!(
        segments,
        [] | ["moods"]
            | ["scales"]
            | ["scale"]
            | ["generate-notes"]
            | ["sessions"]
            | ["sessions", _]
            | ["sessions", _, "cells" | "clear"]
    )
}

/// First value of `key` in an `a=1&b=2` query string, percent-decoded.
fn query_param(query: &str, key: &str) -> Option<String> {
    query
        .split('&')
        .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
        .find(|(k, _)| percent_decode(k) == key)
        .map(|(_, v)| percent_decode(v))
}

/// Decode `%XX` escapes and `+` as space. Malformed escapes pass through.
fn percent_decode(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => out.push(b' '),
            b'%' if i + 2 < bytes.len()
                && bytes[i + 1].is_ascii_hexdigit()
                && bytes[i + 2].is_ascii_hexdigit() =>
            {
                let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
                if let Some(byte) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                    out.push(byte);
                    i += 3;
                    continue;
                }
                out.push(b'%');
            }
            other => out.push(other),
        }
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
