// Ephemeral in-memory session store.
//
// A session records the cells a user painted on one canvas. Sessions live
// until the process exits; nothing is persisted. The store is owned by the
// server's single request-handling thread, so it needs no internal locking;
// all mutation happens through `&mut self` methods called from `routes.rs`.
//
// Sessions never expire and are never deleted, only cleared. Unknown ids are
// reported as `SessionError::NotFound`, which the router turns into a 404.

use std::collections::BTreeMap;

use emotion_canvas_protocol::{CellEvent, SessionId, SessionSnapshot};
use log::info;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("session not found")]
    NotFound(SessionId),
}

/// One canvas's recorded cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub grid_width: i32,
    pub grid_height: i32,
    pub cells: Vec<CellEvent>,
}

/// All live sessions, keyed by id.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: BTreeMap<SessionId, Session>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new empty session and return its id.
    pub fn create(&mut self, grid_width: i32, grid_height: i32) -> SessionId {
        let id = SessionId::new_random();
        self.sessions.insert(
            id,
            Session {
                grid_width,
                grid_height,
                cells: Vec::new(),
            },
        );
        info!("session {id} created ({grid_width}x{grid_height})");
        id
    }

    pub fn get(&self, id: SessionId) -> Result<&Session, SessionError> {
        self.sessions.get(&id).ok_or(SessionError::NotFound(id))
    }

    /// Copy of a session in wire form.
    pub fn snapshot(&self, id: SessionId) -> Result<SessionSnapshot, SessionError> {
        let session = self.get(id)?;
        Ok(SessionSnapshot {
            session_id: id,
            grid_width: session.grid_width,
            grid_height: session.grid_height,
            cells: session.cells.clone(),
        })
    }

    /// Append cells in order. Returns how many were added.
    pub fn add_cells(&mut self, id: SessionId, cells: Vec<CellEvent>) -> Result<usize, SessionError> {
        let session = self.sessions.get_mut(&id).ok_or(SessionError::NotFound(id))?;
        let count = cells.len();
        session.cells.extend(cells);
        Ok(count)
    }

    /// Drop every recorded cell, keeping the session itself.
    pub fn clear(&mut self, id: SessionId) -> Result<(), SessionError> {
        let session = self.sessions.get_mut(&id).ok_or(SessionError::NotFound(id))?;
        session.cells.clear();
        info!("session {id} cleared");
        Ok(())
    }

    /// Returns the number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
