// HTTP listener and request loop for the canvas backend.
//
// Architecture: one background thread owns both the `tiny_http::Server` and
// the `App` (note tables + session store). It pulls requests with
// `recv_timeout`, so between requests it can notice that `keep_running` was
// cleared and exit. Requests are handled one at a time on that thread; the
// only shared state is the stop flag, and the session store needs no locking.
//
// Each request is read fully into a string, routed through `App::handle`, and
// answered with a JSON body plus permissive CORS headers so a browser canvas
// served from any origin can call the API.
//
// Shutdown: `ServerHandle::stop` clears the flag and joins the thread. The
// loop notices within one `POLL_INTERVAL`.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use emotion_canvas_notes::NoteTables;
use emotion_canvas_protocol::ErrorBody;
use log::{debug, error, info, warn};
use tiny_http::{Header, Request, Response, Server};

use crate::routes::{App, Reply};

/// How long the loop blocks waiting for a request before re-checking the
/// stop flag.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Headers attached to every response.
const RESPONSE_HEADERS: [(&str, &str); 4] = [
    ("Content-Type", "application/json"),
    ("Access-Control-Allow-Origin", "*"),
    ("Access-Control-Allow-Methods", "GET, POST, OPTIONS"),
    ("Access-Control-Allow-Headers", "*"),
];

/// Handle returned by `start_server` to control the running server.
pub struct ServerHandle {
    keep_running: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<()>>,
}

impl ServerHandle {
    /// Signal the server to stop and wait for it to shut down.
    pub fn stop(mut self) {
        self.keep_running.store(false, Ordering::SeqCst);
        self.join();
    }

    /// Block until the server thread exits (it only exits on `stop` or a
    /// listener failure).
    pub fn wait(mut self) {
        self.join();
    }

    fn join(&mut self) {
        let Some(handle) = self.thread.take() else {
            return;
        };
        if handle.join().is_err() {
            error!("server thread panicked");
        }
    }
}

/// Configuration for starting the server.
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub tables: NoteTables,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8000,
            tables: NoteTables::default(),
        }
    }
}

/// Start the server on a background thread. Returns a handle for stopping it
/// and the actual bound address (useful when port 0 is used to let the OS
/// pick a free port). Tables that fail `NoteTables::validate` are refused
/// before anything is bound.
pub fn start_server(config: ServerConfig) -> io::Result<(ServerHandle, SocketAddr)> {
    config.tables.validate().map_err(io::Error::other)?;
    let server = Server::http((config.host.as_str(), config.port)).map_err(io::Error::other)?;
    let addr = server
        .server_addr()
        .to_ip()
        .ok_or_else(|| io::Error::other("server is not listening on an IP socket"))?;

    let keep_running = Arc::new(AtomicBool::new(true));
    let keep_running_clone = keep_running.clone();
    let app = App::new(config.tables);

    let thread = thread::spawn(move || {
        run_server(&server, app, &keep_running_clone);
    });
    info!("listening on http://{addr}");

    Ok((
        ServerHandle {
            keep_running,
            thread: Some(thread),
        },
        addr,
    ))
}

/// Main request loop. Runs until `keep_running` is cleared.
fn run_server(server: &Server, mut app: App, keep_running: &AtomicBool) {
    while keep_running.load(Ordering::SeqCst) {
        match server.recv_timeout(POLL_INTERVAL) {
            Ok(Some(request)) => handle_request(&mut app, request),
            Ok(None) => {}
            Err(e) => {
                error!("listener failed: {e}");
                break;
            }
        }
    }
    info!(
        "server stopped with {} session(s) in memory",
        app.sessions().len()
    );
}

/// Read, route and answer a single request.
fn handle_request(app: &mut App, mut request: Request) {
    let mut body = String::new();
    let reply = match request.as_reader().read_to_string(&mut body) {
        Ok(_) => app.handle(request.method(), request.url(), &body),
        Err(e) => {
            warn!("unreadable body for {} {}: {e}", request.method(), request.url());
            Reply::error(400, ErrorBody::message("request body must be UTF-8"))
        }
    };
    debug!("{} {} -> {}", request.method(), request.url(), reply.status);

    if let Err(e) = request.respond(into_response(reply)) {
        warn!("failed to send response: {e}");
    }
}

fn into_response(reply: Reply) -> Response<io::Cursor<Vec<u8>>> {
    let data = reply.body.map(|body| body.to_string()).unwrap_or_default();
    let mut response = Response::from_data(data.into_bytes()).with_status_code(reply.status);
    for (name, value) in RESPONSE_HEADERS {
        match Header::from_bytes(name, value) {
            Ok(header) => response.add_header(header),
            Err(()) => warn!("invalid response header {name}"),
        }
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use emotion_canvas_notes::{MoodStyle, MoodTable, ScaleTable, VelocityRange};

    #[test]
    fn start_and_stop_on_ephemeral_port() {
        let config = ServerConfig {
            port: 0,
            ..Default::default()
        };
        let (handle, addr) = start_server(config).unwrap();
        assert!(addr.ip().is_loopback());
        assert_ne!(addr.port(), 0);
        handle.stop();
    }

    #[test]
    fn bind_failure_is_reported() {
        let config = ServerConfig {
            host: "definitely-not-a-host.invalid".into(),
            port: 0,
            ..Default::default()
        };
        assert!(start_server(config).is_err());
    }

    #[test]
    fn invalid_tables_are_refused() {
        let mut moods = MoodTable::new();
        moods.insert(
            "odd",
            MoodStyle::new(100.0, 2, "C_ionian", VelocityRange::new(90, 10), 1.0),
        );
        let config = ServerConfig {
            port: 0,
            tables: NoteTables::new(moods, ScaleTable::builtin()),
            ..Default::default()
        };
        let err = start_server(config).err().expect("inverted velocity rejected");
        assert!(err.to_string().contains("inverted"), "{err}");
    }

    #[test]
    fn response_has_json_and_cors_headers() {
        let response = into_response(Reply::no_content());
        let has = |name: &'static str| response.headers().iter().any(|h| h.field.equiv(name));
        assert!(has("Content-Type"));
        assert!(has("Access-Control-Allow-Origin"));
        assert_eq!(response.status_code().0, 204);
    }
}
