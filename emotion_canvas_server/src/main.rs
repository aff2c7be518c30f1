// CLI entry point for the Emotion Canvas backend.
//
// Loads the note tables (a built-in preset set, optionally overridden by a
// JSON file), starts the HTTP server, and blocks until the process is killed.
// See `server.rs` for the request loop and `routes.rs` for the API.
//
// Usage:
//   canvas-server [OPTIONS]
//     --host <HOST>          Bind address (default: 127.0.0.1)
//     --port <PORT>          Listen port (default: 8000)
//     --presets <SET>        creative | aligned (default: creative)
//     --tables <FILE>        JSON file with "moods" and/or "scales"
//     --log-level <LEVEL>    Default log filter when RUST_LOG is unset

use std::path::PathBuf;

use clap::Parser;
use emotion_canvas_notes::{NoteTables, PresetSet};
use emotion_canvas_server::server::{ServerConfig, start_server};
use log::{error, info};

#[derive(Parser, Debug)]
#[command(name = "canvas-server")]
#[command(version, about = "HTTP backend for the Emotion Canvas")]
struct Cli {
    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on (0 picks a free port)
    #[arg(long, default_value_t = 8000)]
    port: u16,

    /// Built-in mood presets to start from
    #[arg(long, default_value_t = PresetSet::Creative)]
    presets: PresetSet,

    /// JSON tables file overriding the built-in moods and/or scales
    #[arg(long)]
    tables: Option<PathBuf>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() {
    let cli = Cli::parse();

    let env = env_logger::Env::default().filter_or("RUST_LOG", &cli.log_level);
    env_logger::init_from_env(env);

    let tables = match &cli.tables {
        Some(path) => match NoteTables::load(path, cli.presets) {
            Ok(tables) => {
                info!("loaded note tables from {}", path.display());
                tables
            }
            Err(e) => {
                error!("failed to load {}: {e}", path.display());
                std::process::exit(1);
            }
        },
        None => NoteTables::preset(cli.presets),
    };
    info!(
        "{} moods, {} scales ({} presets)",
        tables.moods.len(),
        tables.scales.len(),
        cli.presets
    );

    let config = ServerConfig {
        host: cli.host,
        port: cli.port,
        tables,
    };
    let (handle, addr) = match start_server(config) {
        Ok(result) => result,
        Err(e) => {
            error!("failed to start server: {e}");
            std::process::exit(1);
        }
    };

    println!("Emotion Canvas backend listening on http://{addr}");
    println!("Press Ctrl+C to stop.");

    // The request thread only exits on a listener failure; SIGINT ends the
    // process directly.
    handle.wait();
}
