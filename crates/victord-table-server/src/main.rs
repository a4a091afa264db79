//! Key-value server binary.
//!
//! # Usage
//!
//! ```bash
//! victord-table-server -n sessions
//! ```

use std::process::ExitCode;

use clap::Parser;
use thiserror::Error;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use victord_core::{EnvConfig, Layout, Reactor, Terminator};
use victord_table_server::state::TableState;

/// Binary-safe key-value server.
#[derive(Parser, Debug)]
#[command(name = "victord-table-server")]
#[command(about = "Key-value server")]
#[command(version)]
struct Args {
    /// Database name; its files live under `<db-root>/<name>/`.
    #[arg(short = 'n', long)]
    name: String,

    /// Listen endpoint path. Defaults to `<db-root>/<name>/socket.unix`.
    #[arg(short = 'u', long)]
    socket: Option<String>,

    /// Maximum simultaneous client connections.
    #[arg(long, default_value_t = victord_core::config::DEFAULT_MAX_CONNECTIONS)]
    max_connections: usize,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Fatal startup failures.
#[derive(Debug, Error)]
enum StartupError {
    /// The database directory could not be prepared.
    #[error("storage setup failed: {0}")]
    Storage(#[from] std::io::Error),
    /// Loading the snapshot or replaying the WAL failed.
    #[error("durability setup failed: {0}")]
    Wal(#[from] victord_core::WalError),
}

fn main() -> ExitCode {
    let args = Args::parse();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "table server failed to start");
            ExitCode::FAILURE
        },
    }
}

fn run(args: Args) -> Result<(), StartupError> {
    let env = EnvConfig::from_env();
    let layout = Layout::ensure(&env.db_root, &args.name)?;

    let socket_path = args.socket.map_or_else(|| layout.default_socket(), std::path::PathBuf::from);

    tracing::info!(name = %args.name, socket = %socket_path.display(), "table server starting");

    let state = TableState::open(layout.table_snapshot(), &layout.table_wal(), env.export_threshold)?;

    let terminator = Terminator::install()?;
    let mut reactor = Reactor::bind(&socket_path, args.max_connections, state, terminator)?;

    tracing::info!("table server ready");
    reactor.run()?;

    tracing::info!("table server shut down cleanly");
    Ok(())
}
