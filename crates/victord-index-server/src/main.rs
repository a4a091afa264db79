//! Vector-index server binary.
//!
//! # Usage
//!
//! ```bash
//! victord-index-server -n products -d 128 -m cosine
//! ```

use std::process::ExitCode;

use clap::Parser;
use thiserror::Error;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use victord_core::{
    EnvConfig, Layout, Reactor, Terminator,
    index::{IndexKind, SimilarityMethod},
};
use victord_index_server::state::IndexState;

/// Approximate-nearest-neighbor vector index server.
#[derive(Parser, Debug)]
#[command(name = "victord-index-server")]
#[command(about = "Vector index server")]
#[command(version)]
struct Args {
    /// Database name; its files live under `<db-root>/<name>/`.
    #[arg(short = 'n', long)]
    name: String,

    /// Vector dimensionality.
    #[arg(short = 'd', long)]
    dims: usize,

    /// Index structure kind.
    #[arg(short = 't', long, default_value = "hnsw")]
    index_type: String,

    /// Similarity method.
    #[arg(short = 'm', long, default_value = "cosine")]
    method: String,

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
    /// `-t`/`-m` named something this build does not support.
    #[error("invalid CLI argument: {0}")]
    InvalidArgument(#[from] victord_core::IndexError),
    /// The database directory, WAL, or snapshot could not be prepared.
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
            tracing::error!(error = %err, "index server failed to start");
            ExitCode::FAILURE
        },
    }
}

fn run(args: Args) -> Result<(), StartupError> {
    let method = SimilarityMethod::parse(&args.method)?;
    let _kind = IndexKind::parse(&args.index_type)?;

    let env = EnvConfig::from_env();
    let layout = Layout::ensure(&env.db_root, &args.name)?;

    let socket_path = args.socket.map_or_else(|| layout.default_socket(), std::path::PathBuf::from);

    tracing::info!(name = %args.name, dims = args.dims, socket = %socket_path.display(), "index server starting");

    let state = IndexState::open(
        args.dims,
        method,
        layout.index_snapshot(),
        &layout.index_wal(),
        env.export_threshold,
    )?;

    let terminator = Terminator::install()?;
    let mut reactor = Reactor::bind(&socket_path, args.max_connections, state, terminator)?;

    tracing::info!("index server ready");
    reactor.run()?;

    tracing::info!("index server shut down cleanly");
    Ok(())
}
