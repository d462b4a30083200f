// CLI entrypoint: `serve` runs the HTTP surface over a `Store`; `stats`
// opens a store and prints a one-shot statistics snapshot. Mirrors the
// teacher's clap-derive binary shape (global flags on the top-level
// `Cli`, subcommands as an enum) rather than a flat flag set.

use anyhow::Result;
use clap::{Parser, Subcommand};
use indexedkv::config::StoreOptions;
use indexedkv::observability::init_logging_with_level;
use indexedkv::store::Store;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "indexedkv", about = "A memory-mapped key/value store with pluggable search indexes")]
struct Cli {
    /// Path to the store's backing file.
    #[arg(long, global = true, default_value = "indexedkv.db")]
    db_path: PathBuf,

    /// Initial file size in bytes.
    #[arg(long, global = true, default_value_t = indexedkv::config::DEFAULT_INITIAL_SIZE)]
    initial_size: u64,

    /// Advisory maximum file size in bytes (not strictly enforced).
    #[arg(long, global = true, default_value_t = indexedkv::config::DEFAULT_MAX_SIZE)]
    max_size: u64,

    /// Background sync/GC interval in seconds.
    #[arg(long, global = true, default_value_t = 60)]
    sync_interval: u64,

    /// Enable debug-level logging.
    #[arg(long, global = true)]
    debug: bool,

    /// Suppress all logging but errors.
    #[arg(long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP surface.
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
    /// Open the store and print a statistics snapshot.
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging_with_level(cli.debug, cli.quiet)?;

    let opts = StoreOptions {
        initial_size: cli.initial_size,
        max_size: cli.max_size,
        sync_interval: Duration::from_secs(cli.sync_interval),
        debug: cli.debug,
    };

    match cli.command {
        Command::Serve { port } => {
            let store = Arc::new(Store::new(&cli.db_path, opts).await?);
            indexedkv::http_server::start_server(store, port).await?;
        }
        Command::Stats => {
            let store = Store::new(&cli.db_path, opts).await?;
            let snapshot = store.get_stats();
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
            store.close().await?;
        }
    }

    Ok(())
}
