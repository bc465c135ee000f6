use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use arxiv_chat::api::HttpBackend;
use arxiv_chat::app::App;
use arxiv_chat::config::Config;
use arxiv_chat::runtime::Runtime;
use arxiv_chat::store::{KeyValueStore, MemoryStore, SqliteStore};

#[derive(Parser, Debug)]
#[command(name = "arxiv-chat", about = "Search papers and chat about them")]
struct Cli {
    /// Config file (default: ~/.config/arxiv-chat/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Backend base URL, overrides the config file
    #[arg(long)]
    backend: Option<String>,

    /// Where to write the rendered page
    #[arg(long)]
    page: Option<PathBuf>,

    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    if let Some(backend) = cli.backend {
        config.backend.base_url = backend;
    }
    if let Some(page) = cli.page {
        config.page.path = Some(page);
    }

    let store: Box<dyn KeyValueStore> = match SqliteStore::open(config.storage_path()) {
        Ok(store) => {
            info!("history and bookmarks stored in {}", store.path().display());
            Box::new(store)
        }
        Err(e) => {
            warn!(
                "could not open {}: {}. History and bookmarks will not be saved.",
                config.storage_path().display(),
                e
            );
            Box::new(MemoryStore::new())
        }
    };

    let backend = HttpBackend::with_config(&config.backend).context("failed to build HTTP client")?;
    info!("using backend at {}", backend.base_url());
    let mut app = App::new(store, &config);

    Runtime::new(Arc::new(backend), config.page_path(), config.downloads_dir())
        .run(&mut app)
        .await
}

fn init_tracing(verbose: bool) -> anyhow::Result<()> {
    let level = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_env("ARXIV_CHAT_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}
