mod config;
mod exporter;
mod format;
mod platform;
mod store;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Config, BOT_TOKEN_ENV};
use crate::exporter::Exporter;
use crate::platform::dump::DumpFetcher;
use crate::platform::telegram::UpdatesFetcher;
use crate::platform::{ChatSelector, Fetcher};
use crate::store::MessageStore;

/// Export Telegram messages to an SQLite database.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Chat id or username of the chat/channel to export messages from
    #[arg(long, value_name = "CHAT")]
    chat: Option<String>,

    /// Path to the SQLite database to write
    #[arg(long, value_name = "PATH")]
    db: Option<PathBuf>,

    /// Read messages from a Bot API JSON dump instead of Telegram
    #[arg(long, value_name = "PATH")]
    dump: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,telegram_exporter=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    // Load configuration (CLI path > ./config.toml)
    let explicit = cli.config.is_some();
    let config_path = cli.config.unwrap_or_else(|| PathBuf::from("config.toml"));
    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path, explicit)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    // CLI > config > default
    let chat = cli
        .chat
        .or_else(|| config.export.chat.clone())
        .context("No chat given. Use --chat or set chat under [export] in the config file.")?;
    let chat = ChatSelector::parse(&chat);
    let db_path = cli.db.unwrap_or_else(|| config.database.path.clone());
    let dump_file = cli.dump.or_else(|| config.export.dump_file.clone());

    info!("  Chat: {}", chat);
    info!("  Database: {}", db_path.display());

    let store = MessageStore::open(&db_path)?;

    let summary = match dump_file {
        Some(path) => {
            let fetcher = DumpFetcher::new(path);
            info!("  Source: dump file {}", fetcher.path().display());
            run_export(fetcher, store.clone(), &chat).await?
        }
        None => {
            let token = config.bot_token().with_context(|| {
                format!(
                    "No bot token. Set bot_token under [telegram] or the {} environment variable.",
                    BOT_TOKEN_ENV
                )
            })?;
            info!("  Source: Telegram Bot API");
            run_export(UpdatesFetcher::new(&token), store.clone(), &chat).await?
        }
    };

    info!(
        "Messages have been successfully exported to the database ({} new, {} updated, {} rows total)",
        summary.inserted,
        summary.updated,
        store.count().await?
    );
    Ok(())
}

async fn run_export<F: Fetcher>(
    fetcher: F,
    store: MessageStore,
    chat: &ChatSelector,
) -> Result<exporter::ExportSummary> {
    Exporter::new(fetcher, store).run(chat).await
}
