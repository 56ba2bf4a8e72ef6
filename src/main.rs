use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use teloxide::prelude::*;
use teloxide::update_listeners::Polling;

use drivelink::cli::{Cli, Commands};
use drivelink::core::{init_logger, log_startup_configuration, Config, WorkerPool};
use drivelink::download::status::LogSink;
use drivelink::download::{JobWorkspace, Pipeline, SourceResolver, StatusMessage};
use drivelink::i18n;
use drivelink::storage::{CredentialStore, GoogleOAuth};
use drivelink::telegram::{create_bot, schema, setup_bot_commands, HandlerDeps};

/// Main entry point
///
/// Parses CLI arguments, loads configuration and dispatches to the subcommand.
///
/// # Errors
/// Returns an error if initialization fails (config, logging, bot creation).
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    // Load environment variables from .env if present
    let _ = dotenv();

    let config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;

    // Initialize logger (console + file)
    init_logger(&config.log_file_path)?;
    log_startup_configuration(&config);

    match cli.command {
        None | Some(Commands::Run) => run_bot(config).await,
        Some(Commands::Fetch { url, output }) => run_fetch(config, url, output).await,
    }
}

async fn run_bot(config: Config) -> Result<()> {
    log::info!("Starting drivelink {}", env!("CARGO_PKG_VERSION"));

    let bot = create_bot(&config)?;
    if let Err(e) = setup_bot_commands(&bot).await {
        log::warn!("Failed to set bot commands: {}", e);
    }

    let oauth = GoogleOAuth::new(
        config.google_client_id.clone(),
        config.google_client_secret(),
        config.oauth_redirect_uri.clone(),
    );
    let credentials = Arc::new(CredentialStore::new(config.credentials_dir.clone(), Arc::new(oauth)));
    let pipeline = Arc::new(Pipeline::from_config(&config, credentials)?);
    let workers = WorkerPool::new(config.workers);
    let deps = HandlerDeps::new(pipeline, workers, i18n::lang_from_code(&config.language));

    let handler = schema(deps);

    // Create polling listener that drops pending updates on start
    let listener = Polling::builder(bot.clone()).drop_pending_updates().build();

    Dispatcher::builder(bot, handler)
        .enable_ctrlc_handler()
        .build()
        .dispatch_with_listener(
            listener,
            LoggingErrorHandler::with_custom_text("An error from the update listener"),
        )
        .await;

    log::info!("Dispatcher shutdown gracefully");
    Ok(())
}

/// Downloads one link with the bot's resolver and moves the file into `output`.
async fn run_fetch(config: Config, url: String, output: PathBuf) -> Result<()> {
    let resolver = SourceResolver::from_config(&config)?;
    let workspace = JobWorkspace::create(&config.download_dir, "cli")
        .with_context(|| format!("cannot create a job directory in {}", config.download_dir.display()))?;
    let mut status = StatusMessage::new(Arc::new(LogSink));

    let result = resolver.resolve(&url, &workspace, &mut status).await;
    let file = match result {
        Ok(file) => file,
        Err(e) => {
            workspace.close();
            return Err(e).context("download failed");
        }
    };

    tokio::fs::create_dir_all(&output).await?;
    let target = output.join(&file.file_name);
    let moved = move_file(&file.path, &target).await;
    workspace.close();
    moved.with_context(|| format!("cannot move the download to {}", target.display()))?;

    println!("{}", target.display());
    Ok(())
}

async fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    if tokio::fs::rename(from, to).await.is_ok() {
        return Ok(());
    }
    // Rename fails across filesystems
    tokio::fs::copy(from, to).await?;
    tokio::fs::remove_file(from).await
}
