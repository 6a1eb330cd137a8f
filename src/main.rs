use std::io::{self, Write};
use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr, eyre};
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use clarity::application::AnalysisClient;
use clarity::infrastructure::config::CacheCommand;
use clarity::infrastructure::{AppConfig, CliArgs, Command, DiskResponseCache, StorageManager};
use clarity::presentation::App;
use clarity::presentation::render::{format_bytes, render_presets};

fn init_logging(config: &AppConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string()));

    let log_path = config.effective_log_path();
    let file_layer = match &log_path {
        Some(log_path) => {
            if let Some(parent) = log_path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(log_path)?;

            Some(
                fmt::layer()
                    .with_writer(file)
                    .with_ansi(false)
                    .with_target(true)
                    .with_thread_ids(false),
            )
        }
        None => None,
    };

    let stderr_layer = config
        .log_stderr
        .then(|| fmt::layer().with_writer(io::stderr).with_target(false));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .init();

    if let Some(log_path) = log_path {
        info!(path = %log_path.display(), "Logging initialized");
    }

    Ok(())
}

fn load_config(args: &CliArgs) -> Result<AppConfig> {
    let storage = StorageManager::new()?;
    let mut config = storage.load_config(args.config.as_deref())?;
    config.merge_with_args(args);
    Ok(config)
}

async fn open_store(config: &AppConfig) -> Result<DiskResponseCache> {
    let dir = config
        .model_cache_dir()
        .ok_or_else(|| eyre!("failed to determine cache directory"))?;
    let store = DiskResponseCache::new(dir, config.cache.max_disk_bytes).await?;
    Ok(store)
}

async fn create_client(args: &CliArgs, config: &AppConfig) -> Result<AnalysisClient> {
    let api_key = args.api_key.as_deref().unwrap_or_default();
    let client =
        AnalysisClient::gemini(api_key, config.gemini_config(), config.analysis_config())?;

    if !config.cache.persist {
        return Ok(client);
    }

    match open_store(config).await {
        Ok(store) => Ok(client.with_store(Arc::new(store))),
        Err(e) => {
            warn!(error = %e, "Persistent response cache unavailable, continuing without it");
            Ok(client)
        }
    }
}

fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, cancelling");
            trigger.cancel();
        }
    });
    cancel
}

async fn run_cache_command(action: CacheCommand, config: &AppConfig) -> Result<()> {
    let store = open_store(config).await?;
    let mut out = io::stdout();

    match action {
        CacheCommand::Clear => {
            let removed = store.len();
            store
                .clear()
                .await
                .wrap_err("failed to clear response cache")?;
            writeln!(
                out,
                "Removed {removed} cached response(s) from {}",
                store.cache_dir().display()
            )?;
        }
        CacheCommand::Info => {
            writeln!(out, "Directory  {}", store.cache_dir().display())?;
            writeln!(out, "Entries    {}", store.len())?;
            writeln!(
                out,
                "Size       {} of {}",
                format_bytes(store.current_size()),
                format_bytes(config.cache.max_disk_bytes)
            )?;
        }
    }
    Ok(())
}

async fn create_app(args: &CliArgs, config: &AppConfig) -> Result<App> {
    let client = create_client(args, config).await?;
    Ok(App::new(Arc::new(client), cancel_on_ctrl_c()))
}

async fn run(args: CliArgs, config: AppConfig) -> Result<()> {
    let mut out = io::stdout();

    match &args.command {
        Command::Presets => render_presets(&mut out)?,
        Command::Cache { action } => run_cache_command(*action, &config).await?,
        Command::Analyze {
            image,
            question,
            presets,
            mode,
        } => {
            create_app(&args, &config)
                .await?
                .analyze(&mut out, image, question.as_deref(), presets, *mode)
                .await?;
        }
        Command::Compare {
            image1,
            image2,
            question,
            presets,
        } => {
            create_app(&args, &config)
                .await?
                .compare(&mut out, image1, image2, question.as_deref(), presets)
                .await?;
        }
        Command::Chat {
            image,
            compare_with,
            mode,
        } => {
            let input = BufReader::new(tokio::io::stdin());
            create_app(&args, &config)
                .await?
                .chat(input, &mut out, image, compare_with.as_deref(), *mode)
                .await?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let _ = dotenvy::dotenv();

    let args = CliArgs::parse();
    let config = load_config(&args)?;

    init_logging(&config)?;

    info!(version = clarity::VERSION, "Starting {}", clarity::NAME);

    run(args, config).await
}
