//! Shorts pipeline worker binary.

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{error, info};

use vshort_messenger::{DirectoryMessenger, Messenger, TelegramClient, TelegramMessenger};
use vshort_models::SourceRef;
use vshort_worker::metrics::init_metrics;
use vshort_worker::{init_tracing, BotPoller, PipelineConfig, RunCoordinator};

#[derive(Debug, Parser)]
#[command(name = "vshort-worker", version, about = "Cut long videos into captioned vertical shorts")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Process one source and print the run summary as JSON
    Run {
        /// Video URL
        #[arg(long)]
        source: String,
        /// Chat receiving the clips; without it clips are saved under VSHORT_OUTPUT_DIR
        #[arg(long, env = "TELEGRAM_CHAT_ID")]
        chat_id: Option<String>,
    },
    /// Serve the Telegram bot
    Poll,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider (required for TLS/HTTPS)
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("failed to install rustls crypto provider"))?;

    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    info!("Starting vshort-worker");

    let config = PipelineConfig::from_env().context("loading configuration")?;
    config.validate().context("invalid configuration")?;
    info!(
        work_dir = %config.work_dir.display(),
        min_duration = config.limits.min_duration,
        max_duration = config.limits.max_duration,
        max_segments = config.limits.max_segments,
        selection = ?config.selection_mode,
        store = ?config.store_kind,
        "Worker config loaded"
    );

    if let Some(addr) = config.metrics_addr {
        init_metrics(addr)?;
    }

    let telegram = match &config.telegram {
        Some(tg) => Some(Arc::new(TelegramClient::new(tg.clone())?)),
        None => None,
    };

    match cli.command {
        Command::Run { source, chat_id } => {
            let source = SourceRef::url(&source).context("invalid --source")?;
            let messenger: Arc<dyn Messenger> = match (&telegram, chat_id.or(config.chat_id.clone())) {
                (Some(client), Some(chat)) => Arc::new(TelegramMessenger::new(client.clone(), chat)),
                _ => {
                    let dir = config
                        .output_dir
                        .join(chrono::Utc::now().format("%Y%m%d-%H%M%S").to_string());
                    info!(output_dir = %dir.display(), "No Telegram chat configured, saving clips locally");
                    Arc::new(DirectoryMessenger::new(dir))
                }
            };
            let coordinator = RunCoordinator::from_config(config, telegram)?;

            tokio::select! {
                summary = coordinator.process(&source, messenger) => {
                    println!("{}", serde_json::to_string_pretty(&summary)?);
                    if summary.is_aborted() {
                        std::process::exit(1);
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal, abandoning run");
                    std::process::exit(130);
                }
            }
        }
        Command::Poll => {
            let client = telegram.clone().context("poll mode requires TELEGRAM_TOKEN")?;
            let coordinator = Arc::new(RunCoordinator::from_config(config, telegram)?);
            let poller = BotPoller::new(client, coordinator);

            tokio::select! {
                result = poller.run() => {
                    if let Err(e) = result {
                        error!("Bot loop stopped: {}", e);
                        return Err(e.into());
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal");
                }
            }
        }
    }

    info!("Worker shutdown complete");
    Ok(())
}
