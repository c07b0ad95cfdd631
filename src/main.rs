use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use panchangam::config::PanchangamConfig;
use panchangam::conversation::FlowController;
use panchangam::logging;
use panchangam::pipeline::Pipeline;
use panchangam::telegram::{self, TelegramClient};

#[derive(Parser)]
#[command(name = "panchangam-bot", version)]
#[command(about = "Telegram bot that fills a Panchangam table with local sunrise and sunset times")]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging for this application
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the Telegram bot (default)
    Run,
    /// Print today's sunrise and sunset times for a location
    Times {
        #[arg(short, long)]
        location: String,
    },
    /// Run the whole pipeline once and keep the rendered image
    Render {
        #[arg(short, long)]
        location: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = PanchangamConfig::load_from_path(cli.config)
        .context("Failed to load configuration")?;
    logging::init_tracing(&config.logging, cli.verbose)?;

    let pipeline = Pipeline::from_config(&config)?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let token = config.bot_token()?;
            let client = Arc::new(TelegramClient::new(&config.telegram, token)?);
            let controller = Arc::new(FlowController::new(
                pipeline,
                config.session_idle_timeout(),
            ));
            info!("Starting Panchangam bot {}", panchangam::VERSION);
            telegram::run_bot(
                client,
                controller,
                Duration::from_secs(config.session.sweep_interval_seconds.into()),
            )
            .await?;
        }
        Commands::Times { location } => {
            let (resolved, times) = pipeline
                .times(&location)
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message()))?;
            println!("{} ({})", resolved.name, resolved.coordinates.format_coordinates());
            println!("{}", times.summary());
        }
        Commands::Render { location } => {
            let output = pipeline
                .run("cli", &location)
                .await
                .map_err(|e| anyhow::anyhow!("{e}"))?;
            println!("{}", output.times.summary());
            let image = output
                .artifact
                .keep()
                .context("Failed to keep the rendered image")?;
            println!("{}", image.display());
        }
    }

    Ok(())
}
