use std::{
    io,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use opentrain_scanner::{
    cell_scanner::CellScanner,
    config::{self, Config},
    emitter::{Emitter, EventChannel, JsonLinesChannel},
    replay::{self, StaticTelephony},
};

#[derive(Debug, Parser)]
struct Cli {
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Replay a GPS track CSV through the scanners, printing events as JSON lines
    Replay {
        track: PathBuf,
        /// Telephony snapshot to poll for cell telemetry
        #[arg(short, long)]
        telephony: Option<PathBuf>,
        /// Sleep out the gaps between fixes
        #[arg(long)]
        realtime: bool,
    },
    /// Run a single cell scan over a telephony snapshot
    Cells { telephony: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match cli.config.as_deref() {
        Some(path) => config::load(path)?,
        None if Path::new("config.toml").exists() => config::load(Path::new("config.toml"))?,
        None => Config::default(),
    };

    let channel: Arc<dyn EventChannel + Send + Sync> = Arc::new(JsonLinesChannel::new(io::stdout()));

    match cli.command {
        Command::Replay {
            track,
            telephony,
            realtime,
        } => {
            let track = replay::load_track(&track)?;
            let telephony = telephony.as_deref().map(StaticTelephony::load).transpose()?;
            replay::run(&config, &track, telephony, channel, realtime).await?;
        }
        Command::Cells { telephony } => {
            let telephony = StaticTelephony::load(&telephony)?;
            let emitter = Emitter::new(config.topic.clone(), channel);
            let scanner = CellScanner::new(telephony, emitter, config.capabilities);
            if !scanner.scan()? {
                eprintln!("No cells to report");
            }
        }
    }

    Ok(())
}
