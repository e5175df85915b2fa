//! thing: headless granular player for one installation node
//!
//! Run with: cargo run --bin thing -- --soundfile loop.wav --start
//!
//! Control messages are read from stdin, one JSON object per line:
//!
//! ```text
//! {"audio-player:period": 0.2, "audio-player:control": "start"}
//! {"applyFx": true}
//! {"triggerFile": {"url": "bell.wav", "volume": -6}}
//! ```

mod app;
mod input;

use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::WrapErr;
use grainfield::EngineConfig;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "thing")]
#[command(about = "Headless granular player for one installation node", long_about = None)]
pub struct Args {
    /// Engine configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Sound file for the granular player
    #[arg(short, long)]
    pub soundfile: Option<PathBuf>,

    /// Start the player as soon as the sound file is loaded
    #[arg(long)]
    pub start: bool,

    /// Route the player through the feedback delay from the start
    #[arg(long)]
    pub apply_fx: bool,

    /// Directory that file names in control messages are relative to
    #[arg(short, long, default_value = ".")]
    pub root: PathBuf,

    /// Seed for the grain onset jitter
    #[arg(long)]
    pub seed: Option<u64>,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => EngineConfig::load(path)
            .wrap_err_with(|| format!("failed to load config from {}", path.display()))?,
        None => EngineConfig::default(),
    };

    app::run(&args, config)
}
