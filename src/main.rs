//! Binary entrypoint for the photo puzzle slideshow.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use tokio_util::sync::CancellationToken;
use tracing::{Level, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use photo_puzzle::config::Configuration;
use photo_puzzle::preferences::{MemoryPreferences, PreferenceStore, YamlPreferences};
use photo_puzzle::session::{
    DirectoryPicker, SELECT_DIRECTORY_TITLE, SessionController, resolve_start_directory,
};
use photo_puzzle::tasks::loader::ImageDecoder;
use photo_puzzle::terminal::{self, PromptPicker, TerminalScreen};
use photo_puzzle::Error;

#[derive(Debug, Parser)]
#[command(
    name = "photo-puzzle",
    version,
    about = "Slideshow that turns every photo into a sliding puzzle"
)]
struct Cli {
    /// Path to YAML config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Image directory for this run (skips the remembered one)
    #[arg(short, long, value_name = "DIR")]
    dir: Option<PathBuf>,

    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbosity: u8) -> Result<()> {
    // map -v to log level
    let level = match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("photo_puzzle={level}").parse()?)
        .add_directive("fontdb=error".parse()?);
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let cfg = match &cli.config {
        Some(path) => Configuration::from_yaml_file(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => Configuration::default(),
    }
    .validated()
    .context("invalid configuration values")?;
    info!(?cfg, "configuration loaded");

    let stored = YamlPreferences::load(cfg.resolved_preferences_path()?);
    match cli.dir {
        // One-off directory: the remembered one stays as it is.
        Some(dir) => {
            let preferences = MemoryPreferences::detached_from(&stored);
            run_session(cfg, preferences, Some(dir)).await
        }
        None => run_session(cfg, stored, None).await,
    }
}

async fn run_session<P: PreferenceStore>(
    cfg: Configuration,
    preferences: P,
    dir: Option<PathBuf>,
) -> Result<()> {
    let mut picker = PromptPicker::new(io::stdin().lock());
    let mut session = SessionController::new(
        cfg,
        TerminalScreen::new(io::stdout()),
        preferences,
        Arc::new(ImageDecoder),
    );

    let start_dir = match dir {
        Some(dir) => dir,
        None => resolve_start_directory(session.preferences(), &mut picker)
            .context("need a directory with images")?,
    };
    // A remembered directory that vanished falls back to the picker once.
    if let Err(err) = session.start(start_dir).await {
        let Error::DirectoryUnreadable { .. } = err else {
            return Err(err).context("failed to start session");
        };
        warn!("{err}; asking for another directory");
        let retry = picker
            .pick_directory(SELECT_DIRECTORY_TITLE)
            .ok_or(Error::NoDirectory)
            .with_context(|| err.to_string())?;
        session
            .start(retry)
            .await
            .context("need a readable directory with images")?;
    }
    drop(picker);

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!("ctrl-c handler failed: {err}");
                return;
            }
            info!("ctrl-c received; initiating shutdown");
            cancel.cancel();
        });
    }

    terminal::run(&mut session, cancel).await
}
