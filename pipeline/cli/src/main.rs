//! Poster Stormer - terminal surface for the poster generation pipeline
//!
//! Takes a fictitious movie description from the command line, drives the
//! headless pipeline and prints its progress, the similar movies and the
//! generated poster URLs. Once a run settles the posters can be browsed.
//!
//! # Usage
//!
//! ```bash
//! # Generate posters for a movie
//! poster-stormer --title "Nova" --plot "A pilot crosses a storm." --genre Sci-Fi
//!
//! # Pick a style and the retro look
//! poster-stormer -t "Nova" -p "A pilot crosses a storm." -s "3D Digital Art" --retro
//!
//! # List the genres offered by the backend
//! poster-stormer --list-genres
//!
//! # Use a specific config file
//! poster-stormer --config /path/to/config.toml -t "Nova" -p "..."
//! ```
//!
//! While browsing: `n` next poster, `p` previous poster, `q` quit.

mod display;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use poster_core::cache::default_store_path;
use poster_core::{
    default_genre, load_config_from_path, ConfigOverrides, FalImageBackend, FormState, GenreCache,
    HttpGenreCatalog, HttpPromptBackend, LocalStore, PipelineController, PipelineMessage,
    PosterConfig, PosterStyle, UserEvent,
};

use crate::display::{DisplayLine, DisplayState};

/// Poster Stormer command line
#[derive(Parser, Debug)]
#[command(name = "poster-stormer")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Movie title
    #[arg(short, long, default_value = "")]
    title: String,

    /// Movie plot
    #[arg(short, long, default_value = "")]
    plot: String,

    /// Genre (defaults to the first genre offered by the backend)
    #[arg(short, long)]
    genre: Option<String>,

    /// Poster style
    #[arg(short, long, default_value = "Realistic Photography")]
    style: String,

    /// Retro look
    #[arg(long)]
    retro: bool,

    /// Number of posters to request
    #[arg(short = 'n', long)]
    num_images: Option<u8>,

    /// Path to config file
    #[arg(short, long, env = "POSTER_CONFIG")]
    config: Option<PathBuf>,

    /// Prompt backend base URL
    #[arg(long, env = "POSTER_BACKEND_URL")]
    backend_url: Option<String>,

    /// API credential (overrides `API_CREDENTIAL` and the config file)
    #[arg(long)]
    credential: Option<String>,

    /// Local state file holding the genre cache
    #[arg(long)]
    cache_path: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "POSTER_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    /// Print the available genres and exit
    #[arg(long)]
    list_genres: bool,

    /// Exit as soon as the run settles
    #[arg(long)]
    no_interactive: bool,
}

impl Args {
    /// Command-line overrides on top of file and environment config
    fn overrides(&self) -> ConfigOverrides {
        let mut overrides = ConfigOverrides::new();
        if let Some(url) = &self.backend_url {
            overrides = overrides.with_backend_url(url.clone());
        }
        if let Some(count) = self.num_images {
            overrides = overrides.with_num_images(count);
        }
        if let Some(credential) = &self.credential {
            overrides = overrides.with_credential(credential.clone());
        }
        if let Some(path) = &self.cache_path {
            overrides = overrides.with_cache_path(path.clone());
        }
        overrides
    }

    /// Fill a form from the arguments
    fn form(&self, genre: &str) -> FormState {
        let mut form = FormState::new();
        form.set_title(self.title.as_str());
        form.set_plot(self.plot.as_str());
        form.set_genre(genre);
        match PosterStyle::parse(&self.style) {
            Some(style) => form.set_style(style.as_str()),
            None => form.set_style(self.style.as_str()),
        }
        form.set_retro(self.retro);
        form
    }
}

/// Browsing commands read from stdin
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Command {
    Next,
    Previous,
    Quit,
}

impl Command {
    fn parse(line: &str) -> Option<Self> {
        match line.trim().to_ascii_lowercase().as_str() {
            "n" | "next" => Some(Self::Next),
            "p" | "prev" | "previous" => Some(Self::Previous),
            "q" | "quit" | "exit" => Some(Self::Quit),
            _ => None,
        }
    }
}

/// Initialize logging with the specified level
fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("poster_stormer={level},poster_core={level}"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn genre_cache(config: &PosterConfig) -> Option<GenreCache> {
    let path = config.cache_path.clone().or_else(default_store_path)?;
    Some(GenreCache::new(LocalStore::new(path), config.genre_ttl))
}

/// Genres from the cache or the backend; empty when neither is reachable
async fn load_genres(config: &PosterConfig) -> Vec<String> {
    let catalog = HttpGenreCatalog::new(config.backend_url.as_str());
    let result = match genre_cache(config) {
        Some(cache) => cache.load_or_fetch(&catalog).await,
        None => poster_core::GenreCatalog::fetch_genres(&catalog).await,
    };

    match result {
        Ok(genres) => genres,
        Err(e) => {
            warn!(error = %e, "Could not load genres");
            Vec::new()
        }
    }
}

/// Terminal writer that keeps one overwritable status line
struct Terminal {
    stdout: tokio::io::Stdout,
    status_open: bool,
}

impl Terminal {
    fn new() -> Self {
        Self {
            stdout: tokio::io::stdout(),
            status_open: false,
        }
    }

    async fn write(&mut self, line: DisplayLine) -> Result<()> {
        match line {
            DisplayLine::Status(text) => {
                self.stdout
                    .write_all(format!("\r\x1b[2K{text}").as_bytes())
                    .await?;
                self.status_open = true;
            }
            DisplayLine::Persistent(text) => {
                if self.status_open {
                    self.stdout.write_all(b"\r\x1b[2K").await?;
                    self.status_open = false;
                }
                self.stdout.write_all(format!("{text}\n").as_bytes()).await?;
            }
        }
        self.stdout.flush().await?;
        Ok(())
    }
}

async fn list_genres(config: &PosterConfig) -> Result<()> {
    let genres = load_genres(config).await;
    if genres.is_empty() {
        anyhow::bail!("No genres available from {}", config.backend_url);
    }
    let mut terminal = Terminal::new();
    for genre in genres {
        terminal.write(DisplayLine::Persistent(genre)).await?;
    }
    Ok(())
}

async fn generate(args: &Args, config: PosterConfig) -> Result<()> {
    let genre = match &args.genre {
        Some(genre) => genre.clone(),
        None => {
            let genres = load_genres(&config).await;
            default_genre(&genres).unwrap_or_default().to_string()
        }
    };
    let form = args.form(&genre);
    if !form.can_generate() {
        anyhow::bail!("Both --title and --plot are required");
    }

    let prompt = HttpPromptBackend::new(config.backend_url.as_str(), config.credential.clone());
    let images = FalImageBackend::new(config.images.clone(), config.credential.clone());

    let (msg_tx, mut msg_rx) = mpsc::channel::<PipelineMessage>(100);
    let (event_tx, event_rx) = mpsc::channel::<UserEvent>(16);

    let mut controller = PipelineController::new(prompt, images, config.pipeline_config(), msg_tx);
    let controller_task = tokio::spawn(async move {
        controller.run(event_rx).await;
    });

    event_tx
        .send(UserEvent::generate(form.snapshot()))
        .await
        .context("Pipeline stopped before the request was sent")?;

    let mut terminal = Terminal::new();
    let mut state = DisplayState::new();
    let mut commands = BufReader::new(tokio::io::stdin()).lines();
    let mut browsing = false;

    loop {
        tokio::select! {
            msg = msg_rx.recv() => {
                let Some(msg) = msg else { break };
                for line in state.apply_message(msg) {
                    terminal.write(line).await?;
                }
                if state.is_settled() && !browsing {
                    if args.no_interactive || state.artifacts.len() < 2 {
                        break;
                    }
                    browsing = true;
                    terminal
                        .write(DisplayLine::Persistent("[n]ext  [p]revious  [q]uit".to_string()))
                        .await?;
                }
            }
            line = commands.next_line(), if browsing => {
                let command = match line? {
                    Some(line) => Command::parse(&line),
                    None => Some(Command::Quit),
                };
                match command {
                    Some(Command::Next) => event_tx.send(UserEvent::NextPoster).await?,
                    Some(Command::Previous) => event_tx.send(UserEvent::PreviousPoster).await?,
                    Some(Command::Quit) => break,
                    None => {}
                }
            }
        }
    }

    // Teardown fails only if the controller already exited
    let _ = event_tx.send(UserEvent::Teardown).await;
    if let Err(e) = controller_task.await {
        error!(error = %e, "Pipeline task ended abnormally");
    }

    if state.phase == poster_core::PipelinePhase::Failed {
        anyhow::bail!("Generation failed");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level);
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let mut config = load_config_from_path(args.config.clone()).context("Loading config")?;
    args.overrides().apply(&mut config);
    config.validate().context("Invalid configuration")?;
    info!(backend_url = %config.backend_url, source = ?config.source(), "Config loaded");

    if !config.has_credential() {
        warn!("No API credential configured; generation will fail");
    }

    if args.list_genres {
        return list_genres(&config).await;
    }

    generate(&args, config).await
}
