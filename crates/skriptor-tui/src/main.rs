use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use skriptor_core::{Config, ScriptFormat};
use tracing_subscriber::EnvFilter;

mod app;
mod handler;
mod markup;
mod runtime;
mod tui;
mod ui;

use app::App;
use tui::EventHandler;

#[derive(Parser, Debug)]
#[command(name = "skriptor")]
#[command(about = "Chat with the script generator and preview the e-learning scripts it writes")]
#[command(version)]
struct Cli {
    /// Backend address, e.g. http://localhost:8000
    #[arg(long)]
    base_url: Option<String>,

    /// Output format for preview and download (txt, json, html)
    #[arg(short, long)]
    format: Option<String>,

    /// Write logs here instead of the cache directory
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,
}

impl Cli {
    fn apply(&self, config: &mut Config) -> Result<()> {
        if let Some(url) = &self.base_url {
            config.base_url = url.clone();
        }
        if let Some(format) = &self.format {
            config.default_format = ScriptFormat::from_str(format)
                .ok_or_else(|| anyhow!("unknown format '{}' (expected txt, json or html)", format))?;
        }
        if let Some(secs) = self.timeout {
            if secs == 0 {
                bail!("--timeout must be at least one second");
            }
            config.request_timeout_secs = secs;
        }
        Ok(())
    }
}

fn default_log_path() -> Result<PathBuf> {
    let cache_dir = dirs::cache_dir()
        .ok_or_else(|| anyhow!("Could not determine cache directory"))?;
    Ok(cache_dir.join("skriptor").join("skriptor.log"))
}

/// Log to a file; the terminal belongs to the TUI.
fn init_logging(path: Option<PathBuf>) -> Result<PathBuf> {
    let path = match path {
        Some(path) => path,
        None => default_log_path()?,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Could not open log file {:?}", path))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("skriptor=info")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();

    Ok(path)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load().unwrap_or_else(|e| {
        eprintln!("Warning: {}; using default configuration", e);
        Config::new()
    });
    cli.apply(&mut config)?;

    let log_path = init_logging(cli.log_file.clone())?;
    tracing::info!(
        base_url = %config.base_url,
        format = %config.default_format,
        log = ?log_path,
        "starting skriptor"
    );

    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let mut events = EventHandler::new();
    let mut app = App::new(&config, events.sender());
    app.launch();

    let result = run(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    tracing::info!("skriptor exited");
    result
}

async fn run(terminal: &mut tui::Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event).await?,
            None => break,
        }
    }
    Ok(())
}
