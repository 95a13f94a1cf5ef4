use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use docent::clipboard::ClipboardService;
use docent::document::{ContentRenderer, DocumentSource, fetch_document, http_client};
use docent::progress::ProgressTracker;
use docent::storage::{FileStore, MemoryStore, Persistence};
use docent::{App, Config};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "docent")]
#[command(author, version, about, long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    /// Markdown file or URL to open (defaults to the configured document)
    document: Option<String>,

    /// Keep state in memory only; nothing is written to disk
    #[arg(long)]
    ephemeral: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a document to HTML
    Html {
        /// Markdown file or URL
        source: String,
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Inspect or reset saved progress
    Progress {
        #[command(subcommand)]
        action: ProgressAction,
    },
}

#[derive(Subcommand)]
enum ProgressAction {
    /// Print progress as JSON
    Export {
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Forget all progress and copy statistics
    Reset,
}

/// Log to a file; the terminal belongs to the UI
fn init_logging() -> Result<()> {
    let path = Config::log_path()?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory {:?}", parent))?;
    }
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file {:?}", path))?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env("DOCENT_LOG")
                .unwrap_or_else(|_| "docent=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file)),
        )
        .init();
    Ok(())
}

fn open_persistence(ephemeral: bool) -> Result<Persistence> {
    if ephemeral {
        return Ok(Persistence::new(MemoryStore::default()));
    }
    Ok(Persistence::new(FileStore::open(Config::state_path()?)))
}

fn write_output(output: Option<PathBuf>, contents: &str) -> Result<()> {
    match output {
        Some(path) => std::fs::write(&path, contents)
            .with_context(|| format!("Failed to write {}", path.display())),
        None => {
            println!("{contents}");
            Ok(())
        }
    }
}

async fn render_html(config: &Config, source: &str, output: Option<PathBuf>) -> Result<()> {
    let source = DocumentSource::parse(source);
    let client = http_client()?;
    let raw = fetch_document(&client, &source, CancellationToken::new()).await?;
    let rendered = ContentRenderer::from_config(config).render(&raw);
    write_output(output, &rendered.html)
}

fn progress_command(config: &Config, action: ProgressAction, ephemeral: bool) -> Result<()> {
    let mut persistence = open_persistence(ephemeral)?;
    let now = Instant::now();
    let mut tracker = ProgressTracker::load(&persistence, config.session_tick(), now);
    let mut clipboard = ClipboardService::for_terminal();
    clipboard.load(&persistence);

    match action {
        ProgressAction::Export { output } => {
            let export = tracker.export(clipboard.count());
            let json = serde_json::to_string_pretty(&export)?;
            write_output(output, &json)
        }
        ProgressAction::Reset => {
            tracker.reset(now, &mut persistence);
            clipboard.reset(&mut persistence);
            println!("Progress reset");
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logging is best effort
    if let Err(e) = init_logging() {
        eprintln!("docent: logging disabled: {e:#}");
    }

    let config = Config::load()?;

    match cli.command {
        Some(Commands::Html { source, output }) => render_html(&config, &source, output).await,
        Some(Commands::Progress { action }) => progress_command(&config, action, cli.ephemeral),
        None => {
            let source =
                cli.document.or_else(|| config.document.clone()).map(|s| DocumentSource::parse(&s));
            let persistence = open_persistence(cli.ephemeral)?;
            let mut app = App::new(config, persistence, ClipboardService::for_terminal(), source)?;
            app.run().await
        }
    }
}
