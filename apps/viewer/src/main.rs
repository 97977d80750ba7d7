use std::{io::Write, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::broadcast::error::RecvError,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use viewer_core::{
    ChapterViewer, CommonMarkRenderer, ContentFetcher, DirectoryTransport, DocumentTransport,
    HttpTransport, MarkdownRenderer, NavigationOutcome, PlainTextRenderer, ResponsePolicy,
};

mod config;
mod terminal;

use config::{load_settings, ChapterSource};
use terminal::{parse_command, Command, TerminalView, HELP};

#[derive(Parser, Debug)]
#[command(name = "chapter-viewer", about = "Page through numbered markdown chapters")]
#[command(version)]
struct Args {
    /// Settings file; missing is fine, defaults apply
    #[arg(long, default_value = "viewer.toml")]
    config: PathBuf,
    /// Base URL or directory holding PART_<n>.md files
    #[arg(long)]
    source: Option<String>,
    #[arg(long)]
    total_pages: Option<u32>,
    /// strict | permissive
    #[arg(long)]
    policy: Option<ResponsePolicy>,
    #[arg(long)]
    timeout_secs: Option<u64>,
    #[arg(long, value_enum, default_value_t = RendererKind::Plain)]
    renderer: RendererKind,
    /// Print viewer events as JSON lines on stderr
    #[arg(long)]
    events_json: bool,
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RendererKind {
    Html,
    Plain,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if args.verbose { "debug" } else { "info" })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut settings = load_settings(&args.config)?;
    if let Some(source) = args.source {
        settings.source = source;
    }
    if let Some(total_pages) = args.total_pages {
        settings.total_pages = total_pages;
    }
    if let Some(policy) = args.policy {
        settings.response_policy = policy;
    }
    if let Some(secs) = args.timeout_secs {
        settings.request_timeout_secs = Some(secs);
    }

    let transport: Arc<dyn DocumentTransport> = match settings.chapter_source()? {
        ChapterSource::Http(url) => Arc::new(
            HttpTransport::new(url.as_str(), settings.request_timeout())
                .context("failed to build http transport")?,
        ),
        ChapterSource::Directory(root) => Arc::new(DirectoryTransport::new(root)),
    };
    let renderer: Arc<dyn MarkdownRenderer> = match args.renderer {
        RendererKind::Html => Arc::new(CommonMarkRenderer),
        RendererKind::Plain => Arc::new(PlainTextRenderer),
    };

    info!(
        "viewer: source={} total_pages={} policy={}",
        settings.source, settings.total_pages, settings.response_policy
    );
    let fetcher = ContentFetcher::new(transport, renderer, settings.response_policy);
    let viewer = ChapterViewer::new(settings.viewer_config(), fetcher, TerminalView::default())?;

    if args.events_json {
        let mut events = viewer.subscribe_events();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => match serde_json::to_string(&event) {
                        Ok(line) => eprintln!("{line}"),
                        Err(err) => warn!("viewer: failed to encode event: {err}"),
                    },
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("viewer: event stream lagged skipped={skipped}");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });
    }

    let outcome = viewer.initialize().await?;
    draw(&viewer, &outcome).await?;
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(message) => {
                eprintln!("{message}");
                continue;
            }
        };

        let outcome = match command {
            Command::Next => viewer.next().await,
            Command::Previous => viewer.previous().await,
            Command::GoTo(page) => viewer.go_to(page).await,
            Command::Status => {
                let snapshot = viewer.snapshot().await;
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
                continue;
            }
            Command::Help => {
                println!("{HELP}");
                continue;
            }
            Command::Quit => break,
        };
        draw(&viewer, &outcome).await?;
    }

    Ok(())
}

async fn draw(viewer: &ChapterViewer<TerminalView>, outcome: &NavigationOutcome) -> Result<()> {
    let frame = viewer.with_view(|view| view.take_frame()).await;
    let mut stdout = std::io::stdout().lock();
    if let Some(frame) = frame {
        stdout.write_all(frame.as_bytes())?;
    }
    match outcome {
        NavigationOutcome::Failed { page, message } => {
            writeln!(stdout, "could not load page {page}: {message}")?;
        }
        NavigationOutcome::Ignored => {
            writeln!(stdout, "no chapter in that direction")?;
        }
        NavigationOutcome::Loaded { .. }
        | NavigationOutcome::Unavailable { .. }
        | NavigationOutcome::Superseded { .. } => {}
    }
    stdout.flush()?;
    Ok(())
}
