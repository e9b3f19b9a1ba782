//! crewdeck-tui: watch a coding assistant work while an LLM supervisor
//! comments on its output.
//!
//! The coder's output streams into the left pane and into a line buffer.
//! The supervisor drains that buffer ten lines at a time and its commentary
//! shows up in the right pane.
//!
//! Logs go to `~/.cache/crewdeck/tui.log` since the terminal belongs to the UI.

mod app;
mod buffer;
mod coder;
mod config;
mod supervisor;
mod ui;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{Event, EventStream};
use futures::StreamExt;
use ratatui::DefaultTerminal;
use tokio::sync::mpsc;

use app::{App, DashEvent};
use buffer::LineBuffer;
use coder::CoderCommand;
use crewdeck_bots::llm::LlmClient;

const USAGE: &str = "Usage: crewdeck-tui <task>";
/// Redraw interval when nothing else happens.
const TICK: Duration = Duration::from_millis(250);
/// Events applied between two redraws; the rest wait for the next frame.
const MAX_EVENTS_PER_FRAME: usize = 1024;

#[derive(Parser, Debug)]
#[command(name = "crewdeck-tui", about = "Coding assistant dashboard with a live LLM supervisor")]
struct Cli {
    /// What the coding assistant should do
    task: Option<String>,

    /// Claude model for the supervisor
    #[arg(long)]
    model: Option<String>,

    /// Anthropic API key (or set ANTHROPIC_API_KEY env var)
    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Coding assistant program to launch
    #[arg(long)]
    coder: Option<String>,

    /// Lines buffered for the supervisor before the oldest are dropped
    #[arg(long)]
    buffer_capacity: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let Some(task) = cli.task.clone().filter(|t| !t.trim().is_empty()) else {
        eprintln!("{USAGE}");
        std::process::exit(1);
    };

    dotenv::dotenv().ok();
    let resolved = config::Resolved::merge(&cli, &config::Config::load());
    let api_key = cli
        .api_key
        .clone()
        .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok())
        .filter(|k| !k.is_empty())
        .context("ANTHROPIC_API_KEY is not set (use --api-key or the environment)")?;

    init_logging()?;

    let command = CoderCommand::new(
        &resolved.coder,
        &resolved.coder_args,
        &resolved.message_flag,
        &task,
        &resolved.focus_hint,
    );
    let buffer = Arc::new(LineBuffer::new(resolved.buffer_capacity));
    let (tx, mut rx) = mpsc::channel::<DashEvent>(1024);

    let coder_task = coder::spawn(&command, buffer.clone(), tx.clone())?;

    let llm = Arc::new(LlmClient::new(api_key).with_model(&resolved.model));
    tracing::info!(model = %llm.model(), capacity = buffer.capacity(), "Supervisor starting");
    let supervisor_task = {
        let buffer = buffer.clone();
        let task = task.clone();
        tokio::spawn(async move {
            supervisor::run(&*llm, &task, &buffer, &tx, supervisor::PAUSE).await;
        })
    };

    let mut app = App::new(&task, &command.display());
    let mut terminal = ratatui::init();
    let result = run_loop(&mut terminal, &mut app, &mut rx, &buffer).await;
    ratatui::restore();

    coder_task.abort();
    supervisor_task.abort();
    tracing::info!("Dashboard closed");
    result
}

async fn run_loop(
    terminal: &mut DefaultTerminal,
    app: &mut App,
    events: &mut mpsc::Receiver<DashEvent>,
    buffer: &LineBuffer,
) -> Result<()> {
    let mut keys = EventStream::new();
    let mut tick = tokio::time::interval(TICK);

    loop {
        app.dropped = buffer.dropped();
        app.backlog = buffer.len();
        terminal.draw(|frame| ui::draw(frame, app))?;

        tokio::select! {
            _ = tick.tick() => {}
            Some(event) = events.recv() => {
                app.handle(event);
                apply_pending(app, events);
            }
            key = keys.next() => match key {
                Some(Ok(Event::Key(key))) => app.handle_key(key),
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e).context("Terminal input failed"),
                None => return Ok(()),
            },
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

/// Apply queued events without waiting, so a burst costs one redraw.
fn apply_pending(app: &mut App, events: &mut mpsc::Receiver<DashEvent>) -> usize {
    let mut applied = 0;
    while applied < MAX_EVENTS_PER_FRAME {
        match events.try_recv() {
            Ok(event) => {
                app.handle(event);
                applied += 1;
            }
            Err(_) => break,
        }
    }
    applied
}

fn init_logging() -> Result<()> {
    let path = config::log_path();
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "crewdeck_tui=info,crewdeck_bots=info".into()),
        )
        .with_ansi(false)
        .with_writer(std::sync::Mutex::new(file))
        .init();
    Ok(())
}
