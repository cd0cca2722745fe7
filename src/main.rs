mod api;
mod app;
mod config;
mod queue;
mod theme;
mod ui;
mod users;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api::LandQueueClient;
use app::{App, Popup};
use config::AppConfig;
use queue::format;
use queue::item::{ActionOutcome, QueueAction};
use queue::LandState;

#[derive(Parser, Debug)]
#[command(name = "landq")]
#[command(author = "Sean Fournier")]
#[command(version = "0.1.0")]
#[command(about = "A terminal dashboard for pull-request land queues")]
struct Args {
    /// Queue backend URL (overrides config)
    #[arg(long)]
    server: Option<String>,

    /// Repository base URL for PR and pipeline links (overrides config)
    #[arg(long)]
    bitbucket: Option<String>,

    /// Print the current queue as JSON
    #[arg(short, long)]
    status: bool,

    /// Print the status history of a request
    #[arg(long, value_name = "REQUEST_ID")]
    history: Option<String>,

    /// Remove a queued request
    #[arg(long, value_name = "REQUEST_ID")]
    remove: Option<String>,

    /// Cancel a running request
    #[arg(long, value_name = "REQUEST_ID")]
    cancel: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let interactive = !args.status
        && args.history.is_none()
        && args.remove.is_none()
        && args.cancel.is_none();

    init_logging(interactive)?;

    let config = AppConfig::load()
        .unwrap_or_default()
        .with_overrides(args.server, args.bitbucket);
    let client = LandQueueClient::new(&config.server_url, config.request_timeout_secs)?;

    // Handle CLI-only commands
    if args.status {
        return print_status(&client, &config.bitbucket_base_url).await;
    }

    if let Some(request_id) = args.history {
        return print_history(&client, &request_id).await;
    }

    if let Some(request_id) = args.remove {
        return run_action(&client, &config, QueueAction::Remove, &request_id).await;
    }

    if let Some(request_id) = args.cancel {
        return run_action(&client, &config, QueueAction::Cancel, &request_id).await;
    }

    run_tui(config, client).await
}

/// The dashboard owns the terminal, so its logs go to a file instead
fn init_logging(to_file: bool) -> Result<()> {
    let registry =
        tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::from_default_env());

    if to_file {
        let log_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?
            .join("landq");
        std::fs::create_dir_all(&log_dir).context("Could not create log directory")?;
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_dir.join("landq.log"))
            .context("Could not open log file")?;

        registry
            .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
            .init();
    }
    Ok(())
}

async fn print_status(client: &LandQueueClient, bitbucket_base_url: &str) -> Result<()> {
    let queue = client.current_queue().await?;

    let entries: Vec<serde_json::Value> = queue
        .iter()
        .map(|status| {
            serde_json::json!({
                "requestId": status.request_id,
                "pullRequestId": status.request.pull_request_id,
                "title": status.request.pull_request.title,
                "url": format::pr_url(bitbucket_base_url, status.request.pull_request_id),
                "state": status.state,
                "label": format::label(status.state),
                "since": status.date,
                "targetBranch": status.request.pull_request.target_branch,
                "dependsOn": format::resolve_dependencies(
                    status.request.depends_on.as_deref(),
                    Some(queue.as_slice()),
                ),
            })
        })
        .collect();

    let output = serde_json::json!({
        "running": queue.iter().filter(|s| s.state == LandState::Running).count(),
        "queued": queue.iter().filter(|s| s.state == LandState::Queued).count(),
        "queue": entries,
    });

    println!("{}", serde_json::to_string(&output)?);
    Ok(())
}

async fn print_history(client: &LandQueueClient, request_id: &str) -> Result<()> {
    let info = client
        .land_request(request_id)
        .await
        .with_context(|| format!("Could not load request {}", request_id))?;

    let Some(first) = info.statuses.first() else {
        println!("No history for request {}", request_id);
        return Ok(());
    };
    println!(
        "[PR #{}] {}",
        first.request.pull_request_id, first.request.pull_request.title
    );

    for (index, status) in info.statuses.iter().enumerate() {
        let gap = match index {
            0 => String::new(),
            _ => format!(" (+{})", format::duration_between(&info.statuses[index - 1], status)),
        };
        let marker = if status.is_latest { "*" } else { " " };
        println!(
            "{} {}  {}{}",
            marker,
            status.date.format("%Y-%m-%d %H:%M:%S"),
            format::label(status.state),
            gap
        );
        if let Some(reason) = &status.reason {
            println!("      {}", reason);
        }
    }
    Ok(())
}

async fn run_action(
    client: &LandQueueClient,
    config: &AppConfig,
    action: QueueAction,
    request_id: &str,
) -> Result<()> {
    let response = client.perform(action, request_id).await?;

    match response.outcome() {
        ActionOutcome::Alert(error) => {
            tracing::error!("{} {} refused: {}", action.label(), request_id, error);
            anyhow::bail!("{}", error)
        }
        ActionOutcome::Reload => {
            let message = match action {
                QueueAction::Remove => format!("Removed request {} from the queue", request_id),
                QueueAction::Cancel => format!("Cancelled request {}", request_id),
            };
            println!("{}", message);
            if config.notifications {
                announce(&message, notify);
            }
            Ok(())
        }
    }
}

async fn run_tui(config: AppConfig, client: LandQueueClient) -> Result<()> {
    ui::init_theme(&config.theme);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Create app state
    let mut app = App::new(config, client);
    app.refresh(false);

    // Main loop
    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        if event::poll(std::time::Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') if app.popup == Popup::None => return Ok(()),
                        KeyCode::Char('c')
                            if key.modifiers.contains(event::KeyModifiers::CONTROL) =>
                        {
                            return Ok(())
                        }
                        _ => {
                            if let Err(e) = app.handle_key(key) {
                                tracing::warn!("Key handling failed: {}", e);
                            }
                        }
                    }
                }
            }
        }

        // Apply finished requests, periodic refresh
        app.tick().await?;
    }
}

/// The action already went through; a missing notification daemon is not a failure
fn announce(message: &str, notifier: impl FnOnce(&str, &str) -> Result<()>) {
    if let Err(e) = notifier("landq", message) {
        tracing::warn!("Could not show notification: {}", e);
    }
}

fn notify(summary: &str, body: &str) -> Result<()> {
    notify_rust::Notification::new()
        .summary(summary)
        .body(body)
        .icon("vcs-merge-request")
        .show()?;
    Ok(())
}
