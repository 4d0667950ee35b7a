use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::Parser;
use crossterm::{
    event::Event,
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Style},
    widgets::Paragraph,
    Terminal,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use countwatch::app::write_snapshot;
use countwatch::{
    events, ui, App, ChannelSource, DashboardConfig, DashboardSnapshot, DataSource, FileSource,
};

/// Filter used when `RUST_LOG` is not set.
const DEFAULT_LOG_FILTER: &str = "countwatch=info";

/// How often the TUI checks an engine for new snapshots.
const ENGINE_REFRESH: Duration = Duration::from_millis(100);

#[derive(Parser, Debug)]
#[command(name = "countwatch")]
#[command(about = "Live-count dashboard kept in sync by polling and a push channel")]
struct Args {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Base URL of the count API (overrides config)
    #[arg(short, long)]
    url: Option<String>,

    /// WebSocket URL of the live-count channel (overrides config)
    #[arg(long)]
    push_url: Option<String>,

    /// Bearer token sent with every request (overrides config)
    #[arg(long)]
    token: Option<String>,

    /// Poll interval (e.g., "5s", "500ms")
    #[arg(long)]
    poll_interval: Option<String>,

    /// Replay an exported snapshot instead of connecting to a server
    #[arg(short, long, conflicts_with_all = ["url", "push_url", "token", "export"])]
    file: Option<PathBuf>,

    /// Refresh interval in seconds (only used with --file)
    #[arg(short, long, default_value = "1")]
    refresh: u64,

    /// Wait for the first data, write it to a JSON file and exit
    #[arg(short, long)]
    export: Option<PathBuf>,

    /// Write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Handle file replay mode (no server)
    if let Some(ref path) = args.file {
        init_tracing(args.log_file.as_deref(), false)?;
        let source = Box::new(FileSource::new(path));
        return run_tui(source, Duration::from_secs(args.refresh.max(1)));
    }

    let config = load_config(&args)?;

    // Handle export mode (non-interactive)
    if let Some(ref export_path) = args.export {
        init_tracing(args.log_file.as_deref(), true)?;
        return export_to_file(&config, export_path);
    }

    init_tracing(args.log_file.as_deref(), false)?;
    run_with_engine(&config)
}

/// Layer CLI flags over file and environment configuration.
fn load_config(args: &Args) -> Result<DashboardConfig> {
    let mut config = DashboardConfig::load(args.config.as_deref())?;
    if let Some(ref url) = args.url {
        config.base_url = url.clone();
    }
    if let Some(ref push_url) = args.push_url {
        config.push_url = push_url.clone();
    }
    if let Some(ref token) = args.token {
        config.token = Some(token.clone());
    }
    if let Some(ref interval) = args.poll_interval {
        config.poll_interval = interval.clone();
    }
    config.validate()?;
    Ok(config)
}

/// Install the tracing subscriber.
///
/// The TUI owns the terminal, so interactive modes only log when a file is
/// given.
fn init_tracing(log_file: Option<&Path>, to_stderr: bool) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    if let Some(path) = log_file {
        let file = File::create(path)
            .with_context(|| format!("Failed to create log file {}", path.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    } else if to_stderr {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init();
    }
    Ok(())
}

/// Run the dashboard against a live server.
fn run_with_engine(config: &DashboardConfig) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;

    let engine = {
        let _guard = rt.enter();
        config.start_engine()?
    };
    let source = Box::new(ChannelSource::from_engine(&engine));

    let result = run_tui(source, ENGINE_REFRESH);

    rt.block_on(engine.stop());
    result
}

/// Start an engine, wait for the first data, and write it out.
fn export_to_file(config: &DashboardConfig, export_path: &Path) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    let snapshot = rt.block_on(capture_first_snapshot(config))?;

    write_snapshot(&snapshot, export_path)?;
    info!(path = %export_path.display(), count = snapshot.current_count, "Exported snapshot");
    println!("Exported dashboard state to: {}", export_path.display());
    Ok(())
}

async fn capture_first_snapshot(config: &DashboardConfig) -> Result<DashboardSnapshot> {
    let wait = config.request_timeout()?;
    let engine = config.start_engine()?;
    let mut snapshots = engine.subscribe();

    let first = tokio::time::timeout(wait, async {
        snapshots
            .wait_for(|s| s.has_data())
            .await
            .map(|s| s.clone())
    })
    .await;

    engine.stop().await;

    match first {
        Ok(Ok(snapshot)) => Ok(snapshot),
        Ok(Err(_)) => bail!("Engine stopped before any data arrived"),
        Err(_) => bail!("No data received within {:?}", wait),
    }
}

/// Run the TUI with the given data source
fn run_tui(source: Box<dyn DataSource>, refresh_interval: Duration) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Setup panic hook to restore terminal
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic);
    }));

    // Create app and load initial data
    let mut app = App::new(source);
    app.reload_data();

    // Run the main loop
    let result = run_app(&mut terminal, &mut app, refresh_interval);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(ref e) = result {
        warn!(error = %e, "Dashboard exited with an error");
    }
    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    refresh_interval: Duration,
) -> Result<()> {
    let mut last_refresh = Instant::now();

    // Minimum terminal size for usable display
    const MIN_WIDTH: u16 = 60;
    const MIN_HEIGHT: u16 = 14;

    while app.running {
        terminal.draw(|frame| {
            let area = frame.area();

            if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
                let msg = format!(
                    "Terminal too small: {}x{}\nMinimum: {}x{}\n\nResize to continue",
                    area.width, area.height, MIN_WIDTH, MIN_HEIGHT
                );
                let paragraph = Paragraph::new(msg)
                    .alignment(Alignment::Center)
                    .style(Style::default().fg(Color::Yellow));
                let centered = Rect::new(
                    0,
                    (area.height / 2).saturating_sub(2),
                    area.width,
                    5.min(area.height),
                );
                frame.render_widget(paragraph, centered);
                return;
            }

            let chunks = Layout::vertical([
                Constraint::Length(1), // Header bar
                Constraint::Min(10),   // Cards and chart
                Constraint::Length(1), // Status bar
            ])
            .split(area);

            ui::common::render_header(frame, app, chunks[0]);
            ui::dashboard::render(frame, app, chunks[1]);
            ui::common::render_status_bar(frame, app, chunks[2]);

            if app.show_help {
                ui::common::render_help(frame, app, area);
            }
        })?;

        if let Some(Event::Key(key)) = events::poll_event(Duration::from_millis(100))? {
            events::handle_key_event(app, key);
        }

        if last_refresh.elapsed() >= refresh_interval {
            app.reload_data();
            last_refresh = Instant::now();
        }
    }

    Ok(())
}
