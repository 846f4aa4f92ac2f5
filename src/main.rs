use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::info;
use tracing_subscriber::EnvFilter;

use sqlscope::config::{LogSettings, Overrides, Settings, ThemeChoice};
use sqlscope::ui::{self, Theme};
use sqlscope::{events, App, CancelToken, ChannelSource, ConnectionManager, QueryClient, View};

/// Longest wait for input before the loop drains channels again.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// The status bar clock is redrawn at least this often.
const IDLE_REDRAW: Duration = Duration::from_secs(1);

#[derive(Parser, Debug)]
#[command(name = "sqlscope")]
#[command(about = "Terminal visualizer for a distributed SQL query engine")]
struct Args {
    /// Path to a TOML config file (defaults to ./sqlscope.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Backend host
    #[arg(long)]
    host: Option<String>,

    /// Backend port
    #[arg(short, long)]
    port: Option<u16>,

    /// Delay between reconnect attempts in milliseconds
    #[arg(long)]
    reconnect_ms: Option<u64>,

    /// Color theme
    #[arg(long, value_enum)]
    theme: Option<ThemeChoice>,

    /// Write logs to this file (logs are discarded otherwise)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Initial view: architecture, query-flow, performance or demo
    #[arg(long)]
    view: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let overrides = Overrides {
        host: args.host,
        port: args.port,
        reconnect_ms: args.reconnect_ms,
        theme: args.theme,
        log_file: args.log_file,
        view: args.view,
    };
    let settings = Settings::load(args.config.as_deref(), overrides)?;

    init_logging(&settings.log)?;
    info!("Starting sqlscope against {}", settings.backend.authority());

    let rt = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    let _guard = rt.enter();

    let shutdown = CancelToken::new();
    let ws_url = settings.backend.ws_url();
    let (tx, source) = ChannelSource::create(&ws_url);
    let connection =
        ConnectionManager::new(&settings.backend, &settings.channel, tx, shutdown.clone()).spawn();

    let api = Arc::new(QueryClient::new(&settings.backend)?);
    let mut app = App::new(Box::new(source), api, Theme::from_choice(settings.ui.theme));
    if let Some(ref id) = settings.ui.view {
        app.set_view(View::from_id(id));
    }

    let result = run_tui(&mut app, Duration::from_millis(settings.ui.tick_ms.max(1)));

    // Stop the socket task and any background runs
    shutdown.cancel();
    app.quit();
    rt.block_on(async {
        let _ = tokio::time::timeout(Duration::from_secs(1), connection).await;
    });
    info!("sqlscope exited");

    result
}

/// Logs go to the configured file or nowhere, because the TUI owns the
/// terminal.
fn init_logging(log: &LogSettings) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&log.level))
        .context("invalid log level")?;

    match log.file {
        Some(ref path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("cannot open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::sink)
                .init();
        }
    }
    Ok(())
}

/// Run the TUI until the user quits.
fn run_tui(app: &mut App, tick: Duration) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Setup panic hook to restore terminal
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
        original_hook(panic);
    }));

    let result = run_app(&mut terminal, app, tick);

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

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    tick: Duration,
) -> Result<()> {
    let mut last_tick = Instant::now();
    let mut last_draw = Instant::now();

    while app.running {
        if last_draw.elapsed() >= IDLE_REDRAW {
            app.mark_dirty();
        }
        if app.take_dirty() {
            terminal.draw(|frame| ui::draw(frame, app))?;
            last_draw = Instant::now();
        }

        let timeout = tick.saturating_sub(last_tick.elapsed()).min(POLL_INTERVAL);
        if let Some(event) = events::poll_event(timeout)? {
            match event {
                Event::Key(key) => events::handle_key_event(app, key),
                Event::Mouse(mouse) => events::handle_mouse_event(app, mouse, ui::TABS_ROW),
                Event::Resize(_, _) => app.mark_dirty(),
                _ => {}
            }
        }

        if last_tick.elapsed() >= tick {
            app.on_tick();
            last_tick = Instant::now();
        }

        app.drain_updates();
        app.drain_tasks();
    }

    Ok(())
}
