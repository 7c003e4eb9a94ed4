use std::fs::OpenOptions;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use goalscope_service::HttpService;
use goalscope_tui::app::App;
use goalscope_tui::config::Config;
use ratatui::prelude::*;
use tracing::info;

fn main() -> Result<()> {
    let config = Config::parse();

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_file)
        .with_context(|| format!("failed to open log file {}", config.log_file.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("goalscope=info")),
        )
        .with_ansi(false)
        .with_writer(Mutex::new(log_file))
        .init();

    info!("goalscope starting");
    info!("server: {}", config.server_url);

    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    let service = Arc::new(HttpService::with_tokens(
        &config.server_url,
        config.token_source()?,
    ));
    let app = App::new(service.clone(), service, runtime.handle().clone());

    run_tui(app, &config)
}

fn run_tui(app: App, config: &Config) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, app, config);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(ref e) = result {
        eprintln!("Error: {e}");
    }

    result
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    mut app: App,
    config: &Config,
) -> Result<()> {
    let tick = config.tick();

    loop {
        app.on_tick(Instant::now());
        terminal.draw(|frame| app.render(frame))?;

        if !event::poll(tick)? {
            continue;
        }
        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            // Ctrl+C always quits
            if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                break;
            }
            // q quits unless we're in an input mode
            if key.code == KeyCode::Char('q') && !app.is_input_mode() {
                break;
            }
            app.handle_key(key);
        }
    }

    info!("goalscope exiting");
    Ok(())
}
