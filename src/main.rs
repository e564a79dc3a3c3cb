// src/main.rs

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    terminal::{
        disable_raw_mode, enable_raw_mode, Clear, ClearType, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
    ExecutableCommand,
};
use ratatui::prelude::*;
use std::io::{stderr, stdout};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;

use subtocheck_rs::config::ScanConfig;
use subtocheck_rs::core::models::{Protocol, ScanEvent};
use subtocheck_rs::core::scanner::run_full_scan;
use subtocheck_rs::core::scanner::scheduler::ScanControl;
use subtocheck_rs::core::targets::load_domains;
use subtocheck_rs::{logging, report};

mod app;
mod ui;

use app::{App, AppState};

/// Scan a list of domains for dangling DNS records open to subdomain takeover.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Domain list file path, one domain per line.
    #[arg(default_value = "domains.txt")]
    domain_list: PathBuf,

    /// YAML configuration file. Defaults to config.yaml in the user config directory.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of concurrent workers.
    #[arg(long)]
    concurrency: Option<usize>,

    /// Protocols to probe, comma separated (http,https).
    #[arg(long, value_delimiter = ',')]
    protocols: Option<Vec<Protocol>>,

    /// Enable debug logging.
    #[arg(long)]
    debug: bool,

    /// Print the report to stdout instead of starting the terminal UI.
    #[arg(long)]
    plain: bool,
}

impl Cli {
    /// The configuration file with command line overrides applied.
    fn scan_config(&self) -> Result<ScanConfig> {
        let mut config =
            ScanConfig::load(self.config.as_deref()).wrap_err("failed to load configuration")?;
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if let Some(protocols) = &self.protocols {
            config.protocols = protocols.clone();
        }
        config.validate().wrap_err("invalid command line options")?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    let log_path = logging::initialize_logging(cli.debug)?;
    tracing::info!(log = %log_path.display(), "Starting up.");

    let config = cli.scan_config()?;
    if let Some(email) = &config.email {
        tracing::warn!(provider = %email.provider, "Email notifications are not supported, ignoring the email block.");
    }
    if cli.plain {
        run_plain(&cli.domain_list, config).await
    } else {
        run_tui(&cli.domain_list, config).await
    }
}

/// Headless mode: progress on stderr, grouped report on stdout.
async fn run_plain(domain_list: &Path, config: ScanConfig) -> Result<()> {
    let domains = load_domains(domain_list)?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let progress = tokio::spawn(async move {
        let mut err = stderr();
        while let Some(ScanEvent::DomainFinished { index, total, domain, .. }) = rx.recv().await {
            let _ = err.execute(Clear(ClearType::CurrentLine));
            eprint!("\rProcessing... {}/{} {}", index, total, domain);
        }
        let _ = err.execute(Clear(ClearType::CurrentLine));
        eprint!("\r");
    });

    let report = run_full_scan(domains, &config, ScanControl::default().with_events(tx))
        .await
        .wrap_err("failed to start scan")?;
    let _ = progress.await;

    print!("{}", report::render_plain(&report));
    Ok(())
}

async fn run_tui(domain_list: &Path, config: ScanConfig) -> Result<()> {
    // --- Setup ---
    stdout().execute(EnterAlternateScreen)?;
    stdout().execute(EnableMouseCapture)?;
    enable_raw_mode()?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    terminal.clear()?;

    let mut app = App::new(domain_list.display().to_string(), config);

    while !app.should_quit {
        terminal.draw(|frame| ui::render(&mut app, frame))?;

        if event::poll(Duration::from_millis(100))? {
            handle_events(&mut app)?;
        }

        app.poll_scan();
        app.on_tick();
    }

    // --- Restore Terminal ---
    stdout().execute(LeaveAlternateScreen)?;
    stdout().execute(DisableMouseCapture)?;
    disable_raw_mode()?;
    Ok(())
}

/// Single key dispatcher, routed by what is on screen.
fn handle_events(app: &mut App) -> std::io::Result<()> {
    if let Event::Key(key) = event::read()? {
        if key.kind == KeyEventKind::Press {
            if app.show_disclaimer {
                handle_disclaimer_input(app, key.code);
                return Ok(());
            }
            match app.state {
                AppState::Idle => handle_idle_input(app, key.code),
                AppState::Finished => handle_finished_input(app, key.code),
                AppState::Scanning => handle_scanning_input(app, key.code),
            }
        }
    }
    Ok(())
}

fn handle_disclaimer_input(app: &mut App, key_code: KeyCode) {
    match key_code {
        KeyCode::Enter => app.show_disclaimer = false,
        KeyCode::Esc | KeyCode::Char('q') => app.quit(),
        _ => {}
    }
}

/// The input box takes every printable key, so quitting uses Esc here.
fn handle_idle_input(app: &mut App, key_code: KeyCode) {
    match key_code {
        KeyCode::Esc => app.quit(),
        KeyCode::Char(c) => {
            app.input.push(c);
            app.error = None;
        }
        KeyCode::Backspace => {
            app.input.pop();
            app.error = None;
        }
        KeyCode::Enter => app.start_scan(),
        _ => {}
    }
}

fn handle_scanning_input(app: &mut App, key_code: KeyCode) {
    match key_code {
        KeyCode::Char('q') | KeyCode::Esc => app.quit(),
        KeyCode::Left => app.scroll_left(),
        KeyCode::Right => app.scroll_right(),
        _ => {}
    }
}

fn handle_finished_input(app: &mut App, key_code: KeyCode) {
    match key_code {
        KeyCode::Char('q') | KeyCode::Esc => app.quit(),
        KeyCode::Char('n') => app.reset(),
        KeyCode::Char('e') => app.export(),
        KeyCode::Up => app.select_previous(),
        KeyCode::Down => app.select_next(),
        KeyCode::Left => app.scroll_left(),
        KeyCode::Right => app.scroll_right(),
        _ => {}
    }
}
