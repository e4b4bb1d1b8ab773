//! dracin - Asian short dramas in your terminal
//!
//! Browse the Dramabox catalog, search, and play episodes in mpv or VLC.
//!
//! # Usage
//!
//! ```bash
//! # Launch interactive TUI
//! dracin
//!
//! # CLI mode (for automation)
//! dracin search "ceo"
//! dracin watch 41000102345 --episode 3
//! dracin serve --port 3000
//! ```

use std::fs::File;
use std::io::{stdout, Stdout};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{Context as _, Result};
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;

use dracin::api::DramaboxClient;
use dracin::app::App;
use dracin::cli::{Cli, Command, ExitCode, Output};
use dracin::commands::{self, Context};
use dracin::config::Config;
use dracin::store::Store;
use dracin::stream::ExternalPlayer;

/// Terminal type alias for convenience
type Tui = Terminal<CrosstermBackend<Stdout>>;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::load(),
    };

    if cli.is_cli_mode() {
        init_logging(cli.verbose, None);
        let exit_code = run_cli(cli, config).await;
        std::process::exit(exit_code.into());
    } else {
        init_logging(cli.verbose, log_file());
        run_tui(config).await
    }
}

// =============================================================================
// Logging
// =============================================================================

/// RUST_LOG wins; otherwise debug with --verbose, warnings only by default.
/// The TUI logs to a file so output does not corrupt the screen.
fn init_logging(verbose: bool, file: Option<File>) {
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if verbose {
            "dracin=debug,tower_http=debug".to_string()
        } else {
            "dracin=warn".to_string()
        }
    });

    let builder = tracing_subscriber::fmt().with_env_filter(env_filter);
    match file {
        Some(file) => builder.with_ansi(false).with_writer(Mutex::new(file)).init(),
        None => builder.with_writer(std::io::stderr).init(),
    }
}

/// `<cache dir>/dracin/dracin.log`
fn log_file() -> Option<File> {
    let dir = dirs::cache_dir()?.join("dracin");
    std::fs::create_dir_all(&dir).ok()?;
    File::options()
        .create(true)
        .append(true)
        .open(dir.join("dracin.log"))
        .ok()
}

// =============================================================================
// CLI Mode
// =============================================================================

/// Run CLI command and return exit code
async fn run_cli(cli: Cli, config: Config) -> ExitCode {
    let output = Output::new(&cli);
    let Some(command) = cli.command else {
        return ExitCode::Success;
    };

    if let Command::Serve(cmd) = command {
        return commands::serve_cmd(cmd, config, &output).await;
    }

    let ctx = Context::new(config);
    match command {
        Command::Search(cmd) => commands::search_cmd(cmd, &ctx, &output).await,
        Command::Suggest(cmd) => commands::suggest_cmd(cmd, &ctx, &output).await,
        Command::Home(cmd) => commands::home_cmd(cmd, &ctx, &output).await,
        Command::Trending(cmd) => commands::trending_cmd(cmd, &ctx, &output).await,
        Command::Latest(cmd) => commands::latest_cmd(cmd, &ctx, &output).await,
        Command::Info(cmd) => commands::info_cmd(cmd, &ctx, &output).await,
        Command::Episodes(cmd) => commands::episodes_cmd(cmd, &ctx, &output).await,
        Command::Genres => commands::genres_cmd(&ctx, &output),
        Command::Genre(cmd) => commands::genre_cmd(cmd, &ctx, &output).await,
        Command::Countries => commands::countries_cmd(&ctx, &output),
        Command::Country(cmd) => commands::country_cmd(cmd, &ctx, &output).await,
        Command::Watch(cmd) => commands::watch_cmd(cmd, &ctx, &output).await,
        Command::History(cmd) => commands::history_cmd(cmd, &output),
        Command::Favorites => commands::favorites_cmd(&ctx, &output).await,
        Command::Favorite(cmd) => commands::favorite_cmd(cmd, &output),
        Command::Serve(_) => ExitCode::Success,
    }
}

// =============================================================================
// TUI Mode
// =============================================================================

fn init_terminal() -> Result<Tui> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Tui) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

async fn run_tui(config: Config) -> Result<()> {
    let client = Arc::new(DramaboxClient::from_config(&config.api));
    let (tx, mut rx) = mpsc::unbounded_channel();
    let backend = ExternalPlayer::new(config.player.player_type());
    let mut app = App::new(&config, Store::open_default(), backend, tx);

    let mut terminal = init_terminal()?;
    let result = run_event_loop(&mut terminal, &mut app, &client, &mut rx).await;

    // Always restore terminal, even on error
    restore_terminal(&mut terminal)?;

    result
}

/// Main event loop: render, handle input, apply finished work
async fn run_event_loop(
    terminal: &mut Tui,
    app: &mut App,
    client: &Arc<DramaboxClient>,
    events: &mut mpsc::UnboundedReceiver<dracin::app::AppEvent>,
) -> Result<()> {
    const TICK_RATE: Duration = Duration::from_millis(100);

    while app.running {
        app.dispatch(client);
        terminal.draw(|frame| dracin::ui::render(frame, app))?;

        if event::poll(TICK_RATE)? {
            if let Event::Key(key) = event::read()? {
                // Only handle key press events (ignore releases on Windows)
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key);
                }
            }
        }

        while let Ok(event) = events.try_recv() {
            app.handle_event(event);
        }
        app.tick(Instant::now());
    }

    Ok(())
}
