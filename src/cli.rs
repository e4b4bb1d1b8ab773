//! CLI - Command Line Interface for dracin
//!
//! Every screen of the TUI is scriptable. All output is JSON-parseable.
//!
//! # Examples
//!
//! ```bash
//! # Browse
//! dracin home --json
//! dracin trending --limit 5
//! dracin genre romance
//!
//! # Search and watch
//! dracin search "ceo"
//! dracin episodes 41000102345
//! dracin watch 41000102345 --episode 3
//!
//! # Search proxy for browser clients
//! dracin serve --port 3000
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::io::IsTerminal;
use std::path::PathBuf;

use crate::stream::PlayerType;

// =============================================================================
// Exit Codes
// =============================================================================

/// Exit codes for CLI operations (semantic for scripting)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success
    Success = 0,
    /// General error
    Error = 1,
    /// Invalid arguments
    InvalidArgs = 2,
    /// Network error
    NetworkError = 3,
    /// Drama or episode not found
    NotFound = 4,
    /// Episode has no playable stream
    NoStreams = 5,
    /// Player could not be started or failed
    PlayerFailed = 6,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code as i32
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> std::process::ExitCode {
        std::process::ExitCode::from(code as u8)
    }
}

// =============================================================================
// Main CLI Structure
// =============================================================================

/// dracin - Asian short dramas in your terminal
///
/// Run without arguments to launch interactive TUI.
/// Use subcommands for scriptable automation.
#[derive(Parser, Debug)]
#[command(
    name = "dracin",
    version,
    about = "Terminal catalog and player for Asian short dramas",
    long_about = "Browse, search and watch short dramas from the Dramabox catalog.\n\n\
                  Run without arguments to launch the interactive TUI.\n\
                  Use subcommands for automation and scripting.",
    after_help = "EXAMPLES:\n\
                  dracin                              Launch interactive TUI\n\
                  dracin search \"ceo\"                 Search for dramas\n\
                  dracin watch 41000102345 -e 3       Watch episode 3\n\
                  dracin serve --port 3000            Run the search proxy"
)]
pub struct Cli {
    /// Output format as JSON (default for non-TTY)
    #[arg(long, short = 'j', global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Debug logging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Path to config file
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to run (omit for TUI mode)
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// Check if running in CLI mode (has subcommand)
    pub fn is_cli_mode(&self) -> bool {
        self.command.is_some()
    }

    /// Check if JSON output should be used
    pub fn should_json(&self) -> bool {
        self.json || !std::io::stdout().is_terminal()
    }
}

// =============================================================================
// Subcommands
// =============================================================================

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Search dramas by title
    #[command(visible_alias = "s")]
    Search(SearchCmd),

    /// Autocomplete suggestions for a partial query
    Suggest(SuggestCmd),

    /// Home sections: banners, trending, latest, rankings
    Home(HomeCmd),

    /// Trending dramas
    #[command(visible_alias = "tr")]
    Trending(ListCmd),

    /// Recently updated dramas
    Latest(ListCmd),

    /// Drama details with episodes and related dramas
    #[command(visible_alias = "i")]
    Info(InfoCmd),

    /// Episode list with stream servers
    #[command(visible_alias = "ep")]
    Episodes(EpisodesCmd),

    /// List genres
    Genres,

    /// Dramas in a genre
    Genre(GenreCmd),

    /// List countries
    Countries,

    /// Dramas from a country
    Country(CountryCmd),

    /// Play an episode in mpv or VLC
    #[command(visible_alias = "w")]
    Watch(WatchCmd),

    /// Watch and search history
    History(HistoryCmd),

    /// List favorite dramas
    Favorites,

    /// Toggle a drama as favorite
    #[command(visible_alias = "fav")]
    Favorite(FavoriteCmd),

    /// Run the search proxy server
    Serve(ServeCmd),
}

// =============================================================================
// Catalog Commands
// =============================================================================

/// Search dramas by query
#[derive(Args, Debug)]
pub struct SearchCmd {
    /// Search query (title, keywords)
    #[arg(required = true)]
    pub query: String,

    /// Maximum number of results
    #[arg(long, short = 'l', default_value = "20")]
    pub limit: usize,
}

/// Suggestions as the search box would show them
#[derive(Args, Debug)]
pub struct SuggestCmd {
    #[arg(required = true)]
    pub query: String,
}

/// Home screen sections
#[derive(Args, Debug)]
pub struct HomeCmd {
    /// Only print one section
    #[arg(long, short = 's', value_enum)]
    pub section: Option<HomeSection>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HomeSection {
    Banners,
    Trending,
    Latest,
    TopToday,
    TopWeek,
    Genres,
}

/// Trending or latest listing
#[derive(Args, Debug)]
pub struct ListCmd {
    /// Maximum number of results
    #[arg(long, short = 'l', default_value = "20")]
    pub limit: usize,

    #[arg(long, short = 'p', default_value = "1")]
    pub page: u32,
}

/// Drama detail by id
#[derive(Args, Debug)]
pub struct InfoCmd {
    /// Drama id (bookId)
    #[arg(required = true)]
    pub id: String,
}

#[derive(Args, Debug)]
pub struct EpisodesCmd {
    /// Drama id (bookId)
    #[arg(required = true)]
    pub id: String,

    /// Include every stream server per episode
    #[arg(long)]
    pub servers: bool,
}

#[derive(Args, Debug)]
pub struct GenreCmd {
    /// Genre slug (e.g. romance)
    #[arg(required = true)]
    pub slug: String,

    #[arg(long, short = 'p', default_value = "1")]
    pub page: u32,
}

#[derive(Args, Debug)]
pub struct CountryCmd {
    /// Country code (e.g. cn)
    #[arg(required = true)]
    pub code: String,

    #[arg(long, short = 'p', default_value = "1")]
    pub page: u32,
}

// =============================================================================
// Watch Command
// =============================================================================

/// Play an episode locally
#[derive(Args, Debug)]
pub struct WatchCmd {
    /// Drama id (bookId)
    #[arg(required = true)]
    pub drama_id: String,

    /// Episode number (defaults to the first episode)
    #[arg(long, short = 'e')]
    pub episode: Option<u32>,

    /// Server index from `episodes --servers` (defaults to the first)
    #[arg(long, short = 's')]
    pub server: Option<usize>,

    /// Player to use (overrides config)
    #[arg(long, short = 'P', value_enum)]
    pub player: Option<PlayerChoice>,

    /// Start position in seconds, MM:SS or HH:MM:SS
    #[arg(long)]
    pub start: Option<String>,

    /// Print the stream URL instead of playing it
    #[arg(long)]
    pub url_only: bool,
}

impl WatchCmd {
    /// Parse `--start`, if given
    pub fn start_secs(&self) -> Option<Result<u64, String>> {
        self.start
            .as_deref()
            .map(|s| parse_timestamp(s).ok_or_else(|| format!("Invalid start position: {}", s)))
    }
}

/// Local player selection
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayerChoice {
    /// mpv media player (default)
    #[default]
    Mpv,
    /// VLC media player
    Vlc,
}

impl From<PlayerChoice> for PlayerType {
    fn from(choice: PlayerChoice) -> Self {
        match choice {
            PlayerChoice::Mpv => PlayerType::Mpv,
            PlayerChoice::Vlc => PlayerType::Vlc,
        }
    }
}

/// Parse seconds, MM:SS or HH:MM:SS
pub fn parse_timestamp(s: &str) -> Option<u64> {
    let s = s.trim();
    let parts: Vec<&str> = s.split(':').collect();
    match parts.len() {
        1 => parts[0].parse().ok(),
        2 => {
            let mins: u64 = parts[0].parse().ok()?;
            let secs: u64 = parts[1].parse().ok()?;
            Some(mins * 60 + secs)
        }
        3 => {
            let hours: u64 = parts[0].parse().ok()?;
            let mins: u64 = parts[1].parse().ok()?;
            let secs: u64 = parts[2].parse().ok()?;
            Some(hours * 3600 + mins * 60 + secs)
        }
        _ => None,
    }
}

// =============================================================================
// Store Commands
// =============================================================================

#[derive(Args, Debug)]
pub struct HistoryCmd {
    /// Show search history instead of watch history
    #[arg(long)]
    pub searches: bool,

    /// Clear the selected history
    #[arg(long)]
    pub clear: bool,
}

#[derive(Args, Debug)]
pub struct FavoriteCmd {
    /// Drama id (bookId)
    #[arg(required = true)]
    pub id: String,
}

// =============================================================================
// Serve Command
// =============================================================================

#[derive(Args, Debug)]
pub struct ServeCmd {
    /// Listen address (overrides config)
    #[arg(long)]
    pub host: Option<String>,

    /// Listen port (overrides config)
    #[arg(long, short = 'p')]
    pub port: Option<u16>,
}

// =============================================================================
// JSON Output Types
// =============================================================================

/// Generic JSON output wrapper with status
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonOutput<T: Serialize> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "is_zero")]
    pub exit_code: i32,
}

fn is_zero(n: &i32) -> bool {
    *n == 0
}

impl<T: Serialize> JsonOutput<T> {
    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
            exit_code: 0,
        }
    }

    pub fn error_msg(msg: impl Into<String>, code: ExitCode) -> JsonOutput<()> {
        JsonOutput::<()> {
            data: None,
            error: Some(msg.into()),
            exit_code: code.into(),
        }
    }
}

/// Favorite toggle response
#[derive(Debug, Serialize, Deserialize)]
pub struct FavoriteResponse {
    pub id: String,
    pub favorite: bool,
}

/// Result of a watch session
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchResponse {
    pub drama_id: String,
    pub episode_id: String,
    pub episode: u32,
    pub server: Option<String>,
    pub stream_url: String,
    pub position: f64,
    pub duration: f64,
    pub percentage: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// =============================================================================
// Output Helpers
// =============================================================================

/// Output handler for consistent formatting
pub struct Output {
    pub json: bool,
    pub quiet: bool,
}

impl Output {
    pub fn new(cli: &Cli) -> Self {
        Self {
            json: cli.should_json(),
            quiet: cli.quiet,
        }
    }

    /// Print success data (JSON envelope, or pretty JSON for humans)
    pub fn print<T: Serialize>(&self, data: T) -> anyhow::Result<()> {
        if self.json {
            let output = JsonOutput::success(data);
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("{}", serde_json::to_string_pretty(&data)?);
        }
        Ok(())
    }

    /// Print plain lines for humans, the data envelope for machines
    pub fn print_lines<T: Serialize>(&self, data: T, lines: &[String]) -> anyhow::Result<()> {
        if self.json {
            self.print(data)
        } else {
            for line in lines {
                println!("{}", line);
            }
            Ok(())
        }
    }

    /// Print error and return exit code
    pub fn error(&self, msg: impl Into<String>, code: ExitCode) -> ExitCode {
        let msg = msg.into();
        if self.json {
            let output = JsonOutput::<()>::error_msg(&msg, code);
            if let Ok(json) = serde_json::to_string_pretty(&output) {
                eprintln!("{}", json);
            }
        } else if !self.quiet {
            eprintln!("Error: {}", msg);
        }
        code
    }

    /// Print info message (suppressed in quiet mode)
    pub fn info(&self, msg: impl std::fmt::Display) {
        if !self.quiet && !self.json {
            eprintln!("{}", msg);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
