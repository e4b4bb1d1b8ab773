//! dracin - Asian short dramas in your terminal
//!
//! A catalog front end for the Dramabox short-drama API: browse, search
//! and play episodes in an external player, with a small search proxy for
//! browser clients.
//!
//! # Modules
//!
//! - `models` - Catalog view types and formatting helpers
//! - `api` - Dramabox upstream client
//! - `pages` - Page view-models composed from API calls
//! - `stream` - Playback view-model and the mpv/VLC binding
//! - `store` - Persisted preferences, histories and favorites
//! - `search` - Debounced autocomplete
//! - `server` - Search proxy (axum)
//! - `app` / `ui` - TUI state machine and rendering
//! - `cli` / `commands` - Scriptable subcommands

pub mod api;
pub mod app;
pub mod cli;
pub mod commands;
pub mod config;
pub mod models;
pub mod pages;
pub mod search;
pub mod server;
pub mod store;
pub mod stream;
pub mod ui;

// Re-export commonly used types
pub use models::{Drama, Episode, HomeData, Paginated, SearchResult, StreamServer, Subtitle, WatchProgress};

pub use api::{DramaboxClient, DramaboxError};
pub use app::{App, AppState};
pub use config::Config;
pub use store::Store;
