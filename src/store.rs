//! Local persisted store
//!
//! UI preferences, search history, watch progress and favorites. Every
//! mutation is written through to `<data dir>/dracin/rizal-dracin-storage.json`
//! immediately. Only the theme, both histories and the favorites are
//! persisted; the rest lives for the session.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::models::{Drama, Episode, WatchProgress};

pub const SEARCH_HISTORY_LIMIT: usize = 10;
pub const WATCH_HISTORY_LIMIT: usize = 50;

const STORE_FILE: &str = "rizal-dracin-storage.json";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    #[default]
    Dark,
    Light,
}

impl ThemeMode {
    pub fn toggled(self) -> Self {
        match self {
            ThemeMode::Dark => ThemeMode::Light,
            ThemeMode::Light => ThemeMode::Dark,
        }
    }
}

/// The persisted part of the store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersistedState {
    pub theme: ThemeMode,
    pub search_history: Vec<String>,
    pub watch_history: Vec<WatchProgress>,
    pub favorites: Vec<String>,
}

#[derive(Debug, Default)]
pub struct Store {
    path: Option<PathBuf>,
    state: PersistedState,
    search_query: String,
    sidebar_open: bool,
    current_drama: Option<Drama>,
    current_episode: Option<Episode>,
}

impl Store {
    /// Default store location
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|p| p.join("dracin").join(STORE_FILE))
    }

    /// Open the store at `path`; a missing file starts empty
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let state = match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => PersistedState::default(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path: Some(path),
            state,
            ..Self::default()
        })
    }

    /// Open the default store, falling back to an in-memory one when the
    /// file is unreadable
    pub fn open_default() -> Self {
        let Some(path) = Self::default_path() else {
            tracing::warn!("No data directory, store will not persist");
            return Self::in_memory();
        };
        match Self::open(&path) {
            Ok(store) => store,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Could not open store, starting fresh");
                Self {
                    path: Some(path),
                    ..Self::default()
                }
            }
        }
    }

    /// A store that never touches disk
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn persisted(&self) -> &PersistedState {
        &self.state
    }

    fn persist(&self) {
        if let Err(e) = self.save() {
            tracing::warn!(error = %e, "Failed to persist store");
        }
    }

    /// Write the persisted state to disk
    pub fn save(&self) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.state)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Theme
    // -------------------------------------------------------------------------

    pub fn theme(&self) -> ThemeMode {
        self.state.theme
    }

    pub fn set_theme(&mut self, theme: ThemeMode) {
        self.state.theme = theme;
        self.persist();
    }

    // -------------------------------------------------------------------------
    // Search
    // -------------------------------------------------------------------------

    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    pub fn set_search_query(&mut self, query: impl Into<String>) {
        self.search_query = query.into();
    }

    pub fn search_history(&self) -> &[String] {
        &self.state.search_history
    }

    /// Most recent first, trimmed, deduplicated, capped at 10
    pub fn add_to_search_history(&mut self, query: &str) {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return;
        }
        let history = &mut self.state.search_history;
        history.retain(|q| q != trimmed);
        history.insert(0, trimmed.to_string());
        history.truncate(SEARCH_HISTORY_LIMIT);
        self.persist();
    }

    pub fn clear_search_history(&mut self) {
        self.state.search_history.clear();
        self.persist();
    }

    // -------------------------------------------------------------------------
    // Watch History
    // -------------------------------------------------------------------------

    pub fn watch_history(&self) -> &[WatchProgress] {
        &self.state.watch_history
    }

    /// Most recent first; an entry for the same episode is replaced
    pub fn add_watch_progress(&mut self, progress: WatchProgress) {
        let history = &mut self.state.watch_history;
        history.retain(|p| p.episode_id != progress.episode_id);
        history.insert(0, progress);
        history.truncate(WATCH_HISTORY_LIMIT);
        self.persist();
    }

    pub fn watch_progress(&self, episode_id: &str) -> Option<&WatchProgress> {
        self.state
            .watch_history
            .iter()
            .find(|p| p.episode_id == episode_id)
    }

    pub fn clear_watch_history(&mut self) {
        self.state.watch_history.clear();
        self.persist();
    }

    // -------------------------------------------------------------------------
    // Current Drama / Episode
    // -------------------------------------------------------------------------

    pub fn current_drama(&self) -> Option<&Drama> {
        self.current_drama.as_ref()
    }

    pub fn set_current_drama(&mut self, drama: Option<Drama>) {
        self.current_drama = drama;
    }

    pub fn current_episode(&self) -> Option<&Episode> {
        self.current_episode.as_ref()
    }

    pub fn set_current_episode(&mut self, episode: Option<Episode>) {
        self.current_episode = episode;
    }

    // -------------------------------------------------------------------------
    // Favorites
    // -------------------------------------------------------------------------

    pub fn favorites(&self) -> &[String] {
        &self.state.favorites
    }

    /// Add or remove; returns whether the drama is now a favorite
    pub fn toggle_favorite(&mut self, drama_id: &str) -> bool {
        let favorites = &mut self.state.favorites;
        let now_favorite = if favorites.iter().any(|id| id == drama_id) {
            favorites.retain(|id| id != drama_id);
            false
        } else {
            favorites.push(drama_id.to_string());
            true
        };
        self.persist();
        now_favorite
    }

    pub fn is_favorite(&self, drama_id: &str) -> bool {
        self.state.favorites.iter().any(|id| id == drama_id)
    }

    // -------------------------------------------------------------------------
    // Sidebar
    // -------------------------------------------------------------------------

    pub fn is_sidebar_open(&self) -> bool {
        self.sidebar_open
    }

    pub fn toggle_sidebar(&mut self) {
        self.sidebar_open = !self.sidebar_open;
    }

    pub fn set_sidebar_open(&mut self, open: bool) {
        self.sidebar_open = open;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_history_trim_dedupe_order() {
        let mut store = Store::in_memory();
        store.add_to_search_history("  ceo  ");
        store.add_to_search_history("revenge");
        store.add_to_search_history("");
        store.add_to_search_history("   ");
        store.add_to_search_history("ceo");

        assert_eq!(store.search_history(), &["ceo", "revenge"]);
    }

    #[test]
    fn test_search_history_capped() {
        let mut store = Store::in_memory();
        for i in 0..15 {
            store.add_to_search_history(&format!("query {}", i));
        }
        assert_eq!(store.search_history().len(), SEARCH_HISTORY_LIMIT);
        assert_eq!(store.search_history()[0], "query 14");
        assert_eq!(store.search_history()[9], "query 5");
    }

    #[test]
    fn test_watch_progress_replaces_same_episode() {
        let mut store = Store::in_memory();
        store.add_watch_progress(WatchProgress::new("ep1", "d1", 10.0, 100.0));
        store.add_watch_progress(WatchProgress::new("ep2", "d1", 5.0, 100.0));
        store.add_watch_progress(WatchProgress::new("ep1", "d1", 60.0, 100.0));

        assert_eq!(store.watch_history().len(), 2);
        assert_eq!(store.watch_history()[0].episode_id, "ep1");
        assert_eq!(store.watch_progress("ep1").unwrap().percentage, 60);
        assert!(store.watch_progress("ep9").is_none());
    }

    #[test]
    fn test_watch_history_capped() {
        let mut store = Store::in_memory();
        for i in 0..60 {
            store.add_watch_progress(WatchProgress::new(format!("ep{}", i), "d", 1.0, 2.0));
        }
        assert_eq!(store.watch_history().len(), WATCH_HISTORY_LIMIT);
        assert_eq!(store.watch_history()[0].episode_id, "ep59");
    }

    #[test]
    fn test_toggle_favorite_twice_restores() {
        let mut store = Store::in_memory();
        assert!(store.toggle_favorite("d1"));
        assert!(store.is_favorite("d1"));
        assert!(!store.toggle_favorite("d1"));
        assert!(!store.is_favorite("d1"));
        assert!(store.favorites().is_empty());
    }

    #[test]
    fn test_sidebar_and_theme() {
        let mut store = Store::in_memory();
        assert!(!store.is_sidebar_open());
        store.toggle_sidebar();
        assert!(store.is_sidebar_open());
        store.set_sidebar_open(false);
        assert!(!store.is_sidebar_open());

        assert_eq!(store.theme(), ThemeMode::Dark);
        store.set_theme(store.theme().toggled());
        assert_eq!(store.theme(), ThemeMode::Light);
    }
}
