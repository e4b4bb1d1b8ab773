//! Configuration management for dracin
//!
//! Handles config file loading/saving and environment overrides.
//! Config is stored at ~/.config/dracin/config.toml

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::stream::PlayerType;

/// Default upstream API base URL
pub const DEFAULT_API_BASE_URL: &str = "https://dramabox.sansekai.my.id";

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub site: SiteConfig,
    pub player: PlayerConfig,
    pub search: SearchConfig,
    pub server: ServerConfig,
}

/// Upstream API settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    /// Request timeout in milliseconds
    pub timeout_ms: u64,
    /// Seconds a cached upstream response stays fresh
    pub revalidate_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout_ms: 10_000,
            revalidate_secs: 60,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn revalidate(&self) -> Duration {
        Duration::from_secs(self.revalidate_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub name: String,
    pub description: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: "Rizal Dracin".to_string(),
            description: "Streaming Drama Asia Terlengkap".to_string(),
        }
    }
}

/// Playback defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Initial volume, 0.0 - 1.0
    pub default_volume: f32,
    pub skip_intro_secs: f64,
    pub skip_outro_secs: f64,
    /// Seconds before the next episode starts automatically
    pub auto_next_delay_secs: u64,
    /// "mpv" or "vlc"
    pub preferred: String,
    /// Fatal errors the player may retry before giving up on a source
    pub max_recoveries: u32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            default_volume: 1.0,
            skip_intro_secs: 85.0,
            skip_outro_secs: 90.0,
            auto_next_delay_secs: 5,
            preferred: "mpv".to_string(),
            max_recoveries: 3,
        }
    }
}

impl PlayerConfig {
    pub fn player_type(&self) -> PlayerType {
        PlayerType::from_name(&self.preferred).unwrap_or_default()
    }
}

/// Autocomplete settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub debounce_ms: u64,
    pub min_chars: usize,
    pub suggestion_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 300,
            min_chars: 2,
            suggestion_limit: 5,
        }
    }
}

/// Search proxy listen address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

impl Config {
    /// Get config file path (~/.config/dracin/config.toml)
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("dracin").join("config.toml"))
    }

    /// Load config from the default path with env overrides applied,
    /// or defaults if the file is missing or unreadable
    pub fn load() -> Self {
        let mut config = Self::path()
            .and_then(|p| Self::read(&p))
            .unwrap_or_default();
        config.apply_env();
        config
    }

    /// Load config from an explicit path (the `--config` flag)
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;
        config.apply_env();
        Ok(config)
    }

    fn read(path: &Path) -> Option<Self> {
        let contents = std::fs::read_to_string(path).ok()?;
        match toml::from_str(&contents) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Ignoring invalid config file");
                None
            }
        }
    }

    /// Save config to the default path
    pub fn save(&self) -> Result<()> {
        let path = Self::path().ok_or_else(|| anyhow::anyhow!("Could not determine config path"))?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let toml = toml::to_string_pretty(self)?;
        std::fs::write(path, toml)?;
        Ok(())
    }

    /// Environment variables win over the file:
    /// DRACIN_API_BASE_URL, DRACIN_SITE_NAME
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("DRACIN_API_BASE_URL").filter(|v| !v.is_empty()) {
            self.api.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(name) = lookup("DRACIN_SITE_NAME").filter(|v| !v.is_empty()) {
            self.site.name = name;
        }
    }
}
