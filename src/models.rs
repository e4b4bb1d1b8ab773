//! Data structures and types for dracin
//!
//! Display records mapped from the upstream Dramabox API, organized by domain:
//! - **Catalog**: dramas, genres, countries, cast
//! - **Episodes**: episodes, stream servers, subtitle tracks
//! - **Discovery**: search results, home sections, paginated listings
//! - **Progress**: local watch progress
//!
//! Plus the small formatting helpers the screens and CLI share.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Catalog Models
// =============================================================================

/// Airing status of a drama
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DramaStatus {
    Ongoing,
    #[default]
    Completed,
}

impl fmt::Display for DramaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DramaStatus::Ongoing => write!(f, "Ongoing"),
            DramaStatus::Completed => write!(f, "Completed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genre {
    pub id: String,
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub count: u32,
}

impl Genre {
    /// Build a genre from an upstream tag name
    pub fn from_tag(tag: &str) -> Self {
        let slug = dash_case(tag);
        Self {
            id: slug.clone(),
            slug,
            name: tag.to_string(),
            count: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
    pub code: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flag: Option<String>,
}

impl Country {
    /// Country used when the upstream record carries none
    pub fn china() -> Self {
        Self {
            code: "cn".to_string(),
            name: "China".to_string(),
            flag: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CastMember {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// A drama as shown on cards, rows and the detail screen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Drama {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub original_title: String,
    pub poster: String,
    pub backdrop: String,
    pub synopsis: String,
    pub rating: f32,
    pub views: u64,
    pub genres: Vec<Genre>,
    pub country: Country,
    pub year: u16,
    pub status: DramaStatus,
    pub total_episodes: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_episode: Option<u32>,
    pub cast: Vec<CastMember>,
    pub release_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Drama {
    /// Placeholder shown when a drama cannot be found upstream
    pub fn stub(id: &str) -> Self {
        Self {
            id: id.to_string(),
            slug: id.to_string(),
            title: format!("Drama {}", id),
            original_title: String::new(),
            poster: String::new(),
            backdrop: String::new(),
            synopsis: "Details loading...".to_string(),
            rating: 0.0,
            views: 0,
            genres: Vec::new(),
            country: Country::china(),
            year: DEFAULT_YEAR,
            status: DramaStatus::Completed,
            total_episodes: 0,
            current_episode: None,
            cast: Vec::new(),
            release_date: DEFAULT_YEAR.to_string(),
            updated_at: None,
        }
    }

    /// Genre names joined for subtitles and banners
    pub fn genre_names(&self) -> String {
        self.genres
            .iter()
            .map(|g| g.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Backdrop if present, poster otherwise
    pub fn hero_image(&self) -> &str {
        if self.backdrop.is_empty() {
            &self.poster
        } else {
            &self.backdrop
        }
    }
}

impl fmt::Display for Drama {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) - {} eps - {} views",
            self.title,
            self.year,
            self.total_episodes,
            format_views(self.views)
        )
    }
}

/// Year shown when the upstream record has no release information
pub const DEFAULT_YEAR: u16 = 2024;

// =============================================================================
// Episode Models
// =============================================================================

/// Transport type of a stream server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StreamType {
    /// Adaptive-segment manifest (.m3u8)
    Hls,
    /// Single direct file
    #[default]
    Mp4,
    /// Embedded third-party page
    Iframe,
}

impl fmt::Display for StreamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamType::Hls => write!(f, "HLS"),
            StreamType::Mp4 => write!(f, "MP4"),
            StreamType::Iframe => write!(f, "IFRAME"),
        }
    }
}

/// One playable source of an episode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamServer {
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,
    #[serde(rename = "type")]
    pub stream_type: StreamType,
}

impl StreamServer {
    /// Label used by the server picker: "name (quality)"
    pub fn label(&self) -> String {
        match &self.quality {
            Some(q) => format!("{} ({})", self.name, q),
            None => self.name.clone(),
        }
    }
}

/// Sidecar subtitle track
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtitle {
    pub id: String,
    pub language: String,
    pub label: String,
    pub url: String,
    #[serde(default)]
    pub default: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Episode {
    pub id: String,
    pub drama_id: String,
    pub number: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub season: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    /// Duration in seconds, 0 when unknown
    pub duration: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_url: Option<String>,
    #[serde(default)]
    pub servers: Vec<StreamServer>,
    #[serde(default)]
    pub subtitles: Vec<Subtitle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_date: Option<DateTime<Utc>>,
}

impl Episode {
    /// "S2 Ep 3" or "Episode 3"
    pub fn label(&self) -> String {
        episode_label(self.number, self.season)
    }

    /// Title, falling back to the episode label
    pub fn display_title(&self) -> String {
        match &self.title {
            Some(t) if !t.is_empty() => t.clone(),
            _ => self.label(),
        }
    }
}

impl fmt::Display for Episode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03} - {}", self.number, self.display_title())
    }
}

// =============================================================================
// Discovery Models
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SearchKind {
    #[default]
    Drama,
    Movie,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub poster: String,
    pub year: u16,
    #[serde(rename = "type")]
    pub kind: SearchKind,
    pub rating: f32,
}

impl fmt::Display for SearchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.title, self.year)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Banner {
    pub id: String,
    pub title: String,
    pub subtitle: String,
    pub image: String,
    pub link: String,
    pub drama: Drama,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestUpdate {
    pub drama: Drama,
    pub episode: Episode,
    pub updated_at: DateTime<Utc>,
}

/// Sections of the home screen
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeData {
    pub banners: Vec<Banner>,
    pub trending: Vec<Drama>,
    pub latest: Vec<LatestUpdate>,
    pub top_today: Vec<Drama>,
    pub top_week: Vec<Drama>,
    pub genres: Vec<Genre>,
}

impl HomeData {
    pub fn is_empty(&self) -> bool {
        self.banners.is_empty()
            && self.trending.is_empty()
            && self.latest.is_empty()
            && self.top_today.is_empty()
            && self.top_week.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub page: u32,
    pub total_pages: u32,
    pub total_items: u32,
    pub has_more: bool,
}

impl<T> Paginated<T> {
    /// Empty page, used whenever the upstream gives nothing usable
    pub fn empty(page: u32) -> Self {
        Self {
            data: Vec::new(),
            page,
            total_pages: 0,
            total_items: 0,
            has_more: false,
        }
    }
}

// =============================================================================
// Progress Models
// =============================================================================

/// Last known playback position of an episode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchProgress {
    pub episode_id: String,
    #[serde(default)]
    pub drama_id: String,
    pub current_time: f64,
    pub duration: f64,
    pub percentage: u8,
    pub updated_at: DateTime<Utc>,
}

impl WatchProgress {
    pub fn new(
        episode_id: impl Into<String>,
        drama_id: impl Into<String>,
        current_time: f64,
        duration: f64,
    ) -> Self {
        Self {
            episode_id: episode_id.into(),
            drama_id: drama_id.into(),
            current_time,
            duration,
            percentage: watch_percentage(current_time, duration),
            updated_at: Utc::now(),
        }
    }
}

// =============================================================================
// Formatting Helpers
// =============================================================================

/// Format seconds as M:SS or H:MM:SS ("00:00" when unknown)
pub fn format_duration(seconds: f64) -> String {
    if !seconds.is_finite() || seconds <= 0.0 {
        return "00:00".to_string();
    }
    let total = seconds as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}

/// Format a view count as 1.2M / 500.0K / 999
pub fn format_views(views: u64) -> String {
    if views >= 1_000_000 {
        format!("{:.1}M", views as f64 / 1_000_000.0)
    } else if views >= 1_000 {
        format!("{:.1}K", views as f64 / 1_000.0)
    } else {
        views.to_string()
    }
}

/// Indonesian relative time ("5 menit lalu"), falling back to a short date
pub fn format_relative_time(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff = (now - then).num_seconds();

    if diff < 60 {
        "Baru saja".to_string()
    } else if diff < 3600 {
        format!("{} menit lalu", diff / 60)
    } else if diff < 86_400 {
        format!("{} jam lalu", diff / 3600)
    } else if diff < 604_800 {
        format!("{} hari lalu", diff / 86_400)
    } else {
        then.format("%-d %b %Y").to_string()
    }
}

/// Lowercase with whitespace runs replaced by '-' (genre ids from tags)
fn dash_case(text: &str) -> String {
    text.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

/// Cut text to `max` characters and append "..."
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max).collect();
    format!("{}...", cut.trim_end())
}

/// First `max` characters, no ellipsis (page descriptions)
pub fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

pub fn episode_label(number: u32, season: Option<u32>) -> String {
    match season {
        Some(s) if s > 0 => format!("S{} Ep {}", s, number),
        _ => format!("Episode {}", number),
    }
}

/// Rounded percentage watched, 0 when the duration is unknown
pub fn watch_percentage(current_time: f64, duration: f64) -> u8 {
    if duration <= 0.0 || !duration.is_finite() {
        return 0;
    }
    ((current_time / duration) * 100.0).round().clamp(0.0, 100.0) as u8
}
