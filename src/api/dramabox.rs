//! Dramabox API client
//!
//! Catalog, search and episode streams for short dramas.
//! Upstream: https://dramabox.sansekai.my.id/api/dramabox/*
//!
//! The client is fail-soft: a non-success status or a body that is not the
//! expected shape yields an empty collection instead of an error. Only
//! transport failures surface as `DramaboxError`, and the page layer turns
//! those into "not available" states.

use regex::Regex;
use reqwest::StatusCode;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::config::{ApiConfig, DEFAULT_API_BASE_URL};
use crate::models::{
    Banner, Country, Drama, DramaStatus, Episode, Genre, HomeData, LatestUpdate, Paginated,
    SearchKind, SearchResult, StreamServer, StreamType, DEFAULT_YEAR,
};

/// Dramabox API error types
#[derive(Error, Debug)]
pub enum DramaboxError {
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, DramaboxError>;

/// Upstream status and body, passed through untouched by the search proxy
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    /// Parsed JSON body, present only for success statuses
    pub body: Option<Value>,
}

struct CachedResponse {
    fetched_at: Instant,
    body: Value,
}

/// Dramabox API client
pub struct DramaboxClient {
    base_url: String,
    client: reqwest::Client,
    revalidate: Duration,
    cache: Mutex<HashMap<String, CachedResponse>>,
}

impl Default for DramaboxClient {
    fn default() -> Self {
        Self::new()
    }
}

impl DramaboxClient {
    /// Create a client for the public Dramabox API
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_API_BASE_URL)
    }

    /// Create a client with a custom base URL (mirrors, testing)
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let defaults = ApiConfig::default();
        Self::build(base_url.into(), defaults.timeout(), defaults.revalidate())
    }

    pub fn from_config(config: &ApiConfig) -> Self {
        Self::build(config.base_url.clone(), config.timeout(), config.revalidate())
    }

    fn build(base_url: String, timeout: Duration, revalidate: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            revalidate,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Override how long responses are served from cache (zero disables it)
    pub fn with_revalidate(mut self, revalidate: Duration) -> Self {
        self.revalidate = revalidate;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // -------------------------------------------------------------------------
    // Transport
    // -------------------------------------------------------------------------

    fn cached(&self, endpoint: &str) -> Option<Value> {
        if self.revalidate.is_zero() {
            return None;
        }
        let cache = self.cache.lock().ok()?;
        cache
            .get(endpoint)
            .filter(|entry| entry.fetched_at.elapsed() < self.revalidate)
            .map(|entry| entry.body.clone())
    }

    fn store(&self, endpoint: &str, body: &Value) {
        if self.revalidate.is_zero() {
            return;
        }
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(
                endpoint.to_string(),
                CachedResponse {
                    fetched_at: Instant::now(),
                    body: body.clone(),
                },
            );
        }
    }

    /// GET an endpoint, degrading non-success statuses and unparsable bodies
    /// to an empty JSON array. Fresh successful bodies come from the cache.
    async fn get(&self, endpoint: &str) -> Result<Value> {
        if let Some(body) = self.cached(endpoint) {
            tracing::trace!(endpoint, "Serving cached response");
            return Ok(body);
        }

        let url = format!("{}{}", self.base_url, endpoint);
        tracing::debug!(%url, "Fetching");

        let response = self
            .client
            .get(&url)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|e| {
                tracing::error!(endpoint, error = %e, "API fetch failed");
                e
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!(status = status.as_u16(), %url, "API error");
            return Ok(Value::Array(Vec::new()));
        }

        let text = response.text().await?;
        match serde_json::from_str::<Value>(&text) {
            Ok(body) => {
                self.store(endpoint, &body);
                Ok(body)
            }
            Err(e) => {
                tracing::error!(%url, error = %e, "API returned malformed JSON");
                Ok(Value::Array(Vec::new()))
            }
        }
    }

    /// GET an endpoint that should return a JSON array
    async fn get_list(&self, endpoint: &str) -> Result<Vec<Value>> {
        match self.get(endpoint).await? {
            Value::Array(items) => Ok(items),
            other => {
                tracing::error!(endpoint, body = %other, "Expected array");
                Ok(Vec::new())
            }
        }
    }

    async fn get_books(&self, endpoint: &str) -> Result<Vec<BookRaw>> {
        Ok(self
            .get_list(endpoint)
            .await?
            .into_iter()
            .filter_map(BookRaw::from_value)
            .collect())
    }

    // -------------------------------------------------------------------------
    // Home & Discovery
    // -------------------------------------------------------------------------

    /// Home screen sections. Never fails: any error yields empty sections.
    pub async fn home(&self) -> HomeData {
        let (foryou, latest, trending) = tokio::join!(
            self.get_list("/api/dramabox/foryou"),
            self.get_books("/api/dramabox/latest"),
            self.get_books("/api/dramabox/trending"),
        );

        let (foryou, latest, trending) = match (foryou, latest, trending) {
            (Ok(f), Ok(l), Ok(t)) => (f, l, t),
            (f, l, t) => {
                let error = [f.err(), l.err(), t.err()]
                    .into_iter()
                    .flatten()
                    .map(|e| e.to_string())
                    .collect::<Vec<_>>()
                    .join("; ");
                tracing::error!(%error, "Home fetch failed");
                return HomeData::default();
            }
        };

        let banners = foryou
            .iter()
            .take(5)
            .filter_map(banner_book)
            .map(|book| {
                let drama = book.into_drama();
                Banner {
                    id: drama.id.clone(),
                    title: drama.title.clone(),
                    subtitle: drama.genre_names(),
                    image: drama.hero_image().to_string(),
                    link: format!("/drama/{}", drama.id),
                    drama,
                }
            })
            .collect();

        let now = chrono::Utc::now();
        let latest = latest
            .into_iter()
            .take(10)
            .map(|book| {
                let drama = book.into_drama();
                let episode = Episode {
                    id: "latest".to_string(),
                    drama_id: drama.id.clone(),
                    number: drama.total_episodes,
                    season: None,
                    title: Some(format!("Episode {}", drama.total_episodes)),
                    thumbnail: Some(drama.poster.clone()),
                    duration: 0,
                    stream_url: None,
                    servers: Vec::new(),
                    subtitles: Vec::new(),
                    release_date: None,
                };
                LatestUpdate {
                    drama,
                    episode,
                    updated_at: now,
                }
            })
            .collect();

        let trending: Vec<Drama> = trending.into_iter().map(BookRaw::into_drama).collect();

        HomeData {
            banners,
            trending: trending.iter().take(10).cloned().collect(),
            latest,
            top_today: trending.iter().take(5).cloned().collect(),
            top_week: trending.iter().skip(5).take(5).cloned().collect(),
            genres: self.genres(),
        }
    }

    /// Trending dramas (single upstream page)
    pub async fn trending(&self, page: u32) -> Result<Paginated<Drama>> {
        let books = self.get_books("/api/dramabox/trending").await?;
        Ok(paginate(books.into_iter().map(BookRaw::into_drama).collect(), page))
    }

    /// Recently updated dramas (single upstream page)
    pub async fn latest(&self, page: u32) -> Result<Paginated<Drama>> {
        let books = self.get_books("/api/dramabox/latest").await?;
        Ok(paginate(books.into_iter().map(BookRaw::into_drama).collect(), page))
    }

    // -------------------------------------------------------------------------
    // Search
    // -------------------------------------------------------------------------

    /// Search dramas. Never fails: a non-array body or any error gives an
    /// empty page.
    pub async fn search(&self, query: &str, page: u32) -> Paginated<SearchResult> {
        let endpoint = format!(
            "/api/dramabox/search?query={}",
            urlencoding::encode(query)
        );

        let body = match self.get(&endpoint).await {
            Ok(body) => body,
            Err(e) => {
                tracing::error!(query, error = %e, "Search error");
                return Paginated::empty(page);
            }
        };

        let results = search_results(&body);
        if results.is_none() {
            tracing::error!(query, body = %body, "Search API returned non-array");
        }
        match results {
            Some(results) => Paginated {
                total_items: results.len() as u32,
                data: results,
                page,
                total_pages: 1,
                has_more: false,
            },
            None => Paginated::empty(page),
        }
    }

    /// Forward a search to the upstream without mapping or caching
    pub async fn search_raw(&self, query: &str) -> Result<UpstreamResponse> {
        let url = format!(
            "{}/api/dramabox/search?query={}",
            self.base_url,
            urlencoding::encode(query)
        );

        let response = self
            .client
            .get(&url)
            .header("Content-Type", "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Ok(UpstreamResponse { status, body: None });
        }

        let text = response.text().await?;
        let body = serde_json::from_str(&text)
            .map_err(|e| DramaboxError::InvalidResponse(format!("JSON parse error: {}", e)))?;
        Ok(UpstreamResponse {
            status,
            body: Some(body),
        })
    }

    // -------------------------------------------------------------------------
    // Drama Detail
    // -------------------------------------------------------------------------

    /// Look a drama up in the discovery feeds. The upstream has no detail
    /// endpoint, so unknown ids resolve to a stub instead of failing.
    pub async fn drama(&self, id: &str) -> Drama {
        let (foryou, latest, trending) = tokio::join!(
            self.get_list("/api/dramabox/foryou"),
            self.get_books("/api/dramabox/latest"),
            self.get_books("/api/dramabox/trending"),
        );

        match (foryou, latest, trending) {
            (Ok(foryou), Ok(latest), Ok(trending)) => {
                let direct = foryou
                    .iter()
                    .filter(|item| item.get("bookId").is_some())
                    .filter_map(|item| BookRaw::from_value(item.clone()));
                let nested = foryou.iter().flat_map(tag_books);

                if let Some(book) = direct
                    .chain(nested)
                    .chain(latest)
                    .chain(trending)
                    .find(|b| b.book_id == id)
                {
                    return book.into_drama();
                }
            }
            (f, l, t) => {
                for e in [f.err(), l.err(), t.err()].into_iter().flatten() {
                    tracing::error!(id, error = %e, "Drama lookup failed");
                }
            }
        }

        Drama::stub(id)
    }

    /// All episodes of a drama with one stream server per CDN and quality
    pub async fn episodes(&self, drama_id: &str) -> Result<Vec<Episode>> {
        let endpoint = format!(
            "/api/dramabox/allepisode?bookId={}",
            urlencoding::encode(drama_id)
        );

        let episodes = self
            .get_list(&endpoint)
            .await?
            .into_iter()
            .filter_map(|item| match serde_json::from_value::<EpisodeRaw>(item) {
                Ok(raw) => Some(raw.into_episode(drama_id)),
                Err(e) => {
                    tracing::warn!(drama_id, error = %e, "Skipping malformed episode");
                    None
                }
            })
            .collect();
        Ok(episodes)
    }

    /// Dramas to suggest next to a detail page
    pub async fn related(&self, _drama_id: &str) -> Result<Vec<Drama>> {
        let mut trending = self.trending(1).await?.data;
        trending.truncate(5);
        Ok(trending)
    }

    // -------------------------------------------------------------------------
    // Genres & Countries
    // -------------------------------------------------------------------------

    pub fn genres(&self) -> Vec<Genre> {
        [("romance", "Romance", 100), ("ceo", "CEO", 80), ("revenge", "Revenge", 50)]
            .into_iter()
            .map(|(slug, name, count)| Genre {
                id: slug.to_string(),
                slug: slug.to_string(),
                name: name.to_string(),
                count,
            })
            .collect()
    }

    pub fn countries(&self) -> Vec<Country> {
        vec![Country::china()]
    }

    /// The upstream cannot filter by genre; the trending feed stands in
    pub async fn dramas_by_genre(&self, _slug: &str, page: u32) -> Result<Paginated<Drama>> {
        self.trending(page).await
    }

    /// The upstream cannot filter by country; the latest feed stands in
    pub async fn dramas_by_country(&self, _code: &str, page: u32) -> Result<Paginated<Drama>> {
        self.latest(page).await
    }
}

fn paginate<T>(data: Vec<T>, page: u32) -> Paginated<T> {
    Paginated {
        total_items: data.len() as u32,
        total_pages: 1,
        has_more: false,
        page,
        data,
    }
}

/// Map a raw upstream search body into results, `None` when it is not an array
pub fn search_results(body: &Value) -> Option<Vec<SearchResult>> {
    let items = body.as_array()?;
    Some(
        items
            .iter()
            .filter_map(|item| BookRaw::from_value(item.clone()))
            .map(BookRaw::into_search_result)
            .collect(),
    )
}

/// Book shown on a "for you" banner: the item itself, or the first book of
/// its tag card
fn banner_book(item: &Value) -> Option<BookRaw> {
    if item.get("bookId").is_some() {
        BookRaw::from_value(item.clone())
    } else {
        tag_books(item).into_iter().next()
    }
}

fn tag_books(item: &Value) -> Vec<BookRaw> {
    item.get("tagCardVo")
        .and_then(|card| card.get("tagBooks"))
        .and_then(Value::as_array)
        .map(|books| {
            books
                .iter()
                .filter_map(|b| BookRaw::from_value(b.clone()))
                .collect()
        })
        .unwrap_or_default()
}

/// Parse a play count like "12K", "3M" or "1,204" into a number. All
/// non-digits are dropped before the suffix multiplier applies, so "12.5K"
/// reads as 125 000.
pub fn parse_play_count(text: &str) -> u64 {
    let Some(value) = Regex::new(r"\D")
        .ok()
        .and_then(|re| re.replace_all(text, "").parse::<u64>().ok())
    else {
        return 0;
    };

    let multiplier = if text.contains(['k', 'K']) {
        1_000
    } else if text.contains(['m', 'M']) {
        1_000_000
    } else {
        1
    };
    value.saturating_mul(multiplier)
}

// =============================================================================
// Response Structures (internal deserialization)
// =============================================================================

/// Accept ids sent either as strings or as numbers
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BookRaw {
    #[serde(deserialize_with = "string_or_number")]
    book_id: String,
    #[serde(default)]
    book_name: String,
    cover_wap: Option<String>,
    cover: Option<String>,
    introduction: Option<String>,
    chapter_count: Option<u32>,
    play_count: Option<String>,
    tags: Option<Vec<String>>,
    tag_names: Option<Vec<String>>,
}

impl BookRaw {
    fn from_value(value: Value) -> Option<Self> {
        serde_json::from_value(value).ok()
    }

    fn into_drama(self) -> Drama {
        let genres = self
            .tags
            .or(self.tag_names)
            .unwrap_or_default()
            .iter()
            .map(|tag| Genre::from_tag(tag))
            .collect();

        let cover_wap = self.cover_wap.filter(|c| !c.is_empty());
        let cover = self.cover.filter(|c| !c.is_empty());

        Drama {
            id: self.book_id.clone(),
            slug: self.book_id,
            original_title: self.book_name.clone(),
            title: self.book_name,
            poster: cover_wap.clone().or(cover.clone()).unwrap_or_default(),
            backdrop: cover.or(cover_wap).unwrap_or_default(),
            synopsis: self
                .introduction
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "No synopsis available.".to_string()),
            rating: 0.0,
            views: self.play_count.as_deref().map(parse_play_count).unwrap_or(0),
            genres,
            country: Country::china(),
            year: DEFAULT_YEAR,
            status: DramaStatus::Completed,
            total_episodes: self.chapter_count.unwrap_or(0),
            current_episode: None,
            cast: Vec::new(),
            release_date: String::new(),
            updated_at: Some(chrono::Utc::now()),
        }
    }

    fn into_search_result(self) -> SearchResult {
        SearchResult {
            id: self.book_id.clone(),
            slug: self.book_id,
            title: self.book_name,
            poster: self.cover.or(self.cover_wap).unwrap_or_default(),
            year: DEFAULT_YEAR,
            kind: SearchKind::Drama,
            rating: 0.0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EpisodeRaw {
    #[serde(deserialize_with = "string_or_number")]
    chapter_id: String,
    chapter_index: u32,
    chapter_name: Option<String>,
    #[serde(default)]
    cdn_list: Vec<CdnRaw>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CdnRaw {
    cdn_domain: String,
    #[serde(default)]
    video_path_list: Vec<VideoPathRaw>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoPathRaw {
    quality: u32,
    video_path: String,
}

impl EpisodeRaw {
    fn into_episode(self, drama_id: &str) -> Episode {
        let servers: Vec<StreamServer> = self
            .cdn_list
            .iter()
            .flat_map(|cdn| {
                cdn.video_path_list.iter().map(move |path| StreamServer {
                    id: format!("{}-{}", cdn.cdn_domain, path.quality),
                    name: format!("{} ({}p)", cdn.cdn_domain, path.quality),
                    url: path.video_path.clone(),
                    quality: Some(format!("{}p", path.quality)),
                    // Manifests are told apart by URL at playback time
                    stream_type: StreamType::Mp4,
                })
            })
            .collect();

        let default_stream = servers
            .iter()
            .find(|s| matches!(s.quality.as_deref(), Some("720p") | Some("1080p")))
            .or_else(|| servers.first())
            .map(|s| s.url.clone());

        let number = self.chapter_index + 1;
        Episode {
            id: self.chapter_id,
            drama_id: drama_id.to_string(),
            number,
            season: None,
            title: Some(
                self.chapter_name
                    .filter(|n| !n.is_empty())
                    .unwrap_or_else(|| format!("Episode {}", number)),
            ),
            thumbnail: None,
            duration: 0,
            stream_url: default_stream,
            servers,
            subtitles: Vec::new(),
            release_date: Some(chrono::Utc::now()),
        }
    }
}
