//! Page view-models
//!
//! Each page fetches through the [`DramaboxClient`] and composes what its
//! screen (or CLI command) renders. Loading a page never fails: upstream
//! errors are logged and the affected section comes back empty.

use serde::Serialize;

use crate::api::DramaboxClient;
use crate::config::SiteConfig;
use crate::models::{truncate_chars, Country, Drama, Episode, Genre, HomeData, Paginated, SearchResult};

/// Title and description of a page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageMeta {
    pub title: String,
    pub description: String,
}

impl PageMeta {
    /// "{title} | {site}", or the site's default title when `title` is None
    pub fn new(site: &SiteConfig, title: Option<&str>, description: Option<&str>) -> Self {
        let title = match title {
            Some(t) => format!("{} | {}", t, site.name),
            None => format!("{} - {}", site.name, site.description),
        };
        Self {
            title,
            description: description.unwrap_or(&site.description).to_string(),
        }
    }
}

fn or_empty<T: Default, E: std::fmt::Display>(result: Result<T, E>, what: &str) -> T {
    result.unwrap_or_else(|e| {
        tracing::error!(section = what, error = %e, "Section not available");
        T::default()
    })
}

// =============================================================================
// Home
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct HomePage {
    pub meta: PageMeta,
    pub data: HomeData,
}

impl HomePage {
    pub async fn load(client: &DramaboxClient, site: &SiteConfig) -> Self {
        Self {
            meta: PageMeta::new(site, None, None),
            data: client.home().await,
        }
    }
}

// =============================================================================
// Drama Detail
// =============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DramaPage {
    pub meta: PageMeta,
    pub drama: Drama,
    pub episodes: Vec<Episode>,
    pub related: Vec<Drama>,
}

impl DramaPage {
    pub async fn load(client: &DramaboxClient, site: &SiteConfig, slug: &str) -> Self {
        let (drama, episodes, related) =
            tokio::join!(client.drama(slug), client.episodes(slug), client.related(slug));

        let description = truncate_chars(&drama.synopsis, 160);
        Self {
            meta: PageMeta::new(site, Some(&drama.title), Some(&description)),
            episodes: or_empty(episodes, "episodes"),
            related: or_empty(related, "related"),
            drama,
        }
    }

    /// Episode to start from: the first one
    pub fn first_episode(&self) -> Option<&Episode> {
        self.episodes.first()
    }
}

// =============================================================================
// Genres & Countries
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct GenreIndex {
    pub meta: PageMeta,
    pub genres: Vec<Genre>,
}

impl GenreIndex {
    pub fn load(client: &DramaboxClient, site: &SiteConfig) -> Self {
        Self {
            meta: PageMeta::new(site, Some("Browse by Genre"), None),
            genres: client.genres(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GenrePage {
    pub meta: PageMeta,
    pub slug: String,
    /// Genre name, or the raw slug when the genre is unknown
    pub heading: String,
    pub genre: Option<Genre>,
    pub dramas: Paginated<Drama>,
}

impl GenrePage {
    pub async fn load(client: &DramaboxClient, site: &SiteConfig, slug: &str, page: u32) -> Self {
        let genre = client.genres().into_iter().find(|g| g.slug == slug);
        let dramas = client
            .dramas_by_genre(slug, page)
            .await
            .unwrap_or_else(|e| {
                tracing::error!(slug, error = %e, "Genre listing not available");
                Paginated::empty(page)
            });

        Self {
            meta: PageMeta::new(site, Some(genre.as_ref().map_or("Genre", |g| g.name.as_str())), None),
            slug: slug.to_string(),
            heading: genre.as_ref().map_or_else(|| slug.to_string(), |g| g.name.clone()),
            genre,
            dramas,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CountryIndex {
    pub meta: PageMeta,
    pub countries: Vec<Country>,
}

impl CountryIndex {
    pub fn load(client: &DramaboxClient, site: &SiteConfig) -> Self {
        Self {
            meta: PageMeta::new(site, Some("Browse by Country"), None),
            countries: client.countries(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CountryPage {
    pub meta: PageMeta,
    pub code: String,
    pub heading: String,
    pub country: Option<Country>,
    pub dramas: Paginated<Drama>,
}

impl CountryPage {
    pub async fn load(client: &DramaboxClient, site: &SiteConfig, code: &str, page: u32) -> Self {
        let country = client.countries().into_iter().find(|c| c.code == code);
        let dramas = client
            .dramas_by_country(code, page)
            .await
            .unwrap_or_else(|e| {
                tracing::error!(code, error = %e, "Country listing not available");
                Paginated::empty(page)
            });

        Self {
            meta: PageMeta::new(site, Some(country.as_ref().map_or("Country", |c| c.name.as_str())), None),
            code: code.to_string(),
            heading: country.as_ref().map_or_else(|| code.to_string(), |c| c.name.clone()),
            country,
            dramas,
        }
    }
}

// =============================================================================
// Search
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct SearchPage {
    pub meta: PageMeta,
    pub query: String,
    pub results: Vec<SearchResult>,
}

impl SearchPage {
    /// A blank query shows no results and makes no upstream call
    pub async fn load(client: &DramaboxClient, site: &SiteConfig, query: &str) -> Self {
        let meta = PageMeta::new(site, Some("Search"), None);
        if query.trim().is_empty() {
            return Self {
                meta,
                query: query.to_string(),
                results: Vec::new(),
            };
        }

        Self {
            meta,
            query: query.to_string(),
            results: client.search(query, 1).await.data,
        }
    }
}

// =============================================================================
// Watch
// =============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchView {
    pub meta: PageMeta,
    pub drama: Drama,
    pub episode: Episode,
    pub prev: Option<Episode>,
    pub next: Option<Episode>,
    pub episodes: Vec<Episode>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum WatchPage {
    Ready(Box<WatchView>),
    NotFound { message: String },
}

pub const EPISODE_NOT_FOUND: &str = "Episode not found.";

impl WatchPage {
    /// Load a drama's episode. An unknown episode id falls back to the first
    /// episode; a drama without episodes is "not found".
    pub async fn load(client: &DramaboxClient, site: &SiteConfig, drama_id: &str, episode_id: &str) -> Self {
        let (episodes, drama) = tokio::join!(client.episodes(drama_id), client.drama(drama_id));
        let episodes = or_empty(episodes, "episodes");
        Self::compose(site, drama, episodes, episode_id)
    }

    /// Pick the episode and its neighbours out of a loaded list
    pub fn compose(site: &SiteConfig, drama: Drama, episodes: Vec<Episode>, episode_id: &str) -> Self {
        let index = episodes
            .iter()
            .position(|ep| ep.id == episode_id)
            .unwrap_or(0);

        let Some(episode) = episodes.get(index).cloned() else {
            return WatchPage::NotFound {
                message: EPISODE_NOT_FOUND.to_string(),
            };
        };

        let prev = index.checked_sub(1).and_then(|i| episodes.get(i)).cloned();
        let next = episodes.get(index + 1).cloned();
        let title = format!("{} {} - Watch Now", drama.title, episode.label());

        WatchPage::Ready(Box::new(WatchView {
            meta: PageMeta::new(site, Some(&title), Some("Stream drama dengan kualitas terbaik")),
            drama,
            episode,
            prev,
            next,
            episodes,
        }))
    }
}
