//! CLI Command Handlers
//!
//! Implements all CLI commands on top of the page view-models, the store and
//! the playback view. Each handler takes CLI args, the shared context and
//! Output, and returns an ExitCode.

use serde::Serialize;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::api::DramaboxClient;
use crate::cli::{
    CountryCmd, EpisodesCmd, ExitCode, FavoriteCmd, FavoriteResponse, GenreCmd, HistoryCmd,
    HomeCmd, HomeSection, InfoCmd, ListCmd, Output, SearchCmd, ServeCmd, SuggestCmd, WatchCmd,
    WatchResponse,
};
use crate::config::Config;
use crate::models::{format_duration, format_relative_time, Drama, Episode, WatchProgress};
use crate::pages::{CountryIndex, CountryPage, DramaPage, GenreIndex, GenrePage, HomePage, SearchPage};
use crate::search::Autocomplete;
use crate::store::Store;
use crate::stream::{ExternalPlayer, PlaybackView, PlayerType};

/// Shared state for one CLI invocation
pub struct Context {
    pub config: Config,
    pub client: DramaboxClient,
}

impl Context {
    pub fn new(config: Config) -> Self {
        let client = DramaboxClient::from_config(&config.api);
        Self { config, client }
    }
}

fn print_or_fail<T: Serialize>(output: &Output, data: T, lines: &[String]) -> ExitCode {
    match output.print_lines(data, lines) {
        Ok(()) => ExitCode::Success,
        Err(e) => output.error(format!("Failed to serialize: {}", e), ExitCode::Error),
    }
}

fn drama_line(drama: &Drama) -> String {
    format!("{:<14} {}", drama.id, drama)
}

fn episode_line(episode: &Episode) -> String {
    let servers = episode
        .servers
        .iter()
        .filter_map(|s| s.quality.as_deref())
        .collect::<Vec<_>>()
        .join(" ");
    format!("{:<14} {}  [{}]", episode.id, episode, servers)
}

// =============================================================================
// Search Commands
// =============================================================================

pub async fn search_cmd(cmd: SearchCmd, ctx: &Context, output: &Output) -> ExitCode {
    output.info(format!("Searching for: {}", cmd.query));

    let mut page = SearchPage::load(&ctx.client, &ctx.config.site, &cmd.query).await;
    page.results.truncate(cmd.limit);

    let mut store = Store::open_default();
    store.add_to_search_history(&cmd.query);

    let lines: Vec<String> = page
        .results
        .iter()
        .map(|r| format!("{:<14} {}", r.id, r))
        .collect();
    print_or_fail(output, &page.results, &lines)
}

/// Suggestions run through the same debounce as the TUI search box
pub async fn suggest_cmd(cmd: SuggestCmd, ctx: &Context, output: &Output) -> ExitCode {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut autocomplete = Autocomplete::new(&ctx.config.search, tx, std::convert::identity);

    let client = DramaboxClient::from_config(&ctx.config.api);
    autocomplete.input(&cmd.query, move |query| async move {
        client.search(&query, 1).await.data
    });

    if autocomplete.is_pending() {
        if let Some(suggestions) = rx.recv().await {
            autocomplete.accept(suggestions);
        }
    }

    let suggestions = autocomplete.suggestions().to_vec();
    let lines: Vec<String> = suggestions.iter().map(|r| r.title.clone()).collect();
    print_or_fail(output, &suggestions, &lines)
}

// =============================================================================
// Browse Commands
// =============================================================================

pub async fn home_cmd(cmd: HomeCmd, ctx: &Context, output: &Output) -> ExitCode {
    let page = HomePage::load(&ctx.client, &ctx.config.site).await;
    if page.data.is_empty() {
        output.info("Home is empty (upstream not available?)");
    }

    let data = &page.data;
    let dramas = |list: &[Drama]| list.iter().map(drama_line).collect::<Vec<_>>();

    match cmd.section {
        None => {
            let mut lines = vec![format!("== {} ==", page.meta.title), "-- Trending --".to_string()];
            lines.extend(dramas(&data.trending));
            lines.push("-- Latest --".to_string());
            lines.extend(data.latest.iter().map(|u| format!("{}  ({})", drama_line(&u.drama), u.episode.display_title())));
            print_or_fail(output, &page, &lines)
        }
        Some(HomeSection::Banners) => {
            let lines: Vec<String> = data
                .banners
                .iter()
                .map(|b| format!("{:<14} {}  {}", b.id, b.title, b.subtitle))
                .collect();
            print_or_fail(output, &data.banners, &lines)
        }
        Some(HomeSection::Trending) => print_or_fail(output, &data.trending, &dramas(&data.trending)),
        Some(HomeSection::Latest) => {
            let lines: Vec<String> = data.latest.iter().map(|u| drama_line(&u.drama)).collect();
            print_or_fail(output, &data.latest, &lines)
        }
        Some(HomeSection::TopToday) => print_or_fail(output, &data.top_today, &dramas(&data.top_today)),
        Some(HomeSection::TopWeek) => print_or_fail(output, &data.top_week, &dramas(&data.top_week)),
        Some(HomeSection::Genres) => {
            let lines: Vec<String> = data.genres.iter().map(|g| format!("{:<10} {}", g.slug, g.name)).collect();
            print_or_fail(output, &data.genres, &lines)
        }
    }
}

pub async fn trending_cmd(cmd: ListCmd, ctx: &Context, output: &Output) -> ExitCode {
    output.info("Fetching trending...");
    match ctx.client.trending(cmd.page).await {
        Ok(mut page) => {
            page.data.truncate(cmd.limit);
            let lines: Vec<String> = page.data.iter().map(drama_line).collect();
            print_or_fail(output, &page, &lines)
        }
        Err(e) => output.error(format!("Trending fetch failed: {}", e), ExitCode::NetworkError),
    }
}

pub async fn latest_cmd(cmd: ListCmd, ctx: &Context, output: &Output) -> ExitCode {
    output.info("Fetching latest...");
    match ctx.client.latest(cmd.page).await {
        Ok(mut page) => {
            page.data.truncate(cmd.limit);
            let lines: Vec<String> = page.data.iter().map(drama_line).collect();
            print_or_fail(output, &page, &lines)
        }
        Err(e) => output.error(format!("Latest fetch failed: {}", e), ExitCode::NetworkError),
    }
}

pub async fn info_cmd(cmd: InfoCmd, ctx: &Context, output: &Output) -> ExitCode {
    output.info(format!("Getting info for: {}", cmd.id));

    let page = DramaPage::load(&ctx.client, &ctx.config.site, &cmd.id).await;
    let store = Store::open_default();
    let drama = &page.drama;

    let mut lines = vec![
        drama.title.clone(),
        format!(
            "{} | {} | {} | {} episodes{}",
            drama.status,
            drama.country.name,
            drama.year,
            drama.total_episodes,
            if store.is_favorite(&drama.id) { " | ★ favorite" } else { "" }
        ),
        format!("Genres: {}", drama.genre_names()),
        String::new(),
        drama.synopsis.clone(),
    ];
    if !page.related.is_empty() {
        lines.push(String::new());
        lines.push("Related:".to_string());
        lines.extend(page.related.iter().map(drama_line));
    }
    print_or_fail(output, &page, &lines)
}

pub async fn episodes_cmd(cmd: EpisodesCmd, ctx: &Context, output: &Output) -> ExitCode {
    match ctx.client.episodes(&cmd.id).await {
        Ok(episodes) => {
            let lines: Vec<String> = if cmd.servers {
                episodes
                    .iter()
                    .flat_map(|ep| {
                        std::iter::once(ep.to_string()).chain(
                            ep.servers
                                .iter()
                                .enumerate()
                                .map(|(i, s)| format!("    [{}] {}  {}", i, s.label(), s.url)),
                        )
                    })
                    .collect()
            } else {
                episodes.iter().map(episode_line).collect()
            };
            print_or_fail(output, &episodes, &lines)
        }
        Err(e) => output.error(format!("Episode fetch failed: {}", e), ExitCode::NetworkError),
    }
}

pub fn genres_cmd(ctx: &Context, output: &Output) -> ExitCode {
    let page = GenreIndex::load(&ctx.client, &ctx.config.site);
    let lines: Vec<String> = page
        .genres
        .iter()
        .map(|g| format!("{:<10} {} ({})", g.slug, g.name, g.count))
        .collect();
    print_or_fail(output, &page, &lines)
}

pub async fn genre_cmd(cmd: GenreCmd, ctx: &Context, output: &Output) -> ExitCode {
    let page = GenrePage::load(&ctx.client, &ctx.config.site, &cmd.slug, cmd.page).await;
    let mut lines = vec![format!("== {} ==", page.heading)];
    lines.extend(page.dramas.data.iter().map(drama_line));
    print_or_fail(output, &page, &lines)
}

pub fn countries_cmd(ctx: &Context, output: &Output) -> ExitCode {
    let page = CountryIndex::load(&ctx.client, &ctx.config.site);
    let lines: Vec<String> = page
        .countries
        .iter()
        .map(|c| format!("{:<4} {}", c.code, c.name))
        .collect();
    print_or_fail(output, &page, &lines)
}

pub async fn country_cmd(cmd: CountryCmd, ctx: &Context, output: &Output) -> ExitCode {
    let page = CountryPage::load(&ctx.client, &ctx.config.site, &cmd.code, cmd.page).await;
    let mut lines = vec![format!("== {} ==", page.heading)];
    lines.extend(page.dramas.data.iter().map(drama_line));
    print_or_fail(output, &page, &lines)
}

// =============================================================================
// Watch Command
// =============================================================================

/// How often the watch loop drains player events
const WATCH_POLL: Duration = Duration::from_millis(250);

pub async fn watch_cmd(cmd: WatchCmd, ctx: &Context, output: &Output) -> ExitCode {
    let start = match cmd.start_secs() {
        Some(Ok(secs)) => Some(secs as f64),
        Some(Err(e)) => return output.error(e, ExitCode::InvalidArgs),
        None => None,
    };

    let episodes = match ctx.client.episodes(&cmd.drama_id).await {
        Ok(episodes) => episodes,
        Err(e) => return output.error(format!("Episode fetch failed: {}", e), ExitCode::NetworkError),
    };

    let episode = match cmd.episode {
        Some(n) => episodes.iter().find(|ep| ep.number == n),
        None => episodes.first(),
    };
    let Some(episode) = episode.cloned() else {
        return output.error(crate::pages::EPISODE_NOT_FOUND, ExitCode::NotFound);
    };

    let server = cmd.server.unwrap_or(0);
    if !episode.servers.is_empty() && server >= episode.servers.len() {
        return output.error(
            format!("Server {} out of range (0-{})", server, episode.servers.len() - 1),
            ExitCode::InvalidArgs,
        );
    }

    if cmd.url_only {
        let url = episode
            .servers
            .get(server)
            .map(|s| s.url.clone())
            .or(episode.stream_url.clone());
        return match url {
            Some(url) => print_or_fail(output, &url, &[url.clone()]),
            None => output.error("No playable stream for this episode", ExitCode::NoStreams),
        };
    }

    let player_type = cmd
        .player
        .map(PlayerType::from)
        .unwrap_or_else(|| ctx.config.player.player_type());
    let player = ExternalPlayer::new(player_type);
    if !player.is_available().await {
        return output.error(
            format!("{} not found. Install it first.", player_type.display_name()),
            ExitCode::PlayerFailed,
        );
    }

    output.info(format!(
        "Opening {} in {}...",
        episode.display_title(),
        player_type.display_name()
    ));

    let mut view = PlaybackView::mount_from(player, episode, ctx.config.player.clone(), server, start);
    let Some(stream_url) = view.source_url().map(str::to_string) else {
        return output.error("No playable stream for this episode", ExitCode::NoStreams);
    };

    let mut ticker = tokio::time::interval(WATCH_POLL);
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => break,
        }
        view.pump();
        if view.error().is_some() || !view.is_attached() || view.controls().ended {
            break;
        }
    }

    let controls = view.controls().clone();
    let episode = view.episode().clone();
    let error = view.error().map(str::to_string);
    view.release();

    if controls.position > 0.0 {
        let mut store = Store::open_default();
        store.add_watch_progress(WatchProgress::new(
            &episode.id,
            &cmd.drama_id,
            controls.position,
            controls.duration,
        ));
    }

    let response = WatchResponse {
        drama_id: cmd.drama_id.clone(),
        episode_id: episode.id.clone(),
        episode: episode.number,
        server: view.selected_server().map(|s| s.label()),
        stream_url,
        position: controls.position,
        duration: controls.duration,
        percentage: crate::models::watch_percentage(controls.position, controls.duration),
        error: error.clone(),
    };

    if let Some(error) = error {
        return output.error(error, ExitCode::PlayerFailed);
    }
    let line = format!(
        "Stopped at {} / {}",
        format_duration(response.position),
        format_duration(response.duration)
    );
    print_or_fail(output, &response, &[line])
}

// =============================================================================
// Store Commands
// =============================================================================

pub fn history_cmd(cmd: HistoryCmd, output: &Output) -> ExitCode {
    let mut store = Store::open_default();

    if cmd.searches {
        if cmd.clear {
            store.clear_search_history();
            output.info("Search history cleared");
        }
        let history = store.search_history().to_vec();
        return print_or_fail(output, &history, &history);
    }

    if cmd.clear {
        store.clear_watch_history();
        output.info("Watch history cleared");
    }
    let now = chrono::Utc::now();
    let history = store.watch_history().to_vec();
    let lines: Vec<String> = history
        .iter()
        .map(|p| {
            format!(
                "{:<14} ep {:<14} {:>3}%  {}",
                p.drama_id,
                p.episode_id,
                p.percentage,
                format_relative_time(p.updated_at, now)
            )
        })
        .collect();
    print_or_fail(output, &history, &lines)
}

#[derive(Serialize)]
struct FavoriteEntry {
    id: String,
    title: String,
}

pub async fn favorites_cmd(ctx: &Context, output: &Output) -> ExitCode {
    let store = Store::open_default();
    let mut entries = Vec::new();
    for id in store.favorites() {
        let drama = ctx.client.drama(id).await;
        entries.push(FavoriteEntry {
            id: id.clone(),
            title: drama.title,
        });
    }
    let lines: Vec<String> = entries.iter().map(|e| format!("{:<14} {}", e.id, e.title)).collect();
    print_or_fail(output, &entries, &lines)
}

pub fn favorite_cmd(cmd: FavoriteCmd, output: &Output) -> ExitCode {
    let mut store = Store::open_default();
    let favorite = store.toggle_favorite(&cmd.id);
    let line = if favorite {
        format!("Added {} to favorites", cmd.id)
    } else {
        format!("Removed {} from favorites", cmd.id)
    };
    print_or_fail(output, FavoriteResponse { id: cmd.id, favorite }, &[line])
}

// =============================================================================
// Serve Command
// =============================================================================

pub async fn serve_cmd(cmd: ServeCmd, mut config: Config, output: &Output) -> ExitCode {
    if let Some(host) = cmd.host {
        config.server.host = host;
    }
    if let Some(port) = cmd.port {
        config.server.port = port;
    }

    output.info(format!(
        "Search proxy on http://{}:{}/api/search",
        config.server.host, config.server.port
    ));
    match crate::server::serve(&config).await {
        Ok(()) => ExitCode::Success,
        Err(e) => output.error(format!("{:#}", e), ExitCode::Error),
    }
}
