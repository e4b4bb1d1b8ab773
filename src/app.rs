//! App state and core application logic
//!
//! Manages the screen state machine, the navigation stack and the queue of
//! pending work. Key handling only mutates state and queues [`Action`]s;
//! [`App::dispatch`] turns them into spawned tasks whose results come back
//! as [`AppEvent`]s.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tokio::sync::mpsc;

use crate::api::DramaboxClient;
use crate::config::{Config, PlayerConfig, SiteConfig};
use crate::models::*;
use crate::pages::{
    CountryIndex, CountryPage, DramaPage, GenreIndex, GenrePage, HomePage, SearchPage, WatchPage,
    WatchView,
};
use crate::search::{Autocomplete, Suggestions};
use crate::store::Store;
use crate::stream::{ExternalPlayer, MediaBackend, PlaybackView};
use crate::ui::Theme;

/// Volume change per key press
const VOLUME_STEP: f32 = 0.1;

// =============================================================================
// App State Enum
// =============================================================================

/// Application state enum representing current screen
#[derive(Debug, Clone, PartialEq, Default)]
pub enum AppState {
    /// Home screen: trending, latest, top rankings
    #[default]
    Home,
    /// Search results view
    Search,
    /// Drama detail with episode list
    Detail,
    /// Genre index
    Genres,
    /// Country index
    Countries,
    /// Paginated genre or country listing
    Listing,
    /// Playback of one episode
    Watch,
    /// Watch history, favorites and past searches
    History,
}

// =============================================================================
// Input Mode
// =============================================================================

/// Current input mode for keyboard handling
#[derive(Debug, Clone, PartialEq, Default)]
pub enum InputMode {
    /// Normal navigation mode
    #[default]
    Normal,
    /// Text input mode (search box focused)
    Editing,
}

// =============================================================================
// Loading State
// =============================================================================

/// Loading state for async operations
#[derive(Debug, Clone, PartialEq, Default)]
pub enum LoadingState {
    #[default]
    Idle,
    /// Loading with optional message
    Loading(Option<String>),
    /// Visible "not available" state
    Error(String),
}

impl LoadingState {
    pub fn is_loading(&self) -> bool {
        matches!(self, LoadingState::Loading(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, LoadingState::Error(_))
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            LoadingState::Loading(Some(msg)) => Some(msg),
            LoadingState::Error(msg) => Some(msg),
            _ => None,
        }
    }
}

// =============================================================================
// Work Queue
// =============================================================================

/// Data a screen waits for
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Home,
    Drama(String),
    Genres,
    Countries,
    Genre { slug: String, page: u32 },
    Country { code: String, page: u32 },
    Search(String),
    Watch { drama_id: String, episode_id: String },
}

/// Work queued by key handling, run by [`App::dispatch`]
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Load(Request),
    /// Search input changed
    Suggest(String),
}

/// Results delivered back to the event loop
#[derive(Debug)]
pub enum AppEvent {
    Home(Box<HomePage>),
    Drama { slug: String, page: Box<DramaPage> },
    Genres(GenreIndex),
    Countries(CountryIndex),
    Listing(Box<ListingPage>),
    Search(SearchPage),
    Watch {
        drama_id: String,
        episode_id: String,
        page: Box<WatchPage>,
    },
    Suggestions(Suggestions),
}

/// Run a request against the upstream API
pub async fn fetch(request: Request, client: &DramaboxClient, site: &SiteConfig) -> AppEvent {
    match request {
        Request::Home => AppEvent::Home(Box::new(HomePage::load(client, site).await)),
        Request::Drama(slug) => {
            let page = DramaPage::load(client, site, &slug).await;
            AppEvent::Drama {
                slug,
                page: Box::new(page),
            }
        }
        Request::Genres => AppEvent::Genres(GenreIndex::load(client, site)),
        Request::Countries => AppEvent::Countries(CountryIndex::load(client, site)),
        Request::Genre { slug, page } => {
            let page = GenrePage::load(client, site, &slug, page).await;
            AppEvent::Listing(Box::new(page.into()))
        }
        Request::Country { code, page } => {
            let page = CountryPage::load(client, site, &code, page).await;
            AppEvent::Listing(Box::new(page.into()))
        }
        Request::Search(query) => AppEvent::Search(SearchPage::load(client, site, &query).await),
        Request::Watch {
            drama_id,
            episode_id,
        } => {
            let page = WatchPage::load(client, site, &drama_id, &episode_id).await;
            AppEvent::Watch {
                drama_id,
                episode_id,
                page: Box::new(page),
            }
        }
    }
}

// =============================================================================
// Selection State (per-view)
// =============================================================================

/// Selection state for list views
#[derive(Debug, Clone, Default)]
pub struct ListState {
    pub selected: usize,
    /// Scroll offset for viewport
    pub offset: usize,
    pub len: usize,
}

impl ListState {
    pub fn new(len: usize) -> Self {
        Self {
            selected: 0,
            offset: 0,
            len,
        }
    }

    pub fn up(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
            if self.selected < self.offset {
                self.offset = self.selected;
            }
        }
    }

    pub fn down(&mut self) {
        if self.len > 0 && self.selected < self.len - 1 {
            self.selected += 1;
        }
    }

    pub fn page_up(&mut self, page_size: usize) {
        self.selected = self.selected.saturating_sub(page_size);
        if self.selected < self.offset {
            self.offset = self.selected;
        }
    }

    pub fn page_down(&mut self, page_size: usize) {
        if self.len > 0 {
            self.selected = (self.selected + page_size).min(self.len - 1);
        }
    }

    pub fn first(&mut self) {
        self.selected = 0;
        self.offset = 0;
    }

    pub fn last(&mut self) {
        if self.len > 0 {
            self.selected = self.len - 1;
        }
    }

    /// Offset that keeps the selection inside a viewport of `visible_height`
    pub fn visible_offset(&self, visible_height: usize) -> usize {
        if visible_height == 0 || self.selected < self.offset {
            self.selected.min(self.offset)
        } else if self.selected >= self.offset + visible_height {
            self.selected + 1 - visible_height
        } else {
            self.offset
        }
    }

    pub fn reset(&mut self) {
        self.selected = 0;
        self.offset = 0;
    }

    /// Update length, clamping the selection
    pub fn set_len(&mut self, len: usize) {
        self.len = len;
        if len == 0 {
            self.selected = 0;
        } else if self.selected >= len {
            self.selected = len - 1;
        }
    }

    /// Select by number key ('1' = first)
    fn quick_select(&mut self, c: char) -> bool {
        let Some(n) = c.to_digit(10).filter(|n| *n > 0) else {
            return false;
        };
        let idx = n as usize - 1;
        if idx < self.len {
            self.selected = idx;
            true
        } else {
            false
        }
    }
}

// =============================================================================
// View-Specific State
// =============================================================================

/// Sections of the home screen, cycled with Tab
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HomeSection {
    #[default]
    Trending,
    Latest,
    TopToday,
    TopWeek,
}

impl HomeSection {
    pub const ALL: [HomeSection; 4] = [
        HomeSection::Trending,
        HomeSection::Latest,
        HomeSection::TopToday,
        HomeSection::TopWeek,
    ];

    pub fn next(self) -> Self {
        match self {
            HomeSection::Trending => HomeSection::Latest,
            HomeSection::Latest => HomeSection::TopToday,
            HomeSection::TopToday => HomeSection::TopWeek,
            HomeSection::TopWeek => HomeSection::Trending,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            HomeSection::Trending => "Trending",
            HomeSection::Latest => "Latest Updates",
            HomeSection::TopToday => "Top Today",
            HomeSection::TopWeek => "Top This Week",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct HomeState {
    pub page: Option<HomePage>,
    pub section: HomeSection,
    pub list: ListState,
    pub loading: LoadingState,
}

impl HomeState {
    /// Dramas of the current section
    pub fn dramas(&self) -> Vec<&Drama> {
        let Some(page) = &self.page else {
            return Vec::new();
        };
        let data = &page.data;
        match self.section {
            HomeSection::Trending => data.trending.iter().collect(),
            HomeSection::Latest => data.latest.iter().map(|u| &u.drama).collect(),
            HomeSection::TopToday => data.top_today.iter().collect(),
            HomeSection::TopWeek => data.top_week.iter().collect(),
        }
    }

    pub fn selected_drama(&self) -> Option<&Drama> {
        self.dramas().get(self.list.selected).copied()
    }

    pub fn set_section(&mut self, section: HomeSection) {
        self.section = section;
        self.list.reset();
        self.list.set_len(self.dramas().len());
    }

    fn set_page(&mut self, page: HomePage) {
        self.loading = if page.data.is_empty() {
            LoadingState::Error("Content not available".into())
        } else {
            LoadingState::Idle
        };
        self.page = Some(page);
        self.list.set_len(self.dramas().len());
    }
}

/// Search view state
#[derive(Debug, Clone, Default)]
pub struct SearchState {
    pub query: String,
    /// Cursor position in characters
    pub cursor: usize,
    /// Query whose results are shown or awaited
    pub submitted: String,
    pub results: Vec<SearchResult>,
    pub list: ListState,
    pub loading: LoadingState,
    /// Highlighted autocomplete suggestion
    pub suggestion: Option<usize>,
}

impl SearchState {
    fn byte_index(&self) -> usize {
        self.query
            .char_indices()
            .nth(self.cursor)
            .map_or(self.query.len(), |(i, _)| i)
    }

    fn char_len(&self) -> usize {
        self.query.chars().count()
    }

    pub fn insert(&mut self, c: char) {
        let idx = self.byte_index();
        self.query.insert(idx, c);
        self.cursor += 1;
    }

    /// Delete character before cursor
    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let idx = self.byte_index();
            self.query.remove(idx);
        }
    }

    /// Delete character at cursor
    pub fn delete(&mut self) {
        if self.cursor < self.char_len() {
            let idx = self.byte_index();
            self.query.remove(idx);
        }
    }

    pub fn cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        if self.cursor < self.char_len() {
            self.cursor += 1;
        }
    }

    pub fn cursor_home(&mut self) {
        self.cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.cursor = self.char_len();
    }

    pub fn clear(&mut self) {
        self.query.clear();
        self.cursor = 0;
    }

    pub fn set_query(&mut self, query: &str) {
        self.query = query.to_string();
        self.cursor_end();
    }

    /// Query split around the cursor, for rendering
    pub fn split_at_cursor(&self) -> (&str, &str) {
        self.query.split_at(self.byte_index())
    }

    pub fn set_results(&mut self, results: Vec<SearchResult>) {
        self.list.reset();
        self.list.set_len(results.len());
        self.results = results;
        self.loading = LoadingState::Idle;
    }

    pub fn selected_result(&self) -> Option<&SearchResult> {
        self.results.get(self.list.selected)
    }
}

/// Which list of the detail screen has focus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DetailFocus {
    #[default]
    Episodes,
    Related,
}

#[derive(Debug, Clone, Default)]
pub struct DetailState {
    pub slug: String,
    pub page: Option<DramaPage>,
    pub focus: DetailFocus,
    pub episodes: ListState,
    pub related: ListState,
    pub loading: LoadingState,
}

impl DetailState {
    fn loading(slug: &str) -> Self {
        Self {
            slug: slug.to_string(),
            loading: LoadingState::Loading(Some("Loading drama...".into())),
            ..Self::default()
        }
    }

    fn set_page(&mut self, page: DramaPage) {
        self.episodes = ListState::new(page.episodes.len());
        self.related = ListState::new(page.related.len());
        self.loading = LoadingState::Idle;
        self.page = Some(page);
    }

    pub fn selected_episode(&self) -> Option<&Episode> {
        self.page.as_ref()?.episodes.get(self.episodes.selected)
    }

    pub fn selected_related(&self) -> Option<&Drama> {
        self.page.as_ref()?.related.get(self.related.selected)
    }
}

/// Genre and country indexes
#[derive(Debug, Clone, Default)]
pub struct BrowseState {
    pub genres: Option<GenreIndex>,
    pub countries: Option<CountryIndex>,
    pub genre_list: ListState,
    pub country_list: ListState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListingKind {
    #[default]
    Genre,
    Country,
}

/// One page of a genre or country listing
#[derive(Debug, Clone)]
pub struct ListingPage {
    pub kind: ListingKind,
    /// Genre slug or country code
    pub key: String,
    pub heading: String,
    pub dramas: Paginated<Drama>,
}

impl From<GenrePage> for ListingPage {
    fn from(page: GenrePage) -> Self {
        Self {
            kind: ListingKind::Genre,
            key: page.slug,
            heading: page.heading,
            dramas: page.dramas,
        }
    }
}

impl From<CountryPage> for ListingPage {
    fn from(page: CountryPage) -> Self {
        Self {
            kind: ListingKind::Country,
            key: page.code,
            heading: page.heading,
            dramas: page.dramas,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ListingState {
    pub kind: ListingKind,
    pub key: String,
    pub page: u32,
    pub heading: String,
    pub dramas: Vec<Drama>,
    pub has_more: bool,
    pub list: ListState,
    pub loading: LoadingState,
}

impl ListingState {
    fn request(&self) -> Request {
        match self.kind {
            ListingKind::Genre => Request::Genre {
                slug: self.key.clone(),
                page: self.page,
            },
            ListingKind::Country => Request::Country {
                code: self.key.clone(),
                page: self.page,
            },
        }
    }

    pub fn selected_drama(&self) -> Option<&Drama> {
        self.dramas.get(self.list.selected)
    }
}

/// Playback screen state
pub struct WatchState<B: MediaBackend> {
    /// (drama id, episode id) being loaded or shown
    pub request: Option<(String, String)>,
    pub view: Option<WatchView>,
    pub playback: Option<PlaybackView<B>>,
    /// Episode sidebar
    pub episodes: ListState,
    pub loading: LoadingState,
    ended_at: Option<Instant>,
}

impl<B: MediaBackend> Default for WatchState<B> {
    fn default() -> Self {
        Self {
            request: None,
            view: None,
            playback: None,
            episodes: ListState::default(),
            loading: LoadingState::Idle,
            ended_at: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoryTab {
    #[default]
    Watched,
    Favorites,
    Searches,
}

impl HistoryTab {
    pub fn next(self) -> Self {
        match self {
            HistoryTab::Watched => HistoryTab::Favorites,
            HistoryTab::Favorites => HistoryTab::Searches,
            HistoryTab::Searches => HistoryTab::Watched,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            HistoryTab::Watched => "Continue Watching",
            HistoryTab::Favorites => "Favorites",
            HistoryTab::Searches => "Recent Searches",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct HistoryState {
    pub tab: HistoryTab,
    pub list: ListState,
}

// =============================================================================
// Main Application State
// =============================================================================

pub struct App<B: MediaBackend = ExternalPlayer> {
    pub state: AppState,
    pub nav_stack: Vec<AppState>,
    pub running: bool,
    pub input_mode: InputMode,
    /// Global error message
    pub error: Option<String>,

    pub home: HomeState,
    pub search: SearchState,
    pub detail: DetailState,
    pub browse: BrowseState,
    pub listing: ListingState,
    pub watch: WatchState<B>,
    pub history: HistoryState,

    pub store: Store,
    pub autocomplete: Autocomplete<AppEvent>,

    site: SiteConfig,
    settings: PlayerConfig,
    backend: B,
    events: mpsc::UnboundedSender<AppEvent>,
    actions: Vec<Action>,
}

impl<B: MediaBackend> App<B> {
    pub fn site(&self) -> &SiteConfig {
        &self.site
    }

    pub fn theme(&self) -> Theme {
        Theme::for_mode(self.store.theme())
    }

    /// Queued work not yet dispatched
    pub fn pending_actions(&self) -> &[Action] {
        &self.actions
    }
}

impl<B: MediaBackend + Clone> App<B> {
    /// Create the app and queue the home screen load
    pub fn new(config: &Config, store: Store, backend: B, events: mpsc::UnboundedSender<AppEvent>) -> Self {
        let mut search = SearchState::default();
        search.set_query(store.search_query());

        let mut app = Self {
            state: AppState::Home,
            nav_stack: Vec::new(),
            running: true,
            input_mode: InputMode::Normal,
            error: None,

            home: HomeState {
                loading: LoadingState::Loading(Some("Loading...".into())),
                ..HomeState::default()
            },
            search,
            detail: DetailState::default(),
            browse: BrowseState::default(),
            listing: ListingState::default(),
            watch: WatchState::default(),
            history: HistoryState::default(),

            autocomplete: Autocomplete::new(&config.search, events.clone(), AppEvent::Suggestions),
            store,
            site: config.site.clone(),
            settings: config.player.clone(),
            backend,
            events,
            actions: Vec::new(),
        };
        app.queue(Action::Load(Request::Home));
        app
    }

    fn queue(&mut self, action: Action) {
        self.actions.push(action);
    }

    /// Spawn the queued work. Suggestions go through the autocomplete
    /// debouncer; everything else becomes a task that reports back on the
    /// event channel.
    pub fn dispatch(&mut self, client: &Arc<DramaboxClient>) {
        for action in std::mem::take(&mut self.actions) {
            match action {
                Action::Suggest(query) => {
                    let client = Arc::clone(client);
                    self.autocomplete
                        .input(&query, move |q| async move { client.search(&q, 1).await.data });
                }
                Action::Load(request) => {
                    tracing::debug!(?request, "Dispatching request");
                    let client = Arc::clone(client);
                    let site = self.site.clone();
                    let events = self.events.clone();
                    tokio::spawn(async move {
                        let event = fetch(request, &client, &site).await;
                        let _ = events.send(event);
                    });
                }
            }
        }
    }

    /// Navigate to a new state, pushing current to stack
    pub fn navigate(&mut self, state: AppState) {
        if self.state != state {
            self.nav_stack.push(self.state.clone());
            self.state = state;
        }
        self.input_mode = InputMode::Normal;
    }

    /// Go back to previous state
    pub fn back(&mut self) -> bool {
        if self.input_mode == InputMode::Editing {
            self.stop_editing();
            return true;
        }

        if let Some(prev) = self.nav_stack.pop() {
            if self.state == AppState::Watch {
                self.leave_watch();
            }
            self.state = prev;
            true
        } else {
            false
        }
    }

    pub fn quit(&mut self) {
        self.save_progress();
        self.running = false;
    }

    pub fn set_error(&mut self, msg: impl Into<String>) {
        self.error = Some(msg.into());
    }

    pub fn focus_search(&mut self) {
        if self.state == AppState::Watch {
            return;
        }
        self.navigate(AppState::Search);
        self.input_mode = InputMode::Editing;
        self.search.cursor_end();
    }

    fn stop_editing(&mut self) {
        self.actions.retain(|a| !matches!(a, Action::Suggest(_)));
        self.input_mode = InputMode::Normal;
        self.search.suggestion = None;
        self.autocomplete.clear();
    }

    // -------------------------------------------------------------------------
    // Navigation Targets
    // -------------------------------------------------------------------------

    pub fn open_drama(&mut self, slug: &str) {
        self.detail = DetailState::loading(slug);
        self.queue(Action::Load(Request::Drama(slug.to_string())));
        self.navigate(AppState::Detail);
    }

    pub fn open_genres(&mut self) {
        if self.browse.genres.is_none() {
            self.queue(Action::Load(Request::Genres));
        }
        self.navigate(AppState::Genres);
    }

    pub fn open_countries(&mut self) {
        if self.browse.countries.is_none() {
            self.queue(Action::Load(Request::Countries));
        }
        self.navigate(AppState::Countries);
    }

    pub fn open_listing(&mut self, kind: ListingKind, key: &str, heading: &str) {
        self.listing = ListingState {
            kind,
            key: key.to_string(),
            page: 1,
            heading: heading.to_string(),
            loading: LoadingState::Loading(None),
            ..ListingState::default()
        };
        self.queue(Action::Load(self.listing.request()));
        self.navigate(AppState::Listing);
    }

    fn change_listing_page(&mut self, page: u32) {
        self.listing.page = page;
        self.listing.loading = LoadingState::Loading(None);
        self.queue(Action::Load(self.listing.request()));
    }

    pub fn open_history(&mut self) {
        self.history.list = ListState::new(self.history_len());
        self.navigate(AppState::History);
    }

    /// Submit the search box
    pub fn submit_search(&mut self) {
        let query = self.search.query.trim().to_string();
        self.stop_editing();
        if query.is_empty() {
            return;
        }

        self.store.set_search_query(query.as_str());
        self.store.add_to_search_history(&query);
        self.search.submitted = query.clone();
        self.search.loading = LoadingState::Loading(Some("Searching...".into()));
        self.queue(Action::Load(Request::Search(query)));
        self.navigate(AppState::Search);
    }

    /// Start (or switch) playback of an episode
    pub fn play(&mut self, drama_id: &str, episode_id: &str) {
        self.save_progress();
        self.watch.request = Some((drama_id.to_string(), episode_id.to_string()));
        self.watch.loading = LoadingState::Loading(Some("Loading episode...".into()));
        self.watch.ended_at = None;
        self.queue(Action::Load(Request::Watch {
            drama_id: drama_id.to_string(),
            episode_id: episode_id.to_string(),
        }));
        self.navigate(AppState::Watch);
    }

    fn play_neighbour(&mut self, next: bool) {
        let Some(view) = &self.watch.view else {
            return;
        };
        let target = if next { &view.next } else { &view.prev };
        if let Some(episode) = target {
            let (drama_id, episode_id) = (view.drama.id.clone(), episode.id.clone());
            self.play(&drama_id, &episode_id);
        }
    }

    // -------------------------------------------------------------------------
    // Playback
    // -------------------------------------------------------------------------

    fn start_playback(&mut self, view: WatchView) {
        self.store.set_current_drama(Some(view.drama.clone()));
        self.store.set_current_episode(Some(view.episode.clone()));

        let resume = self
            .store
            .watch_progress(&view.episode.id)
            .filter(|p| p.current_time > 0.0 && p.percentage < 95)
            .map(|p| p.current_time);

        if let Some(position) = resume {
            tracing::debug!(episode = %view.episode.id, position, "Resuming playback");
        }

        match self.watch.playback.as_mut() {
            Some(playback) if playback.episode().drama_id == view.episode.drama_id => {
                playback.set_episode_from(view.episode.clone(), resume);
            }
            _ => {
                self.watch.playback = Some(PlaybackView::mount_from(
                    self.backend.clone(),
                    view.episode.clone(),
                    self.settings.clone(),
                    0,
                    resume,
                ));
            }
        }

        if let Some(playback) = self.watch.playback.as_mut() {
            playback.touch(Instant::now());
        }

        let mut episodes = ListState::new(view.episodes.len());
        episodes.selected = view
            .episodes
            .iter()
            .position(|ep| ep.id == view.episode.id)
            .unwrap_or(0);
        self.watch.episodes = episodes;
        self.watch.loading = LoadingState::Idle;
        self.watch.ended_at = None;
        self.watch.view = Some(view);
    }

    /// Record the current position in the watch history
    fn save_progress(&mut self) {
        let Some(playback) = &self.watch.playback else {
            return;
        };
        let controls = playback.controls();
        if controls.duration <= 0.0 {
            return;
        }

        let episode = playback.episode();
        let drama_id = self
            .watch
            .view
            .as_ref()
            .map_or(episode.drama_id.as_str(), |v| v.drama.id.as_str());
        let progress = WatchProgress::new(&episode.id, drama_id, controls.position, controls.duration);
        self.store.add_watch_progress(progress);
    }

    fn leave_watch(&mut self) {
        self.save_progress();
        self.watch = WatchState::default();
    }

    /// Apply player events, auto-hide controls and advance to the next
    /// episode once the current one has ended
    pub fn tick(&mut self, now: Instant) {
        let Some(playback) = self.watch.playback.as_mut() else {
            return;
        };
        playback.pump();
        playback.tick(now);

        if !playback.controls().ended {
            self.watch.ended_at = None;
            return;
        }

        let has_next = self.watch.view.as_ref().is_some_and(|v| v.next.is_some());
        if !has_next {
            return;
        }
        let ended_at = *self.watch.ended_at.get_or_insert(now);
        let delay = Duration::from_secs(self.settings.auto_next_delay_secs);
        if now.saturating_duration_since(ended_at) >= delay {
            self.play_neighbour(true);
        }
    }

    // -------------------------------------------------------------------------
    // Async Results
    // -------------------------------------------------------------------------

    /// Apply a result from the event channel. Results for screens the user
    /// already left are dropped.
    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Home(page) => self.home.set_page(*page),
            AppEvent::Drama { slug, page } => {
                if slug == self.detail.slug {
                    self.detail.set_page(*page);
                }
            }
            AppEvent::Genres(index) => {
                self.browse.genre_list.set_len(index.genres.len());
                self.browse.genres = Some(index);
            }
            AppEvent::Countries(index) => {
                self.browse.country_list.set_len(index.countries.len());
                self.browse.countries = Some(index);
            }
            AppEvent::Listing(page) => {
                let page = *page;
                let listing = &mut self.listing;
                if page.kind != listing.kind || page.key != listing.key || page.dramas.page != listing.page {
                    return;
                }
                listing.heading = page.heading;
                listing.has_more = page.dramas.has_more;
                listing.list = ListState::new(page.dramas.data.len());
                listing.loading = if page.dramas.data.is_empty() {
                    LoadingState::Error("No dramas found".into())
                } else {
                    LoadingState::Idle
                };
                listing.dramas = page.dramas.data;
            }
            AppEvent::Search(page) => {
                if page.query == self.search.submitted {
                    self.search.set_results(page.results);
                }
            }
            AppEvent::Watch {
                drama_id,
                episode_id,
                page,
            } => {
                if self.watch.request.as_ref() != Some(&(drama_id, episode_id)) {
                    return;
                }
                match *page {
                    WatchPage::Ready(view) => self.start_playback(*view),
                    WatchPage::NotFound { message } => {
                        self.watch.playback = None;
                        self.watch.view = None;
                        self.watch.loading = LoadingState::Error(message);
                    }
                }
            }
            AppEvent::Suggestions(suggestions) => {
                if self.autocomplete.accept(suggestions) {
                    self.search.suggestion = None;
                }
            }
        }
    }

    // -------------------------------------------------------------------------
    // Keyboard Event Handling
    // -------------------------------------------------------------------------

    /// Handle keyboard event, returns true if event was consumed
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        self.error = None;

        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.quit();
            return true;
        }

        if self.input_mode == InputMode::Editing {
            self.handle_editing_key(key)
        } else {
            self.handle_normal_key(key)
        }
    }

    fn handle_editing_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Esc => {
                self.stop_editing();
                return true;
            }
            KeyCode::Enter => {
                let chosen = self
                    .search
                    .suggestion
                    .and_then(|i| self.autocomplete.suggestions().get(i))
                    .map(|s| s.slug.clone());
                match chosen {
                    Some(slug) => {
                        self.stop_editing();
                        self.open_drama(&slug);
                    }
                    None => self.submit_search(),
                }
                return true;
            }
            KeyCode::Down => {
                let count = self.autocomplete.suggestions().len();
                if count > 0 {
                    self.search.suggestion = Some(self.search.suggestion.map_or(0, |i| (i + 1).min(count - 1)));
                }
                return true;
            }
            KeyCode::Up => {
                self.search.suggestion = match self.search.suggestion {
                    Some(0) | None => None,
                    Some(i) => Some(i - 1),
                };
                return true;
            }
            KeyCode::Left => {
                self.search.cursor_left();
                return true;
            }
            KeyCode::Right => {
                self.search.cursor_right();
                return true;
            }
            KeyCode::Home => {
                self.search.cursor_home();
                return true;
            }
            KeyCode::End => {
                self.search.cursor_end();
                return true;
            }
            KeyCode::Char(c) => self.search.insert(c),
            KeyCode::Backspace => self.search.backspace(),
            KeyCode::Delete => self.search.delete(),
            _ => return false,
        }

        // Query changed; only the latest input needs a fetch
        self.search.suggestion = None;
        self.actions.retain(|a| !matches!(a, Action::Suggest(_)));
        self.queue(Action::Suggest(self.search.query.clone()));
        true
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('q') => {
                self.quit();
                return true;
            }
            KeyCode::Char('/') => {
                self.focus_search();
                return true;
            }
            KeyCode::Char('t') => {
                self.store.set_theme(self.store.theme().toggled());
                return true;
            }
            KeyCode::Esc => {
                return self.back();
            }
            _ => {}
        }

        match &self.state {
            AppState::Home => self.handle_home_key(key),
            AppState::Search => self.handle_search_key(key),
            AppState::Detail => self.handle_detail_key(key),
            AppState::Genres => self.handle_genres_key(key),
            AppState::Countries => self.handle_countries_key(key),
            AppState::Listing => self.handle_listing_key(key),
            AppState::Watch => self.handle_watch_key(key),
            AppState::History => self.handle_history_key(key),
        }
    }

    fn handle_home_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.home.list.up(),
            KeyCode::Down | KeyCode::Char('j') => self.home.list.down(),
            KeyCode::Tab => self.home.set_section(self.home.section.next()),
            KeyCode::Enter => {
                if let Some(slug) = self.home.selected_drama().map(|d| d.slug.clone()) {
                    self.open_drama(&slug);
                }
            }
            KeyCode::Char('g') => self.open_genres(),
            KeyCode::Char('c') => self.open_countries(),
            KeyCode::Char('h') => self.open_history(),
            KeyCode::Char('r') => {
                self.home.loading = LoadingState::Loading(Some("Refreshing...".into()));
                self.queue(Action::Load(Request::Home));
            }
            _ => return false,
        }
        true
    }

    fn handle_search_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.search.list.up(),
            KeyCode::Down | KeyCode::Char('j') => self.search.list.down(),
            KeyCode::PageUp => self.search.list.page_up(10),
            KeyCode::PageDown => self.search.list.page_down(10),
            KeyCode::Home => self.search.list.first(),
            KeyCode::End => self.search.list.last(),
            KeyCode::Enter => {
                if let Some(slug) = self.search.selected_result().map(|r| r.slug.clone()) {
                    self.open_drama(&slug);
                }
            }
            _ => return false,
        }
        true
    }

    fn handle_detail_key(&mut self, key: KeyEvent) -> bool {
        let list = match self.detail.focus {
            DetailFocus::Episodes => &mut self.detail.episodes,
            DetailFocus::Related => &mut self.detail.related,
        };
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => list.up(),
            KeyCode::Down | KeyCode::Char('j') => list.down(),
            KeyCode::PageUp => list.page_up(10),
            KeyCode::PageDown => list.page_down(10),
            KeyCode::Tab => {
                self.detail.focus = match self.detail.focus {
                    DetailFocus::Episodes => DetailFocus::Related,
                    DetailFocus::Related => DetailFocus::Episodes,
                };
            }
            KeyCode::Enter => match self.detail.focus {
                DetailFocus::Episodes => {
                    let target = self.detail.selected_episode().map(|ep| ep.id.clone());
                    if let Some(episode_id) = target {
                        let drama_id = self.detail.slug.clone();
                        self.play(&drama_id, &episode_id);
                    }
                }
                DetailFocus::Related => {
                    if let Some(slug) = self.detail.selected_related().map(|d| d.slug.clone()) {
                        self.open_drama(&slug);
                    }
                }
            },
            KeyCode::Char('w') => {
                let first = self
                    .detail
                    .page
                    .as_ref()
                    .and_then(|p| p.first_episode())
                    .map(|ep| ep.id.clone());
                if let Some(episode_id) = first {
                    let drama_id = self.detail.slug.clone();
                    self.play(&drama_id, &episode_id);
                }
            }
            KeyCode::Char('f') => {
                if !self.detail.slug.is_empty() {
                    let slug = self.detail.slug.clone();
                    self.store.toggle_favorite(&slug);
                }
            }
            _ => return false,
        }
        true
    }

    fn handle_genres_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.browse.genre_list.up(),
            KeyCode::Down | KeyCode::Char('j') => self.browse.genre_list.down(),
            KeyCode::Enter => {
                let genre = self
                    .browse
                    .genres
                    .as_ref()
                    .and_then(|idx| idx.genres.get(self.browse.genre_list.selected))
                    .map(|g| (g.slug.clone(), g.name.clone()));
                if let Some((slug, name)) = genre {
                    self.open_listing(ListingKind::Genre, &slug, &name);
                }
            }
            _ => return false,
        }
        true
    }

    fn handle_countries_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.browse.country_list.up(),
            KeyCode::Down | KeyCode::Char('j') => self.browse.country_list.down(),
            KeyCode::Enter => {
                let country = self
                    .browse
                    .countries
                    .as_ref()
                    .and_then(|idx| idx.countries.get(self.browse.country_list.selected))
                    .map(|c| (c.code.clone(), c.name.clone()));
                if let Some((code, name)) = country {
                    self.open_listing(ListingKind::Country, &code, &name);
                }
            }
            _ => return false,
        }
        true
    }

    fn handle_listing_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.listing.list.up(),
            KeyCode::Down | KeyCode::Char('j') => self.listing.list.down(),
            KeyCode::Enter => {
                if let Some(slug) = self.listing.selected_drama().map(|d| d.slug.clone()) {
                    self.open_drama(&slug);
                }
            }
            KeyCode::Char('n') if self.listing.has_more => {
                self.change_listing_page(self.listing.page + 1);
            }
            KeyCode::Char('p') if self.listing.page > 1 => {
                self.change_listing_page(self.listing.page - 1);
            }
            _ => return false,
        }
        true
    }

    fn handle_watch_key(&mut self, key: KeyEvent) -> bool {
        let sidebar_open = self.store.is_sidebar_open();

        // Keys that work without a mounted player
        match key.code {
            KeyCode::Char('n') => {
                self.play_neighbour(true);
                return true;
            }
            KeyCode::Char('p') => {
                self.play_neighbour(false);
                return true;
            }
            KeyCode::Char('e') => {
                self.store.toggle_sidebar();
                return true;
            }
            KeyCode::Char('j') if sidebar_open => {
                self.watch.episodes.down();
                return true;
            }
            KeyCode::Char('k') if sidebar_open => {
                self.watch.episodes.up();
                return true;
            }
            KeyCode::Enter if sidebar_open => {
                let target = self.watch.view.as_ref().and_then(|v| {
                    v.episodes
                        .get(self.watch.episodes.selected)
                        .map(|ep| (v.drama.id.clone(), ep.id.clone()))
                });
                if let Some((drama_id, episode_id)) = target {
                    self.play(&drama_id, &episode_id);
                }
                return true;
            }
            _ => {}
        }

        let Some(playback) = self.watch.playback.as_mut() else {
            return false;
        };
        playback.touch(Instant::now());

        match key.code {
            KeyCode::Char(' ') => playback.toggle_play(),
            KeyCode::Left => playback.skip(-SKIP_STEP),
            KeyCode::Right => playback.skip(SKIP_STEP),
            KeyCode::Char('i') => playback.skip_intro(),
            KeyCode::Char('o') => playback.skip_outro(),
            KeyCode::Up => {
                let volume = playback.controls().volume;
                playback.set_volume(volume + VOLUME_STEP);
            }
            KeyCode::Down => {
                let volume = playback.controls().volume;
                playback.set_volume(volume - VOLUME_STEP);
            }
            KeyCode::Char('m') => playback.toggle_mute(),
            KeyCode::Char('f') => playback.toggle_fullscreen(),
            KeyCode::Char('c') => playback.toggle_subtitles(),
            KeyCode::Char('r') => playback.retry(),
            KeyCode::Char(c @ '1'..='9') => {
                let idx = (c as usize) - ('1' as usize);
                playback.select_server(idx);
            }
            _ => return false,
        }
        true
    }

    fn history_len(&self) -> usize {
        match self.history.tab {
            HistoryTab::Watched => self.store.watch_history().len(),
            HistoryTab::Favorites => self.store.favorites().len(),
            HistoryTab::Searches => self.store.search_history().len(),
        }
    }

    fn handle_history_key(&mut self, key: KeyEvent) -> bool {
        let selected = self.history.list.selected;
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.history.list.up(),
            KeyCode::Down | KeyCode::Char('j') => self.history.list.down(),
            KeyCode::Tab => {
                self.history.tab = self.history.tab.next();
                self.history.list = ListState::new(self.history_len());
            }
            KeyCode::Char(c @ '1'..='9') => {
                self.history.list.quick_select(c);
            }
            KeyCode::Enter => match self.history.tab {
                HistoryTab::Watched => {
                    let target = self
                        .store
                        .watch_history()
                        .get(selected)
                        .filter(|p| !p.drama_id.is_empty())
                        .map(|p| (p.drama_id.clone(), p.episode_id.clone()));
                    if let Some((drama_id, episode_id)) = target {
                        self.play(&drama_id, &episode_id);
                    }
                }
                HistoryTab::Favorites => {
                    if let Some(id) = self.store.favorites().get(selected).cloned() {
                        self.open_drama(&id);
                    }
                }
                HistoryTab::Searches => {
                    if let Some(query) = self.store.search_history().get(selected).cloned() {
                        self.search.set_query(&query);
                        self.submit_search();
                    }
                }
            },
            KeyCode::Char('x') => {
                match self.history.tab {
                    HistoryTab::Watched => self.store.clear_watch_history(),
                    HistoryTab::Searches => self.store.clear_search_history(),
                    HistoryTab::Favorites => {
                        if let Some(id) = self.store.favorites().get(selected).cloned() {
                            self.store.toggle_favorite(&id);
                        }
                    }
                }
                self.history.list.set_len(self.history_len());
            }
            _ => return false,
        }
        true
    }
}

/// Seconds skipped by the arrow keys
const SKIP_STEP: f64 = crate::stream::playback::SKIP_STEP_SECS;

// =============================================================================
// Unit Tests
// =============================================================================
