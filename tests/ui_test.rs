//! Rendering tests
//!
//! Draw the whole app into a ratatui TestBackend and check what each screen
//! shows for a given state.

mod common;

use common::{drama, episode, FakeBackend};
use dracin::app::{App, AppEvent, AppState, ListingKind, ListingPage};
use dracin::config::Config;
use dracin::models::{HomeData, Paginated, SearchKind, SearchResult, WatchProgress};
use dracin::pages::{DramaPage, HomePage, PageMeta, SearchPage, WatchPage};
use dracin::search::Suggestions;
use dracin::store::Store;
use dracin::stream::MediaEvent;
use dracin::ui::{self, Theme};
use ratatui::{backend::TestBackend, Terminal};
use tokio::sync::mpsc;

// =============================================================================
// Helpers
// =============================================================================

fn test_app() -> (App<FakeBackend>, FakeBackend) {
    let backend = FakeBackend::new();
    // Nothing reads the channel: results are fed through handle_event
    let (tx, _rx) = mpsc::unbounded_channel();
    let app = App::new(&Config::default(), Store::in_memory(), backend.clone(), tx);
    (app, backend)
}

fn key(c: char) -> crossterm::event::KeyEvent {
    crossterm::event::KeyEvent::from(crossterm::event::KeyCode::Char(c))
}

/// Render the app and return the screen as lines of text
fn render(app: &App<FakeBackend>, width: u16, height: u16) -> Vec<String> {
    let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
    terminal.draw(|frame| ui::render(frame, app)).unwrap();

    terminal
        .backend()
        .buffer()
        .content()
        .chunks(width as usize)
        .map(|row| row.iter().map(|cell| cell.symbol()).collect())
        .collect()
}

fn screen(app: &App<FakeBackend>) -> String {
    render(app, 100, 30).join("\n")
}

fn home_page(app: &App<FakeBackend>, data: HomeData) -> AppEvent {
    AppEvent::Home(Box::new(HomePage {
        meta: PageMeta::new(app.site(), None, None),
        data,
    }))
}

fn result(id: &str, title: &str) -> SearchResult {
    SearchResult {
        id: id.to_string(),
        slug: id.to_string(),
        title: title.to_string(),
        poster: String::new(),
        year: 2024,
        kind: SearchKind::Drama,
        rating: 0.0,
    }
}

// =============================================================================
// Home
// =============================================================================

#[test]
fn test_home_loading_then_trending() {
    let (mut app, _) = test_app();

    let text = screen(&app);
    assert!(text.contains("Loading..."));
    assert!(text.contains("RIZAL DRACIN"));
    assert!(text.contains("NORMAL"));

    let data = HomeData {
        trending: vec![drama("d1", "The CEO's Secret Wife"), drama("d2", "Revenge Bride")],
        ..HomeData::default()
    };
    app.handle_event(home_page(&app, data));

    let text = screen(&app);
    assert!(!text.contains("Loading..."));
    assert!(text.contains("TRENDING"));
    assert!(text.contains("The CEO's Secret Wife"));
    assert!(text.contains("Revenge Bride"));
    // Preview of the selected drama
    assert!(text.contains("INFO"));
}

#[test]
fn test_home_unavailable() {
    let (mut app, _) = test_app();
    app.handle_event(home_page(&app, HomeData::default()));

    assert!(screen(&app).contains("Content not available"));
}

#[test]
fn test_home_section_tab() {
    let (mut app, _) = test_app();
    let data = HomeData {
        trending: vec![drama("d1", "Trending One")],
        top_today: vec![drama("d2", "Daily Winner")],
        ..HomeData::default()
    };
    app.handle_event(home_page(&app, data));

    app.handle_key(crossterm::event::KeyEvent::from(crossterm::event::KeyCode::Tab));
    let text = screen(&app);
    assert!(text.contains("LATEST UPDATES"));
    assert!(text.contains("Nothing here yet"));

    app.handle_key(crossterm::event::KeyEvent::from(crossterm::event::KeyCode::Tab));
    let text = screen(&app);
    assert!(text.contains("TOP TODAY"));
    assert!(text.contains(" 1. Daily Winner"));
}

// =============================================================================
// Search
// =============================================================================

#[test]
fn test_suggestion_dropdown_while_editing() {
    let (mut app, _) = test_app();
    app.handle_key(key('/'));
    for c in "ceo".chars() {
        app.handle_key(key(c));
    }

    let text = screen(&app);
    assert!(text.contains("INSERT"));
    assert!(text.contains("ceo│"));
    assert!(!text.contains("SUGGESTIONS"));

    // Fresh app: no input has been debounced or cancelled yet
    app.handle_event(AppEvent::Suggestions(Suggestions {
        generation: 0,
        query: "ceo".into(),
        results: vec![result("d1", "CEO Returns"), result("d2", "CEO in Love")],
    }));

    let text = screen(&app);
    assert!(text.contains("SUGGESTIONS"));
    assert!(text.contains("CEO Returns (2024)"));
    assert!(text.contains("CEO in Love (2024)"));

    app.handle_key(crossterm::event::KeyEvent::from(crossterm::event::KeyCode::Esc));
    assert!(!screen(&app).contains("SUGGESTIONS"));
}

#[test]
fn test_search_results() {
    let (mut app, _) = test_app();
    app.handle_key(key('/'));
    for c in "wife".chars() {
        app.handle_key(key(c));
    }
    app.handle_key(crossterm::event::KeyEvent::from(crossterm::event::KeyCode::Enter));
    assert_eq!(app.state, AppState::Search);
    assert!(screen(&app).contains("Searching..."));

    app.handle_event(AppEvent::Search(SearchPage {
        meta: PageMeta::new(app.site(), Some("Search"), None),
        query: "wife".into(),
        results: vec![result("d1", "Hidden Wife"), result("d2", "Runaway Wife")],
    }));

    let text = screen(&app);
    assert!(text.contains("RESULTS FOR \"wife\" (2)"));
    assert!(text.contains("▸ Hidden Wife"));
    assert!(text.contains("Runaway Wife"));
}

#[test]
fn test_search_no_results() {
    let (mut app, _) = test_app();
    app.handle_key(key('/'));
    app.handle_key(key('z'));
    app.handle_key(crossterm::event::KeyEvent::from(crossterm::event::KeyCode::Enter));

    app.handle_event(AppEvent::Search(SearchPage {
        meta: PageMeta::new(app.site(), Some("Search"), None),
        query: "z".into(),
        results: Vec::new(),
    }));

    assert!(screen(&app).contains("No results found"));
}

// =============================================================================
// Detail
// =============================================================================

fn drama_event(app: &App<FakeBackend>, slug: &str) -> AppEvent {
    let drama = drama(slug, "Ceo Wife");
    AppEvent::Drama {
        slug: slug.to_string(),
        page: Box::new(DramaPage {
            meta: PageMeta::new(app.site(), Some(&drama.title), None),
            drama,
            episodes: vec![episode(slug, "e1", 1), episode(slug, "e2", 2)],
            related: vec![dracin::Drama {
                year: 2023,
                ..common::drama("d9", "Another Story")
            }],
        }),
    }
}

#[test]
fn test_detail_page() {
    let (mut app, _) = test_app();
    app.open_drama("d1");
    assert!(screen(&app).contains("DRAMA"));

    app.handle_event(drama_event(&app, "d1"));

    let text = screen(&app);
    assert!(text.contains("Ceo Wife"));
    assert!(text.contains("Ceo Wife synopsis"));
    assert!(text.contains("EPISODES (2)"));
    assert!(text.contains("▸ Episode 1"));
    assert!(text.contains("Episode 2"));
    assert!(text.contains("RELATED"));
    assert!(text.contains("Another Story  2023"));
    assert!(!text.contains("♥"));
}

#[test]
fn test_detail_favorite_marker() {
    let (mut app, _) = test_app();
    app.open_drama("d1");
    app.handle_event(drama_event(&app, "d1"));

    app.handle_key(key('f'));
    assert!(screen(&app).contains("♥ Ceo Wife"));

    app.handle_key(key('f'));
    assert!(!screen(&app).contains("♥"));
}

// =============================================================================
// Listing
// =============================================================================

#[test]
fn test_genre_listing() {
    let (mut app, _) = test_app();
    app.open_listing(ListingKind::Genre, "romance", "Romance");

    app.handle_event(AppEvent::Listing(Box::new(ListingPage {
        kind: ListingKind::Genre,
        key: "romance".into(),
        heading: "Romance".into(),
        dramas: Paginated {
            data: vec![drama("d1", "Love in Seoul"), drama("d2", "Spring Vow")],
            page: 1,
            total_pages: 1,
            total_items: 2,
            has_more: false,
        },
    })));

    let text = screen(&app);
    assert!(text.contains("ROMANCE · PAGE 1"));
    assert!(!text.contains("n:next"));
    assert!(text.contains("Love in Seoul"));
    assert!(text.contains("Spring Vow"));
}

// =============================================================================
// Watch
// =============================================================================

fn watch_event(app: &App<FakeBackend>, episode_id: &str) -> AppEvent {
    let episodes = vec![episode("d1", "e1", 1), episode("d1", "e2", 2)];
    AppEvent::Watch {
        drama_id: "d1".into(),
        episode_id: episode_id.into(),
        page: Box::new(WatchPage::compose(app.site(), drama("d1", "Ceo Wife"), episodes, episode_id)),
    }
}

#[test]
fn test_watch_screen() {
    let (mut app, backend) = test_app();
    app.play("d1", "e1");
    assert!(screen(&app).contains("Loading episode..."));

    app.handle_event(watch_event(&app, "e1"));
    backend.push_event(MediaEvent::Duration(200.0));
    backend.push_event(MediaEvent::Position(50.0));
    backend.push_event(MediaEvent::Playing);
    app.tick(std::time::Instant::now());

    let text = screen(&app);
    assert!(text.contains("▶ Ceo Wife · Episode 1"));
    assert!(text.contains("▶ Playing"));
    assert!(text.contains("0:50 / 3:20"));
    assert!(text.contains("[1] cdn-a (720p)"));
    assert!(text.contains("[2] cdn-b (720p)"));
    assert!(text.contains("HLS"));
    assert!(text.contains("n: Episode 2 ▸"));
}

#[test]
fn test_watch_paused_and_muted() {
    let (mut app, backend) = test_app();
    app.play("d1", "e1");
    app.handle_event(watch_event(&app, "e1"));
    backend.push_event(MediaEvent::Playing);
    app.tick(std::time::Instant::now());
    assert!(screen(&app).contains("▶ Playing"));

    app.handle_key(key(' '));
    app.handle_key(key('m'));

    let text = screen(&app);
    assert!(text.contains("Paused"));
    assert!(text.contains("Muted"));
}

#[test]
fn test_watch_episode_sidebar() {
    let (mut app, _) = test_app();
    app.play("d1", "e2");
    app.handle_event(watch_event(&app, "e2"));
    assert!(!screen(&app).contains("EPISODES (2)"));

    app.handle_key(key('e'));
    let text = screen(&app);
    assert!(text.contains("EPISODES (2)"));
    assert!(text.contains("▸ Episode 2"));
    assert!(text.contains("◂ p: Episode 1"));
}

#[test]
fn test_watch_not_found() {
    let (mut app, _) = test_app();
    app.play("d1", "missing");

    app.handle_event(AppEvent::Watch {
        drama_id: "d1".into(),
        episode_id: "missing".into(),
        page: Box::new(WatchPage::compose(app.site(), drama("d1", "Ceo Wife"), Vec::new(), "missing")),
    });

    assert!(screen(&app).contains("Episode not found."));
}

// =============================================================================
// History, Errors, Theme
// =============================================================================

#[test]
fn test_history_screen() {
    let (mut app, _) = test_app();
    app.store.add_watch_progress(WatchProgress::new("e1", "d1", 60.0, 120.0));
    app.handle_key(key('h'));
    assert_eq!(app.state, AppState::History);

    let text = screen(&app);
    assert!(text.contains("Continue Watching"));
    assert!(text.contains("d1 · e1 ·  50% █████░░░░░"));
}

#[test]
fn test_error_popup() {
    let (mut app, _) = test_app();
    app.set_error("Upstream unreachable");

    let text = screen(&app);
    assert!(text.contains("ERROR"));
    assert!(text.contains("Upstream unreachable"));

    // Any key dismisses it
    app.handle_key(key('j'));
    assert!(!screen(&app).contains("Upstream unreachable"));
}

#[test]
fn test_theme_toggle_repaints_background() {
    let (mut app, _) = test_app();
    let cells = |app: &App<FakeBackend>| {
        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        terminal.draw(|frame| ui::render(frame, app)).unwrap();
        terminal.backend().buffer().content().to_vec()
    };

    let dark = cells(&app);
    assert!(dark.iter().any(|c| c.bg == Theme::dark().background));

    app.handle_key(key('t'));
    let light = cells(&app);
    assert!(light.iter().any(|c| c.bg == Theme::light().background));
    assert!(!light.iter().any(|c| c.bg == Theme::dark().background));
}

#[test]
fn test_renders_at_any_size() {
    let (mut app, _) = test_app();
    app.handle_event(home_page(
        &app,
        HomeData {
            trending: vec![drama("d1", "A Very Long Drama Title That Will Not Fit Anywhere")],
            ..HomeData::default()
        },
    ));
    app.play("d1", "e1");
    app.handle_event(watch_event(&app, "e1"));

    for (width, height) in [(80, 24), (200, 50), (20, 5)] {
        let lines = render(&app, width, height);
        assert_eq!(lines.len(), height as usize);
    }
}
