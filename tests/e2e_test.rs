//! End-to-end flow tests
//!
//! Drive the TUI state machine against a mocked upstream: keys queue work,
//! `dispatch` runs it, results come back over the event channel.

mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use common::FakeBackend;
use crossterm::event::{KeyCode, KeyEvent};
use dracin::api::DramaboxClient;
use dracin::app::{App, AppEvent, AppState, LoadingState};
use dracin::config::Config;
use dracin::pages::EPISODE_NOT_FOUND;
use dracin::store::Store;
use dracin::stream::{MediaEvent, SourceKind};
use mockito::{Matcher, Server, ServerGuard};
use tokio::sync::mpsc;

// =============================================================================
// Mock Upstream
// =============================================================================

const BOOKS: &str = r#"[
    {
        "bookId": "41000102345",
        "bookName": "The CEO's Hidden Wife",
        "coverWap": "https://img.example/ceo-wap.jpg",
        "introduction": "A contract marriage turns real.",
        "chapterCount": 2,
        "playCount": "12.5K",
        "tags": ["Romance", "CEO"]
    },
    {
        "bookId": "41000100001",
        "bookName": "Revenge of the Heiress",
        "coverWap": "https://img.example/heiress.jpg",
        "chapterCount": 60,
        "playCount": "3M"
    }
]"#;

fn episodes_body() -> String {
    let episode = |id: &str, index: u32| {
        format!(
            r#"{{
                "chapterId": "{id}",
                "chapterIndex": {index},
                "chapterName": "EP {number}",
                "cdnList": [{{
                    "cdnDomain": "cdn-a",
                    "videoPathList": [{{ "quality": 720, "videoPath": "https://cdn-a/{id}-720.m3u8" }}]
                }}]
            }}"#,
            id = id,
            index = index,
            number = index + 1
        )
    };
    format!("[{}, {}]", episode("c1", 0), episode("c2", 1))
}

async fn mock_upstream(server: &mut ServerGuard) {
    for (path, body) in [
        ("/api/dramabox/foryou", "[]"),
        ("/api/dramabox/latest", "[]"),
        ("/api/dramabox/trending", BOOKS),
        ("/api/dramabox/search", BOOKS),
    ] {
        server
            .mock("GET", path)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await;
    }

    server
        .mock("GET", "/api/dramabox/allepisode")
        .match_query(Matcher::UrlEncoded("bookId".into(), "41000102345".into()))
        .with_status(200)
        .with_body(episodes_body())
        .create_async()
        .await;
}

// =============================================================================
// Harness
// =============================================================================

struct Harness {
    app: App<FakeBackend>,
    backend: FakeBackend,
    client: Arc<DramaboxClient>,
    events: mpsc::UnboundedReceiver<AppEvent>,
}

impl Harness {
    fn new(base_url: &str) -> Self {
        let backend = FakeBackend::new();
        let (tx, events) = mpsc::unbounded_channel();
        let app = App::new(&Config::default(), Store::in_memory(), backend.clone(), tx);
        Self {
            app,
            backend,
            client: Arc::new(DramaboxClient::with_base_url(base_url)),
            events,
        }
    }

    fn press(&mut self, code: KeyCode) {
        self.app.handle_key(KeyEvent::from(code));
    }

    fn type_text(&mut self, text: &str) {
        for c in text.chars() {
            self.press(KeyCode::Char(c));
        }
    }

    /// Dispatch queued work and apply the next result
    async fn settle(&mut self) {
        self.app.dispatch(&self.client);
        let event = tokio::time::timeout(Duration::from_secs(30), self.events.recv())
            .await
            .expect("timed out waiting for a result")
            .expect("event channel closed");
        self.app.handle_event(event);
    }
}

// =============================================================================
// Flows
// =============================================================================

#[tokio::test]
async fn test_search_to_watch_flow() {
    let mut server = Server::new_async().await;
    mock_upstream(&mut server).await;
    let mut h = Harness::new(&server.url());

    // Home
    h.settle().await;
    assert_eq!(h.app.home.loading, LoadingState::Idle);
    assert_eq!(h.app.home.dramas().len(), 2);

    // Search
    h.press(KeyCode::Char('/'));
    h.type_text("ceo");
    h.press(KeyCode::Enter);
    h.settle().await;

    assert_eq!(h.app.state, AppState::Search);
    assert_eq!(h.app.search.results.len(), 2);
    assert_eq!(h.app.store.search_history(), ["ceo"]);
    assert!(h.app.autocomplete.suggestions().is_empty());

    // Detail
    h.press(KeyCode::Enter);
    h.settle().await;

    assert_eq!(h.app.state, AppState::Detail);
    let page = h.app.detail.page.as_ref().unwrap();
    assert_eq!(page.drama.title, "The CEO's Hidden Wife");
    assert_eq!(page.meta.title, "The CEO's Hidden Wife | Rizal Dracin");
    assert_eq!(page.episodes.len(), 2);
    assert_eq!(page.related.len(), 2);

    // Watch
    h.press(KeyCode::Enter);
    h.settle().await;

    assert_eq!(h.app.state, AppState::Watch);
    let view = h.app.watch.view.as_ref().unwrap();
    assert_eq!(view.episode.id, "c1");
    assert_eq!(view.meta.title, "The CEO's Hidden Wife Episode 1 - Watch Now | Rizal Dracin");
    assert_eq!(view.next.as_ref().unwrap().id, "c2");

    let sources = h.backend.sources();
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0].url, "https://cdn-a/c1-720.m3u8");
    assert_eq!(sources[0].kind, SourceKind::Adaptive);

    h.backend.push_event(MediaEvent::Duration(120.0));
    h.backend.push_event(MediaEvent::Position(60.0));
    h.backend.push_event(MediaEvent::Playing);
    h.app.tick(Instant::now());

    // Next episode keeps the player, records progress of the previous one
    h.press(KeyCode::Char('n'));
    h.settle().await;

    assert_eq!(h.app.watch.view.as_ref().unwrap().episode.id, "c2");
    assert_eq!(h.app.store.watch_progress("c1").unwrap().percentage, 50);
    let sources = h.backend.sources();
    assert_eq!(sources.len(), 2);
    assert_eq!(sources[1].url, "https://cdn-a/c2-720.m3u8");
    assert_eq!(h.app.watch.playback.as_ref().unwrap().control_mounts(), 1);

    // Switching destroyed the first binding, leaving destroys the second
    h.press(KeyCode::Esc);
    assert_eq!(h.app.state, AppState::Detail);
    assert!(h.app.watch.playback.is_none());
    assert_eq!(h.backend.count("destroy"), 2);
}

#[tokio::test]
async fn test_autocomplete_through_dispatch() {
    let mut server = Server::new_async().await;
    mock_upstream(&mut server).await;
    let mut h = Harness::new(&server.url());
    h.settle().await;

    h.press(KeyCode::Char('/'));
    h.type_text("ce");
    h.settle().await;

    assert_eq!(h.app.autocomplete.suggestions().len(), 2);

    // Down + Enter opens the highlighted suggestion
    h.press(KeyCode::Down);
    h.press(KeyCode::Enter);
    assert_eq!(h.app.state, AppState::Detail);
    assert_eq!(h.app.detail.slug, "41000102345");
    assert!(h.app.autocomplete.suggestions().is_empty());
}

#[tokio::test]
async fn test_unreachable_upstream_degrades() {
    let mut h = Harness::new("http://127.0.0.1:9");

    h.settle().await;
    assert_eq!(h.app.home.loading, LoadingState::Error("Content not available".into()));

    h.app.open_drama("41000102345");
    h.settle().await;
    let page = h.app.detail.page.as_ref().unwrap();
    assert_eq!(page.drama.title, "Drama 41000102345");
    assert!(page.episodes.is_empty());

    // Nothing to play
    h.press(KeyCode::Char('w'));
    assert_eq!(h.app.state, AppState::Detail);

    h.app.play("41000102345", "c1");
    h.settle().await;
    assert_eq!(h.app.watch.loading, LoadingState::Error(EPISODE_NOT_FOUND.into()));
    assert!(h.backend.sources().is_empty());
}
