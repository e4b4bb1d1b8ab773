//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use dracin::models::{Drama, Episode, StreamServer, StreamType, Subtitle};
use dracin::stream::{MediaBackend, MediaBinding, MediaEvent, MediaSource, PlayerError};

// =============================================================================
// Recording Media Backend
// =============================================================================

/// What the fake player saw, shared between the backend and its bindings
#[derive(Debug, Default)]
pub struct Recording {
    pub sources: Vec<MediaSource>,
    pub calls: Vec<String>,
    pub events: VecDeque<MediaEvent>,
}

/// Backend whose bindings record every command instead of playing
#[derive(Clone, Default)]
pub struct FakeBackend {
    pub recording: Arc<Mutex<Recording>>,
    /// Pretend segmented manifests are unsupported (VLC)
    pub native_only: bool,
    /// Refuse to attach, as if the player binary were missing
    pub fail_attach: bool,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<String> {
        self.recording.lock().unwrap().calls.clone()
    }

    pub fn sources(&self) -> Vec<MediaSource> {
        self.recording.lock().unwrap().sources.clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }

    /// Queue an event for the current binding to report
    pub fn push_event(&self, event: MediaEvent) {
        self.recording.lock().unwrap().events.push_back(event);
    }
}

pub struct FakeBinding {
    recording: Arc<Mutex<Recording>>,
}

impl FakeBinding {
    fn record(&self, call: impl Into<String>) {
        self.recording.lock().unwrap().calls.push(call.into());
    }
}

impl MediaBinding for FakeBinding {
    fn start_load(&mut self) {
        self.record("start_load");
    }
    fn recover_media_error(&mut self) {
        self.record("recover_media_error");
    }
    fn play(&mut self) {
        self.record("play");
    }
    fn pause(&mut self) {
        self.record("pause");
    }
    fn seek(&mut self, position: f64) {
        self.record(format!("seek {}", position));
    }
    fn set_volume(&mut self, volume: f32) {
        self.record(format!("volume {}", volume));
    }
    fn set_muted(&mut self, muted: bool) {
        self.record(format!("muted {}", muted));
    }
    fn set_fullscreen(&mut self, fullscreen: bool) {
        self.record(format!("fullscreen {}", fullscreen));
    }
    fn set_subtitles_visible(&mut self, visible: bool) {
        self.record(format!("subtitles {}", visible));
    }
    fn poll_event(&mut self) -> Option<MediaEvent> {
        self.recording.lock().unwrap().events.pop_front()
    }
    fn destroy(&mut self) {
        self.record("destroy");
    }
}

impl MediaBackend for FakeBackend {
    type Binding = FakeBinding;

    fn supports_adaptive(&self) -> bool {
        !self.native_only
    }

    fn attach(&mut self, source: &MediaSource) -> Result<FakeBinding, PlayerError> {
        if self.fail_attach {
            return Err(PlayerError::NotFound("fake".into()));
        }
        self.recording.lock().unwrap().sources.push(source.clone());
        Ok(FakeBinding {
            recording: Arc::clone(&self.recording),
        })
    }
}

// =============================================================================
// Catalog Fixtures
// =============================================================================

pub fn server(id: &str, url: &str) -> StreamServer {
    StreamServer {
        id: id.to_string(),
        name: id.to_string(),
        url: url.to_string(),
        quality: Some("720p".to_string()),
        stream_type: if url.contains(".m3u8") {
            StreamType::Hls
        } else {
            StreamType::Mp4
        },
    }
}

/// Episode with an HLS and an MP4 server
pub fn episode(drama_id: &str, id: &str, number: u32) -> Episode {
    Episode {
        id: id.to_string(),
        drama_id: drama_id.to_string(),
        number,
        season: None,
        title: None,
        thumbnail: None,
        duration: 0,
        stream_url: None,
        servers: vec![
            server("cdn-a", &format!("https://cdn-a.example/{}/index.m3u8", id)),
            server("cdn-b", &format!("https://cdn-b.example/{}/720.mp4", id)),
        ],
        subtitles: Vec::new(),
        release_date: None,
    }
}

pub fn subtitle(language: &str) -> Subtitle {
    Subtitle {
        id: language.to_string(),
        language: language.to_string(),
        label: language.to_uppercase(),
        url: format!("https://subs.example/{}.vtt", language),
        default: language == "en",
    }
}

pub fn drama(id: &str, title: &str) -> Drama {
    let mut drama = Drama::stub(id);
    drama.title = title.to_string();
    drama.synopsis = format!("{} synopsis", title);
    drama.total_episodes = 3;
    drama
}
