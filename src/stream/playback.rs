//! Playback view-model
//!
//! Pairs a media binding (one playing source) with transport controls,
//! server selection and subtitle track injection. The binding is produced by
//! a [`MediaBackend`]; in the app that is an external player process, in
//! tests a recording fake.
//!
//! Switching servers swaps the binding's source while the [`Controls`] state
//! (volume, mute, fullscreen, subtitle visibility) stays mounted.

use std::time::{Duration, Instant};

use crate::config::PlayerConfig;
use crate::models::{format_duration, Episode, StreamServer, Subtitle};

use super::player::PlayerError;

/// Controls hide after this long without activity while playing
pub const CONTROLS_HIDE_AFTER: Duration = Duration::from_secs(3);

/// Seconds moved by the skip back/forward controls
pub const SKIP_STEP_SECS: f64 = 10.0;

pub const ADAPTIVE_ERROR: &str = "Video stream unavailable. Please try another server.";
pub const NATIVE_ERROR: &str = "Video playback error.";

// =============================================================================
// Binding Seams
// =============================================================================

/// How a source is handed to the player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Segmented manifest driven by an adaptive-streaming binding
    Adaptive,
    /// Direct file (or a manifest the backend plays natively)
    Native,
}

impl SourceKind {
    pub fn detect(url: &str, adaptive_supported: bool) -> Self {
        if is_manifest(url) && adaptive_supported {
            SourceKind::Adaptive
        } else {
            SourceKind::Native
        }
    }
}

/// True for segmented manifests (.m3u8)
pub fn is_manifest(url: &str) -> bool {
    url.contains(".m3u8")
}

/// Everything a backend needs to start playing one source
#[derive(Debug, Clone, PartialEq)]
pub struct MediaSource {
    pub url: String,
    pub kind: SourceKind,
    /// Sidecar text tracks
    pub subtitles: Vec<Subtitle>,
    pub volume: f32,
    pub muted: bool,
    /// Position to open at, in seconds. Players apply it at load time since
    /// a seek before playback starts is dropped.
    pub start: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaErrorKind {
    Network,
    Media,
    Other,
}

/// Events reported by a binding
#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    Duration(f64),
    Position(f64),
    /// End of the buffered range, in seconds
    Buffered(f64),
    Playing,
    Paused,
    Ended,
    /// The player went away (window closed, process exited)
    Closed,
    Error {
        kind: MediaErrorKind,
        fatal: bool,
        detail: String,
    },
}

/// One playing source. Commands are fire-and-forget.
pub trait MediaBinding {
    /// Restart loading after a network failure
    fn start_load(&mut self);
    /// Try to recover from a decode failure
    fn recover_media_error(&mut self);
    fn play(&mut self);
    fn pause(&mut self);
    fn seek(&mut self, position: f64);
    fn set_volume(&mut self, volume: f32);
    fn set_muted(&mut self, muted: bool);
    fn set_fullscreen(&mut self, fullscreen: bool);
    fn set_subtitles_visible(&mut self, visible: bool);
    /// Next pending event, without blocking
    fn poll_event(&mut self) -> Option<MediaEvent>;
    /// Release the source. The binding is unusable afterwards.
    fn destroy(&mut self);
}

/// Produces bindings
pub trait MediaBackend {
    type Binding: MediaBinding;

    /// Whether segmented manifests get an adaptive-streaming binding
    fn supports_adaptive(&self) -> bool;

    fn attach(&mut self, source: &MediaSource) -> Result<Self::Binding, PlayerError>;
}

// =============================================================================
// Controls
// =============================================================================

/// Transport control state, kept across source swaps
#[derive(Debug, Clone, PartialEq)]
pub struct Controls {
    pub playing: bool,
    pub ended: bool,
    pub position: f64,
    pub duration: f64,
    pub buffered: f64,
    pub volume: f32,
    pub muted: bool,
    pub fullscreen: bool,
    pub subtitles_visible: bool,
    pub visible: bool,
    last_activity: Option<Instant>,
}

impl Controls {
    fn new(volume: f32) -> Self {
        Self {
            playing: false,
            ended: false,
            position: 0.0,
            duration: 0.0,
            buffered: 0.0,
            volume: volume.clamp(0.0, 1.0),
            muted: false,
            fullscreen: false,
            subtitles_visible: true,
            visible: true,
            last_activity: None,
        }
    }

    fn reset_timeline(&mut self) {
        self.playing = false;
        self.ended = false;
        self.position = 0.0;
        self.duration = 0.0;
        self.buffered = 0.0;
    }
}

// =============================================================================
// Playback View
// =============================================================================

pub struct PlaybackView<B: MediaBackend> {
    backend: B,
    binding: Option<B::Binding>,
    episode: Episode,
    selected: Option<usize>,
    kind: Option<SourceKind>,
    tracks: Vec<Subtitle>,
    controls: Controls,
    error: Option<String>,
    recoveries: u32,
    settings: PlayerConfig,
    control_mounts: u32,
    source_loads: u32,
    /// Start position for the next source load
    start: Option<f64>,
}

impl<B: MediaBackend> PlaybackView<B> {
    /// Mount the view: pick the first server, inject the episode's subtitle
    /// tracks and start loading
    pub fn mount(backend: B, episode: Episode, settings: PlayerConfig) -> Self {
        Self::mount_at(backend, episode, settings, 0)
    }

    /// Mount starting on a specific server (out-of-range picks the first)
    pub fn mount_at(backend: B, episode: Episode, settings: PlayerConfig, server: usize) -> Self {
        Self::mount_from(backend, episode, settings, server, None)
    }

    /// Mount on a server and open the source at `start` seconds
    pub fn mount_from(
        backend: B,
        episode: Episode,
        settings: PlayerConfig,
        server: usize,
        start: Option<f64>,
    ) -> Self {
        let selected = if server < episode.servers.len() {
            Some(server)
        } else {
            first_server(&episode)
        };
        let mut view = Self {
            backend,
            binding: None,
            selected,
            tracks: episode.subtitles.clone(),
            episode,
            kind: None,
            controls: Controls::new(settings.default_volume),
            error: None,
            recoveries: 0,
            settings,
            control_mounts: 1,
            source_loads: 0,
            start,
        };
        view.load_source();
        view
    }

    pub fn episode(&self) -> &Episode {
        &self.episode
    }

    pub fn servers(&self) -> &[StreamServer] {
        &self.episode.servers
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected_server(&self) -> Option<&StreamServer> {
        self.selected.and_then(|i| self.episode.servers.get(i))
    }

    /// Selected server URL, or the episode's default stream
    pub fn source_url(&self) -> Option<&str> {
        self.selected_server()
            .map(|s| s.url.as_str())
            .filter(|u| !u.is_empty())
            .or(self.episode.stream_url.as_deref())
            .filter(|u| !u.is_empty())
    }

    pub fn source_kind(&self) -> Option<SourceKind> {
        self.kind
    }

    /// Subtitle tracks injected at mount
    pub fn tracks(&self) -> &[Subtitle] {
        &self.tracks
    }

    pub fn controls(&self) -> &Controls {
        &self.controls
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_attached(&self) -> bool {
        self.binding.is_some()
    }

    /// How many times the control state was built (stays 1 for a view's life)
    pub fn control_mounts(&self) -> u32 {
        self.control_mounts
    }

    /// How many times a source was handed to the backend
    pub fn source_loads(&self) -> u32 {
        self.source_loads
    }

    fn load_source(&mut self) {
        self.release();
        self.error = None;
        self.recoveries = 0;
        self.controls.reset_timeline();
        let start = self.start.take().filter(|s| s.is_finite() && *s > 0.0);

        let Some(url) = self.source_url().map(str::to_string) else {
            self.kind = None;
            return;
        };

        let kind = SourceKind::detect(&url, self.backend.supports_adaptive());
        self.kind = Some(kind);
        self.source_loads += 1;

        let source = MediaSource {
            url,
            kind,
            subtitles: self.tracks.clone(),
            volume: self.controls.volume,
            muted: self.controls.muted,
            start,
        };

        match self.backend.attach(&source) {
            Ok(mut binding) => {
                binding.set_subtitles_visible(self.controls.subtitles_visible);
                if self.controls.fullscreen {
                    binding.set_fullscreen(true);
                }
                binding.play();
                self.binding = Some(binding);
            }
            Err(e) => {
                tracing::error!(url = %source.url, error = %e, "Failed to attach media source");
                self.error = Some(error_message(kind).to_string());
            }
        }
    }

    /// Switch to another server of the current episode
    pub fn select_server(&mut self, index: usize) -> bool {
        if index >= self.episode.servers.len() {
            return false;
        }
        if self.selected == Some(index) {
            return true;
        }
        self.selected = Some(index);
        self.load_source();
        true
    }

    /// Replace the episode. A different episode resets the selection to its
    /// first server; subtitle tracks stay as injected at mount.
    pub fn set_episode(&mut self, episode: Episode) {
        self.set_episode_from(episode, None);
    }

    /// Replace the episode and open it at `start` seconds. When the episode
    /// is unchanged the running source seeks instead.
    pub fn set_episode_from(&mut self, episode: Episode, start: Option<f64>) {
        let changed = episode.id != self.episode.id || episode.servers != self.episode.servers;
        self.episode = episode;
        if changed {
            self.selected = first_server(&self.episode);
            self.start = start;
            self.load_source();
        } else if let Some(position) = start {
            self.seek(position);
        }
    }

    /// Reload the current source after an error
    pub fn retry(&mut self) {
        self.load_source();
    }

    /// Drain and apply all pending binding events
    pub fn pump(&mut self) {
        while let Some(event) = self.binding.as_mut().and_then(|b| b.poll_event()) {
            self.handle_event(event);
        }
    }

    pub fn handle_event(&mut self, event: MediaEvent) {
        match event {
            MediaEvent::Duration(d) if d.is_finite() => self.controls.duration = d.max(0.0),
            MediaEvent::Duration(_) => {}
            MediaEvent::Position(p) => {
                self.controls.position = p.max(0.0);
                self.controls.ended = false;
            }
            MediaEvent::Buffered(b) => self.controls.buffered = b.max(0.0),
            MediaEvent::Playing => {
                self.controls.playing = true;
                self.controls.ended = false;
            }
            MediaEvent::Paused => self.controls.playing = false,
            MediaEvent::Ended => {
                self.controls.playing = false;
                self.controls.ended = true;
            }
            MediaEvent::Closed => {
                self.controls.playing = false;
                self.release();
            }
            MediaEvent::Error { fatal: false, kind, detail } => {
                tracing::debug!(?kind, %detail, "Non-fatal media error");
            }
            MediaEvent::Error { kind, detail, .. } => self.handle_fatal(kind, &detail),
        }
    }

    fn handle_fatal(&mut self, kind: MediaErrorKind, detail: &str) {
        if self.kind != Some(SourceKind::Adaptive) {
            tracing::error!(%detail, "Native playback error");
            self.fail(NATIVE_ERROR);
            return;
        }

        if self.recoveries >= self.settings.max_recoveries {
            tracing::error!(?kind, %detail, recoveries = self.recoveries, "Giving up on stream");
            self.fail(ADAPTIVE_ERROR);
            return;
        }

        let Some(binding) = self.binding.as_mut() else {
            return;
        };
        match kind {
            MediaErrorKind::Network => {
                tracing::error!(%detail, "Stream network error, restarting load");
                self.recoveries += 1;
                binding.start_load();
            }
            MediaErrorKind::Media => {
                tracing::error!(%detail, "Stream media error, recovering");
                self.recoveries += 1;
                binding.recover_media_error();
            }
            MediaErrorKind::Other => {
                tracing::error!(%detail, "Fatal stream error");
                self.fail(ADAPTIVE_ERROR);
            }
        }
    }

    fn fail(&mut self, message: &str) {
        self.release();
        self.controls.playing = false;
        self.error = Some(message.to_string());
    }

    // -------------------------------------------------------------------------
    // Transport Controls
    // -------------------------------------------------------------------------

    pub fn toggle_play(&mut self) {
        let Some(binding) = self.binding.as_mut() else {
            return;
        };
        if self.controls.playing {
            binding.pause();
        } else {
            binding.play();
        }
        self.controls.playing = !self.controls.playing;
    }

    pub fn seek(&mut self, position: f64) {
        let target = self.clamp_position(position);
        self.controls.position = target;
        if let Some(binding) = self.binding.as_mut() {
            binding.seek(target);
        }
    }

    /// Move relative to the current position, clamped to the timeline
    pub fn skip(&mut self, seconds: f64) {
        self.seek(self.controls.position + seconds);
    }

    pub fn skip_intro(&mut self) {
        self.skip(self.settings.skip_intro_secs);
    }

    pub fn skip_outro(&mut self) {
        self.skip(self.settings.skip_outro_secs);
    }

    fn clamp_position(&self, position: f64) -> f64 {
        let position = position.max(0.0);
        if self.controls.duration > 0.0 {
            position.min(self.controls.duration)
        } else {
            position
        }
    }

    /// Set volume (0.0 - 1.0); zero mutes
    pub fn set_volume(&mut self, volume: f32) {
        let volume = volume.clamp(0.0, 1.0);
        self.controls.volume = volume;
        self.controls.muted = volume == 0.0;
        if let Some(binding) = self.binding.as_mut() {
            binding.set_volume(volume);
            binding.set_muted(volume == 0.0);
        }
    }

    /// Unmuting restores the previous volume, or full volume if it was zero
    pub fn toggle_mute(&mut self) {
        if self.controls.muted {
            if self.controls.volume <= 0.0 {
                self.controls.volume = 1.0;
            }
            self.controls.muted = false;
            if let Some(binding) = self.binding.as_mut() {
                binding.set_volume(self.controls.volume);
                binding.set_muted(false);
            }
        } else {
            self.controls.muted = true;
            if let Some(binding) = self.binding.as_mut() {
                binding.set_muted(true);
            }
        }
    }

    pub fn toggle_fullscreen(&mut self) {
        self.controls.fullscreen = !self.controls.fullscreen;
        if let Some(binding) = self.binding.as_mut() {
            binding.set_fullscreen(self.controls.fullscreen);
        }
    }

    pub fn toggle_subtitles(&mut self) {
        self.controls.subtitles_visible = !self.controls.subtitles_visible;
        if let Some(binding) = self.binding.as_mut() {
            binding.set_subtitles_visible(self.controls.subtitles_visible);
        }
    }

    /// User activity: show controls and restart the hide timer
    pub fn touch(&mut self, now: Instant) {
        self.controls.visible = true;
        self.controls.last_activity = Some(now);
    }

    /// Hide the controls once the timer has run out while playing
    pub fn tick(&mut self, now: Instant) {
        let idle = self
            .controls
            .last_activity
            .map(|at| now.saturating_duration_since(at) >= CONTROLS_HIDE_AFTER)
            .unwrap_or(true);
        if self.controls.playing && self.controls.visible && idle {
            self.controls.visible = false;
        }
    }

    pub fn progress_percent(&self) -> f64 {
        percent(self.controls.position, self.controls.duration)
    }

    pub fn buffered_percent(&self) -> f64 {
        percent(self.controls.buffered, self.controls.duration)
    }

    /// "1:05 / 45:00"
    pub fn time_display(&self) -> String {
        format!(
            "{} / {}",
            format_duration(self.controls.position),
            format_duration(self.controls.duration)
        )
    }

    /// Destroy the binding, if any
    pub fn release(&mut self) {
        if let Some(mut binding) = self.binding.take() {
            binding.destroy();
        }
    }
}

impl<B: MediaBackend> Drop for PlaybackView<B> {
    fn drop(&mut self) {
        self.release();
    }
}

fn first_server(episode: &Episode) -> Option<usize> {
    if episode.servers.is_empty() {
        None
    } else {
        Some(0)
    }
}

fn error_message(kind: SourceKind) -> &'static str {
    match kind {
        SourceKind::Adaptive => ADAPTIVE_ERROR,
        SourceKind::Native => NATIVE_ERROR,
    }
}

fn percent(value: f64, total: f64) -> f64 {
    if total > 0.0 {
        (value / total * 100.0).clamp(0.0, 100.0)
    } else {
        0.0
    }
}
