//! External player binding - mpv/VLC playback
//!
//! Each attached source is one player process. mpv is driven over its JSON
//! IPC socket (commands in, property changes and end-file events out). VLC
//! has no control channel here, so it only reports when it exits.

use serde_json::{json, Value};
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicU32, Ordering};
use thiserror::Error;
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::playback::{MediaBackend, MediaBinding, MediaErrorKind, MediaEvent, MediaSource};

/// Supported local players
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayerType {
    /// mpv media player (default, full remote control)
    #[default]
    Mpv,
    /// VLC media player
    Vlc,
}

impl PlayerType {
    /// Parse a config/CLI name ("mpv", "vlc")
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "mpv" => Some(PlayerType::Mpv),
            "vlc" => Some(PlayerType::Vlc),
            _ => None,
        }
    }

    /// Get the command name for this player
    pub fn command(&self) -> &'static str {
        match self {
            PlayerType::Vlc => {
                #[cfg(target_os = "macos")]
                if std::path::Path::new("/Applications/VLC.app").exists() {
                    return "/Applications/VLC.app/Contents/MacOS/VLC";
                }
                "vlc"
            }
            PlayerType::Mpv => "mpv",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            PlayerType::Vlc => "VLC",
            PlayerType::Mpv => "mpv",
        }
    }
}

impl std::fmt::Display for PlayerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Errors from local player operations
#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("Player '{0}' not found. Install it first.")]
    NotFound(String),
    #[error("Failed to start player: {0}")]
    StartFailed(#[from] std::io::Error),
    #[error("No playable source")]
    NoSource,
}

static SOCKET_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Launches one player process per attached source
#[derive(Debug, Clone)]
pub struct ExternalPlayer {
    player_type: PlayerType,
}

impl ExternalPlayer {
    pub fn new(player_type: PlayerType) -> Self {
        Self { player_type }
    }

    pub fn player_type(&self) -> PlayerType {
        self.player_type
    }

    /// Check if the player is available on the system
    pub async fn is_available(&self) -> bool {
        let cmd = self.player_type.command();

        // Full path (macOS app bundle)
        if cmd.starts_with('/') {
            return std::path::Path::new(cmd).exists();
        }

        Command::new("which")
            .arg(cmd)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }

    fn ipc_path(&self) -> Option<PathBuf> {
        if self.player_type != PlayerType::Mpv || !cfg!(unix) {
            return None;
        }
        let n = SOCKET_COUNTER.fetch_add(1, Ordering::Relaxed);
        Some(std::env::temp_dir().join(format!("dracin-mpv-{}-{}.sock", std::process::id(), n)))
    }

    /// Command line for a source
    pub fn build_args(&self, source: &MediaSource, ipc_path: Option<&PathBuf>) -> Vec<String> {
        let mut args = vec![source.url.clone()];

        match self.player_type {
            PlayerType::Mpv => {
                for track in &source.subtitles {
                    args.push(format!("--sub-file={}", track.url));
                }
                args.push(format!("--volume={}", (source.volume * 100.0).round()));
                if source.muted {
                    args.push("--mute=yes".to_string());
                }
                if let Some(start) = source.start {
                    args.push(format!("--start={}", start));
                }
                if let Some(path) = ipc_path {
                    args.push(format!("--input-ipc-server={}", path.display()));
                }
                // Stay alive after a failed load so the stream can be retried
                args.push("--idle=yes".to_string());
                args.push("--force-window=immediate".to_string());
                args.push("--no-terminal".to_string());
            }
            PlayerType::Vlc => {
                // VLC takes a single sidecar track
                if let Some(track) = source
                    .subtitles
                    .iter()
                    .find(|t| t.default)
                    .or(source.subtitles.first())
                {
                    args.push("--sub-file".to_string());
                    args.push(track.url.clone());
                }
                if let Some(start) = source.start {
                    args.push(format!("--start-time={}", start));
                }
                args.push("--no-video-title-show".to_string());
                args.push("--play-and-exit".to_string());
            }
        }
        args
    }

    fn spawn(&self, args: &[String]) -> Result<Child, PlayerError> {
        let mut cmd = Command::new(self.player_type.command());
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        // New session so the player never reads from or draws on our TTY
        #[cfg(unix)]
        unsafe {
            cmd.pre_exec(|| {
                libc::setsid();
                Ok(())
            });
        }

        cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PlayerError::NotFound(self.player_type.command().to_string())
            } else {
                PlayerError::StartFailed(e)
            }
        })
    }
}

impl MediaBackend for ExternalPlayer {
    type Binding = PlayerBinding;

    /// Only mpv accepts the reload commands adaptive recovery needs
    fn supports_adaptive(&self) -> bool {
        self.player_type == PlayerType::Mpv
    }

    fn attach(&mut self, source: &MediaSource) -> Result<PlayerBinding, PlayerError> {
        if source.url.is_empty() {
            return Err(PlayerError::NoSource);
        }

        let ipc_path = self.ipc_path();
        let args = self.build_args(source, ipc_path.as_ref());
        let child = self.spawn(&args)?;
        tracing::info!(player = %self.player_type, url = %source.url, "Player started");

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (kill_tx, kill_rx) = oneshot::channel();
        let mut tasks = vec![tokio::spawn(watch_process(
            self.player_type,
            child,
            kill_rx,
            event_tx.clone(),
        ))];

        let commands = match &ipc_path {
            #[cfg(unix)]
            Some(path) => {
                let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
                tasks.push(tokio::spawn(ipc::run(path.clone(), cmd_rx, event_tx)));
                Some(cmd_tx)
            }
            _ => None,
        };

        Ok(PlayerBinding {
            player_type: self.player_type,
            url: source.url.clone(),
            commands,
            events: event_rx,
            kill: Some(kill_tx),
            tasks,
            ipc_path,
        })
    }
}

/// Wait for the player to exit, or kill it on request
async fn watch_process(
    player: PlayerType,
    mut child: Child,
    kill: oneshot::Receiver<()>,
    events: mpsc::UnboundedSender<MediaEvent>,
) {
    tokio::select! {
        status = child.wait() => {
            let event = match status {
                Ok(status) if status.success() => MediaEvent::Closed,
                Ok(status) => MediaEvent::Error {
                    kind: MediaErrorKind::Other,
                    fatal: true,
                    detail: format!("{} exited with {}", player, status),
                },
                Err(e) => MediaEvent::Error {
                    kind: MediaErrorKind::Other,
                    fatal: true,
                    detail: e.to_string(),
                },
            };
            let _ = events.send(event);
        }
        _ = kill => {
            if let Err(e) = child.kill().await {
                tracing::warn!(player = %player, error = %e, "Failed to kill player");
            }
        }
    }
}

/// A running player process playing one source
pub struct PlayerBinding {
    player_type: PlayerType,
    url: String,
    commands: Option<mpsc::UnboundedSender<Value>>,
    events: mpsc::UnboundedReceiver<MediaEvent>,
    kill: Option<oneshot::Sender<()>>,
    tasks: Vec<JoinHandle<()>>,
    ipc_path: Option<PathBuf>,
}

impl PlayerBinding {
    fn send(&self, command: Value) {
        match &self.commands {
            Some(tx) => {
                if tx.send(command).is_err() {
                    tracing::debug!("Player IPC closed");
                }
            }
            None => tracing::trace!(player = %self.player_type, %command, "No control channel"),
        }
    }

    fn set_property(&self, name: &str, value: Value) {
        self.send(json!({ "command": ["set_property", name, value] }));
    }
}

impl MediaBinding for PlayerBinding {
    fn start_load(&mut self) {
        self.send(json!({ "command": ["loadfile", self.url, "replace"] }));
    }

    fn recover_media_error(&mut self) {
        // Fall back to software decoding, then reload
        self.set_property("hwdec", json!("no"));
        self.start_load();
    }

    fn play(&mut self) {
        self.set_property("pause", json!(false));
    }

    fn pause(&mut self) {
        self.set_property("pause", json!(true));
    }

    fn seek(&mut self, position: f64) {
        self.send(json!({ "command": ["seek", position, "absolute"] }));
    }

    fn set_volume(&mut self, volume: f32) {
        self.set_property("volume", json!((volume * 100.0).round()));
    }

    fn set_muted(&mut self, muted: bool) {
        self.set_property("mute", json!(muted));
    }

    fn set_fullscreen(&mut self, fullscreen: bool) {
        self.set_property("fullscreen", json!(fullscreen));
    }

    fn set_subtitles_visible(&mut self, visible: bool) {
        self.set_property("sub-visibility", json!(visible));
    }

    fn poll_event(&mut self) -> Option<MediaEvent> {
        self.events.try_recv().ok()
    }

    fn destroy(&mut self) {
        let Some(kill) = self.kill.take() else {
            return;
        };
        self.send(json!({ "command": ["quit"] }));
        self.commands = None;
        let _ = kill.send(());
        for task in self.tasks.drain(1..) {
            task.abort();
        }
        if let Some(path) = self.ipc_path.take() {
            let _ = std::fs::remove_file(path);
        }
        tracing::debug!(player = %self.player_type, "Player released");
    }
}

impl Drop for PlayerBinding {
    fn drop(&mut self) {
        self.destroy();
    }
}

/// Turn one line of mpv IPC output into an event
pub fn parse_mpv_event(line: &str) -> Option<MediaEvent> {
    let value: Value = serde_json::from_str(line).ok()?;

    match value.get("event")?.as_str()? {
        "property-change" => {
            let data = value.get("data")?;
            match value.get("name")?.as_str()? {
                "time-pos" => data.as_f64().map(MediaEvent::Position),
                "duration" => data.as_f64().map(MediaEvent::Duration),
                "demuxer-cache-time" => data.as_f64().map(MediaEvent::Buffered),
                "pause" => data.as_bool().map(|paused| {
                    if paused {
                        MediaEvent::Paused
                    } else {
                        MediaEvent::Playing
                    }
                }),
                _ => None,
            }
        }
        "end-file" => match value.get("reason").and_then(Value::as_str) {
            Some("eof") => Some(MediaEvent::Ended),
            Some("error") => {
                let detail = value
                    .get("file_error")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error")
                    .to_string();
                Some(MediaEvent::Error {
                    kind: classify_error(&detail),
                    fatal: true,
                    detail,
                })
            }
            _ => None,
        },
        _ => None,
    }
}

/// Sort a player error message into network, media or other
pub fn classify_error(detail: &str) -> MediaErrorKind {
    let detail = detail.to_lowercase();
    const NETWORK: &[&str] = &["network", "http", "connection", "timed out", "timeout", "tls", "host"];
    const MEDIA: &[&str] = &["decod", "codec", "demux", "format", "no audio or video"];

    if NETWORK.iter().any(|k| detail.contains(k)) {
        MediaErrorKind::Network
    } else if MEDIA.iter().any(|k| detail.contains(k)) {
        MediaErrorKind::Media
    } else {
        MediaErrorKind::Other
    }
}

#[cfg(unix)]
mod ipc {
    use super::*;
    use std::path::Path;
    use std::time::Duration;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::UnixStream;

    const OBSERVED: &[&str] = &["time-pos", "duration", "demuxer-cache-time", "pause"];

    async fn connect(path: &Path) -> Option<UnixStream> {
        // mpv creates the socket shortly after it starts
        for _ in 0..50 {
            if let Ok(stream) = UnixStream::connect(path).await {
                return Some(stream);
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        None
    }

    pub(super) async fn run(
        path: PathBuf,
        mut commands: mpsc::UnboundedReceiver<Value>,
        events: mpsc::UnboundedSender<MediaEvent>,
    ) {
        let Some(stream) = connect(&path).await else {
            tracing::warn!(path = %path.display(), "Could not connect to mpv IPC");
            return;
        };
        let (reader, mut writer) = stream.into_split();
        let mut lines = BufReader::new(reader).lines();

        for (id, name) in OBSERVED.iter().enumerate() {
            let line = format!("{}\n", json!({ "command": ["observe_property", id + 1, name] }));
            if writer.write_all(line.as_bytes()).await.is_err() {
                return;
            }
        }

        loop {
            tokio::select! {
                command = commands.recv() => {
                    let Some(command) = command else { break };
                    let line = format!("{}\n", command);
                    if let Err(e) = writer.write_all(line.as_bytes()).await {
                        tracing::debug!(error = %e, "mpv IPC write failed");
                        break;
                    }
                }
                line = lines.next_line() => {
                    match line {
                        Ok(Some(line)) => {
                            if let Some(event) = parse_mpv_event(&line) {
                                if events.send(event).is_err() {
                                    break;
                                }
                            }
                        }
                        _ => break,
                    }
                }
            }
        }
    }
}
