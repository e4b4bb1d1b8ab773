//! Playback infrastructure
//!
//! - Playback: view-model pairing a media binding with transport controls
//! - Player: mpv/VLC process binding

pub mod playback;
pub mod player;

pub use playback::{
    Controls, MediaBackend, MediaBinding, MediaErrorKind, MediaEvent, MediaSource, PlaybackView,
    SourceKind,
};
pub use player::{ExternalPlayer, PlayerBinding, PlayerError, PlayerType};
