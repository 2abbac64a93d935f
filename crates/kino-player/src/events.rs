//! Unified player events
//!
//! Every backend's native callbacks are translated into these payloads
//! before they reach client listeners. Each kind has its own listener
//! binding; there is no shared envelope.

use crate::types::{BackendType, TrackType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Client listener for one event kind.
///
/// Returning an error (or panicking) never reaches the engine; the
/// forwarder logs the fault and carries on with the next listener.
pub trait Listener<E>: Send + Sync {
    fn on_event(&self, event: &E) -> anyhow::Result<()>;
}

impl<E, F> Listener<E> for F
where
    F: Fn(&E) -> anyhow::Result<()> + Send + Sync,
{
    fn on_event(&self, event: &E) -> anyhow::Result<()> {
        self(event)
    }
}

/// Unified event kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Prepared,
    Completion,
    Error,
    StateChanged,
    BufferState,
    VideoSizeChanged,
    BitrateChanged,
    TracksChanged,
    DroppedVideoFrames,
    Advert,
    Info,
}

impl EventKind {
    pub const ALL: [EventKind; 11] = [
        EventKind::Prepared,
        EventKind::Completion,
        EventKind::Error,
        EventKind::StateChanged,
        EventKind::BufferState,
        EventKind::VideoSizeChanged,
        EventKind::BitrateChanged,
        EventKind::TracksChanged,
        EventKind::DroppedVideoFrames,
        EventKind::Advert,
        EventKind::Info,
    ];
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EventKind::Prepared => "prepared",
            EventKind::Completion => "completion",
            EventKind::Error => "error",
            EventKind::StateChanged => "state_changed",
            EventKind::BufferState => "buffer_state",
            EventKind::VideoSizeChanged => "video_size_changed",
            EventKind::BitrateChanged => "bitrate_changed",
            EventKind::TracksChanged => "tracks_changed",
            EventKind::DroppedVideoFrames => "dropped_video_frames",
            EventKind::Advert => "advert",
            EventKind::Info => "info",
        };
        write!(f, "{name}")
    }
}

/// Engine finished preparing and can start playback
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prepared {
    pub backend: BackendType,
    pub duration: Option<Duration>,
}

/// Playback reached the end of the content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Completion;

/// Unified error category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Media source could not be read or parsed
    Source,
    /// Network or HTTP failure
    Connectivity,
    /// Content protection failure
    Drm,
    /// Decoder or renderer failure
    Renderer,
    /// Content format not playable on this device
    Unsupported,
    /// Engine process died or was released
    EngineDied,
    Timeout,
    Unexpected,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Source => write!(f, "source"),
            ErrorKind::Connectivity => write!(f, "connectivity"),
            ErrorKind::Drm => write!(f, "drm"),
            ErrorKind::Renderer => write!(f, "renderer"),
            ErrorKind::Unsupported => write!(f, "unsupported"),
            ErrorKind::EngineDied => write!(f, "engine_died"),
            ErrorKind::Timeout => write!(f, "timeout"),
            ErrorKind::Unexpected => write!(f, "unexpected"),
        }
    }
}

/// Playback error reported to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerError {
    pub kind: ErrorKind,
    pub message: String,
    /// Engine-specific code, kept for diagnostics
    pub native_code: Option<i32>,
}

/// Playback state as seen by clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateChange {
    Playing,
    Paused,
    Stopped,
}

/// Buffering started or finished
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BufferState {
    Started,
    Completed,
}

/// Rendered video geometry
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VideoSize {
    pub width: u32,
    pub height: u32,
    pub rotation_degrees: i32,
    pub pixel_width_height_ratio: f32,
}

/// Bitrate of a selected track changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitrateChanged {
    pub track_id: Option<String>,
    pub track_type: TrackType,
    /// Bits per second
    pub bitrate: u64,
}

/// One track the engine exposes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackInfo {
    pub id: String,
    pub track_type: TrackType,
    pub language: Option<String>,
    pub bitrate: Option<u64>,
    pub selected: bool,
}

/// The set of available tracks changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TracksChanged {
    pub tracks: Vec<TrackInfo>,
}

/// Frames dropped by the renderer since the last report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DroppedVideoFrames {
    pub count: u32,
    pub elapsed: Duration,
}

/// Advert lifecycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AdvertEvent {
    AdvertsLoaded { breaks: usize },
    AdvertsLoadFailed { message: String },
    AdvertBreakStarted { break_id: String, adverts: usize },
    AdvertStarted { advert_id: String },
    AdvertPrepared { advert_id: String },
    AdvertEnded { advert_id: String },
    AdvertClicked { advert_id: String },
    AdvertBreakEnded { break_id: String },
    AdvertsSkipped,
}

/// Native source an informational event came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InfoSource {
    Player,
    MediaSource,
    Drm,
    Analytics,
    Video,
    Advert,
    Platform,
}

/// Raw description of a native callback: which method fired, with its
/// arguments rendered as strings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfoEvent {
    pub source: InfoSource,
    pub method: String,
    pub parameters: BTreeMap<String, String>,
}

impl InfoEvent {
    pub fn new(source: InfoSource, method: impl Into<String>) -> Self {
        Self {
            source,
            method: method.into(),
            parameters: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl ToString) -> Self {
        self.parameters.insert(key.to_string(), value.to_string());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_listener() {
        let listener = |event: &StateChange| -> anyhow::Result<()> {
            anyhow::ensure!(*event != StateChange::Stopped, "stopped");
            Ok(())
        };
        assert!(listener.on_event(&StateChange::Playing).is_ok());
        assert!(listener.on_event(&StateChange::Stopped).is_err());
    }

    #[test]
    fn test_info_event_parameters() {
        let info = InfoEvent::new(InfoSource::Analytics, "onDroppedVideoFrames")
            .with("count", 3)
            .with("elapsed_ms", 120);
        assert_eq!(info.parameters.get("count").map(String::as_str), Some("3"));
        assert_eq!(info.parameters.len(), 2);
    }

    #[test]
    fn test_advert_event_json() {
        let json = serde_json::to_value(AdvertEvent::AdvertStarted {
            advert_id: "ad-1".to_string(),
        })
        .unwrap();
        assert_eq!(json["event"], "advert_started");
        assert_eq!(json["advert_id"], "ad-1");
    }
}
