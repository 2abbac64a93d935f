//! Backend-native event payloads
//!
//! One enum per native callback source. Engines report through a
//! [`NativeEventSink`](crate::forwarder::NativeEventSink); only the forwarder
//! turns these into client-facing events.

use crate::types::TrackType;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Streaming engine playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NativePlaybackState {
    Idle,
    Buffering,
    Ready,
    Ended,
}

/// Which part of the streaming engine failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NativeErrorType {
    Source,
    Renderer,
    Unexpected,
    Remote,
    OutOfMemory,
}

/// Underlying cause attached to a streaming engine error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cause", rename_all = "snake_case")]
pub enum NativeErrorCause {
    HttpStatus { code: u16 },
    Connection,
    ParserFailure,
    BehindLiveWindow,
    DrmSession,
    DecoderInit,
    UnsupportedFormat,
    Timeout,
    Other,
}

/// Streaming engine error payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativePlaybackError {
    pub error_type: NativeErrorType,
    pub cause: NativeErrorCause,
    pub message: String,
}

/// Track as the streaming engine describes it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeTrack {
    pub id: String,
    pub track_type: TrackType,
    pub language: Option<String>,
    pub bitrate: Option<u64>,
    pub selected: bool,
}

/// Media format of a downstream sample stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeFormat {
    pub id: Option<String>,
    /// `None` when the container does not declare a bitrate
    pub bitrate: Option<u64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Lifecycle callbacks of the streaming engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum PlayerNative {
    TimelineChanged {
        duration: Option<Duration>,
    },
    StateChanged {
        play_when_ready: bool,
        playback_state: NativePlaybackState,
    },
    LoadingChanged {
        is_loading: bool,
    },
    PositionDiscontinuity {
        reason: String,
    },
    PlaybackParametersChanged {
        speed: f32,
    },
    TracksChanged {
        tracks: Vec<NativeTrack>,
    },
    Error(NativePlaybackError),
}

/// Media source loading callbacks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum MediaSourceNative {
    LoadStarted {
        uri: String,
        track_type: TrackType,
    },
    LoadCompleted {
        uri: String,
        bytes_loaded: u64,
        load_duration: Duration,
    },
    LoadCanceled {
        uri: String,
    },
    LoadError {
        uri: String,
        message: String,
        was_canceled: bool,
    },
    UpstreamDiscarded {
        track_type: TrackType,
    },
    DownstreamFormatChanged {
        track_type: TrackType,
        format: NativeFormat,
    },
}

/// Analytics callbacks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum AnalyticsNative {
    DroppedVideoFrames {
        count: u32,
        elapsed: Duration,
    },
    BandwidthEstimate {
        total_load_time: Duration,
        total_bytes_loaded: u64,
        bitrate_estimate: u64,
    },
    DecoderInitialized {
        track_type: TrackType,
        decoder_name: String,
        initialization_duration: Duration,
    },
    AudioSessionId {
        id: i32,
    },
}

/// Video geometry callbacks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum VideoNative {
    SizeChanged {
        width: u32,
        height: u32,
        unapplied_rotation_degrees: i32,
        pixel_width_height_ratio: f32,
    },
    RenderedFirstFrame,
}

/// DRM session manager callbacks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum DrmNative {
    KeysLoaded,
    KeysRestored,
    KeysRemoved,
    SessionManagerError { message: String },
}

/// Advert playback callbacks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum AdvertNative {
    LoadSucceeded { breaks: usize },
    LoadFailed { message: String },
    BreakStarted { break_id: String, advert_count: usize },
    AdvertPrepared { advert_id: String },
    AdvertStarted { advert_id: String },
    AdvertEnded { advert_id: String },
    AdvertClicked { advert_id: String },
    BreakEnded { break_id: String },
    Skipped,
}

/// Callbacks of the legacy platform decoder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum PlatformNative {
    Prepared { duration: Option<Duration> },
    Completion,
    Error { what: i32, extra: i32 },
    Info { what: i32, extra: i32 },
    VideoSizeChanged { width: u32, height: u32 },
    BufferingUpdate { percent: u8 },
    SeekComplete,
    /// Raised by the platform wrapper after play/pause/stop calls
    Started,
    Paused,
    Stopped,
}

/// Platform decoder codes
pub mod platform_codes {
    pub const MEDIA_ERROR_UNKNOWN: i32 = 1;
    pub const MEDIA_ERROR_SERVER_DIED: i32 = 100;
    pub const MEDIA_ERROR_IO: i32 = -1004;
    pub const MEDIA_ERROR_MALFORMED: i32 = -1007;
    pub const MEDIA_ERROR_UNSUPPORTED: i32 = -1010;
    pub const MEDIA_ERROR_TIMED_OUT: i32 = -110;
    pub const MEDIA_INFO_BUFFERING_START: i32 = 701;
    pub const MEDIA_INFO_BUFFERING_END: i32 = 702;
}

/// Any native callback, tagged with its source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", content = "event", rename_all = "snake_case")]
pub enum NativeEvent {
    Player(PlayerNative),
    MediaSource(MediaSourceNative),
    Analytics(AnalyticsNative),
    Video(VideoNative),
    Drm(DrmNative),
    Advert(AdvertNative),
    Platform(PlatformNative),
}

impl From<PlayerNative> for NativeEvent {
    fn from(event: PlayerNative) -> Self {
        NativeEvent::Player(event)
    }
}

impl From<MediaSourceNative> for NativeEvent {
    fn from(event: MediaSourceNative) -> Self {
        NativeEvent::MediaSource(event)
    }
}

impl From<AnalyticsNative> for NativeEvent {
    fn from(event: AnalyticsNative) -> Self {
        NativeEvent::Analytics(event)
    }
}

impl From<VideoNative> for NativeEvent {
    fn from(event: VideoNative) -> Self {
        NativeEvent::Video(event)
    }
}

impl From<DrmNative> for NativeEvent {
    fn from(event: DrmNative) -> Self {
        NativeEvent::Drm(event)
    }
}

impl From<AdvertNative> for NativeEvent {
    fn from(event: AdvertNative) -> Self {
        NativeEvent::Advert(event)
    }
}

impl From<PlatformNative> for NativeEvent {
    fn from(event: PlatformNative) -> Self {
        NativeEvent::Platform(event)
    }
}
