//! Pure mappings from native payloads to unified events

use crate::events::{
    AdvertEvent, BitrateChanged, BufferState, ErrorKind, InfoEvent, InfoSource, PlayerError,
    StateChange, TrackInfo, TracksChanged, VideoSize,
};
use crate::native::{
    platform_codes::*, AdvertNative, AnalyticsNative, DrmNative, MediaSourceNative, NativeErrorCause,
    NativeErrorType, NativeEvent, NativeFormat, NativePlaybackError, NativeTrack, PlatformNative,
    PlayerNative, VideoNative,
};
use crate::types::TrackType;

/// Streaming engine error to unified error
pub fn player_error(error: &NativePlaybackError) -> PlayerError {
    let kind = match (error.error_type, &error.cause) {
        (_, NativeErrorCause::Timeout) => ErrorKind::Timeout,
        (_, NativeErrorCause::DrmSession) => ErrorKind::Drm,
        (_, NativeErrorCause::UnsupportedFormat) => ErrorKind::Unsupported,
        (NativeErrorType::Source, NativeErrorCause::HttpStatus { .. })
        | (NativeErrorType::Source, NativeErrorCause::Connection) => ErrorKind::Connectivity,
        (NativeErrorType::Source, _) => ErrorKind::Source,
        (NativeErrorType::Renderer, _) => ErrorKind::Renderer,
        (NativeErrorType::Remote, _) => ErrorKind::EngineDied,
        (NativeErrorType::Unexpected, _) | (NativeErrorType::OutOfMemory, _) => ErrorKind::Unexpected,
    };

    let native_code = match error.cause {
        NativeErrorCause::HttpStatus { code } => Some(i32::from(code)),
        _ => None,
    };

    PlayerError {
        kind,
        message: error.message.clone(),
        native_code,
    }
}

/// Platform decoder `(what, extra)` error pair to unified error
pub fn platform_error(what: i32, extra: i32) -> PlayerError {
    let kind = match (what, extra) {
        (MEDIA_ERROR_SERVER_DIED, _) => ErrorKind::EngineDied,
        (_, MEDIA_ERROR_IO) => ErrorKind::Connectivity,
        (_, MEDIA_ERROR_MALFORMED) => ErrorKind::Source,
        (_, MEDIA_ERROR_UNSUPPORTED) => ErrorKind::Unsupported,
        (_, MEDIA_ERROR_TIMED_OUT) => ErrorKind::Timeout,
        _ => ErrorKind::Unexpected,
    };

    let native_code = if extra != 0 { extra } else { what };

    PlayerError {
        kind,
        message: format!("platform decoder error (what={what}, extra={extra})"),
        native_code: Some(native_code),
    }
}

/// Platform info codes that carry buffering information
pub fn platform_buffer_state(what: i32) -> Option<BufferState> {
    match what {
        MEDIA_INFO_BUFFERING_START => Some(BufferState::Started),
        MEDIA_INFO_BUFFERING_END => Some(BufferState::Completed),
        _ => None,
    }
}

pub fn state_change(play_when_ready: bool) -> StateChange {
    if play_when_ready {
        StateChange::Playing
    } else {
        StateChange::Paused
    }
}

/// Audio and video format changes carry a bitrate; other tracks do not
pub fn bitrate_changed(track_type: TrackType, format: &NativeFormat) -> Option<BitrateChanged> {
    match track_type {
        TrackType::Audio | TrackType::Video => format.bitrate.map(|bitrate| BitrateChanged {
            track_id: format.id.clone(),
            track_type,
            bitrate,
        }),
        TrackType::Text | TrackType::Unknown => None,
    }
}

pub fn video_size(width: u32, height: u32, rotation_degrees: i32, pixel_width_height_ratio: f32) -> VideoSize {
    VideoSize {
        width,
        height,
        rotation_degrees,
        pixel_width_height_ratio,
    }
}

pub fn tracks_changed(tracks: &[NativeTrack]) -> TracksChanged {
    TracksChanged {
        tracks: tracks
            .iter()
            .map(|t| TrackInfo {
                id: t.id.clone(),
                track_type: t.track_type,
                language: t.language.clone(),
                bitrate: t.bitrate,
                selected: t.selected,
            })
            .collect(),
    }
}

pub fn advert(event: &AdvertNative) -> AdvertEvent {
    match event {
        AdvertNative::LoadSucceeded { breaks } => AdvertEvent::AdvertsLoaded { breaks: *breaks },
        AdvertNative::LoadFailed { message } => AdvertEvent::AdvertsLoadFailed {
            message: message.clone(),
        },
        AdvertNative::BreakStarted {
            break_id,
            advert_count,
        } => AdvertEvent::AdvertBreakStarted {
            break_id: break_id.clone(),
            adverts: *advert_count,
        },
        AdvertNative::AdvertPrepared { advert_id } => AdvertEvent::AdvertPrepared {
            advert_id: advert_id.clone(),
        },
        AdvertNative::AdvertStarted { advert_id } => AdvertEvent::AdvertStarted {
            advert_id: advert_id.clone(),
        },
        AdvertNative::AdvertEnded { advert_id } => AdvertEvent::AdvertEnded {
            advert_id: advert_id.clone(),
        },
        AdvertNative::AdvertClicked { advert_id } => AdvertEvent::AdvertClicked {
            advert_id: advert_id.clone(),
        },
        AdvertNative::BreakEnded { break_id } => AdvertEvent::AdvertBreakEnded {
            break_id: break_id.clone(),
        },
        AdvertNative::Skipped => AdvertEvent::AdvertsSkipped,
    }
}

/// Every native callback, described as method name plus parameters
pub fn info(event: &NativeEvent) -> InfoEvent {
    match event {
        NativeEvent::Player(e) => player_info(e),
        NativeEvent::MediaSource(e) => media_source_info(e),
        NativeEvent::Analytics(e) => analytics_info(e),
        NativeEvent::Video(e) => video_info(e),
        NativeEvent::Drm(e) => drm_info(e),
        NativeEvent::Advert(e) => advert_info(e),
        NativeEvent::Platform(e) => platform_info(e),
    }
}

fn player_info(event: &PlayerNative) -> InfoEvent {
    let info = |method: &str| InfoEvent::new(InfoSource::Player, method);
    match event {
        PlayerNative::TimelineChanged { duration } => info("onTimelineChanged").with(
            "duration_ms",
            duration.map(|d| d.as_millis().to_string()).unwrap_or_else(|| "unknown".into()),
        ),
        PlayerNative::StateChanged {
            play_when_ready,
            playback_state,
        } => info("onPlayerStateChanged")
            .with("play_when_ready", play_when_ready)
            .with("playback_state", format!("{playback_state:?}")),
        PlayerNative::LoadingChanged { is_loading } => {
            info("onLoadingChanged").with("is_loading", is_loading)
        }
        PlayerNative::PositionDiscontinuity { reason } => {
            info("onPositionDiscontinuity").with("reason", reason)
        }
        PlayerNative::PlaybackParametersChanged { speed } => {
            info("onPlaybackParametersChanged").with("speed", speed)
        }
        PlayerNative::TracksChanged { tracks } => {
            info("onTracksChanged").with("track_count", tracks.len())
        }
        PlayerNative::Error(error) => info("onPlayerError")
            .with("type", format!("{:?}", error.error_type))
            .with("cause", format!("{:?}", error.cause))
            .with("message", &error.message),
    }
}

fn media_source_info(event: &MediaSourceNative) -> InfoEvent {
    let info = |method: &str| InfoEvent::new(InfoSource::MediaSource, method);
    match event {
        MediaSourceNative::LoadStarted { uri, track_type } => info("onLoadStarted")
            .with("uri", uri)
            .with("track_type", track_type),
        MediaSourceNative::LoadCompleted {
            uri,
            bytes_loaded,
            load_duration,
        } => info("onLoadCompleted")
            .with("uri", uri)
            .with("bytes_loaded", bytes_loaded)
            .with("load_duration_ms", load_duration.as_millis()),
        MediaSourceNative::LoadCanceled { uri } => info("onLoadCanceled").with("uri", uri),
        MediaSourceNative::LoadError {
            uri,
            message,
            was_canceled,
        } => info("onLoadError")
            .with("uri", uri)
            .with("error", message)
            .with("was_canceled", was_canceled),
        MediaSourceNative::UpstreamDiscarded { track_type } => {
            info("onUpstreamDiscarded").with("track_type", track_type)
        }
        MediaSourceNative::DownstreamFormatChanged { track_type, format } => {
            info("onDownstreamFormatChanged")
                .with("track_type", track_type)
                .with("format_id", format.id.as_deref().unwrap_or("unknown"))
                .with(
                    "bitrate",
                    format.bitrate.map(|b| b.to_string()).unwrap_or_else(|| "unknown".into()),
                )
        }
    }
}

fn analytics_info(event: &AnalyticsNative) -> InfoEvent {
    let info = |method: &str| InfoEvent::new(InfoSource::Analytics, method);
    match event {
        AnalyticsNative::DroppedVideoFrames { count, elapsed } => info("onDroppedVideoFrames")
            .with("dropped_frames", count)
            .with("elapsed_ms", elapsed.as_millis()),
        AnalyticsNative::BandwidthEstimate {
            total_load_time,
            total_bytes_loaded,
            bitrate_estimate,
        } => info("onBandwidthEstimate")
            .with("total_load_time_ms", total_load_time.as_millis())
            .with("total_bytes_loaded", total_bytes_loaded)
            .with("bitrate_estimate", bitrate_estimate),
        AnalyticsNative::DecoderInitialized {
            track_type,
            decoder_name,
            initialization_duration,
        } => info("onDecoderInitialized")
            .with("track_type", track_type)
            .with("decoder_name", decoder_name)
            .with("initialization_duration_ms", initialization_duration.as_millis()),
        AnalyticsNative::AudioSessionId { id } => info("onAudioSessionId").with("audio_session_id", id),
    }
}

fn video_info(event: &VideoNative) -> InfoEvent {
    match event {
        VideoNative::SizeChanged {
            width,
            height,
            unapplied_rotation_degrees,
            pixel_width_height_ratio,
        } => InfoEvent::new(InfoSource::Video, "onVideoSizeChanged")
            .with("width", width)
            .with("height", height)
            .with("unapplied_rotation_degrees", unapplied_rotation_degrees)
            .with("pixel_width_height_ratio", pixel_width_height_ratio),
        VideoNative::RenderedFirstFrame => InfoEvent::new(InfoSource::Video, "onRenderedFirstFrame"),
    }
}

fn drm_info(event: &DrmNative) -> InfoEvent {
    let info = |method: &str| InfoEvent::new(InfoSource::Drm, method);
    match event {
        DrmNative::KeysLoaded => info("onDrmKeysLoaded"),
        DrmNative::KeysRestored => info("onDrmKeysRestored"),
        DrmNative::KeysRemoved => info("onDrmKeysRemoved"),
        DrmNative::SessionManagerError { message } => {
            info("onDrmSessionManagerError").with("error", message)
        }
    }
}

fn advert_info(event: &AdvertNative) -> InfoEvent {
    let info = |method: &str| InfoEvent::new(InfoSource::Advert, method);
    match event {
        AdvertNative::LoadSucceeded { breaks } => info("onAdvertsLoaded").with("breaks", breaks),
        AdvertNative::LoadFailed { message } => info("onAdvertsLoadFailed").with("error", message),
        AdvertNative::BreakStarted {
            break_id,
            advert_count,
        } => info("onAdvertBreakStarted")
            .with("break_id", break_id)
            .with("advert_count", advert_count),
        AdvertNative::AdvertPrepared { advert_id } => info("onAdvertPrepared").with("advert_id", advert_id),
        AdvertNative::AdvertStarted { advert_id } => info("onAdvertStarted").with("advert_id", advert_id),
        AdvertNative::AdvertEnded { advert_id } => info("onAdvertEnded").with("advert_id", advert_id),
        AdvertNative::AdvertClicked { advert_id } => info("onAdvertClicked").with("advert_id", advert_id),
        AdvertNative::BreakEnded { break_id } => info("onAdvertBreakEnded").with("break_id", break_id),
        AdvertNative::Skipped => info("onAdvertsSkipped"),
    }
}

fn platform_info(event: &PlatformNative) -> InfoEvent {
    let info = |method: &str| InfoEvent::new(InfoSource::Platform, method);
    match event {
        PlatformNative::Prepared { duration } => info("onPrepared").with(
            "duration_ms",
            duration.map(|d| d.as_millis().to_string()).unwrap_or_else(|| "unknown".into()),
        ),
        PlatformNative::Completion => info("onCompletion"),
        PlatformNative::Error { what, extra } => info("onError").with("what", what).with("extra", extra),
        PlatformNative::Info { what, extra } => info("onInfo").with("what", what).with("extra", extra),
        PlatformNative::VideoSizeChanged { width, height } => info("onVideoSizeChanged")
            .with("width", width)
            .with("height", height),
        PlatformNative::BufferingUpdate { percent } => info("onBufferingUpdate").with("percent", percent),
        PlatformNative::SeekComplete => info("onSeekComplete"),
        PlatformNative::Started => info("start"),
        PlatformNative::Paused => info("pause"),
        PlatformNative::Stopped => info("stop"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn error(error_type: NativeErrorType, cause: NativeErrorCause) -> NativePlaybackError {
        NativePlaybackError {
            error_type,
            cause,
            message: "boom".to_string(),
        }
    }

    #[test]
    fn test_player_error_kinds() {
        let cases = [
            (NativeErrorType::Source, NativeErrorCause::HttpStatus { code: 404 }, ErrorKind::Connectivity),
            (NativeErrorType::Source, NativeErrorCause::Connection, ErrorKind::Connectivity),
            (NativeErrorType::Source, NativeErrorCause::ParserFailure, ErrorKind::Source),
            (NativeErrorType::Source, NativeErrorCause::DrmSession, ErrorKind::Drm),
            (NativeErrorType::Renderer, NativeErrorCause::DrmSession, ErrorKind::Drm),
            (NativeErrorType::Renderer, NativeErrorCause::DecoderInit, ErrorKind::Renderer),
            (NativeErrorType::Renderer, NativeErrorCause::UnsupportedFormat, ErrorKind::Unsupported),
            (NativeErrorType::Source, NativeErrorCause::Timeout, ErrorKind::Timeout),
            (NativeErrorType::Remote, NativeErrorCause::Other, ErrorKind::EngineDied),
            (NativeErrorType::OutOfMemory, NativeErrorCause::Other, ErrorKind::Unexpected),
        ];

        for (error_type, cause, expected) in cases {
            assert_eq!(player_error(&error(error_type, cause)).kind, expected);
        }
    }

    #[test]
    fn test_http_status_is_kept_as_native_code() {
        let unified = player_error(&error(
            NativeErrorType::Source,
            NativeErrorCause::HttpStatus { code: 503 },
        ));
        assert_eq!(unified.native_code, Some(503));
        assert_eq!(unified.message, "boom");
    }

    #[test]
    fn test_platform_error_kinds() {
        assert_eq!(platform_error(MEDIA_ERROR_SERVER_DIED, 0).kind, ErrorKind::EngineDied);
        assert_eq!(platform_error(MEDIA_ERROR_UNKNOWN, MEDIA_ERROR_IO).kind, ErrorKind::Connectivity);
        assert_eq!(platform_error(MEDIA_ERROR_UNKNOWN, MEDIA_ERROR_MALFORMED).kind, ErrorKind::Source);
        assert_eq!(
            platform_error(MEDIA_ERROR_UNKNOWN, MEDIA_ERROR_UNSUPPORTED).kind,
            ErrorKind::Unsupported
        );
        assert_eq!(platform_error(MEDIA_ERROR_UNKNOWN, MEDIA_ERROR_TIMED_OUT).kind, ErrorKind::Timeout);
        assert_eq!(platform_error(MEDIA_ERROR_UNKNOWN, 0).kind, ErrorKind::Unexpected);
        assert_eq!(platform_error(MEDIA_ERROR_UNKNOWN, MEDIA_ERROR_IO).native_code, Some(MEDIA_ERROR_IO));
    }

    #[test]
    fn test_platform_buffering_codes() {
        assert_eq!(platform_buffer_state(MEDIA_INFO_BUFFERING_START), Some(BufferState::Started));
        assert_eq!(platform_buffer_state(MEDIA_INFO_BUFFERING_END), Some(BufferState::Completed));
        assert_eq!(platform_buffer_state(3), None);
    }

    #[test]
    fn test_bitrate_only_for_audio_and_video() {
        let format = NativeFormat {
            id: Some("video-720p".to_string()),
            bitrate: Some(2_500_000),
            width: Some(1280),
            height: Some(720),
        };
        let change = bitrate_changed(TrackType::Video, &format).unwrap();
        assert_eq!(change.track_id.as_deref(), Some("video-720p"));
        assert_eq!(change.bitrate, 2_500_000);

        assert!(bitrate_changed(TrackType::Text, &format).is_none());
        let unknown = NativeFormat {
            bitrate: None,
            ..format
        };
        assert!(bitrate_changed(TrackType::Audio, &unknown).is_none());
    }

    #[test]
    fn test_info_names_the_native_method() {
        let event = NativeEvent::Analytics(AnalyticsNative::DroppedVideoFrames {
            count: 7,
            elapsed: std::time::Duration::from_millis(250),
        });
        let info = info(&event);
        assert_eq!(info.source, InfoSource::Analytics);
        assert_eq!(info.method, "onDroppedVideoFrames");
        assert_eq!(info.parameters["dropped_frames"], "7");
        assert_eq!(info.parameters["elapsed_ms"], "250");
    }

    #[test]
    fn test_drm_error_info() {
        let info = info(&NativeEvent::Drm(DrmNative::SessionManagerError {
            message: "provisioning required".to_string(),
        }));
        assert_eq!(info.source, InfoSource::Drm);
        assert_eq!(info.parameters["error"], "provisioning required");
    }
}
