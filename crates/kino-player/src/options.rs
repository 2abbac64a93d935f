//! Per-load playback options

use crate::error::{Error, Result};
use crate::types::{ContentType, DrmSecurityLevel};
use serde::Serialize;
use std::time::Duration;

/// Default time before the engine may switch to a higher quality track
pub const DEFAULT_MIN_DURATION_FOR_QUALITY_INCREASE: Duration = Duration::from_secs(10);

/// Default cap for the initial track selection, in bits per second
pub const DEFAULT_MAX_INITIAL_BITRATE: u64 = 800_000;

/// Immutable options passed along with every `load_video` call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaybackOptions {
    content_type: ContentType,
    min_duration_before_quality_increase: Duration,
    max_initial_bitrate: Option<u64>,
    max_video_bitrate: Option<u64>,
    initial_position: Option<Duration>,
    forced_drm_security_level: Option<DrmSecurityLevel>,
}

impl PlaybackOptions {
    pub fn builder() -> PlaybackOptionsBuilder {
        PlaybackOptionsBuilder::default()
    }

    pub fn content_type(&self) -> ContentType {
        self.content_type
    }

    pub fn min_duration_before_quality_increase(&self) -> Duration {
        self.min_duration_before_quality_increase
    }

    pub fn max_initial_bitrate(&self) -> Option<u64> {
        self.max_initial_bitrate
    }

    /// `None` leaves the video bitrate uncapped
    pub fn max_video_bitrate(&self) -> Option<u64> {
        self.max_video_bitrate
    }

    pub fn initial_position(&self) -> Option<Duration> {
        self.initial_position
    }

    pub fn forced_drm_security_level(&self) -> Option<DrmSecurityLevel> {
        self.forced_drm_security_level
    }
}

impl Default for PlaybackOptions {
    fn default() -> Self {
        Self {
            content_type: ContentType::H264,
            min_duration_before_quality_increase: DEFAULT_MIN_DURATION_FOR_QUALITY_INCREASE,
            max_initial_bitrate: Some(DEFAULT_MAX_INITIAL_BITRATE),
            max_video_bitrate: None,
            initial_position: None,
            forced_drm_security_level: None,
        }
    }
}

/// Builder for [`PlaybackOptions`]. Validation happens in [`build`](Self::build).
#[derive(Debug, Clone, Default)]
pub struct PlaybackOptionsBuilder {
    content_type: Option<ContentType>,
    min_duration_before_quality_increase: Option<Duration>,
    max_initial_bitrate: Option<Option<u64>>,
    max_video_bitrate: Option<u64>,
    initial_position: Option<Duration>,
    forced_drm_security_level: Option<DrmSecurityLevel>,
}

impl PlaybackOptionsBuilder {
    pub fn with_content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = Some(content_type);
        self
    }

    pub fn with_min_duration_before_quality_increase(mut self, duration: Duration) -> Self {
        self.min_duration_before_quality_increase = Some(duration);
        self
    }

    /// Limit the bitrate of the first track the engine selects
    pub fn with_max_initial_bitrate(mut self, bitrate: u64) -> Self {
        self.max_initial_bitrate = Some(Some(bitrate));
        self
    }

    /// Remove the default initial bitrate cap
    pub fn without_max_initial_bitrate(mut self) -> Self {
        self.max_initial_bitrate = Some(None);
        self
    }

    pub fn with_max_video_bitrate(mut self, bitrate: u64) -> Self {
        self.max_video_bitrate = Some(bitrate);
        self
    }

    pub fn with_initial_position(mut self, position: Duration) -> Self {
        self.initial_position = Some(position);
        self
    }

    /// Force the DRM session to a security level. It can never be stronger
    /// than what the device supports.
    pub fn with_forced_drm_security_level(mut self, level: DrmSecurityLevel) -> Self {
        self.forced_drm_security_level = Some(level);
        self
    }

    pub fn build(self) -> Result<PlaybackOptions> {
        let max_video_bitrate = self.max_video_bitrate;

        let max_initial_bitrate = match self.max_initial_bitrate {
            Some(explicit) => {
                if let (Some(initial), Some(video)) = (explicit, max_video_bitrate) {
                    if initial > video {
                        return Err(Error::InvalidConfig(format!(
                            "max initial bitrate {initial} exceeds max video bitrate {video}"
                        )));
                    }
                }
                explicit
            }
            // The default cap follows a lower video cap instead of failing
            None => Some(match max_video_bitrate {
                Some(video) => DEFAULT_MAX_INITIAL_BITRATE.min(video),
                None => DEFAULT_MAX_INITIAL_BITRATE,
            }),
        };

        Ok(PlaybackOptions {
            content_type: self.content_type.unwrap_or(ContentType::H264),
            min_duration_before_quality_increase: self
                .min_duration_before_quality_increase
                .unwrap_or(DEFAULT_MIN_DURATION_FOR_QUALITY_INCREASE),
            max_initial_bitrate,
            max_video_bitrate,
            initial_position: self.initial_position,
            forced_drm_security_level: self.forced_drm_security_level,
        })
    }
}
