//! Core types for Kino Player

use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

/// Unique identifier for a player handle or DRM session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Content format handed to the backend engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentType {
    /// Progressive download (single H.264 file)
    H264,
    /// MPEG-DASH adaptive streaming
    Dash,
    /// HLS adaptive streaming
    Hls,
}

impl ContentType {
    pub const ALL: [ContentType; 3] = [ContentType::H264, ContentType::Dash, ContentType::Hls];

    /// Whether the format is an adaptive-streaming variant
    pub fn is_adaptive(&self) -> bool {
        !matches!(self, ContentType::H264)
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContentType::H264 => write!(f, "h264"),
            ContentType::Dash => write!(f, "dash"),
            ContentType::Hls => write!(f, "hls"),
        }
    }
}

impl std::str::FromStr for ContentType {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_lowercase().as_str() {
            "h264" | "mp4" => Ok(ContentType::H264),
            "dash" | "mpd" => Ok(ContentType::Dash),
            "hls" | "m3u8" => Ok(ContentType::Hls),
            other => Err(crate::Error::InvalidConfig(format!("unknown content type: {other}"))),
        }
    }
}

/// Content protection scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DrmType {
    #[default]
    None,
    /// Legacy single-shot DRM managed inside the engine
    WidevineClassic,
    /// Modular DRM with a live license exchange per request
    WidevineModularStream,
    /// Modular DRM restoring a previously persisted license
    WidevineModularDownload,
}

impl DrmType {
    pub const ALL: [DrmType; 4] = [
        DrmType::None,
        DrmType::WidevineClassic,
        DrmType::WidevineModularStream,
        DrmType::WidevineModularDownload,
    ];

    /// Modular schemes need platform support for a media DRM session
    pub fn is_modular(&self) -> bool {
        matches!(
            self,
            DrmType::WidevineModularStream | DrmType::WidevineModularDownload
        )
    }
}

impl std::fmt::Display for DrmType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DrmType::None => write!(f, "none"),
            DrmType::WidevineClassic => write!(f, "widevine-classic"),
            DrmType::WidevineModularStream => write!(f, "widevine-modular-stream"),
            DrmType::WidevineModularDownload => write!(f, "widevine-modular-download"),
        }
    }
}

/// Device-attested DRM security level. Lower number is stronger protection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DrmSecurityLevel {
    L1,
    L2,
    L3,
}

impl DrmSecurityLevel {
    /// Numeric level as reported by the platform
    pub fn level(&self) -> u8 {
        match self {
            DrmSecurityLevel::L1 => 1,
            DrmSecurityLevel::L2 => 2,
            DrmSecurityLevel::L3 => 3,
        }
    }

    /// True when `self` offers stronger protection than `other`
    pub fn is_stronger_than(&self, other: DrmSecurityLevel) -> bool {
        self.level() < other.level()
    }
}

impl std::fmt::Display for DrmSecurityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "L{}", self.level())
    }
}

/// Identity of a backend playback engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendType {
    /// Adaptive-streaming engine with modular DRM and advert insertion
    Streaming,
    /// Legacy platform decoder
    Platform,
}

impl BackendType {
    /// Default priority: streaming engine first, platform decoder second
    pub const DEFAULT_PRIORITY: [BackendType; 2] = [BackendType::Streaming, BackendType::Platform];
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendType::Streaming => write!(f, "streaming"),
            BackendType::Platform => write!(f, "platform"),
        }
    }
}

/// Track category reported by engines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackType {
    Audio,
    Video,
    Text,
    Unknown,
}

impl std::fmt::Display for TrackType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackType::Audio => write!(f, "audio"),
            TrackType::Video => write!(f, "video"),
            TrackType::Text => write!(f, "text"),
            TrackType::Unknown => write!(f, "unknown"),
        }
    }
}

/// Identifier of a persisted offline license.
///
/// Serialized as standard base64 so profiles can carry it as a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeySetId(Bytes);

impl KeySetId {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    /// Decode a base64 key-set id
    pub fn from_base64(encoded: &str) -> crate::Result<Self> {
        STANDARD
            .decode(encoded.trim())
            .map(Self::new)
            .map_err(|e| crate::Error::InvalidConfig(format!("invalid key set id: {e}")))
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.0)
    }

    /// Raw bytes, cheap to clone
    pub fn as_bytes(&self) -> Bytes {
        self.0.clone()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for KeySetId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for KeySetId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        KeySetId::from_base64(&encoded).map_err(serde::de::Error::custom)
    }
}
