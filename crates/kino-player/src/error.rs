//! Error types for Kino Player

use crate::drm::DrmRequestError;
use crate::types::{BackendType, ContentType, DrmSecurityLevel, DrmType};
use thiserror::Error;

/// Result type alias for player operations
pub type Result<T> = std::result::Result<T, Error>;

/// Player error types
#[derive(Error, Debug)]
pub enum Error {
    // Selection errors
    #[error("No backend supports {drm_type} with {content_type} content")]
    UnsupportedConfiguration {
        drm_type: DrmType,
        content_type: ContentType,
    },

    #[error("Unable to create {backend} player: {reason}")]
    UnableToCreatePlayer { backend: BackendType, reason: String },

    // DRM errors
    #[error("Cannot force DRM security level {requested}, device supports {device}")]
    UnsupportedSecurityLevel {
        requested: DrmSecurityLevel,
        device: DrmSecurityLevel,
    },

    #[error(transparent)]
    DrmRequest(#[from] DrmRequestError),

    // Playback errors
    #[error("Player has been released")]
    PlayerReleased,

    #[error("Engine command failed: {0}")]
    Engine(String),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create an engine instantiation error
    pub fn unable_to_create(backend: BackendType, reason: impl Into<String>) -> Self {
        Error::UnableToCreatePlayer {
            backend,
            reason: reason.into(),
        }
    }

    /// Returns true if this error is recoverable without changing the request.
    ///
    /// Construction failures are terminal; only key exchange and engine
    /// command failures may succeed when repeated.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::DrmRequest(_) | Error::Engine(_) | Error::Io(_))
    }

    /// Returns the error code for analytics
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::UnsupportedConfiguration { .. } => "UNSUPPORTED_CONFIGURATION",
            Error::UnableToCreatePlayer { .. } => "UNABLE_TO_CREATE_PLAYER",
            Error::UnsupportedSecurityLevel { .. } => "UNSUPPORTED_SECURITY_LEVEL",
            Error::DrmRequest(_) => "DRM_REQUEST",
            Error::PlayerReleased => "PLAYER_RELEASED",
            Error::Engine(_) => "ENGINE",
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::Json(_) => "JSON",
            Error::Io(_) => "IO",
        }
    }
}

/// Best-effort text of a caught panic payload
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
