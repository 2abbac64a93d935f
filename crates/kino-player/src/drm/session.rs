//! DRM session construction
//!
//! Turns a [`DrmRequest`] into a backend-ready [`DrmSession`], applying the
//! device checks: modular DRM support, forced security level, and the
//! secure decoder fallback policy.

use super::{DrmRequest, DrmRequestError, KeyExchange, ModularDrmKeyRequest};
use crate::error::{Error, Result};
use crate::types::{BackendType, DrmSecurityLevel, DrmType, SessionId};
use bytes::Bytes;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Device capability queries used while building a session
pub trait DeviceCapabilityProbe: Send + Sync {
    /// Strongest security level the device can attest to
    fn security_level(&self) -> DrmSecurityLevel;

    fn has_secure_decoder(&self) -> bool {
        true
    }

    /// Whether the platform exposes a modular media DRM session at all
    fn supports_modular_drm(&self) -> bool {
        true
    }
}

/// Fixed device description, handy for configuration files and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticDeviceProbe {
    pub security_level: DrmSecurityLevel,
    pub secure_decoder: bool,
    pub modular_drm: bool,
}

impl Default for StaticDeviceProbe {
    fn default() -> Self {
        Self {
            security_level: DrmSecurityLevel::L1,
            secure_decoder: true,
            modular_drm: true,
        }
    }
}

impl DeviceCapabilityProbe for StaticDeviceProbe {
    fn security_level(&self) -> DrmSecurityLevel {
        self.security_level
    }

    fn has_secure_decoder(&self) -> bool {
        self.secure_decoder
    }

    fn supports_modular_drm(&self) -> bool {
        self.modular_drm
    }
}

/// Decoder the engine should use for protected content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecoderPath {
    Secure,
    /// Software path, only when fallback decoders were allowed
    NonSecure,
}

/// Caller-side knobs for session construction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionPolicy {
    pub forced_security_level: Option<DrmSecurityLevel>,
    pub allow_fallback_decoder: bool,
}

/// Check a forced security level against the device.
///
/// A level stronger than the device's is rejected; equal or weaker passes
/// through unchanged.
pub fn clamp_security_level(
    requested: Option<DrmSecurityLevel>,
    device: DrmSecurityLevel,
) -> Result<Option<DrmSecurityLevel>> {
    match requested {
        Some(level) if level.is_stronger_than(device) => Err(Error::UnsupportedSecurityLevel {
            requested: level,
            device,
        }),
        other => Ok(other),
    }
}

/// Backend-specific DRM session handle
#[derive(Debug)]
pub struct DrmSession {
    id: SessionId,
    drm_type: DrmType,
    backend: BackendType,
    device_security_level: DrmSecurityLevel,
    forced_security_level: Mutex<Option<DrmSecurityLevel>>,
    decoder: DecoderPath,
    key_exchange: KeyExchange,
    key_requests: AtomicU64,
    closed: AtomicBool,
}

impl DrmSession {
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn drm_type(&self) -> DrmType {
        self.drm_type
    }

    pub fn backend(&self) -> BackendType {
        self.backend
    }

    pub fn device_security_level(&self) -> DrmSecurityLevel {
        self.device_security_level
    }

    pub fn forced_security_level(&self) -> Option<DrmSecurityLevel> {
        *self.forced_security_level.lock()
    }

    /// Level the session actually runs at
    pub fn security_level(&self) -> DrmSecurityLevel {
        self.forced_security_level().unwrap_or(self.device_security_level)
    }

    /// Force a level for the next load; it must already be clamped to the device
    pub(crate) fn force_security_level(&self, level: DrmSecurityLevel) {
        let previous = self.forced_security_level.lock().replace(level);
        if previous != Some(level) {
            debug!(session_id = %self.id, security_level = %level, "DRM security level forced");
        }
    }

    pub fn decoder_path(&self) -> DecoderPath {
        self.decoder
    }

    /// False for classic DRM, which the engine handles internally
    pub fn requires_key_exchange(&self) -> bool {
        !matches!(self.key_exchange, KeyExchange::NotRequired)
    }

    /// Called by the engine's DRM subsystem for every license request
    pub fn execute_key_request(
        &self,
        request: &ModularDrmKeyRequest,
    ) -> std::result::Result<Bytes, DrmRequestError> {
        if self.is_closed() {
            return Err(DrmRequestError::new("DRM session is closed"));
        }
        self.key_requests.fetch_add(1, Ordering::Relaxed);
        self.key_exchange.exchange(request)
    }

    /// Number of key requests routed through this session
    pub fn key_request_count(&self) -> u64 {
        self.key_requests.load(Ordering::Relaxed)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub(crate) fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            debug!(session_id = %self.id, "DRM session closed");
        }
    }
}

/// Builds DRM sessions for a device
#[derive(Clone)]
pub struct DrmSessionFactory {
    device: Arc<dyn DeviceCapabilityProbe>,
}

impl DrmSessionFactory {
    pub fn new(device: Arc<dyn DeviceCapabilityProbe>) -> Self {
        Self { device }
    }

    pub fn device(&self) -> &Arc<dyn DeviceCapabilityProbe> {
        &self.device
    }

    /// Build the session for `request`; `None` when no DRM was requested
    #[instrument(skip(self, request), fields(drm_type = %request.drm_type()))]
    pub fn create_session(
        &self,
        request: &DrmRequest,
        backend: BackendType,
        policy: &SessionPolicy,
    ) -> Result<Option<DrmSession>> {
        let drm_type = request.drm_type();
        if drm_type == DrmType::None {
            debug!("No DRM requested, skipping session");
            return Ok(None);
        }

        if drm_type.is_modular() && !self.device.supports_modular_drm() {
            return Err(Error::unable_to_create(
                backend,
                format!("device does not support {drm_type}"),
            ));
        }

        let device_level = self.device.security_level();
        let forced = clamp_security_level(policy.forced_security_level, device_level)?;

        let decoder = if self.device.has_secure_decoder() {
            DecoderPath::Secure
        } else if policy.allow_fallback_decoder {
            warn!("No secure decoder available, falling back to non-secure decoder");
            DecoderPath::NonSecure
        } else {
            return Err(Error::unable_to_create(
                backend,
                "no secure decoder available and fallback decoders are not allowed",
            ));
        };

        let session = DrmSession {
            id: SessionId::new(),
            drm_type,
            backend,
            device_security_level: device_level,
            forced_security_level: Mutex::new(forced),
            decoder,
            key_exchange: request.key_exchange().clone(),
            key_requests: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        };

        info!(
            session_id = %session.id,
            backend = %backend,
            security_level = %session.security_level(),
            decoder = ?decoder,
            "DRM session created"
        );

        Ok(Some(session))
    }
}
