//! DRM - content protection wiring
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                 DRM Session Factory                 │
//! ├─────────────────────────────────────────────────────┤
//! │                                                     │
//! │  ┌──────────┐  ┌──────────┐  ┌──────────────────┐  │
//! │  │  Device  │  │ Security │  │ Decoder fallback │  │
//! │  │  Probe   │  │  Clamp   │  │      policy      │  │
//! │  └────┬─────┘  └────┬─────┘  └────────┬─────────┘  │
//! │       └─────────────┼─────────────────┘            │
//! │              ┌──────┴──────┐                       │
//! │              │ Key Exchange│  Live / Persisted     │
//! │              │   Adapter   │                       │
//! │              └─────────────┘                       │
//! └─────────────────────────────────────────────────────┘
//! ```

mod key_exchange;
mod session;

#[cfg(feature = "http-license")]
mod http;

pub use key_exchange::{DrmRequestError, KeyExchange, KeyRequestTransport, ModularDrmKeyRequest};
pub use session::{
    clamp_security_level, DecoderPath, DeviceCapabilityProbe, DrmSession, DrmSessionFactory,
    SessionPolicy, StaticDeviceProbe,
};

#[cfg(feature = "http-license")]
pub use http::HttpLicenseTransport;

use crate::error::{Error, Result};
use crate::types::{DrmType, KeySetId};
use std::sync::Arc;
use tracing::debug;

/// DRM part of a selection request.
///
/// The key set id is present exactly when the type is modular download;
/// the constructors are the only way to build one.
#[derive(Debug, Clone)]
pub struct DrmRequest {
    drm_type: DrmType,
    key_exchange: KeyExchange,
    key_set_id: Option<KeySetId>,
}

impl DrmRequest {
    /// Unprotected content
    pub fn none() -> Self {
        Self {
            drm_type: DrmType::None,
            key_exchange: KeyExchange::NotRequired,
            key_set_id: None,
        }
    }

    /// Legacy DRM, handled entirely inside the engine
    pub fn widevine_classic() -> Self {
        Self {
            drm_type: DrmType::WidevineClassic,
            key_exchange: KeyExchange::NotRequired,
            key_set_id: None,
        }
    }

    /// Modular DRM; each license request goes through `transport`
    pub fn widevine_modular_stream(transport: Arc<dyn KeyRequestTransport>) -> Self {
        Self {
            drm_type: DrmType::WidevineModularStream,
            key_exchange: KeyExchange::live(transport),
            key_set_id: None,
        }
    }

    /// Modular DRM restoring an offline license
    pub fn widevine_modular_download(key_set_id: KeySetId) -> Self {
        Self {
            drm_type: DrmType::WidevineModularDownload,
            key_exchange: KeyExchange::Persisted(key_set_id.clone()),
            key_set_id: Some(key_set_id),
        }
    }

    /// Generic constructor; the adapter variant follows from `drm_type`
    pub fn new(
        drm_type: DrmType,
        transport: Option<Arc<dyn KeyRequestTransport>>,
        key_set_id: Option<KeySetId>,
    ) -> Result<Self> {
        if key_set_id.is_some() && drm_type != DrmType::WidevineModularDownload {
            return Err(Error::InvalidConfig(format!(
                "a key set id is only valid for {}, not {drm_type}",
                DrmType::WidevineModularDownload
            )));
        }

        match drm_type {
            DrmType::None | DrmType::WidevineClassic => {
                if transport.is_some() {
                    debug!(drm_type = %drm_type, "Ignoring key request transport");
                }
                Ok(if drm_type == DrmType::None {
                    Self::none()
                } else {
                    Self::widevine_classic()
                })
            }
            DrmType::WidevineModularStream => transport
                .map(Self::widevine_modular_stream)
                .ok_or_else(|| {
                    Error::InvalidConfig(format!("{drm_type} requires a key request transport"))
                }),
            DrmType::WidevineModularDownload => key_set_id
                .map(Self::widevine_modular_download)
                .ok_or_else(|| Error::InvalidConfig(format!("{drm_type} requires a key set id"))),
        }
    }

    pub fn drm_type(&self) -> DrmType {
        self.drm_type
    }

    pub fn key_exchange(&self) -> &KeyExchange {
        &self.key_exchange
    }

    pub fn key_set_id(&self) -> Option<&KeySetId> {
        self.key_set_id.as_ref()
    }
}

impl Default for DrmRequest {
    fn default() -> Self {
        Self::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn transport() -> Arc<dyn KeyRequestTransport> {
        Arc::new(|_: &ModularDrmKeyRequest| -> anyhow::Result<Bytes> { Ok(Bytes::new()) })
    }

    #[test]
    fn test_key_set_id_only_for_download() {
        let request = DrmRequest::widevine_modular_download(KeySetId::new(b"id".to_vec()));
        assert!(request.key_set_id().is_some());
        assert!(matches!(request.key_exchange(), KeyExchange::Persisted(_)));

        for request in [
            DrmRequest::none(),
            DrmRequest::widevine_classic(),
            DrmRequest::widevine_modular_stream(transport()),
        ] {
            assert!(request.key_set_id().is_none());
        }
    }

    #[test]
    fn test_generic_constructor_validates() {
        assert!(DrmRequest::new(DrmType::WidevineModularStream, None, None).is_err());
        assert!(DrmRequest::new(DrmType::WidevineModularDownload, None, None).is_err());
        assert!(DrmRequest::new(
            DrmType::WidevineClassic,
            None,
            Some(KeySetId::new(b"id".to_vec()))
        )
        .is_err());

        let request = DrmRequest::new(DrmType::WidevineModularStream, Some(transport()), None).unwrap();
        assert!(request.key_exchange().is_live());
    }

    #[test]
    fn test_classic_needs_no_exchange() {
        let request = DrmRequest::new(DrmType::WidevineClassic, Some(transport()), None).unwrap();
        assert_eq!(request.drm_type(), DrmType::WidevineClassic);
        assert!(matches!(request.key_exchange(), KeyExchange::NotRequired));
    }
}
