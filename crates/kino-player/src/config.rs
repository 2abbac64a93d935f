//! Player profiles
//!
//! A profile is a JSON document describing one selection request together
//! with the device it runs on. Missing fields take their defaults.
//!
//! ```json
//! {
//!   "backends": ["streaming", "platform"],
//!   "drm_type": "widevine-modular-stream",
//!   "content_type": "dash",
//!   "license_url": "https://license.example.com/widevine",
//!   "license_headers": { "X-Custom-Data": "token" },
//!   "device": { "security_level": "L3", "secure_decoder": true, "modular_drm": true }
//! }
//! ```

use crate::drm::{DeviceCapabilityProbe, DrmRequest, KeyRequestTransport, StaticDeviceProbe};
use crate::error::{Error, Result};
use crate::selector::SelectionRequest;
use crate::types::{BackendType, ContentType, DrmSecurityLevel, DrmType, KeySetId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Selection request plus device description, as stored on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerProfile {
    /// Backend priority, most preferred first
    pub backends: Vec<BackendType>,
    pub drm_type: DrmType,
    pub content_type: ContentType,
    pub user_agent: Option<String>,
    pub allow_fallback_decoder: bool,
    pub allow_cross_protocol_redirects: bool,
    /// Offline license for modular download, base64
    pub key_set_id: Option<KeySetId>,
    /// License server for modular streaming
    pub license_url: Option<Url>,
    pub license_headers: BTreeMap<String, String>,
    pub forced_security_level: Option<DrmSecurityLevel>,
    pub device: StaticDeviceProbe,
}

impl Default for PlayerProfile {
    fn default() -> Self {
        Self {
            backends: BackendType::DEFAULT_PRIORITY.to_vec(),
            drm_type: DrmType::None,
            content_type: ContentType::H264,
            user_agent: None,
            allow_fallback_decoder: false,
            allow_cross_protocol_redirects: false,
            key_set_id: None,
            license_url: None,
            license_headers: BTreeMap::new(),
            forced_security_level: None,
            device: StaticDeviceProbe::default(),
        }
    }
}

impl PlayerProfile {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let profile = Self::from_json_str(&json)?;
        debug!(path = %path.display(), drm_type = %profile.drm_type, "Loaded player profile");
        Ok(profile)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn device_probe(&self) -> Arc<dyn DeviceCapabilityProbe> {
        Arc::new(self.device)
    }

    /// HTTP transport for the configured license server, if any
    #[cfg(feature = "http-license")]
    pub fn license_transport(
        &self,
        runtime: tokio::runtime::Handle,
    ) -> Result<Option<Arc<dyn KeyRequestTransport>>> {
        let Some(url) = &self.license_url else {
            return Ok(None);
        };

        let transport = self
            .license_headers
            .iter()
            .fold(
                crate::drm::HttpLicenseTransport::new(url.clone(), runtime)
                    .map_err(|e| Error::InvalidConfig(format!("{e:#}")))?,
                |transport, (key, value)| transport.with_header(key, value),
            );
        Ok(Some(Arc::new(transport)))
    }

    /// Build the selection request; `transport` is required for modular
    /// streaming and ignored otherwise
    pub fn selection_request(
        &self,
        transport: Option<Arc<dyn KeyRequestTransport>>,
    ) -> Result<SelectionRequest> {
        if self.license_url.is_some() && self.drm_type != DrmType::WidevineModularStream {
            return Err(Error::InvalidConfig(format!(
                "license_url is only used by {}",
                DrmType::WidevineModularStream
            )));
        }

        let drm = DrmRequest::new(self.drm_type, transport, self.key_set_id.clone())?;
        let mut builder = SelectionRequest::builder()
            .with_priority_list(self.backends.clone())
            .with_drm(drm)
            .with_content_type(self.content_type);

        if let Some(user_agent) = &self.user_agent {
            builder = builder.with_user_agent(user_agent.clone());
        }
        if self.allow_fallback_decoder {
            builder = builder.allow_fallback_decoder();
        }
        if self.allow_cross_protocol_redirects {
            builder = builder.allow_cross_protocol_redirects();
        }
        if let Some(level) = self.forced_security_level {
            builder = builder.with_forced_security_level(level);
        }

        builder.build()
    }
}
