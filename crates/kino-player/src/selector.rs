//! Backend selection and player construction
//!
//! [`PlayerFactory::select`] walks the caller's backend priority list and
//! takes the first backend whose capabilities cover the requested DRM and
//! content type. There is no fallback: if that backend's engine cannot be
//! built, selection fails.

use crate::capability::CapabilityTable;
use crate::drm::{
    DeviceCapabilityProbe, DrmRequest, DrmSessionFactory, KeyRequestTransport, SessionPolicy,
};
use crate::engine::{AdvertsLoader, EngineConfig, EngineCreator};
use crate::error::{Error, Result};
use crate::forwarder::EventForwarder;
use crate::player::PlayerHandle;
use crate::types::{BackendType, ContentType, DrmSecurityLevel, KeySetId};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Everything `select` needs to pick and build a backend
#[derive(Clone)]
pub struct SelectionRequest {
    priority: Vec<BackendType>,
    drm: DrmRequest,
    content_type: ContentType,
    allow_fallback_decoder: bool,
    allow_cross_protocol_redirects: bool,
    user_agent: String,
    adverts_loader: Option<Arc<dyn AdvertsLoader>>,
    forced_security_level: Option<DrmSecurityLevel>,
}

impl SelectionRequest {
    pub fn builder() -> SelectionRequestBuilder {
        SelectionRequestBuilder::default()
    }

    pub fn priority(&self) -> &[BackendType] {
        &self.priority
    }

    pub fn drm(&self) -> &DrmRequest {
        &self.drm
    }

    pub fn content_type(&self) -> ContentType {
        self.content_type
    }

    pub fn allow_fallback_decoder(&self) -> bool {
        self.allow_fallback_decoder
    }

    pub fn allow_cross_protocol_redirects(&self) -> bool {
        self.allow_cross_protocol_redirects
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn adverts_loader(&self) -> Option<&Arc<dyn AdvertsLoader>> {
        self.adverts_loader.as_ref()
    }

    pub fn forced_security_level(&self) -> Option<DrmSecurityLevel> {
        self.forced_security_level
    }
}

impl std::fmt::Debug for SelectionRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectionRequest")
            .field("priority", &self.priority)
            .field("drm", &self.drm)
            .field("content_type", &self.content_type)
            .field("allow_fallback_decoder", &self.allow_fallback_decoder)
            .field("allow_cross_protocol_redirects", &self.allow_cross_protocol_redirects)
            .field("user_agent", &self.user_agent)
            .field("adverts_loader", &self.adverts_loader.is_some())
            .field("forced_security_level", &self.forced_security_level)
            .finish()
    }
}

/// Builder for [`SelectionRequest`]
pub struct SelectionRequestBuilder {
    priority: Vec<BackendType>,
    drm: DrmRequest,
    content_type: ContentType,
    allow_fallback_decoder: bool,
    allow_cross_protocol_redirects: bool,
    user_agent: Option<String>,
    adverts_loader: Option<Arc<dyn AdvertsLoader>>,
    forced_security_level: Option<DrmSecurityLevel>,
}

impl Default for SelectionRequestBuilder {
    fn default() -> Self {
        Self {
            priority: BackendType::DEFAULT_PRIORITY.to_vec(),
            drm: DrmRequest::none(),
            content_type: ContentType::H264,
            allow_fallback_decoder: false,
            allow_cross_protocol_redirects: false,
            user_agent: None,
            adverts_loader: None,
            forced_security_level: None,
        }
    }
}

impl SelectionRequestBuilder {
    /// Backends to try, most preferred first
    pub fn with_priority(mut self, first: BackendType, rest: &[BackendType]) -> Self {
        self.priority = std::iter::once(first).chain(rest.iter().copied()).collect();
        self
    }

    pub fn with_priority_list(mut self, priority: Vec<BackendType>) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_drm(mut self, drm: DrmRequest) -> Self {
        self.drm = drm;
        self
    }

    pub fn with_widevine_classic_drm(self) -> Self {
        self.with_drm(DrmRequest::widevine_classic())
    }

    pub fn with_widevine_modular_streaming_drm(self, transport: Arc<dyn KeyRequestTransport>) -> Self {
        self.with_drm(DrmRequest::widevine_modular_stream(transport))
    }

    pub fn with_widevine_modular_download_drm(self, key_set_id: KeySetId) -> Self {
        self.with_drm(DrmRequest::widevine_modular_download(key_set_id))
    }

    pub fn with_content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = content_type;
        self
    }

    /// Let a non-secure decoder stand in when no secure one exists
    pub fn allow_fallback_decoder(mut self) -> Self {
        self.allow_fallback_decoder = true;
        self
    }

    pub fn allow_cross_protocol_redirects(mut self) -> Self {
        self.allow_cross_protocol_redirects = true;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_adverts_loader(mut self, loader: Arc<dyn AdvertsLoader>) -> Self {
        self.adverts_loader = Some(loader);
        self
    }

    pub fn with_forced_security_level(mut self, level: DrmSecurityLevel) -> Self {
        self.forced_security_level = Some(level);
        self
    }

    pub fn build(self) -> Result<SelectionRequest> {
        if self.priority.is_empty() {
            return Err(Error::InvalidConfig(
                "backend priority list must not be empty".to_string(),
            ));
        }

        Ok(SelectionRequest {
            priority: self.priority,
            drm: self.drm,
            content_type: self.content_type,
            allow_fallback_decoder: self.allow_fallback_decoder,
            allow_cross_protocol_redirects: self.allow_cross_protocol_redirects,
            user_agent: self
                .user_agent
                .unwrap_or_else(|| format!("kino-player/{}", crate::VERSION)),
            adverts_loader: self.adverts_loader,
            forced_security_level: self.forced_security_level,
        })
    }
}

/// Builds players against a capability table and a set of engines
pub struct PlayerFactory {
    capabilities: CapabilityTable,
    creators: HashMap<BackendType, Arc<dyn EngineCreator>>,
    drm_sessions: DrmSessionFactory,
}

impl PlayerFactory {
    /// Factory with the built-in capability table and no engines
    pub fn new(device: Arc<dyn DeviceCapabilityProbe>) -> Self {
        Self {
            capabilities: CapabilityTable::standard(),
            creators: HashMap::new(),
            drm_sessions: DrmSessionFactory::new(device),
        }
    }

    pub fn with_capabilities(mut self, capabilities: CapabilityTable) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Register the engine creator for its backend, replacing any previous one
    pub fn register(mut self, creator: Arc<dyn EngineCreator>) -> Self {
        let backend = creator.backend_type();
        if self.creators.insert(backend, creator).is_some() {
            debug!(backend = %backend, "Replaced engine creator");
        }
        self
    }

    pub fn capabilities(&self) -> &CapabilityTable {
        &self.capabilities
    }

    /// First backend in priority order that supports the request
    pub fn choose_backend(&self, request: &SelectionRequest) -> Result<BackendType> {
        let drm_type = request.drm.drm_type();
        request
            .priority
            .iter()
            .copied()
            .find(|backend| {
                self.capabilities
                    .supports(*backend, drm_type, request.content_type)
            })
            .ok_or(Error::UnsupportedConfiguration {
                drm_type,
                content_type: request.content_type,
            })
    }

    /// Pick a backend and build a ready-to-load player for it
    #[instrument(skip(self, request), fields(drm_type = %request.drm.drm_type(), content_type = %request.content_type))]
    pub fn select(&self, request: &SelectionRequest) -> Result<PlayerHandle> {
        let backend = match self.choose_backend(request) {
            Ok(backend) => backend,
            Err(e) => {
                warn!(priority = ?request.priority, "No backend supports the request");
                return Err(e);
            }
        };
        debug!(backend = %backend, "Backend chosen");

        let capability = self
            .capabilities
            .capability(backend)
            .cloned()
            .ok_or_else(|| Error::unable_to_create(backend, "backend has no capability entry"))?;

        let policy = SessionPolicy {
            forced_security_level: request.forced_security_level,
            allow_fallback_decoder: request.allow_fallback_decoder,
        };
        let drm_session = self
            .drm_sessions
            .create_session(&request.drm, backend, &policy)?
            .map(Arc::new);

        let config = EngineConfig {
            user_agent: request.user_agent.clone(),
            allow_fallback_decoder: request.allow_fallback_decoder,
            allow_cross_protocol_redirects: request.allow_cross_protocol_redirects,
            adverts_loader: request
                .adverts_loader
                .clone()
                .filter(|_| capability.supports_adverts),
            drm_session: drm_session.clone(),
        };

        let created = match self.creators.get(&backend) {
            Some(creator) => creator
                .create(config)
                .map_err(|e| Error::unable_to_create(backend, format!("{e:#}"))),
            None => Err(Error::unable_to_create(backend, "no engine registered")),
        };
        let mut engine = match created {
            Ok(engine) => engine,
            Err(e) => {
                if let Some(session) = &drm_session {
                    session.close();
                }
                warn!(backend = %backend, error = %e, "Engine creation failed");
                return Err(e);
            }
        };

        let forwarder = Arc::new(EventForwarder::new(backend));
        engine.attach(forwarder.sink());

        let player = PlayerHandle::new(capability, engine, drm_session, forwarder);
        info!(
            player_id = %player.id(),
            backend = %backend,
            drm_session = player.drm_session().is_some(),
            "Player created"
        );
        Ok(player)
    }
}
