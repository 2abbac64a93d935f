//! Backend engine seam
//!
//! An engine is the concrete playback implementation behind a backend. The
//! factory builds one through the [`EngineCreator`] registered for the
//! chosen backend, then attaches the forwarder's [`NativeEventSink`].

mod simulated;

pub use simulated::{SimulatedEngine, SimulatedEngineCreator, SIMULATED_DURATION};

use crate::drm::DrmSession;
use crate::forwarder::NativeEventSink;
use crate::options::PlaybackOptions;
use crate::types::BackendType;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// One advert inside a break
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advert {
    pub id: String,
    pub uri: Url,
    pub duration: Duration,
}

/// Adverts played together at one position of the main content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvertBreak {
    pub id: String,
    pub start: Duration,
    pub adverts: Vec<Advert>,
}

/// Client-supplied source of advert breaks
#[async_trait]
pub trait AdvertsLoader: Send + Sync {
    async fn load(&self) -> anyhow::Result<Vec<AdvertBreak>>;
}

/// Everything an engine needs at construction time
#[derive(Clone)]
pub struct EngineConfig {
    pub user_agent: String,
    pub allow_fallback_decoder: bool,
    pub allow_cross_protocol_redirects: bool,
    /// Only set for backends that can play adverts
    pub adverts_loader: Option<Arc<dyn AdvertsLoader>>,
    pub drm_session: Option<Arc<DrmSession>>,
}

impl std::fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineConfig")
            .field("user_agent", &self.user_agent)
            .field("allow_fallback_decoder", &self.allow_fallback_decoder)
            .field("allow_cross_protocol_redirects", &self.allow_cross_protocol_redirects)
            .field("adverts_loader", &self.adverts_loader.is_some())
            .field("drm_session", &self.drm_session.as_ref().map(|s| s.id()))
            .finish()
    }
}

/// A media load as handed to the engine
#[derive(Debug, Clone)]
pub struct LoadRequest {
    pub uri: Url,
    pub options: PlaybackOptions,
}

/// Concrete playback implementation.
///
/// Commands run on the caller's thread; native callbacks go through the
/// sink passed to [`attach`](PlaybackEngine::attach).
pub trait PlaybackEngine: Send {
    fn backend_type(&self) -> BackendType;

    /// Called exactly once, before any other command
    fn attach(&mut self, sink: NativeEventSink);

    fn load_video(&mut self, request: &LoadRequest) -> anyhow::Result<()>;

    fn play(&mut self) -> anyhow::Result<()>;

    fn pause(&mut self) -> anyhow::Result<()>;

    fn seek_to(&mut self, position: Duration) -> anyhow::Result<()>;

    fn stop(&mut self) -> anyhow::Result<()>;

    /// Free engine resources; no callbacks may follow
    fn release(&mut self);
}

/// Builds engines for one backend
pub trait EngineCreator: Send + Sync {
    fn backend_type(&self) -> BackendType;

    fn create(&self, config: EngineConfig) -> anyhow::Result<Box<dyn PlaybackEngine>>;
}
