//! Client-facing player handle

use crate::capability::BackendCapability;
use crate::drm::{clamp_security_level, DrmSession};
use crate::engine::{LoadRequest, PlaybackEngine};
use crate::error::{Error, Result};
use crate::forwarder::EventForwarder;
use crate::options::PlaybackOptions;
use crate::types::{BackendType, SessionId};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};
use url::Url;

/// A constructed player: one engine, its event forwarder and, for protected
/// content, its DRM session.
///
/// Dropping the handle releases it.
pub struct PlayerHandle {
    id: SessionId,
    capability: BackendCapability,
    engine: Option<Box<dyn PlaybackEngine>>,
    drm_session: Option<Arc<DrmSession>>,
    forwarder: Arc<EventForwarder>,
}

impl PlayerHandle {
    pub(crate) fn new(
        capability: BackendCapability,
        engine: Box<dyn PlaybackEngine>,
        drm_session: Option<Arc<DrmSession>>,
        forwarder: Arc<EventForwarder>,
    ) -> Self {
        Self {
            id: SessionId::new(),
            capability,
            engine: Some(engine),
            drm_session,
            forwarder,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn backend(&self) -> BackendType {
        self.capability.backend
    }

    pub fn capability(&self) -> &BackendCapability {
        &self.capability
    }

    /// Event bindings for this player
    pub fn events(&self) -> &EventForwarder {
        &self.forwarder
    }

    pub fn drm_session(&self) -> Option<&Arc<DrmSession>> {
        self.drm_session.as_ref()
    }

    pub fn is_released(&self) -> bool {
        self.engine.is_none()
    }

    fn engine(&mut self) -> Result<&mut Box<dyn PlaybackEngine>> {
        self.engine.as_mut().ok_or(Error::PlayerReleased)
    }

    /// Hand a video to the engine. Playback starts with [`play`](Self::play).
    #[instrument(skip(self, options), fields(player_id = %self.id, content_type = %options.content_type()))]
    pub fn load_video(&mut self, uri: &Url, options: &PlaybackOptions) -> Result<()> {
        let engine = self.engine.as_mut().ok_or(Error::PlayerReleased)?;

        let drm_type = self
            .drm_session
            .as_ref()
            .map(|s| s.drm_type())
            .unwrap_or_default();
        if !self.capability.supports_content(options.content_type()) {
            return Err(Error::UnsupportedConfiguration {
                drm_type,
                content_type: options.content_type(),
            });
        }

        if let Some(session) = &self.drm_session {
            let forced = clamp_security_level(
                options.forced_drm_security_level(),
                session.device_security_level(),
            )?;
            if let Some(level) = forced {
                session.force_security_level(level);
            }
        }

        self.forwarder.reset_for_load();
        let request = LoadRequest {
            uri: uri.clone(),
            options: options.clone(),
        };
        engine
            .load_video(&request)
            .map_err(|e| Error::Engine(format!("{e:#}")))?;

        info!(uri = %uri, "Video loaded");
        Ok(())
    }

    pub fn play(&mut self) -> Result<()> {
        self.engine()?
            .play()
            .map_err(|e| Error::Engine(format!("{e:#}")))
    }

    pub fn pause(&mut self) -> Result<()> {
        self.engine()?
            .pause()
            .map_err(|e| Error::Engine(format!("{e:#}")))
    }

    pub fn seek_to(&mut self, position: Duration) -> Result<()> {
        self.engine()?
            .seek_to(position)
            .map_err(|e| Error::Engine(format!("{e:#}")))
    }

    pub fn stop(&mut self) -> Result<()> {
        self.engine()?
            .stop()
            .map_err(|e| Error::Engine(format!("{e:#}")))
    }

    /// Tear down engine, DRM session and forwarder, in that order
    pub fn release(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        let Some(mut engine) = self.engine.take() else {
            return;
        };
        engine.release();
        if let Some(session) = &self.drm_session {
            session.close();
        }
        self.forwarder.release();
        debug!(player_id = %self.id, backend = %self.backend(), "Player released");
    }
}

impl Drop for PlayerHandle {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl std::fmt::Debug for PlayerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerHandle")
            .field("id", &self.id)
            .field("backend", &self.backend())
            .field("released", &self.is_released())
            .field("drm_session", &self.drm_session.as_ref().map(|s| s.id()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drm::StaticDeviceProbe;
    use crate::engine::SimulatedEngineCreator;
    use crate::selector::{PlayerFactory, SelectionRequest};

    #[test]
    fn test_torn_down_handle_reports_released() {
        let creator = SimulatedEngineCreator::new(BackendType::Streaming);
        let mut player = PlayerFactory::new(Arc::new(StaticDeviceProbe::default()))
            .register(Arc::new(creator.clone()))
            .select(&SelectionRequest::builder().build().unwrap())
            .unwrap();

        player.teardown();
        assert!(player.is_released());

        let uri = Url::parse("https://cdn.example.com/video.mp4").unwrap();
        let err = player
            .load_video(&uri, &PlaybackOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::PlayerReleased));
        assert!(matches!(player.play(), Err(Error::PlayerReleased)));
        assert_eq!(creator.commands(), vec!["attach", "release"]);
    }
}
