//! In-process engine that reports plausible native callbacks
//!
//! Used by the CLI and by tests. Streaming engines speak the
//! player/media-source/video vocabulary, platform engines the legacy
//! decoder one.

use super::{EngineConfig, EngineCreator, LoadRequest, PlaybackEngine};
use crate::drm::ModularDrmKeyRequest;
use crate::forwarder::NativeEventSink;
use crate::native::{
    DrmNative, MediaSourceNative, NativeErrorCause, NativeErrorType, NativeEvent, NativeFormat,
    NativePlaybackError, NativePlaybackState, PlatformNative, PlayerNative, VideoNative,
};
use crate::types::{BackendType, TrackType};
use anyhow::{bail, ensure};
use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Content length every simulated load reports
pub const SIMULATED_DURATION: Duration = Duration::from_secs(120);

const SIMULATED_WIDTH: u32 = 1280;
const SIMULATED_HEIGHT: u32 = 720;

#[derive(Default)]
struct CreatorState {
    configs: Vec<EngineConfig>,
    sink: Option<NativeEventSink>,
    commands: Vec<String>,
}

/// Creator for [`SimulatedEngine`]s, keeping a record of what it built
#[derive(Clone)]
pub struct SimulatedEngineCreator {
    backend: BackendType,
    failure: Option<String>,
    created: Arc<AtomicUsize>,
    state: Arc<Mutex<CreatorState>>,
}

impl SimulatedEngineCreator {
    pub fn new(backend: BackendType) -> Self {
        Self {
            backend,
            failure: None,
            created: Arc::new(AtomicUsize::new(0)),
            state: Arc::new(Mutex::new(CreatorState::default())),
        }
    }

    /// Every `create` call fails with `reason`
    pub fn failing(mut self, reason: impl Into<String>) -> Self {
        self.failure = Some(reason.into());
        self
    }

    /// Engines successfully created so far
    pub fn created_count(&self) -> usize {
        self.created.load(Ordering::Relaxed)
    }

    /// Configurations passed to `create`, including failed attempts
    pub fn configs(&self) -> Vec<EngineConfig> {
        self.state.lock().configs.clone()
    }

    /// Sink attached to the most recent engine
    pub fn sink(&self) -> Option<NativeEventSink> {
        self.state.lock().sink.clone()
    }

    /// Commands received by engines of this creator, in order
    pub fn commands(&self) -> Vec<String> {
        self.state.lock().commands.clone()
    }
}

impl EngineCreator for SimulatedEngineCreator {
    fn backend_type(&self) -> BackendType {
        self.backend
    }

    fn create(&self, config: EngineConfig) -> anyhow::Result<Box<dyn PlaybackEngine>> {
        self.state.lock().configs.push(config.clone());
        if let Some(reason) = &self.failure {
            bail!("{reason}");
        }

        self.created.fetch_add(1, Ordering::Relaxed);
        Ok(Box::new(SimulatedEngine {
            backend: self.backend,
            config,
            sink: None,
            loaded: false,
            released: false,
            state: Arc::clone(&self.state),
        }))
    }
}

/// Engine that turns commands into native callbacks
pub struct SimulatedEngine {
    backend: BackendType,
    config: EngineConfig,
    sink: Option<NativeEventSink>,
    loaded: bool,
    released: bool,
    state: Arc<Mutex<CreatorState>>,
}

impl SimulatedEngine {
    fn record(&self, command: &str) {
        self.state.lock().commands.push(command.to_string());
    }

    fn emit(&self, event: impl Into<NativeEvent>) {
        if let Some(sink) = &self.sink {
            sink.emit(event);
        }
    }

    fn ready(&self) -> anyhow::Result<()> {
        ensure!(!self.released, "engine released");
        ensure!(self.sink.is_some(), "engine not attached");
        Ok(())
    }

    fn streaming_state(&self, play_when_ready: bool, playback_state: NativePlaybackState) {
        self.emit(PlayerNative::StateChanged {
            play_when_ready,
            playback_state,
        });
    }

    /// Run the license round trip; false when keys could not be obtained
    fn acquire_keys(&self, request: &LoadRequest) -> bool {
        let Some(session) = &self.config.drm_session else {
            return true;
        };
        if !session.requires_key_exchange() {
            return true;
        }

        let challenge = ModularDrmKeyRequest::new(Bytes::from(request.uri.to_string()));
        match session.execute_key_request(&challenge) {
            Ok(keys) => {
                debug!(bytes = keys.len(), "Simulated engine received keys");
                self.emit(DrmNative::KeysLoaded);
                true
            }
            Err(error) => {
                warn!(error = %error, "Simulated engine failed to obtain keys");
                self.emit(DrmNative::SessionManagerError {
                    message: error.message().to_string(),
                });
                self.emit(PlayerNative::Error(NativePlaybackError {
                    error_type: NativeErrorType::Renderer,
                    cause: NativeErrorCause::DrmSession,
                    message: error.to_string(),
                }));
                false
            }
        }
    }

    fn load_streaming(&self, request: &LoadRequest) {
        let uri = request.uri.to_string();
        self.emit(PlayerNative::TimelineChanged {
            duration: Some(SIMULATED_DURATION),
        });
        self.streaming_state(false, NativePlaybackState::Buffering);
        self.emit(MediaSourceNative::LoadStarted {
            uri: uri.clone(),
            track_type: TrackType::Video,
        });

        if !self.acquire_keys(request) {
            self.streaming_state(false, NativePlaybackState::Idle);
            return;
        }

        let bitrate = match (request.options.max_initial_bitrate(), request.options.max_video_bitrate()) {
            (Some(initial), _) => initial,
            (None, Some(max)) => max,
            (None, None) => 2_000_000,
        };
        self.emit(MediaSourceNative::DownstreamFormatChanged {
            track_type: TrackType::Video,
            format: NativeFormat {
                id: Some("video-0".to_string()),
                bitrate: Some(bitrate),
                width: Some(SIMULATED_WIDTH),
                height: Some(SIMULATED_HEIGHT),
            },
        });
        self.emit(MediaSourceNative::LoadCompleted {
            uri,
            bytes_loaded: bitrate / 8,
            load_duration: Duration::from_millis(250),
        });
        self.streaming_state(false, NativePlaybackState::Ready);
        self.emit(VideoNative::SizeChanged {
            width: SIMULATED_WIDTH,
            height: SIMULATED_HEIGHT,
            unapplied_rotation_degrees: 0,
            pixel_width_height_ratio: 1.0,
        });
        if let Some(position) = request.options.initial_position() {
            self.emit(PlayerNative::PositionDiscontinuity {
                reason: format!("initial position {}ms", position.as_millis()),
            });
        }
    }

    fn load_platform(&self, request: &LoadRequest) {
        if !self.acquire_keys(request) {
            return;
        }
        self.emit(PlatformNative::Prepared {
            duration: Some(SIMULATED_DURATION),
        });
        self.emit(PlatformNative::VideoSizeChanged {
            width: SIMULATED_WIDTH,
            height: SIMULATED_HEIGHT,
        });
        if request.options.initial_position().is_some() {
            self.emit(PlatformNative::SeekComplete);
        }
    }
}

impl PlaybackEngine for SimulatedEngine {
    fn backend_type(&self) -> BackendType {
        self.backend
    }

    fn attach(&mut self, sink: NativeEventSink) {
        self.record("attach");
        self.state.lock().sink = Some(sink.clone());
        self.sink = Some(sink);
    }

    fn load_video(&mut self, request: &LoadRequest) -> anyhow::Result<()> {
        self.ready()?;
        self.record("load_video");
        match self.backend {
            BackendType::Streaming => self.load_streaming(request),
            BackendType::Platform => self.load_platform(request),
        }
        self.loaded = true;
        Ok(())
    }

    fn play(&mut self) -> anyhow::Result<()> {
        self.ready()?;
        ensure!(self.loaded, "no video loaded");
        self.record("play");
        match self.backend {
            BackendType::Streaming => self.streaming_state(true, NativePlaybackState::Ready),
            BackendType::Platform => self.emit(PlatformNative::Started),
        }
        Ok(())
    }

    fn pause(&mut self) -> anyhow::Result<()> {
        self.ready()?;
        ensure!(self.loaded, "no video loaded");
        self.record("pause");
        match self.backend {
            BackendType::Streaming => self.streaming_state(false, NativePlaybackState::Ready),
            BackendType::Platform => self.emit(PlatformNative::Paused),
        }
        Ok(())
    }

    fn seek_to(&mut self, position: Duration) -> anyhow::Result<()> {
        self.ready()?;
        ensure!(self.loaded, "no video loaded");
        ensure!(position <= SIMULATED_DURATION, "seek beyond end of content");
        self.record("seek_to");
        match self.backend {
            BackendType::Streaming => self.emit(PlayerNative::PositionDiscontinuity {
                reason: format!("seek {}ms", position.as_millis()),
            }),
            BackendType::Platform => self.emit(PlatformNative::SeekComplete),
        }
        Ok(())
    }

    fn stop(&mut self) -> anyhow::Result<()> {
        self.ready()?;
        self.record("stop");
        match self.backend {
            BackendType::Streaming => self.streaming_state(false, NativePlaybackState::Idle),
            BackendType::Platform => self.emit(PlatformNative::Stopped),
        }
        self.loaded = false;
        Ok(())
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.record("release");
        self.released = true;
        self.sink = None;
    }
}
