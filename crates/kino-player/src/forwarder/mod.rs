//! Event forwarding
//!
//! ```text
//! ┌──────────────┐  NativeEvent   ┌──────────────────┐  unified events
//! │    Engine    │ ─────────────▶ │  EventForwarder  │ ───────────────▶ listeners
//! │ (any backend)│  NativeEventSink │  PlaybackTracker │   (per kind, in
//! └──────────────┘                └──────────────────┘    bind order)
//! ```
//!
//! Engines only ever see a [`NativeEventSink`]. The forwarder turns each
//! native callback into zero or more unified events followed by exactly one
//! [`InfoEvent`], then fans them out synchronously on the calling thread.

mod translate;

pub use translate::{platform_error, player_error};

use crate::error::panic_message;
use crate::events::{
    AdvertEvent, BitrateChanged, BufferState, Completion, DroppedVideoFrames, EventKind, InfoEvent,
    Listener, PlayerError, Prepared, StateChange, TracksChanged, VideoSize,
};
use crate::native::{
    AnalyticsNative, MediaSourceNative, NativeEvent, NativePlaybackState, PlatformNative,
    PlayerNative, VideoNative,
};
use crate::types::{BackendType, TrackType};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, info, warn};

/// A translated event, tagged with its kind
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "event", rename_all = "snake_case")]
pub enum UnifiedEvent {
    Prepared(Prepared),
    Completion(Completion),
    Error(PlayerError),
    StateChanged(StateChange),
    BufferState(BufferState),
    VideoSizeChanged(VideoSize),
    BitrateChanged(BitrateChanged),
    TracksChanged(TracksChanged),
    DroppedVideoFrames(DroppedVideoFrames),
    Advert(AdvertEvent),
    Info(InfoEvent),
}

impl UnifiedEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            UnifiedEvent::Prepared(_) => EventKind::Prepared,
            UnifiedEvent::Completion(_) => EventKind::Completion,
            UnifiedEvent::Error(_) => EventKind::Error,
            UnifiedEvent::StateChanged(_) => EventKind::StateChanged,
            UnifiedEvent::BufferState(_) => EventKind::BufferState,
            UnifiedEvent::VideoSizeChanged(_) => EventKind::VideoSizeChanged,
            UnifiedEvent::BitrateChanged(_) => EventKind::BitrateChanged,
            UnifiedEvent::TracksChanged(_) => EventKind::TracksChanged,
            UnifiedEvent::DroppedVideoFrames(_) => EventKind::DroppedVideoFrames,
            UnifiedEvent::Advert(_) => EventKind::Advert,
            UnifiedEvent::Info(_) => EventKind::Info,
        }
    }
}

#[derive(Default)]
struct ListenerTable {
    prepared: Vec<Arc<dyn Listener<Prepared>>>,
    completion: Vec<Arc<dyn Listener<Completion>>>,
    error: Vec<Arc<dyn Listener<PlayerError>>>,
    state_changed: Vec<Arc<dyn Listener<StateChange>>>,
    buffer_state: Vec<Arc<dyn Listener<BufferState>>>,
    video_size_changed: Vec<Arc<dyn Listener<VideoSize>>>,
    bitrate_changed: Vec<Arc<dyn Listener<BitrateChanged>>>,
    tracks_changed: Vec<Arc<dyn Listener<TracksChanged>>>,
    dropped_video_frames: Vec<Arc<dyn Listener<DroppedVideoFrames>>>,
    advert: Vec<Arc<dyn Listener<AdvertEvent>>>,
    info: Vec<Arc<dyn Listener<InfoEvent>>>,
}

impl ListenerTable {
    fn count(&self, kind: EventKind) -> usize {
        match kind {
            EventKind::Prepared => self.prepared.len(),
            EventKind::Completion => self.completion.len(),
            EventKind::Error => self.error.len(),
            EventKind::StateChanged => self.state_changed.len(),
            EventKind::BufferState => self.buffer_state.len(),
            EventKind::VideoSizeChanged => self.video_size_changed.len(),
            EventKind::BitrateChanged => self.bitrate_changed.len(),
            EventKind::TracksChanged => self.tracks_changed.len(),
            EventKind::DroppedVideoFrames => self.dropped_video_frames.len(),
            EventKind::Advert => self.advert.len(),
            EventKind::Info => self.info.len(),
        }
    }
}

/// Playback state remembered between native callbacks
#[derive(Debug, Default)]
struct PlaybackTracker {
    prepared: bool,
    duration: Option<Duration>,
    play_when_ready: Option<bool>,
    playback_state: Option<NativePlaybackState>,
    /// An error was reported and the engine has not left idle since
    failed: bool,
    bitrates: HashMap<TrackType, u64>,
}

impl PlaybackTracker {
    fn translate(&mut self, backend: BackendType, event: &NativeEvent) -> Vec<UnifiedEvent> {
        let mut out = Vec::new();

        match event {
            NativeEvent::Player(player) => self.player(backend, player, &mut out),
            NativeEvent::MediaSource(MediaSourceNative::DownstreamFormatChanged { track_type, format }) => {
                if let Some(change) = translate::bitrate_changed(*track_type, format) {
                    if self.bitrates.insert(*track_type, change.bitrate) != Some(change.bitrate) {
                        out.push(UnifiedEvent::BitrateChanged(change));
                    }
                }
            }
            NativeEvent::MediaSource(_) => {}
            NativeEvent::Analytics(AnalyticsNative::DroppedVideoFrames { count, elapsed }) => {
                out.push(UnifiedEvent::DroppedVideoFrames(DroppedVideoFrames {
                    count: *count,
                    elapsed: *elapsed,
                }));
            }
            NativeEvent::Analytics(_) => {}
            NativeEvent::Video(VideoNative::SizeChanged {
                width,
                height,
                unapplied_rotation_degrees,
                pixel_width_height_ratio,
            }) => {
                out.push(UnifiedEvent::VideoSizeChanged(translate::video_size(
                    *width,
                    *height,
                    *unapplied_rotation_degrees,
                    *pixel_width_height_ratio,
                )));
            }
            NativeEvent::Video(VideoNative::RenderedFirstFrame) => {}
            NativeEvent::Drm(_) => {}
            NativeEvent::Advert(advert) => out.push(UnifiedEvent::Advert(translate::advert(advert))),
            NativeEvent::Platform(platform) => self.platform(backend, platform, &mut out),
        }

        out.push(UnifiedEvent::Info(translate::info(event)));
        out
    }

    fn player(&mut self, backend: BackendType, event: &PlayerNative, out: &mut Vec<UnifiedEvent>) {
        match event {
            PlayerNative::TimelineChanged { duration } => {
                self.duration = *duration;
            }
            PlayerNative::StateChanged {
                play_when_ready,
                playback_state,
            } => {
                let previous = self.playback_state.replace(*playback_state);
                if previous != Some(*playback_state) {
                    if *playback_state == NativePlaybackState::Buffering {
                        out.push(UnifiedEvent::BufferState(BufferState::Started));
                    } else if previous == Some(NativePlaybackState::Buffering) {
                        out.push(UnifiedEvent::BufferState(BufferState::Completed));
                    }

                    if *playback_state == NativePlaybackState::Ready && !self.prepared {
                        self.prepared = true;
                        out.push(UnifiedEvent::Prepared(Prepared {
                            backend,
                            duration: self.duration,
                        }));
                    }
                }

                let was_playing = self.play_when_ready.replace(*play_when_ready);
                let toggled = match was_playing {
                    Some(previous) => previous != *play_when_ready,
                    None => *play_when_ready,
                };
                if toggled {
                    out.push(UnifiedEvent::StateChanged(translate::state_change(*play_when_ready)));
                }

                if previous != Some(NativePlaybackState::Ended)
                    && *playback_state == NativePlaybackState::Ended
                {
                    out.push(UnifiedEvent::Completion(Completion));
                    out.push(UnifiedEvent::StateChanged(StateChange::Stopped));
                }

                // Engine reset after playback started, not after a failure
                if *playback_state == NativePlaybackState::Idle {
                    let was_active = matches!(
                        previous,
                        Some(NativePlaybackState::Ready | NativePlaybackState::Buffering)
                    );
                    if was_active && self.prepared && !self.failed {
                        out.push(UnifiedEvent::StateChanged(StateChange::Stopped));
                    }
                } else {
                    self.failed = false;
                }
            }
            PlayerNative::Error(error) => {
                self.failed = true;
                out.push(UnifiedEvent::Error(translate::player_error(error)));
            }
            PlayerNative::TracksChanged { tracks } => {
                out.push(UnifiedEvent::TracksChanged(translate::tracks_changed(tracks)));
            }
            PlayerNative::LoadingChanged { .. }
            | PlayerNative::PositionDiscontinuity { .. }
            | PlayerNative::PlaybackParametersChanged { .. } => {}
        }
    }

    fn platform(&mut self, backend: BackendType, event: &PlatformNative, out: &mut Vec<UnifiedEvent>) {
        match event {
            PlatformNative::Prepared { duration } => {
                self.prepared = true;
                self.duration = *duration;
                out.push(UnifiedEvent::Prepared(Prepared {
                    backend,
                    duration: *duration,
                }));
            }
            PlatformNative::Completion => {
                out.push(UnifiedEvent::Completion(Completion));
                out.push(UnifiedEvent::StateChanged(StateChange::Stopped));
            }
            PlatformNative::Error { what, extra } => {
                out.push(UnifiedEvent::Error(translate::platform_error(*what, *extra)));
            }
            PlatformNative::Info { what, .. } => {
                if let Some(state) = translate::platform_buffer_state(*what) {
                    out.push(UnifiedEvent::BufferState(state));
                }
            }
            PlatformNative::VideoSizeChanged { width, height } => {
                out.push(UnifiedEvent::VideoSizeChanged(translate::video_size(
                    *width, *height, 0, 1.0,
                )));
            }
            PlatformNative::Started => out.push(UnifiedEvent::StateChanged(StateChange::Playing)),
            PlatformNative::Paused => out.push(UnifiedEvent::StateChanged(StateChange::Paused)),
            PlatformNative::Stopped => out.push(UnifiedEvent::StateChanged(StateChange::Stopped)),
            PlatformNative::BufferingUpdate { .. } | PlatformNative::SeekComplete => {}
        }
    }
}

/// Fans native engine callbacks out to client listeners
pub struct EventForwarder {
    backend: BackendType,
    listeners: RwLock<ListenerTable>,
    tracker: Mutex<PlaybackTracker>,
    released: AtomicBool,
    faults: AtomicU64,
}

impl EventForwarder {
    pub fn new(backend: BackendType) -> Self {
        Self {
            backend,
            listeners: RwLock::new(ListenerTable::default()),
            tracker: Mutex::new(PlaybackTracker::default()),
            released: AtomicBool::new(false),
            faults: AtomicU64::new(0),
        }
    }

    pub fn backend(&self) -> BackendType {
        self.backend
    }

    /// Handle given to the engine; holds no strong reference
    pub fn sink(self: &Arc<Self>) -> NativeEventSink {
        NativeEventSink {
            backend: self.backend,
            forwarder: Arc::downgrade(self),
        }
    }

    pub fn bind_prepared(&self, listener: impl Listener<Prepared> + 'static) {
        self.listeners.write().prepared.push(Arc::new(listener));
        self.bound(EventKind::Prepared);
    }

    pub fn bind_completion(&self, listener: impl Listener<Completion> + 'static) {
        self.listeners.write().completion.push(Arc::new(listener));
        self.bound(EventKind::Completion);
    }

    pub fn bind_error(&self, listener: impl Listener<PlayerError> + 'static) {
        self.listeners.write().error.push(Arc::new(listener));
        self.bound(EventKind::Error);
    }

    pub fn bind_state_changed(&self, listener: impl Listener<StateChange> + 'static) {
        self.listeners.write().state_changed.push(Arc::new(listener));
        self.bound(EventKind::StateChanged);
    }

    pub fn bind_buffer_state(&self, listener: impl Listener<BufferState> + 'static) {
        self.listeners.write().buffer_state.push(Arc::new(listener));
        self.bound(EventKind::BufferState);
    }

    pub fn bind_video_size_changed(&self, listener: impl Listener<VideoSize> + 'static) {
        self.listeners.write().video_size_changed.push(Arc::new(listener));
        self.bound(EventKind::VideoSizeChanged);
    }

    pub fn bind_bitrate_changed(&self, listener: impl Listener<BitrateChanged> + 'static) {
        self.listeners.write().bitrate_changed.push(Arc::new(listener));
        self.bound(EventKind::BitrateChanged);
    }

    pub fn bind_tracks_changed(&self, listener: impl Listener<TracksChanged> + 'static) {
        self.listeners.write().tracks_changed.push(Arc::new(listener));
        self.bound(EventKind::TracksChanged);
    }

    pub fn bind_dropped_video_frames(&self, listener: impl Listener<DroppedVideoFrames> + 'static) {
        self.listeners.write().dropped_video_frames.push(Arc::new(listener));
        self.bound(EventKind::DroppedVideoFrames);
    }

    pub fn bind_advert(&self, listener: impl Listener<AdvertEvent> + 'static) {
        self.listeners.write().advert.push(Arc::new(listener));
        self.bound(EventKind::Advert);
    }

    /// Raw view of every native callback
    pub fn bind_info(&self, listener: impl Listener<InfoEvent> + 'static) {
        self.listeners.write().info.push(Arc::new(listener));
        self.bound(EventKind::Info);
    }

    fn bound(&self, kind: EventKind) {
        debug!(backend = %self.backend, kind = %kind, "Listener bound");
    }

    pub fn binding_count(&self, kind: EventKind) -> usize {
        self.listeners.read().count(kind)
    }

    pub fn is_bound(&self, kind: EventKind) -> bool {
        self.binding_count(kind) > 0
    }

    /// Listener errors and panics swallowed so far
    pub fn fault_count(&self) -> u64 {
        self.faults.load(Ordering::Relaxed)
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    /// Translate one native callback and notify listeners.
    ///
    /// Runs on the engine's thread; returns once every listener has run.
    pub fn dispatch(&self, event: NativeEvent) {
        if self.is_released() {
            debug!(backend = %self.backend, "Forwarder released, dropping native event");
            return;
        }

        let events = self.tracker.lock().translate(self.backend, &event);
        for unified in &events {
            self.deliver(unified);
        }
    }

    /// Forget per-content state before a new video is loaded
    pub(crate) fn reset_for_load(&self) {
        *self.tracker.lock() = PlaybackTracker::default();
    }

    /// Stop forwarding and drop every client listener
    pub(crate) fn release(&self) {
        if self.released.swap(true, Ordering::AcqRel) {
            return;
        }
        *self.listeners.write() = ListenerTable::default();
        info!(
            backend = %self.backend,
            faults = self.fault_count(),
            "Event forwarder released"
        );
    }

    fn deliver(&self, event: &UnifiedEvent) {
        // Snapshot so listeners can bind from inside a callback
        match event {
            UnifiedEvent::Prepared(e) => {
                let listeners = self.listeners.read().prepared.clone();
                self.notify(EventKind::Prepared, &listeners, e);
            }
            UnifiedEvent::Completion(e) => {
                let listeners = self.listeners.read().completion.clone();
                self.notify(EventKind::Completion, &listeners, e);
            }
            UnifiedEvent::Error(e) => {
                let listeners = self.listeners.read().error.clone();
                self.notify(EventKind::Error, &listeners, e);
            }
            UnifiedEvent::StateChanged(e) => {
                let listeners = self.listeners.read().state_changed.clone();
                self.notify(EventKind::StateChanged, &listeners, e);
            }
            UnifiedEvent::BufferState(e) => {
                let listeners = self.listeners.read().buffer_state.clone();
                self.notify(EventKind::BufferState, &listeners, e);
            }
            UnifiedEvent::VideoSizeChanged(e) => {
                let listeners = self.listeners.read().video_size_changed.clone();
                self.notify(EventKind::VideoSizeChanged, &listeners, e);
            }
            UnifiedEvent::BitrateChanged(e) => {
                let listeners = self.listeners.read().bitrate_changed.clone();
                self.notify(EventKind::BitrateChanged, &listeners, e);
            }
            UnifiedEvent::TracksChanged(e) => {
                let listeners = self.listeners.read().tracks_changed.clone();
                self.notify(EventKind::TracksChanged, &listeners, e);
            }
            UnifiedEvent::DroppedVideoFrames(e) => {
                let listeners = self.listeners.read().dropped_video_frames.clone();
                self.notify(EventKind::DroppedVideoFrames, &listeners, e);
            }
            UnifiedEvent::Advert(e) => {
                let listeners = self.listeners.read().advert.clone();
                self.notify(EventKind::Advert, &listeners, e);
            }
            UnifiedEvent::Info(e) => {
                let listeners = self.listeners.read().info.clone();
                self.notify(EventKind::Info, &listeners, e);
            }
        }
    }

    fn notify<E>(&self, kind: EventKind, listeners: &[Arc<dyn Listener<E>>], event: &E) {
        for (index, listener) in listeners.iter().enumerate() {
            let fault = match panic::catch_unwind(AssertUnwindSafe(|| listener.on_event(event))) {
                Ok(Ok(())) => continue,
                Ok(Err(error)) => format!("{error:#}"),
                Err(payload) => format!("listener panicked: {}", panic_message(&*payload)),
            };

            self.faults.fetch_add(1, Ordering::Relaxed);
            warn!(
                backend = %self.backend,
                kind = %kind,
                listener = index,
                error = %fault,
                "Listener failed"
            );
        }
    }
}

impl std::fmt::Debug for EventForwarder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventForwarder")
            .field("backend", &self.backend)
            .field("released", &self.is_released())
            .field("faults", &self.fault_count())
            .finish()
    }
}

/// Engine-side handle for reporting native callbacks
#[derive(Clone)]
pub struct NativeEventSink {
    backend: BackendType,
    forwarder: Weak<EventForwarder>,
}

impl NativeEventSink {
    pub fn backend(&self) -> BackendType {
        self.backend
    }

    /// Forward one callback; `false` once the player is gone
    pub fn emit(&self, event: impl Into<NativeEvent>) -> bool {
        match self.forwarder.upgrade() {
            Some(forwarder) if !forwarder.is_released() => {
                forwarder.dispatch(event.into());
                true
            }
            _ => false,
        }
    }
}

impl std::fmt::Debug for NativeEventSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeEventSink")
            .field("backend", &self.backend)
            .field("connected", &(self.forwarder.strong_count() > 0))
            .finish()
    }
}
