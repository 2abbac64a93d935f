//! Kino Player - Playback abstraction layer for Kino
//!
//! This crate sits between client code and interchangeable playback engines:
//! - Capability descriptors for each backend engine
//! - Ordered first-fit backend selection
//! - DRM session construction with security level and decoder policy
//! - Live or persisted license key exchange
//! - Unified player events with per-kind listener fan-out
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         Kino Player                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐          │
//! │  │  Capability  │  │   Selection  │  │ DRM Session  │          │
//! │  │    Table     │  │   Request    │  │   Factory    │          │
//! │  └──────┬───────┘  └──────┬───────┘  └──────┬───────┘          │
//! │         │                 │                 │                   │
//! │         └─────────────────┼─────────────────┘                   │
//! │                           │                                     │
//! │                    ┌──────┴──────┐                              │
//! │                    │   Player    │                              │
//! │                    │   Factory   │                              │
//! │                    └──────┬──────┘                              │
//! │                           │                                     │
//! │  ┌──────────────┐  ┌──────┴──────┐  ┌──────────────┐           │
//! │  │    Engine    │──│   Player    │──│    Event     │           │
//! │  │  (backend)   │  │   Handle    │  │  Forwarder   │           │
//! │  └──────────────┘  └─────────────┘  └──────────────┘           │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod capability;
pub mod config;
pub mod drm;
pub mod engine;
pub mod error;
pub mod events;
pub mod forwarder;
pub mod native;
pub mod options;
pub mod player;
pub mod selector;
pub mod types;

pub use capability::{BackendCapability, CapabilityTable};
pub use config::PlayerProfile;
pub use drm::{
    DeviceCapabilityProbe, DrmRequest, DrmRequestError, DrmSession, DrmSessionFactory, KeyExchange,
    KeyRequestTransport, ModularDrmKeyRequest, StaticDeviceProbe,
};
pub use engine::{EngineConfig, EngineCreator, PlaybackEngine, SimulatedEngineCreator};
pub use error::{Error, Result};
pub use events::{EventKind, Listener};
pub use forwarder::{EventForwarder, NativeEventSink, UnifiedEvent};
pub use native::NativeEvent;
pub use options::PlaybackOptions;
pub use player::PlayerHandle;
pub use selector::{PlayerFactory, SelectionRequest};
pub use types::*;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the player library with default configuration
pub fn init() {
    tracing::info!(version = VERSION, "Kino Player initialized");
}
