//! Integration tests for Kino Player

use bytes::Bytes;
use kino_player::events::{BufferState, Completion, InfoEvent, Prepared, StateChange};
use kino_player::native::{DrmNative, PlatformNative};
use kino_player::{
    BackendCapability, BackendType, CapabilityTable, ContentType, DrmRequest, DrmSecurityLevel,
    DrmType, Error, EventKind, KeySetId, ModularDrmKeyRequest, PlaybackOptions, PlayerFactory,
    PlayerProfile, SelectionRequest, SimulatedEngineCreator, StaticDeviceProbe,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

fn device(level: DrmSecurityLevel) -> Arc<StaticDeviceProbe> {
    Arc::new(StaticDeviceProbe {
        security_level: level,
        secure_decoder: true,
        modular_drm: true,
    })
}

struct Engines {
    streaming: SimulatedEngineCreator,
    platform: SimulatedEngineCreator,
}

impl Engines {
    fn new() -> Self {
        Self {
            streaming: SimulatedEngineCreator::new(BackendType::Streaming),
            platform: SimulatedEngineCreator::new(BackendType::Platform),
        }
    }

    fn factory(&self, level: DrmSecurityLevel) -> PlayerFactory {
        PlayerFactory::new(device(level))
            .register(Arc::new(self.streaming.clone()))
            .register(Arc::new(self.platform.clone()))
    }

    fn total_created(&self) -> usize {
        self.streaming.created_count() + self.platform.created_count()
    }
}

fn counting_transport(calls: &Arc<AtomicUsize>) -> Arc<dyn kino_player::KeyRequestTransport> {
    let calls = Arc::clone(calls);
    Arc::new(move |request: &ModularDrmKeyRequest| -> anyhow::Result<Bytes> {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(Bytes::from(format!("license-for-{}", request.data.len())))
    })
}

fn video_url() -> Url {
    Url::parse("https://cdn.example.com/content/manifest.mpd").unwrap()
}

// =============================================================================
// Selection Tests
// =============================================================================

#[test]
fn test_unsupported_pair_creates_no_engine() {
    let engines = Engines::new();
    let factory = engines.factory(DrmSecurityLevel::L1);
    let request = SelectionRequest::builder()
        .with_priority(BackendType::Platform, &[])
        .with_drm(DrmRequest::widevine_modular_download(KeySetId::new(&b"keys"[..])))
        .with_content_type(ContentType::Dash)
        .build()
        .unwrap();

    let err = factory.select(&request).unwrap_err();
    assert!(matches!(
        err,
        Error::UnsupportedConfiguration {
            drm_type: DrmType::WidevineModularDownload,
            content_type: ContentType::Dash,
        }
    ));
    assert_eq!(engines.total_created(), 0);
}

#[test]
fn test_lowest_index_supporting_backend_wins() {
    let engines = Engines::new();
    let factory = engines.factory(DrmSecurityLevel::L1);

    for (priority, expected) in [
        (vec![BackendType::Streaming, BackendType::Platform], BackendType::Streaming),
        (vec![BackendType::Platform, BackendType::Streaming], BackendType::Platform),
    ] {
        let request = SelectionRequest::builder()
            .with_priority_list(priority)
            .with_content_type(ContentType::Hls)
            .build()
            .unwrap();
        assert_eq!(factory.select(&request).unwrap().backend(), expected);
    }
}

#[test]
fn test_drm_capability_decides_backend() {
    let engines = Engines::new();
    let table = CapabilityTable::new()
        .with(BackendCapability::new(
            BackendType::Platform,
            [DrmType::None],
            [ContentType::Dash, ContentType::Hls],
        ))
        .with(BackendCapability::new(
            BackendType::Streaming,
            [DrmType::WidevineModularStream],
            [ContentType::Dash, ContentType::Hls],
        ));
    let factory = engines.factory(DrmSecurityLevel::L1).with_capabilities(table);

    let calls = Arc::new(AtomicUsize::new(0));
    let request = SelectionRequest::builder()
        .with_priority(BackendType::Platform, &[BackendType::Streaming])
        .with_drm(DrmRequest::widevine_modular_stream(counting_transport(&calls)))
        .with_content_type(ContentType::Dash)
        .build()
        .unwrap();

    let player = factory.select(&request).unwrap();
    assert_eq!(player.backend(), BackendType::Streaming);
    let session = player.drm_session().unwrap();
    assert_eq!(session.drm_type(), DrmType::WidevineModularStream);
    assert!(session.requires_key_exchange());
    assert_eq!(engines.platform.created_count(), 0);
}

#[test]
fn test_engine_config_carries_request_flags() {
    let engines = Engines::new();
    let factory = engines.factory(DrmSecurityLevel::L1);
    let request = SelectionRequest::builder()
        .with_priority(BackendType::Streaming, &[])
        .with_user_agent("kino-tests/1.0")
        .allow_fallback_decoder()
        .allow_cross_protocol_redirects()
        .build()
        .unwrap();

    let _player = factory.select(&request).unwrap();
    let config = &engines.streaming.configs()[0];
    assert_eq!(config.user_agent, "kino-tests/1.0");
    assert!(config.allow_fallback_decoder);
    assert!(config.allow_cross_protocol_redirects);
    assert!(config.drm_session.is_none());
    assert_eq!(engines.streaming.commands(), vec!["attach"]);
}

// =============================================================================
// DRM Tests
// =============================================================================

#[test]
fn test_forcing_stronger_level_fails() {
    let engines = Engines::new();
    let factory = engines.factory(DrmSecurityLevel::L3);
    let request = SelectionRequest::builder()
        .with_drm(DrmRequest::widevine_classic())
        .with_priority(BackendType::Platform, &[])
        .with_forced_security_level(DrmSecurityLevel::L1)
        .build()
        .unwrap();

    let err = factory.select(&request).unwrap_err();
    assert!(matches!(
        err,
        Error::UnsupportedSecurityLevel {
            requested: DrmSecurityLevel::L1,
            device: DrmSecurityLevel::L3,
        }
    ));
    assert!(!err.is_recoverable());
    assert_eq!(engines.total_created(), 0);
}

#[test]
fn test_forcing_equal_or_weaker_level_succeeds() {
    let engines = Engines::new();
    let factory = engines.factory(DrmSecurityLevel::L1);

    for level in [DrmSecurityLevel::L1, DrmSecurityLevel::L3] {
        let request = SelectionRequest::builder()
            .with_drm(DrmRequest::widevine_classic())
            .with_priority(BackendType::Platform, &[])
            .with_forced_security_level(level)
            .build()
            .unwrap();
        let player = factory.select(&request).unwrap();
        assert_eq!(player.drm_session().unwrap().security_level(), level);
    }
}

#[test]
fn test_download_never_calls_transport_stream_always_does() {
    let engines = Engines::new();
    let factory = engines.factory(DrmSecurityLevel::L1);
    let options = PlaybackOptions::builder()
        .with_content_type(ContentType::Dash)
        .build()
        .unwrap();

    let download = SelectionRequest::builder()
        .with_drm(DrmRequest::widevine_modular_download(KeySetId::new(&b"offline"[..])))
        .with_content_type(ContentType::Dash)
        .build()
        .unwrap();
    let mut player = factory.select(&download).unwrap();
    player.load_video(&video_url(), &options).unwrap();
    let key = player
        .drm_session()
        .unwrap()
        .execute_key_request(&ModularDrmKeyRequest::new(&b"challenge"[..]))
        .unwrap();
    assert_eq!(key, Bytes::from_static(b"offline"));
    player.release();

    let calls = Arc::new(AtomicUsize::new(0));
    let stream = SelectionRequest::builder()
        .with_drm(DrmRequest::widevine_modular_stream(counting_transport(&calls)))
        .with_content_type(ContentType::Dash)
        .build()
        .unwrap();
    let mut player = factory.select(&stream).unwrap();
    player.load_video(&video_url(), &options).unwrap();
    player
        .drm_session()
        .unwrap()
        .execute_key_request(&ModularDrmKeyRequest::new(&b"renewal"[..]))
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(player.drm_session().unwrap().key_request_count(), 2);
}

#[test]
fn test_failed_license_surfaces_as_drm_error_event() {
    let engines = Engines::new();
    let factory = engines.factory(DrmSecurityLevel::L1);
    let failing: Arc<dyn kino_player::KeyRequestTransport> =
        Arc::new(|_: &ModularDrmKeyRequest| -> anyhow::Result<Bytes> {
            anyhow::bail!("license server returned 403")
        });
    let request = SelectionRequest::builder()
        .with_drm(DrmRequest::widevine_modular_stream(failing))
        .with_content_type(ContentType::Dash)
        .build()
        .unwrap();

    let mut player = factory.select(&request).unwrap();
    let errors = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&errors);
    player.events().bind_error(move |e: &kino_player::events::PlayerError| -> anyhow::Result<()> {
        sink.lock().push(e.clone());
        Ok(())
    });

    let options = PlaybackOptions::builder()
        .with_content_type(ContentType::Dash)
        .build()
        .unwrap();
    player.load_video(&video_url(), &options).unwrap();

    let errors = errors.lock();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, kino_player::events::ErrorKind::Drm);
    assert!(errors[0].message.contains("403"));
}

#[test]
fn test_no_secure_decoder_without_fallback() {
    let engines = Engines::new();
    let factory = PlayerFactory::new(Arc::new(StaticDeviceProbe {
        security_level: DrmSecurityLevel::L3,
        secure_decoder: false,
        modular_drm: true,
    }))
    .register(Arc::new(engines.platform.clone()));

    let strict = SelectionRequest::builder()
        .with_drm(DrmRequest::widevine_classic())
        .with_priority(BackendType::Platform, &[])
        .build()
        .unwrap();
    assert_eq!(
        factory.select(&strict).unwrap_err().error_code(),
        "UNABLE_TO_CREATE_PLAYER"
    );

    let relaxed = SelectionRequest::builder()
        .with_drm(DrmRequest::widevine_classic())
        .with_priority(BackendType::Platform, &[])
        .allow_fallback_decoder()
        .build()
        .unwrap();
    let player = factory.select(&relaxed).unwrap();
    assert_eq!(
        player.drm_session().unwrap().decoder_path(),
        kino_player::drm::DecoderPath::NonSecure
    );
}

// =============================================================================
// Event Forwarding Tests
// =============================================================================

#[test]
fn test_all_listeners_called_once_in_order() {
    let engines = Engines::new();
    let player = engines
        .factory(DrmSecurityLevel::L1)
        .select(&SelectionRequest::builder().build().unwrap())
        .unwrap();

    let order = Arc::new(Mutex::new(Vec::new()));
    for id in 0..5 {
        let order = Arc::clone(&order);
        player.events().bind_completion(move |_: &Completion| -> anyhow::Result<()> {
            order.lock().push(id);
            Ok(())
        });
    }

    let sink = engines.streaming.sink().unwrap();
    sink.emit(kino_player::native::PlayerNative::StateChanged {
        play_when_ready: true,
        playback_state: kino_player::native::NativePlaybackState::Ended,
    });

    assert_eq!(*order.lock(), vec![0, 1, 2, 3, 4]);
}

#[test]
fn test_faulting_listener_does_not_block_others() {
    let engines = Engines::new();
    let request = SelectionRequest::builder()
        .with_priority(BackendType::Platform, &[])
        .build()
        .unwrap();
    let player = engines.factory(DrmSecurityLevel::L1).select(&request).unwrap();

    let seen = Arc::new(AtomicUsize::new(0));
    player
        .events()
        .bind_info(|_: &InfoEvent| -> anyhow::Result<()> { anyhow::bail!("analytics offline") });
    player
        .events()
        .bind_info(|_: &InfoEvent| -> anyhow::Result<()> { panic!("bad listener") });
    let counter = Arc::clone(&seen);
    player.events().bind_info(move |_: &InfoEvent| -> anyhow::Result<()> {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    let sink = engines.platform.sink().unwrap();
    sink.emit(PlatformNative::SeekComplete);
    sink.emit(DrmNative::KeysRestored);

    assert_eq!(seen.load(Ordering::SeqCst), 2);
    assert_eq!(player.events().fault_count(), 4);
}

#[test]
fn test_playback_lifecycle_events() {
    let engines = Engines::new();
    let mut player = engines
        .factory(DrmSecurityLevel::L1)
        .select(&SelectionRequest::builder().build().unwrap())
        .unwrap();

    let prepared = Arc::new(Mutex::new(Vec::<Prepared>::new()));
    let states = Arc::new(Mutex::new(Vec::<StateChange>::new()));
    let buffering = Arc::new(Mutex::new(Vec::<BufferState>::new()));
    {
        let prepared = Arc::clone(&prepared);
        player.events().bind_prepared(move |e: &Prepared| -> anyhow::Result<()> {
            prepared.lock().push(e.clone());
            Ok(())
        });
        let states = Arc::clone(&states);
        player.events().bind_state_changed(move |e: &StateChange| -> anyhow::Result<()> {
            states.lock().push(*e);
            Ok(())
        });
        let buffering = Arc::clone(&buffering);
        player.events().bind_buffer_state(move |e: &BufferState| -> anyhow::Result<()> {
            buffering.lock().push(*e);
            Ok(())
        });
    }

    player.load_video(&video_url(), &PlaybackOptions::default()).unwrap();
    player.play().unwrap();
    player.pause().unwrap();
    player.seek_to(Duration::from_secs(30)).unwrap();

    assert_eq!(prepared.lock().len(), 1);
    assert_eq!(prepared.lock()[0].backend, BackendType::Streaming);
    assert_eq!(
        prepared.lock()[0].duration,
        Some(kino_player::engine::SIMULATED_DURATION)
    );
    assert_eq!(*buffering.lock(), vec![BufferState::Started, BufferState::Completed]);
    assert_eq!(*states.lock(), vec![StateChange::Playing, StateChange::Paused]);
    assert!(player.events().is_bound(EventKind::Prepared));
}

#[test]
fn test_stop_reports_stopped_on_every_backend() {
    for backend in BackendType::DEFAULT_PRIORITY {
        let engines = Engines::new();
        let request = SelectionRequest::builder()
            .with_priority(backend, &[])
            .build()
            .unwrap();
        let mut player = engines.factory(DrmSecurityLevel::L1).select(&request).unwrap();
        assert_eq!(player.backend(), backend);

        let states = Arc::new(Mutex::new(Vec::<StateChange>::new()));
        {
            let states = Arc::clone(&states);
            player.events().bind_state_changed(move |e: &StateChange| -> anyhow::Result<()> {
                states.lock().push(*e);
                Ok(())
            });
        }

        player.load_video(&video_url(), &PlaybackOptions::default()).unwrap();
        player.play().unwrap();
        player.pause().unwrap();
        player.stop().unwrap();

        assert_eq!(
            *states.lock(),
            vec![StateChange::Playing, StateChange::Paused, StateChange::Stopped],
            "unexpected states for {backend}"
        );
    }
}

// =============================================================================
// Player Handle Tests
// =============================================================================

#[test]
fn test_load_rejects_unsupported_content() {
    let engines = Engines::new();
    let request = SelectionRequest::builder()
        .with_priority(BackendType::Platform, &[])
        .build()
        .unwrap();
    let mut player = engines.factory(DrmSecurityLevel::L1).select(&request).unwrap();

    let options = PlaybackOptions::builder()
        .with_content_type(ContentType::Dash)
        .build()
        .unwrap();
    let err = player.load_video(&video_url(), &options).unwrap_err();
    assert_eq!(err.error_code(), "UNSUPPORTED_CONFIGURATION");
    assert_eq!(engines.platform.commands(), vec!["attach"]);
}

#[test]
fn test_load_rechecks_forced_level() {
    let engines = Engines::new();
    let request = SelectionRequest::builder()
        .with_drm(DrmRequest::widevine_classic())
        .with_priority(BackendType::Platform, &[])
        .build()
        .unwrap();
    let mut player = engines.factory(DrmSecurityLevel::L3).select(&request).unwrap();

    let options = PlaybackOptions::builder()
        .with_forced_drm_security_level(DrmSecurityLevel::L1)
        .build()
        .unwrap();
    assert!(matches!(
        player.load_video(&video_url(), &options),
        Err(Error::UnsupportedSecurityLevel { .. })
    ));
}

#[test]
fn test_load_applies_weaker_forced_level_to_session() {
    let engines = Engines::new();
    let request = SelectionRequest::builder()
        .with_drm(DrmRequest::widevine_modular_download(KeySetId::new(&b"k"[..])))
        .with_content_type(ContentType::Dash)
        .build()
        .unwrap();
    let mut player = engines.factory(DrmSecurityLevel::L1).select(&request).unwrap();
    let session = Arc::clone(player.drm_session().unwrap());
    assert_eq!(session.security_level(), DrmSecurityLevel::L1);

    let options = PlaybackOptions::builder()
        .with_content_type(ContentType::Dash)
        .with_forced_drm_security_level(DrmSecurityLevel::L3)
        .build()
        .unwrap();
    player.load_video(&video_url(), &options).unwrap();

    assert_eq!(session.security_level(), DrmSecurityLevel::L3);
    assert_eq!(session.forced_security_level(), Some(DrmSecurityLevel::L3));
    assert_eq!(session.device_security_level(), DrmSecurityLevel::L1);
}

#[test]
fn test_release_tears_everything_down() {
    let engines = Engines::new();
    let request = SelectionRequest::builder()
        .with_drm(DrmRequest::widevine_modular_download(KeySetId::new(&b"k"[..])))
        .with_content_type(ContentType::Dash)
        .build()
        .unwrap();
    let player = engines.factory(DrmSecurityLevel::L1).select(&request).unwrap();
    let session = Arc::clone(player.drm_session().unwrap());
    let sink = engines.streaming.sink().unwrap();

    player.release();

    assert!(session.is_closed());
    assert!(!sink.emit(DrmNative::KeysRemoved));
    assert!(session
        .execute_key_request(&ModularDrmKeyRequest::new(Bytes::new()))
        .is_err());
    assert_eq!(engines.streaming.commands(), vec!["attach", "release"]);
}

#[test]
fn test_drop_releases_player() {
    let engines = Engines::new();
    {
        let _player = engines
            .factory(DrmSecurityLevel::L1)
            .select(&SelectionRequest::builder().build().unwrap())
            .unwrap();
    }
    assert_eq!(engines.streaming.commands(), vec!["attach", "release"]);
}

#[test]
fn test_commands_before_load_fail_as_engine_errors() {
    let engines = Engines::new();
    let mut player = engines
        .factory(DrmSecurityLevel::L1)
        .select(&SelectionRequest::builder().build().unwrap())
        .unwrap();
    let err = player.play().unwrap_err();
    assert!(matches!(err, Error::Engine(_)));
    assert!(err.is_recoverable());
}

// =============================================================================
// Profile Tests
// =============================================================================

#[test]
fn test_profile_drives_selection() {
    let profile = PlayerProfile::from_json_str(
        r#"{
            "backends": ["platform", "streaming"],
            "drm_type": "widevine-classic",
            "content_type": "hls",
            "user_agent": "kino-profile",
            "device": { "security_level": "L2", "secure_decoder": true, "modular_drm": false }
        }"#,
    )
    .unwrap();

    let engines = Engines::new();
    let factory = PlayerFactory::new(profile.device_probe())
        .register(Arc::new(engines.streaming.clone()))
        .register(Arc::new(engines.platform.clone()));
    let player = factory.select(&profile.selection_request(None).unwrap()).unwrap();

    assert_eq!(player.backend(), BackendType::Platform);
    assert_eq!(
        player.drm_session().unwrap().security_level(),
        DrmSecurityLevel::L2
    );
    assert_eq!(engines.platform.configs()[0].user_agent, "kino-profile");
}
