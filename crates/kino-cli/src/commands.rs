//! CLI command implementations

use crate::output::{self, OutputFormat};
use anyhow::Context;
use kino_player::drm::DecoderPath;
use kino_player::events::{
    AdvertEvent, BitrateChanged, BufferState, Completion, DroppedVideoFrames, InfoEvent,
    PlayerError, Prepared, StateChange, TracksChanged, VideoSize,
};
use kino_player::{
    BackendType, CapabilityTable, ContentType, DrmSecurityLevel, DrmType, EventForwarder,
    NativeEvent, PlaybackOptions, PlayerFactory, PlayerHandle, PlayerProfile, SelectionRequest,
    SimulatedEngineCreator, UnifiedEvent,
};
use parking_lot::Mutex;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use tracing::debug;
use url::Url;

type EventLog = Arc<Mutex<Vec<UnifiedEvent>>>;

/// Simulated engines registered for every backend
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

    fn factory(&self, profile: &PlayerProfile) -> PlayerFactory {
        PlayerFactory::new(profile.device_probe())
            .register(Arc::new(self.streaming.clone()))
            .register(Arc::new(self.platform.clone()))
    }

    fn creator(&self, backend: BackendType) -> &SimulatedEngineCreator {
        match backend {
            BackendType::Streaming => &self.streaming,
            BackendType::Platform => &self.platform,
        }
    }
}

/// Runtime for the HTTP license transport, only when the profile needs one.
///
/// The transport blocks on this runtime from the player thread, so it needs
/// its own worker to drive IO and timers.
fn license_runtime(profile: &PlayerProfile) -> anyhow::Result<Option<Runtime>> {
    if profile.license_url.is_none() {
        return Ok(None);
    }
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name("kino-license")
        .enable_all()
        .build()
        .context("failed to start license runtime")?;
    Ok(Some(runtime))
}

fn selection_request(
    profile: &PlayerProfile,
    runtime: Option<&Runtime>,
) -> anyhow::Result<SelectionRequest> {
    let transport = match runtime {
        Some(runtime) => profile.license_transport(runtime.handle().clone())?,
        None => None,
    };
    Ok(profile.selection_request(transport)?)
}

fn recorder<E: Clone + 'static>(
    log: &EventLog,
    wrap: fn(E) -> UnifiedEvent,
) -> impl Fn(&E) -> anyhow::Result<()> + Send + Sync + 'static {
    let log = Arc::clone(log);
    move |event: &E| {
        log.lock().push(wrap(event.clone()));
        Ok(())
    }
}

/// Bind one recording listener per event kind
fn record_events(events: &EventForwarder) -> EventLog {
    let log = EventLog::default();
    events.bind_prepared(recorder::<Prepared>(&log, UnifiedEvent::Prepared));
    events.bind_completion(recorder::<Completion>(&log, UnifiedEvent::Completion));
    events.bind_error(recorder::<PlayerError>(&log, UnifiedEvent::Error));
    events.bind_state_changed(recorder::<StateChange>(&log, UnifiedEvent::StateChanged));
    events.bind_buffer_state(recorder::<BufferState>(&log, UnifiedEvent::BufferState));
    events.bind_video_size_changed(recorder::<VideoSize>(&log, UnifiedEvent::VideoSizeChanged));
    events.bind_bitrate_changed(recorder::<BitrateChanged>(&log, UnifiedEvent::BitrateChanged));
    events.bind_tracks_changed(recorder::<TracksChanged>(&log, UnifiedEvent::TracksChanged));
    events.bind_dropped_video_frames(recorder::<DroppedVideoFrames>(
        &log,
        UnifiedEvent::DroppedVideoFrames,
    ));
    events.bind_advert(recorder::<AdvertEvent>(&log, UnifiedEvent::Advert));
    events.bind_info(recorder::<InfoEvent>(&log, UnifiedEvent::Info));
    log
}

#[derive(Serialize)]
struct CapabilityReport {
    backend: BackendType,
    drm_types: Vec<DrmType>,
    content_types: Vec<ContentType>,
    adverts: bool,
}

/// List the built-in capability table
pub fn capabilities(format: &str) -> anyhow::Result<()> {
    let reports: Vec<CapabilityReport> = CapabilityTable::standard()
        .iter()
        .map(|c| CapabilityReport {
            backend: c.backend,
            drm_types: c.drm_types.iter().copied().collect(),
            content_types: c.content_types.iter().copied().collect(),
            adverts: c.supports_adverts,
        })
        .collect();

    match OutputFormat::from(format) {
        OutputFormat::Json => println!("{}", output::format_output(&reports, format)),
        OutputFormat::Table | OutputFormat::Text => {
            let rows = reports.iter().map(|r| {
                output::CapabilityRow::new(
                    r.backend,
                    &r.drm_types,
                    &r.content_types,
                    r.adverts,
                )
            });
            println!("{}", output::table(rows));
        }
    }

    Ok(())
}

/// Print an example profile to start from
pub fn profile_template() -> anyhow::Result<()> {
    let profile = PlayerProfile {
        drm_type: DrmType::WidevineModularStream,
        content_type: ContentType::Dash,
        license_url: Some(Url::parse("https://license.example.com/widevine")?),
        license_headers: [("X-Custom-Data".to_string(), "token".to_string())]
            .into_iter()
            .collect(),
        ..PlayerProfile::default()
    };
    println!("{}", profile.to_json_pretty()?);
    Ok(())
}

#[derive(Serialize)]
struct SessionReport {
    id: String,
    drm_type: DrmType,
    security_level: DrmSecurityLevel,
    decoder: DecoderPath,
    key_exchange: bool,
}

#[derive(Serialize)]
struct SelectionReport {
    player_id: String,
    backend: BackendType,
    priority: Vec<BackendType>,
    content_type: ContentType,
    user_agent: String,
    drm_session: Option<SessionReport>,
}

fn selection_report(request: &SelectionRequest, player: &PlayerHandle) -> SelectionReport {
    SelectionReport {
        player_id: player.id().to_string(),
        backend: player.backend(),
        priority: request.priority().to_vec(),
        content_type: request.content_type(),
        user_agent: request.user_agent().to_string(),
        drm_session: player.drm_session().map(|s| SessionReport {
            id: s.id().to_string(),
            drm_type: s.drm_type(),
            security_level: s.security_level(),
            decoder: s.decoder_path(),
            key_exchange: s.requires_key_exchange(),
        }),
    }
}

/// Choose a backend for a profile
pub fn select(profile_path: &Path, format: &str) -> anyhow::Result<()> {
    let profile = PlayerProfile::from_file(profile_path)
        .with_context(|| format!("failed to load profile {}", profile_path.display()))?;
    let runtime = license_runtime(&profile)?;
    let request = selection_request(&profile, runtime.as_ref())?;

    let engines = Engines::new();
    let player = engines.factory(&profile).select(&request)?;
    let report = selection_report(&request, &player);

    match OutputFormat::from(format) {
        OutputFormat::Json => println!("{}", output::format_output(&report, format)),
        OutputFormat::Table | OutputFormat::Text => {
            println!("Selected backend: {}", report.backend);
            println!("  Player:       {}", report.player_id);
            println!("  Priority:     {:?}", report.priority);
            println!("  Content type: {}", report.content_type);
            println!("  User agent:   {}", report.user_agent);
            match &report.drm_session {
                Some(session) => {
                    println!("  DRM session:  {} ({})", session.id, session.drm_type);
                    println!("    Security level: {}", session.security_level);
                    println!("    Decoder:        {:?}", session.decoder);
                    println!("    Key exchange:   {}", session.key_exchange);
                }
                None => println!("  DRM session:  none"),
            }
        }
    }

    player.release();
    Ok(())
}

/// Drive a simulated engine through a short playback session
pub fn play(
    profile_path: &Path,
    url: &str,
    content_type: Option<&str>,
    seek: Option<u64>,
    format: &str,
) -> anyhow::Result<()> {
    let profile = PlayerProfile::from_file(profile_path)
        .with_context(|| format!("failed to load profile {}", profile_path.display()))?;
    let runtime = license_runtime(&profile)?;
    let request = selection_request(&profile, runtime.as_ref())?;
    let url = Url::parse(url).with_context(|| format!("invalid media URL: {url}"))?;

    let content_type = match content_type {
        Some(value) => value.parse()?,
        None => profile.content_type,
    };
    let mut options = PlaybackOptions::builder().with_content_type(content_type);
    if let Some(level) = profile.forced_security_level {
        options = options.with_forced_drm_security_level(level);
    }
    let options = options.build()?;

    let engines = Engines::new();
    let mut player = engines.factory(&profile).select(&request)?;
    let log = record_events(player.events());

    player.load_video(&url, &options)?;
    player.play()?;
    if let Some(seconds) = seek {
        player.seek_to(Duration::from_secs(seconds))?;
    }
    player.pause()?;
    player.stop()?;

    let faults = player.events().fault_count();
    player.release();

    let events = log.lock();
    output::print_events(&events, format)?;
    if faults > 0 {
        eprintln!("{faults} listener fault(s) during playback");
    }
    Ok(())
}

/// Replay scripted native events through the selected backend's forwarder
pub fn replay(profile_path: &Path, script_path: &Path, format: &str) -> anyhow::Result<()> {
    let profile = PlayerProfile::from_file(profile_path)
        .with_context(|| format!("failed to load profile {}", profile_path.display()))?;
    let script = std::fs::read_to_string(script_path)
        .with_context(|| format!("failed to read script {}", script_path.display()))?;
    let native: Vec<NativeEvent> =
        serde_json::from_str(&script).context("script must be a JSON array of native events")?;
    debug!(events = native.len(), script = %script_path.display(), "Replaying native events");

    let runtime = license_runtime(&profile)?;
    let request = selection_request(&profile, runtime.as_ref())?;
    let engines = Engines::new();
    let player = engines.factory(&profile).select(&request)?;
    let log = record_events(player.events());

    let sink = engines
        .creator(player.backend())
        .sink()
        .context("engine was not attached")?;
    for event in native {
        sink.emit(event);
    }
    player.release();

    let events = log.lock();
    output::print_events(&events, format)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kino_player::ModularDrmKeyRequest;
    use std::sync::mpsc;

    #[test]
    fn test_sample_script_replays() {
        let native: Vec<NativeEvent> =
            serde_json::from_str(include_str!("../samples/streaming-session.json")).unwrap();
        let profile: PlayerProfile =
            PlayerProfile::from_json_str(include_str!("../samples/offline-dash.json")).unwrap();

        let engines = Engines::new();
        let request = selection_request(&profile, None).unwrap();
        let player = engines.factory(&profile).select(&request).unwrap();
        assert_eq!(player.backend(), BackendType::Streaming);

        let log = record_events(player.events());
        let sink = engines.creator(player.backend()).sink().unwrap();
        for event in native.clone() {
            sink.emit(event);
        }

        let events = log.lock();
        let infos = events
            .iter()
            .filter(|e| matches!(e, UnifiedEvent::Info(_)))
            .count();
        assert_eq!(infos, native.len());
        assert!(events.iter().any(|e| matches!(e, UnifiedEvent::Completion(_))));
        assert!(events.iter().any(|e| matches!(e, UnifiedEvent::Error(_))));
    }

    #[test]
    fn test_license_exchange_is_bounded_by_transport_timeout() {
        let profile = PlayerProfile {
            drm_type: DrmType::WidevineModularStream,
            content_type: ContentType::Dash,
            license_url: Some(Url::parse("http://127.0.0.1:9/license").unwrap()),
            ..PlayerProfile::default()
        };
        let runtime = license_runtime(&profile).unwrap().unwrap();
        let request = selection_request(&profile, Some(&runtime)).unwrap();
        let exchange = request.drm().key_exchange().clone();

        let (done, finished) = mpsc::channel();
        std::thread::spawn(move || {
            let result = exchange.exchange(&ModularDrmKeyRequest::new(b"challenge".to_vec()));
            let _ = done.send(result.is_err());
        });

        let failed = finished
            .recv_timeout(Duration::from_secs(30))
            .expect("license exchange never returned");
        assert!(failed);
    }

    #[test]
    fn test_no_license_url_needs_no_runtime() {
        let profile = PlayerProfile::default();
        assert!(license_runtime(&profile).unwrap().is_none());
    }

    #[test]
    fn test_platform_sample_profile() {
        let profile =
            PlayerProfile::from_json_str(include_str!("../samples/platform-hls.json")).unwrap();
        let request = selection_request(&profile, None).unwrap();
        assert_eq!(request.user_agent(), "kino-cli-sample");

        let engines = Engines::new();
        let player = engines.factory(&profile).select(&request).unwrap();
        let report = selection_report(&request, &player);
        assert_eq!(report.backend, BackendType::Platform);
        assert!(report.drm_session.is_none());
    }
}
