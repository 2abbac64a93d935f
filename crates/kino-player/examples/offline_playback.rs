//! Offline playback example
//!
//! Builds a player for a downloaded DRM-protected DASH stream, binds a few
//! listeners and drives a simulated engine through load, play and pause.
//!
//! Run with: cargo run -p kino-player --example offline_playback

use kino_player::events::{BitrateChanged, Prepared, StateChange};
use kino_player::{
    BackendType, ContentType, DrmRequest, DrmSecurityLevel, KeySetId, PlaybackOptions,
    PlayerFactory, SelectionRequest, SimulatedEngineCreator, StaticDeviceProbe,
};
use std::sync::Arc;

fn main() -> anyhow::Result<()> {
    println!("Kino Player - Offline Playback Example");
    println!("======================================\n");

    let device = StaticDeviceProbe {
        security_level: DrmSecurityLevel::L3,
        secure_decoder: true,
        modular_drm: true,
    };
    let factory = PlayerFactory::new(Arc::new(device))
        .register(Arc::new(SimulatedEngineCreator::new(BackendType::Streaming)))
        .register(Arc::new(SimulatedEngineCreator::new(BackendType::Platform)));

    println!("Capabilities:");
    println!("-------------");
    for capability in factory.capabilities().iter() {
        println!(
            "  {:<10} drm={:?} content={:?} adverts={}",
            capability.backend.to_string(),
            capability.drm_types,
            capability.content_types,
            capability.supports_adverts
        );
    }
    println!();

    let key_set_id = KeySetId::from_base64("b2ZmbGluZS1saWNlbnNl")?;
    let request = SelectionRequest::builder()
        .with_priority(BackendType::Platform, &[BackendType::Streaming])
        .with_drm(DrmRequest::widevine_modular_download(key_set_id))
        .with_content_type(ContentType::Dash)
        .build()?;

    let mut player = factory.select(&request)?;
    println!("Selected backend: {}", player.backend());
    if let Some(session) = player.drm_session() {
        println!("DRM session:      {} ({})", session.id(), session.security_level());
    }
    println!();

    player.events().bind_prepared(|e: &Prepared| -> anyhow::Result<()> {
        println!("  prepared: duration={:?}", e.duration);
        Ok(())
    });
    player.events().bind_state_changed(|e: &StateChange| -> anyhow::Result<()> {
        println!("  state:    {e:?}");
        Ok(())
    });
    player.events().bind_bitrate_changed(|e: &BitrateChanged| -> anyhow::Result<()> {
        println!("  bitrate:  {} bps ({})", e.bitrate, e.track_type);
        Ok(())
    });

    let options = PlaybackOptions::builder()
        .with_content_type(ContentType::Dash)
        .with_max_video_bitrate(1_500_000)
        .build()?;

    println!("Events:");
    println!("-------");
    player.load_video(&"https://cdn.example.com/offline/manifest.mpd".parse()?, &options)?;
    player.play()?;
    player.pause()?;
    player.release();

    println!("\nPlayer released.");
    Ok(())
}
