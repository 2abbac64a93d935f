//! Benchmark tests for kino-player event dispatch
//!
//! Run with: cargo bench -p kino-player

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use kino_player::events::{DroppedVideoFrames, InfoEvent, StateChange};
use kino_player::native::{
    AnalyticsNative, MediaSourceNative, NativeEvent, NativeFormat, NativePlaybackState,
    PlayerNative,
};
use kino_player::{BackendType, CapabilityTable, ContentType, DrmType, EventForwarder, TrackType};

// ============================================================================
// Helpers
// ============================================================================

fn forwarder_with_listeners(count: usize) -> (Arc<EventForwarder>, Arc<AtomicU64>) {
    let forwarder = Arc::new(EventForwarder::new(BackendType::Streaming));
    let calls = Arc::new(AtomicU64::new(0));

    for _ in 0..count {
        let frames = Arc::clone(&calls);
        forwarder.bind_dropped_video_frames(move |e: &DroppedVideoFrames| -> anyhow::Result<()> {
            frames.fetch_add(u64::from(e.count), Ordering::Relaxed);
            Ok(())
        });
        let info = Arc::clone(&calls);
        forwarder.bind_info(move |_: &InfoEvent| -> anyhow::Result<()> {
            info.fetch_add(1, Ordering::Relaxed);
            Ok(())
        });
    }

    (forwarder, calls)
}

fn dropped_frames() -> NativeEvent {
    AnalyticsNative::DroppedVideoFrames {
        count: 3,
        elapsed: Duration::from_millis(500),
    }
    .into()
}

// ============================================================================
// Dispatch Benchmarks
// ============================================================================

fn bench_dispatch_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch_fan_out");

    for listeners in [1, 4, 16, 64] {
        let (forwarder, _calls) = forwarder_with_listeners(listeners);
        group.bench_with_input(BenchmarkId::from_parameter(listeners), &listeners, |b, _| {
            b.iter(|| forwarder.dispatch(black_box(dropped_frames())))
        });
    }

    group.finish();
}

fn bench_state_translation(c: &mut Criterion) {
    let forwarder = EventForwarder::new(BackendType::Streaming);
    forwarder.bind_state_changed(|s: &StateChange| -> anyhow::Result<()> {
        black_box(s);
        Ok(())
    });

    let mut play_when_ready = false;
    c.bench_function("state_changed_toggle", |b| {
        b.iter(|| {
            play_when_ready = !play_when_ready;
            forwarder.dispatch(
                PlayerNative::StateChanged {
                    play_when_ready,
                    playback_state: NativePlaybackState::Ready,
                }
                .into(),
            )
        })
    });
}

fn bench_bitrate_tracking(c: &mut Criterion) {
    let forwarder = EventForwarder::new(BackendType::Streaming);
    let mut bitrate = 1_000_000u64;

    c.bench_function("downstream_format_changed", |b| {
        b.iter(|| {
            bitrate = if bitrate == 1_000_000 { 2_000_000 } else { 1_000_000 };
            forwarder.dispatch(
                MediaSourceNative::DownstreamFormatChanged {
                    track_type: TrackType::Video,
                    format: NativeFormat {
                        id: None,
                        bitrate: Some(bitrate),
                        width: Some(1280),
                        height: Some(720),
                    },
                }
                .into(),
            )
        })
    });
}

// ============================================================================
// Capability Benchmarks
// ============================================================================

fn bench_capability_lookup(c: &mut Criterion) {
    let table = CapabilityTable::standard();

    c.bench_function("capability_lookup", |b| {
        b.iter(|| {
            for backend in BackendType::DEFAULT_PRIORITY {
                for drm_type in DrmType::ALL {
                    for content_type in ContentType::ALL {
                        black_box(table.supports(backend, drm_type, content_type));
                    }
                }
            }
        })
    });
}

criterion_group!(
    benches,
    bench_dispatch_fan_out,
    bench_state_translation,
    bench_bitrate_tracking,
    bench_capability_lookup,
);
criterion_main!(benches);
