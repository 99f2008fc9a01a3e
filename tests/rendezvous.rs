mod common;

use std::sync::atomic::Ordering;

use common::{config, drain_initial_frame, next_frame, start};
use dpi::PhysicalSize;

#[test]
fn sync_never_observes_a_half_updated_scene() {
    let harness = start(config(PhysicalSize::new(64, 64)));
    let surface = &harness.surface;
    drain_initial_frame(&harness);

    for value in 1..=100u64 {
        surface.with_scene(|scene| scene.bump(value));
        surface.request_render_sync();
        let frame = next_frame(surface);
        assert_eq!(harness.log.last_synced.load(Ordering::SeqCst), value);
        surface.release_frame(frame);

        // Mutations between renders must not disturb the next snapshot.
        surface.with_scene(|scene| {
            scene.first = u64::MAX;
            scene.second = u64::MAX;
        });
    }

    assert_eq!(harness.log.torn_syncs.load(Ordering::SeqCst), 0);
    assert_eq!(harness.log.syncs.load(Ordering::SeqCst), 100);
}

#[test]
fn polish_runs_before_every_sync() {
    let harness = start(config(PhysicalSize::new(64, 64)));
    let surface = &harness.surface;
    drain_initial_frame(&harness);

    let polishes = surface.with_scene(|scene| scene.polishes).unwrap_or_default();
    for _ in 0..5 {
        surface.request_render_sync();
        let frame = next_frame(surface);
        surface.release_frame(frame);
    }
    assert_eq!(surface.with_scene(|scene| scene.polishes), Some(polishes + 5));

    surface.request_render();
    let frame = next_frame(surface);
    surface.release_frame(frame);
    assert_eq!(surface.with_scene(|scene| scene.polishes), Some(polishes + 5));
}

#[test]
fn sync_returns_control_before_the_draw_finishes() {
    let harness = start(config(PhysicalSize::new(64, 64)));
    let surface = &harness.surface;
    drain_initial_frame(&harness);

    surface.request_render_sync();
    common::post_render(surface);
    let stats = surface.stats();
    assert_eq!(stats.syncs, 1);
    assert!(!surface.is_paused());

    let frame = next_frame(surface);
    surface.release_frame(frame);
    assert_eq!(
        harness.log.rendered_sizes().last(),
        Some(&PhysicalSize::new(64, 64))
    );
}
