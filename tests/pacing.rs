mod common;

use std::thread;
use std::time::{Duration, Instant};

use common::{config, start};
use dpi::PhysicalSize;

#[test]
fn render_rate_is_capped_at_max_fps() {
    let harness = start(
        config(PhysicalSize::new(128, 128))
            .with_max_fps(30)
            .with_timer_interval(Duration::from_millis(5)),
    );
    let surface = &harness.surface;
    assert_eq!(surface.max_fps(), 30);

    let started = Instant::now();
    let before = surface.stats().renders;
    while started.elapsed() < Duration::from_secs(1) {
        surface.request_render();
        surface.tick();
        if let Some(frame) = surface.fetch_frame() {
            surface.release_frame(frame);
        }
        thread::sleep(surface.timer_interval());
    }
    let elapsed = started.elapsed();
    let rendered = surface.stats().renders - before;

    // One render per 1/30 s, plus the one allowed right at the start.
    let ceiling = (elapsed.as_secs_f64() * 30.0).ceil() as u64 + 1;
    assert!(rendered <= ceiling, "{rendered} renders in {elapsed:?}");
    assert!(rendered >= 5, "only {rendered} renders in {elapsed:?}");
}

#[test]
fn unclaimed_frame_blocks_new_renders() {
    let harness = start(config(PhysicalSize::new(32, 32)));
    let surface = &harness.surface;

    let first = common::next_frame(surface);
    surface.release_frame(first);

    surface.request_render();
    common::post_render(surface);
    common::wait_until(|| surface.stats().renders == 2);

    let posted = surface.stats().renders_posted;
    surface.request_render();
    for _ in 0..20 {
        assert!(!surface.tick());
        thread::sleep(surface.timer_interval());
    }
    assert_eq!(surface.stats().renders_posted, posted);

    let frame = surface.fetch_frame().expect("frame waiting in the mailbox");
    surface.release_frame(frame);
    common::post_render(surface);
}

#[test]
fn max_fps_changes_at_runtime() {
    let harness = start(config(PhysicalSize::new(16, 16)));
    let surface = &harness.surface;

    surface.set_max_fps(0);
    assert_eq!(surface.max_fps(), 1);

    let first = common::next_frame(surface);
    surface.release_frame(first);

    surface.request_render();
    for _ in 0..20 {
        assert!(!surface.tick());
        thread::sleep(Duration::from_millis(5));
    }

    surface.set_max_fps(1000);
    let frame = common::next_frame(surface);
    surface.release_frame(frame);
}
