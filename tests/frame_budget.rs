mod common;

use std::thread;
use std::time::{Duration, Instant};

use common::{config, start};
use dpi::PhysicalSize;

#[test]
fn frames_outside_the_pool_stay_bounded_under_load() {
    let harness = start(
        config(PhysicalSize::new(128, 128)).with_timer_interval(Duration::from_micros(100)),
    );
    let surface = &harness.surface;

    let mut held = None;
    let mut peak = 0;
    let started = Instant::now();
    let mut iteration = 0u32;
    while started.elapsed() < Duration::from_millis(500) {
        iteration += 1;
        if iteration % 7 == 0 {
            let step = iteration / 7 % 5;
            surface.set_size(PhysicalSize::new(96 + step * 16, 64 + step * 8));
        } else {
            surface.request_render();
        }
        surface.tick();

        if iteration % 3 == 0 {
            if let Some(frame) = held.take() {
                surface.release_frame(frame);
            }
            held = surface.fetch_frame();
        }

        let outstanding = surface.texture_stats().outstanding;
        peak = peak.max(outstanding);
        assert!(
            outstanding <= 2,
            "{outstanding} frames outside the pool at iteration {iteration}"
        );
        thread::sleep(surface.timer_interval());
    }

    if let Some(frame) = held.take() {
        surface.release_frame(frame);
    }
    assert!(surface.stats().renders > 10, "{:?}", surface.stats());
    assert!(peak >= 1);
}
