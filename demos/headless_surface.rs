//! ### English
//! Drives an offscreen surface on the headless backend: a host timer ticks the controller, a
//! consumer thread-stand-in fetches and releases frames, and the scene is resized halfway.
//!
//! Run with `RUST_LOG=offscreen_surface=trace` to see per-frame events and pool reports.
//!
//! ### 中文
//! 在 headless 后端上驱动一个离屏 surface：宿主定时器 tick controller，
//! 消费者取走并归还帧，中途调整一次场景尺寸。
//!
//! 使用 `RUST_LOG=offscreen_surface=trace` 运行可查看逐帧事件与 pool 报告。

use std::thread;
use std::time::{Duration, Instant};

use dpi::PhysicalSize;
use offscreen_surface::{
    GpuContext, HeadlessContext, HeadlessDevice, RenderControl, SceneRoot, SurfaceConfig,
    SurfaceController, TextureHandle, init_logging,
};

#[derive(Default)]
struct Clock {
    ticks: u64,
    size: PhysicalSize<u32>,
}

impl SceneRoot for Clock {
    fn resize(&mut self, size: PhysicalSize<u32>) {
        self.size = size;
    }
}

#[derive(Default)]
struct ClockRenderer {
    snapshot: u64,
    draws: u64,
}

impl RenderControl for ClockRenderer {
    type Scene = Clock;

    fn sync(&mut self, scene: &mut Clock) -> bool {
        self.snapshot = scene.ticks;
        true
    }

    fn render(
        &mut self,
        _context: &dyn GpuContext,
        target: TextureHandle,
        size: PhysicalSize<u32>,
    ) -> offscreen_surface::Result<()> {
        self.draws += 1;
        tracing::trace!(
            texture = target.0,
            width = size.width,
            height = size.height,
            snapshot = self.snapshot,
            "draw"
        );
        Ok(())
    }

    fn invalidate(&mut self) {
        tracing::info!(draws = self.draws, "renderer invalidated");
    }
}

fn main() -> offscreen_surface::Result<()> {
    init_logging();

    let device = HeadlessDevice::new();
    let mut surface = SurfaceController::new(
        SurfaceConfig::default()
            .with_initial_size(PhysicalSize::new(800, 600))
            .with_max_fps(30),
    );
    surface.set_root(
        Clock::default(),
        ClockRenderer::default(),
        HeadlessContext::factory(device.clone()),
    )?;

    let started = Instant::now();
    let mut resized = false;
    let mut consumed = 0u64;
    while started.elapsed() < Duration::from_secs(2) {
        surface.with_scene(|clock| clock.ticks += 1);
        surface.request_render_sync();
        surface.tick();

        if let Some(frame) = surface.fetch_frame() {
            consumed += 1;
            surface.release_frame(frame);
        }

        if !resized && started.elapsed() >= Duration::from_secs(1) {
            surface.set_size(PhysicalSize::new(1280, 720));
            resized = true;
        }

        thread::sleep(surface.timer_interval());
    }

    surface.shutdown();

    let stats = surface.stats();
    tracing::info!(
        consumed,
        renders = stats.renders,
        syncs = stats.syncs,
        skipped = stats.skipped_renders,
        live_textures = device.live_textures(),
        "headless surface finished"
    );
    Ok(())
}
