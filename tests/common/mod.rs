#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use offscreen_surface::{
    Frame, GpuContext, HeadlessContext, HeadlessDevice, RenderControl, Result, SceneRoot,
    SurfaceConfig, SurfaceController, SurfaceError, TextureHandle, init_logging,
};
use dpi::PhysicalSize;

pub const WAIT: Duration = Duration::from_secs(5);

/// Scene whose two counters are always written together by the owning thread.
#[derive(Debug, Default)]
pub struct TestScene {
    pub first: u64,
    pub second: u64,
    pub size: PhysicalSize<u32>,
    pub polishes: usize,
    pub resizes: usize,
}

impl TestScene {
    pub fn bump(&mut self, value: u64) {
        self.first = value;
        self.second = value;
    }
}

impl SceneRoot for TestScene {
    fn polish(&mut self) {
        self.polishes += 1;
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        self.size = size;
        self.resizes += 1;
    }
}

/// Observations made on the render thread.
#[derive(Debug, Default)]
pub struct RenderLog {
    pub syncs: AtomicUsize,
    pub torn_syncs: AtomicUsize,
    pub last_synced: AtomicU64,
    pub failing_syncs: AtomicUsize,
    pub failing_renders: AtomicUsize,
    pub rendered_sizes: Mutex<Vec<PhysicalSize<u32>>>,
    pub initialized: AtomicBool,
    pub invalidated: AtomicBool,
    /// `true` while draws are held at the start of `render`.
    pub renders_held: Mutex<bool>,
    pub renders_held_changed: Condvar,
    pub panic_next_render: AtomicBool,
}

impl RenderLog {
    pub fn fail_next_syncs(&self, count: usize) {
        self.failing_syncs.store(count, Ordering::SeqCst);
    }

    pub fn fail_next_renders(&self, count: usize) {
        self.failing_renders.store(count, Ordering::SeqCst);
    }

    pub fn hold_renders(&self) {
        *self.renders_held.lock().unwrap() = true;
    }

    pub fn release_renders(&self) {
        *self.renders_held.lock().unwrap() = false;
        self.renders_held_changed.notify_all();
    }

    pub fn panic_on_next_render(&self) {
        self.panic_next_render.store(true, Ordering::SeqCst);
    }

    pub fn rendered_sizes(&self) -> Vec<PhysicalSize<u32>> {
        self.rendered_sizes.lock().unwrap().clone()
    }
}

fn take_one(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

pub struct TestControl {
    log: Arc<RenderLog>,
}

impl TestControl {
    pub fn new(log: Arc<RenderLog>) -> Self {
        Self { log }
    }
}

impl RenderControl for TestControl {
    type Scene = TestScene;

    fn initialize(&mut self, _context: &dyn GpuContext) -> Result<()> {
        self.log.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn sync(&mut self, scene: &mut TestScene) -> bool {
        if take_one(&self.log.failing_syncs) {
            return false;
        }
        if scene.first != scene.second {
            self.log.torn_syncs.fetch_add(1, Ordering::SeqCst);
        }
        self.log.last_synced.store(scene.first, Ordering::SeqCst);
        self.log.syncs.fetch_add(1, Ordering::SeqCst);
        true
    }

    fn render(
        &mut self,
        _context: &dyn GpuContext,
        target: TextureHandle,
        size: PhysicalSize<u32>,
    ) -> Result<()> {
        assert!(!target.is_null());
        {
            let held = self.log.renders_held.lock().unwrap();
            let _held = self
                .log
                .renders_held_changed
                .wait_while(held, |held| *held)
                .unwrap();
        }
        if self.log.panic_next_render.swap(false, Ordering::SeqCst) {
            panic!("render control failed hard");
        }
        if take_one(&self.log.failing_renders) {
            return Err(SurfaceError::Render("injected draw failure".to_string()));
        }
        self.log.rendered_sizes.lock().unwrap().push(size);
        Ok(())
    }

    fn invalidate(&mut self) {
        self.log.invalidated.store(true, Ordering::SeqCst);
    }
}

pub struct Harness {
    pub surface: SurfaceController<TestScene>,
    pub log: Arc<RenderLog>,
    pub device: Arc<HeadlessDevice>,
}

pub fn config(size: PhysicalSize<u32>) -> SurfaceConfig {
    SurfaceConfig::default()
        .with_initial_size(size)
        .with_max_fps(1000)
        .with_timer_interval(Duration::from_millis(1))
        .with_thread_name("offscreen-render-test")
}

/// Surface with a root assigned and its render thread running.
pub fn start(config: SurfaceConfig) -> Harness {
    init_logging();

    let device = HeadlessDevice::new();
    let log = Arc::new(RenderLog::default());
    let mut surface = SurfaceController::new(config);
    surface
        .set_root(
            TestScene::default(),
            TestControl::new(log.clone()),
            HeadlessContext::factory(device.clone()),
        )
        .expect("render thread starts");

    Harness {
        surface,
        log,
        device,
    }
}

/// Ticks like the host timer would until a frame shows up in the mailbox.
pub fn next_frame(surface: &SurfaceController<TestScene>) -> Frame {
    let deadline = Instant::now() + WAIT;
    loop {
        surface.tick();
        if let Some(frame) = surface.fetch_frame() {
            return frame;
        }
        assert!(Instant::now() < deadline, "no frame within {WAIT:?}");
        thread::sleep(surface.timer_interval());
    }
}

/// Ticks until one render command has been posted.
pub fn post_render(surface: &SurfaceController<TestScene>) {
    let deadline = Instant::now() + WAIT;
    while !surface.tick() {
        assert!(Instant::now() < deadline, "no render posted within {WAIT:?}");
        thread::sleep(surface.timer_interval());
    }
}

pub fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + WAIT;
    while !condition() {
        assert!(Instant::now() < deadline, "condition not met within {WAIT:?}");
        thread::sleep(Duration::from_millis(1));
    }
}

/// Fetches and releases the frame produced for the initial render request.
pub fn drain_initial_frame(harness: &Harness) {
    let frame = next_frame(&harness.surface);
    harness.surface.release_frame(frame);
}
