//! ### English
//! Surface configuration.
//!
//! ### 中文
//! Surface 配置。

use std::time::Duration;

use dpi::PhysicalSize;

/// ### English
/// Default frame-rate ceiling.
///
/// ### 中文
/// 默认帧率上限。
pub const DEFAULT_MAX_FPS: u32 = 60;

/// ### English
/// Default pacing tick. Caps the achievable frame rate at 200 regardless of `max_fps`.
///
/// ### 中文
/// 默认节奏 tick 间隔；无论 `max_fps` 为多少，可达帧率上限都为 200。
pub const DEFAULT_TIMER_INTERVAL: Duration = Duration::from_millis(5);

pub const DEFAULT_THREAD_NAME: &str = "offscreen-render";

pub const DEFAULT_INIT_TIMEOUT: Duration = Duration::from_secs(30);

/// ### English
/// Construction parameters for `SurfaceController`.
///
/// ### 中文
/// `SurfaceController` 的构造参数。
#[derive(Clone, Debug)]
pub struct SurfaceConfig {
    /// ### English
    /// Frame-rate ceiling (`0` is treated as `1`).
    ///
    /// ### 中文
    /// 帧率上限（`0` 视为 `1`）。
    pub max_fps: u32,
    /// ### English
    /// Interval at which the host is expected to call `tick()`.
    ///
    /// ### 中文
    /// 宿主调用 `tick()` 的期望间隔。
    pub timer_interval: Duration,
    /// ### English
    /// Initial logical size in physical pixels (empty until `set_size` if zero).
    ///
    /// ### 中文
    /// 初始逻辑尺寸（物理像素）；为 0 时在 `set_size` 之前视为空。
    pub initial_size: PhysicalSize<u32>,
    /// Name given to the render thread.
    pub thread_name: String,
    /// ### English
    /// How long `set_root` waits for the render thread to acknowledge `Initialize`.
    ///
    /// ### 中文
    /// `set_root` 等待渲染线程确认 `Initialize` 的最长时间。
    pub init_timeout: Duration,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            max_fps: DEFAULT_MAX_FPS,
            timer_interval: DEFAULT_TIMER_INTERVAL,
            initial_size: PhysicalSize::new(0, 0),
            thread_name: DEFAULT_THREAD_NAME.to_string(),
            init_timeout: DEFAULT_INIT_TIMEOUT,
        }
    }
}

impl SurfaceConfig {
    pub fn with_max_fps(mut self, max_fps: u32) -> Self {
        self.max_fps = max_fps.max(1);
        self
    }

    pub fn with_timer_interval(mut self, timer_interval: Duration) -> Self {
        self.timer_interval = timer_interval;
        self
    }

    pub fn with_initial_size(mut self, initial_size: PhysicalSize<u32>) -> Self {
        self.initial_size = initial_size;
        self
    }

    pub fn with_thread_name(mut self, thread_name: impl Into<String>) -> Self {
        self.thread_name = thread_name.into();
        self
    }

    pub fn with_init_timeout(mut self, init_timeout: Duration) -> Self {
        self.init_timeout = init_timeout;
        self
    }
}
