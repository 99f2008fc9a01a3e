/// ### English
/// `offscreen_surface` crate root.
/// Renders a UI scene graph on a dedicated thread into pooled GPU textures and hands the newest
/// frame to a consumer; core implementation lives under `engine`.
///
/// ### 中文
/// `offscreen_surface` 的 crate 根。
/// 在独立线程上把 UI 场景图渲染到池化的 GPU 纹理中，并把最新帧交给消费者；
/// 核心实现位于 `engine` 模块。
pub mod engine;

pub use engine::config::SurfaceConfig;
pub use engine::error::{Result, SurfaceError};
pub use engine::frame::{FenceHandle, Frame, FrameRecycler, TextureHandle};
pub use engine::logging::init_logging;
pub use engine::rendering::{
    ContextBinding, ContextFactory, GlowContext, GpuContext, HeadlessContext, HeadlessDevice,
    PoolStatsSnapshot, RenderControl, SceneRoot,
};
pub use engine::runtime::{SurfaceController, SurfaceStats, WorkerState};
