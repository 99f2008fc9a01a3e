//! ### English
//! Rendering seams: the thread-affine GPU context, the scene-graph halves that live on the
//! owning thread and the render thread, and the texture pool built on top of the context.
//!
//! ### 中文
//! 渲染接缝：线程绑定的 GPU 上下文、分别位于所属线程与渲染线程的场景图两半，
//! 以及构建在上下文之上的 texture pool。
mod glow_context;
mod headless;
mod texture_pool;

use dpi::PhysicalSize;

use crate::engine::error::Result;
use crate::engine::frame::{FenceHandle, TextureHandle};

pub use glow_context::{ContextBinding, GlowContext};
pub use headless::{HeadlessContext, HeadlessDevice};
pub use texture_pool::{PoolStats, PoolStatsSnapshot, TexturePool};

/// ### English
/// Render-thread graphics context.
///
/// Implementations are thread-affine: they are created on the render thread by a
/// [`ContextFactory`] and never leave it. Every method must be called on that thread.
///
/// ### 中文
/// 渲染线程的图形上下文。
///
/// 实现是线程绑定的：由 [`ContextFactory`] 在渲染线程创建且永不离开该线程，
/// 所有方法都必须在该线程调用。
pub trait GpuContext {
    /// ### English
    /// Makes the context current on the calling thread. Returns `false` on failure.
    ///
    /// ### 中文
    /// 使上下文在调用线程上 current；失败返回 `false`。
    fn make_current(&self) -> bool;

    fn done_current(&self);

    /// ### English
    /// Whether GPU objects created here are visible to the owning thread's context.
    ///
    /// ### 中文
    /// 在此创建的 GPU 对象是否对所属线程的上下文可见。
    fn shares_resources_with_host(&self) -> bool;

    fn create_texture(&self, size: PhysicalSize<u32>) -> Result<TextureHandle>;

    fn delete_texture(&self, texture: TextureHandle);

    /// ### English
    /// Inserts a fence after all GPU commands issued so far.
    ///
    /// ### 中文
    /// 在目前已提交的全部 GPU 命令之后插入一个 fence。
    fn insert_fence(&self) -> Result<FenceHandle>;

    /// ### English
    /// Non-blocking poll: `true` once all work preceding `fence` has completed.
    ///
    /// ### 中文
    /// 非阻塞轮询：`fence` 之前的工作全部完成后返回 `true`。
    fn is_fence_signaled(&self, fence: FenceHandle) -> bool;

    fn delete_fence(&self, fence: FenceHandle);

    fn flush(&self);
}

/// ### English
/// Builds the render-thread context. Runs on the render thread while handling `Initialize`.
///
/// ### 中文
/// 构建渲染线程上下文；在渲染线程处理 `Initialize` 时执行。
pub type ContextFactory = Box<dyn FnOnce() -> Result<Box<dyn GpuContext>> + Send + 'static>;

/// ### English
/// Owning-thread half of the UI scene graph (the scene root).
///
/// ### 中文
/// UI 场景图位于所属线程的一半（场景根）。
pub trait SceneRoot: Send + 'static {
    /// ### English
    /// Resolves pending layout before a sync. Called on the owning thread.
    ///
    /// ### 中文
    /// 在 sync 前完成待处理的布局；在所属线程调用。
    fn polish(&mut self) {}

    /// Propagates a new logical surface size into the scene.
    fn resize(&mut self, size: PhysicalSize<u32>);
}

/// ### English
/// Render-thread half of the UI scene graph.
///
/// `sync` runs with the surface mutex held while the owning thread is parked in the rendezvous,
/// so it observes the scene in a consistent state. `render` runs without the lock.
///
/// ### 中文
/// UI 场景图位于渲染线程的一半。
///
/// `sync` 在持有 surface 互斥锁、且所属线程停在汇合等待中时执行，因此看到的场景状态是一致的；
/// `render` 在不持锁的情况下执行。
pub trait RenderControl: Send + 'static {
    type Scene: SceneRoot;

    /// ### English
    /// Called once on the render thread after the context is current.
    ///
    /// ### 中文
    /// 上下文 current 之后在渲染线程调用一次。
    fn initialize(&mut self, _context: &dyn GpuContext) -> Result<()> {
        Ok(())
    }

    /// ### English
    /// Snapshots scene state for rendering. Returning `false` skips this frame; the sync stays
    /// requested and is retried on the next render.
    ///
    /// ### 中文
    /// 为渲染拍摄场景快照。返回 `false` 会跳过本帧；sync 请求保留，下次渲染时重试。
    fn sync(&mut self, scene: &mut Self::Scene) -> bool;

    /// Draws the last snapshot into `target`.
    fn render(
        &mut self,
        context: &dyn GpuContext,
        target: TextureHandle,
        size: PhysicalSize<u32>,
    ) -> Result<()>;

    /// ### English
    /// Releases every GPU object the control owns. Called once during `Quit`, context current.
    ///
    /// ### 中文
    /// 释放 control 持有的全部 GPU 对象；在 `Quit` 期间、上下文 current 时调用一次。
    fn invalidate(&mut self);
}
