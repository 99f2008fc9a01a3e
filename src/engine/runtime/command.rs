//! ### English
//! Command protocol between the owning thread and the render thread.
//!
//! ### 中文
//! 所属线程与渲染线程之间的命令协议。

use crossbeam_channel as channel;

use crate::engine::error::Result;
use crate::engine::rendering::ContextFactory;

/// ### English
/// Commands posted to the render thread. Processed strictly in arrival order, except that
/// urgent commands are taken ahead of anything pending on the normal lane.
///
/// ### 中文
/// 发送到渲染线程的命令。严格按到达顺序处理；但紧急命令会先于普通通道中的待处理命令执行。
pub(super) enum Command {
    /// ### English
    /// Creates and binds the render-thread context.
    ///
    /// ### 中文
    /// 创建并绑定渲染线程上下文。
    Initialize {
        /// ### English
        /// Builds the thread-affine context on the render thread.
        ///
        /// ### 中文
        /// 在渲染线程构建线程绑定的上下文。
        factory: ContextFactory,
        /// ### English
        /// One-shot response channel for reporting success/failure back to the caller.
        ///
        /// ### 中文
        /// 一次性响应 channel：把成功/失败回传给调用方。
        response: channel::Sender<Result<()>>,
    },
    /// ### English
    /// Renders one frame (with a sync first if one is requested).
    ///
    /// ### 中文
    /// 渲染一帧（若请求了 sync 则先执行 sync）。
    Render,
    /// ### English
    /// Tears down GPU resources and stops the render thread.
    ///
    /// ### 中文
    /// 释放 GPU 资源并停止渲染线程。
    Quit,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Initialize { .. } => f.write_str("Initialize"),
            Command::Render => f.write_str("Render"),
            Command::Quit => f.write_str("Quit"),
        }
    }
}
