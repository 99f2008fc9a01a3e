//! ### English
//! Error type for the offscreen surface engine.
//!
//! Programmer-wiring faults (context sharing mismatch, assigning a second scene root) are not
//! represented here: they abort the process.
//!
//! ### 中文
//! 离屏 surface 引擎的错误类型。
//!
//! 接线层面的编程错误（上下文未共享、重复设置场景根）不在此表示：它们会直接中止进程。

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SurfaceError {
    /// The render-thread context factory failed.
    #[error("failed to create render context: {0}")]
    ContextCreation(String),

    /// A GPU object (texture, fence) could not be created.
    #[error("GPU error: {0}")]
    Gpu(String),

    /// The render thread did not acknowledge `Initialize` in time.
    #[error("timed out waiting for the render thread to initialize")]
    InitTimeout,

    #[error("failed to spawn render thread: {0}")]
    ThreadSpawn(#[from] std::io::Error),

    /// The surface is quitting or already stopped.
    #[error("surface is shut down")]
    ShutDown,

    /// The render control failed to draw a frame.
    #[error("render failed: {0}")]
    Render(String),
}

pub type Result<T> = std::result::Result<T, SurfaceError>;
