//! ### English
//! Surface runtime orchestration: the owning-thread controller, the render-thread worker and the
//! state they share.
//!
//! ### 中文
//! Surface 运行时编排：所属线程的 controller、渲染线程的 worker 以及二者共享的状态。

mod command;
mod queue;
mod render_thread;
mod sync_state;

mod controller;

pub use controller::SurfaceController;
pub use sync_state::{SurfaceStats, WorkerState};
