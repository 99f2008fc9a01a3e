/// ### English
/// Engine internal modules (threading, rendering, frame handoff, pacing).
///
/// ### 中文
/// 引擎内部模块（线程、渲染、帧交接、节奏控制等）。
pub mod config;
pub mod error;
pub mod frame;
pub mod logging;
pub mod refresh;
pub mod rendering;
pub mod runtime;
