//! ### English
//! Frame pacing for the offscreen surface.
//!
//! The host ticks the surface at a fixed, short interval; the pacer decides on each tick whether
//! enough time has passed since the last render to honor the `max_fps` ceiling. Timer granularity
//! and target rate are therefore independent, and the rate can change at runtime.
//!
//! ### 中文
//! 离屏 surface 的帧节奏控制。
//!
//! 宿主以固定的短间隔 tick surface；pacer 在每次 tick 时判断距上次渲染是否已过足够时间，
//! 以遵守 `max_fps` 上限。计时粒度与目标帧率因此相互独立，帧率也可在运行时修改。
mod pacer;

pub use pacer::FramePacer;
