use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

/// ### English
/// Best-effort frame-rate cap checked against the last render timestamp.
///
/// This is not a scheduler: ticks that arrive late simply render late, so under load the cap
/// can drift below `max_fps`.
///
/// ### 中文
/// 基于上次渲染时间戳的尽力而为帧率上限。
///
/// 它不是调度器：tick 迟到则渲染随之推迟，因此在高负载下实际帧率可能低于 `max_fps`。
#[derive(Debug)]
pub struct FramePacer {
    /// ### English
    /// Frame-rate ceiling (always >= 1).
    ///
    /// ### 中文
    /// 帧率上限（始终 >= 1）。
    max_fps: AtomicU32,
    /// ### English
    /// Fixed tick interval the host is expected to call `tick()` at.
    ///
    /// ### 中文
    /// 宿主调用 `tick()` 的固定间隔。
    timer_interval: Duration,
}

impl FramePacer {
    pub fn new(max_fps: u32, timer_interval: Duration) -> Self {
        Self {
            max_fps: AtomicU32::new(max_fps.max(1)),
            timer_interval,
        }
    }

    #[inline]
    pub fn max_fps(&self) -> u32 {
        self.max_fps.load(Ordering::Relaxed)
    }

    /// ### English
    /// Changes the ceiling; takes effect on the next tick. `0` is clamped to `1`.
    ///
    /// ### 中文
    /// 修改帧率上限，下一次 tick 生效；`0` 会被钳制为 `1`。
    pub fn set_max_fps(&self, max_fps: u32) {
        self.max_fps.store(max_fps.max(1), Ordering::Relaxed);
    }

    #[inline]
    pub fn timer_interval(&self) -> Duration {
        self.timer_interval
    }

    /// Minimum spacing between two renders.
    pub fn min_render_interval(&self) -> Duration {
        let fps = u64::from(self.max_fps());
        Duration::from_nanos((1_000_000_000u64 / fps).max(1))
    }

    /// ### English
    /// Whether a render may start at `now` given the previous render time.
    ///
    /// ### 中文
    /// 给定上次渲染时间，判断 `now` 时刻是否允许开始渲染。
    pub fn is_due(&self, last_render: Option<Instant>, now: Instant) -> bool {
        match last_render {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.min_render_interval(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_render_is_always_due() {
        let pacer = FramePacer::new(30, Duration::from_millis(5));
        assert!(pacer.is_due(None, Instant::now()));
    }

    #[test]
    fn renders_are_spaced_by_max_fps() {
        let pacer = FramePacer::new(30, Duration::from_millis(5));
        let last = Instant::now();
        assert!(!pacer.is_due(Some(last), last + Duration::from_millis(20)));
        assert!(pacer.is_due(Some(last), last + Duration::from_millis(34)));
    }

    #[test]
    fn max_fps_changes_at_runtime_and_clamps_zero() {
        let pacer = FramePacer::new(60, Duration::from_millis(5));
        let last = Instant::now();
        assert!(pacer.is_due(Some(last), last + Duration::from_millis(17)));

        pacer.set_max_fps(10);
        assert!(!pacer.is_due(Some(last), last + Duration::from_millis(17)));
        assert_eq!(pacer.min_render_interval(), Duration::from_millis(100));

        pacer.set_max_fps(0);
        assert_eq!(pacer.max_fps(), 1);
        assert_eq!(pacer.timer_interval(), Duration::from_millis(5));
    }
}
