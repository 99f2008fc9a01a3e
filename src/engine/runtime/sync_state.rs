//! ### English
//! State shared between the owning thread and the render thread, guarded by one mutex.
//!
//! ### 中文
//! 所属线程与渲染线程共享的状态，由同一把互斥锁保护。

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use dpi::PhysicalSize;

use crate::engine::frame::{Frame, FrameMailbox};

/// ### English
/// Render-thread worker lifecycle: `Uninitialized -> Ready <-> Rendering -> Stopped`.
///
/// ### 中文
/// 渲染线程 worker 的生命周期：`Uninitialized -> Ready <-> Rendering -> Stopped`。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WorkerState {
    #[default]
    Uninitialized,
    Ready,
    Rendering,
    /// Terminal; the worker processes no further commands.
    Stopped,
}

/// ### English
/// Render counters, updated under the surface mutex.
///
/// ### 中文
/// 渲染计数器，在 surface 互斥锁下更新。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SurfaceStats {
    /// Frames published into the mailbox.
    pub renders: u64,
    /// Successful scene-graph syncs.
    pub syncs: u64,
    /// ### English
    /// Syncs the render control rejected (frame skipped, sync retried later).
    ///
    /// ### 中文
    /// 被 render control 拒绝的 sync 次数（跳过该帧，之后重试 sync）。
    pub failed_syncs: u64,
    /// ### English
    /// Render commands that produced no frame (paused, empty size, GPU or draw failure).
    ///
    /// ### 中文
    /// 未产出帧的渲染命令数（暂停、空尺寸、GPU 或绘制失败）。
    pub skipped_renders: u64,
    /// Render commands posted by the owning thread.
    pub renders_posted: u64,
    /// Posted render commands that carried a sync rendezvous.
    pub sync_renders_posted: u64,
}

impl SurfaceStats {
    /// ### English
    /// Posted renders the render thread has not finished yet (each one ends as either a render
    /// or a skip).
    ///
    /// ### 中文
    /// 已投递但渲染线程尚未完成的渲染数（每个最终计为一次 render 或一次 skip）。
    pub fn renders_in_flight(&self) -> u64 {
        self.renders_posted
            .saturating_sub(self.renders + self.skipped_renders)
    }
}

/// ### English
/// Every field here is read and written only with the surface mutex held.
///
/// Invariants:
/// - `quitting` never goes back to `false`.
/// - `sync_requested` implies `render_requested` at the time it is set; the render thread clears
///   it only after a successful sync.
/// - `sync_epoch` only grows; the owning thread's rendezvous ends when it changes.
/// - `size` is written only by the owning thread.
///
/// ### 中文
/// 此处所有字段只在持有 surface 互斥锁时读写。
///
/// 不变式：
/// - `quitting` 一旦为 `true` 不会再变回 `false`。
/// - 设置 `sync_requested` 时 `render_requested` 同时为真；渲染线程仅在 sync 成功后清除它。
/// - `sync_epoch` 单调递增；其变化即结束所属线程的汇合等待。
/// - `size` 只由所属线程写入。
pub(crate) struct SyncState<S> {
    pub paused: bool,
    pub quitting: bool,
    pub sync_requested: bool,
    pub render_requested: bool,
    pub last_render: Option<Instant>,
    pub size: PhysicalSize<u32>,
    pub sync_epoch: u64,
    pub mailbox: FrameMailbox,
    pub worker: WorkerState,
    /// ### English
    /// UI scene root; `None` until `set_root`.
    ///
    /// ### 中文
    /// UI 场景根；`set_root` 之前为 `None`。
    pub scene: Option<S>,
    pub stats: SurfaceStats,
}

/// ### English
/// The mutex plus the two condition variables built on it.
///
/// ### 中文
/// 互斥锁及基于它的两个条件变量。
pub(crate) struct Shared<S> {
    state: Mutex<SyncState<S>>,
    /// ### English
    /// Signaled when `sync_epoch` advances (sync rendezvous).
    ///
    /// ### 中文
    /// `sync_epoch` 递增时通知（sync 汇合）。
    rendezvous: Condvar,
    /// ### English
    /// Signaled when `worker` changes.
    ///
    /// ### 中文
    /// `worker` 变化时通知。
    lifecycle: Condvar,
}

pub(crate) type StateGuard<'a, S> = MutexGuard<'a, SyncState<S>>;

impl<S> Shared<S> {
    pub fn new(size: PhysicalSize<u32>, mailbox: FrameMailbox) -> Self {
        Self {
            state: Mutex::new(SyncState {
                paused: false,
                quitting: false,
                sync_requested: false,
                render_requested: false,
                last_render: None,
                size,
                sync_epoch: 0,
                mailbox,
                worker: WorkerState::Uninitialized,
                scene: None,
                stats: SurfaceStats::default(),
            }),
            rendezvous: Condvar::new(),
            lifecycle: Condvar::new(),
        }
    }

    /// ### English
    /// Locks the state. A panic on the other thread must not wedge teardown, so poisoning is
    /// ignored.
    ///
    /// ### 中文
    /// 锁定状态。另一线程 panic 不应卡死 teardown，因此忽略锁中毒。
    pub fn lock(&self) -> StateGuard<'_, S> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// ### English
    /// Resolves the current rendezvous (render thread side, or pause).
    ///
    /// ### 中文
    /// 结束当前汇合（渲染线程侧，或暂停时）。
    pub fn wake_rendezvous(&self, state: &mut SyncState<S>) {
        state.sync_epoch = state.sync_epoch.wrapping_add(1);
        self.rendezvous.notify_all();
    }

    /// ### English
    /// Blocks the owning thread until the epoch moves past `epoch`. No timeout.
    ///
    /// ### 中文
    /// 阻塞所属线程直到 epoch 越过 `epoch`；无超时。
    pub fn wait_rendezvous<'a>(&self, guard: StateGuard<'a, S>, epoch: u64) -> StateGuard<'a, S> {
        self.rendezvous
            .wait_while(guard, |state| state.sync_epoch == epoch)
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_worker_state(&self, state: &mut SyncState<S>, worker: WorkerState) {
        if state.worker == worker {
            return;
        }
        tracing::trace!(from = ?state.worker, to = ?worker, "render worker state");
        state.worker = worker;
        self.lifecycle.notify_all();
    }

    /// ### English
    /// Waits for the worker to reach `Stopped`. Returns `false` on timeout.
    ///
    /// ### 中文
    /// 等待 worker 进入 `Stopped`；超时返回 `false`。
    pub fn wait_stopped(&self, timeout: Option<std::time::Duration>) -> bool {
        let guard = self.lock();
        match timeout {
            None => {
                let guard = self
                    .lifecycle
                    .wait_while(guard, |state| state.worker != WorkerState::Stopped)
                    .unwrap_or_else(PoisonError::into_inner);
                guard.worker == WorkerState::Stopped
            }
            Some(timeout) => {
                let (guard, _) = self
                    .lifecycle
                    .wait_timeout_while(guard, timeout, |state| {
                        state.worker != WorkerState::Stopped
                    })
                    .unwrap_or_else(PoisonError::into_inner);
                guard.worker == WorkerState::Stopped
            }
        }
    }

    /// ### English
    /// Ends a render cycle: publishes `frame` if one was produced, then returns to `Ready`.
    ///
    /// ### 中文
    /// 结束一次渲染：若产出了 `frame` 则发布，然后回到 `Ready`。
    pub fn end_render(&self, frame: Option<Frame>) {
        let mut state = self.lock();
        match frame {
            Some(frame) => {
                state.mailbox.publish(frame);
                state.last_render = Some(Instant::now());
                state.stats.renders += 1;
            }
            None => state.stats.skipped_renders += 1,
        }
        self.set_worker_state(&mut state, WorkerState::Ready);
    }
}
