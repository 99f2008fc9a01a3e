//! ### English
//! Owning-thread side of an offscreen surface.
//!
//! ### 中文
//! 离屏 surface 的所属线程一侧。

use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{self as channel, RecvTimeoutError};
use dpi::PhysicalSize;

use crate::engine::config::SurfaceConfig;
use crate::engine::error::{Result, SurfaceError};
use crate::engine::frame::{FenceHandle, Frame, FrameMailbox, FrameRecycler};
use crate::engine::refresh::FramePacer;
use crate::engine::rendering::{
    ContextFactory, PoolStats, PoolStatsSnapshot, RenderControl, SceneRoot, TexturePool,
};

use super::command::Command;
use super::queue::{CommandQueue, command_queue};
use super::render_thread::RenderThreadWorker;
use super::sync_state::{Shared, StateGuard, SurfaceStats, WorkerState};

/// ### English
/// Coordinates one offscreen surface: owns the UI scene root and its size, issues render and sync
/// requests, paces rendering and drives the render thread through startup, pause/resume and
/// shutdown.
///
/// The controller lives on the owning (UI) thread. The host is expected to call [`tick`] every
/// [`timer_interval`]; a consumer (compositor) polls [`fetch_frame`] at its own cadence and hands
/// every fetched frame back through [`release_frame`].
///
/// [`tick`]: SurfaceController::tick
/// [`timer_interval`]: SurfaceController::timer_interval
/// [`fetch_frame`]: SurfaceController::fetch_frame
/// [`release_frame`]: SurfaceController::release_frame
///
/// ### 中文
/// 协调一个离屏 surface：持有 UI 场景根及其尺寸，发起渲染与 sync 请求，控制渲染节奏，
/// 并驱动渲染线程完成启动、暂停/恢复与关闭。
///
/// controller 位于所属（UI）线程。宿主应每隔 [`timer_interval`] 调用一次 [`tick`]；
/// 消费者（合成器）按自己的节奏轮询 [`fetch_frame`]，并通过 [`release_frame`] 归还每个取到的帧。
///
/// [`tick`]: SurfaceController::tick
/// [`timer_interval`]: SurfaceController::timer_interval
/// [`fetch_frame`]: SurfaceController::fetch_frame
/// [`release_frame`]: SurfaceController::release_frame
pub struct SurfaceController<S: SceneRoot> {
    shared: Arc<Shared<S>>,
    config: SurfaceConfig,
    pacer: FramePacer,
    /// ### English
    /// Command queue into the render thread; `None` until `set_root` and after shutdown.
    ///
    /// ### 中文
    /// 发往渲染线程的命令队列；`set_root` 之前与 shutdown 之后为 `None`。
    commands: Option<CommandQueue>,
    /// ### English
    /// Join handle for the render thread (owned by this controller).
    ///
    /// ### 中文
    /// 渲染线程的 join handle（由本 controller 持有）。
    thread: Option<thread::JoinHandle<()>>,
    /// ### English
    /// Texture pool, parked here until `set_root` moves it onto the render thread.
    ///
    /// ### 中文
    /// texture pool；在 `set_root` 把它移交给渲染线程之前暂存于此。
    pool: Option<TexturePool>,
    recycler: FrameRecycler,
    pool_stats: Arc<PoolStats>,
    last_report: Mutex<PoolStatsSnapshot>,
}

impl<S: SceneRoot> SurfaceController<S> {
    pub fn new(config: SurfaceConfig) -> Self {
        let pool = TexturePool::new();
        let recycler = pool.recycler();
        let pool_stats = pool.stats();
        let mailbox = FrameMailbox::new(pool.recycler());
        let pacer = FramePacer::new(config.max_fps, config.timer_interval);

        Self {
            shared: Arc::new(Shared::new(config.initial_size, mailbox)),
            config,
            pacer,
            commands: None,
            thread: None,
            pool: Some(pool),
            recycler,
            pool_stats,
            last_report: Mutex::new(PoolStatsSnapshot::default()),
        }
    }

    /// ### English
    /// Assigns the UI scene root and starts rendering.
    ///
    /// Spawns the render thread, has it build its context through `factory`, and blocks until
    /// the thread acknowledges (at most `SurfaceConfig::init_timeout`). On success a first render
    /// is requested. On failure the render thread is torn down and the surface is left shut down.
    ///
    /// A surface has exactly one root for its whole life: calling this twice is a wiring bug and
    /// aborts the process.
    ///
    /// #### Parameters
    /// - `scene`: Owning-thread half of the scene graph.
    /// - `control`: Render-thread half of the scene graph; moved onto the render thread.
    /// - `factory`: Builds the render-thread context on the render thread.
    ///
    /// ### 中文
    /// 设置 UI 场景根并开始渲染。
    ///
    /// 创建渲染线程，由其通过 `factory` 构建上下文，并阻塞直到线程确认
    /// （最多 `SurfaceConfig::init_timeout`）。成功后会请求第一次渲染；
    /// 失败时渲染线程被拆除，surface 保持关闭状态。
    ///
    /// 一个 surface 在整个生命周期内只有一个根：调用两次属于接线错误，会直接终止进程。
    ///
    /// #### 参数
    /// - `scene`：场景图的所属线程一半。
    /// - `control`：场景图的渲染线程一半；会被移交到渲染线程。
    /// - `factory`：在渲染线程上构建上下文。
    pub fn set_root<R>(&mut self, mut scene: S, control: R, factory: ContextFactory) -> Result<()>
    where
        R: RenderControl<Scene = S>,
    {
        {
            let mut state = self.shared.lock();
            if state.scene.is_some() || self.thread.is_some() {
                tracing::error!("surface root assigned twice");
                std::process::abort();
            }
            if state.quitting {
                return Err(SurfaceError::ShutDown);
            }
            scene.resize(state.size);
            state.scene = Some(scene);
        }

        let Some(pool) = self.pool.take() else {
            return Err(SurfaceError::ShutDown);
        };

        let (queue, receiver) = command_queue();
        let shared = self.shared.clone();
        let spawned = thread::Builder::new()
            .name(self.config.thread_name.clone())
            .spawn(move || {
                RenderThreadWorker::new(shared, control, pool, receiver).run();
            });
        let thread = match spawned {
            Ok(thread) => thread,
            Err(err) => {
                tracing::error!(%err, "failed to spawn render thread");
                self.shutdown();
                return Err(SurfaceError::ThreadSpawn(err));
            }
        };

        let (response_tx, response_rx) = channel::bounded(1);
        let _ = queue.push(Command::Initialize {
            factory,
            response: response_tx,
        });
        self.commands = Some(queue);
        self.thread = Some(thread);

        let result = match response_rx.recv_timeout(self.config.init_timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(SurfaceError::InitTimeout),
            Err(RecvTimeoutError::Disconnected) => Err(SurfaceError::ContextCreation(
                "render thread exited during initialization".to_string(),
            )),
        };

        if let Err(err) = result {
            self.shutdown();
            return Err(err);
        }

        tracing::debug!(
            thread = %self.config.thread_name,
            fps = self.pacer.max_fps(),
            "surface root set; rendering started"
        );
        self.request_render();
        Ok(())
    }

    /// ### English
    /// Asks for a render without a scene-graph sync. Coalesces with any pending request.
    ///
    /// ### 中文
    /// 请求一次不带场景图 sync 的渲染；与已挂起的请求合并。
    pub fn request_render(&self) {
        let mut state = self.shared.lock();
        if state.quitting {
            return;
        }
        state.render_requested = true;
    }

    /// ### English
    /// Asks for a render preceded by a scene-graph sync (the scene changed).
    ///
    /// ### 中文
    /// 请求一次先执行场景图 sync 的渲染（场景已变化）。
    pub fn request_render_sync(&self) {
        let mut state = self.shared.lock();
        if state.quitting {
            return;
        }
        state.sync_requested = true;
        state.render_requested = true;
    }

    /// ### English
    /// Pacing timer body; the host calls it every `timer_interval`.
    ///
    /// Posts a `Render` only when a render is pending, the surface is neither paused nor quitting,
    /// the previous frame has been fetched and finished, and at least `1 / max_fps` has passed
    /// since the last render. A sync-bearing render blocks here until the render thread has taken its snapshot.
    /// Returns whether a render was posted.
    ///
    /// ### 中文
    /// 节奏定时器的主体；宿主每隔 `timer_interval` 调用一次。
    ///
    /// 仅当存在挂起的渲染请求、surface 未暂停且未退出、上一帧已完成并被取走，且距上次渲染至少
    /// `1 / max_fps` 时才投递 `Render`。带 sync 的渲染会在此阻塞，直到渲染线程完成快照。
    /// 返回是否投递了渲染。
    pub fn tick(&self) -> bool {
        self.report_textures();

        let Some(commands) = self.commands.as_ref() else {
            return false;
        };
        if commands.is_closed() {
            return false;
        }

        let now = Instant::now();
        let state = self.shared.lock();
        if !state.render_requested || state.paused || state.quitting {
            return false;
        }
        /*
        ### English
        A stopped worker never resolves another rendezvous, even while its queue still accepts
        commands (e.g. mid-unwind). Never post into it.

        ### 中文
        已停止的 worker 不会再结束任何汇合，即使其队列仍能接收命令（例如正在 unwind）。
        绝不向其投递。
        */
        if state.worker == WorkerState::Stopped {
            return false;
        }
        if state.mailbox.is_occupied() || state.stats.renders_in_flight() != 0 {
            return false;
        }
        if !self.pacer.is_due(state.last_render, now) {
            return false;
        }

        self.post_render(commands, state)
    }

    fn post_render(&self, commands: &CommandQueue, mut state: StateGuard<'_, S>) -> bool {
        state.render_requested = false;

        if !state.sync_requested {
            if !commands.push(Command::Render) {
                return false;
            }
            state.stats.renders_posted += 1;
            return true;
        }

        if let Some(scene) = state.scene.as_mut() {
            scene.polish();
        }

        let epoch = state.sync_epoch;
        if !commands.push(Command::Render) {
            return false;
        }
        state.stats.renders_posted += 1;
        state.stats.sync_renders_posted += 1;

        tracing::trace!(epoch, "waiting for scene sync");
        let _state = self.shared.wait_rendezvous(state, epoch);
        true
    }

    /// ### English
    /// Changes the logical size. No-op if unchanged; otherwise the scene root is resized and the
    /// next render carries a sync.
    ///
    /// ### 中文
    /// 修改逻辑尺寸。未变化时为空操作；否则调整场景根尺寸，并使下一次渲染携带 sync。
    pub fn set_size(&self, size: PhysicalSize<u32>) {
        {
            let mut state = self.shared.lock();
            if state.size == size {
                return;
            }
            state.size = size;
            if let Some(scene) = state.scene.as_mut() {
                scene.resize(size);
            }
        }

        tracing::debug!(width = size.width, height = size.height, "surface resized");
        self.request_render_sync();
    }

    /// ### English
    /// Stops posting new renders. A render already posted still completes. A pending sync
    /// rendezvous is resolved right away.
    ///
    /// ### 中文
    /// 停止投递新的渲染；已投递的渲染仍会完成。挂起的 sync 汇合会被立即结束。
    pub fn pause(&self) {
        let mut state = self.shared.lock();
        if state.paused {
            return;
        }
        state.paused = true;
        if state.sync_requested {
            self.shared.wake_rendezvous(&mut state);
        }
        tracing::debug!("surface paused");
    }

    pub fn resume(&self) {
        {
            let mut state = self.shared.lock();
            if !state.paused || state.quitting {
                return;
            }
            state.paused = false;
        }
        tracing::debug!("surface resumed");
        self.request_render();
    }

    /// ### English
    /// Takes the newest unclaimed frame, if any. The caller owns it until `release_frame`.
    ///
    /// ### 中文
    /// 取走最新的未领取帧（若有）。调用方持有该帧直到 `release_frame`。
    pub fn fetch_frame(&self) -> Option<Frame> {
        self.shared.lock().mailbox.fetch()
    }

    /// ### English
    /// Returns a fetched frame to the pool. Its producer fence gates reuse.
    ///
    /// ### 中文
    /// 把取到的帧归还 pool；复用前以其生产者 fence 为准。
    pub fn release_frame(&self, frame: Frame) {
        self.recycler.recycle(frame);
    }

    /// ### English
    /// Returns a fetched frame together with a fence inserted by the consumer after its last
    /// sampling command. The pool takes ownership of the fence.
    ///
    /// ### 中文
    /// 归还帧，并附带消费者在最后一次采样命令之后插入的 fence；pool 接管该 fence 的所有权。
    pub fn release_frame_with_fence(&self, frame: Frame, consumer_fence: FenceHandle) {
        self.recycler.recycle_with_fence(frame, consumer_fence);
    }

    /// Runs `f` against the scene root with the surface mutex held.
    pub fn with_scene<T>(&self, f: impl FnOnce(&mut S) -> T) -> Option<T> {
        self.shared.lock().scene.as_mut().map(f)
    }

    pub fn set_max_fps(&self, max_fps: u32) {
        self.pacer.set_max_fps(max_fps);
        tracing::debug!(fps = self.pacer.max_fps(), "max fps changed");
    }

    #[inline]
    pub fn max_fps(&self) -> u32 {
        self.pacer.max_fps()
    }

    #[inline]
    pub fn timer_interval(&self) -> Duration {
        self.pacer.timer_interval()
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.shared.lock().size
    }

    pub fn is_paused(&self) -> bool {
        self.shared.lock().paused
    }

    pub fn is_quitting(&self) -> bool {
        self.shared.lock().quitting
    }

    pub fn worker_state(&self) -> WorkerState {
        self.shared.lock().worker
    }

    pub fn stats(&self) -> SurfaceStats {
        self.shared.lock().stats
    }

    pub fn texture_stats(&self) -> PoolStatsSnapshot {
        self.pool_stats.snapshot()
    }

    /// ### English
    /// Waits until the render thread has stopped. `None` waits without limit. Returns `false` on
    /// timeout. A surface whose render thread never started (or was already joined) counts as
    /// terminated.
    ///
    /// ### 中文
    /// 等待渲染线程停止。`None` 表示无限等待；超时返回 `false`。
    /// 渲染线程从未启动（或已被 join）的 surface 视为已终止。
    pub fn await_termination(&self, timeout: Option<Duration>) -> bool {
        if self.thread.is_none() {
            return true;
        }
        self.shared.wait_stopped(timeout)
    }

    /// ### English
    /// Stops rendering for good and joins the render thread. Idempotent.
    ///
    /// Marks the surface quitting, posts `Quit` ahead of any pending render, then blocks until
    /// the render thread has released every GPU resource and exited.
    ///
    /// ### 中文
    /// 永久停止渲染并 join 渲染线程。幂等。
    ///
    /// 将 surface 标记为退出，先于所有挂起的渲染投递 `Quit`，然后阻塞直到渲染线程释放全部
    /// GPU 资源并退出。
    pub fn shutdown(&mut self) {
        {
            let mut state = self.shared.lock();
            if state.quitting && self.thread.is_none() {
                return;
            }
            state.quitting = true;
            state.paused = true;
            state.render_requested = false;
        }

        if let Some(commands) = self.commands.as_ref() {
            let _ = commands.push_urgent(Command::Quit);
        }

        if let Some(thread) = self.thread.take() {
            let _ = self.shared.wait_stopped(None);
            if thread.join().is_err() {
                tracing::error!("render thread panicked");
            }
        }
        self.commands = None;

        self.report_textures();
        tracing::debug!("surface shut down");
    }

    fn report_textures(&self) {
        let snapshot = self.pool_stats.snapshot();
        let mut last = self
            .last_report
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if *last == snapshot {
            return;
        }
        *last = snapshot;
        tracing::trace!(
            allocated = snapshot.allocated,
            pooled = snapshot.pooled,
            outstanding = snapshot.outstanding,
            bytes = snapshot.bytes,
            "texture pool report"
        );
    }
}

impl<S: SceneRoot> Drop for SurfaceController<S> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
