//! ### English
//! Dedicated render thread: owns the render-thread GPU context, the texture pool and the
//! render-thread half of the scene graph, and executes `Initialize` / `Render` / `Quit`.
//!
//! ### 中文
//! 独立渲染线程：持有渲染线程 GPU 上下文、texture pool 以及场景图的渲染线程一半，
//! 并执行 `Initialize` / `Render` / `Quit`。

use std::sync::Arc;

use dpi::PhysicalSize;

use crate::engine::error::{Result, SurfaceError};
use crate::engine::rendering::{ContextFactory, GpuContext, RenderControl, TexturePool};

use super::command::Command;
use super::queue::CommandReceiver;
use super::sync_state::{Shared, WorkerState};

#[inline]
fn is_empty(size: PhysicalSize<u32>) -> bool {
    size.width == 0 || size.height == 0
}

pub(super) struct RenderThreadWorker<R: RenderControl> {
    shared: Arc<Shared<R::Scene>>,
    control: R,
    pool: TexturePool,
    /// ### English
    /// Render-thread context; `None` before `Initialize` and after `Quit`.
    ///
    /// ### 中文
    /// 渲染线程上下文；`Initialize` 之前与 `Quit` 之后为 `None`。
    context: Option<Box<dyn GpuContext>>,
    /// ### English
    /// Size of the textures currently handed out by the pool.
    ///
    /// ### 中文
    /// pool 当前分发的纹理尺寸。
    current_size: PhysicalSize<u32>,
    commands: CommandReceiver,
}

impl<R: RenderControl> RenderThreadWorker<R> {
    pub(super) fn new(
        shared: Arc<Shared<R::Scene>>,
        control: R,
        pool: TexturePool,
        commands: CommandReceiver,
    ) -> Self {
        Self {
            shared,
            control,
            pool,
            context: None,
            current_size: PhysicalSize::new(0, 0),
            commands,
        }
    }

    /// ### English
    /// Render thread entry. Returns after `Quit`, or after the controller disappears.
    ///
    /// ### 中文
    /// 渲染线程入口。收到 `Quit` 或 controller 消失后返回。
    pub(super) fn run(mut self) {
        while let Some(command) = self.commands.recv() {
            match command {
                Command::Initialize { factory, response } => {
                    let result = self.initialize(factory);
                    if let Err(err) = &result {
                        tracing::error!(%err, "render thread initialization failed");
                    }
                    let _ = response.send(result);
                }
                Command::Render => self.render(),
                Command::Quit => break,
            }
        }

        self.quit();
    }

    fn initialize(&mut self, factory: ContextFactory) -> Result<()> {
        if self.context.is_some() {
            tracing::warn!("render thread already initialized; ignoring Initialize");
            return Ok(());
        }

        let context = factory()?;
        if !context.make_current() {
            return Err(SurfaceError::ContextCreation(
                "render context could not be made current".to_string(),
            ));
        }

        /*
        ### English
        Textures created here are sampled by the host context. Without a shared object namespace
        the handles would name unrelated objects on the other side, so keep going is never safe.

        ### 中文
        这里创建的纹理会被宿主上下文采样。若两者不共享对象命名空间，句柄在另一侧指向无关对象，
        继续运行绝不安全。
        */
        if !context.shares_resources_with_host() {
            tracing::error!("render context does not share resources with the host context");
            std::process::abort();
        }

        self.control.initialize(&*context)?;
        self.context = Some(context);

        let mut state = self.shared.lock();
        self.shared.set_worker_state(&mut state, WorkerState::Ready);
        tracing::debug!("render thread initialized");
        Ok(())
    }

    fn render(&mut self) {
        let context = self.context.as_deref();

        let size = {
            let mut state = self.shared.lock();
            if state.quitting {
                state.stats.skipped_renders += 1;
                return;
            }

            if context.is_none() {
                tracing::warn!("render requested before the render thread was initialized");
                if state.sync_requested {
                    self.shared.wake_rendezvous(&mut state);
                }
                state.stats.skipped_renders += 1;
                return;
            }

            if state.paused {
                /*
                ### English
                The owning thread may be parked in the rendezvous; never leave it there.

                ### 中文
                所属线程可能正停在汇合等待中；绝不能让它一直等下去。
                */
                if state.sync_requested {
                    self.shared.wake_rendezvous(&mut state);
                }
                state.stats.skipped_renders += 1;
                return;
            }

            self.shared
                .set_worker_state(&mut state, WorkerState::Rendering);

            if state.sync_requested {
                let synced = match state.scene.as_mut() {
                    Some(scene) => self.control.sync(scene),
                    None => false,
                };
                self.shared.wake_rendezvous(&mut state);

                if !synced {
                    tracing::warn!("scene sync failed; skipping frame");
                    state.stats.failed_syncs += 1;
                    state.stats.skipped_renders += 1;
                    self.shared.set_worker_state(&mut state, WorkerState::Ready);
                    return;
                }
                state.sync_requested = false;
                state.stats.syncs += 1;
            }

            state.size
        };

        let Some(context) = context else {
            return;
        };

        if is_empty(size) || !context.make_current() {
            self.shared.end_render(None);
            return;
        }

        if size != self.current_size {
            if !is_empty(self.current_size) {
                self.pool.release_size(context, self.current_size);
            }
            tracing::debug!(
                width = size.width,
                height = size.height,
                "render target size changed"
            );
            self.current_size = size;
        }

        let mut frame = match self.pool.acquire(context, size) {
            Ok(frame) => frame,
            Err(err) => {
                tracing::warn!(%err, "failed to acquire render target");
                self.shared.end_render(None);
                return;
            }
        };

        if let Err(err) = self.control.render(context, frame.texture(), size) {
            tracing::warn!(%err, "render failed; recycling target");
            self.pool.release(context, frame);
            self.shared.end_render(None);
            return;
        }

        match context.insert_fence() {
            Ok(fence) => {
                let _ = frame.replace_fence(fence);
            }
            Err(err) => {
                tracing::warn!(%err, "failed to insert producer fence");
            }
        }
        context.flush();

        tracing::trace!(
            texture = frame.texture().0,
            fence = frame.fence().0,
            "publishing frame"
        );
        self.shared.end_render(Some(frame));
    }

    /// ### English
    /// Deterministic teardown: pooled textures of the current size, then everything else the
    /// pool holds, then the render control's GPU objects, then the context itself.
    ///
    /// ### 中文
    /// 确定性的 teardown：先释放当前尺寸的池化纹理，再释放 pool 中其余对象，
    /// 然后是 render control 的 GPU 对象，最后是上下文本身。
    fn quit(&mut self) {
        let unclaimed = self.shared.lock().mailbox.fetch();

        match self.context.take() {
            Some(context) => {
                let _ = context.make_current();
                if let Some(frame) = unclaimed {
                    self.pool.release(&*context, frame);
                }
                if !is_empty(self.current_size) {
                    self.pool.release_size(&*context, self.current_size);
                }
                self.pool.destroy_all(&*context);
                self.control.invalidate();
                context.done_current();
            }
            None => {
                if let Some(mut frame) = unclaimed {
                    let _ = frame.take_handles();
                }
            }
        }

        let mut state = self.shared.lock();
        self.shared.wake_rendezvous(&mut state);
        self.shared.set_worker_state(&mut state, WorkerState::Stopped);
        tracing::debug!("render thread stopped");
    }
}

impl<R: RenderControl> Drop for RenderThreadWorker<R> {
    /// ### English
    /// If the thread unwinds out of `run`, still report `Stopped` so nobody waits forever.
    ///
    /// ### 中文
    /// 若线程从 `run` 中 unwind 退出，仍然报告 `Stopped`，避免有人永远等待。
    fn drop(&mut self) {
        let mut state = self.shared.lock();
        if state.worker != WorkerState::Stopped {
            tracing::error!("render thread exited abnormally");
            self.shared.wake_rendezvous(&mut state);
            self.shared.set_worker_state(&mut state, WorkerState::Stopped);
        }
    }
}
