//! ### English
//! Reusable pool of render-target textures, keyed by size and gated by GPU fences.
//!
//! Every method that touches GPU objects takes the render-thread context and must run on the
//! render thread. Other threads return frames through the pool's [`FrameRecycler`].
//!
//! ### 中文
//! 可复用的渲染目标纹理池，按尺寸分组，并由 GPU fence 控制复用时机。
//!
//! 所有操作 GPU 对象的方法都需要渲染线程上下文，且必须在渲染线程执行；
//! 其他线程通过 pool 的 [`FrameRecycler`] 归还帧。

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use crossbeam_channel as channel;
use dpi::PhysicalSize;

use crate::engine::error::Result;
use crate::engine::frame::{FenceHandle, Frame, FrameRecycler, ReturnedFrame, recycle_channel};

use super::GpuContext;

type SizeKey = (u32, u32);

#[inline]
fn key(size: PhysicalSize<u32>) -> SizeKey {
    (size.width, size.height)
}

/// ### English
/// Live pool figures, readable from any thread.
///
/// ### 中文
/// 实时的 pool 统计数据，可在任意线程读取。
#[derive(Debug, Default)]
pub struct PoolStats {
    allocated: AtomicUsize,
    pooled: AtomicUsize,
    bytes: AtomicU64,
}

/// ### English
/// Point-in-time copy of [`PoolStats`].
///
/// ### 中文
/// [`PoolStats`] 的时间点快照。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStatsSnapshot {
    /// Textures currently allocated by the pool.
    pub allocated: usize,
    /// Allocated textures sitting in the pool (free or waiting on a fence).
    pub pooled: usize,
    /// Allocated textures owned by a frame outside the pool.
    pub outstanding: usize,
    /// Texture memory at 4 bytes per pixel.
    pub bytes: u64,
}

impl PoolStats {
    pub fn snapshot(&self) -> PoolStatsSnapshot {
        let allocated = self.allocated.load(Ordering::Acquire);
        let pooled = self.pooled.load(Ordering::Acquire);
        PoolStatsSnapshot {
            allocated,
            pooled,
            outstanding: allocated.saturating_sub(pooled),
            bytes: self.bytes.load(Ordering::Acquire),
        }
    }
}

/// ### English
/// Render-thread texture pool.
///
/// ### 中文
/// 渲染线程的纹理池。
pub struct TexturePool {
    /// ### English
    /// Frames whose fence has signaled, ready for reuse, per size.
    ///
    /// ### 中文
    /// fence 已 signal、可直接复用的帧（按尺寸分组）。
    available: HashMap<SizeKey, Vec<Frame>>,
    /// ### English
    /// Returned frames still waiting on their gating fence.
    ///
    /// ### 中文
    /// 已归还但仍在等待 gating fence 的帧。
    pending: Vec<Frame>,
    /// ### English
    /// Sizes released via `release_size`; late returns of these sizes are destroyed.
    ///
    /// ### 中文
    /// 已通过 `release_size` 释放的尺寸；这些尺寸迟到的归还会被直接销毁。
    retired: HashSet<SizeKey>,
    /// ### English
    /// Live textures per size, wherever their frames currently are. A retired size is forgotten
    /// once its count drops to zero.
    ///
    /// ### 中文
    /// 每个尺寸的存活纹理数（无论其帧当前位于何处）。被退役的尺寸在计数归零后即被移除。
    live: HashMap<SizeKey, usize>,
    returns: channel::Receiver<ReturnedFrame>,
    recycler: FrameRecycler,
    stats: Arc<PoolStats>,
}

impl Default for TexturePool {
    fn default() -> Self {
        Self::new()
    }
}

impl TexturePool {
    pub fn new() -> Self {
        let (recycler, returns) = recycle_channel();
        Self {
            available: HashMap::new(),
            pending: Vec::new(),
            retired: HashSet::new(),
            live: HashMap::new(),
            returns,
            recycler,
            stats: Arc::new(PoolStats::default()),
        }
    }

    /// ### English
    /// Sender used by other threads (mailbox, consumer) to return frames.
    ///
    /// ### 中文
    /// 供其他线程（mailbox、消费者）归还帧的发送端。
    pub fn recycler(&self) -> FrameRecycler {
        self.recycler.clone()
    }

    pub fn stats(&self) -> Arc<PoolStats> {
        self.stats.clone()
    }

    /// ### English
    /// Returns a frame sized `size`: a recycled texture whose fence has signaled if one exists,
    /// otherwise a newly allocated texture. Never blocks on a fence.
    ///
    /// ### 中文
    /// 返回一个尺寸为 `size` 的帧：若存在 fence 已 signal 的回收纹理则复用，否则新分配。
    /// 从不阻塞等待 fence。
    pub fn acquire(&mut self, context: &dyn GpuContext, size: PhysicalSize<u32>) -> Result<Frame> {
        self.retired.remove(&key(size));
        self.drain_returns(context);
        self.reclaim_pending(context);

        if let Some(frame) = self.available.get_mut(&key(size)).and_then(Vec::pop) {
            self.stats.pooled.fetch_sub(1, Ordering::AcqRel);
            return Ok(frame);
        }

        let texture = context.create_texture(size)?;
        let frame = Frame::new(texture, FenceHandle::NULL, size);
        *self.live.entry(key(size)).or_default() += 1;
        self.stats.allocated.fetch_add(1, Ordering::AcqRel);
        self.stats.bytes.fetch_add(frame.byte_size(), Ordering::AcqRel);
        tracing::trace!(
            texture = texture.0,
            width = size.width,
            height = size.height,
            "allocated pool texture"
        );
        Ok(frame)
    }

    /// ### English
    /// Returns a frame to the pool from the render thread. Its producer fence gates reuse.
    ///
    /// ### 中文
    /// 在渲染线程把帧归还 pool；复用前以其生产者 fence 为准。
    pub fn release(&mut self, context: &dyn GpuContext, frame: Frame) {
        self.intake(
            context,
            ReturnedFrame {
                frame,
                consumer_fence: FenceHandle::NULL,
            },
        );
    }

    /// ### English
    /// Destroys every pooled texture of `size`. Frames of that size still outside the pool are
    /// destroyed when they come back.
    ///
    /// ### 中文
    /// 销毁 pool 中所有尺寸为 `size` 的纹理；仍在 pool 外的同尺寸帧会在归还时销毁。
    pub fn release_size(&mut self, context: &dyn GpuContext, size: PhysicalSize<u32>) {
        let size_key = key(size);
        self.retired.insert(size_key);
        self.drain_returns(context);

        if let Some(frames) = self.available.remove(&size_key) {
            for frame in frames {
                self.stats.pooled.fetch_sub(1, Ordering::AcqRel);
                self.destroy(context, frame);
            }
        }

        let (matching, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|frame| key(frame.size()) == size_key);
        self.pending = kept;
        for frame in matching {
            self.stats.pooled.fetch_sub(1, Ordering::AcqRel);
            self.destroy(context, frame);
        }

        if !self.live.contains_key(&size_key) {
            self.retired.remove(&size_key);
        }

        tracing::debug!(
            width = size.width,
            height = size.height,
            "released pooled textures for size"
        );
    }

    /// ### English
    /// Destroys every texture and fence the pool currently holds (shutdown path).
    ///
    /// ### 中文
    /// 销毁 pool 当前持有的全部纹理与 fence（shutdown 路径）。
    pub fn destroy_all(&mut self, context: &dyn GpuContext) {
        self.drain_returns(context);

        let frames: Vec<Frame> = self
            .available
            .drain()
            .flat_map(|(_, frames)| frames)
            .chain(self.pending.drain(..))
            .collect();
        for frame in frames {
            self.stats.pooled.fetch_sub(1, Ordering::AcqRel);
            self.destroy(context, frame);
        }

        let leftover = self.stats.snapshot();
        if leftover.allocated != 0 {
            tracing::debug!(
                outstanding = leftover.outstanding,
                "texture pool torn down with frames still outside the pool"
            );
        }
    }

    fn drain_returns(&mut self, context: &dyn GpuContext) {
        while let Ok(returned) = self.returns.try_recv() {
            self.intake(context, returned);
        }
    }

    fn intake(&mut self, context: &dyn GpuContext, returned: ReturnedFrame) {
        let ReturnedFrame {
            mut frame,
            consumer_fence,
        } = returned;

        if !consumer_fence.is_null() {
            let producer_fence = frame.replace_fence(consumer_fence);
            context.delete_fence(producer_fence);
        }

        if self.retired.contains(&key(frame.size())) {
            self.destroy(context, frame);
            return;
        }

        self.stats.pooled.fetch_add(1, Ordering::AcqRel);
        self.pending.push(frame);
    }

    /// ### English
    /// Moves pending frames whose fence has signaled into the free lists (non-blocking poll).
    ///
    /// ### 中文
    /// 将 fence 已 signal 的 pending 帧移入空闲列表（非阻塞轮询）。
    fn reclaim_pending(&mut self, context: &dyn GpuContext) {
        let mut index = 0;
        while index < self.pending.len() {
            if !context.is_fence_signaled(self.pending[index].fence()) {
                index += 1;
                continue;
            }

            let mut frame = self.pending.swap_remove(index);
            let fence = frame.replace_fence(FenceHandle::NULL);
            context.delete_fence(fence);
            self.available
                .entry(key(frame.size()))
                .or_default()
                .push(frame);
        }
    }

    fn destroy(&mut self, context: &dyn GpuContext, mut frame: Frame) {
        let size_key = key(frame.size());
        if let Some(count) = self.live.get_mut(&size_key) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                self.live.remove(&size_key);
                self.retired.remove(&size_key);
            }
        }

        let bytes = frame.byte_size();
        let (texture, fence) = frame.take_handles();
        context.delete_fence(fence);
        context.delete_texture(texture);
        self.stats.allocated.fetch_sub(1, Ordering::AcqRel);
        self.stats.bytes.fetch_sub(bytes, Ordering::AcqRel);
    }
}

impl Drop for TexturePool {
    fn drop(&mut self) {
        /*
        ### English
        Without a context nothing can be deleted here; `destroy_all` must already have run.
        Forget whatever is left so the leak is reported once, not per frame.

        ### 中文
        此处没有上下文，无法删除任何对象；`destroy_all` 应已执行。
        直接丢弃剩余句柄，泄漏只报告一次而不是逐帧报告。
        */
        let mut leaked = 0usize;
        let frames = self
            .available
            .drain()
            .flat_map(|(_, frames)| frames)
            .chain(self.pending.drain(..))
            .chain(self.returns.try_iter().map(|returned| returned.frame));
        for mut frame in frames {
            let _ = frame.take_handles();
            leaked += 1;
        }
        if leaked != 0 {
            tracing::warn!(leaked, "texture pool dropped without destroy_all");
        }
    }
}
