//! ### English
//! Software stand-in for a GPU context: hands out unique texture/fence IDs and tracks live
//! objects, so the synchronization engine can run (and be checked for leaks) without a GPU.
//!
//! ### 中文
//! GPU 上下文的软件替身：分配唯一的纹理/fence ID 并追踪存活对象，
//! 使同步引擎可以在没有 GPU 的情况下运行（并检查泄漏）。

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use dpi::PhysicalSize;

use crate::engine::error::{Result, SurfaceError};
use crate::engine::frame::{FenceHandle, TextureHandle};

use super::{ContextFactory, GpuContext};

/// ### English
/// Shared bookkeeping behind one or more [`HeadlessContext`]s. Safe to inspect from any thread.
///
/// ### 中文
/// 一个或多个 [`HeadlessContext`] 背后的共享记账数据，可在任意线程查看。
#[derive(Debug)]
pub struct HeadlessDevice {
    next_texture: AtomicU32,
    next_fence: AtomicU64,
    textures: Mutex<HashSet<u32>>,
    fences: Mutex<HashSet<u64>>,
    textures_created: AtomicUsize,
    /// ### English
    /// Count of deletes that hit an unknown or already deleted object.
    ///
    /// ### 中文
    /// 删除未知或已删除对象的次数。
    invalid_deletes: AtomicUsize,
    fences_signaled: AtomicBool,
    current: AtomicBool,
}

impl Default for HeadlessDevice {
    fn default() -> Self {
        Self {
            next_texture: AtomicU32::new(1),
            next_fence: AtomicU64::new(1),
            textures: Mutex::new(HashSet::new()),
            fences: Mutex::new(HashSet::new()),
            textures_created: AtomicUsize::new(0),
            invalid_deletes: AtomicUsize::new(0),
            fences_signaled: AtomicBool::new(true),
            current: AtomicBool::new(false),
        }
    }
}

impl HeadlessDevice {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn live_textures(&self) -> usize {
        self.textures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn live_fences(&self) -> usize {
        self.fences
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn textures_created(&self) -> usize {
        self.textures_created.load(Ordering::Relaxed)
    }

    pub fn invalid_deletes(&self) -> usize {
        self.invalid_deletes.load(Ordering::Relaxed)
    }

    /// ### English
    /// Whether some context of this device is current.
    ///
    /// ### 中文
    /// 该设备的某个上下文是否处于 current。
    pub fn is_current(&self) -> bool {
        self.current.load(Ordering::Acquire)
    }

    /// ### English
    /// Controls fence polling: when `false`, every fence reports "still pending".
    ///
    /// ### 中文
    /// 控制 fence 轮询结果：为 `false` 时所有 fence 都报告“尚未完成”。
    pub fn set_fences_signaled(&self, signaled: bool) {
        self.fences_signaled.store(signaled, Ordering::Release);
    }
}

/// ### English
/// [`GpuContext`] backed by a [`HeadlessDevice`].
///
/// ### 中文
/// 由 [`HeadlessDevice`] 支撑的 [`GpuContext`]。
#[derive(Debug)]
pub struct HeadlessContext {
    device: Arc<HeadlessDevice>,
    shares_resources: bool,
}

impl HeadlessContext {
    pub fn new(device: Arc<HeadlessDevice>) -> Self {
        Self {
            device,
            shares_resources: true,
        }
    }

    /// ### English
    /// A context that reports it is *not* in the host's share group (wiring error).
    ///
    /// ### 中文
    /// 报告自身*不在*宿主共享组中的上下文（接线错误）。
    pub fn not_sharing(device: Arc<HeadlessDevice>) -> Self {
        Self {
            device,
            shares_resources: false,
        }
    }

    /// ### English
    /// Boxed factory suitable for `SurfaceController::set_root`.
    ///
    /// ### 中文
    /// 可直接传给 `SurfaceController::set_root` 的装箱工厂。
    pub fn factory(device: Arc<HeadlessDevice>) -> ContextFactory {
        Box::new(move || Ok(Box::new(HeadlessContext::new(device)) as Box<dyn GpuContext>))
    }

    pub fn device(&self) -> &Arc<HeadlessDevice> {
        &self.device
    }
}

impl GpuContext for HeadlessContext {
    fn make_current(&self) -> bool {
        self.device.current.store(true, Ordering::Release);
        true
    }

    fn done_current(&self) {
        self.device.current.store(false, Ordering::Release);
    }

    fn shares_resources_with_host(&self) -> bool {
        self.shares_resources
    }

    fn create_texture(&self, size: PhysicalSize<u32>) -> Result<TextureHandle> {
        if size.width == 0 || size.height == 0 {
            return Err(SurfaceError::Gpu(format!(
                "cannot allocate a {}x{} texture",
                size.width, size.height
            )));
        }

        let id = self.device.next_texture.fetch_add(1, Ordering::Relaxed);
        self.device
            .textures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id);
        self.device.textures_created.fetch_add(1, Ordering::Relaxed);
        Ok(TextureHandle(id))
    }

    fn delete_texture(&self, texture: TextureHandle) {
        let removed = self
            .device
            .textures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&texture.0);
        if !removed {
            self.device.invalid_deletes.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn insert_fence(&self) -> Result<FenceHandle> {
        let id = self.device.next_fence.fetch_add(1, Ordering::Relaxed);
        self.device
            .fences
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id);
        Ok(FenceHandle(id))
    }

    fn is_fence_signaled(&self, fence: FenceHandle) -> bool {
        fence.is_null() || self.device.fences_signaled.load(Ordering::Acquire)
    }

    fn delete_fence(&self, fence: FenceHandle) {
        if fence.is_null() {
            return;
        }
        let removed = self
            .device
            .fences
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&fence.0);
        if !removed {
            self.device.invalid_deletes.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn flush(&self) {}
}
