//! ### English
//! Frame ownership types shared between the render thread (producer) and the consumer thread.
//! A `Frame` is a texture/fence pair; it is owned by exactly one of the pool, the mailbox or the
//! consumer at any instant.
//!
//! ### 中文
//! 渲染线程（生产者）与消费线程之间共享的帧所有权类型。
//! `Frame` 是纹理/fence 对；任意时刻只被 pool、mailbox 或消费者中的一方持有。
mod mailbox;
mod recycler;

use dpi::PhysicalSize;

pub use mailbox::FrameMailbox;
pub use recycler::FrameRecycler;

pub(crate) use recycler::{ReturnedFrame, recycle_channel};

/// ### English
/// Opaque GPU texture identifier (`0` is the null sentinel).
///
/// ### 中文
/// 不透明的 GPU 纹理 ID（`0` 为空哨兵值）。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u32);

impl TextureHandle {
    pub const NULL: Self = Self(0);

    #[inline]
    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

/// ### English
/// Opaque GPU fence handle (`GLsync` cast to `u64` on GL backends; `0` is the null sentinel).
///
/// ### 中文
/// 不透明的 GPU fence 句柄（GL 后端为 `GLsync` 转 `u64`；`0` 为空哨兵值）。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct FenceHandle(pub u64);

impl FenceHandle {
    pub const NULL: Self = Self(0);

    #[inline]
    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

/// ### English
/// One rendered image: a texture plus the fence that gates its use.
///
/// `Frame` is deliberately neither `Clone` nor `Copy`: moving it moves ownership of the GPU
/// handles. A frame must go back to the pool exactly once (through the mailbox or
/// `SurfaceController::release_frame`); dropping a frame that still holds a texture leaks it and
/// is reported with a warning.
///
/// ### 中文
/// 一帧渲染结果：纹理以及约束其使用时机的 fence。
///
/// `Frame` 刻意不实现 `Clone`/`Copy`：移动即转移 GPU 句柄所有权。每帧必须恰好归还 pool 一次
/// （经由 mailbox 或 `SurfaceController::release_frame`）；丢弃仍持有纹理的帧会造成泄漏并输出警告。
#[must_use = "frames must be released back to the pool"]
#[derive(Debug, PartialEq, Eq)]
pub struct Frame {
    texture: TextureHandle,
    fence: FenceHandle,
    size: PhysicalSize<u32>,
}

impl Frame {
    pub(crate) fn new(texture: TextureHandle, fence: FenceHandle, size: PhysicalSize<u32>) -> Self {
        debug_assert!(!texture.is_null(), "frame built from a null texture");
        Self {
            texture,
            fence,
            size,
        }
    }

    /// ### English
    /// GL texture ID containing the frame.
    ///
    /// ### 中文
    /// 包含该帧的 GL 纹理 ID。
    #[inline]
    pub fn texture(&self) -> TextureHandle {
        self.texture
    }

    /// ### English
    /// Producer fence; wait on it (GPU-side) before sampling `texture`. May be null.
    ///
    /// ### 中文
    /// 生产者 fence；采样 `texture` 前应（在 GPU 侧）等待它。可能为空。
    #[inline]
    pub fn fence(&self) -> FenceHandle {
        self.fence
    }

    #[inline]
    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    /// Texture bytes at 4 bytes per pixel.
    #[inline]
    pub fn byte_size(&self) -> u64 {
        u64::from(self.size.width) * u64::from(self.size.height) * 4
    }

    /// ### English
    /// Replaces the gating fence and returns the previous one (render thread only).
    ///
    /// ### 中文
    /// 替换 gating fence 并返回旧值（仅限渲染线程）。
    #[inline]
    pub(crate) fn replace_fence(&mut self, fence: FenceHandle) -> FenceHandle {
        std::mem::replace(&mut self.fence, fence)
    }

    /// ### English
    /// Takes both handles out of the frame, resetting it to the null sentinel (recycled state).
    ///
    /// ### 中文
    /// 取出两个句柄，并把帧重置为空哨兵（recycled 状态）。
    #[inline]
    pub(crate) fn take_handles(&mut self) -> (TextureHandle, FenceHandle) {
        (
            std::mem::take(&mut self.texture),
            std::mem::take(&mut self.fence),
        )
    }
}

impl Drop for Frame {
    fn drop(&mut self) {
        if !self.texture.is_null() {
            tracing::warn!(
                texture = self.texture.0,
                width = self.size.width,
                height = self.size.height,
                "frame dropped without being released; texture leaked"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_handles() {
        assert!(TextureHandle::NULL.is_null());
        assert!(FenceHandle::default().is_null());
        assert!(!TextureHandle(7).is_null());
    }

    #[test]
    fn take_handles_resets_to_null() {
        let mut frame = Frame::new(TextureHandle(3), FenceHandle(9), PhysicalSize::new(4, 2));
        assert_eq!(frame.byte_size(), 32);
        assert_eq!(frame.take_handles(), (TextureHandle(3), FenceHandle(9)));
        assert!(frame.texture().is_null());
        assert!(frame.fence().is_null());
    }

    #[test]
    fn replace_fence_returns_previous() {
        let mut frame = Frame::new(TextureHandle(1), FenceHandle::NULL, PhysicalSize::new(1, 1));
        assert_eq!(frame.replace_fence(FenceHandle(5)), FenceHandle::NULL);
        assert_eq!(frame.fence(), FenceHandle(5));
        let _ = frame.take_handles();
    }
}
