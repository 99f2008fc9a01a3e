//! ### English
//! Return path for frames travelling back into the texture pool.
//!
//! Frames may be returned from any thread (consumer release, mailbox displacement), but GPU
//! objects may only be touched on the render thread. Returns are therefore queued on a channel
//! and drained by the pool on the render thread.
//!
//! ### 中文
//! 帧归还 texture pool 的回收通道。
//!
//! 帧可能从任意线程归还（消费者释放、mailbox 顶替），但 GPU 对象只能在渲染线程操作；
//! 因此归还请求先进入 channel，再由 pool 在渲染线程 drain。

use crossbeam_channel as channel;

use super::{FenceHandle, Frame};

/// ### English
/// One returned frame plus the optional consumer fence inserted after the consumer's last use.
///
/// ### 中文
/// 一个被归还的帧，以及消费者最后一次使用后插入的可选 consumer fence。
#[derive(Debug)]
pub(crate) struct ReturnedFrame {
    pub frame: Frame,
    pub consumer_fence: FenceHandle,
}

/// ### English
/// Cloneable sender side of the recycle channel.
///
/// ### 中文
/// 回收 channel 的可克隆发送端。
#[derive(Clone, Debug)]
pub struct FrameRecycler {
    tx: channel::Sender<ReturnedFrame>,
}

pub(crate) fn recycle_channel() -> (FrameRecycler, channel::Receiver<ReturnedFrame>) {
    let (tx, rx) = channel::unbounded();
    (FrameRecycler { tx }, rx)
}

impl FrameRecycler {
    /// ### English
    /// Returns a frame whose producer fence still gates reuse.
    ///
    /// ### 中文
    /// 归还一个帧；复用前仍以其生产者 fence 为准。
    pub fn recycle(&self, frame: Frame) {
        self.recycle_with_fence(frame, FenceHandle::NULL);
    }

    /// ### English
    /// Returns a frame together with a consumer fence. When `consumer_fence` is non-null it
    /// replaces the producer fence as the reuse gate.
    ///
    /// ### 中文
    /// 归还帧并附带 consumer fence。`consumer_fence` 非空时，它取代生产者 fence 作为复用条件。
    pub fn recycle_with_fence(&self, frame: Frame, consumer_fence: FenceHandle) {
        if let Err(err) = self.tx.send(ReturnedFrame {
            frame,
            consumer_fence,
        }) {
            /*
            ### English
            The pool is gone, and with it the render-thread context. Nothing can delete the
            texture any more; forget the handles instead of warning twice.

            ### 中文
            pool 已销毁，渲染线程上下文也随之释放，已无法删除该纹理；直接丢弃句柄，避免重复告警。
            */
            let mut returned = err.into_inner();
            let (texture, _) = returned.frame.take_handles();
            tracing::debug!(
                texture = texture.0,
                "frame returned after the texture pool was torn down"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use dpi::PhysicalSize;

    use super::*;
    use crate::engine::frame::TextureHandle;

    #[test]
    fn returns_reach_the_receiver_in_order() {
        let (recycler, rx) = recycle_channel();
        let size = PhysicalSize::new(2, 2);
        recycler.recycle(Frame::new(TextureHandle(1), FenceHandle(10), size));
        recycler.recycle_with_fence(
            Frame::new(TextureHandle(2), FenceHandle(20), size),
            FenceHandle(21),
        );

        let mut first = rx.try_recv().expect("first return");
        assert_eq!(first.frame.texture(), TextureHandle(1));
        assert!(first.consumer_fence.is_null());
        let mut second = rx.try_recv().expect("second return");
        assert_eq!(second.consumer_fence, FenceHandle(21));
        assert!(rx.try_recv().is_err());

        let _ = first.frame.take_handles();
        let _ = second.frame.take_handles();
    }

    #[test]
    fn recycling_after_teardown_is_silent() {
        let (recycler, rx) = recycle_channel();
        drop(rx);
        recycler.recycle(Frame::new(
            TextureHandle(4),
            FenceHandle::NULL,
            PhysicalSize::new(1, 1),
        ));
    }
}
