//! ### English
//! Single-slot frame handoff from the render thread to the consumer.
//!
//! ### 中文
//! 渲染线程到消费者的单槽帧交接。

use super::{Frame, FrameRecycler};

/// ### English
/// Latest-wins mailbox holding at most one unclaimed frame.
///
/// Publishing over an unclaimed frame recycles the superseded one immediately; frames are never
/// queued. The mailbox itself is not synchronized: it lives inside the surface's `SyncState` and
/// is only touched with that mutex held.
///
/// ### 中文
/// “最新者胜出”的 mailbox，最多保存一个未被领取的帧。
///
/// 若已有未领取的帧，发布新帧时立即回收被顶替的帧；帧永远不会排队。mailbox 本身不带同步：
/// 它位于 surface 的 `SyncState` 中，只在持有该互斥锁时访问。
#[derive(Debug)]
pub struct FrameMailbox {
    slot: Option<Frame>,
    recycler: FrameRecycler,
    superseded: u64,
}

impl FrameMailbox {
    pub fn new(recycler: FrameRecycler) -> Self {
        Self {
            slot: None,
            recycler,
            superseded: 0,
        }
    }

    /// ### English
    /// Stores `frame` as the latest frame, recycling any unclaimed predecessor.
    ///
    /// ### 中文
    /// 将 `frame` 存为最新帧；若存在未领取的旧帧则回收之。
    pub fn publish(&mut self, frame: Frame) {
        if let Some(previous) = self.slot.replace(frame) {
            self.superseded += 1;
            tracing::trace!(
                texture = previous.texture().0,
                "unclaimed frame superseded; recycling"
            );
            self.recycler.recycle(previous);
        }
    }

    /// ### English
    /// Takes ownership of the pending frame, leaving the mailbox empty.
    ///
    /// ### 中文
    /// 取走待领取的帧（转移所有权），mailbox 随之清空。
    #[inline]
    pub fn fetch(&mut self) -> Option<Frame> {
        self.slot.take()
    }

    #[inline]
    pub fn is_occupied(&self) -> bool {
        self.slot.is_some()
    }

    /// Number of frames recycled without ever being fetched.
    #[inline]
    pub fn superseded(&self) -> u64 {
        self.superseded
    }
}
