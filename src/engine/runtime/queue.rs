//! ### English
//! Two-lane command queue feeding the render thread.
//!
//! ### 中文
//! 为渲染线程供给命令的双通道队列。
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_channel::{self as channel, select};

use super::command::Command;

/// ### English
/// Sender side, held by the controller on the owning thread.
///
/// ### 中文
/// 发送端，由所属线程上的 controller 持有。
pub(super) struct CommandQueue {
    /// ### English
    /// Normal lane (`Initialize`, `Render`), FIFO.
    ///
    /// ### 中文
    /// 普通通道（`Initialize`、`Render`），先进先出。
    normal: channel::Sender<Command>,
    /// ### English
    /// Elevated-priority lane (`Quit`).
    ///
    /// ### 中文
    /// 高优先级通道（`Quit`）。
    urgent: channel::Sender<Command>,
    /// ### English
    /// Close flag used to reject new commands after `Quit`.
    ///
    /// ### 中文
    /// 关闭标记：`Quit` 之后拒绝新命令。
    closed: AtomicBool,
}

/// ### English
/// Receiver side, owned by the render thread.
///
/// ### 中文
/// 接收端，由渲染线程持有。
pub(super) struct CommandReceiver {
    normal: channel::Receiver<Command>,
    urgent: channel::Receiver<Command>,
}

pub(super) fn command_queue() -> (CommandQueue, CommandReceiver) {
    let (normal_tx, normal_rx) = channel::unbounded();
    let (urgent_tx, urgent_rx) = channel::unbounded();
    (
        CommandQueue {
            normal: normal_tx,
            urgent: urgent_tx,
            closed: AtomicBool::new(false),
        },
        CommandReceiver {
            normal: normal_rx,
            urgent: urgent_rx,
        },
    )
}

impl CommandQueue {
    /// ### English
    /// Posts on the normal lane; returns `false` if the queue is closed or the render thread is
    /// gone.
    ///
    /// ### 中文
    /// 投递到普通通道；若队列已关闭或渲染线程已退出则返回 `false`。
    pub(super) fn push(&self, command: Command) -> bool {
        if self.closed.load(Ordering::Acquire) {
            return false;
        }
        self.normal.send(command).is_ok()
    }

    /// ### English
    /// Posts on the urgent lane and closes the queue: an urgent command is the last one the
    /// render thread will accept.
    ///
    /// ### 中文
    /// 投递到紧急通道并关闭队列：紧急命令是渲染线程接受的最后一条命令。
    pub(super) fn push_urgent(&self, command: Command) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.urgent.send(command).is_ok()
    }

    pub(super) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl CommandReceiver {
    /// ### English
    /// Blocks for the next command, urgent lane first. Returns `None` once both senders are gone.
    ///
    /// ### 中文
    /// 阻塞等待下一条命令，优先紧急通道；两个发送端都释放后返回 `None`。
    pub(super) fn recv(&self) -> Option<Command> {
        if let Ok(command) = self.urgent.try_recv() {
            return Some(command);
        }

        let command = select! {
            recv(self.urgent) -> command => return command.ok(),
            recv(self.normal) -> command => command.ok()?,
        };

        /*
        ### English
        Both lanes may have been ready at once; an urgent command still wins. It is terminal, so
        the normal command it overtakes would never run anyway.

        ### 中文
        两个通道可能同时就绪；此时紧急命令仍然优先。紧急命令是终结命令，
        被它超越的普通命令本来也不会再执行。
        */
        if let Ok(urgent) = self.urgent.try_recv() {
            tracing::trace!(overtaken = ?command, "urgent command overtakes pending command");
            return Some(urgent);
        }
        Some(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal_lane_is_fifo() {
        let (queue, receiver) = command_queue();
        assert!(queue.push(Command::Render));
        assert!(queue.push(Command::Quit));
        assert!(matches!(receiver.recv(), Some(Command::Render)));
        assert!(matches!(receiver.recv(), Some(Command::Quit)));
    }

    #[test]
    fn urgent_lane_overtakes_pending_renders() {
        let (queue, receiver) = command_queue();
        assert!(queue.push(Command::Render));
        assert!(queue.push(Command::Render));
        assert!(queue.push_urgent(Command::Quit));
        assert!(matches!(receiver.recv(), Some(Command::Quit)));
    }

    #[test]
    fn closed_after_urgent() {
        let (queue, _receiver) = command_queue();
        assert!(queue.push_urgent(Command::Quit));
        assert!(queue.is_closed());
        assert!(!queue.push(Command::Render));
        assert!(!queue.push_urgent(Command::Quit));
    }

    #[test]
    fn recv_ends_when_senders_drop() {
        let (queue, receiver) = command_queue();
        drop(queue);
        assert!(receiver.recv().is_none());
    }
}
