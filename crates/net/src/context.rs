//! Per-delivery message context.

use crate::dispatch::PlayerId;
use crate::executor::MainThreadHandle;
use tracing::warn;

/// Context handed to a message handler for one received message.
pub struct MessageContext<W> {
    sender: PlayerId,
    main_thread: MainThreadHandle<W>,
    handled: bool,
}

impl<W> MessageContext<W> {
    /// Context for a message received from `sender`.
    pub fn new(sender: PlayerId, main_thread: MainThreadHandle<W>) -> Self {
        Self {
            sender,
            main_thread,
            handled: false,
        }
    }

    /// Player whose connection delivered the message.
    pub fn sender(&self) -> PlayerId {
        self.sender
    }

    /// Defer `work` to the main thread.
    ///
    /// If the queue rejects the work it is dropped with a warning.
    pub fn enqueue_work<F>(&self, work: F)
    where
        F: FnOnce(&mut W) + Send + 'static,
    {
        if let Err(err) = self.main_thread.submit(work) {
            warn!(sender = %self.sender, %err, "Dropping deferred message work");
        }
    }

    /// Mark whether the transport should consider the message consumed.
    pub fn set_packet_handled(&mut self, handled: bool) {
        self.handled = handled;
    }

    /// Whether the handler marked the message consumed.
    pub fn packet_handled(&self) -> bool {
        self.handled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::MainThreadExecutor;

    #[test]
    fn enqueued_work_waits_for_main_thread() {
        let (executor, handle) = MainThreadExecutor::<u32>::new(4);
        let mut ctx = MessageContext::new(PlayerId(3), handle);
        ctx.enqueue_work(|n: &mut u32| *n += 10);
        ctx.set_packet_handled(true);

        assert!(ctx.packet_handled());
        assert_eq!(ctx.sender(), PlayerId(3));

        let mut n = 0;
        assert_eq!(executor.run_all(&mut n), 1);
        assert_eq!(n, 10);
    }

    #[test]
    fn rejected_work_is_dropped() {
        let (executor, handle) = MainThreadExecutor::<u32>::new(4);
        drop(executor);
        let ctx = MessageContext::new(PlayerId(1), handle);
        ctx.enqueue_work(|n: &mut u32| *n += 1);
        assert!(!ctx.packet_handled());
    }
}
