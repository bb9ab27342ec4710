// ============================================================================
// spark-observer - Transactions
// Batch writes, notify listeners once, then signal "transaction done"
// ============================================================================
//
// End of the outermost transaction runs in two phases:
// 1. notify every stale listener (repeatedly, while notifications cause more
//    writes - those writes join the current transaction)
// 2. fire the transaction-done callbacks, once each
//
// Listeners that subscribe to "transaction done" while being notified in
// phase 1 are therefore flushed by the same transaction.
// ============================================================================

use std::rc::Rc;

use crate::core::constants::MAX_NOTIFY_ROUNDS;

use super::GraphInner;
use super::listener::ListenerInner;

impl GraphInner {
    // =========================================================================
    // BATCH DEPTH
    // =========================================================================

    pub(crate) fn in_transaction(&self) -> bool {
        self.batch_depth.get() > 0
    }

    /// Run `f` as a transaction. Nested calls join the outer transaction.
    pub(crate) fn batch<T>(&self, f: impl FnOnce() -> T) -> T {
        self.batch_depth.set(self.batch_depth.get() + 1);

        // Ends the transaction even if `f` panics
        struct BatchGuard<'a> {
            graph: &'a GraphInner,
        }

        impl Drop for BatchGuard<'_> {
            fn drop(&mut self) {
                self.graph.end_batch();
            }
        }

        let _guard = BatchGuard { graph: self };
        f()
    }

    fn end_batch(&self) {
        let depth = self.batch_depth.get();
        if depth > 1 {
            self.batch_depth.set(depth - 1);
            return;
        }

        // Depth stays at 1 while notifying, so writes made by listeners queue
        // up instead of starting transactions of their own.
        struct DepthReset<'a> {
            graph: &'a GraphInner,
        }

        impl Drop for DepthReset<'_> {
            fn drop(&mut self) {
                self.graph.batch_depth.set(0);
            }
        }

        {
            let _reset = DepthReset { graph: self };
            self.notify_pending();
        }

        self.fire_transaction_done();
    }

    // =========================================================================
    // PHASE 1 - LISTENER NOTIFICATION
    // =========================================================================

    pub(crate) fn queue_listener(&self, listener: Rc<ListenerInner>) {
        self.pending.borrow_mut().push(listener);
    }

    fn notify_pending(&self) {
        let mut rounds = 0u32;

        loop {
            let pending = self.pending.take();
            if pending.is_empty() {
                break;
            }

            rounds += 1;
            if rounds > MAX_NOTIFY_ROUNDS {
                panic!(
                    "Maximum update depth exceeded. This can happen when a listener \
                     keeps writing to observables it depends on."
                );
            }

            for listener in pending {
                listener.notify();
            }
        }
    }

    // =========================================================================
    // PHASE 2 - TRANSACTION DONE
    // =========================================================================

    pub(crate) fn subscribe_done(&self, callback: Box<dyn FnOnce()>) -> u64 {
        let id = self.next_subscription.get();
        self.next_subscription.set(id + 1);
        self.done_callbacks.borrow_mut().insert(id, callback);
        id
    }

    pub(crate) fn unsubscribe_done(&self, id: u64) {
        // Dropping the callback must happen outside the borrow
        let removed = self.done_callbacks.borrow_mut().shift_remove(&id);
        drop(removed);
    }

    pub(crate) fn done_subscription_count(&self) -> usize {
        self.done_callbacks.borrow().len()
    }

    fn fire_transaction_done(&self) {
        let callbacks = self.done_callbacks.take();
        if callbacks.is_empty() {
            return;
        }

        tracing::trace!(count = callbacks.len(), "transaction done");
        for (_, callback) in callbacks {
            callback();
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
