// ============================================================================
// spark-observer - Type Definitions
// Type-erased traits at the seams between the observer, the graph and the host
// ============================================================================

use std::rc::Rc;

// =============================================================================
// TYPE ALIASES
// =============================================================================

/// Cleanup function returned by a mount effect, runs on unmount
pub type CleanupFn = Box<dyn FnOnce()>;

/// Dispose / unsubscribe function returned by subscriptions
pub type DisposeFn = Box<dyn FnOnce()>;

/// Callback invoked by the graph when a listener's dependencies change
pub type InvalidateFn = Box<dyn FnMut()>;

/// A stable "force an update" callback for one component instance.
///
/// Identity matters: the batching scheduler deduplicates requests by the
/// `Rc` allocation, so hosts should hand out the same `Rc` on every render.
pub type UpdateFn = Rc<dyn Fn()>;

/// Host batched-update primitive: runs the closure so that every update
/// request issued inside it is coalesced into one rendering pass.
pub type BatchedUpdatesFn = Rc<dyn Fn(&mut dyn FnMut())>;

/// Effect run once after the first commit of a component instance
pub type MountEffect = Box<dyn FnOnce() -> Option<CleanupFn>>;

// =============================================================================
// REACTIVE GRAPH INTERFACE
// =============================================================================
//
// The observer never looks inside the graph. All it needs is:
// - a listener that records dependencies while `track` runs and calls back
//   when one of them changes
// - a once-only "transaction finished" notification
// =============================================================================

/// A tracked computation handle created by a [`ReactiveGraph`].
pub trait Listener {
    /// Run `f` once, recording every observable read as a dependency.
    ///
    /// Previous dependencies are dropped before `f` runs. A disposed listener
    /// still runs `f`, it just records nothing.
    fn track(&self, f: &mut dyn FnMut());

    /// Stop tracking and never call the invalidation callback again.
    /// Calling it more than once is a no-op.
    fn dispose(&self);

    /// Whether [`dispose`](Listener::dispose) has been called
    fn is_disposed(&self) -> bool;
}

/// The slice of a reactive graph the observer consumes.
pub trait ReactiveGraph {
    /// Create a listener whose `on_invalidate` fires (at most once per
    /// invalidation batch) after a recorded dependency changes.
    fn create_listener(&self, on_invalidate: InvalidateFn) -> Box<dyn Listener>;

    /// Call `callback` once, after the current (or next) top-level
    /// transaction completes. The returned function unsubscribes; calling it
    /// after the callback fired is a no-op.
    fn on_transaction_done(&self, callback: Box<dyn FnOnce()>) -> DisposeFn;
}

/// Shared handle to a graph, as stored in observer options and registries
pub type GraphHandle = Rc<dyn ReactiveGraph>;

/// Identity of a graph handle (address of the shared allocation)
pub fn graph_key(graph: &GraphHandle) -> usize {
    Rc::as_ptr(graph) as *const () as usize
}

/// Identity of an update callback (address of the shared allocation)
pub fn update_key(update: &UpdateFn) -> usize {
    Rc::as_ptr(update) as *const () as usize
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_key_follows_rc_identity() {
        let a: UpdateFn = Rc::new(|| {});
        let b: UpdateFn = Rc::new(|| {});
        let a2 = a.clone();

        assert_eq!(update_key(&a), update_key(&a2));
        assert_ne!(update_key(&a), update_key(&b));
    }
}
