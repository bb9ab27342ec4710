// ============================================================================
// spark-observer - Dependency Tracking
// Recording reads and propagating writes through the reference graph
// ============================================================================
//
// Same borrow discipline as everywhere else in the crate: collect what we
// need out of a RefCell, release the borrow, then call into other nodes.
// ============================================================================

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use super::GraphInner;

// =============================================================================
// DERIVATION - anything that records reads (listeners, computed values)
// =============================================================================

pub(crate) trait Derivation {
    /// Record a read of `source`; returns true when it was not yet a dependency
    fn record_dependency(&self, source: &Rc<SourceNode>) -> bool;

    /// A dependency changed.
    ///
    /// Listeners queue themselves on the graph and return None. Computed
    /// values mark themselves dirty and return their own node so the change
    /// cascades to their observers.
    fn mark_stale(&self, graph: &GraphInner) -> Option<Rc<SourceNode>>;
}

// =============================================================================
// SOURCE NODE - the type-erased observable half of boxes and computed values
// =============================================================================

/// Observer list shared by every observable kind.
///
/// Observers are held weakly: a dropped listener never keeps itself alive
/// through the values it read.
#[derive(Default)]
pub(crate) struct SourceNode {
    observers: RefCell<Vec<Weak<dyn Derivation>>>,
}

impl SourceNode {
    pub(crate) fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub(crate) fn add_observer(&self, observer: Weak<dyn Derivation>) {
        self.observers.borrow_mut().push(observer);
    }

    /// Remove an observer by the address of its allocation
    pub(crate) fn remove_observer(&self, observer: *const ()) {
        self.observers
            .borrow_mut()
            .retain(|weak| weak.as_ptr() as *const () != observer);
    }

    /// Live observers in subscription order. Dead entries are pruned.
    pub(crate) fn live_observers(&self) -> Vec<Rc<dyn Derivation>> {
        let mut observers = self.observers.borrow_mut();
        observers.retain(|weak| weak.strong_count() > 0);
        observers.iter().filter_map(Weak::upgrade).collect()
    }

    pub(crate) fn observer_count(&self) -> usize {
        self.observers
            .borrow()
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }
}

// =============================================================================
// DEPENDENCIES - the sources one derivation read during its last run
// =============================================================================

#[derive(Default)]
pub(crate) struct Dependencies {
    sources: RefCell<Vec<Rc<SourceNode>>>,
}

impl Dependencies {
    pub(crate) fn record(&self, source: &Rc<SourceNode>) -> bool {
        let mut sources = self.sources.borrow_mut();
        if sources.iter().any(|known| Rc::ptr_eq(known, source)) {
            return false;
        }
        sources.push(source.clone());
        true
    }

    /// Unsubscribe `observer` from every recorded source and forget them
    pub(crate) fn release(&self, observer: *const ()) {
        let sources = self.sources.take();
        for source in sources {
            source.remove_observer(observer);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.sources.borrow().len()
    }
}

// =============================================================================
// TRACKING SCOPE
// =============================================================================

/// Restores the previous tracking state when dropped, even on panic.
pub(crate) struct TrackingScope<'a> {
    graph: &'a GraphInner,
    prev_untracking: bool,
}

impl Drop for TrackingScope<'_> {
    fn drop(&mut self) {
        self.graph.active.borrow_mut().pop();
        self.graph.untracking.set(self.prev_untracking);
    }
}

impl GraphInner {
    /// Make `derivation` the target of every read until the scope drops
    pub(crate) fn enter_tracking(&self, derivation: Weak<dyn Derivation>) -> TrackingScope<'_> {
        self.active.borrow_mut().push(derivation);
        let prev_untracking = self.untracking.replace(false);
        TrackingScope {
            graph: self,
            prev_untracking,
        }
    }

    /// Run `f` without recording reads
    pub(crate) fn untracked<T>(&self, f: impl FnOnce() -> T) -> T {
        struct UntrackGuard<'a> {
            graph: &'a GraphInner,
            prev: bool,
        }

        impl Drop for UntrackGuard<'_> {
            fn drop(&mut self) {
                self.graph.untracking.set(self.prev);
            }
        }

        let prev = self.untracking.replace(true);
        let _guard = UntrackGuard { graph: self, prev };
        f()
    }

    // =========================================================================
    // READS
    // =========================================================================

    /// Register `source` as a dependency of the innermost tracking derivation
    pub(crate) fn report_read(&self, source: &Rc<SourceNode>) {
        if self.untracking.get() {
            return;
        }

        let active = self.active.borrow().last().cloned();
        let Some(derivation) = active.and_then(|weak| weak.upgrade()) else {
            return;
        };

        if derivation.record_dependency(source) {
            source.add_observer(Rc::downgrade(&derivation));
        }
    }

    // =========================================================================
    // WRITES
    // =========================================================================

    /// A source changed: mark everything downstream inside an implicit
    /// transaction, so a lone write behaves like a one-mutation transaction.
    pub(crate) fn report_write(&self, source: &Rc<SourceNode>) {
        self.batch(|| mark_observers(self, source.clone()));
    }
}

// =============================================================================
// MARK OBSERVERS - propagate a change through the graph
// =============================================================================

/// Iterative walk with an explicit stack so deep computed chains cannot
/// overflow the call stack.
pub(crate) fn mark_observers(graph: &GraphInner, source: Rc<SourceNode>) {
    let mut stack = vec![source];

    while let Some(current) = stack.pop() {
        // Collect first: mark_stale may touch other observer lists
        let observers = current.live_observers();

        for observer in observers {
            if let Some(cascade) = observer.mark_stale(graph) {
                stack.push(cascade);
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
