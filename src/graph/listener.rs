// ============================================================================
// spark-observer - Listeners
// Tracked computations that call back when a dependency changes
// ============================================================================
//
// A listener does not re-run itself. It records reads while `track` runs,
// and when one of them changes it calls its invalidation callback once and
// stays stale until the next `track`. Autoruns are listeners whose callback
// simply tracks again.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::core::constants::{DISPOSED, STALE};
use crate::core::types::{InvalidateFn, Listener};

use super::GraphInner;
use super::tracking::{Dependencies, Derivation, SourceNode};

// =============================================================================
// LISTENER INNER
// =============================================================================

pub(crate) struct ListenerInner {
    /// Flags bitmask (STALE, DISPOSED)
    flags: Cell<u32>,

    /// Invalidation callback (taken out while it runs)
    on_invalidate: RefCell<Option<InvalidateFn>>,

    /// Sources read during the last tracked run
    deps: Dependencies,

    graph: Weak<GraphInner>,

    /// Weak reference to self, used to register as an observer
    self_weak: Weak<ListenerInner>,
}

impl ListenerInner {
    fn new_cyclic(
        graph: Weak<GraphInner>,
        make_callback: impl FnOnce(Weak<ListenerInner>) -> InvalidateFn,
    ) -> Rc<Self> {
        Rc::new_cyclic(|self_weak: &Weak<ListenerInner>| Self {
            flags: Cell::new(0),
            on_invalidate: RefCell::new(Some(make_callback(self_weak.clone()))),
            deps: Dependencies::default(),
            graph,
            self_weak: self_weak.clone(),
        })
    }

    fn observer_ptr(&self) -> *const () {
        self as *const Self as *const ()
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.flags.get() & DISPOSED != 0
    }

    pub(crate) fn is_stale(&self) -> bool {
        self.flags.get() & STALE != 0
    }

    pub(crate) fn track(&self, f: &mut dyn FnMut()) {
        let Some(graph) = self.graph.upgrade() else {
            f();
            return;
        };

        if self.is_disposed() {
            graph.untracked(f);
            return;
        }

        // Drop last run's dependencies, the new run records its own
        self.deps.release(self.observer_ptr());
        self.flags.set(self.flags.get() & !STALE);

        let me: Weak<dyn Derivation> = self.self_weak.clone();
        let _scope = graph.enter_tracking(me);
        f();
    }

    /// Called by the graph at the end of a transaction
    pub(crate) fn notify(&self) {
        // Re-tracked or disposed since it was queued
        if self.is_disposed() || !self.is_stale() {
            return;
        }

        let callback = self.on_invalidate.borrow_mut().take();
        if let Some(mut callback) = callback {
            callback();

            // The callback may have disposed us; then it must not come back
            if !self.is_disposed() {
                let mut slot = self.on_invalidate.borrow_mut();
                if slot.is_none() {
                    *slot = Some(callback);
                }
            }
        }
    }

    pub(crate) fn dispose(&self) {
        if self.is_disposed() {
            return;
        }

        self.flags.set(self.flags.get() | DISPOSED);
        self.deps.release(self.observer_ptr());

        // Dropping the callback may drop user state, keep it out of the borrow
        let callback = self.on_invalidate.borrow_mut().take();
        drop(callback);
    }
}

impl Derivation for ListenerInner {
    fn record_dependency(&self, source: &Rc<SourceNode>) -> bool {
        self.deps.record(source)
    }

    fn mark_stale(&self, graph: &GraphInner) -> Option<Rc<SourceNode>> {
        let flags = self.flags.get();
        if flags & (STALE | DISPOSED) == 0 {
            self.flags.set(flags | STALE);
            if let Some(me) = self.self_weak.upgrade() {
                graph.queue_listener(me);
            }
        }
        None
    }
}

// =============================================================================
// GRAPH LISTENER - the public handle
// =============================================================================

/// Listener handle created by [`Graph::listener`](super::Graph::listener) or
/// through [`ReactiveGraph::create_listener`](crate::ReactiveGraph::create_listener).
///
/// Dropping the handle disposes the listener.
///
/// # Example
///
/// ```
/// use spark_observer::{Graph, Listener};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let graph = Graph::new();
/// let count = graph.observable(0);
/// let invalidations = Rc::new(Cell::new(0));
///
/// let seen = invalidations.clone();
/// let listener = graph.listener(move || seen.set(seen.get() + 1));
/// listener.track(&mut || {
///     count.get();
/// });
///
/// count.set(1);
/// count.set(2); // still stale, not notified again
/// assert_eq!(invalidations.get(), 1);
/// ```
pub struct GraphListener {
    inner: Rc<ListenerInner>,
}

impl GraphListener {
    pub(crate) fn new(graph: Weak<GraphInner>, mut on_invalidate: impl FnMut() + 'static) -> Self {
        Self::with_self(graph, move |_| Box::new(move || on_invalidate()) as InvalidateFn)
    }

    /// Build a listener whose callback can reach the listener itself
    pub(crate) fn with_self(
        graph: Weak<GraphInner>,
        make_callback: impl FnOnce(Weak<ListenerInner>) -> InvalidateFn,
    ) -> Self {
        Self {
            inner: ListenerInner::new_cyclic(graph, make_callback),
        }
    }

    pub(crate) fn inner(&self) -> &Rc<ListenerInner> {
        &self.inner
    }

    /// Number of distinct sources read during the last tracked run
    pub fn dependency_count(&self) -> usize {
        self.inner.deps.len()
    }

    /// Whether a dependency changed since the last tracked run
    pub fn is_stale(&self) -> bool {
        self.inner.is_stale()
    }
}

impl Listener for GraphListener {
    fn track(&self, f: &mut dyn FnMut()) {
        self.inner.track(f);
    }

    fn dispose(&self) {
        self.inner.dispose();
    }

    fn is_disposed(&self) -> bool {
        self.inner.is_disposed()
    }
}

impl Drop for GraphListener {
    fn drop(&mut self) {
        self.inner.dispose();
    }
}

// =============================================================================
// TESTS
// =============================================================================
