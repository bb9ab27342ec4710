// ============================================================================
// spark-observer - Reference Reactive Graph
// A compact single-threaded graph: boxes, computed values, listeners,
// autoruns and transactions
// ============================================================================
//
// The observer only talks to a graph through `ReactiveGraph` and `Listener`.
// This module is the graph the crate ships with, and the thread-wide default
// used when a component does not name one.
// ============================================================================

pub mod computed;
pub mod listener;
pub mod observable;
pub(crate) mod tracking;
mod transaction;

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use crate::core::types::{DisposeFn, GraphHandle, InvalidateFn, Listener, ReactiveGraph};

pub use computed::Computed;
pub use listener::GraphListener;
pub use observable::{default_equals, EqualsFn, ObservableBox};

use listener::ListenerInner;
use tracking::Derivation;

// =============================================================================
// GRAPH INNER
// =============================================================================

pub(crate) struct GraphInner {
    self_weak: Weak<GraphInner>,

    /// Stack of derivations currently recording reads (innermost last)
    pub(crate) active: RefCell<Vec<Weak<dyn Derivation>>>,

    /// Inside `untracked`
    pub(crate) untracking: Cell<bool>,

    /// Transaction nesting depth (0 = not in a transaction)
    pub(crate) batch_depth: Cell<u32>,

    /// Listeners marked stale during the current transaction
    pub(crate) pending: RefCell<Vec<Rc<ListenerInner>>>,

    /// Transaction-done callbacks, fired in subscription order
    pub(crate) done_callbacks: RefCell<IndexMap<u64, Box<dyn FnOnce()>>>,

    pub(crate) next_subscription: Cell<u64>,
}

impl GraphInner {
    fn new() -> Rc<Self> {
        Rc::new_cyclic(|self_weak: &Weak<GraphInner>| Self {
            self_weak: self_weak.clone(),
            active: RefCell::new(Vec::new()),
            untracking: Cell::new(false),
            batch_depth: Cell::new(0),
            pending: RefCell::new(Vec::new()),
            done_callbacks: RefCell::new(IndexMap::new()),
            next_subscription: Cell::new(0),
        })
    }
}

impl ReactiveGraph for GraphInner {
    fn create_listener(&self, mut on_invalidate: InvalidateFn) -> Box<dyn Listener> {
        Box::new(GraphListener::new(self.self_weak.clone(), move || on_invalidate()))
    }

    fn on_transaction_done(&self, callback: Box<dyn FnOnce()>) -> DisposeFn {
        let id = self.subscribe_done(callback);
        let graph = self.self_weak.clone();
        Box::new(move || {
            if let Some(graph) = graph.upgrade() {
                graph.unsubscribe_done(id);
            }
        })
    }
}

// =============================================================================
// GRAPH - the public handle
// =============================================================================

/// A reactive graph instance. Cloning shares the same graph.
///
/// # Example
///
/// ```
/// use spark_observer::Graph;
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let graph = Graph::new();
/// let first = graph.observable("Ada".to_string());
/// let last = graph.observable("Lovelace".to_string());
///
/// let full = graph.computed({
///     let (first, last) = (first.clone(), last.clone());
///     move || format!("{} {}", first.get(), last.get())
/// });
///
/// let seen = Rc::new(RefCell::new(Vec::new()));
/// let _dispose = graph.autorun({
///     let seen = seen.clone();
///     move || seen.borrow_mut().push(full.get())
/// });
///
/// graph.transaction(|| {
///     first.set("Grace".to_string());
///     last.set("Hopper".to_string());
/// });
///
/// assert_eq!(*seen.borrow(), vec!["Ada Lovelace", "Grace Hopper"]);
/// ```
#[derive(Clone)]
pub struct Graph {
    inner: Rc<GraphInner>,
}

impl Graph {
    pub fn new() -> Self {
        Self {
            inner: GraphInner::new(),
        }
    }

    /// Type-erased handle for [`ObserverOptions::graph`](crate::ObserverOptions)
    pub fn handle(&self) -> GraphHandle {
        self.inner.clone()
    }

    #[cfg(test)]
    pub(crate) fn inner(&self) -> &Rc<GraphInner> {
        &self.inner
    }

    /// Whether two handles point at the same graph
    pub fn ptr_eq(&self, other: &Graph) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    // =========================================================================
    // OBSERVABLES
    // =========================================================================

    pub fn observable<T: PartialEq + 'static>(&self, value: T) -> ObservableBox<T> {
        ObservableBox::new_in(self.inner.clone(), value, default_equals)
    }

    pub fn observable_with_equals<T: 'static>(
        &self,
        value: T,
        equals: EqualsFn<T>,
    ) -> ObservableBox<T> {
        ObservableBox::new_in(self.inner.clone(), value, equals)
    }

    pub fn computed<T: 'static>(&self, f: impl FnMut() -> T + 'static) -> Computed<T> {
        Computed::new_in(self.inner.clone(), f)
    }

    // =========================================================================
    // REACTIONS
    // =========================================================================

    /// Create a listener. `on_invalidate` runs once after a dependency
    /// recorded by the last `track` changes.
    pub fn listener(&self, on_invalidate: impl FnMut() + 'static) -> GraphListener {
        GraphListener::new(Rc::downgrade(&self.inner), on_invalidate)
    }

    /// Run `f` now and again after every change to what it read.
    ///
    /// The returned function disposes the autorun. Dropping it without
    /// calling it disposes the autorun too.
    pub fn autorun<F>(&self, f: F) -> DisposeFn
    where
        F: FnMut() + 'static,
    {
        let body = Rc::new(RefCell::new(f));

        let rerun = body.clone();
        let listener = GraphListener::with_self(Rc::downgrade(&self.inner), move |me| {
            Box::new(move || {
                if let Some(me) = me.upgrade() {
                    me.track(&mut || {
                        let mut body = rerun.borrow_mut();
                        (*body)()
                    });
                }
            }) as InvalidateFn
        });

        // Writes made by the first run are delivered after it finishes
        self.transaction(|| {
            listener.inner().track(&mut || {
                let mut body = body.borrow_mut();
                (*body)()
            })
        });

        Box::new(move || listener.dispose())
    }

    // =========================================================================
    // TRANSACTIONS
    // =========================================================================

    /// Group writes: listeners are notified once, when the outermost
    /// transaction ends, and only then do transaction-done callbacks fire.
    pub fn transaction<T>(&self, f: impl FnOnce() -> T) -> T {
        self.inner.batch(f)
    }

    pub fn in_transaction(&self) -> bool {
        self.inner.in_transaction()
    }

    /// Run `f` without recording any reads
    pub fn untracked<T>(&self, f: impl FnOnce() -> T) -> T {
        self.inner.untracked(f)
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graph")
            .field("batch_depth", &self.inner.batch_depth.get())
            .field("done_subscriptions", &self.inner.done_subscription_count())
            .finish()
    }
}

// =============================================================================
// DEFAULT GRAPH
// =============================================================================

thread_local! {
    static DEFAULT_GRAPH: Graph = Graph::new();
}

/// The thread-wide default graph, used when no graph is supplied.
pub fn default_graph() -> Graph {
    DEFAULT_GRAPH.with(Graph::clone)
}

/// Create a box on the default graph
pub fn observable<T: PartialEq + 'static>(value: T) -> ObservableBox<T> {
    default_graph().observable(value)
}

/// Create a computed value on the default graph
pub fn computed<T: 'static>(f: impl FnMut() -> T + 'static) -> Computed<T> {
    default_graph().computed(f)
}

/// Create an autorun on the default graph
pub fn autorun(f: impl FnMut() + 'static) -> DisposeFn {
    default_graph().autorun(f)
}

/// Run a transaction on the default graph
pub fn transaction<T>(f: impl FnOnce() -> T) -> T {
    default_graph().transaction(f)
}

/// Read without tracking on the default graph
pub fn untracked<T>(f: impl FnOnce() -> T) -> T {
    default_graph().untracked(f)
}

// =============================================================================
// TESTS
// =============================================================================
