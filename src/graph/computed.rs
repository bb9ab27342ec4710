// ============================================================================
// spark-observer - Computed Values
// Lazily memoized values derived from other observables
// ============================================================================
//
// A computed value is both a derivation (it records what it reads) and a
// source (listeners record it). A change upstream marks it dirty and
// cascades to its observers right away; the recomputation waits for the
// next read.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::core::constants::DIRTY;

use super::GraphInner;
use super::tracking::{Dependencies, Derivation, SourceNode};

struct ComputedInner<T> {
    node: Rc<SourceNode>,
    flags: Cell<u32>,
    value: RefCell<Option<T>>,
    func: RefCell<Box<dyn FnMut() -> T>>,
    deps: Dependencies,
    graph: Rc<GraphInner>,
    self_weak: Weak<ComputedInner<T>>,
}

impl<T: 'static> ComputedInner<T> {
    fn is_dirty(&self) -> bool {
        self.flags.get() & DIRTY != 0
    }

    fn refresh(&self) {
        if !self.is_dirty() {
            return;
        }

        self.deps.release(self as *const Self as *const ());
        self.flags.set(self.flags.get() & !DIRTY);

        let value = {
            let me: Weak<dyn Derivation> = self.self_weak.clone();
            let _scope = self.graph.enter_tracking(me);
            let mut func = self.func.borrow_mut();
            (*func)()
        };

        let old = self.value.replace(Some(value));
        drop(old);
    }
}

impl<T: 'static> Derivation for ComputedInner<T> {
    fn record_dependency(&self, source: &Rc<SourceNode>) -> bool {
        self.deps.record(source)
    }

    fn mark_stale(&self, _graph: &GraphInner) -> Option<Rc<SourceNode>> {
        if self.is_dirty() {
            return None;
        }
        self.flags.set(self.flags.get() | DIRTY);
        Some(self.node.clone())
    }
}

// =============================================================================
// COMPUTED
// =============================================================================

/// A memoized value computed from other observables.
///
/// # Example
///
/// ```
/// use spark_observer::{computed, observable};
///
/// let width = observable(3);
/// let area = computed({
///     let width = width.clone();
///     move || width.get() * width.get()
/// });
///
/// assert_eq!(area.get(), 9);
/// width.set(4);
/// assert_eq!(area.get(), 16);
/// ```
pub struct Computed<T> {
    inner: Rc<ComputedInner<T>>,
}

impl<T> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: 'static> Computed<T> {
    pub(crate) fn new_in(graph: Rc<GraphInner>, func: impl FnMut() -> T + 'static) -> Self {
        let inner = Rc::new_cyclic(|self_weak: &Weak<ComputedInner<T>>| ComputedInner {
            node: SourceNode::new(),
            flags: Cell::new(DIRTY),
            value: RefCell::new(None),
            func: RefCell::new(Box::new(func)),
            deps: Dependencies::default(),
            graph,
            self_weak: self_weak.clone(),
        });
        Self { inner }
    }

    /// Get the value (cloning), recomputing first if a dependency changed.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.with(T::clone)
    }

    /// Access the value with a closure, recomputing first if needed.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.inner.graph.report_read(&self.inner.node);
        self.inner.refresh();

        let value = self.inner.value.borrow();
        match value.as_ref() {
            Some(value) => f(value),
            None => unreachable!("computed value missing after refresh"),
        }
    }

    /// Whether the next read will recompute
    pub fn is_dirty(&self) -> bool {
        self.inner.is_dirty()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::graph::Graph;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    #[test]
    fn lazy_and_memoized() {
        let graph = Graph::new();
        let a = graph.observable(2);
        let runs = Rc::new(Cell::new(0));

        let a_clone = a.clone();
        let runs_clone = runs.clone();
        let doubled = graph.computed(move || {
            runs_clone.set(runs_clone.get() + 1);
            a_clone.get() * 2
        });

        assert_eq!(runs.get(), 0);
        assert_eq!(doubled.get(), 4);
        assert_eq!(doubled.get(), 4);
        assert_eq!(runs.get(), 1);

        a.set(5);
        assert!(doubled.is_dirty());
        assert_eq!(doubled.get(), 10);
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn change_cascades_to_listeners() {
        let graph = Graph::new();
        let a = graph.observable(1);

        let a_clone = a.clone();
        let plus_one = graph.computed(move || a_clone.get() + 1);

        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = seen.clone();
        let plus_one_clone = plus_one.clone();
        let _dispose = graph.autorun(move || seen_clone.borrow_mut().push(plus_one_clone.get()));

        a.set(10);
        assert_eq!(*seen.borrow(), vec![2, 11]);
    }

    #[test]
    fn chained_computed_values() {
        let graph = Graph::new();
        let a = graph.observable(1);

        let a_clone = a.clone();
        let b = graph.computed(move || a_clone.get() * 10);
        let b_clone = b.clone();
        let c = graph.computed(move || b_clone.get() + 1);

        assert_eq!(c.get(), 11);
        a.set(2);
        assert_eq!(c.get(), 21);
    }

    #[test]
    fn transaction_recomputes_once() {
        let graph = Graph::new();
        let a = graph.observable(1);
        let b = graph.observable(1);
        let runs = Rc::new(Cell::new(0));

        let (a_clone, b_clone, runs_clone) = (a.clone(), b.clone(), runs.clone());
        let sum = graph.computed(move || {
            runs_clone.set(runs_clone.get() + 1);
            a_clone.get() + b_clone.get()
        });

        let sum_clone = sum.clone();
        let _dispose = graph.autorun(move || {
            sum_clone.get();
        });
        assert_eq!(runs.get(), 1);

        graph.transaction(|| {
            a.set(2);
            b.set(3);
        });

        assert_eq!(runs.get(), 2);
        assert_eq!(sum.get(), 5);
    }
}
