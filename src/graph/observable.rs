// ============================================================================
// spark-observer - Observable Box
// The writable reactive cell of the reference graph
// ============================================================================

use std::cell::RefCell;
use std::rc::Rc;

use super::GraphInner;
use super::tracking::SourceNode;

/// Equality function type for comparing box values
pub type EqualsFn<T> = fn(&T, &T) -> bool;

/// Default equality using PartialEq
pub fn default_equals<T: PartialEq>(a: &T, b: &T) -> bool {
    a == b
}

struct BoxInner<T> {
    node: Rc<SourceNode>,
    value: RefCell<T>,
    equals: EqualsFn<T>,
    graph: Rc<GraphInner>,
}

// =============================================================================
// OBSERVABLE BOX
// =============================================================================

/// A reactive cell. Reads inside a listener, autorun or computed value are
/// recorded as dependencies; writes that change the value notify them.
///
/// # Example
///
/// ```
/// use spark_observer::observable;
///
/// let count = observable(0);
/// assert_eq!(count.get(), 0);
///
/// assert!(count.set(5));
/// assert!(!count.set(5)); // equal value, no notification
/// assert_eq!(count.get(), 5);
/// ```
pub struct ObservableBox<T> {
    inner: Rc<BoxInner<T>>,
}

impl<T> Clone for ObservableBox<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: 'static> ObservableBox<T> {
    pub(crate) fn new_in(graph: Rc<GraphInner>, value: T, equals: EqualsFn<T>) -> Self {
        Self {
            inner: Rc::new(BoxInner {
                node: SourceNode::new(),
                value: RefCell::new(value),
                equals,
                graph,
            }),
        }
    }

    /// Get the current value (cloning), recording the read.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.inner.graph.report_read(&self.inner.node);
        self.inner.value.borrow().clone()
    }

    /// Access the current value with a closure (avoids cloning).
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.inner.graph.report_read(&self.inner.node);
        f(&self.inner.value.borrow())
    }

    /// Read without recording a dependency.
    pub fn peek(&self) -> T
    where
        T: Clone,
    {
        self.inner.value.borrow().clone()
    }

    /// Set the value.
    ///
    /// Returns true if the value changed. Equal writes notify nobody.
    pub fn set(&self, value: T) -> bool {
        let changed = {
            let current = self.inner.value.borrow();
            !(self.inner.equals)(&current, &value)
        };

        if changed {
            // The old value drops after the borrow is released
            let old = self.inner.value.replace(value);
            drop(old);
            self.inner.graph.report_write(&self.inner.node);
        }
        changed
    }

    /// Mutate the value in place. Always notifies.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        {
            let mut current = self.inner.value.borrow_mut();
            f(&mut current);
        }
        self.inner.graph.report_write(&self.inner.node);
    }

    /// Number of live listeners and computed values depending on this box
    pub fn observer_count(&self) -> usize {
        self.inner.node.observer_count()
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for ObservableBox<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObservableBox")
            .field("value", &self.inner.value.borrow())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
