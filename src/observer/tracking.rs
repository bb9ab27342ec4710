// ============================================================================
// spark-observer - Tracking Record
// Per-component-instance reaction bookkeeping
// ============================================================================
//
// Lifecycle of one record:
//
//   Pending --commit-----> Mounted
//   Pending --invalidate-> Disposed
//   Pending|Mounted --dispose--> Disposed   (unmount, leak guard)
//
// Disposed is terminal. A component instance owns one `TrackingRef` slot for
// its whole life; the record inside it is replaced whenever the previous one
// was disposed before commit.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use web_time::Instant;

use crate::core::types::{GraphHandle, Listener, UpdateFn};

// =============================================================================
// TRACKING STATE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingState {
    /// Created by a render that has not been committed yet
    Pending,
    /// The render that created it was committed
    Mounted,
    /// Reaction disposed, never used again
    Disposed,
}

// =============================================================================
// TRACKING RECORD
// =============================================================================

/// A reaction paired with its mount state and leak-cleanup deadline.
pub struct TrackingRecord {
    reaction: Box<dyn Listener>,
    state: Cell<TrackingState>,
    cleanup_deadline: Cell<Option<Instant>>,

    /// Update callback this reaction requests; kept so unmount can cancel
    /// exactly the callback that was scheduled
    update: UpdateFn,

    graph: GraphHandle,
}

impl TrackingRecord {
    pub(crate) fn new(
        reaction: Box<dyn Listener>,
        state: TrackingState,
        update: UpdateFn,
        graph: GraphHandle,
    ) -> Self {
        Self {
            reaction,
            state: Cell::new(state),
            cleanup_deadline: Cell::new(None),
            update,
            graph,
        }
    }

    pub fn reaction(&self) -> &dyn Listener {
        &*self.reaction
    }

    pub fn state(&self) -> TrackingState {
        self.state.get()
    }

    pub fn is_pending(&self) -> bool {
        self.state.get() == TrackingState::Pending
    }

    pub fn is_mounted(&self) -> bool {
        self.state.get() == TrackingState::Mounted
    }

    pub fn is_disposed(&self) -> bool {
        self.state.get() == TrackingState::Disposed
    }

    pub fn update(&self) -> &UpdateFn {
        &self.update
    }

    pub fn graph(&self) -> &GraphHandle {
        &self.graph
    }

    /// When the leak guard may dispose this record (None = never)
    pub fn cleanup_deadline(&self) -> Option<Instant> {
        self.cleanup_deadline.get()
    }

    pub(crate) fn set_cleanup_deadline(&self, deadline: Option<Instant>) {
        // Mounted records never need a leak check
        if deadline.is_some() && !self.is_pending() {
            return;
        }
        self.cleanup_deadline.set(deadline);
    }

    /// Pending -> Mounted. Returns false (and changes nothing) in any other state.
    pub fn commit(&self) -> bool {
        if !self.is_pending() {
            return false;
        }
        self.state.set(TrackingState::Mounted);
        self.cleanup_deadline.set(None);
        true
    }

    /// Dispose the reaction. Safe to call any number of times.
    pub fn dispose(&self) {
        if self.is_disposed() {
            return;
        }
        self.state.set(TrackingState::Disposed);
        self.cleanup_deadline.set(None);
        self.reaction.dispose();
    }
}

impl std::fmt::Debug for TrackingRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackingRecord")
            .field("state", &self.state.get())
            .field("cleanup_deadline", &self.cleanup_deadline.get())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// TRACKING REF - the per-instance slot
// =============================================================================

/// Holds the current record of one component instance, if any.
#[derive(Default)]
pub struct TrackingRef {
    current: RefCell<Option<Rc<TrackingRecord>>>,
}

impl TrackingRef {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<Rc<TrackingRecord>> {
        self.current.borrow().clone()
    }

    /// The current record, unless it has been disposed
    pub fn live(&self) -> Option<Rc<TrackingRecord>> {
        self.get().filter(|record| !record.is_disposed())
    }

    pub fn is_empty(&self) -> bool {
        self.current.borrow().is_none()
    }

    pub(crate) fn set(&self, record: Rc<TrackingRecord>) {
        let previous = self.current.replace(Some(record));
        if let Some(previous) = previous {
            previous.dispose();
        }
    }

    pub(crate) fn clear(&self) -> Option<Rc<TrackingRecord>> {
        self.current.take()
    }

    /// Clear the slot only if it still holds `record`
    pub(crate) fn clear_if_current(&self, record: &Rc<TrackingRecord>) -> bool {
        let is_current = self
            .current
            .borrow()
            .as_ref()
            .is_some_and(|current| Rc::ptr_eq(current, record));

        if is_current {
            self.clear();
        }
        is_current
    }

    /// Dispose and clear the current record
    pub(crate) fn dispose_current(&self) {
        if let Some(record) = self.clear() {
            record.dispose();
        }
    }
}

impl std::fmt::Debug for TrackingRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackingRef")
            .field("current", &self.current.borrow())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
