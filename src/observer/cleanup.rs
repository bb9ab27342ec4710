// ============================================================================
// spark-observer - Leak Guard
// Disposes reactions created by renders that never committed
// ============================================================================
//
// A host may render a component and then throw the render away: a higher
// priority update, an error boundary, strict-mode double rendering. The
// reaction created by that render would track its dependencies forever.
//
// Every reaction created before commit is registered here with a deadline.
// Commit cancels the entry. Every new reaction and every commit sweeps once
// `next_cleanup_deadline` has passed, so entries past their deadline that
// are still uncommitted get disposed as long as the host keeps rendering.
// A host that can go idle calls `sweep_leaked_reactions` from its loop (or
// from a timer armed at `next_cleanup_deadline`).
// ============================================================================

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use web_time::Instant;

use crate::core::config::config;

use super::tracking::TrackingRef;

thread_local! {
    /// Refs whose reaction was created but not yet committed
    static UNCOMMITTED: RefCell<Vec<Rc<TrackingRef>>> = const { RefCell::new(Vec::new()) };

    static LAST_SWEEP: Cell<Option<Instant>> = const { Cell::new(None) };
}

// =============================================================================
// SCHEDULE / CANCEL
// =============================================================================

/// Arm the leak check for the record currently held by `tracking_ref`.
pub fn schedule_cleanup(tracking_ref: &Rc<TrackingRef>, delay: Duration) {
    sweep_if_due();

    let Some(record) = tracking_ref.live() else {
        return;
    };
    record.set_cleanup_deadline(Some(Instant::now() + delay));

    UNCOMMITTED.with(|set| {
        let mut set = set.borrow_mut();
        if !set.iter().any(|known| Rc::ptr_eq(known, tracking_ref)) {
            set.push(tracking_ref.clone());
        }
    });
}

/// Disarm the leak check. Cancelling twice is a no-op.
pub fn cancel_cleanup(tracking_ref: &Rc<TrackingRef>) {
    if let Some(record) = tracking_ref.get() {
        record.set_cleanup_deadline(None);
    }

    let removed = UNCOMMITTED.with(|set| {
        let mut set = set.borrow_mut();
        let index = set.iter().position(|known| Rc::ptr_eq(known, tracking_ref))?;
        Some(set.swap_remove(index))
    });
    drop(removed);
}

// =============================================================================
// SWEEP
// =============================================================================

/// Dispose every uncommitted reaction whose deadline has passed.
///
/// Returns the number of reactions disposed.
pub fn sweep_leaked_reactions() -> usize {
    sweep_leaked_reactions_at(Instant::now())
}

/// [`sweep_leaked_reactions`] with an explicit clock reading
pub fn sweep_leaked_reactions_at(now: Instant) -> usize {
    LAST_SWEEP.with(|last| last.set(Some(now)));
    sweep(|deadline| deadline <= now)
}

/// Sweep when [`next_cleanup_deadline`] has passed, otherwise do nothing.
pub(crate) fn sweep_if_due() -> usize {
    let now = Instant::now();
    match next_cleanup_deadline() {
        Some(due) if due <= now => sweep_leaked_reactions_at(now),
        _ => 0,
    }
}

/// Dispose every uncommitted reaction right away, ignoring deadlines.
///
/// Mostly useful in tests, where waiting out the cleanup delay is not an
/// option.
pub fn force_cleanup_now() -> usize {
    sweep(|_| true)
}

fn sweep(expired: impl Fn(Instant) -> bool) -> usize {
    // Snapshot, so disposing can't overlap with a borrow of the set
    let entries = UNCOMMITTED.with(|set| set.borrow().clone());

    let mut done = Vec::new();
    let mut disposed = 0;

    for tracking_ref in &entries {
        let Some(record) = tracking_ref.live() else {
            // Cleared by an abandoned-render invalidation or an unmount
            done.push(tracking_ref.clone());
            continue;
        };

        if !record.is_pending() {
            record.set_cleanup_deadline(None);
            done.push(tracking_ref.clone());
            continue;
        }

        let Some(deadline) = record.cleanup_deadline() else {
            done.push(tracking_ref.clone());
            continue;
        };

        if expired(deadline) {
            record.dispose();
            tracking_ref.clear_if_current(&record);
            done.push(tracking_ref.clone());
            disposed += 1;
        }
    }

    if !done.is_empty() {
        let removed = UNCOMMITTED.with(|set| {
            let mut set = set.borrow_mut();
            let (removed, kept): (Vec<_>, Vec<_>) = set
                .drain(..)
                .partition(|known| done.iter().any(|d| Rc::ptr_eq(d, known)));
            *set = kept;
            removed
        });
        drop(removed);
    }

    if disposed > 0 {
        tracing::debug!(disposed, remaining = uncommitted_count(), "disposed leaked reactions");
    }
    disposed
}

// =============================================================================
// HOST LOOP SUPPORT
// =============================================================================

/// When the host should sweep next, or None when nothing is waiting.
///
/// Never earlier than one sweep interval after the previous sweep.
pub fn next_cleanup_deadline() -> Option<Instant> {
    let earliest = UNCOMMITTED.with(|set| {
        set.borrow()
            .iter()
            .filter_map(|tracking_ref| tracking_ref.live())
            .filter(|record| record.is_pending())
            .filter_map(|record| record.cleanup_deadline())
            .min()
    })?;

    let throttle = LAST_SWEEP
        .with(Cell::get)
        .map(|last| last + config().sweep_interval());

    Some(match throttle {
        Some(throttle) if throttle > earliest => throttle,
        _ => earliest,
    })
}

/// Number of refs waiting for commit or cleanup
pub fn uncommitted_count() -> usize {
    UNCOMMITTED.with(|set| set.borrow().len())
}

/// Forget every scheduled check without disposing anything
pub fn reset_cleanup_schedule() {
    let entries = UNCOMMITTED.with(|set| set.take());
    LAST_SWEEP.with(|last| last.set(None));
    drop(entries);
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;
    use crate::observer::reaction::create_reaction;
    use crate::observer::tracking::TrackingState;

    fn pending_ref(graph: &Graph) -> Rc<TrackingRef> {
        let tracking_ref = Rc::new(TrackingRef::new());
        create_reaction(&tracking_ref, Rc::new(|| {}), graph.handle(), TrackingState::Pending);
        tracking_ref
    }

    #[test]
    fn pending_reaction_is_registered() {
        let graph = Graph::new();
        let tracking_ref = pending_ref(&graph);

        assert_eq!(uncommitted_count(), 1);
        let record = tracking_ref.live().unwrap();
        assert!(record.cleanup_deadline().is_some());
    }

    #[test]
    fn sweep_before_deadline_keeps_reaction() {
        let graph = Graph::new();
        let tracking_ref = pending_ref(&graph);

        assert_eq!(sweep_leaked_reactions(), 0);
        assert!(tracking_ref.live().is_some());
        assert_eq!(uncommitted_count(), 1);
    }

    #[test]
    fn sweep_after_deadline_disposes() {
        let graph = Graph::new();
        let tracking_ref = pending_ref(&graph);
        let record = tracking_ref.live().unwrap();

        let later = Instant::now() + config().cleanup_delay() + Duration::from_millis(1);
        assert_eq!(sweep_leaked_reactions_at(later), 1);

        assert!(record.is_disposed());
        assert!(tracking_ref.is_empty());
        assert_eq!(uncommitted_count(), 0);

        // Running it again changes nothing
        assert_eq!(sweep_leaked_reactions_at(later), 0);
    }

    #[test]
    fn cancelled_check_never_disposes() {
        let graph = Graph::new();
        let tracking_ref = pending_ref(&graph);
        let record = tracking_ref.live().unwrap();

        cancel_cleanup(&tracking_ref);
        cancel_cleanup(&tracking_ref);
        assert_eq!(uncommitted_count(), 0);

        assert_eq!(force_cleanup_now(), 0);
        assert!(!record.is_disposed());
    }

    #[test]
    fn committed_records_are_dropped_silently() {
        let graph = Graph::new();
        let tracking_ref = pending_ref(&graph);
        let record = tracking_ref.live().unwrap();

        record.commit();
        assert_eq!(force_cleanup_now(), 0);
        assert!(record.is_mounted());
        assert_eq!(uncommitted_count(), 0);
    }

    #[test]
    fn sweep_after_unmount_is_noop() {
        let graph = Graph::new();
        let tracking_ref = pending_ref(&graph);

        tracking_ref.dispose_current();
        assert_eq!(force_cleanup_now(), 0);
        assert_eq!(uncommitted_count(), 0);
    }

    #[test]
    fn next_deadline_respects_sweep_interval() {
        let graph = Graph::new();
        assert!(next_cleanup_deadline().is_none());

        let tracking_ref = pending_ref(&graph);
        let deadline = tracking_ref.live().unwrap().cleanup_deadline().unwrap();
        assert_eq!(next_cleanup_deadline(), Some(deadline));

        // A sweep right now pushes the next one out by the sweep interval
        let now = Instant::now();
        sweep_leaked_reactions_at(now);
        let next = next_cleanup_deadline().unwrap();
        assert!(next >= now + config().sweep_interval());
        assert!(next >= deadline);
    }

    #[test]
    fn new_reaction_sweeps_expired_entries() {
        use crate::core::config::{configure, reset_config, ObserverConfig};

        configure(
            ObserverConfig::new()
                .with_cleanup_delay(Duration::from_millis(1))
                .with_sweep_interval(Duration::from_millis(1)),
        )
        .unwrap();

        let graph = Graph::new();
        let abandoned = pending_ref(&graph);
        let record = abandoned.live().unwrap();

        std::thread::sleep(Duration::from_millis(10));
        let fresh = pending_ref(&graph);

        assert!(record.is_disposed());
        assert!(abandoned.is_empty());
        assert!(fresh.live().is_some());
        assert_eq!(uncommitted_count(), 1);

        reset_config();
    }

    #[test]
    fn sweep_if_due_honours_sweep_interval() {
        use crate::core::config::{configure, reset_config, ObserverConfig};

        configure(
            ObserverConfig::new()
                .with_cleanup_delay(Duration::from_millis(1))
                .with_sweep_interval(Duration::from_secs(60)),
        )
        .unwrap();

        let graph = Graph::new();
        sweep_leaked_reactions();
        let tracking_ref = pending_ref(&graph);

        std::thread::sleep(Duration::from_millis(10));
        assert_eq!(sweep_if_due(), 0, "last sweep was less than an interval ago");
        assert!(tracking_ref.live().is_some());

        reset_config();
    }

    #[test]
    fn reset_forgets_without_disposing() {
        let graph = Graph::new();
        let tracking_ref = pending_ref(&graph);

        reset_cleanup_schedule();
        assert_eq!(uncommitted_count(), 0);
        assert!(tracking_ref.live().is_some());
    }
}
