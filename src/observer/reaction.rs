// ============================================================================
// spark-observer - Reaction Factory
// ============================================================================
//
// The invalidation callback decides what a dependency change means, based
// on the record's state at that moment:
//
// - Mounted:  the component is on screen, request a batched update
// - Pending:  the render has not been committed (and may never be); dispose
//             and clear the slot so the next render starts from scratch
// - Disposed: nothing to do
// ============================================================================

use std::rc::{Rc, Weak};

use crate::core::config::config;
use crate::core::types::{GraphHandle, UpdateFn};

use super::cleanup::{cancel_cleanup, schedule_cleanup};
use super::scheduler::{cancel_update, request_update};
use super::tracking::{TrackingRecord, TrackingRef, TrackingState};

/// Create a reaction for one component instance and store it in `tracking_ref`.
///
/// A reaction created in the `Pending` state is registered with the leak
/// guard using the configured cleanup delay.
pub fn create_reaction(
    tracking_ref: &Rc<TrackingRef>,
    update: UpdateFn,
    graph: GraphHandle,
    initial_state: TrackingState,
) -> Rc<TrackingRecord> {
    let slot = Rc::downgrade(tracking_ref);

    let record = Rc::new_cyclic(|me: &Weak<TrackingRecord>| {
        let me = me.clone();
        let reaction = graph.create_listener(Box::new(move || on_invalidate(&me, &slot)));
        TrackingRecord::new(reaction, initial_state, update, graph.clone())
    });

    tracking_ref.set(record.clone());
    tracing::trace!(state = ?initial_state, "reaction created");

    if initial_state == TrackingState::Pending {
        schedule_cleanup(tracking_ref, config().cleanup_delay());
    }
    record
}

fn on_invalidate(record: &Weak<TrackingRecord>, slot: &Weak<TrackingRef>) {
    let Some(record) = record.upgrade() else {
        return;
    };

    match record.state() {
        TrackingState::Mounted => {
            tracing::trace!("dependency changed, requesting update");
            request_update(record.update().clone(), record.graph());
        }
        TrackingState::Pending => {
            tracing::debug!("dependency changed before commit, disposing reaction");
            record.dispose();
            if let Some(slot) = slot.upgrade() {
                if slot.clear_if_current(&record) {
                    cancel_cleanup(&slot);
                }
            }
            cancel_update(record.update(), record.graph());
        }
        TrackingState::Disposed => {}
    }
}

// =============================================================================
// TESTS
// =============================================================================
