// ============================================================================
// spark-observer - Batching Scheduler
// Coalesces update requests until the graph's transaction is done
// ============================================================================
//
// One pending set per graph. The first request into an empty set subscribes
// to the graph's transaction-done signal; the flush runs every pending
// callback inside the host's batched-update primitive, so all components
// touched by one transaction re-render in one pass.
//
// Invariant: an entry holds a subscription iff its pending set is non-empty.
// Entries are removed as soon as they become empty.
// ============================================================================

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Weak;

use indexmap::IndexMap;

use crate::core::types::{graph_key, update_key, DisposeFn, GraphHandle, ReactiveGraph, UpdateFn};
use crate::host::run_batched;

struct PendingUpdates {
    /// Keeps the graph's allocation (and so its key) from being reused while
    /// the entry exists, without keeping the graph alive
    graph: Weak<dyn ReactiveGraph>,

    /// Update callbacks by identity, in request order
    pending: IndexMap<usize, UpdateFn>,

    unsubscribe: Option<DisposeFn>,
}

thread_local! {
    static REGISTRY: RefCell<HashMap<usize, PendingUpdates>> = RefCell::new(HashMap::new());
}

/// Drop entries whose graph is gone. Returns them so they are dropped
/// outside the registry borrow.
fn prune(registry: &mut HashMap<usize, PendingUpdates>) -> Vec<PendingUpdates> {
    let dead: Vec<usize> = registry
        .iter()
        .filter(|(_, entry)| entry.graph.strong_count() == 0)
        .map(|(key, _)| *key)
        .collect();

    dead.into_iter()
        .filter_map(|key| registry.remove(&key))
        .collect()
}

// =============================================================================
// REQUEST / CANCEL
// =============================================================================

/// Queue `update` to run once the current (or next) transaction on `graph`
/// is done. Requesting the same callback again before the flush is a no-op.
pub fn request_update(update: UpdateFn, graph: &GraphHandle) {
    let key = graph_key(graph);

    let (first, dead) = REGISTRY.with(|registry| {
        let mut registry = registry.borrow_mut();
        let dead = prune(&mut registry);

        let entry = registry.entry(key).or_insert_with(|| PendingUpdates {
            graph: std::rc::Rc::downgrade(graph),
            pending: IndexMap::new(),
            unsubscribe: None,
        });

        let first = entry.pending.is_empty();
        entry.pending.entry(update_key(&update)).or_insert(update);
        (first, dead)
    });
    drop(dead);

    if !first {
        return;
    }

    // Subscribing calls into the graph, so no registry borrow here
    let unsubscribe = graph.on_transaction_done(Box::new(move || flush(key)));

    let stale = REGISTRY.with(|registry| {
        let mut registry = registry.borrow_mut();
        match registry.get_mut(&key) {
            Some(entry) if !entry.pending.is_empty() => entry.unsubscribe.replace(unsubscribe),
            _ => Some(unsubscribe),
        }
    });
    if let Some(stale) = stale {
        stale();
    }
}

/// Withdraw a queued update. Unsubscribes when nothing is left pending.
/// Cancelling an update that is not queued is a no-op.
pub fn cancel_update(update: &UpdateFn, graph: &GraphHandle) {
    let key = graph_key(graph);

    let removed = REGISTRY.with(|registry| {
        let mut registry = registry.borrow_mut();
        let entry = registry.get_mut(&key)?;
        let callback = entry.pending.shift_remove(&update_key(update))?;

        let emptied = if entry.pending.is_empty() {
            registry.remove(&key)
        } else {
            None
        };
        Some((callback, emptied))
    });

    let Some((_callback, emptied)) = removed else {
        return;
    };

    if let Some(unsubscribe) = emptied.and_then(|entry| entry.unsubscribe) {
        tracing::trace!("last pending update cancelled, unsubscribing");
        unsubscribe();
    }
}

// =============================================================================
// FLUSH
// =============================================================================

fn flush(key: usize) {
    let Some(entry) = REGISTRY.with(|registry| registry.borrow_mut().remove(&key)) else {
        return;
    };

    // The subscription that brought us here has fired; releasing it is a no-op
    if let Some(unsubscribe) = entry.unsubscribe {
        unsubscribe();
    }

    let pending = entry.pending;
    if pending.is_empty() {
        return;
    }

    // Requests made by the callbacks themselves start a fresh entry and wait
    // for the next transaction
    tracing::debug!(count = pending.len(), "flushing batched updates");
    run_batched(move || {
        for update in pending.values() {
            update();
        }
    });
}

// =============================================================================
// INSPECTION
// =============================================================================

/// Number of updates waiting for `graph`'s transaction to finish
pub fn pending_update_count(graph: &GraphHandle) -> usize {
    REGISTRY.with(|registry| {
        registry
            .borrow()
            .get(&graph_key(graph))
            .map_or(0, |entry| entry.pending.len())
    })
}

pub fn is_update_pending(update: &UpdateFn, graph: &GraphHandle) -> bool {
    REGISTRY.with(|registry| {
        registry
            .borrow()
            .get(&graph_key(graph))
            .is_some_and(|entry| entry.pending.contains_key(&update_key(update)))
    })
}

/// Whether the scheduler currently listens for `graph`'s transaction-done signal
pub fn has_transaction_subscription(graph: &GraphHandle) -> bool {
    REGISTRY.with(|registry| {
        registry
            .borrow()
            .get(&graph_key(graph))
            .is_some_and(|entry| entry.unsubscribe.is_some())
    })
}

// =============================================================================
// TESTS
// =============================================================================
