// ============================================================================
// spark-observer - Reactive components for hook-based renderers
// ============================================================================
//
// Binds a dependency-tracking reactive graph to a host renderer's
// render / commit / unmount lifecycle: one live reaction per mounted
// component, disposal of reactions from renders that never commit, and one
// batched re-render pass per transaction.
//
// Layout:
// - core:     interfaces, thread-local context, config, errors
// - graph:    the reference reactive graph (boxes, computed, transactions)
// - observer: tracking records, leak guard, scheduler, render wrapper
// - host:     hook interface, batched-update primitive, test renderer
// ============================================================================

pub mod core;
pub mod graph;
pub mod host;
pub mod observer;

// Re-export core items at crate root
pub use crate::core::config::{config, configure, reset_config, ObserverConfig};
pub use crate::core::constants;
pub use crate::core::context::{with_context, ObserverContext};
pub use crate::core::error::{ObserverError, Result};
pub use crate::core::types::{
    BatchedUpdatesFn, CleanupFn, DisposeFn, GraphHandle, InvalidateFn, Listener, MountEffect,
    ReactiveGraph, UpdateFn,
};

// Reference graph
pub use graph::{
    autorun, computed, default_graph, observable, transaction, untracked, Computed, Graph,
    GraphListener, ObservableBox,
};

// Observer
pub use observer::{
    cancel_cleanup, cancel_update, create_reaction, force_cleanup_now,
    has_transaction_subscription, is_update_pending, is_using_static_rendering,
    next_cleanup_deadline, observe_render, pending_update_count, request_update,
    reset_cleanup_schedule, schedule_cleanup, sweep_leaked_reactions, sweep_leaked_reactions_at,
    uncommitted_count, use_static_rendering, ForceUpdateHook, ObserverOptions, TrackingRecord,
    TrackingRef, TrackingState,
};

// Host
pub use host::{
    assert_environment, run_batched, set_batched_updates, use_ref, ComponentId, HarnessError,
    HostHooks, TestRenderer,
};

// =============================================================================
// TESTS
// =============================================================================
