// ============================================================================
// spark-observer - Observer Module
// Binding reactions to the host's render / commit / unmount lifecycle
// ============================================================================

pub mod cleanup;
pub mod reaction;
pub mod render;
pub mod scheduler;
pub mod static_rendering;
pub mod tracking;

pub use cleanup::{
    cancel_cleanup, force_cleanup_now, next_cleanup_deadline, reset_cleanup_schedule,
    schedule_cleanup, sweep_leaked_reactions, sweep_leaked_reactions_at, uncommitted_count,
};
pub use reaction::create_reaction;
pub use render::{observe_render, ForceUpdateHook, ObserverOptions};
pub use scheduler::{
    cancel_update, has_transaction_subscription, is_update_pending, pending_update_count,
    request_update,
};
pub use static_rendering::{is_using_static_rendering, use_static_rendering};
pub use tracking::{TrackingRecord, TrackingRef, TrackingState};
