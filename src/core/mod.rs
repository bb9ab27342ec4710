// ============================================================================
// spark-observer - Core Module
// Interfaces, thread-local context, configuration and errors
// ============================================================================

pub mod config;
pub mod constants;
pub mod context;
pub mod error;
pub mod types;

// Re-export commonly used items
pub use config::{config, configure, reset_config, ObserverConfig};
pub use constants::*;
pub use context::{with_context, ObserverContext};
pub use error::{ObserverError, Result};
pub use types::{
    graph_key, update_key, BatchedUpdatesFn, CleanupFn, DisposeFn, GraphHandle, InvalidateFn,
    Listener, MountEffect, ReactiveGraph, UpdateFn,
};
