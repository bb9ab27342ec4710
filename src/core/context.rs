// ============================================================================
// spark-observer - Observer Context
// Thread-local state shared by every observed component on this thread
// ============================================================================

use std::cell::{Cell, RefCell};

use super::config::ObserverConfig;
use super::types::BatchedUpdatesFn;

// =============================================================================
// OBSERVER CONTEXT
// =============================================================================

/// Thread-local context holding the process-wide observer switches.
///
/// Per-graph registries and the leak guard keep their own thread-locals next
/// to the code that owns them; this struct only holds the plain settings.
pub struct ObserverContext {
    /// Static rendering bypasses all tracking and scheduling
    static_rendering: Cell<bool>,

    /// Current configuration
    config: Cell<ObserverConfig>,

    /// Host batched-update primitive (None = run the closure directly)
    batched_updates: RefCell<Option<BatchedUpdatesFn>>,
}

impl ObserverContext {
    pub fn new() -> Self {
        Self {
            static_rendering: Cell::new(false),
            config: Cell::new(ObserverConfig::default()),
            batched_updates: RefCell::new(None),
        }
    }

    // =========================================================================
    // STATIC RENDERING
    // =========================================================================

    /// Set the static rendering flag, returning the previous value
    pub fn set_static_rendering(&self, enabled: bool) -> bool {
        self.static_rendering.replace(enabled)
    }

    pub fn is_static_rendering(&self) -> bool {
        self.static_rendering.get()
    }

    // =========================================================================
    // CONFIG
    // =========================================================================

    pub fn config(&self) -> ObserverConfig {
        self.config.get()
    }

    pub fn set_config(&self, config: ObserverConfig) {
        self.config.set(config);
    }

    // =========================================================================
    // BATCHED UPDATES
    // =========================================================================

    /// Install the host batched-update primitive, returning the previous one
    pub fn set_batched_updates(&self, batcher: Option<BatchedUpdatesFn>) -> Option<BatchedUpdatesFn> {
        self.batched_updates.replace(batcher)
    }

    /// Clone out the installed primitive so no borrow is held while it runs
    pub fn batched_updates(&self) -> Option<BatchedUpdatesFn> {
        self.batched_updates.borrow().clone()
    }
}

impl Default for ObserverContext {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// THREAD-LOCAL ACCESS
// =============================================================================

thread_local! {
    static CONTEXT: ObserverContext = ObserverContext::new();
}

/// Access the thread-local observer context.
pub fn with_context<R>(f: impl FnOnce(&ObserverContext) -> R) -> R {
    CONTEXT.with(f)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn context_creation() {
        with_context(|ctx| {
            assert!(!ctx.is_static_rendering());
            assert_eq!(ctx.config(), ObserverConfig::default());
            assert!(ctx.batched_updates().is_none());
        });
    }

    #[test]
    fn static_rendering_flag() {
        with_context(|ctx| {
            let prev = ctx.set_static_rendering(true);
            assert!(!prev);
            assert!(ctx.is_static_rendering());

            let prev = ctx.set_static_rendering(false);
            assert!(prev);
            assert!(!ctx.is_static_rendering());
        });
    }

    #[test]
    fn batched_updates_swap() {
        let batcher: BatchedUpdatesFn = Rc::new(|f: &mut dyn FnMut()| f());

        with_context(|ctx| {
            assert!(ctx.set_batched_updates(Some(batcher.clone())).is_none());
            assert!(ctx.batched_updates().is_some());

            let prev = ctx.set_batched_updates(None);
            assert!(prev.is_some_and(|prev| Rc::ptr_eq(&prev, &batcher)));
            assert!(ctx.batched_updates().is_none());
        });
    }
}
