// ============================================================================
// spark-observer - Host Interface
// What the observer needs from the rendering framework
// ============================================================================

pub mod harness;

use std::any::Any;
use std::rc::Rc;

use crate::core::context::with_context;
use crate::core::error::{ObserverError, Result};
use crate::core::types::{BatchedUpdatesFn, MountEffect, UpdateFn};

pub use harness::{ComponentId, HarnessError, TestRenderer};

// =============================================================================
// HOST HOOKS
// =============================================================================

/// Hook primitives of the host renderer, as seen from one render of one
/// component instance.
///
/// Hooks are positional: a component must call them in the same order on
/// every render.
pub trait HostHooks {
    /// Next ref slot of this instance. `init` runs only on the first render.
    fn use_ref_slot(&self, init: Box<dyn FnOnce() -> Rc<dyn Any> + '_>) -> Rc<dyn Any>;

    /// Stable callback that re-renders this instance
    fn use_force_update(&self) -> UpdateFn;

    /// Run `effect` once after this instance is first committed; the cleanup
    /// it returns runs on unmount.
    fn use_mount_effect(&self, effect: MountEffect);

    /// Whether this host can keep per-instance hook state at all
    fn supports_hooks(&self) -> bool {
        true
    }
}

/// Typed ref slot: the same `Rc<T>` on every render of the instance.
///
/// # Panics
///
/// If the slot at this position holds another type, meaning the component
/// called its hooks in a different order than on the first render.
pub fn use_ref<T: 'static>(cx: &dyn HostHooks, init: impl FnOnce() -> T) -> Rc<T> {
    let slot = cx.use_ref_slot(Box::new(move || Rc::new(init()) as Rc<dyn Any>));
    match slot.downcast::<T>() {
        Ok(value) => value,
        Err(_) => panic!(
            "hook order changed between renders: expected a {} slot",
            std::any::type_name::<T>()
        ),
    }
}

/// Check that `cx` can host observed components.
pub fn assert_environment(cx: &dyn HostHooks) -> Result<()> {
    if cx.supports_hooks() {
        Ok(())
    } else {
        tracing::warn!("host renderer has no hooks support");
        Err(ObserverError::HooksUnavailable)
    }
}

// =============================================================================
// BATCHED UPDATES
// =============================================================================

/// Install the host's batched-update primitive for this thread, returning
/// the previous one. `None` restores the default, which runs updates
/// directly.
pub fn set_batched_updates(batcher: Option<BatchedUpdatesFn>) -> Option<BatchedUpdatesFn> {
    with_context(|ctx| ctx.set_batched_updates(batcher))
}

/// Run `f` inside the installed batched-update primitive.
pub fn run_batched(f: impl FnOnce()) {
    let mut f = Some(f);
    let mut run = || {
        if let Some(f) = f.take() {
            f();
        }
    };

    match with_context(|ctx| ctx.batched_updates()) {
        Some(batcher) => batcher(&mut run),
        None => run(),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    #[derive(Default)]
    struct Slots {
        slots: RefCell<Vec<Rc<dyn Any>>>,
        cursor: Cell<usize>,
        hooks: bool,
    }

    impl HostHooks for Slots {
        fn use_ref_slot(&self, init: Box<dyn FnOnce() -> Rc<dyn Any> + '_>) -> Rc<dyn Any> {
            let index = self.cursor.replace(self.cursor.get() + 1);
            let existing = self.slots.borrow().get(index).cloned();
            existing.unwrap_or_else(|| {
                let value = init();
                self.slots.borrow_mut().push(value.clone());
                value
            })
        }

        fn use_force_update(&self) -> UpdateFn {
            Rc::new(|| {})
        }

        fn use_mount_effect(&self, _effect: MountEffect) {}

        fn supports_hooks(&self) -> bool {
            self.hooks
        }
    }

    #[test]
    fn use_ref_is_stable() {
        let cx = Slots::default();

        let first = use_ref(&cx, || 5u32);
        cx.cursor.set(0);
        let second = use_ref(&cx, || 6u32);

        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(*second, 5);
    }

    #[test]
    #[should_panic(expected = "hook order changed between renders")]
    fn use_ref_detects_reordering() {
        let cx = Slots::default();
        use_ref(&cx, || 5u32);
        cx.cursor.set(0);
        use_ref(&cx, String::new);
    }

    #[test]
    fn environment_check() {
        let with_hooks = Slots {
            hooks: true,
            ..Default::default()
        };
        assert!(assert_environment(&with_hooks).is_ok());

        let without = Slots::default();
        assert_eq!(assert_environment(&without), Err(ObserverError::HooksUnavailable));
    }

    #[test]
    fn run_batched_without_primitive_runs_directly() {
        let ran = Cell::new(false);
        run_batched(|| ran.set(true));
        assert!(ran.get());
    }

    #[test]
    fn run_batched_uses_installed_primitive() {
        let calls = Rc::new(Cell::new(0));
        let calls_clone = calls.clone();
        set_batched_updates(Some(Rc::new(move |f: &mut dyn FnMut()| {
            calls_clone.set(calls_clone.get() + 1);
            f();
        })));

        let ran = Cell::new(0);
        run_batched(|| ran.set(ran.get() + 1));

        assert_eq!(ran.get(), 1);
        assert_eq!(calls.get(), 1);
        assert!(set_batched_updates(None).is_some());
    }
}
