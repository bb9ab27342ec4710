// ============================================================================
// spark-observer - Test Renderer
// A deterministic in-process host for tests and demos
// ============================================================================
//
// Components are plain functions from hooks to a rendered string. The
// renderer keeps one hook state per instance and exposes every lifecycle
// step separately, so tests can render without committing, abandon a
// render, or double-render the way strict hosts do.
//
// Force updates re-render right away, except inside a batched pass, where
// each dirty instance re-renders once when the outermost pass ends.
// ============================================================================

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::{IndexMap, IndexSet};
use thiserror::Error;

use crate::core::types::{BatchedUpdatesFn, CleanupFn, MountEffect, UpdateFn};

use super::{set_batched_updates, HostHooks};

// =============================================================================
// ERRORS / IDS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(u64);

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HarnessError {
    #[error("no component instance {0}")]
    UnknownComponent(ComponentId),

    #[error("component {0} is not mounted")]
    NotMounted(ComponentId),

    #[error("component {0} is already committed")]
    AlreadyCommitted(ComponentId),
}

pub type Result<T> = std::result::Result<T, HarnessError>;

type Component = Rc<dyn Fn(&dyn HostHooks) -> String>;

// =============================================================================
// HOOK STATE
// =============================================================================

struct HookState {
    slots: RefCell<Vec<Rc<dyn Any>>>,
    cursor: Cell<usize>,
    mount_effect: RefCell<Option<MountEffect>>,
    cleanup: RefCell<Option<CleanupFn>>,
    committed: Cell<bool>,
    force_update: UpdateFn,
}

impl HookState {
    fn new(force_update: UpdateFn) -> Rc<Self> {
        Rc::new(Self {
            slots: RefCell::new(Vec::new()),
            cursor: Cell::new(0),
            mount_effect: RefCell::new(None),
            cleanup: RefCell::new(None),
            committed: Cell::new(false),
            force_update,
        })
    }
}

impl HostHooks for HookState {
    fn use_ref_slot(&self, init: Box<dyn FnOnce() -> Rc<dyn Any> + '_>) -> Rc<dyn Any> {
        let index = self.cursor.replace(self.cursor.get() + 1);

        let existing = self.slots.borrow().get(index).cloned();
        if let Some(slot) = existing {
            return slot;
        }

        let value = init();
        self.slots.borrow_mut().push(value.clone());
        value
    }

    fn use_force_update(&self) -> UpdateFn {
        self.force_update.clone()
    }

    fn use_mount_effect(&self, effect: MountEffect) {
        if self.committed.get() {
            return;
        }
        // The effect of the render that gets committed wins
        let previous = self.mount_effect.replace(Some(effect));
        drop(previous);
    }
}

// =============================================================================
// INSTANCES
// =============================================================================

struct Instance {
    component: Component,
    hooks: RefCell<Rc<HookState>>,
    force_update: UpdateFn,
    output: RefCell<String>,
    render_count: Cell<usize>,
}

impl Instance {
    fn is_mounted(&self) -> bool {
        self.hooks.borrow().committed.get()
    }

    fn render(&self) {
        let hooks = self.hooks.borrow().clone();
        hooks.cursor.set(0);

        let output = (self.component)(&*hooks);

        self.render_count.set(self.render_count.get() + 1);
        let previous = self.output.replace(output);
        drop(previous);
    }

    /// Throw the hook state away and start over, as if never rendered
    fn reset_hooks(&self) {
        let fresh = HookState::new(self.force_update.clone());
        let discarded = self.hooks.replace(fresh);
        drop(discarded);
    }
}

struct RendererInner {
    instances: RefCell<IndexMap<ComponentId, Rc<Instance>>>,
    next_id: Cell<u64>,
    batch_depth: Cell<u32>,
    batch_count: Cell<usize>,
    dirty: RefCell<IndexSet<ComponentId>>,
}

impl RendererInner {
    fn instance(&self, id: ComponentId) -> Result<Rc<Instance>> {
        self.instances
            .borrow()
            .get(&id)
            .cloned()
            .ok_or(HarnessError::UnknownComponent(id))
    }

    fn force_update(&self, id: ComponentId) {
        let Ok(instance) = self.instance(id) else {
            return;
        };
        if !instance.is_mounted() {
            tracing::trace!(%id, "force update on unmounted instance ignored");
            return;
        }

        if self.batch_depth.get() > 0 {
            self.dirty.borrow_mut().insert(id);
        } else {
            instance.render();
        }
    }

    fn batched(&self, f: &mut dyn FnMut()) {
        let depth = self.batch_depth.get();
        if depth == 0 {
            self.batch_count.set(self.batch_count.get() + 1);
        }
        self.batch_depth.set(depth + 1);

        struct DepthGuard<'a> {
            renderer: &'a RendererInner,
        }

        impl Drop for DepthGuard<'_> {
            fn drop(&mut self) {
                let depth = self.renderer.batch_depth.get();
                self.renderer.batch_depth.set(depth - 1);
            }
        }

        {
            let _guard = DepthGuard { renderer: self };
            f();
        }

        if self.batch_depth.get() == 0 {
            self.flush_dirty();
        }
    }

    fn flush_dirty(&self) {
        loop {
            let next = self.dirty.borrow_mut().shift_remove_index(0);
            let Some(id) = next else {
                break;
            };
            if let Ok(instance) = self.instance(id) {
                instance.render();
            }
        }
    }
}

// =============================================================================
// TEST RENDERER
// =============================================================================

/// Deterministic hook host.
///
/// Creating one installs it as this thread's batched-update primitive;
/// dropping it unmounts whatever is still mounted and restores the previous
/// primitive.
///
/// # Example
///
/// ```
/// use spark_observer::TestRenderer;
///
/// let renderer = TestRenderer::new();
/// let id = renderer.render(|_cx| "<p>hi</p>".to_string());
///
/// assert!(renderer.is_mounted(id));
/// assert_eq!(renderer.output(id).unwrap(), "<p>hi</p>");
/// ```
pub struct TestRenderer {
    inner: Rc<RendererInner>,
    previous_batcher: Option<BatchedUpdatesFn>,
}

impl TestRenderer {
    pub fn new() -> Self {
        let inner = Rc::new(RendererInner {
            instances: RefCell::new(IndexMap::new()),
            next_id: Cell::new(1),
            batch_depth: Cell::new(0),
            batch_count: Cell::new(0),
            dirty: RefCell::new(IndexSet::new()),
        });

        let weak = Rc::downgrade(&inner);
        let batcher: BatchedUpdatesFn = Rc::new(move |f: &mut dyn FnMut()| match weak.upgrade() {
            Some(renderer) => renderer.batched(f),
            None => f(),
        });
        let previous_batcher = set_batched_updates(Some(batcher));

        Self {
            inner,
            previous_batcher,
        }
    }

    fn create(&self, component: Component) -> (ComponentId, Rc<Instance>) {
        let id = ComponentId(self.inner.next_id.get());
        self.inner.next_id.set(id.0 + 1);

        let renderer: Weak<RendererInner> = Rc::downgrade(&self.inner);
        let force_update: UpdateFn = Rc::new(move || {
            if let Some(renderer) = renderer.upgrade() {
                renderer.force_update(id);
            }
        });

        let instance = Rc::new(Instance {
            component,
            hooks: RefCell::new(HookState::new(force_update.clone())),
            force_update,
            output: RefCell::new(String::new()),
            render_count: Cell::new(0),
        });
        self.inner.instances.borrow_mut().insert(id, instance.clone());
        tracing::trace!(%id, "component instance created");
        (id, instance)
    }

    fn mount(&self, id: ComponentId, instance: &Instance) {
        let hooks = instance.hooks.borrow().clone();
        if hooks.committed.replace(true) {
            return;
        }

        // The effect may force an update, which re-renders this instance
        let effect = hooks.mount_effect.borrow_mut().take();
        if let Some(effect) = effect {
            let cleanup = effect();
            *hooks.cleanup.borrow_mut() = cleanup;
        }
        tracing::trace!(%id, "component committed");
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    /// Render and commit a new instance.
    pub fn render(&self, component: impl Fn(&dyn HostHooks) -> String + 'static) -> ComponentId {
        let (id, instance) = self.create(Rc::new(component));
        instance.render();
        self.mount(id, &instance);
        id
    }

    /// Render a new instance without committing it.
    pub fn render_uncommitted(
        &self,
        component: impl Fn(&dyn HostHooks) -> String + 'static,
    ) -> ComponentId {
        let (id, instance) = self.create(Rc::new(component));
        instance.render();
        id
    }

    /// Render twice the way strict hosts do on mount: the first render's hook
    /// state is thrown away, the second render is committed.
    pub fn render_strict(&self, component: impl Fn(&dyn HostHooks) -> String + 'static) -> ComponentId {
        let (id, instance) = self.create(Rc::new(component));

        instance.render();
        instance.reset_hooks();
        instance.render();

        self.mount(id, &instance);
        id
    }

    /// Commit an uncommitted instance, running its mount effect.
    /// Committing twice is a no-op.
    pub fn commit(&self, id: ComponentId) -> Result<()> {
        let instance = self.inner.instance(id)?;
        self.mount(id, &instance);
        Ok(())
    }

    /// Drop an uncommitted instance without running any effect.
    pub fn abandon(&self, id: ComponentId) -> Result<()> {
        let instance = self.inner.instance(id)?;
        if instance.is_mounted() {
            return Err(HarnessError::AlreadyCommitted(id));
        }
        let removed = self.inner.instances.borrow_mut().shift_remove(&id);
        drop(removed);
        Ok(())
    }

    /// Re-render a mounted instance
    pub fn rerender(&self, id: ComponentId) -> Result<()> {
        let instance = self.inner.instance(id)?;
        if !instance.is_mounted() {
            return Err(HarnessError::NotMounted(id));
        }
        instance.render();
        Ok(())
    }

    /// Run the unmount cleanup and forget the instance.
    pub fn unmount(&self, id: ComponentId) -> Result<()> {
        let instance = self.inner.instance(id)?;
        if !instance.is_mounted() {
            return Err(HarnessError::NotMounted(id));
        }

        let removed = self.inner.instances.borrow_mut().shift_remove(&id);
        self.inner.dirty.borrow_mut().shift_remove(&id);

        let hooks = instance.hooks.borrow().clone();
        hooks.committed.set(false);
        let cleanup = hooks.cleanup.borrow_mut().take();
        if let Some(cleanup) = cleanup {
            cleanup();
        }

        drop(removed);
        tracing::trace!(%id, "component unmounted");
        Ok(())
    }

    /// Run `f` as one batched pass
    pub fn batch(&self, mut f: impl FnMut()) {
        self.inner.batched(&mut f);
    }

    // =========================================================================
    // INSPECTION
    // =========================================================================

    pub fn output(&self, id: ComponentId) -> Result<String> {
        Ok(self.inner.instance(id)?.output.borrow().clone())
    }

    pub fn render_count(&self, id: ComponentId) -> Result<usize> {
        Ok(self.inner.instance(id)?.render_count.get())
    }

    pub fn is_mounted(&self, id: ComponentId) -> bool {
        self.inner.instance(id).is_ok_and(|instance| instance.is_mounted())
    }

    /// Number of outermost batched passes run so far
    pub fn batch_count(&self) -> usize {
        self.inner.batch_count.get()
    }

    pub fn component_count(&self) -> usize {
        self.inner.instances.borrow().len()
    }
}

impl Default for TestRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TestRenderer {
    fn drop(&mut self) {
        let mounted: Vec<ComponentId> = self
            .inner
            .instances
            .borrow()
            .iter()
            .filter(|(_, instance)| instance.is_mounted())
            .map(|(id, _)| *id)
            .collect();
        for id in mounted {
            let _ = self.unmount(id);
        }
        set_batched_updates(self.previous_batcher.take());
    }
}

// =============================================================================
// TESTS
// =============================================================================
