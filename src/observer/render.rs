// ============================================================================
// spark-observer - Render Wrapper
// Runs a component's render inside its reaction and wires mount/unmount
// ============================================================================

use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use crate::core::types::{CleanupFn, GraphHandle, UpdateFn};
use crate::graph::default_graph;
use crate::host::{use_ref, HostHooks};

use super::cleanup::{cancel_cleanup, sweep_if_due};
use super::reaction::create_reaction;
use super::scheduler::cancel_update;
use super::static_rendering::is_using_static_rendering;
use super::tracking::{TrackingRecord, TrackingRef, TrackingState};

/// Hook that produces the update callback for the current component.
///
/// Receives the host so it can call other hooks (usually
/// [`HostHooks::use_force_update`]).
pub type ForceUpdateHook = Rc<dyn Fn(&dyn HostHooks) -> UpdateFn>;

// =============================================================================
// OPTIONS
// =============================================================================

/// Per-call options for [`observe_render`].
#[derive(Clone, Default)]
pub struct ObserverOptions {
    /// Replaces the host's force-update hook
    pub use_force_update: Option<ForceUpdateHook>,

    /// Graph to subscribe to (default: the thread's default graph)
    pub graph: Option<GraphHandle>,
}

impl ObserverOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_force_update(mut self, hook: impl Fn(&dyn HostHooks) -> UpdateFn + 'static) -> Self {
        self.use_force_update = Some(Rc::new(hook));
        self
    }

    #[must_use]
    pub fn with_graph(mut self, graph: GraphHandle) -> Self {
        self.graph = Some(graph);
        self
    }
}

impl std::fmt::Debug for ObserverOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverOptions")
            .field("use_force_update", &self.use_force_update.is_some())
            .field("graph", &self.graph.is_some())
            .finish()
    }
}

// =============================================================================
// OBSERVE RENDER
// =============================================================================

/// Run `render` as the render body of the current component, re-rendering
/// the component whenever an observable it read changes.
///
/// A panic inside `render` is resumed unchanged once tracking has stopped;
/// reads made before the panic still count as dependencies.
///
/// # Example
///
/// ```
/// use spark_observer::{observable, observe_render, ObserverOptions, TestRenderer};
///
/// let count = observable(0);
/// let renderer = TestRenderer::new();
///
/// let shown = count.clone();
/// let id = renderer.render(move |cx| {
///     observe_render(cx, || format!("<b>{}</b>", shown.get()), &ObserverOptions::new())
/// });
///
/// count.set(7);
/// assert_eq!(renderer.output(id).unwrap(), "<b>7</b>");
/// ```
pub fn observe_render<T>(
    cx: &dyn HostHooks,
    render: impl FnOnce() -> T,
    options: &ObserverOptions,
) -> T {
    if is_using_static_rendering() {
        return render();
    }

    let update = match &options.use_force_update {
        Some(hook) => hook(cx),
        None => cx.use_force_update(),
    };
    let graph = options
        .graph
        .clone()
        .unwrap_or_else(|| default_graph().handle());

    let tracking_ref: Rc<TrackingRef> = use_ref(cx, TrackingRef::new);
    let record = match tracking_ref.live() {
        Some(record) => record,
        None => create_reaction(&tracking_ref, update.clone(), graph.clone(), TrackingState::Pending),
    };

    let mount_ref = tracking_ref.clone();
    cx.use_mount_effect(Box::new(move || {
        on_commit(&mount_ref, update, graph);
        Some(Box::new(move || on_unmount(&mount_ref)) as CleanupFn)
    }));

    track_render(&record, render)
}

fn track_render<T>(record: &TrackingRecord, render: impl FnOnce() -> T) -> T {
    let mut render = Some(render);
    let mut outcome = None;

    record.reaction().track(&mut || {
        if let Some(render) = render.take() {
            outcome = Some(panic::catch_unwind(AssertUnwindSafe(render)));
        }
    });

    match outcome {
        Some(Ok(value)) => value,
        Some(Err(payload)) => panic::resume_unwind(payload),
        None => unreachable!("listener skipped the tracked render"),
    }
}

// =============================================================================
// MOUNT / UNMOUNT
// =============================================================================

fn on_commit(tracking_ref: &Rc<TrackingRef>, update: UpdateFn, graph: GraphHandle) {
    cancel_cleanup(tracking_ref);
    sweep_if_due();

    match tracking_ref.live() {
        Some(record) => {
            record.commit();
            tracing::trace!("reaction committed");
        }
        None => {
            // The render's reaction is gone: a dependency changed before
            // commit, or the leak guard gave up on a very slow commit.
            // Start over, already mounted, and re-render so no change is
            // lost.
            tracing::debug!("reaction lost before commit, recreating");
            create_reaction(tracking_ref, update.clone(), graph, TrackingState::Mounted);
            update();
        }
    }
}

fn on_unmount(tracking_ref: &Rc<TrackingRef>) {
    if let Some(record) = tracking_ref.get() {
        cancel_update(record.update(), record.graph());
    }
    tracking_ref.dispose_current();
    cancel_cleanup(tracking_ref);
}

// =============================================================================
// TESTS
// =============================================================================
