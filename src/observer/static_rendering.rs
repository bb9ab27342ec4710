// ============================================================================
// spark-observer - Static Rendering
// ============================================================================

use crate::core::context::with_context;

/// Turn static rendering on or off for this thread.
///
/// While it is on, [`observe_render`](crate::observe_render) just calls the
/// render function: no reaction, no tracking, no scheduling. Meant for
/// one-shot renders such as server-side rendering.
pub fn use_static_rendering(enabled: bool) {
    let previous = with_context(|ctx| ctx.set_static_rendering(enabled));
    if previous != enabled {
        tracing::debug!(enabled, "static rendering toggled");
    }
}

pub fn is_using_static_rendering() -> bool {
    with_context(|ctx| ctx.is_static_rendering())
}
