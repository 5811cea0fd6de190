//! Viewport continuity across display-mode transitions
//!
//! Entering or leaving fullscreen can resize the container or make the host
//! re-create the map. The coordinator snapshots the view before the switch
//! and hands it back exactly once when the platform reports completion.

use crate::core::viewport::ViewportState;

#[derive(Debug, Default)]
pub struct FullscreenCoordinator {
    snapshot: Option<ViewportState>,
    fullscreen: bool,
}

impl FullscreenCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the view shown just before a transition. A second call before
    /// completion replaces the snapshot.
    pub fn begin(&mut self, current: ViewportState) {
        log::debug!(
            "fullscreen transition from ({}, {}) level {}",
            current.lat,
            current.lng,
            current.level
        );
        self.snapshot = Some(current);
    }

    /// The platform finished switching. Returns the snapshot to reapply, at
    /// most once per [`FullscreenCoordinator::begin`].
    pub fn complete(&mut self, fullscreen: bool) -> Option<ViewportState> {
        self.fullscreen = fullscreen;
        self.snapshot.take()
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }
}
