//! Per-cycle viewport decision
//!
//! [`reconcile`] is a pure function: given everything the widget knows at
//! the end of a resolution cycle it picks exactly one [`ViewportAction`].
//! The first matching rule wins:
//!
//! 0. a freshly supplied explicit center
//! 1. no points and no user location: default level, current center
//! 2. no points but a user location: center on the user
//! 3. a pending restore-once view
//! 4. idle, fit-bounds requested, at least two points (or one point plus a
//!    shown user location): fit them all
//! 5. idle with at least one point: center on the first
//! 6. otherwise leave the map alone

use crate::{
    core::{
        geo::{LatLng, LatLngBounds},
        viewport::ViewportState,
    },
    interaction::InteractionState,
    traits::MapSurface,
};

/// Everything the decision depends on
#[derive(Debug, Clone)]
pub struct ReconcileInputs<'a> {
    /// Resolved marker points, in marker order
    pub points: &'a [LatLng],
    /// Caller center that changed since the previous cycle
    pub explicit_center: Option<LatLng>,
    pub explicit_level: Option<i32>,
    /// View to reapply once (persisted view or fullscreen snapshot)
    pub restore_view: Option<ViewportState>,
    pub fit_bounds: bool,
    pub interaction: InteractionState,
    pub user_location: Option<LatLng>,
    pub show_user_location: bool,
    pub default_level: i32,
    /// What the map shows right now
    pub current: ViewportState,
    /// Inset margin for bounds fitting, in pixels
    pub padding: f64,
}

/// The single viewport change of a cycle
#[derive(Debug, Clone, PartialEq)]
pub enum ViewportAction {
    /// Move to a center at a level
    Recenter { center: LatLng, level: i32 },
    /// Change only the level
    SetLevel(i32),
    /// Reapply a saved view verbatim and discard it
    Restore(ViewportState),
    /// Show all of `bounds` with `padding` pixels of inset
    FitBounds { bounds: LatLngBounds, padding: f64 },
    /// Leave the viewport untouched
    Keep,
}

impl ViewportAction {
    /// Whether applying this action consumes the restore-once view
    pub fn consumes_restore(&self) -> bool {
        matches!(self, ViewportAction::Restore(_))
    }

    pub fn apply(&self, map: &mut dyn MapSurface) {
        match self {
            ViewportAction::Recenter { center, level } => {
                map.set_level(*level);
                map.set_center(*center);
            }
            ViewportAction::SetLevel(level) => map.set_level(*level),
            ViewportAction::Restore(view) => map.set_view(*view),
            ViewportAction::FitBounds { bounds, padding } => map.set_bounds(bounds, *padding),
            ViewportAction::Keep => {}
        }
    }
}

/// Pick the viewport action for one cycle
pub fn reconcile(inputs: &ReconcileInputs<'_>) -> ViewportAction {
    if let Some(center) = inputs.explicit_center.filter(LatLng::is_finite) {
        return ViewportAction::Recenter {
            center,
            level: inputs.explicit_level.unwrap_or(inputs.default_level),
        };
    }

    if inputs.points.is_empty() {
        return match inputs.user_location {
            None => ViewportAction::SetLevel(inputs.default_level),
            Some(center) => ViewportAction::Recenter {
                center,
                level: inputs.default_level,
            },
        };
    }

    if let Some(view) = inputs.restore_view {
        return ViewportAction::Restore(view);
    }

    if inputs.interaction != InteractionState::Idle {
        return ViewportAction::Keep;
    }

    let shown_user = inputs.user_location.filter(|_| inputs.show_user_location);
    if inputs.fit_bounds && (inputs.points.len() >= 2 || shown_user.is_some()) {
        let bounds = LatLngBounds::from_points(inputs.points.iter().chain(shown_user.iter()));
        if let Some(bounds) = bounds {
            return ViewportAction::FitBounds {
                bounds,
                padding: inputs.padding,
            };
        }
    }

    ViewportAction::Recenter {
        center: inputs.points[0],
        level: inputs.default_level,
    }
}
