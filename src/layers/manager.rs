use crate::{
    core::{
        constants::{
            FOCUS_MARKER_PIN_SIZE, FOCUS_MARKER_Z_INDEX, MARKER_PIN_SIZE, MARKER_Z_INDEX,
            USER_LOCATION_Z_INDEX,
        },
        geo::LatLng,
    },
    layers::marker::{MapMarker, ResolvedMarker},
    traits::MapSurface,
};
use serde::{Deserialize, Serialize};

/// Identifier of one plotted overlay, unique for the manager's lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OverlayId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayKind {
    Marker,
    UserLocation,
}

/// Everything a map surface needs to draw one overlay
#[derive(Debug, Clone, PartialEq)]
pub struct OverlaySpec {
    pub kind: OverlayKind,
    /// Originating marker id (marker overlays only)
    pub marker_id: Option<String>,
    pub position: LatLng,
    pub label: Option<String>,
    /// Focus marker: larger pin, inverted label colors
    pub emphasized: bool,
    pub pin_size: (u32, u32),
    pub z_index: i32,
    pub clickable: bool,
}

impl OverlaySpec {
    fn for_marker(resolved: &ResolvedMarker, focused: bool) -> Self {
        Self {
            kind: OverlayKind::Marker,
            marker_id: Some(resolved.marker.id.clone()),
            position: resolved.point,
            label: resolved.marker.label(),
            emphasized: focused,
            pin_size: if focused { FOCUS_MARKER_PIN_SIZE } else { MARKER_PIN_SIZE },
            z_index: if focused { FOCUS_MARKER_Z_INDEX } else { MARKER_Z_INDEX },
            clickable: true,
        }
    }

    fn for_user_location(position: LatLng) -> Self {
        Self {
            kind: OverlayKind::UserLocation,
            marker_id: None,
            position,
            label: None,
            emphasized: false,
            pin_size: MARKER_PIN_SIZE,
            z_index: USER_LOCATION_Z_INDEX,
            clickable: false,
        }
    }
}

struct PlacedOverlay {
    id: OverlayId,
    spec: OverlaySpec,
    marker: Option<MapMarker>,
}

/// Owns the overlays currently plotted on a map.
///
/// Overlays are never patched: every cycle tears all of them down and
/// builds a fresh set from the resolved points.
#[derive(Default)]
pub struct OverlayManager {
    next_id: u64,
    overlays: Vec<PlacedOverlay>,
}

impl OverlayManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove every overlay this manager created. Safe to call when empty.
    pub fn clear(&mut self, map: &mut dyn MapSurface) {
        for overlay in self.overlays.drain(..) {
            map.remove_overlay(overlay.id);
        }
    }

    /// Forget overlays without touching a map; used when the map they lived
    /// on has already been destroyed.
    pub fn forget(&mut self) {
        self.overlays.clear();
    }

    /// Replace all overlays with one per resolved marker, plus the user
    /// location when given. Returns the number of overlays plotted.
    pub fn rebuild(
        &mut self,
        map: &mut dyn MapSurface,
        resolved: &[ResolvedMarker],
        focus_id: Option<&str>,
        user_location: Option<LatLng>,
    ) -> usize {
        self.clear(map);

        for item in resolved {
            let focused = focus_id == Some(item.marker.id.as_str());
            let spec = OverlaySpec::for_marker(item, focused);
            self.place(map, spec, Some(item.marker.clone()));
        }

        if let Some(position) = user_location {
            self.place(map, OverlaySpec::for_user_location(position), None);
        }

        log::debug!("plotted {} overlays", self.overlays.len());
        self.overlays.len()
    }

    fn place(&mut self, map: &mut dyn MapSurface, spec: OverlaySpec, marker: Option<MapMarker>) {
        let id = OverlayId(self.next_id);
        self.next_id += 1;
        map.add_overlay(id, &spec);
        self.overlays.push(PlacedOverlay { id, spec, marker });
    }

    /// The marker behind a clickable overlay
    pub fn marker_for(&self, id: OverlayId) -> Option<&MapMarker> {
        self.overlays
            .iter()
            .find(|o| o.id == id && o.spec.clickable)
            .and_then(|o| o.marker.as_ref())
    }

    pub fn spec(&self, id: OverlayId) -> Option<&OverlaySpec> {
        self.overlays.iter().find(|o| o.id == id).map(|o| &o.spec)
    }

    /// Ids and specs in creation order
    pub fn overlays(&self) -> impl Iterator<Item = (OverlayId, &OverlaySpec)> {
        self.overlays.iter().map(|o| (o.id, &o.spec))
    }

    pub fn len(&self) -> usize {
        self.overlays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overlays.is_empty()
    }
}
