//! Seams to the external mapping SDK
//!
//! The engine never renders anything itself. It drives a live map through
//! [`MapSurface`], (re)creates maps through [`MapFactory`], and loads the SDK
//! through [`SdkHost`]. Browser adapters live in `web`, headless reference
//! implementations in `headless`.

use crate::{
    core::{
        geo::{LatLng, LatLngBounds},
        viewport::ViewportState,
    },
    layers::manager::{OverlayId, OverlaySpec},
    loader::{sdk::SdkStatus, LoadError},
    Result,
};
use async_trait::async_trait;

/// A live map instance owned by the mapping SDK.
///
/// Viewport calls are fire-and-forget: they may animate, but the surface must
/// report the target view from [`MapSurface::viewport`] as soon as they return.
pub trait MapSurface: Send {
    /// What the map is currently showing
    fn viewport(&self) -> ViewportState;

    /// Jump to a center without changing the level
    fn set_center(&mut self, center: LatLng);

    /// Change the level around the current center
    fn set_level(&mut self, level: i32);

    /// Show `bounds` with `padding` pixels of inset on every side
    fn set_bounds(&mut self, bounds: &LatLngBounds, padding: f64);

    /// Smoothly pan to a center
    fn pan_to(&mut self, center: LatLng);

    /// Plot an overlay under the given id
    fn add_overlay(&mut self, id: OverlayId, spec: &OverlaySpec);

    /// Remove an overlay; unknown ids are ignored
    fn remove_overlay(&mut self, id: OverlayId);

    /// Recompute the container size after a layout change
    fn relayout(&mut self) {}

    /// Apply a full viewport verbatim
    fn set_view(&mut self, view: ViewportState) {
        self.set_level(view.level);
        self.set_center(view.center());
    }
}

/// Builds map instances inside the host container.
pub trait MapFactory: Send + Sync {
    /// Construct a map showing `initial`
    fn create(&self, initial: ViewportState) -> Result<Box<dyn MapSurface>>;
}

/// The platform side of SDK loading: script tags, init entry point and the
/// global library handle.
#[async_trait]
pub trait SdkHost: Send + Sync {
    /// How far the SDK has loaded in this process
    fn status(&self) -> SdkStatus;

    /// Insert the script tag and resolve on its load event
    async fn inject_script(&self, url: &str) -> std::result::Result<(), LoadError>;

    /// Invoke the SDK's deferred initialization entry point
    async fn initialize(&self) -> std::result::Result<(), LoadError>;

    /// Whether an asynchronously attached sub-module is available
    fn has_module(&self, name: &str) -> bool;
}
