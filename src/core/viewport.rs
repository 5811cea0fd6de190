use crate::core::geo::{LatLng, LatLngBounds, Point, EARTH_RADIUS};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// What the map is currently showing: a center and a zoom level.
///
/// This is the unit that is persisted to the session store, reported to the
/// host through the viewport-change callback, and captured across fullscreen
/// transitions. Serialized as `{"lat":..,"lng":..,"level":..}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportState {
    pub lat: f64,
    pub lng: f64,
    pub level: i32,
}

impl ViewportState {
    pub fn new(lat: f64, lng: f64, level: i32) -> Self {
        Self { lat, lng, level }
    }

    pub fn from_center(center: LatLng, level: i32) -> Self {
        Self::new(center.lat, center.lng, level)
    }

    pub fn center(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }

    /// Finite and inside the valid coordinate range
    pub fn is_valid(&self) -> bool {
        let center = self.center();
        center.is_finite() && center.is_valid()
    }
}

/// Web Mercator viewport math used by the headless map surface.
///
/// Zoom follows the slippy-map convention: level 0 shows the whole world in
/// one 256px tile, every level doubles the scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// The center of the map view in geographical coordinates
    pub center: LatLng,
    /// The current zoom level
    pub zoom: f64,
    /// The size of the viewport in pixels
    pub size: Point,
    /// The minimum allowed zoom level
    pub min_zoom: f64,
    /// The maximum allowed zoom level
    pub max_zoom: f64,
}

impl Viewport {
    /// Creates a new viewport
    pub fn new(center: LatLng, zoom: f64, size: Point) -> Self {
        Self {
            center,
            zoom: zoom.clamp(0.0, 20.0),
            size,
            min_zoom: 0.0,
            max_zoom: 20.0,
        }
    }

    /// Sets the center of the viewport, clamped to the projectable world
    pub fn set_center(&mut self, center: LatLng) {
        self.center = LatLng::new(
            LatLng::clamp_lat(center.lat),
            center.lng.clamp(-180.0, 180.0),
        );
    }

    /// Sets the zoom level, clamping to valid range
    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = zoom.clamp(self.min_zoom, self.max_zoom);
    }

    /// Sets the zoom limits
    pub fn set_zoom_limits(&mut self, min_zoom: f64, max_zoom: f64) {
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom;
        self.zoom = self.zoom.clamp(min_zoom, max_zoom);
    }

    /// Projects a LatLng to world pixel coordinates at the given zoom level
    pub fn project(&self, lat_lng: &LatLng, zoom: Option<f64>) -> Point {
        let scale = 256.0 * 2_f64.powf(zoom.unwrap_or(self.zoom));
        let mercator = lat_lng.to_mercator();
        let world = 2.0 * PI * EARTH_RADIUS;

        Point::new(
            (mercator.x + PI * EARTH_RADIUS) / world * scale,
            (PI * EARTH_RADIUS - mercator.y) / world * scale,
        )
    }

    /// Unprojects world pixel coordinates back to LatLng at the given zoom level
    pub fn unproject(&self, pixel: &Point, zoom: Option<f64>) -> LatLng {
        let scale = 256.0 * 2_f64.powf(zoom.unwrap_or(self.zoom));
        let world = 2.0 * PI * EARTH_RADIUS;

        let x = pixel.x / scale * world - PI * EARTH_RADIUS;
        let y = PI * EARTH_RADIUS - pixel.y / scale * world;

        LatLng::from_mercator(Point::new(x, y))
    }

    /// Fits the viewport to contain the given bounds, keeping `padding`
    /// pixels free on every side. Picks the highest integer zoom that fits.
    pub fn fit_bounds(&mut self, bounds: &LatLngBounds, padding: f64) {
        let available = Point::new(
            (self.size.x - 2.0 * padding).max(1.0),
            (self.size.y - 2.0 * padding).max(1.0),
        );

        let mut best_zoom = self.min_zoom;
        for test_zoom in (self.min_zoom as i32)..=(self.max_zoom as i32) {
            let zoom = test_zoom as f64;

            let nw = self.project(
                &LatLng::new(bounds.north_east.lat, bounds.south_west.lng),
                Some(zoom),
            );
            let se = self.project(
                &LatLng::new(bounds.south_west.lat, bounds.north_east.lng),
                Some(zoom),
            );

            if (se.x - nw.x).abs() <= available.x && (se.y - nw.y).abs() <= available.y {
                best_zoom = zoom;
            } else {
                break;
            }
        }

        // Center on the projected midpoint so the box is visually centered
        let sw_px = self.project(&bounds.south_west, Some(best_zoom));
        let ne_px = self.project(&bounds.north_east, Some(best_zoom));
        let mid = Point::new((sw_px.x + ne_px.x) / 2.0, (sw_px.y + ne_px.y) / 2.0);

        self.set_zoom(best_zoom);
        self.set_center(self.unproject(&mid, Some(best_zoom)));
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(LatLng::new(0.0, 0.0), 0.0, Point::new(800.0, 600.0))
    }
}
