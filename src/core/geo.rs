use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Web Mercator projection constants
pub(crate) const EARTH_RADIUS: f64 = 6378137.0;
const MAX_LATITUDE: f64 = 85.0511287798;

/// Represents a geographical coordinate with latitude and longitude
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    /// Creates a new LatLng coordinate
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Validates that the coordinates are within valid ranges
    pub fn is_valid(&self) -> bool {
        self.lat >= -90.0 && self.lat <= 90.0 && self.lng >= -180.0 && self.lng <= 180.0
    }

    /// Both components are finite numbers (no NaN, no infinities)
    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }

    /// Clamps latitude to the range Web Mercator can represent
    pub fn clamp_lat(lat: f64) -> f64 {
        lat.clamp(-MAX_LATITUDE, MAX_LATITUDE)
    }

    /// Converts to Web Mercator projection (EPSG:3857)
    pub fn to_mercator(&self) -> Point {
        let x = self.lng.to_radians() * EARTH_RADIUS;
        let y = ((PI / 4.0 + Self::clamp_lat(self.lat).to_radians() / 2.0).tan().ln()) * EARTH_RADIUS;
        Point::new(x, y)
    }

    /// Creates LatLng from Web Mercator coordinates
    pub fn from_mercator(point: Point) -> Self {
        let lng = (point.x / EARTH_RADIUS).to_degrees();
        let lat = (2.0 * (point.y / EARTH_RADIUS).exp().atan() - PI / 2.0).to_degrees();
        Self::new(lat, lng)
    }
}

impl Default for LatLng {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

/// Represents a point in screen or projected coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl Default for Point {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

/// Represents a bounding box of geographical coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatLngBounds {
    pub south_west: LatLng,
    pub north_east: LatLng,
}

impl LatLngBounds {
    pub fn new(south_west: LatLng, north_east: LatLng) -> Self {
        Self {
            south_west,
            north_east,
        }
    }

    /// Creates bounds from individual coordinates
    pub fn from_coords(south: f64, west: f64, north: f64, east: f64) -> Self {
        Self::new(LatLng::new(south, west), LatLng::new(north, east))
    }

    /// Smallest bounds containing every point, or `None` for an empty input
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a LatLng>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        let mut bounds = Self::new(first, first);
        for point in iter {
            bounds.extend(point);
        }
        Some(bounds)
    }

    /// Checks if the bounds contain a point
    pub fn contains(&self, point: &LatLng) -> bool {
        point.lat >= self.south_west.lat
            && point.lat <= self.north_east.lat
            && point.lng >= self.south_west.lng
            && point.lng <= self.north_east.lng
    }

    /// Extends the bounds to include a point
    pub fn extend(&mut self, point: &LatLng) {
        self.south_west.lat = self.south_west.lat.min(point.lat);
        self.south_west.lng = self.south_west.lng.min(point.lng);
        self.north_east.lat = self.north_east.lat.max(point.lat);
        self.north_east.lng = self.north_east.lng.max(point.lng);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lat_lng_creation() {
        let coord = LatLng::new(37.5665, 126.9780);
        assert_eq!(coord.lat, 37.5665);
        assert_eq!(coord.lng, 126.9780);
        assert!(coord.is_valid());
        assert!(coord.is_finite());
    }

    #[test]
    fn test_non_finite_coordinates() {
        assert!(!LatLng::new(f64::NAN, 126.9).is_finite());
        assert!(!LatLng::new(37.5, f64::INFINITY).is_finite());
    }

    #[test]
    fn test_mercator_round_trip() {
        let coord = LatLng::new(37.5665, 126.9780);
        let back = LatLng::from_mercator(coord.to_mercator());
        assert!((back.lat - coord.lat).abs() < 1e-9);
        assert!((back.lng - coord.lng).abs() < 1e-9);
    }

    #[test]
    fn test_bounds_from_points() {
        let points = [
            LatLng::new(37.50, 127.00),
            LatLng::new(37.60, 126.90),
            LatLng::new(37.55, 127.05),
        ];
        let bounds = LatLngBounds::from_points(points.iter()).unwrap();

        assert_eq!(bounds.south_west, LatLng::new(37.50, 126.90));
        assert_eq!(bounds.north_east, LatLng::new(37.60, 127.05));
        assert!(points.iter().all(|p| bounds.contains(p)));
        assert!(LatLngBounds::from_points(std::iter::empty()).is_none());
    }

    #[test]
    fn test_bounds_contains() {
        let bounds = LatLngBounds::from_coords(37.0, 126.0, 38.0, 127.0);
        assert!(bounds.contains(&LatLng::new(37.5, 126.5)));
        assert!(!bounds.contains(&LatLng::new(38.5, 126.5)));
    }
}
