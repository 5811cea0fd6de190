//! Wire types for lookup responses
//!
//! Upstream lookup services report coordinates as strings (`"126.97"`), some
//! hosts hand them over as numbers. Both are accepted everywhere a coordinate
//! is read.

use serde::{Deserialize, Deserializer, Serialize};

#[derive(Deserialize)]
#[serde(untagged)]
enum RawCoordinate {
    Number(f64),
    Text(String),
}

impl RawCoordinate {
    fn parse(self) -> Option<f64> {
        match self {
            RawCoordinate::Number(value) => Some(value),
            RawCoordinate::Text(text) => text.trim().parse::<f64>().ok(),
        }
        .filter(|v| v.is_finite())
    }
}

/// Parse a coordinate from a string or a number. Unparseable or non-finite
/// values become `None` instead of failing the whole document.
pub fn parse_coordinate(text: &str) -> Option<f64> {
    RawCoordinate::Text(text.to_string()).parse()
}

/// `deserialize_with` helper for optional coordinates that may be strings,
/// numbers or `null`
pub fn deserialize_opt_coordinate<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawCoordinate>::deserialize(deserializer)?;
    Ok(raw.and_then(RawCoordinate::parse))
}

/// Outcome reported by a lookup backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LookupStatus {
    Ok,
    ZeroResult,
    Error,
}

/// One lookup hit. `x` is longitude, `y` is latitude.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LookupHit {
    #[serde(default, deserialize_with = "deserialize_opt_coordinate")]
    pub x: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_opt_coordinate")]
    pub y: Option<f64>,
    /// Matched place or address name, when the backend reports one
    #[serde(default)]
    pub name: Option<String>,
}

impl LookupHit {
    pub fn new(lng: f64, lat: f64) -> Self {
        Self {
            x: Some(lng),
            y: Some(lat),
            name: None,
        }
    }
}

/// Ordered hit list plus status, as returned by either lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupResponse {
    pub status: LookupStatus,
    #[serde(default)]
    pub hits: Vec<LookupHit>,
}

impl LookupResponse {
    pub fn ok(hits: Vec<LookupHit>) -> Self {
        let status = if hits.is_empty() {
            LookupStatus::ZeroResult
        } else {
            LookupStatus::Ok
        };
        Self { status, hits }
    }

    pub fn zero_result() -> Self {
        Self {
            status: LookupStatus::ZeroResult,
            hits: Vec::new(),
        }
    }

    pub fn error() -> Self {
        Self {
            status: LookupStatus::Error,
            hits: Vec::new(),
        }
    }

    /// The point of the first hit of an OK response, if it parses
    pub fn first_point(&self) -> Option<crate::core::geo::LatLng> {
        if self.status != LookupStatus::Ok {
            return None;
        }
        let hit = self.hits.first()?;
        let point = crate::core::geo::LatLng::new(hit.y?, hit.x?);
        point.is_valid().then_some(point)
    }
}
