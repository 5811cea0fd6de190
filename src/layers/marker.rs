use crate::{core::geo::LatLng, geocode::response::deserialize_opt_coordinate};
use serde::{Deserialize, Serialize};

/// A restaurant pin as supplied by the host on every render.
///
/// Most markers only carry free text; coordinates are optional and may
/// arrive as strings from upstream APIs. Markers are never mutated:
/// resolution produces a separate [`ResolvedMarker`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MapMarker {
    /// Unique within one marker set
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_opt_coordinate")]
    pub latitude: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_opt_coordinate")]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub address: Option<String>,
    /// Broad locality hint (city / province)
    #[serde(default)]
    pub region: Option<String>,
    /// Narrow locality hint (district / neighbourhood)
    #[serde(default)]
    pub district: Option<String>,
    #[serde(default)]
    pub rank: Option<u32>,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl MapMarker {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn with_coordinates(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }

    pub fn with_locality(mut self, region: impl Into<String>, district: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self.district = Some(district.into());
        self
    }

    pub fn with_rank(mut self, rank: u32) -> Self {
        self.rank = Some(rank);
        self
    }

    /// The marker's own coordinates, if both are present and finite
    pub fn explicit_point(&self) -> Option<LatLng> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => Some(LatLng::new(lat, lng)).filter(LatLng::is_finite),
            _ => None,
        }
    }

    /// Trimmed address, if any
    pub fn address_query(&self) -> Option<&str> {
        non_blank(&self.address)
    }

    /// Trimmed name, if any
    pub fn name_query(&self) -> Option<&str> {
        non_blank(&self.name)
    }

    /// Locality hints followed by the name, blank parts skipped, single-space joined
    pub fn combined_keyword(&self) -> Option<String> {
        let parts: Vec<&str> = [
            non_blank(&self.region),
            non_blank(&self.district),
            non_blank(&self.name),
        ]
        .into_iter()
        .flatten()
        .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }

    /// Carries free text some lookup could work with
    pub fn is_geocodable(&self) -> bool {
        self.address_query().is_some() || self.combined_keyword().is_some()
    }

    /// Best text for an external map search: address, else locality + name
    pub fn search_text(&self) -> Option<String> {
        self.address_query()
            .map(str::to_string)
            .or_else(|| self.combined_keyword())
    }

    /// Overlay label: `"{rank}. {name}"` when ranked, else the name
    pub fn label(&self) -> Option<String> {
        let name = self.name_query()?;
        Some(match self.rank {
            Some(rank) => format!("{rank}. {name}"),
            None => name.to_string(),
        })
    }
}

/// A marker paired with the point the resolver found for it
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedMarker {
    pub marker: MapMarker,
    pub point: LatLng,
}

impl ResolvedMarker {
    pub fn new(marker: MapMarker, point: LatLng) -> Self {
        Self { marker, point }
    }
}

/// Ordered list of marker ids; changes whenever the set meaningfully changes
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MarkerSignature(Vec<String>);

impl MarkerSignature {
    pub fn from_markers(markers: &[MapMarker]) -> Self {
        Self(markers.iter().map(|m| m.id.clone()).collect())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_point_requires_finite_pair() {
        let marker = MapMarker::new("a").with_coordinates(37.5, 127.0);
        assert_eq!(marker.explicit_point(), Some(LatLng::new(37.5, 127.0)));

        let half = MapMarker {
            latitude: Some(37.5),
            ..MapMarker::new("b")
        };
        assert!(half.explicit_point().is_none());

        let nan = MapMarker::new("c").with_coordinates(f64::NAN, 127.0);
        assert!(nan.explicit_point().is_none());
    }

    #[test]
    fn test_combined_keyword_skips_blank_parts() {
        let marker = MapMarker::new("a")
            .with_name("Mapo Galbi")
            .with_locality("Seoul", "  ");
        assert_eq!(marker.combined_keyword().as_deref(), Some("Seoul Mapo Galbi"));

        let full = MapMarker::new("b")
            .with_name("Jinju Jip")
            .with_locality("Seoul", "Yeouido");
        assert_eq!(full.combined_keyword().as_deref(), Some("Seoul Yeouido Jinju Jip"));

        assert!(MapMarker::new("c").combined_keyword().is_none());
    }

    #[test]
    fn test_geocodable_and_search_text() {
        let bare = MapMarker::new("a");
        assert!(!bare.is_geocodable());
        assert!(bare.search_text().is_none());

        let with_address = MapMarker::new("b")
            .with_name("Tosokchon")
            .with_address("5 Jahamun-ro 5-gil");
        assert!(with_address.is_geocodable());
        assert_eq!(with_address.search_text().as_deref(), Some("5 Jahamun-ro 5-gil"));

        let named = MapMarker::new("c").with_name("Tosokchon").with_locality("Seoul", "Jongno");
        assert_eq!(named.search_text().as_deref(), Some("Seoul Jongno Tosokchon"));
    }

    #[test]
    fn test_label_with_rank() {
        let marker = MapMarker::new("a").with_name("Gwangjang Market").with_rank(2);
        assert_eq!(marker.label().as_deref(), Some("2. Gwangjang Market"));
        assert!(MapMarker::new("b").label().is_none());
    }

    #[test]
    fn test_deserialize_string_coordinates() {
        let marker: MapMarker = serde_json::from_str(
            r#"{"id":"x","name":"Cafe","latitude":"37.57","longitude":126.98}"#,
        )
        .unwrap();
        assert_eq!(marker.explicit_point(), Some(LatLng::new(37.57, 126.98)));
    }

    #[test]
    fn test_signature_tracks_order() {
        let a = MapMarker::new("a");
        let b = MapMarker::new("b");
        let ab = MarkerSignature::from_markers(&[a.clone(), b.clone()]);
        let ba = MarkerSignature::from_markers(&[b, a]);
        assert_ne!(ab, ba);
        assert!(MarkerSignature::from_markers(&[]).is_empty());
    }
}
