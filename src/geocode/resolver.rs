//! Marker to point resolution
//!
//! Resolution walks an ordered chain of strategies and stops at the first
//! one that yields a point:
//!
//! 1. explicit coordinates on the marker (no lookup)
//! 2. address lookup
//! 3. keyword lookup on locality hints + name
//! 4. keyword lookup on the bare name
//!
//! A marker nothing can place is dropped for the cycle. Nothing is cached
//! between calls.

use crate::{
    core::geo::LatLng,
    geocode::{GeocodeError, Geocoder, LookupResponse},
    layers::marker::{MapMarker, ResolvedMarker},
    prelude::Arc,
};
use async_trait::async_trait;
use futures::future::join_all;

/// One step of the resolution chain
#[async_trait]
pub trait ResolveStrategy: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Try to place `marker`. `None` hands over to the next step.
    async fn resolve(&self, marker: &MapMarker, geocoder: &dyn Geocoder) -> Option<LatLng>;
}

fn first_point(
    step: &str,
    query: &str,
    response: Result<LookupResponse, GeocodeError>,
) -> Option<LatLng> {
    match response {
        Ok(response) => {
            let point = response.first_point();
            if point.is_none() {
                log::debug!("{step} lookup for {query:?}: {:?}", response.status);
            }
            point
        }
        Err(e) => {
            log::debug!("{step} lookup for {query:?} failed: {e}");
            None
        }
    }
}

/// Finite coordinates already on the marker
pub struct ExplicitCoordinates;

#[async_trait]
impl ResolveStrategy for ExplicitCoordinates {
    fn name(&self) -> &'static str {
        "explicit"
    }

    async fn resolve(&self, marker: &MapMarker, _geocoder: &dyn Geocoder) -> Option<LatLng> {
        marker.explicit_point()
    }
}

/// Address lookup, first hit of an OK response
pub struct AddressLookup;

#[async_trait]
impl ResolveStrategy for AddressLookup {
    fn name(&self) -> &'static str {
        "address"
    }

    async fn resolve(&self, marker: &MapMarker, geocoder: &dyn Geocoder) -> Option<LatLng> {
        let query = marker.address_query()?;
        first_point(self.name(), query, geocoder.address_search(query).await)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordMode {
    /// Locality hints followed by the name
    CombinedHints,
    /// The name alone
    NameOnly,
}

/// Keyword lookup, first hit of an OK response
pub struct KeywordLookup {
    mode: KeywordMode,
}

impl KeywordLookup {
    pub fn new(mode: KeywordMode) -> Self {
        Self { mode }
    }

    fn query(&self, marker: &MapMarker) -> Option<String> {
        match self.mode {
            KeywordMode::CombinedHints => marker.combined_keyword(),
            KeywordMode::NameOnly => {
                let name = marker.name_query()?;
                // Without locality hints the combined step already sent this query
                if marker.combined_keyword().as_deref() == Some(name) {
                    None
                } else {
                    Some(name.to_string())
                }
            }
        }
    }
}

#[async_trait]
impl ResolveStrategy for KeywordLookup {
    fn name(&self) -> &'static str {
        match self.mode {
            KeywordMode::CombinedHints => "keyword",
            KeywordMode::NameOnly => "name",
        }
    }

    async fn resolve(&self, marker: &MapMarker, geocoder: &dyn Geocoder) -> Option<LatLng> {
        let query = self.query(marker)?;
        first_point(self.name(), &query, geocoder.keyword_search(&query).await)
    }
}

/// Ordered strategies with early exit
pub struct FallbackChain {
    steps: Vec<Box<dyn ResolveStrategy>>,
}

impl Default for FallbackChain {
    fn default() -> Self {
        Self::new()
            .then(ExplicitCoordinates)
            .then(AddressLookup)
            .then(KeywordLookup::new(KeywordMode::CombinedHints))
            .then(KeywordLookup::new(KeywordMode::NameOnly))
    }
}

impl FallbackChain {
    /// An empty chain; resolves nothing until steps are added
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// Append a step, tried after every step already in the chain
    pub fn then(mut self, step: impl ResolveStrategy + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    pub async fn resolve(&self, marker: &MapMarker, geocoder: &dyn Geocoder) -> Option<LatLng> {
        for step in &self.steps {
            if let Some(point) = step.resolve(marker, geocoder).await {
                log::debug!("marker {} placed by {} step", marker.id, step.name());
                return Some(point);
            }
        }
        log::debug!("marker {} could not be placed", marker.id);
        None
    }
}

/// Resolves markers to points through a [`FallbackChain`].
///
/// Cheap to clone; clones share the geocoder and the chain.
#[derive(Clone)]
pub struct CoordinateResolver {
    geocoder: Arc<dyn Geocoder>,
    chain: Arc<FallbackChain>,
}

impl CoordinateResolver {
    /// Resolver using the standard four-step chain
    pub fn new(geocoder: Arc<dyn Geocoder>) -> Self {
        Self::with_chain(geocoder, FallbackChain::default())
    }

    pub fn with_chain(geocoder: Arc<dyn Geocoder>, chain: FallbackChain) -> Self {
        Self {
            geocoder,
            chain: Arc::new(chain),
        }
    }

    /// Best-effort point for one marker
    pub async fn resolve(&self, marker: &MapMarker) -> Option<LatLng> {
        self.chain.resolve(marker, self.geocoder.as_ref()).await
    }

    /// Resolve every marker concurrently. Order is preserved; unplaceable
    /// markers are left out.
    pub async fn resolve_all(&self, markers: &[MapMarker]) -> Vec<ResolvedMarker> {
        let points = join_all(markers.iter().map(|m| self.resolve(m))).await;

        markers
            .iter()
            .zip(points)
            .filter_map(|(marker, point)| point.map(|p| ResolvedMarker::new(marker.clone(), p)))
            .collect()
    }
}
