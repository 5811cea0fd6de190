//! Headless collaborators
//!
//! In-process implementations of the SDK-facing traits. They keep real
//! viewport math (Web Mercator, slippy zoom used as the level) and record
//! every call, so the engine can run in a terminal or under test without a
//! browser.

use crate::{
    core::{
        geo::{LatLng, LatLngBounds, Point},
        viewport::{Viewport, ViewportState},
    },
    geocode::{GeocodeError, Geocoder, LookupHit, LookupResponse},
    input::events::{EventBus, MapEvent},
    layers::manager::{OverlayId, OverlaySpec},
    loader::{sdk::SdkStatus, LoadError},
    prelude::{Arc, Duration, HashMap, Mutex},
    runtime,
    traits::{MapFactory, MapSurface, SdkHost},
    Result,
};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// One call received by a [`HeadlessMap`]
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCall {
    SetCenter(LatLng),
    SetLevel(i32),
    SetBounds(LatLngBounds),
    PanTo(LatLng),
    Relayout,
}

struct MapState {
    viewport: Viewport,
    overlays: BTreeMap<OverlayId, OverlaySpec>,
    calls: Vec<SurfaceCall>,
}

/// A map surface without a screen.
///
/// Clones share state, so a test can keep a handle to a map the widget owns.
#[derive(Clone)]
pub struct HeadlessMap {
    state: Arc<Mutex<MapState>>,
}

impl HeadlessMap {
    pub fn new(initial: ViewportState) -> Self {
        Self::with_size(initial, Point::new(800.0, 600.0))
    }

    pub fn with_size(initial: ViewportState, size: Point) -> Self {
        let viewport = Viewport::new(initial.center(), initial.level as f64, size);
        Self {
            state: Arc::new(Mutex::new(MapState {
                viewport,
                overlays: BTreeMap::new(),
                calls: Vec::new(),
            })),
        }
    }

    /// Clamp the level to `min..=max`, like the SDK's zoom constraints
    pub fn set_level_range(&self, min: i32, max: i32) {
        self.with_state(|s| s.viewport.set_zoom_limits(min as f64, max as f64));
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut MapState) -> T) -> T {
        let mut state = match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut state)
    }

    pub fn overlay_count(&self) -> usize {
        self.with_state(|s| s.overlays.len())
    }

    /// Plotted overlays in id order
    pub fn overlays(&self) -> Vec<(OverlayId, OverlaySpec)> {
        self.with_state(|s| s.overlays.iter().map(|(id, spec)| (*id, spec.clone())).collect())
    }

    pub fn calls(&self) -> Vec<SurfaceCall> {
        self.with_state(|s| s.calls.clone())
    }

    pub fn pan_count(&self) -> usize {
        self.with_state(|s| {
            s.calls
                .iter()
                .filter(|c| matches!(c, SurfaceCall::PanTo(_)))
                .count()
        })
    }

    pub fn clear_calls(&self) {
        self.with_state(|s| s.calls.clear());
    }

    /// Simulate the user dragging the map to `center`, publishing the same
    /// events a live map would
    pub fn user_drag(&self, center: LatLng, events: &EventBus) {
        events.emit(MapEvent::DragStart);
        self.with_state(|s| s.viewport.set_center(center));
        events.emit(MapEvent::Idle);
    }

    /// Simulate the user zooming to `level`
    pub fn user_zoom(&self, level: i32, events: &EventBus) {
        self.with_state(|s| s.viewport.set_zoom(level as f64));
        events.emit(MapEvent::ZoomChanged { level });
        events.emit(MapEvent::Idle);
    }
}

impl MapSurface for HeadlessMap {
    fn viewport(&self) -> ViewportState {
        self.with_state(|s| {
            ViewportState::from_center(s.viewport.center, s.viewport.zoom.round() as i32)
        })
    }

    fn set_center(&mut self, center: LatLng) {
        self.with_state(|s| {
            s.viewport.set_center(center);
            s.calls.push(SurfaceCall::SetCenter(center));
        });
    }

    fn set_level(&mut self, level: i32) {
        self.with_state(|s| {
            s.viewport.set_zoom(level as f64);
            s.calls.push(SurfaceCall::SetLevel(level));
        });
    }

    fn set_bounds(&mut self, bounds: &LatLngBounds, padding: f64) {
        self.with_state(|s| {
            s.viewport.fit_bounds(bounds, padding);
            s.calls.push(SurfaceCall::SetBounds(bounds.clone()));
        });
    }

    fn pan_to(&mut self, center: LatLng) {
        self.with_state(|s| {
            s.viewport.set_center(center);
            s.calls.push(SurfaceCall::PanTo(center));
        });
    }

    fn add_overlay(&mut self, id: OverlayId, spec: &OverlaySpec) {
        self.with_state(|s| {
            s.overlays.insert(id, spec.clone());
        });
    }

    fn remove_overlay(&mut self, id: OverlayId) {
        self.with_state(|s| {
            s.overlays.remove(&id);
        });
    }

    fn relayout(&mut self) {
        self.with_state(|s| s.calls.push(SurfaceCall::Relayout));
    }
}

/// Creates [`HeadlessMap`]s and keeps a handle to each
#[derive(Default)]
pub struct HeadlessMapFactory {
    created: Mutex<Vec<HeadlessMap>>,
    fail: AtomicBool,
    level_range: Option<(i32, i32)>,
}

impl HeadlessMapFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `create` fail
    pub fn failing(self) -> Self {
        self.fail.store(true, Ordering::SeqCst);
        self
    }

    /// Constrain every created map to `min..=max` levels
    pub fn with_level_range(mut self, min: i32, max: i32) -> Self {
        self.level_range = Some((min, max));
        self
    }

    pub fn created_count(&self) -> usize {
        self.created.lock().map(|c| c.len()).unwrap_or(0)
    }

    /// Handle to the most recently created map
    pub fn last_map(&self) -> Option<HeadlessMap> {
        self.created.lock().ok().and_then(|c| c.last().cloned())
    }
}

impl MapFactory for HeadlessMapFactory {
    fn create(&self, initial: ViewportState) -> Result<Box<dyn MapSurface>> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(crate::MapError::Surface("map container unavailable".into()));
        }

        let map = HeadlessMap::new(initial);
        if let Some((min, max)) = self.level_range {
            map.set_level_range(min, max);
        }
        if let Ok(mut created) = self.created.lock() {
            created.push(map.clone());
        }
        Ok(Box::new(map))
    }
}

/// Scriptable [`SdkHost`] that counts every call
pub struct HeadlessSdkHost {
    status: Mutex<SdkStatus>,
    inject_delay: Mutex<Duration>,
    fail_injection: AtomicBool,
    injected_urls: Mutex<Vec<String>>,
    init_calls: AtomicUsize,
    module_polls: AtomicUsize,
    /// Module name -> polls that report it missing first
    modules: Mutex<HashMap<String, usize>>,
}

impl Default for HeadlessSdkHost {
    fn default() -> Self {
        Self {
            status: Mutex::new(SdkStatus::Absent),
            inject_delay: Mutex::new(Duration::ZERO),
            fail_injection: AtomicBool::new(false),
            injected_urls: Mutex::new(Vec::new()),
            init_calls: AtomicUsize::new(0),
            module_polls: AtomicUsize::new(0),
            modules: Mutex::new(HashMap::default()),
        }
    }
}

impl HeadlessSdkHost {
    /// Nothing loaded, no modules
    pub fn new() -> Self {
        Self::default()
    }

    /// Already initialized with the services module attached
    pub fn ready() -> Self {
        Self::new()
            .with_status(SdkStatus::Ready)
            .with_module_after(crate::core::constants::SERVICES_MODULE, 0)
    }

    pub fn with_status(self, status: SdkStatus) -> Self {
        if let Ok(mut current) = self.status.lock() {
            *current = status;
        }
        self
    }

    pub fn with_inject_delay(self, delay: Duration) -> Self {
        self.set_inject_delay(delay);
        self
    }

    pub fn set_inject_delay(&self, delay: Duration) {
        if let Ok(mut current) = self.inject_delay.lock() {
            *current = delay;
        }
    }

    pub fn failing_injection(self) -> Self {
        self.fail_injection.store(true, Ordering::SeqCst);
        self
    }

    /// `name` appears once `missing_polls` polls have reported it absent
    pub fn with_module_after(self, name: &str, missing_polls: usize) -> Self {
        if let Ok(mut modules) = self.modules.lock() {
            modules.insert(name.to_string(), missing_polls);
        }
        self
    }

    pub fn inject_calls(&self) -> usize {
        self.injected_urls.lock().map(|u| u.len()).unwrap_or(0)
    }

    pub fn injected_urls(&self) -> Vec<String> {
        self.injected_urls.lock().map(|u| u.clone()).unwrap_or_default()
    }

    pub fn init_calls(&self) -> usize {
        self.init_calls.load(Ordering::SeqCst)
    }

    pub fn module_polls(&self) -> usize {
        self.module_polls.load(Ordering::SeqCst)
    }

    fn set_status(&self, status: SdkStatus) {
        if let Ok(mut current) = self.status.lock() {
            *current = status;
        }
    }
}

#[async_trait]
impl SdkHost for HeadlessSdkHost {
    fn status(&self) -> SdkStatus {
        self.status.lock().map(|s| *s).unwrap_or(SdkStatus::Absent)
    }

    async fn inject_script(&self, url: &str) -> std::result::Result<(), LoadError> {
        if let Ok(mut urls) = self.injected_urls.lock() {
            urls.push(url.to_string());
        }

        let delay = self.inject_delay.lock().map(|d| *d).unwrap_or_default();
        if !delay.is_zero() {
            runtime::sleep(delay).await;
        }

        if self.fail_injection.load(Ordering::SeqCst) {
            return Err(LoadError::Injection(format!("{url} failed to load")));
        }
        self.set_status(SdkStatus::ScriptPresent);
        Ok(())
    }

    async fn initialize(&self) -> std::result::Result<(), LoadError> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        self.set_status(SdkStatus::Ready);
        Ok(())
    }

    fn has_module(&self, name: &str) -> bool {
        let polls = self.module_polls.fetch_add(1, Ordering::SeqCst);
        self.modules
            .lock()
            .ok()
            .and_then(|modules| modules.get(name).copied())
            .map_or(false, |missing| polls >= missing)
    }
}

/// Table-driven [`Geocoder`] that records every query
#[derive(Default)]
pub struct StaticGeocoder {
    addresses: HashMap<String, LatLng>,
    keywords: HashMap<String, LatLng>,
    fail: bool,
    latency: Duration,
    address_queries: Mutex<Vec<String>>,
    keyword_queries: Mutex<Vec<String>>,
}

impl StaticGeocoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_address(mut self, query: &str, point: LatLng) -> Self {
        self.addresses.insert(query.to_string(), point);
        self
    }

    pub fn with_keyword(mut self, query: &str, point: LatLng) -> Self {
        self.keywords.insert(query.to_string(), point);
        self
    }

    /// Every lookup errors out
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Every lookup takes `latency` to answer
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn address_calls(&self) -> usize {
        self.address_queries.lock().map(|q| q.len()).unwrap_or(0)
    }

    pub fn keyword_calls(&self) -> usize {
        self.keyword_queries.lock().map(|q| q.len()).unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.address_calls() + self.keyword_calls()
    }

    pub fn keyword_queries(&self) -> Vec<String> {
        self.keyword_queries.lock().map(|q| q.clone()).unwrap_or_default()
    }

    async fn lookup(
        &self,
        table: &HashMap<String, LatLng>,
        record: &Mutex<Vec<String>>,
        query: &str,
    ) -> std::result::Result<LookupResponse, GeocodeError> {
        if let Ok(mut queries) = record.lock() {
            queries.push(query.to_string());
        }
        if !self.latency.is_zero() {
            runtime::sleep(self.latency).await;
        }
        if self.fail {
            return Err(GeocodeError::Unavailable("static geocoder offline".into()));
        }

        Ok(match table.get(query) {
            Some(point) => LookupResponse::ok(vec![LookupHit::new(point.lng, point.lat)]),
            None => LookupResponse::zero_result(),
        })
    }
}

#[async_trait]
impl Geocoder for StaticGeocoder {
    async fn address_search(&self, query: &str) -> std::result::Result<LookupResponse, GeocodeError> {
        self.lookup(&self.addresses, &self.address_queries, query).await
    }

    async fn keyword_search(&self, query: &str) -> std::result::Result<LookupResponse, GeocodeError> {
        self.lookup(&self.keywords, &self.keyword_queries, query).await
    }
}
