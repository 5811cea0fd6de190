use crate::{
    core::{
        config::WidgetConfig,
        constants::{DEFAULT_CENTER, SERVICES_MODULE},
        geo::LatLng,
        viewport::ViewportState,
    },
    fallback::FallbackLinks,
    fullscreen::FullscreenCoordinator,
    geocode::resolver::CoordinateResolver,
    input::events::{EventBus, MapEvent, Subscription},
    interaction::{FocusSuppression, InteractionState, InteractionTracker},
    layers::{
        manager::OverlayManager,
        marker::{MapMarker, MarkerSignature, ResolvedMarker},
    },
    loader::sdk::SdkLoader,
    prelude::Arc,
    reconcile::{reconcile, ReconcileInputs},
    session::ViewStateStore,
    traits::{MapFactory, MapSurface},
    FailureKind,
};
use std::sync::atomic::{AtomicU64, Ordering};

/// Errors from driving a mounted widget
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WidgetError {
    #[error("map is not mounted")]
    NotMounted,

    #[error("cycle {0} was superseded by a newer one")]
    StaleCycle(u64),
}

impl WidgetError {
    pub fn kind(&self) -> FailureKind {
        match self {
            WidgetError::NotMounted => FailureKind::TransientLoad,
            WidgetError::StaleCycle(_) => FailureKind::StaleCycle,
        }
    }
}

/// What the host renders: markers plus view hints.
///
/// Built fluently, the same way on every render:
///
/// ```rust
/// use restomap::{MapMarker, WidgetProps};
///
/// let props = WidgetProps::new(vec![MapMarker::new("a").with_address("Seoul City Hall")])
///     .focus("a")
///     .fit_bounds(true);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetProps {
    pub markers: Vec<MapMarker>,
    pub focus_id: Option<String>,
    pub center: Option<LatLng>,
    pub level: Option<i32>,
    /// Keep the user's view when the marker set changes
    pub preserve_view: bool,
    /// Frame all markers when two or more are plotted
    pub fit_bounds: bool,
    pub user_location: Option<LatLng>,
    pub show_user_location: bool,
    /// Overrides the configured default level
    pub default_level: Option<i32>,
}

impl Default for WidgetProps {
    fn default() -> Self {
        Self {
            markers: Vec::new(),
            focus_id: None,
            center: None,
            level: None,
            preserve_view: false,
            fit_bounds: true,
            user_location: None,
            show_user_location: false,
            default_level: None,
        }
    }
}

impl WidgetProps {
    pub fn new(markers: Vec<MapMarker>) -> Self {
        Self {
            markers,
            ..Self::default()
        }
    }

    pub fn focus(mut self, id: impl Into<String>) -> Self {
        self.focus_id = Some(id.into());
        self
    }

    pub fn center(mut self, lat: f64, lng: f64) -> Self {
        self.center = Some(LatLng::new(lat, lng));
        self
    }

    pub fn level(mut self, level: i32) -> Self {
        self.level = Some(level);
        self
    }

    pub fn preserve_view(mut self, preserve: bool) -> Self {
        self.preserve_view = preserve;
        self
    }

    pub fn fit_bounds(mut self, fit: bool) -> Self {
        self.fit_bounds = fit;
        self
    }

    pub fn user_location(mut self, location: LatLng, show: bool) -> Self {
        self.user_location = Some(location);
        self.show_user_location = show;
        self
    }

    pub fn default_level(mut self, level: i32) -> Self {
        self.default_level = Some(level);
        self
    }
}

pub type MarkerClickCallback = Box<dyn Fn(&MapMarker) + Send + Sync>;
pub type ViewportChangeCallback = Box<dyn Fn(ViewportState) + Send + Sync>;
pub type RequestLocationCallback = Box<dyn Fn() + Send + Sync>;

/// Notifications to the host
#[derive(Default)]
pub struct WidgetCallbacks {
    on_marker_click: Option<MarkerClickCallback>,
    on_viewport_change: Option<ViewportChangeCallback>,
    on_request_location: Option<RequestLocationCallback>,
}

impl WidgetCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_marker_click(mut self, f: impl Fn(&MapMarker) + Send + Sync + 'static) -> Self {
        self.on_marker_click = Some(Box::new(f));
        self
    }

    pub fn on_viewport_change(mut self, f: impl Fn(ViewportState) + Send + Sync + 'static) -> Self {
        self.on_viewport_change = Some(Box::new(f));
        self
    }

    pub fn on_request_location(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_request_location = Some(Box::new(f));
        self
    }
}

/// Result of mounting a widget
#[derive(Debug, Clone, PartialEq)]
pub enum MountOutcome {
    Mounted,
    /// The map cannot be shown; render `message` and the search links instead
    Fallback {
        message: String,
        kind: FailureKind,
        links: Option<FallbackLinks>,
    },
}

/// Identifies one resolution cycle. Stale once a newer cycle starts or the
/// widget is torn down.
#[derive(Debug, Clone)]
pub struct CycleToken {
    generation: u64,
    latest: Arc<AtomicU64>,
}

impl CycleToken {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_current(&self) -> bool {
        self.latest.load(Ordering::SeqCst) == self.generation
    }
}

/// A started cycle waiting for its markers to be resolved. Owns everything
/// it needs, so resolution does not borrow the widget.
pub struct CycleRequest {
    token: CycleToken,
    props: WidgetProps,
    resolver: CoordinateResolver,
}

impl CycleRequest {
    pub fn token(&self) -> &CycleToken {
        &self.token
    }

    /// Resolve every marker concurrently
    pub async fn resolve(self) -> ResolvedCycle {
        let resolved = if self.token.is_current() {
            self.resolver.resolve_all(&self.props.markers).await
        } else {
            Vec::new()
        };
        ResolvedCycle {
            token: self.token,
            props: self.props,
            resolved,
        }
    }
}

/// A cycle whose markers are resolved, ready to commit
pub struct ResolvedCycle {
    token: CycleToken,
    props: WidgetProps,
    resolved: Vec<ResolvedMarker>,
}

impl ResolvedCycle {
    pub fn token(&self) -> &CycleToken {
        &self.token
    }

    pub fn resolved(&self) -> &[ResolvedMarker] {
        &self.resolved
    }
}

/// One restaurant map on screen.
///
/// Owns the live map, its overlays and all per-instance view state. Each
/// render runs a cycle: resolve the markers, rebuild the overlays, pick one
/// viewport action, apply it and persist the result. Platform events arrive
/// through [`MapWidget::events`] and are handled by [`MapWidget::pump`].
pub struct MapWidget {
    config: WidgetConfig,
    loader: SdkLoader,
    factory: Arc<dyn MapFactory>,
    resolver: CoordinateResolver,
    store: ViewStateStore,
    callbacks: WidgetCallbacks,

    events: EventBus,
    subscription: Subscription,
    map: Option<Box<dyn MapSurface>>,
    overlays: OverlayManager,
    resolved: Vec<ResolvedMarker>,

    tracker: InteractionTracker,
    suppression: FocusSuppression,
    fullscreen: FullscreenCoordinator,
    generation: Arc<AtomicU64>,

    restore_once: Option<ViewportState>,
    last_center: Option<LatLng>,
    last_focus: Option<String>,
    props: WidgetProps,
}

impl MapWidget {
    pub fn new(
        loader: SdkLoader,
        factory: Arc<dyn MapFactory>,
        resolver: CoordinateResolver,
        store: ViewStateStore,
    ) -> Self {
        let config = WidgetConfig::default();
        let events = EventBus::new();
        let subscription = events.subscribe();
        Self {
            suppression: FocusSuppression::new(config.focus_cooldown),
            config,
            loader,
            factory,
            resolver,
            store,
            callbacks: WidgetCallbacks::default(),
            events,
            subscription,
            map: None,
            overlays: OverlayManager::new(),
            resolved: Vec::new(),
            tracker: InteractionTracker::new(),
            fullscreen: FullscreenCoordinator::new(),
            generation: Arc::new(AtomicU64::new(0)),
            restore_once: None,
            last_center: None,
            last_focus: None,
            props: WidgetProps::default(),
        }
    }

    pub fn with_config(mut self, config: WidgetConfig) -> Self {
        self.suppression = FocusSuppression::new(config.focus_cooldown);
        self.config = config;
        self
    }

    pub fn with_callbacks(mut self, callbacks: WidgetCallbacks) -> Self {
        self.callbacks = callbacks;
        self
    }

    pub fn config(&self) -> &WidgetConfig {
        &self.config
    }

    /// Bus the host publishes map and platform events on
    pub fn events(&self) -> EventBus {
        self.events.clone()
    }

    pub fn is_mounted(&self) -> bool {
        self.map.is_some()
    }

    pub fn interaction(&self) -> InteractionState {
        self.tracker.state()
    }

    pub fn is_focus_suppressed(&self) -> bool {
        self.suppression.is_active()
    }

    pub fn overlays(&self) -> &OverlayManager {
        &self.overlays
    }

    /// Markers plotted by the last committed cycle
    pub fn resolved(&self) -> &[ResolvedMarker] {
        &self.resolved
    }

    /// What the live map shows, if mounted
    pub fn viewport(&self) -> Option<ViewportState> {
        self.map.as_ref().map(|m| m.viewport())
    }

    /// Load the SDK, build the map and run the first cycle.
    ///
    /// Configuration and load failures come back as
    /// [`MountOutcome::Fallback`]; nothing else stops a mount.
    pub async fn mount(&mut self, props: WidgetProps) -> MountOutcome {
        if let Err(e) = self.loader.load().await {
            return self.fallback(e.to_string(), e.kind(), &props);
        }
        if let Err(e) = self.loader.wait_for_module(SERVICES_MODULE).await {
            log::warn!("continuing without SDK lookups: {e}");
        }

        let stored = self.store.load(&self.config.namespace);
        let initial = self.initial_view(stored, &props);
        match self.factory.create(initial) {
            Ok(map) => self.map = Some(map),
            Err(e) => return self.fallback(e.to_string(), e.kind(), &props),
        }
        log::info!(
            "mounted map {:?} at ({}, {}) level {}",
            self.config.namespace,
            initial.lat,
            initial.lng,
            initial.level
        );

        self.restore_once = stored;
        if let Err(e) = self.refresh(props).await {
            log::debug!("initial cycle not committed: {e}");
        }
        MountOutcome::Mounted
    }

    fn fallback(&self, message: String, kind: FailureKind, props: &WidgetProps) -> MountOutcome {
        log::warn!("map unavailable ({kind:?}): {message}");
        MountOutcome::Fallback {
            message,
            kind,
            links: FallbackLinks::for_markers(&props.markers),
        }
    }

    fn initial_view(&self, stored: Option<ViewportState>, props: &WidgetProps) -> ViewportState {
        if let Some(view) = stored {
            return view;
        }
        let level = self.default_level(props);
        let center = props
            .center
            .or_else(|| props.markers.iter().find_map(MapMarker::explicit_point))
            .unwrap_or(LatLng::new(DEFAULT_CENTER.0, DEFAULT_CENTER.1));
        ViewportState::from_center(center, props.level.map_or(level, |l| self.config.clamp_level(l)))
    }

    fn default_level(&self, props: &WidgetProps) -> i32 {
        self.config
            .clamp_level(props.default_level.unwrap_or(self.config.default_level))
    }

    /// Start a cycle for `props`, superseding any cycle still in flight
    pub fn begin_cycle(&mut self, props: WidgetProps) -> CycleRequest {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        log::debug!("cycle {generation}: {} markers", props.markers.len());
        CycleRequest {
            token: CycleToken {
                generation,
                latest: self.generation.clone(),
            },
            props,
            resolver: self.resolver.clone(),
        }
    }

    /// Apply a resolved cycle to the map. Superseded cycles are discarded
    /// without touching anything.
    pub fn commit(&mut self, cycle: ResolvedCycle) -> Result<ViewportState, WidgetError> {
        if !cycle.token.is_current() {
            log::debug!("discarding stale cycle {}", cycle.token.generation);
            return Err(WidgetError::StaleCycle(cycle.token.generation));
        }
        self.pump();

        let ResolvedCycle { props, resolved, .. } = cycle;
        let default_level = self.default_level(&props);
        let map = self.map.as_deref_mut().ok_or(WidgetError::NotMounted)?;

        self.tracker
            .sync_signature(MarkerSignature::from_markers(&props.markers), props.preserve_view);

        let shown_user = props.user_location.filter(|_| props.show_user_location);
        self.overlays
            .rebuild(&mut *map, &resolved, props.focus_id.as_deref(), shown_user);

        let points: Vec<LatLng> = resolved.iter().map(|r| r.point).collect();
        let explicit_center = props.center.filter(|c| self.last_center != Some(*c));
        let action = reconcile(&ReconcileInputs {
            points: &points,
            explicit_center,
            explicit_level: props.level.map(|l| self.config.clamp_level(l)),
            restore_view: self.restore_once,
            fit_bounds: props.fit_bounds,
            interaction: self.tracker.state(),
            user_location: props.user_location,
            show_user_location: props.show_user_location,
            default_level,
            current: map.viewport(),
            padding: self.config.fit_padding,
        });
        log::debug!("cycle {} action {:?}", self.generation.load(Ordering::SeqCst), action);

        action.apply(&mut *map);
        if action.consumes_restore() {
            self.restore_once = None;
            self.tracker.mark_user_controlled();
        } else if explicit_center.is_some_and(|c| c.is_finite()) {
            // An explicit center outranks the pending restore
            self.restore_once = None;
        }
        self.last_center = props.center;

        if props.focus_id != self.last_focus {
            let target = props
                .focus_id
                .as_deref()
                .and_then(|id| resolved.iter().find(|r| r.marker.id == id));
            if let Some(target) = target {
                if self.suppression.is_active() {
                    log::debug!("focus pan to {} suppressed", target.marker.id);
                } else {
                    self.suppression.engage();
                    map.pan_to(target.point);
                }
            }
        }
        self.last_focus = props.focus_id.clone();

        let view = map.viewport();
        self.resolved = resolved;
        self.props = props;
        self.persist(view);
        Ok(view)
    }

    /// Run a full cycle for `props`: resolve, then commit
    pub async fn refresh(&mut self, props: WidgetProps) -> Result<ViewportState, WidgetError> {
        if self.map.is_none() {
            return Err(WidgetError::NotMounted);
        }
        let cycle = self.begin_cycle(props).resolve().await;
        self.commit(cycle)
    }

    fn persist(&self, view: ViewportState) {
        self.store.save(&self.config.namespace, &view);
        if let Some(callback) = &self.callbacks.on_viewport_change {
            callback(view);
        }
    }

    /// Handle one map or platform event
    pub fn handle_event(&mut self, event: MapEvent) {
        if self.tracker.observe(&event) {
            if self.restore_once.take().is_some() {
                log::debug!("gesture superseded the pending restore view");
            }
            return;
        }

        match event {
            MapEvent::Idle => {
                if let Some(view) = self.viewport() {
                    self.persist(view);
                }
            }
            MapEvent::OverlayClicked { overlay } => {
                if let (Some(marker), Some(callback)) = (
                    self.overlays.marker_for(overlay),
                    &self.callbacks.on_marker_click,
                ) {
                    callback(marker);
                }
            }
            MapEvent::FullscreenChanged { active } => self.complete_fullscreen(active),
            MapEvent::DragStart | MapEvent::ZoomChanged { .. } => {}
        }
    }

    /// Handle every event published since the last pump, in order
    pub fn pump(&mut self) -> usize {
        let events = self.subscription.drain();
        let count = events.len();
        for event in events {
            self.handle_event(event);
        }
        count
    }

    /// Snapshot the view before the platform switches display mode
    pub fn begin_fullscreen_transition(&mut self) {
        if let Some(view) = self.viewport() {
            self.restore_once = Some(view);
            self.fullscreen.begin(view);
        }
    }

    fn complete_fullscreen(&mut self, active: bool) {
        let Some(view) = self.fullscreen.complete(active) else {
            return;
        };

        if let Some(map) = self.map.as_deref_mut() {
            map.relayout();
            map.set_view(view);
        }
        self.restore_once = None;
        self.tracker.mark_user_controlled();
        self.persist(view);
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen.is_fullscreen()
    }

    /// Swap in a map the host re-created (e.g. after a container change).
    /// Overlays from the last cycle are plotted on it again.
    pub fn attach_map(&mut self, mut map: Box<dyn MapSurface>) {
        self.overlays.forget();
        let shown_user = self
            .props
            .user_location
            .filter(|_| self.props.show_user_location);
        self.overlays.rebuild(
            map.as_mut(),
            &self.resolved,
            self.props.focus_id.as_deref(),
            shown_user,
        );
        self.map = Some(map);
    }

    /// Re-create the map through the factory at the current view
    pub fn recreate_map(&mut self) -> crate::Result<()> {
        let view = self
            .viewport()
            .or_else(|| self.store.load(&self.config.namespace))
            .unwrap_or_else(|| self.initial_view(None, &self.props));
        let map = self.factory.create(view)?;
        self.attach_map(map);
        Ok(())
    }

    /// Pan to the user's location, or ask the host for one.
    /// Returns whether the map moved.
    pub fn go_to_my_location(&mut self) -> bool {
        let Some(location) = self.props.user_location else {
            if let Some(callback) = &self.callbacks.on_request_location {
                callback();
            }
            return false;
        };
        let Some(map) = self.map.as_deref_mut() else {
            return false;
        };

        self.suppression.engage();
        map.pan_to(location);
        let view = map.viewport();
        self.persist(view);
        true
    }

    /// Cancel in-flight work and remove everything from the map
    pub fn teardown(&mut self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.suppression.release();
        if let Some(mut map) = self.map.take() {
            self.overlays.clear(map.as_mut());
        }
        log::debug!("tore down map {:?}", self.config.namespace);
    }
}

impl Drop for MapWidget {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::{HeadlessMapFactory, HeadlessSdkHost, StaticGeocoder, SurfaceCall};
    use crate::loader::cache::LoadCache;
    use crate::session::MemorySessionStore;
    use crate::LoaderConfig;
    use std::sync::Mutex;

    struct Harness {
        factory: Arc<HeadlessMapFactory>,
        store: Arc<MemorySessionStore>,
        widget: MapWidget,
    }

    fn harness(geocoder: StaticGeocoder) -> Harness {
        let factory = Arc::new(HeadlessMapFactory::new());
        let store = Arc::new(MemorySessionStore::new());
        let loader = SdkLoader::with_cache(
            Arc::new(HeadlessSdkHost::ready()),
            LoaderConfig::for_testing(),
            Arc::new(LoadCache::new()),
        );
        let widget = MapWidget::new(
            loader,
            factory.clone(),
            CoordinateResolver::new(Arc::new(geocoder)),
            ViewStateStore::new(store.clone()),
        )
        .with_config(WidgetConfig::with_namespace("test").default_level(12));
        Harness {
            factory,
            store,
            widget,
        }
    }

    fn markers() -> Vec<MapMarker> {
        vec![
            MapMarker::new("a").with_coordinates(37.50, 126.90),
            MapMarker::new("b").with_coordinates(37.60, 127.10),
        ]
    }

    #[tokio::test]
    async fn test_stale_cycle_is_discarded() {
        let mut h = harness(StaticGeocoder::new());
        h.widget.mount(WidgetProps::new(markers())).await;
        let map = h.factory.last_map().unwrap();
        map.clear_calls();

        let first = h.widget.begin_cycle(WidgetProps::new(vec![MapMarker::new("x").with_coordinates(35.0, 129.0)]));
        let second = h.widget.begin_cycle(WidgetProps::new(markers()));

        let first = first.resolve().await;
        let second = second.resolve().await;

        assert_eq!(h.widget.commit(first).err(), Some(WidgetError::StaleCycle(2)));
        assert!(map.calls().is_empty());
        assert!(h.widget.commit(second).is_ok());
        assert_eq!(map.overlay_count(), 2);
    }

    #[tokio::test]
    async fn test_teardown_cancels_cycle() {
        let mut h = harness(StaticGeocoder::new());
        h.widget.mount(WidgetProps::new(markers())).await;

        let pending = h.widget.begin_cycle(WidgetProps::new(markers()));
        h.widget.teardown();
        assert!(!pending.token().is_current());
        assert!(!h.widget.is_mounted());
        assert_eq!(h.factory.last_map().unwrap().overlay_count(), 0);
    }

    #[tokio::test]
    async fn test_marker_click_reaches_host() {
        let clicked = Arc::new(Mutex::new(Vec::new()));
        let sink = clicked.clone();
        let mut h = harness(StaticGeocoder::new());
        h.widget = h.widget.with_callbacks(WidgetCallbacks::new().on_marker_click(move |m| {
            sink.lock().unwrap().push(m.id.clone());
        }));

        h.widget.mount(WidgetProps::new(markers())).await;
        let before = h.widget.viewport();
        let (overlay, _) = h.widget.overlays().overlays().nth(1).unwrap();

        h.widget.events().emit(MapEvent::OverlayClicked { overlay });
        h.widget.pump();

        assert_eq!(*clicked.lock().unwrap(), vec!["b".to_string()]);
        assert_eq!(h.widget.viewport(), before);
    }

    #[tokio::test]
    async fn test_focus_pan_only_on_focus_change() {
        let mut h = harness(StaticGeocoder::new());
        h.widget.mount(WidgetProps::new(markers()).focus("b")).await;
        let map = h.factory.last_map().unwrap();
        assert_eq!(map.pan_count(), 1);
        assert!(h.widget.is_focus_suppressed());

        h.widget.refresh(WidgetProps::new(markers()).focus("b")).await.unwrap();
        assert_eq!(map.pan_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_suppression_vetoes_focus_pan() {
        let mut h = harness(StaticGeocoder::new());
        h.widget
            .mount(WidgetProps::new(markers()).user_location(LatLng::new(37.55, 126.95), true))
            .await;
        let map = h.factory.last_map().unwrap();

        assert!(h.widget.go_to_my_location());
        assert_eq!(map.pan_count(), 1);

        let props = WidgetProps::new(markers())
            .user_location(LatLng::new(37.55, 126.95), true)
            .focus("a");
        h.widget.refresh(props.clone()).await.unwrap();
        assert_eq!(map.pan_count(), 1);

        tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
        assert!(!h.widget.is_focus_suppressed());
        h.widget.refresh(props.focus("b")).await.unwrap();
        assert_eq!(map.pan_count(), 2);
    }

    #[tokio::test]
    async fn test_my_location_without_fix_asks_host() {
        let asked = Arc::new(Mutex::new(0));
        let counter = asked.clone();
        let mut h = harness(StaticGeocoder::new());
        h.widget = h.widget.with_callbacks(
            WidgetCallbacks::new().on_request_location(move || *counter.lock().unwrap() += 1),
        );
        h.widget.mount(WidgetProps::new(markers())).await;

        assert!(!h.widget.go_to_my_location());
        assert_eq!(*asked.lock().unwrap(), 1);
        assert!(!h.widget.is_focus_suppressed());
    }

    #[tokio::test]
    async fn test_explicit_center_applies_once() {
        let mut h = harness(StaticGeocoder::new());
        let props = WidgetProps::new(markers()).center(35.1796, 129.0756).level(9);
        h.widget.mount(props.clone()).await;
        let map = h.factory.last_map().unwrap();
        assert_eq!(h.widget.viewport(), Some(ViewportState::new(35.1796, 129.0756, 9)));

        map.user_drag(LatLng::new(37.0, 127.0), &h.widget.events());
        h.widget.pump();
        map.clear_calls();

        h.widget.refresh(props).await.unwrap();
        assert!(map.calls().is_empty());
        assert_eq!(h.widget.viewport().map(|v| v.lat), Some(37.0));
    }

    #[tokio::test]
    async fn test_explicit_center_supersedes_stored_view() {
        let mut h = harness(StaticGeocoder::new());
        ViewStateStore::new(h.store.clone()).save("test", &ViewportState::new(33.0, 126.5, 5));

        let props = WidgetProps::new(markers()).center(35.1796, 129.0756).level(9);
        h.widget.mount(props.clone()).await;
        assert_eq!(h.widget.viewport(), Some(ViewportState::new(35.1796, 129.0756, 9)));

        let map = h.factory.last_map().unwrap();
        map.user_drag(LatLng::new(36.0, 128.0), &h.widget.events());
        h.widget.pump();
        assert_eq!(h.widget.interaction(), InteractionState::UserControlled);

        h.widget.refresh(props).await.unwrap();
        assert_eq!(h.widget.viewport(), Some(ViewportState::new(36.0, 128.0, 9)));
    }

    #[tokio::test]
    async fn test_gesture_drops_pending_restore() {
        let mut h = harness(StaticGeocoder::new());
        ViewStateStore::new(h.store.clone()).save("test", &ViewportState::new(33.0, 126.5, 5));

        // Nothing to plot yet, so the stored view is still pending
        h.widget.mount(WidgetProps::new(Vec::new())).await;
        let map = h.factory.last_map().unwrap();
        map.user_drag(LatLng::new(36.0, 128.0), &h.widget.events());
        h.widget.pump();
        map.clear_calls();

        h.widget
            .refresh(WidgetProps::new(markers()).preserve_view(true))
            .await
            .unwrap();
        assert!(map.calls().is_empty());
        assert_eq!(
            h.widget.viewport().map(|v| v.center()),
            Some(LatLng::new(36.0, 128.0))
        );
    }

    #[tokio::test]
    async fn test_preserve_view_still_places_first_mount() {
        let station = LatLng::new(35.1151, 129.0422);
        let mut h = harness(StaticGeocoder::new().with_address("Busan Station", station));

        let props = WidgetProps::new(vec![MapMarker::new("a").with_address("Busan Station")])
            .preserve_view(true);
        h.widget.mount(props).await;

        assert_eq!(h.widget.interaction(), InteractionState::Idle);
        assert_eq!(h.widget.viewport(), Some(ViewportState::from_center(station, 12)));
    }

    #[tokio::test]
    async fn test_my_location_pan_is_persisted() {
        let reported = Arc::new(Mutex::new(Vec::new()));
        let sink = reported.clone();
        let mut h = harness(StaticGeocoder::new());
        h.widget = h.widget.with_callbacks(
            WidgetCallbacks::new().on_viewport_change(move |view| sink.lock().unwrap().push(view)),
        );
        let here = LatLng::new(35.0, 129.0);
        h.widget
            .mount(WidgetProps::new(markers()).user_location(here, false))
            .await;

        assert!(h.widget.go_to_my_location());
        let view = h.widget.viewport().unwrap();
        assert_eq!(view.center(), here);
        assert_eq!(ViewStateStore::new(h.store.clone()).load("test"), Some(view));
        assert_eq!(reported.lock().unwrap().last(), Some(&view));
    }

    #[tokio::test]
    async fn test_engine_view_changes_are_not_gestures() {
        let mut h = harness(StaticGeocoder::new());
        h.widget
            .mount(WidgetProps::new(markers()).center(37.5, 127.0).level(9))
            .await;

        assert_eq!(h.widget.pump(), 0);
        assert_eq!(h.widget.interaction(), InteractionState::Idle);
    }

    #[tokio::test]
    async fn test_idle_event_persists_view() {
        let mut h = harness(StaticGeocoder::new());
        h.widget.mount(WidgetProps::new(markers())).await;
        let map = h.factory.last_map().unwrap();

        map.user_zoom(7, &h.widget.events());
        h.widget.pump();

        let stored = ViewStateStore::new(h.store.clone()).load("test").unwrap();
        assert_eq!(stored.level, 7);
        assert_eq!(h.widget.interaction(), InteractionState::UserControlled);
    }

    #[tokio::test]
    async fn test_attach_map_replots_overlays() {
        let mut h = harness(StaticGeocoder::new());
        h.widget.mount(WidgetProps::new(markers())).await;

        h.widget.recreate_map().unwrap();
        assert_eq!(h.factory.created_count(), 2);

        let fresh = h.factory.last_map().unwrap();
        assert_eq!(fresh.overlay_count(), 2);
        assert!(!fresh.calls().contains(&SurfaceCall::Relayout));
    }

    #[tokio::test]
    async fn test_refresh_before_mount() {
        let mut h = harness(StaticGeocoder::new());
        assert_eq!(
            h.widget.refresh(WidgetProps::new(markers())).await,
            Err(WidgetError::NotMounted)
        );
    }
}
