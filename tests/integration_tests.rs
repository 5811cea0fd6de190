use restomap::prelude::*;
use restomap::headless::{HeadlessMap, HeadlessMapFactory, HeadlessSdkHost, StaticGeocoder, SurfaceCall};
use restomap::loader::sdk::LoadPath;

/// End-to-end scenarios: a widget driven the way a host page drives it,
/// against headless collaborators
#[cfg(test)]
mod integration_tests {
    use super::*;

    const CITY_HALL: LatLng = LatLng {
        lat: 37.5665,
        lng: 126.9780,
    };

    struct Setup {
        host: Arc<HeadlessSdkHost>,
        cache: Arc<LoadCache>,
        factory: Arc<HeadlessMapFactory>,
        sessions: Arc<MemorySessionStore>,
        geocoder: Arc<StaticGeocoder>,
    }

    impl Setup {
        fn new() -> Self {
            Self {
                host: Arc::new(HeadlessSdkHost::ready()),
                cache: Arc::new(LoadCache::new()),
                factory: Arc::new(HeadlessMapFactory::new()),
                sessions: Arc::new(MemorySessionStore::new()),
                geocoder: Arc::new(
                    StaticGeocoder::new()
                        .with_address("Seoul City Hall", CITY_HALL)
                        .with_keyword("Seoul Jongno Tosokchon", LatLng::new(37.5781, 126.9710)),
                ),
            }
        }

        fn with_host(mut self, host: HeadlessSdkHost) -> Self {
            self.host = Arc::new(host);
            self
        }

        fn widget_with(&self, loader: LoaderConfig, config: WidgetConfig) -> MapWidget {
            MapWidget::new(
                SdkLoader::with_cache(self.host.clone(), loader, self.cache.clone()),
                self.factory.clone(),
                CoordinateResolver::new(self.geocoder.clone()),
                ViewStateStore::new(self.sessions.clone()),
            )
            .with_config(config)
        }

        fn widget(&self, namespace: &str) -> MapWidget {
            self.widget_with(
                LoaderConfig::for_testing(),
                WidgetConfig::with_namespace(namespace).default_level(3),
            )
        }

        fn stored(&self, namespace: &str) -> Option<ViewportState> {
            ViewStateStore::new(self.sessions.clone()).load(namespace)
        }

        fn map(&self) -> HeadlessMap {
            self.factory.last_map().unwrap()
        }
    }

    fn two_markers() -> Vec<MapMarker> {
        vec![
            MapMarker::new("a").with_coordinates(37.50, 126.90),
            MapMarker::new("b").with_coordinates(37.60, 127.10),
        ]
    }

    fn has_fit(map: &HeadlessMap) -> bool {
        map.calls().iter().any(|c| matches!(c, SurfaceCall::SetBounds(_)))
    }

    /// A single address-only marker is geocoded and centered at the default level
    #[tokio::test]
    async fn test_city_hall_scenario() {
        println!("[TEST] Seoul City Hall scenario");

        let setup = Setup::new();
        let reported = Arc::new(Mutex::new(Vec::new()));
        let sink = reported.clone();
        let mut widget = setup
            .widget("scenario")
            .with_callbacks(WidgetCallbacks::new().on_viewport_change(move |view| {
                sink.lock().unwrap().push(view);
            }));

        let props = WidgetProps::new(vec![MapMarker::new("a").with_address("Seoul City Hall")])
            .fit_bounds(true);
        assert_eq!(widget.mount(props).await, MountOutcome::Mounted);

        let expected = ViewportState::new(37.5665, 126.9780, 3);
        assert_eq!(widget.interaction(), InteractionState::Idle);
        assert_eq!(widget.viewport(), Some(expected));
        assert!(setup.map().calls().contains(&SurfaceCall::SetCenter(CITY_HALL)));
        assert!(!has_fit(&setup.map()));

        assert_eq!(setup.stored("scenario"), Some(expected));
        assert_eq!(reported.lock().unwrap().last(), Some(&expected));
        assert_eq!(setup.geocoder.address_calls(), 1);
        assert_eq!(setup.geocoder.keyword_calls(), 0);
    }

    /// Concurrent mounts on a shared cache inject the script once
    #[tokio::test]
    async fn test_concurrent_mounts_load_once() {
        let setup = Setup::new().with_host(
            HeadlessSdkHost::new()
                .with_inject_delay(Duration::from_millis(20))
                .with_module_after("services", 0),
        );
        let mut first = setup.widget("first");
        let mut second = setup.widget("second");

        let (a, b) = tokio::join!(
            first.mount(WidgetProps::new(two_markers())),
            second.mount(WidgetProps::new(two_markers()))
        );

        assert_eq!(a, MountOutcome::Mounted);
        assert_eq!(b, MountOutcome::Mounted);
        assert_eq!(setup.host.inject_calls(), 1);
        assert_eq!(setup.host.init_calls(), 1);
        assert_eq!(setup.factory.created_count(), 2);

        // Later mounts reuse the settled load
        let mut third = setup.widget("third");
        third.mount(WidgetProps::new(two_markers())).await;
        assert_eq!(setup.host.inject_calls(), 1);

        let loader = SdkLoader::with_cache(setup.host.clone(), LoaderConfig::for_testing(), setup.cache.clone());
        assert_eq!(loader.load().await.unwrap().path, LoadPath::Injected);
    }

    /// Markers mixing explicit coordinates, addresses and names
    #[tokio::test]
    async fn test_mixed_markers_resolve_in_priority_order() {
        let setup = Setup::new();
        let mut widget = setup.widget("mixed");

        let markers = vec![
            MapMarker::new("explicit")
                .with_coordinates(35.1796, 129.0756)
                .with_address("Seoul City Hall"),
            MapMarker::new("address").with_address("Seoul City Hall"),
            MapMarker::new("keyword")
                .with_name("Tosokchon")
                .with_locality("Seoul", "Jongno"),
            MapMarker::new("unknown").with_name("Nowhere Diner"),
            MapMarker::new("blank"),
        ];
        widget.mount(WidgetProps::new(markers)).await;

        let placed: Vec<_> = widget
            .resolved()
            .iter()
            .map(|r| (r.marker.id.as_str(), r.point))
            .collect();
        assert_eq!(
            placed,
            vec![
                ("explicit", LatLng::new(35.1796, 129.0756)),
                ("address", CITY_HALL),
                ("keyword", LatLng::new(37.5781, 126.9710)),
            ]
        );
        assert_eq!(setup.map().overlay_count(), 3);
        assert_eq!(setup.geocoder.address_calls(), 1);
        assert_eq!(
            setup.geocoder.keyword_queries(),
            vec!["Seoul Jongno Tosokchon", "Nowhere Diner"]
        );
    }

    /// A gesture survives re-renders of the same marker set, not a new one
    #[tokio::test]
    async fn test_user_gesture_is_not_overridden() {
        let setup = Setup::new();
        let mut widget = setup.widget("sovereignty");
        widget.mount(WidgetProps::new(two_markers())).await;
        let map = setup.map();
        assert!(has_fit(&map));

        let dragged = LatLng::new(36.0, 128.0);
        map.user_drag(dragged, &widget.events());
        widget.pump();
        assert_eq!(widget.interaction(), InteractionState::UserControlled);

        map.clear_calls();
        widget.refresh(WidgetProps::new(two_markers())).await.unwrap();
        assert!(map.calls().is_empty());
        assert_eq!(widget.viewport().map(|v| v.center()), Some(dragged));

        // Preserving the view keeps control with the user even for new data
        let mut more = two_markers();
        more.push(MapMarker::new("c").with_coordinates(37.55, 127.20));
        widget
            .refresh(WidgetProps::new(more.clone()).preserve_view(true))
            .await
            .unwrap();
        assert!(map.calls().is_empty());

        more.push(MapMarker::new("d").with_coordinates(37.45, 126.80));
        widget.refresh(WidgetProps::new(more)).await.unwrap();
        assert_eq!(widget.interaction(), InteractionState::Idle);
        assert!(has_fit(&map));
    }

    /// The pre-transition view comes back once on a re-created map
    #[tokio::test]
    async fn test_fullscreen_round_trip() {
        let setup = Setup::new();
        let mut widget = setup.widget("fullscreen");
        widget.mount(WidgetProps::new(two_markers())).await;

        widget.begin_fullscreen_transition();
        let snapshot = widget.viewport().unwrap();

        let fresh = HeadlessMap::new(ViewportState::new(0.0, 0.0, 2));
        widget.attach_map(Box::new(fresh.clone()));
        assert_eq!(fresh.overlay_count(), 2);

        widget.events().emit(MapEvent::FullscreenChanged { active: true });
        widget.pump();

        assert_eq!(fresh.viewport(), snapshot);
        assert!(fresh.calls().contains(&SurfaceCall::Relayout));
        assert_eq!(setup.stored("fullscreen"), Some(snapshot));
        assert_eq!(widget.interaction(), InteractionState::UserControlled);
        assert!(widget.is_fullscreen());

        // The snapshot is gone after one use
        fresh.clear_calls();
        widget.events().emit(MapEvent::FullscreenChanged { active: false });
        widget.pump();
        assert!(fresh.calls().is_empty());
        assert!(!widget.is_fullscreen());
    }

    /// A view persisted by one widget is restored by the next one
    #[tokio::test]
    async fn test_persisted_view_restored_on_remount() {
        let setup = Setup::new();
        let mut first = setup.widget("shared");
        first.mount(WidgetProps::new(two_markers())).await;

        setup.map().user_zoom(9, &first.events());
        first.pump();
        let saved = setup.stored("shared").unwrap();
        assert_eq!(saved.level, 9);
        drop(first);

        let mut second = setup.widget("shared");
        second.mount(WidgetProps::new(two_markers())).await;

        assert_eq!(second.viewport(), Some(saved));
        assert_eq!(second.interaction(), InteractionState::UserControlled);
        assert!(!has_fit(&setup.map()));
    }

    /// A corrupt persisted entry behaves like no entry
    #[tokio::test]
    async fn test_corrupt_persisted_view_is_ignored() {
        let setup = Setup::new();
        setup
            .sessions
            .set(&ViewStateStore::key("corrupt"), "{\"lat\":")
            .unwrap();

        let mut widget = setup.widget("corrupt");
        widget.mount(WidgetProps::new(two_markers())).await;

        assert!(has_fit(&setup.map()));
        assert_eq!(widget.interaction(), InteractionState::Idle);
        assert_eq!(setup.stored("corrupt"), widget.viewport());
    }

    /// A missing key shows search links instead of a map
    #[tokio::test]
    async fn test_missing_key_falls_back_to_links() {
        let setup = Setup::new();
        let mut widget = setup.widget_with(LoaderConfig::default(), WidgetConfig::default());

        let outcome = widget
            .mount(WidgetProps::new(vec![
                MapMarker::new("a"),
                MapMarker::new("b").with_address("Seoul City Hall"),
            ]))
            .await;

        match outcome {
            MountOutcome::Fallback { kind, links, .. } => {
                assert_eq!(kind, FailureKind::Configuration);
                let links = links.unwrap();
                assert_eq!(links.query, "Seoul City Hall");
                assert!(links.kakao.starts_with("https://map.kakao.com/"));
            }
            MountOutcome::Mounted => panic!("mounted without an app key"),
        }
        assert_eq!(setup.factory.created_count(), 0);
        assert!(!widget.is_mounted());
    }

    /// A failed load falls back, and the next mount retries from scratch
    #[tokio::test]
    async fn test_failed_load_is_retried() {
        let broken = Setup::new().with_host(HeadlessSdkHost::new().failing_injection());
        let mut widget = broken.widget("retry");
        match widget.mount(WidgetProps::new(two_markers())).await {
            MountOutcome::Fallback { kind, .. } => assert_eq!(kind, FailureKind::TransientLoad),
            MountOutcome::Mounted => panic!("mounted after a failed injection"),
        }
        assert!(!broken.cache.is_cached());

        let healthy = Setup {
            host: Arc::new(HeadlessSdkHost::new().with_module_after("services", 0)),
            ..broken
        };
        let mut widget = healthy.widget("retry");
        assert_eq!(widget.mount(WidgetProps::new(two_markers())).await, MountOutcome::Mounted);
        assert_eq!(healthy.host.inject_calls(), 1);
    }
}
