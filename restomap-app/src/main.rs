use anyhow::Context;
use restomap::{
    geocode::http::LocalSearchClient,
    headless::{HeadlessMapFactory, HeadlessSdkHost},
    session::MemorySessionStore,
    ui::widget::MountOutcome,
    CoordinateResolver, LoaderConfig, MapMarker, MapWidget, SdkLoader, ViewStateStore,
    WidgetCallbacks, WidgetConfig, WidgetProps,
};
use std::sync::Arc;

const USAGE: &str = "usage: restomap-app <markers.json> [namespace]";

/// Resolve a marker file through the local-search API and print what the
/// map would show
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let path = args.next().context(USAGE)?;
    let namespace = args.next().unwrap_or_else(|| "demo".to_string());

    let raw = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
    let markers: Vec<MapMarker> =
        serde_json::from_str(&raw).with_context(|| format!("parsing markers in {path}"))?;
    log::info!("loaded {} markers from {path}", markers.len());

    let config = WidgetConfig::with_namespace(namespace.clone());
    let sessions = Arc::new(MemorySessionStore::new());
    let factory = Arc::new(
        HeadlessMapFactory::new().with_level_range(config.min_level, config.max_level),
    );
    let loader = SdkLoader::new(Arc::new(HeadlessSdkHost::ready()), LoaderConfig::from_env());
    let resolver = CoordinateResolver::new(Arc::new(LocalSearchClient::from_env()?));

    let mut widget = MapWidget::new(
        loader,
        factory.clone(),
        resolver,
        ViewStateStore::new(sessions.clone()),
    )
    .with_config(config)
    .with_callbacks(WidgetCallbacks::new().on_viewport_change(|view| {
        log::debug!("viewport -> ({:.5}, {:.5}) level {}", view.lat, view.lng, view.level);
    }));

    match widget.mount(WidgetProps::new(markers)).await {
        MountOutcome::Mounted => {}
        MountOutcome::Fallback {
            message, links, ..
        } => {
            println!("map unavailable: {message}");
            match links {
                Some(links) => {
                    println!("search on Kakao Map: {}", links.kakao);
                    println!("search on Naver Map: {}", links.naver);
                }
                None => println!("no marker carries searchable text"),
            }
            return Ok(());
        }
    }

    if let Some(view) = widget.viewport() {
        println!(
            "viewport: ({:.5}, {:.5}) level {}",
            view.lat, view.lng, view.level
        );
    }

    println!("plotted {} overlays:", widget.overlays().len());
    for (id, spec) in widget.overlays().overlays() {
        println!(
            "  #{:<3} {:<30} ({:.5}, {:.5}) z={}",
            id.0,
            spec.label.as_deref().unwrap_or("-"),
            spec.position.lat,
            spec.position.lng,
            spec.z_index
        );
    }

    let stored = ViewStateStore::new(sessions).load(&namespace);
    println!(
        "persisted {}: {}",
        ViewStateStore::key(&namespace),
        serde_json::to_string(&stored)?
    );
    Ok(())
}
