//! # restomap
//!
//! Viewport synchronization and coordinate-resolution engine for an
//! interactive restaurant map widget.
//!
//! The mapping SDK, geocoding backends and session storage are external
//! collaborators reached through the traits in [`traits`] and
//! [`session`]. The crate loads the SDK once per process, resolves marker
//! text into points through a fallback lookup chain, and decides on every
//! render cycle what the viewport should show without overriding the
//! user's own pan/zoom gestures.

pub mod core;
pub mod fallback;
pub mod fullscreen;
pub mod geocode;
pub mod headless;
pub mod input;
pub mod interaction;
pub mod layers;
pub mod loader;
pub mod prelude;
pub mod reconcile;
pub mod runtime;
pub mod session;
pub mod traits;
pub mod ui;

#[cfg(feature = "wasm")]
pub mod web;

pub use crate::core::constants;

// Re-export public API
pub use crate::core::{
    config::{GeocoderConfig, LoaderConfig, WidgetConfig},
    geo::{LatLng, LatLngBounds},
    viewport::ViewportState,
};

pub use geocode::{resolver::CoordinateResolver, Geocoder};

pub use layers::{
    manager::OverlayManager,
    marker::{MapMarker, ResolvedMarker},
};

pub use loader::{cache::LoadCache, sdk::SdkLoader, LoadError};

pub use session::{SessionStore, ViewStateStore};

pub use ui::widget::{MapWidget, WidgetCallbacks, WidgetProps};

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, MapError>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("SDK load error: {0}")]
    Load(#[from] LoadError),

    #[error("Geocoding error: {0}")]
    Geocode(#[from] geocode::GeocodeError),

    #[error("Session store error: {0}")]
    Store(#[from] session::StoreError),

    #[error("Widget error: {0}")]
    Widget(#[from] ui::widget::WidgetError),

    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),

    #[error("Map surface error: {0}")]
    Surface(String),
}

/// Error type alias for convenience
pub type Error = MapError;

/// The five kinds of failure the engine distinguishes.
///
/// Only [`FailureKind::Configuration`] and [`FailureKind::TransientLoad`]
/// ever reach the host; the rest are absorbed internally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Missing access credential
    Configuration,
    /// Script injection failure or load timeout
    TransientLoad,
    /// A marker no lookup step could place
    ResolutionMiss,
    /// Results of a superseded resolution cycle
    StaleCycle,
    /// Session store read/write failure
    Persistence,
}

impl FailureKind {
    /// Whether failures of this kind propagate to the host component.
    pub fn surfaces_to_host(self) -> bool {
        matches!(self, Self::Configuration | Self::TransientLoad)
    }
}

impl MapError {
    /// Classify this error into one of the engine's failure kinds.
    pub fn kind(&self) -> FailureKind {
        match self {
            MapError::Load(e) => e.kind(),
            MapError::Store(_) => FailureKind::Persistence,
            MapError::Widget(e) => e.kind(),
            MapError::Geocode(_) | MapError::InvalidCoordinates(_) => FailureKind::ResolutionMiss,
            MapError::Network(_) | MapError::Surface(_) => FailureKind::TransientLoad,
            MapError::Serialization(_) => FailureKind::Persistence,
        }
    }
}
