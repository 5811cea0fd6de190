//! Prelude module for common restomap types and traits
//!
//! This module re-exports the most commonly used types, traits, and functions
//! for easy importing with `use restomap::prelude::*;`

pub use crate::core::{
    config::{GeocoderConfig, LoaderConfig, WidgetConfig},
    geo::{LatLng, LatLngBounds, Point},
    viewport::{Viewport, ViewportState},
};

pub use crate::layers::{
    manager::{OverlayId, OverlayKind, OverlayManager, OverlaySpec},
    marker::{MapMarker, ResolvedMarker},
};

pub use crate::geocode::{
    resolver::{CoordinateResolver, FallbackChain, ResolveStrategy},
    Geocoder, GeocodeError, LookupHit, LookupResponse, LookupStatus,
};

pub use crate::input::events::{EventBus, MapEvent, Subscription};

pub use crate::interaction::{FocusSuppression, InteractionState, InteractionTracker};

pub use crate::loader::{
    cache::LoadCache,
    sdk::{SdkLoader, SdkReady, SdkStatus},
    LoadError,
};

pub use crate::reconcile::{reconcile, ReconcileInputs, ViewportAction};

pub use crate::session::{MemorySessionStore, SessionStore, StoreError, ViewStateStore};

pub use crate::traits::{MapFactory, MapSurface, SdkHost};

pub use crate::ui::widget::{MapWidget, MountOutcome, WidgetCallbacks, WidgetProps};

pub use crate::fallback::FallbackLinks;

pub use crate::runtime::{spawn, AsyncHandle};

pub use crate::{Error as MapError, FailureKind, Result};

pub use std::{
    future::Future,
    pin::Pin,
    sync::{Arc, Mutex},
    time::Duration,
};

pub use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet};
