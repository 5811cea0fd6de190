//! Engine-wide timing and layout constants.
//! Keeping them in a single place makes it easier to tweak the magic numbers.

use std::time::Duration;

/// Upper bound on a single SDK load attempt.
pub const SDK_LOAD_TIMEOUT: Duration = Duration::from_secs(15);

/// How many times to poll for an asynchronously attached SDK sub-module.
pub const MODULE_POLL_ATTEMPTS: u32 = 10;

/// Interval between sub-module polls.
pub const MODULE_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// How long an explicit "go to this point" suppresses focus-marker recentring.
pub const FOCUS_SUPPRESSION_COOLDOWN: Duration = Duration::from_millis(1000);

/// Inset margin, in pixels, applied when fitting bounds.
pub const FIT_BOUNDS_PADDING: f64 = 50.0;

/// Default zoom level when the caller does not supply one.
pub const DEFAULT_LEVEL: i32 = 15;

/// SDK script endpoint.
pub const DEFAULT_SDK_URL: &str = "https://dapi.kakao.com/v2/maps/sdk.js";

/// Sub-module that provides address and keyword lookups.
pub const SERVICES_MODULE: &str = "services";

/// Prefix of every persisted viewport key.
pub const VIEWPORT_KEY_PREFIX: &str = "restomap:viewport:";

/// Stacking order of a regular marker overlay.
pub const MARKER_Z_INDEX: i32 = 1;

/// Stacking order of the focused marker overlay.
pub const FOCUS_MARKER_Z_INDEX: i32 = 10;

/// Stacking order of the user-location overlay; always on top.
pub const USER_LOCATION_Z_INDEX: i32 = 100;

/// Pin size in pixels for regular and emphasized markers.
pub const MARKER_PIN_SIZE: (u32, u32) = (24, 35);
pub const FOCUS_MARKER_PIN_SIZE: (u32, u32) = (36, 52);

/// Initial center when nothing better is known (Seoul City Hall).
pub const DEFAULT_CENTER: (f64, f64) = (37.5665, 126.9780);

/// Level range accepted by the widget.
pub const MIN_LEVEL: i32 = 0;
pub const MAX_LEVEL: i32 = 20;
