//! Configuration for the SDK loader, the geocoder client and map widgets
//!
//! Each config is a plain struct with sensible defaults plus a few named
//! presets, so hosts can start from `Default` and override what they need.

use crate::core::constants::{
    DEFAULT_LEVEL, DEFAULT_SDK_URL, FIT_BOUNDS_PADDING, FOCUS_SUPPRESSION_COOLDOWN, MAX_LEVEL,
    MIN_LEVEL, MODULE_POLL_ATTEMPTS, MODULE_POLL_INTERVAL, SDK_LOAD_TIMEOUT, SERVICES_MODULE,
};
use std::time::Duration;

/// Environment variable holding the SDK (JavaScript) app key.
pub const MAP_APP_KEY_ENV: &str = "RESTOMAP_MAP_APP_KEY";

/// Environment variable holding the REST lookup API key.
pub const REST_API_KEY_ENV: &str = "RESTOMAP_REST_API_KEY";

fn env_key(key: &str) -> Option<String> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => Some(value.trim().to_string()),
        Ok(_) => {
            log::warn!("{key} is set but empty");
            None
        }
        Err(_) => {
            log::info!("{key} not set");
            None
        }
    }
}

/// Configuration for the mapping SDK loader
#[derive(Debug, Clone, PartialEq)]
pub struct LoaderConfig {
    /// Access credential appended to the script URL. `None` fails fast.
    pub app_key: Option<String>,
    /// Script endpoint without query parameters
    pub sdk_url: String,
    /// Optional libraries requested through the `libraries` parameter
    pub libraries: Vec<String>,
    /// Upper bound on one load attempt
    pub timeout: Duration,
    /// Polls performed by `wait_for_module`
    pub module_poll_attempts: u32,
    /// Delay between polls
    pub module_poll_interval: Duration,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            app_key: None,
            sdk_url: DEFAULT_SDK_URL.to_string(),
            libraries: vec![SERVICES_MODULE.to_string()],
            timeout: SDK_LOAD_TIMEOUT,
            module_poll_attempts: MODULE_POLL_ATTEMPTS,
            module_poll_interval: MODULE_POLL_INTERVAL,
        }
    }
}

impl LoaderConfig {
    pub fn with_app_key(app_key: impl Into<String>) -> Self {
        Self {
            app_key: Some(app_key.into()),
            ..Self::default()
        }
    }

    /// Defaults with the app key taken from `RESTOMAP_MAP_APP_KEY`
    pub fn from_env() -> Self {
        Self {
            app_key: env_key(MAP_APP_KEY_ENV),
            ..Self::default()
        }
    }

    /// Short timeouts so failure paths are cheap to exercise
    pub fn for_testing() -> Self {
        Self {
            app_key: Some("test-app-key".to_string()),
            timeout: Duration::from_millis(500),
            module_poll_attempts: 3,
            module_poll_interval: Duration::from_millis(10),
            ..Self::default()
        }
    }

    /// Full script URL, or `None` when no credential is configured.
    ///
    /// `autoload=false` keeps the SDK from initializing itself so the loader
    /// decides when initialization runs.
    pub fn script_url(&self) -> Option<String> {
        let key = self.app_key.as_deref().filter(|k| !k.trim().is_empty())?;
        let mut params = vec![("appkey", key.to_string())];
        if !self.libraries.is_empty() {
            params.push(("libraries", self.libraries.join(",")));
        }
        params.push(("autoload", "false".to_string()));

        match reqwest::Url::parse_with_params(&self.sdk_url, &params) {
            Ok(url) => Some(url.to_string()),
            Err(e) => {
                log::warn!("invalid SDK url {}: {}", self.sdk_url, e);
                None
            }
        }
    }
}

/// Configuration for the HTTP lookup client
#[derive(Debug, Clone, PartialEq)]
pub struct GeocoderConfig {
    /// Base URL of the local-search REST API
    pub base_url: String,
    /// REST API key sent in the `Authorization` header
    pub api_key: Option<String>,
    /// Per-request timeout
    pub timeout: Duration,
    /// Hits requested per lookup; only the first is ever used
    pub page_size: u32,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://dapi.kakao.com".to_string(),
            api_key: None,
            timeout: Duration::from_secs(10),
            page_size: 1,
        }
    }
}

impl GeocoderConfig {
    /// Defaults with the API key taken from `RESTOMAP_REST_API_KEY`
    pub fn from_env() -> Self {
        Self {
            api_key: env_key(REST_API_KEY_ENV),
            ..Self::default()
        }
    }
}

/// Per-widget behaviour
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetConfig {
    /// Session-store namespace for the persisted viewport
    pub namespace: String,
    /// Level used when centering on a single point
    pub default_level: i32,
    /// Inset margin when fitting bounds, in pixels
    pub fit_padding: f64,
    /// How long an explicit go-to suppresses focus recentring
    pub focus_cooldown: Duration,
    /// Levels outside this range are clamped before reaching the map
    pub min_level: i32,
    pub max_level: i32,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            namespace: "default".to_string(),
            default_level: DEFAULT_LEVEL,
            fit_padding: FIT_BOUNDS_PADDING,
            focus_cooldown: FOCUS_SUPPRESSION_COOLDOWN,
            min_level: MIN_LEVEL,
            max_level: MAX_LEVEL,
        }
    }
}

impl WidgetConfig {
    pub fn with_namespace(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            ..Self::default()
        }
    }

    pub fn default_level(mut self, level: i32) -> Self {
        self.default_level = level;
        self
    }

    pub fn level_range(mut self, min_level: i32, max_level: i32) -> Self {
        self.min_level = min_level.min(max_level);
        self.max_level = max_level.max(min_level);
        self
    }

    pub fn clamp_level(&self, level: i32) -> i32 {
        level.clamp(self.min_level, self.max_level)
    }
}
