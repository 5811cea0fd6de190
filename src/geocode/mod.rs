//! Address and keyword lookups
//!
//! The lookup backends are external; the engine only consumes their
//! request/response contract through [`Geocoder`]. [`resolver`] turns a
//! marker into a point by walking a chain of lookups.

pub mod http;
pub mod resolver;
pub mod response;

pub use response::{LookupHit, LookupResponse, LookupStatus};

use async_trait::async_trait;

/// Errors raised by a lookup backend.
///
/// The resolver treats every one of these as "no result" for the step that
/// produced it and moves on to the next step.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GeocodeError {
    #[error("lookup service unavailable: {0}")]
    Unavailable(String),

    #[error("lookup request failed: {0}")]
    Request(String),

    #[error("malformed lookup response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for GeocodeError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            GeocodeError::Malformed(e.to_string())
        } else {
            GeocodeError::Request(e.to_string())
        }
    }
}

/// Address and keyword lookup backend
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Look up a postal/street address
    async fn address_search(&self, query: &str) -> Result<LookupResponse, GeocodeError>;

    /// Look up a free-text place keyword
    async fn keyword_search(&self, query: &str) -> Result<LookupResponse, GeocodeError>;
}

