//! One-time loading of the external mapping SDK

pub mod cache;
pub mod sdk;

use crate::FailureKind;
use std::time::Duration;

/// Why the SDK could not be made ready.
///
/// `Clone` because a single load outcome is handed to every caller awaiting
/// the shared load.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LoadError {
    #[error("mapping SDK app key is not configured")]
    MissingAppKey,

    #[error("failed to inject SDK script: {0}")]
    Injection(String),

    #[error("SDK initialization failed: {0}")]
    Initialization(String),

    #[error("SDK load timed out after {0:?}")]
    Timeout(Duration),

    #[error("SDK module '{0}' did not become available")]
    ModuleUnavailable(String),
}

impl LoadError {
    pub fn kind(&self) -> FailureKind {
        match self {
            LoadError::MissingAppKey => FailureKind::Configuration,
            _ => FailureKind::TransientLoad,
        }
    }

    /// A later attempt may succeed
    pub fn is_retryable(&self) -> bool {
        self.kind() == FailureKind::TransientLoad
    }
}
