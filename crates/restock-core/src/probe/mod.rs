mod http;
mod registry;

pub use http::HttpProbe;
pub use registry::ProbeRegistry;

use async_trait::async_trait;
use thiserror::Error;

use crate::monitor::observation::Target;

#[derive(Debug, Clone, Error)]
pub enum ProbeError {
    #[error("HTTP error {status} fetching {url}: {message}")]
    Http {
        url: String,
        status: u16,
        message: String,
    },
    #[error("Network error fetching {url}: {reason}")]
    Network { url: String, reason: String },
    #[error("Timeout fetching {url}")]
    Timeout { url: String },
    #[error("No probe registered for source '{source_name}'")]
    UnknownSource { source_name: String },
}

impl ProbeError {
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Trait for performing one availability check against a retailer.
///
/// Implementations own everything site-specific: how the locator is fetched
/// and how "purchasable" is decided. The engine only sees the boolean.
/// The trait is object-safe and Send + Sync for use across async tasks.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn check(&self, target: &Target) -> Result<bool, ProbeError>;
}
