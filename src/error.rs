use thiserror::Error;

use crate::config::ConfigError;
use crate::providers::ProviderError;
use crate::storage::StorageError;

#[derive(Error, Debug)]
pub enum BrochureError {
    /// Request rejected before any network activity.
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    /// The landing page could not be fetched or parsed.
    #[error("failed to scrape main website {url}")]
    Scrape { url: String },

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<ConfigError> for BrochureError {
    fn from(err: ConfigError) -> Self {
        Self::Configuration(err.to_string())
    }
}
