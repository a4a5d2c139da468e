//! Application state shared across handlers.

use std::sync::Arc;

use crate::cms::{CmsClient, CmsError};
use crate::config::StorefrontConfig;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`; holds the configuration and the CMS client.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    cms: CmsClient,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the CMS URL cannot be turned into an API base.
    pub fn new(config: StorefrontConfig) -> Result<Self, CmsError> {
        let cms = CmsClient::new(&config.cms)?;
        Ok(Self {
            inner: Arc::new(AppStateInner { config, cms }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the CMS client.
    #[must_use]
    pub fn cms(&self) -> &CmsClient {
        &self.inner.cms
    }
}
