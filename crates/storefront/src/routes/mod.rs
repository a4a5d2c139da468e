//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                  - Liveness check
//! GET  /                        - Redirect to /tienda
//!
//! # Catalog
//! GET  /tienda                  - Product listing (?search=&page=)
//! GET  /tienda/{slug}           - Product detail
//!
//! # Cart
//! GET  /carrito                 - Checkout summary (rendered client-side)
//!
//! # Auth
//! GET  /login                   - Login page
//! GET  /registro                - Registration page
//! GET  /success-register        - Registration confirmation
//! POST /api/auth/login          - Login proxy (rate limited)
//! POST /api/auth/register       - Registration proxy (rate limited)
//!
//! # Search
//! GET  /api/search-suggestions  - Autocomplete entries (?q=, rate limited)
//! ```
//!
//! Static assets are mounted under `/static` by [`crate::app`].

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod suggestions;

use axum::{
    Router,
    response::Redirect,
    routing::{get, post},
};

use crate::middleware::{auth_rate_limiter, suggestions_rate_limiter};
use crate::state::AppState;

/// Site-wide data every page template renders.
#[derive(Debug, Clone)]
pub struct Layout {
    pub site_name: String,
    pub site_description: String,
}

impl Layout {
    const DEFAULT_NAME: &'static str = "Tienda";

    /// Site settings from the CMS, or defaults when they are unavailable.
    ///
    /// A page never fails because of its layout.
    pub async fn load(state: &AppState) -> Self {
        let global = match state.cms().global().await {
            Ok(global) => global,
            Err(e) => {
                tracing::warn!(error = %e, "Site settings unavailable, using defaults");
                crate::cms::GlobalData::default()
            }
        };
        Self {
            site_name: global
                .site_name
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| Self::DEFAULT_NAME.to_string()),
            site_description: global.site_description.unwrap_or_default(),
        }
    }

    /// Browser title for a page.
    #[must_use]
    pub fn title(&self, page: &str) -> String {
        if page.is_empty() {
            self.site_name.clone()
        } else {
            format!("{page} | {}", self.site_name)
        }
    }
}

/// Create the auth proxy router.
pub fn auth_api_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        .layer(auth_rate_limiter())
}

/// Create the catalog router.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(catalog::index))
        .route("/{slug}", get(catalog::show))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(|| async { Redirect::to("/tienda") }))
        .route("/health", get(health))
        .nest("/tienda", catalog_routes())
        .route("/carrito", get(cart::show))
        .route("/login", get(auth::login_page))
        .route("/registro", get(auth::register_page))
        .route("/success-register", get(auth::register_success))
        .nest("/api/auth", auth_api_routes())
        .route(
            "/api/search-suggestions",
            get(suggestions::search).layer(suggestions_rate_limiter()),
        )
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check the CMS.
async fn health() -> &'static str {
    "ok"
}
