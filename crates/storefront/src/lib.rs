//! Tienda Storefront library.
//!
//! The HTTP service in front of the headless CMS: server-rendered catalog
//! and auth pages carrying the markup the in-page runtime binds to, a login
//! and registration proxy, and the search suggestions endpoint.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cms;
pub mod config;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod routes;
pub mod state;

use std::path::Path;

use axum::{Router, middleware::from_fn, middleware::from_fn_with_state};
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::middleware::{SecurityHeaders, request_id_middleware, security_headers_middleware};
use crate::state::AppState;

/// Directory holding `css/` and `images/`.
///
/// Images are also served from `/images`, where the product placeholder
/// lives.
#[must_use]
pub fn static_dir() -> &'static Path {
    Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/static"))
}

/// Build the application router with its middleware stack.
///
/// Sentry layers are left to the binary so tests run without a hub.
pub fn app(state: AppState) -> Router {
    let security = SecurityHeaders::new(&state.config().cms.url);

    Router::new()
        .merge(routes::routes())
        .nest_service("/static", ServeDir::new(static_dir()))
        .nest_service("/images", ServeDir::new(static_dir().join("images")))
        .layer(from_fn_with_state(security, security_headers_middleware))
        .layer(from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
