//! Integration tests for Tienda.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p tienda-integration-tests
//! ```
//!
//! Everything runs in-process: the CMS is a `wiremock` server, the storefront
//! router is driven with `tower::ServiceExt::oneshot` or served on an
//! ephemeral port, and the shop front runtime runs on `tienda_client`
//! documents.
//!
//! # Test Categories
//!
//! - `storefront_routes` - Pages, proxies and headers of the HTTP service
//! - `shop_front` - Server markup, suggestions and sessions seen by the runtime
//! - `cart_files` - Carts shared between the CLI file format and the runtime

#![allow(clippy::missing_panics_doc)]

use std::collections::HashMap;
use std::net::SocketAddr;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use serde_json::{Value, json};
use tienda_storefront::config::StorefrontConfig;
use tienda_storefront::state::AppState;
use tower::ServiceExt;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Address reported as the client for rate limiting.
pub const TEST_CLIENT_IP: &str = "198.51.100.10";

/// A response read to completion.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    /// Parse the body as JSON.
    #[must_use]
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).expect("Response body is not JSON")
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// A storefront wired to a mock CMS.
pub struct TestContext {
    pub cms: MockServer,
    pub app: Router,
}

impl TestContext {
    /// Start a mock CMS and build the storefront router against it.
    pub async fn new() -> Self {
        let cms = MockServer::start().await;
        let vars: HashMap<&str, String> = HashMap::from([
            ("STOREFRONT_BASE_URL", "http://localhost:4321".to_string()),
            ("CMS_URL", cms.uri()),
            ("CMS_CACHE_TTL_SECS", "60".to_string()),
        ]);
        let config = StorefrontConfig::from_source(&|key: &str| vars.get(key).cloned())
            .expect("Test configuration is valid");
        let state = AppState::new(config).expect("Failed to build application state");
        let app = tienda_storefront::app(state);
        Self { cms, app }
    }

    /// Answer `GET /api/global` with a site name.
    pub async fn mount_global(&self, site_name: &str) {
        Mock::given(method("GET"))
            .and(path("/api/global"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"id": 1, "attributes": {"siteName": site_name}}
            })))
            .mount(&self.cms)
            .await;
    }

    /// Answer every `GET /api/productos` with `products` (Strapi v4 shape).
    pub async fn mount_products(&self, products: Value) {
        let total = products.as_array().map_or(0, Vec::len);
        Mock::given(method("GET"))
            .and(path("/api/productos"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": products,
                "meta": {"pagination": {"page": 1, "pageSize": 12, "pageCount": 1, "total": total}}
            })))
            .mount(&self.cms)
            .await;
    }

    /// Send a request through the router.
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("Router is infallible");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        TestResponse {
            status,
            headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.send(
            Request::builder()
                .uri(uri)
                .header("x-forwarded-for", TEST_CLIENT_IP)
                .body(Body::empty())
                .expect("Valid request"),
        )
        .await
    }

    pub async fn post_json(&self, uri: &str, body: &Value) -> TestResponse {
        self.send(
            Request::builder()
                .method(Method::POST)
                .uri(uri)
                .header("x-forwarded-for", TEST_CLIENT_IP)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .expect("Valid request"),
        )
        .await
    }

    /// Post an urlencoded body, as a browser form without scripts does.
    pub async fn post_form(&self, uri: &str, body: &str) -> TestResponse {
        self.send(
            Request::builder()
                .method(Method::POST)
                .uri(uri)
                .header("x-forwarded-for", TEST_CLIENT_IP)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(body.to_string()))
                .expect("Valid request"),
        )
        .await
    }

    /// Serve the router on an ephemeral local port and return its base URL.
    pub async fn serve(&self) -> Url {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Listener has an address");
        let app = self.app.clone();
        tokio::spawn(async move {
            let _ = axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await;
        });
        Url::parse(&format!("http://{addr}/")).expect("Valid base URL")
    }
}

/// A product entry in the CMS's v4 shape.
#[must_use]
pub fn product(id: i64, nombre: &str, codigo: &str, slug: &str, precio: Value) -> Value {
    json!({
        "id": id,
        "attributes": {
            "nombre": nombre,
            "codigo": codigo,
            "slug": slug,
            "precio": precio,
            "imagen": {"data": {"id": id, "attributes": {"url": format!("/uploads/{slug}.png")}}}
        }
    })
}
