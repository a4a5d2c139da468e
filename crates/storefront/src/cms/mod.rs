//! Headless CMS client.
//!
//! # Architecture
//!
//! - Plain REST over `reqwest`; every request carries the bearer token when
//!   one is configured
//! - The CMS is the source of truth for catalog and content, there is no
//!   local copy
//! - Read endpoints are cached in memory via `moka`, keyed by full URL
//!   (TTL from `CMS_CACHE_TTL_SECS`)
//! - Login and registration are proxied uncached
//!
//! # Example
//!
//! ```rust,ignore
//! use tienda_storefront::cms::{CmsClient, ProductQuery};
//!
//! let cms = CmsClient::new(&config.cms)?;
//! let page = cms.products(&ProductQuery::search("casco", 1)).await?;
//! let suggestions = cms.search_suggestions("casco", 8).await;
//! ```

pub mod types;

use std::sync::Arc;

use moka::future::Cache;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tienda_core::{FormError, LoginForm, RegistrationForm, StoredSession, Suggestion};
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::CmsConfig;

pub use types::{
    Brand, Category, GlobalData, Page, Pagination, Product, ProductPage, UNNAMED_PRODUCT,
    flatten_entry, media_url,
};

/// Products per listing page.
pub const PRODUCTS_PAGE_SIZE: u32 = 12;

/// Shortest normalized query that produces suggestions.
pub const MIN_SUGGESTION_QUERY: usize = 2;

/// Errors that can occur when reading from the CMS.
#[derive(Debug, Error)]
pub enum CmsError {
    /// The request never produced a response.
    #[error("Error fetching {endpoint}: {source}")]
    Http {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// The CMS answered with a non-success status.
    #[error("Error fetching {endpoint}: {status_text}")]
    Status {
        endpoint: String,
        status: StatusCode,
        status_text: String,
    },

    /// The response body was not the expected JSON.
    #[error("Invalid response from {endpoint}: {source}")]
    Parse {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    /// The CMS base URL cannot be extended into an endpoint URL.
    #[error("Invalid CMS URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Errors from the login and registration proxies.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The submitted form is incomplete.
    #[error(transparent)]
    Invalid(#[from] FormError),

    /// The CMS refused the request; carries its message.
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },

    /// The CMS could not be reached or answered garbage.
    #[error(transparent)]
    Cms(#[from] CmsError),
}

/// Listing query: one page, optionally filtered by a search term.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductQuery {
    pub search: Option<String>,
    pub page: u32,
    pub page_size: u32,
}

impl ProductQuery {
    /// First page of the full catalog.
    #[must_use]
    pub fn all() -> Self {
        Self::search("", 1)
    }

    /// One page of products matching every whitespace token of `term`.
    #[must_use]
    pub fn search(term: &str, page: u32) -> Self {
        let term = term.trim();
        Self {
            search: (!term.is_empty()).then(|| term.to_string()),
            page: page.max(1),
            page_size: PRODUCTS_PAGE_SIZE,
        }
    }

    fn pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("pagination[page]".to_string(), self.page.max(1).to_string()),
            ("pagination[pageSize]".to_string(), self.page_size.to_string()),
            ("sort".to_string(), "nombre:asc".to_string()),
            ("populate".to_string(), "*".to_string()),
        ];
        if let Some(search) = &self.search {
            pairs.extend(token_filters(&search.to_lowercase()));
        }
        pairs
    }
}

/// `filters[$and][i][$or]` pairs matching each token against name or code.
fn token_filters(term: &str) -> Vec<(String, String)> {
    term.split_whitespace()
        .enumerate()
        .flat_map(|(index, token)| {
            [
                (
                    format!("filters[$and][{index}][$or][0][nombre][$containsi]"),
                    token.to_string(),
                ),
                (
                    format!("filters[$and][{index}][$or][1][codigo][$containsi]"),
                    token.to_string(),
                ),
            ]
        })
        .collect()
}

// =============================================================================
// CmsClient
// =============================================================================

/// Client for the CMS REST API.
///
/// Cheap to clone; clones share the HTTP connection pool and the cache.
#[derive(Clone)]
pub struct CmsClient {
    inner: Arc<CmsClientInner>,
}

struct CmsClientInner {
    http: reqwest::Client,
    api_base: Url,
    media_base: Url,
    token: Option<SecretString>,
    cache: Cache<String, Arc<Value>>,
}

impl std::fmt::Debug for CmsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CmsClient")
            .field("api_base", &self.inner.api_base.as_str())
            .finish_non_exhaustive()
    }
}

impl CmsClient {
    /// Create a new CMS client.
    ///
    /// # Errors
    ///
    /// Returns an error if the API base URL cannot be derived from the
    /// configured CMS URL.
    pub fn new(config: &CmsConfig) -> Result<Self, CmsError> {
        let mut media_base = config.url.clone();
        if !media_base.path().ends_with('/') {
            let path = format!("{}/", media_base.path());
            media_base.set_path(&path);
        }
        let api_base = media_base.join("api/")?;

        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(config.cache_ttl)
            .build();

        Ok(Self {
            inner: Arc::new(CmsClientInner {
                http: reqwest::Client::new(),
                api_base,
                media_base,
                token: config.api_token.clone(),
                cache,
            }),
        })
    }

    /// Base URL that relative media paths resolve against.
    #[must_use]
    pub fn media_base(&self) -> &Url {
        &self.inner.media_base
    }

    fn endpoint(&self, path: &str, pairs: &[(String, String)]) -> Result<Url, CmsError> {
        let mut url = self.inner.api_base.join(path)?;
        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs);
        }
        Ok(url)
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let builder = builder.header("Content-Type", "application/json");
        match &self.inner.token {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        }
    }

    /// GET a JSON document, bypassing the cache.
    async fn fetch(&self, path: &str, url: Url) -> Result<Value, CmsError> {
        let response = self
            .request(self.inner.http.get(url))
            .send()
            .await
            .map_err(|source| CmsError::Http {
                endpoint: path.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(CmsError::Status {
                endpoint: path.to_string(),
                status,
                status_text: status_text(status),
            });
        }

        let body = response.text().await.map_err(|source| CmsError::Http {
            endpoint: path.to_string(),
            source,
        })?;
        serde_json::from_str(&body).map_err(|source| {
            warn!(
                endpoint = path,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse CMS response"
            );
            CmsError::Parse {
                endpoint: path.to_string(),
                source,
            }
        })
    }

    /// GET a JSON document through the cache.
    async fn get(&self, path: &str, pairs: &[(String, String)]) -> Result<Arc<Value>, CmsError> {
        let url = self.endpoint(path, pairs)?;
        let key = url.to_string();

        if let Some(cached) = self.inner.cache.get(&key).await {
            debug!(url = %key, "CMS cache hit");
            return Ok(cached);
        }

        let value = Arc::new(self.fetch(path, url).await?);
        self.inner.cache.insert(key, Arc::clone(&value)).await;
        Ok(value)
    }

    async fn collection<T: DeserializeOwned>(
        &self,
        path: &str,
        pairs: &[(String, String)],
    ) -> Result<(Vec<T>, Option<Pagination>), CmsError> {
        let value = self.get(path, pairs).await?;
        decode_collection(path, &value)
    }

    // =========================================================================
    // Read endpoints
    // =========================================================================

    /// Site-wide settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response is malformed.
    #[instrument(skip(self))]
    pub async fn global(&self) -> Result<GlobalData, CmsError> {
        let value = self.get("global", &[]).await?;
        let data = value.get("data").cloned().unwrap_or(Value::Null);
        if data.is_null() {
            return Ok(GlobalData::default());
        }
        serde_json::from_value(flatten_entry(data)).map_err(|source| CmsError::Parse {
            endpoint: "global".to_string(),
            source,
        })
    }

    /// Editorial pages.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response is malformed.
    #[instrument(skip(self))]
    pub async fn pages(&self) -> Result<Vec<Page>, CmsError> {
        Ok(self.collection("paginas", &[]).await?.0)
    }

    /// One page of the product listing.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response is malformed.
    #[instrument(skip(self), fields(search = ?query.search, page = query.page))]
    pub async fn products(&self, query: &ProductQuery) -> Result<ProductPage, CmsError> {
        let (products, pagination) = self.collection("productos", &query.pairs()).await?;
        let pagination = pagination.unwrap_or(Pagination {
            page: query.page.max(1),
            page_size: query.page_size,
            page_count: 1,
            total: u32::try_from(products.len()).unwrap_or(u32::MAX),
        });
        Ok(ProductPage {
            products,
            pagination,
        })
    }

    /// Product categories.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response is malformed.
    #[instrument(skip(self))]
    pub async fn categories(&self) -> Result<Vec<Category>, CmsError> {
        Ok(self.collection("categorias", &[]).await?.0)
    }

    /// Product brands.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response is malformed.
    #[instrument(skip(self))]
    pub async fn brands(&self) -> Result<Vec<Brand>, CmsError> {
        Ok(self.collection("marcas", &[]).await?.0)
    }

    /// Product with the given slug, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response is malformed.
    #[instrument(skip(self))]
    pub async fn product_by_slug(&self, slug: &str) -> Result<Option<Product>, CmsError> {
        let pairs = [
            ("filters[slug][$eq]".to_string(), slug.to_string()),
            ("populate".to_string(), "*".to_string()),
        ];
        let (products, _) = self.collection::<Product>("productos", &pairs).await?;
        Ok(products.into_iter().next())
    }

    /// Autocomplete entries for `query`.
    ///
    /// Never fails: transport errors and error statuses yield an empty list.
    #[instrument(skip(self))]
    pub async fn search_suggestions(&self, query: &str, limit: u32) -> Vec<Suggestion> {
        let term = query.trim().to_lowercase();
        if term.chars().count() < MIN_SUGGESTION_QUERY {
            return Vec::new();
        }

        let mut pairs = vec![
            ("pagination[page]".to_string(), "1".to_string()),
            ("pagination[pageSize]".to_string(), limit.to_string()),
            ("sort".to_string(), "nombre:asc".to_string()),
        ];
        pairs.extend(token_filters(&term));

        let products = match self.collection::<Product>("productos", &pairs).await {
            Ok((products, _)) => products,
            Err(e) => {
                warn!(error = %e, "Search suggestions unavailable");
                return Vec::new();
            }
        };

        let mut suggestions: Vec<Suggestion> = Vec::new();
        for product in &products {
            let suggestion = Suggestion::for_product(product.name(), product.code());
            if !suggestions.iter().any(|s| s.value == suggestion.value) {
                suggestions.push(suggestion);
            }
        }
        suggestions
    }

    // =========================================================================
    // Auth proxy
    // =========================================================================

    /// Log in with identifier and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Invalid` for incomplete forms,
    /// `AuthError::Rejected` with the CMS message when it refuses, and
    /// `AuthError::Cms` when it cannot be reached.
    #[instrument(skip_all, fields(identifier = %form.identifier.trim()))]
    pub async fn login(&self, form: LoginForm) -> Result<StoredSession, AuthError> {
        let form = form.validate()?;
        self.post_auth("auth/local", &form).await
    }

    /// Register a new account.
    ///
    /// # Errors
    ///
    /// Same as [`login`](Self::login).
    #[instrument(skip_all, fields(username = %form.username.trim()))]
    pub async fn register(&self, form: RegistrationForm) -> Result<StoredSession, AuthError> {
        let form = form.validate()?;
        self.post_auth("auth/local/register", &form).await
    }

    async fn post_auth(
        &self,
        path: &str,
        body: &impl serde::Serialize,
    ) -> Result<StoredSession, AuthError> {
        let url = self.endpoint(path, &[])?;
        let response = self
            .request(self.inner.http.post(url))
            .json(body)
            .send()
            .await
            .map_err(|source| CmsError::Http {
                endpoint: path.to_string(),
                source,
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|source| CmsError::Http {
            endpoint: path.to_string(),
            source,
        })?;

        if !status.is_success() {
            let message = auth_error_message(&text, status);
            debug!(%status, %message, "CMS rejected auth request");
            return Err(AuthError::Rejected { status, message });
        }

        serde_json::from_str(&text).map_err(|source| {
            AuthError::Cms(CmsError::Parse {
                endpoint: path.to_string(),
                source,
            })
        })
    }
}

/// Decode `{ data: [...], meta: { pagination } }`, flattening each entry.
///
/// Entries that do not deserialize are skipped with a warning.
fn decode_collection<T: DeserializeOwned>(
    path: &str,
    value: &Value,
) -> Result<(Vec<T>, Option<Pagination>), CmsError> {
    let entries = match value.get("data") {
        Some(Value::Array(entries)) => entries.clone(),
        Some(Value::Null) | None => Vec::new(),
        Some(other) => vec![other.clone()],
    };

    let items = entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value(flatten_entry(entry)) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!(endpoint = path, error = %e, "Skipping malformed CMS entry");
                None
            }
        })
        .collect();

    let pagination = value
        .pointer("/meta/pagination")
        .cloned()
        .map(serde_json::from_value::<Pagination>)
        .transpose()
        .map_err(|source| CmsError::Parse {
            endpoint: path.to_string(),
            source,
        })?;

    Ok((items, pagination))
}

/// Human-readable reason for an auth failure: `error.message`, then
/// `message`, then the HTTP status text.
#[must_use]
pub fn auth_error_message(body: &str, status: StatusCode) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    parsed
        .as_ref()
        .and_then(|value| {
            value
                .pointer("/error/message")
                .and_then(Value::as_str)
                .or_else(|| value.get("message").and_then(Value::as_str))
        })
        .filter(|message| !message.trim().is_empty())
        .map_or_else(|| status_text(status), String::from)
}

fn status_text(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map_or_else(|| status.as_str().to_string(), String::from)
}
