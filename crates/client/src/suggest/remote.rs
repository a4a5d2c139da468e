//! Remote search suggestions with supersession.
//!
//! Each keystroke calls [`SuggestionFetcher::request`]. Starting a request
//! aborts the one still in flight, whose caller then sees
//! [`FetchOutcome::Superseded`] and must leave the UI alone.

use std::sync::{Arc, Mutex, PoisonError};

use tienda_core::Suggestion;
use tokio::task::AbortHandle;
use tracing::{debug, warn};
use url::Url;

use crate::dom::{Document, ElementId};
use crate::render;

pub const SUGGESTIONS_PATH: &str = "/api/search-suggestions";

/// Shortest trimmed query that is sent to the server.
pub const MIN_QUERY_CHARS: usize = 2;

/// What the caller should do with the suggestion box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Show(Vec<Suggestion>),
    Hide,
    Superseded,
}

/// Fetches suggestions from the storefront, one request at a time.
///
/// Clones share the in-flight slot.
#[derive(Clone)]
pub struct SuggestionFetcher {
    inner: Arc<FetcherInner>,
}

struct FetcherInner {
    http: reqwest::Client,
    endpoint: Url,
    in_flight: Mutex<Option<AbortHandle>>,
}

impl std::fmt::Debug for SuggestionFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SuggestionFetcher")
            .field("endpoint", &self.inner.endpoint.as_str())
            .finish_non_exhaustive()
    }
}

impl SuggestionFetcher {
    /// Create a fetcher for the storefront at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint URL cannot be built.
    pub fn new(base_url: &Url) -> Result<Self, url::ParseError> {
        Ok(Self::with_client(reqwest::Client::new(), base_url.join(SUGGESTIONS_PATH)?))
    }

    #[must_use]
    pub fn with_client(http: reqwest::Client, endpoint: Url) -> Self {
        Self {
            inner: Arc::new(FetcherInner {
                http,
                endpoint,
                in_flight: Mutex::new(None),
            }),
        }
    }

    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.inner.endpoint
    }

    /// Fetch suggestions for `query`, superseding any earlier request.
    ///
    /// A query under [`MIN_QUERY_CHARS`] also cancels the in-flight request
    /// and hides the box without asking the server.
    pub async fn request(&self, query: &str) -> FetchOutcome {
        let term = query.trim();
        if term.chars().count() < MIN_QUERY_CHARS {
            self.replace_in_flight(None);
            return FetchOutcome::Hide;
        }

        let mut url = self.inner.endpoint.clone();
        url.query_pairs_mut().append_pair("q", term);
        let http = self.inner.http.clone();

        let task = tokio::spawn(async move { fetch(&http, url).await });
        self.replace_in_flight(Some(task.abort_handle()));

        match task.await {
            Ok(Ok(items)) if items.is_empty() => FetchOutcome::Hide,
            Ok(Ok(items)) => FetchOutcome::Show(items),
            Ok(Err(e)) => {
                debug!(error = %e, "Suggestion request failed");
                FetchOutcome::Hide
            }
            Err(e) if e.is_cancelled() => {
                debug!(query = term, "Suggestion request superseded");
                FetchOutcome::Superseded
            }
            Err(e) => {
                warn!(error = %e, "Suggestion task failed");
                FetchOutcome::Hide
            }
        }
    }

    /// Abort the in-flight request, if any.
    pub fn cancel(&self) {
        self.replace_in_flight(None);
    }

    fn replace_in_flight(&self, next: Option<AbortHandle>) {
        let previous = {
            let mut slot = self
                .inner
                .in_flight
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *slot, next)
        };
        if let Some(previous) = previous {
            previous.abort();
        }
    }
}

async fn fetch(http: &reqwest::Client, url: Url) -> Result<Vec<Suggestion>, reqwest::Error> {
    http.get(url)
        .send()
        .await?
        .error_for_status()?
        .json::<Vec<Suggestion>>()
        .await
}

/// Render an outcome into the remote suggestion container.
///
/// Superseded outcomes leave the container untouched.
pub fn apply_outcome(doc: &Document, container: ElementId, outcome: &FetchOutcome) {
    match outcome {
        FetchOutcome::Show(items) => {
            doc.clear_children(container);
            for markup in render::remote_suggestions(items) {
                doc.append(container, &markup);
            }
            doc.remove_class(container, "hidden");
        }
        FetchOutcome::Hide => {
            doc.clear_children(container);
            doc.add_class(container, "hidden");
        }
        FetchOutcome::Superseded => {}
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::dom::{Markup, Selector};

    fn fetcher(server: &MockServer) -> SuggestionFetcher {
        SuggestionFetcher::new(&Url::parse(&server.uri()).unwrap()).unwrap()
    }

    fn casco() -> serde_json::Value {
        json!([{ "value": "Casco Pro C1", "label": "Casco Pro • C1" }])
    }

    #[tokio::test]
    async fn test_short_query_skips_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(casco()))
            .expect(0)
            .mount(&server)
            .await;

        let fetcher = fetcher(&server);
        assert_eq!(fetcher.request(" c ").await, FetchOutcome::Hide);
    }

    #[tokio::test]
    async fn test_shows_results() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(SUGGESTIONS_PATH))
            .and(query_param("q", "casco pro"))
            .respond_with(ResponseTemplate::new(200).set_body_json(casco()))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = fetcher(&server).request("  casco pro ").await;
        assert_eq!(
            outcome,
            FetchOutcome::Show(vec![Suggestion {
                value: "Casco Pro C1".to_string(),
                label: "Casco Pro • C1".to_string(),
            }])
        );
    }

    #[tokio::test]
    async fn test_empty_or_failed_response_hides() {
        let server = MockServer::start().await;
        Mock::given(query_param("q", "vacio"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;
        Mock::given(query_param("q", "roto"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(query_param("q", "raro"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let fetcher = fetcher(&server);
        assert_eq!(fetcher.request("vacio").await, FetchOutcome::Hide);
        assert_eq!(fetcher.request("roto").await, FetchOutcome::Hide);
        assert_eq!(fetcher.request("raro").await, FetchOutcome::Hide);
    }

    #[tokio::test]
    async fn test_newer_request_supersedes_older() {
        let server = MockServer::start().await;
        Mock::given(query_param("q", "cas"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(casco())
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;
        Mock::given(query_param("q", "casco"))
            .respond_with(ResponseTemplate::new(200).set_body_json(casco()))
            .mount(&server)
            .await;

        let fetcher = fetcher(&server);
        let slow = fetcher.clone();
        let first = tokio::spawn(async move { slow.request("cas").await });
        tokio::time::sleep(Duration::from_millis(100)).await;

        let second = fetcher.request("casco").await;

        assert_eq!(first.await.unwrap(), FetchOutcome::Superseded);
        assert!(matches!(second, FetchOutcome::Show(items) if items.len() == 1));
    }

    #[test]
    fn test_apply_outcome() {
        let doc = Document::new();
        let container = doc.append(doc.body(), &Markup::new("div").class("hidden"));
        let items = vec![Suggestion::for_product("Casco", None)];

        apply_outcome(&doc, container, &FetchOutcome::Show(items));
        assert!(!doc.has_class(container, "hidden"));
        assert!(doc.text_content(container).contains(render::REMOTE_SUGGESTIONS_HEADING));
        let links = doc.query_all(container, &Selector::Tag("a".to_string()));
        assert_eq!(links.len(), 1);

        apply_outcome(&doc, container, &FetchOutcome::Superseded);
        assert!(!doc.has_class(container, "hidden"));

        apply_outcome(&doc, container, &FetchOutcome::Hide);
        assert!(doc.has_class(container, "hidden"));
        assert!(doc.children(container).is_empty());
    }
}
