//! Search suggestions endpoint.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use tienda_core::Suggestion;
use tracing::instrument;

use crate::state::AppState;

/// Suggestion query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct SuggestionQuery {
    #[serde(default)]
    pub q: String,
}

/// Return autocomplete entries for `?q=` as a JSON array.
///
/// Always answers 200; CMS failures yield an empty array.
#[instrument(skip(state))]
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SuggestionQuery>,
) -> Json<Vec<Suggestion>> {
    let limit = state.config().suggestions_limit;
    Json(state.cms().search_suggestions(&query.q, limit).await)
}
