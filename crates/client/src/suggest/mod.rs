//! Search suggestions: local filtering over page data, and remote lookups
//! against the storefront's suggestions endpoint.

mod local;
mod remote;

pub use local::{
    BLUR_HIDE_DELAY_MS, CONTAINER_ID, DATA_ID, FORM_ID, INPUT_ID, LIST_ID, SuggestionBox,
    SuggestionOptions, filter_candidates, parse_candidates,
};
pub use remote::{
    FetchOutcome, MIN_QUERY_CHARS, SUGGESTIONS_PATH, SuggestionFetcher, apply_outcome,
};
