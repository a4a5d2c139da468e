//! Search suggestion record shared by the suggestions endpoint and its
//! clients.

use serde::{Deserialize, Serialize};

/// One autocomplete entry.
///
/// `value` is what gets searched for; `label` is what gets shown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub value: String,
    pub label: String,
}

impl Suggestion {
    /// Build the suggestion for a product name and optional product code.
    ///
    /// ```
    /// use tienda_core::Suggestion;
    ///
    /// let s = Suggestion::for_product("Casco", Some("CX-1"));
    /// assert_eq!(s.value, "Casco CX-1");
    /// assert_eq!(s.label, "Casco • CX-1");
    /// ```
    #[must_use]
    pub fn for_product(name: &str, code: Option<&str>) -> Self {
        match code.filter(|c| !c.is_empty()) {
            Some(code) => Self {
                value: format!("{name} {code}"),
                label: format!("{name} • {code}"),
            },
            None => Self {
                value: name.to_string(),
                label: name.to_string(),
            },
        }
    }
}
