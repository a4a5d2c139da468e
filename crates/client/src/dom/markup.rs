//! Element builder.

/// Description of an element subtree, materialized with
/// [`Document::append`](super::Document::append).
///
/// ```
/// use tienda_client::dom::{Document, Markup};
///
/// let doc = Document::new();
/// let button = doc.append(
///     doc.body(),
///     &Markup::new("button")
///         .attr("data-cart-toggle", "")
///         .class("rounded-full px-3")
///         .text("Carrito"),
/// );
/// assert!(doc.has_class(button, "rounded-full"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Markup {
    pub(super) tag: String,
    pub(super) attributes: Vec<(String, String)>,
    pub(super) classes: Vec<String>,
    pub(super) text: String,
    pub(super) children: Vec<Self>,
}

impl Markup {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            ..Self::default()
        }
    }

    /// Set an attribute. `class` is routed to the class list.
    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        if name == "class" {
            return self.class(&value);
        }
        match self.attributes.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name, value)),
        }
        self
    }

    /// Add whitespace-separated classes.
    #[must_use]
    pub fn class(mut self, classes: &str) -> Self {
        for class in classes.split_whitespace() {
            if !self.classes.iter().any(|c| c == class) {
                self.classes.push(class.to_string());
            }
        }
        self
    }

    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    #[must_use]
    pub fn child(mut self, child: Self) -> Self {
        self.children.push(child);
        self
    }

    #[must_use]
    pub fn children(mut self, children: impl IntoIterator<Item = Self>) -> Self {
        self.children.extend(children);
        self
    }
}
