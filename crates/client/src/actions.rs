//! Delegated cart actions.
//!
//! One document-level click listener serves every add-to-cart button and
//! every line control on the page, including lines rendered after binding.
//! The marker attributes are resolved into an [`ActionTable`] once, when the
//! listener is bound; each click then resolves to at most one [`CartAction`].

use std::rc::Rc;

use tienda_core::{CartInput, Loose, parse_price};
use tracing::debug;

use crate::dom::{Document, ElementId, EventKind, ListenerId, Selector, Target};
use crate::store::CartStore;
use crate::widget::OPEN_REQUEST_EVENT;

/// The kinds of delegated action, in matching priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    AddToCart,
    Decrement,
    Increment,
    Remove,
}

impl ActionKind {
    pub const ALL: [Self; 4] = [Self::AddToCart, Self::Decrement, Self::Increment, Self::Remove];

    /// Marker attribute identifying a trigger of this kind.
    #[must_use]
    pub const fn attribute(self) -> &'static str {
        match self {
            Self::AddToCart => "data-action",
            Self::Decrement => "data-cart-decrement",
            Self::Increment => "data-cart-increment",
            Self::Remove => "data-cart-remove",
        }
    }

    #[must_use]
    pub fn selector(self) -> Selector {
        match self {
            Self::AddToCart => Selector::attr_eq(self.attribute(), "add-to-cart"),
            _ => Selector::attr(self.attribute()),
        }
    }
}

/// A resolved click.
#[derive(Debug, Clone, PartialEq)]
pub enum CartAction {
    Add(CartInput),
    Decrement(String),
    Increment(String),
    Remove(String),
}

impl CartAction {
    /// Apply the action to the store.
    pub fn apply(&self, store: &CartStore) {
        match self {
            Self::Add(input) => store.add_item(input),
            Self::Decrement(id) => store.decrement_item(id),
            Self::Increment(id) => store.increment_item(id),
            Self::Remove(id) => store.remove_item(id),
        }
    }
}

/// Kind/selector pairs, checked in order.
#[derive(Debug, Clone)]
pub struct ActionTable {
    entries: Vec<(ActionKind, Selector)>,
}

impl Default for ActionTable {
    fn default() -> Self {
        Self {
            entries: ActionKind::ALL
                .into_iter()
                .map(|kind| (kind, kind.selector()))
                .collect(),
        }
    }
}

impl ActionTable {
    /// Resolve a click on `target`.
    ///
    /// Add-to-cart wins whenever a trigger is found, even one without an id.
    /// The line controls need a non-empty id; an empty one falls through to
    /// the next kind.
    #[must_use]
    pub fn resolve(&self, doc: &Document, target: ElementId) -> Option<CartAction> {
        for (kind, selector) in &self.entries {
            let Some(trigger) = doc.closest(target, selector) else {
                continue;
            };
            if *kind == ActionKind::AddToCart {
                return Some(CartAction::Add(read_product(doc, trigger)));
            }
            let id = doc.attribute(trigger, kind.attribute()).unwrap_or_default();
            if id.is_empty() {
                continue;
            }
            return Some(match kind {
                ActionKind::Decrement => CartAction::Decrement(id),
                ActionKind::Increment => CartAction::Increment(id),
                ActionKind::AddToCart | ActionKind::Remove => CartAction::Remove(id),
            });
        }
        None
    }
}

/// Read `data-product-*` attributes from an add-to-cart trigger.
///
/// An empty or non-numeric price means the price is unknown.
fn read_product(doc: &Document, trigger: ElementId) -> CartInput {
    let attr = |name: &str| doc.attribute(trigger, name).map(Loose::Text);
    let price = doc
        .attribute(trigger, "data-product-price")
        .and_then(|raw| parse_price(&raw))
        .map(|price| Loose::Text(price.to_string()));

    CartInput {
        id: attr("data-product-id"),
        name: attr("data-product-name"),
        price,
        quantity: None,
        image: attr("data-product-image"),
        url: attr("data-product-url"),
    }
}

/// Bind the delegated click listener.
///
/// Recognized clicks have their default prevented; an add also broadcasts
/// `cart:open-request` so mounted widgets reveal the cart.
pub fn bind_actions(doc: &Document, store: &Rc<CartStore>) -> ListenerId {
    let table = ActionTable::default();
    let store = Rc::downgrade(store);

    doc.add_listener(Target::Document, EventKind::Click, move |doc, event| {
        let Some(target) = event.target_element() else {
            return;
        };
        let Some(action) = table.resolve(doc, target) else {
            return;
        };
        let Some(store) = store.upgrade() else {
            return;
        };

        event.prevent_default();
        debug!(?action, "Cart action");
        action.apply(&store);
        if matches!(action, CartAction::Add(_)) {
            doc.dispatch_custom(Target::Document, OPEN_REQUEST_EVENT);
        }
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::Cell;

    use rust_decimal::Decimal;

    use super::*;
    use crate::dom::Markup;
    use crate::storage::CartStorage;

    fn setup() -> (Document, Rc<CartStore>) {
        let doc = Document::new();
        let store = CartStore::new(CartStorage::new(doc.storage().clone()));
        bind_actions(&doc, &store);
        (doc, store)
    }

    fn add_button(doc: &Document, id: &str, price: &str) -> ElementId {
        let button = doc.append(
            doc.body(),
            &Markup::new("button")
                .attr("data-action", "add-to-cart")
                .attr("data-product-id", id)
                .attr("data-product-name", "Casco")
                .attr("data-product-price", price)
                .attr("data-product-image", "/img/casco.png")
                .attr("data-product-url", "/tienda/casco")
                .child(Markup::new("span").text("Agregar")),
        );
        doc.query(button, &Selector::Tag("span".to_string())).unwrap()
    }

    #[test]
    fn test_add_to_cart_from_nested_element() {
        let (doc, store) = setup();
        let opened = Rc::new(Cell::new(0));
        let counter = Rc::clone(&opened);
        doc.add_listener(Target::Document, EventKind::custom(OPEN_REQUEST_EVENT), move |_, _| {
            counter.set(counter.get() + 1);
        });
        let label = add_button(&doc, "sku-9", "12.50");

        let event = doc.click(label);
        doc.click(label);

        assert!(event.default_prevented());
        let items = store.items();
        assert_eq!(items.len(), 1);
        let item = items.first().unwrap();
        assert_eq!(item.quantity, 2);
        assert_eq!(item.price, Some(Decimal::new(1250, 2)));
        assert_eq!(item.url, "/tienda/casco");
        assert_eq!(opened.get(), 2);
    }

    #[test]
    fn test_empty_price_is_unknown() {
        let (doc, store) = setup();
        doc.click(add_button(&doc, "a", ""));
        doc.click(add_button(&doc, "b", "consultar"));
        assert!(store.items().iter().all(|item| item.price.is_none()));
    }

    #[test]
    fn test_add_without_id_is_still_handled() {
        let (doc, store) = setup();
        let event = doc.click(add_button(&doc, "", "1"));
        assert!(event.default_prevented());
        assert!(store.items().is_empty());
    }

    #[test]
    fn test_line_controls() {
        let (doc, store) = setup();
        store.add_item(&tienda_core::CartInput::with_id("a").quantity(2_i64));
        let controls = doc.append(
            doc.body(),
            &Markup::new("div")
                .child(Markup::new("button").attr("data-cart-increment", "a"))
                .child(Markup::new("button").attr("data-cart-decrement", "a"))
                .child(Markup::new("button").attr("data-cart-remove", "a")),
        );
        let [inc, dec, rm]: [ElementId; 3] = doc.children(controls).try_into().unwrap();

        doc.click(inc);
        assert_eq!(store.item_count(), 3);
        doc.click(dec);
        assert_eq!(store.item_count(), 2);
        doc.click(rm);
        assert!(store.items().is_empty());
    }

    #[test]
    fn test_empty_marker_falls_through_to_next_kind() {
        let (doc, store) = setup();
        store.add_item(&tienda_core::CartInput::with_id("a"));
        let outer = doc.append(
            doc.body(),
            &Markup::new("div")
                .attr("data-cart-increment", "a")
                .child(Markup::new("button").attr("data-cart-decrement", "")),
        );
        let inner = doc.children(outer).into_iter().next().unwrap();

        doc.click(inner);

        assert_eq!(store.item_count(), 2);
    }

    #[test]
    fn test_unrecognized_click_is_ignored() {
        let (doc, _store) = setup();
        let plain = doc.append(doc.body(), &Markup::new("a").attr("href", "/tienda"));
        assert!(!doc.click(plain).default_prevented());
    }

    #[test]
    fn test_action_table_priority() {
        let doc = Document::new();
        let nested = doc.append(
            doc.body(),
            &Markup::new("div")
                .attr("data-action", "add-to-cart")
                .attr("data-product-id", "x")
                .child(Markup::new("button").attr("data-cart-remove", "y")),
        );
        let button = doc.children(nested).into_iter().next().unwrap();

        let action = ActionTable::default().resolve(&doc, button).unwrap();
        assert!(matches!(action, CartAction::Add(_)));
    }
}
