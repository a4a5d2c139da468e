//! Checkout summary binder.
//!
//! Binds the `[data-checkout-root]` container once (marked with
//! `data-checkout-ready` until teardown) and keeps its line list, subtotal,
//! unit count and proceed button in sync with the store.

use std::rc::Rc;

use tienda_core::{CartItem, format_money};

use crate::dom::{Document, ElementId, EventKind, ListenerId, Selector};
use crate::render;
use crate::store::{CartStore, Subscription, cart_count, cart_total};

pub const CHECKOUT_ROOT_ATTRIBUTE: &str = "data-checkout-root";
const READY_ATTRIBUTE: &str = "data-checkout-ready";
const PROCEED_DISABLED_CLASSES: [&str; 2] = ["opacity-60", "cursor-not-allowed"];

#[derive(Debug, Clone, Copy)]
struct CheckoutParts {
    list: Option<ElementId>,
    empty: Option<ElementId>,
    subtotal: Option<ElementId>,
    count: Option<ElementId>,
    proceed: Option<ElementId>,
}

impl CheckoutParts {
    fn render(self, doc: &Document, items: &[CartItem]) {
        if let Some(subtotal) = self.subtotal {
            doc.set_text(subtotal, &format_money(Some(cart_total(items))));
        }
        if let Some(count_el) = self.count {
            let count = cart_count(items);
            let noun = if count == 1 { "artículo" } else { "artículos" };
            doc.set_text(count_el, &format!("{count} {noun}"));
        }

        let (Some(list), Some(empty)) = (self.list, self.empty) else {
            return;
        };

        doc.clear_children(list);
        if items.is_empty() {
            doc.remove_class(empty, "hidden");
            doc.add_class(list, "hidden");
            if let Some(proceed) = self.proceed {
                doc.set_attribute(proceed, "disabled", "");
                for class in PROCEED_DISABLED_CLASSES {
                    doc.add_class(proceed, class);
                }
            }
            return;
        }

        doc.add_class(empty, "hidden");
        doc.remove_class(list, "hidden");
        for item in items {
            doc.append(list, &render::checkout_line(item));
        }
        if let Some(proceed) = self.proceed {
            doc.remove_attribute(proceed, "disabled");
            for class in PROCEED_DISABLED_CLASSES {
                doc.remove_class(proceed, class);
            }
        }
    }
}

/// A bound checkout summary.
#[derive(Debug)]
pub struct CheckoutView {
    container: ElementId,
    clear_listener: Option<ListenerId>,
    subscription: Subscription,
}

impl CheckoutView {
    /// Bind the checkout container found under `scope`.
    ///
    /// Returns `None` when there is no container or it is already bound.
    /// List and empty marker are looked up inside the container; subtotal,
    /// count, clear and proceed anywhere under `scope`.
    pub fn mount(doc: &Document, store: &Rc<CartStore>, scope: ElementId) -> Option<Self> {
        let container = doc.query(scope, &Selector::attr(CHECKOUT_ROOT_ATTRIBUTE))?;
        if doc.has_attribute(container, READY_ATTRIBUTE) {
            return None;
        }
        doc.set_attribute(container, READY_ATTRIBUTE, "true");

        let inside = |attr: &str| doc.query(container, &Selector::attr(attr));
        let anywhere = |attr: &str| doc.query(scope, &Selector::attr(attr));
        let parts = CheckoutParts {
            list: inside("data-checkout-list"),
            empty: inside("data-checkout-empty"),
            subtotal: anywhere("data-checkout-subtotal"),
            count: anywhere("data-checkout-count"),
            proceed: anywhere("data-checkout-proceed"),
        };

        let clear_listener = anywhere("data-checkout-clear").map(|clear| {
            let store = Rc::downgrade(store);
            doc.add_listener(clear, EventKind::Click, move |_, event| {
                event.prevent_default();
                if let Some(store) = store.upgrade() {
                    store.clear();
                }
            })
        });

        let render_doc = doc.clone();
        let subscription = store.subscribe(move |items| parts.render(&render_doc, items));

        Some(Self {
            container,
            clear_listener,
            subscription,
        })
    }

    #[must_use]
    pub const fn container(&self) -> ElementId {
        self.container
    }

    /// Unsubscribe, drop the clear listener and release the ready marker.
    pub fn teardown(self, doc: &Document) {
        self.subscription.unsubscribe();
        if let Some(listener) = self.clear_listener {
            doc.remove_listener(listener);
        }
        doc.remove_attribute(self.container, READY_ATTRIBUTE);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tienda_core::CartInput;

    use super::*;
    use crate::dom::Markup;
    use crate::storage::CartStorage;

    fn page(doc: &Document) -> ElementId {
        doc.append(
            doc.body(),
            &Markup::new("main")
                .child(
                    Markup::new("section")
                        .attr(CHECKOUT_ROOT_ATTRIBUTE, "")
                        .child(Markup::new("ul").attr("data-checkout-list", ""))
                        .child(Markup::new("p").attr("data-checkout-empty", "").class("hidden")),
                )
                .child(
                    Markup::new("aside")
                        .child(Markup::new("span").attr("data-checkout-subtotal", ""))
                        .child(Markup::new("span").attr("data-checkout-count", ""))
                        .child(Markup::new("button").attr("data-checkout-clear", ""))
                        .child(Markup::new("button").attr("data-checkout-proceed", "")),
                ),
        )
    }

    fn find(doc: &Document, attr: &str) -> ElementId {
        doc.query(doc.body(), &Selector::attr(attr)).unwrap()
    }

    #[test]
    fn test_empty_checkout() {
        let doc = Document::new();
        let store = CartStore::new(CartStorage::new(doc.storage().clone()));
        page(&doc);
        let _view = CheckoutView::mount(&doc, &store, doc.body()).unwrap();

        assert_eq!(doc.text_content(find(&doc, "data-checkout-subtotal")), "US$ 0.00");
        assert_eq!(doc.text_content(find(&doc, "data-checkout-count")), "0 artículos");
        assert!(!doc.has_class(find(&doc, "data-checkout-empty"), "hidden"));
        let proceed = find(&doc, "data-checkout-proceed");
        assert!(doc.has_attribute(proceed, "disabled"));
        assert!(doc.has_class(proceed, "cursor-not-allowed"));
    }

    #[test]
    fn test_checkout_lines_follow_store() {
        let doc = Document::new();
        let store = CartStore::new(CartStorage::new(doc.storage().clone()));
        page(&doc);
        let _view = CheckoutView::mount(&doc, &store, doc.body()).unwrap();

        store.add_item(&CartInput::with_id("a").name("Casco").price(40_i64));
        assert_eq!(doc.text_content(find(&doc, "data-checkout-count")), "1 artículo");
        store.add_item(&CartInput::with_id("b").quantity(2_i64));

        let list = find(&doc, "data-checkout-list");
        assert_eq!(doc.children(list).len(), 2);
        assert_eq!(doc.text_content(find(&doc, "data-checkout-subtotal")), "US$ 40.00");
        assert_eq!(doc.text_content(find(&doc, "data-checkout-count")), "3 artículos");
        let proceed = find(&doc, "data-checkout-proceed");
        assert!(!doc.has_attribute(proceed, "disabled"));
        assert!(!doc.has_class(proceed, "opacity-60"));

        doc.click(find(&doc, "data-checkout-clear"));
        assert!(store.items().is_empty());
        assert!(doc.children(list).is_empty());
    }

    #[test]
    fn test_binds_once_until_teardown() {
        let doc = Document::new();
        let store = CartStore::new(CartStorage::new(doc.storage().clone()));
        page(&doc);

        let view = CheckoutView::mount(&doc, &store, doc.body()).unwrap();
        assert!(CheckoutView::mount(&doc, &store, doc.body()).is_none());
        assert_eq!(store.subscriber_count(), 1);

        view.teardown(&doc);
        assert_eq!(store.subscriber_count(), 0);
        assert_eq!(doc.listener_count(), 0);
        assert!(!doc.has_attribute(find(&doc, CHECKOUT_ROOT_ATTRIBUTE), "data-checkout-ready"));
        assert!(CheckoutView::mount(&doc, &store, doc.body()).is_some());
    }

    #[test]
    fn test_no_container() {
        let doc = Document::new();
        let store = CartStore::new(CartStorage::new(doc.storage().clone()));
        assert!(CheckoutView::mount(&doc, &store, doc.body()).is_none());
    }
}
