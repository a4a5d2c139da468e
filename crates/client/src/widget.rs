//! The cart widget: a toggle button and a collapsible panel.
//!
//! Markup contract, all inside the `[data-cart-widget]` element:
//!
//! ```text
//! [data-cart-toggle]     required, opens/closes and pins the panel
//! [data-cart-panel]      required, hidden with the `hidden` class
//! [data-cart-count]      any number, receive the unit count
//! [data-cart-list]       line items, rebuilt on every change
//! [data-cart-empty]      shown when the cart is empty
//! [data-cart-footer]     shown when the cart has items
//! [data-cart-total]      formatted total
//! [data-cart-clear]      empties the cart
//! [data-cart-close]      closes the panel
//! [data-cart-checkout]   disabled while the cart is empty
//! [data-hover-open]      on the widget: open on hover, close 220 ms after leaving
//! ```
//!
//! A bound widget carries `data-cart-ready` until teardown; mounting it again
//! in the meantime is a no-op.
//!
//! The panel opens on a toggle click (pinned) or on a `cart:open-request`
//! signal (not pinned). It closes on a second toggle click, a click outside
//! the widget other than on an add-to-cart button, Escape, the close button or, for hover widgets, once the
//! pointer has been away for the close delay. A pinned panel ignores the
//! hover delay. Closing always unpins.

use std::cell::Cell;
use std::rc::{Rc, Weak};

use tienda_core::CartItem;
use tracing::debug;

use crate::actions::ActionKind;
use crate::dom::{Document, ElementId, EventKind, ListenerId, Selector, Target, TimerId};
use crate::render;
use crate::store::{CartStore, Subscription, cart_count, cart_total};

pub const WIDGET_ATTRIBUTE: &str = "data-cart-widget";
const READY_ATTRIBUTE: &str = "data-cart-ready";

/// Signal asking every mounted widget to reveal itself.
pub const OPEN_REQUEST_EVENT: &str = "cart:open-request";

/// Delay before a hover widget closes after the pointer leaves.
pub const HOVER_CLOSE_DELAY_MS: u64 = 220;

const BUMP_CLASS: &str = "cart-widget-bump";
const CHECKOUT_DISABLED_CLASSES: [&str; 2] = ["pointer-events-none", "opacity-50"];

/// Elements a widget renders into.
#[derive(Debug, Clone)]
struct Parts {
    widget: ElementId,
    panel: ElementId,
    toggle: ElementId,
    counts: Vec<ElementId>,
    list: Option<ElementId>,
    empty: Option<ElementId>,
    footer: Option<ElementId>,
    total: Option<ElementId>,
    checkout: Option<ElementId>,
}

#[derive(Debug)]
struct WidgetState {
    parts: Parts,
    open: Cell<bool>,
    pinned: Cell<bool>,
    hover_timer: Cell<Option<TimerId>>,
    previous_count: Cell<u32>,
}

impl WidgetState {
    fn open(&self, doc: &Document) {
        if self.open.get() {
            return;
        }
        doc.remove_class(self.parts.panel, "hidden");
        doc.set_attribute(self.parts.toggle, "aria-expanded", "true");
        doc.set_attribute(self.parts.widget, "data-open", "true");
        self.open.set(true);
    }

    fn close(&self, doc: &Document) {
        if !self.open.get() {
            return;
        }
        doc.add_class(self.parts.panel, "hidden");
        doc.set_attribute(self.parts.toggle, "aria-expanded", "false");
        doc.remove_attribute(self.parts.widget, "data-open");
        self.open.set(false);
        self.pinned.set(false);
    }

    fn pointer_inside(&self, doc: &Document) -> bool {
        doc.is_hovered(self.parts.widget) || doc.is_hovered(self.parts.panel)
    }

    fn cancel_hover_close(&self, doc: &Document) {
        if let Some(timer) = self.hover_timer.take() {
            doc.clear_timeout(timer);
        }
    }

    fn render(&self, doc: &Document, items: &[CartItem]) {
        let parts = &self.parts;
        let count = cart_count(items);

        if count > self.previous_count.get() {
            doc.remove_class(parts.toggle, BUMP_CLASS);
            doc.add_class(parts.toggle, BUMP_CLASS);
        }
        self.previous_count.set(count);

        for element in &parts.counts {
            doc.set_text(*element, &count.to_string());
        }
        let noun = if count == 1 { "producto" } else { "productos" };
        doc.set_attribute(
            parts.toggle,
            "aria-label",
            &format!("Abrir carrito ({count} {noun})"),
        );

        let (Some(list), Some(empty), Some(footer), Some(total)) =
            (parts.list, parts.empty, parts.footer, parts.total)
        else {
            return;
        };

        doc.clear_children(list);
        if items.is_empty() {
            doc.remove_class(empty, "hidden");
            doc.add_class(list, "hidden");
            doc.add_class(footer, "hidden");
            doc.set_text(total, &render::total_label(rust_decimal::Decimal::ZERO));
            if let Some(checkout) = parts.checkout {
                for class in CHECKOUT_DISABLED_CLASSES {
                    doc.add_class(checkout, class);
                }
                doc.set_attribute(checkout, "aria-disabled", "true");
            }
            return;
        }

        doc.add_class(empty, "hidden");
        doc.remove_class(list, "hidden");
        doc.remove_class(footer, "hidden");
        for item in items {
            doc.append(list, &render::mini_cart_line(item));
        }
        doc.set_text(total, &render::total_label(cart_total(items)));
        if let Some(checkout) = parts.checkout {
            for class in CHECKOUT_DISABLED_CLASSES {
                doc.remove_class(checkout, class);
            }
            doc.set_attribute(checkout, "aria-disabled", "false");
        }
    }
}

/// Close after the hover delay unless pinned; re-arm while the pointer is
/// still over the widget.
fn schedule_hover_close(doc: &Document, state: &Rc<WidgetState>) {
    if state.pinned.get() {
        return;
    }
    state.cancel_hover_close(doc);
    let weak = Rc::downgrade(state);
    let timer = doc.set_timeout(HOVER_CLOSE_DELAY_MS, move |doc| {
        let Some(state) = weak.upgrade() else {
            return;
        };
        state.hover_timer.set(None);
        if state.pointer_inside(doc) {
            schedule_hover_close(doc, &state);
        } else {
            state.close(doc);
        }
    });
    state.hover_timer.set(Some(timer));
}

/// A mounted cart widget. Call [`teardown`](Self::teardown) before the page
/// goes away.
#[derive(Debug)]
pub struct CartWidget {
    state: Rc<WidgetState>,
    listeners: Vec<ListenerId>,
    subscription: Subscription,
}

impl CartWidget {
    /// Bind the widget rooted at `widget`.
    ///
    /// Returns `None` when the panel or the toggle is missing, or when the
    /// widget is already bound.
    pub fn mount(doc: &Document, store: &Rc<CartStore>, widget: ElementId) -> Option<Self> {
        if doc.has_attribute(widget, READY_ATTRIBUTE) {
            debug!(?widget, "Cart widget already bound");
            return None;
        }
        let find = |attr: &str| doc.query(widget, &Selector::attr(attr));
        let (Some(panel), Some(toggle)) = (find("data-cart-panel"), find("data-cart-toggle")) else {
            debug!(?widget, "Cart widget without panel or toggle, skipping");
            return None;
        };

        let parts = Parts {
            widget,
            panel,
            toggle,
            counts: doc.query_all(widget, &Selector::attr("data-cart-count")),
            list: find("data-cart-list"),
            empty: find("data-cart-empty"),
            footer: find("data-cart-footer"),
            total: find("data-cart-total"),
            checkout: find("data-cart-checkout"),
        };
        let clear_button = find("data-cart-clear");
        let close_button = find("data-cart-close");
        let hover_open = doc.has_attribute(widget, "data-hover-open") && doc.hover_capable();
        doc.set_attribute(widget, READY_ATTRIBUTE, "true");

        let state = Rc::new(WidgetState {
            parts,
            open: Cell::new(false),
            pinned: Cell::new(false),
            hover_timer: Cell::new(None),
            previous_count: Cell::new(store.item_count()),
        });

        let mut listeners = Vec::new();

        let s = Rc::clone(&state);
        listeners.push(doc.add_listener(toggle, EventKind::Click, move |doc, event| {
            event.prevent_default();
            if s.open.get() {
                s.close(doc);
            } else {
                s.open(doc);
                s.pinned.set(true);
                s.cancel_hover_close(doc);
            }
        }));

        let s = Rc::clone(&state);
        let add_to_cart = ActionKind::AddToCart.selector();
        listeners.push(doc.add_listener(Target::Document, EventKind::Click, move |doc, event| {
            if !s.open.get() || s.pointer_inside(doc) || event.path_contains(s.parts.widget) {
                return;
            }
            // Adding a product asks the panel to open; keep it that way
            let adds_to_cart = event
                .target_element()
                .and_then(|target| doc.closest(target, &add_to_cart))
                .is_some();
            if !adds_to_cart {
                s.close(doc);
            }
        }));

        let s = Rc::clone(&state);
        listeners.push(doc.add_listener(Target::Document, EventKind::KeyDown, move |doc, event| {
            if event.key() == Some("Escape") {
                s.close(doc);
            }
        }));

        let s = Rc::clone(&state);
        listeners.push(doc.add_listener(
            Target::Document,
            EventKind::custom(OPEN_REQUEST_EVENT),
            move |doc, _| s.open(doc),
        ));

        if hover_open {
            for element in [widget, panel] {
                let s = Rc::clone(&state);
                listeners.push(doc.add_listener(element, EventKind::MouseEnter, move |doc, _| {
                    s.cancel_hover_close(doc);
                    s.open(doc);
                }));
                let s = Rc::clone(&state);
                listeners.push(doc.add_listener(element, EventKind::MouseLeave, move |doc, _| {
                    schedule_hover_close(doc, &s);
                }));
            }
        }

        if let Some(clear) = clear_button {
            let store: Weak<CartStore> = Rc::downgrade(store);
            listeners.push(doc.add_listener(clear, EventKind::Click, move |_, event| {
                event.prevent_default();
                if let Some(store) = store.upgrade() {
                    store.clear();
                }
            }));
        }

        if let Some(close) = close_button {
            let s = Rc::clone(&state);
            listeners.push(doc.add_listener(close, EventKind::Click, move |doc, event| {
                event.prevent_default();
                s.close(doc);
            }));
        }

        let s = Rc::clone(&state);
        let render_doc = doc.clone();
        let subscription = store.subscribe(move |items| s.render(&render_doc, items));

        Some(Self {
            state,
            listeners,
            subscription,
        })
    }

    #[must_use]
    pub fn element(&self) -> ElementId {
        self.state.parts.widget
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state.open.get()
    }

    #[must_use]
    pub fn is_pinned(&self) -> bool {
        self.state.pinned.get()
    }

    /// Remove every listener, cancel a pending hover close, unsubscribe and
    /// release the ready marker.
    pub fn teardown(self, doc: &Document) {
        for listener in &self.listeners {
            doc.remove_listener(*listener);
        }
        self.state.cancel_hover_close(doc);
        self.subscription.unsubscribe();
        doc.remove_attribute(self.state.parts.widget, READY_ATTRIBUTE);
    }
}
