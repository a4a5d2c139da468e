//! The cart store.
//!
//! One [`CartStore`] per page, shared as `Rc<CartStore>` with every binder.
//! It hydrates lazily from [`CartStorage`] on first use, and every mutation
//! runs in the same order: update memory, persist the full list, notify
//! subscribers with a fresh snapshot.
//!
//! ## Cross-tab behavior
//!
//! [`CartStore::watch_storage`] reloads the cart when another context writes
//! the cart key. Two tabs writing in quick succession can lose one of the
//! writes: the last write wins and nothing is merged.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::{Rc, Weak};

use rust_decimal::Decimal;
use tienda_core::{CartInput, CartItem};
use tracing::{debug, warn};

use crate::dom::{Document, EventKind, ListenerId, Target};
use crate::storage::{CART_STORAGE_KEY, CartStorage};

/// Subscriber callback, called with a snapshot of the cart.
pub type Subscriber = Rc<dyn Fn(&[CartItem])>;

pub struct CartStore {
    storage: CartStorage,
    items: RefCell<Vec<CartItem>>,
    loaded: Cell<bool>,
    subscribers: RefCell<Vec<(u64, Subscriber)>>,
    next_subscriber: Cell<u64>,
}

impl fmt::Debug for CartStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CartStore")
            .field("items", &self.items.borrow())
            .field("loaded", &self.loaded.get())
            .field("subscribers", &self.subscribers.borrow().len())
            .finish_non_exhaustive()
    }
}

impl CartStore {
    #[must_use]
    pub fn new(storage: CartStorage) -> Rc<Self> {
        Rc::new(Self {
            storage,
            items: RefCell::new(Vec::new()),
            loaded: Cell::new(false),
            subscribers: RefCell::new(Vec::new()),
            next_subscriber: Cell::new(0),
        })
    }

    #[must_use]
    pub const fn storage(&self) -> &CartStorage {
        &self.storage
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Snapshot of the cart in insertion order.
    #[must_use]
    pub fn items(&self) -> Vec<CartItem> {
        self.ensure_loaded();
        self.items.borrow().clone()
    }

    /// Sum of price times quantity. Items with an unknown price add nothing.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.ensure_loaded();
        cart_total(&self.items.borrow())
    }

    /// Total number of units.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.ensure_loaded();
        cart_count(&self.items.borrow())
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add an item, or add its quantity to the existing line with the same id.
    ///
    /// Input without a usable id is ignored.
    pub fn add_item(&self, input: &CartInput) {
        let Some(item) = input.sanitize() else {
            debug!("Ignoring cart input without an id");
            return;
        };
        self.update(|items| match items.iter_mut().find(|existing| existing.id == item.id) {
            Some(existing) => {
                existing.quantity = existing.quantity.saturating_add(item.quantity);
            }
            None => items.push(item),
        });
    }

    pub fn increment_item(&self, id: &str) {
        if id.is_empty() {
            return;
        }
        self.update(|items| {
            if let Some(item) = items.iter_mut().find(|item| item.id == id) {
                item.quantity = item.quantity.saturating_add(1);
            }
        });
    }

    /// Take one unit off; the line goes away when it reaches zero.
    pub fn decrement_item(&self, id: &str) {
        if id.is_empty() {
            return;
        }
        self.update(|items| {
            let Some(index) = items.iter().position(|item| item.id == id) else {
                return;
            };
            let item = items.remove(index);
            if item.quantity > 1 {
                items.insert(
                    index,
                    CartItem {
                        quantity: item.quantity - 1,
                        ..item
                    },
                );
            }
        });
    }

    pub fn remove_item(&self, id: &str) {
        if id.is_empty() {
            return;
        }
        self.update(|items| items.retain(|item| item.id != id));
    }

    pub fn clear(&self) {
        self.update(Vec::clear);
    }

    /// Re-read the cart from storage and notify subscribers.
    pub fn reload(&self) {
        let items = self.storage.load();
        *self.items.borrow_mut() = items;
        self.loaded.set(true);
        self.notify();
    }

    // =========================================================================
    // Subscriptions
    // =========================================================================

    /// Register `callback`. It runs immediately with the current snapshot and
    /// again after every mutation, until the returned [`Subscription`] is
    /// dropped.
    pub fn subscribe(self: &Rc<Self>, callback: impl Fn(&[CartItem]) + 'static) -> Subscription {
        let id = self.next_subscriber.get() + 1;
        self.next_subscriber.set(id);
        let callback: Subscriber = Rc::new(callback);
        self.subscribers
            .borrow_mut()
            .push((id, Rc::clone(&callback)));

        let snapshot = self.items();
        call_subscriber(&callback, &snapshot);

        Subscription {
            store: Rc::downgrade(self),
            id,
        }
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().len()
    }

    /// Reload when another context changes the cart key.
    pub fn watch_storage(self: &Rc<Self>, doc: &Document) -> ListenerId {
        let store = Rc::downgrade(self);
        doc.add_listener(Target::Window, EventKind::Storage, move |_, event| {
            let touches_cart = event
                .storage_change()
                .is_some_and(|change| change.affects(CART_STORAGE_KEY));
            if let (true, Some(store)) = (touches_cart, store.upgrade()) {
                debug!("Cart changed in another context, reloading");
                store.reload();
            }
        })
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn ensure_loaded(&self) {
        if !self.loaded.get() {
            let items = self.storage.load();
            *self.items.borrow_mut() = items;
            self.loaded.set(true);
        }
    }

    /// Apply `mutate`, then persist and notify even when nothing changed.
    fn update(&self, mutate: impl FnOnce(&mut Vec<CartItem>)) {
        self.ensure_loaded();
        mutate(&mut self.items.borrow_mut());
        self.storage.save(&self.items.borrow());
        self.notify();
    }

    fn notify(&self) {
        let snapshot = self.items.borrow().clone();
        let subscribers: Vec<Subscriber> = self
            .subscribers
            .borrow()
            .iter()
            .map(|(_, callback)| Rc::clone(callback))
            .collect();
        for callback in subscribers {
            call_subscriber(&callback, &snapshot);
        }
    }

    fn unsubscribe(&self, id: u64) {
        self.subscribers.borrow_mut().retain(|(sid, _)| *sid != id);
    }
}

fn call_subscriber(callback: &Subscriber, snapshot: &[CartItem]) {
    if catch_unwind(AssertUnwindSafe(|| callback(snapshot))).is_err() {
        warn!("Cart subscriber panicked; continuing with the remaining subscribers");
    }
}

/// Sum of known line totals.
#[must_use]
pub fn cart_total(items: &[CartItem]) -> Decimal {
    items.iter().filter_map(CartItem::line_total).sum()
}

/// Sum of quantities.
#[must_use]
pub fn cart_count(items: &[CartItem]) -> u32 {
    items
        .iter()
        .fold(0_u32, |sum, item| sum.saturating_add(item.quantity))
}

/// Keeps a store subscription alive. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    store: Weak<CartStore>,
    id: u64,
}

impl Subscription {
    /// Unsubscribe now.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(store) = self.store.upgrade() {
            store.unsubscribe(self.id);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::{MemoryBackend, StorageArea};

    fn store() -> Rc<CartStore> {
        CartStore::new(CartStorage::new(StorageArea::memory()))
    }

    fn recorder(store: &Rc<CartStore>) -> (Rc<RefCell<Vec<Vec<CartItem>>>>, Subscription) {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&calls);
        let subscription = store.subscribe(move |items| sink.borrow_mut().push(items.to_vec()));
        (calls, subscription)
    }

    // =========================================================================
    // Mutation tests
    // =========================================================================

    #[test]
    fn test_add_merges_and_totals_exactly() {
        let store = store();
        store.add_item(&CartInput::with_id("sku1").name("Shirt").price(19.99).quantity(2_i64));
        store.add_item(&CartInput::with_id("sku1").quantity(1_i64));

        let items = store.items();
        assert_eq!(items.len(), 1);
        assert_eq!(items.first().unwrap().quantity, 3);
        assert_eq!(items.first().unwrap().name, "Shirt");
        assert_eq!(store.total(), Decimal::new(5997, 2));
        assert_eq!(store.item_count(), 3);
    }

    #[test]
    fn test_add_without_id_is_noop() {
        let store = store();
        let (calls, _sub) = recorder(&store);
        store.add_item(&CartInput::default().name("x"));
        assert!(store.items().is_empty());
        assert_eq!(calls.borrow().len(), 1);
    }

    #[test]
    fn test_unknown_price_contributes_zero() {
        let store = store();
        store.add_item(&CartInput::with_id("a").price(10_i64).quantity(2_i64));
        store.add_item(&CartInput::with_id("b").price("").quantity(5_i64));
        assert_eq!(store.total(), Decimal::from(20));
    }

    #[test]
    fn test_decrement_to_zero_removes() {
        let store = store();
        store.add_item(&CartInput::with_id("a").quantity(2_i64));
        store.decrement_item("a");
        assert_eq!(store.items().first().unwrap().quantity, 1);
        store.decrement_item("a");
        assert!(store.items().is_empty());
    }

    #[test]
    fn test_empty_id_does_not_notify() {
        let store = store();
        store.add_item(&CartInput::with_id("a"));
        let (calls, _sub) = recorder(&store);

        store.increment_item("");
        store.decrement_item("");
        store.remove_item("");

        assert_eq!(calls.borrow().len(), 1);
        assert_eq!(store.item_count(), 1);
    }

    #[test]
    fn test_missing_id_still_persists_and_notifies() {
        let storage = CartStorage::new(StorageArea::memory());
        let store = CartStore::new(storage.clone());
        store.add_item(&CartInput::with_id("a"));
        storage
            .area()
            .set_item(CART_STORAGE_KEY, "[]")
            .unwrap();
        let (calls, _sub) = recorder(&store);

        store.decrement_item("missing");
        store.remove_item("missing");

        assert_eq!(calls.borrow().len(), 3);
        assert_eq!(store.item_count(), 1);
        assert_eq!(storage.load().len(), 1);
    }

    #[test]
    fn test_quantity_never_drops_below_one() {
        let store = store();
        let assert_positive = |store: &CartStore| {
            assert!(store.items().iter().all(|item| item.quantity >= 1));
        };

        store.add_item(&CartInput::with_id("a").quantity(-4_i64));
        assert_positive(&store);
        store.decrement_item("a");
        assert_positive(&store);
        store.add_item(&CartInput::with_id("b").quantity("0"));
        assert_eq!(store.item_count(), 1);
        store.increment_item("b");
        store.decrement_item("b");
        store.decrement_item("b");
        assert_positive(&store);
        store.decrement_item("b");

        assert!(store.items().is_empty());
    }

    // =========================================================================
    // Subscription tests
    // =========================================================================

    #[test]
    fn test_subscribe_calls_immediately_then_per_mutation() {
        let store = store();
        store.add_item(&CartInput::with_id("a"));
        let (calls, _sub) = recorder(&store);

        store.increment_item("a");
        store.add_item(&CartInput::with_id("b"));
        store.clear();

        let counts: Vec<u32> = calls.borrow().iter().map(|items| cart_count(items)).collect();
        assert_eq!(counts, [1, 2, 3, 0]);
    }

    #[test]
    fn test_dropping_subscription_unsubscribes() {
        let store = store();
        let (calls, sub) = recorder(&store);
        assert_eq!(store.subscriber_count(), 1);

        sub.unsubscribe();
        store.add_item(&CartInput::with_id("a"));

        assert_eq!(store.subscriber_count(), 0);
        assert_eq!(calls.borrow().len(), 1);
    }

    #[test]
    fn test_panicking_subscriber_is_isolated() {
        let store = store();
        let _bad = store.subscribe(|items| {
            assert!(items.is_empty(), "subscriber failure");
        });
        let (calls, _sub) = recorder(&store);

        store.add_item(&CartInput::with_id("a"));

        assert_eq!(calls.borrow().len(), 2);
        assert_eq!(store.item_count(), 1);
    }

    // =========================================================================
    // Persistence tests
    // =========================================================================

    #[test]
    fn test_round_trip_through_storage() {
        let area = StorageArea::memory();
        let first = CartStore::new(CartStorage::new(area.clone()));
        first.add_item(
            &CartInput::with_id("sku1")
                .name("Shirt")
                .price(19.99)
                .quantity(2_i64)
                .image("/img/shirt.png")
                .url("/tienda/shirt"),
        );
        first.add_item(&CartInput::with_id(42_i64).price("abc"));

        let second = CartStore::new(CartStorage::new(area));
        assert_eq!(second.items(), first.items());
    }

    #[test]
    fn test_malformed_storage_loads_empty() {
        let area = StorageArea::memory();
        area.set_item(CART_STORAGE_KEY, "not json").unwrap();
        let store = CartStore::new(CartStorage::new(area));
        assert!(store.items().is_empty());
    }

    #[test]
    fn test_failed_persist_keeps_memory_state() {
        let backend = MemoryBackend::with_quota(8);
        let store = CartStore::new(CartStorage::new(StorageArea::new(backend)));
        let (calls, _sub) = recorder(&store);

        store.add_item(&CartInput::with_id("a"));

        assert_eq!(store.item_count(), 1);
        assert_eq!(calls.borrow().len(), 2);
    }

    #[test]
    fn test_storage_event_from_other_tab_reloads() {
        let first_doc = Document::new();
        let second_doc = Document::with_storage(first_doc.storage().open_context());
        let first = CartStore::new(CartStorage::new(first_doc.storage().clone()));
        let second = CartStore::new(CartStorage::new(second_doc.storage().clone()));
        second.watch_storage(&second_doc);
        let (calls, _sub) = recorder(&second);

        first.add_item(&CartInput::with_id("a").quantity(4_i64));
        assert_eq!(second.item_count(), 0);

        second_doc.deliver_storage_events();

        assert_eq!(second.item_count(), 4);
        assert_eq!(calls.borrow().len(), 2);
    }

    #[test]
    fn test_last_write_wins_across_tabs() {
        let area = StorageArea::memory();
        let first = CartStore::new(CartStorage::new(area.clone()));
        let second = CartStore::new(CartStorage::new(area.open_context()));
        assert_eq!(first.item_count(), 0);
        assert_eq!(second.item_count(), 0);

        first.add_item(&CartInput::with_id("a"));
        second.add_item(&CartInput::with_id("b"));

        let reloaded = CartStore::new(CartStorage::new(area));
        let ids: Vec<String> = reloaded.items().into_iter().map(|item| item.id).collect();
        assert_eq!(ids, ["b"]);
    }
}
