//! Page runtime: wires the store and every binder into one document.
//!
//! The storefront navigates client-side. Before the body is swapped the
//! document receives `page:before-swap`, after the new body is in place
//! `page:load`. Per-page binders (widgets, checkout, suggestion box, auth form) are torn
//! down on the first and mounted again on the second. The action dispatcher
//! and the storage watcher live on the document and are bound once.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use tracing::{debug, info};

use crate::actions::bind_actions;
use crate::auth::AuthForm;
use crate::checkout::CheckoutView;
use crate::dom::{Document, EventKind, ListenerId, Selector, Target};
use crate::session::{bind_auth_visibility, refresh_auth_visibility};
use crate::storage::CartStorage;
use crate::store::CartStore;
use crate::suggest::SuggestionBox;
use crate::widget::{CartWidget, WIDGET_ATTRIBUTE};

pub const PAGE_LOAD_EVENT: &str = "page:load";
pub const PAGE_BEFORE_SWAP_EVENT: &str = "page:before-swap";

/// The client runtime for one browsing context.
///
/// Cheap to clone; clones share the same store and binders.
#[derive(Clone)]
pub struct Storefront {
    inner: Rc<RuntimeInner>,
}

struct RuntimeInner {
    doc: Document,
    store: Rc<CartStore>,
    booted: Cell<bool>,
    actions: Cell<Option<ListenerId>>,
    document_listeners: RefCell<Vec<ListenerId>>,
    widgets: RefCell<Vec<CartWidget>>,
    checkout: RefCell<Option<CheckoutView>>,
    suggestions: RefCell<Option<SuggestionBox>>,
    auth_form: RefCell<Option<AuthForm>>,
}

impl std::fmt::Debug for Storefront {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storefront")
            .field("booted", &self.inner.booted.get())
            .field("widgets", &self.inner.widgets.borrow().len())
            .finish_non_exhaustive()
    }
}

impl Storefront {
    /// Create the runtime with a cart store over the document's storage.
    #[must_use]
    pub fn new(doc: Document) -> Self {
        let store = CartStore::new(CartStorage::new(doc.storage().clone()));
        Self {
            inner: Rc::new(RuntimeInner {
                doc,
                store,
                booted: Cell::new(false),
                actions: Cell::new(None),
                document_listeners: RefCell::new(Vec::new()),
                widgets: RefCell::new(Vec::new()),
                checkout: RefCell::new(None),
                suggestions: RefCell::new(None),
                auth_form: RefCell::new(None),
            }),
        }
    }

    #[must_use]
    pub fn document(&self) -> &Document {
        &self.inner.doc
    }

    #[must_use]
    pub fn store(&self) -> &Rc<CartStore> {
        &self.inner.store
    }

    #[must_use]
    pub fn widget_count(&self) -> usize {
        self.inner.widgets.borrow().len()
    }

    #[must_use]
    pub fn has_checkout(&self) -> bool {
        self.inner.checkout.borrow().is_some()
    }

    #[must_use]
    pub fn has_suggestions(&self) -> bool {
        self.inner.suggestions.borrow().is_some()
    }

    /// The login or registration form on the current page, if any.
    ///
    /// The host sends its queued submission with
    /// [`AuthForm::send_pending`].
    #[must_use]
    pub fn auth_form(&self) -> Option<AuthForm> {
        self.inner.auth_form.borrow().clone()
    }

    /// Bind everything for the current page. Calling it again is a no-op.
    pub fn boot(&self) {
        let inner = &self.inner;
        if inner.booted.replace(true) {
            return;
        }
        let doc = &inner.doc;

        if inner.actions.get().is_none() {
            inner.actions.set(Some(bind_actions(doc, &inner.store)));
        }

        let mut listeners = vec![inner.store.watch_storage(doc)];
        listeners.extend(bind_auth_visibility(doc));

        let weak = Rc::downgrade(inner);
        listeners.push(doc.add_listener(
            Target::Document,
            EventKind::custom(PAGE_LOAD_EVENT),
            move |doc, _| with_runtime(&weak, |runtime| {
                runtime.teardown_widgets();
                runtime.mount_page();
                refresh_auth_visibility(doc);
            }),
        ));

        let weak = Rc::downgrade(inner);
        listeners.push(doc.add_listener(
            Target::Document,
            EventKind::custom(PAGE_BEFORE_SWAP_EVENT),
            move |_, _| with_runtime(&weak, RuntimeInner::teardown_page),
        ));

        inner.document_listeners.borrow_mut().extend(listeners);
        inner.mount_page();
        info!(widgets = self.widget_count(), "Storefront booted");
    }

    /// Tear down every binder and document listener.
    pub fn shutdown(&self) {
        let inner = &self.inner;
        inner.teardown_page();
        for listener in inner.document_listeners.take() {
            inner.doc.remove_listener(listener);
        }
        if let Some(actions) = inner.actions.take() {
            inner.doc.remove_listener(actions);
        }
        inner.booted.set(false);
    }
}

fn with_runtime(weak: &Weak<RuntimeInner>, f: impl FnOnce(&RuntimeInner)) {
    if let Some(runtime) = weak.upgrade() {
        f(&runtime);
    }
}

impl RuntimeInner {
    fn mount_page(&self) {
        let doc = &self.doc;
        let body = doc.body();

        let mounted: Vec<CartWidget> = doc
            .query_all(body, &Selector::attr(WIDGET_ATTRIBUTE))
            .into_iter()
            .filter_map(|element| CartWidget::mount(doc, &self.store, element))
            .collect();
        debug!(count = mounted.len(), "Mounted cart widgets");
        self.widgets.borrow_mut().extend(mounted);

        if self.checkout.borrow().is_none() {
            let view = CheckoutView::mount(doc, &self.store, body);
            *self.checkout.borrow_mut() = view;
        }
        if self.suggestions.borrow().is_none() {
            let suggestions = SuggestionBox::mount(doc);
            *self.suggestions.borrow_mut() = suggestions;
        }
        if self.auth_form.borrow().is_none() {
            let form = AuthForm::mount(doc, body);
            *self.auth_form.borrow_mut() = form;
        }
    }

    fn teardown_widgets(&self) {
        for widget in self.widgets.take() {
            widget.teardown(&self.doc);
        }
    }

    fn teardown_page(&self) {
        self.teardown_widgets();
        if let Some(view) = self.checkout.take() {
            view.teardown(&self.doc);
        }
        if let Some(suggestions) = self.suggestions.take() {
            suggestions.teardown(&self.doc);
        }
        if let Some(form) = self.auth_form.take() {
            form.teardown(&self.doc);
        }
    }
}
