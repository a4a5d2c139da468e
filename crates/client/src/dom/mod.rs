//! In-process document model.
//!
//! A [`Document`] stands in for one browsing context: an element tree with
//! data attributes and classes, event listeners with bubbling, a virtual
//! timer queue, pointer hover tracking, the current location and a handle to
//! a storage area that may be shared with other contexts.
//!
//! Elements live in an arena owned by the document and are addressed by
//! [`ElementId`]. Listener and timer callbacks receive the document as an
//! argument, so they never need to hold it themselves.
//!
//! ```
//! use tienda_client::dom::{Document, EventKind, Markup, Selector, Target};
//!
//! let doc = Document::new();
//! let panel = doc.append(doc.body(), &Markup::new("div").attr("data-cart-panel", ""));
//! doc.add_listener(Target::Document, EventKind::Click, |doc, event| {
//!     if let Some(el) = event.target_element() {
//!         doc.add_class(el, "clicked");
//!     }
//! });
//!
//! doc.click(panel);
//! assert!(doc.has_class(panel, "clicked"));
//! assert_eq!(doc.query(doc.body(), &Selector::attr("data-cart-panel")), Some(panel));
//! ```

mod arena;
mod event;
mod markup;
mod selector;
mod timer;

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use tracing::debug;

pub use event::{Event, EventKind, ListenerId, Target};
pub use markup::Markup;
pub use selector::{Selector, SelectorError};
pub use timer::{TimerCallback, TimerId};

use crate::storage::StorageArea;
use arena::NodeArena;
use timer::TimerQueue;

/// Listener callback.
pub type Handler = Rc<dyn Fn(&Document, &mut Event)>;

/// Handle to an element in a [`Document`].
///
/// Handles to elements dropped by [`Document::clear_children`] stop
/// resolving: every query on them behaves as for a missing element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId {
    index: usize,
    generation: u32,
}

struct Node {
    tag: String,
    attributes: Vec<(String, String)>,
    classes: Vec<String>,
    text: String,
    children: Vec<ElementId>,
    parent: Option<ElementId>,
}

struct Listener {
    id: ListenerId,
    target: Target,
    kind: EventKind,
    handler: Handler,
}

struct DocumentInner {
    nodes: RefCell<NodeArena>,
    body: ElementId,
    listeners: RefCell<Vec<Listener>>,
    next_listener: Cell<u64>,
    timers: RefCell<TimerQueue>,
    hovered: Cell<Option<ElementId>>,
    hover_capable: Cell<bool>,
    location: RefCell<String>,
    storage: StorageArea,
}

/// One browsing context. Cloning yields another handle to the same document.
#[derive(Clone)]
pub struct Document {
    inner: Rc<DocumentInner>,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("nodes", &self.node_count())
            .field("listeners", &self.listener_count())
            .field("now", &self.now())
            .finish_non_exhaustive()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// A document with its own in-memory storage.
    #[must_use]
    pub fn new() -> Self {
        Self::with_storage(StorageArea::memory())
    }

    /// A document bound to the given storage context.
    ///
    /// Use [`StorageArea::open_context`] to model a second tab over the same
    /// storage.
    #[must_use]
    pub fn with_storage(storage: StorageArea) -> Self {
        let mut nodes = NodeArena::default();
        let body = nodes.insert(Node {
            tag: "body".to_string(),
            attributes: Vec::new(),
            classes: Vec::new(),
            text: String::new(),
            children: Vec::new(),
            parent: None,
        });
        Self {
            inner: Rc::new(DocumentInner {
                nodes: RefCell::new(nodes),
                body,
                listeners: RefCell::new(Vec::new()),
                next_listener: Cell::new(0),
                timers: RefCell::new(TimerQueue::default()),
                hovered: Cell::new(None),
                hover_capable: Cell::new(true),
                location: RefCell::new("/".to_string()),
                storage,
            }),
        }
    }

    #[must_use]
    pub fn body(&self) -> ElementId {
        self.inner.body
    }

    #[must_use]
    pub fn storage(&self) -> &StorageArea {
        &self.inner.storage
    }

    /// Whether two handles refer to the same document.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    // =========================================================================
    // Tree
    // =========================================================================

    /// Materialize `markup` as a detached subtree.
    pub fn create(&self, markup: &Markup) -> ElementId {
        let mut nodes = self.inner.nodes.borrow_mut();
        build(&mut nodes, markup, None)
    }

    /// Materialize `markup` and append it to `parent`.
    pub fn append(&self, parent: ElementId, markup: &Markup) -> ElementId {
        let mut nodes = self.inner.nodes.borrow_mut();
        let id = build(&mut nodes, markup, Some(parent));
        if let Some(node) = nodes.get_mut(parent) {
            node.children.push(id);
        }
        id
    }

    /// Move `child` to the end of `parent`'s children.
    pub fn append_child(&self, parent: ElementId, child: ElementId) {
        if self.contains(child, parent) {
            return;
        }
        self.detach(child);
        let mut nodes = self.inner.nodes.borrow_mut();
        if let Some(node) = nodes.get_mut(child) {
            node.parent = Some(parent);
        }
        if let Some(node) = nodes.get_mut(parent) {
            node.children.push(child);
        }
    }

    /// Detach an element from its parent.
    pub fn detach(&self, element: ElementId) {
        let mut nodes = self.inner.nodes.borrow_mut();
        let Some(parent) = nodes.get_mut(element).and_then(|node| node.parent.take()) else {
            return;
        };
        if let Some(node) = nodes.get_mut(parent) {
            node.children.retain(|child| *child != element);
        }
    }

    /// Drop every child of `element` and clear its text.
    ///
    /// The children and their subtrees are freed; handles to them stop
    /// resolving.
    pub fn clear_children(&self, element: ElementId) {
        let mut nodes = self.inner.nodes.borrow_mut();
        let children = nodes
            .get_mut(element)
            .map(|node| {
                node.text.clear();
                std::mem::take(&mut node.children)
            })
            .unwrap_or_default();
        for child in children {
            nodes.release(child);
        }
    }

    /// Elements currently allocated, attached or detached.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.inner.nodes.borrow().live()
    }

    #[must_use]
    pub fn parent(&self, element: ElementId) -> Option<ElementId> {
        self.with_node(element, |node| node.parent).flatten()
    }

    #[must_use]
    pub fn children(&self, element: ElementId) -> Vec<ElementId> {
        self.with_node(element, |node| node.children.clone())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn tag(&self, element: ElementId) -> String {
        self.with_node(element, |node| node.tag.clone())
            .unwrap_or_default()
    }

    /// Whether `element` is attached to this document's body.
    #[must_use]
    pub fn is_connected(&self, element: ElementId) -> bool {
        self.contains(self.body(), element)
    }

    /// Whether `node` is `ancestor` or one of its descendants.
    #[must_use]
    pub fn contains(&self, ancestor: ElementId, node: ElementId) -> bool {
        let nodes = self.inner.nodes.borrow();
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = nodes.get(id).and_then(|n| n.parent);
        }
        false
    }

    // =========================================================================
    // Attributes, classes and text
    // =========================================================================

    #[must_use]
    pub fn attribute(&self, element: ElementId, name: &str) -> Option<String> {
        self.with_node(element, |node| {
            if name == "class" {
                return (!node.classes.is_empty()).then(|| node.classes.join(" "));
            }
            node.attributes
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.clone())
        })
        .flatten()
    }

    #[must_use]
    pub fn has_attribute(&self, element: ElementId, name: &str) -> bool {
        self.attribute(element, name).is_some()
    }

    pub fn set_attribute(&self, element: ElementId, name: &str, value: &str) {
        self.with_node_mut(element, |node| {
            if name == "class" {
                node.classes = value.split_whitespace().map(str::to_string).collect();
                return;
            }
            match node.attributes.iter_mut().find(|(n, _)| n == name) {
                Some(slot) => value.clone_into(&mut slot.1),
                None => node.attributes.push((name.to_string(), value.to_string())),
            }
        });
    }

    pub fn remove_attribute(&self, element: ElementId, name: &str) {
        self.with_node_mut(element, |node| {
            if name == "class" {
                node.classes.clear();
            } else {
                node.attributes.retain(|(n, _)| n != name);
            }
        });
    }

    #[must_use]
    pub fn has_class(&self, element: ElementId, class: &str) -> bool {
        self.with_node(element, |node| node.classes.iter().any(|c| c == class))
            .unwrap_or(false)
    }

    pub fn add_class(&self, element: ElementId, class: &str) {
        self.with_node_mut(element, |node| {
            if !node.classes.iter().any(|c| c == class) {
                node.classes.push(class.to_string());
            }
        });
    }

    pub fn remove_class(&self, element: ElementId, class: &str) {
        self.with_node_mut(element, |node| node.classes.retain(|c| c != class));
    }

    /// Add `class` when `force` is true, remove it otherwise.
    pub fn toggle_class(&self, element: ElementId, class: &str, force: bool) {
        if force {
            self.add_class(element, class);
        } else {
            self.remove_class(element, class);
        }
    }

    /// Text of the element and all of its descendants.
    #[must_use]
    pub fn text_content(&self, element: ElementId) -> String {
        let nodes = self.inner.nodes.borrow();
        let mut out = String::new();
        collect_text(&nodes, element, &mut out);
        out
    }

    /// Replace the element's content with `text`.
    pub fn set_text(&self, element: ElementId, text: &str) {
        self.clear_children(element);
        self.with_node_mut(element, |node| text.clone_into(&mut node.text));
    }

    /// Current value of a form control.
    #[must_use]
    pub fn value(&self, element: ElementId) -> String {
        self.attribute(element, "value").unwrap_or_default()
    }

    pub fn set_value(&self, element: ElementId, value: &str) {
        self.set_attribute(element, "value", value);
    }

    // =========================================================================
    // Queries
    // =========================================================================

    #[must_use]
    pub fn matches(&self, element: ElementId, selector: &Selector) -> bool {
        self.with_node(element, |node| node_matches(node, selector))
            .unwrap_or(false)
    }

    /// Nearest inclusive ancestor matching `selector`.
    #[must_use]
    pub fn closest(&self, element: ElementId, selector: &Selector) -> Option<ElementId> {
        let nodes = self.inner.nodes.borrow();
        let mut current = Some(element);
        while let Some(id) = current {
            let node = nodes.get(id)?;
            if node_matches(node, selector) {
                return Some(id);
            }
            current = node.parent;
        }
        None
    }

    /// First descendant of `root` matching `selector`, in document order.
    #[must_use]
    pub fn query(&self, root: ElementId, selector: &Selector) -> Option<ElementId> {
        self.query_all(root, selector).into_iter().next()
    }

    /// Every descendant of `root` matching `selector`, in document order.
    #[must_use]
    pub fn query_all(&self, root: ElementId, selector: &Selector) -> Vec<ElementId> {
        let nodes = self.inner.nodes.borrow();
        let mut found = Vec::new();
        let mut stack: Vec<ElementId> = nodes
            .get(root)
            .map(|node| node.children.iter().rev().copied().collect())
            .unwrap_or_default();
        while let Some(id) = stack.pop() {
            let Some(node) = nodes.get(id) else {
                continue;
            };
            if node_matches(node, selector) {
                found.push(id);
            }
            stack.extend(node.children.iter().rev().copied());
        }
        found
    }

    /// Attached element with the given `id` attribute.
    #[must_use]
    pub fn element_by_id(&self, id: &str) -> Option<ElementId> {
        self.query(self.body(), &Selector::id(id))
    }

    // =========================================================================
    // Serialization
    // =========================================================================

    #[must_use]
    pub fn outer_html(&self, element: ElementId) -> String {
        let nodes = self.inner.nodes.borrow();
        let mut out = String::new();
        write_html(&nodes, element, &mut out);
        out
    }

    #[must_use]
    pub fn inner_html(&self, element: ElementId) -> String {
        let nodes = self.inner.nodes.borrow();
        let mut out = String::new();
        if let Some(node) = nodes.get(element) {
            out.push_str(&escape(&node.text));
            for child in &node.children {
                write_html(&nodes, *child, &mut out);
            }
        }
        out
    }

    // =========================================================================
    // Events
    // =========================================================================

    /// Register a listener; keep the returned id to remove it later.
    pub fn add_listener(
        &self,
        target: impl Into<Target>,
        kind: EventKind,
        handler: impl Fn(&Self, &mut Event) + 'static,
    ) -> ListenerId {
        let next = self.inner.next_listener.get() + 1;
        self.inner.next_listener.set(next);
        let id = ListenerId(next);
        self.inner.listeners.borrow_mut().push(Listener {
            id,
            target: target.into(),
            kind,
            handler: Rc::new(handler),
        });
        id
    }

    /// Remove a listener. Returns false when it was already gone.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.inner.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|listener| listener.id != id);
        listeners.len() != before
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }

    fn is_registered(&self, id: ListenerId) -> bool {
        self.inner
            .listeners
            .borrow()
            .iter()
            .any(|listener| listener.id == id)
    }

    /// Dispatch `event` at `target` and return it once propagation ends.
    pub fn dispatch(&self, target: impl Into<Target>, mut event: Event) -> Event {
        let target = target.into();
        let path = if event.kind().bubbles() {
            self.propagation_path(target)
        } else {
            vec![target]
        };
        event.begin_dispatch(target, path.clone());

        for current in path {
            if event.propagation_stopped() {
                break;
            }
            let handlers: Vec<(ListenerId, Handler)> = self
                .inner
                .listeners
                .borrow()
                .iter()
                .filter(|listener| listener.target == current && listener.kind == *event.kind())
                .map(|listener| (listener.id, Rc::clone(&listener.handler)))
                .collect();
            for (id, handler) in handlers {
                // A handler earlier in this turn may have removed it
                if self.is_registered(id) {
                    handler(self, &mut event);
                }
            }
        }
        event
    }

    pub fn click(&self, element: ElementId) -> Event {
        self.dispatch(element, Event::new(EventKind::Click))
    }

    pub fn key_down(&self, target: impl Into<Target>, key: &str) -> Event {
        self.dispatch(target, Event::key_down(key))
    }

    pub fn pointer_down(&self, element: ElementId) -> Event {
        self.dispatch(element, Event::new(EventKind::PointerDown))
    }

    /// Set the control's value and fire `input`.
    pub fn type_text(&self, element: ElementId, value: &str) -> Event {
        self.set_value(element, value);
        self.dispatch(element, Event::new(EventKind::Input))
    }

    pub fn focus(&self, element: ElementId) -> Event {
        self.dispatch(element, Event::new(EventKind::Focus))
    }

    pub fn blur(&self, element: ElementId) -> Event {
        self.dispatch(element, Event::new(EventKind::Blur))
    }

    pub fn submit(&self, form: ElementId) -> Event {
        self.dispatch(form, Event::new(EventKind::Submit))
    }

    /// Dispatch a custom signal such as `cart:open-request`.
    pub fn dispatch_custom(&self, target: impl Into<Target>, name: &str) -> Event {
        self.dispatch(target, Event::new(EventKind::custom(name)))
    }

    fn propagation_path(&self, target: Target) -> Vec<Target> {
        match target {
            Target::Window => vec![Target::Window],
            Target::Document => vec![Target::Document, Target::Window],
            Target::Element(element) => {
                let nodes = self.inner.nodes.borrow();
                let mut path = Vec::new();
                let mut current = Some(element);
                let mut last = element;
                while let Some(id) = current {
                    path.push(Target::Element(id));
                    last = id;
                    current = nodes.get(id).and_then(|node| node.parent);
                }
                if last == self.inner.body {
                    path.push(Target::Document);
                    path.push(Target::Window);
                }
                path
            }
        }
    }

    // =========================================================================
    // Hover
    // =========================================================================

    /// Whether the host has a fine pointer that can hover.
    #[must_use]
    pub fn hover_capable(&self) -> bool {
        self.inner.hover_capable.get()
    }

    pub fn set_hover_capable(&self, capable: bool) {
        self.inner.hover_capable.set(capable);
    }

    /// Move the pointer over `element`, or off the page with `None`.
    ///
    /// Fires `mouseleave` on every element the pointer left (innermost
    /// first), then `mouseenter` on every element it entered (outermost
    /// first).
    pub fn hover(&self, element: Option<ElementId>) {
        let old_chain = self.hover_chain(self.inner.hovered.get());
        let new_chain = self.hover_chain(element);
        self.inner.hovered.set(element);

        for left in old_chain.iter().filter(|id| !new_chain.contains(id)) {
            self.dispatch(*left, Event::new(EventKind::MouseLeave));
        }
        for entered in new_chain.iter().rev().filter(|id| !old_chain.contains(id)) {
            self.dispatch(*entered, Event::new(EventKind::MouseEnter));
        }
    }

    /// Whether the pointer is over `element` or one of its descendants.
    #[must_use]
    pub fn is_hovered(&self, element: ElementId) -> bool {
        self.inner
            .hovered
            .get()
            .is_some_and(|hovered| self.contains(element, hovered))
    }

    fn hover_chain(&self, element: Option<ElementId>) -> Vec<ElementId> {
        let nodes = self.inner.nodes.borrow();
        let mut chain = Vec::new();
        let mut current = element;
        while let Some(id) = current {
            chain.push(id);
            current = nodes.get(id).and_then(|node| node.parent);
        }
        chain
    }

    // =========================================================================
    // Location
    // =========================================================================

    /// The URL this context was last sent to. Starts at `/`.
    #[must_use]
    pub fn location(&self) -> String {
        self.inner.location.borrow().clone()
    }

    /// Send the context to `url`. Loading the new page is up to the host.
    pub fn navigate(&self, url: &str) {
        debug!(url, "Navigating");
        *self.inner.location.borrow_mut() = url.to_string();
    }

    // =========================================================================
    // Timers
    // =========================================================================

    /// Milliseconds of virtual time elapsed.
    #[must_use]
    pub fn now(&self) -> u64 {
        self.inner.timers.borrow().now()
    }

    pub fn set_timeout(&self, delay_ms: u64, callback: impl FnOnce(&Self) + 'static) -> TimerId {
        self.inner
            .timers
            .borrow_mut()
            .schedule(delay_ms, Box::new(callback))
    }

    /// Cancel a pending timer. Returns false when it already fired.
    pub fn clear_timeout(&self, id: TimerId) -> bool {
        self.inner.timers.borrow_mut().cancel(id)
    }

    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.inner.timers.borrow().len()
    }

    /// Move virtual time forward, firing due timers in order. Timers
    /// scheduled by callbacks fire too when they fall inside the window.
    pub fn advance(&self, ms: u64) {
        let deadline = self.now().saturating_add(ms);
        loop {
            let next = self.inner.timers.borrow_mut().pop_due(deadline);
            match next {
                Some(callback) => callback(self),
                None => break,
            }
        }
        self.inner.timers.borrow_mut().set_now(deadline);
    }

    // =========================================================================
    // Storage events
    // =========================================================================

    /// Deliver storage changes made by other contexts as `storage` events on
    /// the window. Returns how many were delivered.
    pub fn deliver_storage_events(&self) -> usize {
        let changes = self.inner.storage.take_pending();
        let count = changes.len();
        for change in changes {
            self.dispatch(Target::Window, Event::storage(change));
        }
        count
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn with_node<R>(&self, element: ElementId, f: impl FnOnce(&Node) -> R) -> Option<R> {
        self.inner.nodes.borrow().get(element).map(f)
    }

    fn with_node_mut(&self, element: ElementId, f: impl FnOnce(&mut Node)) {
        if let Some(node) = self.inner.nodes.borrow_mut().get_mut(element) {
            f(node);
        }
    }
}

fn build(nodes: &mut NodeArena, markup: &Markup, parent: Option<ElementId>) -> ElementId {
    let id = nodes.insert(Node {
        tag: markup.tag.clone(),
        attributes: markup.attributes.clone(),
        classes: markup.classes.clone(),
        text: markup.text.clone(),
        children: Vec::new(),
        parent,
    });
    let children: Vec<ElementId> = markup
        .children
        .iter()
        .map(|child| build(nodes, child, Some(id)))
        .collect();
    if let Some(node) = nodes.get_mut(id) {
        node.children = children;
    }
    id
}

fn node_matches(node: &Node, selector: &Selector) -> bool {
    let attribute = |name: &str| {
        node.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    };
    match selector {
        Selector::Tag(tag) => node.tag == *tag,
        Selector::Id(id) => attribute("id") == Some(id.as_str()),
        Selector::HasAttribute(name) if name == "class" => !node.classes.is_empty(),
        Selector::HasAttribute(name) => attribute(name).is_some(),
        Selector::AttributeEquals { name, value } if name == "class" => {
            node.classes.join(" ") == *value
        }
        Selector::AttributeEquals { name, value } => attribute(name) == Some(value.as_str()),
    }
}

fn collect_text(nodes: &NodeArena, element: ElementId, out: &mut String) {
    if let Some(node) = nodes.get(element) {
        out.push_str(&node.text);
        for child in &node.children {
            collect_text(nodes, *child, out);
        }
    }
}

fn write_html(nodes: &NodeArena, element: ElementId, out: &mut String) {
    let Some(node) = nodes.get(element) else {
        return;
    };
    out.push('<');
    out.push_str(&node.tag);
    if !node.classes.is_empty() {
        out.push_str(" class=\"");
        out.push_str(&escape(&node.classes.join(" ")));
        out.push('"');
    }
    for (name, value) in &node.attributes {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        out.push_str(&escape(value));
        out.push('"');
    }
    out.push('>');
    out.push_str(&escape(&node.text));
    for child in &node.children {
        write_html(nodes, *child, out);
    }
    out.push_str("</");
    out.push_str(&node.tag);
    out.push('>');
}

fn escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
