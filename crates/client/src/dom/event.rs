//! Events, event targets and listener handles.

use super::ElementId;
use crate::storage::StorageChange;

/// Where a listener is attached and where an event is dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    Window,
    Document,
    Element(ElementId),
}

impl From<ElementId> for Target {
    fn from(id: ElementId) -> Self {
        Self::Element(id)
    }
}

/// Event type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    Click,
    KeyDown,
    PointerDown,
    Input,
    Focus,
    Blur,
    Submit,
    MouseEnter,
    MouseLeave,
    Storage,
    Custom(String),
}

impl EventKind {
    /// Build a custom event kind.
    pub fn custom(name: impl Into<String>) -> Self {
        Self::Custom(name.into())
    }

    /// Whether the event propagates to ancestors after reaching its target.
    #[must_use]
    pub const fn bubbles(&self) -> bool {
        !matches!(self, Self::MouseEnter | Self::MouseLeave | Self::Storage)
    }
}

/// Opaque handle returned by [`Document::add_listener`](super::Document::add_listener).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub(super) u64);

/// A dispatched event.
///
/// The propagation path is computed when dispatch starts, so elements
/// detached by a handler still count as part of it.
#[derive(Debug, Clone)]
pub struct Event {
    kind: EventKind,
    key: Option<String>,
    storage: Option<StorageChange>,
    target: Option<Target>,
    path: Vec<Target>,
    default_prevented: bool,
    propagation_stopped: bool,
}

impl Event {
    #[must_use]
    pub const fn new(kind: EventKind) -> Self {
        Self {
            kind,
            key: None,
            storage: None,
            target: None,
            path: Vec::new(),
            default_prevented: false,
            propagation_stopped: false,
        }
    }

    /// A `keydown` event for the given key name (`"Escape"`, `"ArrowDown"`, ...).
    pub fn key_down(key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            ..Self::new(EventKind::KeyDown)
        }
    }

    /// A `storage` event describing a change made by another context.
    #[must_use]
    pub fn storage(change: StorageChange) -> Self {
        Self {
            storage: Some(change),
            ..Self::new(EventKind::Storage)
        }
    }

    #[must_use]
    pub const fn kind(&self) -> &EventKind {
        &self.kind
    }

    #[must_use]
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    #[must_use]
    pub const fn storage_change(&self) -> Option<&StorageChange> {
        self.storage.as_ref()
    }

    /// The target the event was dispatched at.
    #[must_use]
    pub const fn target(&self) -> Option<Target> {
        self.target
    }

    /// The element the event was dispatched at, if any.
    #[must_use]
    pub const fn target_element(&self) -> Option<ElementId> {
        match self.target {
            Some(Target::Element(id)) => Some(id),
            _ => None,
        }
    }

    /// Propagation path, innermost first.
    #[must_use]
    pub fn path(&self) -> &[Target] {
        &self.path
    }

    #[must_use]
    pub fn path_contains(&self, element: ElementId) -> bool {
        self.path.contains(&Target::Element(element))
    }

    pub const fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    #[must_use]
    pub const fn default_prevented(&self) -> bool {
        self.default_prevented
    }

    pub const fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub(super) const fn propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }

    pub(super) fn begin_dispatch(&mut self, target: Target, path: Vec<Target>) {
        self.target = Some(target);
        self.path = path;
    }
}
