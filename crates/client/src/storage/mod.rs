//! Key/value storage shared between browsing contexts.
//!
//! A [`StorageArea`] is one context's view of a [`StorageBackend`]. Writes
//! through one context queue a [`StorageChange`] for every other context
//! opened over the same backend; [`Document::deliver_storage_events`]
//! turns them into `storage` events.
//!
//! [`Document::deliver_storage_events`]: crate::dom::Document::deliver_storage_events

mod backend;
mod cart;

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

use thiserror::Error;

pub use backend::{FileBackend, MemoryBackend, StorageBackend};
pub use cart::{CART_STORAGE_KEY, CartStorage, decode_cart};

/// Storage access failure.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage is disabled")]
    Disabled,

    #[error("storage quota exceeded: {needed} bytes needed, {quota} available")]
    QuotaExceeded { needed: usize, quota: usize },

    #[error("storage file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage content is not valid JSON: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// A change made by another context. `key` is `None` after a `clear`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageChange {
    pub key: Option<String>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

impl StorageChange {
    /// Whether this change may have touched `key`.
    #[must_use]
    pub fn affects(&self, key: &str) -> bool {
        self.key.as_deref().is_none_or(|changed| changed == key)
    }
}

type Inbox = Rc<RefCell<VecDeque<StorageChange>>>;

struct SharedStorage {
    backend: Box<dyn StorageBackend>,
    contexts: RefCell<Vec<Weak<RefCell<VecDeque<StorageChange>>>>>,
}

/// One context's handle to shared storage.
///
/// Cloning keeps the same context; use [`open_context`](Self::open_context)
/// for another tab.
#[derive(Clone)]
pub struct StorageArea {
    shared: Rc<SharedStorage>,
    inbox: Inbox,
}

impl fmt::Debug for StorageArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageArea")
            .field("pending", &self.inbox.borrow().len())
            .finish_non_exhaustive()
    }
}

impl StorageArea {
    pub fn new(backend: impl StorageBackend + 'static) -> Self {
        let shared = Rc::new(SharedStorage {
            backend: Box::new(backend),
            contexts: RefCell::new(Vec::new()),
        });
        Self::attach(shared)
    }

    /// Fresh in-memory storage without a quota.
    #[must_use]
    pub fn memory() -> Self {
        Self::new(MemoryBackend::new())
    }

    /// Another context over the same backend.
    #[must_use]
    pub fn open_context(&self) -> Self {
        Self::attach(Rc::clone(&self.shared))
    }

    fn attach(shared: Rc<SharedStorage>) -> Self {
        let inbox: Inbox = Rc::new(RefCell::new(VecDeque::new()));
        shared.contexts.borrow_mut().push(Rc::downgrade(&inbox));
        Self { shared, inbox }
    }

    /// # Errors
    ///
    /// Returns the backend's error when storage cannot be read.
    pub fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.shared.backend.get(key)
    }

    /// # Errors
    ///
    /// Returns the backend's error; nothing is broadcast on failure.
    pub fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let old_value = self.shared.backend.get(key).ok().flatten();
        self.shared.backend.set(key, value)?;
        if old_value.as_deref() != Some(value) {
            self.broadcast(StorageChange {
                key: Some(key.to_string()),
                old_value,
                new_value: Some(value.to_string()),
            });
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns the backend's error; nothing is broadcast on failure.
    pub fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let old_value = self.shared.backend.get(key).ok().flatten();
        self.shared.backend.remove(key)?;
        if old_value.is_some() {
            self.broadcast(StorageChange {
                key: Some(key.to_string()),
                old_value,
                new_value: None,
            });
        }
        Ok(())
    }

    /// Remove every key.
    ///
    /// # Errors
    ///
    /// Returns the backend's error; nothing is broadcast on failure.
    pub fn clear(&self) -> Result<(), StorageError> {
        for key in self.shared.backend.keys()? {
            self.shared.backend.remove(&key)?;
        }
        self.broadcast(StorageChange {
            key: None,
            old_value: None,
            new_value: None,
        });
        Ok(())
    }

    /// Drain the changes other contexts made since the last call.
    #[must_use]
    pub fn take_pending(&self) -> Vec<StorageChange> {
        self.inbox.borrow_mut().drain(..).collect()
    }

    fn broadcast(&self, change: StorageChange) {
        let mut contexts = self.shared.contexts.borrow_mut();
        contexts.retain(|weak| weak.strong_count() > 0);
        for inbox in contexts.iter().filter_map(Weak::upgrade) {
            if !Rc::ptr_eq(&inbox, &self.inbox) {
                inbox.borrow_mut().push_back(change.clone());
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_writes_are_visible_across_contexts() {
        let first = StorageArea::memory();
        let second = first.open_context();

        first.set_item("k", "v").unwrap();

        assert_eq!(second.get_item("k").unwrap().as_deref(), Some("v"));
        assert!(first.take_pending().is_empty());
        assert_eq!(
            second.take_pending(),
            [StorageChange {
                key: Some("k".to_string()),
                old_value: None,
                new_value: Some("v".to_string()),
            }]
        );
    }

    #[test]
    fn test_unchanged_write_is_not_broadcast() {
        let first = StorageArea::memory();
        let second = first.open_context();
        first.set_item("k", "v").unwrap();
        let _ = second.take_pending();

        first.set_item("k", "v").unwrap();
        first.remove_item("missing").unwrap();

        assert!(second.take_pending().is_empty());
    }

    #[test]
    fn test_clones_share_a_context() {
        let first = StorageArea::memory();
        let same = first.clone();
        let other = first.open_context();

        same.set_item("k", "v").unwrap();

        assert!(first.take_pending().is_empty());
        assert_eq!(other.take_pending().len(), 1);
    }

    #[test]
    fn test_clear_broadcasts_keyless_change() {
        let first = StorageArea::memory();
        let second = first.open_context();
        first.set_item("a", "1").unwrap();
        first.set_item("b", "2").unwrap();
        let _ = second.take_pending();

        first.clear().unwrap();

        let changes = second.take_pending();
        assert_eq!(changes.len(), 1);
        assert!(changes.first().unwrap().affects("tienda-cart"));
        assert!(first.get_item("a").unwrap().is_none());
    }

    #[test]
    fn test_failed_write_is_not_broadcast() {
        let backend = MemoryBackend::with_quota(4);
        let first = StorageArea::new(backend);
        let second = first.open_context();

        assert!(matches!(
            first.set_item("key", "too long"),
            Err(StorageError::QuotaExceeded { .. })
        ));
        assert!(second.take_pending().is_empty());
    }
}
