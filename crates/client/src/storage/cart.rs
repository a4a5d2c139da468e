//! Cart persistence under a single storage key.

use serde_json::Value;
use tienda_core::{CartInput, CartItem};
use tracing::warn;

use super::{StorageArea, StorageError};

/// Storage key holding the serialized cart.
pub const CART_STORAGE_KEY: &str = "tienda-cart";

/// Reads and writes the cart as a JSON array under [`CART_STORAGE_KEY`].
///
/// [`load`](Self::load) and [`save`](Self::save) never fail: unreadable or
/// corrupt content loads as an empty cart and failed writes are logged.
/// Callers that must report failures use [`try_load`](Self::try_load) and
/// [`try_save`](Self::try_save).
#[derive(Debug, Clone)]
pub struct CartStorage {
    area: StorageArea,
}

impl CartStorage {
    #[must_use]
    pub const fn new(area: StorageArea) -> Self {
        Self { area }
    }

    #[must_use]
    pub const fn area(&self) -> &StorageArea {
        &self.area
    }

    /// Load the stored cart, starting empty on any failure.
    #[must_use]
    pub fn load(&self) -> Vec<CartItem> {
        self.try_load().unwrap_or_else(|e| {
            warn!(error = %e, "Stored cart is unreadable, starting empty");
            Vec::new()
        })
    }

    /// Load the stored cart.
    ///
    /// # Errors
    ///
    /// Returns an error when the area cannot be read or the stored cart is
    /// not JSON.
    pub fn try_load(&self) -> Result<Vec<CartItem>, StorageError> {
        match self.area.get_item(CART_STORAGE_KEY)? {
            Some(raw) => Ok(decode_cart(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    /// Persist the full cart, logging failures.
    pub fn save(&self, items: &[CartItem]) {
        if let Err(e) = self.try_save(items) {
            warn!(error = %e, "Failed to persist cart");
        }
    }

    /// Persist the full cart.
    ///
    /// # Errors
    ///
    /// Returns an error when the cart cannot be encoded or written.
    pub fn try_save(&self, items: &[CartItem]) -> Result<(), StorageError> {
        let encoded = serde_json::to_string(items)?;
        self.area.set_item(CART_STORAGE_KEY, &encoded)
    }
}

/// Decode stored cart content.
///
/// Anything other than an array decodes as an empty cart. Each entry is
/// sanitized; entries without a usable id are dropped and entries repeating
/// an earlier id are merged into it.
///
/// # Errors
///
/// Returns an error only when `raw` is not JSON at all.
pub fn decode_cart(raw: &str) -> Result<Vec<CartItem>, serde_json::Error> {
    let Value::Array(entries) = serde_json::from_str::<Value>(raw)? else {
        return Ok(Vec::new());
    };

    let mut items: Vec<CartItem> = Vec::with_capacity(entries.len());
    for entry in entries {
        let Some(item) = serde_json::from_value::<CartInput>(entry)
            .ok()
            .and_then(|input| input.sanitize())
        else {
            continue;
        };
        match items.iter_mut().find(|existing| existing.id == item.id) {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(item.quantity),
            None => items.push(item),
        }
    }
    Ok(items)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::storage::MemoryBackend;

    #[test]
    fn test_decode_sanitizes_entries() {
        let items = decode_cart(
            r#"[
                {"id": 7, "name": "  Casco  ", "price": "19.99", "quantity": "2.7"},
                {"id": "", "name": "sin id"},
                "basura",
                {"id": "b", "price": null, "quantity": -3, "image": "", "url": "/tienda/b"}
            ]"#,
        )
        .unwrap();

        assert_eq!(items.len(), 2);
        let first = items.first().unwrap();
        assert_eq!(first.id, "7");
        assert_eq!(first.name, "Casco");
        assert_eq!(first.price, Some(Decimal::new(1999, 2)));
        assert_eq!(first.quantity, 2);
        let second = items.get(1).unwrap();
        assert_eq!(second.price, None);
        assert_eq!(second.quantity, 1);
        assert_eq!(second.image, "/images/placeholder.svg");
        assert_eq!(second.url, "/tienda/b");
    }

    #[test]
    fn test_decode_merges_duplicate_ids() {
        let items = decode_cart(r#"[{"id":"a","quantity":2},{"id":"a","quantity":3}]"#).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items.first().unwrap().quantity, 5);
    }

    #[test]
    fn test_decode_non_array_is_empty() {
        assert!(decode_cart(r#"{"id":"a"}"#).unwrap().is_empty());
        assert!(decode_cart("null").unwrap().is_empty());
        assert!(decode_cart("[oops").is_err());
    }

    #[test]
    fn test_saved_price_is_a_json_number() {
        let storage = CartStorage::new(StorageArea::memory());
        let item = CartInput::with_id("a").price(19.99).sanitize().unwrap();
        storage.save(&[item]);

        let raw = storage.area().get_item(CART_STORAGE_KEY).unwrap().unwrap();
        let value: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value[0]["price"], serde_json::json!(19.99));
        assert_eq!(value[0]["quantity"], serde_json::json!(1));
    }

    #[test]
    fn test_load_tolerates_corrupt_and_disabled_storage() {
        let backend = MemoryBackend::new();
        let storage = CartStorage::new(StorageArea::new(backend.clone()));
        storage.area().set_item(CART_STORAGE_KEY, "{{{").unwrap();
        assert!(storage.load().is_empty());

        backend.set_disabled(true);
        assert!(storage.load().is_empty());
        storage.save(&[]);
    }

    #[test]
    fn test_try_variants_report_failures() {
        let backend = MemoryBackend::new();
        let storage = CartStorage::new(StorageArea::new(backend.clone()));
        storage.area().set_item(CART_STORAGE_KEY, "{{{").unwrap();
        assert!(matches!(storage.try_load(), Err(StorageError::Corrupt(_))));

        backend.set_disabled(true);
        assert!(matches!(storage.try_load(), Err(StorageError::Disabled)));
        assert!(matches!(storage.try_save(&[]), Err(StorageError::Disabled)));
    }
}
