//! File-backed cart management.
//!
//! Runs the same cart store as the shop front over a JSON file, which is
//! handy for inspecting cart payloads and reproducing cart bugs. A file that
//! exists but is not cart storage is refused rather than overwritten.
//!
//! # Usage
//!
//! ```bash
//! tienda-cli cart add --file cart.json --id casco-pro --name "Casco Pro" --price 19.99 -q 2
//! tienda-cli cart show --file cart.json
//! tienda-cli cart remove --file cart.json --id casco-pro
//! tienda-cli cart clear --file cart.json
//! ```

use std::path::{Path, PathBuf};
use std::rc::Rc;

use thiserror::Error;
use tienda_client::{CartStorage, CartStore, FileBackend, StorageArea, StorageError};
use tienda_core::{CartInput, format_money, line_subtotal_label, unit_price_label};

/// Errors from cart commands.
#[derive(Debug, Error)]
pub enum CartCommandError {
    /// The product id is blank.
    #[error("Product id must not be empty")]
    EmptyId,

    /// The id is not in the cart.
    #[error("No item with id {0:?} in the cart")]
    UnknownItem(String),

    /// The file cannot be read as a cart or the cart cannot be written.
    #[error("Cart file {}: {source}", .path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: StorageError,
    },
}

/// A cart loaded from a file.
///
/// Commands mutate [`store`](Self::store) in memory and write the result back
/// with [`commit`](Self::commit).
#[derive(Debug)]
pub struct CartFile {
    path: PathBuf,
    file: CartStorage,
    store: Rc<CartStore>,
}

impl CartFile {
    /// Load the cart stored in `path`.
    ///
    /// A missing file is an empty cart; it is created on the first commit.
    ///
    /// # Errors
    ///
    /// Returns `CartCommandError::Storage` when the file exists but cannot be
    /// read or does not hold storage JSON. Such a file is never overwritten.
    pub fn open(path: &Path) -> Result<Self, CartCommandError> {
        let file = CartStorage::new(StorageArea::new(FileBackend::new(path)));
        let storage_error = |source| CartCommandError::Storage {
            path: path.to_path_buf(),
            source,
        };
        let items = file.try_load().map_err(storage_error)?;

        let scratch = CartStorage::new(StorageArea::memory());
        scratch.try_save(&items).map_err(storage_error)?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
            store: CartStore::new(scratch),
        })
    }

    #[must_use]
    pub const fn store(&self) -> &Rc<CartStore> {
        &self.store
    }

    /// Write the in-memory cart to the file.
    ///
    /// # Errors
    ///
    /// Returns `CartCommandError::Storage` when the write fails.
    pub fn commit(&self) -> Result<(), CartCommandError> {
        self.file
            .try_save(&self.store.items())
            .map_err(|source| CartCommandError::Storage {
                path: self.path.clone(),
                source,
            })
    }
}

/// One line per item plus a summary line.
#[must_use]
pub fn summary(store: &CartStore) -> Vec<String> {
    let items = store.items();
    if items.is_empty() {
        return vec!["Cart is empty".to_string()];
    }

    let mut lines: Vec<String> = items
        .iter()
        .map(|item| {
            format!(
                "{:<24} {:<32} x{:<4} {:>14} {:>14}",
                item.id,
                item.name,
                item.quantity,
                unit_price_label(item.price),
                line_subtotal_label(item.line_total())
            )
        })
        .collect();
    lines.push(format!(
        "{} units, total {}",
        store.item_count(),
        format_money(Some(store.total()))
    ));
    lines
}

fn print(store: &CartStore) {
    for line in summary(store) {
        tracing::info!("{line}");
    }
}

/// Print the cart.
///
/// # Errors
///
/// Returns `CartCommandError::Storage` when the file cannot be read.
pub fn show(file: &Path) -> Result<(), CartCommandError> {
    print(CartFile::open(file)?.store());
    Ok(())
}

/// Add `quantity` units of a product.
///
/// # Errors
///
/// Returns `CartCommandError::EmptyId` for a blank id and
/// `CartCommandError::Storage` when the file cannot be read or written.
pub fn add(
    file: &Path,
    id: &str,
    name: Option<&str>,
    price: Option<&str>,
    quantity: u32,
) -> Result<(), CartCommandError> {
    if id.trim().is_empty() {
        return Err(CartCommandError::EmptyId);
    }

    let mut input = CartInput::with_id(id).quantity(i64::from(quantity));
    if let Some(name) = name {
        input = input.name(name);
    }
    if let Some(price) = price {
        input = input.price(price);
    }

    let cart = CartFile::open(file)?;
    cart.store().add_item(&input);
    cart.commit()?;
    tracing::info!(id, quantity, "Added to cart");
    print(cart.store());
    Ok(())
}

/// Remove a product line.
///
/// # Errors
///
/// Returns `CartCommandError::UnknownItem` when the id is not in the cart and
/// `CartCommandError::Storage` when the file cannot be read or written.
pub fn remove(file: &Path, id: &str) -> Result<(), CartCommandError> {
    let cart = CartFile::open(file)?;
    if !cart.store().items().iter().any(|item| item.id == id) {
        return Err(CartCommandError::UnknownItem(id.to_string()));
    }
    cart.store().remove_item(id);
    cart.commit()?;
    tracing::info!(id, "Removed from cart");
    Ok(())
}

/// Empty the cart.
///
/// # Errors
///
/// Returns `CartCommandError::Storage` when the file cannot be read or
/// written.
pub fn clear(file: &Path) -> Result<(), CartCommandError> {
    let cart = CartFile::open(file)?;
    cart.store().clear();
    cart.commit()?;
    tracing::info!(file = %file.display(), "Cart cleared");
    Ok(())
}
