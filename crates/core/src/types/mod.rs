//! Core types for Tienda.
//!
//! This module provides the domain types shared by the client runtime and the
//! storefront service.

pub mod forms;
pub mod item;
pub mod money;
pub mod session;
pub mod suggestion;

pub use forms::{FormError, LoginForm, RegistrationForm};
pub use item::{
    CartInput, CartItem, DEFAULT_ITEM_NAME, DEFAULT_ITEM_URL, Loose, PLACEHOLDER_IMAGE,
    decimal_from_f64, parse_price,
};
pub use money::{format_money, line_subtotal_label, unit_price_label};
pub use session::{SESSION_STORAGE_KEY, SessionUser, StoredSession};
pub use suggestion::Suggestion;
