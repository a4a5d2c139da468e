//! Cart line items and the sanitization applied to untrusted input.
//!
//! Items reach the cart from two untrusted places: data attributes on
//! add-to-cart buttons and JSON read back from storage. Both go through
//! [`CartInput::sanitize`], which is the only way to build a [`CartItem`]
//! from loose data.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Image shown for items without one.
pub const PLACEHOLDER_IMAGE: &str = "/images/placeholder.svg";

/// Name shown for items with a blank name.
pub const DEFAULT_ITEM_NAME: &str = "Producto";

/// Link target for items without a product URL.
pub const DEFAULT_ITEM_URL: &str = "#";

/// A line item in the cart.
///
/// ## Invariants
///
/// - `id` is non-empty and unique within a cart
/// - `quantity` is at least 1
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    /// Product identifier, the cart's unique key.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Unit price, `None` when the price is unknown ("Consultar").
    #[serde(with = "rust_decimal::serde::float_option")]
    pub price: Option<Decimal>,
    /// Number of units.
    pub quantity: u32,
    /// Image URL.
    pub image: String,
    /// Product page URL.
    pub url: String,
}

impl CartItem {
    /// Price times quantity, `None` when the price is unknown.
    #[must_use]
    pub fn line_total(&self) -> Option<Decimal> {
        self.price.map(|price| price * Decimal::from(self.quantity))
    }
}

/// A loosely typed JSON scalar.
///
/// Storage content and data attributes may carry numbers where strings are
/// expected and the other way round; sanitization coerces them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Loose {
    Bool(bool),
    Number(f64),
    Text(String),
    Other(serde_json::Value),
}

impl Loose {
    /// Interpret the value as a number.
    ///
    /// Numeric strings are trimmed before parsing. Empty strings are not
    /// numbers.
    fn as_number(&self) -> Option<f64> {
        let value = match self {
            Self::Number(n) => *n,
            Self::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return None;
                }
                trimmed.parse::<f64>().ok()?
            }
            Self::Bool(_) | Self::Other(_) => return None,
        };
        value.is_finite().then_some(value)
    }

    /// Render the value as an identifier string.
    fn as_id(&self) -> String {
        match self {
            Self::Text(s) => s.trim().to_string(),
            Self::Number(n) if n.is_finite() => n.to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Number(_) | Self::Other(_) => String::new(),
        }
    }

    fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for Loose {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Loose {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for Loose {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for Loose {
    #[allow(clippy::cast_precision_loss)] // Quantities and ids are far below 2^53
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

/// Untrusted input for adding an item to the cart.
///
/// Every field is optional and loosely typed; see [`CartInput::sanitize`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CartInput {
    #[serde(default)]
    pub id: Option<Loose>,
    #[serde(default)]
    pub name: Option<Loose>,
    #[serde(default)]
    pub price: Option<Loose>,
    #[serde(default)]
    pub quantity: Option<Loose>,
    #[serde(default)]
    pub image: Option<Loose>,
    #[serde(default)]
    pub url: Option<Loose>,
}

impl CartInput {
    /// Start an input for the given product id.
    #[must_use]
    pub fn with_id(id: impl Into<Loose>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    /// Set the display name.
    #[must_use]
    pub fn name(mut self, name: impl Into<Loose>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the unit price.
    #[must_use]
    pub fn price(mut self, price: impl Into<Loose>) -> Self {
        self.price = Some(price.into());
        self
    }

    /// Set the quantity.
    #[must_use]
    pub fn quantity(mut self, quantity: impl Into<Loose>) -> Self {
        self.quantity = Some(quantity.into());
        self
    }

    /// Set the image URL.
    #[must_use]
    pub fn image(mut self, image: impl Into<Loose>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// Set the product page URL.
    #[must_use]
    pub fn url(mut self, url: impl Into<Loose>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Coerce the input into a valid [`CartItem`].
    ///
    /// Returns `None` when the id is missing or blank. Every other field falls
    /// back to a default:
    ///
    /// - quantity: truncated toward zero, at least 1; non-numeric becomes 1
    /// - price: numeric values become a decimal, anything else `None`
    /// - name: trimmed, blank becomes [`DEFAULT_ITEM_NAME`]
    /// - image/url: kept when non-empty, else [`PLACEHOLDER_IMAGE`] / [`DEFAULT_ITEM_URL`]
    #[must_use]
    pub fn sanitize(&self) -> Option<CartItem> {
        let id = self.id.as_ref().map(Loose::as_id).unwrap_or_default();
        if id.is_empty() {
            return None;
        }

        let quantity = self
            .quantity
            .as_ref()
            .and_then(Loose::as_number)
            .map_or(1, clamp_quantity);

        let price = self
            .price
            .as_ref()
            .and_then(Loose::as_number)
            .and_then(decimal_from_f64);

        let name = self
            .name
            .as_ref()
            .and_then(Loose::as_text)
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_ITEM_NAME)
            .to_string();

        Some(CartItem {
            id,
            name,
            price,
            quantity,
            image: non_empty_or(self.image.as_ref(), PLACEHOLDER_IMAGE),
            url: non_empty_or(self.url.as_ref(), DEFAULT_ITEM_URL),
        })
    }
}

impl From<&CartItem> for CartInput {
    fn from(item: &CartItem) -> Self {
        Self {
            id: Some(Loose::Text(item.id.clone())),
            name: Some(Loose::Text(item.name.clone())),
            price: item.price.map(|p| Loose::Text(p.to_string())),
            quantity: Some(Loose::from(i64::from(item.quantity))),
            image: Some(Loose::Text(item.image.clone())),
            url: Some(Loose::Text(item.url.clone())),
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // Clamped before the cast
fn clamp_quantity(value: f64) -> u32 {
    value.trunc().clamp(1.0, f64::from(u32::MAX)) as u32
}

fn non_empty_or(value: Option<&Loose>, default: &str) -> String {
    value
        .and_then(Loose::as_text)
        .filter(|s| !s.is_empty())
        .unwrap_or(default)
        .to_string()
}

/// Convert a finite float into a decimal using its shortest representation.
///
/// `19.99_f64` becomes exactly `19.99`, not the nearest binary fraction.
#[must_use]
pub fn decimal_from_f64(value: f64) -> Option<Decimal> {
    if !value.is_finite() {
        return None;
    }
    Decimal::from_str(&value.to_string()).ok()
}

/// Parse a price string as written in a `data-product-price` attribute.
///
/// Empty strings and non-numeric text mean "price unknown".
#[must_use]
pub fn parse_price(raw: &str) -> Option<Decimal> {
    Loose::Text(raw.to_string())
        .as_number()
        .and_then(decimal_from_f64)
}
