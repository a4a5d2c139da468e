//! Money formatting for the storefront's display currency.
//!
//! Prices are shown the way `Intl.NumberFormat("es-PE", { currency: "USD" })`
//! renders them: `US$` prefix, comma thousands separator, two decimals.
//! Unknown prices read "Consultar".

use rust_decimal::{Decimal, RoundingStrategy};

/// Currency prefix for displayed amounts.
pub const CURRENCY_PREFIX: &str = "US$";

/// Label for prices that are not known.
pub const UNKNOWN_PRICE: &str = "Consultar";

/// Format an optional amount for display.
///
/// Negative amounts are clamped to zero.
///
/// ```
/// use rust_decimal::Decimal;
/// use tienda_core::format_money;
///
/// assert_eq!(format_money(Some(Decimal::new(123_450, 2))), "US$ 1,234.50");
/// assert_eq!(format_money(None), "Consultar");
/// ```
#[must_use]
pub fn format_money(value: Option<Decimal>) -> String {
    let Some(amount) = value else {
        return UNKNOWN_PRICE.to_string();
    };

    let amount = amount
        .max(Decimal::ZERO)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let fixed = format!("{amount:.2}");
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    format!("{CURRENCY_PREFIX} {}.{cents}", group_thousands(whole))
}

/// Per-unit price label used on line items.
#[must_use]
pub fn unit_price_label(price: Option<Decimal>) -> String {
    price.map_or_else(
        || "Precio a consultar".to_string(),
        |p| format!("{} c/u", format_money(Some(p))),
    )
}

/// Line subtotal label used on the checkout page.
#[must_use]
pub fn line_subtotal_label(subtotal: Option<Decimal>) -> String {
    subtotal.map_or_else(
        || "Subtotal: --".to_string(),
        |s| format!("Subtotal: {}", format_money(Some(s))),
    )
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut grouped = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}
