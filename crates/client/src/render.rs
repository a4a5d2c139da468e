//! Markup for cart lines and suggestion entries.
//!
//! Lines carry the `data-cart-{decrement,increment,remove}` markers, so the
//! delegated action handler drives them without per-line listeners.

use tienda_core::{CartItem, format_money, line_subtotal_label, unit_price_label};

use crate::dom::Markup;

const SMALL_STEP_BUTTON: &str = "flex h-7 w-7 items-center justify-center rounded-full border border-zinc-200 text-sm text-zinc-600 transition hover:border-primary hover:text-primary dark:border-zinc-700 dark:text-zinc-300";
const LARGE_STEP_BUTTON: &str = "cursor-pointer flex h-9 w-9 items-center justify-center rounded-full border border-zinc-200 text-lg text-zinc-600 transition hover:border-primary hover:text-primary dark:border-zinc-700 dark:text-zinc-300";

fn step_buttons(item: &CartItem, class: &str) -> (Markup, Markup) {
    let decrement = Markup::new("button")
        .attr("type", "button")
        .attr("data-cart-decrement", &item.id)
        .attr("aria-label", format!("Quitar una unidad de {}", item.name))
        .class(class)
        .text("−");
    let increment = Markup::new("button")
        .attr("type", "button")
        .attr("data-cart-increment", &item.id)
        .attr("aria-label", format!("Agregar una unidad de {}", item.name))
        .class(class)
        .text("+");
    (decrement, increment)
}

fn remove_button(item: &CartItem, class: &str) -> Markup {
    Markup::new("button")
        .attr("type", "button")
        .attr("data-cart-remove", &item.id)
        .class(class)
        .text("Eliminar")
}

/// One line of the cart widget's list.
#[must_use]
pub fn mini_cart_line(item: &CartItem) -> Markup {
    let (decrement, increment) = step_buttons(item, SMALL_STEP_BUTTON);

    Markup::new("li")
        .class("flex items-start gap-3 rounded-2xl border border-zinc-200 p-3 dark:border-zinc-800")
        .attr("data-cart-line", &item.id)
        .child(
            Markup::new("img")
                .attr("src", &item.image)
                .attr("alt", &item.name)
                .attr("loading", "lazy")
                .attr("decoding", "async")
                .attr("width", "64")
                .attr("height", "64")
                .class("h-16 w-16 shrink-0 rounded-xl object-cover bg-zinc-100 dark:bg-zinc-800"),
        )
        .child(
            Markup::new("div")
                .class("flex-1")
                .child(
                    Markup::new("a")
                        .attr("href", &item.url)
                        .class("block text-sm font-semibold text-zinc-900 transition hover:text-primary dark:text-white")
                        .text(&item.name),
                )
                .child(
                    Markup::new("p")
                        .class("text-xs text-zinc-500 dark:text-zinc-400")
                        .text(unit_price_label(item.price)),
                )
                .child(
                    Markup::new("div")
                        .class("mt-3 flex flex-wrap items-center gap-2")
                        .child(decrement)
                        .child(
                            Markup::new("span")
                                .class("rounded-full bg-zinc-100 px-3 py-1 text-xs font-semibold text-zinc-700 dark:bg-zinc-800 dark:text-white")
                                .text(format!("x{}", item.quantity)),
                        )
                        .child(increment)
                        .child(remove_button(
                            item,
                            "ml-auto rounded-full border border-transparent px-3 py-1 text-xs font-semibold text-zinc-500 transition hover:text-red-500 dark:text-zinc-400",
                        )),
                ),
        )
}

/// One line of the checkout summary.
#[must_use]
pub fn checkout_line(item: &CartItem) -> Markup {
    let (decrement, increment) = step_buttons(item, LARGE_STEP_BUTTON);

    Markup::new("li")
        .class("flex flex-col gap-4 rounded-3xl border border-zinc-200 p-6 shadow-sm dark:border-zinc-800 dark:bg-zinc-900/40 sm:flex-row sm:items-start")
        .attr("data-checkout-line", &item.id)
        .child(
            Markup::new("div")
                .class("h-24 w-24 shrink-0 overflow-hidden rounded-2xl bg-zinc-100 dark:bg-zinc-800")
                .child(
                    Markup::new("img")
                        .attr("src", &item.image)
                        .attr("alt", &item.name)
                        .attr("loading", "lazy")
                        .attr("decoding", "async")
                        .class("h-full w-full object-cover"),
                ),
        )
        .child(
            Markup::new("div")
                .class("flex-1")
                .child(
                    Markup::new("h3")
                        .class("text-lg font-semibold text-zinc-900 dark:text-white")
                        .text(&item.name),
                )
                .child(
                    Markup::new("p")
                        .class("text-sm text-zinc-500 dark:text-zinc-400")
                        .text(unit_price_label(item.price)),
                )
                .child(
                    Markup::new("div")
                        .class("mt-4 flex flex-wrap items-center gap-3")
                        .child(decrement)
                        .child(
                            Markup::new("span")
                                .class("min-w-[3rem] text-center text-sm font-semibold text-zinc-700 dark:text-white")
                                .text(item.quantity.to_string()),
                        )
                        .child(increment)
                        .child(remove_button(
                            item,
                            "cursor-pointer ml-auto rounded-full border border-transparent px-4 py-2 text-sm font-semibold text-zinc-500 transition hover:text-red-500 dark:text-zinc-400",
                        )),
                )
                .child(
                    Markup::new("p")
                        .class("text-sm font-semibold text-zinc-900 dark:text-white")
                        .attr("data-checkout-line-subtotal", "")
                        .text(line_subtotal_label(item.line_total())),
                ),
        )
}

/// A local suggestion entry.
#[must_use]
pub fn suggestion_option(value: &str) -> Markup {
    Markup::new("li").child(
        Markup::new("button")
            .attr("type", "button")
            .attr("role", "option")
            .attr("data-suggestion-button", "true")
            .attr("data-suggestion-value", value)
            .attr("aria-selected", "false")
            .class("flex w-full items-center gap-2 px-4 py-3 text-left text-sm text-zinc-800 transition hover:bg-zinc-50 hover:text-primary focus:bg-zinc-100 dark:text-white dark:hover:bg-zinc-800")
            .child(Markup::new("span").attr("aria-hidden", "true").class("text-zinc-400"))
            .child(Markup::new("span").text(value)),
    )
}

/// Heading shown above remote suggestions.
pub const REMOTE_SUGGESTIONS_HEADING: &str = "Sugerencias de búsqueda";

/// Contents of the remote suggestion box: a heading and one link per entry.
#[must_use]
pub fn remote_suggestions(items: &[tienda_core::Suggestion]) -> Vec<Markup> {
    let links = items.iter().map(|item| {
        let href = format!(
            "?search={}&page=1",
            url::form_urlencoded::byte_serialize(item.value.as_bytes()).collect::<String>()
        );
        Markup::new("li").child(
            Markup::new("a")
                .class("flex px-4 py-3 transition hover:bg-primary/5 hover:text-primary")
                .attr("href", href)
                .child(
                    Markup::new("span")
                        .class("text-left leading-snug")
                        .text(&item.label),
                ),
        )
    });

    vec![
        Markup::new("div")
            .class("px-4 py-2 text-xs font-semibold uppercase tracking-wide text-zinc-500 dark:text-zinc-400")
            .text(REMOTE_SUGGESTIONS_HEADING),
        Markup::new("ul")
            .class("max-h-64 overflow-y-auto divide-y divide-zinc-100 text-sm")
            .children(links),
    ]
}

/// Text for the cart total.
#[must_use]
pub fn total_label(total: rust_decimal::Decimal) -> String {
    format_money(Some(total))
}
