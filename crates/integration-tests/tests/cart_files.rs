//! Carts persisted to disk and picked up by the shop front runtime.

#![allow(clippy::unwrap_used)]

use tienda_client::dom::{Document, Markup, Selector};
use tienda_client::widget::WIDGET_ATTRIBUTE;
use tienda_client::{CartStorage, CartStore, FileBackend, StorageArea, Storefront};
use tienda_core::CartInput;

fn widget() -> Markup {
    Markup::new("div")
        .attr(WIDGET_ATTRIBUTE, "")
        .child(
            Markup::new("button")
                .attr("data-cart-toggle", "")
                .child(Markup::new("span").attr("data-cart-count", "")),
        )
        .child(
            Markup::new("div")
                .attr("data-cart-panel", "")
                .class("hidden")
                .child(Markup::new("p").attr("data-cart-empty", ""))
                .child(Markup::new("ul").attr("data-cart-list", ""))
                .child(
                    Markup::new("div")
                        .attr("data-cart-footer", "")
                        .child(Markup::new("span").attr("data-cart-total", "")),
                ),
        )
}

fn text_of(doc: &Document, attribute: &str) -> String {
    doc.text_content(doc.query(doc.body(), &Selector::attr(attribute)).unwrap())
}

#[test]
fn test_cart_written_to_file_is_shown_by_runtime() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("cart.json");

    let writer = CartStore::new(CartStorage::new(StorageArea::new(FileBackend::new(&file))));
    writer.add_item(&CartInput::with_id("sku1").name("Shirt").price(19.99).quantity(2_i64));
    writer.add_item(&CartInput::with_id("sku1").quantity(1_i64));

    let doc = Document::with_storage(StorageArea::new(FileBackend::new(&file)));
    doc.append(doc.body(), &widget());
    let runtime = Storefront::new(doc.clone());
    runtime.boot();

    assert_eq!(runtime.store().item_count(), 3);
    assert_eq!(text_of(&doc, "data-cart-count"), "3");
    assert_eq!(text_of(&doc, "data-cart-total"), "US$ 59.97");
}

#[test]
fn test_corrupt_cart_file_boots_empty_and_recovers() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("cart.json");
    std::fs::write(&file, "{not json").unwrap();

    let doc = Document::with_storage(StorageArea::new(FileBackend::new(&file)));
    doc.append(doc.body(), &widget());
    let runtime = Storefront::new(doc.clone());
    runtime.boot();

    assert_eq!(runtime.store().item_count(), 0);
    assert_eq!(text_of(&doc, "data-cart-count"), "0");

    runtime
        .store()
        .add_item(&CartInput::with_id("sku2").price("5").quantity(1_i64));

    let reader = CartStore::new(CartStorage::new(StorageArea::new(FileBackend::new(&file))));
    assert_eq!(reader.items().len(), 1);
}
