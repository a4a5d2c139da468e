//! Content types returned by the CMS.
//!
//! The CMS speaks the Strapi REST dialect. Version 4 wraps every entry as
//! `{ id, attributes: { .. } }` and every relation or media field as
//! `{ data: .. }`; version 5 returns flat entries. [`flatten_entry`] turns
//! both into flat objects before they are deserialized.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tienda_core::{Loose, PLACEHOLDER_IMAGE, decimal_from_f64, parse_price};
use url::Url;

/// Name shown for products without one.
pub const UNNAMED_PRODUCT: &str = "Producto sin nombre";

/// Flatten a Strapi v4 entry (`{id, attributes}`) into one object.
///
/// Flat entries and non-objects are returned unchanged.
#[must_use]
pub fn flatten_entry(value: Value) -> Value {
    let Value::Object(mut object) = value else {
        return value;
    };
    let Some(Value::Object(attributes)) = object.remove("attributes") else {
        return Value::Object(object);
    };

    let mut flat = Map::new();
    if let Some(id) = object.remove("id") {
        flat.insert("id".to_string(), id);
    }
    flat.extend(attributes);
    Value::Object(flat)
}

/// Find the URL in a media field, whatever its wrapping.
#[must_use]
pub fn media_url(value: &Value) -> Option<&str> {
    match value {
        Value::String(url) if !url.is_empty() => Some(url.as_str()),
        Value::Array(items) => items.iter().find_map(media_url),
        Value::Object(object) => object
            .get("url")
            .and_then(Value::as_str)
            .filter(|url| !url.is_empty())
            .or_else(|| object.get("data").and_then(media_url))
            .or_else(|| object.get("attributes").and_then(media_url)),
        _ => None,
    }
}

/// A catalog product.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Product {
    pub id: Option<i64>,
    pub nombre: Option<String>,
    pub codigo: Option<String>,
    pub slug: Option<String>,
    pub descripcion: Option<String>,
    pub precio: Option<Loose>,
    pub imagen: Option<Value>,
    pub categoria: Option<Value>,
    pub marca: Option<Value>,
}

impl Product {
    #[must_use]
    pub fn name(&self) -> &str {
        self.nombre
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(UNNAMED_PRODUCT)
    }

    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.codigo
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
    }

    /// Price as an exact decimal. Missing, blank or non-numeric prices are
    /// unknown.
    #[must_use]
    pub fn price(&self) -> Option<Decimal> {
        match self.precio.as_ref()? {
            Loose::Number(n) => decimal_from_f64(*n),
            Loose::Text(s) => parse_price(s),
            Loose::Bool(_) | Loose::Other(_) => None,
        }
    }

    /// Identifier used for the cart: the slug, or the numeric id.
    #[must_use]
    pub fn cart_id(&self) -> String {
        self.slug
            .clone()
            .filter(|slug| !slug.is_empty())
            .or_else(|| self.id.map(|id| id.to_string()))
            .unwrap_or_default()
    }

    /// Path of the product's detail page.
    #[must_use]
    pub fn url(&self) -> String {
        match self.slug.as_deref().filter(|slug| !slug.is_empty()) {
            Some(slug) => format!("/tienda/{}", urlencoding::encode(slug)),
            None => "/tienda".to_string(),
        }
    }

    /// Absolute image URL. Relative media paths are resolved against the
    /// CMS; products without an image get the placeholder.
    #[must_use]
    pub fn image_url(&self, media_base: &Url) -> String {
        self.imagen
            .as_ref()
            .and_then(media_url)
            .and_then(|path| media_base.join(path).ok())
            .map_or_else(|| PLACEHOLDER_IMAGE.to_string(), String::from)
    }

    /// Name of the related category, if any.
    #[must_use]
    pub fn category_name(&self) -> Option<String> {
        relation_name(self.categoria.as_ref()?)
    }

    #[must_use]
    pub fn brand_name(&self) -> Option<String> {
        relation_name(self.marca.as_ref()?)
    }
}

fn relation_name(value: &Value) -> Option<String> {
    let value = match value {
        Value::Object(object) if object.contains_key("data") => object.get("data")?,
        other => other,
    };
    let entry = flatten_entry(value.clone());
    entry
        .get("nombre")
        .and_then(Value::as_str)
        .map(String::from)
}

/// A product category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Category {
    pub id: Option<i64>,
    pub nombre: Option<String>,
    pub slug: Option<String>,
}

/// A product brand.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Brand {
    pub id: Option<i64>,
    pub nombre: Option<String>,
    pub slug: Option<String>,
}

/// An editorial page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Page {
    pub id: Option<i64>,
    pub titulo: Option<String>,
    pub slug: Option<String>,
    pub contenido: Option<String>,
}

/// Site-wide settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalData {
    #[serde(alias = "siteName", alias = "nombre")]
    pub site_name: Option<String>,
    #[serde(alias = "siteDescription", alias = "descripcion")]
    pub site_description: Option<String>,
}

/// Pagination block of a collection response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
    pub page_count: u32,
    pub total: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 0,
            page_count: 1,
            total: 0,
        }
    }
}

/// One page of a product listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub pagination: Pagination,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn product(value: Value) -> Product {
        serde_json::from_value(flatten_entry(value)).unwrap()
    }

    #[test]
    fn test_flatten_v4_entry() {
        let flat = flatten_entry(json!({"id": 3, "attributes": {"nombre": "Casco"}}));
        assert_eq!(flat, json!({"id": 3, "nombre": "Casco"}));
    }

    #[test]
    fn test_flatten_leaves_flat_entry() {
        let entry = json!({"id": 3, "nombre": "Casco"});
        assert_eq!(flatten_entry(entry.clone()), entry);
        assert_eq!(flatten_entry(json!("x")), json!("x"));
    }

    #[test]
    fn test_media_url_shapes() {
        assert_eq!(media_url(&json!("/a.png")), Some("/a.png"));
        assert_eq!(media_url(&json!({"url": "/b.png"})), Some("/b.png"));
        assert_eq!(
            media_url(&json!({"data": {"id": 1, "attributes": {"url": "/c.png"}}})),
            Some("/c.png")
        );
        assert_eq!(media_url(&json!([{"url": "/d.png"}])), Some("/d.png"));
        assert_eq!(media_url(&json!({"data": null})), None);
    }

    #[test]
    fn test_product_accessors() {
        let base = Url::parse("http://cms.local/").unwrap();
        let p = product(json!({
            "id": 7,
            "attributes": {
                "nombre": "Casco Pro",
                "codigo": " C1 ",
                "slug": "casco-pro",
                "precio": "19.99",
                "imagen": {"data": {"attributes": {"url": "/uploads/casco.png"}}},
                "categoria": {"data": {"id": 2, "attributes": {"nombre": "Cascos"}}}
            }
        }));

        assert_eq!(p.name(), "Casco Pro");
        assert_eq!(p.code(), Some("C1"));
        assert_eq!(p.price(), Some(Decimal::new(1999, 2)));
        assert_eq!(p.url(), "/tienda/casco-pro");
        assert_eq!(p.cart_id(), "casco-pro");
        assert_eq!(p.image_url(&base), "http://cms.local/uploads/casco.png");
        assert_eq!(p.category_name().as_deref(), Some("Cascos"));
    }

    #[test]
    fn test_product_fallbacks() {
        let base = Url::parse("http://cms.local/").unwrap();
        let p = product(json!({"id": 9, "nombre": "  ", "precio": ""}));

        assert_eq!(p.name(), UNNAMED_PRODUCT);
        assert_eq!(p.price(), None);
        assert_eq!(p.url(), "/tienda");
        assert_eq!(p.cart_id(), "9");
        assert_eq!(p.image_url(&base), PLACEHOLDER_IMAGE);
    }

    #[test]
    fn test_numeric_price() {
        let p = product(json!({"precio": 40.5}));
        assert_eq!(p.price(), Some(Decimal::new(405, 1)));
    }

    #[test]
    fn test_global_aliases() {
        let global: GlobalData =
            serde_json::from_value(json!({"siteName": "Tienda", "siteDescription": "Motos"}))
                .unwrap();
        assert_eq!(global.site_name.as_deref(), Some("Tienda"));
        assert_eq!(global.site_description.as_deref(), Some("Motos"));
    }
}
