//! Catalog route handlers: product listing and product detail.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use tienda_core::{Suggestion, format_money};
use tracing::instrument;
use url::Url;

use crate::cms::{Product, ProductQuery};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::routes::Layout;
use crate::state::AppState;

/// Product display data for templates.
///
/// `price` feeds the `data-product-price` attribute and is empty when the
/// price is unknown; `price_label` is what shoppers read.
#[derive(Debug, Clone)]
pub struct ProductView {
    pub id: String,
    pub name: String,
    pub code: Option<String>,
    pub url: String,
    pub image: String,
    pub price: String,
    pub price_label: String,
    pub description: String,
    pub category: Option<String>,
    pub brand: Option<String>,
}

impl ProductView {
    #[must_use]
    pub fn from_product(product: &Product, media_base: &Url) -> Self {
        let price = product.price();
        Self {
            id: product.cart_id(),
            name: product.name().to_string(),
            code: product.code().map(String::from),
            url: product.url(),
            image: product.image_url(media_base),
            price: price.map(|p| p.to_string()).unwrap_or_default(),
            price_label: format_money(price),
            description: product.descripcion.clone().unwrap_or_default(),
            category: product.category_name(),
            brand: product.brand_name(),
        }
    }
}

/// Listing query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct ListingQuery {
    pub search: Option<String>,
    pub page: Option<u32>,
}

/// Product listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "tienda/index.html")]
pub struct ListingTemplate {
    pub layout: Layout,
    pub title: String,
    pub search: String,
    pub products: Vec<ProductView>,
    pub current_page: u32,
    pub total_pages: u32,
    pub total: u32,
    pub prev_href: Option<String>,
    pub next_href: Option<String>,
    /// Candidate strings for the local suggestion box.
    pub suggestion_data: Vec<String>,
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "tienda/show.html")]
pub struct DetailTemplate {
    pub layout: Layout,
    pub title: String,
    pub product: ProductView,
}

/// Link to a listing page, keeping the search term.
fn page_href(search: &str, page: u32) -> String {
    let mut href = String::from("/tienda");
    let mut separator = '?';
    if !search.is_empty() {
        href.push_str(&format!("{separator}search={}", urlencoding::encode(search)));
        separator = '&';
    }
    if page > 1 {
        href.push_str(&format!("{separator}page={page}"));
    }
    href
}

/// Display the product listing.
///
/// # Errors
///
/// Returns `AppError::Cms` when the catalog cannot be read.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ListingQuery>,
) -> Result<ListingTemplate> {
    let search = query.search.unwrap_or_default().trim().to_string();
    let listing = state
        .cms()
        .products(&ProductQuery::search(&search, query.page.unwrap_or(1)))
        .await?;

    let media_base = state.cms().media_base();
    let products: Vec<ProductView> = listing
        .products
        .iter()
        .map(|product| ProductView::from_product(product, media_base))
        .collect();

    let mut suggestion_data: Vec<String> = Vec::new();
    for product in &products {
        for candidate in [
            product.name.clone(),
            Suggestion::for_product(&product.name, product.code.as_deref()).value,
        ] {
            if !suggestion_data.contains(&candidate) {
                suggestion_data.push(candidate);
            }
        }
    }

    let pagination = listing.pagination;
    let current_page = pagination.page.max(1);
    let total_pages = pagination.page_count.max(1);
    let layout = Layout::load(&state).await;
    let title = if search.is_empty() {
        layout.title("Tienda")
    } else {
        layout.title(&format!("Resultados para \"{search}\""))
    };

    Ok(ListingTemplate {
        title,
        prev_href: (current_page > 1).then(|| page_href(&search, current_page - 1)),
        next_href: (current_page < total_pages).then(|| page_href(&search, current_page + 1)),
        layout,
        search,
        products,
        current_page,
        total_pages,
        total: pagination.total,
        suggestion_data,
    })
}

/// Display a product detail page.
///
/// # Errors
///
/// Returns `AppError::NotFound` for unknown slugs and `AppError::Cms` when
/// the catalog cannot be read.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<DetailTemplate> {
    let product = state
        .cms()
        .product_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {slug}")))?;

    add_breadcrumb("catalog", "Viewed product", Some(&[("slug", slug.as_str())]));

    let product = ProductView::from_product(&product, state.cms().media_base());
    let layout = Layout::load(&state).await;
    Ok(DetailTemplate {
        title: layout.title(&product.name),
        layout,
        product,
    })
}
