//! Catalog lookups against the CMS.
//!
//! # Environment Variables
//!
//! - `CMS_URL` - Base URL of the headless CMS
//! - `CMS_API_TOKEN` - Bearer token (optional)

use tienda_core::format_money;
use tienda_storefront::cms::{CmsClient, ProductQuery};
use tienda_storefront::config::CmsConfig;

fn client() -> Result<CmsClient, Box<dyn std::error::Error>> {
    let config = CmsConfig::from_env()?;
    tracing::debug!(cms = %config.url, "Using CMS");
    Ok(CmsClient::new(&config)?)
}

/// List one page of products, optionally filtered by a search term.
///
/// # Errors
///
/// Returns an error if the CMS is not configured or cannot be read.
pub async fn products(search: &str, page: u32) -> Result<(), Box<dyn std::error::Error>> {
    let cms = client()?;
    let listing = cms.products(&ProductQuery::search(search, page)).await?;

    for product in &listing.products {
        tracing::info!(
            "{:<40} {:<12} {:>14}  {}",
            product.name(),
            product.code().unwrap_or("-"),
            format_money(product.price()),
            product.url()
        );
    }
    let pagination = listing.pagination;
    tracing::info!(
        "Page {} of {} ({} products)",
        pagination.page,
        pagination.page_count,
        pagination.total
    );
    Ok(())
}

/// Print the search suggestions the storefront would offer for `query`.
///
/// # Errors
///
/// Returns an error if the CMS is not configured. CMS failures yield no
/// suggestions, as they do on the site.
pub async fn suggest(query: &str, limit: u32) -> Result<(), Box<dyn std::error::Error>> {
    let cms = client()?;
    let suggestions = cms.search_suggestions(query, limit).await;

    if suggestions.is_empty() {
        tracing::info!("No suggestions for {query:?}");
    }
    for suggestion in suggestions {
        tracing::info!("{}", suggestion.label);
    }
    Ok(())
}
