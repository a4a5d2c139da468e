//! Cart route handlers.
//!
//! The cart lives in the browser; the server only renders the empty
//! checkout skeleton that the client binds to.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use tracing::instrument;

use crate::filters;
use crate::routes::Layout;
use crate::state::AppState;

/// Checkout page template.
#[derive(Template, WebTemplate)]
#[template(path = "carrito.html")]
pub struct CheckoutTemplate {
    pub layout: Layout,
    pub title: String,
}

/// Display the checkout page.
#[instrument(skip(state))]
pub async fn show(State(state): State<AppState>) -> CheckoutTemplate {
    let layout = Layout::load(&state).await;
    CheckoutTemplate {
        title: layout.title("Carrito"),
        layout,
    }
}
