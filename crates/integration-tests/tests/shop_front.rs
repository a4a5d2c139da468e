//! The shop front runtime talking to a live storefront.

#![allow(clippy::unwrap_used)]

use serde_json::json;
use tienda_client::auth::{AUTH_FORM_ATTRIBUTE, FEEDBACK_ATTRIBUTE, REDIRECT_ATTRIBUTE};
use tienda_client::dom::{Document, Markup, Selector};
use tienda_client::session::{AUTH_VISIBLE_ATTRIBUTE, has_active_session, save_session};
use tienda_client::suggest::{CONTAINER_ID, DATA_ID, FORM_ID, INPUT_ID, LIST_ID};
use tienda_client::widget::WIDGET_ATTRIBUTE;
use tienda_client::{ActionKind, AuthClient, FetchOutcome, Storefront, SuggestionFetcher};
use tienda_core::{StoredSession, Suggestion};
use tienda_integration_tests::{TestContext, product};
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_listing_markup_has_every_hook_the_runtime_binds() {
    let ctx = TestContext::new().await;
    ctx.mount_products(json!([product(1, "Casco Pro", "C1", "casco-pro", json!(19.99))]))
        .await;

    let page = ctx.get("/tienda").await;

    assert!(page.body.contains(ActionKind::AddToCart.attribute()));
    assert!(page.body.contains(WIDGET_ATTRIBUTE));
    for hook in [
        "data-cart-toggle",
        "data-cart-panel",
        "data-cart-count",
        "data-cart-list",
        "data-cart-empty",
        "data-cart-footer",
        "data-cart-total",
        "data-cart-clear",
        "data-cart-close",
        "data-cart-checkout",
    ] {
        assert!(page.body.contains(hook), "missing {hook}");
    }
    for id in [FORM_ID, INPUT_ID, CONTAINER_ID, LIST_ID, DATA_ID] {
        assert!(page.body.contains(&format!(r#"id="{id}""#)), "missing #{id}");
    }
}

#[tokio::test]
async fn test_remote_suggestions_through_storefront() {
    let ctx = TestContext::new().await;
    ctx.mount_products(json!([product(1, "Casco Pro", "C1", "casco-pro", json!(19.99))]))
        .await;
    let base = ctx.serve().await;
    let fetcher = SuggestionFetcher::new(&base).unwrap();

    assert_eq!(fetcher.request("c").await, FetchOutcome::Hide);
    assert_eq!(
        fetcher.request("casco").await,
        FetchOutcome::Show(vec![Suggestion {
            value: "Casco Pro C1".to_string(),
            label: "Casco Pro • C1".to_string(),
        }])
    );
}

#[tokio::test]
async fn test_remote_suggestions_hide_on_cms_outage() {
    let ctx = TestContext::new().await;
    Mock::given(path("/api/productos"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&ctx.cms)
        .await;
    let base = ctx.serve().await;
    let fetcher = SuggestionFetcher::new(&base).unwrap();

    assert_eq!(fetcher.request("casco").await, FetchOutcome::Hide);
}

#[tokio::test]
async fn test_login_session_reveals_account_links() {
    let ctx = TestContext::new().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/local"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jwt": "token",
            "user": {"username": "ana", "confirmed": true}
        })))
        .mount(&ctx.cms)
        .await;

    let response = ctx
        .post_json("/api/auth/login", &json!({"identifier": "ana", "password": "pw"}))
        .await;
    let session: StoredSession = serde_json::from_value(response.json()).unwrap();

    let doc = Document::new();
    doc.append(
        doc.body(),
        &Markup::new("span")
            .attr(AUTH_VISIBLE_ATTRIBUTE, "authenticated")
            .class("hidden"),
    );
    doc.append(
        doc.body(),
        &Markup::new("a").attr(AUTH_VISIBLE_ATTRIBUTE, "anonymous"),
    );
    let runtime = Storefront::new(doc.clone());
    runtime.boot();

    save_session(&doc, &session);

    assert!(has_active_session(&doc));
    let authenticated = doc
        .query(
            doc.body(),
            &Selector::attr_eq(AUTH_VISIBLE_ATTRIBUTE, "authenticated"),
        )
        .unwrap();
    let anonymous = doc
        .query(doc.body(), &Selector::attr_eq(AUTH_VISIBLE_ATTRIBUTE, "anonymous"))
        .unwrap();
    assert!(!doc.has_class(authenticated, "hidden"));
    assert!(doc.has_class(anonymous, "hidden"));
}

#[tokio::test]
async fn test_login_form_signs_in_through_storefront_proxy() {
    let ctx = TestContext::new().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/local"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jwt": "token",
            "user": {"username": "ana", "confirmed": true}
        })))
        .mount(&ctx.cms)
        .await;
    let page = ctx.get("/login").await;
    for hook in [AUTH_FORM_ATTRIBUTE, FEEDBACK_ATTRIBUTE, REDIRECT_ATTRIBUTE] {
        assert!(page.body.contains(hook), "missing {hook}");
    }
    let base = ctx.serve().await;

    let doc = Document::new();
    let form = doc.append(
        doc.body(),
        &Markup::new("form")
            .attr(AUTH_FORM_ATTRIBUTE, "login")
            .attr(REDIRECT_ATTRIBUTE, "/tienda")
            .child(Markup::new("input").attr("name", "identifier"))
            .child(Markup::new("input").attr("name", "password"))
            .child(Markup::new("p").attr(FEEDBACK_ATTRIBUTE, ""))
            .child(Markup::new("button").attr("type", "submit")),
    );
    let runtime = Storefront::new(doc.clone());
    runtime.boot();
    for (name, value) in [("identifier", "ana"), ("password", "pw")] {
        let input = doc.query(form, &Selector::attr_eq("name", name)).unwrap();
        doc.type_text(input, value);
    }
    doc.submit(form);

    let auth = runtime.auth_form().unwrap();
    assert!(auth.send_pending(&doc, &AuthClient::new(&base).unwrap()).await);

    assert!(has_active_session(&doc));
    assert_eq!(doc.location(), "/tienda");
}

#[tokio::test]
async fn test_login_form_shows_cms_rejection() {
    let ctx = TestContext::new().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/local"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"message": "Invalid identifier or password"}
        })))
        .mount(&ctx.cms)
        .await;
    let base = ctx.serve().await;

    let doc = Document::new();
    let form = doc.append(
        doc.body(),
        &Markup::new("form")
            .attr(AUTH_FORM_ATTRIBUTE, "login")
            .child(Markup::new("input").attr("name", "identifier"))
            .child(Markup::new("input").attr("name", "password"))
            .child(Markup::new("p").attr(FEEDBACK_ATTRIBUTE, "")),
    );
    let runtime = Storefront::new(doc.clone());
    runtime.boot();
    for (name, value) in [("identifier", "ana"), ("password", "nope")] {
        let input = doc.query(form, &Selector::attr_eq("name", name)).unwrap();
        doc.type_text(input, value);
    }
    doc.submit(form);

    let auth = runtime.auth_form().unwrap();
    auth.send_pending(&doc, &AuthClient::new(&base).unwrap()).await;

    let feedback = doc.query(form, &Selector::attr(FEEDBACK_ATTRIBUTE)).unwrap();
    assert!(!has_active_session(&doc));
    assert_eq!(doc.text_content(feedback), "Invalid identifier or password");
}
