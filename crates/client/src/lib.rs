//! Tienda Client - the shop front's in-page runtime.
//!
//! Everything here runs inside one browsing context, modeled by
//! [`dom::Document`]: an element tree with listeners, timers and a storage
//! area that other contexts (tabs) may share.
//!
//! # Modules
//!
//! - [`storage`] - Key/value storage areas and the persisted cart format
//! - [`store`] - [`CartStore`], the single source of truth for the cart
//! - [`actions`] - Delegated add-to-cart and line-control clicks
//! - [`widget`] - The header cart widget
//! - [`checkout`] - The checkout summary
//! - [`session`] - Login session storage and auth-dependent visibility
//! - [`auth`] - Login and registration forms and the auth proxy client
//! - [`suggest`] - Local and remote search suggestions
//! - [`page`] - [`Storefront`], which boots all of the above and follows
//!   client-side navigation
//!
//! # Example
//!
//! ```
//! use tienda_client::dom::{Document, Markup};
//! use tienda_client::Storefront;
//!
//! let doc = Document::new();
//! doc.append(
//!     doc.body(),
//!     &Markup::new("button")
//!         .attr("data-action", "add-to-cart")
//!         .attr("data-product-id", "sku-1")
//!         .attr("data-product-price", "19.99"),
//! );
//!
//! let runtime = Storefront::new(doc.clone());
//! runtime.boot();
//! let button = doc.children(doc.body())[0];
//! doc.click(button);
//!
//! assert_eq!(runtime.store().item_count(), 1);
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod actions;
pub mod auth;
pub mod checkout;
pub mod dom;
pub mod page;
pub mod render;
pub mod session;
pub mod storage;
pub mod store;
pub mod suggest;
pub mod widget;

pub use actions::{ActionKind, CartAction, bind_actions};
pub use auth::{AuthClient, AuthForm};
pub use checkout::CheckoutView;
pub use page::Storefront;
pub use storage::{CartStorage, FileBackend, MemoryBackend, StorageArea, StorageError};
pub use store::{CartStore, Subscription};
pub use suggest::{FetchOutcome, SuggestionBox, SuggestionFetcher};
pub use widget::CartWidget;
