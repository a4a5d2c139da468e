//! Tienda Core - Shared types library.
//!
//! This crate provides common types used across all Tienda components:
//! - `client` - Cart store, widgets and page runtime for the shop front
//! - `storefront` - HTTP service in front of the headless CMS
//! - `cli` - Command-line tools for catalog and cart inspection
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no storage
//! access, no HTTP clients. This keeps it lightweight and allows it to be used
//! anywhere.
//!
//! # Modules
//!
//! - [`types`] - Cart items and their sanitization, money formatting, session
//!   payloads, search suggestions and auth form validation

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
