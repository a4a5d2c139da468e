//! Build script for the storefront crate.
//!
//! Fingerprints the stylesheet so it can be served with immutable caching.

use std::env;
use std::fs;
use std::path::Path;

use sha2::{Digest, Sha256};

fn main() {
    fingerprint_stylesheet();
}

/// Copy `static/css/main.css` to `static/css/derived/main.<hash>.css`.
///
/// Sets `CSS_HASH` (first 8 hex chars of the SHA-256) for `env!("CSS_HASH")`.
/// An unreadable stylesheet yields an empty hash and templates fall back to
/// the unfingerprinted file.
fn fingerprint_stylesheet() {
    let manifest_dir =
        env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR must be set by Cargo");
    let css_path = Path::new(&manifest_dir).join("static/css/main.css");
    println!("cargo:rerun-if-changed={}", css_path.display());

    let Ok(content) = fs::read(&css_path) else {
        println!("cargo:warning=Could not read {}", css_path.display());
        println!("cargo:rustc-env=CSS_HASH=");
        return;
    };

    let digest = format!("{:x}", Sha256::digest(&content));
    let short_hash: String = digest.chars().take(8).collect();
    println!("cargo:rustc-env=CSS_HASH={short_hash}");

    let derived_dir = Path::new(&manifest_dir).join("static/css/derived");
    fs::create_dir_all(&derived_dir).expect("Failed to create derived CSS directory");
    fs::copy(&css_path, derived_dir.join(format!("main.{short_hash}.css")))
        .expect("Failed to copy CSS to derived directory");
}
