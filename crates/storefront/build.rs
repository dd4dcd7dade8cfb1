//! Build script for the storefront crate.
//!
//! Content-hashes `static/css/main.css` so the stylesheet can be served with
//! immutable cache headers.

use std::env;
use std::fs;
use std::io;
use std::path::Path;

use sha2::{Digest, Sha256};

fn main() {
    if let Err(e) = hash_css() {
        println!("cargo:warning=Could not hash main.css: {e}");
        println!("cargo:rustc-env=CSS_HASH=");
    }
}

/// Copy main.css to `static/css/derived/main.<hash>.css`.
///
/// Sets `CSS_HASH` for `env!("CSS_HASH")`.
fn hash_css() -> io::Result<()> {
    let manifest_dir = env::var("CARGO_MANIFEST_DIR").map_err(io::Error::other)?;
    let css_path = Path::new(&manifest_dir).join("static/css/main.css");
    println!("cargo:rerun-if-changed={}", css_path.display());

    let content = fs::read(&css_path)?;
    let hash = format!("{:x}", Sha256::digest(&content));
    let short_hash = hash.get(..8).unwrap_or(&hash);

    let derived_dir = Path::new(&manifest_dir).join("static/css/derived");
    fs::create_dir_all(&derived_dir)?;
    fs::copy(&css_path, derived_dir.join(format!("main.{short_hash}.css")))?;

    println!("cargo:rustc-env=CSS_HASH={short_hash}");
    Ok(())
}
