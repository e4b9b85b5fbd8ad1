//! Oxide Location - the Location object of a browsing context.
//!
//! This crate wires the location components into a page:
//! - Owning document and its origin
//! - Location getters, setters and navigation methods
//! - Origin-gated object surface
//! - Navigation commit (same-document fragments, new documents otherwise)

pub mod config;
pub mod page;

pub use config::BrowserConfig;
pub use page::Page;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
