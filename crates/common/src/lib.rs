//! Common utilities and types used across the location core.

pub mod error;

pub use error::{BrowserError, BrowserResult};
