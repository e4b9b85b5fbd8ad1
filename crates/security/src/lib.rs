//! Browser security features.
//!
//! This crate implements the origin model used to gate access between
//! browsing contexts:
//! - Tuple and opaque origins
//! - Same-origin and same-origin-domain checks
//! - The origin policy applied to platform objects

pub mod origin;

pub use origin::{OpaqueOrigin, Origin, OriginPolicy};
