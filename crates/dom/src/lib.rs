//! DOM (Document Object Model) implementation.
//!
//! This crate provides the owning document of a location object and the
//! navigation hand-off used when its address changes.

pub mod document;
pub mod navigation;

pub use document::{BrowsingContextId, Document, DocumentRef, ReadyState};
pub use navigation::{NavigationFlags, NavigationPipeline, NavigationQueue, NavigationRequest};
