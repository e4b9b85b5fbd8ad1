//! Web APIs implementation.
//!
//! This crate provides the Location API:
//! - Address decomposition of the owning document's URL
//! - Field getters/setters that navigate instead of mutating
//! - The origin-gated object surface scripts see

pub mod address;
pub mod config;
pub mod location;
pub mod location_proxy;
pub mod object;

pub use address::{AddressState, HostRecord, UrlPath};
pub use config::{CrossOriginProperty, LocationConfig};
pub use location::Location;
pub use location_proxy::{Access, LocationProxy, ObjectOperation, OperationOutcome};
pub use object::{JsValue, NativeFunction, ObjectId, PropertyDescriptor, PropertyKey, WellKnownSymbol};
