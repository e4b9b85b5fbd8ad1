//! Same-Origin Policy implementation.

use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Represents an origin: either a (scheme, host, port) tuple or an opaque
/// identity that is only ever same-origin with itself.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Origin {
    Tuple {
        scheme: String,
        host: String,
        port: u16,
        /// Value set through `document.domain`, if any.
        domain: Option<String>,
    },
    Opaque(OpaqueOrigin),
}

impl Origin {
    /// Create a new tuple origin from components.
    pub fn new(scheme: &str, host: &str, port: u16) -> Self {
        Origin::Tuple {
            scheme: scheme.to_lowercase(),
            host: host.to_lowercase(),
            port,
            domain: None,
        }
    }

    /// Create a fresh opaque origin.
    pub fn new_opaque() -> Self {
        Origin::Opaque(OpaqueOrigin::new())
    }

    /// Derive the origin of a URL.
    ///
    /// Every call for a URL with an opaque origin yields a distinct origin,
    /// so owners must derive it once and keep it.
    pub fn from_url(url: &Url) -> Self {
        match url.origin() {
            url::Origin::Tuple(scheme, host, port) => Origin::Tuple {
                scheme,
                host: host.to_string(),
                port,
                domain: None,
            },
            url::Origin::Opaque(_) => Origin::new_opaque(),
        }
    }

    /// Parse an origin from a string URL.
    pub fn parse(url_str: &str) -> Option<Self> {
        let url = Url::parse(url_str).ok()?;
        Some(Self::from_url(&url))
    }

    /// Check if this origin is the same as another.
    pub fn is_same_origin(&self, other: &Origin) -> bool {
        match (self, other) {
            (Origin::Opaque(a), Origin::Opaque(b)) => a == b,
            (
                Origin::Tuple { scheme, host, port, .. },
                Origin::Tuple { scheme: other_scheme, host: other_host, port: other_port, .. },
            ) => scheme == other_scheme && host == other_host && port == other_port,
            _ => false,
        }
    }

    /// Same-origin-domain check, honouring values set via `document.domain`.
    pub fn is_same_origin_domain(&self, other: &Origin) -> bool {
        match (self, other) {
            (Origin::Opaque(a), Origin::Opaque(b)) => a == b,
            (
                Origin::Tuple { scheme, domain, .. },
                Origin::Tuple { scheme: other_scheme, domain: other_domain, .. },
            ) => match (domain, other_domain) {
                (Some(a), Some(b)) => scheme == other_scheme && a == b,
                (None, None) => self.is_same_origin(other),
                _ => false,
            },
            _ => false,
        }
    }

    /// Check if this is an opaque origin.
    pub fn is_opaque(&self) -> bool {
        matches!(self, Origin::Opaque(_))
    }

    /// Host of a tuple origin.
    pub fn host(&self) -> Option<&str> {
        match self {
            Origin::Tuple { host, .. } => Some(host),
            Origin::Opaque(_) => None,
        }
    }

    /// The `document.domain` value, if one was set.
    pub fn domain(&self) -> Option<&str> {
        match self {
            Origin::Tuple { domain, .. } => domain.as_deref(),
            Origin::Opaque(_) => None,
        }
    }

    /// Return a copy with the domain component replaced.
    ///
    /// Opaque origins have no domain and are returned unchanged.
    pub fn with_domain(&self, new_domain: &str) -> Self {
        match self {
            Origin::Tuple { scheme, host, port, .. } => Origin::Tuple {
                scheme: scheme.clone(),
                host: host.clone(),
                port: *port,
                domain: Some(new_domain.to_lowercase()),
            },
            Origin::Opaque(_) => self.clone(),
        }
    }

    /// Serialize the origin to a string.
    pub fn serialize(&self) -> String {
        format!("{}", self)
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Tuple { scheme, host, port, .. } => {
                let default_port = match scheme.as_str() {
                    "http" | "ws" => Some(80),
                    "https" | "wss" => Some(443),
                    "ftp" => Some(21),
                    _ => None,
                };

                if Some(*port) == default_port {
                    write!(f, "{}://{}", scheme, host)
                } else {
                    write!(f, "{}://{}:{}", scheme, host, port)
                }
            }
            Origin::Opaque(_) => f.write_str("null"),
        }
    }
}

/// Opaque origin for data:, file:, etc.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct OpaqueOrigin {
    /// Internal identifier for the opaque origin.
    id: u64,
}

impl OpaqueOrigin {
    /// Create a new unique opaque origin.
    pub fn new() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self {
            id: COUNTER.fetch_add(1, Ordering::SeqCst),
        }
    }
}

impl Default for OpaqueOrigin {
    fn default() -> Self {
        Self::new()
    }
}

/// Origin policy applied when a caller touches another context's objects.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OriginPolicy {
    /// Compare the caller's origin against the owner's (same-origin-domain).
    #[default]
    Enforced,
    /// Treat every caller as same-origin. Only valid for embeddings that
    /// never host more than one origin.
    SingleOrigin,
}

impl OriginPolicy {
    /// Check if a caller from `caller` may access objects owned by `owner`.
    pub fn can_access(&self, caller: &Origin, owner: &Origin) -> bool {
        match self {
            OriginPolicy::Enforced => caller.is_same_origin_domain(owner),
            OriginPolicy::SingleOrigin => true,
        }
    }
}
