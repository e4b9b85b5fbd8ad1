//! Structured view of a document's address.

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use url::{Host, Url};

/// Schemes with special parsing rules.
const SPECIAL_SCHEMES: &[&str] = &["ftp", "file", "http", "https", "ws", "wss"];

/// Check if a scheme is one of the special schemes.
pub fn is_special_scheme(scheme: &str) -> bool {
    SPECIAL_SCHEMES.contains(&scheme)
}

/// A URL host.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostRecord {
    Domain(String),
    Ipv4(Ipv4Addr),
    Ipv6(Ipv6Addr),
    /// Host of a non-special URL, kept as written (percent-encoded).
    Opaque(String),
}

impl fmt::Display for HostRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostRecord::Domain(domain) | HostRecord::Opaque(domain) => f.write_str(domain),
            HostRecord::Ipv4(addr) => write!(f, "{}", addr),
            HostRecord::Ipv6(addr) => write!(f, "[{}]", addr),
        }
    }
}

/// URL path representation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UrlPath {
    /// Path of a URL that cannot be a base URL (e.g. `mailto:`).
    Opaque(String),
    /// Hierarchical path segments.
    Segments(Vec<String>),
}

/// Snapshot of a URL record, broken into its components.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddressState {
    pub scheme: String,
    pub host: Option<HostRecord>,
    pub port: Option<u16>,
    pub path: UrlPath,
    pub query: Option<String>,
    pub fragment: Option<String>,
}

impl AddressState {
    /// Capture the components of a URL.
    pub fn capture(url: &Url) -> Self {
        let special = is_special_scheme(url.scheme());
        let host = url.host().map(|host| match host {
            Host::Domain(domain) if special => HostRecord::Domain(domain.to_string()),
            Host::Domain(opaque) => HostRecord::Opaque(opaque.to_string()),
            Host::Ipv4(addr) => HostRecord::Ipv4(addr),
            Host::Ipv6(addr) => HostRecord::Ipv6(addr),
        });

        let path = if url.cannot_be_a_base() {
            UrlPath::Opaque(url.path().to_string())
        } else {
            UrlPath::Segments(
                url.path_segments()
                    .map(|segments| segments.map(str::to_string).collect())
                    .unwrap_or_default(),
            )
        };

        Self {
            scheme: url.scheme().to_string(),
            host,
            port: url.port(),
            path,
            query: url.query().map(str::to_string),
            fragment: url.fragment().map(str::to_string),
        }
    }

    /// Check if the URL cannot be used as a base URL.
    pub fn cannot_be_a_base(&self) -> bool {
        matches!(self.path, UrlPath::Opaque(_))
    }

    pub fn protocol(&self) -> String {
        format!("{}:", self.scheme)
    }

    pub fn host(&self) -> String {
        match (&self.host, self.port) {
            (None, _) => String::new(),
            (Some(host), None) => host.to_string(),
            (Some(host), Some(port)) => format!("{}:{}", host, port),
        }
    }

    pub fn hostname(&self) -> String {
        self.host.as_ref().map(ToString::to_string).unwrap_or_default()
    }

    pub fn port(&self) -> String {
        self.port.map(|p| p.to_string()).unwrap_or_default()
    }

    pub fn pathname(&self) -> String {
        match &self.path {
            UrlPath::Opaque(path) => path.clone(),
            UrlPath::Segments(segments) => format!("/{}", segments.join("/")),
        }
    }

    pub fn search(&self) -> String {
        match self.query.as_deref() {
            None | Some("") => String::new(),
            Some(query) => format!("?{}", query),
        }
    }

    pub fn hash(&self) -> String {
        match self.fragment.as_deref() {
            None | Some("") => String::new(),
            Some(fragment) => format!("#{}", fragment),
        }
    }
}
