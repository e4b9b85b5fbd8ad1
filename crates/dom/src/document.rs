//! DOM Document implementation.

use browser_security::Origin;
use common::{BrowserError, BrowserResult};
use encoding_rs::Encoding;
use parking_lot::RwLock;
use std::borrow::Cow;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use url::Url;

/// Document ready state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadyState {
    Loading,
    Interactive,
    Complete,
}

impl ReadyState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReadyState::Loading => "loading",
            ReadyState::Interactive => "interactive",
            ReadyState::Complete => "complete",
        }
    }
}

/// Identifier of the browsing context a document is displayed in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, derive_more::Display)]
#[display("browsing-context-{_0}")]
pub struct BrowsingContextId(u64);

impl BrowsingContextId {
    /// Allocate a new unique id.
    pub fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

/// DOM Document.
#[derive(Debug)]
pub struct Document {
    /// Document URL.
    url: Url,
    /// Base URL set by a `<base>` element, if any.
    base_url: Option<Url>,
    /// Character encoding.
    encoding: &'static Encoding,
    /// Ready state.
    ready_state: ReadyState,
    /// Origin, fixed when the document is created.
    origin: Origin,
    /// Browsing context the document is displayed in.
    browsing_context: BrowsingContextId,
}

impl Document {
    pub fn new(url: Url, browsing_context: BrowsingContextId) -> Self {
        let origin = Origin::from_url(&url);

        Self {
            url,
            base_url: None,
            encoding: encoding_rs::UTF_8,
            ready_state: ReadyState::Loading,
            origin,
            browsing_context,
        }
    }

    /// Wrap the document in a shared reference.
    pub fn into_ref(self) -> DocumentRef {
        Arc::new(RwLock::new(self))
    }

    /// The document's current URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Replace the URL after a same-document navigation.
    ///
    /// The origin is left untouched.
    pub fn set_url(&mut self, url: Url) {
        tracing::debug!("Document URL updated to: {}", url);
        self.url = url;
    }

    /// The document base URL.
    pub fn base_url(&self) -> &Url {
        self.base_url.as_ref().unwrap_or(&self.url)
    }

    /// Set the base URL (as from a `<base href>`).
    pub fn set_base_url(&mut self, base_url: Option<Url>) {
        self.base_url = base_url;
    }

    /// Character encoding.
    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    /// Set the character encoding from a label. Unknown labels are ignored.
    pub fn set_encoding(&mut self, label: &str) -> bool {
        match Encoding::for_label(label.trim().as_bytes()) {
            Some(encoding) => {
                self.encoding = encoding;
                true
            }
            None => {
                tracing::warn!("Unknown encoding label: {}", label);
                false
            }
        }
    }

    /// Ready state.
    pub fn ready_state(&self) -> ReadyState {
        self.ready_state
    }

    /// Advance the ready state.
    pub fn set_ready_state(&mut self, state: ReadyState) {
        self.ready_state = state;
    }

    /// Mark as finished loading.
    pub fn finish_loading(&mut self) {
        self.ready_state = ReadyState::Complete;
    }

    /// Check if the document has completely loaded.
    pub fn is_completely_loaded(&self) -> bool {
        self.ready_state == ReadyState::Complete
    }

    /// The document's origin.
    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    /// Browsing context the document is displayed in.
    pub fn browsing_context(&self) -> BrowsingContextId {
        self.browsing_context
    }

    /// `document.domain`: the domain if set, otherwise the origin host.
    pub fn domain(&self) -> String {
        self.origin
            .domain()
            .or_else(|| self.origin.host())
            .unwrap_or("")
            .to_string()
    }

    /// `document.domain` setter.
    ///
    /// The new value must be the host itself or a dot-separated suffix of it.
    pub fn set_domain(&mut self, value: &str) -> BrowserResult<()> {
        let host = match self.origin.host() {
            Some(host) => host.to_string(),
            None => {
                return Err(BrowserError::security(
                    "document.domain cannot be set on a document with an opaque origin",
                ))
            }
        };

        let value = value.to_lowercase();
        if value.is_empty() || (host != value && !host.ends_with(&format!(".{}", value))) {
            return Err(BrowserError::security(format!(
                "\"{}\" is not a suffix of \"{}\"",
                value, host
            )));
        }

        self.origin = self.origin.with_domain(&value);
        Ok(())
    }

    /// Parse a URL relative to the document base URL using the document's
    /// character encoding.
    pub fn parse_url(&self, input: &str) -> Option<Url> {
        let encoding = self.encoding.output_encoding();
        let options = Url::options().base_url(Some(self.base_url()));

        let result = if encoding == encoding_rs::UTF_8 {
            options.parse(input)
        } else {
            let encode: &dyn Fn(&str) -> Cow<'_, [u8]> = &|s: &str| encoding.encode(s).0;
            options.encoding_override(Some(encode)).parse(input)
        };

        match result {
            Ok(url) => Some(url),
            Err(err) => {
                tracing::debug!("Failed to parse {:?} against {}: {}", input, self.base_url(), err);
                None
            }
        }
    }
}

/// Shared document reference.
pub type DocumentRef = Arc<RwLock<Document>>;

#[cfg(test)]
mod tests {
    use super::*;

    fn document(url: &str) -> Document {
        Document::new(Url::parse(url).unwrap(), BrowsingContextId::next())
    }

    #[test]
    fn test_document_creation() {
        let doc = document("https://example.com/index.html");
        assert_eq!(doc.url().as_str(), "https://example.com/index.html");
        assert_eq!(doc.ready_state(), ReadyState::Loading);
        assert_eq!(doc.origin().serialize(), "https://example.com");
        assert_eq!(doc.encoding(), encoding_rs::UTF_8);
        assert!(!doc.is_completely_loaded());
    }

    #[test]
    fn test_parse_url_uses_base() {
        let mut doc = document("https://example.com/dir/page.html");
        assert_eq!(
            doc.parse_url("other.html").unwrap().as_str(),
            "https://example.com/dir/other.html"
        );

        doc.set_base_url(Some(Url::parse("https://cdn.example.com/assets/").unwrap()));
        assert_eq!(
            doc.parse_url("img.png").unwrap().as_str(),
            "https://cdn.example.com/assets/img.png"
        );
        assert!(doc.parse_url("http://[::1").is_none());
    }

    #[test]
    fn test_parse_url_encodes_query_with_document_encoding() {
        let mut doc = document("https://example.com/");
        assert!(doc.set_encoding("windows-1252"));

        let url = doc.parse_url("/search?q=\u{e9}").unwrap();
        assert_eq!(url.query(), Some("q=%E9"));

        assert!(doc.set_encoding("utf-8"));
        let url = doc.parse_url("/search?q=\u{e9}").unwrap();
        assert_eq!(url.query(), Some("q=%C3%A9"));
    }

    #[test]
    fn test_set_url_keeps_origin() {
        let mut doc = document("https://example.com/");
        doc.set_url(Url::parse("https://example.com/#top").unwrap());
        assert_eq!(doc.url().fragment(), Some("top"));
        assert_eq!(doc.origin().serialize(), "https://example.com");
    }

    #[test]
    fn test_set_domain() {
        let mut doc = document("https://app.example.com/");
        assert_eq!(doc.domain(), "app.example.com");

        assert!(doc.set_domain("other.com").unwrap_err().is_security());
        doc.set_domain("example.com").unwrap();
        assert_eq!(doc.domain(), "example.com");
        assert_eq!(doc.origin().domain(), Some("example.com"));

        let mut opaque = document("data:text/html,hello");
        assert!(opaque.set_domain("example.com").is_err());
    }
}
