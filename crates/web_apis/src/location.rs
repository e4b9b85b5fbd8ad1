//! Location API implementation.
//!
//! Field setters never touch the document's URL. They work on a copy and
//! hand the result to the navigation pipeline, which decides when (and
//! whether) the document's address actually changes.

use crate::address::{is_special_scheme, AddressState};
use common::{BrowserError, BrowserResult};
use dom::{Document, DocumentRef, NavigationFlags, NavigationPipeline, NavigationRequest};
use encoding_rs::Encoding;
use parking_lot::RwLock;
use std::borrow::Cow;
use std::sync::{Arc, Weak};
use url::{quirks, Url};

/// Location API implementation.
pub struct Location {
    /// Owning document. The location never outlives it in practice, but it
    /// must not keep it alive either.
    document: Weak<RwLock<Document>>,
    /// Where navigation requests go.
    pipeline: Arc<dyn NavigationPipeline>,
}

impl Location {
    /// Create the location object for a document.
    pub fn new(document: &DocumentRef, pipeline: Arc<dyn NavigationPipeline>) -> Self {
        Self {
            document: Arc::downgrade(document),
            pipeline,
        }
    }

    fn document(&self) -> BrowserResult<DocumentRef> {
        self.document
            .upgrade()
            .ok_or_else(|| BrowserError::invalid_state("the document owning this location is gone"))
    }

    /// The owning document, if it is still alive.
    pub fn owner(&self) -> Option<DocumentRef> {
        self.document.upgrade()
    }

    /// Current URL of the owning document.
    pub fn url(&self) -> BrowserResult<Url> {
        Ok(self.document()?.read().url().clone())
    }

    /// Structured view of the current URL.
    pub fn address(&self) -> BrowserResult<AddressState> {
        Ok(AddressState::capture(self.document()?.read().url()))
    }

    /// Get the full URL as a string.
    pub fn href(&self) -> BrowserResult<String> {
        Ok(self.url()?.to_string())
    }

    /// Navigate to `value`, resolved against the document base URL.
    pub fn set_href(&self, value: &str) -> BrowserResult<()> {
        let document = self.document()?;
        let url = document
            .read()
            .parse_url(value)
            .ok_or_else(|| BrowserError::type_error(format!("Could not parse \"{}\" as a URL", value)))?;

        self.setter_navigate(&document, url);
        Ok(())
    }

    /// Get the origin.
    pub fn origin(&self) -> BrowserResult<String> {
        Ok(self.url()?.origin().ascii_serialization())
    }

    /// Get the protocol (e.g., "https:").
    pub fn protocol(&self) -> BrowserResult<String> {
        Ok(self.address()?.protocol())
    }

    /// Set the protocol. Only changes within http/https navigate.
    pub fn set_protocol(&self, value: &str) -> BrowserResult<()> {
        let document = self.document()?;
        let mut copy = document.read().url().clone();

        // Tab and newline are dropped from URL input before parsing.
        let value: String = value.chars().filter(|c| !matches!(c, '\t' | '\n' | '\r')).collect();
        let value = value.as_str();

        let scheme = value.split(':').next().unwrap_or_default();
        if !is_valid_scheme(scheme) {
            return Err(BrowserError::type_error(format!(
                "Could not parse the URL after setting the protocol to \"{}\"",
                value
            )));
        }

        // A transition the URL cannot make (special <-> non-special, file
        // with credentials or port) leaves the copy as it was.
        if quirks::set_protocol(&mut copy, value).is_err() {
            tracing::trace!("Scheme change to {:?} not applicable to {}", scheme, copy);
        }

        if copy.scheme() != "http" && copy.scheme() != "https" {
            tracing::trace!("Ignoring protocol change to {:?}", copy.scheme());
            return Ok(());
        }

        self.setter_navigate(&document, copy);
        Ok(())
    }

    /// Get the host (hostname:port).
    pub fn host(&self) -> BrowserResult<String> {
        Ok(self.address()?.host())
    }

    /// Set the host, optionally with a port.
    pub fn set_host(&self, value: &str) -> BrowserResult<()> {
        let document = self.document()?;
        let mut copy = document.read().url().clone();

        if copy.cannot_be_a_base() {
            return Ok(());
        }

        if quirks::set_host(&mut copy, value).is_err() {
            tracing::debug!("Host {:?} rejected for {}", value, copy);
        }

        self.setter_navigate(&document, copy);
        Ok(())
    }

    /// Get the hostname.
    pub fn hostname(&self) -> BrowserResult<String> {
        Ok(self.address()?.hostname())
    }

    /// Set the hostname, keeping the port.
    pub fn set_hostname(&self, value: &str) -> BrowserResult<()> {
        let document = self.document()?;
        let mut copy = document.read().url().clone();

        if copy.cannot_be_a_base() {
            return Ok(());
        }

        if quirks::set_hostname(&mut copy, value).is_err() {
            tracing::debug!("Hostname {:?} rejected for {}", value, copy);
        }

        self.setter_navigate(&document, copy);
        Ok(())
    }

    /// Get the port.
    pub fn port(&self) -> BrowserResult<String> {
        Ok(self.address()?.port())
    }

    /// Set the port. Ignored for URLs without a host and for `file:` URLs.
    pub fn set_port(&self, value: &str) -> BrowserResult<()> {
        let document = self.document()?;
        let mut copy = document.read().url().clone();

        if !copy.has_host() || copy.cannot_be_a_base() || copy.scheme() == "file" {
            tracing::trace!("Ignoring port change on {}", copy);
            return Ok(());
        }

        if quirks::set_port(&mut copy, value).is_err() {
            tracing::debug!("Port {:?} rejected for {}", value, copy);
        }

        self.setter_navigate(&document, copy);
        Ok(())
    }

    /// Get the pathname.
    pub fn pathname(&self) -> BrowserResult<String> {
        Ok(self.address()?.pathname())
    }

    /// Set the pathname.
    pub fn set_pathname(&self, value: &str) -> BrowserResult<()> {
        let document = self.document()?;
        let mut copy = document.read().url().clone();

        if copy.cannot_be_a_base() {
            tracing::trace!("Ignoring pathname change on {}", copy);
            return Ok(());
        }

        quirks::set_pathname(&mut copy, value);

        self.setter_navigate(&document, copy);
        Ok(())
    }

    /// Get the search string (query string with ?).
    pub fn search(&self) -> BrowserResult<String> {
        Ok(self.address()?.search())
    }

    /// Set the search string. The empty string removes the query.
    pub fn set_search(&self, value: &str) -> BrowserResult<()> {
        let document = self.document()?;
        let (mut copy, encoding) = {
            let doc = document.read();
            (doc.url().clone(), doc.encoding())
        };

        if value.is_empty() {
            copy.set_query(None);
        } else {
            let input = value.strip_prefix('?').unwrap_or(value);
            set_query_with_encoding(&mut copy, input, encoding);
        }

        self.setter_navigate(&document, copy);
        Ok(())
    }

    /// Get the hash (fragment with #).
    pub fn hash(&self) -> BrowserResult<String> {
        Ok(self.address()?.hash())
    }

    /// Set the hash. The empty string removes the fragment.
    pub fn set_hash(&self, value: &str) -> BrowserResult<()> {
        let document = self.document()?;
        let mut copy = document.read().url().clone();

        if copy.scheme() == "javascript" {
            tracing::trace!("Ignoring hash change on a javascript: URL");
            return Ok(());
        }

        // Handles both the empty value and a leading '#'.
        quirks::set_hash(&mut copy, value);

        self.setter_navigate(&document, copy);
        Ok(())
    }

    /// Navigate to `value` (creates a history entry).
    pub fn assign(&self, value: &str) -> BrowserResult<()> {
        let document = self.document()?;
        let url = resolve(&document, value)?;
        self.navigate(&document, url, NavigationFlags::EXCEPTIONS_ENABLED);
        Ok(())
    }

    /// Navigate to `value`, replacing the current history entry.
    pub fn replace(&self, value: &str) -> BrowserResult<()> {
        let document = self.document()?;
        let url = resolve(&document, value)?;
        self.navigate(
            &document,
            url,
            NavigationFlags::REPLACEMENT | NavigationFlags::EXCEPTIONS_ENABLED,
        );
        Ok(())
    }

    /// Reload the current page.
    pub fn reload(&self) -> BrowserResult<()> {
        let document = self.document()?;
        let url = document.read().url().clone();
        self.navigate(
            &document,
            url,
            NavigationFlags::REPLACEMENT
                | NavigationFlags::RELOAD_TRIGGERED
                | NavigationFlags::EXCEPTIONS_ENABLED,
        );
        Ok(())
    }

    /// Stringifier; same as `href`.
    pub fn stringify(&self) -> BrowserResult<String> {
        self.href()
    }

    /// Navigation used by the field setters. Replaces the history entry
    /// while the document is still loading.
    fn setter_navigate(&self, document: &DocumentRef, url: Url) {
        let mut flags = NavigationFlags::EXCEPTIONS_ENABLED;
        if !document.read().is_completely_loaded() {
            flags |= NavigationFlags::REPLACEMENT;
        }
        self.navigate(document, url, flags);
    }

    fn navigate(&self, document: &DocumentRef, url: Url, flags: NavigationFlags) {
        // The read guard is released before the hand-off.
        let target = document.read().browsing_context();
        tracing::debug!("Location navigating {} to {} ({:?})", target, url, flags);
        self.pipeline.navigate(NavigationRequest::new(target, url, flags));
    }
}

/// Resolve `value` for `assign`/`replace`.
fn resolve(document: &DocumentRef, value: &str) -> BrowserResult<Url> {
    let doc = document.read();
    doc.parse_url(value).ok_or_else(|| {
        BrowserError::syntax(format!(
            "Could not resolve the given string \"{}\" relative to the base URL \"{}\"",
            value,
            doc.base_url()
        ))
    })
}

/// Scheme syntax: an ASCII letter followed by letters, digits, `+`, `-`, `.`.
fn is_valid_scheme(scheme: &str) -> bool {
    let mut chars = scheme.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {
            chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        _ => false,
    }
}

/// Set the query, encoding it with the document encoding where the URL
/// standard calls for it.
fn set_query_with_encoding(url: &mut Url, input: &str, encoding: &'static Encoding) {
    let encoding = encoding.output_encoding();
    let scheme = url.scheme();
    if encoding == encoding_rs::UTF_8 || !is_special_scheme(scheme) || scheme == "ws" || scheme == "wss" {
        url.set_query(Some(input));
        return;
    }

    // Re-parse "?query" against the current URL so the parser applies the
    // encoding override, then restore the fragment the reference dropped.
    let fragment = url.fragment().map(str::to_string);
    let reference = format!("?{}", escape_for_query_reparse(input));
    let encode: &dyn Fn(&str) -> Cow<'_, [u8]> = &|s: &str| encoding.encode(s).0;
    let reparsed = Url::options()
        .base_url(Some(&*url))
        .encoding_override(Some(encode))
        .parse(&reference);

    match reparsed {
        Ok(mut new_url) => {
            new_url.set_fragment(fragment.as_deref());
            *url = new_url;
        }
        Err(err) => {
            tracing::warn!("Query re-parse failed ({}), falling back to UTF-8", err);
            url.set_query(Some(input));
        }
    }
}

/// Prepare a query for re-parsing as a relative reference. `#` would start
/// a fragment, and trailing C0 controls and spaces would be trimmed from the
/// whole input, so both are percent-encoded the way the query state does.
fn escape_for_query_reparse(input: &str) -> String {
    let body = input.trim_end_matches(|c: char| c <= ' ');
    let mut escaped = body.replace('#', "%23");

    for c in input[body.len()..].chars() {
        if !matches!(c, '\t' | '\n' | '\r') {
            escaped.push_str(&format!("%{:02X}", c as u32));
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use dom::{BrowsingContextId, NavigationQueue};

    fn setup(url: &str) -> (DocumentRef, Arc<NavigationQueue>, Location) {
        let document = Document::new(Url::parse(url).unwrap(), BrowsingContextId::next()).into_ref();
        document.write().finish_loading();
        let queue = Arc::new(NavigationQueue::new());
        let location = Location::new(&document, queue.clone());
        (document, queue, location)
    }

    fn only_request(queue: &NavigationQueue) -> NavigationRequest {
        let mut requests = queue.drain();
        assert_eq!(requests.len(), 1, "expected exactly one navigation request");
        requests.remove(0)
    }

    #[test]
    fn test_location_getters() {
        let (_doc, _queue, location) = setup("https://example.com:8080/path?query=value#hash");

        assert_eq!(location.href().unwrap(), "https://example.com:8080/path?query=value#hash");
        assert_eq!(location.protocol().unwrap(), "https:");
        assert_eq!(location.hostname().unwrap(), "example.com");
        assert_eq!(location.port().unwrap(), "8080");
        assert_eq!(location.host().unwrap(), "example.com:8080");
        assert_eq!(location.pathname().unwrap(), "/path");
        assert_eq!(location.search().unwrap(), "?query=value");
        assert_eq!(location.hash().unwrap(), "#hash");
        assert_eq!(location.origin().unwrap(), "https://example.com:8080");
        assert_eq!(location.stringify().unwrap(), location.href().unwrap());
    }

    #[test]
    fn test_getters_read_live_document() {
        let (doc, _queue, location) = setup("https://example.com/a");
        assert_eq!(location.pathname().unwrap(), "/a");

        doc.write().set_url(Url::parse("https://example.com/b#x").unwrap());
        assert_eq!(location.pathname().unwrap(), "/b");
        assert_eq!(location.hash().unwrap(), "#x");
    }

    #[test]
    fn test_href_round_trip() {
        for input in [
            "https://example.com/",
            "http://user:pw@[::1]:8080/a/b/../c?q=%20#f",
            "mailto:someone@example.com",
            "file:///tmp/report.txt",
        ] {
            let (_doc, queue, location) = setup(input);
            let before = location.address().unwrap();

            location.set_href(&location.href().unwrap()).unwrap();
            let request = only_request(&queue);

            assert_eq!(request.url.as_str(), location.href().unwrap());
            assert_eq!(AddressState::capture(&request.url), before);
        }
    }

    #[test]
    fn test_set_href_resolves_and_rejects() {
        let (_doc, queue, location) = setup("https://example.com/dir/page");

        location.set_href("other?x=1").unwrap();
        assert_eq!(only_request(&queue).url.as_str(), "https://example.com/dir/other?x=1");

        let err = location.set_href("http://[::1").unwrap_err();
        assert_eq!(err.dom_exception_name(), "TypeError");
        assert!(queue.is_empty());
    }

    #[test]
    fn test_set_search_keeps_fragment() {
        let (_doc, queue, location) = setup("https://a.example/path?x=1#frag");

        location.set_search("y=2").unwrap();

        let request = only_request(&queue);
        assert_eq!(request.url.as_str(), "https://a.example/path?y=2#frag");
        assert!(!request.is_replacement());
        assert!(request.flags.contains(NavigationFlags::EXCEPTIONS_ENABLED));
    }

    #[test]
    fn test_set_search_variants() {
        let (_doc, queue, location) = setup("https://a.example/path?x=1#frag");

        location.set_search("").unwrap();
        assert_eq!(only_request(&queue).url.as_str(), "https://a.example/path#frag");

        location.set_search("?z=3").unwrap();
        assert_eq!(only_request(&queue).url.as_str(), "https://a.example/path?z=3#frag");

        location.set_search("?").unwrap();
        assert_eq!(only_request(&queue).url.query(), Some(""));
    }

    #[test]
    fn test_set_search_uses_document_encoding() {
        let (doc, queue, location) = setup("https://a.example/path#frag");
        doc.write().set_encoding("windows-1252");

        location.set_search("q=\u{e9}&h=#").unwrap();

        let request = only_request(&queue);
        assert_eq!(request.url.query(), Some("q=%E9&h=%23"));
        assert_eq!(request.url.fragment(), Some("frag"));
    }

    #[test]
    fn test_set_search_trailing_space_matches_across_encodings() {
        let (_doc, queue, location) = setup("https://a.example/path");
        location.set_search("q=a ").unwrap();
        let utf8 = only_request(&queue).url;

        let (doc, queue, location) = setup("https://a.example/path");
        doc.write().set_encoding("windows-1252");
        location.set_search("q=a ").unwrap();
        let legacy = only_request(&queue).url;

        assert_eq!(utf8.query(), Some("q=a%20"));
        assert_eq!(legacy.query(), utf8.query());

        location.set_search("q=a \t\x01").unwrap();
        assert_eq!(only_request(&queue).url.query(), Some("q=a%20%01"));
    }

    #[test]
    fn test_escape_for_query_reparse() {
        assert_eq!(escape_for_query_reparse("a#b"), "a%23b");
        assert_eq!(escape_for_query_reparse("a b  "), "a b%20%20");
        assert_eq!(escape_for_query_reparse("x\n"), "x");
        assert_eq!(escape_for_query_reparse(""), "");
    }

    #[test]
    fn test_set_hash() {
        let (doc, queue, location) = setup("https://example.com/page#frag");

        location.set_hash("").unwrap();
        let request = only_request(&queue);
        assert_eq!(request.url.as_str(), "https://example.com/page");

        doc.write().set_url(request.url);
        assert_eq!(location.hash().unwrap(), "");
        assert!(!location.href().unwrap().contains('#'));

        location.set_hash("#top").unwrap();
        assert_eq!(only_request(&queue).url.fragment(), Some("top"));

        location.set_hash("bottom").unwrap();
        assert_eq!(only_request(&queue).url.fragment(), Some("bottom"));
    }

    #[test]
    fn test_set_hash_ignored_for_javascript() {
        let (_doc, queue, location) = setup("javascript:void(0)");
        location.set_hash("x").unwrap();
        assert!(queue.is_empty());
    }

    #[test]
    fn test_set_protocol() {
        let (_doc, queue, location) = setup("http://example.com/path");

        location.set_protocol("ftp").unwrap();
        assert!(queue.is_empty());
        assert_eq!(location.href().unwrap(), "http://example.com/path");

        location.set_protocol("https:").unwrap();
        assert_eq!(only_request(&queue).url.as_str(), "https://example.com/path");

        location.set_protocol("HTTPS").unwrap();
        assert_eq!(only_request(&queue).url.scheme(), "https");

        location.set_protocol("ht\ttps").unwrap();
        assert_eq!(only_request(&queue).url.as_str(), "https://example.com/path");

        location.set_protocol("\nhttps\r:").unwrap();
        assert_eq!(only_request(&queue).url.scheme(), "https");

        for invalid in ["", "1http", "ht tp", "\t"] {
            let err = location.set_protocol(invalid).unwrap_err();
            assert_eq!(err.dom_exception_name(), "TypeError");
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn test_set_host_and_hostname() {
        let (_doc, queue, location) = setup("https://example.com:8443/path?q#f");

        location.set_host("other.example:9000").unwrap();
        assert_eq!(only_request(&queue).url.as_str(), "https://other.example:9000/path?q#f");

        location.set_hostname("third.example").unwrap();
        assert_eq!(only_request(&queue).url.as_str(), "https://third.example:8443/path?q#f");
    }

    #[test]
    fn test_host_setters_ignored_for_cannot_be_a_base() {
        let (_doc, queue, location) = setup("mailto:someone@example.com");

        location.set_host("example.org").unwrap();
        location.set_hostname("example.org").unwrap();
        location.set_port("25").unwrap();
        assert!(queue.is_empty());
    }

    #[test]
    fn test_set_port() {
        let (_doc, queue, location) = setup("http://example.com/");

        location.set_port("8080").unwrap();
        assert_eq!(only_request(&queue).url.as_str(), "http://example.com:8080/");

        location.set_port("80").unwrap();
        assert_eq!(only_request(&queue).url.port(), None);
    }

    #[test]
    fn test_set_port_ignored_without_host() {
        let (_doc, queue, location) = setup("sc:/path/to");

        location.set_port("8080").unwrap();
        assert!(queue.is_empty());
        assert_eq!(location.href().unwrap(), "sc:/path/to");
    }

    #[test]
    fn test_set_port_ignored_for_file() {
        let (_doc, queue, location) = setup("file:///tmp/report.txt");

        for value in ["8080", "", "0", "not-a-port"] {
            location.set_port(value).unwrap();
        }
        assert!(queue.is_empty());
        assert_eq!(location.port().unwrap(), "");
    }

    #[test]
    fn test_set_pathname() {
        let (_doc, queue, location) = setup("https://example.com/old/path?q=1");

        location.set_pathname("/new dir/file").unwrap();
        assert_eq!(only_request(&queue).url.as_str(), "https://example.com/new%20dir/file?q=1");

        location.set_pathname("relative").unwrap();
        assert_eq!(only_request(&queue).url.path(), "/relative");
    }

    #[test]
    fn test_set_pathname_ignored_for_cannot_be_a_base() {
        let (_doc, queue, location) = setup("mailto:someone@example.com");
        let before = location.address().unwrap();

        location.set_pathname("/elsewhere").unwrap();

        assert_eq!(location.address().unwrap(), before);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_assign_and_replace() {
        let (_doc, queue, location) = setup("https://example.com/dir/");

        location.assign("next").unwrap();
        location.replace("/root").unwrap();

        let requests = queue.drain();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].url.as_str(), "https://example.com/dir/next");
        assert!(!requests[0].is_replacement());
        assert_eq!(requests[1].url.as_str(), "https://example.com/root");
        assert!(requests[1].is_replacement());
    }

    #[test]
    fn test_assign_unresolvable() {
        let (_doc, queue, location) = setup("about:blank");
        let input = "not a valid url with spaces and no scheme and no slashes :::";

        let err = location.assign(input).unwrap_err();
        assert_eq!(err.dom_exception_name(), "SyntaxError");
        let message = err.to_string();
        assert!(message.contains(input));
        assert!(message.contains("about:blank"));

        assert!(location.replace(input).is_err());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_reload() {
        let (_doc, queue, location) = setup("https://example.com/page?x=1");

        location.reload().unwrap();

        let request = only_request(&queue);
        assert_eq!(request.url.as_str(), "https://example.com/page?x=1");
        assert!(request.is_replacement());
        assert!(request.is_reload());
    }

    #[test]
    fn test_setters_replace_while_loading() {
        let (doc, queue, location) = setup("https://example.com/");
        doc.write().set_ready_state(dom::ReadyState::Interactive);

        location.set_hash("a").unwrap();
        location.assign("/b").unwrap();

        let requests = queue.drain();
        assert!(requests[0].is_replacement());
        assert!(!requests[1].is_replacement());
    }

    #[test]
    fn test_requests_target_owning_context() {
        let (doc, queue, location) = setup("https://example.com/");
        location.set_hash("a").unwrap();
        assert_eq!(only_request(&queue).target, doc.read().browsing_context());
    }

    #[test]
    fn test_requests_delivered_in_call_order() {
        let (_doc, queue, location) = setup("https://example.com/");

        location.set_pathname("/1").unwrap();
        location.set_search("two").unwrap();
        location.set_hash("three").unwrap();

        let urls: Vec<String> = queue.drain().into_iter().map(|r| r.url.to_string()).collect();
        assert_eq!(
            urls,
            vec![
                "https://example.com/1",
                "https://example.com/?two",
                "https://example.com/#three",
            ]
        );
    }

    #[test]
    fn test_discarded_document() {
        let (doc, queue, location) = setup("https://example.com/");
        drop(doc);

        let err = location.href().unwrap_err();
        assert_eq!(err.dom_exception_name(), "InvalidStateError");
        assert!(location.set_hash("x").is_err());
        assert!(queue.is_empty());
    }
}
