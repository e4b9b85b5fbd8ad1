//! Browser page implementation.

use crate::config::BrowserConfig;
use browser_security::Origin;
use dom::{BrowsingContextId, Document, DocumentRef, NavigationQueue, NavigationRequest};
use parking_lot::RwLock;
use std::sync::Arc;
use url::Url;
use web_apis::{Location, LocationProxy, ObjectId};

/// The document currently displayed, with its location object.
struct ActiveDocument {
    document: DocumentRef,
    location: Arc<LocationProxy>,
}

/// A browser page (tab): one browsing context and its navigations.
pub struct Page {
    /// Page configuration.
    config: BrowserConfig,
    /// Browsing context this page displays.
    context: BrowsingContextId,
    /// Requests handed over by location objects.
    queue: Arc<NavigationQueue>,
    /// Active document.
    active: RwLock<ActiveDocument>,
    /// Session history.
    history: RwLock<NavigationHistory>,
}

impl Page {
    /// Create a page displaying `url`.
    pub fn new(config: BrowserConfig, url: Url) -> Self {
        let context = BrowsingContextId::next();
        let queue = Arc::new(NavigationQueue::new());
        let active = create_document(&config, context, &queue, url.clone());

        let mut history = NavigationHistory::new();
        history.push(url);

        Self {
            config,
            context,
            queue,
            active: RwLock::new(active),
            history: RwLock::new(history),
        }
    }

    /// Create a page from a URL string.
    pub fn open(config: BrowserConfig, url: &str) -> anyhow::Result<Self> {
        Ok(Self::new(config, Url::parse(url)?))
    }

    /// Browsing context of this page.
    pub fn context(&self) -> BrowsingContextId {
        self.context
    }

    /// Active document.
    pub fn document(&self) -> DocumentRef {
        self.active.read().document.clone()
    }

    /// Location object of the active document.
    pub fn location(&self) -> Arc<LocationProxy> {
        self.active.read().location.clone()
    }

    /// Current URL.
    pub fn url(&self) -> Url {
        self.active.read().document.read().url().clone()
    }

    /// Origin of the active document.
    pub fn origin(&self) -> Origin {
        self.active.read().document.read().origin().clone()
    }

    /// Navigation requests not yet committed.
    pub fn pending_navigations(&self) -> Vec<NavigationRequest> {
        self.queue.pending()
    }

    /// Commit every pending navigation, in order. Returns the committed
    /// requests.
    pub fn process_navigations(&self) -> Vec<NavigationRequest> {
        let mut committed = Vec::new();

        for request in self.queue.drain() {
            if request.target != self.context {
                tracing::warn!("Dropping navigation for unknown {}", request.target);
                continue;
            }
            self.commit(&request);
            committed.push(request);
        }

        committed
    }

    fn commit(&self, request: &NavigationRequest) {
        let url = request.url.clone();
        let current = self.url();

        if !request.is_reload() && request.is_fragment_navigation(&current) {
            tracing::debug!("Scrolling to fragment: {}", url);
            self.document().write().set_url(url.clone());
        } else {
            tracing::info!("Navigating to: {}", url);
            let active = create_document(&self.config, self.context, &self.queue, url.clone());
            *self.active.write() = active;
        }

        let mut history = self.history.write();
        if request.is_reload() {
            return;
        }
        if request.is_replacement() {
            history.replace_current(url);
        } else {
            history.push(url);
        }
    }

    /// Mark the active document as completely loaded.
    pub fn finish_loading(&self) {
        self.document().write().finish_loading();
    }

    /// Check if the active document is still loading.
    pub fn is_loading(&self) -> bool {
        !self.document().read().is_completely_loaded()
    }

    /// Session history entries.
    pub fn history(&self) -> Vec<Url> {
        self.history.read().entries().to_vec()
    }

    /// Get configuration.
    pub fn config(&self) -> &BrowserConfig {
        &self.config
    }
}

fn create_document(
    config: &BrowserConfig,
    context: BrowsingContextId,
    queue: &Arc<NavigationQueue>,
    url: Url,
) -> ActiveDocument {
    let mut document = Document::new(url, context);
    document.set_encoding(&config.default_encoding);
    if config.complete_on_commit {
        document.finish_loading();
    }
    let document = document.into_ref();

    let location = Arc::new(Location::new(&document, queue.clone()));
    let proxy = LocationProxy::new(location, Some(ObjectId::next()), &config.location);

    ActiveDocument {
        document,
        location: Arc::new(proxy),
    }
}

/// Navigation history.
#[derive(Debug)]
pub struct NavigationHistory {
    /// History entries.
    entries: Vec<Url>,
}

impl NavigationHistory {
    /// Create a new history.
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Push a URL to history.
    pub fn push(&mut self, url: Url) {
        self.entries.push(url);
    }

    /// Replace the current entry, or push when there is none.
    pub fn replace_current(&mut self, url: Url) {
        match self.entries.last_mut() {
            Some(current) => *current = url,
            None => self.entries.push(url),
        }
    }

    /// Get current entry.
    pub fn current(&self) -> Option<&Url> {
        self.entries.last()
    }

    /// Get all entries.
    pub fn entries(&self) -> &[Url] {
        &self.entries
    }
}

impl Default for NavigationHistory {
    fn default() -> Self {
        Self::new()
    }
}
