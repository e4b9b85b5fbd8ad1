//! Navigation requests and the pipeline they are handed to.

use crate::document::BrowsingContextId;
use bitflags::bitflags;
use parking_lot::Mutex;
use std::collections::VecDeque;
use url::Url;

bitflags! {
    /// Flags accompanying a navigation request.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct NavigationFlags: u8 {
        /// Replace the current session history entry instead of adding one.
        const REPLACEMENT = 1 << 0;
        /// The navigation was triggered by `reload()`.
        const RELOAD_TRIGGERED = 1 << 1;
        /// Errors raised while starting the navigation propagate to the caller.
        const EXCEPTIONS_ENABLED = 1 << 2;
    }
}

/// A navigation request handed to the navigation pipeline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NavigationRequest {
    /// Browsing context to navigate.
    pub target: BrowsingContextId,
    /// Destination URL record.
    pub url: Url,
    /// Request flags.
    pub flags: NavigationFlags,
}

impl NavigationRequest {
    pub fn new(target: BrowsingContextId, url: Url, flags: NavigationFlags) -> Self {
        Self { target, url, flags }
    }

    /// Check if the request replaces the current history entry.
    pub fn is_replacement(&self) -> bool {
        self.flags.contains(NavigationFlags::REPLACEMENT)
    }

    /// Check if the request is a reload.
    pub fn is_reload(&self) -> bool {
        self.flags.contains(NavigationFlags::RELOAD_TRIGGERED)
    }

    /// Check if the destination differs from `current` only in its fragment.
    pub fn is_fragment_navigation(&self, current: &Url) -> bool {
        if self.url.fragment().is_none() {
            return false;
        }
        let mut a = self.url.clone();
        let mut b = current.clone();
        a.set_fragment(None);
        b.set_fragment(None);
        a == b
    }
}

/// The navigation/loading pipeline.
///
/// Requests are fire-and-forget: `navigate` returns as soon as the request
/// has been accepted and must deliver requests in the order received.
pub trait NavigationPipeline: Send + Sync {
    fn navigate(&self, request: NavigationRequest);
}

/// In-memory pipeline that queues requests for the embedder to process.
#[derive(Debug, Default)]
pub struct NavigationQueue {
    pending: Mutex<VecDeque<NavigationRequest>>,
}

impl NavigationQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of queued requests.
    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Check if no requests are queued.
    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }

    /// Copy of the queued requests, oldest first.
    pub fn pending(&self) -> Vec<NavigationRequest> {
        self.pending.lock().iter().cloned().collect()
    }

    /// Take all queued requests, oldest first.
    pub fn drain(&self) -> Vec<NavigationRequest> {
        self.pending.lock().drain(..).collect()
    }
}

impl NavigationPipeline for NavigationQueue {
    fn navigate(&self, request: NavigationRequest) {
        tracing::debug!(
            context = %request.target,
            url = %request.url,
            flags = ?request.flags,
            "Navigation requested"
        );
        self.pending.lock().push_back(request);
    }
}
