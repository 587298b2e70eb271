// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Page request tracking

use crate::CacheId;
use rustc_hash::FxHashMap as HashMap;

/// Correlation id of a page request
///
/// Each request receives a token with a fresh `generation`. A response is
/// committed only if its token is still the latest pending token for its
/// (cache, page) pair: the last *request* wins, regardless of the order in
/// which responses arrive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RequestToken {
    cache: CacheId,
    page: usize,
    generation: u64,
}

impl RequestToken {
    /// The cache the page belongs to
    #[inline]
    pub fn cache(&self) -> CacheId {
        self.cache
    }

    /// The requested page index
    #[inline]
    pub fn page(&self) -> usize {
        self.page
    }

    /// The request generation
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Tracker of in-flight page requests
///
/// At most one request per (cache, page) pair is pending at any time.
/// Requests are never cancelled at their source; instead, invalidation
/// removes the pending entry so that the eventual response fails
/// [`Self::complete`].
#[derive(Debug, Default)]
pub struct PageRequestTracker {
    pending: HashMap<(CacheId, usize), u64>,
    generation: u64,
}

impl PageRequestTracker {
    /// Construct
    pub fn new() -> Self {
        Self::default()
    }

    fn next_token(&mut self, cache: CacheId, page: usize) -> RequestToken {
        self.generation += 1;
        let generation = self.generation;
        self.pending.insert((cache, page), generation);
        RequestToken {
            cache,
            page,
            generation,
        }
    }

    /// Begin a request
    ///
    /// Returns `None` (a no-op) when a request for this page is already
    /// pending.
    pub fn begin(&mut self, cache: CacheId, page: usize) -> Option<RequestToken> {
        if self.is_pending(cache, page) {
            log::trace!(
                target: "lazyview::tracker",
                "begin: page {page} of cache {cache} already pending"
            );
            return None;
        }
        Some(self.next_token(cache, page))
    }

    /// Begin a request, superseding any pending request for the same page
    pub fn supersede(&mut self, cache: CacheId, page: usize) -> RequestToken {
        self.next_token(cache, page)
    }

    /// True if a request for this page is pending
    #[inline]
    pub fn is_pending(&self, cache: CacheId, page: usize) -> bool {
        self.pending.contains_key(&(cache, page))
    }

    /// True if `token` is the latest pending request for its page
    pub fn is_current(&self, token: &RequestToken) -> bool {
        self.pending.get(&(token.cache, token.page)) == Some(&token.generation)
    }

    /// Complete a request
    ///
    /// Returns `true` and clears the pending entry if `token` is current.
    /// Returns `false` for a stale token, leaving any newer request pending.
    pub fn complete(&mut self, token: &RequestToken) -> bool {
        if !self.is_current(token) {
            log::debug!(
                target: "lazyview::tracker",
                "complete: dropping stale response for page {} of cache {} (generation {})",
                token.page,
                token.cache,
                token.generation,
            );
            return false;
        }
        self.pending.remove(&(token.cache, token.page));
        true
    }

    /// Invalidate the pending request for a page, if any
    pub fn cancel(&mut self, cache: CacheId, page: usize) -> bool {
        self.pending.remove(&(cache, page)).is_some()
    }

    /// Invalidate all pending requests of a cache
    ///
    /// Returns the number of requests invalidated.
    pub fn cancel_cache(&mut self, cache: CacheId) -> usize {
        let len = self.pending.len();
        self.pending.retain(|(id, _), _| *id != cache);
        len - self.pending.len()
    }

    /// Retain only pending requests for which `f(cache, page)` is true
    ///
    /// Returns the number of requests invalidated.
    pub fn retain(&mut self, mut f: impl FnMut(CacheId, usize) -> bool) -> usize {
        let len = self.pending.len();
        self.pending.retain(|(cache, page), _| f(*cache, *page));
        len - self.pending.len()
    }

    /// Invalidate all pending requests
    ///
    /// Returns the number of requests invalidated.
    pub fn clear(&mut self) -> usize {
        let len = self.pending.len();
        self.pending.clear();
        len
    }

    /// Number of pending requests
    #[inline]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// True if no request is pending
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// True if any request for `cache` is pending
    pub fn is_loading(&self, cache: CacheId) -> bool {
        self.pending.keys().any(|(id, _)| *id == cache)
    }

    /// Iterate over pending requests
    pub fn pending(&self) -> impl Iterator<Item = RequestToken> {
        self.pending
            .iter()
            .map(|((cache, page), generation)| RequestToken {
                cache: *cache,
                page: *page,
                generation: *generation,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Cache, PageSize};

    fn cache_id() -> CacheId {
        Cache::<()>::new(PageSize::default(), None).id()
    }

    #[test]
    fn duplicate_requests_are_no_ops() {
        let cache = cache_id();
        let mut tracker = PageRequestTracker::new();
        let token = tracker.begin(cache, 0).unwrap();
        assert!(tracker.begin(cache, 0).is_none());
        assert!(tracker.begin(cache, 1).is_some());
        assert_eq!(tracker.len(), 2);

        assert!(tracker.complete(&token));
        assert!(!tracker.is_pending(cache, 0));
        assert!(tracker.begin(cache, 0).is_some());
    }

    #[test]
    fn superseded_token_is_stale() {
        let cache = cache_id();
        let mut tracker = PageRequestTracker::new();
        let old = tracker.begin(cache, 3).unwrap();
        let new = tracker.supersede(cache, 3);
        assert_ne!(old, new);
        assert!(new.generation() > old.generation());

        assert!(!tracker.complete(&old));
        assert!(tracker.is_pending(cache, 3));
        assert!(tracker.complete(&new));
        assert!(tracker.is_empty());
    }

    #[test]
    fn cleared_tokens_never_match_new_requests() {
        let cache = cache_id();
        let mut tracker = PageRequestTracker::new();
        let old = tracker.begin(cache, 0).unwrap();
        assert_eq!(tracker.clear(), 1);
        let new = tracker.begin(cache, 0).unwrap();

        assert!(!tracker.complete(&old));
        assert!(tracker.is_current(&new));
    }

    #[test]
    fn cancel_by_cache() {
        let a = cache_id();
        let b = cache_id();
        let mut tracker = PageRequestTracker::new();
        tracker.begin(a, 0);
        tracker.begin(a, 1);
        tracker.begin(b, 0);
        assert!(tracker.is_loading(a));
        assert_eq!(tracker.cancel_cache(a), 2);
        assert!(!tracker.is_loading(a));
        assert!(tracker.is_loading(b));
        assert_eq!(tracker.retain(|cache, _| cache != b), 1);
        assert!(tracker.is_empty());
    }
}
