// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! The data-provider controller

use crate::filter::Filter;
use crate::provider::PageResponse;
use crate::{
    ArrayDataProvider, ControllerConfig, DataEvent, DataProvider, ExtraParams, ListenerId,
    PageCallback, PageParams, event::Listeners,
};
use lazyview_core::flat_index::{self, FlatIndexContext};
use lazyview_core::{
    Cache, CacheId, ConfigError, DataLen, IndexPath, PageRequestTracker, PageSize, RequestToken,
    Slot,
};
use rustc_hash::FxHashSet as HashSet;
use std::fmt::{self, Debug};
use std::hash::Hash;
use std::sync::mpsc::{self, Receiver, Sender};

const TARGET: &str = "lazyview::controller";

enum DataSource<T> {
    None,
    Items(Box<dyn DataProvider<T>>),
    Provider(Box<dyn DataProvider<T>>),
}

impl<T> DataSource<T> {
    fn is_none(&self) -> bool {
        matches!(self, DataSource::None)
    }

    fn provider_mut(&mut self) -> Option<&mut Box<dyn DataProvider<T>>> {
        match self {
            DataSource::None => None,
            DataSource::Items(provider) | DataSource::Provider(provider) => Some(provider),
        }
    }
}

/// Controller of lazily-fetched, paged data
///
/// The controller owns the root [`Cache`] (and through it, all sub-caches),
/// a [`PageRequestTracker`] and the data source. It maps flat indices
/// requested by a view to pages, dispatches fetches and commits responses.
///
/// Items are identified by a key of type `K` computed by the `item_id`
/// function passed to [`Self::new`]. Keys record expansion state, which
/// survives cache invalidation.
///
/// # Responses
///
/// Provider responses are queued. The controller commits queued responses
/// directly after each dispatch (so a provider resolving synchronously is
/// seen to complete immediately) and in [`Self::process_responses`], which
/// the owning event loop should call when woken by an asynchronous provider.
/// A response is committed only if its request is still current.
pub struct DataProviderController<T, K> {
    config: ControllerConfig,
    root: Cache<T>,
    source: DataSource<T>,
    filter: Option<String>,
    params: Option<Box<dyn Fn() -> ExtraParams>>,
    item_id: Box<dyn Fn(&T) -> K>,
    expanded: HashSet<K>,
    tracker: PageRequestTracker,
    sender: Sender<PageResponse<T>>,
    receiver: Receiver<PageResponse<T>>,
    listeners: Listeners,
}

impl<T, K: Debug> Debug for DataProviderController<T, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataProviderController")
            .field("config", &self.config)
            .field("root", &self.root.id())
            .field("has_source", &!self.source.is_none())
            .field("filter", &self.filter)
            .field("expanded", &self.expanded)
            .field("tracker", &self.tracker)
            .field("listeners", &self.listeners)
            .finish_non_exhaustive()
    }
}

/// Data sources and configuration
impl<T: 'static, K: Clone + Eq + Hash + Debug> DataProviderController<T, K> {
    /// Construct
    ///
    /// No data source is set; see [`Self::set_data_provider`] and
    /// [`Self::set_items`].
    pub fn new(config: ControllerConfig, item_id: impl Fn(&T) -> K + 'static) -> Self {
        let (sender, receiver) = mpsc::channel();
        DataProviderController {
            root: Cache::new(config.page_size, config.size),
            config,
            source: DataSource::None,
            filter: None,
            params: None,
            item_id: Box::new(item_id),
            expanded: Default::default(),
            tracker: PageRequestTracker::new(),
            sender,
            receiver,
            listeners: Default::default(),
        }
    }

    /// Access configuration
    #[inline]
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// The configured page size
    #[inline]
    pub fn page_size(&self) -> PageSize {
        self.config.page_size
    }

    /// Number of root items, if known
    #[inline]
    pub fn size(&self) -> Option<usize> {
        self.root.size()
    }

    /// Access the root cache
    #[inline]
    pub fn root_cache(&self) -> &Cache<T> {
        &self.root
    }

    /// True if a data source is set
    #[inline]
    pub fn has_data_source(&self) -> bool {
        !self.source.is_none()
    }

    /// Set the data provider
    ///
    /// Replaces any previous provider and clears the cache. Fails with
    /// [`ConfigError::ConflictingDataSource`] while static items are set.
    pub fn set_data_provider(
        &mut self,
        provider: impl DataProvider<T> + 'static,
    ) -> Result<(), ConfigError> {
        if matches!(self.source, DataSource::Items(_)) {
            return Err(ConfigError::ConflictingDataSource);
        }
        self.source = DataSource::Provider(Box::new(provider));
        self.clear_cache();
        Ok(())
    }

    /// Set a static item list
    ///
    /// Items are served by an [`ArrayDataProvider`] using `filter`. Replaces
    /// any previous item list and clears the cache. Fails with
    /// [`ConfigError::ConflictingDataSource`] while a data provider is set.
    pub fn set_items<F>(&mut self, items: Vec<T>, filter: F) -> Result<(), ConfigError>
    where
        T: Clone,
        F: Filter<T> + 'static,
    {
        if matches!(self.source, DataSource::Provider(_)) {
            return Err(ConfigError::ConflictingDataSource);
        }
        self.source = DataSource::Items(Box::new(ArrayDataProvider::new(items, filter)));
        self.clear_cache();
        Ok(())
    }

    /// Remove the data source and clear the cache
    pub fn clear_data_source(&mut self) {
        self.source = DataSource::None;
        self.clear_cache();
    }

    /// Set the page size
    ///
    /// If changed, the cache is cleared.
    pub fn set_page_size(&mut self, page_size: PageSize) {
        if page_size != self.config.page_size {
            self.config.page_size = page_size;
            self.clear_cache();
        }
    }

    /// Set the page size, validating input
    ///
    /// On error, the previous page size is kept.
    pub fn try_set_page_size<N>(&mut self, page_size: N) -> Result<(), ConfigError>
    where
        PageSize: TryFrom<N, Error = ConfigError>,
    {
        let page_size = PageSize::try_from(page_size)?;
        self.set_page_size(page_size);
        Ok(())
    }

    /// Set the number of root items
    ///
    /// A known size truncates the root cache; `None` makes the size
    /// provisional until a provider reports one.
    pub fn set_size(&mut self, size: Option<usize>) {
        self.config.size = size;
        self.root.set_size(size);
        self.prune_requests();
    }

    /// Current filter text
    #[inline]
    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    /// Set the filter text
    ///
    /// A changed filter resets the root size to unknown and clears the cache.
    /// Setting the empty string when no filter was set only records it.
    ///
    /// Returns `true` when the cache was cleared.
    pub fn set_filter(&mut self, filter: impl Into<String>) -> bool {
        let filter = filter.into();
        match self.filter.as_deref() {
            None if filter.is_empty() => {
                self.filter = Some(filter);
                false
            }
            Some(previous) if previous == filter => false,
            _ => {
                log::debug!(target: TARGET, "set_filter: {filter:?}");
                self.filter = Some(filter);
                self.config.size = None;
                self.clear_cache();
                true
            }
        }
    }

    /// Set a function supplying additional request parameters
    ///
    /// This is called on each dispatch.
    pub fn set_params(&mut self, params: impl Fn() -> ExtraParams + 'static) {
        self.params = Some(Box::new(params));
    }

    /// Add an event listener
    pub fn add_listener(&mut self, listener: impl FnMut(&DataEvent) + 'static) -> ListenerId {
        self.listeners.add(listener)
    }

    /// Remove an event listener
    ///
    /// Returns `false` if `id` is not registered.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }
}

/// Queries
impl<T: 'static, K: Clone + Eq + Hash + Debug> DataProviderController<T, K> {
    /// True while any page request is pending
    #[inline]
    pub fn is_loading(&self) -> bool {
        !self.tracker.is_empty()
    }

    /// True if the root size is known and non-zero
    #[inline]
    pub fn has_data(&self) -> bool {
        self.root.size().is_some_and(|size| size > 0)
    }

    /// Number of visible rows, including rows of expanded sub-caches
    ///
    /// Where sizes are not yet known this is an estimate.
    #[inline]
    pub fn flat_size(&self) -> usize {
        self.root.flat_size()
    }

    /// Number of visible rows as a [`DataLen`]
    ///
    /// While any size is provisional, returns a lower bound of at least
    /// `lbound` so that a view may scroll ahead of loaded data. Without a
    /// data source, a provisional size is reported as zero.
    pub fn len(&self, lbound: usize) -> DataLen<usize> {
        let len = self.root.flat_size();
        if self.root.is_flat_size_known() {
            DataLen::Known(len)
        } else if self.source.is_none() {
            DataLen::Known(0)
        } else {
            DataLen::LBound(len.max(lbound))
        }
    }

    /// Locate `flat_index` within the cache tree
    #[inline]
    pub fn flat_index_context(&self, flat_index: usize) -> FlatIndexContext<'_, T> {
        flat_index::flat_index_context(&self.root, flat_index)
    }

    /// Get the flat index of the item at `path`
    ///
    /// See [`flat_index::flat_index_by_path`].
    #[inline]
    pub fn flat_index_by_path(&self, path: &[usize]) -> usize {
        flat_index::flat_index_by_path(&self.root, path)
    }

    /// Get the slot at `flat_index`
    ///
    /// Returns `None` beyond the end of a cache of known size.
    #[inline]
    pub fn item_at(&self, flat_index: usize) -> Option<Slot<&T>> {
        self.flat_index_context(flat_index).item()
    }

    /// Get the key of the loaded item at `flat_index`
    pub fn item_key(&self, flat_index: usize) -> Option<K> {
        let item = self.item_at(flat_index)?.loaded()?;
        Some((self.item_id)(item))
    }

    /// Get the key of `item`
    #[inline]
    pub fn item_id(&self, item: &T) -> K {
        (self.item_id)(item)
    }

    /// Find the item path of a loaded item by key
    pub fn find_path(&self, key: &K) -> Option<IndexPath> {
        self.root.find_path(|item| (self.item_id)(item) == *key)
    }

    /// Find the flat index of a loaded item by key
    ///
    /// Returns `None` if no loaded item has this key.
    pub fn find_flat_index(&self, key: &K) -> Option<usize> {
        let path = self.find_path(key)?;
        Some(self.flat_index_by_path(&path))
    }

    /// True if the item with this key is expanded
    #[inline]
    pub fn is_expanded(&self, key: &K) -> bool {
        self.expanded.contains(key)
    }

    /// True if `item` is expanded
    #[inline]
    pub fn is_item_expanded(&self, item: &T) -> bool {
        self.expanded.contains(&(self.item_id)(item))
    }
}

/// Loading
impl<T: 'static, K: Clone + Eq + Hash + Debug> DataProviderController<T, K> {
    /// Clear the cache
    ///
    /// The root cache is replaced by an empty cache of the configured page
    /// size and size and all pending requests are invalidated. Nothing is
    /// fetched. Expansion state is kept.
    pub fn clear_cache(&mut self) {
        let cancelled = self.tracker.clear();
        self.root = Cache::new(self.config.page_size, self.config.size);
        log::debug!(
            target: TARGET,
            "clear_cache: new root cache {} ({cancelled} pending requests invalidated)",
            self.root.id(),
        );
    }

    /// Ensure the item at `flat_index` is loaded or being loaded
    ///
    /// Dispatches a fetch for the page containing `flat_index` unless that
    /// page is loaded, already pending, or lies beyond the end of a cache of
    /// known size. Returns `true` if a fetch was dispatched.
    pub fn ensure_flat_index_loaded(&mut self, flat_index: usize) -> bool {
        let cx = self.flat_index_context(flat_index);
        if !matches!(cx.item(), Some(Slot::Pending)) {
            return false;
        }
        let FlatIndexContext { path, page, .. } = cx;
        self.load_page(path, page)
    }

    /// Ensure the item at `flat_index` and its expanded children are loaded
    ///
    /// As [`Self::ensure_flat_index_loaded`]; additionally, if the item is
    /// loaded and expanded but its children are not, creates its sub-cache
    /// and dispatches a fetch for the first child page. Returns `true` if a
    /// fetch was dispatched.
    pub fn ensure_flat_index_hierarchy_loaded(&mut self, flat_index: usize) -> bool {
        let cx = self.flat_index_context(flat_index);
        let (path, page, children) = match cx.item() {
            None => return false,
            Some(Slot::Pending) => (cx.path.clone(), cx.page, false),
            Some(Slot::Loaded(item)) => {
                let needs_children = match cx.cache.sub_cache(cx.index) {
                    None => true,
                    Some(sub_cache) => sub_cache.size().is_none() && sub_cache.loaded_count() == 0,
                };
                if !needs_children || !self.is_item_expanded(item) {
                    return false;
                }
                (cx.item_path(), 0, true)
            }
        };

        if children {
            self.create_sub_cache(&path);
        }
        self.load_page(path, page)
    }

    /// Load the first root page
    ///
    /// Dispatches a fetch for root page 0 regardless of its state, unless a
    /// request for it is already pending. Returns `true` if a fetch was
    /// dispatched.
    pub fn load_first_page(&mut self) -> bool {
        self.load_page(IndexPath::new(), 0)
    }

    /// Reload the page containing `flat_index`
    ///
    /// The page is evicted (including sub-caches of its rows) and fetched
    /// again, superseding any pending request for it. Returns `true` if a
    /// fetch was dispatched.
    pub fn reload_page(&mut self, flat_index: usize) -> bool {
        if self.source.is_none() {
            return false;
        }
        let cx = self.flat_index_context(flat_index);
        if cx.item().is_none() {
            return false;
        }
        let FlatIndexContext { path, page, .. } = cx;

        let Some(cache) = self.root.cache_at_mut(&path) else {
            return false;
        };
        cache.evict_page(page);
        let token = self.tracker.supersede(cache.id(), page);
        self.prune_requests();
        self.dispatch(path, token);
        true
    }

    /// Commit queued provider responses
    ///
    /// Returns the number of pages committed. Responses to superseded or
    /// invalidated requests are dropped.
    pub fn process_responses(&mut self) -> usize {
        let mut committed = 0;
        while let Ok(response) = self.receiver.try_recv() {
            if self.commit(response) {
                committed += 1;
            }
        }
        committed
    }

    fn load_page(&mut self, path: IndexPath, page: usize) -> bool {
        if self.source.is_none() {
            log::trace!(target: TARGET, "load_page: no data source");
            return false;
        }
        let Some(cache) = self.root.cache_at(&path) else {
            log::warn!(target: TARGET, "load_page: no cache at path {path:?}");
            return false;
        };
        let Some(token) = self.tracker.begin(cache.id(), page) else {
            return false;
        };
        self.dispatch(path, token);
        true
    }

    fn dispatch(&mut self, path: IndexPath, token: RequestToken) {
        log::trace!(
            target: TARGET,
            "dispatch: page {} of cache {} at {path:?} (generation {})",
            token.page(),
            token.cache(),
            token.generation(),
        );
        self.listeners.emit(&DataEvent::PageRequested {
            cache: token.cache(),
            page: token.page(),
        });

        let extra = self.params.as_ref().map(|params| params()).unwrap_or_default();
        let parent_item = path
            .split_last()
            .and_then(|(index, parent)| self.root.cache_at(parent)?.item(*index));
        let params = PageParams {
            page: token.page(),
            page_size: self.config.page_size.get(),
            filter: self.filter.as_deref(),
            parent_item,
            extra,
        };
        let callback = PageCallback::new(token, path, self.sender.clone());
        if let Some(provider) = self.source.provider_mut() {
            provider.fetch(params, callback);
        }

        self.process_responses();
    }

    fn commit(&mut self, response: PageResponse<T>) -> bool {
        let PageResponse {
            token,
            path,
            items,
            size,
        } = response;
        if !self.tracker.complete(&token) {
            return false;
        }

        let page = token.page();
        let Some(cache) = self
            .root
            .cache_at_mut(&path)
            .filter(|cache| cache.id() == token.cache())
        else {
            log::debug!(target: TARGET, "commit: cache {} no longer exists", token.cache());
            return false;
        };

        let page_size = cache.page_size();
        let received = items.len();
        match size {
            Some(size) => cache.set_size(Some(size)),
            None if cache.size().is_none() && received < page_size.get() => {
                cache.set_size(Some(page_size.page_start(page) + received));
            }
            None => (),
        }

        // Sub-caches belong to items, not rows: drop those whose row changed
        let item_id = &self.item_id;
        let start = page_size.page_start(page);
        let replaced: Vec<usize> = cache
            .sub_caches()
            .map(|(index, _)| index)
            .filter(|index| page_size.page_range(page).contains(index))
            .filter(|&index| {
                let old = cache.item(index).map(|item| item_id(item));
                let new = items.get(index - start).map(|item| item_id(item));
                old.is_none() || old != new
            })
            .collect();
        for index in replaced {
            log::debug!(target: TARGET, "commit: row {index} replaced; dropping its sub-cache");
            cache.remove_sub_cache(index);
        }

        let range = cache.set_page(page, items);
        log::trace!(
            target: TARGET,
            "commit: page {page} of cache {} received items {range:?} (size {:?})",
            token.cache(),
            cache.size(),
        );

        self.sync_sub_caches(&path, page);
        self.prune_requests();

        self.listeners.emit(&DataEvent::PageReceived {
            cache: token.cache(),
            page,
        });
        if self.tracker.is_empty() {
            self.listeners.emit(&DataEvent::PageLoaded);
        }
        true
    }

    // Match sub-caches of rows within `page` to expansion state
    fn sync_sub_caches(&mut self, path: &[usize], page: usize) {
        let item_id = &self.item_id;
        let expanded = &self.expanded;
        let Some(cache) = self.root.cache_at_mut(path) else {
            return;
        };
        if expanded.is_empty() && cache.sub_cache_count() == 0 {
            return;
        }

        let range = cache.page_size().page_range(page);
        let end = range.end.min(cache.effective_size());
        for index in range.start..end {
            let is_expanded = cache
                .item(index)
                .is_some_and(|item| expanded.contains(&item_id(item)));
            let has_sub_cache = cache.sub_cache(index).is_some();
            if is_expanded && !has_sub_cache {
                cache.create_sub_cache(index);
            } else if !is_expanded && has_sub_cache {
                cache.remove_sub_cache(index);
            }
        }
    }

    // Create the sub-cache at `path`, returning true if created
    fn create_sub_cache(&mut self, path: &[usize]) -> bool {
        let Some((&index, parent)) = path.split_last() else {
            return false;
        };
        match self.root.cache_at_mut(parent) {
            Some(cache) if cache.sub_cache(index).is_none() => {
                cache.create_sub_cache(index);
                true
            }
            _ => false,
        }
    }

    // Invalidate requests for caches which no longer exist
    fn prune_requests(&mut self) {
        if self.tracker.is_empty() {
            return;
        }
        let mut live = HashSet::<CacheId>::default();
        self.root.for_each_cache(&mut |cache| {
            live.insert(cache.id());
        });
        let pruned = self.tracker.retain(|cache, _| live.contains(&cache));
        if pruned > 0 {
            log::debug!(target: TARGET, "prune_requests: invalidated {pruned} requests");
        }
    }
}

/// Hierarchy
impl<T: 'static, K: Clone + Eq + Hash + Debug> DataProviderController<T, K> {
    /// Expand the item with this key
    ///
    /// Expansion state is recorded by key. If the item is loaded, its
    /// sub-cache is created and its first child page fetched. Returns `false`
    /// if already expanded.
    pub fn expand(&mut self, key: K) -> bool {
        if !self.expanded.insert(key.clone()) {
            return false;
        }
        log::debug!(target: TARGET, "expand: {key:?}");
        if let Some(path) = self.find_path(&key)
            && self.create_sub_cache(&path)
        {
            self.load_page(path, 0);
        }
        true
    }

    /// Collapse the item with this key
    ///
    /// Its sub-cache is dropped and requests for it (and its descendants) are
    /// invalidated. Returns `false` if not expanded.
    pub fn collapse(&mut self, key: &K) -> bool {
        if !self.expanded.remove(key) {
            return false;
        }
        log::debug!(target: TARGET, "collapse: {key:?}");
        if let Some(path) = self.find_path(key)
            && let Some((&index, parent)) = path.split_last()
            && let Some(cache) = self.root.cache_at_mut(parent)
        {
            cache.remove_sub_cache(index);
            self.prune_requests();
        }
        true
    }
}
