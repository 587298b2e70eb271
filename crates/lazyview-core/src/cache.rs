// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Page-indexed item cache

use crate::{DataLen, PageSize, Slot};
use smallvec::SmallVec;
use std::collections::BTreeMap;
use std::fmt;
use std::num::NonZeroU64;
use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};

/// A path of local row indices
///
/// When locating a cache, each entry is the index of the expanded row within
/// its parent, starting from the root cache. When locating an item, the last
/// entry is the item's index within the innermost cache.
pub type IndexPath = SmallVec<[usize; 4]>;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a [`Cache`]
///
/// Every cache constructed receives a fresh identifier; identifiers are never
/// re-used within a process. A cache replaced (e.g. by clearing) therefore
/// never shares an identity with its replacement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CacheId(NonZeroU64);

impl CacheId {
    fn next() -> Self {
        let n = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        CacheId(NonZeroU64::MIN.saturating_add(n - 1))
    }

    /// Get the raw value
    #[inline]
    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for CacheId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A page-indexed store of items
///
/// A cache covers one level of a data set: either the root list or the
/// children of a single expanded row. Items are stored index-aligned; indices
/// whose page has not been received hold [`Slot::Pending`].
///
/// The `size` is the total row count at this level, `None` until known. Once
/// known it is authoritative: no item is stored at or beyond `size`. While
/// unknown, the [effective size](Self::effective_size) is a provisional
/// estimate covering all pages received so far plus one further page.
///
/// Expanded rows own a *sub-cache*. The parent link of a sub-cache is the
/// row index within its parent; the parent itself is reached through the
/// owning tree (see [`Self::cache_at`]).
pub struct Cache<T> {
    id: CacheId,
    page_size: PageSize,
    size: Option<usize>,
    items: Vec<Slot<T>>,
    parent_index: Option<usize>,
    sub_caches: BTreeMap<usize, Cache<T>>,
}

impl<T: fmt::Debug> fmt::Debug for Cache<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("id", &self.id)
            .field("page_size", &self.page_size)
            .field("size", &self.size)
            .field("loaded", &self.loaded_count())
            .field("parent_index", &self.parent_index)
            .field("sub_caches", &self.sub_caches)
            .finish()
    }
}

impl<T> Cache<T> {
    /// Construct a root cache
    pub fn new(page_size: PageSize, size: Option<usize>) -> Self {
        Cache {
            id: CacheId::next(),
            page_size,
            size,
            items: Vec::new(),
            parent_index: None,
            sub_caches: BTreeMap::new(),
        }
    }

    /// Get the identity of this cache
    #[inline]
    pub fn id(&self) -> CacheId {
        self.id
    }

    /// Get the page size
    #[inline]
    pub fn page_size(&self) -> PageSize {
        self.page_size
    }

    /// Get the declared size, if known
    #[inline]
    pub fn size(&self) -> Option<usize> {
        self.size
    }

    /// Index of the expanded row owning this cache within its parent
    ///
    /// This is `None` for a root cache.
    #[inline]
    pub fn parent_index(&self) -> Option<usize> {
        self.parent_index
    }

    /// True if this is a root cache
    #[inline]
    pub fn is_root(&self) -> bool {
        self.parent_index.is_none()
    }

    /// Set the size
    ///
    /// A known size truncates stored items and drops sub-caches of rows at or
    /// beyond the new size. Setting `None` returns the cache to a provisional
    /// size without discarding items.
    pub fn set_size(&mut self, size: Option<usize>) {
        self.size = size;
        if let Some(size) = size {
            self.items.truncate(size);
            self.sub_caches.retain(|index, _| *index < size);
        }
    }

    /// Effective size for rendering purposes
    ///
    /// This is the declared size if known. Otherwise it is the number of slots
    /// addressed so far rounded up to a whole page, plus one page: a view may
    /// thus scroll onto placeholders of the next page, causing it to be
    /// requested.
    pub fn effective_size(&self) -> usize {
        self.size.unwrap_or_else(|| {
            self.page_size
                .round_up(self.items.len())
                .saturating_add(self.page_size.get())
        })
    }

    /// Size of this level as a [`DataLen`]
    pub fn len(&self) -> DataLen<usize> {
        match self.size {
            Some(size) => DataLen::Known(size),
            None => DataLen::LBound(self.effective_size()),
        }
    }

    /// True if no slots are addressable at this level
    pub fn is_empty(&self) -> bool {
        self.effective_size() == 0
    }

    /// Number of loaded items at this level
    pub fn loaded_count(&self) -> usize {
        self.items.iter().filter(|slot| slot.is_loaded()).count()
    }

    /// Get the slot at `index`
    ///
    /// Returns `None` when the size is known and `index >= size`. Otherwise
    /// returns the item if loaded or [`Slot::Pending`].
    pub fn get(&self, index: usize) -> Option<Slot<&T>> {
        if self.size.is_some_and(|size| index >= size) {
            return None;
        }
        Some(self.items.get(index).map(Slot::as_ref).unwrap_or_default())
    }

    /// Get the item at `index`, if loaded
    #[inline]
    pub fn item(&self, index: usize) -> Option<&T> {
        self.get(index).and_then(Slot::loaded)
    }

    /// True if the item at `index` is loaded
    #[inline]
    pub fn is_loaded(&self, index: usize) -> bool {
        self.item(index).is_some()
    }

    /// Iterate over slots `0..self.effective_size()`
    pub fn iter(&self) -> impl Iterator<Item = Slot<&T>> {
        let len = self.effective_size();
        (0..len).map(move |index| self.get(index).unwrap_or_default())
    }

    /// Write a received page
    ///
    /// Items are written from the start of `page` onwards, extending storage as
    /// required; items at or beyond a known size are discarded. Slots of
    /// `page` not covered by `items` are reset to [`Slot::Pending`]. The size
    /// is never changed.
    ///
    /// Returns the range of indices which received items.
    pub fn set_page(&mut self, page: usize, items: impl IntoIterator<Item = T>) -> Range<usize> {
        let page_range = self.page_size.page_range(page);
        let limit = match self.size {
            Some(size) => page_range.end.min(size),
            None => page_range.end,
        };

        let start = page_range.start;
        let mut end = start;
        for item in items.into_iter().take(limit.saturating_sub(start)) {
            if end < self.items.len() {
                self.items[end] = Slot::Loaded(item);
            } else {
                self.items.resize_with(end, Slot::default);
                self.items.push(Slot::Loaded(item));
            }
            end += 1;
        }

        if end < limit {
            if self.items.len() < limit {
                self.items.resize_with(limit, Slot::default);
            }
            for slot in &mut self.items[end..limit] {
                *slot = Slot::Pending;
            }
        }

        start..end
    }

    /// Evict a page
    ///
    /// Slots of `page` return to [`Slot::Pending`] and sub-caches of rows
    /// within the page are dropped.
    pub fn evict_page(&mut self, page: usize) {
        let range = self.page_size.page_range(page);
        let end = range.end.min(self.items.len());
        if range.start < end {
            for slot in &mut self.items[range.start..end] {
                *slot = Slot::Pending;
            }
        }
        self.sub_caches.retain(|index, _| !range.contains(index));
    }

    /// Drop all items, sub-caches and the size
    pub fn clear(&mut self) {
        self.items.clear();
        self.size = None;
        self.sub_caches.clear();
    }

    /// Get the sub-cache of row `index`, if any
    #[inline]
    pub fn sub_cache(&self, index: usize) -> Option<&Cache<T>> {
        self.sub_caches.get(&index)
    }

    /// Get the sub-cache of row `index` mutably, if any
    #[inline]
    pub fn sub_cache_mut(&mut self, index: usize) -> Option<&mut Cache<T>> {
        self.sub_caches.get_mut(&index)
    }

    /// Iterate over sub-caches in order of row index
    pub fn sub_caches(&self) -> impl Iterator<Item = (usize, &Cache<T>)> {
        self.sub_caches.iter().map(|(index, cache)| (*index, cache))
    }

    /// Number of sub-caches at this level (not recursive)
    #[inline]
    pub fn sub_cache_count(&self) -> usize {
        self.sub_caches.len()
    }

    /// Get or create the sub-cache of row `index`
    ///
    /// A new sub-cache has this cache's page size and unknown size.
    pub fn create_sub_cache(&mut self, index: usize) -> &mut Cache<T> {
        let page_size = self.page_size;
        self.sub_caches.entry(index).or_insert_with(|| {
            let mut cache = Cache::new(page_size, None);
            cache.parent_index = Some(index);
            cache
        })
    }

    /// Remove the sub-cache of row `index`
    pub fn remove_sub_cache(&mut self, index: usize) -> Option<Cache<T>> {
        self.sub_caches.remove(&index)
    }

    /// Remove all sub-caches at this level
    pub fn remove_sub_caches(&mut self) {
        self.sub_caches.clear();
    }

    /// Number of visible rows of this cache and all its sub-caches
    ///
    /// This is the effective size plus, recursively, the flat size of each
    /// sub-cache belonging to a row within the effective size.
    pub fn flat_size(&self) -> usize {
        let len = self.effective_size();
        self.sub_caches
            .range(..len)
            .map(|(_, cache)| cache.flat_size())
            .fold(len, usize::saturating_add)
    }

    /// True if the size of this cache and every sub-cache is known
    pub fn is_flat_size_known(&self) -> bool {
        self.size.is_some() && self.sub_caches.values().all(Cache::is_flat_size_known)
    }

    /// Flat offset of row `index` relative to the start of this cache
    ///
    /// This is `index` plus the flat size of every sub-cache owned by a
    /// preceding row.
    pub fn flat_offset(&self, index: usize) -> usize {
        self.sub_caches
            .range(..index)
            .map(|(_, cache)| cache.flat_size())
            .fold(index, usize::saturating_add)
    }

    /// Get the descendant cache at `path`
    ///
    /// Each entry of `path` is the index of an expanded row; the empty path
    /// refers to `self`.
    pub fn cache_at(&self, path: &[usize]) -> Option<&Cache<T>> {
        path.iter()
            .try_fold(self, |cache, index| cache.sub_cache(*index))
    }

    /// Get the descendant cache at `path` mutably
    pub fn cache_at_mut(&mut self, path: &[usize]) -> Option<&mut Cache<T>> {
        path.iter()
            .try_fold(self, |cache, index| cache.sub_cache_mut(*index))
    }

    /// Visit this cache and all descendants, depth first
    pub fn for_each_cache(&self, f: &mut impl FnMut(&Cache<T>)) {
        f(self);
        for cache in self.sub_caches.values() {
            cache.for_each_cache(f);
        }
    }

    /// Find the path of the first loaded item matching `pred`
    ///
    /// Items are visited in flat order: each row, then the rows of its
    /// sub-cache (if any), then the next row. The result is an item path:
    /// expanded row indices followed by the item's local index.
    pub fn find_path(&self, mut pred: impl FnMut(&T) -> bool) -> Option<IndexPath> {
        let mut path = IndexPath::new();
        self.find_path_inner(&mut pred, &mut path).then_some(path)
    }

    fn find_path_inner(&self, pred: &mut impl FnMut(&T) -> bool, path: &mut IndexPath) -> bool {
        for (index, slot) in self.items.iter().enumerate() {
            if let Slot::Loaded(item) = slot
                && pred(item)
            {
                path.push(index);
                return true;
            }
            if let Some(cache) = self.sub_caches.get(&index)
                && cache.find_in_sub_cache(index, pred, path)
            {
                return true;
            }
        }

        for (index, cache) in self.sub_caches.range(self.items.len()..) {
            if cache.find_in_sub_cache(*index, pred, path) {
                return true;
            }
        }

        false
    }

    fn find_in_sub_cache(
        &self,
        index: usize,
        pred: &mut impl FnMut(&T) -> bool,
        path: &mut IndexPath,
    ) -> bool {
        path.push(index);
        if self.find_path_inner(pred, path) {
            return true;
        }
        path.pop();
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_size(n: usize) -> PageSize {
        PageSize::try_from(n).unwrap()
    }

    #[test]
    fn unique_ids() {
        let a = Cache::<u32>::new(page_size(10), None);
        let b = Cache::<u32>::new(page_size(10), None);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn get_before_and_after_load() {
        let mut cache = Cache::new(page_size(3), None);
        assert_eq!(cache.get(0), Some(Slot::Pending));
        assert_eq!(cache.effective_size(), 3);

        let range = cache.set_page(1, [30, 31, 32]);
        assert_eq!(range, 3..6);
        assert_eq!(cache.get(0), Some(Slot::Pending));
        assert_eq!(cache.get(4), Some(Slot::Loaded(&31)));
        assert_eq!(cache.effective_size(), 9);
        assert!(cache.is_loaded(5));
        assert!(!cache.is_loaded(2));
    }

    #[test]
    fn known_size_is_authoritative() {
        let mut cache = Cache::new(page_size(4), Some(6));
        let range = cache.set_page(1, [4, 5, 6, 7]);
        assert_eq!(range, 4..6);
        assert_eq!(cache.get(5), Some(Slot::Loaded(&5)));
        assert_eq!(cache.get(6), None);
        assert_eq!(cache.get(100), None);
        assert_eq!(cache.effective_size(), 6);
        assert_eq!(cache.size(), Some(6));
    }

    #[test]
    fn short_page_is_padded_to_page_end() {
        let mut cache = Cache::new(page_size(4), None);
        cache.set_page(0, [1, 2]);
        assert_eq!(cache.effective_size(), 8);
        assert_eq!(cache.get(3), Some(Slot::Pending));
        assert_eq!(cache.len(), DataLen::LBound(8));
    }

    #[test]
    fn set_page_replaces_whole_page() {
        let mut cache = Cache::new(page_size(3), None);
        cache.set_page(0, [1, 2, 3]);
        cache.set_page(0, [9]);
        assert_eq!(cache.get(0), Some(Slot::Loaded(&9)));
        assert_eq!(cache.get(1), Some(Slot::Pending));
        assert_eq!(cache.get(2), Some(Slot::Pending));
    }

    #[test]
    fn set_page_never_shrinks_size() {
        let mut cache = Cache::new(page_size(5), Some(12));
        cache.set_page(0, [0, 1]);
        assert_eq!(cache.size(), Some(12));
    }

    #[test]
    fn shrinking_size_drops_rows() {
        let mut cache = Cache::new(page_size(2), None);
        cache.set_page(0, ['a', 'b']);
        cache.set_page(1, ['c', 'd']);
        cache.create_sub_cache(3);
        cache.set_size(Some(3));
        assert_eq!(cache.get(3), None);
        assert_eq!(cache.loaded_count(), 3);
        assert!(cache.sub_cache(3).is_none());
    }

    #[test]
    fn evict_page() {
        let mut cache = Cache::new(page_size(2), Some(4));
        cache.set_page(0, [0, 1]);
        cache.set_page(1, [2, 3]);
        cache.create_sub_cache(2);
        cache.evict_page(1);
        assert_eq!(cache.get(1), Some(Slot::Loaded(&1)));
        assert_eq!(cache.get(2), Some(Slot::Pending));
        assert!(cache.sub_cache(2).is_none());
    }

    #[test]
    fn flat_size_and_offsets() {
        let mut root = Cache::<u8>::new(page_size(10), Some(3));
        root.create_sub_cache(0).set_size(Some(2));
        let sub = root.create_sub_cache(2);
        sub.set_size(Some(4));
        sub.create_sub_cache(1).set_size(Some(1));

        assert_eq!(root.flat_size(), 3 + 2 + 4 + 1);
        assert_eq!(root.flat_offset(0), 0);
        assert_eq!(root.flat_offset(1), 3);
        assert_eq!(root.flat_offset(2), 4);
        assert!(root.is_flat_size_known());

        root.create_sub_cache(1);
        assert!(!root.is_flat_size_known());
    }

    #[test]
    fn sub_caches_have_parent_links() {
        let mut root = Cache::<u8>::new(page_size(10), Some(3));
        let id = root.create_sub_cache(1).id();
        assert!(root.is_root());
        let sub = root.cache_at(&[1]).unwrap();
        assert_eq!(sub.id(), id);
        assert_eq!(sub.parent_index(), Some(1));
        assert_eq!(sub.page_size(), root.page_size());
        assert!(root.cache_at(&[0]).is_none());
    }

    #[test]
    fn find_path_searches_sub_caches() {
        let mut root = Cache::new(page_size(10), None);
        root.set_page(0, [1, 2, 3]);
        root.create_sub_cache(1).set_page(0, [20, 21]);
        assert_eq!(root.find_path(|x| *x == 3).as_deref(), Some(&[2][..]));
        assert_eq!(root.find_path(|x| *x == 21).as_deref(), Some(&[1, 1][..]));
        assert_eq!(root.find_path(|x| *x == 99), None);

        // Flat order: rows of sub-cache 0 come before root row 1
        root.create_sub_cache(0).set_page(0, [2]);
        assert_eq!(root.find_path(|x| *x == 2).as_deref(), Some(&[0, 0][..]));
    }
}
