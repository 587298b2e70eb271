// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Flat index mapping
//!
//! A *flat index* is a linear position over all visible rows of a
//! hierarchical data set: each row of a cache is followed by the rows of its
//! sub-cache (if expanded), recursively. These functions translate between
//! flat indices and (cache, local index) pairs without owning any state.
//!
//! Where the size of a cache is not yet known its
//! [effective size](Cache::effective_size) is used. Mapping therefore always
//! terminates, although positions following a partially loaded sub-cache may
//! move once that sub-cache's true size arrives.

use crate::{Cache, IndexPath, Slot};

/// Result of [`flat_index_context`]
#[derive(Debug)]
pub struct FlatIndexContext<'a, T> {
    /// The innermost cache containing the flat index
    pub cache: &'a Cache<T>,
    /// Path from the root to `cache` (indices of expanded rows)
    pub path: IndexPath,
    /// Local index within `cache`
    pub index: usize,
    /// Page of `cache` containing `index`
    pub page: usize,
}

impl<'a, T> FlatIndexContext<'a, T> {
    /// Nesting depth of `cache` (zero for the root)
    #[inline]
    pub fn level(&self) -> usize {
        self.path.len()
    }

    /// The slot at this position; see [`Cache::get`]
    #[inline]
    pub fn item(&self) -> Option<Slot<&'a T>> {
        self.cache.get(self.index)
    }

    /// Item path: [`Self::path`] followed by [`Self::index`]
    pub fn item_path(&self) -> IndexPath {
        let mut path = self.path.clone();
        path.push(self.index);
        path
    }
}

/// Locate `flat_index` within the cache tree under `root`
///
/// Descends from `root`: at each level, expanded rows preceding the position
/// have their sub-cache's flat size subtracted; if the position falls within
/// a sub-cache the walk continues there. Positions beyond the end of `root`
/// map to a local index of `root` past its effective size.
pub fn flat_index_context<T>(root: &Cache<T>, flat_index: usize) -> FlatIndexContext<'_, T> {
    let mut cache = root;
    let mut path = IndexPath::new();
    let mut index = flat_index;

    'level: loop {
        let len = cache.effective_size();
        for (row, sub_cache) in cache.sub_caches() {
            if row >= len || index <= row {
                break;
            }

            // index > row: the position follows the expanded row
            let offset = index - row;
            let sub_len = sub_cache.flat_size();
            if offset <= sub_len {
                path.push(row);
                cache = sub_cache;
                index = offset - 1;
                continue 'level;
            }
            index -= sub_len;
        }
        break;
    }

    FlatIndexContext {
        page: cache.page_size().page_of(index),
        cache,
        path,
        index,
    }
}

/// Get the flat index of the item at `path`
///
/// `path` lists expanded row indices from the root followed by the item's
/// local index. If an ancestor on the path has no (non-empty) sub-cache, the
/// flat index of that ancestor is returned instead. The empty path yields 0.
pub fn flat_index_by_path<T>(root: &Cache<T>, path: &[usize]) -> usize {
    let mut cache = root;
    let mut flat_index = 0;

    for (depth, index) in path.iter().copied().enumerate() {
        flat_index += cache.flat_offset(index);
        if depth + 1 == path.len() {
            break;
        }

        match cache.sub_cache(index) {
            Some(sub_cache) if sub_cache.flat_size() > 0 => {
                flat_index += 1;
                cache = sub_cache;
            }
            _ => break,
        }
    }

    flat_index
}

/// Get the item path of `flat_index`
///
/// This is the inverse of [`flat_index_by_path`] for positions within the
/// flat size of `root`.
#[inline]
pub fn path_of_flat_index<T>(root: &Cache<T>, flat_index: usize) -> IndexPath {
    flat_index_context(root, flat_index).item_path()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PageSize;

    fn page_size(n: usize) -> PageSize {
        PageSize::try_from(n).unwrap()
    }

    /// Root of `len` rows with sub-caches of the given sizes
    fn tree(len: usize, subs: &[(usize, usize)]) -> Cache<usize> {
        let mut root = Cache::new(page_size(10), Some(len));
        root.set_page(0, 0..len);
        for (row, size) in subs.iter().copied() {
            let sub = root.create_sub_cache(row);
            sub.set_size(Some(size));
            sub.set_page(0, (0..size).map(|i| 100 * (row + 1) + i));
        }
        root
    }

    fn locate<T>(root: &Cache<T>, flat_index: usize) -> (Vec<usize>, usize) {
        let cx = flat_index_context(root, flat_index);
        (cx.path.to_vec(), cx.index)
    }

    #[test]
    fn flat_list() {
        let root = tree(5, &[]);
        assert_eq!(locate(&root, 0), (vec![], 0));
        assert_eq!(locate(&root, 4), (vec![], 4));
        // Beyond the end: best-effort answer on the root
        assert_eq!(locate(&root, 7), (vec![], 7));
        assert_eq!(flat_index_context(&root, 7).item(), None);
    }

    #[test]
    fn expanded_first_row() {
        let root = tree(2, &[(0, 3)]);
        assert_eq!(root.flat_size(), 5);
        assert_eq!(locate(&root, 0), (vec![], 0));
        assert_eq!(locate(&root, 1), (vec![0], 0));
        assert_eq!(locate(&root, 3), (vec![0], 2));
        assert_eq!(locate(&root, 4), (vec![], 1));

        let cx = flat_index_context(&root, 2);
        assert_eq!(cx.level(), 1);
        assert_eq!(cx.item(), Some(Slot::Loaded(&101)));
    }

    #[test]
    fn nested_expansion() {
        let mut root = tree(3, &[(1, 2)]);
        let sub = root.create_sub_cache(1).create_sub_cache(0);
        sub.set_size(Some(2));
        sub.set_page(0, [7, 8]);

        // 0: r0, 1: r1, 2: r1.0, 3: r1.0.0, 4: r1.0.1, 5: r1.1, 6: r2
        assert_eq!(root.flat_size(), 7);
        assert_eq!(locate(&root, 1), (vec![], 1));
        assert_eq!(locate(&root, 2), (vec![1], 0));
        assert_eq!(locate(&root, 4), (vec![1, 0], 1));
        assert_eq!(locate(&root, 5), (vec![1], 1));
        assert_eq!(locate(&root, 6), (vec![], 2));
    }

    #[test]
    fn unknown_sub_cache_size_uses_estimate() {
        let mut root = tree(2, &[]);
        // Expanded but nothing received: one page of placeholders is assumed
        root.create_sub_cache(0);
        assert_eq!(root.flat_size(), 2 + 10);
        assert_eq!(locate(&root, 1), (vec![0], 0));
        assert_eq!(flat_index_context(&root, 1).item(), Some(Slot::Pending));
        assert_eq!(locate(&root, 11), (vec![], 1));

        // One page received with unknown size: a further page is assumed
        root.sub_cache_mut(0).unwrap().set_page(0, 0..10);
        assert_eq!(root.flat_size(), 2 + 20);
        assert_eq!(locate(&root, 15), (vec![0], 14));
        assert_eq!(flat_index_context(&root, 15).page, 1);
        assert_eq!(flat_index_context(&root, 15).item(), Some(Slot::Pending));
        assert_eq!(locate(&root, 21), (vec![], 1));
    }

    #[test]
    fn pages_within_sub_cache() {
        let mut root = Cache::<u32>::new(page_size(2), Some(1));
        root.create_sub_cache(0).set_size(Some(5));
        let cx = flat_index_context(&root, 5);
        assert_eq!(cx.path.as_slice(), &[0]);
        assert_eq!(cx.index, 4);
        assert_eq!(cx.page, 2);
    }

    #[test]
    fn path_round_trip() {
        let mut root = tree(4, &[(0, 2), (2, 3)]);
        root.create_sub_cache(2).create_sub_cache(1).set_size(Some(2));
        let len = root.flat_size();
        assert_eq!(len, 4 + 2 + 3 + 2);
        for flat_index in 0..len {
            let path = path_of_flat_index(&root, flat_index);
            assert_eq!(flat_index_by_path(&root, &path), flat_index, "path {path:?}");
        }
    }

    #[test]
    fn path_through_collapsed_row() {
        let root = tree(3, &[]);
        // Row 1 has no sub-cache: resolve to the row itself
        assert_eq!(flat_index_by_path(&root, &[1, 5]), 1);
        assert_eq!(flat_index_by_path(&root, &[]), 0);
    }
}
