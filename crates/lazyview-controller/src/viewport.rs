// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Viewport integration

use crate::{ControllerConfig, DataProviderController};
use lazyview_core::PageSize;
use std::fmt::Debug;
use std::hash::Hash;
use std::ops::Range;

/// Policy for skipping index requests during fast scrolling
///
/// While a view scrolls, it may report indices which will be out of view
/// again before any fetched page arrives. Requests for indices within
/// `allowed_range` of the current scroller position are skipped; the view is
/// expected to request visible indices again once scrolling settles.
///
/// With the default factor of 1.5 and page size 50, `allowed_range` is 75.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndexSkipPolicy {
    allowed_range: usize,
}

impl IndexSkipPolicy {
    /// Construct with `allowed_range = floor(page_size * factor)`
    pub fn new(page_size: PageSize, factor: f32) -> Self {
        let allowed_range = (page_size.get() as f64 * f64::from(factor.max(0.0))).floor() as usize;
        IndexSkipPolicy { allowed_range }
    }

    /// Construct from configuration
    pub fn from_config(config: &ControllerConfig) -> Self {
        Self::new(config.page_size, config.skip_range_factor)
    }

    /// The allowed range
    #[inline]
    pub fn allowed_range(self) -> usize {
        self.allowed_range
    }

    /// True if a request for `index` should be skipped
    ///
    /// Nothing is skipped while the scroller is at position 0.
    #[inline]
    pub fn should_skip(self, index: usize, scroller_position: usize) -> bool {
        scroller_position != 0 && index.abs_diff(scroller_position) <= self.allowed_range
    }
}

impl<T: 'static, K: Clone + Eq + Hash + Debug> DataProviderController<T, K> {
    /// Prepare a range of flat indices for display
    ///
    /// Calls [`Self::ensure_flat_index_hierarchy_loaded`] for each index.
    /// Returns the number of fetches dispatched.
    pub fn prepare_range(&mut self, range: Range<usize>) -> usize {
        let mut dispatched = 0;
        for flat_index in range {
            if self.ensure_flat_index_hierarchy_loaded(flat_index) {
                dispatched += 1;
            }
        }
        dispatched
    }

    /// Request `index` from a scrolling view
    ///
    /// As [`Self::ensure_flat_index_loaded`], unless the request is skipped
    /// according to [`IndexSkipPolicy::from_config`].
    pub fn request_index(&mut self, index: usize, scroller_position: usize) -> bool {
        if IndexSkipPolicy::from_config(self.config()).should_skip(index, scroller_position) {
            log::trace!(
                target: "lazyview::controller",
                "request_index: skipping {index} (scroller at {scroller_position})",
            );
            return false;
        }
        self.ensure_flat_index_loaded(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::AcceptAll;

    #[test]
    fn default_allowed_range() {
        let policy = IndexSkipPolicy::from_config(&ControllerConfig::default());
        assert_eq!(policy.allowed_range(), 75);
        assert!(!policy.should_skip(10, 0));
        assert!(policy.should_skip(150, 100));
        assert!(policy.should_skip(175, 100));
        assert!(!policy.should_skip(176, 100));
        assert!(policy.should_skip(25, 100));
        assert!(!policy.should_skip(24, 100));
    }

    #[test]
    fn fractional_range_rounds_down() {
        let page_size = PageSize::try_from(5usize).unwrap();
        assert_eq!(IndexSkipPolicy::new(page_size, 1.5).allowed_range(), 7);
        assert_eq!(IndexSkipPolicy::new(page_size, 0.0).allowed_range(), 0);
    }

    #[test]
    fn prepare_range_loads_each_page_once() {
        let config = ControllerConfig::default().with_page_size(4usize).unwrap();
        let mut controller = DataProviderController::new(config, |x: &u32| *x);
        controller.set_items((0..20).collect(), AcceptAll).unwrap();

        // Items resolve synchronously: page 0 arrives with the size
        assert_eq!(controller.prepare_range(0..10), 3);
        assert_eq!(controller.root_cache().loaded_count(), 12);
        assert_eq!(controller.prepare_range(0..10), 0);
    }

    #[test]
    fn request_index_skips_near_scroller() {
        let config = ControllerConfig::default().with_page_size(4usize).unwrap();
        let mut controller = DataProviderController::new(config, |x: &u32| *x);
        controller.set_items((0..100).collect(), AcceptAll).unwrap();

        assert!(controller.request_index(0, 0));
        // allowed_range = 6
        assert!(!controller.request_index(40, 36));
        assert!(controller.request_index(40, 20));
        assert!(!controller.request_index(40, 20));
    }
}
