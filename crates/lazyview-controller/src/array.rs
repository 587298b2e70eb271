// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Static item lists

use crate::filter::{AcceptAll, Filter};
use crate::{DataProvider, PageCallback, PageParams};

/// A [`DataProvider`] serving a static item list
///
/// Each fetch applies the request's filter text to the list, then serves the
/// requested page of matching items together with the number of matches.
/// Pages are always resolved synchronously.
///
/// The list is flat: requests for the children of an item resolve with no
/// items and size zero.
#[derive(Clone, Debug, Default)]
pub struct ArrayDataProvider<T, F = AcceptAll> {
    items: Vec<T>,
    filter: F,
}

impl<T> ArrayDataProvider<T> {
    /// Construct over `items` without filtering
    pub fn unfiltered(items: Vec<T>) -> Self {
        ArrayDataProvider {
            items,
            filter: AcceptAll,
        }
    }
}

impl<T, F: Filter<T>> ArrayDataProvider<T, F> {
    /// Construct over `items` with `filter`
    pub fn new(items: Vec<T>, filter: F) -> Self {
        ArrayDataProvider { items, filter }
    }

    /// Access the item list
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Number of items matching the filter `text`
    pub fn count_matching(&mut self, text: &str) -> usize {
        self.filter.set_filter(text);
        self.items.iter().filter(|item| self.filter.matches(item)).count()
    }
}

impl<T: Clone, F: Filter<T>> DataProvider<T> for ArrayDataProvider<T, F> {
    fn fetch(&mut self, params: PageParams<'_, T>, callback: PageCallback<T>) {
        if params.parent_item.is_some() {
            callback.resolve(Vec::new(), Some(0));
            return;
        }

        self.filter.set_filter(params.filter.unwrap_or_default());
        let filter = &self.filter;
        let matching: Vec<&T> = self.items.iter().filter(|item| filter.matches(item)).collect();

        let start = params.page.saturating_mul(params.page_size);
        let items = matching
            .iter()
            .skip(start)
            .take(params.page_size)
            .map(|item| (*item).clone())
            .collect();
        callback.resolve(items, Some(matching.len()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::ContainsCaseInsensitive;
    use crate::{ControllerConfig, DataProviderController};
    use lazyview_core::{PageSize, Slot};

    fn config(page_size: usize) -> ControllerConfig {
        ControllerConfig {
            page_size: PageSize::try_from(page_size).unwrap(),
            ..ControllerConfig::default()
        }
    }

    fn fruit() -> Vec<String> {
        ["apple", "Apricot", "banana", "cherry", "grape", "papaya"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    #[test]
    fn serves_pages_with_size() {
        let mut controller = DataProviderController::new(config(4), |s: &String| s.clone());
        controller.set_items(fruit(), AcceptAll).unwrap();
        assert!(controller.load_first_page());
        assert_eq!(controller.size(), Some(6));
        assert_eq!(controller.item_at(3), Some(Slot::Loaded(&"cherry".to_string())));
        assert_eq!(controller.item_at(4), Some(Slot::Pending));

        assert!(controller.ensure_flat_index_loaded(5));
        assert_eq!(controller.item_at(5), Some(Slot::Loaded(&"papaya".to_string())));
        assert!(!controller.is_loading());
    }

    #[test]
    fn applies_filter_text() {
        let mut controller = DataProviderController::new(config(2), |s: &String| s.clone());
        controller.set_items(fruit(), ContainsCaseInsensitive::new()).unwrap();
        controller.set_filter("AP");
        controller.load_first_page();
        // apple, Apricot, grape, papaya
        assert_eq!(controller.size(), Some(4));
        controller.ensure_flat_index_loaded(3);
        assert_eq!(controller.item_at(3), Some(Slot::Loaded(&"papaya".to_string())));
    }

    #[test]
    fn pages_beyond_end_are_empty() {
        let mut provider = ArrayDataProvider::unfiltered(vec![1, 2, 3]);
        assert_eq!(provider.count_matching(""), 3);

        let mut controller = DataProviderController::new(config(2), |x: &i32| *x);
        controller.set_items(provider.items().to_vec(), AcceptAll).unwrap();
        controller.load_first_page();
        assert_eq!(controller.size(), Some(3));
        assert_eq!(controller.item_at(3), None);
    }
}
