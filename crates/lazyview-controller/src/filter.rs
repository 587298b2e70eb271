// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Filters over static item lists
//!
//! These are used by [`ArrayDataProvider`](crate::ArrayDataProvider) to apply
//! the controller's filter text to a static item list.

use std::fmt;

/// Ability to set filter text
pub trait FilterValue {
    /// Update the filter, returning `true` on change
    fn set_filter(&mut self, text: &str) -> bool;
}

/// Types usable as a filter
pub trait Filter<T: ?Sized>: FilterValue {
    /// Returns true if the given item matches this filter
    fn matches(&self, item: &T) -> bool;
}

/// Filter: accept every item
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AcceptAll;

impl FilterValue for AcceptAll {
    fn set_filter(&mut self, _: &str) -> bool {
        false
    }
}

impl<T: ?Sized> Filter<T> for AcceptAll {
    fn matches(&self, _: &T) -> bool {
        true
    }
}

/// Filter: target contains self (case-sensitive string match)
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ContainsString(String);

impl ContainsString {
    /// Construct with empty text
    pub fn new() -> Self {
        ContainsString(String::new())
    }
}

impl FilterValue for ContainsString {
    fn set_filter(&mut self, text: &str) -> bool {
        if self.0 != text {
            self.0 = text.to_string();
            true
        } else {
            false
        }
    }
}

impl<T: AsRef<str> + ?Sized> Filter<T> for ContainsString {
    fn matches(&self, item: &T) -> bool {
        item.as_ref().contains(&self.0)
    }
}

/// Filter: target contains self, ignoring case
///
/// The filter text and each item's `as_ref()` string are compared after
/// `to_uppercase`. This is not full Unicode case folding: some characters
/// (for example `ß`) may match differently.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ContainsCaseInsensitive(String);

impl ContainsCaseInsensitive {
    /// Construct with empty text
    pub fn new() -> Self {
        ContainsCaseInsensitive(String::new())
    }
}

impl FilterValue for ContainsCaseInsensitive {
    fn set_filter(&mut self, text: &str) -> bool {
        let filter = text.to_uppercase();
        if filter != self.0 {
            self.0 = filter;
            true
        } else {
            false
        }
    }
}

impl<T: AsRef<str> + ?Sized> Filter<T> for ContainsCaseInsensitive {
    fn matches(&self, item: &T) -> bool {
        item.as_ref().to_uppercase().contains(&self.0)
    }
}

/// Filter: apply a string filter to an item's label
///
/// The `label` function extracts the text to match, e.g. a display name.
#[derive(Clone)]
pub struct ByLabel<F, L> {
    filter: F,
    label: L,
}

impl<F, L> ByLabel<F, L> {
    /// Construct from a string `filter` and a `label` accessor
    pub fn new<T>(filter: F, label: L) -> Self
    where
        L: Fn(&T) -> &str,
    {
        ByLabel { filter, label }
    }
}

impl<F: fmt::Debug, L> fmt::Debug for ByLabel<F, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByLabel")
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}

impl<F: FilterValue, L> FilterValue for ByLabel<F, L> {
    fn set_filter(&mut self, text: &str) -> bool {
        self.filter.set_filter(text)
    }
}

impl<T, F, L> Filter<T> for ByLabel<F, L>
where
    F: Filter<str>,
    L: Fn(&T) -> &str,
{
    fn matches(&self, item: &T) -> bool {
        self.filter.matches((self.label)(item))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_string() {
        let mut filter = ContainsString::new();
        assert!(!filter.set_filter(""));
        assert!(Filter::<str>::matches(&filter, "anything"));
        assert!(filter.set_filter("ap"));
        assert!(filter.matches(&"apple".to_string()));
        assert!(!Filter::<str>::matches(&filter, "Apple"));
    }

    #[test]
    fn contains_case_insensitive() {
        let mut filter = ContainsCaseInsensitive::new();
        assert!(filter.set_filter("ap"));
        assert!(!filter.set_filter("AP"));
        assert!(Filter::<str>::matches(&filter, "Grape"));
        assert!(!Filter::<str>::matches(&filter, "pear"));
    }

    #[test]
    fn by_label() {
        struct Fruit {
            name: &'static str,
        }

        let mut filter = ByLabel::new(ContainsCaseInsensitive::new(), |fruit: &Fruit| fruit.name);
        filter.set_filter("ERR");
        assert!(filter.matches(&Fruit { name: "cherry" }));
        assert!(!filter.matches(&Fruit { name: "lime" }));
    }
}
