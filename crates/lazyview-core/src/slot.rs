// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Cache slots

/// Contents of a cache slot
///
/// Every addressable index of a [`Cache`](crate::Cache) holds a slot. A slot
/// is [`Slot::Pending`] until the page containing it has been received.
///
/// Being a variant rather than a sentinel value, a pending slot can never be
/// confused with an application item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[must_use]
pub enum Slot<T> {
    /// The item has been received
    Loaded(T),
    /// The item is not (yet) available
    Pending,
}

impl<T> Slot<T> {
    /// True if the slot holds an item
    #[inline]
    pub fn is_loaded(&self) -> bool {
        matches!(self, Slot::Loaded(_))
    }

    /// True if the slot is a placeholder
    #[inline]
    pub fn is_pending(&self) -> bool {
        matches!(self, Slot::Pending)
    }

    /// Convert from `&Slot<T>` to `Slot<&T>`
    #[inline]
    pub fn as_ref(&self) -> Slot<&T> {
        match self {
            Slot::Loaded(item) => Slot::Loaded(item),
            Slot::Pending => Slot::Pending,
        }
    }

    /// Take the item, if loaded
    #[inline]
    pub fn loaded(self) -> Option<T> {
        match self {
            Slot::Loaded(item) => Some(item),
            Slot::Pending => None,
        }
    }

    /// Map a loaded item
    #[inline]
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Slot<U> {
        match self {
            Slot::Loaded(item) => Slot::Loaded(f(item)),
            Slot::Pending => Slot::Pending,
        }
    }
}

impl<T> Default for Slot<T> {
    #[inline]
    fn default() -> Self {
        Slot::Pending
    }
}

impl<T> From<Option<T>> for Slot<T> {
    fn from(item: Option<T>) -> Self {
        match item {
            Some(item) => Slot::Loaded(item),
            None => Slot::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_pending() {
        let slot: Slot<u32> = Slot::default();
        assert!(slot.is_pending());
        assert_eq!(slot.loaded(), None);
    }

    #[test]
    fn map_preserves_variant() {
        assert_eq!(Slot::Loaded(2).map(|x| x * 3), Slot::Loaded(6));
        assert_eq!(Slot::<u32>::Pending.map(|x| x * 3), Slot::Pending);
    }

    #[test]
    fn item_equal_to_default_is_not_pending() {
        // A "blank" application item is still an item
        let slot = Slot::Loaded(String::new());
        assert!(slot.is_loaded());
        assert_ne!(slot.as_ref(), Slot::Pending);
    }
}
