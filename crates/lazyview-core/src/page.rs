// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Pages and lengths

use crate::ConfigError;
use std::fmt;
use std::num::NonZeroUsize;
use std::ops::Range;

/// Number of items requested per page fetch
///
/// This is always at least 1. Fallible conversions from integer and float
/// types reject zero, negative and non-integer values with
/// [`ConfigError::InvalidPageSize`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct PageSize(NonZeroUsize);

impl PageSize {
    /// The default page size: 50
    pub const DEFAULT: PageSize = PageSize(NonZeroUsize::MIN.saturating_add(49));

    /// Construct
    #[inline]
    pub const fn new(size: NonZeroUsize) -> Self {
        PageSize(size)
    }

    /// Get the number of items per page
    #[inline]
    pub const fn get(self) -> usize {
        self.0.get()
    }

    /// Index of the page containing item `index`
    #[inline]
    pub const fn page_of(self, index: usize) -> usize {
        index / self.get()
    }

    /// Index of the first item of `page`
    #[inline]
    pub const fn page_start(self, page: usize) -> usize {
        page.saturating_mul(self.get())
    }

    /// Range of item indices covered by `page`
    #[inline]
    pub const fn page_range(self, page: usize) -> Range<usize> {
        let start = self.page_start(page);
        start..start.saturating_add(self.get())
    }

    /// Round `len` up to a whole number of pages
    #[inline]
    pub const fn round_up(self, len: usize) -> usize {
        len.div_ceil(self.get()).saturating_mul(self.get())
    }
}

impl Default for PageSize {
    #[inline]
    fn default() -> Self {
        PageSize::DEFAULT
    }
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<NonZeroUsize> for PageSize {
    #[inline]
    fn from(size: NonZeroUsize) -> Self {
        PageSize(size)
    }
}

impl From<PageSize> for usize {
    #[inline]
    fn from(size: PageSize) -> Self {
        size.get()
    }
}

impl TryFrom<usize> for PageSize {
    type Error = ConfigError;

    fn try_from(size: usize) -> Result<Self, ConfigError> {
        NonZeroUsize::new(size)
            .map(PageSize)
            .ok_or_else(|| ConfigError::InvalidPageSize(size.to_string()))
    }
}

impl TryFrom<i64> for PageSize {
    type Error = ConfigError;

    fn try_from(size: i64) -> Result<Self, ConfigError> {
        usize::try_from(size)
            .ok()
            .and_then(NonZeroUsize::new)
            .map(PageSize)
            .ok_or_else(|| ConfigError::InvalidPageSize(size.to_string()))
    }
}

impl TryFrom<f64> for PageSize {
    type Error = ConfigError;

    fn try_from(size: f64) -> Result<Self, ConfigError> {
        if size.fract() != 0.0 || !(1.0..=usize::MAX as f64).contains(&size) {
            return Err(ConfigError::InvalidPageSize(size.to_string()));
        }
        PageSize::try_from(size as usize)
    }
}

/// A length which is either known or only bounded from below
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataLen<Index> {
    /// Length is known and specified exactly
    Known(Index),
    /// A lower bound on length is specified
    LBound(Index),
}

impl<Index: Copy> DataLen<Index> {
    /// Returns the length payload (known or lower bound)
    #[inline]
    pub fn len(&self) -> Index {
        match self {
            DataLen::Known(len) => *len,
            DataLen::LBound(len) => *len,
        }
    }

    /// Returns true if a known length given
    #[inline]
    pub fn is_known(&self) -> bool {
        matches!(self, DataLen::Known(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_page_size() {
        assert_eq!(PageSize::default().get(), 50);
    }

    #[test]
    fn page_arithmetic() {
        let size = PageSize::try_from(50usize).unwrap();
        assert_eq!(size.page_of(0), 0);
        assert_eq!(size.page_of(49), 0);
        assert_eq!(size.page_of(50), 1);
        assert_eq!(size.page_range(2), 100..150);
        assert_eq!(size.round_up(0), 0);
        assert_eq!(size.round_up(1), 50);
        assert_eq!(size.round_up(100), 100);
    }

    #[test]
    fn rejects_invalid_page_sizes() {
        assert!(matches!(
            PageSize::try_from(0usize),
            Err(ConfigError::InvalidPageSize(_))
        ));
        assert!(PageSize::try_from(-3i64).is_err());
        assert!(PageSize::try_from(2.5f64).is_err());
        assert!(PageSize::try_from(0.0f64).is_err());
        assert!(PageSize::try_from(f64::NAN).is_err());
        assert_eq!(PageSize::try_from(20.0f64).map(PageSize::get), Ok(20));
        assert_eq!(PageSize::try_from(7i64).map(PageSize::get), Ok(7));
    }

    #[test]
    fn data_len() {
        assert!(DataLen::Known(3).is_known());
        assert!(!DataLen::LBound(3).is_known());
        assert_eq!(DataLen::LBound(7).len(), 7);
    }
}
