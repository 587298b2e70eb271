// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Controller configuration

use lazyview_core::{ConfigError, PageSize};
use std::env::var;

/// Controller configuration
///
/// Construct with [`Default`] (page size 50, unknown size) or
/// [`Self::from_env`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ControllerConfig {
    /// Number of items requested per page
    pub page_size: PageSize,
    /// Total number of root items, if known in advance
    pub size: Option<usize>,
    /// Scroll-tracking window, as a multiple of the page size
    ///
    /// See [`IndexSkipPolicy`](crate::IndexSkipPolicy).
    pub skip_range_factor: f32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        ControllerConfig {
            page_size: PageSize::DEFAULT,
            size: None,
            skip_range_factor: 1.5,
        }
    }
}

impl ControllerConfig {
    /// Construct a new instance, reading from environment variables
    ///
    /// The following environment variables are read.
    ///
    /// # Page size
    ///
    /// The `LAZYVIEW_PAGE_SIZE` variable sets the number of items fetched per
    /// page; it must be an integer > 0.
    ///
    /// # Size
    ///
    /// The `LAZYVIEW_SIZE` variable sets the number of root items when known in
    /// advance.
    ///
    /// # Skip range
    ///
    /// The `LAZYVIEW_SKIP_RANGE` variable sets [`Self::skip_range_factor`].
    ///
    /// Invalid values are logged and ignored.
    pub fn from_env() -> Self {
        Self::from_vars(|name| var(name).ok())
    }

    fn from_vars(get: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = ControllerConfig::default();

        if let Some(v) = get("LAZYVIEW_PAGE_SIZE") {
            let page_size = v
                .trim()
                .parse::<i64>()
                .map_err(|_| ConfigError::InvalidPageSize(v.clone()))
                .and_then(PageSize::try_from);
            match page_size {
                Ok(page_size) => config.page_size = page_size,
                Err(err) => log::error!("from_env: bad var LAZYVIEW_PAGE_SIZE={v}: {err}"),
            }
        }

        if let Some(v) = get("LAZYVIEW_SIZE") {
            match v.trim().parse::<usize>() {
                Ok(size) => config.size = Some(size),
                Err(_) => log::error!("from_env: bad var LAZYVIEW_SIZE={v}"),
            }
        }

        if let Some(v) = get("LAZYVIEW_SKIP_RANGE") {
            match v.trim().parse::<f32>() {
                Ok(factor) if factor >= 0.0 => config.skip_range_factor = factor,
                _ => log::error!("from_env: bad var LAZYVIEW_SKIP_RANGE={v}"),
            }
        }

        config
    }

    /// Set the page size, validating input
    pub fn with_page_size<N>(mut self, page_size: N) -> Result<Self, ConfigError>
    where
        PageSize: TryFrom<N, Error = ConfigError>,
    {
        self.page_size = PageSize::try_from(page_size)?;
        Ok(self)
    }

    /// Set the number of root items
    pub fn with_size(mut self, size: Option<usize>) -> Self {
        self.size = size;
        self
    }
}
