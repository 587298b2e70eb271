// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! lazyview core: paged data caches
//!
//! This crate holds the data model behind lazily-loaded, virtually-scrolled
//! views:
//!
//! -   A [`Cache`] stores one page-indexed level of a data set, with known or
//!     provisional size. Expanded rows of a hierarchical data set own a child
//!     cache (a *sub-cache*).
//! -   A [`Slot`] is either a loaded item or [`Slot::Pending`].
//! -   A [`PageRequestTracker`] de-duplicates in-flight page fetches and
//!     tags each with a [`RequestToken`] so that superseded responses may be
//!     recognised and dropped.
//! -   The [`flat_index`] functions translate between a single linear
//!     position over all visible rows and a (cache, local index) pair.
//!
//! Fetching is not done here; see the `lazyview-controller` crate.

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

mod cache;
mod error;
pub mod flat_index;
mod page;
mod slot;
mod tracker;

pub use cache::{Cache, CacheId, IndexPath};
pub use error::ConfigError;
pub use flat_index::FlatIndexContext;
pub use page::{DataLen, PageSize};
pub use slot::Slot;
pub use tracker::{PageRequestTracker, RequestToken};
