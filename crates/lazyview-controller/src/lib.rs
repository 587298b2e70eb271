// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! lazyview controller: lazily-fetched data for virtual-scrolling views
//!
//! A [`DataProviderController`] owns a tree of page caches and fills them
//! on demand from a [`DataProvider`] supplied by the application:
//!
//! 1.  The view reports which flat index it needs
//!     ([`DataProviderController::ensure_flat_index_loaded`] or
//!     [`DataProviderController::prepare_range`])
//! 2.  The controller maps the index to a cache and page and, unless that
//!     page is already loaded or pending, calls [`DataProvider::fetch`]
//! 3.  The provider resolves the [`PageCallback`], synchronously or later,
//!     possibly from another thread
//! 4.  The controller commits the page (directly after dispatch, or from
//!     [`DataProviderController::process_responses`]) and emits a
//!     [`DataEvent`]; the view re-reads cache contents
//!
//! A page requested again after invalidation is committed only from the
//! latest request: responses to superseded requests are dropped.
//!
//! The controller has no dependency on any UI toolkit. It is driven by
//! explicit method calls and reports through [`DataEvent`] listeners.

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod array;
pub mod filter;

mod config;
mod controller;
mod event;
mod provider;
mod viewport;

pub use array::ArrayDataProvider;
pub use config::ControllerConfig;
pub use controller::DataProviderController;
pub use event::{DataEvent, ListenerId};
pub use provider::{DataProvider, ExtraParams, FnProvider, PageCallback, PageParams, from_fn};
pub use viewport::IndexSkipPolicy;
