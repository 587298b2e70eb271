// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! lazyview: paged, lazily-loaded data for virtual-scrolling views
//!
//! This, the main lazyview crate, is merely a wrapper over other crates:
//!
//! -   [`lazyview_core`] provides the data model: page caches, the
//!     placeholder [`Slot`], request tracking and flat index mapping
//! -   [`lazyview_controller`] provides the [`DataProviderController`],
//!     which fetches pages from a [`DataProvider`] on demand
//!
//! All items from both crates are re-exported from this crate.
//!
//! # Example
//!
//! ```
//! use lazyview::{ControllerConfig, DataProviderController, Slot, filter::AcceptAll};
//!
//! let mut controller = DataProviderController::new(ControllerConfig::default(), |x: &u32| *x);
//! controller.set_items((0..120).collect(), AcceptAll).unwrap();
//!
//! // A static list resolves synchronously
//! assert!(controller.ensure_flat_index_loaded(60));
//! assert_eq!(controller.size(), Some(120));
//! assert_eq!(controller.item_at(60), Some(Slot::Loaded(&60)));
//! assert_eq!(controller.item_at(0), Some(Slot::Pending));
//! ```

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub use lazyview_controller::*;
pub use lazyview_core::*;
