// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Data providers

use lazyview_core::{IndexPath, RequestToken};
use linear_map::LinearMap;
use std::fmt;
use std::sync::mpsc::Sender;

/// Additional request parameters
///
/// Merged into every [`PageParams`] from the function set by
/// [`DataProviderController::set_params`](crate::DataProviderController::set_params).
pub type ExtraParams = LinearMap<String, String>;

/// Parameters of a page request
#[derive(Debug)]
#[non_exhaustive]
pub struct PageParams<'a, T> {
    /// Page index within the requested cache
    pub page: usize,
    /// Number of items per page
    pub page_size: usize,
    /// Current filter text, if any
    pub filter: Option<&'a str>,
    /// The item owning the requested cache, or `None` for the root level
    pub parent_item: Option<&'a T>,
    /// Additional parameters
    pub extra: ExtraParams,
}

/// A page of data delivered through a [`PageCallback`]
pub(crate) struct PageResponse<T> {
    pub token: RequestToken,
    pub path: IndexPath,
    pub items: Vec<T>,
    pub size: Option<usize>,
}

/// Completion handle of a page request
///
/// Pass the page to [`Self::resolve`] exactly once. The handle is `Send` when
/// `T: Send` and may be resolved from any thread; the response is committed by
/// the controller within the call to [`DataProvider::fetch`] (when resolved
/// synchronously) or on the next call to
/// [`DataProviderController::process_responses`](crate::DataProviderController::process_responses).
///
/// Dropping the handle without resolving it leaves the page pending until
/// the request is invalidated.
pub struct PageCallback<T> {
    token: RequestToken,
    path: IndexPath,
    sender: Option<Sender<PageResponse<T>>>,
}

impl<T> PageCallback<T> {
    pub(crate) fn new(
        token: RequestToken,
        path: IndexPath,
        sender: Sender<PageResponse<T>>,
    ) -> Self {
        PageCallback {
            token,
            path,
            sender: Some(sender),
        }
    }

    /// The request token
    #[inline]
    pub fn token(&self) -> RequestToken {
        self.token
    }

    /// The requested page
    #[inline]
    pub fn page(&self) -> usize {
        self.token.page()
    }

    /// Nesting level of the requested cache (zero for the root)
    #[inline]
    pub fn level(&self) -> usize {
        self.path.len()
    }

    /// Deliver the page
    ///
    /// `items` should hold at most one page of items. `size` is the total
    /// number of items of the requested level, if known. When `size` is
    /// `None` and fewer than a page of items is delivered, the size is
    /// inferred to end with this page.
    pub fn resolve(mut self, items: Vec<T>, size: Option<usize>) {
        let Some(sender) = self.sender.take() else {
            return;
        };
        let response = PageResponse {
            token: self.token,
            path: std::mem::take(&mut self.path),
            items,
            size,
        };
        if sender.send(response).is_err() {
            log::debug!(
                target: "lazyview::controller",
                "PageCallback::resolve: controller dropped; discarding page {}",
                self.token.page(),
            );
        }
    }
}

impl<T> Drop for PageCallback<T> {
    fn drop(&mut self) {
        if self.sender.is_some() && !std::thread::panicking() {
            log::warn!(
                target: "lazyview::controller",
                "PageCallback dropped without resolving page {} of cache {}",
                self.token.page(),
                self.token.cache(),
            );
        }
    }
}

impl<T> fmt::Debug for PageCallback<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageCallback")
            .field("token", &self.token)
            .field("path", &self.path)
            .field("resolved", &self.sender.is_none())
            .finish()
    }
}

/// A source of paged data
///
/// Implementations answer each call to [`Self::fetch`] by resolving the
/// `callback`, either before returning or at a later time.
pub trait DataProvider<T> {
    /// Fetch a page
    fn fetch(&mut self, params: PageParams<'_, T>, callback: PageCallback<T>);
}

impl<T, P: DataProvider<T> + ?Sized> DataProvider<T> for Box<P> {
    fn fetch(&mut self, params: PageParams<'_, T>, callback: PageCallback<T>) {
        (**self).fetch(params, callback)
    }
}

/// A [`DataProvider`] over a closure
///
/// Constructed by [`from_fn`].
#[derive(Clone)]
pub struct FnProvider<F>(F);

impl<F> fmt::Debug for FnProvider<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnProvider")
    }
}

/// Construct a [`DataProvider`] from a closure
///
/// ```
/// # use lazyview_controller::{PageCallback, PageParams, from_fn};
/// let provider = from_fn(|params: PageParams<'_, u32>, callback: PageCallback<u32>| {
///     let start = (params.page * params.page_size) as u32;
///     let items = (start..100.min(start + params.page_size as u32)).collect();
///     callback.resolve(items, Some(100));
/// });
/// # let _ = provider;
/// ```
pub fn from_fn<T, F>(f: F) -> FnProvider<F>
where
    F: FnMut(PageParams<'_, T>, PageCallback<T>),
{
    FnProvider(f)
}

impl<T, F> DataProvider<T> for FnProvider<F>
where
    F: FnMut(PageParams<'_, T>, PageCallback<T>),
{
    #[inline]
    fn fetch(&mut self, params: PageParams<'_, T>, callback: PageCallback<T>) {
        (self.0)(params, callback)
    }
}
