// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Controller events

use lazyview_core::CacheId;
use std::fmt;

/// Notification emitted by a [`DataProviderController`](crate::DataProviderController)
///
/// Events are delivered synchronously to each listener in order of
/// registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataEvent {
    /// A page fetch was dispatched to the provider
    PageRequested { cache: CacheId, page: usize },
    /// A page was committed to its cache
    ///
    /// Cache contents changed: views should re-read visible items.
    PageReceived { cache: CacheId, page: usize },
    /// A page was committed and no further requests are pending
    PageLoaded,
}

/// Identifier of a registered listener
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Box<dyn FnMut(&DataEvent)>;

/// Registry of event listeners
#[derive(Default)]
pub(crate) struct Listeners {
    last_id: u64,
    list: Vec<(ListenerId, Listener)>,
}

impl Listeners {
    pub fn add(&mut self, listener: impl FnMut(&DataEvent) + 'static) -> ListenerId {
        self.last_id += 1;
        let id = ListenerId(self.last_id);
        self.list.push((id, Box::new(listener)));
        id
    }

    pub fn remove(&mut self, id: ListenerId) -> bool {
        let len = self.list.len();
        self.list.retain(|(other, _)| *other != id);
        self.list.len() < len
    }

    pub fn emit(&mut self, event: &DataEvent) {
        log::trace!(target: "lazyview::controller", "emit: {event:?}");
        for (_, listener) in &mut self.list {
            listener(event);
        }
    }
}

impl fmt::Debug for Listeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.list.iter().map(|(id, _)| id))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn add_emit_remove() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut listeners = Listeners::default();

        let first = {
            let log = log.clone();
            listeners.add(move |event| log.borrow_mut().push((1, *event)))
        };
        let second = {
            let log = log.clone();
            listeners.add(move |event| log.borrow_mut().push((2, *event)))
        };
        assert_ne!(first, second);

        listeners.emit(&DataEvent::PageLoaded);
        assert!(listeners.remove(first));
        assert!(!listeners.remove(first));
        listeners.emit(&DataEvent::PageLoaded);

        assert_eq!(
            *log.borrow(),
            [
                (1, DataEvent::PageLoaded),
                (2, DataEvent::PageLoaded),
                (2, DataEvent::PageLoaded),
            ]
        );
    }
}
