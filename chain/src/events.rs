// Copyright 2018-2019 Kodebox, Inc.
// This file is part of CodeChain.
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Publish channel for the tree's three events. Subscribers are plain
//! callbacks, invoked synchronously on the thread that called the mutating
//! operation -- not routed through an `mpsc` channel, since nothing here
//! needs a suspension point. The one place this crate does want a rendezvous
//! (DB-load batch backpressure) uses `crossbeam-channel` directly instead;
//! see `loader.rs`.

use parking_lot::RwLock;
use primitives::U256;

use super::block::BlockLike;
use super::header::HeaderLike;

/// One of the three events the design names. Handlers must not call back
/// into a mutating tree operation: they run on the calling thread, inside
/// the operation that raised the event.
pub enum Event<H, B> {
    /// `BestSuggested` advanced.
    NewBestSuggestedBlock {
        header: H,
        total_difficulty: U256,
    },
    /// A block was promoted onto the main chain by `MoveToMain`.
    BlockAddedToMain {
        block: B,
        total_difficulty: U256,
    },
    /// `Head` advanced.
    NewHeadBlock {
        header: H,
        total_difficulty: U256,
    },
}

type Subscriber<H, B> = Box<dyn Fn(&Event<H, B>) + Send + Sync>;

pub struct EventBus<H: HeaderLike, B: BlockLike<Header = H>> {
    subscribers: RwLock<Vec<Subscriber<H, B>>>,
}

impl<H: HeaderLike, B: BlockLike<Header = H>> Default for EventBus<H, B> {
    fn default() -> Self {
        EventBus {
            subscribers: RwLock::new(Vec::new()),
        }
    }
}

impl<H: HeaderLike, B: BlockLike<Header = H>> EventBus<H, B> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a subscriber, invoked synchronously in registration order
    /// on every future `publish`. Past events are never replayed.
    pub fn subscribe<F>(&self, handler: F)
    where
        F: Fn(&Event<H, B>) + Send + Sync + 'static, {
        self.subscribers.write().push(Box::new(handler));
    }

    pub fn publish(&self, event: Event<H, B>) {
        for subscriber in self.subscribers.read().iter() {
            subscriber(&event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::BasicHeader;
    use crate::block::BasicBlock;
    use primitives::U256;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn subscribers_are_invoked_synchronously_in_order() {
        let bus: EventBus<BasicHeader, BasicBlock<BasicHeader>> = EventBus::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);
        bus.subscribe(move |_event| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });
        bus.publish(Event::NewHeadBlock {
            header: BasicHeader::genesis(U256::from(1), vec![]),
            total_difficulty: U256::from(1),
        });
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
