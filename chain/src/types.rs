// Copyright 2018 Kodebox, Inc.
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

pub use primitives::BlockNumber;

/// Capacity of each of the three LRU caches (headers, blocks, levels).
pub const CACHE_SIZE: usize = 64;

/// Number of trailing blocks, below `Head`, that `shouldCache` still admits.
pub const CACHE_HEAD_WINDOW: u64 = 64;

/// Number of blocks the fast-sync header-only skip leaves unread, trailing the frontier.
pub const FAST_SYNC_TAIL: u64 = 1024;

/// Default `batchSize` for `LoadBlocksFromDb` when the caller does not override it.
pub const DEFAULT_BATCH_SIZE: u64 = 1000;

/// Upper bound on the binary search `BestKnownNumber` performs over the level store at startup.
pub const BEST_KNOWN_NUMBER_SEARCH_WINDOW: u64 = 10_000_000;

/// Identifies the network a tree instance belongs to, proxied from the spec provider.
pub type ChainId = u64;
