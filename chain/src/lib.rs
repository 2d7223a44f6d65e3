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

//! The block tree index: the authoritative in-process structure that tracks
//! every known header and body, organizes them by height into levels that
//! fan out across competing forks, persists that index to the three stores
//! in `kv`, and promotes a chain of headers to canonical by cumulative
//! proof-of-work difficulty (`tree`).
//!
//! Block validation, execution, the transaction pool's own bookkeeping and
//! the network sync driver live outside this crate; `collaborators` and
//! `codec` are the seams where callers plug those in.

extern crate byteorder;
#[macro_use]
extern crate chain_logger;
extern crate crossbeam_channel;
extern crate kvdb;
#[macro_use]
extern crate log;
extern crate lru_cache;
extern crate parking_lot;
extern crate primitives;
extern crate tiny_keccak;

#[cfg(test)]
extern crate kvdb_memorydb;

pub mod block;
mod cache;
pub mod codec;
pub mod collaborators;
pub mod error;
pub mod events;
pub mod header;
mod invalid;
pub mod kv;
mod level;
mod loader;
pub mod tree;
pub mod types;

pub use crate::block::{BasicBlock, BlockLike, LocatedBlock};
pub use crate::codec::{BasicCodec, BlockCodec, HeaderCodec};
pub use crate::collaborators::{FixedSpecProvider, NullTransactionPool, SpecProvider, TransactionPool};
pub use crate::error::{AddBlockResult, Error};
pub use crate::events::{Event, EventBus};
pub use crate::header::{BasicHeader, Hash, HeaderLike, LocatedHeader};
pub use crate::kv::Stores;
pub use crate::level::{BlockInfo, ChainLevelInfo};
pub use crate::tree::BlockTree;
pub use crate::types::{BlockNumber, ChainId};
