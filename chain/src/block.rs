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

use primitives::{Bytes, U256};

use super::header::{Hash, HeaderLike};

/// A header plus an opaque body. The tree only ever needs the transaction
/// hashes out of the body, to evict them from the pool once the block lands
/// on the main chain; it never interprets transaction contents.
pub trait BlockLike: Clone + Send + Sync + 'static {
    type Header: HeaderLike;

    fn header(&self) -> &Self::Header;
    fn transaction_hashes(&self) -> Vec<Hash>;
}

/// A block as handed back by the tree, with its cumulative total difficulty.
#[derive(Debug, Clone)]
pub struct LocatedBlock<B: BlockLike> {
    pub block: B,
    pub total_difficulty: U256,
}

impl<B: BlockLike> LocatedBlock<B> {
    pub fn hash(&self) -> Hash {
        self.block.header().hash()
    }
}

/// A minimal, concrete `BlockLike` implementation pairing a `BasicHeader`
/// with an opaque body and an explicit transaction hash list.
#[derive(Debug, Clone)]
pub struct BasicBlock<H: HeaderLike> {
    header: H,
    body: Bytes,
    transaction_hashes: Vec<Hash>,
}

impl<H: HeaderLike> BasicBlock<H> {
    pub fn new(header: H, body: Bytes, transaction_hashes: Vec<Hash>) -> Self {
        BasicBlock {
            header,
            body,
            transaction_hashes,
        }
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

impl<H: HeaderLike> BlockLike for BasicBlock<H> {
    type Header = H;

    fn header(&self) -> &H {
        &self.header
    }

    fn transaction_hashes(&self) -> Vec<Hash> {
        self.transaction_hashes.clone()
    }
}
