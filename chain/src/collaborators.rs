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

//! Interfaces for the two external collaborators spec.md §6 names: a
//! transaction pool the tree evicts from on promotion, and a spec provider
//! the tree proxies `ChainId` from. Both are out of this crate's scope --
//! validation, execution and the pool's own data structures live elsewhere
//! -- so the tree only ever sees them through these traits.

use super::header::Hash;
use super::types::ChainId;

/// The subset of a transaction pool the tree needs: removing transactions
/// that landed on the main chain so the pool stops proposing them.
pub trait TransactionPool: Send + Sync {
    fn remove_transaction(&self, hash: &Hash);
}

/// Proxies the chain's identity. The tree has no opinion on what a chain id
/// means; it only ever reads it back out for `BlockTree::chain_id`.
pub trait SpecProvider: Send + Sync {
    fn chain_id(&self) -> ChainId;
}

/// A no-op `TransactionPool`, useful for tests and callers that have not
/// wired a real pool up yet.
#[derive(Default)]
pub struct NullTransactionPool;

impl TransactionPool for NullTransactionPool {
    fn remove_transaction(&self, _hash: &Hash) {}
}

/// A fixed-id `SpecProvider`, for tests.
pub struct FixedSpecProvider(pub ChainId);

impl SpecProvider for FixedSpecProvider {
    fn chain_id(&self) -> ChainId {
        self.0
    }
}
