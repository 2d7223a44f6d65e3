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

use primitives::{Bytes, H256, U256};
use tiny_keccak::{Hasher, Keccak};

use super::types::BlockNumber;

/// 32-byte content-address of a header or transaction.
pub type Hash = H256;

/// Everything the tree needs to know about a header. The tree never
/// interprets any field beyond these; consensus rules, state roots, seals
/// and the like live entirely in the caller's concrete type.
pub trait HeaderLike: Clone + Send + Sync + 'static {
    fn number(&self) -> BlockNumber;
    fn hash(&self) -> Hash;
    fn parent_hash(&self) -> Hash;
    fn difficulty(&self) -> U256;

    fn is_genesis(&self) -> bool {
        self.number() == 0
    }
}

/// A header as handed back by the tree, with the cumulative total difficulty
/// the tree has computed for it.
#[derive(Debug, Clone)]
pub struct LocatedHeader<H> {
    pub header: H,
    pub total_difficulty: U256,
}

impl<H: HeaderLike> LocatedHeader<H> {
    pub fn is_genesis(&self) -> bool {
        self.header.is_genesis()
    }

    pub fn hash(&self) -> Hash {
        self.header.hash()
    }

    pub fn number(&self) -> BlockNumber {
        self.header.number()
    }
}

/// A minimal, concrete `HeaderLike` implementation for callers that have no
/// header format of their own yet (tests, light clients, tooling). The parts
/// the tree does not look at (a consensus seal, a state root, author
/// information, ...) belong in `extra`.
#[derive(Debug, Clone)]
pub struct BasicHeader {
    parent_hash: Hash,
    number: BlockNumber,
    difficulty: U256,
    /// Opaque payload the tree never parses; folded into the header's hash.
    extra: Bytes,
    /// Computed once at construction: `HeaderLike` requires `Sync`, which a
    /// lazily-memoized `RefCell` cannot provide.
    hash: Hash,
}

impl BasicHeader {
    pub fn new(parent_hash: Hash, number: BlockNumber, difficulty: U256, extra: Bytes) -> Self {
        let mut header = BasicHeader {
            parent_hash,
            number,
            difficulty,
            extra,
            hash: Hash::zero(),
        };
        header.hash = header.compute_hash();
        header
    }

    pub fn genesis(difficulty: U256, extra: Bytes) -> Self {
        Self::new(Hash::zero(), 0, difficulty, extra)
    }

    pub fn extra(&self) -> &[u8] {
        &self.extra
    }

    fn compute_hash(&self) -> Hash {
        let mut buf = Vec::with_capacity(32 + 8 + 32 + self.extra.len());
        buf.extend_from_slice(self.parent_hash.as_bytes());
        buf.extend_from_slice(&self.number.to_be_bytes());
        let mut difficulty_bytes = [0u8; 32];
        self.difficulty.to_big_endian(&mut difficulty_bytes);
        buf.extend_from_slice(&difficulty_bytes);
        buf.extend_from_slice(&self.extra);

        let mut keccak = Keccak::v256();
        keccak.update(&buf);
        let mut out = [0u8; 32];
        keccak.finalize(&mut out);
        Hash::from(out)
    }
}

impl HeaderLike for BasicHeader {
    fn number(&self) -> BlockNumber {
        self.number
    }

    fn hash(&self) -> Hash {
        self.hash
    }

    fn parent_hash(&self) -> Hash {
        self.parent_hash
    }

    fn difficulty(&self) -> U256 {
        self.difficulty
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_stable_across_calls() {
        let header = BasicHeader::genesis(U256::from(1), vec![1, 2, 3]);
        let a = header.hash();
        let b = header.hash();
        assert_eq!(a, b);
    }

    #[test]
    fn different_headers_hash_differently() {
        let a = BasicHeader::genesis(U256::from(1), vec![1]);
        let b = BasicHeader::genesis(U256::from(2), vec![1]);
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn genesis_header_is_genesis() {
        let header = BasicHeader::genesis(U256::from(1), vec![]);
        assert!(header.is_genesis());
        assert_eq!(header.parent_hash(), Hash::zero());
    }
}
