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

//! The tree's three logical namespaces, each backed by a caller-supplied
//! `KeyValueStore`. Any engine satisfying the contract is acceptable; the
//! tree never depends on a concrete backend.

use std::sync::Arc;

use kvdb::KeyValueStore;
use primitives::{max_hash, zero_hash, BlockNumber};

use super::error::Error;
use super::header::Hash;

/// Sentinel meta key holding `Head`'s hash. All-zero, so it can never
/// collide with a real block hash produced by a sound hash function.
pub fn head_key() -> Hash {
    zero_hash()
}

/// Sentinel meta key holding the crash-recovery pointer for a cleanup in
/// progress. All-one, for the same reason `head_key` is all-zero.
pub fn delete_pointer_key() -> Hash {
    max_hash()
}

fn level_key(number: BlockNumber) -> [u8; 8] {
    number.to_be_bytes()
}

/// The three stores the tree writes through: headers, block bodies and
/// metadata (levels plus the two sentinels above).
pub struct Stores {
    headers: Arc<dyn KeyValueStore>,
    blocks: Arc<dyn KeyValueStore>,
    meta: Arc<dyn KeyValueStore>,
}

impl Stores {
    pub fn new(headers: Arc<dyn KeyValueStore>, blocks: Arc<dyn KeyValueStore>, meta: Arc<dyn KeyValueStore>) -> Self {
        Stores {
            headers,
            blocks,
            meta,
        }
    }

    pub fn header_bytes(&self, hash: &Hash) -> Result<Option<Vec<u8>>, Error> {
        Ok(self.headers.get(hash.as_bytes())?.map(|v| v.to_vec()))
    }

    pub fn set_header_bytes(&self, hash: &Hash, bytes: &[u8]) -> Result<(), Error> {
        Ok(self.headers.set(hash.as_bytes(), bytes)?)
    }

    pub fn delete_header(&self, hash: &Hash) -> Result<(), Error> {
        Ok(self.headers.delete(hash.as_bytes())?)
    }

    pub fn block_bytes(&self, hash: &Hash) -> Result<Option<Vec<u8>>, Error> {
        Ok(self.blocks.get(hash.as_bytes())?.map(|v| v.to_vec()))
    }

    pub fn set_block_bytes(&self, hash: &Hash, bytes: &[u8]) -> Result<(), Error> {
        Ok(self.blocks.set(hash.as_bytes(), bytes)?)
    }

    pub fn delete_block(&self, hash: &Hash) -> Result<(), Error> {
        Ok(self.blocks.delete(hash.as_bytes())?)
    }

    pub fn level_bytes(&self, number: BlockNumber) -> Result<Option<Vec<u8>>, Error> {
        Ok(self.meta.get(&level_key(number))?.map(|v| v.to_vec()))
    }

    pub fn set_level_bytes(&self, number: BlockNumber, bytes: &[u8]) -> Result<(), Error> {
        Ok(self.meta.set(&level_key(number), bytes)?)
    }

    pub fn delete_level(&self, number: BlockNumber) -> Result<(), Error> {
        Ok(self.meta.delete(&level_key(number))?)
    }

    pub fn head_hash(&self) -> Result<Option<Hash>, Error> {
        Ok(self.meta.get(head_key().as_bytes())?.map(|v| Hash::from_slice(&v)))
    }

    pub fn set_head_hash(&self, hash: &Hash) -> Result<(), Error> {
        Ok(self.meta.set(head_key().as_bytes(), hash.as_bytes())?)
    }

    pub fn delete_pointer(&self) -> Result<Option<Hash>, Error> {
        Ok(self.meta.get(delete_pointer_key().as_bytes())?.map(|v| Hash::from_slice(&v)))
    }

    pub fn set_delete_pointer(&self, hash: &Hash) -> Result<(), Error> {
        Ok(self.meta.set(delete_pointer_key().as_bytes(), hash.as_bytes())?)
    }

    pub fn clear_delete_pointer(&self) -> Result<(), Error> {
        Ok(self.meta.delete(delete_pointer_key().as_bytes())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kvdb_memorydb::create;

    fn stores() -> Stores {
        Stores::new(Arc::new(create()), Arc::new(create()), Arc::new(create()))
    }

    #[test]
    fn head_hash_round_trips() {
        let stores = stores();
        assert_eq!(stores.head_hash().unwrap(), None);
        let hash = Hash::repeat_byte(7);
        stores.set_head_hash(&hash).unwrap();
        assert_eq!(stores.head_hash().unwrap(), Some(hash));
    }

    #[test]
    fn delete_pointer_round_trips_and_clears() {
        let stores = stores();
        let hash = Hash::repeat_byte(9);
        stores.set_delete_pointer(&hash).unwrap();
        assert_eq!(stores.delete_pointer().unwrap(), Some(hash));
        stores.clear_delete_pointer().unwrap();
        assert_eq!(stores.delete_pointer().unwrap(), None);
    }

    #[test]
    fn level_bytes_are_keyed_by_number() {
        let stores = stores();
        stores.set_level_bytes(5, b"abc").unwrap();
        assert_eq!(stores.level_bytes(5).unwrap(), Some(b"abc".to_vec()));
        assert_eq!(stores.level_bytes(6).unwrap(), None);
    }
}
