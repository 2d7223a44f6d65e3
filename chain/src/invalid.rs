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

//! Process-lifetime-only record of blocks the processor has rejected.
//! Never persisted: a restart forgets it, and re-suggestion after a restart
//! is expected to run into `UnknownParent` or simply not happen again
//! because the sync driver will not re-offer a chain it already dropped.

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;

use super::header::Hash;
use super::types::BlockNumber;

#[derive(Default)]
pub struct InvalidBlocks {
    by_height: RwLock<HashMap<BlockNumber, HashSet<Hash>>>,
}

impl InvalidBlocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, number: BlockNumber, hash: Hash) {
        self.by_height.write().entry(number).or_insert_with(HashSet::new).insert(hash);
    }

    pub fn contains(&self, number: BlockNumber, hash: &Hash) -> bool {
        self.by_height.read().get(&number).map(|set| set.contains(hash)).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorded_hash_is_found_at_its_height_only() {
        let invalid = InvalidBlocks::new();
        let hash = Hash::repeat_byte(3);
        invalid.record(5, hash);
        assert!(invalid.contains(5, &hash));
        assert!(!invalid.contains(6, &hash));
        assert!(!invalid.contains(5, &Hash::repeat_byte(4)));
    }
}
