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

//! Per-height index of known blocks (`ChainLevelInfo`) and the manager that
//! loads, mutates and persists it. A level's binary layout is owned by this
//! crate, not the caller: `ChainLevelInfo` has to round-trip between restarts
//! of the same process, so its format lives here next to the code that reads
//! and writes it rather than behind the caller-supplied header/block codecs.

use std::sync::Arc;

use byteorder::{BigEndian, ByteOrder, WriteBytesExt};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use primitives::U256;

use super::cache::{should_cache, Cache};
use super::error::Error;
use super::header::Hash;
use super::kv::Stores;
use super::types::BlockNumber;

/// Brief record of one known block at a given height.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockInfo {
    pub hash: Hash,
    pub total_difficulty: U256,
    pub was_processed: bool,
}

impl BlockInfo {
    pub fn new(hash: Hash, total_difficulty: U256, was_processed: bool) -> Self {
        BlockInfo {
            hash,
            total_difficulty,
            was_processed,
        }
    }
}

/// The per-height index: every block known at that height, and whether one
/// of them currently sits on the main chain.
///
/// Invariant upheld by every mutator in this module: whenever
/// `has_block_on_main_chain` is true, `block_infos[0]` is the main-chain
/// entry and everything after it is a fork sibling.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChainLevelInfo {
    pub has_block_on_main_chain: bool,
    pub block_infos: Vec<BlockInfo>,
}

impl ChainLevelInfo {
    /// Linear scan for `hash`. Levels are expected to stay small (a handful
    /// of competing forks at most), so this is cheaper than any index would
    /// be to maintain.
    pub fn find_index(&self, hash: &Hash) -> Option<usize> {
        self.block_infos.iter().position(|info| &info.hash == hash)
    }

    fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + 4 + self.block_infos.len() * 65);
        out.push(if self.has_block_on_main_chain {
            1
        } else {
            0
        });
        out.write_u32::<BigEndian>(self.block_infos.len() as u32).expect("writing to a Vec never fails");
        for info in &self.block_infos {
            out.extend_from_slice(info.hash.as_bytes());
            let mut td = [0u8; 32];
            info.total_difficulty.to_big_endian(&mut td);
            out.extend_from_slice(&td);
            out.push(if info.was_processed {
                1
            } else {
                0
            });
        }
        out
    }

    fn decode(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.is_empty() {
            return Err(Error::Corruption("chain level info shorter than its flag byte".into()))
        }
        let has_block_on_main_chain = bytes[0] != 0;
        if bytes.len() < 5 {
            return Err(Error::Corruption("chain level info shorter than its count field".into()))
        }
        let count = BigEndian::read_u32(&bytes[1..5]) as usize;
        let mut offset = 5;
        let mut block_infos = Vec::with_capacity(count);
        for _ in 0..count {
            if bytes.len() < offset + 65 {
                return Err(Error::Corruption("chain level info truncated before the end of its block_infos".into()))
            }
            let hash = Hash::from_slice(&bytes[offset..offset + 32]);
            let total_difficulty = U256::from_big_endian(&bytes[offset + 32..offset + 64]);
            let was_processed = bytes[offset + 64] != 0;
            block_infos.push(BlockInfo::new(hash, total_difficulty, was_processed));
            offset += 65;
        }
        Ok(ChainLevelInfo {
            has_block_on_main_chain,
            block_infos,
        })
    }
}

/// State guarded by the single reader-writer lock spec.md calls
/// `blockInfoLock`: the level store and `BestKnownNumber` travel together so
/// a reader can never observe one updated without the other.
pub struct LevelManagerState {
    best_known_number: BlockNumber,
}

impl LevelManagerState {
    pub fn best_known_number(&self) -> BlockNumber {
        self.best_known_number
    }
}

pub type LevelReadGuard<'a> = RwLockReadGuard<'a, LevelManagerState>;
pub type LevelWriteGuard<'a> = RwLockWriteGuard<'a, LevelManagerState>;

/// Loads, mutates and persists `ChainLevelInfo`s. Every method that mutates a
/// level takes the write guard as a parameter: the type system, not a
/// comment, is what enforces "caller must hold the level write lock".
pub struct LevelManager {
    stores: Arc<Stores>,
    cache: Cache<BlockNumber, ChainLevelInfo>,
    state: RwLock<LevelManagerState>,
}

impl LevelManager {
    pub fn new(stores: Arc<Stores>, best_known_number: BlockNumber) -> Self {
        LevelManager {
            stores,
            cache: Cache::new(),
            state: RwLock::new(LevelManagerState {
                best_known_number,
            }),
        }
    }

    pub fn lock_read(&self) -> LevelReadGuard<'_> {
        self.state.read()
    }

    pub fn lock_write(&self) -> LevelWriteGuard<'_> {
        self.state.write()
    }

    pub fn best_known_number(&self) -> BlockNumber {
        self.state.read().best_known_number
    }

    /// `loadLevel(n, forceLoad)`. With `force_load = false`, a height past
    /// the frontier short-circuits to `None` without touching the store.
    pub fn load_level(
        &self,
        guard: &LevelReadGuard<'_>,
        number: BlockNumber,
        force_load: bool,
        head: Option<BlockNumber>,
    ) -> Result<Option<ChainLevelInfo>, Error> {
        if !force_load && number > guard.best_known_number {
            return Ok(None)
        }
        self.load_level_uncached_check(number, head)
    }

    /// Same lookup, for call sites that already hold the write guard (so a
    /// second `lock_read` would deadlock `parking_lot`'s non-reentrant lock).
    pub fn load_level_locked(
        &self,
        guard: &LevelWriteGuard<'_>,
        number: BlockNumber,
        force_load: bool,
        head: Option<BlockNumber>,
    ) -> Result<Option<ChainLevelInfo>, Error> {
        if !force_load && number > guard.best_known_number {
            return Ok(None)
        }
        self.load_level_uncached_check(number, head)
    }

    fn load_level_uncached_check(
        &self,
        number: BlockNumber,
        head: Option<BlockNumber>,
    ) -> Result<Option<ChainLevelInfo>, Error> {
        if let Some(level) = self.cache.get(&number) {
            return Ok(Some(level))
        }
        match self.stores.level_bytes(number)? {
            None => Ok(None),
            Some(bytes) => {
                let level = ChainLevelInfo::decode(&bytes)?;
                if should_cache(number, head) {
                    self.cache.insert(number, level.clone());
                }
                Ok(Some(level))
            }
        }
    }

    /// `persistLevel`. Write-through: cache first (so a concurrent reader
    /// never observes the store updated before the cache), then the meta
    /// store.
    pub fn persist_level(
        &self,
        _guard: &mut LevelWriteGuard<'_>,
        number: BlockNumber,
        level: &ChainLevelInfo,
        head: Option<BlockNumber>,
    ) -> Result<(), Error> {
        if should_cache(number, head) {
            self.cache.insert(number, level.clone());
        } else {
            self.cache.remove(&number);
        }
        self.stores.set_level_bytes(number, &level.encode())
    }

    /// `updateOrCreateLevel`. The caller guarantees no duplicate hash is
    /// appended (via `IsKnownBlock`); this does not re-check.
    pub fn update_or_create_level(
        &self,
        guard: &mut LevelWriteGuard<'_>,
        number: BlockNumber,
        info: BlockInfo,
        head: Option<BlockNumber>,
    ) -> Result<ChainLevelInfo, Error> {
        let mut level = self.load_level_locked(guard, number, true, head)?.unwrap_or_default();
        level.block_infos.push(info);
        if number > guard.best_known_number {
            guard.best_known_number = number;
        }
        self.persist_level(guard, number, &level, head)?;
        Ok(level)
    }

    /// Drops a level from both cache and store, clamping `BestKnownNumber`
    /// down to at most `number - 1` if the deleted level was the frontier.
    pub fn delete_level(&self, guard: &mut LevelWriteGuard<'_>, number: BlockNumber) -> Result<(), Error> {
        self.cache.remove(&number);
        self.stores.delete_level(number)?;
        if number > 0 {
            guard.best_known_number = guard.best_known_number.min(number - 1);
        } else {
            guard.best_known_number = 0;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kvdb_memorydb::create;

    fn manager() -> LevelManager {
        let stores = Arc::new(Stores::new(Arc::new(create()), Arc::new(create()), Arc::new(create())));
        LevelManager::new(stores, 0)
    }

    fn info(byte: u8, td: u64) -> BlockInfo {
        BlockInfo::new(Hash::repeat_byte(byte), U256::from(td), false)
    }

    #[test]
    fn level_round_trips_through_bytes() {
        let level = ChainLevelInfo {
            has_block_on_main_chain: true,
            block_infos: vec![info(1, 10), info(2, 5)],
        };
        let bytes = level.encode();
        let decoded = ChainLevelInfo::decode(&bytes).unwrap();
        assert_eq!(level, decoded);
    }

    #[test]
    fn update_or_create_appends_and_bumps_best_known_number() {
        let manager = manager();
        let mut guard = manager.lock_write();
        manager.update_or_create_level(&mut guard, 5, info(1, 100), None).unwrap();
        assert_eq!(guard.best_known_number(), 5);
        let level = manager.update_or_create_level(&mut guard, 5, info(2, 90), None).unwrap();
        assert_eq!(level.block_infos.len(), 2);
        assert!(!level.has_block_on_main_chain);
    }

    #[test]
    fn find_index_locates_known_hash() {
        let level = ChainLevelInfo {
            has_block_on_main_chain: false,
            block_infos: vec![info(1, 1), info(2, 1)],
        };
        assert_eq!(level.find_index(&Hash::repeat_byte(2)), Some(1));
        assert_eq!(level.find_index(&Hash::repeat_byte(9)), None);
    }

    #[test]
    fn delete_level_clamps_best_known_number() {
        let manager = manager();
        let mut guard = manager.lock_write();
        manager.update_or_create_level(&mut guard, 5, info(1, 100), None).unwrap();
        manager.delete_level(&mut guard, 5).unwrap();
        assert_eq!(guard.best_known_number(), 4);
        assert_eq!(manager.load_level_locked(&guard, 5, true, None).unwrap(), None);
    }
}
