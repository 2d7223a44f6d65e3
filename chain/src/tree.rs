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

//! The block tree core: suggestion, fork-choice, main-chain promotion,
//! invalid-block cleanup, lookups, event emission. Generic over the
//! caller's concrete header/block types; every collaborator (codecs, the
//! transaction pool, the spec provider) is held behind a trait object, the
//! same way `kv.rs` holds `Arc<dyn KeyValueStore>`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::Sender as BatchSender;
use parking_lot::{Mutex, RwLock};
use primitives::U256;

use super::block::{BlockLike, LocatedBlock};
use super::cache::{should_cache, Cache};
use super::codec::{BlockCodec, HeaderCodec};
use super::collaborators::{SpecProvider, TransactionPool};
use super::error::{AddBlockResult, Error};
use super::events::{Event, EventBus};
use super::header::{Hash, HeaderLike, LocatedHeader};
use super::invalid::InvalidBlocks;
use super::kv::Stores;
use super::level::{BlockInfo, LevelManager};
use super::types::{BlockNumber, ChainId, BEST_KNOWN_NUMBER_SEARCH_WINDOW};

pub(crate) struct PendingBatch {
    pub(crate) target: BlockNumber,
    pub(crate) sender: BatchSender<()>,
}

/// The authoritative in-process index of every known header and body.
pub struct BlockTree<H: HeaderLike, B: BlockLike<Header = H>> {
    pub(crate) stores: Arc<Stores>,
    header_codec: Arc<dyn HeaderCodec<H>>,
    block_codec: Arc<dyn BlockCodec<B>>,
    header_cache: Cache<Hash, H>,
    block_cache: Cache<Hash, B>,
    pub(crate) levels: LevelManager,
    genesis: RwLock<Option<H>>,
    head: RwLock<Option<LocatedHeader<H>>>,
    best_suggested: RwLock<Option<LocatedHeader<H>>>,
    best_suggested_full_block: RwLock<Option<LocatedBlock<B>>>,
    can_accept_new_blocks: AtomicBool,
    invalid_blocks: InvalidBlocks,
    events: EventBus<H, B>,
    tx_pool: Arc<dyn TransactionPool>,
    spec_provider: Arc<dyn SpecProvider>,
    pub(crate) pending_batch: Mutex<Option<PendingBatch>>,
}

impl<H: HeaderLike, B: BlockLike<Header = H>> BlockTree<H, B> {
    /// Opens (or creates, if empty) a tree over `stores`. Reconstructs
    /// `Head`, `Genesis` and `BestKnownNumber` from whatever the stores
    /// already hold -- the same recovery a restart performs.
    pub fn new(
        stores: Stores,
        header_codec: Arc<dyn HeaderCodec<H>>,
        block_codec: Arc<dyn BlockCodec<B>>,
        tx_pool: Arc<dyn TransactionPool>,
        spec_provider: Arc<dyn SpecProvider>,
    ) -> Result<Self, Error> {
        let stores = Arc::new(stores);

        let head_header: Option<H> = match stores.head_hash()? {
            None => None,
            Some(hash) => {
                let bytes = stores
                    .header_bytes(&hash)?
                    .ok_or_else(|| Error::Corruption(format!("head hash {:?} has no header", hash)))?;
                Some(header_codec.decode_header(&bytes)?)
            }
        };
        let head_number = head_header.as_ref().map(|h| h.number()).unwrap_or(0);
        let best_known_number = Self::reconstruct_best_known_number(&stores, head_number)?;
        let levels = LevelManager::new(Arc::clone(&stores), best_known_number);

        let tree = BlockTree {
            stores,
            header_codec,
            block_codec,
            header_cache: Cache::new(),
            block_cache: Cache::new(),
            levels,
            genesis: RwLock::new(None),
            head: RwLock::new(None),
            best_suggested: RwLock::new(None),
            best_suggested_full_block: RwLock::new(None),
            can_accept_new_blocks: AtomicBool::new(true),
            invalid_blocks: InvalidBlocks::new(),
            events: EventBus::new(),
            tx_pool,
            spec_provider,
            pending_batch: Mutex::new(None),
        };

        if let Some(genesis_level) = {
            let guard = tree.levels.lock_read();
            tree.levels.load_level(&guard, 0, true, None)?
        } {
            if let Some(info) = genesis_level.block_infos.first() {
                if let Some(genesis_header) = tree.raw_header(&info.hash)? {
                    *tree.genesis.write() = Some(genesis_header);
                }
            }
        }

        if let Some(header) = head_header {
            let hash = header.hash();
            let number = header.number();
            let total_difficulty = match tree.total_difficulty_of(&hash, number)? {
                Some(td) => td,
                None => return Err(Error::Corruption(format!("head {:?} has no chain level entry", hash))),
            };
            let located = LocatedHeader {
                header: header.clone(),
                total_difficulty,
            };
            *tree.head.write() = Some(located.clone());
            *tree.best_suggested.write() = Some(located);
            if let Some(block) = tree.raw_block(&hash)? {
                *tree.best_suggested_full_block.write() = Some(LocatedBlock {
                    block,
                    total_difficulty,
                });
            }
        }

        Ok(tree)
    }

    /// `BestKnownNumber`'s startup recovery: a binary search over the level
    /// store for the largest height with a persisted level, bypassing the
    /// cache entirely (there is none yet at construction time).
    fn reconstruct_best_known_number(stores: &Stores, head_number: BlockNumber) -> Result<BlockNumber, Error> {
        if stores.level_bytes(head_number)?.is_none() {
            return Ok(0)
        }
        let mut lo = head_number;
        let mut hi = head_number.saturating_add(BEST_KNOWN_NUMBER_SEARCH_WINDOW);
        while lo < hi {
            let mid = lo + (hi - lo + 1) / 2;
            if stores.level_bytes(mid)?.is_some() {
                lo = mid;
            } else {
                hi = mid - 1;
            }
        }
        Ok(lo)
    }

    // ---- consumer surface getters -----------------------------------

    pub fn genesis(&self) -> Option<H> {
        self.genesis.read().clone()
    }

    pub fn head(&self) -> Option<LocatedHeader<H>> {
        self.head.read().clone()
    }

    pub fn best_suggested(&self) -> Option<LocatedHeader<H>> {
        self.best_suggested.read().clone()
    }

    pub fn best_suggested_full_block(&self) -> Option<LocatedBlock<B>> {
        self.best_suggested_full_block.read().clone()
    }

    pub fn best_known_number(&self) -> BlockNumber {
        self.levels.best_known_number()
    }

    pub fn chain_id(&self) -> ChainId {
        self.spec_provider.chain_id()
    }

    pub fn can_accept_new_blocks(&self) -> bool {
        self.can_accept_new_blocks.load(Ordering::SeqCst)
    }

    pub(crate) fn set_can_accept_new_blocks(&self, accepting: bool) {
        self.can_accept_new_blocks.store(accepting, Ordering::SeqCst)
    }

    pub fn subscribe<F>(&self, handler: F)
    where
        F: Fn(&Event<H, B>) + Send + Sync + 'static, {
        self.events.subscribe(handler)
    }

    pub(crate) fn head_number(&self) -> Option<BlockNumber> {
        self.head.read().as_ref().map(|h| h.number())
    }

    // ---- raw cache-then-store access ---------------------------------

    pub(crate) fn raw_header(&self, hash: &Hash) -> Result<Option<H>, Error> {
        if let Some(header) = self.header_cache.get(hash) {
            return Ok(Some(header))
        }
        match self.stores.header_bytes(hash)? {
            None => Ok(None),
            Some(bytes) => {
                let header = self.header_codec.decode_header(&bytes)?;
                if should_cache(header.number(), self.head_number()) {
                    self.header_cache.insert(*hash, header.clone());
                }
                Ok(Some(header))
            }
        }
    }

    pub(crate) fn raw_block(&self, hash: &Hash) -> Result<Option<B>, Error> {
        if let Some(block) = self.block_cache.get(hash) {
            return Ok(Some(block))
        }
        match self.stores.block_bytes(hash)? {
            None => Ok(None),
            Some(bytes) => {
                let block = self.block_codec.decode_block(&bytes)?;
                if should_cache(block.header().number(), self.head_number()) {
                    self.block_cache.insert(*hash, block.clone());
                }
                Ok(Some(block))
            }
        }
    }

    fn total_difficulty_of(&self, hash: &Hash, number: BlockNumber) -> Result<Option<U256>, Error> {
        let guard = self.levels.lock_read();
        let level = self.levels.load_level(&guard, number, true, self.head_number())?;
        Ok(level.and_then(|l| l.block_infos.iter().find(|i| &i.hash == hash).map(|i| i.total_difficulty)))
    }

    /// Cache-then-store header lookup with its total difficulty attached.
    /// Synthesizes a missing `BlockInfo` (lazy repair, spec.md §7) the first
    /// time a header/body surfaces without one -- a crash between the
    /// header write and the level write in `suggest`.
    fn located_header(&self, hash: &Hash) -> Result<Option<LocatedHeader<H>>, Error> {
        let header = match self.raw_header(hash)? {
            None => return Ok(None),
            Some(h) => h,
        };
        let number = header.number();
        if let Some(total_difficulty) = self.total_difficulty_of(hash, number)? {
            return Ok(Some(LocatedHeader {
                header,
                total_difficulty,
            }))
        }

        let total_difficulty = if header.is_genesis() {
            header.difficulty()
        } else {
            let parent_hash = header.parent_hash();
            let parent = self
                .located_header(&parent_hash)?
                .unwrap_or_else(|| panic!("block tree: orphan header {:?} encountered computing total difficulty", hash));
            parent.total_difficulty + header.difficulty()
        };
        self.ensure_block_info(number, *hash, total_difficulty)?;
        Ok(Some(LocatedHeader {
            header,
            total_difficulty,
        }))
    }

    /// Idempotent repair: running this twice for the same hash must not
    /// create a duplicate `BlockInfo`, so the presence check happens under
    /// the same write-lock critical section as the insert.
    fn ensure_block_info(&self, number: BlockNumber, hash: Hash, total_difficulty: U256) -> Result<(), Error> {
        let mut guard = self.levels.lock_write();
        let existing = self.levels.load_level_locked(&guard, number, true, self.head_number())?;
        if existing.as_ref().and_then(|l| l.find_index(&hash)).is_some() {
            return Ok(())
        }
        self.levels.update_or_create_level(&mut guard, number, BlockInfo::new(hash, total_difficulty, false), self.head_number())?;
        Ok(())
    }

    pub fn is_known_block(&self, number: BlockNumber, hash: &Hash) -> Result<bool, Error> {
        if number > self.best_known_number() {
            return Ok(false)
        }
        if let Some(head) = self.head.read().as_ref() {
            if head.hash() == *hash {
                return Ok(true)
            }
        }
        if self.header_cache.get(hash).is_some() {
            return Ok(true)
        }
        let guard = self.levels.lock_read();
        let level = self.levels.load_level(&guard, number, true, self.head_number())?;
        Ok(level.map(|l| l.find_index(hash).is_some()).unwrap_or(false))
    }

    pub fn is_main_chain(&self, hash: &Hash) -> Result<bool, Error> {
        let header = match self.raw_header(hash)? {
            None => return Ok(false),
            Some(h) => h,
        };
        let guard = self.levels.lock_read();
        let level = self.levels.load_level(&guard, header.number(), true, self.head_number())?;
        Ok(level.map(|l| l.has_block_on_main_chain && l.block_infos.first().map(|i| i.hash) == Some(*hash)).unwrap_or(false))
    }

    pub fn was_processed(&self, number: BlockNumber, hash: &Hash) -> Result<bool, Error> {
        let guard = self.levels.lock_read();
        let level = self.levels.load_level(&guard, number, true, self.head_number())?;
        Ok(level.and_then(|l| l.block_infos.iter().find(|i| &i.hash == hash).map(|i| i.was_processed)).unwrap_or(false))
    }

    // ---- suggestion -----------------------------------------------------

    pub fn suggest_header(&self, header: H) -> Result<AddBlockResult, Error> {
        self.suggest(header, None, false)
    }

    pub fn suggest_block(&self, block: B, should_process: bool) -> Result<AddBlockResult, Error> {
        let header = block.header().clone();
        self.suggest(header, Some(block), should_process)
    }

    fn suggest(&self, header: H, block: Option<B>, should_process: bool) -> Result<AddBlockResult, Error> {
        if !self.can_accept_new_blocks() {
            return Ok(AddBlockResult::CannotAccept)
        }

        let number = header.number();
        let hash = header.hash();

        if self.invalid_blocks.contains(number, &hash) {
            return Ok(AddBlockResult::InvalidBlock)
        }

        if number == 0 {
            if self.best_suggested.read().is_some() {
                panic!("block tree: genesis suggested twice")
            }
        } else {
            if self.is_known_block(number, &hash)? {
                return Ok(AddBlockResult::AlreadyKnown)
            }
            if !self.is_known_block(number - 1, &header.parent_hash())? {
                return Ok(AddBlockResult::UnknownParent)
            }
        }

        let total_difficulty = if header.is_genesis() {
            header.difficulty()
        } else {
            let parent = self
                .located_header(&header.parent_hash())?
                .unwrap_or_else(|| panic!("block tree: unknown parent passed the is_known_block check"));
            parent.total_difficulty + header.difficulty()
        };

        if let Some(block) = &block {
            self.stores.set_block_bytes(&hash, &self.block_codec.encode_block(block))?;
        }
        self.stores.set_header_bytes(&hash, &self.header_codec.encode_header(&header))?;
        if should_cache(number, self.head_number()) {
            self.header_cache.insert(hash, header.clone());
            if let Some(block) = &block {
                self.block_cache.insert(hash, block.clone());
            }
        }

        {
            let mut guard = self.levels.lock_write();
            self.levels.update_or_create_level(&mut guard, number, BlockInfo::new(hash, total_difficulty, false), self.head_number())?;
        }

        let should_update_best = header.is_genesis()
            || match self.best_suggested.read().as_ref() {
                None => true,
                Some(best) => total_difficulty > best.total_difficulty,
            };

        if should_update_best {
            *self.best_suggested.write() = Some(LocatedHeader {
                header: header.clone(),
                total_difficulty,
            });
            if should_process {
                if let Some(block) = block {
                    *self.best_suggested_full_block.write() = Some(LocatedBlock {
                        block,
                        total_difficulty,
                    });
                }
            }
            cdebug!(TREE, "new best suggested block #{} ({:?}), total difficulty {}", number, hash, total_difficulty);
            self.events.publish(Event::NewBestSuggestedBlock {
                header,
                total_difficulty,
            });
        }

        Ok(AddBlockResult::Added)
    }

    // ---- main-chain promotion -------------------------------------------

    /// Promotes a contiguous run of externally-validated blocks, ascending
    /// or descending, onto the main chain.
    pub fn update_main_chain(&self, processed_blocks: Vec<B>) -> Result<(), Error> {
        if processed_blocks.is_empty() {
            return Ok(())
        }

        let last_number = processed_blocks.iter().map(|b| b.header().number()).max().expect("checked non-empty above");
        let previous_head_number = self.head_number().unwrap_or(0);

        if previous_head_number > last_number {
            let mut guard = self.levels.lock_write();
            for n in (last_number + 1)..=previous_head_number {
                if let Some(mut level) = self.levels.load_level_locked(&guard, n, true, self.head_number())? {
                    level.has_block_on_main_chain = false;
                    self.levels.persist_level(&mut guard, n, &level, self.head_number())?;
                }
            }
        }

        for block in processed_blocks {
            let number = block.header().number();
            let hash = block.header().hash();
            if should_cache(number, self.head_number()) {
                self.header_cache.insert(hash, block.header().clone());
                self.block_cache.insert(hash, block.clone());
            }
            self.move_to_main(block)?;
        }
        Ok(())
    }

    fn move_to_main(&self, block: B) -> Result<(), Error> {
        let header = block.header().clone();
        let number = header.number();
        let hash = header.hash();

        let total_difficulty;
        {
            let mut guard = self.levels.lock_write();
            let mut level = self
                .levels
                .load_level_locked(&guard, number, true, self.head_number())?
                .unwrap_or_else(|| panic!("block tree: move_to_main of untracked block {:?}", hash));
            let idx = level
                .find_index(&hash)
                .unwrap_or_else(|| panic!("block tree: move_to_main of untracked block {:?}", hash));
            level.block_infos[idx].was_processed = true;
            if idx != 0 {
                level.block_infos.swap(0, idx);
            }
            level.has_block_on_main_chain = true;
            total_difficulty = level.block_infos[0].total_difficulty;
            self.levels.persist_level(&mut guard, number, &level, self.head_number())?;
        }

        cinfo!(TREE, "block #{} ({:?}) added to main chain", number, hash);
        self.events.publish(Event::BlockAddedToMain {
            block: block.clone(),
            total_difficulty,
        });

        let should_update_head = header.is_genesis()
            || match self.head.read().as_ref() {
                None => true,
                Some(head) => total_difficulty > head.total_difficulty,
            };
        if should_update_head {
            self.update_head_block(LocatedHeader {
                header: header.clone(),
                total_difficulty,
            })?;
        }

        for tx_hash in block.transaction_hashes() {
            self.tx_pool.remove_transaction(&tx_hash);
        }
        Ok(())
    }

    fn update_head_block(&self, located: LocatedHeader<H>) -> Result<(), Error> {
        if located.is_genesis() {
            *self.genesis.write() = Some(located.header.clone());
        }
        let hash = located.hash();
        let number = located.number();
        *self.head.write() = Some(located.clone());
        self.stores.set_head_hash(&hash)?;
        cinfo!(TREE, "head advanced to #{} ({:?})", number, hash);
        self.events.publish(Event::NewHeadBlock {
            header: located.header,
            total_difficulty: located.total_difficulty,
        });
        self.fulfill_batch_if_waiting(number);
        Ok(())
    }

    pub(crate) fn fulfill_batch_if_waiting(&self, number: BlockNumber) {
        let mut pending = self.pending_batch.lock();
        let matches = pending.as_ref().map(|batch| batch.target == number).unwrap_or(false);
        if matches {
            let batch = pending.take().expect("just checked Some above");
            let _ = batch.sender.send(());
        }
    }

    /// Arms the single-producer, single-consumer batch-completion
    /// rendezvous `LoadBlocksFromDb` suspends on. Double-arming cannot
    /// happen because the loader is the only producer and is
    /// single-threaded.
    pub(crate) fn arm_batch(&self, target: BlockNumber) -> crossbeam_channel::Receiver<()> {
        let (sender, receiver) = crossbeam_channel::bounded(0);
        *self.pending_batch.lock() = Some(PendingBatch {
            target,
            sender,
        });
        receiver
    }

    pub(crate) fn clear_batch(&self) {
        *self.pending_batch.lock() = None;
    }

    pub(crate) fn set_best_suggested(&self, header: H, total_difficulty: U256) {
        *self.best_suggested.write() = Some(LocatedHeader {
            header,
            total_difficulty,
        });
    }

    pub(crate) fn set_best_suggested_full_block(&self, block: B, total_difficulty: U256) {
        *self.best_suggested_full_block.write() = Some(LocatedBlock {
            block,
            total_difficulty,
        });
    }

    pub(crate) fn publish_new_best_suggested(&self, header: H, total_difficulty: U256) {
        self.events.publish(Event::NewBestSuggestedBlock {
            header,
            total_difficulty,
        });
    }

    /// Reassigns `Head` in memory only, without the meta write or `NewHead`
    /// event `update_head_block` performs. Used by the DB loader to seed
    /// `Head` from an explicit `startNumber` before any block is promoted.
    pub(crate) fn set_head_in_memory(&self, located: Option<LocatedHeader<H>>) {
        *self.head.write() = located;
    }

    // ---- invalidation -----------------------------------------------------

    pub fn delete_invalid_block(&self, invalid_header: &H) -> Result<(), Error> {
        let number = invalid_header.number();
        let hash = invalid_header.hash();
        self.invalid_blocks.record(number, hash);

        let head = self.head.read().clone();
        *self.best_suggested.write() = head.clone();
        *self.best_suggested_full_block.write() = match &head {
            Some(head) => self.raw_block(&head.hash())?.map(|block| LocatedBlock {
                block,
                total_difficulty: head.total_difficulty,
            }),
            None => None,
        };

        cwarn!(TREE, "invalidating block #{} ({:?}) and its descendants", number, hash);
        self.can_accept_new_blocks.store(false, Ordering::SeqCst);
        let result = self.clean_invalid_blocks(hash);
        self.can_accept_new_blocks.store(true, Ordering::SeqCst);
        result
    }

    /// Walks downward-to-upward from `start_hash` toward higher numbers,
    /// following parent pointers, removing every descendant from all four
    /// stores. Records `DELETE_POINTER_KEY` before each removal so a crash
    /// mid-cleanup resumes exactly where it left off.
    pub(crate) fn clean_invalid_blocks(&self, start_hash: Hash) -> Result<(), Error> {
        let mut current_hash = start_hash;
        loop {
            let current_header = match self.raw_header(&current_hash)? {
                Some(h) => h,
                None => break,
            };
            let current_number = current_header.number();
            let next_number = current_number + 1;

            let (removing_level, current_level, next_level) = {
                let guard = self.levels.lock_read();
                let current_level = self.levels.load_level(&guard, current_number, true, self.head_number())?;
                let next_level = self.levels.load_level(&guard, next_number, true, self.head_number())?;
                let removing_level = current_level.as_ref().map(|l| l.block_infos.len() <= 1).unwrap_or(false);
                (removing_level, current_level, next_level)
            };

            let next_hash = match &next_level {
                Some(level) if level.block_infos.len() == 1 => Some(level.block_infos[0].hash),
                Some(level) => {
                    let mut found = None;
                    for info in &level.block_infos {
                        if let Some(descendant) = self.raw_header(&info.hash)? {
                            if descendant.parent_hash() == current_hash {
                                found = Some(info.hash);
                                break
                            }
                        }
                    }
                    found
                }
                None => None,
            };

            match next_hash {
                Some(hash) => self.stores.set_delete_pointer(&hash)?,
                None => self.stores.clear_delete_pointer()?,
            }

            {
                let mut guard = self.levels.lock_write();
                if removing_level {
                    self.levels.delete_level(&mut guard, current_number)?;
                } else if let Some(mut level) = current_level {
                    if let Some(idx) = level.find_index(&current_hash) {
                        level.block_infos.remove(idx);
                    }
                    self.levels.persist_level(&mut guard, current_number, &level, self.head_number())?;
                }
            }

            self.header_cache.remove(&current_hash);
            self.block_cache.remove(&current_hash);
            self.stores.delete_header(&current_hash)?;
            self.stores.delete_block(&current_hash)?;

            match next_hash {
                Some(hash) => current_hash = hash,
                None => break,
            }
        }
        cinfo!(TREE, "invalid-block cleanup finished at {:?}", start_hash);
        Ok(())
    }

    // ---- lookups -----------------------------------------------------

    pub fn find_header(&self, hash: &Hash, main_chain_only: bool) -> Result<Option<LocatedHeader<H>>, Error> {
        let located = match self.located_header(hash)? {
            None => return Ok(None),
            Some(l) => l,
        };
        if main_chain_only && !self.is_main_chain(hash)? {
            return Ok(None)
        }
        Ok(Some(located))
    }

    pub fn find_block(&self, hash: &Hash, main_chain_only: bool) -> Result<Option<LocatedBlock<B>>, Error> {
        let block = match self.raw_block(hash)? {
            None => return Ok(None),
            Some(b) => b,
        };
        let located_header = match self.located_header(hash)? {
            None => return Ok(None),
            Some(h) => h,
        };
        if main_chain_only && !self.is_main_chain(hash)? {
            return Ok(None)
        }
        Ok(Some(LocatedBlock {
            block,
            total_difficulty: located_header.total_difficulty,
        }))
    }

    fn hash_on_main_or_only_hash(&self, number: BlockNumber) -> Result<Option<Hash>, Error> {
        let guard = self.levels.lock_read();
        let level = match self.levels.load_level(&guard, number, true, self.head_number())? {
            None => return Ok(None),
            Some(l) => l,
        };
        if level.has_block_on_main_chain {
            Ok(level.block_infos.first().map(|i| i.hash))
        } else if level.block_infos.len() == 1 {
            Ok(Some(level.block_infos[0].hash))
        } else {
            panic!("block tree: height {} has {} competing forks and no main-chain block; cannot resolve by number", number, level.block_infos.len())
        }
    }

    pub fn find_header_by_number(&self, number: BlockNumber) -> Result<Option<LocatedHeader<H>>, Error> {
        match self.hash_on_main_or_only_hash(number)? {
            None => Ok(None),
            Some(hash) => self.find_header(&hash, false),
        }
    }

    pub fn find_block_by_number(&self, number: BlockNumber) -> Result<Option<LocatedBlock<B>>, Error> {
        match self.hash_on_main_or_only_hash(number)? {
            None => Ok(None),
            Some(hash) => self.find_block(&hash, false),
        }
    }

    /// Walks by height with stride `skip + 1`, starting at `start_hash`'s
    /// height. The returned vector always has length `count`; entries past
    /// the end of the known chain (or below height 0) are `None`.
    pub fn find_headers(&self, start_hash: &Hash, count: usize, skip: u64, reverse: bool) -> Result<Vec<Option<LocatedHeader<H>>>, Error> {
        let start_number = match self.raw_header(start_hash)? {
            None => return Ok(vec![None; count]),
            Some(h) => h.number(),
        };
        let stride = (skip as i128) + 1;
        let mut out = Vec::with_capacity(count);
        for i in 0..count {
            let offset = stride * i as i128;
            let number = if reverse {
                start_number as i128 - offset
            } else {
                start_number as i128 + offset
            };
            if number < 0 {
                out.push(None);
                continue
            }
            out.push(self.find_header_by_number(number as BlockNumber)?);
        }
        Ok(out)
    }

    pub fn find_blocks(&self, start_hash: &Hash, count: usize, skip: u64, reverse: bool) -> Result<Vec<Option<LocatedBlock<B>>>, Error> {
        let start_number = match self.raw_header(start_hash)? {
            None => return Ok(vec![None; count]),
            Some(h) => h.number(),
        };
        let stride = (skip as i128) + 1;
        let mut out = Vec::with_capacity(count);
        for i in 0..count {
            let offset = stride * i as i128;
            let number = if reverse {
                start_number as i128 - offset
            } else {
                start_number as i128 + offset
            };
            if number < 0 {
                out.push(None);
                continue
            }
            out.push(self.find_block_by_number(number as BlockNumber)?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BasicBlock;
    use crate::codec::BasicCodec;
    use crate::collaborators::{FixedSpecProvider, NullTransactionPool};
    use crate::header::BasicHeader;
    use kvdb_memorydb::create;

    type TestTree = BlockTree<BasicHeader, BasicBlock<BasicHeader>>;

    fn new_tree() -> TestTree {
        let stores = Stores::new(Arc::new(create()), Arc::new(create()), Arc::new(create()));
        BlockTree::new(stores, Arc::new(BasicCodec), Arc::new(BasicCodec), Arc::new(NullTransactionPool), Arc::new(FixedSpecProvider(1)))
            .unwrap()
    }

    fn child(parent: &BasicHeader, difficulty: u64, salt: u8) -> BasicHeader {
        BasicHeader::new(parent.hash(), parent.number() + 1, U256::from(difficulty), vec![salt])
    }

    fn block(header: BasicHeader) -> BasicBlock<BasicHeader> {
        BasicBlock::new(header, vec![], vec![])
    }

    // S1: genesis suggestion and promotion.
    #[test]
    fn s1_genesis_suggest_then_promote() {
        let tree = new_tree();
        let genesis = BasicHeader::genesis(U256::from(1), vec![]);
        let genesis_block = block(genesis.clone());

        assert_eq!(tree.suggest_block(genesis_block.clone(), true).unwrap(), AddBlockResult::Added);
        assert!(tree.head().is_none());
        assert_eq!(tree.best_suggested().unwrap().hash(), genesis.hash());

        let received = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let received_clone = Arc::clone(&received);
        tree.subscribe(move |event| {
            if let Event::NewHeadBlock {
                ..
            } = event
            {
                received_clone.fetch_add(1, Ordering::SeqCst);
            }
        });

        tree.update_main_chain(vec![genesis_block]).unwrap();
        assert_eq!(tree.head().unwrap().hash(), genesis.hash());
        assert_eq!(tree.genesis().unwrap().hash(), genesis.hash());
        assert_eq!(received.load(Ordering::SeqCst), 1);
    }

    // S2: a linear chain of four blocks, suggested and promoted in order.
    fn linear_chain(tree: &TestTree) -> Vec<BasicHeader> {
        let genesis = BasicHeader::genesis(U256::from(1), vec![]);
        let b1 = child(&genesis, 10, 1);
        let b2 = child(&b1, 10, 1);
        let b3 = child(&b2, 10, 1);
        let headers = vec![genesis, b1, b2, b3];
        for h in &headers {
            assert_eq!(tree.suggest_block(block(h.clone()), true).unwrap(), AddBlockResult::Added);
        }
        tree.update_main_chain(headers.iter().cloned().map(block).collect()).unwrap();
        headers
    }

    #[test]
    fn s2_linear_chain_promotes_and_is_queryable_by_number() {
        let tree = new_tree();
        let chain = linear_chain(&tree);

        assert_eq!(tree.best_known_number(), 3);
        assert_eq!(tree.find_block_by_number(2).unwrap().unwrap().hash(), chain[2].hash());
        assert!(tree.is_main_chain(&chain[2].hash()).unwrap());
        assert_eq!(tree.head().unwrap().hash(), chain[3].hash());
    }

    // S3: a heavier fork rooted at B1 overtakes B2/B3 on the main chain.
    #[test]
    fn s3_heavier_fork_reorgs_the_main_chain() {
        let tree = new_tree();
        let chain = linear_chain(&tree);
        let b1 = &chain[1];

        let b2_prime = child(b1, 100, 2);
        let b3_prime = child(&b2_prime, 100, 2);
        assert_eq!(tree.suggest_block(block(b2_prime.clone()), true).unwrap(), AddBlockResult::Added);
        assert_eq!(tree.suggest_block(block(b3_prime.clone()), true).unwrap(), AddBlockResult::Added);

        tree.update_main_chain(vec![block(b2_prime.clone()), block(b3_prime.clone())]).unwrap();

        assert_eq!(tree.head().unwrap().hash(), b3_prime.hash());
        assert_eq!(tree.find_block_by_number(2).unwrap().unwrap().hash(), b2_prime.hash());
        assert_eq!(tree.find_block_by_number(3).unwrap().unwrap().hash(), b3_prime.hash());
        assert!(!tree.is_main_chain(&chain[2].hash()).unwrap());
        assert!(!tree.is_main_chain(&chain[3].hash()).unwrap());
        assert!(tree.is_known_block(2, &chain[2].hash()).unwrap());
    }

    // S4: suggesting a header whose parent is unknown is rejected, not panicked.
    #[test]
    fn s4_unknown_parent_is_rejected() {
        let tree = new_tree();
        let orphan = BasicHeader::new(Hash::repeat_byte(0xaa), 5, U256::from(1), vec![]);
        assert_eq!(tree.suggest_header(orphan).unwrap(), AddBlockResult::UnknownParent);
    }

    // S5: invalidating a forked block removes it and its descendants, and the
    // previous branch remains recoverable by resuggestion (AlreadyKnown).
    #[test]
    fn s5_invalidate_descendant_chain() {
        let tree = new_tree();
        let chain = linear_chain(&tree);
        let b1 = &chain[1];

        let b2_prime = child(b1, 100, 2);
        let b3_prime = child(&b2_prime, 100, 2);
        tree.suggest_block(block(b2_prime.clone()), true).unwrap();
        tree.suggest_block(block(b3_prime.clone()), true).unwrap();
        tree.update_main_chain(vec![block(b2_prime.clone()), block(b3_prime.clone())]).unwrap();

        tree.delete_invalid_block(&b2_prime).unwrap();

        assert!(tree.find_block(&b2_prime.hash(), false).unwrap().is_none());
        assert!(tree.find_block(&b3_prime.hash(), false).unwrap().is_none());
        assert!(!tree.is_known_block(2, &b2_prime.hash()).unwrap());

        // The original branch's BlockInfo is untouched, so resuggesting it
        // is recognized rather than re-added.
        assert_eq!(tree.suggest_block(block(chain[2].clone()), true).unwrap(), AddBlockResult::AlreadyKnown);

        // BestSuggested was reset to the (now-stale) Head; re-promoting the
        // recovered branch is left to the caller, same as after any reorg.
        assert_eq!(tree.best_suggested().unwrap().hash(), b3_prime.hash());
    }

    // S6: a crash mid-cleanup (simulated by writing DELETE_POINTER_KEY
    // directly) is resumed and completed by the next DB load.
    #[test]
    fn s6_crash_resume_completes_interrupted_cleanup() {
        let tree = new_tree();
        let genesis = BasicHeader::genesis(U256::from(1), vec![]);
        let b1 = child(&genesis, 10, 1);
        let b1_prime = child(&genesis, 5, 2);

        tree.suggest_block(block(genesis.clone()), true).unwrap();
        tree.update_main_chain(vec![block(genesis)]).unwrap();
        tree.suggest_block(block(b1.clone()), true).unwrap();
        tree.update_main_chain(vec![block(b1.clone())]).unwrap();
        // A sibling at height 1 that was never promoted, standing in for a
        // block a previous process had started tearing down.
        tree.suggest_block(block(b1_prime.clone()), true).unwrap();

        tree.stores.set_delete_pointer(&b1_prime.hash()).unwrap();

        let cancel = crossbeam_channel::never();
        tree.load_blocks_from_db(&cancel, None, 1000, Some(0)).unwrap();

        assert!(tree.stores.delete_pointer().unwrap().is_none());
        assert!(!tree.is_known_block(1, &b1_prime.hash()).unwrap());
        assert!(tree.raw_header(&b1_prime.hash()).unwrap().is_none());
        // The promoted branch is untouched.
        assert!(tree.is_known_block(1, &b1.hash()).unwrap());
        assert_eq!(tree.head().unwrap().hash(), b1.hash());
    }

    #[test]
    fn suggest_is_idempotent() {
        let tree = new_tree();
        let genesis = BasicHeader::genesis(U256::from(1), vec![]);
        assert_eq!(tree.suggest_block(block(genesis.clone()), true).unwrap(), AddBlockResult::Added);
        assert_eq!(tree.suggest_block(block(genesis), true).unwrap(), AddBlockResult::AlreadyKnown);
    }

    #[test]
    fn total_difficulty_accumulates_from_the_parent() {
        let tree = new_tree();
        let chain = linear_chain(&tree);
        assert_eq!(tree.find_header(&chain[0].hash(), false).unwrap().unwrap().total_difficulty, chain[0].difficulty());
        for window in chain.windows(2) {
            let parent_td = tree.find_header(&window[0].hash(), false).unwrap().unwrap().total_difficulty;
            let child_td = tree.find_header(&window[1].hash(), false).unwrap().unwrap().total_difficulty;
            assert_eq!(child_td, parent_td + window[1].difficulty());
        }
    }
}
