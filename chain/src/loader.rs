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

//! Replays persisted levels on startup, reconstructing `BestSuggested` (and,
//! for heights whose body is already present, `BestSuggestedFullBlock`)
//! without re-running fork choice -- the levels were already chosen the
//! first time those blocks were suggested. Hands the result to the
//! processor via the `NewBestSuggestedBlock` event, with backpressure so a
//! slow processor doesn't get buried under every height at once.

use crossbeam_channel::Receiver;

use super::block::BlockLike;
use super::error::Error;
use super::header::HeaderLike;
use super::types::{BlockNumber, FAST_SYNC_TAIL};
use crate::tree::BlockTree;

impl<H: HeaderLike, B: BlockLike<Header = H>> BlockTree<H, B> {
    /// Drives the tree through every persisted level from `start_number`
    /// (or `Head`, if unspecified) up to `BestKnownNumber`, or until
    /// `max_to_load` heights have been walked, or `cancel` fires.
    pub fn load_blocks_from_db(
        &self,
        cancel: &Receiver<()>,
        start_number: Option<BlockNumber>,
        batch_size: u64,
        max_to_load: Option<u64>,
    ) -> Result<(), Error> {
        self.set_can_accept_new_blocks(false);
        let result = self.load_blocks_from_db_inner(cancel, start_number, batch_size, max_to_load);
        self.set_can_accept_new_blocks(true);
        result
    }

    fn load_blocks_from_db_inner(
        &self,
        cancel: &Receiver<()>,
        start_number: Option<BlockNumber>,
        batch_size: u64,
        max_to_load: Option<u64>,
    ) -> Result<(), Error> {
        if let Some(pointer) = self.stores.delete_pointer()? {
            cwarn!(LOADER, "resuming invalid-block cleanup interrupted by a previous crash");
            self.clean_invalid_blocks(pointer)?;
        }

        let head_number_at_start = self.head_number().unwrap_or(0);
        let start = match start_number {
            None => head_number_at_start,
            Some(0) => {
                self.set_head_in_memory(None);
                0
            }
            Some(n) => {
                let parent = self.find_header_by_number(n - 1)?;
                self.set_head_in_memory(parent);
                n
            }
        };

        let best_known_number = self.best_known_number();
        let head_number = self.head_number().unwrap_or(0);
        let remaining = best_known_number.saturating_sub(head_number);
        let blocks_to_load = match max_to_load {
            Some(max) => remaining.min(max),
            None => remaining,
        };

        cinfo!(LOADER, "replaying {} persisted heights from #{}", blocks_to_load, start);

        let mut iterations_since_batch: u64 = 0;
        let mut number = start;
        while number <= best_known_number {
            if cancel.try_recv().is_ok() {
                cinfo!(LOADER, "load cancelled at height #{}", number);
                break
            }

            let level = {
                let guard = self.levels.lock_read();
                self.levels.load_level(&guard, number, true, self.head_number())?
            };
            let level = match level {
                Some(level) => level,
                None => {
                    cinfo!(LOADER, "no level persisted at height #{}, stopping load", number);
                    break
                }
            };

            // Manual scan, not `Iterator::max_by`: that returns the *last*
            // of equally-maximal elements, but a tie here must keep the
            // first one by iteration order.
            let mut best_info = &level.block_infos[0];
            for info in &level.block_infos[1..] {
                if info.total_difficulty > best_info.total_difficulty {
                    best_info = info;
                }
            }
            let hash = best_info.hash;
            let total_difficulty = best_info.total_difficulty;

            if let Some(block) = self.raw_block(&hash)? {
                let header = block.header().clone();
                self.set_best_suggested(header.clone(), total_difficulty);
                self.set_best_suggested_full_block(block, total_difficulty);
                self.publish_new_best_suggested(header, total_difficulty);

                iterations_since_batch += 1;
                if iterations_since_batch >= batch_size {
                    // Recomputed from the live head on every check: `Head`
                    // advances on the processor's thread while this loop
                    // runs, so a value captured once at the start of the
                    // load would let `number` run past a `target` the
                    // processor has already reached, arming a rendezvous
                    // `fulfill_batch_if_waiting`'s exact-equality check can
                    // never fulfill.
                    let target = number.saturating_sub(batch_size);
                    if target > self.head_number().unwrap_or(0) {
                        let completion = self.arm_batch(target);
                        crossbeam_channel::select! {
                            recv(completion) -> _ => {}
                            recv(cancel) -> _ => {
                                self.clear_batch();
                                cinfo!(LOADER, "load cancelled waiting on batch completion at height #{}", target);
                                break
                            }
                        }
                    }
                    iterations_since_batch = 0;
                }
            } else if let Some(header) = self.raw_header(&hash)? {
                self.set_best_suggested(header, total_difficulty);
                let remaining_after = best_known_number.saturating_sub(number);
                if remaining_after > FAST_SYNC_TAIL {
                    let jump = blocks_to_load.saturating_sub(FAST_SYNC_TAIL).saturating_sub(1);
                    cdebug!(LOADER, "skipping {} header-only heights past #{}", jump, number);
                    number = number.saturating_add(jump);
                }
            } else {
                cwarn!(LOADER, "neither header nor body persisted at height #{}, truncating", number);
                let mut guard = self.levels.lock_write();
                self.levels.delete_level(&mut guard, number)?;
                break
            }

            number += 1;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use primitives::U256;

    use super::super::block::BasicBlock;
    use super::super::codec::BasicCodec;
    use super::super::collaborators::{FixedSpecProvider, NullTransactionPool};
    use super::super::error::AddBlockResult;
    use super::super::header::{BasicHeader, HeaderLike};
    use super::super::kv::Stores;
    use super::*;
    use kvdb_memorydb::create;

    type TestTree = BlockTree<BasicHeader, BasicBlock<BasicHeader>>;

    fn new_tree() -> TestTree {
        let stores = Stores::new(Arc::new(create()), Arc::new(create()), Arc::new(create()));
        BlockTree::new(stores, Arc::new(BasicCodec), Arc::new(BasicCodec), Arc::new(NullTransactionPool), Arc::new(FixedSpecProvider(1)))
            .unwrap()
    }

    fn block(header: BasicHeader) -> BasicBlock<BasicHeader> {
        BasicBlock::new(header, vec![], vec![])
    }

    #[test]
    fn loading_an_empty_tree_is_a_no_op() {
        let tree = new_tree();
        let cancel = crossbeam_channel::never();
        tree.load_blocks_from_db(&cancel, None, 1000, None).unwrap();
        assert!(tree.best_suggested().is_none());
        assert!(tree.can_accept_new_blocks());
    }

    #[test]
    fn replays_a_suggested_but_not_yet_promoted_block() {
        let tree = new_tree();
        let genesis = BasicHeader::genesis(U256::from(1), vec![]);
        assert_eq!(tree.suggest_block(block(genesis.clone()), true).unwrap(), AddBlockResult::Added);
        tree.update_main_chain(vec![block(genesis.clone())]).unwrap();

        let b1 = BasicHeader::new(genesis.hash(), 1, U256::from(5), vec![]);
        assert_eq!(tree.suggest_block(block(b1.clone()), true).unwrap(), AddBlockResult::Added);

        // A fresh tree over the same stores, as if the process had just
        // restarted: `BestSuggested` is reconstructed from `Head` alone.
        let cancel = crossbeam_channel::never();
        tree.load_blocks_from_db(&cancel, None, 1000, None).unwrap();

        assert_eq!(tree.best_suggested().unwrap().hash(), b1.hash());
        assert!(tree.can_accept_new_blocks());
    }

    #[test]
    fn explicit_start_number_reseeds_head_from_its_parent() {
        let tree = new_tree();
        let genesis = BasicHeader::genesis(U256::from(1), vec![]);
        let b1 = BasicHeader::new(genesis.hash(), 1, U256::from(5), vec![]);
        tree.suggest_block(block(genesis.clone()), true).unwrap();
        tree.update_main_chain(vec![block(genesis.clone())]).unwrap();
        tree.suggest_block(block(b1.clone()), true).unwrap();
        tree.update_main_chain(vec![block(b1.clone())]).unwrap();

        let cancel = crossbeam_channel::never();
        tree.load_blocks_from_db(&cancel, Some(1), 1000, Some(0)).unwrap();
        assert_eq!(tree.head().unwrap().hash(), genesis.hash());
    }
}
