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

use std::fmt;

/// Errors a caller of the tree can recover from or must at least observe.
///
/// Invariant violations (genesis suggested twice, move-to-main of an unknown
/// block, a fork requested by number, an orphan during total difficulty
/// computation) are not represented here: they indicate a bug in the caller
/// or a corrupted store and are raised as panics, the same way the stores
/// this crate is modeled on treat "this should be structurally impossible".
#[derive(Debug)]
pub enum Error {
    /// Propagated from a `KeyValueStore`. Fatal to the operation in progress.
    Db(kvdb::Error),
    /// A header or block's bytes did not decode, or decoded past the end of
    /// the buffer. Fatal on read.
    Corruption(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Db(err) => write!(f, "key-value store error: {}", err),
            Error::Corruption(msg) => write!(f, "corrupted chain data: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<kvdb::Error> for Error {
    fn from(err: kvdb::Error) -> Self {
        Error::Db(err)
    }
}

/// Outcome of `SuggestHeader`/`SuggestBlock`. The expected negatives from
/// §4.4 of the design: these are not errors, they are results a caller is
/// expected to branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddBlockResult {
    /// The header/block was accepted and indexed.
    Added,
    /// Already present in the tree; nothing to do.
    AlreadyKnown,
    /// The parent is not yet known; the caller should fetch it first.
    UnknownParent,
    /// Previously rejected by the processor and recorded in the invalid set.
    InvalidBlock,
    /// The tree is not currently accepting suggestions (startup load or
    /// invalid-block cleanup is in progress).
    CannotAccept,
}
