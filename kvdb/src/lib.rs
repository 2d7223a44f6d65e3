// Copyright 2015-2017 Parity Technologies (UK) Ltd.
// This file is part of Parity.

// Parity is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// Parity is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.

// You should have received a copy of the GNU General Public License
// along with Parity.  If not, see <http://www.gnu.org/licenses/>.

//! Key-value store abstraction backing the block tree's three logical
//! namespaces: `headers`, `blocks` and `meta`. Any engine implementing
//! `KeyValueStore` is acceptable; the tree never depends on a concrete
//! backend, only on this contract.

#[macro_use]
extern crate error_chain;
extern crate elastic_array;

use elastic_array::ElasticArray128;

/// Database value. Stored inline up to 128 bytes before spilling to the heap.
pub type DBValue = ElasticArray128<u8>;

#[allow(deprecated)]
mod errors {
    use std::io;

    error_chain! {
        types {
            Error, ErrorKind, ResultExt, Result;
        }

        foreign_links {
            Io(io::Error);
        }
    }
}

pub use self::errors::{Error, ErrorKind, Result, ResultExt};

/// A single logical namespace of byte-keyed, byte-valued storage.
///
/// No transactions and no ordered iteration are required of an
/// implementation; the block tree never relies on either. I/O errors are
/// fatal to the calling operation and are propagated rather than retried.
pub trait KeyValueStore: Sync + Send {
    /// Get a value by key.
    fn get(&self, key: &[u8]) -> Result<Option<DBValue>>;

    /// Set a key to a value, overwriting any existing value.
    fn set(&self, key: &[u8], value: &[u8]) -> Result<()>;

    /// Delete a key. Deleting an absent key is not an error.
    fn delete(&self, key: &[u8]) -> Result<()>;
}
