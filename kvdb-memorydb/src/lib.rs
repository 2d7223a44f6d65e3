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

//! An in-memory `KeyValueStore`, useful for tests and for nodes that never
//! persist across restarts.

extern crate kvdb;
extern crate parking_lot;

use std::collections::HashMap;

use kvdb::{DBValue, KeyValueStore, Result};
use parking_lot::RwLock;

#[derive(Default)]
pub struct InMemory {
    data: RwLock<HashMap<Vec<u8>, DBValue>>,
}

impl InMemory {
    pub fn new() -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
        }
    }
}

impl KeyValueStore for InMemory {
    fn get(&self, key: &[u8]) -> Result<Option<DBValue>> {
        Ok(self.data.read().get(key).cloned())
    }

    fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.data.write().insert(key.to_vec(), DBValue::from_slice(value));
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.data.write().remove(key);
        Ok(())
    }
}

/// Convenience constructor matching the `create(num_cols)`-style factory
/// functions of the real `kvdb-memorydb` crate this one stands in for.
pub fn create() -> InMemory {
    InMemory::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_a_value() {
        let db = InMemory::new();
        db.set(b"k", b"v").unwrap();
        assert_eq!(db.get(b"k").unwrap().unwrap().as_ref(), b"v");
    }

    #[test]
    fn delete_removes_the_key() {
        let db = InMemory::new();
        db.set(b"k", b"v").unwrap();
        db.delete(b"k").unwrap();
        assert_eq!(db.get(b"k").unwrap(), None);
    }

    #[test]
    fn missing_key_is_not_an_error() {
        let db = InMemory::new();
        assert_eq!(db.get(b"nope").unwrap(), None);
    }
}
