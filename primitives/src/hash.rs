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

pub use ethereum_types::{H128, H160, H256, H264, H512, H520};

/// Reserved all-zero hash. Used as the `meta` store's head-pointer key.
pub fn zero_hash() -> H256 {
    H256::zero()
}

/// Reserved all-one hash. Used as the `meta` store's crash-recovery pointer key.
pub fn max_hash() -> H256 {
    H256::repeat_byte(0xff)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_hash_is_all_zero_bytes() {
        assert_eq!(zero_hash().as_bytes(), &[0u8; 32][..]);
    }

    #[test]
    fn max_hash_is_all_one_bytes() {
        assert_eq!(max_hash().as_bytes(), &[0xffu8; 32][..]);
    }
}
