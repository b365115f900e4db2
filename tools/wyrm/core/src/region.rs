//! Color-region packing.
//!
//! One region byte covers a 4x4 tile area as four 2x2 blocks, each with its
//! own 2-bit palette code:
//!
//! ```text
//!  bits 1-0 | bits 3-2      sub 0 | sub 1
//!  ---------+---------      ------+------
//!  bits 5-4 | bits 7-6      sub 2 | sub 3
//! ```
//!
//! Updates are always a masked merge so the sibling blocks survive.

use bit_field::BitField;

use crate::display::{PAGES, REGION_BYTES, REGION_COLUMNS};

/// Which 2-bit sub-field of its region byte a 2x2 block occupies.
#[inline(always)]
pub const fn sub_index(block_col: u8, block_row: u8) -> u8 {
    ((block_row & 1) << 1) | (block_col & 1)
}

/// Replace exactly one 2-bit sub-field of `existing` with `code`.
#[inline(always)]
pub fn merge_region(existing: u8, sub: u8, code: u8) -> u8 {
    let shift = (sub as usize & 3) * 2;
    let mut merged = existing;
    merged.set_bits(shift..shift + 2, code & 0b11);
    merged
}

/// Read back one block's code.
#[inline(always)]
pub fn region_code(byte: u8, sub: u8) -> u8 {
    let shift = (sub as usize & 3) * 2;
    byte.get_bits(shift..shift + 2)
}

/// Index of the region byte holding block `(block_col, block_row)` on a page.
#[inline(always)]
pub const fn byte_index(block_col: u8, block_row: u8) -> usize {
    (block_row as usize / 2) * REGION_COLUMNS + block_col as usize / 2
}

/// Host-owned copy of both region buffers.
///
/// The display device cannot be read back, so every read-modify-write goes
/// through this mirror and the merged byte is then sent as a patch.
#[derive(Debug, Clone)]
pub struct RegionShadow {
    pub pages: [[u8; REGION_BYTES]; PAGES],
}

impl Default for RegionShadow {
    fn default() -> Self {
        Self { pages: [[0; REGION_BYTES]; PAGES] }
    }
}

impl RegionShadow {
    /// Merge `code` into the block and return `(byte index, merged byte)`.
    pub fn merge_block(&mut self, page: u8, block_col: u8, block_row: u8, code: u8) -> (usize, u8) {
        let index = byte_index(block_col, block_row);
        let byte = &mut self.pages[page as usize % PAGES][index];
        *byte = merge_region(*byte, sub_index(block_col, block_row), code);
        (index, *byte)
    }

    pub fn byte(&self, page: u8, index: usize) -> u8 {
        self.pages[page as usize % PAGES][index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn merging_sub_two_touches_only_bits_four_and_five() {
        let before = 0b1100_0011;
        let after = merge_region(before, 2, 0b10);
        assert_eq!(after, 0b1110_0011);
        assert_eq!(after & !0b0011_0000, before & !0b0011_0000);
    }

    #[test]
    fn sub_index_follows_block_parity() {
        assert_eq!(sub_index(0, 0), 0);
        assert_eq!(sub_index(1, 0), 1);
        assert_eq!(sub_index(0, 1), 2);
        assert_eq!(sub_index(3, 5), 3);
    }

    #[test]
    fn shadow_keeps_neighbouring_blocks() {
        let mut shadow = RegionShadow::default();
        shadow.merge_block(0, 0, 0, 0b01);
        let (index, byte) = shadow.merge_block(0, 1, 0, 0b11);
        assert_eq!(index, 0);
        assert_eq!(byte, 0b0000_1101);
        assert_eq!(region_code(byte, 0), 0b01);
        assert_eq!(region_code(byte, 1), 0b11);
    }

    proptest! {
        #[test]
        fn merge_never_clobbers_siblings(existing in any::<u8>(), sub in 0u8..4, code in 0u8..4) {
            let merged = merge_region(existing, sub, code);
            let mask = 0b11u8 << (sub * 2);
            prop_assert_eq!(merged & !mask, existing & !mask);
            prop_assert_eq!(region_code(merged, sub), code);
        }
    }
}
