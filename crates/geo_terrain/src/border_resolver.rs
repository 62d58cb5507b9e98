// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//! Computes the 4-bit neighbour-LOD bitmap a block needs to pick the
//! correct border strip. Boundary blocks clamp to themselves, which reads
//! as "the neighbour is the same LOD" to the bit test below.

use bitflags::bitflags;

bitflags! {
    /// Which of a block's four neighbours currently render at a coarser
    /// (lower) LOD. The bit order matches the `C = (L<<3)|(R<<2)|(T<<1)|B`
    /// convention used to index `IndexCatalog::border_range`.
    pub struct BorderBitmap: u8 {
        const LEFT = 0b1000;
        const RIGHT = 0b0100;
        const TOP = 0b0010;
        const BOTTOM = 0b0001;
    }
}

/// `current_lod_at(x, z)` must clamp `x`/`z` to the grid itself if asked for
/// a neighbour outside `[0, n_blocks_x) x [0, n_blocks_z)`.
pub fn compute_bitmap(
    current_lod: u32,
    j: u32,
    i: u32,
    n_blocks_x: u32,
    n_blocks_z: u32,
    current_lod_at: impl Fn(u32, u32) -> u32,
) -> u8 {
    let left_j = j.saturating_sub(1);
    let right_j = (j + 1).min(n_blocks_x - 1);
    let top_i = i.saturating_sub(1);
    let bottom_i = (i + 1).min(n_blocks_z - 1);

    let mut bitmap = BorderBitmap::empty();
    if current_lod > current_lod_at(left_j, i) {
        bitmap |= BorderBitmap::LEFT;
    }
    if current_lod > current_lod_at(right_j, i) {
        bitmap |= BorderBitmap::RIGHT;
    }
    if current_lod > current_lod_at(j, top_i) {
        bitmap |= BorderBitmap::TOP;
    }
    if current_lod > current_lod_at(j, bottom_i) {
        bitmap |= BorderBitmap::BOTTOM;
    }
    bitmap.bits()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_block_treats_missing_neighbour_as_same_lod() {
        // A 1x1 grid: every neighbour clamps back to the block itself.
        let bitmap = compute_bitmap(3, 0, 0, 1, 1, |_, _| 3);
        assert_eq!(bitmap, 0);
    }

    #[test]
    fn sets_bit_only_for_coarser_neighbours() {
        let lods = [[2u32, 1], [1, 2]];
        let bitmap = compute_bitmap(2, 0, 0, 2, 2, |x, z| lods[z as usize][x as usize]);
        // self at (0,0) is LOD 2; right neighbour (1,0) and bottom neighbour
        // (0,1) are LOD 1 (coarser); left/top clamp back to self (same LOD).
        assert_eq!(bitmap, (BorderBitmap::RIGHT | BorderBitmap::BOTTOM).bits());
    }
}
