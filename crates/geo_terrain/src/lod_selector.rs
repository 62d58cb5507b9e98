// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//! Maps a squared camera distance to a LOD level via a linear or geometric
//! band ladder. A small enum rather than a trait object: the two ladders
//! differ in a single expression and this is evaluated once per block per
//! frame, so keeping the branch predictable matters more than polymorphism.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LodMode {
    Linear,
    DoubleEachLevel,
}

/// Picks a LOD for `squared_distance` given `base_distance`, walking bands
/// outward from the camera starting at `max_lod`. Uses a running multiplier
/// rather than recomputing `k` from `i` each iteration, mirroring the
/// source's `distancePower` accumulator.
pub fn select_lod(squared_distance: f64, base_distance: f64, min_lod: u32, max_lod: u32, mode: LodMode) -> u32 {
    let mut distance_power: u64 = 1;
    for i in 0..(max_lod - min_lod) {
        let band = (distance_power as f64) * (distance_power as f64) * base_distance * base_distance;
        if squared_distance < band {
            return max_lod - i;
        }
        match mode {
            LodMode::DoubleEachLevel => distance_power <<= 1,
            LodMode::Linear => distance_power += 1,
        }
    }
    min_lod
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monotonic_in_distance() {
        let lod_a = select_lod(10.0, 100.0, 0, 4, LodMode::Linear);
        let lod_b = select_lod(1_000_000.0, 100.0, 0, 4, LodMode::Linear);
        assert!(lod_a >= lod_b);
    }

    #[test]
    fn linear_vs_geometric_ladder_scenario() {
        // max_lod - min_lod = 4, base_distance = 100, squared distance = 300^2 = 90000.
        // Linear bands grow as (1,2,3,4)^2*100^2 = 10000,40000,90000,160000, so
        // 90000 first falls strictly inside the i=3 band: LOD = 4-3 = 1.
        let linear = select_lod(90_000.0, 100.0, 0, 4, LodMode::Linear);
        assert_eq!(linear, 4 - 3);

        // Geometric bands grow as (1,2,4,8)^2*100^2 = 10000,40000,160000,640000,
        // so 90000 first falls inside the i=2 band: LOD = 4-2 = 2.
        let geometric = select_lod(90_000.0, 100.0, 0, 4, LodMode::DoubleEachLevel);
        assert_eq!(geometric, 4 - 2);
    }

    #[test]
    fn falls_back_to_min_lod_at_extreme_distance() {
        let lod = select_lod(f64::MAX, 1.0, 2, 6, LodMode::DoubleEachLevel);
        assert_eq!(lod, 2);
    }
}
