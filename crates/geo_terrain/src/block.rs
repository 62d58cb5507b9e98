// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//! Per-tile metadata. A block holds no GPU handles and no back-pointer to
//! its owning terrain; rendering functions that need terrain-wide state
//! (the index catalog, the camera) already have it in scope, so there is
//! nothing for the block to point back to.

use geo_math::Aabb;
use nalgebra::{Point3, Vector2};

#[derive(Debug, Clone)]
pub struct Block {
    pub id: u32,
    /// Column/row in the block grid.
    pub j: u32,
    pub i: u32,
    pub true_center: Point3<f64>,
    pub aabb: Aabb,
    pub translation: Vector2<f64>,
    pub current_lod: u32,
    pub current_border_bitmap: u8,
    pub(crate) min_sample: u16,
    pub(crate) max_sample: u16,
}

impl Block {
    /// A debug color keyed off `currentLod % 3`, exposed for callers that
    /// want a cheap visual LOD indicator; wiring it into a shader is up to
    /// them since shaders are outside this crate's scope.
    pub fn lod_debug_color(&self) -> [f32; 3] {
        match self.current_lod % 3 {
            0 => [0.7, 0.3, 0.3],
            1 => [0.3, 0.7, 0.3],
            _ => [0.3, 0.3, 0.7],
        }
    }
}
