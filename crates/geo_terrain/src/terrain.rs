// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//! The two-pass GeoMipMapping driver: owns the block grid, the shared index
//! catalog and the GPU handles for the vertex/index/heightmap buffers.
//! Blocks are a flat, contiguous `Vec` indexed by `(i * n_blocks_x + j)`
//! rather than each holding a reference back to this struct, so the hot
//! per-frame passes touch no back-pointers.

use crate::block::Block;
use crate::border_resolver;
use crate::config::{validate, ConfigError, GeoMipMapConfig};
use crate::index_catalog::IndexCatalog;
use crate::lod_selector::select_lod;
use crate::overlay::OverlayTexture;
use geo_camera::Camera;
use geo_gpu::Gpu;
use geo_heightmap::Heightmap;
use geo_math::Aabb;
use log::debug;
use nalgebra::{Point3, Vector2};
use zerocopy::{AsBytes, FromBytes};

/// Block-local vertex position; world placement happens by adding a
/// per-draw `offset` uniform and sampling the heightmap texture in the
/// vertex shader. Kept block-size agnostic: one buffer serves every LOD.
#[repr(C)]
#[derive(Debug, Clone, Copy, AsBytes, FromBytes)]
pub struct Vertex {
    pub x: f32,
    pub z: f32,
}

/// One block's worth of draw ranges into the shared index buffer, plus the
/// per-block uniforms a caller needs to issue the draw calls themselves.
/// Building the actual `wgpu::RenderPass` calls is left to the caller: this
/// crate has no shader to bind.
#[derive(Debug, Clone, Copy)]
pub struct DrawCommand {
    pub block_id: u32,
    pub offset: Vector2<f32>,
    pub debug_color: [f32; 3],
    /// `(start, size)` into the shared index buffer, present only for
    /// `current_lod >= 2` (LOD 0/1 have no separate center region).
    pub center: Option<(u32, u32)>,
    /// `(start, size)` into the shared index buffer for the border strip.
    pub border: (u32, u32),
}

struct GpuResources {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    heightmap_texture: wgpu::Texture,
    heightmap_view: wgpu::TextureView,
    heightmap_sampler: wgpu::Sampler,
}

pub struct GeoMipMapTerrain {
    config: GeoMipMapConfig,
    blocks: Vec<Block>,
    n_blocks_x: u32,
    n_blocks_z: u32,
    terrain_width: f64,
    terrain_height: f64,
    index_catalog: IndexCatalog,
    overlay: OverlayTexture,
    gpu: Option<GpuResources>,
}

impl GeoMipMapTerrain {
    /// Builds the block grid and index catalog from `heightmap` and
    /// `config`. Trims the heightmap to `(nBlocksX*(B-1)+1) x
    /// (nBlocksZ*(B-1)+1)` per the external-interfaces contract; the
    /// trimmed remainder is never sampled. Does not touch the GPU — call
    /// [`GeoMipMapTerrain::load_buffers`] afterwards.
    pub fn new(heightmap: &Heightmap, config: GeoMipMapConfig) -> Result<Self, ConfigError> {
        validate(&config)?;
        let b = config.block_size;
        let n_blocks_x = (heightmap.width() - 1) / (b - 1);
        let n_blocks_z = (heightmap.height() - 1) / (b - 1);
        let terrain_width = (n_blocks_x * (b - 1) + 1) as f64;
        let terrain_height = (n_blocks_z * (b - 1) + 1) as f64;

        let mut blocks = Vec::with_capacity((n_blocks_x * n_blocks_z) as usize);
        for i in 0..n_blocks_z {
            for j in 0..n_blocks_x {
                blocks.push(Self::build_block(
                    heightmap,
                    &config,
                    blocks.len() as u32,
                    j,
                    i,
                    terrain_width,
                    terrain_height,
                ));
            }
        }

        let index_catalog = IndexCatalog::build(b, config.min_lod, config.max_lod);
        debug!(
            "built terrain: {} blocks ({}x{}), block_size {}",
            blocks.len(),
            n_blocks_x,
            n_blocks_z,
            b
        );

        Ok(Self {
            config,
            blocks,
            n_blocks_x,
            n_blocks_z,
            terrain_width,
            terrain_height,
            index_catalog,
            overlay: OverlayTexture::default(),
            gpu: None,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn build_block(
        heightmap: &Heightmap,
        config: &GeoMipMapConfig,
        id: u32,
        j: u32,
        i: u32,
        terrain_width: f64,
        terrain_height: f64,
    ) -> Block {
        let b = config.block_size;
        let origin_x = j * (b - 1);
        let origin_z = i * (b - 1);

        let mut min_sample = u16::MAX;
        let mut max_sample = 0u16;
        for dz in 0..b {
            for dx in 0..b {
                let sample = heightmap
                    .at(origin_x + dx, origin_z + dz)
                    .expect("block window lies within the trimmed heightmap bounds");
                min_sample = min_sample.min(sample);
                max_sample = max_sample.max(sample);
            }
        }

        let center_x = origin_x + (b - 1) / 2;
        let center_z = origin_z + (b - 1) / 2;
        let center_sample = heightmap
            .at(center_x, center_z)
            .expect("block center lies within the trimmed heightmap bounds");

        let true_center = Point3::new(
            (-(terrain_width / 2.0) + center_x as f64) * config.xz_scale,
            center_sample as f64 * config.y_scale,
            (-(terrain_height / 2.0) + center_z as f64) * config.xz_scale,
        );
        let half_extent = (b as f64 / 2.0) * config.xz_scale;
        let aabb = Aabb::new(
            Point3::new(
                true_center.x - half_extent,
                min_sample as f64 * config.y_scale,
                true_center.z - half_extent,
            ),
            Point3::new(
                true_center.x + half_extent,
                max_sample as f64 * config.y_scale,
                true_center.z + half_extent,
            ),
        );
        let translation = Vector2::new(
            center_x as f64 - terrain_width / 2.0,
            center_z as f64 - terrain_height / 2.0,
        );

        Block {
            id,
            j,
            i,
            true_center,
            aabb,
            translation,
            current_lod: config.max_lod,
            current_border_bitmap: 0,
            min_sample,
            max_sample,
        }
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn n_blocks_x(&self) -> u32 {
        self.n_blocks_x
    }

    pub fn n_blocks_z(&self) -> u32 {
        self.n_blocks_z
    }

    fn block_index(&self, j: u32, i: u32) -> usize {
        (i * self.n_blocks_x + j) as usize
    }

    /// Rebuilds every block's AABB for the current `y_scale`. The source
    /// engine leaves stale AABBs in place when a y-scale slider changes,
    /// which desyncs culling from the rendered geometry; this keeps them
    /// in lockstep instead.
    pub fn set_y_scale(&mut self, y_scale: f64, heightmap: &Heightmap) {
        self.config.y_scale = y_scale;
        for block in &mut self.blocks {
            let b = self.config.block_size;
            let origin_x = block.j * (b - 1);
            let origin_z = block.i * (b - 1);
            let center_x = origin_x + (b - 1) / 2;
            let center_z = origin_z + (b - 1) / 2;
            let center_sample = heightmap
                .at(center_x, center_z)
                .expect("block center lies within the trimmed heightmap bounds");
            block.true_center.y = center_sample as f64 * y_scale;
            let half_extent = (b as f64 / 2.0) * self.config.xz_scale;
            block.aabb = Aabb::new(
                Point3::new(
                    block.true_center.x - half_extent,
                    block.min_sample as f64 * y_scale,
                    block.true_center.z - half_extent,
                ),
                Point3::new(
                    block.true_center.x + half_extent,
                    block.max_sample as f64 * y_scale,
                    block.true_center.z + half_extent,
                ),
            );
        }
    }

    /// Pass 1: recomputes `current_lod` for every block from its distance
    /// to `camera`, then `current_border_bitmap` from the freshly updated
    /// LODs. Split into the two sub-passes the concurrency model requires:
    /// no block's bitmap may be computed against a neighbour whose LOD
    /// hasn't been updated yet this frame.
    pub fn update(&mut self, camera: &Camera) {
        let camera_position = if self.config.freeze_camera {
            camera.effective_position()
        } else {
            camera.position()
        };

        for block in &mut self.blocks {
            block.current_lod = if self.config.lod_active {
                let squared_distance = (block.true_center - camera_position).norm_squared();
                select_lod(
                    squared_distance,
                    self.config.base_distance,
                    self.config.min_lod,
                    self.config.max_lod,
                    self.config.lod_mode(),
                )
            } else {
                self.config.max_lod
            };
        }

        let lods: Vec<u32> = self.blocks.iter().map(|b| b.current_lod).collect();
        let n_blocks_x = self.n_blocks_x;
        let n_blocks_z = self.n_blocks_z;
        for block in &mut self.blocks {
            block.current_border_bitmap = border_resolver::compute_bitmap(
                block.current_lod,
                block.j,
                block.i,
                n_blocks_x,
                n_blocks_z,
                |x, z| lods[(z * n_blocks_x + x) as usize],
            );
        }
    }

    /// Pass 2: frustum-culls (if enabled) and emits one [`DrawCommand`] per
    /// visible block. Drawing itself (binding the shared buffers, issuing
    /// `draw_indexed` for each command's ranges) is the caller's job.
    pub fn draw_commands(&self, camera: &Camera) -> Vec<DrawCommand> {
        let frustum = camera.frustum();
        self.blocks
            .iter()
            .filter(|block| {
                !self.config.frustum_culling_active || frustum.intersects_aabb(&block.aabb.min, &block.aabb.max)
            })
            .map(|block| {
                let center = if block.current_lod >= 2 {
                    let (start, size) = self.index_catalog.center_range(block.current_lod);
                    Some((start, size))
                } else {
                    None
                };
                let border = self
                    .index_catalog
                    .border_range(block.current_lod, block.current_border_bitmap);
                DrawCommand {
                    block_id: block.id,
                    offset: Vector2::new(block.translation.x as f32, block.translation.y as f32),
                    debug_color: block.lod_debug_color(),
                    center,
                    border,
                }
            })
            .collect()
    }

    pub fn index_catalog(&self) -> &IndexCatalog {
        &self.index_catalog
    }

    pub fn overlay(&self) -> &OverlayTexture {
        &self.overlay
    }

    pub fn overlay_mut(&mut self) -> &mut OverlayTexture {
        &mut self.overlay
    }

    pub fn is_loaded(&self) -> bool {
        self.gpu.is_some()
    }

    /// Uploads the canonical vertex grid, the shared index buffer and the
    /// heightmap texture. Safe to call `heightmap.clear()` immediately
    /// afterwards: the GPU texture is now the only place the samples live.
    pub fn load_buffers(&mut self, gpu: &Gpu, heightmap: &Heightmap) {
        gpu.scoped_upload("geo_terrain::load_buffers", || {
            let b = self.config.block_size;
            let vertices: Vec<Vertex> = (0..b)
                .flat_map(|z| (0..b).map(move |x| Vertex { x: x as f32, z: z as f32 }))
                .collect();
            let vertex_buffer = gpu.push_slice("geo-terrain-vertices", &vertices, wgpu::BufferUsages::VERTEX);
            let index_buffer = gpu.push_slice(
                "geo-terrain-indices",
                self.index_catalog.indices(),
                wgpu::BufferUsages::INDEX,
            );
            let (heightmap_texture, heightmap_view, heightmap_sampler) =
                heightmap.as_texture(gpu, self.config.heightmap_filter);

            self.gpu = Some(GpuResources {
                vertex_buffer,
                index_buffer,
                heightmap_texture,
                heightmap_view,
                heightmap_sampler,
            });
        });
    }

    /// Releases the GPU-side vertex/index/heightmap handles. Symmetric with
    /// [`GeoMipMapTerrain::load_buffers`] on every exit path: dropping the
    /// `GpuResources` frees each handle exactly once.
    pub fn unload_buffers(&mut self) {
        self.gpu = None;
    }

    pub fn vertex_buffer(&self) -> Option<&wgpu::Buffer> {
        self.gpu.as_ref().map(|g| &g.vertex_buffer)
    }

    pub fn index_buffer(&self) -> Option<&wgpu::Buffer> {
        self.gpu.as_ref().map(|g| &g.index_buffer)
    }

    pub fn heightmap_texture(&self) -> Option<(&wgpu::Texture, &wgpu::TextureView, &wgpu::Sampler)> {
        self.gpu
            .as_ref()
            .map(|g| (&g.heightmap_texture, &g.heightmap_view, &g.heightmap_sampler))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeoMipMapConfigBuilder;
    use nalgebra::Vector3;

    fn flat_heightmap(width: u32, height: u32) -> Heightmap {
        Heightmap::from_samples(width, height, vec![0u16; (width * height) as usize])
    }

    #[test]
    fn minimal_single_block_terrain() {
        let heightmap = flat_heightmap(3, 3);
        let config = GeoMipMapConfigBuilder::new().block_size(3).min_lod(0).max_lod(1).build();
        let terrain = GeoMipMapTerrain::new(&heightmap, config).unwrap();
        assert_eq!(terrain.n_blocks_x(), 1);
        assert_eq!(terrain.n_blocks_z(), 1);
        assert_eq!(terrain.block_count(), 1);
        let (_, lod0_size) = terrain.index_catalog().border_range(0, 0);
        assert_eq!(lod0_size, 5);
    }

    #[test]
    fn rejects_invalid_config_at_construction() {
        let heightmap = flat_heightmap(3, 3);
        let config = GeoMipMapConfigBuilder::new().block_size(4).build();
        assert!(GeoMipMapTerrain::new(&heightmap, config).is_err());
    }

    #[test]
    fn update_selects_max_lod_when_lod_inactive() {
        let heightmap = flat_heightmap(9, 9);
        let config = GeoMipMapConfigBuilder::new()
            .block_size(9)
            .min_lod(0)
            .max_lod(3)
            .lod_active(false)
            .build();
        let mut terrain = GeoMipMapTerrain::new(&heightmap, config).unwrap();
        let camera = Camera::new(Point3::new(0.0, 0.0, 100_000.0), Vector3::new(0.0, 1.0, 0.0), 0.1, 1_000_000.0, 1.0);
        terrain.update(&camera);
        assert!(terrain.blocks().iter().all(|b| b.current_lod == 3));
    }

    #[test]
    fn freeze_camera_produces_identical_draw_set_after_moving() {
        let heightmap = flat_heightmap(25, 25);
        let config = GeoMipMapConfigBuilder::new()
            .block_size(9)
            .min_lod(0)
            .max_lod(3)
            .base_distance(50.0)
            .freeze_camera(true)
            .build();
        let mut terrain = GeoMipMapTerrain::new(&heightmap, config).unwrap();
        let mut camera = Camera::new(Point3::new(5.0, 50.0, 5.0), Vector3::new(0.0, 1.0, 0.0), 0.1, 10_000.0, 1.0);
        camera.update_frustum();

        terrain.update(&camera);
        camera.freeze();
        let first: Vec<(u32, u32)> = terrain
            .draw_commands(&camera)
            .iter()
            .map(|cmd| (cmd.block_id, 0))
            .collect();
        let first_lods: Vec<u32> = terrain.blocks().iter().map(|b| b.current_lod).collect();

        camera.apply_action(geo_camera::CameraAction::MoveForward, 1000.0);
        camera.update_frustum();
        terrain.update(&camera);
        let second: Vec<(u32, u32)> = terrain
            .draw_commands(&camera)
            .iter()
            .map(|cmd| (cmd.block_id, 0))
            .collect();
        let second_lods: Vec<u32> = terrain.blocks().iter().map(|b| b.current_lod).collect();

        assert_eq!(first, second);
        assert_eq!(first_lods, second_lods);
    }

    #[test]
    fn frustum_culling_skips_blocks_behind_camera() {
        let heightmap = flat_heightmap(17, 17);
        let config = GeoMipMapConfigBuilder::new().block_size(9).min_lod(0).max_lod(3).build();
        let mut terrain = GeoMipMapTerrain::new(&heightmap, config).unwrap();
        // Camera sits far down +Z looking down -Z; blocks near x=0,z=0 sit
        // behind it, so the near plane must reject them.
        let mut camera = Camera::new(Point3::new(0.0, 0.0, 1000.0), Vector3::new(0.0, 1.0, 0.0), 0.1, 10.0, 1.0);
        camera.update_frustum();
        terrain.update(&camera);
        let commands = terrain.draw_commands(&camera);
        assert!(commands.len() < terrain.block_count());
    }

    #[test]
    fn set_y_scale_rebuilds_aabbs() {
        let heightmap = Heightmap::from_samples(3, 3, vec![0, 0, 0, 0, 100, 0, 0, 0, 0]);
        let config = GeoMipMapConfigBuilder::new().block_size(3).min_lod(0).max_lod(1).y_scale(1.0).build();
        let mut terrain = GeoMipMapTerrain::new(&heightmap, config).unwrap();
        let before = terrain.blocks()[0].aabb;
        terrain.set_y_scale(2.0, &heightmap);
        let after = terrain.blocks()[0].aabb;
        assert_ne!(before.max.y, after.max.y);
        assert_eq!(after.max.y, 200.0);
    }
}
