// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
use crate::lod_selector::LodMode;
use geo_heightmap::HeightmapFilterMode;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("block size {0} is not of the form 2^n + 1")]
    InvalidBlockSize(u32),

    #[error("min_lod ({min_lod}) is greater than max_lod ({max_lod})")]
    LodBoundsInverted { min_lod: u32, max_lod: u32 },

    #[error("max_lod ({max_lod}) exceeds what block_size {block_size} supports")]
    LodExceedsBlock { max_lod: u32, block_size: u32 },
}

#[derive(Debug, Clone)]
pub struct GeoMipMapConfig {
    pub block_size: u32,
    pub min_lod: u32,
    pub max_lod: u32,
    pub base_distance: f64,
    pub double_distance_each_level: bool,
    pub xz_scale: f64,
    pub y_scale: f64,
    pub lod_active: bool,
    pub frustum_culling_active: bool,
    pub freeze_camera: bool,
    pub heightmap_filter: HeightmapFilterMode,
}

impl GeoMipMapConfig {
    pub fn lod_mode(&self) -> LodMode {
        if self.double_distance_each_level {
            LodMode::DoubleEachLevel
        } else {
            LodMode::Linear
        }
    }
}

impl Default for GeoMipMapConfig {
    fn default() -> Self {
        Self {
            block_size: 65,
            min_lod: 0,
            max_lod: 10,
            base_distance: 100.0,
            double_distance_each_level: true,
            xz_scale: 1.0,
            y_scale: 1.0,
            lod_active: true,
            frustum_culling_active: true,
            freeze_camera: false,
            heightmap_filter: HeightmapFilterMode::default(),
        }
    }
}

/// Chainable builder over [`GeoMipMapConfig`]. Construction is always
/// infallible; [`GeoMipMapTerrain::new`](crate::GeoMipMapTerrain::new) is
/// the actual fallible boundary, since it's the first point where the
/// config is checked against a concrete heightmap.
#[derive(Debug, Clone, Default)]
pub struct GeoMipMapConfigBuilder {
    config: GeoMipMapConfig,
}

impl GeoMipMapConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn block_size(mut self, block_size: u32) -> Self {
        self.config.block_size = block_size;
        self
    }

    pub fn min_lod(mut self, min_lod: u32) -> Self {
        self.config.min_lod = min_lod;
        self
    }

    pub fn max_lod(mut self, max_lod: u32) -> Self {
        self.config.max_lod = max_lod;
        self
    }

    pub fn base_distance(mut self, base_distance: f64) -> Self {
        self.config.base_distance = base_distance;
        self
    }

    pub fn double_distance_each_level(mut self, enabled: bool) -> Self {
        self.config.double_distance_each_level = enabled;
        self
    }

    pub fn xz_scale(mut self, xz_scale: f64) -> Self {
        self.config.xz_scale = xz_scale;
        self
    }

    pub fn y_scale(mut self, y_scale: f64) -> Self {
        self.config.y_scale = y_scale;
        self
    }

    pub fn lod_active(mut self, enabled: bool) -> Self {
        self.config.lod_active = enabled;
        self
    }

    pub fn frustum_culling_active(mut self, enabled: bool) -> Self {
        self.config.frustum_culling_active = enabled;
        self
    }

    pub fn freeze_camera(mut self, enabled: bool) -> Self {
        self.config.freeze_camera = enabled;
        self
    }

    pub fn heightmap_filter(mut self, filter: HeightmapFilterMode) -> Self {
        self.config.heightmap_filter = filter;
        self
    }

    pub fn build(self) -> GeoMipMapConfig {
        self.config
    }
}

/// Validates a config against invariants that don't depend on a heightmap:
/// `block_size` is `2^n + 1`, and `min_lod <= max_lod <= log2(block_size-1)`.
pub fn validate(config: &GeoMipMapConfig) -> Result<u32, ConfigError> {
    if config.block_size < 3 || ((config.block_size - 1) & (config.block_size - 2)) != 0 {
        return Err(ConfigError::InvalidBlockSize(config.block_size));
    }
    let max_possible_lod = (config.block_size - 1).trailing_zeros();
    if config.min_lod > config.max_lod {
        return Err(ConfigError::LodBoundsInverted {
            min_lod: config.min_lod,
            max_lod: config.max_lod,
        });
    }
    if config.max_lod > max_possible_lod {
        return Err(ConfigError::LodExceedsBlock {
            max_lod: config.max_lod,
            block_size: config.block_size,
        });
    }
    Ok(max_possible_lod)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_round_trips_fields() {
        let config = GeoMipMapConfigBuilder::new()
            .block_size(33)
            .min_lod(1)
            .max_lod(4)
            .base_distance(50.0)
            .double_distance_each_level(false)
            .xz_scale(2.0)
            .y_scale(3.0)
            .lod_active(false)
            .frustum_culling_active(false)
            .freeze_camera(true)
            .heightmap_filter(HeightmapFilterMode::Linear)
            .build();
        assert_eq!(config.block_size, 33);
        assert_eq!(config.min_lod, 1);
        assert_eq!(config.max_lod, 4);
        assert_eq!(config.base_distance, 50.0);
        assert!(!config.double_distance_each_level);
        assert_eq!(config.xz_scale, 2.0);
        assert_eq!(config.y_scale, 3.0);
        assert!(!config.lod_active);
        assert!(!config.frustum_culling_active);
        assert!(config.freeze_camera);
        assert_eq!(config.heightmap_filter, HeightmapFilterMode::Linear);
    }

    #[test]
    fn heightmap_filter_defaults_to_nearest() {
        let config = GeoMipMapConfigBuilder::new().build();
        assert_eq!(config.heightmap_filter, HeightmapFilterMode::Nearest);
    }

    #[test]
    fn rejects_block_size_not_power_of_two_plus_one() {
        let config = GeoMipMapConfigBuilder::new().block_size(40).build();
        assert_eq!(validate(&config), Err(ConfigError::InvalidBlockSize(40)));
    }

    #[test]
    fn rejects_block_size_below_minimum_of_three() {
        // 2 = 2^0 + 1 passes the power-of-two-plus-one bit trick but n must
        // be >= 1, so the smallest legal block size is 3.
        let config = GeoMipMapConfigBuilder::new().block_size(2).build();
        assert_eq!(validate(&config), Err(ConfigError::InvalidBlockSize(2)));
    }

    #[test]
    fn rejects_inverted_lod_bounds() {
        let config = GeoMipMapConfigBuilder::new().block_size(65).min_lod(5).max_lod(2).build();
        assert_eq!(
            validate(&config),
            Err(ConfigError::LodBoundsInverted { min_lod: 5, max_lod: 2 })
        );
    }

    #[test]
    fn rejects_max_lod_beyond_block_size() {
        let config = GeoMipMapConfigBuilder::new().block_size(9).min_lod(0).max_lod(10).build();
        assert_eq!(
            validate(&config),
            Err(ConfigError::LodExceedsBlock { max_lod: 10, block_size: 9 })
        );
    }

    #[test]
    fn accepts_b_equals_3_boundary_case() {
        let config = GeoMipMapConfigBuilder::new().block_size(3).min_lod(0).max_lod(1).build();
        assert_eq!(validate(&config), Ok(1));
    }
}
