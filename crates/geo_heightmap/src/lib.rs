// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//! Heightfield grid decoded from a 16-bit grayscale PNG, with an optional
//! GPU texture mirror for overlay/debug sampling.

use geo_gpu::Gpu;
use image::{DynamicImage, ImageFormat};
use log::debug;
use std::path::Path;

#[derive(thiserror::Error, Debug)]
pub enum HeightmapError {
    #[error("unsupported heightmap format (expected 16-bit grayscale PNG)")]
    UnsupportedFormat,

    #[error("failed to decode heightmap image: {0}")]
    DecodeFailed(#[from] image::ImageError),

    #[error("failed to read heightmap file: {0}")]
    Io(#[from] std::io::Error),

    #[error("heightmap sample ({x}, {z}) out of bounds for {width}x{height} grid")]
    OutOfBounds { x: u32, z: u32, width: u32, height: u32 },
}

/// Filtering applied when the heightmap is mirrored onto the GPU as a
/// texture. Left open by the source algorithm; nearest is the default since
/// vertex displacement exaggerates interpolation artifacts more than a
/// fragment-stage sample would.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeightmapFilterMode {
    Nearest,
    Linear,
}

impl Default for HeightmapFilterMode {
    fn default() -> Self {
        HeightmapFilterMode::Nearest
    }
}

/// A row-major grid of 16-bit height samples: `samples[z * width + x]`.
pub struct Heightmap {
    width: u32,
    height: u32,
    samples: Vec<u16>,
    min: u16,
    max: u16,
}

impl Heightmap {
    pub fn from_samples(width: u32, height: u32, samples: Vec<u16>) -> Self {
        assert_eq!(samples.len(), (width * height) as usize);
        let min = samples.iter().copied().min().unwrap_or(0);
        let max = samples.iter().copied().max().unwrap_or(0);
        Self {
            width,
            height,
            samples,
            min,
            max,
        }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, HeightmapError> {
        let bytes = std::fs::read(path.as_ref())?;
        Self::from_png_bytes(&bytes)
    }

    pub fn from_png_bytes(bytes: &[u8]) -> Result<Self, HeightmapError> {
        let image = image::load_from_memory_with_format(bytes, ImageFormat::Png)?;
        let DynamicImage::ImageLuma16(gray) = image else {
            return Err(HeightmapError::UnsupportedFormat);
        };
        let width = gray.width();
        let height = gray.height();
        let samples = gray.into_raw();
        debug!("decoded heightmap: {}x{}", width, height);
        Ok(Self::from_samples(width, height, samples))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn min(&self) -> u16 {
        self.min
    }

    pub fn max(&self) -> u16 {
        self.max
    }

    pub fn at(&self, x: u32, z: u32) -> Result<u16, HeightmapError> {
        if x >= self.width || z >= self.height {
            return Err(HeightmapError::OutOfBounds {
                x,
                z,
                width: self.width,
                height: self.height,
            });
        }
        Ok(self.samples[(z * self.width + x) as usize])
    }

    /// Drops the host-side sample storage, freeing its memory. `width`/
    /// `height` are kept so callers can still report the grid's extent;
    /// `at()` is no longer valid to call once the GPU copy is the only
    /// place the samples live.
    pub fn clear(&mut self) {
        self.samples = Vec::new();
        self.min = 0;
        self.max = 0;
    }

    /// Uploads the grid as an `R16Uint` texture, returning a view and a
    /// sampler built from `filter` suitable for sampling in a shader (e.g.
    /// an overlay pass).
    pub fn as_texture(&self, gpu: &Gpu, filter: HeightmapFilterMode) -> (wgpu::Texture, wgpu::TextureView, wgpu::Sampler) {
        let texture = gpu.device().create_texture(&wgpu::TextureDescriptor {
            label: Some("heightmap-texture"),
            size: wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::R16Uint,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let bytes_per_row = self.width * std::mem::size_of::<u16>() as u32;
        gpu.queue().write_texture(
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            bytemuck_cast(&self.samples),
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(bytes_per_row),
                rows_per_image: Some(self.height),
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let wgpu_filter = match filter {
            HeightmapFilterMode::Nearest => wgpu::FilterMode::Nearest,
            HeightmapFilterMode::Linear => wgpu::FilterMode::Linear,
        };
        let sampler = gpu.device().create_sampler(&wgpu::SamplerDescriptor {
            label: Some("heightmap-sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu_filter,
            min_filter: wgpu_filter,
            ..Default::default()
        });
        (texture, view, sampler)
    }
}

/// `u16` samples reinterpreted as raw bytes for a texture upload. A local
/// helper rather than a `zerocopy` dependency here, since this crate only
/// ever casts its own owned `Vec<u16>`.
fn bytemuck_cast(samples: &[u16]) -> &[u8] {
    // Safety: any bit pattern is valid for `u8`, and `u16` has no padding,
    // so viewing the slice through a byte pointer of twice the length is
    // sound for any `&[u16]`.
    unsafe { std::slice::from_raw_parts(samples.as_ptr() as *const u8, std::mem::size_of_val(samples)) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_reports_min_max() {
        let heightmap = Heightmap::from_samples(2, 2, vec![10, 20, 30, 5]);
        assert_eq!(heightmap.min(), 5);
        assert_eq!(heightmap.max(), 30);
        assert_eq!(heightmap.at(1, 0).unwrap(), 20);
        assert_eq!(heightmap.at(0, 1).unwrap(), 30);
    }

    #[test]
    fn at_out_of_bounds_is_an_error_not_a_panic() {
        let heightmap = Heightmap::from_samples(2, 2, vec![0, 0, 0, 0]);
        assert!(matches!(
            heightmap.at(5, 0),
            Err(HeightmapError::OutOfBounds { x: 5, z: 0, width: 2, height: 2 })
        ));
    }

    #[test]
    fn clear_drops_samples_but_keeps_dimensions() {
        let mut heightmap = Heightmap::from_samples(2, 1, vec![7, 9]);
        heightmap.clear();
        assert_eq!(heightmap.min(), 0);
        assert_eq!(heightmap.max(), 0);
        assert_eq!(heightmap.width(), 2);
        assert_eq!(heightmap.height(), 1);
        assert_eq!(heightmap.samples.len(), 0);
        assert_eq!(heightmap.samples.capacity(), 0);
    }
}
