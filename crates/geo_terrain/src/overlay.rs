// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//! A single optional colour texture blended over the terrain. Absence is a
//! valid, first-class state: the shader falls back to a flat colour rather
//! than this crate supplying a placeholder texture.

use geo_gpu::Gpu;
use image::RgbaImage;

/// Owns the GPU-side handle once uploaded; `None` means "draw flat colour".
#[derive(Default)]
pub struct OverlayTexture {
    uploaded: Option<(wgpu::Texture, wgpu::TextureView, wgpu::Sampler)>,
}

impl OverlayTexture {
    pub fn is_present(&self) -> bool {
        self.uploaded.is_some()
    }

    pub fn view(&self) -> Option<&wgpu::TextureView> {
        self.uploaded.as_ref().map(|(_, view, _)| view)
    }

    pub fn sampler(&self) -> Option<&wgpu::Sampler> {
        self.uploaded.as_ref().map(|(_, _, sampler)| sampler)
    }

    /// Uploads `image` as a clamp-to-edge, linearly filtered RGBA texture,
    /// replacing whatever was previously uploaded.
    pub fn upload(&mut self, gpu: &Gpu, image: &RgbaImage) {
        let size = wgpu::Extent3d {
            width: image.width(),
            height: image.height(),
            depth_or_array_layers: 1,
        };
        let texture = gpu.device().create_texture(&wgpu::TextureDescriptor {
            label: Some("overlay-texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        gpu.queue().write_texture(
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            image.as_raw(),
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4 * image.width()),
                rows_per_image: Some(image.height()),
            },
            size,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = gpu.device().create_sampler(&wgpu::SamplerDescriptor {
            label: Some("overlay-sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        self.uploaded = Some((texture, view, sampler));
    }

    /// Drops the GPU handle; future draws fall back to a flat colour.
    pub fn unload(&mut self) {
        self.uploaded = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_by_default() {
        let overlay = OverlayTexture::default();
        assert!(!overlay.is_present());
        assert!(overlay.view().is_none());
    }

    #[test]
    fn unload_on_absent_overlay_is_a_no_op() {
        let mut overlay = OverlayTexture::default();
        overlay.unload();
        assert!(!overlay.is_present());
    }
}
