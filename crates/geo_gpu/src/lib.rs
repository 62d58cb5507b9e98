// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//! A thin wrapper around a wgpu device/queue/surface, plus buffer and
//! texture upload helpers. Every other crate in the workspace builds its
//! GPU resources through here rather than touching `wgpu` directly.

use futures::executor::block_on;
use log::{error, trace};
use raw_window_handle::{HasRawDisplayHandle, HasRawWindowHandle};
use std::mem;
use wgpu::util::DeviceExt;
use zerocopy::AsBytes;

#[derive(thiserror::Error, Debug)]
pub enum GpuError {
    #[error("no suitable graphics adapter found")]
    AdapterRequestFailed,

    #[error("device request failed: {0}")]
    DeviceRequestFailed(#[from] wgpu::RequestDeviceError),

    #[error("surface has no compatible texture format")]
    NoCompatibleSurfaceFormat,

    #[error("failed to acquire next swap chain frame: {0}")]
    SurfaceError(#[from] wgpu::SurfaceError),
}

pub struct GpuConfig {
    pub present_mode: wgpu::PresentMode,
    pub power_preference: wgpu::PowerPreference,
}

impl Default for GpuConfig {
    fn default() -> Self {
        Self {
            present_mode: wgpu::PresentMode::Fifo,
            power_preference: wgpu::PowerPreference::HighPerformance,
        }
    }
}

/// Owns the device, queue and swap surface. Every buffer/texture handed out
/// by the terrain and heightmap crates is created through one of the
/// `push_*`/`create_*` methods here.
pub struct Gpu {
    surface: wgpu::Surface,
    _adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface_config: wgpu::SurfaceConfiguration,
    depth_texture: wgpu::TextureView,
    size: (u32, u32),
}

impl Gpu {
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    pub fn new<W: HasRawWindowHandle + HasRawDisplayHandle>(
        window: &W,
        width: u32,
        height: u32,
        config: GpuConfig,
    ) -> Result<Self, GpuError> {
        block_on(Self::new_async(window, width, height, config))
    }

    pub async fn new_async<W: HasRawWindowHandle + HasRawDisplayHandle>(
        window: &W,
        width: u32,
        height: u32,
        config: GpuConfig,
    ) -> Result<Self, GpuError> {
        let instance = wgpu::Instance::new(wgpu::Backends::PRIMARY);
        let surface = unsafe { instance.create_surface(window) };

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: config.power_preference,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GpuError::AdapterRequestFailed)?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("geo-gpu-device"),
                    features: wgpu::Features::empty(),
                    limits: wgpu::Limits::default(),
                },
                None,
            )
            .await?;

        let format = surface
            .get_supported_formats(&adapter)
            .first()
            .copied()
            .ok_or(GpuError::NoCompatibleSurfaceFormat)?;
        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width,
            height,
            present_mode: config.present_mode,
            alpha_mode: wgpu::CompositeAlphaMode::Auto,
        };
        surface.configure(&device, &surface_config);

        let depth_texture = Self::make_depth_texture(&device, width, height);

        Ok(Self {
            surface,
            _adapter: adapter,
            device,
            queue,
            surface_config,
            depth_texture,
            size: (width, height),
        })
    }

    fn make_depth_texture(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("geo-gpu-depth-texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        texture.create_view(&wgpu::TextureViewDescriptor::default())
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.size = (width, height);
        self.surface_config.width = width;
        self.surface_config.height = height;
        self.surface.configure(&self.device, &self.surface_config);
        self.depth_texture = Self::make_depth_texture(&self.device, width, height);
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.size.0 as f32 / self.size.1.max(1) as f32
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.surface_config.format
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn push_buffer(&self, label: &'static str, data: &[u8], usage: wgpu::BufferUsages) -> wgpu::Buffer {
        trace!("uploading {} with {} bytes", label, data.len());
        self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: data,
            usage,
        })
    }

    pub fn push_slice<T: AsBytes>(
        &self,
        label: &'static str,
        data: &[T],
        usage: wgpu::BufferUsages,
    ) -> wgpu::Buffer {
        self.push_buffer(label, data.as_bytes(), usage)
    }

    pub fn maybe_push_slice<T: AsBytes>(
        &self,
        label: &'static str,
        data: &[T],
        usage: wgpu::BufferUsages,
    ) -> Option<wgpu::Buffer> {
        if data.is_empty() {
            return None;
        }
        Some(self.push_slice(label, data, usage))
    }

    pub fn push_data<T: AsBytes>(&self, label: &'static str, data: &T, usage: wgpu::BufferUsages) -> wgpu::Buffer {
        trace!("uploading {} with {} bytes", label, mem::size_of::<T>());
        self.push_buffer(label, data.as_bytes(), usage)
    }

    pub fn write_buffer<T: AsBytes>(&self, buffer: &wgpu::Buffer, offset: wgpu::BufferAddress, data: &[T]) {
        self.queue.write_buffer(buffer, offset, data.as_bytes());
    }

    pub fn create_shader_module(&self, label: &'static str, source: &str) -> wgpu::ShaderModule {
        self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        })
    }

    /// Runs `body`, then polls the device's validation error scope and logs
    /// (rather than panics on) anything it reports. Mirrors wrapping a batch
    /// of buffer/texture uploads in a GL error check.
    pub fn scoped_upload<R>(&self, label: &str, body: impl FnOnce() -> R) -> R {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let result = body();
        if let Some(err) = block_on(self.device.pop_error_scope()) {
            error!("validation error during {}: {}", label, err);
        }
        result
    }

    /// Same as [`Gpu::scoped_upload`] but for a render/draw batch; kept as a
    /// distinct name so call sites read as "this wraps drawing, not upload".
    pub fn scoped_draw<R>(&self, label: &str, body: impl FnOnce() -> R) -> R {
        self.scoped_upload(label, body)
    }

    pub fn begin_frame(&self) -> Result<Frame, GpuError> {
        let surface_texture = self.surface.get_current_texture()?;
        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("geo-gpu-frame-encoder"),
        });
        Ok(Frame {
            queue: &self.queue,
            encoder,
            surface_texture,
            color_view: view,
            depth_view: &self.depth_texture,
        })
    }
}

/// A single render frame. Owns the swap chain texture and command encoder
/// for their lifetime; dropping without calling [`Frame::finish`] discards
/// the frame's commands without presenting anything.
pub struct Frame<'a> {
    queue: &'a wgpu::Queue,
    encoder: wgpu::CommandEncoder,
    surface_texture: wgpu::SurfaceTexture,
    color_view: wgpu::TextureView,
    depth_view: &'a wgpu::TextureView,
}

impl<'a> Frame<'a> {
    pub fn begin_render_pass(&mut self, clear_color: wgpu::Color) -> wgpu::RenderPass {
        self.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("geo-gpu-render-pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &self.color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(clear_color),
                    store: true,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: self.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: true,
                }),
                stencil_ops: None,
            }),
        })
    }

    pub fn finish(self) {
        self.queue.submit(std::iter::once(self.encoder.finish()));
        self.surface_texture.present();
    }
}
