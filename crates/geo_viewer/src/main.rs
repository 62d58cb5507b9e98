// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//! Minimal demo binary: opens a window, wires a `GeoMipMapTerrain` to a
//! `wgpu` surface, and drives the per-frame update/draw passes. Window
//! chrome, input remapping and a GUI are out of scope for the engine
//! itself, so this binary exists only to give it somewhere to run.

use anyhow::{anyhow, Result};
use geo_camera::{Camera, CameraAction};
use geo_gpu::{Gpu, GpuConfig};
use geo_heightmap::Heightmap;
use geo_terrain::{GeoMipMapConfigBuilder, GeoMipMapTerrain};
use log::info;
use nalgebra::{Point3, Vector3};
use std::path::PathBuf;
use std::time::Instant;
use winit::event::{ElementState, Event, KeyboardInput, VirtualKeyCode, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::WindowBuilder;

/// Parsed from plain positional/flag arguments; no argument-parsing crate,
/// matching the reference engine's smaller demo binaries.
struct Opt {
    heightmap: PathBuf,
    block_size: u32,
    max_lod: u32,
}

impl Opt {
    fn from_args() -> Result<Self> {
        let mut heightmap = None;
        let mut block_size = 65u32;
        let mut max_lod = 6u32;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--block-size" => {
                    block_size = args
                        .next()
                        .ok_or_else(|| anyhow!("--block-size requires a value"))?
                        .parse()?;
                }
                "--max-lod" => {
                    max_lod = args
                        .next()
                        .ok_or_else(|| anyhow!("--max-lod requires a value"))?
                        .parse()?;
                }
                other => heightmap = Some(PathBuf::from(other)),
            }
        }

        Ok(Self {
            heightmap: heightmap.ok_or_else(|| anyhow!("usage: geo_viewer <heightmap.png> [--block-size N] [--max-lod N]"))?,
            block_size,
            max_lod,
        })
    }
}

/// Owns every piece that outlives the event loop: the window, the GPU
/// surface, the terrain and the camera. Constructed after the window
/// exists, torn down before it closes.
struct Application {
    window: winit::window::Window,
    gpu: Gpu,
    terrain: GeoMipMapTerrain,
    camera: Camera,
    last_frame: Instant,
}

impl Application {
    fn new(event_loop: &EventLoop<()>, opt: &Opt) -> Result<Self> {
        let window = WindowBuilder::new()
            .with_title("geo_viewer")
            .with_inner_size(winit::dpi::LogicalSize::new(1280u32, 720u32))
            .build(event_loop)?;

        let size = window.inner_size();
        let gpu = Gpu::new(&window, size.width, size.height, GpuConfig::default())
            .map_err(|err| anyhow!("failed to initialize GPU: {err}"))?;

        let heightmap = Heightmap::load(&opt.heightmap)?;
        info!("loaded heightmap {}x{}", heightmap.width(), heightmap.height());

        let config = GeoMipMapConfigBuilder::new()
            .block_size(opt.block_size)
            .min_lod(0)
            .max_lod(opt.max_lod)
            .base_distance(150.0)
            .double_distance_each_level(true)
            .build();
        let mut terrain = GeoMipMapTerrain::new(&heightmap, config)?;
        terrain.load_buffers(&gpu, &heightmap);

        let camera = Camera::new(
            Point3::new(0.0, 500.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
            1.0,
            50_000.0,
            gpu.aspect_ratio() as f64,
        );

        Ok(Self {
            window,
            gpu,
            terrain,
            camera,
            last_frame: Instant::now(),
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.gpu.resize(width, height);
        self.camera.set_aspect_ratio(self.gpu.aspect_ratio() as f64);
    }

    fn handle_key(&mut self, keycode: VirtualKeyCode, delta_seconds: f64) {
        let action = match keycode {
            VirtualKeyCode::W => CameraAction::MoveForward,
            VirtualKeyCode::S => CameraAction::MoveBackward,
            VirtualKeyCode::A => CameraAction::MoveLeft,
            VirtualKeyCode::D => CameraAction::MoveRight,
            VirtualKeyCode::Space => CameraAction::MoveUp,
            VirtualKeyCode::LShift => CameraAction::MoveDown,
            VirtualKeyCode::Up => CameraAction::LookUp,
            VirtualKeyCode::Down => CameraAction::LookDown,
            VirtualKeyCode::Left => CameraAction::LookLeft,
            VirtualKeyCode::Right => CameraAction::LookRight,
            _ => return,
        };
        self.camera.apply_action(action, delta_seconds);
    }

    /// Runs the two-pass driver and clears the frame. No render pipeline is
    /// bound here: a real shader and vertex layout are the host
    /// application's concern, not this engine's.
    fn render(&mut self) -> Result<()> {
        let now = Instant::now();
        let delta_seconds = (now - self.last_frame).as_secs_f64();
        self.last_frame = now;

        self.camera.update_frustum();
        self.terrain.update(&self.camera);
        let commands = self.terrain.draw_commands(&self.camera);
        log::trace!("frame dt={delta_seconds:.4}s, {} blocks drawn", commands.len());

        let mut frame = self.gpu.begin_frame()?;
        {
            let _pass = frame.begin_render_pass(wgpu::Color {
                r: 0.05,
                g: 0.08,
                b: 0.12,
                a: 1.0,
            });
        }
        frame.finish();
        Ok(())
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let opt = Opt::from_args()?;

    let event_loop = EventLoop::new();
    let mut app = Application::new(&event_loop, &opt)?;

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Poll;
        match event {
            Event::WindowEvent { event, window_id } if window_id == app.window.id() => match event {
                WindowEvent::CloseRequested => *control_flow = ControlFlow::Exit,
                WindowEvent::Resized(size) => app.resize(size.width, size.height),
                WindowEvent::KeyboardInput {
                    input:
                        KeyboardInput {
                            virtual_keycode: Some(VirtualKeyCode::Escape),
                            state: ElementState::Pressed,
                            ..
                        },
                    ..
                } => *control_flow = ControlFlow::Exit,
                WindowEvent::KeyboardInput {
                    input:
                        KeyboardInput {
                            virtual_keycode: Some(keycode),
                            state: ElementState::Pressed,
                            ..
                        },
                    ..
                } => app.handle_key(keycode, 1.0 / 60.0),
                _ => {}
            },
            Event::MainEventsCleared => app.window.request_redraw(),
            Event::RedrawRequested(window_id) if window_id == app.window.id() => {
                if let Err(err) = app.render() {
                    log::error!("render failed: {err}");
                    *control_flow = ControlFlow::Exit;
                }
            }
            _ => {}
        }
    });
}
