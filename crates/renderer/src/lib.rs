//! Presentation layer for the inkfield particle viewer.
//!
//! The module glues the winit window, the `wgpu` particle pipeline, and the
//! pure simulation state from the `trail` crate together. The overall flow:
//!
//! ```text
//!   CLI / inkfield
//!          │ ViewerConfig
//!          ▼
//!   Viewer::run ──▶ WindowState ──▶ winit event loop ──▶ render_frame()
//!          ▲                                      │
//!          │              pointer map ─▶ trail accumulate ─▶ GPU upload ─┘
//! ```
//!
//! `WindowState` owns the per-frame state (camera, cursor, displacement
//! buffer, the live field slot) while [`GpuState`] owns every GPU resource.
//! Image decodes run off-thread; the newest request wins and a failed
//! decode leaves the previously displayed field in place.

mod camera;
mod gpu;
mod loader;
mod scene;
mod uniforms;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use glam::Vec2;
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::{ElementState, Event, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowBuilder};

use trail::{ndc_from_screen, uv_to_buffer, CursorState, DisplacementBuffer, FieldLayout, FieldSlot, Ray};

use crate::camera::OrbitCamera;
use crate::gpu::GpuState;
use crate::loader::{DecodedImage, ImageLoader};
use crate::scene::SceneField;

/// Device pixel ratios above this are clamped before they reach the
/// resolution uniform and the surface allocation.
pub const MAX_PIXEL_RATIO: f64 = 2.0;

/// Granularity of the particle-size control.
pub const PARTICLE_SIZE_STEP: f32 = 0.001;

/// Default value of the particle-size control.
pub const DEFAULT_PARTICLE_SIZE: f32 = 0.5;

/// Fixed exponent applied to picture luminance in the shader.
const COLOR_INTENSITY: f32 = 2.0;

/// Radians of orbit per pixel of drag.
const ORBIT_SPEED: f32 = 0.005;

/// One selectable image in the viewer's catalog.
#[derive(Debug, Clone)]
pub struct ImageEntry {
    pub name: String,
    pub path: PathBuf,
}

/// Immutable configuration passed to the viewer at start-up.
#[derive(Debug, Clone)]
pub struct ViewerConfig {
    /// Initial window size in physical pixels.
    pub window_size: (u32, u32),
    /// Ordered catalog; entry 0 loads at start-up, number keys select.
    pub entries: Vec<ImageEntry>,
    /// Initial particle-size control value, in [0,1].
    pub particle_size: f32,
    /// Show the raw displacement buffer and per-second frame timing.
    pub debug: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            window_size: (1280, 720),
            entries: Vec::new(),
            particle_size: DEFAULT_PARTICLE_SIZE,
            debug: false,
        }
    }
}

/// High-level entry point that owns the chosen configuration.
pub struct Viewer {
    config: ViewerConfig,
}

impl Viewer {
    pub fn new(config: ViewerConfig) -> Self {
        Self { config }
    }

    /// Opens the window and drives the event loop until close.
    ///
    /// The first catalog entry is requested immediately; the field appears
    /// once its decode completes, and the loop runs regardless.
    pub fn run(&self) -> Result<()> {
        if self.config.entries.is_empty() {
            anyhow::bail!("the image catalog is empty; nothing to display");
        }

        let event_loop = EventLoop::new().context("failed to initialize event loop")?;
        let window_size =
            PhysicalSize::new(self.config.window_size.0, self.config.window_size.1);
        let window = WindowBuilder::new()
            .with_title("inkfield")
            .with_inner_size(window_size)
            .build(&event_loop)
            .context("failed to create viewer window")?;
        let window = Arc::new(window);

        let mut state = WindowState::new(window.clone(), &self.config)?;
        state.select_image(0);
        state.window().request_redraw();

        event_loop
            .run(move |event, elwt| {
                elwt.set_control_flow(ControlFlow::Wait);

                match event {
                    Event::WindowEvent { window_id, event } if window_id == state.window().id() => {
                        match event {
                            WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                                elwt.exit();
                            }
                            WindowEvent::CursorMoved { position, .. } => {
                                state.handle_pointer_moved(position);
                            }
                            WindowEvent::Touch(touch) => {
                                // Touch paints the same way the mouse does.
                                state.handle_pointer_moved(touch.location);
                            }
                            WindowEvent::MouseInput {
                                state: button_state,
                                button,
                                ..
                            } => {
                                state.handle_mouse_button(button, button_state);
                            }
                            WindowEvent::MouseWheel { delta, .. } => {
                                state.handle_scroll(delta);
                            }
                            WindowEvent::KeyboardInput { event, .. } => {
                                if event.state == ElementState::Pressed {
                                    state.handle_key(&event.logical_key);
                                }
                            }
                            WindowEvent::Resized(_) => {
                                state.resize_to_window();
                            }
                            WindowEvent::ScaleFactorChanged {
                                mut inner_size_writer,
                                ..
                            } => {
                                // Keep the current logical size when the scale factor changes.
                                let _ = inner_size_writer.request_inner_size(state.window_size());
                                state.resize_to_window();
                            }
                            WindowEvent::RedrawRequested => match state.render_frame() {
                                Ok(()) => {}
                                Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                                    state.resize_to_window();
                                }
                                Err(wgpu::SurfaceError::OutOfMemory) => {
                                    tracing::error!("surface out of memory; exiting");
                                    elwt.exit();
                                }
                                Err(wgpu::SurfaceError::Timeout) => {
                                    tracing::warn!("surface timeout; retrying next frame");
                                }
                                Err(other) => {
                                    tracing::warn!(?other, "surface error; retrying next frame");
                                }
                            },
                            _ => {}
                        }
                    }
                    Event::AboutToWait => {
                        // Schedule the next frame once winit is about to wait again.
                        state.window().request_redraw();
                    }
                    _ => {}
                }
            })
            .map_err(|err| anyhow!("event loop error: {err}"))
    }
}

/// Per-window state: the simulation aggregates plus the GPU resources.
struct WindowState {
    window: Arc<Window>,
    gpu: GpuState,
    camera: OrbitCamera,
    cursor: CursorState,
    displacement: DisplacementBuffer,
    field: FieldSlot<SceneField>,
    loader: ImageLoader,
    entries: Vec<ImageEntry>,
    particle_size: f32,
    orbiting: bool,
    last_pointer: Option<PhysicalPosition<f64>>,
    texel_scratch: Vec<u8>,
}

impl WindowState {
    fn new(window: Arc<Window>, config: &ViewerConfig) -> Result<Self> {
        let physical = window.inner_size();
        let extent = render_extent(physical, window.scale_factor());
        // Buffer dimensions are provisional until the first image decides
        // the aspect tier; content carries over either way.
        let initial_buffer = (256, trail::BUFFER_HEIGHT);
        let gpu = GpuState::new(
            window.as_ref(),
            extent,
            initial_buffer,
            COLOR_INTENSITY,
            config.particle_size,
            config.debug,
        )?;

        Ok(Self {
            window,
            gpu,
            camera: OrbitCamera::new(),
            cursor: CursorState::new(),
            displacement: DisplacementBuffer::new(initial_buffer.0, initial_buffer.1),
            field: FieldSlot::new(),
            loader: ImageLoader::new(),
            entries: config.entries.clone(),
            particle_size: config.particle_size.clamp(0.0, 1.0),
            orbiting: false,
            last_pointer: None,
            texel_scratch: Vec::new(),
        })
    }

    fn window(&self) -> &Window {
        self.window.as_ref()
    }

    fn window_size(&self) -> PhysicalSize<u32> {
        self.window.inner_size()
    }

    /// Kicks off an asynchronous swap to the catalog entry at `index`.
    fn select_image(&mut self, index: usize) {
        match self.entries.get(index) {
            Some(entry) => {
                tracing::info!(index, name = %entry.name, "requesting image swap");
                self.loader.request(entry.name.clone(), entry.path.clone());
            }
            None => tracing::debug!(index, "no catalog entry bound to that key"),
        }
    }

    fn handle_pointer_moved(&mut self, position: PhysicalPosition<f64>) {
        if self.orbiting {
            if let Some(last) = self.last_pointer {
                let dx = (position.x - last.x) as f32;
                let dy = (position.y - last.y) as f32;
                self.camera.rotate(-dx * ORBIT_SPEED, -dy * ORBIT_SPEED);
            }
        }
        self.last_pointer = Some(position);

        let size = self.window.inner_size();
        let ndc = ndc_from_screen(
            Vec2::new(position.x as f32, position.y as f32),
            Vec2::new(size.width.max(1) as f32, size.height.max(1) as f32),
        );
        self.cursor.set_screen_ndc(ndc);
    }

    fn handle_mouse_button(&mut self, button: MouseButton, state: ElementState) {
        if button == MouseButton::Right {
            self.orbiting = state == ElementState::Pressed;
        }
    }

    fn handle_scroll(&mut self, delta: MouseScrollDelta) {
        let steps = match delta {
            MouseScrollDelta::LineDelta(_, y) => y,
            MouseScrollDelta::PixelDelta(position) => (position.y / 120.0) as f32,
        };
        self.camera.zoom(steps);
    }

    fn handle_key(&mut self, key: &Key) {
        match key {
            Key::Named(NamedKey::ArrowUp) => {
                self.particle_size = (self.particle_size + PARTICLE_SIZE_STEP).clamp(0.0, 1.0);
            }
            Key::Named(NamedKey::ArrowDown) => {
                self.particle_size = (self.particle_size - PARTICLE_SIZE_STEP).clamp(0.0, 1.0);
            }
            Key::Character(text) => {
                if let Some(digit) = text.chars().next().and_then(|c| c.to_digit(10)) {
                    if digit >= 1 {
                        self.select_image((digit - 1) as usize);
                    }
                }
            }
            _ => {}
        }
    }

    /// Recomputes the render extent from the window and the capped ratio.
    fn resize_to_window(&mut self) {
        let extent = render_extent(self.window.inner_size(), self.window.scale_factor());
        self.gpu.resize(extent);
    }

    /// Applies a finished decode, if any, to the live field.
    ///
    /// Failures keep the previous field rendered; the only user-visible
    /// consequence is the warning in the log.
    fn apply_completed_load(&mut self) {
        match self.loader.poll() {
            Some(Ok(decoded)) => self.replace_field(decoded),
            Some(Err(err)) => {
                tracing::warn!(error = %err, "image swap failed; keeping current field");
            }
            None => {}
        }
    }

    /// Tears down the old field/surface pair and builds the new one.
    ///
    /// The displacement buffer adopts the new tier's width but keeps its
    /// content, and the cursor is left alone — trail continuity across
    /// swaps is intentional.
    fn replace_field(&mut self, decoded: DecodedImage) {
        let layout = match FieldLayout::for_image(decoded.width(), decoded.height()) {
            Ok(layout) => layout,
            Err(err) => {
                tracing::warn!(error = %err, name = %decoded.name, "rejecting image");
                return;
            }
        };
        self.displacement.resize_width(layout.buffer_width);
        self.gpu
            .ensure_displacement(layout.buffer_width, layout.buffer_height);
        let gpu = &self.gpu;
        self.field
            .replace(|| gpu.create_field(layout, &decoded.rgba));
    }

    /// One tick of the steady-state loop: clock, controls, pointer map,
    /// accumulate, draw.
    fn render_frame(&mut self) -> Result<(), wgpu::SurfaceError> {
        self.apply_completed_load();
        self.camera.update();

        let extent = self.gpu.size();
        let aspect = extent.width as f32 / extent.height.max(1) as f32;
        let view_proj = self.camera.view_proj(aspect);

        if let (Some(ndc), Some(field)) = (self.cursor.screen_ndc(), self.field.get()) {
            let ray = Ray::from_ndc(ndc, &view_proj.inverse());
            if let Some(uv) = field.surface.intersect(&ray) {
                self.cursor.record_hit(uv_to_buffer(
                    uv,
                    field.layout.buffer_width,
                    field.layout.buffer_height,
                ));
            }
        }

        self.displacement.advance(&mut self.cursor);
        self.displacement.write_r8(&mut self.texel_scratch);
        self.gpu.upload_displacement(&self.texel_scratch);

        self.gpu.update_uniforms(view_proj, self.particle_size);
        self.gpu.render_frame(self.field.get())
    }
}

/// Clamps the host's reported device pixel ratio.
pub fn effective_pixel_ratio(reported: f64) -> f64 {
    reported.min(MAX_PIXEL_RATIO)
}

/// Render extent in device pixels: the window's logical size scaled by the
/// capped ratio rather than whatever the host reports.
pub fn render_extent(physical: PhysicalSize<u32>, reported_ratio: f64) -> PhysicalSize<u32> {
    let ratio = effective_pixel_ratio(reported_ratio);
    let scale = if reported_ratio > 0.0 {
        ratio / reported_ratio
    } else {
        1.0
    };
    PhysicalSize::new(
        ((physical.width as f64) * scale).round().max(1.0) as u32,
        ((physical.height as f64) * scale).round().max(1.0) as u32,
    )
}
