use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use glam::Mat4;
use image::RgbaImage;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;

use trail::FieldLayout;

use crate::scene::{instance_buffer_layout, SceneField};
use crate::uniforms::FieldUniforms;

/// Background clear color, #181818 converted to linear.
const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.0091,
    g: 0.0091,
    b: 0.0091,
    a: 1.0,
};

/// Pixel scale of the debug overlay relative to the displacement buffer.
const OVERLAY_SCALE: u32 = 2;
const OVERLAY_MARGIN: u32 = 12;

/// Aggregates every GPU resource needed to present a frame.
///
/// ```text
///   Window ─▶ Surface ─▶ Device ─▶ Queue
///                           │
///                           ├─▶ particle pipeline + uniform buffer
///                           ├─▶ displacement texture (rewritten per frame)
///                           └─▶ debug overlay pipeline (optional)
/// ```
///
/// Per-image resources (instances, picture texture, bind group) live in
/// [`SceneField`] and are created through [`GpuState::create_field`] so
/// they bind against the layouts owned here.
pub(crate) struct GpuState {
    /// Kept alive for the lifetime of the surface it produced.
    _instance: wgpu::Instance,
    limits: wgpu::Limits,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: PhysicalSize<u32>,
    particle_pipeline: wgpu::RenderPipeline,
    texture_layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    uniforms: FieldUniforms,
    displacement: DisplacementTexture,
    overlay: Option<OverlayPipeline>,
    start_time: Instant,
    frame_count: u32,
    frames_since_log: u32,
    last_log_time: Instant,
    debug: bool,
}

impl GpuState {
    pub fn new<T>(
        target: &T,
        initial_size: PhysicalSize<u32>,
        initial_buffer: (u32, u32),
        color_intensity: f32,
        particle_size: f32,
        debug: bool,
    ) -> Result<Self>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let instance = wgpu::Instance::default();
        let window_handle = target
            .window_handle()
            .map_err(|err| anyhow!("failed to acquire window handle: {err}"))?;
        let display_handle = target
            .display_handle()
            .map_err(|err| anyhow!("failed to acquire display handle: {err}"))?;
        let surface = unsafe {
            instance.create_surface_unsafe(wgpu::SurfaceTargetUnsafe::RawHandle {
                raw_display_handle: display_handle.as_raw(),
                raw_window_handle: window_handle.as_raw(),
            })
        }
        .context("failed to create rendering surface")?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .context("failed to find a suitable GPU adapter")?;

        let limits = adapter.limits();
        let device_descriptor = wgpu::DeviceDescriptor {
            label: Some("inkfield device"),
            required_features: wgpu::Features::empty(),
            required_limits: limits.clone(),
            memory_hints: wgpu::MemoryHints::default(),
            trace: wgpu::Trace::default(),
        };
        let (device, queue) = pollster::block_on(adapter.request_device(&device_descriptor))
            .context("failed to create GPU device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|format| format.is_srgb())
            .unwrap_or(surface_caps.formats[0]);

        let size = PhysicalSize::new(initial_size.width.max(1), initial_size.height.max(1));
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode: surface_caps.present_modes[0],
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 1,
        };
        surface.configure(&device, &config);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("particle shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/particles.wgsl").into()),
        });

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("uniform layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        // Picture and displacement textures with their samplers; the
        // vertex stage samples both, so visibility covers it.
        let mut texture_entries = Vec::with_capacity(4);
        for index in 0..2u32 {
            texture_entries.push(wgpu::BindGroupLayoutEntry {
                binding: index * 2,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            });
            texture_entries.push(wgpu::BindGroupLayoutEntry {
                binding: index * 2 + 1,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            });
        }
        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("field texture layout"),
            entries: &texture_entries,
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("particle pipeline layout"),
            bind_group_layouts: &[&uniform_layout, &texture_layout],
            push_constant_ranges: &[],
        });

        let particle_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("particle pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[instance_buffer_layout()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview: None,
            cache: None,
        });

        let uniforms = FieldUniforms::new(size.width, size.height, color_intensity, particle_size);
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("uniform buffer"),
            contents: bytemuck::bytes_of(&uniforms),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("uniform bind group"),
            layout: &uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let displacement = DisplacementTexture::new(&device, initial_buffer.0, initial_buffer.1);
        let overlay = debug.then(|| OverlayPipeline::new(&device, surface_format, &displacement));

        Ok(Self {
            _instance: instance,
            limits,
            surface,
            device,
            queue,
            config,
            size,
            particle_pipeline,
            texture_layout,
            uniform_buffer,
            uniform_bind_group,
            uniforms,
            displacement,
            overlay,
            start_time: Instant::now(),
            frame_count: 0,
            frames_since_log: 0,
            last_log_time: Instant::now(),
            debug,
        })
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    /// Reconfigures the swapchain to the capped render extent.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        let max_dimension = self.limits.max_texture_dimension_2d;
        if new_size.width > max_dimension || new_size.height > max_dimension {
            tracing::warn!(
                width = new_size.width,
                height = new_size.height,
                max_dimension,
                "requested extent exceeds GPU limits; keeping previous size"
            );
            return;
        }
        self.size = new_size;
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);
        self.uniforms
            .set_resolution(new_size.width as f32, new_size.height as f32);
    }

    /// Matches the displacement texture to a new layout's buffer size,
    /// recreating it (and the overlay binding) only when it changed.
    pub fn ensure_displacement(&mut self, width: u32, height: u32) {
        if self.displacement.width == width && self.displacement.height == height {
            return;
        }
        self.displacement = DisplacementTexture::new(&self.device, width, height);
        if let Some(overlay) = self.overlay.as_mut() {
            overlay.rebind(&self.device, &self.displacement);
        }
    }

    /// Pushes this frame's trail content to the GPU. Called every frame,
    /// dirty or not — the buffer mutates every frame regardless.
    pub fn upload_displacement(&self, texels: &[u8]) {
        self.displacement.upload(&self.queue, texels);
    }

    /// Builds the per-image GPU bundle against this state's layouts.
    pub fn create_field(&self, layout: FieldLayout, rgba: &RgbaImage) -> SceneField {
        SceneField::new(
            &self.device,
            &self.queue,
            layout,
            rgba,
            &self.texture_layout,
            &self.displacement.view,
            &self.displacement.sampler,
        )
    }

    /// Advances the clock and camera uniforms and mirrors them to the GPU.
    pub fn update_uniforms(&mut self, view_proj: Mat4, particle_size: f32) {
        let now = Instant::now();
        if self.frame_count == 0 {
            self.start_time = now;
            self.last_log_time = now;
        }
        self.uniforms.set_view_proj(view_proj);
        self.uniforms.set_particle_size(particle_size);
        self.uniforms
            .set_time(now.duration_since(self.start_time).as_secs_f32());
        self.frame_count = self.frame_count.saturating_add(1);
        self.frames_since_log += 1;
        self.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&self.uniforms));

        let since_log = now.duration_since(self.last_log_time);
        if since_log >= Duration::from_secs(1) {
            let fps = f64::from(self.frames_since_log) / since_log.as_secs_f64();
            let frame_ms = since_log.as_secs_f64() * 1000.0 / f64::from(self.frames_since_log.max(1));
            if self.debug {
                tracing::info!(fps, frame_ms, "frame timing");
            } else {
                tracing::debug!(fps, "frame timing");
            }
            self.frames_since_log = 0;
            self.last_log_time = now;
        }
    }

    /// Records and submits one frame: clear, particle draw, debug overlay.
    pub fn render_frame(&mut self, field: Option<&SceneField>) -> Result<(), wgpu::SurfaceError> {
        let frame = self.surface.get_current_texture()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("render encoder"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("render pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            if let Some(field) = field {
                pass.set_pipeline(&self.particle_pipeline);
                pass.set_bind_group(0, &self.uniform_bind_group, &[]);
                field.draw(&mut pass);
            }

            if let Some(overlay) = self.overlay.as_ref() {
                let width = self.displacement.width * OVERLAY_SCALE;
                let height = self.displacement.height * OVERLAY_SCALE;
                if width + OVERLAY_MARGIN < self.size.width
                    && height + OVERLAY_MARGIN < self.size.height
                {
                    pass.set_viewport(
                        OVERLAY_MARGIN as f32,
                        OVERLAY_MARGIN as f32,
                        width as f32,
                        height as f32,
                        0.0,
                        1.0,
                    );
                    pass.set_pipeline(&overlay.pipeline);
                    pass.set_bind_group(0, &overlay.bind_group, &[]);
                    pass.draw(0..3, 0..1);
                }
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }
}

/// The single-channel trail texture the particle shader samples.
struct DisplacementTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    sampler: wgpu::Sampler,
    width: u32,
    height: u32,
}

impl DisplacementTexture {
    fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("displacement texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::R8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        Self {
            texture,
            view,
            sampler,
            width,
            height,
        }
    }

    fn upload(&self, queue: &wgpu::Queue, texels: &[u8]) {
        debug_assert_eq!(texels.len() as u32, self.width * self.height);
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            texels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(self.width),
                rows_per_image: Some(self.height),
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
    }
}

/// Debug pipeline blitting the raw displacement buffer into a corner.
struct OverlayPipeline {
    pipeline: wgpu::RenderPipeline,
    layout: wgpu::BindGroupLayout,
    bind_group: wgpu::BindGroup,
}

impl OverlayPipeline {
    fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        displacement: &DisplacementTexture,
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("overlay shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/overlay.wgsl").into()),
        });

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("overlay layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("overlay pipeline layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("overlay pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview: None,
            cache: None,
        });

        let bind_group = Self::build_bind_group(device, &layout, displacement);
        Self {
            pipeline,
            layout,
            bind_group,
        }
    }

    /// Points the overlay at a freshly created displacement texture.
    fn rebind(&mut self, device: &wgpu::Device, displacement: &DisplacementTexture) {
        self.bind_group = Self::build_bind_group(device, &self.layout, displacement);
    }

    fn build_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        displacement: &DisplacementTexture,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("overlay bind group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&displacement.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&displacement.sampler),
                },
            ],
        })
    }
}
