use bytemuck::{Pod, Zeroable};
use image::RgbaImage;
use wgpu::util::{DeviceExt, TextureDataOrder};

use trail::{particle_seeds, FieldLayout, ReferenceSurface};

/// Per-instance vertex data: one record per grid point, expanded to a
/// billboard quad in the vertex stage.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct ParticleInstance {
    position: [f32; 2],
    uv: [f32; 2],
    intensity: f32,
    angle: f32,
}

impl ParticleInstance {
    const ATTRIBUTES: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
        0 => Float32x2,
        1 => Float32x2,
        2 => Float32,
        3 => Float32,
    ];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<ParticleInstance>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

pub(crate) fn instance_buffer_layout() -> wgpu::VertexBufferLayout<'static> {
    ParticleInstance::layout()
}

/// GPU resources for one loaded image: the particle instances, the picture
/// texture, and the invisible raycast surface they share.
///
/// The whole bundle is created together and released together; dropping a
/// `SceneField` frees every GPU object it owns, which is what makes the
/// release-then-create slot ordering meaningful.
pub(crate) struct SceneField {
    pub layout: FieldLayout,
    pub surface: ReferenceSurface,
    particle_count: u32,
    instance_buffer: wgpu::Buffer,
    _picture: wgpu::Texture,
    texture_bind_group: wgpu::BindGroup,
}

impl SceneField {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: FieldLayout,
        rgba: &RgbaImage,
        texture_layout: &wgpu::BindGroupLayout,
        displacement_view: &wgpu::TextureView,
        displacement_sampler: &wgpu::Sampler,
    ) -> Self {
        let seeds = particle_seeds(&layout, &mut rand::thread_rng());
        let instances: Vec<ParticleInstance> = seeds
            .iter()
            .map(|seed| ParticleInstance {
                position: seed.position,
                uv: seed.uv,
                intensity: seed.intensity,
                angle: seed.angle,
            })
            .collect();

        let instance_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("particle instances"),
            contents: bytemuck::cast_slice(&instances),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let (width, height) = rgba.dimensions();
        let picture = device.create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label: Some("picture texture"),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8UnormSrgb,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            TextureDataOrder::LayerMajor,
            rgba.as_raw(),
        );
        let picture_view = picture.create_view(&wgpu::TextureViewDescriptor::default());
        let picture_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let texture_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("field texture bind group"),
            layout: texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&picture_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&picture_sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(displacement_view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(displacement_sampler),
                },
            ],
        });

        tracing::info!(
            segments = layout.segments,
            particles = layout.particle_count(),
            buffer_width = layout.buffer_width,
            "built particle field"
        );

        Self {
            layout,
            surface: ReferenceSurface::new(layout.plane_width, layout.plane_height),
            particle_count: layout.particle_count(),
            instance_buffer,
            _picture: picture,
            texture_bind_group,
        }
    }

    /// Records the field's draw into an open render pass. The particle
    /// pipeline and uniform bind group must already be set.
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_bind_group(1, &self.texture_bind_group, &[]);
        pass.set_vertex_buffer(0, self.instance_buffer.slice(..));
        pass.draw(0..6, 0..self.particle_count);
    }
}
