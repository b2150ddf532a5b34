use bytemuck::{Pod, Zeroable};
use glam::Mat4;

/// CPU-side mirror of the particle shader's uniform block.
///
/// The layout matches the WGSL struct in `shaders/particles.wgsl` and must
/// observe std140-style alignment: the trailing pad keeps the struct a
/// multiple of 16 bytes.
#[repr(C, align(16))]
#[derive(Clone, Copy)]
pub(crate) struct FieldUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub resolution: [f32; 2],
    pub color_intensity: f32,
    pub particle_size: f32,
    pub time: f32,
    pub _padding: [f32; 3],
}

unsafe impl Zeroable for FieldUniforms {}
unsafe impl Pod for FieldUniforms {}

impl FieldUniforms {
    /// Prepares a uniform block sized to the current surface.
    pub fn new(width: u32, height: u32, color_intensity: f32, particle_size: f32) -> Self {
        Self {
            view_proj: Mat4::IDENTITY.to_cols_array_2d(),
            resolution: [width as f32, height as f32],
            color_intensity,
            particle_size,
            time: 0.0,
            _padding: [0.0; 3],
        }
    }

    /// Writes the current render extent in device pixels.
    pub fn set_resolution(&mut self, width: f32, height: f32) {
        self.resolution = [width, height];
    }

    pub fn set_view_proj(&mut self, view_proj: Mat4) {
        self.view_proj = view_proj.to_cols_array_2d();
    }

    pub fn set_particle_size(&mut self, size: f32) {
        self.particle_size = size;
    }

    pub fn set_time(&mut self, seconds: f32) {
        self.time = seconds;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_block_is_sixteen_byte_aligned() {
        assert_eq!(std::mem::size_of::<FieldUniforms>() % 16, 0);
        assert_eq!(std::mem::align_of::<FieldUniforms>(), 16);
    }

    #[test]
    fn resolution_tracks_render_extent() {
        let mut uniforms = FieldUniforms::new(1280, 720, 2.0, 0.5);
        assert_eq!(uniforms.resolution, [1280.0, 720.0]);
        uniforms.set_resolution(2560.0, 1440.0);
        assert_eq!(uniforms.resolution, [2560.0, 1440.0]);
    }
}
