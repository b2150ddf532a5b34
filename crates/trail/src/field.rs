use std::f32::consts::TAU;

use rand::Rng;

/// Height of the reference surface in design units; width follows the
/// image aspect.
pub const BASE_PLANE_HEIGHT: f32 = 9.0;

/// Aspect boundary between the two detail tiers. Exactly 16:9 belongs to
/// the wide tier.
pub const WIDESCREEN_ASPECT: f32 = 16.0 / 9.0;

/// Displacement-buffer height, identical for both tiers.
pub const BUFFER_HEIGHT: u32 = 128;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FieldError {
    #[error("image dimensions must be non-zero, got {width}x{height}")]
    ZeroExtent { width: u32, height: u32 },
}

/// Geometry and buffer sizing derived from the active image.
///
/// Everything downstream of an image swap is a function of this value:
/// the particle grid, the reference surface, and the displacement-buffer
/// width all come from here.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldLayout {
    pub plane_width: f32,
    pub plane_height: f32,
    pub segments: u32,
    pub buffer_width: u32,
    pub buffer_height: u32,
}

impl FieldLayout {
    /// Applies the two-tier detail policy to an image's pixel dimensions.
    ///
    /// Narrow images (`aspect < 16/9`) get the dense grid and the wide
    /// buffer; widescreen and wider get the coarse grid and the narrow
    /// buffer. The boundary itself is wide-tier.
    pub fn for_image(width: u32, height: u32) -> Result<Self, FieldError> {
        if width == 0 || height == 0 {
            return Err(FieldError::ZeroExtent { width, height });
        }
        let aspect = width as f32 / height as f32;
        let narrow = aspect < WIDESCREEN_ASPECT;
        Ok(Self {
            plane_width: BASE_PLANE_HEIGHT * aspect,
            plane_height: BASE_PLANE_HEIGHT,
            segments: if narrow { 512 } else { 256 },
            buffer_width: if narrow { 256 } else { 128 },
            buffer_height: BUFFER_HEIGHT,
        })
    }

    /// Vertices in the point grid: `(segments + 1)^2`, independent of the
    /// image resolution.
    pub fn particle_count(&self) -> u32 {
        let side = self.segments + 1;
        side * side
    }
}

/// Immutable per-particle attributes, generated once at construction.
///
/// `intensity` scales how strongly the shading stage displaces the point;
/// `angle` picks the planar direction it flies toward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleSeed {
    pub position: [f32; 2],
    pub uv: [f32; 2],
    pub intensity: f32,
    pub angle: f32,
}

/// Lays out the centered point grid and rolls each seed's random
/// attributes: intensity uniform in [0,1), angle uniform in [0,2π).
pub fn particle_seeds<R: Rng>(layout: &FieldLayout, rng: &mut R) -> Vec<ParticleSeed> {
    let side = layout.segments + 1;
    let mut seeds = Vec::with_capacity((side * side) as usize);
    for row in 0..side {
        for col in 0..side {
            let u = col as f32 / layout.segments as f32;
            let v = row as f32 / layout.segments as f32;
            seeds.push(ParticleSeed {
                position: [
                    (u - 0.5) * layout.plane_width,
                    (v - 0.5) * layout.plane_height,
                ],
                uv: [u, v],
                intensity: rng.gen::<f32>(),
                angle: rng.gen::<f32>() * TAU,
            });
        }
    }
    seeds
}
