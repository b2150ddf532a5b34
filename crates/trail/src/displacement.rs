use glam::Vec2;

use crate::cursor::CursorState;

/// Per-frame opacity of the black fade pass. Empirically tuned.
pub const FADE_OPACITY: f32 = 0.02;

/// Scales stroke speed (buffer pixels per frame) into stamp opacity.
pub const SPEED_SENSITIVITY: f32 = 0.1;

/// The glow sprite's side is `buffer_width / GLOW_SIZE_DIVISOR`.
pub const GLOW_SIZE_DIVISOR: u32 = 4;

/// Tuning knobs for the accumulator. The defaults are the tuned values;
/// they are grouped here so callers can override them without touching
/// the pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tuning {
    pub fade_opacity: f32,
    pub speed_sensitivity: f32,
    pub glow_size_divisor: u32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            fade_opacity: FADE_OPACITY,
            speed_sensitivity: SPEED_SENSITIVITY,
            glow_size_divisor: GLOW_SIZE_DIVISOR,
        }
    }
}

impl Tuning {
    /// Velocity-to-opacity law: `min(distance * sensitivity, 1)`.
    ///
    /// `None` marks the first contact of a stroke, which lands at full
    /// opacity — there is no previous coordinate to damp it against.
    pub fn speed_alpha(&self, distance: Option<f32>) -> f32 {
        match distance {
            Some(d) => (d * self.speed_sensitivity).min(1.0),
            None => 1.0,
        }
    }
}

/// Persistent 2D intensity accumulator recording the pointer trail.
///
/// Each frame the whole buffer decays toward black and a radial glow is
/// composited at the cursor with a lighten blend, so overlapping strokes
/// brighten instead of darkening. Content survives image swaps; only the
/// width may change with the aspect tier, and then rows are resampled
/// rather than cleared.
#[derive(Debug, Clone)]
pub struct DisplacementBuffer {
    width: u32,
    height: u32,
    pixels: Vec<f32>,
    glow: GlowSprite,
    tuning: Tuning,
}

impl DisplacementBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_tuning(width, height, Tuning::default())
    }

    pub fn with_tuning(width: u32, height: u32, tuning: Tuning) -> Self {
        Self {
            width,
            height,
            pixels: vec![0.0; (width * height) as usize],
            glow: GlowSprite::for_buffer_width(width, tuning.glow_size_divisor),
            tuning,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[f32] {
        &self.pixels
    }

    /// Runs one frame of accumulation: fade, speed-scaled stamp, cursor
    /// rollover. Call after the pointer mapper, before texture upload.
    pub fn advance(&mut self, cursor: &mut CursorState) {
        self.fade();
        if let Some(step) = cursor.step() {
            let alpha = self.tuning.speed_alpha(step.distance);
            self.stamp(step.position, alpha);
        }
    }

    /// Adopts a new aspect tier's width, preserving existing content.
    ///
    /// Rows are resampled horizontally (nearest neighbor) when the width
    /// class changes; a same-width call leaves the pixels untouched.
    pub fn resize_width(&mut self, width: u32) {
        if width == self.width {
            return;
        }
        let mut resampled = vec![0.0; (width * self.height) as usize];
        for y in 0..self.height {
            let src_row = (y * self.width) as usize;
            let dst_row = (y * width) as usize;
            for x in 0..width {
                let src_x = (x * self.width / width).min(self.width - 1) as usize;
                resampled[dst_row + x as usize] = self.pixels[src_row + src_x];
            }
        }
        self.pixels = resampled;
        self.width = width;
        self.glow = GlowSprite::for_buffer_width(width, self.tuning.glow_size_divisor);
    }

    /// Serializes the buffer as tightly packed R8 texels for upload.
    pub fn write_r8(&self, out: &mut Vec<u8>) {
        out.clear();
        out.extend(
            self.pixels
                .iter()
                .map(|v| (v.clamp(0.0, 1.0) * 255.0) as u8),
        );
    }

    fn fade(&mut self) {
        let keep = 1.0 - self.tuning.fade_opacity;
        for pixel in &mut self.pixels {
            *pixel *= keep;
        }
    }

    fn stamp(&mut self, center: Vec2, alpha: f32) {
        if alpha <= 0.0 {
            return;
        }
        let side = self.glow.side as i32;
        let x0 = (center.x - side as f32 * 0.5).round() as i32;
        let y0 = (center.y - side as f32 * 0.5).round() as i32;
        for sy in 0..side {
            let y = y0 + sy;
            if y < 0 || y >= self.height as i32 {
                continue;
            }
            let row = (y as u32 * self.width) as usize;
            let sprite_row = (sy * side) as usize;
            for sx in 0..side {
                let x = x0 + sx;
                if x < 0 || x >= self.width as i32 {
                    continue;
                }
                let lit = self.glow.texels[sprite_row + sx as usize] * alpha;
                let pixel = &mut self.pixels[row + x as usize];
                *pixel = pixel.max(lit);
            }
        }
    }
}

/// Procedural radial glow, the mark stamped at the cursor each frame.
#[derive(Debug, Clone)]
struct GlowSprite {
    side: u32,
    texels: Vec<f32>,
}

impl GlowSprite {
    fn for_buffer_width(buffer_width: u32, divisor: u32) -> Self {
        let side = (buffer_width / divisor).max(1);
        let mut texels = Vec::with_capacity((side * side) as usize);
        let half = side as f32 * 0.5;
        for y in 0..side {
            for x in 0..side {
                let dx = (x as f32 + 0.5 - half) / half;
                let dy = (y as f32 + 0.5 - half) / half;
                let falloff = (1.0 - (dx * dx + dy * dy).sqrt()).clamp(0.0, 1.0);
                // Quadratic falloff reads as a soft glow rather than a cone.
                texels.push(falloff * falloff);
            }
        }
        Self { side, texels }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn center_pixel(buffer: &DisplacementBuffer) -> f32 {
        let x = buffer.width() / 2;
        let y = buffer.height() / 2;
        buffer.pixels[(y * buffer.width() + x) as usize]
    }

    fn stamp_center(buffer: &mut DisplacementBuffer, cursor: &mut CursorState) {
        cursor.record_hit(Vec2::new(
            buffer.width() as f32 * 0.5,
            buffer.height() as f32 * 0.5,
        ));
        buffer.advance(cursor);
    }

    #[test]
    fn speed_alpha_follows_the_clamped_law() {
        let tuning = Tuning::default();
        assert!((tuning.speed_alpha(Some(5.0)) - 0.5).abs() < 1e-6);
        assert!((tuning.speed_alpha(Some(20.0)) - 1.0).abs() < 1e-6);
        assert!((tuning.speed_alpha(Some(0.0))).abs() < 1e-6);
    }

    #[test]
    fn first_contact_stamps_at_full_opacity() {
        assert!((Tuning::default().speed_alpha(None) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn fade_scales_content_each_frame() {
        let mut buffer = DisplacementBuffer::new(128, 128);
        let mut cursor = CursorState::new();
        stamp_center(&mut buffer, &mut cursor);
        let before = center_pixel(&buffer);
        assert!(before > 0.0);

        // A miss frame only fades: no hit recorded, cursor held in place
        // contributes zero-distance (zero-alpha) stamps.
        buffer.advance(&mut cursor);
        let after = center_pixel(&buffer);
        assert!((after - before * (1.0 - FADE_OPACITY)).abs() < 1e-4);
    }

    #[test]
    fn trail_decays_monotonically_when_idle() {
        let mut buffer = DisplacementBuffer::new(128, 128);
        let mut cursor = CursorState::new();
        stamp_center(&mut buffer, &mut cursor);
        let mut last = center_pixel(&buffer);
        for _ in 0..10 {
            buffer.advance(&mut cursor);
            let value = center_pixel(&buffer);
            assert!(value < last);
            last = value;
        }
    }

    #[test]
    fn lighten_blend_never_darkens() {
        let mut buffer = DisplacementBuffer::new(128, 128);
        let mut cursor = CursorState::new();
        stamp_center(&mut buffer, &mut cursor);
        let bright = center_pixel(&buffer);

        // A slow follow-up stroke lands at low alpha; the brighter pixel
        // must win the blend (minus one frame of fade).
        cursor.record_hit(Vec2::new(
            buffer.width() as f32 * 0.5 + 1.0,
            buffer.height() as f32 * 0.5,
        ));
        buffer.advance(&mut cursor);
        assert!(center_pixel(&buffer) >= bright * (1.0 - FADE_OPACITY) - 1e-4);
    }

    #[test]
    fn stamp_off_edge_is_clipped() {
        let mut buffer = DisplacementBuffer::new(128, 128);
        let mut cursor = CursorState::new();
        cursor.record_hit(Vec2::new(0.0, 0.0));
        buffer.advance(&mut cursor);
        // Corner stamp writes the in-bounds quadrant only; no panic, and
        // something landed near the corner.
        assert!(buffer.pixels[0] >= 0.0);
        assert!(buffer.pixels.iter().any(|&p| p > 0.0));
    }

    #[test]
    fn glow_side_follows_buffer_width() {
        let buffer = DisplacementBuffer::new(256, 128);
        assert_eq!(buffer.glow.side, 64);
        let buffer = DisplacementBuffer::new(128, 128);
        assert_eq!(buffer.glow.side, 32);
    }

    #[test]
    fn same_width_resize_keeps_pixels_verbatim() {
        let mut buffer = DisplacementBuffer::new(256, 128);
        let mut cursor = CursorState::new();
        stamp_center(&mut buffer, &mut cursor);
        let before = buffer.pixels.clone();
        buffer.resize_width(256);
        assert_eq!(buffer.pixels, before);
    }

    #[test]
    fn width_change_resamples_instead_of_clearing() {
        let mut buffer = DisplacementBuffer::new(256, 128);
        let mut cursor = CursorState::new();
        stamp_center(&mut buffer, &mut cursor);
        buffer.resize_width(128);
        assert_eq!(buffer.width(), 128);
        assert_eq!(buffer.pixels.len(), 128 * 128);
        assert!(buffer.pixels.iter().any(|&p| p > 0.0));
    }

    #[test]
    fn r8_serialization_matches_pixel_count() {
        let mut buffer = DisplacementBuffer::new(128, 128);
        let mut cursor = CursorState::new();
        stamp_center(&mut buffer, &mut cursor);
        let mut texels = Vec::new();
        buffer.write_r8(&mut texels);
        assert_eq!(texels.len(), 128 * 128);
        assert!(texels.iter().any(|&t| t > 0));
    }
}
