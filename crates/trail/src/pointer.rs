use glam::{Mat4, Vec2, Vec3};

/// Converts a pointer position in screen pixels to normalized device
/// coordinates.
///
/// Screen-space Y grows downward while clip-space Y grows upward, hence
/// the sign flip on the second component.
pub fn ndc_from_screen(position: Vec2, viewport: Vec2) -> Vec2 {
    Vec2::new(
        (position.x / viewport.x) * 2.0 - 1.0,
        -((position.y / viewport.y) * 2.0 - 1.0),
    )
}

/// Maps a surface-local UV to displacement-buffer pixel space.
///
/// UV-space V grows bottom-to-top, buffer rows run top-to-bottom, hence
/// the `1 - v` flip.
pub fn uv_to_buffer(uv: Vec2, buffer_width: u32, buffer_height: u32) -> Vec2 {
    Vec2::new(
        uv.x * buffer_width as f32,
        (1.0 - uv.y) * buffer_height as f32,
    )
}

/// A world-space picking ray.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    /// Unprojects an NDC point through the inverse view-projection matrix.
    ///
    /// Near (z = 0) and far (z = 1) clip-space points are pushed back into
    /// world space; the ray runs from the near point toward the far one.
    pub fn from_ndc(ndc: Vec2, inv_view_proj: &Mat4) -> Self {
        let near = inv_view_proj.project_point3(Vec3::new(ndc.x, ndc.y, 0.0));
        let far = inv_view_proj.project_point3(Vec3::new(ndc.x, ndc.y, 1.0));
        Self {
            origin: near,
            direction: (far - near).normalize_or_zero(),
        }
    }
}

/// Invisible raycast target sized to the active image.
///
/// A planar rectangle on the z = 0 plane, centered at the origin, spanning
/// `width` x `height` design units. It is never rendered; its only job is
/// to translate picking rays into surface UVs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceSurface {
    width: f32,
    height: f32,
}

impl ReferenceSurface {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    /// Intersects a ray with the surface rectangle.
    ///
    /// Returns the surface UV in [0,1]x[0,1] on a hit. A miss (parallel
    /// ray, intersection behind the origin, or a hit outside the
    /// rectangle) returns `None`; callers treat that as a normal outcome
    /// and leave the cursor untouched.
    pub fn intersect(&self, ray: &Ray) -> Option<Vec2> {
        if ray.direction.z.abs() <= f32::EPSILON {
            return None;
        }
        let t = -ray.origin.z / ray.direction.z;
        if t < 0.0 {
            return None;
        }
        let hit = ray.origin + ray.direction * t;
        let u = hit.x / self.width + 0.5;
        let v = hit.y / self.height + 0.5;
        if !(0.0..=1.0).contains(&u) || !(0.0..=1.0).contains(&v) {
            return None;
        }
        Some(Vec2::new(u, v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewer_inverse(eye_z: f32, aspect: f32) -> Mat4 {
        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, eye_z), Vec3::ZERO, Vec3::Y);
        let proj = Mat4::perspective_rh(35.0_f32.to_radians(), aspect, 0.1, 100.0);
        (proj * view).inverse()
    }

    #[test]
    fn viewport_center_maps_to_ndc_origin() {
        let ndc = ndc_from_screen(Vec2::new(640.0, 360.0), Vec2::new(1280.0, 720.0));
        assert!(ndc.x.abs() < 1e-6);
        assert!(ndc.y.abs() < 1e-6);
    }

    #[test]
    fn screen_corners_map_to_ndc_extremes() {
        let viewport = Vec2::new(800.0, 600.0);
        let top_left = ndc_from_screen(Vec2::ZERO, viewport);
        assert_eq!(top_left, Vec2::new(-1.0, 1.0));
        let bottom_right = ndc_from_screen(viewport, viewport);
        assert_eq!(bottom_right, Vec2::new(1.0, -1.0));
    }

    #[test]
    fn center_ray_hits_surface_center() {
        let inv = viewer_inverse(18.0, 16.0 / 9.0);
        let ray = Ray::from_ndc(Vec2::ZERO, &inv);
        let surface = ReferenceSurface::new(16.0, 9.0);
        let uv = surface.intersect(&ray).expect("center ray must hit");
        assert!((uv.x - 0.5).abs() < 1e-4);
        assert!((uv.y - 0.5).abs() < 1e-4);
    }

    #[test]
    fn ray_outside_surface_misses() {
        let inv = viewer_inverse(18.0, 16.0 / 9.0);
        // Far off toward the upper-right corner of the viewport; the plane
        // only covers part of the frustum at this distance.
        let ray = Ray::from_ndc(Vec2::new(0.99, 0.99), &inv);
        let surface = ReferenceSurface::new(2.0, 2.0);
        assert!(surface.intersect(&ray).is_none());
    }

    #[test]
    fn parallel_ray_misses() {
        let ray = Ray {
            origin: Vec3::new(0.0, 0.0, 5.0),
            direction: Vec3::X,
        };
        let surface = ReferenceSurface::new(16.0, 9.0);
        assert!(surface.intersect(&ray).is_none());
    }

    #[test]
    fn intersection_behind_ray_misses() {
        let ray = Ray {
            origin: Vec3::new(0.0, 0.0, 5.0),
            direction: Vec3::Z,
        };
        let surface = ReferenceSurface::new(16.0, 9.0);
        assert!(surface.intersect(&ray).is_none());
    }

    #[test]
    fn buffer_mapping_inverts_v() {
        let top_left = uv_to_buffer(Vec2::new(0.0, 1.0), 256, 128);
        assert_eq!(top_left, Vec2::new(0.0, 0.0));
        let bottom_right = uv_to_buffer(Vec2::new(1.0, 0.0), 256, 128);
        assert_eq!(bottom_right, Vec2::new(256.0, 128.0));
        let center = uv_to_buffer(Vec2::new(0.5, 0.5), 256, 128);
        assert_eq!(center, Vec2::new(128.0, 64.0));
    }
}
