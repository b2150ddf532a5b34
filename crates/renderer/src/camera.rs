use std::f32::consts::{FRAC_PI_2, PI};

use glam::{Mat4, Vec3};

/// Vertical field of view of the viewer camera, in degrees.
const FOV_Y_DEGREES: f32 = 35.0;

/// Damped orbit camera circling the origin.
///
/// Input nudges a target spherical coordinate; `update` eases the actual
/// coordinate toward it each frame, giving the drag a soft tail instead of
/// snapping.
#[derive(Debug, Clone, Copy)]
pub(crate) struct OrbitCamera {
    radius: f32,
    theta: f32,
    phi: f32,
    target_radius: f32,
    target_theta: f32,
    target_phi: f32,
    min_radius: f32,
    max_radius: f32,
    damping: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        // Matches the startup framing: eye on +Z, 18 units out.
        let radius = 18.0;
        Self {
            radius,
            theta: 0.0,
            phi: FRAC_PI_2,
            target_radius: radius,
            target_theta: 0.0,
            target_phi: FRAC_PI_2,
            min_radius: 4.0,
            max_radius: 60.0,
            damping: 0.12,
        }
    }
}

impl OrbitCamera {
    pub fn new() -> Self {
        Self::default()
    }

    /// Nudges the orbit target by drag deltas in radians.
    pub fn rotate(&mut self, delta_theta: f32, delta_phi: f32) {
        self.target_theta += delta_theta;
        // Keep away from the poles so the view basis stays well defined.
        self.target_phi = (self.target_phi + delta_phi).clamp(0.05, PI - 0.05);
    }

    /// Moves the orbit distance; positive steps zoom in.
    pub fn zoom(&mut self, steps: f32) {
        self.target_radius =
            (self.target_radius * (1.0 - steps * 0.1)).clamp(self.min_radius, self.max_radius);
    }

    /// Eases the live coordinate toward its target. Call once per frame.
    pub fn update(&mut self) {
        self.radius += (self.target_radius - self.radius) * self.damping;
        self.theta += (self.target_theta - self.theta) * self.damping;
        self.phi += (self.target_phi - self.phi) * self.damping;
    }

    pub fn eye(&self) -> Vec3 {
        Vec3::new(
            self.radius * self.phi.sin() * self.theta.sin(),
            self.radius * self.phi.cos(),
            self.radius * self.phi.sin() * self.theta.cos(),
        )
    }

    pub fn view_proj(&self, aspect: f32) -> Mat4 {
        let view = Mat4::look_at_rh(self.eye(), Vec3::ZERO, Vec3::Y);
        let proj = Mat4::perspective_rh(FOV_Y_DEGREES.to_radians(), aspect.max(0.01), 0.1, 100.0);
        proj * view
    }
}
