//! Orbit controls: rotate the camera around a target with damped motion.

use std::f32::consts::{PI, TAU};

use crate::Vec3;
use crate::camera::Camera;

/// Keeps the camera off the poles so `look_at` never degenerates.
const POLE_EPSILON: f32 = 1e-6;

/// Spherical coordinates around the target (three.js convention:
/// `phi` measured from +Y, `theta` around +Y starting at +Z).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct Spherical {
    radius: f32,
    phi: f32,
    theta: f32,
}

impl Spherical {
    fn from_offset(offset: Vec3) -> Self {
        let radius = offset.length();
        if radius == 0.0 {
            return Self::default();
        }
        Self {
            radius,
            theta: offset.x.atan2(offset.z),
            phi: (offset.y / radius).clamp(-1.0, 1.0).acos(),
        }
    }

    fn to_offset(self) -> Vec3 {
        let sin_phi = self.phi.sin();
        Vec3::new(
            self.radius * sin_phi * self.theta.sin(),
            self.radius * self.phi.cos(),
            self.radius * sin_phi * self.theta.cos(),
        )
    }
}

#[derive(Clone, Debug)]
pub struct OrbitControls {
    pub target: Vec3,
    pub min_distance: f32,
    pub max_distance: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub enable_damping: bool,
    /// Fraction of the pending motion applied per update.
    pub damping_factor: f32,
    delta_theta: f32,
    delta_phi: f32,
    scale: f32,
}

impl Default for OrbitControls {
    fn default() -> Self {
        Self {
            target: Vec3::ZERO,
            min_distance: 0.1,
            max_distance: 1000.0,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            enable_damping: true,
            damping_factor: 0.05,
            delta_theta: 0.0,
            delta_phi: 0.0,
            scale: 1.0,
        }
    }
}

impl OrbitControls {
    /// Queue a rotation from a pointer drag measured in physical pixels.
    pub fn rotate_by_pixels(&mut self, dx: f32, dy: f32, viewport_height: f32) {
        let height = viewport_height.max(1.0);
        self.delta_theta -= TAU * dx / height * self.rotate_speed;
        self.delta_phi -= TAU * dy / height * self.rotate_speed;
    }

    /// Queue a zoom; positive `steps` move the camera closer.
    pub fn zoom(&mut self, steps: f32) {
        let factor = 0.95f32.powf(self.zoom_speed * steps.abs());
        if steps > 0.0 {
            self.scale *= factor;
        } else if steps < 0.0 {
            self.scale /= factor;
        }
    }

    /// Apply pending motion to `camera`. Returns `true` if the eye moved.
    pub fn update(&mut self, camera: &mut Camera) -> bool {
        let mut spherical = Spherical::from_offset(camera.eye - self.target);

        if self.enable_damping {
            spherical.theta += self.delta_theta * self.damping_factor;
            spherical.phi += self.delta_phi * self.damping_factor;
        } else {
            spherical.theta += self.delta_theta;
            spherical.phi += self.delta_phi;
        }
        spherical.phi = spherical.phi.clamp(POLE_EPSILON, PI - POLE_EPSILON);
        spherical.radius = (spherical.radius * self.scale).clamp(self.min_distance, self.max_distance);

        let eye = self.target + spherical.to_offset();
        let moved = eye.distance_squared(camera.eye) > 1e-12;
        camera.eye = eye;
        camera.target = self.target;

        if self.enable_damping {
            self.delta_theta *= 1.0 - self.damping_factor;
            self.delta_phi *= 1.0 - self.damping_factor;
        } else {
            self.delta_theta = 0.0;
            self.delta_phi = 0.0;
        }
        self.scale = 1.0;
        moved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_update_keeps_camera() {
        let mut camera = Camera::default();
        let mut controls = OrbitControls::default();
        assert!(!controls.update(&mut camera));
        assert!((camera.eye - Vec3::new(0.0, 0.0, 6.0)).length() < 1e-4);
    }

    #[test]
    fn rotation_preserves_distance() {
        let mut camera = Camera::default();
        let mut controls = OrbitControls {
            enable_damping: false,
            ..Default::default()
        };
        controls.rotate_by_pixels(200.0, 50.0, 720.0);
        assert!(controls.update(&mut camera));
        assert!((camera.eye.length() - 6.0).abs() < 1e-4);
    }

    #[test]
    fn damping_spreads_motion_over_frames() {
        let mut camera = Camera::default();
        let mut controls = OrbitControls::default();
        controls.rotate_by_pixels(360.0, 0.0, 720.0);
        controls.update(&mut camera);
        let first = camera.eye;
        controls.update(&mut camera);
        assert!(camera.eye.distance(first) > 0.0);
    }

    #[test]
    fn polar_angle_is_clamped() {
        let mut camera = Camera::default();
        let mut controls = OrbitControls {
            enable_damping: false,
            ..Default::default()
        };
        controls.rotate_by_pixels(0.0, 10_000.0, 100.0);
        controls.update(&mut camera);
        assert!(camera.eye.is_finite());
        assert!((camera.eye.y - 6.0).abs() < 1e-3);
        assert!(camera.eye.x.abs() < 1e-3 && camera.eye.z.abs() < 1e-3);
    }

    #[test]
    fn zoom_respects_distance_limits() {
        let mut camera = Camera::default();
        let mut controls = OrbitControls {
            enable_damping: false,
            min_distance: 2.0,
            max_distance: 8.0,
            ..Default::default()
        };
        controls.zoom(500.0);
        controls.update(&mut camera);
        assert!((camera.eye.length() - 2.0).abs() < 1e-4);

        controls.zoom(-500.0);
        controls.update(&mut camera);
        assert!((camera.eye.length() - 8.0).abs() < 1e-4);
    }
}
