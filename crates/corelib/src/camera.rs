use crate::{Mat4, Vec3};

/// Viewer camera: a right-handed perspective looking at `target`. The eye is
/// moved by [`crate::orbit::OrbitControls`]; the aspect follows the window.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical field of view in degrees.
    pub fov_y_deg: f32,
    pub near: f32,
    pub far: f32,
    pub aspect: f32,
}

impl Camera {
    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, self.up)
    }

    /// `perspective_rh` maps depth to [0, 1], matching wgpu.
    pub fn proj(&self) -> Mat4 {
        Mat4::perspective_rh(
            self.fov_y_deg.to_radians(),
            self.aspect.max(1e-6),
            self.near,
            self.far,
        )
    }

    #[inline]
    pub fn proj_view(&self) -> Mat4 {
        self.proj() * self.view()
    }

    #[inline]
    pub fn with_aspect(mut self, aspect: f32) -> Self {
        self.aspect = aspect;
        self
    }
}

impl Default for Camera {
    /// 75° vertical FOV, six units back from the origin.
    fn default() -> Self {
        Self {
            eye: Vec3::new(0.0, 0.0, 6.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov_y_deg: 75.0,
            near: 0.1,
            far: 1000.0,
            aspect: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_projects_to_screen_centre() {
        let clip = Camera::default().proj_view() * Vec3::ZERO.extend(1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-6 && ndc.y.abs() < 1e-6);
        assert!((0.0..=1.0).contains(&ndc.z));
    }

    #[test]
    fn near_and_far_planes_map_to_unit_depth() {
        let cam = Camera::default();
        let depth = |d: f32| {
            let clip = cam.proj() * Vec3::new(0.0, 0.0, -d).extend(1.0);
            clip.z / clip.w
        };
        assert!(depth(0.1).abs() < 1e-5);
        assert!((depth(1000.0) - 1.0).abs() < 1e-5);
    }
}
