//! Core types: math re-exports, Transform, Camera, orbit controls, frame clock
//! and the live-tunable parameter set shared by the renderer and the panel.

pub use glam::{Mat3, Mat4, Quat, Vec3, vec3};

pub mod camera;
pub mod clock;
pub mod error;
pub mod orbit;
pub mod params;
pub mod transform;

pub use error::{CoreError, CoreResult};
pub use params::{PanelParams, Param};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_transform_is_identity_matrix() {
        let t = transform::Transform::identity();
        assert_eq!(t.matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn model_placement_matrix() {
        let t = transform::Transform::from_translation_scale(vec3(0.0, -2.0, 0.0), 0.3);
        let m = t.matrix().to_cols_array();
        assert!((m[13] + 2.0).abs() < 1e-6);
        assert!((m[0] - 0.3).abs() < 1e-6);
        assert!((m[5] - 0.3).abs() < 1e-6);
        assert!((m[10] - 0.3).abs() < 1e-6);
    }

    #[test]
    fn normal_matrix_undoes_non_uniform_scale() {
        let t = transform::Transform::from_trs(Vec3::ZERO, Quat::IDENTITY, vec3(2.0, 1.0, 1.0));
        let n = t.normal_matrix().transform_vector3(Vec3::X);
        assert!((n.x - 0.5).abs() < 1e-6);
    }

    #[test]
    fn rotated_normal_matrix_stays_orthonormal() {
        let rot = Quat::from_rotation_y(std::f32::consts::FRAC_PI_2);
        let t = transform::Transform::from_trs(vec3(1.0, 2.0, 3.0), rot, Vec3::ONE);
        let n = t.normal_matrix().transform_vector3(Vec3::Z);
        assert!((n - Vec3::X).length() < 1e-6);
    }

    #[test]
    fn camera_pv_is_finite() {
        let cam = camera::Camera::default().with_aspect(16.0 / 9.0);
        let pv = cam.proj_view();
        let a = pv.to_cols_array();
        assert!(a.iter().all(|f| f.is_finite()));
    }

    #[test]
    fn camera_zero_aspect_stays_finite() {
        let cam = camera::Camera::default().with_aspect(0.0);
        assert!(cam.proj().to_cols_array().iter().all(|f| f.is_finite()));
    }
}
