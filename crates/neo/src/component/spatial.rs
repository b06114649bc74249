use glam::{EulerRot, Mat3, Mat4, Vec3};

/// Position, scale and orientation of a game object.
///
/// The orientation is kept as an orthonormal basis (`U` right, `V` up,
/// `W` backwards) rather than a quaternion, because most of what reads it
/// wants the axes directly: cameras look down `-W`, the controller moves
/// along `U`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialComponent {
    pub position: Vec3,
    pub scale: Vec3,
    pub orientation: Mat3,
}

impl SpatialComponent {
    pub fn new(position: Vec3, scale: Vec3) -> Self {
        Self {
            position,
            scale,
            orientation: Mat3::IDENTITY,
        }
    }

    pub fn at(position: Vec3) -> Self {
        Self::new(position, Vec3::ONE)
    }

    /// Rotates by Euler angles in radians, applied X, then Y, then Z.
    pub fn with_rotation(mut self, euler: Vec3) -> Self {
        self.orientation = Mat3::from_euler(EulerRot::XYZ, euler.x, euler.y, euler.z);
        self
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    pub fn move_by(&mut self, delta: Vec3) {
        self.position += delta;
    }

    pub fn set_scale(&mut self, scale: Vec3) {
        self.scale = scale;
    }

    pub fn set_orientation(&mut self, orientation: Mat3) {
        self.orientation = orientation;
    }

    pub fn rotate(&mut self, rotation: Mat3) {
        self.orientation = rotation * self.orientation;
    }

    pub fn u_vec(&self) -> Vec3 {
        self.orientation.x_axis
    }

    pub fn v_vec(&self) -> Vec3 {
        self.orientation.y_axis
    }

    pub fn w_vec(&self) -> Vec3 {
        self.orientation.z_axis
    }

    pub fn look_dir(&self) -> Vec3 {
        -self.orientation.z_axis.normalize_or_zero()
    }

    /// Points `-W` along `dir` and rebuilds `U` and `V` against world up.
    /// Looking straight up or down falls back to +Z as the reference.
    pub fn set_look_dir(&mut self, dir: Vec3) {
        let Some(forward) = dir.try_normalize() else {
            return;
        };
        let w = -forward;
        let reference = if w.cross(Vec3::Y).length_squared() < 1e-6 {
            Vec3::Z
        } else {
            Vec3::Y
        };
        let u = reference.cross(w).normalize();
        let v = w.cross(u);
        self.orientation = Mat3::from_cols(u, v, w);
    }

    /// `T · R · S`.
    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_translation(self.position)
            * Mat4::from_mat3(self.orientation)
            * Mat4::from_scale(self.scale)
    }

    /// Inverse transpose of the model's upper 3×3, for transforming normals
    /// under non-uniform scale.
    pub fn normal_matrix(&self) -> Mat3 {
        (self.orientation * Mat3::from_diagonal(self.scale))
            .inverse()
            .transpose()
    }

    pub fn max_scale(&self) -> f32 {
        self.scale.max_element()
    }
}

impl Default for SpatialComponent {
    fn default() -> Self {
        Self::new(Vec3::ZERO, Vec3::ONE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_looks_down_negative_z() {
        let s = SpatialComponent::default();
        assert_eq!(s.look_dir(), Vec3::NEG_Z);
    }

    #[test]
    fn set_look_dir_builds_orthonormal_basis() {
        let mut s = SpatialComponent::default();
        s.set_look_dir(Vec3::new(1.0, -1.0, 0.5));
        let expected = Vec3::new(1.0, -1.0, 0.5).normalize();
        assert!(s.look_dir().abs_diff_eq(expected, 1e-5));
        assert!(s.u_vec().dot(s.v_vec()).abs() < 1e-5);
        assert!(s.u_vec().dot(s.w_vec()).abs() < 1e-5);
        assert!((s.u_vec().length() - 1.0).abs() < 1e-5);
        assert!(s.v_vec().y > 0.0);
    }

    #[test]
    fn straight_down_does_not_degenerate() {
        let mut s = SpatialComponent::default();
        s.set_look_dir(Vec3::NEG_Y);
        assert!(s.look_dir().abs_diff_eq(Vec3::NEG_Y, 1e-5));
        assert!(s.u_vec().is_finite());
        assert!((s.u_vec().length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn zero_look_dir_is_ignored() {
        let mut s = SpatialComponent::default();
        s.set_look_dir(Vec3::ZERO);
        assert_eq!(s.orientation, Mat3::IDENTITY);
    }

    #[test]
    fn model_matrix_scales_then_translates() {
        let s = SpatialComponent::new(Vec3::new(1.0, 2.0, 3.0), Vec3::splat(2.0));
        let p = s.model_matrix().transform_point3(Vec3::X);
        assert!(p.abs_diff_eq(Vec3::new(3.0, 2.0, 3.0), 1e-5));
    }

    #[test]
    fn normal_matrix_undoes_nonuniform_scale() {
        let s = SpatialComponent::new(Vec3::ZERO, Vec3::new(2.0, 1.0, 1.0));
        let n = s.normal_matrix() * Vec3::X;
        assert!(n.abs_diff_eq(Vec3::new(0.5, 0.0, 0.0), 1e-5));
        assert_eq!(s.max_scale(), 2.0);
    }

    #[test]
    fn rotation_about_x_tilts_ground_plane() {
        let s = SpatialComponent::default()
            .with_rotation(Vec3::new(-std::f32::consts::FRAC_PI_2, 0.0, 0.0));
        // A quad facing +Z ends up facing +Y.
        let normal = s.orientation * Vec3::Z;
        assert!(normal.abs_diff_eq(Vec3::Y, 1e-5));
    }
}
