use glam::{Mat4, Vec2, Vec3};

use super::spatial::SpatialComponent;

/// Projection of a [`CameraComponent`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    /// Vertical field of view in degrees, width / height.
    Perspective { fov_deg: f32, aspect: f32 },
    /// Left/right and bottom/top extents in view space.
    Orthographic { horizontal: Vec2, vertical: Vec2 },
}

/// A camera. Pair with a [`SpatialComponent`], which supplies the eye
/// position and view basis.
///
/// Projection matrices use OpenGL clip conventions (right-handed view space,
/// depth in `[-1, 1]`). Frustum extraction and unprojection throughout the
/// engine rely on that; the wgpu backend remaps depth when it submits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraComponent {
    pub near: f32,
    pub far: f32,
    pub projection: Projection,
}

impl CameraComponent {
    pub fn perspective(fov_deg: f32, near: f32, far: f32) -> Self {
        Self {
            near,
            far,
            projection: Projection::Perspective {
                fov_deg,
                aspect: 1.0,
            },
        }
    }

    pub fn orthographic(horizontal: Vec2, vertical: Vec2, near: f32, far: f32) -> Self {
        Self {
            near,
            far,
            projection: Projection::Orthographic {
                horizontal,
                vertical,
            },
        }
    }

    pub fn is_perspective(&self) -> bool {
        matches!(self.projection, Projection::Perspective { .. })
    }

    pub fn proj_matrix(&self) -> Mat4 {
        match self.projection {
            Projection::Perspective { fov_deg, aspect } => {
                Mat4::perspective_rh_gl(fov_deg.to_radians(), aspect, self.near, self.far)
            }
            Projection::Orthographic {
                horizontal,
                vertical,
            } => Mat4::orthographic_rh_gl(
                horizontal.x,
                horizontal.y,
                vertical.x,
                vertical.y,
                self.near,
                self.far,
            ),
        }
    }

    pub fn view_matrix(&self, spatial: &SpatialComponent) -> Mat4 {
        let eye = spatial.position;
        Mat4::look_at_rh(eye, eye + spatial.look_dir(), spatial.v_vec())
    }

    pub fn set_near_far(&mut self, near: f32, far: f32) {
        self.near = near;
        self.far = far;
    }

    /// Switches the camera to an orthographic projection with these extents.
    pub fn set_ortho_bounds(&mut self, horizontal: Vec2, vertical: Vec2) {
        self.projection = Projection::Orthographic {
            horizontal,
            vertical,
        };
    }

    /// No effect on orthographic cameras.
    pub fn set_aspect(&mut self, new_aspect: f32) {
        if let Projection::Perspective { aspect, .. } = &mut self.projection {
            *aspect = new_aspect;
        }
    }

    /// No effect on orthographic cameras.
    pub fn set_fov(&mut self, new_fov_deg: f32) {
        if let Projection::Perspective { fov_deg, .. } = &mut self.projection {
            *fov_deg = new_fov_deg;
        }
    }

    pub fn fov(&self) -> Option<f32> {
        match self.projection {
            Projection::Perspective { fov_deg, .. } => Some(fov_deg),
            Projection::Orthographic { .. } => None,
        }
    }
}

/// Marks the camera the renderer and input systems look through.
#[derive(Debug, Clone, Copy, Default)]
pub struct MainCameraComponent;

/// Mouse-look and fly movement for a camera.
///
/// `theta` is the yaw around world up (0 looks down -Z, increasing turns
/// toward +X) and `phi` the pitch above the horizon, both in radians. They
/// are taken from the camera's current look direction on the first update.
#[derive(Debug, Clone, Copy)]
pub struct CameraControllerComponent {
    pub look_speed: f32,
    pub move_speed: f32,
    pub theta: f32,
    pub phi: f32,
    pub(crate) synced: bool,
}

impl CameraControllerComponent {
    pub fn new(look_speed: f32, move_speed: f32) -> Self {
        Self {
            look_speed,
            move_speed,
            theta: 0.0,
            phi: 0.0,
            synced: false,
        }
    }

    pub fn look_dir(&self) -> Vec3 {
        Vec3::new(
            self.theta.sin() * self.phi.cos(),
            self.phi.sin(),
            -self.theta.cos() * self.phi.cos(),
        )
    }

    pub(crate) fn sync_from(&mut self, look: Vec3) {
        let look = look.normalize_or(Vec3::NEG_Z);
        self.theta = look.x.atan2(-look.z);
        self.phi = look.y.clamp(-1.0, 1.0).asin();
        self.synced = true;
    }
}

impl Default for CameraControllerComponent {
    fn default() -> Self {
        Self::new(0.4, 7.0)
    }
}

/// The orthographic camera being fitted by the frusta fitting system.
#[derive(Debug, Clone, Copy)]
pub struct MockOrthoComponent {
    /// How far the ortho eye is pulled back from the fitted center.
    pub distance: f32,
    /// Depth range the fitted volume is limited to.
    pub range: f32,
}

impl MockOrthoComponent {
    pub fn new(distance: f32, range: f32) -> Self {
        Self { distance, range }
    }
}

/// The perspective camera whose frustum is being fitted.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockPerspectiveComponent;

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    #[test]
    fn perspective_maps_near_plane_to_minus_one() {
        let cam = CameraComponent::perspective(45.0, 1.0, 100.0);
        let clip = cam.proj_matrix() * Vec4::new(0.0, 0.0, -1.0, 1.0);
        assert!((clip.z / clip.w + 1.0).abs() < 1e-5);
        let clip = cam.proj_matrix() * Vec4::new(0.0, 0.0, -100.0, 1.0);
        assert!((clip.z / clip.w - 1.0).abs() < 1e-4);
    }

    #[test]
    fn ortho_bounds_switch_projection() {
        let mut cam = CameraComponent::perspective(45.0, 1.0, 100.0);
        cam.set_ortho_bounds(Vec2::new(-2.0, 2.0), Vec2::new(-1.0, 1.0));
        assert!(!cam.is_perspective());
        assert_eq!(cam.fov(), None);
        let p = cam.proj_matrix().project_point3(Vec3::new(2.0, 1.0, -1.0));
        assert!((p.x - 1.0).abs() < 1e-5 && (p.y - 1.0).abs() < 1e-5);
    }

    #[test]
    fn view_matrix_puts_target_in_front() {
        let cam = CameraComponent::perspective(45.0, 1.0, 100.0);
        let spatial = SpatialComponent::at(Vec3::new(0.0, 0.0, 5.0));
        let v = cam.view_matrix(&spatial).transform_point3(Vec3::ZERO);
        assert!(v.abs_diff_eq(Vec3::new(0.0, 0.0, -5.0), 1e-5));
    }

    #[test]
    fn aspect_and_fov_only_touch_perspective() {
        let mut cam = CameraComponent::perspective(45.0, 1.0, 100.0);
        cam.set_aspect(2.0);
        cam.set_fov(60.0);
        assert_eq!(
            cam.projection,
            Projection::Perspective {
                fov_deg: 60.0,
                aspect: 2.0
            }
        );
    }

    #[test]
    fn controller_angles_round_trip_look_dir() {
        let mut ctrl = CameraControllerComponent::default();
        let look = Vec3::new(0.3, -0.4, -0.8).normalize();
        ctrl.sync_from(look);
        assert!(ctrl.look_dir().abs_diff_eq(look, 1e-5));
    }
}
