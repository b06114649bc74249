use glam::Vec3;

/// World-space ray under the cursor while the left mouse button is held.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MouseRayComponent {
    pub position: Vec3,
    pub direction: Vec3,
}

impl MouseRayComponent {
    pub fn point_at(&self, t: f32) -> Vec3 {
        self.position + self.direction * t
    }
}

/// Marks an object the selecting system may pick.
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectableComponent;

/// Present on selected objects.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectedComponent {
    /// March point that hit the object's bounds.
    pub hit: Vec3,
}
