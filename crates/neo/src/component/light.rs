use glam::Vec3;

/// A point light. Its position comes from the object's
/// [`SpatialComponent`](super::SpatialComponent).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightComponent {
    pub color: Vec3,
    /// Constant, linear and quadratic falloff terms.
    pub attenuation: Vec3,
}

impl LightComponent {
    pub fn new(color: Vec3, attenuation: Vec3) -> Self {
        Self { color, attenuation }
    }

    /// Light reaching a point `distance` away.
    pub fn intensity_at(&self, distance: f32) -> f32 {
        let a = self.attenuation;
        let denom = a.x + a.y * distance + a.z * distance * distance;
        if denom > 0.0 { 1.0 / denom } else { 1.0 }
    }
}

impl Default for LightComponent {
    fn default() -> Self {
        Self::new(Vec3::ONE, Vec3::new(1.0, 0.0, 0.0))
    }
}
