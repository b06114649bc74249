use glam::Vec3;

use crate::library::MeshHandle;

/// Geometry drawn for this object, owned by the [`Library`](crate::library::Library).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshComponent(pub MeshHandle);

/// Object-space axis-aligned bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBoxComponent {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBoxComponent {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Tight bounds around `positions`. Empty input gives a degenerate box
    /// at the origin.
    pub fn from_positions(positions: &[Vec3]) -> Self {
        let Some(&first) = positions.first() else {
            return Self::new(Vec3::ZERO, Vec3::ZERO);
        };
        let (min, max) = positions
            .iter()
            .fold((first, first), |(min, max), &p| (min.min(p), max.max(p)));
        Self { min, max }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn extents(&self) -> Vec3 {
        self.max - self.min
    }

    /// Radius of a sphere around the object-space origin enclosing the box.
    pub fn radius(&self) -> f32 {
        self.min.abs().max(self.max.abs()).length()
    }

    pub fn contains(&self, local_point: Vec3) -> bool {
        local_point.cmpge(self.min).all() && local_point.cmple(self.max).all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_cover_all_points() {
        let b = BoundingBoxComponent::from_positions(&[
            Vec3::new(-1.0, 0.0, 2.0),
            Vec3::new(3.0, -2.0, 0.0),
            Vec3::new(0.0, 1.0, -1.0),
        ]);
        assert_eq!(b.min, Vec3::new(-1.0, -2.0, -1.0));
        assert_eq!(b.max, Vec3::new(3.0, 1.0, 2.0));
        assert_eq!(b.center(), Vec3::new(1.0, -0.5, 0.5));
        assert!(b.contains(Vec3::ZERO));
        assert!(!b.contains(Vec3::new(3.5, 0.0, 0.0)));
    }

    #[test]
    fn radius_uses_farthest_corner() {
        let b = BoundingBoxComponent::new(Vec3::splat(-1.0), Vec3::new(2.0, 0.0, 0.0));
        // (2, -1, -1) is the corner farthest from the origin.
        assert!((b.radius() - 6f32.sqrt()).abs() < 1e-6);
    }

    #[test]
    fn empty_positions_give_point_box() {
        let b = BoundingBoxComponent::from_positions(&[]);
        assert_eq!(b.extents(), Vec3::ZERO);
        assert_eq!(b.radius(), 0.0);
    }
}
