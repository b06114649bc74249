//! Camera-derived volumes.
//!
//! ```text
//! CameraComponent + SpatialComponent
//!      │ P·V
//!      ├──► FrustumComponent        six planes, for culling
//!      │ inverse(P·V)
//!      └──► FrustumBoundsComponent  eight corners ──► LineComponent (12 edges)
//! ```

use crate::component::{
    CameraComponent, FrustumBoundsComponent, FrustumComponent, LineComponent, SpatialComponent,
};
use crate::ecs::{System, World};

/// Keeps every camera's [`FrustumComponent`] in step with its projection and
/// spatial.
#[derive(Debug, Default)]
pub struct FrustumSystem;

impl System for FrustumSystem {
    fn name(&self) -> String {
        "Frustum System".into()
    }

    fn update(&mut self, world: &mut World, _dt: f32) {
        world.query::<(&CameraComponent, &SpatialComponent, &mut FrustumComponent)>(
            |_, (camera, spatial, frustum)| {
                frustum.update(camera.proj_matrix() * camera.view_matrix(spatial));
            },
        );
    }
}

/// Recomputes the world-space corners of every camera carrying a
/// [`FrustumBoundsComponent`].
#[derive(Debug, Default)]
pub struct FrustumBoundsSystem;

impl System for FrustumBoundsSystem {
    fn name(&self) -> String {
        "FrustumBounds System".into()
    }

    fn update(&mut self, world: &mut World, _dt: f32) {
        world.query::<(&CameraComponent, &SpatialComponent, &mut FrustumBoundsComponent)>(
            |_, (camera, spatial, bounds)| {
                bounds.update((camera.proj_matrix() * camera.view_matrix(spatial)).inverse());
            },
        );
    }
}

/// Rewrites the [`LineComponent`] of every object with frustum bounds into
/// the volume's twelve edges, in world space.
#[derive(Debug, Default)]
pub struct FrustumToLineSystem;

impl System for FrustumToLineSystem {
    fn name(&self) -> String {
        "FrustumToLine System".into()
    }

    fn update(&mut self, world: &mut World, _dt: f32) {
        world.query::<(&FrustumBoundsComponent, &mut LineComponent)>(|_, (bounds, line)| {
            let corners = bounds.corners();
            line.world_space = true;
            line.clear();
            for (a, b) in FrustumBoundsComponent::EDGES {
                line.add_segment(corners[a], corners[b]);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use glam::{Vec2, Vec3};

    use super::*;

    fn ortho_camera(world: &mut World) -> crate::ecs::GameObject {
        world.spawn((
            SpatialComponent::at(Vec3::new(0.0, 0.0, 10.0)),
            CameraComponent::orthographic(Vec2::new(-2.0, 2.0), Vec2::new(-1.0, 1.0), 1.0, 5.0),
            FrustumComponent::default(),
            FrustumBoundsComponent::default(),
            LineComponent::new(Vec3::ONE),
        ))
    }

    #[test]
    fn planes_follow_the_camera() {
        let mut world = World::new();
        let cam = ortho_camera(&mut world);
        FrustumSystem.update(&mut world, 0.0);

        let frustum = world.get::<FrustumComponent>(cam).unwrap();
        assert!(frustum.is_in_frustum(Vec3::new(0.0, 0.0, 7.0), 0.0));
        assert!(!frustum.is_in_frustum(Vec3::new(0.0, 0.0, 0.0), 0.5));
        assert!(!frustum.is_in_frustum(Vec3::new(3.0, 0.0, 7.0), 0.5));
    }

    #[test]
    fn corners_and_edges_span_the_volume() {
        let mut world = World::new();
        let cam = ortho_camera(&mut world);
        FrustumBoundsSystem.update(&mut world, 0.0);
        FrustumToLineSystem.update(&mut world, 0.0);

        let bounds = *world.get::<FrustumBoundsComponent>(cam).unwrap();
        let near_left_bottom = bounds.corners()[0];
        let far_right_top = bounds.corners()[7];
        assert!((near_left_bottom - Vec3::new(-2.0, -1.0, 9.0)).length() < 1e-4);
        assert!((far_right_top - Vec3::new(2.0, 1.0, 5.0)).length() < 1e-4);

        let line = world.get::<LineComponent>(cam).unwrap();
        assert!(line.world_space);
        assert_eq!(line.nodes.len(), 24);
        assert_eq!(line.nodes[0], near_left_bottom);
    }
}
