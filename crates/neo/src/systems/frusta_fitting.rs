//! # Frusta Fitting: Ortho Shadow Camera from a Perspective Frustum
//!
//! Two mock cameras: one carrying [`MockPerspectiveComponent`] (the "scene"
//! camera, with a [`FrustumBoundsComponent`]) and one carrying
//! [`MockOrthoComponent`] (the shadow camera being fitted). Each frame the
//! perspective camera can be swung around, then the ortho camera is moved,
//! pointed and given bounds by one of four methods:
//!
//! | Method | Ortho position | Ortho bounds |
//! |--------|----------------|--------------|
//! | Dumb   | looks at the perspective eye from `distance` away | unchanged |
//! | Naive  | `distance` back from the frustum midpoint | cube of the corners' bounding-box diagonal |
//! | A      | `distance` back from the frustum midpoint | corners' bounding box in the ortho camera's local space |
//! | B      | `distance` back from the light-space box center | light-space box of a frustum clipped to `range` |

use glam::{Mat4, Vec2, Vec3};

use crate::component::{
    CameraComponent, FrustumBoundsComponent, MockOrthoComponent, MockPerspectiveComponent, SpatialComponent,
};
use crate::ecs::{GameObject, System, World};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FittingMethod {
    Dumb,
    #[default]
    Naive,
    A,
    B,
}

impl FittingMethod {
    pub const ALL: [FittingMethod; 4] = [Self::Dumb, Self::Naive, Self::A, Self::B];

    pub fn next(self) -> Self {
        match self {
            Self::Dumb => Self::Naive,
            Self::Naive => Self::A,
            Self::A => Self::B,
            Self::B => Self::Dumb,
        }
    }
}

#[derive(Debug)]
pub struct FrustaFittingSystem {
    pub method: FittingMethod,
    /// Swing the perspective camera around over time.
    pub update_perspective: bool,
    pub update_ortho: bool,
    elapsed: f32,
}

impl Default for FrustaFittingSystem {
    fn default() -> Self {
        Self {
            method: FittingMethod::default(),
            update_perspective: true,
            update_ortho: true,
            elapsed: 0.0,
        }
    }
}

/// Axis-aligned box grown point by point.
#[derive(Debug, Clone, Copy)]
struct Aabb {
    min: Vec3,
    max: Vec3,
}

impl Aabb {
    fn from_points(points: impl IntoIterator<Item = Vec3>) -> Self {
        points.into_iter().fold(
            Self {
                min: Vec3::splat(f32::MAX),
                max: Vec3::splat(f32::MIN),
            },
            |b, p| Self {
                min: b.min.min(p),
                max: b.max.max(p),
            },
        )
    }

    fn center(&self) -> Vec3 {
        self.min.lerp(self.max, 0.5)
    }

    fn size(&self) -> Vec3 {
        self.max - self.min
    }
}

/// The perspective camera's side of the fit.
struct Perspective {
    camera: CameraComponent,
    spatial: SpatialComponent,
    bounds: FrustumBoundsComponent,
}

impl Perspective {
    /// Point halfway between the near and far planes along the view axis.
    fn midpoint(&self) -> Vec3 {
        let look = self.spatial.look_dir();
        self.spatial.position + look * self.camera.near + look * (self.camera.far - self.camera.near) * 0.5
    }
}

/// The ortho camera's side, written back after fitting.
struct Ortho {
    camera: CameraComponent,
    spatial: SpatialComponent,
    mock: MockOrthoComponent,
}

fn method_dumb(p: &Perspective, o: &mut Ortho) {
    let target = p.spatial.position;
    o.spatial.set_look_dir(target - o.spatial.position);
    o.spatial.position = target - o.spatial.look_dir() * o.mock.distance;
}

fn method_naive(p: &Perspective, o: &mut Ortho) {
    let diagonal = Aabb::from_points(p.bounds.corners).size().length();
    let center = p.midpoint();
    let look = o.spatial.look_dir();

    o.spatial.position = center - look * o.mock.distance;
    let near_pos = center - look * diagonal * 0.5;
    let near = o.spatial.position.distance(near_pos);
    o.camera.set_near_far(near, near + diagonal);
    let half = Vec2::new(-diagonal * 0.5, diagonal * 0.5);
    o.camera.set_ortho_bounds(half, half);
}

fn method_a(p: &Perspective, o: &mut Ortho) {
    let to_local = o.spatial.model_matrix().inverse();
    let local = Aabb::from_points(p.bounds.corners.iter().map(|&c| to_local.transform_point3(c)));
    let center = p.midpoint();

    o.camera
        .set_ortho_bounds(Vec2::new(local.min.x, local.max.x), Vec2::new(local.min.y, local.max.y));
    o.spatial.position = center - o.spatial.look_dir() * o.mock.distance;

    let half_depth = local.size().z * 0.5;
    let center_dist = o.spatial.position.distance(center);
    o.camera.set_near_far(center_dist - half_depth, center_dist + half_depth);
}

fn method_b(p: &Perspective, o: &mut Ortho) {
    let light_dir = -o.spatial.look_dir();
    let up = o.spatial.v_vec();
    let world_to_light = Mat4::look_at_rh(o.spatial.position, Vec3::ZERO, up);
    let light_to_world = world_to_light.inverse();

    // Recover the scene projection's parameters (GL conventions).
    let proj = p.camera.proj_matrix();
    let aspect = proj.y_axis.y / proj.x_axis.x;
    let fov = 2.0 * (1.0 / proj.y_axis.y).atan();
    let z_near = proj.w_axis.z / (proj.z_axis.z - 1.0);
    let z_far = proj.w_axis.z / (proj.z_axis.z + 1.0);
    let z_range = o.mock.range.min(z_far - z_near);

    let clipped = Mat4::perspective_rh_gl(fov, aspect, z_near, z_near + z_range);
    let shadow_to_world = (clipped * p.camera.view_matrix(&p.spatial)).inverse();
    let light_box = Aabb::from_points(
        FrustumBoundsComponent::ndc_corners(-1.0)
            .iter()
            .map(|&ndc| world_to_light.transform_point3(shadow_to_world.project_point3(ndc))),
    );

    let center = light_to_world.transform_point3(light_box.center());
    let half = light_box.size() * 0.5;
    let eye = center + light_dir * o.mock.distance;
    o.spatial.position = eye;
    o.spatial.set_look_dir(center - eye);
    o.camera.set_ortho_bounds(Vec2::new(-half.x, half.x), Vec2::new(-half.y, half.y));
    o.camera.set_near_far(0.0, o.mock.distance + half.z);
}

fn camera_pair(world: &World, object: GameObject) -> Option<(CameraComponent, SpatialComponent)> {
    Some((
        *world.get::<CameraComponent>(object)?,
        *world.get::<SpatialComponent>(object)?,
    ))
}

impl FrustaFittingSystem {
    pub fn new(method: FittingMethod) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }
}

impl System for FrustaFittingSystem {
    fn name(&self) -> String {
        "FrustaFitting System".into()
    }

    fn update(&mut self, world: &mut World, dt: f32) {
        self.elapsed += dt;
        let (Some(ortho_go), Some(persp_go)) = (
            world.single::<MockOrthoComponent>(),
            world.single::<MockPerspectiveComponent>(),
        ) else {
            return;
        };
        let (Some((ortho_camera, ortho_spatial)), Some(_)) =
            (camera_pair(world, ortho_go), camera_pair(world, persp_go))
        else {
            return;
        };

        if self.update_perspective {
            let (f, g) = self.elapsed.sin_cos();
            if let Some(spatial) = world.get_mut::<SpatialComponent>(persp_go) {
                spatial.set_look_dir(Vec3::new(f, f / 2.0, g));
            }
        }

        if !self.update_ortho {
            return;
        }
        let Some(bounds) = world.get::<FrustumBoundsComponent>(persp_go).copied() else {
            return;
        };
        let Some((camera, spatial)) = camera_pair(world, persp_go) else {
            return;
        };
        let Some(mock) = world.get::<MockOrthoComponent>(ortho_go).copied() else {
            return;
        };

        let perspective = Perspective { camera, spatial, bounds };
        let mut ortho = Ortho {
            camera: ortho_camera,
            spatial: ortho_spatial,
            mock,
        };
        match self.method {
            FittingMethod::Dumb => method_dumb(&perspective, &mut ortho),
            FittingMethod::Naive => method_naive(&perspective, &mut ortho),
            FittingMethod::A => method_a(&perspective, &mut ortho),
            FittingMethod::B => method_b(&perspective, &mut ortho),
        }

        world.insert(ortho_go, ortho.camera);
        world.insert(ortho_go, ortho.spatial);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Projection;
    use crate::ecs::System;
    use crate::systems::FrustumBoundsSystem;

    fn setup(method: FittingMethod) -> (World, GameObject, GameObject, FrustaFittingSystem) {
        let mut world = World::new();
        let persp = world.spawn((
            SpatialComponent::at(Vec3::ZERO),
            CameraComponent::perspective(45.0, 1.0, 10.0),
            FrustumBoundsComponent::default(),
            MockPerspectiveComponent,
        ));
        let mut ortho_spatial = SpatialComponent::at(Vec3::new(0.0, 20.0, 0.0));
        ortho_spatial.set_look_dir(Vec3::new(0.0, -1.0, -0.2));
        let ortho = world.spawn((
            ortho_spatial,
            CameraComponent::orthographic(Vec2::new(-1.0, 1.0), Vec2::new(-1.0, 1.0), 0.1, 5.0),
            MockOrthoComponent::new(15.0, 8.0),
        ));
        FrustumBoundsSystem.update(&mut world, 0.0);
        let mut system = FrustaFittingSystem::new(method);
        system.update_perspective = false;
        (world, persp, ortho, system)
    }

    fn ortho_bounds(world: &World, ortho: GameObject) -> (Vec2, Vec2) {
        match world.get::<CameraComponent>(ortho).unwrap().projection {
            Projection::Orthographic { horizontal, vertical } => (horizontal, vertical),
            Projection::Perspective { .. } => panic!("ortho camera turned perspective"),
        }
    }

    #[test]
    fn dumb_points_at_the_perspective_eye() {
        let (mut world, _, ortho, mut system) = setup(FittingMethod::Dumb);
        system.update(&mut world, 0.016);
        let spatial = world.get::<SpatialComponent>(ortho).unwrap();
        assert!((spatial.position.length() - 15.0).abs() < 1e-3);
        assert!((spatial.look_dir() + spatial.position.normalize()).length() < 1e-4);
    }

    #[test]
    fn naive_uses_the_diagonal_for_every_extent() {
        let (mut world, persp, ortho, mut system) = setup(FittingMethod::Naive);
        system.update(&mut world, 0.016);

        let corners = *world.get::<FrustumBoundsComponent>(persp).unwrap();
        let diagonal = Aabb::from_points(corners.corners).size().length();
        let (h, v) = ortho_bounds(&world, ortho);
        assert!((h.y - h.x - diagonal).abs() < 1e-3);
        assert_eq!(h, v);
        let camera = world.get::<CameraComponent>(ortho).unwrap();
        assert!((camera.far - camera.near - diagonal).abs() < 1e-3);

        // Eye is `distance` back from the frustum midpoint (0, 0, -5.5).
        let spatial = world.get::<SpatialComponent>(ortho).unwrap();
        assert!((spatial.position.distance(Vec3::new(0.0, 0.0, -5.5)) - 15.0).abs() < 1e-3);
    }

    #[test]
    fn method_a_bounds_hold_the_local_corners() {
        let (mut world, _, ortho, mut system) = setup(FittingMethod::A);
        system.update(&mut world, 0.016);
        let (h, v) = ortho_bounds(&world, ortho);
        assert!(h.x < h.y && v.x < v.y);
        let camera = world.get::<CameraComponent>(ortho).unwrap();
        assert!(camera.near < 15.0 && camera.far > 15.0);
    }

    #[test]
    fn method_b_keeps_the_light_direction() {
        let (mut world, _, ortho, mut system) = setup(FittingMethod::B);
        let before = world.get::<SpatialComponent>(ortho).unwrap().look_dir();
        system.update(&mut world, 0.016);
        let spatial = world.get::<SpatialComponent>(ortho).unwrap();
        assert!((spatial.look_dir() - before).length() < 1e-3);
        let camera = world.get::<CameraComponent>(ortho).unwrap();
        assert_eq!(camera.near, 0.0);
        assert!(camera.far > 15.0);
    }

    #[test]
    fn perspective_swings_over_time() {
        let (mut world, persp, _, mut system) = setup(FittingMethod::Naive);
        system.update_perspective = true;
        system.update(&mut world, 1.0);
        let look = world.get::<SpatialComponent>(persp).unwrap().look_dir();
        let (f, g) = 1.0f32.sin_cos();
        assert!((look - Vec3::new(f, f / 2.0, g).normalize()).length() < 1e-4);
    }

    #[test]
    fn methods_cycle() {
        let mut m = FittingMethod::Dumb;
        for expected in FittingMethod::ALL.iter().cycle().skip(1).take(4) {
            m = m.next();
            assert_eq!(m, *expected);
        }
    }
}
