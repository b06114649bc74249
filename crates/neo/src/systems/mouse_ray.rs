use glam::{Vec2, Vec3};

use crate::component::{
    CameraComponent, LineComponent, MainCameraComponent, MouseRayComponent, SpatialComponent,
};
use crate::ecs::{GameObject, System, World};
use crate::input::{Input, Mouse, MouseButton};
use crate::render::FrameSize;

/// Length of the debug line drawn along the ray.
const SHOWN_RAY_LENGTH: f32 = 100.0;

/// Casts a ray from the main camera through the cursor while the left
/// button is held, stored as a [`MouseRayComponent`] on the camera. The
/// component is removed when the button is released.
///
/// With `show_ray` the last ray is also drawn as a world-space line on an
/// object owned by the system, so it stays visible after the camera moves.
#[derive(Debug, Default)]
pub struct MouseRaySystem {
    pub show_ray: bool,
    line: Option<GameObject>,
}

impl MouseRaySystem {
    pub fn new(show_ray: bool) -> Self {
        Self { show_ray, line: None }
    }

    fn show(&mut self, world: &mut World, ray: MouseRayComponent) {
        let line = LineComponent::world(Vec3::new(1.0, 0.0, 0.0))
            .with_segment(ray.position, ray.point_at(SHOWN_RAY_LENGTH));
        match self.line.filter(|&go| world.is_alive(go)) {
            Some(go) => world.insert(go, line),
            None => self.line = Some(world.spawn_one(line)),
        }
    }
}

/// World-space ray through `cursor` (window pixels, origin top-left).
pub fn cursor_ray(camera: &CameraComponent, spatial: &SpatialComponent, cursor: Vec2, frame: Vec2) -> MouseRayComponent {
    let ndc = Vec2::new(
        2.0 * cursor.x / frame.x.max(1.0) - 1.0,
        1.0 - 2.0 * cursor.y / frame.y.max(1.0),
    );
    let inv = (camera.proj_matrix() * camera.view_matrix(spatial)).inverse();
    let near = inv.project_point3(ndc.extend(-1.0));
    let far = inv.project_point3(ndc.extend(1.0));
    MouseRayComponent {
        position: near,
        direction: (far - near).normalize_or_zero(),
    }
}

impl System for MouseRaySystem {
    fn name(&self) -> String {
        "MouseRay System".into()
    }

    fn update(&mut self, world: &mut World, _dt: f32) {
        let Some(camera) = world.single::<MainCameraComponent>() else {
            return;
        };
        let held = world
            .get_resource::<Input<MouseButton>>()
            .is_some_and(|b| b.pressed(MouseButton::Left));
        if !held {
            if world.has::<MouseRayComponent>(camera) {
                world.remove::<MouseRayComponent>(camera);
            }
            return;
        }

        let (Some(cam), Some(spatial)) = (
            world.get::<CameraComponent>(camera),
            world.get::<SpatialComponent>(camera),
        ) else {
            return;
        };
        let cursor = world.get_resource::<Mouse>().map_or(Vec2::ZERO, |m| m.position);
        let frame = world.get_resource::<FrameSize>().copied().unwrap_or_default().0.as_vec2();
        let ray = cursor_ray(cam, spatial, cursor, frame);

        world.insert(camera, ray);
        if self.show_ray {
            self.show(world, ray);
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::UVec2;

    use super::*;

    fn world() -> (World, GameObject) {
        let mut world = World::new();
        world.insert_resource(Input::<MouseButton>::new());
        world.insert_resource(Mouse::default());
        world.insert_resource(FrameSize(UVec2::new(800, 600)));
        let cam = world.spawn((
            SpatialComponent::at(Vec3::new(0.0, 0.0, 5.0)),
            CameraComponent::perspective(45.0, 1.0, 100.0),
            MainCameraComponent,
        ));
        (world, cam)
    }

    #[test]
    fn center_of_the_screen_looks_forward() {
        let (mut world, cam) = world();
        world.resource_mut::<Mouse>().move_to(Vec2::new(400.0, 300.0));
        world.resource_mut::<Input<MouseButton>>().press(MouseButton::Left);
        let mut system = MouseRaySystem::new(true);
        system.update(&mut world, 0.0);

        let ray = *world.get::<MouseRayComponent>(cam).unwrap();
        assert!((ray.direction - Vec3::NEG_Z).length() < 1e-4);
        assert!((ray.position - Vec3::new(0.0, 0.0, 4.0)).length() < 1e-3);

        let line = world.get::<LineComponent>(system.line.unwrap()).unwrap();
        assert_eq!(line.nodes.len(), 2);

        world.resource_mut::<Input<MouseButton>>().release(MouseButton::Left);
        system.update(&mut world, 0.0);
        assert!(!world.has::<MouseRayComponent>(cam));
        assert!(world.is_alive(system.line.unwrap()));
    }

    #[test]
    fn top_left_ray_points_up_and_left() {
        let (world, cam) = world();
        let ray = cursor_ray(
            world.get::<CameraComponent>(cam).unwrap(),
            world.get::<SpatialComponent>(cam).unwrap(),
            Vec2::ZERO,
            Vec2::new(800.0, 600.0),
        );
        assert!(ray.direction.x < 0.0 && ray.direction.y > 0.0 && ray.direction.z < 0.0);
    }
}
