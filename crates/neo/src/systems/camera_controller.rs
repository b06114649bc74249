use std::f32::consts::FRAC_PI_2;

use glam::Vec3;

use crate::component::{CameraComponent, CameraControllerComponent, SpatialComponent};
use crate::ecs::{System, World};
use crate::input::{Input, KeyCode, Mouse, MouseButton};

/// Pitch stays this far from straight up or down.
const PHI_LIMIT: f32 = FRAC_PI_2 - 0.01;
const MIN_FOV: f32 = 15.0;
const MAX_FOV: f32 = 120.0;
/// Degrees of field of view per scroll line.
const FOV_PER_LINE: f32 = 2.0;
const SPRINT: f32 = 3.0;

/// Fly camera for every object with a [`CameraControllerComponent`].
///
/// | Input | Effect |
/// |-------|--------|
/// | left or right drag | yaw (`theta`) and pitch (`phi`) |
/// | W / S | forward / back along the look direction |
/// | A / D | left / right |
/// | Space or E / Q or LeftCtrl | up / down along world Y |
/// | LeftShift | triple speed |
/// | scroll | field of view, 15° to 120° |
#[derive(Debug, Default)]
pub struct CameraControllerSystem;

impl CameraControllerSystem {
    pub fn new() -> Self {
        Self
    }
}

#[derive(Default)]
struct Frame {
    look: glam::Vec2,
    forward: f32,
    right: f32,
    up: f32,
    sprint: bool,
    scroll: f32,
}

fn read_input(world: &World) -> Frame {
    let mut frame = Frame::default();
    if let Some(mouse) = world.get_resource::<Mouse>() {
        frame.scroll = mouse.scroll;
        let dragging = world
            .get_resource::<Input<MouseButton>>()
            .is_some_and(|b| b.any_pressed(&[MouseButton::Left, MouseButton::Right]));
        if dragging {
            frame.look = mouse.delta;
        }
    }
    if let Some(keys) = world.get_resource::<Input<KeyCode>>() {
        let axis = |pos: &[KeyCode], neg: &[KeyCode]| {
            (keys.any_pressed(pos) as i32 - keys.any_pressed(neg) as i32) as f32
        };
        frame.forward = axis(&[KeyCode::KeyW], &[KeyCode::KeyS]);
        frame.right = axis(&[KeyCode::KeyD], &[KeyCode::KeyA]);
        frame.up = axis(&[KeyCode::Space, KeyCode::KeyE], &[KeyCode::KeyQ, KeyCode::ControlLeft]);
        frame.sprint = keys.pressed(KeyCode::ShiftLeft);
    }
    frame
}

impl System for CameraControllerSystem {
    fn name(&self) -> String {
        "CameraController System".into()
    }

    fn update(&mut self, world: &mut World, dt: f32) {
        let input = read_input(world);

        for go in world.collect::<CameraControllerComponent>() {
            let Some(look_dir) = world.get::<SpatialComponent>(go).map(SpatialComponent::look_dir) else {
                continue;
            };
            let Some(controller) = world.get_mut::<CameraControllerComponent>(go) else {
                continue;
            };
            if !controller.synced {
                controller.sync_from(look_dir);
            }
            controller.theta += input.look.x * controller.look_speed * dt;
            controller.phi = (controller.phi - input.look.y * controller.look_speed * dt).clamp(-PHI_LIMIT, PHI_LIMIT);
            let look = controller.look_dir();
            let speed = controller.move_speed * dt * if input.sprint { SPRINT } else { 1.0 };

            if let Some(spatial) = world.get_mut::<SpatialComponent>(go) {
                spatial.set_look_dir(look);
                let motion =
                    spatial.look_dir() * input.forward + spatial.u_vec() * input.right + Vec3::Y * input.up;
                if motion != Vec3::ZERO {
                    spatial.move_by(motion * speed);
                }
            }

            if input.scroll == 0.0 {
                continue;
            }
            if let Some(camera) = world.get_mut::<CameraComponent>(go) {
                if let Some(fov) = camera.fov() {
                    camera.set_fov((fov - input.scroll * FOV_PER_LINE).clamp(MIN_FOV, MAX_FOV));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec2;

    use super::*;

    fn world() -> (World, crate::ecs::GameObject) {
        let mut world = World::new();
        world.insert_resource(Input::<KeyCode>::new());
        world.insert_resource(Input::<MouseButton>::new());
        world.insert_resource(Mouse::default());
        let cam = world.spawn((
            SpatialComponent::at(Vec3::ZERO),
            CameraComponent::perspective(45.0, 1.0, 100.0),
            CameraControllerComponent::new(0.4, 7.0),
        ));
        (world, cam)
    }

    #[test]
    fn keys_move_along_the_view() {
        let (mut world, cam) = world();
        world.resource_mut::<Input<KeyCode>>().press(KeyCode::KeyW);
        CameraControllerSystem.update(&mut world, 1.0);
        let p = world.get::<SpatialComponent>(cam).unwrap().position;
        assert!((p - Vec3::new(0.0, 0.0, -7.0)).length() < 1e-4, "{p}");

        world.resource_mut::<Input<KeyCode>>().release(KeyCode::KeyW);
        world.resource_mut::<Input<KeyCode>>().press(KeyCode::Space);
        world.resource_mut::<Input<KeyCode>>().press(KeyCode::ShiftLeft);
        CameraControllerSystem.update(&mut world, 0.5);
        let p = world.get::<SpatialComponent>(cam).unwrap().position;
        assert!((p.y - 10.5).abs() < 1e-4);
    }

    #[test]
    fn drag_turns_and_pitch_is_clamped() {
        let (mut world, cam) = world();
        world.resource_mut::<Input<MouseButton>>().press(MouseButton::Right);
        world.resource_mut::<Mouse>().move_to(Vec2::new(0.0, 10_000.0));
        CameraControllerSystem.update(&mut world, 1.0);

        let controller = *world.get::<CameraControllerComponent>(cam).unwrap();
        assert_eq!(controller.phi, -PHI_LIMIT);
        let look = world.get::<SpatialComponent>(cam).unwrap().look_dir();
        assert!(look.y < -0.99);
    }

    #[test]
    fn without_a_button_the_mouse_does_not_look() {
        let (mut world, cam) = world();
        world.resource_mut::<Mouse>().move_to(Vec2::new(300.0, 0.0));
        CameraControllerSystem.update(&mut world, 1.0);
        let look = world.get::<SpatialComponent>(cam).unwrap().look_dir();
        assert!((look - Vec3::NEG_Z).length() < 1e-5);
    }

    #[test]
    fn scroll_zooms_within_limits() {
        let (mut world, cam) = world();
        world.resource_mut::<Mouse>().scroll_by(5.0);
        CameraControllerSystem.update(&mut world, 0.016);
        assert_eq!(world.get::<CameraComponent>(cam).unwrap().fov(), Some(35.0));

        world.resource_mut::<Mouse>().scroll_by(100.0);
        CameraControllerSystem.update(&mut world, 0.016);
        assert_eq!(world.get::<CameraComponent>(cam).unwrap().fov(), Some(MIN_FOV));
    }
}
