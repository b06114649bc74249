//! Ray-marched picking.
//!
//! ```text
//! MouseRayComponent ──► drop stale selections (remove decider)
//!         │
//!         └─ march: t = d/n, 2d/n, ... d
//!               first selectable whose box contains inverse(M)·p ──► SelectedComponent
//!                                                                 └─► ComponentSelectedMessage
//! every frame: reset_op(unselected selectables), select_op(selected)
//! ```

use glam::Vec3;

use crate::component::{
    BoundingBoxComponent, MouseRayComponent, SelectableComponent, SelectedComponent, SpatialComponent,
};
use crate::ecs::{GameObject, System, World};
use crate::messaging::{ComponentSelectedMessage, Messenger};

type RemoveDecider = Box<dyn FnMut(&World, GameObject) -> bool>;
type ResetOp = Box<dyn FnMut(&mut World, GameObject)>;
type SelectOp = Box<dyn FnMut(&mut World, GameObject, Vec3)>;

pub struct SelectingSystem {
    /// Sample points along the ray.
    pub max_march: u32,
    /// Length of the marched part of the ray.
    pub max_distance: f32,
    remove_decider: RemoveDecider,
    reset_op: ResetOp,
    select_op: SelectOp,
}

impl SelectingSystem {
    /// Selections are kept until a decider says otherwise; both operations
    /// do nothing.
    pub fn new(max_march: u32, max_distance: f32) -> Self {
        Self {
            max_march,
            max_distance,
            remove_decider: Box::new(|_, _| false),
            reset_op: Box::new(|_, _| {}),
            select_op: Box::new(|_, _, _| {}),
        }
    }

    /// Called for every selected object while a ray exists; `true` drops
    /// its selection.
    pub fn with_remove_decider(mut self, f: impl FnMut(&World, GameObject) -> bool + 'static) -> Self {
        self.remove_decider = Box::new(f);
        self
    }

    /// Applied every frame to each selectable that is not selected.
    pub fn with_reset_op(mut self, f: impl FnMut(&mut World, GameObject) + 'static) -> Self {
        self.reset_op = Box::new(f);
        self
    }

    /// Applied every frame to each selected object with its hit point.
    pub fn with_select_op(mut self, f: impl FnMut(&mut World, GameObject, Vec3) + 'static) -> Self {
        self.select_op = Box::new(f);
        self
    }

    /// First selectable hit by marching along `ray`.
    fn march(&self, world: &World, ray: &MouseRayComponent) -> Option<(GameObject, Vec3)> {
        let candidates: Vec<_> = world
            .collect::<SelectableComponent>()
            .into_iter()
            .filter_map(|go| {
                let bounds = world.get::<BoundingBoxComponent>(go)?;
                let spatial = world.get::<SpatialComponent>(go)?;
                Some((go, *bounds, spatial.model_matrix().inverse()))
            })
            .collect();

        let steps = self.max_march.max(1);
        (1..=steps).find_map(|i| {
            let point = ray.point_at(self.max_distance * i as f32 / steps as f32);
            candidates
                .iter()
                .find(|(_, bounds, inv_model)| bounds.contains(inv_model.transform_point3(point)))
                .map(|(go, _, _)| (*go, point))
        })
    }
}

impl System for SelectingSystem {
    fn name(&self) -> String {
        "Selecting System".into()
    }

    fn update(&mut self, world: &mut World, _dt: f32) {
        let ray = world
            .collect::<MouseRayComponent>()
            .first()
            .and_then(|&go| world.get::<MouseRayComponent>(go).copied());

        if let Some(ray) = ray {
            for go in world.collect::<SelectedComponent>() {
                if (self.remove_decider)(world, go) {
                    world.remove::<SelectedComponent>(go);
                }
            }

            if let Some((go, hit)) = self.march(world, &ray) {
                if !world.has::<SelectedComponent>(go) {
                    log::debug!("selected {go:?} at {hit}");
                    if let Some(messenger) = world.get_resource_mut::<Messenger>() {
                        messenger.send_to(go, ComponentSelectedMessage { hit });
                    }
                }
                world.insert(go, SelectedComponent { hit });
            }
        }

        for go in world.collect::<SelectableComponent>() {
            if !world.has::<SelectedComponent>(go) {
                (self.reset_op)(world, go);
            }
        }
        for go in world.collect::<SelectedComponent>() {
            if let Some(hit) = world.get::<SelectedComponent>(go).map(|s| s.hit) {
                (self.select_op)(world, go, hit);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::component::MaterialComponent;

    fn selectable(world: &mut World, position: Vec3) -> GameObject {
        world.spawn((
            SpatialComponent::at(position),
            BoundingBoxComponent::new(Vec3::splat(-1.0), Vec3::splat(1.0)),
            SelectableComponent,
            MaterialComponent::diffuse(Vec3::ONE),
        ))
    }

    fn ray(world: &mut World) -> GameObject {
        world.spawn_one(MouseRayComponent {
            position: Vec3::new(0.0, 0.0, 10.0),
            direction: Vec3::NEG_Z,
        })
    }

    fn paint(system: SelectingSystem) -> SelectingSystem {
        system
            .with_reset_op(|world, go| {
                if let Some(m) = world.get_mut::<MaterialComponent>(go) {
                    m.diffuse = Vec3::ONE;
                }
            })
            .with_select_op(|world, go, _| {
                if let Some(m) = world.get_mut::<MaterialComponent>(go) {
                    m.diffuse = Vec3::X;
                }
            })
    }

    #[test]
    fn the_nearest_box_along_the_ray_is_selected() {
        let mut world = World::new();
        world.insert_resource(Messenger::new());
        let far = selectable(&mut world, Vec3::new(0.0, 0.0, -5.0));
        let near = selectable(&mut world, Vec3::new(0.0, 0.0, 2.0));
        let aside = selectable(&mut world, Vec3::new(5.0, 0.0, 0.0));
        ray(&mut world);

        let mut system = paint(SelectingSystem::new(40, 20.0));
        system.update(&mut world, 0.0);

        assert!(world.has::<SelectedComponent>(near));
        assert!(!world.has::<SelectedComponent>(far));
        let hit = world.get::<SelectedComponent>(near).unwrap().hit;
        assert!((hit.z - 3.0).abs() < 1e-4);
        assert_eq!(world.get::<MaterialComponent>(near).unwrap().diffuse, Vec3::X);
        assert_eq!(world.get::<MaterialComponent>(aside).unwrap().diffuse, Vec3::ONE);
        assert_eq!(world.resource::<Messenger>().pending(), 1);
    }

    #[test]
    fn messages_only_for_new_selections() {
        let mut world = World::new();
        world.insert_resource(Messenger::new());
        let target = selectable(&mut world, Vec3::ZERO);
        ray(&mut world);

        let received = Rc::new(RefCell::new(0));
        let counter = received.clone();
        world
            .resource_mut::<Messenger>()
            .add_receiver_for::<ComponentSelectedMessage>(target, move |_, _| *counter.borrow_mut() += 1);

        let mut system = SelectingSystem::new(20, 20.0);
        system.update(&mut world, 0.0);
        system.update(&mut world, 0.0);
        Messenger::relay(&mut world);
        assert_eq!(*received.borrow(), 1);
    }

    #[test]
    fn decider_drops_selections_and_no_ray_means_no_march() {
        let mut world = World::new();
        let a = selectable(&mut world, Vec3::ZERO);
        world.insert(a, SelectedComponent { hit: Vec3::ZERO });

        let mut system = SelectingSystem::new(10, 5.0).with_remove_decider(|_, _| true);
        system.update(&mut world, 0.0);
        assert!(world.has::<SelectedComponent>(a), "no ray, nothing changes");

        // A ray that misses everything still clears through the decider.
        world.spawn_one(MouseRayComponent {
            position: Vec3::new(50.0, 0.0, 0.0),
            direction: Vec3::X,
        });
        system.update(&mut world, 0.0);
        assert!(!world.has::<SelectedComponent>(a));
    }
}
