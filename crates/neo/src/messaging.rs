//! # Messenger: Deferred Notifications
//!
//! Loose coupling between pieces that do not know about each other: the
//! window announces a new frame size, the renderer resizes its framebuffers;
//! the selecting system marks an object, a demo reacts.
//!
//! ```text
//! frame N     send(msg) ──► queue
//! frame N+1   relay(world): queue ──► receivers(&mut World, &msg)
//!                              └─ send() inside a receiver ──► frame N+2
//! ```
//!
//! Messages are plain `'static` values. A message sent with
//! [`Messenger::send`] reaches every global receiver for its type; one sent
//! with [`Messenger::send_to`] reaches only the receivers registered for that
//! game object. Messages addressed to an object that has been destroyed by
//! the time of the relay are dropped.

use std::any::{Any, TypeId};
use std::collections::HashMap;

use glam::{UVec2, Vec3};

use crate::ecs::{GameObject, World};
use crate::input::{KeyCode, MouseButton};

/// Anything that can travel through the [`Messenger`].
pub trait Message: Any + Send + Sync {}

impl<T: Any + Send + Sync> Message for T {}

type Receiver = Box<dyn FnMut(&mut World, &dyn Any)>;

struct Envelope {
    target: Option<GameObject>,
    type_id: TypeId,
    payload: Box<dyn Any>,
}

/// Message queue and receiver registry. Lives in the world as a resource.
#[derive(Default)]
pub struct Messenger {
    queue: Vec<Envelope>,
    global: HashMap<TypeId, Vec<Receiver>>,
    per_object: HashMap<(GameObject, TypeId), Vec<Receiver>>,
}

impl Messenger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `msg` for every global receiver of `M`.
    pub fn send<M: Message>(&mut self, msg: M) {
        self.queue.push(Envelope {
            target: None,
            type_id: TypeId::of::<M>(),
            payload: Box::new(msg),
        });
    }

    /// Queues `msg` for the receivers registered on `target`.
    pub fn send_to<M: Message>(&mut self, target: GameObject, msg: M) {
        self.queue.push(Envelope {
            target: Some(target),
            type_id: TypeId::of::<M>(),
            payload: Box::new(msg),
        });
    }

    pub fn add_receiver<M: Message>(&mut self, mut f: impl FnMut(&mut World, &M) + 'static) {
        self.global
            .entry(TypeId::of::<M>())
            .or_default()
            .push(Box::new(move |world, any| {
                if let Some(msg) = any.downcast_ref::<M>() {
                    f(world, msg);
                }
            }));
    }

    pub fn add_receiver_for<M: Message>(
        &mut self,
        object: GameObject,
        mut f: impl FnMut(&mut World, &M) + 'static,
    ) {
        self.per_object
            .entry((object, TypeId::of::<M>()))
            .or_default()
            .push(Box::new(move |world, any| {
                if let Some(msg) = any.downcast_ref::<M>() {
                    f(world, msg);
                }
            }));
    }

    /// Drops every receiver registered on `object`.
    pub fn remove_receivers(&mut self, object: GameObject) {
        self.per_object.retain(|(go, _), _| *go != object);
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn receiver_count(&self) -> usize {
        self.global.values().map(Vec::len).sum::<usize>()
            + self.per_object.values().map(Vec::len).sum::<usize>()
    }

    /// Delivers every message queued so far, in send order. Returns the
    /// number of messages delivered.
    ///
    /// The world's messenger is swapped for an empty one while receivers run,
    /// so receivers may send messages and register receivers freely; both are
    /// merged back afterwards and take effect from the next relay.
    pub fn relay(world: &mut World) -> usize {
        let Some(mut messenger) = world.resource_remove::<Messenger>() else {
            return 0;
        };
        world.insert_resource(Messenger::new());

        let queue = std::mem::take(&mut messenger.queue);
        let mut delivered = 0;
        for envelope in &queue {
            let receivers = match envelope.target {
                Some(target) if !world.is_alive(target) => {
                    log::trace!("dropping message for destroyed {target}");
                    continue;
                }
                Some(target) => messenger.per_object.get_mut(&(target, envelope.type_id)),
                None => messenger.global.get_mut(&envelope.type_id),
            };
            if let Some(receivers) = receivers {
                for receiver in receivers.iter_mut() {
                    receiver(world, envelope.payload.as_ref());
                }
            }
            delivered += 1;
        }

        if let Some(during) = world.resource_remove::<Messenger>() {
            messenger.merge(during);
        }
        world.insert_resource(messenger);
        delivered
    }

    fn merge(&mut self, other: Messenger) {
        self.queue.extend(other.queue);
        for (tid, receivers) in other.global {
            self.global.entry(tid).or_default().extend(receivers);
        }
        for (key, receivers) in other.per_object {
            self.per_object.entry(key).or_default().extend(receivers);
        }
    }
}

// ── Built-in Messages ────────────────────────────────────────────────────

/// The window's framebuffer changed size.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WindowFrameSizeMessage {
    pub size: UVec2,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MouseButtonMessage {
    pub button: MouseButton,
    pub pressed: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KeyMessage {
    pub key: KeyCode,
    pub pressed: bool,
}

/// Sent to an object when the selecting system picks it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ComponentSelectedMessage {
    /// World-space point where the mouse ray entered the object's bounds.
    pub hit: Vec3,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Ping(u32);

    fn world_with_messenger() -> World {
        let mut world = World::new();
        world.insert_resource(Messenger::new());
        world.insert_resource(Vec::<u32>::new());
        world
    }

    #[test]
    fn global_messages_arrive_in_order() {
        let mut world = world_with_messenger();
        let m = world.resource_mut::<Messenger>();
        m.add_receiver::<Ping>(|w, p| w.resource_mut::<Vec<u32>>().push(p.0));
        m.send(Ping(1));
        m.send(Ping(2));

        assert!(world.resource::<Vec<u32>>().is_empty());
        assert_eq!(Messenger::relay(&mut world), 2);
        assert_eq!(world.resource::<Vec<u32>>(), &vec![1, 2]);
        assert_eq!(world.resource::<Messenger>().pending(), 0);
    }

    #[test]
    fn targeted_messages_reach_only_their_object() {
        let mut world = world_with_messenger();
        let a = world.create_game_object();
        let b = world.create_game_object();
        let m = world.resource_mut::<Messenger>();
        m.add_receiver_for::<Ping>(a, |w, p| w.resource_mut::<Vec<u32>>().push(p.0));
        m.add_receiver_for::<Ping>(b, |w, p| w.resource_mut::<Vec<u32>>().push(p.0 * 100));
        m.send_to(a, Ping(3));

        Messenger::relay(&mut world);
        assert_eq!(world.resource::<Vec<u32>>(), &vec![3]);
    }

    #[test]
    fn messages_sent_while_relaying_wait_a_frame() {
        let mut world = world_with_messenger();
        world.resource_mut::<Messenger>().add_receiver::<Ping>(|w, p| {
            w.resource_mut::<Vec<u32>>().push(p.0);
            if p.0 < 3 {
                w.resource_mut::<Messenger>().send(Ping(p.0 + 1));
            }
        });
        world.resource_mut::<Messenger>().send(Ping(1));

        Messenger::relay(&mut world);
        assert_eq!(world.resource::<Vec<u32>>(), &vec![1]);
        assert_eq!(world.resource::<Messenger>().pending(), 1);
        Messenger::relay(&mut world);
        Messenger::relay(&mut world);
        assert_eq!(world.resource::<Vec<u32>>(), &vec![1, 2, 3]);
    }

    #[test]
    fn destroyed_targets_are_skipped() {
        let mut world = world_with_messenger();
        let go = world.create_game_object();
        let m = world.resource_mut::<Messenger>();
        m.add_receiver_for::<Ping>(go, |w, p| w.resource_mut::<Vec<u32>>().push(p.0));
        m.send_to(go, Ping(9));
        world.destroy(go);

        assert_eq!(Messenger::relay(&mut world), 0);
        assert!(world.resource::<Vec<u32>>().is_empty());
    }

    #[test]
    fn remove_receivers_drops_object_entries() {
        let mut messenger = Messenger::new();
        let mut world = World::new();
        let go = world.create_game_object();
        messenger.add_receiver_for::<Ping>(go, |_, _| {});
        messenger.add_receiver::<Ping>(|_, _| {});
        assert_eq!(messenger.receiver_count(), 2);
        messenger.remove_receivers(go);
        assert_eq!(messenger.receiver_count(), 1);
    }

    #[test]
    fn relay_without_messenger_is_a_no_op() {
        let mut world = World::new();
        assert_eq!(Messenger::relay(&mut world), 0);
    }
}
