//! # Systems: Per-Frame Logic
//!
//! A system holds whatever state it needs (a selection list, a fitting
//! method, mouse sensitivity) and is handed the world once per frame:
//!
//! ```text
//! init(world)          once, before the first update
//! update(world, dt)    every frame while active, in insertion order
//! shutdown(world)      once, when the engine stops
//! ```
//!
//! Plain closures `FnMut(&mut World, f32)` are systems too, for the small
//! bits of per-demo logic that do not deserve a type.
//!
//! ## Schedule
//!
//! [`Schedule`] keeps systems in the order they were added. Each entry carries
//! a display name and an `active` flag, so a system can be switched off
//! without removing it. [`Schedule::get`] recovers the concrete system by
//! type, e.g. to change a
//! [`FrustaFittingSystem`](crate::systems::FrustaFittingSystem)'s method
//! between ticks.

use std::any::Any;

use super::world::{World, short_type_name};

/// Logic that runs over the [`World`] every frame.
pub trait System: 'static {
    /// Display name used for toggling and diagnostics.
    fn name(&self) -> String {
        short_system_name(std::any::type_name::<Self>())
    }

    fn init(&mut self, _world: &mut World) {}

    fn update(&mut self, world: &mut World, dt: f32);

    fn shutdown(&mut self, _world: &mut World) {}
}

impl<F: FnMut(&mut World, f32) + 'static> System for F {
    fn update(&mut self, world: &mut World, dt: f32) {
        (self)(world, dt);
    }
}

/// Object-safe access to the concrete system type.
trait SystemAny: System {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<S: System> SystemAny for S {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

struct NamedSystem {
    name: String,
    active: bool,
    system: Box<dyn SystemAny>,
}

/// Per-system timing recorded during a single frame.
#[cfg(feature = "diagnostics")]
#[derive(Clone, Debug)]
pub(crate) struct SystemTiming {
    pub name: String,
    pub active: bool,
    pub duration_us: f64,
}

/// An ordered list of systems.
pub struct Schedule {
    systems: Vec<NamedSystem>,
    /// Systems `[0, init_count)` have had `init` called.
    init_count: usize,
    /// Per-system timings from the most recent `run()` call.
    #[cfg(feature = "diagnostics")]
    pub(crate) timings: Vec<SystemTiming>,
}

impl Schedule {
    pub fn new() -> Self {
        Self {
            systems: Vec::new(),
            init_count: 0,
            #[cfg(feature = "diagnostics")]
            timings: Vec::new(),
        }
    }

    /// Appends a system. Systems added after [`init`](Self::init) are
    /// initialized on the next [`run`](Self::run).
    pub fn add_system<S: System>(&mut self, system: S) {
        let name = system.name();
        log::debug!("adding system {name}");
        self.systems.push(NamedSystem {
            name,
            active: true,
            system: Box::new(system),
        });
    }

    /// Calls `init` on every system that has not been initialized yet.
    pub fn init(&mut self, world: &mut World) {
        for ns in &mut self.systems[self.init_count..] {
            ns.system.init(world);
        }
        self.init_count = self.systems.len();
    }

    /// Runs every active system in order.
    pub fn run(&mut self, world: &mut World, dt: f32) {
        self.init(world);

        #[cfg(feature = "diagnostics")]
        {
            self.timings.clear();
            for ns in &mut self.systems {
                let start = std::time::Instant::now();
                if ns.active {
                    ns.system.update(world, dt);
                }
                self.timings.push(SystemTiming {
                    name: ns.name.clone(),
                    active: ns.active,
                    duration_us: start.elapsed().as_secs_f64() * 1_000_000.0,
                });
            }
        }
        #[cfg(not(feature = "diagnostics"))]
        {
            for ns in self.systems.iter_mut().filter(|ns| ns.active) {
                ns.system.update(world, dt);
            }
        }
    }

    pub fn shutdown(&mut self, world: &mut World) {
        for ns in self.systems.iter_mut().rev() {
            ns.system.shutdown(world);
        }
    }

    /// Enables or disables the system called `name`. Returns `false` if no
    /// such system exists.
    pub fn set_active(&mut self, name: &str, active: bool) -> bool {
        match self.systems.iter_mut().find(|ns| ns.name == name) {
            Some(ns) => {
                ns.active = active;
                true
            }
            None => false,
        }
    }

    /// Flips the active flag of `name` and returns the new state.
    pub fn toggle(&mut self, name: &str) -> Option<bool> {
        let ns = self.systems.iter_mut().find(|ns| ns.name == name)?;
        ns.active = !ns.active;
        Some(ns.active)
    }

    pub fn is_active(&self, name: &str) -> Option<bool> {
        self.systems
            .iter()
            .find(|ns| ns.name == name)
            .map(|ns| ns.active)
    }

    /// The first system of concrete type `S`.
    pub fn get<S: System>(&self) -> Option<&S> {
        self.systems
            .iter()
            .find_map(|ns| ns.system.as_any().downcast_ref::<S>())
    }

    pub fn get_mut<S: System>(&mut self) -> Option<&mut S> {
        self.systems
            .iter_mut()
            .find_map(|ns| ns.system.as_any_mut().downcast_mut::<S>())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.systems.iter().map(|ns| ns.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.systems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }
}

impl Default for Schedule {
    fn default() -> Self {
        Self::new()
    }
}

/// Strip the module path from a fully-qualified type name
/// (`neo::systems::MouseRaySystem` → `MouseRaySystem`, `{{closure}}` →
/// `<closure>`).
fn short_system_name(full: &str) -> String {
    if full.contains("{{closure}}") {
        return "<closure>".to_string();
    }
    short_type_name(full)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter {
        inits: u32,
        updates: u32,
        last_dt: f32,
    }

    impl System for Counter {
        fn init(&mut self, _world: &mut World) {
            self.inits += 1;
        }

        fn update(&mut self, _world: &mut World, dt: f32) {
            self.updates += 1;
            self.last_dt = dt;
        }
    }

    fn counter() -> Counter {
        Counter {
            inits: 0,
            updates: 0,
            last_dt: 0.0,
        }
    }

    #[test]
    fn struct_system_name() {
        let mut schedule = Schedule::new();
        schedule.add_system(counter());
        assert_eq!(schedule.names().collect::<Vec<_>>(), vec!["Counter"]);
    }

    #[test]
    fn closure_system_name() {
        let mut schedule = Schedule::new();
        schedule.add_system(|_world: &mut World, _dt: f32| {});
        assert_eq!(schedule.names().next(), Some("<closure>"));
    }

    #[test]
    fn init_runs_once_and_update_gets_dt() {
        let mut world = World::new();
        let mut schedule = Schedule::new();
        schedule.add_system(counter());
        schedule.init(&mut world);
        schedule.run(&mut world, 0.5);
        schedule.run(&mut world, 0.25);

        let c = schedule.get::<Counter>().unwrap();
        assert_eq!(c.inits, 1);
        assert_eq!(c.updates, 2);
        assert_eq!(c.last_dt, 0.25);
    }

    #[test]
    fn late_systems_are_initialized() {
        let mut world = World::new();
        let mut schedule = Schedule::new();
        schedule.add_system(|_: &mut World, _: f32| {});
        schedule.run(&mut world, 0.1);
        schedule.add_system(counter());
        schedule.run(&mut world, 0.1);
        let c = schedule.get::<Counter>().unwrap();
        assert_eq!((c.inits, c.updates), (1, 1));
    }

    #[test]
    fn inactive_systems_are_skipped() {
        let mut world = World::new();
        let mut schedule = Schedule::new();
        schedule.add_system(counter());
        assert!(schedule.set_active("Counter", false));
        schedule.run(&mut world, 0.1);
        assert_eq!(schedule.get::<Counter>().unwrap().updates, 0);

        assert_eq!(schedule.toggle("Counter"), Some(true));
        schedule.run(&mut world, 0.1);
        assert_eq!(schedule.get::<Counter>().unwrap().updates, 1);
        assert!(!schedule.set_active("Missing", true));
    }

    #[test]
    fn systems_run_in_insertion_order() {
        let mut world = World::new();
        world.insert_resource(Vec::<u8>::new());
        let mut schedule = Schedule::new();
        schedule.add_system(|w: &mut World, _: f32| w.resource_mut::<Vec<u8>>().push(1));
        schedule.add_system(|w: &mut World, _: f32| w.resource_mut::<Vec<u8>>().push(2));
        schedule.run(&mut world, 0.0);
        assert_eq!(world.resource::<Vec<u8>>(), &vec![1, 2]);
    }

    #[test]
    fn get_mut_reaches_concrete_system() {
        let mut schedule = Schedule::new();
        schedule.add_system(counter());
        schedule.get_mut::<Counter>().unwrap().updates = 10;
        assert_eq!(schedule.get::<Counter>().unwrap().updates, 10);
    }
}
